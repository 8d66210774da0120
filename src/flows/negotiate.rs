//! SCA negotiator: method selection and submission.

// crates.io
use oauth2::http::Method;
// self
use crate::{
	_prelude::*,
	auth::{AuthMethodId, AuthorisationId, BearerToken},
	error::NegotiationError,
	flows::{
		Psd2Client,
		common::{self, ApiRequest},
	},
	http::BankHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	resource::{AuthorisationProcess, AuthorizableResource, SelectAuthMethod},
	sca::{Negotiation, ScaApproach, ScaResponseBody},
};

impl<C, M> Psd2Client<C, M>
where
	C: ?Sized + BankHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Applies the method policy to the methods the bank declared and records the choice.
	pub fn choose_auth_method(
		&self,
		resource: &AuthorizableResource,
		process: &mut AuthorisationProcess,
	) -> Result<AuthMethodId> {
		let chosen = self
			.auth_policy
			.choose(&resource.target.bic_fi, &process.available_auth_method_ids)
			.ok_or_else(|| NegotiationError::NoAuthMethod {
				offered: process.available_auth_method_ids.iter().map(ToString::to_string).collect(),
			})?;

		process.chosen_auth_method_id = Some(chosen.clone());

		Ok(chosen)
	}

	/// Submits the chosen method and classifies the bank's answer.
	///
	/// An unclassifiable answer is returned as an [`Undefined`](crate::sca::ScaChallenge::Undefined)
	/// challenge rather than an error; [`Psd2Client::authorise`] rejects it.
	pub async fn submit_auth_method(
		&self,
		token: &BearerToken,
		resource: &AuthorizableResource,
		authorisation_id: &AuthorisationId,
		method: &AuthMethodId,
	) -> Result<Negotiation> {
		const KIND: FlowKind = FlowKind::Negotiation;

		let span = FlowSpan::new(KIND, "submit_auth_method").with_resource(&resource.id);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let api = ApiRequest::for_resource(
					KIND,
					Method::PUT,
					resource.authorisation_path(authorisation_id),
					token,
					resource,
				)
				.json(&SelectAuthMethod { authentication_method_id: method })?;
				let response = self.send_api(api).await?;
				let body: ScaResponseBody = common::parse_json(KIND, &response)?;
				let approach = common::response_header(&response, ScaApproach::HEADER);

				Ok(Negotiation::from_response(approach, &body))
			})
			.await;

		common::record_result(KIND, &result);

		result
	}
}
