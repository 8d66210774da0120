//! Token client: client-credentials and authorization-code grants.
//!
//! Neither grant is retried. A rejected authorization code surfaces as
//! [`AuthError::InvalidGrant`](crate::error::AuthError::InvalidGrant) so the orchestrator can
//! turn it into a failed SCA instead of an error.

// self
use crate::{
	_prelude::*,
	aspsp::{AspspStrategy, GrantType},
	auth::{BearerToken, ScopeSet},
	flows::{Psd2Client, common::record_result},
	http::BankHttpClient,
	oauth::{BasicFacade, OAuth2Facade, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	resource::AuthorisationBinding,
};

impl<C, M> Psd2Client<C, M>
where
	C: ?Sized + BankHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Performs the `client_credentials` grant for `scope`.
	pub async fn client_token(&self, scope: &ScopeSet) -> Result<BearerToken> {
		const KIND: FlowKind = FlowKind::ClientToken;

		let span = FlowSpan::new(KIND, "client_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let extra_params = self.token_extras(GrantType::ClientCredentials);

				self.facade()?
					.exchange_client_credentials(self.strategy.as_ref(), scope, &extra_params)
					.await
			})
			.await;

		record_result(KIND, &result);

		result
	}

	/// Exchanges an authorization code returned by an OAuth redirect.
	///
	/// The request carries the resource and authorisation ids from `binding` as headers so the
	/// token endpoint can match the code to the authorisation it completes.
	pub async fn exchange_auth_code(
		&self,
		binding: &AuthorisationBinding,
		scope: &ScopeSet,
		code: &str,
	) -> Result<BearerToken> {
		const KIND: FlowKind = FlowKind::CodeExchange;

		let span = FlowSpan::new(KIND, "exchange_auth_code");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let extra_params = self.token_extras(GrantType::AuthorizationCode);

				self.facade()?
					.exchange_authorization_code(
						self.strategy.as_ref(),
						binding,
						scope,
						code,
						&extra_params,
					)
					.await
			})
			.await;

		record_result(KIND, &result);

		result
	}

	fn facade(&self) -> Result<BasicFacade<C, M>> {
		BasicFacade::from_descriptor(
			&self.descriptor,
			&self.credentials.client_id,
			self.credentials.client_secret.as_ref().map(|secret| secret.expose()),
			&self.credentials.redirect_uri,
			self.http_client.clone(),
			self.transport_mapper.clone(),
		)
	}

	/// Form fields the strategy adds on top of what the `oauth2` request already sends.
	fn token_extras(&self, grant: GrantType) -> Vec<(String, String)> {
		let mut form = BTreeMap::new();

		<dyn AspspStrategy>::augment_token_request(self.strategy.as_ref(), grant, &mut form);

		form.into_iter()
			.filter(|(key, _)| {
				!matches!(
					key.as_str(),
					"grant_type" | "scope" | "code" | "redirect_uri" | "client_id" | "client_secret"
				)
			})
			.collect()
	}
}
