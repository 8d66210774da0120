//! Resource client: consent and payment creation, authorisation sub-resources, status reads,
//! and the account-information reads a valid consent unlocks.
//!
//! Every non-2xx answer is a fatal [`ResourceError::Status`]; polling callers reclassify
//! upstream failures through [`crate::poll::recoverable`].

// crates.io
use oauth2::http::Method;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	auth::{AccountId, AuthMethodId, AuthorisationId, BearerToken, ResourceId, TransactionId},
	error::{ConfigError, ResourceError},
	flows::{
		Psd2Client,
		common::{self, AFFILIATED_ASPSP_ID, ApiRequest, CONSENT_ID},
	},
	http::BankHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	resource::{
		AccountBalances, AccountList, AspspTarget, AuthorisationIdsBody, AuthorisationProcess,
		AuthorizableResource, ConsentStatus, ConsentStatusBody, CreatedResource, PsuContext,
		ResourceKind, ResourceRequest, ResourceStatus, StartedAuthorisation, TransactionDetailsBody,
		TransactionList, TransactionQuery, TransactionStatus, TransactionStatusBody,
	},
	sca::{AuthorisationStatus, ScaResponseBody},
};

const ACCOUNTS_PATH: &str = "/psd2/accountinformation/v1/accounts";

impl<C, M> Psd2Client<C, M>
where
	C: ?Sized + BankHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a consent or payment and returns it with the bank-assigned id.
	pub async fn create_resource(
		&self,
		token: &BearerToken,
		request: &ResourceRequest,
		target: &AspspTarget,
		psu: &PsuContext,
	) -> Result<AuthorizableResource> {
		const KIND: FlowKind = FlowKind::CreateResource;

		let span = FlowSpan::new(KIND, "create_resource");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let mut api = ApiRequest::new(
					KIND,
					Method::POST,
					request.collection_path(),
					token,
					target,
					psu,
				);

				if let Some(affiliated) = target.affiliated_aspsp_id.as_deref() {
					api = api.header(AFFILIATED_ASPSP_ID, affiliated);
				}

				api = match request {
					ResourceRequest::Consent(access) => api.json(access)?,
					ResourceRequest::Payment(payment) => api.json(&payment.instruction)?,
				};

				let response = self.send_api(api).await?;
				let created: CreatedResource = common::parse_json(KIND, &response)?;
				let kind = request.kind();
				let id = created.id(kind).ok_or(ResourceError::MissingField {
					operation: KIND,
					field: match kind {
						ResourceKind::Consent => "consentId",
						ResourceKind::Payment => "paymentId",
					},
				})?;
				let id = ResourceId::new(id).map_err(ConfigError::from)?;

				Ok(AuthorizableResource::new(id, request, target.clone(), psu.clone()))
			})
			.await;

		common::record_result(KIND, &result);

		result
	}

	/// Starts an authorisation sub-resource and reads the declared SCA methods in order.
	pub async fn start_authorisation(
		&self,
		token: &BearerToken,
		resource: &AuthorizableResource,
	) -> Result<AuthorisationProcess> {
		const KIND: FlowKind = FlowKind::StartAuthorisation;

		let span = FlowSpan::new(KIND, "start_authorisation").with_resource(&resource.id);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let api = ApiRequest::for_resource(
					KIND,
					Method::POST,
					resource.authorisations_path(),
					token,
					resource,
				)
				.empty_json();
				let response = self.send_api(api).await?;
				let started: StartedAuthorisation = common::parse_json(KIND, &response)?;
				let authorisation_id = started
					.authorisation_id
					.as_deref()
					.ok_or(ResourceError::MissingField { operation: KIND, field: "authorisationId" })?;
				let available_auth_method_ids = started
					.sca_methods
					.iter()
					.map(|method| AuthMethodId::new(&method.authentication_method_id))
					.collect::<Result<Vec<_>, _>>()
					.map_err(ConfigError::from)?;

				Ok(AuthorisationProcess {
					authorisation_id: AuthorisationId::new(authorisation_id)
						.map_err(ConfigError::from)?,
					available_auth_method_ids,
					chosen_auth_method_id: None,
				})
			})
			.await;

		common::record_result(KIND, &result);

		result
	}

	/// Reads the SCA status (and any fresh challenge data) of an authorisation.
	pub async fn authorisation_status(
		&self,
		token: &BearerToken,
		resource: &AuthorizableResource,
		authorisation_id: &AuthorisationId,
	) -> Result<AuthorisationStatus> {
		const KIND: FlowKind = FlowKind::ScaStatus;

		let api = ApiRequest::for_resource(
			KIND,
			Method::GET,
			resource.authorisation_path(authorisation_id),
			token,
			resource,
		);
		let response = self.send_api(api).await?;
		let body: ScaResponseBody = common::parse_json(KIND, &response)?;

		Ok(AuthorisationStatus::from_body(&body))
	}

	/// Reads the consent status or payment transaction status.
	pub async fn resource_status(
		&self,
		token: &BearerToken,
		resource: &AuthorizableResource,
	) -> Result<ResourceStatus> {
		const KIND: FlowKind = FlowKind::ResourceStatus;

		let api =
			ApiRequest::for_resource(KIND, Method::GET, resource.status_path(), token, resource);
		let response = self.send_api(api).await?;

		match resource.kind {
			ResourceKind::Consent => {
				let body: ConsentStatusBody = common::parse_json(KIND, &response)?;
				let status = body
					.consent_status
					.ok_or(ResourceError::MissingField { operation: KIND, field: "consentStatus" })?;

				Ok(ResourceStatus::Consent(ConsentStatus::from(status.as_str())))
			},
			ResourceKind::Payment => {
				let body: TransactionStatusBody = common::parse_json(KIND, &response)?;
				let status = body.transaction_status.ok_or(ResourceError::MissingField {
					operation: KIND,
					field: "transactionStatus",
				})?;

				Ok(ResourceStatus::Payment(TransactionStatus::new(status)))
			},
		}
	}

	/// Deletes a consent. Nothing calls this automatically after a failed flow.
	pub async fn delete_consent(
		&self,
		token: &BearerToken,
		resource: &AuthorizableResource,
	) -> Result<()> {
		const KIND: FlowKind = FlowKind::DeleteConsent;

		if resource.kind != ResourceKind::Consent {
			return Err(ResourceError::Unsupported { operation: KIND, kind: resource.kind }.into());
		}

		let span = FlowSpan::new(KIND, "delete_consent").with_resource(&resource.id);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let api =
					ApiRequest::for_resource(KIND, Method::DELETE, resource.path(), token, resource);

				self.send_api(api).await.map(|_| ())
			})
			.await;

		common::record_result(KIND, &result);

		result
	}

	/// Lists the accounts (with balances) a valid consent covers.
	pub async fn list_accounts(
		&self,
		token: &BearerToken,
		consent: &AuthorizableResource,
	) -> Result<AccountList> {
		self.read_account_info(
			FlowKind::ListAccounts,
			token,
			consent,
			format!("{ACCOUNTS_PATH}?withBalance=true"),
		)
		.await
	}

	/// Reads the balances of one account covered by a valid consent.
	pub async fn account_balances(
		&self,
		token: &BearerToken,
		consent: &AuthorizableResource,
		account_id: &AccountId,
	) -> Result<AccountBalances> {
		self.read_account_info(
			FlowKind::ReadBalances,
			token,
			consent,
			format!("{ACCOUNTS_PATH}/{account_id}/balances"),
		)
		.await
	}

	/// Lists the transactions of one account matching `query`.
	pub async fn list_transactions(
		&self,
		token: &BearerToken,
		consent: &AuthorizableResource,
		account_id: &AccountId,
		query: &TransactionQuery,
	) -> Result<TransactionList> {
		self.read_account_info(
			FlowKind::ListTransactions,
			token,
			consent,
			format!("{ACCOUNTS_PATH}/{account_id}/transactions?{}", query.query_string()),
		)
		.await
	}

	/// Reads one transaction as the raw `transactionsDetails` object.
	pub async fn transaction_details(
		&self,
		token: &BearerToken,
		consent: &AuthorizableResource,
		account_id: &AccountId,
		transaction_id: &TransactionId,
	) -> Result<Map<String, Value>> {
		let body: TransactionDetailsBody = self
			.read_account_info(
				FlowKind::TransactionDetails,
				token,
				consent,
				format!("{ACCOUNTS_PATH}/{account_id}/transactions/{transaction_id}"),
			)
			.await?;

		Ok(body.transactions_details)
	}

	/// Lists the authorisation sub-resources started for a consent or payment.
	pub async fn list_authorisations(
		&self,
		token: &BearerToken,
		resource: &AuthorizableResource,
	) -> Result<Vec<AuthorisationId>> {
		const KIND: FlowKind = FlowKind::ListAuthorisations;

		let api = ApiRequest::for_resource(
			KIND,
			Method::GET,
			resource.authorisations_path(),
			token,
			resource,
		);
		let response = self.send_api(api).await?;
		let body: AuthorisationIdsBody = common::parse_json(KIND, &response)?;

		Ok(body.authorisation_ids)
	}

	/// Account-information read routed by `Consent-ID`.
	async fn read_account_info<T>(
		&self,
		kind: FlowKind,
		token: &BearerToken,
		consent: &AuthorizableResource,
		path: String,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		if consent.kind != ResourceKind::Consent {
			return Err(ResourceError::Unsupported { operation: kind, kind: consent.kind }.into());
		}

		let api = ApiRequest::for_resource(kind, Method::GET, path, token, consent)
			.header(CONSENT_ID, consent.id.to_string());
		let response = self.send_api(api).await?;

		common::parse_json(kind, &response)
	}
}
