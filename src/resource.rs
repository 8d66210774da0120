//! Consents, payments, and their authorisation sub-resources.
//!
//! A resource is created once per flow, receives its bank-assigned id from the create call,
//! and is never mutated afterwards. [`AuthorizableResource`] carries everything the later
//! calls need (routing headers, PSU context, URL paths) so no flow state lives anywhere else.

pub mod body;
pub mod status;

pub use body::*;
pub use status::*;

// self
use crate::{
	_prelude::*,
	auth::{AuthMethodId, AuthorisationId, BicFi, ResourceId},
};

const CONSENT_COLLECTION: &str = "/psd2/consent/v1/consents";
const PAYMENT_COLLECTION: &str = "/psd2/paymentinitiation/v1";

/// The two resource families that go through SCA.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
	/// Account-information consent.
	Consent,
	/// Payment initiation.
	Payment,
}
impl ResourceKind {
	/// Stable label used in logs and errors.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Consent => "consent",
			Self::Payment => "payment",
		}
	}

	/// Service half of the token scope.
	pub const fn scope_service(self) -> &'static str {
		match self {
			Self::Consent => "accountinformation",
			Self::Payment => "paymentinitiation",
		}
	}
}
impl Display for ResourceKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Bank routing for every call of a flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspspTarget {
	/// BIC sent as `X-BicFi`.
	pub bic_fi: BicFi,
	/// Affiliated bank sent as `X-AffiliatedASPSP-ID` on create calls.
	pub affiliated_aspsp_id: Option<String>,
}
impl AspspTarget {
	/// Targets a bank by BIC.
	pub fn new(bic_fi: BicFi) -> Self {
		Self { bic_fi, affiliated_aspsp_id: None }
	}

	/// Routes the create call to an affiliated bank.
	pub fn with_affiliated_aspsp(mut self, id: impl Into<String>) -> Self {
		self.affiliated_aspsp_id = Some(id.into());

		self
	}
}

/// The end user (PSU) on whose behalf the flow runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PsuContext {
	/// Sent as `PSU-IP-Address`.
	pub ip_address: String,
	/// Sent as `PSU-User-Agent`.
	pub user_agent: String,
	/// Sent as `PSU-ID` on calls after the create call.
	pub psu_id: Option<String>,
	/// Sent as `PSU-Corporate-Id` on every call.
	pub corporate_id: Option<String>,
	/// Explicit scope context; derived from `corporate_id` when absent.
	pub scope_context: Option<String>,
}
impl PsuContext {
	/// Creates a private PSU context.
	pub fn new(ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
		Self {
			ip_address: ip_address.into(),
			user_agent: user_agent.into(),
			psu_id: None,
			corporate_id: None,
			scope_context: None,
		}
	}

	/// Sets the PSU id.
	pub fn with_psu_id(mut self, psu_id: impl Into<String>) -> Self {
		self.psu_id = Some(psu_id.into());

		self
	}

	/// Sets the corporate id, which switches the default scope context to `corporate`.
	pub fn with_corporate_id(mut self, corporate_id: impl Into<String>) -> Self {
		self.corporate_id = Some(corporate_id.into());

		self
	}

	/// Pins the scope context regardless of the corporate id.
	pub fn with_scope_context(mut self, context: impl Into<String>) -> Self {
		self.scope_context = Some(context.into());

		self
	}

	/// Scope context to request tokens under.
	pub fn scope_context(&self) -> &str {
		match (&self.scope_context, &self.corporate_id) {
			(Some(context), _) if !context.is_empty() => context.as_str(),
			(_, Some(corporate)) if !corporate.is_empty() => "corporate",
			_ => "private",
		}
	}
}

/// What to create.
#[derive(Clone, Debug, PartialEq)]
pub enum ResourceRequest {
	/// Account-information consent.
	Consent(ConsentAccess),
	/// Payment initiation under a service and product.
	Payment(PaymentInitiation),
}
impl ResourceRequest {
	/// Kind of resource this request creates.
	pub fn kind(&self) -> ResourceKind {
		match self {
			Self::Consent(_) => ResourceKind::Consent,
			Self::Payment(_) => ResourceKind::Payment,
		}
	}

	/// Path of the collection the create call posts to.
	pub fn collection_path(&self) -> String {
		match self {
			Self::Consent(_) => CONSENT_COLLECTION.to_owned(),
			Self::Payment(payment) =>
				format!("{PAYMENT_COLLECTION}/{}/{}", payment.service.as_str(), payment.product),
		}
	}
}

/// A consent or payment the bank has accepted and assigned an id to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizableResource {
	/// Bank-assigned id.
	pub id: ResourceId,
	/// Consent or payment.
	pub kind: ResourceKind,
	/// Bank routing.
	pub target: AspspTarget,
	/// End user context.
	pub psu: PsuContext,
	collection: String,
}
impl AuthorizableResource {
	/// Binds a bank-assigned id to the request that created it.
	pub fn new(
		id: ResourceId,
		request: &ResourceRequest,
		target: AspspTarget,
		psu: PsuContext,
	) -> Self {
		Self { id, kind: request.kind(), target, psu, collection: request.collection_path() }
	}

	/// `.../{id}`
	pub fn path(&self) -> String {
		format!("{}/{}", self.collection, self.id)
	}

	/// `.../{id}/status`
	pub fn status_path(&self) -> String {
		format!("{}/status", self.path())
	}

	/// `.../{id}/authorisations`
	pub fn authorisations_path(&self) -> String {
		format!("{}/authorisations", self.path())
	}

	/// `.../{id}/authorisations/{authorisation_id}`
	pub fn authorisation_path(&self, authorisation_id: &AuthorisationId) -> String {
		format!("{}/{authorisation_id}", self.authorisations_path())
	}

	/// Binding used when exchanging an authorization code for this resource.
	pub fn binding(&self, authorisation_id: &AuthorisationId) -> AuthorisationBinding {
		AuthorisationBinding {
			resource_id: self.id.clone(),
			authorisation_id: authorisation_id.clone(),
			kind: self.kind,
		}
	}
}

/// Authorisation sub-resource attached to a resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorisationProcess {
	/// Bank-assigned id.
	pub authorisation_id: AuthorisationId,
	/// SCA methods in the order the bank declared them.
	pub available_auth_method_ids: Vec<AuthMethodId>,
	/// Method picked by the policy, once chosen.
	pub chosen_auth_method_id: Option<AuthMethodId>,
}

/// Ties an authorization-code exchange to the resource it authorises.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorisationBinding {
	/// Consent or payment id.
	pub resource_id: ResourceId,
	/// Authorisation sub-resource id.
	pub authorisation_id: AuthorisationId,
	/// Selects the header names.
	pub kind: ResourceKind,
}
impl AuthorisationBinding {
	/// Header pairs the token endpoint uses to find the authorisation.
	pub fn headers(&self) -> [(&'static str, &str); 2] {
		match self.kind {
			ResourceKind::Consent => [
				("x-consentid", self.resource_id.as_ref()),
				("x-consentauthorisationid", self.authorisation_id.as_ref()),
			],
			ResourceKind::Payment => [
				("x-paymentid", self.resource_id.as_ref()),
				("x-paymentauthorisationid", self.authorisation_id.as_ref()),
			],
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn target() -> AspspTarget {
		AspspTarget::new(BicFi::new("ESSESESS").expect("BIC fixture should be valid."))
	}

	#[test]
	fn consent_paths_nest_under_the_consent_collection() {
		let request = ResourceRequest::Consent(ConsentAccess::default());
		let resource = AuthorizableResource::new(
			ResourceId::new("c1").expect("Resource id should be valid."),
			&request,
			target(),
			PsuContext::new("10.0.0.1", "ua"),
		);
		let auth = AuthorisationId::new("a1").expect("Authorisation id should be valid.");

		assert_eq!(resource.path(), "/psd2/consent/v1/consents/c1");
		assert_eq!(resource.status_path(), "/psd2/consent/v1/consents/c1/status");
		assert_eq!(
			resource.authorisation_path(&auth),
			"/psd2/consent/v1/consents/c1/authorisations/a1"
		);
	}

	#[test]
	fn payment_paths_include_service_and_product() {
		let request = ResourceRequest::Payment(PaymentInitiation::new(
			PaymentService::Payments,
			"domestic",
			PaymentInstruction::default(),
		));
		let resource = AuthorizableResource::new(
			ResourceId::new("p1").expect("Resource id should be valid."),
			&request,
			target(),
			PsuContext::new("10.0.0.1", "ua"),
		);

		assert_eq!(request.collection_path(), "/psd2/paymentinitiation/v1/payments/domestic");
		assert_eq!(resource.status_path(), "/psd2/paymentinitiation/v1/payments/domestic/p1/status");
	}

	#[test]
	fn binding_headers_follow_resource_kind() {
		let auth = AuthorisationId::new("a1").expect("Authorisation id should be valid.");
		let consent = AuthorisationBinding {
			resource_id: ResourceId::new("c1").expect("Resource id should be valid."),
			authorisation_id: auth.clone(),
			kind: ResourceKind::Consent,
		};
		let payment = AuthorisationBinding { kind: ResourceKind::Payment, ..consent.clone() };

		assert_eq!(consent.headers(), [("x-consentid", "c1"), ("x-consentauthorisationid", "a1")]);
		assert_eq!(payment.headers(), [("x-paymentid", "c1"), ("x-paymentauthorisationid", "a1")]);
	}

	#[test]
	fn scope_context_prefers_explicit_then_corporate() {
		let private = PsuContext::new("10.0.0.1", "ua");
		let corporate = private.clone().with_corporate_id("5566");
		let pinned = corporate.clone().with_scope_context("private");

		assert_eq!(private.scope_context(), "private");
		assert_eq!(corporate.scope_context(), "corporate");
		assert_eq!(pinned.scope_context(), "private");
	}
}
