//! Authorization-code delivery after an OAuth redirect.

// self
use crate::{
	_prelude::*,
	auth::{AuthorisationId, ResourceId},
	resource::ResourceKind,
};

/// Boxed future returned by [`AuthCodeSource::await_code`].
pub type AuthCodeFuture<'a> = Pin<Box<dyn Future<Output = Option<String>> + 'a + Send>>;

/// Waits for the PSU to come back from an OAuth redirect.
///
/// Implementations typically listen on the redirect URI or read a pasted callback. They
/// should validate `state` (see [`crate::flows::RedirectHandoff::validate_state`]) and resolve
/// to `None` when the PSU abandons the redirect or the state does not match.
pub trait AuthCodeSource: Send + Sync {
	/// Resolves to the authorization code, or `None` when none will arrive.
	fn await_code<'a>(&'a self, request: &'a AuthCodeRequest) -> AuthCodeFuture<'a>;
}

/// Context for one pending OAuth redirect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthCodeRequest {
	/// URL handed to the presenter.
	pub url: String,
	/// `state` value the callback must echo.
	pub state: String,
	/// Resource being authorised.
	pub resource_id: ResourceId,
	/// Authorisation sub-resource being authorised.
	pub authorisation_id: AuthorisationId,
	/// Consent or payment.
	pub kind: ResourceKind,
}
