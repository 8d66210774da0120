//! OAuth 2.0 grant types used against the token endpoint.

// self
use crate::_prelude::*;

/// Token grants the client performs against the bank's token endpoint.
///
/// `ClientCredentials` yields the flow's API token; `AuthorizationCode` activates an
/// authorisation that uses the OAuth-redirect SCA approach.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	#[allow(missing_docs)]
	AuthorizationCode,
	#[allow(missing_docs)]
	ClientCredentials,
}
impl GrantType {
	/// `grant_type` form value.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::AuthorizationCode => "authorization_code",
			Self::ClientCredentials => "client_credentials",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
