//! Bearer tokens issued by the token endpoint.

pub mod secret;

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
};

/// Access token scoped to one flow. Nothing caches or refreshes it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerToken {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Scope requested for this token.
	pub scope: ScopeSet,
	/// Instant the token endpoint answered.
	pub issued_at: OffsetDateTime,
	/// Expiry derived from `expires_in`, when the bank sent one.
	pub expires_at: Option<OffsetDateTime>,
}
impl BearerToken {
	/// Wraps an access token issued now without an expiry hint.
	pub fn new(access_token: TokenSecret, scope: ScopeSet) -> Self {
		Self { access_token, scope, issued_at: OffsetDateTime::now_utc(), expires_at: None }
	}

	/// Sets the expiry relative to the issue instant.
	pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
		self.expires_at = Some(self.issued_at + expires_in);

		self
	}

	/// Returns true when the bank declared an expiry and it has passed at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| instant >= expires_at)
	}

	/// Value for the `Authorization` header.
	pub fn authorization_value(&self) -> String {
		format!("Bearer {}", self.access_token.expose())
	}
}
impl Debug for BearerToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BearerToken")
			.field("access_token", &self.access_token)
			.field("scope", &self.scope)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn expiry_is_optional() {
		let scope = ScopeSet::parse("private accountinformation").expect("Scope should parse.");
		let token = BearerToken::new(TokenSecret::new("abc"), scope.clone());

		assert!(!token.is_expired_at(token.issued_at + Duration::days(365)));

		let token =
			BearerToken::new(TokenSecret::new("abc"), scope).with_expires_in(Duration::seconds(60));

		assert!(!token.is_expired_at(token.issued_at + Duration::seconds(59)));
		assert!(token.is_expired_at(token.issued_at + Duration::seconds(60)));
	}

	#[test]
	fn debug_redacts_access_token() {
		let token = BearerToken::new(TokenSecret::new("super-secret"), ScopeSet::default());
		let rendered = format!("{token:?}");

		assert!(!rendered.contains("super-secret"));
		assert_eq!(token.authorization_value(), "Bearer super-secret");
	}
}
