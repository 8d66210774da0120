//! Credentials that must never reach a log line.

// self
use crate::_prelude::*;

const REDACTED: &str = "<redacted>";

/// Access token or client secret.
///
/// `Debug` and `Display` print a placeholder; only [`expose`](Self::expose) reveals the value,
/// and the HTTP layer is its only caller outside tests.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps `value`.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Raw value.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns true for an empty secret, which banks treat as a missing one.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl From<String> for TokenSecret {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "TokenSecret({REDACTED})")
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(REDACTED)
	}
}
