//! Identifiers the bank hands out (resource, authorisation, account, and transaction ids) and
//! the ones it routes on.
//!
//! Bank-issued ids are opaque, but they end up as URL path segments, so only RFC 3986
//! unreserved characters are accepted. BICs are also checked against the ISO 9362 shape, so a
//! typo fails at construction time instead of as a `400` from the bank.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const MAX_LEN: usize = 128;

macro_rules! def_id {
	($(#[$meta:meta])* $name:ident, $kind:literal, $check:path) => {
		$(#[$meta])*
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Label used in validation errors and `Debug` output.
			pub const KIND: &'static str = $kind;

			/// Validates and wraps `value`.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let value = value.as_ref();

				$check(Self::KIND, value)?;

				Ok(Self(value.to_owned()))
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				$check(Self::KIND, &value)?;

				Ok(Self(value))
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &str {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, "{}({})", Self::KIND, self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

/// Rejected identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// Empty value.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Identifier kind.
		kind: &'static str,
	},
	/// Value contains whitespace; it would break header values and URL paths.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Identifier kind.
		kind: &'static str,
	},
	/// Value is longer than any bank issues.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Identifier kind.
		kind: &'static str,
		/// Maximum length in bytes.
		max: usize,
	},
	/// Value does not have the expected shape.
	#[error("{kind} identifier is malformed: {reason}.")]
	Malformed {
		/// Identifier kind.
		kind: &'static str,
		/// Broken rule.
		reason: &'static str,
	},
}

def_id! {
	/// Bank-assigned id of a consent or payment.
	ResourceId, "Resource", check_opaque
}
def_id! {
	/// Bank-assigned id of an authorisation sub-resource.
	AuthorisationId, "Authorisation", check_opaque
}
def_id! {
	/// SCA method id declared by the bank, for example `mbid` or `mbid_animated_qr_image`.
	AuthMethodId, "AuthMethod", check_opaque
}
def_id! {
	/// Bank-assigned `resourceId` of an account reachable through a consent.
	AccountId, "Account", check_opaque
}
def_id! {
	/// Bank-assigned id of a booked or pending transaction.
	TransactionId, "Transaction", check_opaque
}
def_id! {
	/// ISO 9362 BIC of the bank a request is routed to (`X-BicFi`).
	BicFi, "BicFi", check_bic
}

impl AuthMethodId {
	/// Wraps a method id written into the source.
	pub(crate) fn from_static(value: &'static str) -> Self {
		debug_assert!(check_opaque(Self::KIND, value).is_ok());

		Self(value.to_owned())
	}
}

fn check_opaque(kind: &'static str, value: &str) -> Result<(), IdentifierError> {
	if value.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if value.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if value.len() > MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: MAX_LEN });
	}
	// Ids become URL path segments.
	if !value.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~'))
	{
		return Err(IdentifierError::Malformed { kind, reason: "expected URL-safe characters" });
	}
	if value.bytes().all(|b| b == b'.') {
		return Err(IdentifierError::Malformed { kind, reason: "dot segments are not allowed" });
	}

	Ok(())
}

/// Four-letter institution code, two-letter country, two-character location, and an optional
/// three-character branch.
fn check_bic(kind: &'static str, value: &str) -> Result<(), IdentifierError> {
	check_opaque(kind, value)?;

	let malformed = |reason| Err(IdentifierError::Malformed { kind, reason });

	if !matches!(value.len(), 8 | 11) {
		return malformed("expected 8 or 11 characters");
	}
	if !value.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
		return malformed("expected upper-case letters and digits");
	}
	if !value.bytes().take(6).all(|b| b.is_ascii_uppercase()) {
		return malformed("institution and country codes must be letters");
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn opaque_ids_reject_whitespace_and_empty_values() {
		assert!(ResourceId::new(" c1").is_err(), "Leading whitespace must be rejected.");
		assert!(ResourceId::new("c1\u{00A0}").is_err(), "Unicode whitespace must be rejected.");
		assert_eq!(
			AuthorisationId::new(""),
			Err(IdentifierError::Empty { kind: AuthorisationId::KIND })
		);
		assert!(AuthMethodId::new("mobile bankid").is_err());
		assert!(AuthorisationId::new("a".repeat(MAX_LEN)).is_ok());
		assert!(matches!(
			AuthorisationId::new("a".repeat(MAX_LEN + 1)),
			Err(IdentifierError::TooLong { kind: "Authorisation", .. })
		));

		let resource = ResourceId::new("5e1a-c1").expect("Resource fixture should be valid.");

		assert_eq!(&*resource, "5e1a-c1");
		assert_eq!(format!("{resource:?}"), "Resource(5e1a-c1)");
	}

	#[test]
	fn ids_cannot_escape_their_path_segment() {
		for hostile in ["c1#frag", "c1?x=1", "../../payments/p9", "c1/status", "c1%2F", ".."] {
			assert!(
				matches!(ResourceId::new(hostile), Err(IdentifierError::Malformed { .. })),
				"{hostile} should be rejected."
			);
			assert!(
				AuthorisationId::new(hostile).is_err(),
				"{hostile} should be rejected as an authorisation id."
			);
		}

		assert!(ResourceId::new("1234-abcd_EF.v2~x").is_ok());
		assert!(AuthMethodId::new("mbid_animated_qr_image").is_ok());
	}

	#[test]
	fn bics_follow_iso_9362() {
		for valid in ["ESSESESS", "HANDSESS", "DEUTDEFF500"] {
			assert!(BicFi::new(valid).is_ok(), "{valid} should be accepted.");
		}
		for invalid in ["ESSESES", "essesess", "ESS1SESS", "ESSESESS50", "ESSE-SESS"] {
			assert!(
				matches!(BicFi::new(invalid), Err(IdentifierError::Malformed { kind: "BicFi", .. })),
				"{invalid} should be rejected."
			);
		}
	}

	#[test]
	fn serde_validates_on_the_way_in() {
		let bic: BicFi =
			serde_json::from_str("\"ESSESESS\"").expect("BIC should deserialize successfully.");

		assert_eq!(serde_json::to_string(&bic).expect("BIC should serialize."), "\"ESSESESS\"");
		assert!(serde_json::from_str::<BicFi>("\"ESSE SESS\"").is_err());
		assert!(serde_json::from_str::<ResourceId>("\"\"").is_err());
	}

	#[test]
	fn ids_look_up_by_str() {
		let offered: HashMap<AuthMethodId, u8> = HashMap::from_iter([(
			AuthMethodId::new("mbid").expect("Method used for lookup should be valid."),
			1_u8,
		)]);

		assert_eq!(offered.get("mbid"), Some(&1));
	}
}
