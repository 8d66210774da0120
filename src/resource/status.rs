//! Resource-level statuses read after SCA.

// self
use crate::{_prelude::*, resource::ResourceKind};

/// `consentStatus` values. Unknown values are kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConsentStatus {
	/// Created, not yet authorised.
	Received,
	/// Rejected by the bank or PSU.
	Rejected,
	/// Some, but not all, required authorisations are done.
	PartiallyAuthorised,
	/// Usable for account information calls.
	Valid,
	/// Revoked by the PSU.
	RevokedByPsu,
	/// Past `validUntil`.
	Expired,
	/// Deleted by the third party.
	TerminatedByTpp,
	/// Any value not listed above.
	Other(String),
}
impl ConsentStatus {
	/// Wire value.
	pub fn as_str(&self) -> &str {
		match self {
			Self::Received => "received",
			Self::Rejected => "rejected",
			Self::PartiallyAuthorised => "partiallyAuthorised",
			Self::Valid => "valid",
			Self::RevokedByPsu => "revokedByPsu",
			Self::Expired => "expired",
			Self::TerminatedByTpp => "terminatedByTpp",
			Self::Other(raw) => raw,
		}
	}

	/// Returns true once the bank has moved past the pending states.
	pub fn is_settled(&self) -> bool {
		!matches!(self, Self::Received | Self::PartiallyAuthorised)
	}
}
impl From<&str> for ConsentStatus {
	fn from(raw: &str) -> Self {
		match raw {
			"received" => Self::Received,
			"rejected" => Self::Rejected,
			"partiallyAuthorised" => Self::PartiallyAuthorised,
			"valid" => Self::Valid,
			"revokedByPsu" => Self::RevokedByPsu,
			"expired" => Self::Expired,
			"terminatedByTpp" => Self::TerminatedByTpp,
			other => Self::Other(other.to_owned()),
		}
	}
}
impl Display for ConsentStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// ISO 20022 `transactionStatus` code of a payment, kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionStatus(String);
impl TransactionStatus {
	/// Initial status of a freshly created payment.
	pub const RECEIVED: &'static str = "RCVD";

	/// Wraps a status code.
	pub fn new(code: impl Into<String>) -> Self {
		Self(code.into())
	}

	/// Wire value.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Returns true once the payment has left `RCVD`.
	pub fn is_settled(&self) -> bool {
		self.0 != Self::RECEIVED
	}

	/// Returns true for the ISO 20022 rejection code.
	pub fn is_rejected(&self) -> bool {
		self.0 == "RJCT"
	}
}
impl Display for TransactionStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Status of either resource kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceStatus {
	/// Consent status.
	Consent(ConsentStatus),
	/// Payment transaction status.
	Payment(TransactionStatus),
}
impl ResourceStatus {
	/// Kind of resource the status belongs to.
	pub fn kind(&self) -> ResourceKind {
		match self {
			Self::Consent(_) => ResourceKind::Consent,
			Self::Payment(_) => ResourceKind::Payment,
		}
	}

	/// Returns true once the status stops changing on its own.
	pub fn is_settled(&self) -> bool {
		match self {
			Self::Consent(status) => status.is_settled(),
			Self::Payment(status) => status.is_settled(),
		}
	}

	/// Returns true when the settled status means the resource is usable.
	///
	/// Consents must be `valid`; payments count as accepted once they leave `RCVD` without
	/// being rejected.
	pub fn is_success(&self) -> bool {
		match self {
			Self::Consent(status) => *status == ConsentStatus::Valid,
			Self::Payment(status) => status.is_settled() && !status.is_rejected(),
		}
	}
}
impl Display for ResourceStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Consent(status) => Display::fmt(status, f),
			Self::Payment(status) => Display::fmt(status, f),
		}
	}
}
