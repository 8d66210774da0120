//! `scaStatus` values and the PSU prompts tied to them.

// self
use crate::{_prelude::*, resource::ResourceKind};

/// SCA status of an authorisation sub-resource.
///
/// Only [`Finalised`](Self::Finalised), [`Failed`](Self::Failed), and
/// [`Exempted`](Self::Exempted) are terminal. Values this client does not know are kept in
/// [`Other`](Self::Other) and treated as still in progress.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScaStatus {
	/// Authorisation created.
	Received,
	/// PSU identified.
	PsuIdentified,
	/// PSU authenticated.
	PsuAuthenticated,
	/// SCA method chosen.
	ScaMethodSelected,
	/// Signing started.
	Started,
	/// Authentication started.
	AuthenticationStarted,
	/// PSU is asked to approve the creditor account.
	AuthoriseCreditorAccountStarted,
	/// SCA completed.
	Finalised,
	/// SCA failed.
	Failed,
	/// Bank waived SCA.
	Exempted,
	/// Any value not listed above.
	Other(String),
}
impl ScaStatus {
	/// Wire value.
	pub fn as_str(&self) -> &str {
		match self {
			Self::Received => "received",
			Self::PsuIdentified => "psuIdentified",
			Self::PsuAuthenticated => "psuAuthenticated",
			Self::ScaMethodSelected => "scaMethodSelected",
			Self::Started => "started",
			Self::AuthenticationStarted => "authenticationStarted",
			Self::AuthoriseCreditorAccountStarted => "authoriseCreditorAccountStarted",
			Self::Finalised => "finalised",
			Self::Failed => "failed",
			Self::Exempted => "exempted",
			Self::Other(raw) => raw,
		}
	}

	/// Returns true for `finalised`, `failed`, and `exempted`.
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Finalised | Self::Failed | Self::Exempted)
	}

	/// Returns true for the terminal statuses that authorise the resource.
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Finalised | Self::Exempted)
	}

	/// Returns true when entering this status should put the challenge in front of the PSU.
	pub fn presents_challenge(&self) -> bool {
		matches!(
			self,
			Self::Started | Self::AuthenticationStarted | Self::AuthoriseCreditorAccountStarted
		)
	}

	/// Message to show the PSU alongside a challenge or a final result.
	pub fn prompt(&self, kind: ResourceKind) -> Option<&'static str> {
		match self {
			Self::AuthenticationStarted => Some("Please authenticate"),
			Self::AuthoriseCreditorAccountStarted => Some("Please approve the creditor account"),
			Self::Started => Some(match kind {
				ResourceKind::Consent => "Please sign the consent",
				ResourceKind::Payment => "Please sign the payment",
			}),
			Self::Finalised => Some("SCA Finalised"),
			Self::Exempted => Some("SCA Exempted"),
			Self::Failed => Some("SCA Failed"),
			_ => None,
		}
	}
}
impl From<&str> for ScaStatus {
	fn from(raw: &str) -> Self {
		match raw {
			"received" => Self::Received,
			"psuIdentified" => Self::PsuIdentified,
			"psuAuthenticated" => Self::PsuAuthenticated,
			"scaMethodSelected" => Self::ScaMethodSelected,
			"started" => Self::Started,
			"authenticationStarted" => Self::AuthenticationStarted,
			"authoriseCreditorAccountStarted" => Self::AuthoriseCreditorAccountStarted,
			"finalised" => Self::Finalised,
			"failed" => Self::Failed,
			"exempted" => Self::Exempted,
			other => Self::Other(other.to_owned()),
		}
	}
}
impl From<String> for ScaStatus {
	fn from(raw: String) -> Self {
		Self::from(raw.as_str())
	}
}
impl From<ScaStatus> for String {
	fn from(status: ScaStatus) -> Self {
		match status {
			ScaStatus::Other(raw) => raw,
			known => known.as_str().to_owned(),
		}
	}
}
impl Display for ScaStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
