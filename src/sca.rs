//! SCA method negotiation results and authorisation status snapshots.
//!
//! The challenge variant is fixed once [`Negotiation`] is produced. Later status reads may
//! carry fresh challenge payloads, but the orchestrator only accepts them when they keep the
//! same variant.

pub mod challenge;
pub mod status;

pub use challenge::*;
pub use status::*;

// self
use crate::_prelude::*;

/// Outcome of submitting an authentication method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Negotiation {
	/// Method derived from the challenge.
	pub method: ScaMethod,
	/// SCA status reported with the negotiation response.
	pub status: ScaStatus,
	/// Challenge payload.
	pub challenge: ScaChallenge,
	/// Raw `aspsp-sca-approach` header, kept for diagnostics.
	pub approach: Option<String>,
}
impl Negotiation {
	/// Builds a negotiation from the approach header and parsed body.
	pub fn from_response(approach: Option<&str>, body: &ScaResponseBody) -> Self {
		let challenge = ScaChallenge::classify(approach, body);

		Self {
			method: challenge.method(),
			status: body.sca_status.as_deref().map(ScaStatus::from).unwrap_or(ScaStatus::Received),
			challenge,
			approach: approach.map(ToOwned::to_owned),
		}
	}
}

/// One read of an authorisation sub-resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorisationStatus {
	/// Current SCA status.
	pub status: ScaStatus,
	/// Fresh decoupled challenge data, when the bank sent any.
	pub challenge: Option<ScaChallenge>,
}
impl AuthorisationStatus {
	/// Builds a snapshot from a parsed status body.
	pub fn from_body(body: &ScaResponseBody) -> Self {
		Self {
			status: body.sca_status.as_deref().map(ScaStatus::from).unwrap_or(ScaStatus::Received),
			challenge: ScaChallenge::from_challenge_data(body.challenge_data.as_ref()),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn negotiation_defaults_missing_status_to_received() {
		let body: ScaResponseBody =
			serde_json::from_str(r#"{"_links":{"scaRedirect":{"href":"https://bank/r"}}}"#)
				.expect("Fixture body should parse.");
		let negotiation = Negotiation::from_response(Some("REDIRECT"), &body);

		assert_eq!(negotiation.method, ScaMethod::Redirect);
		assert_eq!(negotiation.status, ScaStatus::Received);
		assert_eq!(negotiation.approach.as_deref(), Some("REDIRECT"));
	}

	#[test]
	fn status_snapshot_reads_fresh_image() {
		let body: ScaResponseBody = serde_json::from_str(
			r#"{"scaStatus":"started","challengeData":{"image":"data:image/png;base64,AA=="}}"#,
		)
		.expect("Fixture body should parse.");
		let snapshot = AuthorisationStatus::from_body(&body);

		assert_eq!(snapshot.status, ScaStatus::Started);
		assert_eq!(
			snapshot.challenge,
			Some(ScaChallenge::DecoupledImage { image_data: "data:image/png;base64,AA==".into() })
		);
	}
}
