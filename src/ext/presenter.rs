//! Presentation contract for redirect links, challenges, and final results.

// self
use crate::{
	_prelude::*,
	sca::{ScaChallenge, ScaStatus},
};

/// Fire-and-forget sink for anything the PSU should see.
///
/// Calls happen inline on the polling task, so implementations should hand slow work (QR
/// rendering, browser launches) to their own tasks.
pub trait ScaPresenter: Send + Sync {
	/// Shows `presentation` to the PSU.
	fn present(&self, presentation: &Presentation);
}

/// One thing to show.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Presentation {
	/// Open this URL; the bank sends the PSU back to the redirect URI.
	Redirect {
		/// Fully substituted SCA URL.
		url: String,
		/// `state` value embedded in the URL.
		state: String,
	},
	/// Decoupled challenge (BankID token or QR image).
	Challenge {
		/// Current challenge payload.
		challenge: ScaChallenge,
		/// Status the challenge was received with.
		status: ScaStatus,
		/// Instruction for the PSU, when the status has one.
		prompt: Option<String>,
	},
	/// Polling ended on a terminal status.
	Finished {
		/// Terminal SCA status.
		status: ScaStatus,
		/// Result message, when the status has one.
		prompt: Option<String>,
	},
}
