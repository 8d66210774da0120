//! Redirect hand-off: template substitution and `state` handling.

// crates.io
use rand::{Rng, distr::Alphanumeric};
use url::form_urlencoded;
// self
use crate::{_prelude::*, error::AuthError};

const CLIENT_ID_PLACEHOLDER: &str = "[CLIENT_ID]";
const REDIRECT_URI_PLACEHOLDER: &str = "[TPP_REDIRECT_URI]";
const STATE_PLACEHOLDER: &str = "[TPP_STATE]";
const STATE_LEN: usize = 32;

/// Replaces every `[CLIENT_ID]`, `[TPP_REDIRECT_URI]`, and `[TPP_STATE]` placeholder.
///
/// The client id is inserted verbatim; the redirect URI and state are form-URL-encoded.
/// Templates without placeholders come back unchanged.
pub fn fill_template(template: &str, client_id: &str, redirect_uri: &str, state: &str) -> String {
	template
		.replace(CLIENT_ID_PLACEHOLDER, client_id)
		.replace(REDIRECT_URI_PLACEHOLDER, &encode(redirect_uri))
		.replace(STATE_PLACEHOLDER, &encode(state))
}

/// Random alphanumeric `state` value.
pub fn random_state() -> String {
	rand::rng().sample_iter(Alphanumeric).take(STATE_LEN).map(char::from).collect()
}

/// URL handed to the PSU together with the `state` it embeds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectHandoff {
	/// Substituted SCA URL.
	pub url: String,
	/// `state` the callback must echo.
	pub state: String,
}
impl RedirectHandoff {
	/// Fills `template` with a fresh random state.
	pub fn new(template: &str, client_id: &str, redirect_uri: &str) -> Self {
		Self::with_state(template, client_id, redirect_uri, random_state())
	}

	/// Fills `template` with a caller-chosen state.
	pub fn with_state(
		template: &str,
		client_id: &str,
		redirect_uri: &str,
		state: impl Into<String>,
	) -> Self {
		let state = state.into();

		Self { url: fill_template(template, client_id, redirect_uri, &state), state }
	}

	/// Checks the `state` echoed on the redirect callback.
	pub fn validate_state(&self, returned: &str) -> Result<(), AuthError> {
		if returned == self.state { Ok(()) } else { Err(AuthError::StateMismatch) }
	}
}

fn encode(value: &str) -> String {
	form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn substitution_is_total_and_encodes_the_redirect() {
		let template = "https://bank/authorize?client_id=[CLIENT_ID]&redirect_uri=[TPP_REDIRECT_URI]&state=[TPP_STATE]&again=[CLIENT_ID]";
		let url = fill_template(template, "c-1", "https://tpp.example.com/cb?x=1 2", "s1");

		assert_eq!(
			url,
			"https://bank/authorize?client_id=c-1&redirect_uri=https%3A%2F%2Ftpp.example.com%2Fcb%3Fx%3D1+2&state=s1&again=c-1"
		);
		assert!(!url.contains('['));
	}

	#[test]
	fn templates_without_placeholders_are_unchanged() {
		let template = "https://bank/sca/plain";

		assert_eq!(fill_template(template, "c", "https://r", "s"), template);
	}

	#[test]
	fn handoff_states_are_random_and_validated() {
		let first = RedirectHandoff::new("https://bank?s=[TPP_STATE]", "c", "https://r");
		let second = RedirectHandoff::new("https://bank?s=[TPP_STATE]", "c", "https://r");

		assert_eq!(first.state.len(), STATE_LEN);
		assert!(first.state.chars().all(|c| c.is_ascii_alphanumeric()));
		assert_ne!(first.state, second.state);
		assert_eq!(first.url, format!("https://bank?s={}", first.state));
		assert!(first.validate_state(&first.state).is_ok());
		assert!(matches!(first.validate_state("forged"), Err(AuthError::StateMismatch)));
	}
}
