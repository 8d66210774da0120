//! Settings document, environments, and polling cadence.
//!
//! [`ClientSettings`] mirrors the JSON document operators already keep for the platform
//! (PascalCase keys). Reading the file and the client certificate stays with the caller; this
//! module only parses bytes.

// self
use crate::{
	_prelude::*,
	aspsp::ApiDescriptor,
	error::ConfigError,
	flows::ClientCredentials,
	resource::PsuContext,
	sca::ScaMethod,
};

/// Platform environment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
	/// Sandbox hosts; no client certificate required.
	#[default]
	Sandbox,
	/// Production hosts; calls need a client certificate.
	Production,
}
impl Environment {
	/// Base URL of the authorization server.
	pub const fn auth_base(self) -> &'static str {
		match self {
			Self::Sandbox => "https://auth.sandbox.openbankingplatform.com",
			Self::Production => "https://auth.openbankingplatform.com",
		}
	}

	/// Base URL of the PSD2 API.
	pub const fn api_base(self) -> &'static str {
		match self {
			Self::Sandbox => "https://api.sandbox.openbankingplatform.com",
			Self::Production => "https://api.openbankingplatform.com",
		}
	}
}

/// Polling intervals per SCA method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScaTimings {
	/// Interval between status reads for decoupled challenges.
	pub decoupled_interval: StdDuration,
	/// Interval between status reads after a redirect hand-off.
	pub redirect_interval: StdDuration,
}
impl ScaTimings {
	/// Same interval for every method.
	pub const fn uniform(interval: StdDuration) -> Self {
		Self { decoupled_interval: interval, redirect_interval: interval }
	}

	/// Interval to use while polling an authorisation driven by `method`.
	pub fn for_method(&self, method: ScaMethod) -> StdDuration {
		match method {
			ScaMethod::Decoupled => self.decoupled_interval,
			ScaMethod::OAuthRedirect | ScaMethod::Redirect | ScaMethod::Undefined =>
				self.redirect_interval,
		}
	}
}
impl Default for ScaTimings {
	fn default() -> Self {
		Self {
			decoupled_interval: StdDuration::from_secs(1),
			redirect_interval: StdDuration::from_secs(2),
		}
	}
}

/// JSON settings document.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ClientSettings {
	/// OAuth client id.
	#[serde(rename = "ClientId")]
	pub client_id: String,
	/// OAuth client secret.
	#[serde(rename = "ClientSecret", default)]
	pub client_secret: Option<String>,
	/// Redirect URI registered for the client.
	#[serde(rename = "RedirectURI")]
	pub redirect_uri: String,
	/// Explicit scope context (`private` or `corporate`).
	#[serde(rename = "PSUContextScope", default)]
	pub psu_context_scope: Option<String>,
	/// PSU identifier sent as `PSU-ID`.
	#[serde(rename = "PSUId", default)]
	pub psu_id: Option<String>,
	/// Corporate identifier sent as `PSU-Corporate-ID`.
	#[serde(rename = "PSUCorporateId", default)]
	pub psu_corporate_id: Option<String>,
	/// Selects the production hosts.
	#[serde(rename = "UseProductionEnvironment", default)]
	pub use_production_environment: bool,
	/// Path of the PEM client certificate used in production.
	#[serde(rename = "ProductionClientCertificateFile", default)]
	pub production_client_certificate_file: Option<String>,
	/// PSU IP address forwarded to the bank.
	#[serde(rename = "PSUIPAddress")]
	pub psu_ip_address: String,
	/// PSU user agent forwarded to the bank.
	#[serde(rename = "PSUUserAgent")]
	pub psu_user_agent: String,
	/// Overrides the decoupled polling interval.
	#[serde(rename = "DecoupledPollIntervalMs", default)]
	pub decoupled_poll_interval_ms: Option<u64>,
	/// Overrides the redirect polling interval.
	#[serde(rename = "RedirectPollIntervalMs", default)]
	pub redirect_poll_interval_ms: Option<u64>,
}
impl ClientSettings {
	/// Parses a settings document, reporting the failing JSON path.
	pub fn from_json_str(raw: &str) -> Result<Self> {
		Self::from_slice(raw.as_bytes())
	}

	/// Parses a settings document from bytes.
	pub fn from_slice(raw: &[u8]) -> Result<Self> {
		let mut de = serde_json::Deserializer::from_slice(raw);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| ConfigError::Settings { source }.into())
	}

	/// Environment selected by the document.
	pub fn environment(&self) -> Environment {
		if self.use_production_environment { Environment::Production } else { Environment::Sandbox }
	}

	/// Descriptor for the selected environment.
	pub fn descriptor(&self) -> Result<ApiDescriptor> {
		ApiDescriptor::for_environment(self.environment())
	}

	/// Client credentials.
	pub fn credentials(&self) -> Result<ClientCredentials> {
		let credentials = ClientCredentials::new(&self.client_id, &self.redirect_uri)?;

		Ok(match self.client_secret.as_deref() {
			Some(secret) if !secret.is_empty() => credentials.with_client_secret(secret),
			_ => credentials,
		})
	}

	/// PSU context with empty optional values dropped.
	pub fn psu_context(&self) -> PsuContext {
		let mut psu = PsuContext::new(&self.psu_ip_address, &self.psu_user_agent);

		if let Some(id) = non_empty(&self.psu_id) {
			psu = psu.with_psu_id(id);
		}
		if let Some(id) = non_empty(&self.psu_corporate_id) {
			psu = psu.with_corporate_id(id);
		}
		if let Some(context) = non_empty(&self.psu_context_scope) {
			psu = psu.with_scope_context(context);
		}

		psu
	}

	/// Polling intervals with overrides applied. A zero interval is rejected; it would read the
	/// status endpoint in a tight loop.
	pub fn timings(&self) -> Result<ScaTimings> {
		let mut timings = ScaTimings::default();

		if let Some(ms) = self.decoupled_poll_interval_ms {
			timings.decoupled_interval = interval("DecoupledPollIntervalMs", ms)?;
		}
		if let Some(ms) = self.redirect_poll_interval_ms {
			timings.redirect_interval = interval("RedirectPollIntervalMs", ms)?;
		}

		Ok(timings)
	}
}
impl Debug for ClientSettings {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientSettings")
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
			.field("redirect_uri", &self.redirect_uri)
			.field("environment", &self.environment())
			.field("psu_id", &self.psu_id)
			.field("psu_corporate_id", &self.psu_corporate_id)
			.finish_non_exhaustive()
	}
}

fn non_empty(value: &Option<String>) -> Option<&str> {
	value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

fn interval(field: &'static str, ms: u64) -> Result<StdDuration> {
	if ms == 0 {
		return Err(ConfigError::InvalidSetting { field, reason: "must be at least 1 ms" }.into());
	}

	Ok(StdDuration::from_millis(ms))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const SETTINGS: &str = r#"{
		"ClientId": "client-1",
		"ClientSecret": "secret-1",
		"RedirectURI": "https://tpp.example.com/callback",
		"PSUContextScope": "",
		"PSUId": "",
		"PSUCorporateId": "5560000000",
		"UseProductionEnvironment": false,
		"ProductionClientCertificateFile": "",
		"PSUIPAddress": "10.0.0.1",
		"PSUUserAgent": "tpp/1.0",
		"DecoupledPollIntervalMs": 250
	}"#;

	#[test]
	fn settings_document_maps_to_client_inputs() {
		let settings = ClientSettings::from_json_str(SETTINGS).expect("Settings should parse.");
		let psu = settings.psu_context();

		assert_eq!(settings.environment(), Environment::Sandbox);
		assert_eq!(psu.psu_id, None);
		assert_eq!(psu.corporate_id.as_deref(), Some("5560000000"));
		assert_eq!(psu.scope_context(), "corporate");
		assert_eq!(
			settings.timings().expect("Timings should be valid."),
			ScaTimings {
				decoupled_interval: StdDuration::from_millis(250),
				redirect_interval: StdDuration::from_secs(2),
			}
		);
		assert!(!format!("{settings:?}").contains("secret-1"));
	}

	#[test]
	fn settings_errors_name_the_field() {
		let err = ClientSettings::from_json_str(r#"{"ClientId": 7}"#)
			.expect_err("A numeric client id should be rejected.");

		assert!(err.to_string().contains("ClientId"), "Unexpected message: {err}");
	}

	#[test]
	fn zero_poll_intervals_are_rejected() {
		for field in ["DecoupledPollIntervalMs", "RedirectPollIntervalMs"] {
			let raw =
				SETTINGS.replace("\"DecoupledPollIntervalMs\": 250", &format!("\"{field}\": 0"));
			let settings = ClientSettings::from_json_str(&raw).expect("Settings should parse.");
			let err = settings.timings().expect_err("A zero interval should be rejected.");

			assert!(
				matches!(err, Error::Config(ConfigError::InvalidSetting { field: f, .. }) if f == field),
				"Unexpected error: {err:?}"
			);
		}
	}

	#[test]
	fn timings_pick_interval_by_method() {
		let timings = ScaTimings::default();

		assert_eq!(timings.for_method(ScaMethod::Decoupled), StdDuration::from_secs(1));
		assert_eq!(timings.for_method(ScaMethod::OAuthRedirect), StdDuration::from_secs(2));
	}
}
