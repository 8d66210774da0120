//! Bank-facing descriptors (data), strategies, and method policies (behavior).
//!
//! `builder` exposes a validated [`ApiDescriptor`] covering the token endpoint, the API base,
//! and the client authentication mode. `strategy` defines [`AspspStrategy`], the hook that
//! classifies token endpoint failures, and `policy` defines [`AuthMethodPolicy`], the hook
//! that picks an SCA method from the ones a bank declares.

pub mod builder;
pub mod grant;
pub mod policy;
pub mod strategy;

pub use builder::*;
pub use grant::*;
pub use policy::*;
pub use strategy::*;

// self
use crate::{_prelude::*, config::Environment, error::ConfigError};

/// Client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// Form POST body parameters for `client_id`/`client_secret`.
	#[default]
	ClientSecretPost,
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
}

/// Immutable endpoint set consumed by every flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDescriptor {
	/// Token endpoint used for both grants.
	pub token_endpoint: Url,
	/// Base URL the PSD2 API paths are appended to.
	pub api_base: Url,
	/// Client authentication mode for the token endpoint.
	pub client_auth_method: ClientAuthMethod,
}
impl ApiDescriptor {
	/// Creates a new builder.
	pub fn builder() -> ApiDescriptorBuilder {
		ApiDescriptorBuilder::default()
	}

	/// Descriptor for the platform's sandbox or production hosts.
	pub fn for_environment(environment: Environment) -> Result<Self> {
		let token_endpoint = Url::parse(environment.auth_base())
			.and_then(|base| base.join("/connect/token"))
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let api_base = Url::parse(environment.api_base())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;

		Ok(Self::builder()
			.token_endpoint(token_endpoint)
			.api_base(api_base)
			.build()
			.map_err(ConfigError::from)?)
	}

	/// Resolves an API path (starting with `/`) against the API base, keeping any base path.
	pub fn api_url(&self, path: &str) -> Result<Url> {
		let base = self.api_base.as_str().trim_end_matches('/');

		Url::parse(&format!("{base}{path}"))
			.map_err(|source| ConfigError::InvalidDescriptor { source }.into())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn environments_resolve_platform_hosts() {
		let sandbox = ApiDescriptor::for_environment(Environment::Sandbox)
			.expect("Sandbox descriptor should build.");
		let production = ApiDescriptor::for_environment(Environment::Production)
			.expect("Production descriptor should build.");

		assert_eq!(
			sandbox.token_endpoint.as_str(),
			"https://auth.sandbox.openbankingplatform.com/connect/token"
		);
		assert_eq!(production.api_base.as_str(), "https://api.openbankingplatform.com/");
	}

	#[test]
	fn api_url_keeps_base_path() {
		let descriptor = ApiDescriptor::builder()
			.token_endpoint(Url::parse("https://auth.example.com/token").expect("URL should parse."))
			.api_base(Url::parse("https://api.example.com/gateway/").expect("URL should parse."))
			.build()
			.expect("Descriptor should build.");
		let url = descriptor
			.api_url("/psd2/consent/v1/consents")
			.expect("API URL should resolve.");

		assert_eq!(url.as_str(), "https://api.example.com/gateway/psd2/consent/v1/consents");
	}
}
