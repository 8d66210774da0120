//! Builder and validation for [`ApiDescriptor`](crate::aspsp::ApiDescriptor).

// std
use std::net::IpAddr;
// self
use crate::{
	_prelude::*,
	aspsp::{ApiDescriptor, ClientAuthMethod},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ApiDescriptorError {
	/// Token endpoint is mandatory for every flow.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// API base is mandatory for every resource call.
	#[error("Missing API base URL.")]
	MissingApiBase,
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
}

/// Builder for [`ApiDescriptor`] values.
#[derive(Debug, Default)]
pub struct ApiDescriptorBuilder {
	/// Token endpoint used for both grants.
	pub token_endpoint: Option<Url>,
	/// Base URL of the PSD2 API.
	pub api_base: Option<Url>,
	/// Client authentication mode for the token endpoint.
	pub client_auth_method: ClientAuthMethod,
}
impl ApiDescriptorBuilder {
	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the API base URL.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Overrides the client authentication mode.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ApiDescriptor, ApiDescriptorError> {
		let token_endpoint = self.token_endpoint.ok_or(ApiDescriptorError::MissingTokenEndpoint)?;
		let api_base = self.api_base.ok_or(ApiDescriptorError::MissingApiBase)?;

		validate_endpoint("token", &token_endpoint)?;
		validate_endpoint("API base", &api_base)?;

		Ok(ApiDescriptor { token_endpoint, api_base, client_auth_method: self.client_auth_method })
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ApiDescriptorError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(ApiDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
		Some(url::Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
		None => false,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(raw: &str) -> Url {
		Url::parse(raw).expect("Fixture URL should parse.")
	}

	#[test]
	fn rejects_plain_http_outside_loopback() {
		let err = ApiDescriptor::builder()
			.token_endpoint(url("http://auth.example.com/connect/token"))
			.api_base(url("https://api.example.com"))
			.build()
			.expect_err("Remote HTTP endpoints should be rejected.");

		assert_eq!(
			err,
			ApiDescriptorError::InsecureEndpoint {
				endpoint: "token",
				url: "http://auth.example.com/connect/token".into(),
			}
		);
	}

	#[test]
	fn allows_loopback_http() {
		for base in ["http://127.0.0.1:8080", "http://[::1]:8080", "http://localhost:1"] {
			ApiDescriptor::builder()
				.token_endpoint(url(&format!("{base}/token")))
				.api_base(url(base))
				.build()
				.expect("Loopback HTTP endpoints should be accepted.");
		}
	}

	#[test]
	fn requires_both_endpoints() {
		assert_eq!(
			ApiDescriptor::builder().api_base(url("https://api.example.com")).build(),
			Err(ApiDescriptorError::MissingTokenEndpoint)
		);
		assert_eq!(
			ApiDescriptor::builder().token_endpoint(url("https://auth.example.com/t")).build(),
			Err(ApiDescriptorError::MissingApiBase)
		);
	}
}
