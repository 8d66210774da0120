//! High-level operations powered by the token facade and the JSON API transport.
//!
//! [`Psd2Client`] owns everything a flow needs that outlives a single resource: the
//! transport, the endpoint descriptor, the bank strategy hooks, the client credentials, and
//! the polling cadence. Per-flow state (token, resource, authorisation) is passed explicitly
//! through every call.

pub mod orchestrate;
pub mod redirect;

mod common;
mod negotiate;
mod resource;
mod token;

pub use orchestrate::*;
pub use redirect::*;

// self
use crate::{
	_prelude::*,
	aspsp::{ApiDescriptor, AspspStrategy, AuthMethodPolicy},
	auth::TokenSecret,
	config::ScaTimings,
	error::ConfigError,
	http::BankHttpClient,
	oauth::TransportErrorMapper,
};
#[cfg(feature = "reqwest")]
use crate::{
	aspsp::{DefaultAspspStrategy, DefaultAuthMethodPolicy},
	config::ClientSettings,
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport stack.
pub type ReqwestPsd2Client = Psd2Client<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// OAuth client registration used by both grants.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
	/// OAuth client id.
	pub client_id: String,
	/// Client secret for confidential authentication.
	pub client_secret: Option<TokenSecret>,
	/// Redirect URI registered for the client.
	pub redirect_uri: String,
}
impl ClientCredentials {
	/// Validates the client id and redirect URI.
	pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Result<Self> {
		let client_id = client_id.into();
		let redirect_uri = redirect_uri.into();

		if client_id.trim().is_empty() {
			return Err(ConfigError::MissingSetting { field: "ClientId" }.into());
		}

		Url::parse(&redirect_uri).map_err(|source| ConfigError::InvalidRedirect { source })?;

		Ok(Self { client_id, client_secret: None, redirect_uri })
	}

	/// Attaches the client secret.
	pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(TokenSecret::new(secret));

		self
	}
}
impl Debug for ClientCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentials")
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("redirect_uri", &self.redirect_uri)
			.finish()
	}
}

/// Drives token, resource, negotiation, and SCA calls against one API descriptor.
#[derive(Clone)]
pub struct Psd2Client<C, M>
where
	C: ?Sized + BankHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Token endpoint and API base.
	pub descriptor: ApiDescriptor,
	/// Token request decoration and error classification.
	pub strategy: Arc<dyn AspspStrategy>,
	/// SCA method selection.
	pub auth_policy: Arc<dyn AuthMethodPolicy>,
	/// OAuth client registration.
	pub credentials: ClientCredentials,
	/// Polling intervals.
	pub timings: ScaTimings,
}
impl<C, M> Psd2Client<C, M>
where
	C: ?Sized + BankHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		descriptor: ApiDescriptor,
		strategy: Arc<dyn AspspStrategy>,
		auth_policy: Arc<dyn AuthMethodPolicy>,
		credentials: ClientCredentials,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			descriptor,
			strategy,
			auth_policy,
			credentials,
			timings: ScaTimings::default(),
		}
	}

	/// Overrides the polling intervals.
	pub fn with_timings(mut self, timings: ScaTimings) -> Self {
		self.timings = timings;

		self
	}

	/// Replaces the token strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn AspspStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// Replaces the SCA method policy.
	pub fn with_auth_policy(mut self, auth_policy: Arc<dyn AuthMethodPolicy>) -> Self {
		self.auth_policy = auth_policy;

		self
	}
}
#[cfg(feature = "reqwest")]
impl Psd2Client<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a client with its own reqwest transport and the default hooks.
	pub fn new(descriptor: ApiDescriptor, credentials: ClientCredentials) -> Result<Self> {
		Ok(Self::with_http_client(
			descriptor,
			Arc::new(DefaultAspspStrategy),
			Arc::new(DefaultAuthMethodPolicy::default()),
			credentials,
			ReqwestHttpClient::new()?,
			Arc::new(ReqwestTransportErrorMapper),
		))
	}

	/// Creates a client from a settings document.
	///
	/// `identity_pem` is the client certificate plus key. Production requires it; the sandbox
	/// accepts calls without one.
	pub fn from_settings(settings: &ClientSettings, identity_pem: Option<&[u8]>) -> Result<Self> {
		let http_client = match identity_pem {
			Some(pem) => ReqwestHttpClient::mutual_tls(pem)?,
			None if settings.use_production_environment =>
				return Err(
					ConfigError::MissingSetting { field: "ProductionClientCertificateFile" }.into()
				),
			None => ReqwestHttpClient::new()?,
		};

		let timings = settings.timings()?;

		Ok(Self::with_http_client(
			settings.descriptor()?,
			Arc::new(DefaultAspspStrategy),
			Arc::new(DefaultAuthMethodPolicy::default()),
			settings.credentials()?,
			http_client,
			Arc::new(ReqwestTransportErrorMapper),
		)
		.with_timings(timings))
	}
}
impl<C, M> Debug for Psd2Client<C, M>
where
	C: ?Sized + BankHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Psd2Client")
			.field("descriptor", &self.descriptor)
			.field("credentials", &self.credentials)
			.field("timings", &self.timings)
			.finish()
	}
}
