//! Client-level error types shared across the token, resource, and SCA layers.

// self
use crate::{_prelude::*, aspsp::GrantType, obs::FlowKind, resource::ResourceKind};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;
type JsonPathError = serde_path_to_error::Error<serde_json::Error>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Token endpoint rejected or mangled a grant.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Bank API rejected a resource operation.
	#[error(transparent)]
	Resource(#[from] ResourceError),
	/// SCA method negotiation produced something this client cannot drive.
	#[error(transparent)]
	Negotiation(#[from] NegotiationError),
	/// Temporary failure observed while polling; retried on the next tick.
	#[error(transparent)]
	Poll(#[from] PollError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
}
impl Error {
	/// Returns true when a polling loop should log the failure and try again.
	pub fn is_recoverable(&self) -> bool {
		matches!(self, Self::Poll(_))
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// API descriptor contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// API descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::aspsp::ApiDescriptorError),
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A header value contains characters HTTP does not allow.
	#[error("Header `{name}` has an invalid value.")]
	InvalidHeader {
		/// Header name.
		name: &'static str,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	RequestBody {
		/// Underlying serializer failure.
		#[source]
		source: serde_json::Error,
	},
	/// Settings document is not valid JSON for [`crate::config::ClientSettings`].
	#[error("Settings document is invalid at `{path}`.", path = .source.path())]
	Settings {
		/// Path-aware parsing failure.
		#[source]
		source: JsonPathError,
	},
	/// Settings are missing a value the requested operation needs.
	#[error("Settings are missing `{field}`.")]
	MissingSetting {
		/// Settings key that was absent.
		field: &'static str,
	},
	/// A setting is present but unusable.
	#[error("Setting `{field}` is invalid: {reason}.")]
	InvalidSetting {
		/// Settings key.
		field: &'static str,
		/// Broken rule.
		reason: &'static str,
	},
	/// An identifier failed validation.
	#[error("Identifier is invalid.")]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// Request scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Token endpoint failures. None of them are retried automatically.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// The grant (authorization code, client credentials) was rejected.
	#[error("Token endpoint rejected the {grant} grant: {reason}.")]
	InvalidGrant {
		/// Grant that failed.
		grant: GrantType,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Bank-supplied reason string.
		reason: String,
	},
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed during the {grant} grant: {reason}.")]
	InvalidClient {
		/// Grant that failed.
		grant: GrantType,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Bank-supplied reason string.
		reason: String,
	},
	/// Requested scopes are not granted to this client.
	#[error("Token endpoint refused the requested scope during the {grant} grant: {reason}.")]
	InvalidScope {
		/// Grant that failed.
		grant: GrantType,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Bank-supplied reason string.
		reason: String,
	},
	/// Token endpoint failed for a reason outside the OAuth error vocabulary.
	#[error("Token endpoint is unavailable during the {grant} grant: {reason}.")]
	Unavailable {
		/// Grant that failed.
		grant: GrantType,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Bank- or client-supplied reason string.
		reason: String,
	},
	/// Token endpoint returned a body that is neither a token nor an OAuth error.
	#[error("Token endpoint returned a malformed response during the {grant} grant.")]
	MalformedResponse {
		/// Grant that failed.
		grant: GrantType,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Structured parsing failure.
		#[source]
		source: JsonPathError,
	},
	/// Redirect callback carried a `state` that does not match the one sent.
	#[error("Authorization state mismatch.")]
	StateMismatch,
}
impl AuthError {
	/// Returns true when the bank rejected the grant itself (for example `invalid_grant`).
	pub fn is_invalid_grant(&self) -> bool {
		matches!(self, Self::InvalidGrant { .. })
	}
}

/// Bank API failures while creating or reading resources.
#[derive(Debug, ThisError)]
pub enum ResourceError {
	/// Bank answered with a non-2xx status.
	#[error("The {operation} call failed with HTTP {status}: {body}")]
	Status {
		/// Operation that failed.
		operation: FlowKind,
		/// HTTP status code.
		status: u16,
		/// Raw response body.
		body: String,
	},
	/// Bank answered 2xx with a body that could not be parsed.
	#[error("The {operation} call returned malformed JSON.")]
	MalformedResponse {
		/// Operation that failed.
		operation: FlowKind,
		/// HTTP status code.
		status: u16,
		/// Structured parsing failure.
		#[source]
		source: JsonPathError,
	},
	/// Bank answered 2xx but left out a field the flow depends on.
	#[error("The {operation} response is missing `{field}`.")]
	MissingField {
		/// Operation that failed.
		operation: FlowKind,
		/// JSON field name.
		field: &'static str,
	},
	/// Operation does not apply to this kind of resource.
	#[error("The {operation} operation does not apply to a {kind} resource.")]
	Unsupported {
		/// Operation that was requested.
		operation: FlowKind,
		/// Resource kind it was requested for.
		kind: ResourceKind,
	},
}
impl ResourceError {
	/// HTTP status code, when the failure carries one.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } | Self::MalformedResponse { status, .. } => Some(*status),
			_ => None,
		}
	}
}

/// SCA negotiation failures.
#[derive(Debug, ThisError)]
pub enum NegotiationError {
	/// Bank answered with an approach or payload this client cannot drive.
	#[error("Bank selected an unsupported SCA approach ({}).", .approach.as_deref().unwrap_or("none"))]
	UnsupportedApproach {
		/// Raw `aspsp-sca-approach` header, if present.
		approach: Option<String>,
		/// SCA status reported alongside the approach.
		status: String,
	},
	/// The method policy found nothing it is willing to submit.
	#[error("No acceptable SCA method among {offered:?}.")]
	NoAuthMethod {
		/// Methods declared by the bank.
		offered: Vec<String>,
	},
}

/// Recoverable failures observed while polling.
#[derive(Debug, ThisError)]
pub enum PollError {
	/// Transport failed for this tick.
	#[error("Transport failed while polling.")]
	Transport(#[source] TransportError),
	/// Bank answered with a temporary upstream failure (5xx or 429).
	#[error("The {operation} poll failed with HTTP {status}: {body}")]
	Upstream {
		/// Operation that failed.
		operation: FlowKind,
		/// HTTP status code.
		status: u16,
		/// Raw response body.
		body: String,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the bank.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the bank.")]
	Io(#[from] std::io::Error),
	/// HTTP client failed without a structured error.
	#[error("HTTP client error occurred while calling the bank: {message}.")]
	Other {
		/// Client-supplied description.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
