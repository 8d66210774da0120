//! PSD2 strong customer authentication (SCA) orchestration for third-party providers.
//!
//! The crate creates consents and payments against an open-banking API, negotiates an SCA
//! method with the bank, and drives redirect or decoupled flows until the bank reports a
//! terminal status.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod aspsp;
pub mod auth;
pub mod config;
pub mod error;
pub mod ext;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod poll;
pub mod resource;
pub mod sca;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	mod scripted;

	pub use crate::_prelude::*;
	pub use scripted::*;

	// crates.io
	use oauth2::HttpClientError;
	// self
	use crate::{
		aspsp::{ApiDescriptor, AuthMethodPolicy, DefaultAspspStrategy, DefaultAuthMethodPolicy},
		auth::{BicFi, BearerToken, ScopeSet, TokenSecret},
		error::TransportError,
		ext::{AuthCodeFuture, AuthCodeRequest, AuthCodeSource, Presentation, ScaPresenter},
		flows::{ClientCredentials, Psd2Client},
		http::ResponseMetadata,
		oauth::TransportErrorMapper,
		obs::FlowKind,
		resource::{AspspTarget, PsuContext},
	};
	#[cfg(feature = "reqwest")]
	use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

	/// Client id used by the test helpers.
	pub const TEST_CLIENT_ID: &str = "client-it";
	/// Client secret used by the test helpers.
	pub const TEST_CLIENT_SECRET: &str = "secret-it";
	/// Redirect URI used by the test helpers.
	pub const TEST_REDIRECT_URI: &str = "https://tpp.example.com/callback";

	/// Client type alias used by scripted integration tests.
	pub type ScriptedTestClient = Psd2Client<ScriptedHttpClient, ScriptedTransportErrorMapper>;
	#[cfg(feature = "reqwest")]
	/// Client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestClient = Psd2Client<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Maps scripted transport failures into network errors.
	#[derive(Clone, Debug, Default)]
	pub struct ScriptedTransportErrorMapper;
	impl TransportErrorMapper<ScriptedTransportError> for ScriptedTransportErrorMapper {
		fn map_transport_error(
			&self,
			_kind: FlowKind,
			_metadata: Option<&ResponseMetadata>,
			error: HttpClientError<ScriptedTransportError>,
		) -> Error {
			TransportError::network(error).into()
		}
	}

	/// Presenter that records every presentation for later assertions.
	#[derive(Clone, Debug, Default)]
	pub struct RecordingPresenter(Arc<Mutex<Vec<Presentation>>>);
	impl RecordingPresenter {
		/// Returns a snapshot of the presentations received so far.
		pub fn presentations(&self) -> Vec<Presentation> {
			self.0.lock().clone()
		}
	}
	impl ScaPresenter for RecordingPresenter {
		fn present(&self, presentation: &Presentation) {
			self.0.lock().push(presentation.clone());
		}
	}

	/// Code source that returns a fixed authorization code (or none) and counts requests.
	#[derive(Clone, Debug, Default)]
	pub struct FixedAuthCode {
		code: Option<String>,
		requests: Arc<Mutex<Vec<AuthCodeRequest>>>,
	}
	impl FixedAuthCode {
		/// Always answers with `code`.
		pub fn new(code: impl Into<String>) -> Self {
			Self { code: Some(code.into()), requests: Default::default() }
		}

		/// Never yields a code, as if the user abandoned the redirect.
		pub fn none() -> Self {
			Self::default()
		}

		/// Returns the requests received so far.
		pub fn requests(&self) -> Vec<AuthCodeRequest> {
			self.requests.lock().clone()
		}
	}
	impl AuthCodeSource for FixedAuthCode {
		fn await_code<'a>(&'a self, request: &'a AuthCodeRequest) -> AuthCodeFuture<'a> {
			self.requests.lock().push(request.clone());

			let code = self.code.clone();

			Box::pin(async move { code })
		}
	}

	/// Descriptor pointing at the scripted transport hosts.
	pub fn scripted_descriptor() -> ApiDescriptor {
		ApiDescriptor::builder()
			.token_endpoint(
				Url::parse(SCRIPTED_TOKEN_URL).expect("Scripted token endpoint should parse."),
			)
			.api_base(Url::parse(SCRIPTED_API_BASE).expect("Scripted API base should parse."))
			.build()
			.expect("Scripted descriptor should build successfully.")
	}

	/// Builds a client on top of a scripted transport with fast polling intervals.
	pub fn build_scripted_client(http_client: ScriptedHttpClient) -> ScriptedTestClient {
		let policy: Arc<dyn AuthMethodPolicy> = Arc::new(DefaultAuthMethodPolicy::default());

		Psd2Client::with_http_client(
			scripted_descriptor(),
			Arc::new(DefaultAspspStrategy),
			policy,
			test_credentials(),
			http_client,
			Arc::new(ScriptedTransportErrorMapper),
		)
		.with_timings(crate::config::ScaTimings::uniform(StdDuration::from_millis(5)))
	}

	/// Client credentials shared by the test helpers.
	pub fn test_credentials() -> ClientCredentials {
		ClientCredentials::new(TEST_CLIENT_ID, TEST_REDIRECT_URI)
			.expect("Test credentials should be valid.")
			.with_client_secret(TEST_CLIENT_SECRET)
	}

	/// Bank target used across tests.
	pub fn test_target() -> AspspTarget {
		AspspTarget::new(BicFi::new("ESSESESS").expect("Test BIC should be valid."))
	}

	/// Private PSU context used across tests.
	pub fn test_psu() -> PsuContext {
		PsuContext::new("192.168.0.1", "psd2-sca-tests/1.0")
	}

	/// Bearer token used when a test skips the token endpoint.
	pub fn test_token(scope: &str) -> BearerToken {
		BearerToken::new(
			TokenSecret::new("token-it"),
			ScopeSet::parse(scope).expect("Test scope should be valid."),
		)
	}

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Constructs a [`Psd2Client`] backed by the reqwest transport used across integration
	/// tests.
	#[cfg(feature = "reqwest")]
	pub fn build_reqwest_test_client(descriptor: ApiDescriptor) -> ReqwestTestClient {
		let policy: Arc<dyn AuthMethodPolicy> = Arc::new(DefaultAuthMethodPolicy::default());

		Psd2Client::with_http_client(
			descriptor,
			Arc::new(DefaultAspspStrategy),
			policy,
			test_credentials(),
			test_reqwest_http_client(),
			Arc::new(ReqwestTransportErrorMapper),
		)
		.with_timings(crate::config::ScaTimings::uniform(StdDuration::from_millis(5)))
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use tokio_util::sync::CancellationToken;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use tokio_util::sync::CancellationToken;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
