//! Transport primitives shared by token and API calls.
//!
//! The module exposes [`BankHttpClient`] alongside [`ResponseMetadata`] and
//! [`ResponseMetadataSlot`] so callers can plug in custom HTTP stacks without losing the
//! instrumentation hooks. Implementations call [`ResponseMetadataSlot::take`] before
//! dispatching a request and [`ResponseMetadataSlot::store`] once an HTTP status is known, so
//! error mapping sees consistent metadata.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{HeaderMap, HeaderName},
};
// self
use crate::_prelude::*;

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Abstraction over HTTP transports used for both token exchanges and API calls.
///
/// The trait is the crate's only dependency on an HTTP stack. Handles returned by
/// [`with_metadata`](Self::with_metadata) must own whatever state they need so their request
/// futures stay `Send` for the whole in-flight operation.
pub trait BankHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle tied to a [`ResponseMetadataSlot`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds an [`AsyncHttpClient`] handle that records outcomes in `slot`.
	///
	/// # Metadata Contract
	///
	/// - Call [`ResponseMetadataSlot::take`] before submitting the HTTP request so stale
	///   information never leaks across polls.
	/// - Once a response (successful or not) is available, save its status with
	///   [`ResponseMetadataSlot::store`].
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;
}

/// Metadata from the most recent HTTP response, used by error mapping and logs.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code, if a response arrived.
	pub status: Option<u16>,
	/// `X-Request-ID` echoed by the bank, if any.
	pub request_id: Option<String>,
}
impl ResponseMetadata {
	/// Reads the metadata carried by a response.
	pub fn from_response(response: &HttpResponse) -> Self {
		Self::from_parts(response.status().as_u16(), response.headers())
	}

	/// Builds metadata from a status code and response headers.
	pub fn from_parts(status: u16, headers: &HeaderMap) -> Self {
		Self {
			status: Some(status),
			request_id: headers
				.get(&REQUEST_ID_HEADER)
				.and_then(|value| value.to_str().ok())
				.map(ToOwned::to_owned),
		}
	}
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
///
/// Every call gets a fresh slot, read right after the transport resolves.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Handle wrapper that adds fixed headers to every request before delegating.
///
/// Token requests built by `oauth2` have no header hook, so binding headers such as
/// `X-ConsentId` travel through this wrapper.
pub(crate) struct BoundHandle<H> {
	inner: H,
	headers: HeaderMap,
}
impl<H> BoundHandle<H> {
	pub(crate) fn new(inner: H, headers: HeaderMap) -> Self {
		Self { inner, headers }
	}
}
impl<'c, H> AsyncHttpClient<'c> for BoundHandle<H>
where
	H: AsyncHttpClient<'c>,
{
	type Error = H::Error;
	type Future = H::Future;

	fn call(&'c self, mut request: HttpRequest) -> Self::Future {
		request.headers_mut().extend(self.headers.clone());

		self.inner.call(request)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Bank APIs answer directly; redirect following must stay disabled on any custom client so
/// a `3xx` surfaces as a status instead of a silent hop.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client with redirects disabled.
	pub fn new() -> Result<Self> {
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.map_err(crate::error::ConfigError::from)?;

		Ok(Self(client))
	}

	/// Builds a client that presents `identity_pem` (certificate chain plus private key) for
	/// mutual TLS.
	pub fn mutual_tls(identity_pem: &[u8]) -> Result<Self> {
		let identity =
			reqwest::Identity::from_pem(identity_pem).map_err(crate::error::ConfigError::from)?;
		let client = ReqwestClient::builder()
			.identity(identity)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.map_err(crate::error::ConfigError::from)?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	pub(crate) fn instrumented(&self, slot: ResponseMetadataSlot) -> InstrumentedHandle {
		InstrumentedHandle::new(self.0.clone(), slot)
	}
}
#[cfg(feature = "reqwest")]
impl BankHttpClient for ReqwestHttpClient {
	type Handle = InstrumentedHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		self.instrumented(slot)
	}
}

#[cfg(feature = "reqwest")]
struct InstrumentedHttpClient {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}

/// Handle returned by [`ReqwestHttpClient`] that satisfies [`BankHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
#[cfg(feature = "reqwest")]
impl InstrumentedHandle {
	fn new(client: ReqwestClient, slot: ResponseMetadataSlot) -> Self {
		Self(Arc::new(InstrumentedHttpClient { client, slot }))
	}
}
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			let response = client
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			client.slot.store(ResponseMetadata::from_parts(status.as_u16(), &headers));

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::{HeaderValue, Method, Request, Response, StatusCode};
	// self
	use super::*;

	#[derive(Clone, Default)]
	struct EchoHeaders(Arc<Mutex<Option<HeaderMap>>>);
	impl<'c> AsyncHttpClient<'c> for EchoHeaders {
		type Error = HttpClientError<std::io::Error>;
		type Future =
			Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

		fn call(&'c self, request: HttpRequest) -> Self::Future {
			*self.0.lock() = Some(request.headers().clone());

			Box::pin(async move {
				let mut response = Response::new(Vec::new());

				*response.status_mut() = StatusCode::ACCEPTED;
				response.headers_mut().insert(REQUEST_ID_HEADER, HeaderValue::from_static("r-1"));

				Ok(response)
			})
		}
	}

	#[tokio::test]
	async fn bound_handle_adds_headers_and_metadata_reads_request_id() {
		let echo = EchoHeaders::default();
		let mut headers = HeaderMap::new();

		headers.insert("x-consentid", HeaderValue::from_static("c1"));

		let handle = BoundHandle::new(echo.clone(), headers);
		let request = Request::builder()
			.method(Method::POST)
			.uri("https://auth.example.com/connect/token")
			.body(Vec::new())
			.expect("Request fixture should build.");
		let response = handle.call(request).await.expect("Echo transport should succeed.");
		let seen = echo.0.lock().clone().expect("Headers should be recorded.");
		let meta = ResponseMetadata::from_response(&response);

		assert_eq!(seen.get("x-consentid").and_then(|v| v.to_str().ok()), Some("c1"));
		assert_eq!(meta.status, Some(202));
		assert_eq!(meta.request_id.as_deref(), Some("r-1"));
	}

	#[test]
	fn slot_take_clears_previous_metadata() {
		let slot = ResponseMetadataSlot::default();

		slot.store(ResponseMetadata { status: Some(503), request_id: None });

		assert_eq!(slot.take().and_then(|meta| meta.status), Some(503));
		assert!(slot.take().is_none());
	}
}
