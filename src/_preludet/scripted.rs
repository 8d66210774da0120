//! In-process transport that answers from per-route scripts and records every request.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	http::{BankHttpClient, ResponseMetadata, ResponseMetadataSlot},
};

/// Token endpoint served by [`ScriptedHttpClient`] in tests.
pub const SCRIPTED_TOKEN_URL: &str = "https://auth.scripted.test/connect/token";
/// API base served by [`ScriptedHttpClient`] in tests.
pub const SCRIPTED_API_BASE: &str = "https://api.scripted.test";

/// Failure injected by [`ScriptedReply::failure`].
#[derive(Debug, ThisError)]
#[error("Scripted transport failure: {0}")]
pub struct ScriptedTransportError(pub String);

/// One scripted answer.
#[derive(Clone, Debug)]
pub enum ScriptedReply {
	/// HTTP response.
	Response {
		/// Status code.
		status: u16,
		/// Response headers.
		headers: Vec<(String, String)>,
		/// Raw body.
		body: Vec<u8>,
	},
	/// Transport failure before any response arrives.
	Failure(String),
}
impl ScriptedReply {
	/// JSON response with `content-type: application/json`.
	pub fn json(status: u16, body: Value) -> Self {
		Self::Response {
			status,
			headers: vec![("content-type".into(), "application/json".into())],
			body: body.to_string().into_bytes(),
		}
	}

	/// Response with an arbitrary text body and no content type.
	pub fn text(status: u16, body: impl Into<String>) -> Self {
		Self::Response { status, headers: Vec::new(), body: body.into().into_bytes() }
	}

	/// Transport failure with `message`.
	pub fn failure(message: impl Into<String>) -> Self {
		Self::Failure(message.into())
	}

	/// Adds a response header. Header names must be lowercase.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		if let Self::Response { headers, .. } = &mut self {
			headers.push((name.into(), value.into()));
		}

		self
	}
}

/// Request observed by [`ScriptedHttpClient`].
#[derive(Clone, Debug)]
pub struct RecordedRequest {
	/// HTTP method.
	pub method: Method,
	/// URL path without the query.
	pub path: String,
	/// Raw query string, if any.
	pub query: Option<String>,
	/// Request headers.
	pub headers: HeaderMap,
	/// Raw request body.
	pub body: Vec<u8>,
}
impl RecordedRequest {
	/// Returns a header value as text.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|value| value.to_str().ok())
	}

	/// Returns the body parsed as `application/x-www-form-urlencoded` pairs.
	pub fn form(&self) -> Vec<(String, String)> {
		url::form_urlencoded::parse(&self.body).into_owned().collect()
	}
}

#[derive(Debug, Default)]
struct ScriptState {
	routes: HashMap<(Method, String), VecDeque<ScriptedReply>>,
	requests: Vec<RecordedRequest>,
}

/// Transport that replays scripted replies per `(method, path)`.
///
/// Replies queued for a route are consumed in order and the last one repeats forever.
/// Unscripted routes answer `404`. Clones share the same script and request log.
#[derive(Clone, Debug, Default)]
pub struct ScriptedHttpClient(Arc<Mutex<ScriptState>>);
impl ScriptedHttpClient {
	/// Creates an empty script.
	pub fn new() -> Self {
		Self::default()
	}

	/// Queues `reply` for `method` and `path`.
	pub fn on(&self, method: Method, path: impl Into<String>, reply: ScriptedReply) -> &Self {
		self.0.lock().routes.entry((method, path.into())).or_default().push_back(reply);

		self
	}

	/// Returns every request received so far.
	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.0.lock().requests.clone()
	}

	/// Returns the requests received for one route.
	pub fn requests_to(&self, method: &Method, path: &str) -> Vec<RecordedRequest> {
		self.0
			.lock()
			.requests
			.iter()
			.filter(|request| request.method == *method && request.path == path)
			.cloned()
			.collect()
	}

	/// Counts the requests received for one route.
	pub fn count(&self, method: &Method, path: &str) -> usize {
		self.requests_to(method, path).len()
	}

	fn answer(&self, request: HttpRequest) -> ScriptedReply {
		let (parts, body) = request.into_parts();
		let path = parts.uri.path().to_owned();
		let mut state = self.0.lock();

		state.requests.push(RecordedRequest {
			method: parts.method.clone(),
			path: path.clone(),
			query: parts.uri.query().map(ToOwned::to_owned),
			headers: parts.headers,
			body,
		});

		let Some(queue) = state.routes.get_mut(&(parts.method, path)) else {
			return ScriptedReply::text(404, "not scripted");
		};

		if queue.len() > 1 {
			queue.pop_front().unwrap_or_else(|| ScriptedReply::text(404, "not scripted"))
		} else {
			queue.front().cloned().unwrap_or_else(|| ScriptedReply::text(404, "not scripted"))
		}
	}
}
impl BankHttpClient for ScriptedHttpClient {
	type Handle = ScriptedHandle;
	type TransportError = ScriptedTransportError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		ScriptedHandle { client: self.clone(), slot }
	}
}

/// [`AsyncHttpClient`] handle issued by [`ScriptedHttpClient`].
#[derive(Clone, Debug)]
pub struct ScriptedHandle {
	client: ScriptedHttpClient,
	slot: ResponseMetadataSlot,
}
impl<'c> AsyncHttpClient<'c> for ScriptedHandle {
	type Error = HttpClientError<ScriptedTransportError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		self.slot.take();

		let result = match self.client.answer(request) {
			ScriptedReply::Failure(message) =>
				Err(HttpClientError::Reqwest(Box::new(ScriptedTransportError(message)))),
			ScriptedReply::Response { status, headers, body } => {
				let mut response = HttpResponse::new(body);

				*response.status_mut() =
					StatusCode::from_u16(status).expect("Scripted status should be valid.");

				for (name, value) in headers {
					response.headers_mut().insert(
						HeaderName::try_from(name)
							.expect("Scripted header name should be valid."),
						HeaderValue::try_from(value).expect("Scripted header value should be valid."),
					);
				}

				self.slot.store(ResponseMetadata::from_response(&response));

				Ok(response)
			},
		};

		Box::pin(async move { result })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn request(method: Method, uri: &str) -> HttpRequest {
		let mut request = HttpRequest::new(Vec::new());

		*request.method_mut() = method;
		*request.uri_mut() = uri.parse().expect("Test URI should parse.");

		request
	}

	#[tokio::test]
	async fn last_reply_repeats_and_unknown_routes_are_404() {
		let client = ScriptedHttpClient::new();

		client
			.on(Method::GET, "/s", ScriptedReply::json(200, serde_json::json!({ "n": 1 })))
			.on(Method::GET, "/s", ScriptedReply::json(200, serde_json::json!({ "n": 2 })));

		let handle = client.with_metadata(ResponseMetadataSlot::default());
		let mut bodies = Vec::new();

		for _ in 0..3 {
			let response = handle
				.call(request(Method::GET, "https://api.scripted.test/s?x=1"))
				.await
				.expect("Scripted call should succeed.");

			bodies.push(String::from_utf8(response.into_body()).expect("Body should be UTF-8."));
		}

		assert_eq!(bodies, ["{\"n\":1}", "{\"n\":2}", "{\"n\":2}"]);
		assert_eq!(client.count(&Method::GET, "/s"), 3);
		assert_eq!(client.requests()[0].query.as_deref(), Some("x=1"));

		let missing = handle
			.call(request(Method::POST, "https://api.scripted.test/s"))
			.await
			.expect("Unscripted call should still answer.");

		assert_eq!(missing.status(), StatusCode::NOT_FOUND);
	}
}
