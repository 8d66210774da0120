//! Request plumbing shared by every API call (headers, request ids, status checks, parsing).

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest, HttpResponse,
	http::{
		HeaderMap, HeaderName, HeaderValue, Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use serde::de::DeserializeOwned;
use uuid::Uuid;
// self
use crate::{
	_prelude::*,
	auth::BearerToken,
	error::{ConfigError, ResourceError},
	flows::Psd2Client,
	http::{BankHttpClient, REQUEST_ID_HEADER, ResponseMetadataSlot},
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome},
	resource::{AspspTarget, AuthorizableResource, PsuContext},
};

pub(crate) const PSU_ID: &str = "psu-id";
pub(crate) const AFFILIATED_ASPSP_ID: &str = "x-affiliatedaspsp-id";
pub(crate) const CONSENT_ID: &str = "consent-id";

const JSON: &str = "application/json";

/// One call against the PSD2 API, carrying the headers every bank expects.
pub(crate) struct ApiRequest<'a> {
	kind: FlowKind,
	method: Method,
	path: String,
	token: &'a BearerToken,
	target: &'a AspspTarget,
	psu: &'a PsuContext,
	headers: Vec<(&'static str, String)>,
	body: Option<Vec<u8>>,
}
impl<'a> ApiRequest<'a> {
	pub(crate) fn new(
		kind: FlowKind,
		method: Method,
		path: impl Into<String>,
		token: &'a BearerToken,
		target: &'a AspspTarget,
		psu: &'a PsuContext,
	) -> Self {
		Self {
			kind,
			method,
			path: path.into(),
			token,
			target,
			psu,
			headers: Vec::new(),
			body: None,
		}
	}

	/// Request against an existing resource; adds `PSU-ID` when the PSU context has one.
	pub(crate) fn for_resource(
		kind: FlowKind,
		method: Method,
		path: impl Into<String>,
		token: &'a BearerToken,
		resource: &'a AuthorizableResource,
	) -> Self {
		let request = Self::new(kind, method, path, token, &resource.target, &resource.psu);

		match resource.psu.psu_id.as_deref() {
			Some(psu_id) => request.header(PSU_ID, psu_id),
			None => request,
		}
	}

	pub(crate) fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
		self.headers.push((name, value.into()));

		self
	}

	pub(crate) fn json<T>(mut self, body: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		self.body =
			Some(serde_json::to_vec(body).map_err(|source| ConfigError::RequestBody { source })?);

		Ok(self)
	}

	/// Empty body still labeled as JSON; some banks reject a bare POST.
	pub(crate) fn empty_json(mut self) -> Self {
		self.body = Some(Vec::new());

		self
	}

	fn into_http(self, url: &Url) -> Result<HttpRequest> {
		let mut headers = HeaderMap::new();

		headers.insert(ACCEPT, HeaderValue::from_static(JSON));
		headers.insert(AUTHORIZATION, header_value("authorization", self.token.authorization_value())?);
		headers.insert(REQUEST_ID_HEADER, header_value("x-request-id", Uuid::new_v4().to_string())?);
		headers.insert(
			HeaderName::from_static("x-bicfi"),
			header_value("x-bicfi", self.target.bic_fi.to_string())?,
		);
		headers.insert(
			HeaderName::from_static("psu-ip-address"),
			header_value("psu-ip-address", &self.psu.ip_address)?,
		);
		headers.insert(
			HeaderName::from_static("psu-user-agent"),
			header_value("psu-user-agent", &self.psu.user_agent)?,
		);
		headers.insert(
			HeaderName::from_static("tpp-redirect-preferred"),
			HeaderValue::from_static("false"),
		);

		if let Some(corporate_id) = self.psu.corporate_id.as_deref() {
			headers.insert(
				HeaderName::from_static("psu-corporate-id"),
				header_value("psu-corporate-id", corporate_id)?,
			);
		}
		for (name, value) in self.headers {
			headers.insert(HeaderName::from_static(name), header_value(name, value)?);
		}

		let body = match self.body {
			Some(body) => {
				headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));

				body
			},
			None => Vec::new(),
		};
		let mut request = Request::builder()
			.method(self.method)
			.uri(url.as_str())
			.body(body)
			.map_err(ConfigError::from)?;

		*request.headers_mut() = headers;

		Ok(request)
	}
}

impl<C, M> Psd2Client<C, M>
where
	C: ?Sized + BankHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Sends `request` and fails with [`ResourceError::Status`] on any non-2xx answer.
	pub(crate) async fn send_api(&self, request: ApiRequest<'_>) -> Result<HttpResponse> {
		let kind = request.kind;
		let url = self.descriptor.api_url(&request.path)?;
		let http_request = request.into_http(&url)?;
		let slot = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(slot.clone());
		let response = handle.call(http_request).await.map_err(|err| {
			self.transport_mapper.map_transport_error(kind, slot.take().as_ref(), err)
		})?;

		ensure_success(kind, response)
	}
}

fn header_value(name: &'static str, value: impl AsRef<str>) -> Result<HeaderValue> {
	HeaderValue::from_str(value.as_ref()).map_err(|_| ConfigError::InvalidHeader { name }.into())
}

pub(crate) fn ensure_success(kind: FlowKind, response: HttpResponse) -> Result<HttpResponse> {
	if response.status().is_success() {
		return Ok(response);
	}

	Err(ResourceError::Status {
		operation: kind,
		status: response.status().as_u16(),
		body: String::from_utf8_lossy(response.body()).into_owned(),
	}
	.into())
}

/// Parses a JSON body, keeping the failing path for diagnostics.
pub(crate) fn parse_json<T>(kind: FlowKind, response: &HttpResponse) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut de = serde_json::Deserializer::from_slice(response.body());

	serde_path_to_error::deserialize(&mut de).map_err(|source| {
		ResourceError::MalformedResponse {
			operation: kind,
			status: response.status().as_u16(),
			source,
		}
		.into()
	})
}

/// Records the success or failure counter for a finished operation.
pub(crate) fn record_result<T>(kind: FlowKind, result: &Result<T>) {
	match result {
		Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
		Err(_) => obs::record_flow_outcome(kind, FlowOutcome::Failure),
	}
}

/// Reads a response header as text.
pub(crate) fn response_header<'r>(response: &'r HttpResponse, name: &str) -> Option<&'r str> {
	response.headers().get(name).and_then(|value| value.to_str().ok())
}
