//! OAuth client facade over the token endpoint.
//!
//! Both grants go through the `oauth2` crate. Binding headers for the authorization-code
//! exchange ride on a wrapped transport handle, and every failure is classified through the
//! caller's [`AspspStrategy`].

pub use oauth2;

// std
use std::borrow::Cow;
// crates.io
use oauth2::{
	AuthType, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, RedirectUrl, RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
	http::{HeaderMap, HeaderName, HeaderValue},
};
// self
use crate::{
	_prelude::*,
	aspsp::{
		ApiDescriptor, AspspStrategy, ClientAuthMethod, GrantType, TokenErrorContext,
		TokenErrorKind,
	},
	auth::{BearerToken, ScopeSet, TokenSecret},
	error::{AuthError, ConfigError, TransportError},
	http::{BankHttpClient, BoundHandle, ResponseMetadata, ResponseMetadataSlot},
	obs::FlowKind,
	resource::AuthorisationBinding,
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a crate error.
	fn map_transport_error(
		&self,
		kind: FlowKind,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		kind: FlowKind,
		_meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) if inner.is_builder() => ConfigError::from(*inner).into(),
			HttpClientError::Reqwest(inner) => TransportError::from(*inner).into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => TransportError::Other { message }.into(),
			_ => TransportError::Other { message: format!("{kind} transport failed") }.into(),
		}
	}
}

pub(crate) trait OAuth2Facade {
	fn exchange_client_credentials<'a>(
		&'a self,
		strategy: &'a dyn AspspStrategy,
		scope: &'a ScopeSet,
		extra_params: &'a [(String, String)],
	) -> FacadeFuture<'a, BearerToken>;

	fn exchange_authorization_code<'a>(
		&'a self,
		strategy: &'a dyn AspspStrategy,
		binding: &'a AuthorisationBinding,
		scope: &'a ScopeSet,
		code: &'a str,
		extra_params: &'a [(String, String)],
	) -> FacadeFuture<'a, BearerToken>;
}

pub(crate) struct BasicFacade<C, M>
where
	C: ?Sized + BankHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredBasicClient,
	redirect_uri: RedirectUrl,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> BasicFacade<C, M>
where
	C: ?Sized + BankHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_descriptor(
		descriptor: &ApiDescriptor,
		client_id: &str,
		client_secret: Option<&str>,
		redirect_uri: &str,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Result<Self> {
		let token_url = TokenUrl::new(descriptor.token_endpoint.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let redirect_uri = RedirectUrl::new(redirect_uri.to_owned())
			.map_err(|source| ConfigError::InvalidRedirect { source })?;
		let mut oauth_client =
			BasicClient::new(ClientId::new(client_id.to_owned())).set_token_uri(token_url);

		if let Some(secret) = client_secret {
			oauth_client = oauth_client.set_client_secret(ClientSecret::new(secret.to_owned()));
		}
		if matches!(descriptor.client_auth_method, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Ok(Self { oauth_client, redirect_uri, http_client, error_mapper })
	}
}
impl<C, M> OAuth2Facade for BasicFacade<C, M>
where
	C: ?Sized + BankHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn exchange_client_credentials<'a>(
		&'a self,
		strategy: &'a dyn AspspStrategy,
		scope: &'a ScopeSet,
		extra_params: &'a [(String, String)],
	) -> FacadeFuture<'a, BearerToken> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let mut request = self.oauth_client.exchange_client_credentials();

			for value in scope.iter() {
				request = request.add_scope(Scope::new(value.to_owned()));
			}
			for (key, value) in extra_params {
				request = request.add_extra_param(key, value);
			}

			let response = request.request_async(&instrumented).await.map_err(|err| {
				map_request_error(
					strategy,
					GrantType::ClientCredentials,
					FlowKind::ClientToken,
					meta.take(),
					err,
					self.error_mapper.as_ref(),
				)
			})?;

			Ok(map_token_response(scope, &response))
		})
	}

	fn exchange_authorization_code<'a>(
		&'a self,
		strategy: &'a dyn AspspStrategy,
		binding: &'a AuthorisationBinding,
		scope: &'a ScopeSet,
		code: &'a str,
		extra_params: &'a [(String, String)],
	) -> FacadeFuture<'a, BearerToken> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let headers = binding_headers(binding)?;
			let bound = BoundHandle::new(self.http_client.with_metadata(meta.clone()), headers);
			let mut request = self
				.oauth_client
				.exchange_code(AuthorizationCode::new(code.to_owned()))
				.set_redirect_uri(Cow::Borrowed(&self.redirect_uri));

			if !scope.is_empty() {
				request = request.add_extra_param("scope", scope.normalized());
			}
			for (key, value) in extra_params {
				request = request.add_extra_param(key, value);
			}

			let response = request.request_async(&bound).await.map_err(|err| {
				map_request_error(
					strategy,
					GrantType::AuthorizationCode,
					FlowKind::CodeExchange,
					meta.take(),
					err,
					self.error_mapper.as_ref(),
				)
			})?;

			Ok(map_token_response(scope, &response))
		})
	}
}

fn binding_headers(binding: &AuthorisationBinding) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	for (name, value) in binding.headers() {
		let value =
			HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeader { name })?;

		headers.insert(HeaderName::from_static(name), value);
	}

	Ok(headers)
}

fn map_token_response(scope: &ScopeSet, response: &BasicTokenResponse) -> BearerToken {
	let token =
		BearerToken::new(TokenSecret::new(response.access_token().secret().to_owned()), scope.clone());

	match response.expires_in() {
		Some(expires_in) => token.with_expires_in(Duration::seconds(
			i64::try_from(expires_in.as_secs()).unwrap_or(i64::MAX),
		)),
		None => token,
	}
}

fn map_request_error<E, M>(
	strategy: &dyn AspspStrategy,
	grant: GrantType,
	kind: FlowKind,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let status = meta.as_ref().and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) =>
			classify_error_response(strategy, grant, status, &response),
		RequestTokenError::Request(error) => mapper.map_transport_error(kind, meta.as_ref(), error),
		// A 2xx body carrying an OAuth `error` field lands here as well.
		RequestTokenError::Parse(source, body) =>
			match serde_json::from_slice::<BasicErrorResponse>(&body) {
				Ok(response) => classify_error_response(strategy, grant, status, &response),
				Err(_) if status.is_some_and(|code| !(200..300).contains(&code)) => {
					let ctx = TokenErrorContext::new(grant)
						.with_http_status(status.unwrap_or_default())
						.with_body_preview(String::from_utf8_lossy(&body));

					classify(strategy, &ctx)
				},
				Err(_) => AuthError::MalformedResponse { grant, status, source }.into(),
			},
		RequestTokenError::Other(message) => {
			let mut ctx = TokenErrorContext::new(grant).with_body_preview(message);

			if let Some(status) = status {
				ctx = ctx.with_http_status(status);
			}

			classify(strategy, &ctx)
		},
	}
}

fn classify_error_response(
	strategy: &dyn AspspStrategy,
	grant: GrantType,
	status: Option<u16>,
	response: &BasicErrorResponse,
) -> Error {
	let mut ctx =
		TokenErrorContext::new(grant).with_oauth_error(response.error().as_ref().to_string());

	if let Some(description) = response.error_description() {
		ctx = ctx.with_error_description(description.clone());
	}
	if let Some(status) = status {
		ctx = ctx.with_http_status(status);
	}

	classify(strategy, &ctx)
}

fn classify(strategy: &dyn AspspStrategy, ctx: &TokenErrorContext) -> Error {
	let grant = ctx.grant_type;
	let status = ctx.http_status;
	let reason = ctx.reason();

	match strategy.classify_token_error(ctx) {
		TokenErrorKind::InvalidGrant => AuthError::InvalidGrant { grant, status, reason },
		TokenErrorKind::InvalidClient => AuthError::InvalidClient { grant, status, reason },
		TokenErrorKind::InvalidScope => AuthError::InvalidScope { grant, status, reason },
		TokenErrorKind::Unavailable => AuthError::Unavailable { grant, status, reason },
	}
	.into()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		aspsp::DefaultAspspStrategy,
		auth::{AuthorisationId, ResourceId},
		resource::ResourceKind,
	};

	#[test]
	fn binding_headers_follow_resource_kind() {
		let binding = AuthorisationBinding {
			resource_id: ResourceId::new("p1").expect("Resource id should be valid."),
			authorisation_id: AuthorisationId::new("a1").expect("Authorisation id should be valid."),
			kind: ResourceKind::Payment,
		};
		let headers = binding_headers(&binding).expect("Binding headers should build.");

		assert_eq!(headers.get("X-PaymentId").and_then(|v| v.to_str().ok()), Some("p1"));
		assert_eq!(headers.get("X-PaymentAuthorisationId").and_then(|v| v.to_str().ok()), Some("a1"));
		assert!(headers.get("X-ConsentId").is_none());
	}

	#[test]
	fn error_in_success_body_is_classified() {
		let body = br#"{"error":"invalid_grant","error_description":"code expired"}"#.to_vec();
		let source = serde_path_to_error::deserialize::<_, BasicTokenResponse>(
			&mut serde_json::Deserializer::from_slice(&body),
		)
		.expect_err("Error body should not parse as a token.");
		let err = map_request_error::<std::io::Error, NeverMapper>(
			&DefaultAspspStrategy,
			GrantType::AuthorizationCode,
			FlowKind::CodeExchange,
			Some(ResponseMetadata { status: Some(200), request_id: None }),
			RequestTokenError::Parse(source, body),
			&NeverMapper,
		);

		assert!(matches!(
			err,
			Error::Auth(AuthError::InvalidGrant { status: Some(200), ref reason, .. })
				if reason == "code expired"
		));
	}

	#[test]
	fn garbage_success_body_is_malformed() {
		let body = b"<html>ok</html>".to_vec();
		let source = serde_path_to_error::deserialize::<_, BasicTokenResponse>(
			&mut serde_json::Deserializer::from_slice(&body),
		)
		.expect_err("HTML should not parse as a token.");
		let err = map_request_error::<std::io::Error, NeverMapper>(
			&DefaultAspspStrategy,
			GrantType::ClientCredentials,
			FlowKind::ClientToken,
			Some(ResponseMetadata { status: Some(200), request_id: None }),
			RequestTokenError::Parse(source, body),
			&NeverMapper,
		);

		assert!(matches!(err, Error::Auth(AuthError::MalformedResponse { .. })));
	}

	struct NeverMapper;
	impl TransportErrorMapper<std::io::Error> for NeverMapper {
		fn map_transport_error(
			&self,
			_kind: FlowKind,
			_metadata: Option<&ResponseMetadata>,
			_error: HttpClientError<std::io::Error>,
		) -> Error {
			TransportError::Other { message: "unexpected".into() }.into()
		}
	}
}
