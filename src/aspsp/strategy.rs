//! Strategy hooks that customize token exchanges per bank platform.
//!
//! Implementations decorate outgoing token requests and normalize error mapping
//! without tying flows to any particular HTTP client.

// self
use crate::{_prelude::*, aspsp::GrantType};

/// Strategy hook that decorates token requests and classifies token errors.
///
/// The hooks only see crate-owned data so implementations never depend on the HTTP stack.
/// `augment_token_request` defaults to a no-op.
pub trait AspspStrategy: Send + Sync {
	/// Maps a failed token response into the crate's token error categories.
	fn classify_token_error(&self, ctx: &TokenErrorContext) -> TokenErrorKind;

	/// Adds custom form parameters before a token request is dispatched.
	fn augment_token_request(&self, _grant: GrantType, _form: &mut BTreeMap<String, String>) {}
}

/// Token error categories used by strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenErrorKind {
	/// Authorization code rejected, expired, or already used.
	InvalidGrant,
	/// Client authentication failed.
	InvalidClient,
	/// Requested scope refused.
	InvalidScope,
	/// Temporary failure on the token endpoint.
	Unavailable,
}

/// Primitive data describing a failed token response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenErrorContext {
	/// Grant type associated with the failing request.
	pub grant_type: GrantType,
	/// HTTP status code, when available.
	pub http_status: Option<u16>,
	/// OAuth `error` field.
	pub oauth_error: Option<String>,
	/// OAuth `error_description` field.
	pub error_description: Option<String>,
	/// Truncated body for non-JSON payloads.
	pub body_preview: Option<String>,
}
impl TokenErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates a new context scoped to the provided grant type.
	pub fn new(grant_type: GrantType) -> Self {
		Self {
			grant_type,
			http_status: None,
			oauth_error: None,
			error_description: None,
			body_preview: None,
		}
	}

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the OAuth error code.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description` field.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Adds a body preview, truncated to a fixed number of characters.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		self.body_preview = Some(truncate_preview(body.into()));

		self
	}

	/// Best human-readable reason carried by the context.
	pub fn reason(&self) -> String {
		self.error_description
			.clone()
			.or_else(|| self.oauth_error.clone())
			.or_else(|| self.body_preview.clone())
			.unwrap_or_else(|| match self.http_status {
				Some(status) => format!("HTTP {status}"),
				None => "no details".into(),
			})
	}
}

/// Default strategy that applies RFC 6749 heuristics.
///
/// Structured OAuth fields win, then body text hints, then the HTTP status code.
#[derive(Debug, Default)]
pub struct DefaultAspspStrategy;
impl Display for DefaultAspspStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-aspsp-strategy")
	}
}
impl AspspStrategy for DefaultAspspStrategy {
	fn classify_token_error(&self, ctx: &TokenErrorContext) -> TokenErrorKind {
		if let Some(kind) =
			classify_oauth_error(ctx.oauth_error.as_deref(), ctx.error_description.as_deref())
		{
			return kind;
		}
		if let Some(kind) = classify_body(ctx.body_preview.as_deref()) {
			return kind;
		}

		classify_status(ctx.http_status)
	}
}

fn truncate_preview(body: String) -> String {
	if body.chars().count() <= TokenErrorContext::BODY_PREVIEW_LIMIT {
		return body;
	}

	let mut buf = body.chars().take(TokenErrorContext::BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}

fn classify_oauth_error(
	oauth_error: Option<&str>,
	error_description: Option<&str>,
) -> Option<TokenErrorKind> {
	oauth_error
		.and_then(match_exact_value)
		.or_else(|| error_description.and_then(match_exact_value))
		.or_else(|| classify_body(error_description))
}

fn match_exact_value(value: &str) -> Option<TokenErrorKind> {
	const GRANT: [&str; 2] = ["invalid_grant", "access_denied"];
	const CLIENT: [&str; 2] = ["invalid_client", "unauthorized_client"];
	const SCOPE: [&str; 2] = ["invalid_scope", "insufficient_scope"];
	const UNAVAILABLE: [&str; 2] = ["temporarily_unavailable", "server_error"];

	let is = |set: [&str; 2]| set.iter().any(|code| value.eq_ignore_ascii_case(code));

	if is(GRANT) {
		Some(TokenErrorKind::InvalidGrant)
	} else if is(CLIENT) {
		Some(TokenErrorKind::InvalidClient)
	} else if is(SCOPE) {
		Some(TokenErrorKind::InvalidScope)
	} else if is(UNAVAILABLE) {
		Some(TokenErrorKind::Unavailable)
	} else {
		None
	}
}

fn classify_body(body: Option<&str>) -> Option<TokenErrorKind> {
	let lowered = body?.to_ascii_lowercase();

	match lowered.as_str() {
		text if text.contains("invalid_grant") => Some(TokenErrorKind::InvalidGrant),
		text if text.contains("invalid_client") => Some(TokenErrorKind::InvalidClient),
		text if text.contains("invalid_scope") => Some(TokenErrorKind::InvalidScope),
		text if text.contains("temporarily_unavailable") => Some(TokenErrorKind::Unavailable),
		_ => None,
	}
}

fn classify_status(status: Option<u16>) -> TokenErrorKind {
	match status {
		Some(400) => TokenErrorKind::InvalidGrant,
		Some(401) => TokenErrorKind::InvalidClient,
		Some(403) => TokenErrorKind::InvalidScope,
		_ => TokenErrorKind::Unavailable,
	}
}
