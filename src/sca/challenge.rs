//! Classification of the bank's SCA answer into a challenge the client can drive.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
// self
use crate::_prelude::*;

const BANKID_LAUNCH_BASE: &str = "https://app.bankid.com/";

/// Value of the `aspsp-sca-approach` response header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScaApproach {
	/// `REDIRECT`
	Redirect,
	/// `DECOUPLED`
	Decoupled,
}
impl ScaApproach {
	/// Response header carrying the approach.
	pub const HEADER: &'static str = "aspsp-sca-approach";

	/// Parses the header value. Matching is case-sensitive.
	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"REDIRECT" => Some(Self::Redirect),
			"DECOUPLED" => Some(Self::Decoupled),
			_ => None,
		}
	}
}

/// Coarse SCA method derived from a [`ScaChallenge`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScaMethod {
	/// Redirect followed by an authorization-code exchange.
	OAuthRedirect,
	/// Redirect without a code exchange.
	Redirect,
	/// App-based authentication shown as a token or image.
	Decoupled,
	/// Nothing this client can drive.
	Undefined,
}
impl ScaMethod {
	/// Stable label used in logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::OAuthRedirect => "oauth_redirect",
			Self::Redirect => "redirect",
			Self::Decoupled => "decoupled",
			Self::Undefined => "undefined",
		}
	}
}
impl Display for ScaMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Challenge payload fixed at negotiation time.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScaChallenge {
	/// `_links.scaOAuth.href` template; an authorization code must be exchanged afterwards.
	OAuthRedirect {
		/// URL template with `[CLIENT_ID]`, `[TPP_REDIRECT_URI]`, and `[TPP_STATE]`.
		template_url: String,
	},
	/// `_links.scaRedirect.href` template.
	Redirect {
		/// URL template with `[CLIENT_ID]`, `[TPP_REDIRECT_URI]`, and `[TPP_STATE]`.
		template_url: String,
	},
	/// `challengeData.data[0]`, usually a BankID autostart token.
	DecoupledToken {
		/// Autostart token.
		token: String,
	},
	/// `challengeData.image`, usually a `data:` URI with a rotating QR code.
	DecoupledImage {
		/// Image data as sent by the bank.
		image_data: String,
	},
	/// The response matched no known shape.
	Undefined,
}
impl ScaChallenge {
	/// Classifies a negotiation response.
	///
	/// `REDIRECT` prefers `scaOAuth` over `scaRedirect`; `DECOUPLED` prefers `data[0]` over
	/// `image`. Anything else, including a missing header, is [`Undefined`](Self::Undefined).
	pub fn classify(approach: Option<&str>, body: &ScaResponseBody) -> Self {
		match approach.and_then(ScaApproach::parse) {
			Some(ScaApproach::Redirect) => {
				let links = body.links.as_ref();

				if let Some(template_url) = links.and_then(|l| present(l.sca_oauth.as_ref())) {
					Self::OAuthRedirect { template_url: template_url.to_owned() }
				} else if let Some(template_url) =
					links.and_then(|l| present(l.sca_redirect.as_ref()))
				{
					Self::Redirect { template_url: template_url.to_owned() }
				} else {
					Self::Undefined
				}
			},
			Some(ScaApproach::Decoupled) =>
				Self::from_challenge_data(body.challenge_data.as_ref()).unwrap_or(Self::Undefined),
			None => Self::Undefined,
		}
	}

	/// Reads decoupled challenge data from a status response, if any is present.
	pub fn from_challenge_data(data: Option<&ChallengeData>) -> Option<Self> {
		let data = data?;

		if let Some(token) = data.data.as_ref().and_then(|d| d.first()).filter(|t| !t.is_empty())
		{
			return Some(Self::DecoupledToken { token: token.clone() });
		}

		data.image
			.as_ref()
			.filter(|image| !image.is_empty())
			.map(|image| Self::DecoupledImage { image_data: image.clone() })
	}

	/// Coarse method of this challenge.
	pub fn method(&self) -> ScaMethod {
		match self {
			Self::OAuthRedirect { .. } => ScaMethod::OAuthRedirect,
			Self::Redirect { .. } => ScaMethod::Redirect,
			Self::DecoupledToken { .. } | Self::DecoupledImage { .. } => ScaMethod::Decoupled,
			Self::Undefined => ScaMethod::Undefined,
		}
	}

	/// Returns true when both challenges are the same variant, regardless of payload.
	pub fn is_same_variant(&self, other: &Self) -> bool {
		std::mem::discriminant(self) == std::mem::discriminant(other)
	}

	/// Redirect template, for the two redirect variants.
	pub fn template_url(&self) -> Option<&str> {
		match self {
			Self::OAuthRedirect { template_url } | Self::Redirect { template_url } =>
				Some(template_url),
			_ => None,
		}
	}

	/// BankID launch URL for a decoupled token; `redirect` defaults to `null`.
	pub fn bankid_launch_url(&self, redirect: Option<&str>) -> Option<String> {
		let Self::DecoupledToken { token } = self else {
			return None;
		};
		let token = url::form_urlencoded::byte_serialize(token.as_bytes()).collect::<String>();
		let redirect = match redirect {
			Some(uri) => url::form_urlencoded::byte_serialize(uri.as_bytes()).collect(),
			None => String::from("null"),
		};

		Some(format!("{BANKID_LAUNCH_BASE}?autostarttoken={token}&redirect={redirect}"))
	}

	/// Decodes a `data:<media-type>;base64,<payload>` image for presenters that need bytes.
	pub fn decode_image(&self) -> Option<Result<DecodedImage, ImageDecodeError>> {
		match self {
			Self::DecoupledImage { image_data } => Some(DecodedImage::from_data_uri(image_data)),
			_ => None,
		}
	}
}

/// Raw bytes of a decoupled challenge image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
	/// Media type from the data URI, for example `image/png`.
	pub media_type: String,
	/// Decoded payload.
	pub bytes: Vec<u8>,
}
impl DecodedImage {
	/// Parses a base64 `data:` URI.
	pub fn from_data_uri(uri: &str) -> Result<Self, ImageDecodeError> {
		let rest = uri.strip_prefix("data:").ok_or(ImageDecodeError::NotDataUri)?;
		let (meta, payload) = rest.split_once(',').ok_or(ImageDecodeError::NotDataUri)?;
		let media_type = meta.strip_suffix(";base64").ok_or(ImageDecodeError::NotBase64)?;
		let bytes = STANDARD
			.decode(payload.trim())
			.map_err(|source| ImageDecodeError::Base64 { source })?;

		Ok(Self { media_type: media_type.to_owned(), bytes })
	}
}

/// Errors raised by [`DecodedImage::from_data_uri`].
#[derive(Debug, ThisError)]
pub enum ImageDecodeError {
	/// Input is not a `data:` URI.
	#[error("Challenge image is not a data URI.")]
	NotDataUri,
	/// Data URI is not base64-encoded.
	#[error("Challenge image data URI is not base64-encoded.")]
	NotBase64,
	/// Payload is not valid base64.
	#[error("Challenge image payload is not valid base64.")]
	Base64 {
		/// Decoder failure.
		#[source]
		source: base64::DecodeError,
	},
}

/// Fields of an authorisation response the SCA layer reads. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaResponseBody {
	/// `scaStatus`
	#[serde(default)]
	pub sca_status: Option<String>,
	/// `_links`
	#[serde(default, rename = "_links")]
	pub links: Option<ScaLinks>,
	/// `challengeData`
	#[serde(default)]
	pub challenge_data: Option<ChallengeData>,
}

/// `_links` of an authorisation response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ScaLinks {
	/// `scaOAuth`
	#[serde(default, rename = "scaOAuth")]
	pub sca_oauth: Option<Href>,
	/// `scaRedirect`
	#[serde(default, rename = "scaRedirect")]
	pub sca_redirect: Option<Href>,
}

/// Hypermedia link.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Href {
	/// Target URL or template.
	#[serde(default)]
	pub href: Option<String>,
}

/// `challengeData` of an authorisation response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ChallengeData {
	/// Challenge strings; the first one is the autostart token.
	#[serde(default)]
	pub data: Option<Vec<String>>,
	/// Challenge image.
	#[serde(default)]
	pub image: Option<String>,
}

fn present(link: Option<&Href>) -> Option<&str> {
	link.and_then(|l| l.href.as_deref()).filter(|href| !href.is_empty())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn body(json: &str) -> ScaResponseBody {
		serde_json::from_str(json).expect("Fixture body should parse.")
	}

	#[test]
	fn redirect_prefers_oauth_link() {
		let both = body(
			r#"{"_links":{"scaOAuth":{"href":"https://bank/oauth"},"scaRedirect":{"href":"https://bank/r"}}}"#,
		);
		let redirect_only = body(r#"{"_links":{"scaRedirect":{"href":"https://bank/r"}}}"#);

		assert_eq!(
			ScaChallenge::classify(Some("REDIRECT"), &both),
			ScaChallenge::OAuthRedirect { template_url: "https://bank/oauth".into() }
		);
		assert_eq!(
			ScaChallenge::classify(Some("REDIRECT"), &redirect_only),
			ScaChallenge::Redirect { template_url: "https://bank/r".into() }
		);
		assert_eq!(ScaChallenge::classify(Some("REDIRECT"), &body("{}")), ScaChallenge::Undefined);
	}

	#[test]
	fn decoupled_prefers_token_then_image() {
		let token = body(r#"{"challengeData":{"data":["tok-1"],"image":"data:image/png;base64,AA=="}}"#);
		let empty_data = body(r#"{"challengeData":{"data":[],"image":"data:image/png;base64,AA=="}}"#);

		assert_eq!(
			ScaChallenge::classify(Some("DECOUPLED"), &token),
			ScaChallenge::DecoupledToken { token: "tok-1".into() }
		);
		assert_eq!(
			ScaChallenge::classify(Some("DECOUPLED"), &empty_data),
			ScaChallenge::DecoupledImage { image_data: "data:image/png;base64,AA==".into() }
		);
		assert_eq!(ScaChallenge::classify(Some("DECOUPLED"), &body("{}")), ScaChallenge::Undefined);
	}

	#[test]
	fn approach_header_is_case_sensitive_and_required() {
		let token = body(r#"{"challengeData":{"data":["tok-1"]}}"#);

		assert_eq!(ScaChallenge::classify(Some("decoupled"), &token), ScaChallenge::Undefined);
		assert_eq!(ScaChallenge::classify(Some("EMBEDDED"), &token), ScaChallenge::Undefined);
		assert_eq!(ScaChallenge::classify(None, &token), ScaChallenge::Undefined);
	}

	#[test]
	fn classification_is_idempotent() {
		let raw = body(r#"{"scaStatus":"started","challengeData":{"data":["tok-1"]}}"#);
		let first = ScaChallenge::classify(Some("DECOUPLED"), &raw);
		let second = ScaChallenge::classify(Some("DECOUPLED"), &raw);

		assert_eq!(first, second);
		assert_eq!(first.method(), ScaMethod::Decoupled);
	}

	#[test]
	fn bankid_url_encodes_redirect() {
		let challenge = ScaChallenge::DecoupledToken { token: "abc-123".into() };

		assert_eq!(
			challenge.bankid_launch_url(None).as_deref(),
			Some("https://app.bankid.com/?autostarttoken=abc-123&redirect=null")
		);
		assert_eq!(
			challenge.bankid_launch_url(Some("https://tpp/cb")).as_deref(),
			Some("https://app.bankid.com/?autostarttoken=abc-123&redirect=https%3A%2F%2Ftpp%2Fcb")
		);
		assert_eq!(ScaChallenge::Undefined.bankid_launch_url(None), None);
	}

	#[test]
	fn decodes_data_uri_images() {
		let image = ScaChallenge::DecoupledImage { image_data: "data:image/png;base64,iVBORw==".into() };
		let decoded = image
			.decode_image()
			.expect("Image challenge should expose image data.")
			.expect("Image data should decode.");

		assert_eq!(decoded.media_type, "image/png");
		assert_eq!(decoded.bytes, vec![0x89, 0x50, 0x4E, 0x47]);
		assert!(matches!(
			DecodedImage::from_data_uri("https://bank/qr.png"),
			Err(ImageDecodeError::NotDataUri)
		));
		assert!(matches!(
			DecodedImage::from_data_uri("data:image/svg+xml,<svg/>"),
			Err(ImageDecodeError::NotBase64)
		));
	}
}
