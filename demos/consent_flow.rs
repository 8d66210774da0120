//! Runs a decoupled consent flow against a local mock bank and prints what the PSU would see.
//!
//! The mock answers the token call, creates consent `c1`, offers Mobile BankID, and reports
//! `finalised` on the first status read.

// std
use std::time::Duration;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use psd2_sca::{
	CancellationToken,
	aspsp::ApiDescriptor,
	auth::BicFi,
	config::ScaTimings,
	ext::{AuthCodeFuture, AuthCodeRequest, AuthCodeSource, Presentation, ScaAgents, ScaPresenter},
	flows::{ClientCredentials, FlowRequest, Psd2Client},
	resource::{AspspTarget, ConsentAccess, PsuContext, ResourceRequest},
	sca::ScaChallenge,
};

struct ConsolePresenter;
impl ScaPresenter for ConsolePresenter {
	fn present(&self, presentation: &Presentation) {
		match presentation {
			Presentation::Redirect { url, .. } => println!("Open {url} to continue."),
			Presentation::Challenge { challenge, prompt, .. } => {
				if let Some(prompt) = prompt {
					println!("{prompt}.");
				}

				match challenge {
					ScaChallenge::DecoupledToken { token } =>
						println!("Start BankID with autostart token {token}."),
					ScaChallenge::DecoupledImage { image_data } =>
						println!("Scan the QR code ({} bytes).", image_data.len()),
					_ => {},
				}
			},
			Presentation::Finished { status, prompt } =>
				println!("{} ({status}).", prompt.as_deref().unwrap_or("SCA done")),
		}
	}
}

/// Decoupled flows never redirect, so no code ever arrives.
struct NoCallback;
impl AuthCodeSource for NoCallback {
	fn await_code<'a>(&'a self, _request: &'a AuthCodeRequest) -> AuthCodeFuture<'a> {
		Box::pin(async { None })
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let auth_path = "/psd2/consent/v1/consents/c1/authorisations/a1";

	server
		.mock_async(|when, then| {
			when.method(POST).path("/connect/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-token\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/psd2/consent/v1/consents");
			then.status(201)
				.header("content-type", "application/json")
				.body("{\"consentId\":\"c1\",\"consentStatus\":\"received\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/psd2/consent/v1/consents/c1/authorisations");
			then.status(201).header("content-type", "application/json").body(
				"{\"authorisationId\":\"a1\",\"scaMethods\":[{\"authenticationMethodId\":\"mbid\"}]}",
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(PUT).path(auth_path);
			then.status(200)
				.header("content-type", "application/json")
				.header("aspsp-sca-approach", "DECOUPLED")
				.body("{\"scaStatus\":\"started\",\"challengeData\":{\"data\":[\"demo-autostart\"]}}");
		})
		.await;

	let status = server
		.mock_async(|when, then| {
			when.method(GET).path(auth_path);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"scaStatus\":\"finalised\"}");
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/psd2/consent/v1/consents/c1/status");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"consentStatus\":\"valid\"}");
		})
		.await;

	let descriptor = ApiDescriptor::builder()
		.token_endpoint(Url::parse(&server.url("/connect/token"))?)
		.api_base(Url::parse(&server.base_url())?)
		.build()?;
	let credentials = ClientCredentials::new("demo-client", "https://tpp.example.com/callback")?
		.with_client_secret("demo-secret");
	let client = Psd2Client::new(descriptor, credentials)?
		.with_timings(ScaTimings::uniform(Duration::from_millis(200)));
	let request = FlowRequest {
		target: AspspTarget::new(BicFi::new("ESSESESS")?),
		psu: PsuContext::new("127.0.0.1", "consent-flow-demo/0.1"),
		resource: ResourceRequest::Consent(ConsentAccess::default()),
	};
	let report = client
		.run(request, ScaAgents::new(&ConsolePresenter, &NoCallback), &CancellationToken::new())
		.await?;

	println!(
		"Consent {} settled as {:?} after {} status reads.",
		report.resource.id,
		report.resource_status,
		report.sca.polls()
	);

	status.assert_async().await;

	Ok(())
}
