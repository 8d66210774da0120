//! SCA orchestrator: drives a negotiated authorisation to a terminal status.
//!
//! ```text
//! Negotiated ─┬─ RedirectPending ──(code exchange for OAuth)──┐
//!             └─ DecoupledPresenting ─────────────────────────┴─ Polling ─ Finalised | Exempted | Failed
//! ```
//!
//! The challenge variant chosen by the negotiation never changes while polling. Status reads
//! may carry fresh decoupled payloads; only payloads of the same variant replace the current
//! one. Polling reads use the flow's client token, and the token obtained from an OAuth code
//! exchange is returned to the caller untouched.

// self
use crate::{
	_prelude::*,
	auth::{AuthorisationId, BearerToken, ScopeSet},
	error::{ConfigError, Error as CrateError, NegotiationError},
	ext::{AuthCodeRequest, Presentation, ScaAgents, ScaPresenter},
	flows::{Psd2Client, RedirectHandoff},
	http::BankHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	poll::{self, PollOutcome},
	resource::{
		AspspTarget, AuthorisationProcess, AuthorizableResource, PsuContext, ResourceKind,
		ResourceRequest, ResourceStatus,
	},
	sca::{AuthorisationStatus, Negotiation, ScaChallenge, ScaMethod, ScaStatus},
};

/// How an authorisation ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScaOutcome {
	/// The bank reported `finalised` or `exempted`.
	Authorised {
		/// Terminal status.
		status: ScaStatus,
		/// Token from the OAuth code exchange, for OAuth redirects.
		bound_token: Option<BearerToken>,
		/// Status reads issued.
		polls: u32,
	},
	/// The bank reported `failed`, or the OAuth redirect produced no usable code.
	Failed {
		/// Last status seen.
		status: ScaStatus,
		/// Why the flow stopped before a terminal status, if it did.
		reason: Option<String>,
		/// Status reads issued.
		polls: u32,
	},
	/// The caller cancelled.
	Cancelled {
		/// Status reads issued before cancellation.
		polls: u32,
	},
}
impl ScaOutcome {
	/// Returns true for [`ScaOutcome::Authorised`].
	pub fn is_authorised(&self) -> bool {
		matches!(self, Self::Authorised { .. })
	}

	/// Status reads issued.
	pub fn polls(&self) -> u32 {
		match self {
			Self::Authorised { polls, .. } | Self::Failed { polls, .. } | Self::Cancelled { polls } =>
				*polls,
		}
	}
}

/// Inputs of [`Psd2Client::run`].
#[derive(Clone, Debug)]
pub struct FlowRequest {
	/// Bank routing.
	pub target: AspspTarget,
	/// End user context.
	pub psu: PsuContext,
	/// Consent or payment to create.
	pub resource: ResourceRequest,
}

/// Everything a finished [`Psd2Client::run`] produced.
#[derive(Clone, Debug)]
pub struct FlowReport {
	/// Created resource.
	pub resource: AuthorizableResource,
	/// Authorisation sub-resource with the chosen method.
	pub authorisation: AuthorisationProcess,
	/// Negotiated challenge.
	pub negotiation: Negotiation,
	/// SCA result.
	pub sca: ScaOutcome,
	/// Settled resource status; `None` unless SCA succeeded and the wait was not cancelled.
	pub resource_status: Option<ResourceStatus>,
}
impl FlowReport {
	/// Returns true when SCA succeeded and the resource settled in a usable status.
	pub fn is_success(&self) -> bool {
		self.sca.is_authorised() && self.resource_status.as_ref().is_some_and(ResourceStatus::is_success)
	}

	/// Returns true when the caller cancelled during SCA polling or while waiting for the
	/// resource to settle.
	pub fn is_cancelled(&self) -> bool {
		match self.sca {
			ScaOutcome::Cancelled { .. } => true,
			ScaOutcome::Authorised { .. } => self.resource_status.is_none(),
			ScaOutcome::Failed { .. } => false,
		}
	}
}

struct PollState {
	status: ScaStatus,
	challenge: ScaChallenge,
}

impl<C, M> Psd2Client<C, M>
where
	C: ?Sized + BankHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Drives a negotiated authorisation until the bank reports a terminal status.
	///
	/// An [`Undefined`](ScaChallenge::Undefined) challenge is a [`NegotiationError`]. A missing
	/// authorization code or a rejected one ends in [`ScaOutcome::Failed`] without polling.
	pub async fn authorise(
		&self,
		token: &BearerToken,
		resource: &AuthorizableResource,
		authorisation_id: &AuthorisationId,
		negotiation: &Negotiation,
		agents: ScaAgents<'_>,
		cancel: &CancellationToken,
	) -> Result<ScaOutcome> {
		const KIND: FlowKind = FlowKind::Authorisation;

		let span = FlowSpan::new(KIND, "authorise").with_resource(&resource.id);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(self.authorise_inner(
				token,
				resource,
				authorisation_id,
				negotiation,
				agents,
				cancel,
			))
			.await;

		obs::record_flow_outcome(KIND, match &result {
			Ok(ScaOutcome::Authorised { .. }) => FlowOutcome::Success,
			Ok(ScaOutcome::Cancelled { .. }) => FlowOutcome::Cancelled,
			Ok(ScaOutcome::Failed { .. }) | Err(_) => FlowOutcome::Failure,
		});

		result
	}

	async fn authorise_inner(
		&self,
		token: &BearerToken,
		resource: &AuthorizableResource,
		authorisation_id: &AuthorisationId,
		negotiation: &Negotiation,
		agents: ScaAgents<'_>,
		cancel: &CancellationToken,
	) -> Result<ScaOutcome> {
		let kind = resource.kind;

		if negotiation.status.is_terminal() {
			present_finished(agents.presenter, &negotiation.status, kind);

			return Ok(finish(negotiation.status.clone(), None, 0));
		}

		let mut bound_token = None;

		match &negotiation.challenge {
			ScaChallenge::Undefined =>
				return Err(NegotiationError::UnsupportedApproach {
					approach: negotiation.approach.clone(),
					status: negotiation.status.to_string(),
				}
				.into()),
			ScaChallenge::OAuthRedirect { template_url } => {
				let handoff = self.hand_off(template_url, agents.presenter);
				let request = AuthCodeRequest {
					url: handoff.url,
					state: handoff.state,
					resource_id: resource.id.clone(),
					authorisation_id: authorisation_id.clone(),
					kind,
				};
				let code = tokio::select! {
					biased;
					_ = cancel.cancelled() => return Ok(ScaOutcome::Cancelled { polls: 0 }),
					code = agents.codes.await_code(&request) => code,
				};
				let Some(code) = code.filter(|code| !code.is_empty()) else {
					return Ok(ScaOutcome::Failed {
						status: negotiation.status.clone(),
						reason: Some("No authorization code was received.".into()),
						polls: 0,
					});
				};

				match self
					.exchange_auth_code(&resource.binding(authorisation_id), &token.scope, &code)
					.await
				{
					Ok(exchanged) => bound_token = Some(exchanged),
					Err(CrateError::Auth(err)) if err.is_invalid_grant() =>
						return Ok(ScaOutcome::Failed {
							status: negotiation.status.clone(),
							reason: Some(err.to_string()),
							polls: 0,
						}),
					Err(err) => return Err(err),
				}
			},
			ScaChallenge::Redirect { template_url } => {
				self.hand_off(template_url, agents.presenter);
			},
			challenge @ (ScaChallenge::DecoupledToken { .. } | ScaChallenge::DecoupledImage { .. }) =>
				present_challenge(agents.presenter, challenge, &negotiation.status, kind),
		}

		let state = Mutex::new(PollState {
			status: negotiation.status.clone(),
			challenge: negotiation.challenge.clone(),
		});
		let state = &state;
		let outcome = poll::poll_until(
			|| async move {
				let snapshot = self
					.authorisation_status(token, resource, authorisation_id)
					.await
					.map_err(poll::recoverable)?;

				observe(state, &snapshot, kind, agents.presenter);

				Ok(snapshot.status)
			},
			ScaStatus::is_terminal,
			self.timings.for_method(negotiation.method),
			cancel,
		)
		.await?;

		obs::record_status_reads(negotiation.method, outcome.attempts());

		Ok(match outcome {
			PollOutcome::Completed { status, attempts } => {
				present_finished(agents.presenter, &status, kind);

				finish(status, bound_token, attempts)
			},
			PollOutcome::Cancelled { attempts } => ScaOutcome::Cancelled { polls: attempts },
		})
	}

	/// Polls the consent or payment status until it leaves its pending state.
	pub async fn await_resource_status(
		&self,
		token: &BearerToken,
		resource: &AuthorizableResource,
		cancel: &CancellationToken,
	) -> Result<PollOutcome<ResourceStatus>> {
		let span = FlowSpan::new(FlowKind::ResourceStatus, "await_resource_status")
			.with_resource(&resource.id);

		span.instrument(poll::poll_until(
			|| async move { self.resource_status(token, resource).await.map_err(poll::recoverable) },
			ResourceStatus::is_settled,
			self.timings.decoupled_interval,
			cancel,
		))
		.await
	}

	/// Runs a whole flow: token, create, start authorisation, negotiate, authorise, and wait
	/// for the resource to settle.
	pub async fn run(
		&self,
		request: FlowRequest,
		agents: ScaAgents<'_>,
		cancel: &CancellationToken,
	) -> Result<FlowReport> {
		const KIND: FlowKind = FlowKind::Run;

		let span = FlowSpan::new(KIND, "run");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let FlowRequest { target, psu, resource: resource_request } = request;
				let scope = ScopeSet::for_resource(psu.scope_context(), resource_request.kind())
					.map_err(ConfigError::from)?;
				let token = self.client_token(&scope).await?;
				let resource =
					self.create_resource(&token, &resource_request, &target, &psu).await?;
				let mut authorisation = self.start_authorisation(&token, &resource).await?;
				let method = self.choose_auth_method(&resource, &mut authorisation)?;
				let negotiation = self
					.submit_auth_method(&token, &resource, &authorisation.authorisation_id, &method)
					.await?;
				let sca = self
					.authorise(
						&token,
						&resource,
						&authorisation.authorisation_id,
						&negotiation,
						agents,
						cancel,
					)
					.await?;
				let resource_status = if sca.is_authorised() {
					match self.await_resource_status(&token, &resource, cancel).await? {
						PollOutcome::Completed { status, .. } => Some(status),
						PollOutcome::Cancelled { .. } => None,
					}
				} else {
					None
				};

				Ok(FlowReport { resource, authorisation, negotiation, sca, resource_status })
			})
			.await;

		obs::record_flow_outcome(KIND, match &result {
			Ok(report) if report.is_success() => FlowOutcome::Success,
			Ok(report) if report.is_cancelled() => FlowOutcome::Cancelled,
			_ => FlowOutcome::Failure,
		});

		result
	}

	fn hand_off(&self, template_url: &str, presenter: &dyn ScaPresenter) -> RedirectHandoff {
		let handoff = RedirectHandoff::new(
			template_url,
			&self.credentials.client_id,
			&self.credentials.redirect_uri,
		);

		presenter.present(&Presentation::Redirect {
			url: handoff.url.clone(),
			state: handoff.state.clone(),
		});

		handoff
	}
}

fn finish(status: ScaStatus, bound_token: Option<BearerToken>, polls: u32) -> ScaOutcome {
	if status.is_success() {
		ScaOutcome::Authorised { status, bound_token, polls }
	} else {
		ScaOutcome::Failed { status, reason: None, polls }
	}
}

/// Folds one status read into the poll state and re-presents the challenge when needed.
///
/// Decoupled challenges are shown again when the status moves into a challenge-bearing
/// status, and on every read that carries a fresh image (QR codes rotate).
fn observe(
	state: &Mutex<PollState>,
	snapshot: &AuthorisationStatus,
	kind: ResourceKind,
	presenter: &dyn ScaPresenter,
) {
	let mut state = state.lock();
	let changed = state.status != snapshot.status;

	if changed {
		obs::record_sca_transition(&state.status, &snapshot.status);
	}

	let fresh = snapshot
		.challenge
		.as_ref()
		.filter(|challenge| challenge.is_same_variant(&state.challenge))
		.cloned();
	let rotated_image = matches!(fresh, Some(ScaChallenge::DecoupledImage { .. }));

	if let Some(challenge) = fresh {
		state.challenge = challenge;
	}

	state.status = snapshot.status.clone();

	let decoupled = state.challenge.method() == ScaMethod::Decoupled;
	let entered_challenge = changed && snapshot.status.presents_challenge();

	if decoupled && !snapshot.status.is_terminal() && (entered_challenge || rotated_image) {
		present_challenge(presenter, &state.challenge, &state.status, kind);
	}
}

fn present_challenge(
	presenter: &dyn ScaPresenter,
	challenge: &ScaChallenge,
	status: &ScaStatus,
	kind: ResourceKind,
) {
	presenter.present(&Presentation::Challenge {
		challenge: challenge.clone(),
		status: status.clone(),
		prompt: status.prompt(kind).map(ToOwned::to_owned),
	});
}

fn present_finished(presenter: &dyn ScaPresenter, status: &ScaStatus, kind: ResourceKind) {
	presenter.present(&Presentation::Finished {
		status: status.clone(),
		prompt: status.prompt(kind).map(ToOwned::to_owned),
	});
}
