//! Cancellable fixed-interval polling.
//!
//! [`poll_until`] runs `fetch` until `is_terminal` accepts a value or the caller cancels. It
//! never backs off and has no attempt cap. Cancellation is observed before every fetch and
//! before every sleep, and it wakes a pending sleep right away, so a cancelled loop returns
//! within one interval without issuing another request.

// self
use crate::{
	_prelude::*,
	error::{PollError, ResourceError},
	obs,
};

/// Result of a polling loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome<S> {
	/// `is_terminal` accepted `status`.
	Completed {
		/// Terminal value.
		status: S,
		/// Fetches issued, including the terminal one.
		attempts: u32,
	},
	/// The caller cancelled the loop.
	Cancelled {
		/// Fetches issued before cancellation.
		attempts: u32,
	},
}
impl<S> PollOutcome<S> {
	/// Fetches issued by the loop.
	pub fn attempts(&self) -> u32 {
		match self {
			Self::Completed { attempts, .. } | Self::Cancelled { attempts } => *attempts,
		}
	}
}

/// Polls `fetch` every `interval` until `is_terminal` holds or `cancel` fires.
///
/// Errors for which [`Error::is_recoverable`] holds are logged and retried on the next tick;
/// any other error ends the loop.
pub async fn poll_until<S, F, Fut, T>(
	mut fetch: F,
	mut is_terminal: T,
	interval: StdDuration,
	cancel: &CancellationToken,
) -> Result<PollOutcome<S>>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<S>>,
	T: FnMut(&S) -> bool,
{
	let mut attempts = 0_u32;

	loop {
		if cancel.is_cancelled() {
			return Ok(PollOutcome::Cancelled { attempts });
		}

		attempts = attempts.saturating_add(1);

		match fetch().await {
			Ok(status) if is_terminal(&status) =>
				return Ok(PollOutcome::Completed { status, attempts }),
			Ok(_) => {},
			Err(err) if err.is_recoverable() => obs::record_poll_retry(attempts, &err),
			Err(err) => return Err(err),
		}

		if cancel.is_cancelled() {
			return Ok(PollOutcome::Cancelled { attempts });
		}

		tokio::select! {
			biased;
			_ = cancel.cancelled() => return Ok(PollOutcome::Cancelled { attempts }),
			_ = tokio::time::sleep(interval) => {},
		}
	}
}

/// Reclassifies failures that should not end a polling loop.
///
/// Transport failures and upstream `5xx`/`429` answers become [`PollError`]s; everything else
/// passes through unchanged.
pub fn recoverable(err: Error) -> Error {
	match err {
		Error::Transport(source) => PollError::Transport(source).into(),
		Error::Resource(ResourceError::Status { operation, status, body })
			if status >= 500 || status == 429 =>
			PollError::Upstream { operation, status, body }.into(),
		other => other,
	}
}
