// self
use crate::{_prelude::*, obs::FlowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// `psd2_sca.flow` span shared by every operation.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"psd2_sca.flow",
				flow = kind.as_str(),
				stage,
				resource_id = tracing::field::Empty
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Tags the span with the consent or payment id it works on.
	pub fn with_resource(self, resource_id: &str) -> Self {
		#[cfg(feature = "tracing")]
		self.span.record("resource_id", resource_id);
		#[cfg(not(feature = "tracing"))]
		let _ = resource_id;

		self
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs a recoverable failure that the poller will retry on the next tick.
pub fn record_poll_retry(attempt: u32, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(attempt, error = %error, "poll attempt failed, retrying");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (attempt, error);
	}
}

/// Logs an SCA status change seen while polling.
pub fn record_sca_transition(previous: &dyn Display, current: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(previous = %previous, current = %current, "sca status changed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (previous, current);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_passes_output_through() {
		let span =
			FlowSpan::new(FlowKind::ScaStatus, "instrument_passes_output_through").with_resource("c1");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}

	#[test]
	fn event_helpers_accept_any_display() {
		record_sca_transition(&"received", &"started");
		record_poll_retry(
			2,
			&crate::error::TransportError::Other { message: "reset".into() }.into(),
		);
	}
}
