// self
use crate::{
	obs::{FlowKind, FlowOutcome},
	sca::ScaMethod,
};

/// Increments `psd2_sca_flow_total{flow,outcome}` (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!("psd2_sca_flow_total", "flow" => kind.as_str(), "outcome" => outcome.as_str())
		.increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Records how many status reads one authorisation needed, in
/// `psd2_sca_status_reads{method}` (when enabled).
pub fn record_status_reads(method: ScaMethod, reads: u32) {
	#[cfg(feature = "metrics")]
	metrics::histogram!("psd2_sca_status_reads", "method" => method.as_str()).record(f64::from(reads));

	#[cfg(not(feature = "metrics"))]
	let _ = (method, reads);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recording_without_a_recorder_is_harmless() {
		record_flow_outcome(FlowKind::ScaStatus, FlowOutcome::Cancelled);
		record_status_reads(ScaMethod::Decoupled, 3);
	}
}
