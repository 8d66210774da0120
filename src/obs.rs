//! Optional observability helpers for SCA flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `psd2_sca.flow` with the `flow`
//!   (operation) and `stage` (call site) fields, plus events for SCA status transitions and
//!   recoverable poll failures.
//! - Enable `metrics` to increment the `psd2_sca_flow_total` counter for every
//!   attempt/success/failure/cancellation, labeled by `flow` + `outcome`, and the
//!   `psd2_sca_status_reads` histogram of status reads per authorisation, labeled by
//!   `method`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Client Credentials grant.
	ClientToken,
	/// Authorization Code grant bound to an authorisation.
	CodeExchange,
	/// Consent or payment creation.
	CreateResource,
	/// Authorisation sub-resource creation.
	StartAuthorisation,
	/// Authentication method submission.
	Negotiation,
	/// Authorisation status read.
	ScaStatus,
	/// Consent or payment status read.
	ResourceStatus,
	/// Consent deletion.
	DeleteConsent,
	/// Authorisation sub-resource listing.
	ListAuthorisations,
	/// Account list read with a valid consent.
	ListAccounts,
	/// Balance read for one account.
	ReadBalances,
	/// Transaction list read for one account.
	ListTransactions,
	/// Single transaction read.
	TransactionDetails,
	/// SCA orchestration after negotiation.
	Authorisation,
	/// Whole run from token to settled resource.
	Run,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::ClientToken => "client_token",
			FlowKind::CodeExchange => "code_exchange",
			FlowKind::CreateResource => "create_resource",
			FlowKind::StartAuthorisation => "start_authorisation",
			FlowKind::Negotiation => "negotiation",
			FlowKind::ScaStatus => "sca_status",
			FlowKind::ResourceStatus => "resource_status",
			FlowKind::DeleteConsent => "delete_consent",
			FlowKind::ListAuthorisations => "list_authorisations",
			FlowKind::ListAccounts => "list_accounts",
			FlowKind::ReadBalances => "read_balances",
			FlowKind::ListTransactions => "list_transactions",
			FlowKind::TransactionDetails => "transaction_details",
			FlowKind::Authorisation => "authorisation",
			FlowKind::Run => "run",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller, or a terminal `failed` status.
	Failure,
	/// Cancelled through the caller's token.
	Cancelled,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
			FlowOutcome::Cancelled => "cancelled",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
