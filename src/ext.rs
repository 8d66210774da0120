//! Public extension contracts for the outside world an SCA flow talks to.
//!
//! The crate never renders anything or reads user input. Callers plug in a presenter that
//! shows redirect links and decoupled challenges, and a code source that delivers the
//! authorization code once the PSU returns from an OAuth redirect.

pub mod auth_code;
pub mod presenter;

pub use auth_code::*;
pub use presenter::*;

/// Agents the orchestrator hands user-facing work to.
#[derive(Clone, Copy)]
pub struct ScaAgents<'a> {
	/// Receives everything the PSU should see.
	pub presenter: &'a dyn ScaPresenter,
	/// Delivers authorization codes after OAuth redirects.
	pub codes: &'a dyn AuthCodeSource,
}
impl<'a> ScaAgents<'a> {
	/// Bundles a presenter and a code source.
	pub fn new(presenter: &'a dyn ScaPresenter, codes: &'a dyn AuthCodeSource) -> Self {
		Self { presenter, codes }
	}
}
