//! SCA method selection.

// self
use crate::{
	_prelude::*,
	auth::{AuthMethodId, BicFi},
};

/// Picks the authentication method to submit for a started authorisation.
pub trait AuthMethodPolicy: Send + Sync {
	/// Returns the method to submit, or `None` when no acceptable method exists.
	fn choose(&self, bic_fi: &BicFi, offered: &[AuthMethodId]) -> Option<AuthMethodId>;
}

/// Preference list with per-bank overrides.
///
/// A BIC override always wins. Otherwise the preferred method is chosen when the bank offers
/// it, and the fallback is submitted unconditionally. Several banks omit `scaMethods` even
/// though they accept the fallback.
#[derive(Clone, Debug)]
pub struct DefaultAuthMethodPolicy {
	preferred: AuthMethodId,
	fallback: Option<AuthMethodId>,
	overrides: HashMap<BicFi, AuthMethodId>,
}
impl DefaultAuthMethodPolicy {
	/// Animated QR code for Mobile BankID.
	pub const ANIMATED_QR: &'static str = "mbid_animated_qr_image";
	/// Plain Mobile BankID.
	pub const MOBILE_BANKID: &'static str = "mbid";

	/// Policy with explicit preferred and fallback methods.
	pub fn new(preferred: AuthMethodId, fallback: Option<AuthMethodId>) -> Self {
		Self { preferred, fallback, overrides: HashMap::new() }
	}

	/// Forces `method` for one bank.
	pub fn with_override(mut self, bic_fi: BicFi, method: AuthMethodId) -> Self {
		self.overrides.insert(bic_fi, method);

		self
	}
}
impl Default for DefaultAuthMethodPolicy {
	fn default() -> Self {
		Self::new(
			AuthMethodId::from_static(Self::ANIMATED_QR),
			Some(AuthMethodId::from_static(Self::MOBILE_BANKID)),
		)
	}
}
impl AuthMethodPolicy for DefaultAuthMethodPolicy {
	fn choose(&self, bic_fi: &BicFi, offered: &[AuthMethodId]) -> Option<AuthMethodId> {
		if let Some(method) = self.overrides.get(bic_fi) {
			return Some(method.clone());
		}
		if offered.contains(&self.preferred) {
			return Some(self.preferred.clone());
		}

		self.fallback.clone()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn method(raw: &str) -> AuthMethodId {
		AuthMethodId::new(raw).expect("Method fixture should be valid.")
	}

	fn bic(raw: &str) -> BicFi {
		BicFi::new(raw).expect("BIC fixture should be valid.")
	}

	#[test]
	fn prefers_animated_qr_when_offered() {
		let policy = DefaultAuthMethodPolicy::default();
		let offered = [method("mbid"), method("mbid_animated_qr_image")];

		assert_eq!(policy.choose(&bic("ESSESESS"), &offered), Some(method("mbid_animated_qr_image")));
	}

	#[test]
	fn falls_back_even_when_nothing_is_offered() {
		let policy = DefaultAuthMethodPolicy::default();

		assert_eq!(policy.choose(&bic("ESSESESS"), &[]), Some(method("mbid")));
		assert_eq!(
			DefaultAuthMethodPolicy::new(method("mbid_animated_qr_image"), None)
				.choose(&bic("ESSESESS"), &[method("sms")]),
			None
		);
	}

	#[test]
	fn bank_override_wins() {
		let policy = DefaultAuthMethodPolicy::default()
			.with_override(bic("SWEDSESS"), method("mbid_same_device"));
		let offered = [method("mbid_animated_qr_image")];

		assert_eq!(policy.choose(&bic("SWEDSESS"), &offered), Some(method("mbid_same_device")));
		assert_eq!(policy.choose(&bic("HANDSESS"), &offered), Some(method("mbid_animated_qr_image")));
	}
}
