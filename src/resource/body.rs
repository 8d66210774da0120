//! JSON bodies exchanged with the consent and payment APIs.

// crates.io
use serde_json::{Map, Value};
use time::Date;
// self
use crate::{
	_prelude::*,
	auth::{AccountId, AuthMethodId, AuthorisationId, IdentifierError, TransactionId},
	resource::ResourceKind,
};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Body of the consent create call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentAccess {
	/// Access object; an empty object lets the PSU pick accounts during SCA.
	pub access: Map<String, Value>,
	/// Whether the consent may be used repeatedly.
	pub recurring_indicator: bool,
	/// Last day the consent is valid (`yyyy-MM-dd`).
	#[serde(with = "iso_date")]
	pub valid_until: Date,
	/// Daily access budget without the PSU present.
	pub frequency_per_day: u32,
	/// Whether the consent is combined with a payment initiation.
	pub combined_service_indicator: bool,
}
impl ConsentAccess {
	/// Recurring consent valid until `valid_until`.
	pub fn until(valid_until: Date) -> Self {
		Self {
			access: Map::new(),
			recurring_indicator: true,
			valid_until,
			frequency_per_day: 4,
			combined_service_indicator: false,
		}
	}
}
impl Default for ConsentAccess {
	fn default() -> Self {
		Self::until((OffsetDateTime::now_utc() + Duration::days(1)).date())
	}
}

/// Payment service segment of the initiation path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentService {
	/// Single payment.
	Payments,
	/// Bulk payment.
	BulkPayments,
	/// Standing order.
	PeriodicPayments,
}
impl PaymentService {
	/// Path segment.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Payments => "payments",
			Self::BulkPayments => "bulk-payments",
			Self::PeriodicPayments => "periodic-payments",
		}
	}
}

/// Payment create request: route plus instruction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentInitiation {
	/// Service path segment.
	pub service: PaymentService,
	/// Product path segment (for example `domestic` or `sepa-credit-transfers`).
	pub product: String,
	/// JSON body.
	pub instruction: PaymentInstruction,
}
impl PaymentInitiation {
	/// Bundles an instruction with its route.
	pub fn new(
		service: PaymentService,
		product: impl Into<String>,
		instruction: PaymentInstruction,
	) -> Self {
		Self { service, product: product.into(), instruction }
	}
}

/// Amount with ISO 4217 currency; the amount stays a decimal string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
	/// Currency code.
	pub currency: String,
	/// Decimal amount, for example `"100.50"`.
	pub amount: String,
}

/// Account identified by IBAN or BBAN.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountReference {
	/// IBAN.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub iban: Option<String>,
	/// Domestic account number.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub bban: Option<String>,
	/// Account currency.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub currency: Option<String>,
}

/// Payment instruction body.
///
/// Fields outside the common set (bank- or product-specific) go through `extra` and are
/// flattened into the body unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstruction {
	/// Amount to transfer.
	pub instructed_amount: Amount,
	/// Account to debit.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub debtor_account: Option<AccountReference>,
	/// Account to credit.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub creditor_account: Option<AccountReference>,
	/// Creditor name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub creditor_name: Option<String>,
	/// Free-text reference.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub remittance_information_unstructured: Option<String>,
	/// Execution date (`yyyy-MM-dd`).
	#[serde(default, skip_serializing_if = "Option::is_none", with = "iso_date::option")]
	pub requested_execution_date: Option<Date>,
	/// Additional fields passed through verbatim.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// Accounts a valid consent grants access to, kept as raw JSON objects.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountList {
	/// One object per account (identifiers, names, and balances when requested).
	#[serde(default)]
	pub accounts: Vec<Map<String, Value>>,
}
impl AccountList {
	/// `resourceId` of every account that carries one, in listing order.
	pub fn account_ids(&self) -> Result<Vec<AccountId>, IdentifierError> {
		self.accounts
			.iter()
			.filter_map(|account| account.get("resourceId").and_then(Value::as_str))
			.map(AccountId::new)
			.collect()
	}
}

/// Balances of one account.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountBalances {
	/// Account the balances belong to, when the bank echoes it.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub account: Option<AccountReference>,
	/// Raw balance objects (`balanceType`, `balanceAmount`, ...).
	#[serde(default)]
	pub balances: Vec<Map<String, Value>>,
}

/// Which transactions a listing returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
	/// Booked transactions only.
	Booked,
	/// Pending transactions only.
	Pending,
	/// Booked and pending.
	#[default]
	Both,
}
impl BookingStatus {
	/// Query parameter value.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Booked => "booked",
			Self::Pending => "pending",
			Self::Both => "both",
		}
	}
}

/// Filter for a transaction listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionQuery {
	/// `bookingStatus`
	pub booking_status: BookingStatus,
	/// `dateFrom`
	pub date_from: Date,
	/// `dateTo`; open-ended when absent.
	pub date_to: Option<Date>,
}
impl TransactionQuery {
	/// Booked and pending transactions from `date_from` onwards.
	pub fn since(date_from: Date) -> Self {
		Self { booking_status: BookingStatus::Both, date_from, date_to: None }
	}

	/// Restricts the booking status.
	pub fn with_booking_status(mut self, booking_status: BookingStatus) -> Self {
		self.booking_status = booking_status;

		self
	}

	/// Closes the date range.
	pub fn until(mut self, date_to: Date) -> Self {
		self.date_to = Some(date_to);

		self
	}

	pub(crate) fn query_string(&self) -> String {
		let mut query =
			format!("bookingStatus={}&dateFrom={}", self.booking_status.as_str(), self.date_from);

		if let Some(date_to) = self.date_to {
			query.push_str(&format!("&dateTo={date_to}"));
		}

		query
	}
}

/// Transactions of one account, split by booking status.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionList {
	/// Account the transactions belong to, when the bank echoes it.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub account: Option<AccountReference>,
	/// Booked and pending entries.
	#[serde(default)]
	pub transactions: TransactionReport,
}
impl TransactionList {
	/// Ids of booked transactions followed by pending ones; entries without an id are skipped.
	pub fn transaction_ids(&self) -> Result<Vec<TransactionId>, IdentifierError> {
		self.transactions
			.booked
			.iter()
			.chain(&self.transactions.pending)
			.filter_map(|entry| entry.get("transactionId").and_then(Value::as_str))
			.map(TransactionId::new)
			.collect()
	}
}

/// Raw transaction entries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionReport {
	/// Booked entries.
	#[serde(default)]
	pub booked: Vec<Map<String, Value>>,
	/// Pending entries.
	#[serde(default)]
	pub pending: Vec<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthorisationIdsBody {
	#[serde(default)]
	pub(crate) authorisation_ids: Vec<AuthorisationId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionDetailsBody {
	pub(crate) transactions_details: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatedResource {
	#[serde(default)]
	consent_id: Option<String>,
	#[serde(default)]
	payment_id: Option<String>,
}
impl CreatedResource {
	pub(crate) fn id(&self, kind: ResourceKind) -> Option<&str> {
		match kind {
			ResourceKind::Consent => self.consent_id.as_deref(),
			ResourceKind::Payment => self.payment_id.as_deref(),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StartedAuthorisation {
	#[serde(default)]
	pub(crate) authorisation_id: Option<String>,
	#[serde(default)]
	pub(crate) sca_methods: Vec<DeclaredScaMethod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeclaredScaMethod {
	pub(crate) authentication_method_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SelectAuthMethod<'a> {
	pub(crate) authentication_method_id: &'a AuthMethodId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConsentStatusBody {
	#[serde(default)]
	pub(crate) consent_status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionStatusBody {
	#[serde(default)]
	pub(crate) transaction_status: Option<String>,
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::date;
	// self
	use super::*;

	#[test]
	fn consent_body_matches_wire_format() {
		let body = ConsentAccess::until(date!(2026 - 10 - 20));
		let json = serde_json::to_value(&body).expect("Consent body should serialize.");

		assert_eq!(
			json,
			serde_json::json!({
				"access": {},
				"recurringIndicator": true,
				"validUntil": "2026-10-20",
				"frequencyPerDay": 4,
				"combinedServiceIndicator": false
			})
		);
	}

	#[test]
	fn payment_instruction_skips_absent_fields_and_flattens_extras() {
		let mut instruction = PaymentInstruction {
			instructed_amount: Amount { currency: "SEK".into(), amount: "100.50".into() },
			creditor_account: Some(AccountReference {
				bban: Some("52801111116".into()),
				..Default::default()
			}),
			creditor_name: Some("Creditor".into()),
			requested_execution_date: Some(date!(2026 - 10 - 21)),
			..Default::default()
		};

		instruction.extra.insert("endToEndIdentification".into(), "e2e-1".into());

		let json = serde_json::to_value(&instruction).expect("Instruction should serialize.");

		assert_eq!(
			json,
			serde_json::json!({
				"instructedAmount": { "currency": "SEK", "amount": "100.50" },
				"creditorAccount": { "bban": "52801111116" },
				"creditorName": "Creditor",
				"requestedExecutionDate": "2026-10-21",
				"endToEndIdentification": "e2e-1"
			})
		);
	}

	#[test]
	fn transaction_query_formats_dates_as_iso() {
		let query = TransactionQuery::since(date!(2019 - 01 - 01));

		assert_eq!(query.query_string(), "bookingStatus=both&dateFrom=2019-01-01");
		assert_eq!(
			query.with_booking_status(BookingStatus::Booked).until(date!(2019 - 12 - 31)).query_string(),
			"bookingStatus=booked&dateFrom=2019-01-01&dateTo=2019-12-31"
		);
	}

	#[test]
	fn listings_expose_ids_in_order() {
		let accounts: AccountList = serde_json::from_str(
			r#"{"accounts":[{"resourceId":"acc-1"},{"name":"no id"},{"resourceId":"acc-2"}]}"#,
		)
		.expect("Account list should parse.");
		let transactions: TransactionList = serde_json::from_str(
			r#"{"transactions":{"booked":[{"transactionId":"t1"}],"pending":[{"transactionId":"t2"}]}}"#,
		)
		.expect("Transaction list should parse.");
		let account_ids = accounts.account_ids().expect("Account ids should be valid.");
		let transaction_ids =
			transactions.transaction_ids().expect("Transaction ids should be valid.");

		assert_eq!(account_ids.iter().map(|id| &**id).collect::<Vec<_>>(), ["acc-1", "acc-2"]);
		assert_eq!(transaction_ids.iter().map(|id| &**id).collect::<Vec<_>>(), ["t1", "t2"]);

		let hostile: AccountList = serde_json::from_str(r#"{"accounts":[{"resourceId":"a/../b"}]}"#)
			.expect("Account list should parse.");

		assert!(hostile.account_ids().is_err());
	}

	#[test]
	fn started_authorisation_tolerates_missing_methods() {
		let body: StartedAuthorisation = serde_json::from_str("{\"authorisationId\":\"a1\"}")
			.expect("Authorisation body should parse.");

		assert_eq!(body.authorisation_id.as_deref(), Some("a1"));
		assert!(body.sca_methods.is_empty());
	}

	#[test]
	fn created_resource_picks_id_by_kind() {
		let body: CreatedResource =
			serde_json::from_str("{\"paymentId\":\"p1\"}").expect("Create body should parse.");

		assert_eq!(body.id(ResourceKind::Payment), Some("p1"));
		assert_eq!(body.id(ResourceKind::Consent), None);
	}
}
