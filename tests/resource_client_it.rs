// crates.io
use httpmock::prelude::*;
use time::macros::date;
// self
use psd2_sca::{
	_preludet::*,
	aspsp::ApiDescriptor,
	auth::{AccountId, ResourceId, TransactionId},
	error::ResourceError,
	resource::{
		AuthorizableResource, BookingStatus, ConsentAccess, ConsentStatus, PaymentInitiation,
		PaymentInstruction, PaymentService, ResourceRequest, ResourceStatus, TransactionQuery,
	},
};

fn build_descriptor(server: &MockServer) -> ApiDescriptor {
	ApiDescriptor::builder()
		.token_endpoint(
			Url::parse(&server.url("/connect/token"))
				.expect("Mock token endpoint should parse successfully."),
		)
		.api_base(Url::parse(&server.base_url()).expect("Mock API base should parse successfully."))
		.build()
		.expect("API descriptor should build successfully.")
}

fn consent_request() -> ResourceRequest {
	ResourceRequest::Consent(ConsentAccess::default())
}

fn existing_consent() -> AuthorizableResource {
	AuthorizableResource::new(
		ResourceId::new("c1").expect("Consent id fixture should be valid."),
		&consent_request(),
		test_target(),
		test_psu().with_psu_id("19121212-1212"),
	)
}

#[tokio::test]
async fn create_consent_sends_routing_headers() {
	let server = MockServer::start_async().await;
	let client = build_reqwest_test_client(build_descriptor(&server));
	let token = test_token("private accountinformation");
	let target = test_target().with_affiliated_aspsp("ESSESESS-SUB");
	let psu = test_psu();
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/psd2/consent/v1/consents")
				.header("authorization", "Bearer token-it")
				.header("x-bicfi", "ESSESESS")
				.header("x-affiliatedaspsp-id", "ESSESESS-SUB")
				.header("psu-ip-address", "192.168.0.1")
				.header("psu-user-agent", "psd2-sca-tests/1.0")
				.header("tpp-redirect-preferred", "false")
				.header("content-type", "application/json")
				.header_exists("x-request-id");
			then.status(201).header("content-type", "application/json").body(
				"{\"consentId\":\"c1\",\"consentStatus\":\"received\"}",
			);
		})
		.await;
	let resource = client
		.create_resource(&token, &consent_request(), &target, &psu)
		.await
		.expect("Consent creation should succeed.");

	mock.assert_async().await;

	assert_eq!(&*resource.id, "c1");
	assert_eq!(resource.path(), "/psd2/consent/v1/consents/c1");
}

#[tokio::test]
async fn create_payment_surfaces_bank_rejection() {
	let server = MockServer::start_async().await;
	let client = build_reqwest_test_client(build_descriptor(&server));
	let token = test_token("private paymentinitiation");
	let request = ResourceRequest::Payment(PaymentInitiation::new(
		PaymentService::Payments,
		"domestic",
		PaymentInstruction::default(),
	));
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/psd2/paymentinitiation/v1/payments/domestic");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"tppMessages\":[{\"code\":\"FORMAT_ERROR\"}]}");
		})
		.await;
	let err = client
		.create_resource(&token, &request, &test_target(), &test_psu())
		.await
		.expect_err("Rejected payment should fail.");

	assert!(matches!(
		&err,
		Error::Resource(ResourceError::Status { status: 400, body, .. }) if body.contains("FORMAT_ERROR")
	));
}

#[tokio::test]
async fn start_authorisation_requires_an_id() {
	let server = MockServer::start_async().await;
	let client = build_reqwest_test_client(build_descriptor(&server));
	let token = test_token("private accountinformation");
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/psd2/consent/v1/consents/c1/authorisations")
				.header("psu-id", "19121212-1212");
			then.status(201)
				.header("content-type", "application/json")
				.body("{\"scaMethods\":[{\"authenticationMethodId\":\"mbid\"}]}");
		})
		.await;
	let err = client
		.start_authorisation(&token, &existing_consent())
		.await
		.expect_err("Missing authorisation id should fail.");

	assert!(matches!(
		err,
		Error::Resource(ResourceError::MissingField { field: "authorisationId", .. })
	));
}

#[tokio::test]
async fn consent_status_and_delete() {
	let server = MockServer::start_async().await;
	let client = build_reqwest_test_client(build_descriptor(&server));
	let token = test_token("private accountinformation");
	let consent = existing_consent();
	let status = server
		.mock_async(|when, then| {
			when.method(GET).path("/psd2/consent/v1/consents/c1/status");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"consentStatus\":\"revokedByPsu\"}");
		})
		.await;
	let delete = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/psd2/consent/v1/consents/c1");
			then.status(204);
		})
		.await;

	assert_eq!(
		client.resource_status(&token, &consent).await.expect("Status read should succeed."),
		ResourceStatus::Consent(ConsentStatus::RevokedByPsu)
	);

	client.delete_consent(&token, &consent).await.expect("Consent deletion should succeed.");

	status.assert_async().await;
	delete.assert_async().await;
}

#[tokio::test]
async fn list_accounts_sends_consent_id() {
	let server = MockServer::start_async().await;
	let client = build_reqwest_test_client(build_descriptor(&server));
	let token = test_token("private accountinformation");
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/psd2/accountinformation/v1/accounts")
				.query_param("withBalance", "true")
				.header("consent-id", "c1");
			then.status(200).header("content-type", "application/json").body(
				"{\"accounts\":[{\"resourceId\":\"acc-1\",\"iban\":\"SE4550000000058398257466\"}]}",
			);
		})
		.await;
	let accounts = client
		.list_accounts(&token, &existing_consent())
		.await
		.expect("Account listing should succeed.");

	mock.assert_async().await;

	assert_eq!(accounts.accounts.len(), 1);
	assert_eq!(accounts.accounts[0]["resourceId"], "acc-1");
}

fn account() -> AccountId {
	AccountId::new("5a59028c-e757-4f22-b88c-3ba90573383c")
		.expect("Account id fixture should be valid.")
}

fn existing_payment() -> AuthorizableResource {
	AuthorizableResource::new(
		ResourceId::new("p1").expect("Payment id fixture should be valid."),
		&ResourceRequest::Payment(PaymentInitiation::new(
			PaymentService::Payments,
			"domestic",
			PaymentInstruction::default(),
		)),
		test_target(),
		test_psu(),
	)
}

#[tokio::test]
async fn balances_are_read_per_account() {
	let server = MockServer::start_async().await;
	let client = build_reqwest_test_client(build_descriptor(&server));
	let token = test_token("private accountinformation");
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/psd2/accountinformation/v1/accounts/5a59028c-e757-4f22-b88c-3ba90573383c/balances")
				.header("consent-id", "c1")
				.header("x-bicfi", "ESSESESS")
				.header_exists("x-request-id");
			then.status(200).header("content-type", "application/json").body(
				"{\"account\":{\"iban\":\"SE4550000000058398257466\"},\"balances\":[{\"balanceType\":\"interimAvailable\",\"balanceAmount\":{\"currency\":\"SEK\",\"amount\":\"100.00\"}}]}",
			);
		})
		.await;
	let balances = client
		.account_balances(&token, &existing_consent(), &account())
		.await
		.expect("Balance read should succeed.");

	mock.assert_async().await;

	assert_eq!(
		balances.account.and_then(|account| account.iban).as_deref(),
		Some("SE4550000000058398257466")
	);
	assert_eq!(balances.balances.len(), 1);
	assert_eq!(balances.balances[0]["balanceType"], "interimAvailable");
}

#[tokio::test]
async fn transactions_are_filtered_by_booking_status_and_date() {
	let server = MockServer::start_async().await;
	let client = build_reqwest_test_client(build_descriptor(&server));
	let token = test_token("private accountinformation");
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/psd2/accountinformation/v1/accounts/5a59028c-e757-4f22-b88c-3ba90573383c/transactions")
				.query_param("bookingStatus", "both")
				.query_param("dateFrom", "2019-01-01")
				.header("consent-id", "c1");
			then.status(200).header("content-type", "application/json").body(
				"{\"transactions\":{\"booked\":[{\"transactionId\":\"t1\"}],\"pending\":[{\"transactionId\":\"t2\"}]}}",
			);
		})
		.await;
	let list = client
		.list_transactions(
			&token,
			&existing_consent(),
			&account(),
			&TransactionQuery::since(date!(2019 - 01 - 01)),
		)
		.await
		.expect("Transaction listing should succeed.");

	mock.assert_async().await;

	let ids = list.transaction_ids().expect("Transaction ids should be valid.");

	assert_eq!(ids.iter().map(|id| &**id).collect::<Vec<_>>(), ["t1", "t2"]);
}

#[tokio::test]
async fn transaction_listing_forwards_closed_ranges() {
	let server = MockServer::start_async().await;
	let client = build_reqwest_test_client(build_descriptor(&server));
	let token = test_token("private accountinformation");
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/psd2/accountinformation/v1/accounts/5a59028c-e757-4f22-b88c-3ba90573383c/transactions")
				.query_param("bookingStatus", "booked")
				.query_param("dateFrom", "2019-01-01")
				.query_param("dateTo", "2019-06-30");
			then.status(200).header("content-type", "application/json").body("{}");
		})
		.await;
	let query = TransactionQuery::since(date!(2019 - 01 - 01))
		.with_booking_status(BookingStatus::Booked)
		.until(date!(2019 - 06 - 30));
	let list = client
		.list_transactions(&token, &existing_consent(), &account(), &query)
		.await
		.expect("Transaction listing should succeed.");

	mock.assert_async().await;

	assert!(list.transactions.booked.is_empty());
	assert!(list.transactions.pending.is_empty());
}

#[tokio::test]
async fn transaction_details_unwrap_the_details_object() {
	let server = MockServer::start_async().await;
	let client = build_reqwest_test_client(build_descriptor(&server));
	let token = test_token("private accountinformation");
	let transaction = TransactionId::new("1630de32-07d4-41b1-b207-b673249a2275")
		.expect("Transaction id fixture should be valid.");
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/psd2/accountinformation/v1/accounts/5a59028c-e757-4f22-b88c-3ba90573383c/transactions/1630de32-07d4-41b1-b207-b673249a2275")
				.header("consent-id", "c1");
			then.status(200).header("content-type", "application/json").body(
				"{\"transactionsDetails\":{\"transactionId\":\"1630de32-07d4-41b1-b207-b673249a2275\",\"creditorName\":\"Creditor\"}}",
			);
		})
		.await;
	let details = client
		.transaction_details(&token, &existing_consent(), &account(), &transaction)
		.await
		.expect("Transaction read should succeed.");

	mock.assert_async().await;

	assert_eq!(details["creditorName"], "Creditor");
}

#[tokio::test]
async fn authorisation_sub_resources_are_listed_for_both_kinds() {
	let server = MockServer::start_async().await;
	let client = build_reqwest_test_client(build_descriptor(&server));
	let consent = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/psd2/consent/v1/consents/c1/authorisations")
				.header("psu-id", "19121212-1212");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"authorisationIds\":[\"a1\",\"a2\"]}");
		})
		.await;
	let payment = server
		.mock_async(|when, then| {
			when.method(GET).path("/psd2/paymentinitiation/v1/payments/domestic/p1/authorisations");
			then.status(200).header("content-type", "application/json").body("{}");
		})
		.await;
	let consent_ids = client
		.list_authorisations(&test_token("private accountinformation"), &existing_consent())
		.await
		.expect("Consent authorisation listing should succeed.");
	let payment_ids = client
		.list_authorisations(&test_token("private paymentinitiation"), &existing_payment())
		.await
		.expect("Payment authorisation listing should succeed.");

	consent.assert_async().await;
	payment.assert_async().await;

	assert_eq!(consent_ids.iter().map(|id| &**id).collect::<Vec<_>>(), ["a1", "a2"]);
	assert!(payment_ids.is_empty());
}

#[tokio::test]
async fn hostile_authorisation_ids_are_rejected() {
	let server = MockServer::start_async().await;
	let client = build_reqwest_test_client(build_descriptor(&server));
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/psd2/consent/v1/consents/c1/authorisations");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"authorisationIds\":[\"../../payments/p9\"]}");
		})
		.await;
	let err = client
		.list_authorisations(&test_token("private accountinformation"), &existing_consent())
		.await
		.expect_err("Ids that would leave their path segment should be refused.");

	assert!(matches!(err, Error::Resource(ResourceError::MalformedResponse { .. })));
}

#[tokio::test]
async fn consent_only_operations_refuse_payments() {
	let server = MockServer::start_async().await;
	let client = build_reqwest_test_client(build_descriptor(&server));
	let token = test_token("private paymentinitiation");
	let payment = existing_payment();
	let err = client
		.delete_consent(&token, &payment)
		.await
		.expect_err("Deleting a payment should be refused.");

	assert!(matches!(err, Error::Resource(ResourceError::Unsupported { .. })));

	let err = client
		.list_accounts(&token, &payment)
		.await
		.expect_err("Listing accounts under a payment should be refused.");

	assert!(matches!(err, Error::Resource(ResourceError::Unsupported { .. })));

	let err = client
		.account_balances(&token, &payment, &account())
		.await
		.expect_err("Reading balances under a payment should be refused.");

	assert!(matches!(err, Error::Resource(ResourceError::Unsupported { .. })));
}
