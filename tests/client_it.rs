// std
use std::{sync::Arc, time::Duration};
// crates.io
use httpmock::prelude::*;
// self
use helpscout_exec::{
	auth::Credentials,
	client::{ApiRequest, Client, ReqwestApiClient},
	config::ClientConfig,
	error::{AuthError, Error, TransportError},
	gate::RateGate,
	retry::RetryPolicy,
};

const TOKEN_BODY: &str = "{\"token_type\":\"bearer\",\"access_token\":\"tok-1\",\"expires_in\":7200}";
const MAILBOXES: &str =
	"{\"_embedded\":{\"mailboxes\":[{\"id\":11,\"name\":\"Support\",\"email\":\"help@example.com\"}]}}";

fn build_client(server: &MockServer, policy: RetryPolicy, timeout: Duration) -> ReqwestApiClient {
	let credentials =
		Credentials::new("app-it", "secret-it").expect("Integration credentials should be valid.");
	let config = ClientConfig::builder()
		.base_url(server.url("/v2"))
		.usage_factor(0.5)
		.timeout(timeout)
		.retry_policy(policy)
		.build()
		.expect("Integration config should be valid.");

	Client::with_config(credentials, config)
		.expect("Reqwest client should build.")
		.with_rate_gate(Arc::new(RateGate::default()))
}

fn instant(max_attempts: u32) -> RetryPolicy {
	RetryPolicy::default().with_max_attempts(max_attempts).with_base_delay(Duration::ZERO)
}

async fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v2/oauth2/token")
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await
}

#[tokio::test]
async fn first_call_fetches_a_token_and_learns_the_rate_limit() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server).await;
	let mailboxes = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/mailboxes").header("authorization", "Bearer tok-1");
			then.status(200)
				.header("content-type", "application/json")
				.header("X-RateLimit-Limit-Minute", "200")
				.header("X-RateLimit-Remaining-Minute", "195")
				.body(MAILBOXES);
		})
		.await;
	let client = build_client(&server, instant(3), Duration::from_secs(5));
	let listed = client.list_mailboxes().await.expect("Mailboxes should be listed.");

	assert_eq!(listed.len(), 1);
	assert_eq!(listed[0].id, 11);

	let selected = client.select_mailbox("help@example.com").await.expect("Mailbox should match.");

	assert_eq!(selected, 11);
	assert_eq!(client.rate_gate().capacity(), Some(100));
	assert_eq!(client.rate_gate().used(), 6);

	token.assert_calls_async(1).await;
	mailboxes.assert_calls_async(2).await;
}

#[tokio::test]
async fn created_conversation_id_comes_from_resource_id() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let create = server
		.mock_async(|when, then| {
			when.method(POST).path("/v2/conversations").header("content-type", "application/json");
			then.status(201).header("Resource-ID", "4242");
		})
		.await;
	let client = build_client(&server, instant(3), Duration::from_secs(5));

	client.set_mailbox_id(11);

	let conversation = helpscout_exec::api::NewConversation::new(
		"Integration",
		helpscout_exec::api::Customer::with_email("jane@example.com"),
		time::OffsetDateTime::UNIX_EPOCH,
	);
	let id = client.new_conversation(&conversation).await.expect("Conversation should be created.");

	assert_eq!(id, 4242);

	create.assert_async().await;
}

#[tokio::test]
async fn server_errors_exhaust_the_budget() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let failing = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/mailboxes");
			then.status(500).body("{\"error\":\"boom\"}");
		})
		.await;
	let client = build_client(&server, instant(3), Duration::from_secs(5));
	let err =
		client.execute(ApiRequest::get("mailboxes")).await.expect_err("Budget should run out.");

	match err {
		Error::RetryExhausted { attempts, source } => {
			assert_eq!(attempts, 3);
			assert_eq!(source.status(), Some(500));
		},
		other => panic!("Unexpected error: {other:?}."),
	}

	failing.assert_calls_async(3).await;
}

#[tokio::test]
async fn rejected_credentials_surface_as_auth_errors() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/v2/oauth2/token");
			then.status(401).body("{\"error\":\"invalid_client\"}");
		})
		.await;
	let resource = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/mailboxes");
			then.status(200).body(MAILBOXES);
		})
		.await;
	let client = build_client(&server, instant(10), Duration::from_secs(5));
	let err = client.list_mailboxes().await.expect_err("Authentication should fail.");

	assert!(matches!(err, Error::Auth(AuthError::Rejected { status: 401, .. })));

	token.assert_calls_async(1).await;
	resource.assert_calls_async(0).await;
}

#[tokio::test]
async fn slow_responses_time_out_and_are_retried() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let slow = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/mailboxes");
			then.status(200).body(MAILBOXES).delay(Duration::from_millis(500));
		})
		.await;
	let client = build_client(&server, instant(2), Duration::from_millis(50));
	let err = client.list_mailboxes().await.expect_err("Every attempt should time out.");

	match err {
		Error::RetryExhausted { attempts: 2, source } =>
			assert!(matches!(*source, Error::Transport(TransportError::Timeout { .. }))),
		other => panic!("Unexpected error: {other:?}."),
	}

	slow.assert_calls_async(2).await;
}
