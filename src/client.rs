//! Request executor: lazy authentication, rate gating, classification, and retries.
//!
//! [`Client::execute`] is the single entry point every endpoint wrapper goes through. A call
//! makes sure a token exists (fetching one through a nested, unauthenticated call into the same
//! executor), then hands the retry driver an attempt that admits the request through the shared
//! [`RateGate`], sends it, and classifies the response:
//!
//! - `2xx`: success; the first response advertising a per-minute budget sizes the gate.
//! - `401`: the token used by this attempt is replaced and the attempt is retried without
//!   charging the budget.
//! - any other status or a transport failure: retried with backoff until the budget runs out.

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;

// crates.io
use oauth2::{
	basic::BasicTokenResponse,
	http::{HeaderMap, StatusCode},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Credentials, TokenStore},
	config::ClientConfig,
	error::{AuthError, ConfigError, StatusError},
	gate::{self, RateGate, RateLimitHeaders},
	http::HttpTransport,
	obs::{self, CallKind, CallOutcome, CallSpan},
	registry::{ConnectionId, ConnectionRegistry},
	retry::{Attempt, FailureObserver, RetryDriver},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<AccessToken>> + 'a + Send>>;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = Client<ReqwestHttpClient>;

/// Authenticated, rate-aware API client.
///
/// Each client owns its credentials and token store and shares a [`RateGate`] with every other
/// client in the process unless one is injected with [`Client::with_rate_gate`]. The currently
/// selected mailbox is per client as well.
pub struct Client<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	config: ClientConfig,
	credentials: Credentials,
	tokens: Arc<TokenStore>,
	gate: Arc<RateGate>,
	retry: RetryDriver,
	connection: ConnectionId,
	mailbox: RwLock<Option<u64>>,
}
impl<T> Client<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client over a caller-provided transport.
	pub fn with_transport(
		credentials: Credentials,
		config: ClientConfig,
		transport: impl Into<Arc<T>>,
	) -> Self {
		Self {
			transport: transport.into(),
			retry: RetryDriver::new(config.retry_policy().clone()),
			config,
			credentials,
			tokens: Default::default(),
			gate: RateGate::shared(),
			connection: ConnectionRegistry::global().register(),
			mailbox: RwLock::new(None),
		}
	}

	/// Replaces the shared rate gate.
	pub fn with_rate_gate(mut self, gate: Arc<RateGate>) -> Self {
		self.gate = gate;

		self
	}

	/// Replaces the token store, e.g. to share one token between clients of the same app.
	pub fn with_token_store(mut self, tokens: Arc<TokenStore>) -> Self {
		self.tokens = tokens;

		self
	}

	/// Replaces the observer called for every counted, retryable failure.
	pub fn with_failure_observer(mut self, observer: FailureObserver) -> Self {
		self.retry = self.retry.with_observer(observer);

		self
	}

	/// Takes the connection id from `registry` instead of the process-wide one.
	pub fn with_registry(mut self, registry: &ConnectionRegistry) -> Self {
		self.connection = registry.register();

		self
	}

	/// Settings in effect.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Identifier used to correlate this client's log lines.
	pub fn connection(&self) -> ConnectionId {
		self.connection
	}

	/// Token store used by this client.
	pub fn token_store(&self) -> &Arc<TokenStore> {
		&self.tokens
	}

	/// Rate gate used by this client.
	pub fn rate_gate(&self) -> &Arc<RateGate> {
		&self.gate
	}

	/// Currently selected mailbox.
	pub fn mailbox_id(&self) -> Option<u64> {
		*self.mailbox.read()
	}

	/// Selects a mailbox by id without checking that it exists.
	pub fn set_mailbox_id(&self, id: u64) {
		*self.mailbox.write() = Some(id);
	}

	/// Clears the mailbox selection.
	pub fn deselect_mailbox(&self) {
		*self.mailbox.write() = None;
	}

	/// Returns the current token, fetching one if none is held yet.
	pub async fn authenticate(&self) -> Result<AccessToken> {
		match self.tokens.read() {
			Some(token) => Ok(token),
			None => self.replace_token(None).await,
		}
	}

	/// Performs one logical call.
	pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
		self.call(&request, CallKind::Resource).await
	}

	/// Performs one logical call and decodes the body into `D`.
	///
	/// A body that does not match `D` fails with [`Error::Decode`] and is never retried.
	pub async fn execute_json<D>(&self, request: ApiRequest) -> Result<(D, ApiResponse)>
	where
		D: DeserializeOwned,
	{
		let response = self.execute(request).await?;
		let decoded = response.json()?;

		Ok((decoded, response))
	}

	async fn call(&self, request: &ApiRequest, kind: CallKind) -> Result<ApiResponse> {
		let span = CallSpan::new(kind, self.connection, request.method(), request.path());

		obs::record_call_outcome(kind, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				match kind {
					CallKind::Resource => {
						self.authenticate().await?;
						self.retry.run(|| self.attempt(request, kind)).await
					},
					// Token fetches are a single attempt; the caller owns the retry.
					CallKind::TokenFetch => match self.attempt(request, kind).await {
						Attempt::Success(response) => Ok(response),
						Attempt::Retryable(err) | Attempt::Terminal(err) => Err(err),
						Attempt::AuthRetry =>
							Err(AuthError::Rejected { status: 401, body: String::new() }.into()),
					},
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_call_outcome(kind, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(kind, CallOutcome::Failure),
		}

		result
	}

	async fn attempt(&self, request: &ApiRequest, kind: CallKind) -> Attempt<ApiResponse> {
		match self.send_once(request, kind).await {
			Ok(outcome) => outcome,
			Err(err) => Attempt::Terminal(err),
		}
	}

	async fn send_once(
		&self,
		request: &ApiRequest,
		kind: CallKind,
	) -> Result<Attempt<ApiResponse>> {
		let token = match kind {
			CallKind::Resource => self.tokens.read(),
			CallKind::TokenFetch => None,
		};
		let url = self.config.resource_url(request.path())?;
		let http_request = request.build(&url, token.as_ref())?;

		self.gate.admit(gate::request_cost(request.method())).await;
		obs::request_sent(self.connection, request.method(), url.as_str());

		let response = match self.transport.execute(http_request, self.config.timeout()).await {
			Ok(response) => response,
			Err(err) => return Ok(Attempt::Retryable(err.into())),
		};
		let status = response.status();
		let (parts, body) = response.into_parts();

		obs::response_received(
			self.connection,
			url.as_str(),
			status.as_u16(),
			&body,
			self.config.verbose(),
		);

		if status == StatusCode::UNAUTHORIZED {
			return match kind {
				CallKind::Resource => {
					self.replace_token(token.as_ref()).await?;

					Ok(Attempt::AuthRetry)
				},
				CallKind::TokenFetch => Err(AuthError::Rejected {
					status: status.as_u16(),
					body: String::from_utf8_lossy(&body).into_owned(),
				}
				.into()),
			};
		}
		if !status.is_success() {
			return Ok(Attempt::Retryable(
				StatusError {
					url: url.into(),
					status: status.as_u16(),
					body: String::from_utf8_lossy(&body).into_owned(),
					headers: self.config.verbose().then_some(parts.headers),
				}
				.into(),
			));
		}

		self.observe_rate_limit(&parts.headers);

		Ok(Attempt::Success(ApiResponse::new(url.into(), status, parts.headers, body)))
	}

	async fn replace_token(&self, stale: Option<&AccessToken>) -> Result<AccessToken> {
		let mut fetched = false;
		let token = self
			.tokens
			.refresh(stale, || {
				fetched = true;

				self.fetch_token()
			})
			.await?;

		obs::token_replaced(self.connection, fetched);

		Ok(token)
	}

	// Boxed to break the `call` -> `authenticate` -> `fetch_token` -> `call` cycle.
	fn fetch_token(&self) -> TokenFuture<'_> {
		Box::pin(async move {
			let request = ApiRequest::form(self.config.token_path(), self.credentials.token_form());
			let response = self.call(&request, CallKind::TokenFetch).await?;
			let grant = response.json::<BasicTokenResponse>()?;

			Ok(grant.into())
		})
	}

	fn observe_rate_limit(&self, headers: &HeaderMap) {
		if self.gate.capacity().is_some() {
			return;
		}

		let Some(advertised) = RateLimitHeaders::parse(headers) else {
			return;
		};
		let capacity = advertised.scaled(self.config.usage_factor());

		if self.gate.learn(capacity) {
			let precharged = self.gate.release_after(advertised.deficit(), self.gate.window());

			obs::rate_limit_learned(advertised.limit, capacity, precharged);
		}
	}
}
#[cfg(feature = "reqwest")]
impl Client<ReqwestHttpClient> {
	/// Creates a client with the default configuration and a fresh reqwest transport.
	pub fn new(credentials: Credentials) -> Result<Self> {
		Self::with_config(credentials, ClientConfig::builder().build()?)
	}

	/// Creates a client with `config` and a fresh reqwest transport.
	pub fn with_config(credentials: Credentials, config: ClientConfig) -> Result<Self> {
		let http = ReqwestClient::builder().build().map_err(ConfigError::from)?;

		Ok(Self::with_transport(credentials, config, ReqwestHttpClient::with_client(http)))
	}
}
impl<T> Debug for Client<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("connection", &self.connection)
			.field("base_url", &self.config.base_url().as_str())
			.field("credentials", &self.credentials)
			.field("mailbox", &self.mailbox_id())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
	// crates.io
	use tokio::sync::Barrier;
	// self
	use super::*;
	use crate::{
		_preludet::*,
		error::{DecodeError, TransportError},
		http::{HttpRequest, TransportFuture},
		retry::AttemptFailure,
	};

	#[derive(Serialize)]
	struct Payload<'a> {
		subject: &'a str,
		#[serde(skip_serializing_if = "Option::is_none")]
		note: Option<&'a str>,
	}

	fn setup(
		replies: impl IntoIterator<Item = Scripted>,
		max_attempts: u32,
	) -> (Client<ScriptedTransport>, Arc<ScriptedTransport>, Arc<RateGate>) {
		let transport = Arc::new(ScriptedTransport::new(replies));
		let (client, gate) = scripted_client(transport.clone(), scripted_config(max_attempts));

		(client, transport, gate)
	}

	fn counting(client: Client<ScriptedTransport>) -> (Client<ScriptedTransport>, Arc<AtomicU32>) {
		let observed = Arc::new(AtomicU32::new(0));
		let client = client.with_failure_observer({
			let observed = observed.clone();

			Arc::new(move |_: &AttemptFailure<'_>| {
				observed.fetch_add(1, Ordering::SeqCst);
			})
		});

		(client, observed)
	}

	#[tokio::test]
	async fn json_body_round_trips_without_absent_fields() {
		let (client, transport, _) = setup([Scripted::Echo], 1);
		let request = ApiRequest::json("echo", &Payload { subject: "Hello", note: None })
			.expect("Payload should encode.");
		let (echoed, _) = client
			.execute_json::<serde_json::Value>(request)
			.await
			.expect("Echo should succeed.");

		assert_eq!(echoed, serde_json::json!({ "subject": "Hello" }));

		let sent = transport.resource_requests();

		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].authorization(), Some("Bearer token-1"));
		assert_eq!(transport.token_calls(), 1);
	}

	// Holds the first `parties` resource responses until all of them have been served.
	struct LockstepTransport {
		inner: Arc<ScriptedTransport>,
		barrier: Barrier,
		parties: usize,
		held: AtomicUsize,
	}
	impl HttpTransport for LockstepTransport {
		fn execute(&self, request: HttpRequest, timeout: Duration) -> TransportFuture<'_> {
			Box::pin(async move {
				let is_token = request.uri().path().ends_with("oauth2/token");
				let response = self.inner.execute(request, timeout).await;

				if !is_token && self.held.fetch_add(1, Ordering::SeqCst) < self.parties {
					self.barrier.wait().await;
				}

				response
			})
		}
	}

	#[tokio::test]
	async fn concurrent_unauthorized_calls_share_one_refresh() {
		let inner = Arc::new(ScriptedTransport::new([
			Scripted::status(401, ""),
			Scripted::status(401, ""),
			Scripted::ok("{}"),
			Scripted::ok("{}"),
		]));
		let transport = Arc::new(LockstepTransport {
			inner: inner.clone(),
			barrier: Barrier::new(2),
			parties: 2,
			held: AtomicUsize::new(0),
		});
		let client = Client::<LockstepTransport>::with_transport(test_credentials(), scripted_config(1), transport)
			.with_rate_gate(Arc::new(RateGate::default()))
			.with_token_store(Arc::new(TokenStore::default()));

		client.authenticate().await.expect("Initial grant should be fetched.");

		let (first, second) = tokio::join!(
			client.execute(ApiRequest::get("mailboxes")),
			client.execute(ApiRequest::get("mailboxes")),
		);

		first.expect("First call should succeed after the refresh.");
		second.expect("Second call should succeed after the refresh.");

		let sent = inner.resource_requests();

		assert_eq!(inner.token_calls(), 2);
		assert_eq!(client.token_store().fetches(), 2);
		assert_eq!(sent.len(), 4);
		assert_eq!(sent[0].authorization(), Some("Bearer token-1"));
		assert_eq!(sent[1].authorization(), Some("Bearer token-1"));
		assert_eq!(sent[2].authorization(), Some("Bearer token-2"));
		assert_eq!(sent[3].authorization(), Some("Bearer token-2"));
	}

	#[tokio::test]
	async fn nine_auth_failures_do_not_exhaust_ten_attempts() {
		let replies = (0..9).map(|_| Scripted::status(401, "")).chain([Scripted::ok("{}")]);
		let (client, observed) = counting(setup(replies, 10).0);

		client.execute(ApiRequest::get("mailboxes")).await.expect("Tenth request should pass.");

		assert_eq!(observed.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn eleven_auth_failures_still_succeed_and_refresh_each_time() {
		let replies = (0..11).map(|_| Scripted::status(401, "")).chain([Scripted::ok("{}")]);
		let (client, transport, _) = setup(replies, 10);

		client.execute(ApiRequest::get("mailboxes")).await.expect("Twelfth request should pass.");

		let sent = transport.resource_requests();

		assert_eq!(sent.len(), 12);
		assert_eq!(transport.token_calls(), 12);
		assert_eq!(sent[11].authorization(), Some("Bearer token-12"));
		assert_eq!(client.token_store().fetches(), 12);
	}

	#[tokio::test]
	async fn one_server_error_is_observed_once() {
		let (client, observed) =
			counting(setup([Scripted::status(500, "oops"), Scripted::ok("{}")], 10).0);

		client.execute(ApiRequest::get("mailboxes")).await.expect("Retry should succeed.");

		assert_eq!(observed.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn retryable_failures_exhaust_the_budget() {
		let replies =
			[Scripted::NetworkError, Scripted::status(503, "busy"), Scripted::status(502, "")];
		let (client, transport, _) = setup(replies, 3);
		let err =
			client.execute(ApiRequest::get("mailboxes")).await.expect_err("Budget should run out.");

		match err {
			Error::RetryExhausted { attempts, source } => {
				assert_eq!(attempts, 3);
				assert_eq!(source.status(), Some(502));
			},
			other => panic!("Unexpected error: {other:?}."),
		}

		assert_eq!(transport.resource_requests().len(), 3);
	}

	#[tokio::test]
	async fn network_failures_are_retried() {
		let (client, _, _) = setup([Scripted::NetworkError, Scripted::ok("[]")], 2);
		let (list, _) = client
			.execute_json::<Vec<u32>>(ApiRequest::get("mailboxes"))
			.await
			.expect("Second attempt should succeed.");

		assert!(list.is_empty());
	}

	#[tokio::test]
	async fn token_endpoint_rejection_is_terminal() {
		let transport = Arc::new(
			ScriptedTransport::new([Scripted::ok("{}")])
				.with_token_replies([Scripted::status(400, "{\"error\":\"invalid_client\"}")]),
		);
		let (client, _) = scripted_client(transport.clone(), scripted_config(10));
		let err = client.execute(ApiRequest::get("mailboxes")).await.expect_err("Auth should fail.");

		match err {
			Error::Auth(AuthError::Rejected { status, body }) => {
				assert_eq!(status, 400);
				assert!(body.contains("invalid_client"));
			},
			other => panic!("Unexpected error: {other:?}."),
		}

		assert_eq!(transport.token_calls(), 1);
		assert!(transport.resource_requests().is_empty());
		assert!(client.token_store().read().is_none());
	}

	#[tokio::test]
	async fn unauthorized_token_endpoint_and_bad_grant_are_auth_errors() {
		let transport = Arc::new(ScriptedTransport::new([]).with_token_replies([
			Scripted::status(401, ""),
			Scripted::ok("{\"unexpected\":true}"),
			Scripted::NetworkError,
		]));
		let (client, _) = scripted_client(transport.clone(), scripted_config(10));

		assert!(matches!(
			client.authenticate().await,
			Err(Error::Auth(AuthError::Rejected { status: 401, .. }))
		));
		assert!(matches!(
			client.authenticate().await,
			Err(Error::Auth(AuthError::MalformedResponse { .. }))
		));
		assert!(matches!(
			client.authenticate().await,
			Err(Error::Auth(AuthError::Unreachable { .. }))
		));
		assert_eq!(transport.token_calls(), 3);
	}

	#[tokio::test]
	async fn token_request_uses_the_client_credentials_form() {
		let (client, transport, _) = setup([], 1);

		client.authenticate().await.expect("Token should be granted.");

		let requests = transport.requests();

		assert_eq!(requests.len(), 1);
		assert_eq!(requests[0].uri, "https://api.helpscout.net/v2/oauth2/token");
		assert!(requests[0].authorization().is_none());
		assert_eq!(
			String::from_utf8_lossy(&requests[0].body),
			"client_id=app-id&client_secret=app-secret&grant_type=client_credentials"
		);
	}

	#[tokio::test]
	async fn decode_failures_are_not_retried() {
		let (client, transport, _) = setup([Scripted::ok("{\"id\":\"nope\"}")], 10);

		#[derive(Debug, Deserialize)]
		struct Created {
			#[allow(dead_code)]
			id: u64,
		}

		let err = client
			.execute_json::<Created>(ApiRequest::get("conversations/1"))
			.await
			.expect_err("Mismatched body should fail.");

		assert!(matches!(err, Error::Decode(DecodeError::Json { .. })));
		assert_eq!(transport.resource_requests().len(), 1);
	}

	#[tokio::test]
	async fn first_advertised_limit_sizes_the_gate_and_precharges_the_deficit() {
		let replies = [
			Scripted::ok("{}")
				.with_header("X-RateLimit-Limit-Minute", "400")
				.with_header("X-RateLimit-Remaining-Minute", "390"),
			Scripted::ok("{}")
				.with_header("X-RateLimit-Limit-Minute", "10")
				.with_header("X-RateLimit-Remaining-Minute", "0"),
		];
		let transport = Arc::new(ScriptedTransport::new(replies));
		let config = ClientConfig::builder()
			.usage_factor(0.75)
			.retry_policy(instant_retry_policy(1))
			.build()
			.expect("Config should be valid.");
		let (client, gate) = scripted_client(transport, config);

		client.execute(ApiRequest::get("mailboxes")).await.expect("First call should pass.");

		assert_eq!(gate.capacity(), Some(300));
		assert_eq!(gate.used(), 10);

		client.execute(ApiRequest::get("mailboxes")).await.expect("Second call should pass.");

		assert_eq!(gate.capacity(), Some(300));
		assert_eq!(gate.used(), 11);
	}

	#[tokio::test]
	async fn verbose_mode_captures_failure_headers() {
		let transport = Arc::new(ScriptedTransport::new([
			Scripted::status(429, "slow down").with_header("retry-after", "5")
		]));
		let config = ClientConfig::builder()
			.verbose(true)
			.retry_policy(instant_retry_policy(1))
			.build()
			.expect("Config should be valid.");
		let (client, _) = scripted_client(transport, config);
		let err = client.execute(ApiRequest::get("mailboxes")).await.expect_err("429 should fail.");
		let Error::RetryExhausted { source, .. } = err else {
			panic!("Expected an exhausted retry budget.");
		};
		let Error::Status(StatusError { status, body, headers, .. }) = *source else {
			panic!("Expected a status failure.");
		};
		let headers = headers.expect("Verbose mode should keep headers.");

		assert_eq!(status, 429);
		assert_eq!(body, "slow down");
		assert_eq!(headers["retry-after"], "5");
	}

	#[test]
	fn transport_errors_convert_to_retryable_errors() {
		let err = Error::from(TransportError::Timeout { url: "https://api.helpscout.net".into() });

		assert!(err.is_retryable());
	}
}
