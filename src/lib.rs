//! Rate-aware, self-authenticating execution core for the Help Scout Mailbox API: one entry
//! point that fetches client-credentials tokens on demand and refreshes them with
//! compare-and-swap semantics on `401`. It also learns the per-minute budget from response headers
//! and retries transient failures without letting token churn eat the retry budget.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod gate;
pub mod http;
pub mod obs;
pub mod registry;
pub mod retry;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::{
		collections::VecDeque,
		sync::atomic::{AtomicUsize, Ordering},
	};
	// crates.io
	use oauth2::http::{
		HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header::CONTENT_TYPE,
	};
	// self
	use crate::{
		auth::{Credentials, TokenStore},
		client::Client,
		config::ClientConfig,
		error::TransportError,
		gate::RateGate,
		http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
		registry::ConnectionRegistry,
		retry::RetryPolicy,
	};

	/// Application identifier used by test fixtures.
	pub const TEST_APP_ID: &str = "app-id";
	/// Application secret used by test fixtures.
	pub const TEST_APP_SECRET: &str = "app-secret";

	/// Canned reply served by [`ScriptedTransport`] for a resource request.
	#[derive(Clone, Debug)]
	pub enum Scripted {
		/// Responds with the given status, headers, and body.
		Reply {
			/// HTTP status code.
			status: u16,
			/// Response headers.
			headers: Vec<(&'static str, String)>,
			/// Response body.
			body: String,
		},
		/// Fails at the network layer before any status is received.
		NetworkError,
		/// Responds `200` with the request body echoed back as JSON.
		Echo,
	}
	impl Scripted {
		/// Plain reply with an empty header set.
		pub fn status(status: u16, body: impl Into<String>) -> Self {
			Self::Reply { status, headers: Vec::new(), body: body.into() }
		}

		/// Successful JSON reply.
		pub fn ok(body: impl Into<String>) -> Self {
			Self::status(200, body)
		}

		/// Adds a header to a [`Scripted::Reply`]; other variants are returned unchanged.
		pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
			if let Self::Reply { headers, .. } = &mut self {
				headers.push((name, value.into()));
			}

			self
		}
	}

	/// Snapshot of a request observed by [`ScriptedTransport`].
	#[derive(Clone, Debug)]
	pub struct RecordedRequest {
		/// HTTP method.
		pub method: Method,
		/// Absolute request URI.
		pub uri: String,
		/// Request headers.
		pub headers: HeaderMap,
		/// Raw request body.
		pub body: Vec<u8>,
	}
	impl RecordedRequest {
		/// Returns the `Authorization` header, if present.
		pub fn authorization(&self) -> Option<&str> {
			self.headers.get("authorization").and_then(|value| value.to_str().ok())
		}
	}

	/// In-memory transport that replays scripted replies and serves the token endpoint.
	///
	/// Requests whose path ends with `oauth2/token` are answered by the token script (or by a
	/// generated `token-N` grant once the script is drained); every other request pops the
	/// next [`Scripted`] reply. An exhausted resource script answers `599` so tests fail loudly.
	#[derive(Debug, Default)]
	pub struct ScriptedTransport {
		replies: Mutex<VecDeque<Scripted>>,
		token_replies: Mutex<VecDeque<Scripted>>,
		requests: Mutex<Vec<RecordedRequest>>,
		token_calls: AtomicUsize,
	}
	impl ScriptedTransport {
		/// Creates a transport that replays `replies` for resource requests.
		pub fn new(replies: impl IntoIterator<Item = Scripted>) -> Self {
			Self { replies: Mutex::new(replies.into_iter().collect()), ..Default::default() }
		}

		/// Queues replies for the token endpoint ahead of the generated grants.
		pub fn with_token_replies(self, replies: impl IntoIterator<Item = Scripted>) -> Self {
			self.token_replies.lock().extend(replies);

			self
		}

		/// Number of calls that reached the token endpoint.
		pub fn token_calls(&self) -> usize {
			self.token_calls.load(Ordering::SeqCst)
		}

		/// Every request observed so far, token calls included.
		pub fn requests(&self) -> Vec<RecordedRequest> {
			self.requests.lock().clone()
		}

		/// Requests that did not target the token endpoint.
		pub fn resource_requests(&self) -> Vec<RecordedRequest> {
			self.requests().into_iter().filter(|request| !is_token_uri(&request.uri)).collect()
		}

		fn reply_for(&self, request: &RecordedRequest) -> Scripted {
			if is_token_uri(&request.uri) {
				let call = self.token_calls.fetch_add(1, Ordering::SeqCst) + 1;

				return self.token_replies.lock().pop_front().unwrap_or_else(|| {
					Scripted::ok(format!(
						"{{\"token_type\":\"bearer\",\"access_token\":\"token-{call}\",\"expires_in\":7200}}"
					))
				});
			}

			self.replies.lock().pop_front().unwrap_or_else(|| Scripted::status(599, "unscripted"))
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn execute(&self, request: HttpRequest, _timeout: Duration) -> TransportFuture<'_> {
			Box::pin(async move {
				let recorded = RecordedRequest {
					method: request.method().clone(),
					uri: request.uri().to_string(),
					headers: request.headers().clone(),
					body: request.body().clone(),
				};

				self.requests.lock().push(recorded.clone());

				let (status, headers, body) = match self.reply_for(&recorded) {
					Scripted::Reply { status, headers, body } => (status, headers, body.into_bytes()),
					Scripted::NetworkError =>
						return Err(TransportError::network(
							recorded.uri,
							std::io::Error::other("scripted network failure"),
						)),
					Scripted::Echo => (
						200,
						vec![("content-type", "application/json".to_owned())],
						recorded.body.clone(),
					),
				};
				let mut response = HttpResponse::new(body);

				*response.status_mut() =
					StatusCode::from_u16(status).expect("Scripted status should be valid.");

				for (name, value) in headers {
					response.headers_mut().insert(
						HeaderName::from_bytes(name.as_bytes())
							.expect("Scripted header name should be valid."),
						HeaderValue::from_str(&value).expect("Scripted header should be valid."),
					);
				}
				if !response.headers().contains_key(CONTENT_TYPE) {
					response
						.headers_mut()
						.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
				}

				Ok(response)
			})
		}
	}

	fn is_token_uri(uri: &str) -> bool {
		uri.ends_with("oauth2/token")
	}

	/// Retry policy without backoff sleeps so scripted sequences run instantly.
	pub fn instant_retry_policy(max_attempts: u32) -> RetryPolicy {
		RetryPolicy::default().with_max_attempts(max_attempts).with_base_delay(Duration::ZERO)
	}

	/// Test credentials shared by fixtures.
	pub fn test_credentials() -> Credentials {
		Credentials::new(TEST_APP_ID, TEST_APP_SECRET).expect("Test credentials should be valid.")
	}

	/// Builds a client over `transport` with an isolated rate gate and token store.
	pub fn scripted_client(
		transport: Arc<ScriptedTransport>,
		config: ClientConfig,
	) -> (Client<ScriptedTransport>, Arc<RateGate>) {
		let gate = Arc::new(RateGate::default());
		let client = Client::with_transport(test_credentials(), config, transport)
			.with_rate_gate(gate.clone())
			.with_token_store(Arc::new(TokenStore::default()))
			.with_registry(&ConnectionRegistry::new());

		(client, gate)
	}

	/// Default test configuration: instant retries with the given attempt budget.
	pub fn scripted_config(max_attempts: u32) -> ClientConfig {
		ClientConfig::builder()
			.retry_policy(instant_retry_policy(max_attempts))
			.build()
			.expect("Scripted client configuration should be valid.")
	}
}

mod _prelude {
	pub use std::{
		borrow::Cow,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {httpmock as _, proptest as _};
