//! Transport primitives for API calls.
//!
//! The module exposes [`HttpTransport`], the executor's only dependency on an HTTP stack, plus
//! the reqwest-backed [`ReqwestHttpClient`]. Requests and responses use the `http` crate types
//! re-exported through `oauth2`, so custom transports (or scripted test doubles) can plug in
//! without pulling reqwest. Implementations must honor the per-call timeout passed alongside
//! every request and report network failures as [`TransportError`] so the executor can classify
//! them as retryable.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// self
use crate::{_prelude::*, error::TransportError};

pub use oauth2::{
	HttpRequest, HttpResponse,
	http::{HeaderMap, HeaderValue, Method, StatusCode, header},
};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing one fully-built request.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by every
/// client in the process behind an [`Arc`], and the returned future must be `Send` so calls can
/// hop executors. A transport never retries on its own: retries, auth refresh, and rate gating
/// all live in the executor.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request`, failing with [`TransportError::Timeout`] once `timeout` elapses.
	///
	/// Any HTTP status (including `4xx`/`5xx`) is a successful transport outcome; only failures to
	/// obtain a response are errors.
	fn execute(&self, request: HttpRequest, timeout: Duration) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Debug for ReqwestHttpClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ReqwestHttpClient(..)")
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestHttpClient {
	fn execute(&self, request: HttpRequest, timeout: Duration) -> TransportFuture<'_> {
		Box::pin(async move {
			let url = request.uri().to_string();
			let mut request = reqwest::Request::try_from(request)
				.map_err(|err| TransportError::network(url.clone(), err))?;

			*request.timeout_mut() = Some(timeout);

			let response =
				self.0.execute(request).await.map_err(|err| map_reqwest_error(&url, err))?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await.map_err(|err| map_reqwest_error(&url, err))?;
			let mut response_new = HttpResponse::new(body.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(url: &str, err: ReqwestError) -> TransportError {
	if err.is_timeout() {
		TransportError::Timeout { url: url.to_owned() }
	} else {
		TransportError::network(url, err)
	}
}
