// crates.io
use oauth2::http::Method;
// self
use crate::{_prelude::*, obs::CallKind, registry::ConnectionId, retry::AttemptFailure};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// A span builder used by executor calls.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a new span tagged with the call kind, connection, and request line.
	pub fn new(kind: CallKind, connection: ConnectionId, method: &Method, path: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"helpscout.call",
				call = kind.as_str(),
				connection = connection.get(),
				method = method.as_str(),
				path
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, connection, method, path);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits the outbound request line.
pub fn request_sent(connection: ConnectionId, method: &Method, url: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(connection = connection.get(), method = method.as_str(), url, "->");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (connection, method, url);
	}
}

/// Emits the response status, and the body when verbose diagnostics are enabled.
pub fn response_received(
	connection: ConnectionId,
	url: &str,
	status: u16,
	body: &[u8],
	verbose: bool,
) {
	#[cfg(feature = "tracing")]
	{
		if verbose {
			tracing::debug!(
				connection = connection.get(),
				url,
				status,
				body = %String::from_utf8_lossy(body),
				"<-"
			);
		} else {
			tracing::debug!(connection = connection.get(), url, status, bytes = body.len(), "<-");
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (connection, url, status, body, verbose);
	}
}

/// Default failure observer: logs every counted, retryable failure.
pub fn attempt_failed(failure: &AttemptFailure<'_>) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			attempt = failure.attempt,
			max_attempts = failure.max_attempts,
			status = failure.error.status(),
			error = %failure.error,
			"attempt failed"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = failure;
	}
}

/// Emits a notice that the access token was replaced.
pub fn token_replaced(connection: ConnectionId, fetched: bool) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(connection = connection.get(), fetched, "access token replaced");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (connection, fetched);
	}
}

/// Emits the rate budget learned from the first response that advertised one.
pub fn rate_limit_learned(advertised: u32, capacity: u32, precharged: u32) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(advertised, capacity, precharged, "rate limit learned");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (advertised, capacity, precharged);
	}
}

/// Emits a notice that admission is waiting for window entries to expire.
pub fn admission_waiting(cost: u32, used: u32, capacity: u32) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(cost, used, capacity, "waiting for rate budget");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (cost, used, capacity);
	}
}
