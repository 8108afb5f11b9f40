// self
use crate::obs::{CallKind, CallOutcome, RetryCause};

/// Records a call outcome via the global metrics recorder (when enabled).
pub fn record_call_outcome(kind: CallKind, outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"helpscout_call_total",
			"call" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records one additional attempt started by the retry driver (when enabled).
pub fn record_retry(cause: RetryCause) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("helpscout_retry_total", "cause" => cause.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = cause;
	}
}
