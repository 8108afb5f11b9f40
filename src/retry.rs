//! Bounded retry loop driven by explicit per-attempt outcomes.
//!
//! The executor reports each attempt as an [`Attempt`]. Counted failures go through the
//! [`FailureObserver`] and consume the attempt budget; a stale-token retry does neither, so a
//! burst of token churn can never exhaust the budget on its own.

// crates.io
use rand::Rng;
use tokio::time::Instant;
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	obs::{self, RetryCause},
};

const MAX_JITTER: f64 = 0.25;

/// Outcome of a single attempt.
#[derive(Debug)]
pub enum Attempt<T> {
	/// The call completed.
	Success(T),
	/// A transient failure; counted against the budget and retried after a backoff.
	Retryable(Error),
	/// The token was replaced; retry immediately without charging the budget.
	AuthRetry,
	/// A failure that no retry can fix.
	Terminal(Error),
}

/// Attempt budget and backoff schedule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Counted attempts allowed per logical call.
	pub max_attempts: u32,
	/// Delay after the first counted failure; doubles afterwards. Zero disables sleeping.
	pub base_delay: Duration,
	/// Upper bound for a single backoff delay.
	pub max_delay: Duration,
	/// Shortens each delay by up to a quarter at random so callers spread out.
	pub jitter: bool,
	/// Overall budget for the logical call, auth retries included.
	pub deadline: Option<Duration>,
}
impl RetryPolicy {
	/// Overrides the attempt budget.
	pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = max_attempts;

		self
	}

	/// Overrides the first backoff delay.
	pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
		self.base_delay = base_delay;

		self
	}

	/// Overrides the backoff cap.
	pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
		self.max_delay = max_delay;

		self
	}

	/// Enables or disables jitter.
	pub fn with_jitter(mut self, jitter: bool) -> Self {
		self.jitter = jitter;

		self
	}

	/// Overrides the overall deadline; `None` bounds the call by attempts only, as does a budget
	/// too large to be reached.
	pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
		self.deadline = deadline;

		self
	}

	/// Delay to wait after the `failures`-th counted failure.
	pub fn backoff(&self, failures: u32) -> Duration {
		if self.base_delay.is_zero() {
			return Duration::ZERO;
		}

		let exponent = failures.saturating_sub(1).min(31);
		let delay = self.base_delay.saturating_mul(1 << exponent).min(self.max_delay);

		if self.jitter {
			delay.mul_f64(1. - rand::rng().random_range(0. ..=MAX_JITTER))
		} else {
			delay
		}
	}

	pub(crate) fn validate(&self) -> Result<(), ConfigError> {
		if self.max_attempts == 0 {
			return Err(ConfigError::ZeroAttempts);
		}

		Ok(())
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 10,
			base_delay: Duration::from_millis(100),
			max_delay: Duration::from_secs(10),
			jitter: true,
			deadline: Some(Duration::from_secs(300)),
		}
	}
}

/// Counted failure reported to the [`FailureObserver`].
#[derive(Debug)]
pub struct AttemptFailure<'a> {
	/// One-based index of the failed attempt.
	pub attempt: u32,
	/// Budget the attempt counts against.
	pub max_attempts: u32,
	/// The failure itself.
	pub error: &'a Error,
}

/// Callback invoked once per counted failure.
pub type FailureObserver = Arc<dyn Fn(&AttemptFailure<'_>) + Send + Sync>;

/// Runs an operation until it succeeds, fails terminally, or runs out of budget.
#[derive(Clone)]
pub struct RetryDriver {
	policy: RetryPolicy,
	observer: FailureObserver,
}
impl RetryDriver {
	/// Creates a driver that logs counted failures through [`obs::attempt_failed`].
	pub fn new(policy: RetryPolicy) -> Self {
		Self { policy, observer: Arc::new(obs::attempt_failed) }
	}

	/// Replaces the failure observer.
	pub fn with_observer(mut self, observer: FailureObserver) -> Self {
		self.observer = observer;

		self
	}

	/// Policy in effect.
	pub fn policy(&self) -> &RetryPolicy {
		&self.policy
	}

	/// Drives `operation` to completion.
	///
	/// The deadline is checked before every attempt, so a call that is already past it returns
	/// [`Error::DeadlineExceeded`] without starting another one.
	pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Attempt<T>>,
	{
		// A budget too large to represent as an instant never elapses.
		let deadline = self.policy.deadline.and_then(|budget| Instant::now().checked_add(budget));
		let mut attempts = 0;
		let mut last = None;

		loop {
			if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
				return Err(Error::DeadlineExceeded { attempts, last: last.map(Box::new) });
			}

			match operation().await {
				Attempt::Success(value) => return Ok(value),
				Attempt::Terminal(err) => return Err(err),
				Attempt::AuthRetry => {
					obs::record_retry(RetryCause::Auth);
				},
				Attempt::Retryable(err) => {
					attempts += 1;

					(self.observer)(&AttemptFailure {
						attempt: attempts,
						max_attempts: self.policy.max_attempts,
						error: &err,
					});

					if attempts >= self.policy.max_attempts {
						return Err(Error::RetryExhausted { attempts, source: Box::new(err) });
					}

					last = Some(err);

					let delay = self.policy.backoff(attempts);
					let delay = deadline.map_or(delay, |deadline| {
						delay.min(deadline.saturating_duration_since(Instant::now()))
					});

					if !delay.is_zero() {
						tokio::time::sleep(delay).await;
					}

					obs::record_retry(RetryCause::Failure);
				},
			}
		}
	}
}
impl Debug for RetryDriver {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RetryDriver").field("policy", &self.policy).finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{
		collections::VecDeque,
		sync::atomic::{AtomicU32, Ordering},
	};
	// self
	use super::*;
	use crate::error::StatusError;

	fn server_error() -> Error {
		StatusError {
			url: "https://api.helpscout.net/v2/conversations".into(),
			status: 500,
			body: String::new(),
			headers: None,
		}
		.into()
	}

	fn counting_driver(policy: RetryPolicy) -> (RetryDriver, Arc<AtomicU32>) {
		let calls = Arc::new(AtomicU32::new(0));
		let observer = {
			let calls = calls.clone();

			Arc::new(move |_: &AttemptFailure<'_>| {
				calls.fetch_add(1, Ordering::SeqCst);
			})
		};

		(RetryDriver::new(policy).with_observer(observer), calls)
	}

	async fn run_script(
		driver: &RetryDriver,
		script: impl IntoIterator<Item = Attempt<u32>>,
	) -> Result<u32> {
		let script = Mutex::new(script.into_iter().collect::<VecDeque<_>>());

		driver
			.run(|| {
				let next = script.lock().pop_front();

				async move { next.unwrap_or(Attempt::Terminal(server_error())) }
			})
			.await
	}

	fn instant(max_attempts: u32) -> RetryPolicy {
		RetryPolicy::default().with_max_attempts(max_attempts).with_base_delay(Duration::ZERO)
	}

	#[tokio::test]
	async fn auth_retries_do_not_consume_attempts() {
		let (driver, observed) = counting_driver(instant(10));
		let nine = (0..9).map(|_| Attempt::AuthRetry).chain([Attempt::Success(7)]);

		assert_eq!(run_script(&driver, nine).await.expect("Nine auth retries should pass."), 7);

		let eleven = (0..11).map(|_| Attempt::AuthRetry).chain([Attempt::Success(8)]);

		assert_eq!(run_script(&driver, eleven).await.expect("Eleven auth retries should pass."), 8);
		assert_eq!(observed.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn one_failure_then_success_observes_once() {
		let (driver, observed) = counting_driver(instant(10));
		let value = run_script(&driver, [Attempt::Retryable(server_error()), Attempt::Success(1)])
			.await
			.expect("Second attempt should succeed.");

		assert_eq!(value, 1);
		assert_eq!(observed.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn exhaustion_returns_last_failure() {
		let (driver, observed) = counting_driver(instant(3));
		let err = run_script(&driver, (0..5).map(|_| Attempt::Retryable(server_error())))
			.await
			.expect_err("Budget should run out.");

		assert!(matches!(err, Error::RetryExhausted { attempts: 3, .. }));
		assert_eq!(err.status(), Some(500));
		assert_eq!(observed.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn terminal_failures_are_returned_unchanged() {
		let (driver, observed) = counting_driver(instant(10));
		let err = run_script(&driver, [Attempt::Terminal(ConfigError::ZeroTimeout.into())])
			.await
			.expect_err("Terminal failure should surface.");

		assert!(matches!(err, Error::Config(ConfigError::ZeroTimeout)));
		assert_eq!(observed.load(Ordering::SeqCst), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn deadline_stops_retrying() {
		let policy = RetryPolicy::default()
			.with_max_attempts(100)
			.with_base_delay(Duration::from_secs(1))
			.with_max_delay(Duration::from_secs(1))
			.with_jitter(false)
			.with_deadline(Some(Duration::from_secs(3)));
		let (driver, _) = counting_driver(policy);
		let start = Instant::now();
		let err = run_script(&driver, (0..100).map(|_| Attempt::Retryable(server_error())))
			.await
			.expect_err("Deadline should elapse.");

		match err {
			Error::DeadlineExceeded { attempts, last } => {
				assert_eq!(attempts, 3);
				assert!(last.is_some());
			},
			other => panic!("Unexpected error: {other:?}."),
		}

		assert_eq!(Instant::now() - start, Duration::from_secs(3));
	}

	#[tokio::test]
	async fn unreachable_deadline_is_treated_as_none() {
		let (driver, observed) = counting_driver(instant(3).with_deadline(Some(Duration::MAX)));
		let value = run_script(&driver, [Attempt::Retryable(server_error()), Attempt::Success(5)])
			.await
			.expect("Huge deadline should not stop the call.");

		assert_eq!(value, 5);
		assert_eq!(observed.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn backoff_doubles_and_caps() {
		let policy = RetryPolicy::default()
			.with_base_delay(Duration::from_millis(100))
			.with_max_delay(Duration::from_millis(350))
			.with_jitter(false);

		assert_eq!(policy.backoff(1), Duration::from_millis(100));
		assert_eq!(policy.backoff(2), Duration::from_millis(200));
		assert_eq!(policy.backoff(3), Duration::from_millis(350));
		assert_eq!(policy.backoff(40), Duration::from_millis(350));

		let jittered = policy.with_jitter(true).backoff(2);

		assert!(jittered <= Duration::from_millis(200));
		assert!(jittered >= Duration::from_millis(150));
	}

	#[test]
	fn zero_attempt_policy_is_rejected() {
		assert!(matches!(instant(0).validate(), Err(ConfigError::ZeroAttempts)));
		assert!(RetryPolicy::default().validate().is_ok());
	}
}
