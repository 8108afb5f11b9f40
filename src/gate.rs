//! Header-learned admission gate that keeps in-flight cost under the server's per-minute budget.
//!
//! The gate starts without a capacity and admits everything for free. The first successful
//! response that advertises `X-RateLimit-Limit-Minute` sizes it (scaled by the configured usage
//! factor) for the rest of its lifetime. From then on every admitted request is charged against
//! a rolling window and its cost self-expires exactly one window after admission, regardless of
//! how long the response took.

// std
use std::{collections::VecDeque, sync::OnceLock};
// crates.io
use oauth2::http::{HeaderMap, Method};
use tokio::time::Instant;
// self
use crate::{_prelude::*, obs};

/// Length of the server's rate-limit window.
pub const RATE_WINDOW: Duration = Duration::from_secs(60);
/// Header advertising the per-minute request budget.
pub const LIMIT_HEADER: &str = "x-ratelimit-limit-minute";
/// Header advertising what is left of the current minute's budget.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining-minute";

static SHARED: OnceLock<Arc<RateGate>> = OnceLock::new();

/// Cost charged for a request with the given method.
///
/// Reads cost one unit; anything that mutates server state costs two.
pub fn request_cost(method: &Method) -> u32 {
	match method.as_str() {
		"POST" | "PUT" | "PATCH" | "DELETE" => 2,
		_ => 1,
	}
}

/// Rate-limit headers observed on a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitHeaders {
	/// Advertised per-minute budget.
	pub limit: u32,
	/// Budget left in the current minute, when advertised.
	pub remaining: Option<u32>,
}
impl RateLimitHeaders {
	/// Extracts the headers; `None` when the limit is absent or not a non-negative integer.
	pub fn parse(headers: &HeaderMap) -> Option<Self> {
		let limit = header_u32(headers, LIMIT_HEADER)?;
		let remaining = header_u32(headers, REMAINING_HEADER);

		Some(Self { limit, remaining })
	}

	/// Capacity after applying `factor`, floored and never below one unit.
	pub fn scaled(&self, factor: f64) -> u32 {
		let scaled = (f64::from(self.limit) * factor).floor();

		if scaled < 1. { 1 } else if scaled >= f64::from(u32::MAX) { u32::MAX } else { scaled as u32 }
	}

	/// Budget already spent elsewhere this minute, per the server.
	pub fn deficit(&self) -> u32 {
		self.remaining.map_or(0, |remaining| self.limit.saturating_sub(remaining))
	}
}

fn header_u32(headers: &HeaderMap, name: &str) -> Option<u32> {
	headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

#[derive(Debug)]
struct Charge {
	cost: u32,
	expires_at: Instant,
}

#[derive(Debug, Default)]
struct GateState {
	capacity: Option<u32>,
	used: u32,
	// Sorted by `expires_at`.
	ledger: VecDeque<Charge>,
}
impl GateState {
	fn purge(&mut self, now: Instant) {
		while let Some(charge) = self.ledger.front() {
			if charge.expires_at > now {
				break;
			}

			self.used -= charge.cost;
			self.ledger.pop_front();
		}
	}

	fn charge(&mut self, cost: u32, expires_at: Instant) {
		if cost == 0 {
			return;
		}

		let at = self.ledger.partition_point(|charge| charge.expires_at <= expires_at);

		self.ledger.insert(at, Charge { cost, expires_at });
		self.used += cost;
	}

	fn room(&self) -> Option<u32> {
		self.capacity.map(|capacity| capacity.saturating_sub(self.used))
	}
}

/// Admission gate shared by every client that talks to the same account.
#[derive(Debug)]
pub struct RateGate {
	window: Duration,
	state: Mutex<GateState>,
}
impl RateGate {
	/// Creates a gate whose charges expire after `window` instead of [`RATE_WINDOW`].
	pub fn with_window(window: Duration) -> Self {
		Self { window, state: Mutex::new(GateState::default()) }
	}

	/// Process-wide gate used by clients that were not given one explicitly.
	pub fn shared() -> Arc<Self> {
		SHARED.get_or_init(|| Arc::new(Self::default())).clone()
	}

	/// Waits until `cost` fits in the window, then charges it and returns the charged amount.
	///
	/// While the capacity is unknown the request is admitted immediately and nothing is charged.
	/// A cost above the whole capacity is clamped to the capacity so it can still be admitted
	/// once the window drains.
	pub async fn admit(&self, cost: u32) -> u32 {
		loop {
			let wake_at = {
				let mut state = self.state.lock();
				let now = Instant::now();

				state.purge(now);

				let Some(capacity) = state.capacity else {
					return 0;
				};
				let cost = cost.min(capacity);

				// `used <= capacity` always holds, so the subtraction cannot underflow.
				if cost <= capacity - state.used {
					state.charge(cost, now + self.window);

					return cost;
				}

				obs::admission_waiting(cost, state.used, capacity);

				state.ledger.front().map_or(now + self.window, |charge| charge.expires_at)
			};

			tokio::time::sleep_until(wake_at).await;
		}
	}

	/// Sets the capacity if it has not been learned yet; returns whether this call set it.
	///
	/// The capacity is floored at one unit. Later calls are no-ops and return `false`, so the
	/// first observation wins for the gate's lifetime.
	pub fn learn(&self, capacity: u32) -> bool {
		let mut state = self.state.lock();

		if state.capacity.is_some() {
			return false;
		}

		state.capacity = Some(capacity.max(1));
		state.purge(Instant::now());

		true
	}

	/// Charges `cost` that expires after `delay`, without waiting; returns the charged amount.
	///
	/// The charge is clamped to the room left in the window, and nothing is charged while the
	/// capacity is unknown. The executor uses this to pre-charge budget the server reports as
	/// already spent when the capacity is first learned.
	pub fn release_after(&self, cost: u32, delay: Duration) -> u32 {
		let mut state = self.state.lock();
		let now = Instant::now();

		state.purge(now);

		let Some(room) = state.room() else {
			return 0;
		};
		let cost = cost.min(room);

		state.charge(cost, now + delay);

		cost
	}

	/// Learned capacity, if any.
	pub fn capacity(&self) -> Option<u32> {
		self.state.lock().capacity
	}

	/// Cost currently charged against the window.
	pub fn used(&self) -> u32 {
		let mut state = self.state.lock();

		state.purge(Instant::now());

		state.used
	}

	/// Length of the rolling window.
	pub fn window(&self) -> Duration {
		self.window
	}
}
impl Default for RateGate {
	fn default() -> Self {
		Self::with_window(RATE_WINDOW)
	}
}
