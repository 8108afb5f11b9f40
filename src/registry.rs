//! Monotonic connection identifiers used to correlate log lines per client instance.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::_prelude::*;

static GLOBAL: ConnectionRegistry = ConnectionRegistry::new();

/// Identifier assigned to one client instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);
impl ConnectionId {
	/// Returns the raw numeric identifier.
	pub const fn get(self) -> u64 {
		self.0
	}
}
impl Display for ConnectionId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "#{}", self.0)
	}
}

/// Hands out strictly increasing [`ConnectionId`] values, starting at 1.
#[derive(Debug)]
pub struct ConnectionRegistry {
	next: AtomicU64,
}
impl ConnectionRegistry {
	/// Creates an isolated registry; tests use this to get predictable identifiers.
	pub const fn new() -> Self {
		Self { next: AtomicU64::new(1) }
	}

	/// Process-wide registry used by clients that were not given one explicitly.
	pub fn global() -> &'static Self {
		&GLOBAL
	}

	/// Issues the next identifier.
	pub fn register(&self) -> ConnectionId {
		ConnectionId(self.next.fetch_add(1, Ordering::Relaxed))
	}

	/// Number of identifiers issued so far.
	pub fn issued(&self) -> u64 {
		self.next.load(Ordering::Relaxed) - 1
	}
}
impl Default for ConnectionRegistry {
	fn default() -> Self {
		Self::new()
	}
}
