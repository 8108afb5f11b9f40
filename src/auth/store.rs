//! Shared holder for the current access token with compare-and-refresh semantics.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{_prelude::*, auth::AccessToken, error::AuthError};

/// Holds the bearer token used by a client.
///
/// Reads take a short synchronous lock. Refreshes serialize on a separate async lock and compare
/// against the token the caller last saw, so a burst of `401`s triggers a single fetch.
#[derive(Debug, Default)]
pub struct TokenStore {
	current: RwLock<Option<AccessToken>>,
	refresh_lock: AsyncMutex<()>,
	fetches: AtomicU64,
}
impl TokenStore {
	/// Creates a store that already holds `token`.
	pub fn with_token(token: AccessToken) -> Self {
		Self { current: RwLock::new(Some(token)), ..Default::default() }
	}

	/// Current token, if one was fetched.
	pub fn read(&self) -> Option<AccessToken> {
		self.current.read().clone()
	}

	/// Replaces the token unless someone already did since `previous` was read.
	///
	/// When the stored token is no longer `previous`, it is returned and `fetch` is never called.
	/// A failed fetch leaves the stored token untouched and surfaces as [`Error::Auth`].
	pub async fn refresh<F, Fut>(
		&self,
		previous: Option<&AccessToken>,
		fetch: F,
	) -> Result<AccessToken>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<AccessToken>>,
	{
		let _guard = self.refresh_lock.lock().await;

		match (self.read(), previous) {
			(Some(current), Some(previous)) if !current.same_as(previous) => return Ok(current),
			(Some(current), None) => return Ok(current),
			_ => (),
		}

		self.fetches.fetch_add(1, Ordering::Relaxed);

		let token = fetch().await.map_err(AuthError::from_fetch_failure)?;

		*self.current.write() = Some(token.clone());

		Ok(token)
	}

	/// Number of fetches this store has started.
	pub fn fetches(&self) -> u64 {
		self.fetches.load(Ordering::Relaxed)
	}
}
