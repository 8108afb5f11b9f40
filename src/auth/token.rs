//! Bearer access token with redacted formatting and identity comparison.

// crates.io
use oauth2::{TokenResponse, basic::BasicTokenResponse, http::HeaderValue};
// self
use crate::{_prelude::*, error::ConfigError};

/// Access token issued by the token endpoint.
///
/// Clones share the underlying value, so [`AccessToken::same_as`] can tell a token apart from a
/// later grant even when the server hands out the same string twice.
#[derive(Clone)]
pub struct AccessToken {
	value: Arc<str>,
	fetched_at: OffsetDateTime,
}
impl AccessToken {
	/// Wraps a token value fetched now.
	pub fn new(value: impl Into<Arc<str>>) -> Self {
		Self { value: value.into(), fetched_at: OffsetDateTime::now_utc() }
	}

	/// Returns the raw token. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.value
	}

	/// When the token was received.
	pub fn fetched_at(&self) -> OffsetDateTime {
		self.fetched_at
	}

	/// Whether both handles come from the same grant.
	pub fn same_as(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.value, &other.value)
	}

	/// Renders the `Authorization` header value, marked sensitive.
	pub fn bearer_header(&self) -> Result<HeaderValue, ConfigError> {
		let mut value = HeaderValue::from_str(&format!("Bearer {}", self.value))
			.map_err(|_| ConfigError::InvalidTokenHeader)?;

		value.set_sensitive(true);

		Ok(value)
	}
}
impl From<BasicTokenResponse> for AccessToken {
	fn from(response: BasicTokenResponse) -> Self {
		Self::new(response.access_token().secret().as_str())
	}
}
impl PartialEq for AccessToken {
	fn eq(&self, other: &Self) -> bool {
		self.value == other.value
	}
}
impl Eq for AccessToken {}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("value", &"<redacted>")
			.field("fetched_at", &self.fetched_at)
			.finish()
	}
}
impl Display for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
