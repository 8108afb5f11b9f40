//! Client configuration and its validating builder.

// self
use crate::{_prelude::*, error::ConfigError, retry::RetryPolicy};

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.helpscout.net/v2/";
/// Token endpoint path, relative to the base URL.
pub const DEFAULT_TOKEN_PATH: &str = "oauth2/token";
/// Per-call transport timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Validated settings shared by every call a client makes.
#[derive(Clone, Debug)]
pub struct ClientConfig {
	base_url: Url,
	token_path: String,
	usage_factor: f64,
	timeout: Duration,
	retry: RetryPolicy,
	verbose: bool,
}
impl ClientConfig {
	/// Starts a builder seeded with the production defaults.
	pub fn builder() -> ClientConfigBuilder {
		ClientConfigBuilder::default()
	}

	/// API root every resource path is joined onto; always ends with `/`.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Token endpoint path relative to [`ClientConfig::base_url`].
	pub fn token_path(&self) -> &str {
		&self.token_path
	}

	/// Fraction of the advertised per-minute limit this process may use.
	pub fn usage_factor(&self) -> f64 {
		self.usage_factor
	}

	/// Per-call transport timeout.
	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Retry policy applied to every logical call.
	pub fn retry_policy(&self) -> &RetryPolicy {
		&self.retry
	}

	/// Whether failures capture response headers and responses are logged with their bodies.
	pub fn verbose(&self) -> bool {
		self.verbose
	}

	/// Resolves a resource path against the base URL.
	pub fn resource_url(&self, path: &str) -> Result<Url, ConfigError> {
		join(&self.base_url, path)
	}
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Base URL as given; parsed by [`ClientConfigBuilder::build`].
	pub base_url: String,
	/// Token endpoint path.
	pub token_path: String,
	/// Fraction of the advertised limit to use.
	pub usage_factor: f64,
	/// Per-call timeout.
	pub timeout: Duration,
	/// Retry policy.
	pub retry: RetryPolicy,
	/// Verbose diagnostics flag.
	pub verbose: bool,
}
impl ClientConfigBuilder {
	/// Overrides the API root; a missing trailing `/` is added.
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.base_url = url.into();

		self
	}

	/// Overrides the token endpoint path.
	pub fn token_path(mut self, path: impl Into<String>) -> Self {
		self.token_path = path.into();

		self
	}

	/// Sets the fraction of the advertised per-minute limit to use, within `(0, 1]`.
	pub fn usage_factor(mut self, factor: f64) -> Self {
		self.usage_factor = factor;

		self
	}

	/// Overrides the per-call timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the retry policy.
	pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.retry = policy;

		self
	}

	/// Enables verbose diagnostics.
	pub fn verbose(mut self, verbose: bool) -> Self {
		self.verbose = verbose;

		self
	}

	/// Validates the settings.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let mut raw = self.base_url.trim().to_owned();

		if !raw.ends_with('/') {
			raw.push('/');
		}

		let base_url = Url::parse(&raw).map_err(|source| ConfigError::InvalidBaseUrl { source })?;

		if !matches!(base_url.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedScheme { url: base_url.into() });
		}
		if self.usage_factor.is_nan() || self.usage_factor <= 0. || self.usage_factor > 1. {
			return Err(ConfigError::InvalidUsageFactor { factor: self.usage_factor });
		}
		if self.timeout.is_zero() {
			return Err(ConfigError::ZeroTimeout);
		}

		self.retry.validate()?;
		join(&base_url, &self.token_path)?;

		Ok(ClientConfig {
			base_url,
			token_path: self.token_path,
			usage_factor: self.usage_factor,
			timeout: self.timeout,
			retry: self.retry,
			verbose: self.verbose,
		})
	}
}
impl Default for ClientConfigBuilder {
	fn default() -> Self {
		Self {
			base_url: DEFAULT_BASE_URL.into(),
			token_path: DEFAULT_TOKEN_PATH.into(),
			usage_factor: 1.,
			timeout: DEFAULT_TIMEOUT,
			retry: RetryPolicy::default(),
			verbose: false,
		}
	}
}

fn join(base: &Url, path: &str) -> Result<Url, ConfigError> {
	base.join(path.trim_start_matches('/'))
		.map_err(|source| ConfigError::InvalidPath { path: path.to_owned(), source })
}
