//! Crate-level error types shared by the executor, the gate, and endpoint wrappers.

// crates.io
use oauth2::http::HeaderMap;
// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error surfaced by every logical call.
///
/// A caller receives exactly one of these per call; intermediate outcomes such as a token
/// refresh that preceded a failed retry are not distinguished from the final failure.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Token endpoint unreachable or credentials rejected.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Server answered with a non-success, non-`401` status.
	#[error(transparent)]
	Status(#[from] StatusError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Successful response whose body does not match the requested shape.
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// Caller-supplied argument failed a precondition; nothing was sent.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// Retryable failures consumed the whole attempt budget.
	#[error("Request failed after {attempts} attempt(s): {source}")]
	RetryExhausted {
		/// Counted attempts that were made.
		attempts: u32,
		/// Failure observed on the final attempt.
		#[source]
		source: Box<Error>,
	},
	/// The overall call deadline elapsed before another attempt could start.
	#[error("Request deadline elapsed after {attempts} attempt(s).")]
	DeadlineExceeded {
		/// Counted attempts that were made.
		attempts: u32,
		/// Most recent retryable failure, if any attempt failed before the deadline.
		last: Option<Box<Error>>,
	},
}
impl Error {
	/// Whether a fresh attempt of the same request could plausibly succeed.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Status(_) | Self::Transport(_))
	}

	/// HTTP status carried by the error (or by the failure it wraps), if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status(err) => Some(err.status),
			Self::Auth(AuthError::Rejected { status, .. }) => Some(*status),
			Self::RetryExhausted { source, .. } => source.status(),
			Self::DeadlineExceeded { last, .. } => last.as_ref().and_then(|err| err.status()),
			_ => None,
		}
	}
}

/// Failures raised while obtaining an access token.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Token endpoint could not be reached.
	#[error("Token endpoint is unreachable.")]
	Unreachable {
		/// Underlying transport failure.
		#[source]
		source: BoxError,
	},
	/// Token endpoint answered with a non-success status.
	#[error("Token endpoint rejected the credentials with status {status}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Response body, lossily decoded.
		body: String,
	},
	/// Token endpoint answered `2xx` with a body that is not a token grant.
	#[error("Token endpoint returned an unusable grant.")]
	MalformedResponse {
		/// Underlying decode failure.
		#[source]
		source: BoxError,
	},
}
impl AuthError {
	/// Folds the failure of the nested token call into an [`Error::Auth`].
	///
	/// Configuration and validation failures pass through untouched because they describe the
	/// request, not the token endpoint.
	pub(crate) fn from_fetch_failure(err: Error) -> Error {
		match err {
			Error::Transport(source) => Self::Unreachable { source: Box::new(source) }.into(),
			Error::Status(StatusError { status, body, .. }) => Self::Rejected { status, body }.into(),
			Error::Decode(source) => Self::MalformedResponse { source: Box::new(source) }.into(),
			other => other,
		}
	}
}

/// Non-success response captured for diagnostics.
#[derive(Debug, ThisError)]
#[error("Request to {url} returned status {status}.")]
pub struct StatusError {
	/// Attempted URL.
	pub url: String,
	/// HTTP status code.
	pub status: u16,
	/// Response body, lossily decoded.
	pub body: String,
	/// Response headers; only captured when verbose diagnostics are enabled.
	pub headers: Option<HeaderMap>,
}

/// Transport-level failures (network, IO, timeouts).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Attempted URL.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The per-call timeout elapsed before a response arrived.
	#[error("Request to {url} timed out.")]
	Timeout {
		/// Attempted URL.
		url: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		url: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { url: url.into(), source: Box::new(src) }
	}
}

/// Response decoding failures.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// Body is not valid JSON for the requested destination.
	#[error("Response from {url} could not be decoded at `{}`.", .source.path())]
	Json {
		/// URL the body came from.
		url: String,
		/// Structured parsing failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A header the caller relies on is missing or malformed.
	#[error("Response from {url} is missing a valid `{name}` header.")]
	MissingHeader {
		/// URL the response came from.
		url: String,
		/// Header name.
		name: &'static str,
	},
}

/// Caller-supplied input rejected before any network call.
#[derive(Debug, ThisError)]
pub enum ValidationError {
	/// Conversations require a subject.
	#[error("Subjects cannot be blank.")]
	EmptySubject,
	/// The operation targets the selected mailbox but none is selected.
	#[error("No mailbox is selected.")]
	NoMailboxSelected,
	/// No mailbox matched the selector.
	#[error("Couldn't find mailbox named/with id `{selector}`.")]
	MailboxNotFound {
		/// Selector rendered for diagnostics.
		selector: String,
	},
	/// No custom field with the given name exists in the selected mailbox.
	#[error("Couldn't find the custom field `{name}`.")]
	UnknownCustomField {
		/// Requested field name.
		name: String,
	},
	/// A thread helper was given no threads.
	#[error("No threads were given.")]
	NoThreads,
	/// The request body could not be serialized.
	#[error("Request body could not be encoded.")]
	Body {
		/// Serialization failure.
		#[source]
		source: serde_json::Error,
	},
}

/// Configuration failures raised while assembling a client or a request.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Base URL cannot be parsed.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses a scheme other than HTTP(S).
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Offending URL.
		url: String,
	},
	/// Resource path cannot be joined onto the base URL.
	#[error("Resource path `{path}` is invalid.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Usage factor outside `(0, 1]`.
	#[error("Usage factor must be within (0, 1], got {factor}.")]
	InvalidUsageFactor {
		/// Rejected factor.
		factor: f64,
	},
	/// Retry policy allows no attempts.
	#[error("Retry policy must allow at least one attempt.")]
	ZeroAttempts,
	/// Per-call timeout is zero.
	#[error("Request timeout must be positive.")]
	ZeroTimeout,
	/// A credential component is empty.
	#[error("Credential `{field}` cannot be empty.")]
	EmptyCredential {
		/// Which credential field was empty.
		field: &'static str,
	},
	/// Access token contains bytes that cannot appear in an HTTP header.
	#[error("Access token cannot be encoded as an Authorization header.")]
	InvalidTokenHeader,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
