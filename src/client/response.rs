//! Successful response captured by the executor.

// crates.io
use oauth2::http::{HeaderMap, StatusCode};
// self
use crate::{_prelude::*, error::DecodeError};

/// Header carrying the id of a resource the server just created.
pub const RESOURCE_ID_HEADER: &str = "resource-id";

/// Status, headers, and raw body of a `2xx` response.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	url: String,
	status: StatusCode,
	headers: HeaderMap,
	body: Vec<u8>,
}
impl ApiResponse {
	pub(crate) fn new(url: String, status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
		Self { url, status, headers, body }
	}

	/// URL the response came from.
	pub fn url(&self) -> &str {
		&self.url
	}

	/// HTTP status.
	pub fn status(&self) -> StatusCode {
		self.status
	}

	/// Response headers.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Raw body.
	pub fn body(&self) -> &[u8] {
		&self.body
	}

	/// Body decoded lossily as UTF-8.
	pub fn text(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(&self.body)
	}

	/// Header value as a string, if present and visible ASCII.
	pub fn header_str(&self, name: &str) -> Option<&str> {
		self.headers.get(name)?.to_str().ok()
	}

	/// Decodes the body into `D`, reporting the JSON path of the first mismatch.
	pub fn json<D>(&self) -> Result<D>
	where
		D: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| DecodeError::Json { url: self.url.clone(), source }.into())
	}

	/// Id from the `Resource-ID` header returned by create calls.
	pub fn resource_id(&self) -> Result<u64> {
		self.header_str(RESOURCE_ID_HEADER)
			.and_then(|value| value.trim().parse().ok())
			.ok_or_else(|| {
				DecodeError::MissingHeader { url: self.url.clone(), name: "Resource-ID" }.into()
			})
	}

	/// Consumes the response, returning the raw body.
	pub fn into_body(self) -> Vec<u8> {
		self.body
	}
}
