//! Logical request value handed to the executor.

// crates.io
use oauth2::http::{
	Method, Request,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	error::{ConfigError, ValidationError},
	http::HttpRequest,
};

const JSON: &str = "application/json";
const FORM: &str = "application/x-www-form-urlencoded";

/// Body encoding chosen by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestBody {
	/// No body.
	Empty,
	/// `application/x-www-form-urlencoded` fields, in order.
	Form(Vec<(String, String)>),
	/// Pre-encoded JSON document.
	Json(Vec<u8>),
}

/// One logical call: a path relative to the base URL, a method, and a body.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	path: String,
	method: Method,
	body: RequestBody,
}
impl ApiRequest {
	/// `GET` request without a body.
	pub fn get(path: impl Into<String>) -> Self {
		Self { path: path.into(), method: Method::GET, body: RequestBody::Empty }
	}

	/// `POST` request carrying `body` serialized as JSON.
	pub fn json<B>(path: impl Into<String>, body: &B) -> Result<Self>
	where
		B: ?Sized + Serialize,
	{
		let encoded =
			serde_json::to_vec(body).map_err(|source| ValidationError::Body { source })?;

		Ok(Self { path: path.into(), method: Method::POST, body: RequestBody::Json(encoded) })
	}

	/// `POST` request carrying form fields.
	pub fn form<I, K, V>(path: impl Into<String>, fields: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let fields = fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect();

		Self { path: path.into(), method: Method::POST, body: RequestBody::Form(fields) }
	}

	/// Overrides the method picked from the body kind.
	pub fn with_method(mut self, method: Method) -> Self {
		self.method = method;

		self
	}

	/// Path relative to the base URL.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// HTTP method.
	pub fn method(&self) -> &Method {
		&self.method
	}

	/// Body to send.
	pub fn body(&self) -> &RequestBody {
		&self.body
	}

	pub(crate) fn build(
		&self,
		url: &Url,
		token: Option<&AccessToken>,
	) -> Result<HttpRequest, ConfigError> {
		let mut builder = Request::builder()
			.method(self.method.clone())
			.uri(url.as_str())
			.header(ACCEPT, JSON);

		if let Some(token) = token {
			builder = builder.header(AUTHORIZATION, token.bearer_header()?);
		}

		let body = match &self.body {
			RequestBody::Empty => Vec::new(),
			RequestBody::Form(fields) => {
				builder = builder.header(CONTENT_TYPE, FORM);

				form_urlencoded::Serializer::new(String::new())
					.extend_pairs(fields)
					.finish()
					.into_bytes()
			},
			RequestBody::Json(bytes) => {
				builder = builder.header(CONTENT_TYPE, JSON);

				bytes.clone()
			},
		};

		Ok(builder.body(body)?)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(path: &str) -> Url {
		Url::parse("https://api.helpscout.net/v2/")
			.and_then(|base| base.join(path))
			.expect("Test URL should parse.")
	}

	#[test]
	fn method_follows_body_kind_unless_overridden() {
		assert_eq!(ApiRequest::get("mailboxes").method(), Method::GET);
		assert_eq!(ApiRequest::form("oauth2/token", [("a", "b")]).method(), Method::POST);
		assert_eq!(
			ApiRequest::json("conversations/1/fields", &serde_json::json!({}))
				.expect("Body should encode.")
				.with_method(Method::PUT)
				.method(),
			Method::PUT
		);
	}

	#[test]
	fn form_requests_are_url_encoded_without_auth() {
		let request = ApiRequest::form("oauth2/token", [("client_id", "a b"), ("grant_type", "x&y")])
			.build(&url("oauth2/token"), None)
			.expect("Form request should build.");

		assert_eq!(request.headers()[CONTENT_TYPE], FORM);
		assert_eq!(request.headers()[ACCEPT], JSON);
		assert!(request.headers().get(AUTHORIZATION).is_none());
		assert_eq!(request.body().as_slice(), b"client_id=a+b&grant_type=x%26y");
	}

	#[test]
	fn json_requests_carry_bearer_and_content_type() {
		let token = AccessToken::new("abc");
		let request = ApiRequest::json("conversations", &serde_json::json!({ "subject": "Hi" }))
			.expect("Body should encode.")
			.build(&url("conversations"), Some(&token))
			.expect("JSON request should build.");

		assert_eq!(request.method(), Method::POST);
		assert_eq!(request.uri().to_string(), "https://api.helpscout.net/v2/conversations");
		assert_eq!(request.headers()[CONTENT_TYPE], JSON);
		assert_eq!(request.headers()[AUTHORIZATION], "Bearer abc");
		assert_eq!(request.body().as_slice(), b"{\"subject\":\"Hi\"}");
	}

	#[test]
	fn empty_requests_have_no_body_or_content_type() {
		let request = ApiRequest::get("mailboxes")
			.build(&url("mailboxes"), None)
			.expect("GET request should build.");

		assert!(request.body().is_empty());
		assert!(request.headers().get(CONTENT_TYPE).is_none());
	}
}
