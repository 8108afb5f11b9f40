//! Application credentials exchanged for access tokens.

// crates.io
use oauth2::{ClientId, ClientSecret};
// self
use crate::{_prelude::*, error::ConfigError};

/// Grant type sent to the token endpoint.
pub const GRANT_TYPE: &str = "client_credentials";

/// Application id and secret issued by Help Scout.
///
/// The secret only ever leaves the process inside the token request body; formatters redact it.
#[derive(Clone, Debug)]
pub struct Credentials {
	app_id: ClientId,
	app_secret: ClientSecret,
}
impl Credentials {
	/// Validates and wraps the credential pair.
	pub fn new(
		app_id: impl Into<String>,
		app_secret: impl Into<String>,
	) -> Result<Self, ConfigError> {
		let app_id = app_id.into();
		let app_secret = app_secret.into();

		if app_id.trim().is_empty() {
			return Err(ConfigError::EmptyCredential { field: "app_id" });
		}
		if app_secret.trim().is_empty() {
			return Err(ConfigError::EmptyCredential { field: "app_secret" });
		}

		Ok(Self { app_id: ClientId::new(app_id), app_secret: ClientSecret::new(app_secret) })
	}

	/// Application identifier.
	pub fn app_id(&self) -> &str {
		self.app_id.as_str()
	}

	/// Form fields for the client-credentials grant.
	pub(crate) fn token_form(&self) -> Vec<(String, String)> {
		vec![
			("client_id".into(), self.app_id.as_str().to_owned()),
			("client_secret".into(), self.app_secret.secret().to_owned()),
			("grant_type".into(), GRANT_TYPE.into()),
		]
	}
}
