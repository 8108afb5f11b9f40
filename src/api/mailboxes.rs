//! Mailbox listing and selection.

// self
use crate::{
	_prelude::*,
	api::Listing,
	client::{ApiRequest, Client},
	error::ValidationError,
	http::HttpTransport,
};

/// A mailbox the app can access.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mailbox {
	/// Mailbox id.
	pub id: u64,
	/// Display name.
	pub name: String,
	/// URL slug.
	#[serde(default)]
	pub slug: String,
	/// Mailbox email address.
	pub email: String,
	/// Creation time.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub created_at: Option<OffsetDateTime>,
	/// Last update time.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub updated_at: Option<OffsetDateTime>,
}

/// How [`Client::select_mailbox`] identifies the mailbox to select.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MailboxSelector {
	/// Exact mailbox id.
	Id(u64),
	/// Display name or email address, compared exactly.
	NameOrEmail(String),
}
impl MailboxSelector {
	/// Whether `mailbox` is the one this selector names.
	pub fn matches(&self, mailbox: &Mailbox) -> bool {
		match self {
			Self::Id(id) => mailbox.id == *id,
			Self::NameOrEmail(key) => mailbox.name == *key || mailbox.email == *key,
		}
	}
}
impl From<u64> for MailboxSelector {
	fn from(id: u64) -> Self {
		Self::Id(id)
	}
}
impl From<&str> for MailboxSelector {
	fn from(key: &str) -> Self {
		Self::NameOrEmail(key.to_owned())
	}
}
impl From<String> for MailboxSelector {
	fn from(key: String) -> Self {
		Self::NameOrEmail(key)
	}
}
impl Display for MailboxSelector {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Id(id) => write!(f, "{id}"),
			Self::NameOrEmail(key) => f.write_str(key),
		}
	}
}

#[derive(Debug, Default, Deserialize)]
struct Mailboxes {
	#[serde(default)]
	mailboxes: Vec<Mailbox>,
}

impl<T> Client<T>
where
	T: ?Sized + HttpTransport,
{
	/// Lists the mailboxes the app can access.
	pub async fn list_mailboxes(&self) -> Result<Vec<Mailbox>> {
		let (listing, _) =
			self.execute_json::<Listing<Mailboxes>>(ApiRequest::get("mailboxes")).await?;

		Ok(listing.embedded.mailboxes)
	}

	/// Selects the first mailbox matching `selector` and returns its id.
	///
	/// The previous selection is cleared once the listing succeeds, so a selector that matches
	/// nothing leaves no mailbox selected.
	pub async fn select_mailbox(&self, selector: impl Into<MailboxSelector>) -> Result<u64> {
		let selector = selector.into();
		let mailboxes = self.list_mailboxes().await?;

		self.deselect_mailbox();

		let id = mailboxes
			.iter()
			.find(|mailbox| selector.matches(mailbox))
			.map(|mailbox| mailbox.id)
			.ok_or_else(|| ValidationError::MailboxNotFound { selector: selector.to_string() })?;

		self.set_mailbox_id(id);

		Ok(id)
	}
}
