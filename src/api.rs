//! Endpoint wrappers for the Mailbox API.
//!
//! Every wrapper is a request/response shape layered on [`Client::execute`]; none of them
//! touches the token store, the rate gate, or the retry driver directly. Operations scoped to a
//! mailbox use the one picked with [`Client::select_mailbox`] or [`Client::set_mailbox_id`] and
//! fail with [`ValidationError::NoMailboxSelected`] before sending anything when none is picked.

pub mod attachments;
pub mod conversations;
pub mod custom_fields;
pub mod mailboxes;
pub mod threads;

pub use conversations::*;
pub use custom_fields::*;
pub use mailboxes::*;
pub use threads::*;

// self
use crate::{_prelude::*, client::Client, error::ValidationError, http::HttpTransport};

/// Paging metadata attached to list responses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageInfo {
	/// Items per page.
	pub size: u32,
	/// Items across all pages.
	pub total_elements: u32,
	/// Number of pages.
	pub total_pages: u32,
	/// One-based number of this page.
	pub number: u32,
}

/// HAL list envelope: the `_embedded` collection plus paging metadata.
#[derive(Debug, Deserialize)]
pub(crate) struct Listing<E> {
	#[serde(rename = "_embedded", default)]
	pub(crate) embedded: E,
	#[serde(default)]
	pub(crate) page: PageInfo,
}

impl<T> Client<T>
where
	T: ?Sized + HttpTransport,
{
	pub(crate) fn require_mailbox(&self) -> Result<u64> {
		self.mailbox_id().ok_or_else(|| ValidationError::NoMailboxSelected.into())
	}
}

/// Timestamps sent to the API: UTC with second precision, `YYYY-MM-DDTHH:MM:SSZ`.
pub(crate) mod wire_time {
	// crates.io
	use serde::{Serializer, ser::Error as _};
	use time::{UtcOffset, format_description::BorrowedFormatItem, macros::format_description};
	// self
	use crate::_prelude::*;

	const FORMAT: &[BorrowedFormatItem<'_>] =
		format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

	pub(crate) fn format(at: OffsetDateTime) -> Result<String, time::error::Format> {
		at.to_offset(UtcOffset::UTC).format(FORMAT)
	}

	pub(crate) fn serialize<S>(at: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&format(*at).map_err(S::Error::custom)?)
	}

	pub(crate) mod option {
		// crates.io
		use serde::Serializer;
		// self
		use crate::_prelude::*;

		pub(crate) fn serialize<S>(
			at: &Option<OffsetDateTime>,
			serializer: S,
		) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			match at {
				Some(at) => super::serialize(at, serializer),
				None => serializer.serialize_none(),
			}
		}
	}

}
