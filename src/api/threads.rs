//! Conversation threads.

// self
use crate::{
	_prelude::*,
	api::{Customer, Listing, wire_time},
	client::{ApiRequest, Client},
	error::ValidationError,
	http::HttpTransport,
};

/// Who a new thread is from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadKind {
	/// Message written by the customer.
	Customer,
	/// Reply sent to the customer.
	Reply,
}

/// Thread sent along with a new conversation.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewThread {
	/// Thread type.
	#[serde(rename = "type")]
	pub kind: ThreadKind,
	/// Customer the thread belongs to.
	pub customer: Customer,
	/// Thread text.
	#[serde(rename = "text")]
	pub content: String,
	/// Imported threads do not trigger notifications or auto-replies.
	pub imported: bool,
	/// When the message was written.
	#[serde(with = "wire_time")]
	pub created_at: OffsetDateTime,
}

/// An existing thread.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
	/// Thread id.
	pub id: u64,
	/// Thread type, e.g. `customer`, `reply`, `note`.
	#[serde(default, rename = "type")]
	pub kind: String,
	/// Thread status.
	#[serde(default)]
	pub status: String,
	/// Thread state.
	#[serde(default)]
	pub state: String,
	/// Thread body.
	#[serde(default)]
	pub body: String,
	/// Creation time.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Default, Deserialize)]
struct Threads {
	#[serde(default)]
	threads: Vec<Thread>,
}

/// Id of the oldest thread (lowest id) in `threads`.
pub fn earliest_thread_id(threads: &[Thread]) -> Result<u64> {
	threads.iter().map(|thread| thread.id).min().ok_or_else(|| ValidationError::NoThreads.into())
}

/// Id of the newest thread (highest id) in `threads`.
pub fn latest_thread_id(threads: &[Thread]) -> Result<u64> {
	threads.iter().map(|thread| thread.id).max().ok_or_else(|| ValidationError::NoThreads.into())
}

impl<T> Client<T>
where
	T: ?Sized + HttpTransport,
{
	/// Threads of a conversation.
	pub async fn threads(&self, conversation_id: u64) -> Result<Vec<Thread>> {
		let (listing, _) = self
			.execute_json::<Listing<Threads>>(ApiRequest::get(format!(
				"conversations/{conversation_id}/threads"
			)))
			.await?;

		Ok(listing.embedded.threads)
	}

	/// Id of the first thread of a conversation.
	pub async fn earliest_thread_id(&self, conversation_id: u64) -> Result<u64> {
		earliest_thread_id(&self.threads(conversation_id).await?)
	}

	/// Id of the most recent thread of a conversation.
	pub async fn latest_thread_id(&self, conversation_id: u64) -> Result<u64> {
		latest_thread_id(&self.threads(conversation_id).await?)
	}
}
