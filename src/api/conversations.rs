//! Conversation creation and search.

// crates.io
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	api::{Listing, NewThread, ThreadKind, wire_time},
	client::{ApiRequest, Client},
	error::ValidationError,
	http::HttpTransport,
};

/// Source of a customer's photo.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoType {
	/// Source not known.
	Unknown,
	/// Gravatar.
	Gravatar,
	/// Twitter.
	Twitter,
	/// Facebook.
	Facebook,
	/// Google profile.
	GoogleProfile,
	/// Google+.
	GooglePlus,
	/// LinkedIn.
	LinkedIn,
}

/// Customer gender.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
	/// Male.
	Male,
	/// Female.
	Female,
	/// Not known.
	Unknown,
}

/// Customer attached to a new conversation or thread; unset fields are left off the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
	/// Existing customer id.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<u64>,
	/// Email address.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	/// First name.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub first_name: Option<String>,
	/// Last name.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last_name: Option<String>,
	/// Photo URL.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub photo_url: Option<String>,
	/// Job title.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub job_title: Option<String>,
	/// Photo source.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub photo_type: Option<PhotoType>,
	/// Free-form notes.
	#[serde(rename = "background", skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	/// Location.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub location: Option<String>,
	/// Creation time; overwritten with the conversation's creation time when one is created.
	#[serde(with = "wire_time::option", skip_serializing_if = "Option::is_none")]
	pub created_at: Option<OffsetDateTime>,
	/// Company.
	#[serde(rename = "organization", skip_serializing_if = "Option::is_none")]
	pub company: Option<String>,
	/// Gender.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub gender: Option<Gender>,
	/// Age, as free text.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub age: Option<String>,
}
impl Customer {
	/// Customer identified by email only.
	pub fn with_email(email: impl Into<String>) -> Self {
		Self { email: Some(email.into()), ..Default::default() }
	}

	/// Sets first and last name.
	pub fn named(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
		self.first_name = Some(first.into());
		self.last_name = Some(last.into());

		self
	}
}

/// A conversation to create in the selected mailbox.
#[derive(Clone, Debug)]
pub struct NewConversation {
	/// Subject line; must not be blank.
	pub subject: String,
	/// Customer the conversation is with.
	pub customer: Customer,
	/// When the conversation started.
	pub created_at: OffsetDateTime,
	/// Tags to apply.
	pub tags: Vec<String>,
	/// Threads to create with the conversation.
	pub threads: Vec<NewThread>,
	/// Creates the conversation closed, with `closedAt` equal to `created_at`.
	pub closed: bool,
	/// User the conversation is attributed to.
	pub user: Option<u64>,
}
impl NewConversation {
	/// Open conversation without tags or threads.
	pub fn new(subject: impl Into<String>, customer: Customer, created_at: OffsetDateTime) -> Self {
		Self {
			subject: subject.into(),
			customer,
			created_at,
			tags: Vec::new(),
			threads: Vec::new(),
			closed: false,
			user: None,
		}
	}

	/// Sets the tags.
	pub fn with_tags<I, S>(mut self, tags: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.tags = tags.into_iter().map(Into::into).collect();

		self
	}

	/// Appends a thread.
	pub fn with_thread(mut self, thread: NewThread) -> Self {
		self.threads.push(thread);

		self
	}

	/// Creates the conversation closed or active.
	pub fn closed(mut self, closed: bool) -> Self {
		self.closed = closed;

		self
	}

	/// Attributes the conversation to a user.
	pub fn with_user(mut self, user: u64) -> Self {
		self.user = Some(user);

		self
	}
}

/// Ids returned by [`Client::new_conversation_with_thread`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreatedConversation {
	/// New conversation id.
	pub conversation_id: u64,
	/// Id of its first thread, when it was looked up.
	pub thread_id: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversationBody<'a> {
	subject: &'a str,
	customer: Customer,
	mailbox_id: u64,
	#[serde(rename = "type")]
	kind: &'static str,
	status: &'static str,
	#[serde(with = "wire_time")]
	created_at: OffsetDateTime,
	threads: &'a [NewThread],
	imported: bool,
	tags: &'a [String],
	#[serde(with = "wire_time::option", skip_serializing_if = "Option::is_none")]
	closed_at: Option<OffsetDateTime>,
	#[serde(skip_serializing_if = "Option::is_none")]
	user: Option<u64>,
}
impl<'a> ConversationBody<'a> {
	fn new(conversation: &'a NewConversation, mailbox_id: u64) -> Self {
		let customer =
			Customer { created_at: Some(conversation.created_at), ..conversation.customer.clone() };

		Self {
			subject: &conversation.subject,
			customer,
			mailbox_id,
			kind: "email",
			status: if conversation.closed { "closed" } else { "active" },
			created_at: conversation.created_at,
			threads: &conversation.threads,
			imported: true,
			tags: &conversation.tags,
			closed_at: conversation.closed.then_some(conversation.created_at),
			user: conversation.user,
		}
	}
}

/// Someone a conversation was created by or is with.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Person {
	/// Person id.
	pub id: u64,
	/// `customer` or `user`.
	#[serde(rename = "type")]
	pub kind: String,
	/// First name.
	pub first: String,
	/// Last name.
	pub last: String,
	/// Email address.
	pub email: String,
}

/// An existing conversation.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
	/// Conversation id.
	pub id: u64,
	/// Number shown in the UI.
	#[serde(default)]
	pub number: u64,
	/// Thread count.
	#[serde(default)]
	pub threads: u32,
	/// Conversation type, e.g. `email`.
	#[serde(default, rename = "type")]
	pub kind: String,
	/// Folder id.
	#[serde(default)]
	pub folder_id: u64,
	/// Status, e.g. `active` or `closed`.
	#[serde(default)]
	pub status: String,
	/// State, e.g. `published`.
	#[serde(default)]
	pub state: String,
	/// Subject line.
	#[serde(default)]
	pub subject: String,
	/// Text preview.
	#[serde(default)]
	pub preview: String,
	/// Mailbox id.
	#[serde(default)]
	pub mailbox_id: u64,
	/// Creator.
	#[serde(default)]
	pub created_by: Option<Person>,
	/// Primary customer.
	#[serde(default)]
	pub primary_customer: Option<Person>,
	/// Tags, as returned by the API.
	#[serde(default)]
	pub tags: Vec<serde_json::Value>,
	/// Custom field values, as returned by the API.
	#[serde(default)]
	pub custom_fields: Vec<serde_json::Value>,
	/// Creation time.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub created_at: Option<OffsetDateTime>,
	/// Close time.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub closed_at: Option<OffsetDateTime>,
}

#[derive(Debug, Default, Deserialize)]
struct Conversations {
	#[serde(default)]
	conversations: Vec<Conversation>,
}

impl<T> Client<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a conversation in the selected mailbox and returns its id.
	pub async fn new_conversation(&self, conversation: &NewConversation) -> Result<u64> {
		if conversation.subject.trim().is_empty() {
			return Err(ValidationError::EmptySubject.into());
		}

		let mailbox_id = self.require_mailbox()?;
		let request =
			ApiRequest::json("conversations", &ConversationBody::new(conversation, mailbox_id))?;

		self.execute(request).await?.resource_id()
	}

	/// Creates a conversation holding a single imported thread of `kind` with `content`.
	///
	/// Threads already on `conversation` are replaced. Looking up the thread id costs an extra
	/// request, so it only happens when `find_thread_id` is set.
	pub async fn new_conversation_with_thread(
		&self,
		kind: ThreadKind,
		mut conversation: NewConversation,
		content: impl Into<String>,
		find_thread_id: bool,
	) -> Result<CreatedConversation> {
		conversation.threads = vec![NewThread {
			kind,
			customer: conversation.customer.clone(),
			content: content.into(),
			imported: true,
			created_at: conversation.created_at,
		}];

		let conversation_id = self.new_conversation(&conversation).await?;
		let thread_id = if find_thread_id {
			Some(self.earliest_thread_id(conversation_id).await?)
		} else {
			None
		};

		Ok(CreatedConversation { conversation_id, thread_id })
	}

	/// Every conversation in the selected mailbox matching `query`, across all pages.
	///
	/// `query` uses the search syntax of the web UI; `None` or an empty string lists everything.
	pub async fn list_conversations(&self, query: Option<&str>) -> Result<Vec<Conversation>> {
		let mailbox_id = self.require_mailbox()?.to_string();
		let query = query.filter(|query| !query.is_empty());
		let mut conversations = Vec::new();
		let mut page = 1_u32;

		loop {
			let mut params = form_urlencoded::Serializer::new(String::new());

			params
				.append_pair("status", "all")
				.append_pair("mailbox", &mailbox_id)
				.append_pair("page", &page.to_string());

			if let Some(query) = query {
				params.append_pair("query", query);
			}

			let path = format!("conversations?{}", params.finish());
			let (listing, _) =
				self.execute_json::<Listing<Conversations>>(ApiRequest::get(path)).await?;

			conversations.extend(listing.embedded.conversations);

			if page >= listing.page.total_pages {
				break;
			}

			page += 1;
		}

		Ok(conversations)
	}

	/// Every conversation in the selected mailbox with the customer `email`.
	pub async fn list_conversations_by_email(&self, email: &str) -> Result<Vec<Conversation>> {
		self.list_conversations(Some(&format!("(email:\"{email}\")"))).await
	}
}
