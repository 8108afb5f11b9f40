//! Mailbox custom fields and per-conversation values.

// crates.io
use oauth2::http::Method;
// self
use crate::{
	_prelude::*,
	api::Listing,
	client::{ApiRequest, Client},
	error::ValidationError,
	http::HttpTransport,
};

/// Option of a dropdown custom field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CustomFieldOption {
	/// Option id.
	pub id: u64,
	/// Display position.
	pub order: i32,
	/// Label shown in the UI.
	pub label: String,
}

/// Custom field defined on a mailbox.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CustomField {
	/// Field id.
	pub id: u64,
	/// Field name, as shown in the UI.
	pub name: String,
	/// Whether a value is required.
	#[serde(default)]
	pub required: bool,
	/// Display position.
	#[serde(default)]
	pub order: i32,
	/// Field type, e.g. `SINGLE_LINE`, `DROPDOWN`.
	#[serde(default, rename = "type")]
	pub kind: String,
	/// Options of a dropdown field.
	#[serde(default)]
	pub options: Vec<CustomFieldOption>,
}

#[derive(Debug, Default, Deserialize)]
struct Fields {
	#[serde(default)]
	fields: Vec<CustomField>,
}

#[derive(Debug, Serialize)]
struct FieldValue {
	id: u64,
	value: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct FieldValues {
	fields: Vec<FieldValue>,
}

fn field_id(fields: &[CustomField], name: &str) -> Result<u64> {
	fields
		.iter()
		.find(|field| field.name == name)
		.map(|field| field.id)
		.ok_or_else(|| ValidationError::UnknownCustomField { name: name.to_owned() }.into())
}

impl<T> Client<T>
where
	T: ?Sized + HttpTransport,
{
	/// Custom fields of the selected mailbox.
	pub async fn custom_fields(&self) -> Result<Vec<CustomField>> {
		let mailbox_id = self.require_mailbox()?;
		let (listing, _) = self
			.execute_json::<Listing<Fields>>(ApiRequest::get(format!(
				"mailboxes/{mailbox_id}/fields"
			)))
			.await?;

		Ok(listing.embedded.fields)
	}

	/// Id of the selected mailbox's custom field called `name`.
	pub async fn custom_field_id(&self, name: &str) -> Result<u64> {
		field_id(&self.custom_fields().await?, name)
	}

	/// Sets custom field values on a conversation, addressing fields by name.
	///
	/// Names are resolved with one listing of the mailbox's fields; an unknown name fails the
	/// whole update before it is sent.
	pub async fn update_custom_fields<I, K>(&self, conversation_id: u64, values: I) -> Result<()>
	where
		I: IntoIterator<Item = (K, serde_json::Value)>,
		K: AsRef<str>,
	{
		let defined = self.custom_fields().await?;
		let fields = values
			.into_iter()
			.map(|(name, value)| Ok(FieldValue { id: field_id(&defined, name.as_ref())?, value }))
			.collect::<Result<Vec<_>>>()?;
		let request =
			ApiRequest::json(format!("conversations/{conversation_id}/fields"), &FieldValues {
				fields,
			})?
			.with_method(Method::PUT);

		self.execute(request).await?;

		Ok(())
	}
}
