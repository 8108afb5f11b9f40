//! Thread attachments.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
// self
use crate::{
	_prelude::*,
	client::{ApiRequest, ApiResponse, Client},
	http::HttpTransport,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AttachmentBody<'a> {
	file_name: &'a str,
	mime_type: &'a str,
	data: String,
}

impl<T> Client<T>
where
	T: ?Sized + HttpTransport,
{
	/// Uploads `data` as an attachment of a thread; the bytes travel base64-encoded.
	pub async fn upload_attachment(
		&self,
		conversation_id: u64,
		thread_id: u64,
		file_name: &str,
		mime_type: &str,
		data: &[u8],
	) -> Result<ApiResponse> {
		let body = AttachmentBody { file_name, mime_type, data: STANDARD.encode(data) };
		let request = ApiRequest::json(
			format!("conversations/{conversation_id}/threads/{thread_id}/attachments"),
			&body,
		)?;

		self.execute(request).await
	}
}
