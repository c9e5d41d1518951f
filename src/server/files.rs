use std::collections::HashMap;

use axum::body::Body;
use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::server::response::ApiError;
use crate::server::validation::sanitize_file_name;
use crate::types::StoredFile;
use crate::uploads::SizeLimitedBuffer;

const FILE_FIELD: &str = "file";
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

pub struct UploadedFile {
    pub file_name: String,
    pub mime_type: String,
    pub data: Bytes,
}

#[derive(Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    /// Returns a non-empty text field.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("Upload exceeds maximum allowed size")
    } else {
        ApiError::bad_request(format!("Failed to read multipart: {e}"))
    }
}

/// Reads a multipart body. The `file` part is size-checked while it streams
/// in, so an oversized upload fails before anything is stored.
pub async fn read_upload_form(
    multipart: &mut Multipart,
    max_file_bytes: usize,
) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == FILE_FIELD {
            let file_name = sanitize_file_name(field.file_name().unwrap_or_default());
            let mime_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();

            let mut buffer = SizeLimitedBuffer::new(max_file_bytes);
            while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                buffer
                    .push(&chunk)
                    .map_err(|e| ApiError::payload_too_large(e.to_string()))?;
            }

            form.file = Some(UploadedFile {
                file_name,
                mime_type,
                data: buffer.freeze(),
            });
        } else {
            let mut buffer = SizeLimitedBuffer::new(MAX_TEXT_FIELD_BYTES);
            while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                buffer
                    .push(&chunk)
                    .map_err(|_| ApiError::bad_request(format!("Field '{name}' is too long")))?;
            }
            let value = String::from_utf8(buffer.freeze().to_vec())
                .map_err(|_| ApiError::bad_request(format!("Field '{name}' is not valid UTF-8")))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

/// Streams a stored file back to the client.
pub fn file_response(file: File, stored: &StoredFile, inline: bool) -> Response {
    let disposition = format!(
        "{}; filename=\"{}\"",
        if inline { "inline" } else { "attachment" },
        stored.file_name
    );

    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&stored.mime_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(stored.size_bytes));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}
