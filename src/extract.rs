//! Request extractors that report failures through `ApiError`.
//!
//! axum's stock rejections use their own status codes and plain-text bodies;
//! these wrappers keep every service on the same `{success, detail}` shape
//! with 422 for missing or malformed fields.

use axum::{
    body::Bytes,
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        rejection::JsonRejection,
        FromRequest, Request,
    },
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

use crate::error::ApiError;
use crate::utils::files;

/// `Json<T>` whose rejection is an [`ApiError`].
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection_to_api_error(rejection)),
        }
    }
}

fn json_rejection_to_api_error(rejection: JsonRejection) -> ApiError {
    let detail = rejection.body_text();
    match rejection {
        JsonRejection::JsonDataError(_) => ApiError::Validation(detail),
        JsonRejection::JsonSyntaxError(_) => ApiError::Validation(detail),
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::Validation("Request body must be JSON (Content-Type: application/json)".to_string())
        }
        other if other.status() == StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge(detail),
        _ => ApiError::BadRequest(detail),
    }
}

/// A single uploaded file held in memory.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Sanitized client filename
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

/// The file part plus any plain text fields sent alongside it.
#[derive(Debug)]
pub struct UploadForm {
    pub file: UploadedFile,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str).filter(|v| !v.trim().is_empty())
    }
}

/// Read a multipart body that must carry a non-empty `file_field` part.
///
/// Handlers take `Result<Multipart, MultipartRejection>` so a request without
/// a multipart body is reported as a missing field (422) rather than axum's
/// default 400.
pub async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
    file_field: &str,
) -> Result<UploadForm, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!("Multipart rejection: {}", rejection.body_text());
        missing_file(file_field)
    })?;

    let mut file = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == file_field && file.is_none() {
            let filename = files::sanitize_filename(field.file_name().unwrap_or_default());
            let content_type = field
                .content_type()
                .map(str::to_string)
                .unwrap_or_else(|| files::guess_content_type(&filename));
            let data = field.bytes().await.map_err(multipart_error)?;
            file = Some(UploadedFile {
                filename,
                content_type,
                data,
            });
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            fields.insert(name, value);
        }
    }

    let file = file.ok_or_else(|| missing_file(file_field))?;
    if file.data.is_empty() {
        return Err(ApiError::BadRequest(format!("Uploaded file '{}' is empty", file.filename)));
    }

    Ok(UploadForm { file, fields })
}

fn missing_file(file_field: &str) -> ApiError {
    ApiError::Validation(format!("Field required: '{}' (multipart/form-data file upload)", file_field))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(format!("Malformed multipart body: {}", err.body_text()))
    }
}
