//! Multipart upload parsing, validation and storage

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use axum::extract::Multipart;
use axum::http::StatusCode;
use saccharum_vision::utils::ResultExt;
use saccharum_vision::{AppConfig, PredictOptions};
use tokio::fs;
use uuid::Uuid;

use crate::error::ApiError;

/// Form field carrying the image
pub const FILE_FIELD: &str = "file";

/// A parsed prediction form
#[derive(Debug)]
pub struct Upload {
    /// Client-supplied file name, unsanitized
    pub filename: String,
    pub bytes: Bytes,
    /// Remaining text fields
    pub fields: HashMap<String, String>,
}

/// Read every field of the form; the image must be present and named
pub async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> Result<Upload, ApiError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| limit_error(e, max_bytes))? {
        let name = field.name().unwrap_or_default().to_string();
        if name == FILE_FIELD {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(|e| limit_error(e, max_bytes))?;
            file = Some((filename, bytes));
        } else {
            let value = field.text().await.map_err(|e| limit_error(e, max_bytes))?;
            fields.insert(name, value);
        }
    }

    let (filename, bytes) = file.ok_or_else(|| ApiError::bad_request("No file was sent"))?;
    if filename.is_empty() {
        return Err(ApiError::bad_request("The file has no name"));
    }

    Ok(Upload {
        filename,
        bytes,
        fields,
    })
}

fn limit_error(err: axum::extract::multipart::MultipartError, max_bytes: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(max_bytes)
    } else {
        ApiError::from(err)
    }
}

/// Reduce a client file name to a safe basename
///
/// Keeps ASCII alphanumerics, `.`, `-` and `_`; whitespace becomes `_`.
/// Leading dots are stripped so the result is never hidden or a traversal.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();
    cleaned.trim_start_matches(['.', '_']).to_string()
}

/// Sanitized, collision-free storage name for an upload
pub fn stored_name(config: &AppConfig, filename: &str) -> Result<String, ApiError> {
    let secured = secure_filename(filename);
    if secured.is_empty() {
        return Err(ApiError::bad_request("Invalid file name"));
    }
    if !config.is_allowed_extension(&secured) {
        return Err(ApiError::bad_request(format!(
            "File type not allowed. Use: {}",
            config.allowed_extensions.join(", ")
        )));
    }

    let id = Uuid::new_v4().simple().to_string();
    Ok(format!("{}_{}", &id[..12], secured))
}

/// Write the upload under `dir`
pub async fn store(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, ApiError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create upload directory: {}", e)))?;
    let path = dir.join(name);
    fs::write(&path, bytes)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to save upload: {}", e)))?;
    Ok(path)
}

/// Public URL of a stored upload
pub fn image_url(name: &str) -> String {
    format!("/uploads/{}", name)
}

/// Prediction options from the form, falling back to the configured defaults
pub fn parse_options(
    fields: &HashMap<String, String>,
    config: &AppConfig,
) -> Result<PredictOptions, ApiError> {
    let mut options = config.default_options();

    if let Some(value) = fields.get("use_tta") {
        options.use_tta = value.trim().eq_ignore_ascii_case("true");
    }
    if let Some(value) = fields.get("threshold") {
        options.threshold = value
            .trim()
            .parse::<f32>()
            .with_context(|| format!("Invalid threshold {:?}", value))?;
    }
    if let Some(value) = fields.get("num_augmentations") {
        options.num_augmentations = value
            .trim()
            .parse::<usize>()
            .with_context(|| format!("Invalid num_augmentations {:?}", value))?;
    }

    options
        .validate(config.max_augmentations)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(options)
}
