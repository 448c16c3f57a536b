// Form data processing for the Transcription Gateway
//
// This module handles the extraction of multipart form data. It pulls out the
// uploaded audio part and the optional `language` field; every other field is
// drained and ignored.

use actix_multipart::{Field, Multipart};
use futures::{StreamExt, TryStreamExt};
use log::debug;

use crate::config::HandlerConfig;
use crate::error::GatewayError;

/// Name of the text field carrying the requested language
pub const LANGUAGE_FIELD: &str = "language";

/// An uploaded file part
#[derive(Debug)]
pub struct UploadedAudio {
    /// Client-side filename, possibly empty
    pub filename: String,
    pub data: Vec<u8>,
}

/// Fields extracted from an upload request
#[derive(Debug, Default)]
pub struct UploadForm {
    /// The file part, if the client sent one
    pub audio: Option<UploadedAudio>,
    /// Trimmed language value; present but blank is kept as `""`
    pub language: Option<String>,
}

/// Extract the file part named `file_field` and the language field
///
/// A part named `file_field` without a `filename` parameter is a plain form
/// value, not a file selection, and is skipped. Only the first file part is kept.
///
/// # Errors
///
/// * `GatewayError::FormError` if the stream or a part cannot be read
/// * `GatewayError::FileTooLarge` if the file exceeds `config.max_file_size`
pub async fn extract_upload(
    mut form: Multipart,
    file_field: &str,
    config: &HandlerConfig,
) -> Result<UploadForm, GatewayError> {
    let mut upload = UploadForm::default();

    loop {
        let mut field = match form.try_next().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return Err(GatewayError::form_error(format!(
                    "Error processing multipart form: {}",
                    e
                )))
            }
        };
        let content_disposition = field.content_disposition();
        let field_name = content_disposition
            .and_then(|cd| cd.get_name().map(|name| name.to_string()))
            .unwrap_or_default();
        let filename = content_disposition.and_then(|cd| cd.get_filename().map(str::to_string));

        match (field_name.as_str(), filename) {
            (name, Some(filename)) if name == file_field && upload.audio.is_none() => {
                let data = read_file_field(&mut field, config.max_file_size).await?;
                debug!("Received {} bytes for '{}' ({})", data.len(), name, filename);
                upload.audio = Some(UploadedAudio { filename, data });
            }
            (LANGUAGE_FIELD, _) => {
                upload.language = Some(read_text_field(&mut field, LANGUAGE_FIELD).await?);
            }
            _ => {
                // Skip unknown fields
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| {
                        GatewayError::form_error(format!("Error processing multipart form: {}", e))
                    })?;
                }
            }
        }
    }

    Ok(upload)
}

async fn read_file_field(field: &mut Field, max_file_size: usize) -> Result<Vec<u8>, GatewayError> {
    let mut data = Vec::new();

    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| {
            GatewayError::form_error(format!("Error processing file upload: {}", e))
        })?;

        if data.len() + chunk.len() > max_file_size {
            return Err(GatewayError::FileTooLarge(
                data.len() + chunk.len(),
                max_file_size,
            ));
        }
        data.extend_from_slice(&chunk);
    }

    Ok(data)
}

async fn read_text_field(field: &mut Field, field_name: &str) -> Result<String, GatewayError> {
    let mut bytes = Vec::new();

    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| {
            GatewayError::form_error(format!("Error reading field {}: {}", field_name, e))
        })?;
        bytes.extend_from_slice(&chunk);
    }

    let value = String::from_utf8(bytes).map_err(|_| {
        GatewayError::form_error(format!("Field {} is not valid UTF-8", field_name))
    })?;
    Ok(value.trim().to_string())
}
