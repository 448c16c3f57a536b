// Error handling for the Transcription Gateway
//
// This module defines the route-level error type. Every failure a handler can
// hit is converted here into a structured JSON response, so no error escapes a
// route as an unhandled fault.

use std::io;
use thiserror::Error;

use actix_web::{HttpResponse, ResponseError};

use crate::model::ModelError;
use crate::models::ErrorResponse;

/// Errors that can occur in the gateway handlers
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Error when processing multipart form data
    #[error("Form error: {0}")]
    FormError(String),

    /// The `audio` file part is missing
    #[error("No audio file provided")]
    NoAudioFile,

    /// The `audio` file part has an empty filename
    #[error("No selected file")]
    NoSelectedFile,

    /// The `audio_chunk` file part is missing or unnamed
    #[error("No audio chunk provided")]
    NoAudioChunk,

    /// A file was selected but carried no bytes
    #[error("Empty audio file")]
    EmptyAudio,

    /// Error when a file is too large
    #[error("File too large: {0} bytes exceeds limit of {1} bytes")]
    FileTooLarge(usize, usize),

    /// Error when staging the audio on disk
    #[error("Failed to stage audio: {0}")]
    Staging(#[from] io::Error),

    /// Error raised by the speech model
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl GatewayError {
    /// Create a new FormError
    pub fn form_error<S: Into<String>>(msg: S) -> Self {
        Self::FormError(msg.into())
    }

    /// True for failures on the server side, which are reported with `success: false`
    pub fn is_internal(&self) -> bool {
        matches!(self, GatewayError::Staging(_) | GatewayError::Model(_))
    }
}

impl ResponseError for GatewayError {
    fn error_response(&self) -> HttpResponse {
        let error_response = ErrorResponse {
            success: self.is_internal().then_some(false),
            error: self.to_string(),
        };

        match self {
            GatewayError::FormError(_)
            | GatewayError::NoAudioFile
            | GatewayError::NoSelectedFile
            | GatewayError::NoAudioChunk
            | GatewayError::EmptyAudio => HttpResponse::BadRequest().json(error_response),
            GatewayError::FileTooLarge(_, _) => {
                HttpResponse::PayloadTooLarge().json(error_response)
            }
            GatewayError::Staging(_) | GatewayError::Model(_) => {
                HttpResponse::InternalServerError().json(error_response)
            }
        }
    }
}
