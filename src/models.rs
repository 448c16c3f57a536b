// Transcription Gateway data models
//
// This module contains the response schemas of the gateway. Each route has its
// own type so success and failure shapes are fixed at compile time.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::{LanguageDetection, Segment, TranscriptionResult};

/// Response for `GET /health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Configured model size
    pub model: String,
    pub supported_languages: Vec<&'static str>,
}

/// Response for `POST /transcribe`
#[derive(Debug, Serialize)]
pub struct TranscriptionResponse {
    pub success: bool,
    pub transcription: String,
    pub segments: Vec<Segment>,
    /// Language resolved by the model, or the requested one if it reports none
    pub language: String,
}

impl TranscriptionResponse {
    pub fn new(result: TranscriptionResult, requested_language: &str) -> Self {
        Self {
            success: true,
            transcription: result.text,
            segments: result.segments,
            language: result
                .language
                .unwrap_or_else(|| requested_language.to_string()),
        }
    }
}

/// Response for `POST /transcribe-stream`, flat text without segments
#[derive(Debug, Serialize)]
pub struct StreamTranscriptionResponse {
    pub success: bool,
    pub text: String,
    pub language: String,
}

impl StreamTranscriptionResponse {
    pub fn new(result: TranscriptionResult, requested_language: &str) -> Self {
        Self {
            success: true,
            text: result.text,
            language: result
                .language
                .unwrap_or_else(|| requested_language.to_string()),
        }
    }
}

/// Response for `POST /detect-language`
#[derive(Debug, Serialize)]
pub struct LanguageDetectionResponse {
    pub success: bool,
    pub language: String,
    /// Probability of `language`, in [0, 1]
    pub confidence: f64,
    /// Languages whose probability is above the noise threshold
    pub all_probabilities: BTreeMap<String, f64>,
}

impl From<LanguageDetection> for LanguageDetectionResponse {
    fn from(detection: LanguageDetection) -> Self {
        Self {
            success: true,
            language: detection.language,
            confidence: detection.confidence,
            all_probabilities: detection.probabilities,
        }
    }
}

/// Error response for API
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Present (and false) only for internal failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Error message
    pub error: String,
}
