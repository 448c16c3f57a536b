// Speech model capability
//
// The gateway never runs inference itself. Request handlers depend on the
// `SpeechModel` trait, and `main` injects the concrete engine once at startup.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::{EngineBackend, WhisperConfig};

pub mod native;
pub mod whisper_cpp;

#[cfg(feature = "native")]
pub use native::WhisperRsModel;
pub use whisper_cpp::WhisperCppModel;

/// Probabilities at or below this value are left out of detection responses
pub const PROBABILITY_NOISE_THRESHOLD: f32 = 0.01;

/// Decoding effort requested from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoding {
    /// Full beam search, no speed shortcuts
    Full,
    /// Single-hypothesis decoding for near-real-time feedback
    Fast,
}

/// Options for a transcription call
#[derive(Debug, Clone, PartialEq)]
pub struct TranscribeOptions {
    /// Language to decode in, `None` lets the model detect it
    pub language: Option<String>,
    pub decoding: Decoding,
}

/// Timestamped transcript chunk, times in seconds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Output of a transcription call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TranscriptionResult {
    pub text: String,
    /// Segments ordered by start time
    pub segments: Vec<Segment>,
    /// Language the model decoded in, when it reports one
    pub language: Option<String>,
}

/// Language detection summary built from a model's probability distribution
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageDetection {
    pub language: String,
    pub confidence: f64,
    /// Entries strictly above [`PROBABILITY_NOISE_THRESHOLD`]
    pub probabilities: BTreeMap<String, f64>,
}

impl LanguageDetection {
    /// Pick the most probable language of `distribution`.
    ///
    /// Ties go to the lexicographically smallest code so the answer is stable.
    pub fn from_distribution(distribution: &HashMap<String, f32>) -> Result<Self, ModelError> {
        let (language, confidence) = distribution
            .iter()
            .max_by(|(code_a, p_a), (code_b, p_b)| {
                p_a.total_cmp(p_b).then_with(|| code_b.cmp(code_a))
            })
            .ok_or(ModelError::EmptyDistribution)?;

        let probabilities = distribution
            .iter()
            .filter(|(_, p)| **p > PROBABILITY_NOISE_THRESHOLD)
            .map(|(code, p)| (code.clone(), f64::from(*p)))
            .collect();

        Ok(Self {
            language: language.clone(),
            confidence: f64::from(*confidence).clamp(0.0, 1.0),
            probabilities,
        })
    }
}

/// Errors raised by a speech model
#[derive(Error, Debug)]
pub enum ModelError {
    /// Weights for the configured model are missing
    #[error("Model file not found: {0}")]
    ModelNotFound(String),

    /// The engine process could not be started
    #[error("Failed to run speech engine: {0}")]
    Launch(#[from] std::io::Error),

    /// The engine ran and reported a failure
    #[error("Speech engine failed: {0}")]
    Engine(String),

    /// The engine output could not be understood
    #[error("Unexpected speech engine output: {0}")]
    Output(String),

    /// The engine returned no language probabilities
    #[error("Language detection returned no probabilities")]
    EmptyDistribution,

    /// The staged file is not audio the engine can read
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    /// The configured backend was not compiled into this binary
    #[error("Speech backend '{0}' is not available in this build")]
    BackendUnavailable(String),
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Output(err.to_string())
    }
}

/// Speech recognition capability shared by all requests.
///
/// Implementations are called concurrently without any lock in front of them.
#[async_trait]
pub trait SpeechModel: Send + Sync {
    /// Name of the loaded model variant, reported by the health endpoint
    fn model_name(&self) -> String;

    /// Transcribe the audio file at `audio`
    async fn transcribe(
        &self,
        audio: &Path,
        options: TranscribeOptions,
    ) -> Result<TranscriptionResult, ModelError>;

    /// Probability of each language the model knows for the audio at `audio`
    async fn detect_language(&self, audio: &Path) -> Result<HashMap<String, f32>, ModelError>;
}

/// Load the backend selected by `config.backend`.
///
/// Called once at startup; the returned model is shared by every worker.
pub fn load(config: WhisperConfig) -> Result<Arc<dyn SpeechModel>, ModelError> {
    match config.backend {
        EngineBackend::Cli => Ok(Arc::new(WhisperCppModel::load(config)?)),
        #[cfg(feature = "native")]
        EngineBackend::Native => Ok(Arc::new(WhisperRsModel::load(config)?)),
        #[cfg(not(feature = "native"))]
        EngineBackend::Native => Err(ModelError::BackendUnavailable(
            EngineBackend::Native.to_string(),
        )),
    }
}
