// Transcription Gateway Library
//
// This crate provides an HTTP gateway in front of a Whisper speech model. It
// stages uploaded audio, forwards it to the model and shapes the results into
// JSON responses.

pub mod config;
pub mod config_loader;
pub mod config_validator;
pub mod error;
pub mod handlers;
pub mod languages;
pub mod model;
pub mod models;
pub mod staging;

// Re-export common types for easier access
pub use config::{EngineBackend, HandlerConfig, ModelSize, ServerConfig, WhisperConfig};
pub use error::GatewayError;
pub use handlers::{configure, detect_language, health, transcribe, transcribe_stream};
#[cfg(feature = "native")]
pub use model::WhisperRsModel;
pub use model::{ModelError, SpeechModel, WhisperCppModel};
pub use models::{
    ErrorResponse, HealthResponse, LanguageDetectionResponse, StreamTranscriptionResponse,
    TranscriptionResponse,
};
pub use staging::StagedAudio;
