// API route handlers for the Transcription Gateway
//
// This module contains the HTTP endpoints. Each upload route stages the audio,
// calls the shared speech model once and shapes the result into its response
// type. The staged audio is dropped, and therefore deleted, before any response
// is built.

use std::path::Path;

use actix_multipart::Multipart;
use actix_web::{get, post, web, HttpResponse};
use log::{error, info};

use crate::config::HandlerConfig;
use crate::error::GatewayError;
use crate::handlers::form::{extract_upload, UploadedAudio};
use crate::languages;
use crate::model::{
    Decoding, LanguageDetection, SpeechModel, TranscribeOptions, TranscriptionResult,
};
use crate::models::{
    HealthResponse, LanguageDetectionResponse, StreamTranscriptionResponse,
    TranscriptionResponse,
};
use crate::staging::StagedAudio;

/// Form field carrying the audio file
pub const AUDIO_FIELD: &str = "audio";
/// Form field carrying the audio chunk on the streaming route
pub const AUDIO_CHUNK_FIELD: &str = "audio_chunk";

/// Health check endpoint
#[get("/health")]
pub async fn health(model: web::Data<dyn SpeechModel>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        model: model.model_name(),
        supported_languages: languages::supported_codes(),
    })
}

/// Transcribe an audio file with full decoding quality
///
/// The requested language is only forwarded when it is a supported one; any
/// other code lets the model detect the language. Hindi/English code-mixing is
/// left to the model.
#[post("/transcribe")]
pub async fn transcribe(
    form: Multipart,
    model: web::Data<dyn SpeechModel>,
    config: web::Data<HandlerConfig>,
) -> Result<HttpResponse, GatewayError> {
    let upload = extract_upload(form, AUDIO_FIELD, &config).await?;
    let audio = match upload.audio {
        None => return Err(GatewayError::NoAudioFile),
        Some(audio) if audio.filename.is_empty() => return Err(GatewayError::NoSelectedFile),
        Some(audio) => non_empty(audio)?,
    };
    let language = upload
        .language
        .unwrap_or_else(|| config.default_language.clone());

    info!(
        "Transcribing audio in language: {} ({})",
        language,
        languages::display_name(&language).unwrap_or("auto-detect")
    );
    let options = TranscribeOptions {
        language: languages::resolve_requested(&language),
        decoding: Decoding::Full,
    };
    let result = run_transcription(model.get_ref(), &config.temp_dir, &audio.data, options)
        .await
        .inspect_err(|e| error!("Transcription error: {}", e))?;

    info!(
        "Transcription completed: {} characters",
        result.text.chars().count()
    );
    Ok(HttpResponse::Ok().json(TranscriptionResponse::new(result, &language)))
}

/// Transcribe an audio chunk with fast, single-hypothesis decoding
///
/// Used for live feedback while a consultation is being recorded. Only flat text
/// is returned.
#[post("/transcribe-stream")]
pub async fn transcribe_stream(
    form: Multipart,
    model: web::Data<dyn SpeechModel>,
    config: web::Data<HandlerConfig>,
) -> Result<HttpResponse, GatewayError> {
    let upload = extract_upload(form, AUDIO_CHUNK_FIELD, &config).await?;
    let audio = upload
        .audio
        .filter(|audio| !audio.filename.is_empty())
        .ok_or(GatewayError::NoAudioChunk)
        .and_then(non_empty)?;
    let language = upload
        .language
        .unwrap_or_else(|| config.default_language.clone());

    // The language is forwarded as-is on this route
    let options = TranscribeOptions {
        language: Some(language.clone()),
        decoding: Decoding::Fast,
    };
    let result = run_transcription(model.get_ref(), &config.temp_dir, &audio.data, options)
        .await
        .inspect_err(|e| error!("Stream transcription error: {}", e))?;

    Ok(HttpResponse::Ok().json(StreamTranscriptionResponse::new(result, &language)))
}

/// Detect the spoken language of an audio file
#[post("/detect-language")]
pub async fn detect_language(
    form: Multipart,
    model: web::Data<dyn SpeechModel>,
    config: web::Data<HandlerConfig>,
) -> Result<HttpResponse, GatewayError> {
    let upload = extract_upload(form, AUDIO_FIELD, &config).await?;
    let audio = upload
        .audio
        .filter(|audio| !audio.filename.is_empty())
        .ok_or(GatewayError::NoAudioFile)
        .and_then(non_empty)?;

    let detection = run_detection(model.get_ref(), &config.temp_dir, &audio.data)
        .await
        .inspect_err(|e| error!("Language detection error: {}", e))?;

    info!(
        "Detected language {} (confidence {:.3})",
        detection.language, detection.confidence
    );
    Ok(HttpResponse::Ok().json(LanguageDetectionResponse::from(detection)))
}

fn non_empty(audio: UploadedAudio) -> Result<UploadedAudio, GatewayError> {
    if audio.data.is_empty() {
        Err(GatewayError::EmptyAudio)
    } else {
        Ok(audio)
    }
}

async fn run_transcription(
    model: &dyn SpeechModel,
    temp_dir: &Path,
    data: &[u8],
    options: TranscribeOptions,
) -> Result<TranscriptionResult, GatewayError> {
    let staged = StagedAudio::create(temp_dir, data)?;
    let result = model.transcribe(staged.path(), options).await?;
    Ok(result)
}

async fn run_detection(
    model: &dyn SpeechModel,
    temp_dir: &Path,
    data: &[u8],
) -> Result<LanguageDetection, GatewayError> {
    let staged = StagedAudio::create(temp_dir, data)?;
    let distribution = model.detect_language(staged.path()).await?;
    Ok(LanguageDetection::from_distribution(&distribution)?)
}
