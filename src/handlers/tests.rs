// Route tests for the gateway
//
// These tests drive the real handlers through actix's test harness with a stub
// speech model, and check the JSON shapes and the staged-file lifecycle.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use async_trait::async_trait;
use serde_json::Value;

use super::configure;
use crate::config::HandlerConfig;
use crate::model::{
    Decoding, ModelError, Segment, SpeechModel, TranscribeOptions, TranscriptionResult,
};

const BOUNDARY: &str = "----gateway-test-boundary";

/// Records every call and answers with canned results
#[derive(Default)]
struct StubModel {
    fail: bool,
    calls: Mutex<Vec<TranscribeOptions>>,
    /// Whether the staged file existed while the model was reading it
    staged_seen: Mutex<Vec<bool>>,
}

impl StubModel {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn record_path(&self, audio: &Path) {
        self.staged_seen.lock().unwrap().push(audio.is_file());
    }

    fn last_call(&self) -> TranscribeOptions {
        self.calls.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl SpeechModel for StubModel {
    fn model_name(&self) -> String {
        "base".to_string()
    }

    async fn transcribe(
        &self,
        audio: &Path,
        options: TranscribeOptions,
    ) -> Result<TranscriptionResult, ModelError> {
        self.record_path(audio);
        self.calls.lock().unwrap().push(options.clone());
        if self.fail {
            return Err(ModelError::Engine("model exploded".to_string()));
        }

        Ok(TranscriptionResult {
            text: " Namaste doctor, mujhe fever hai.".to_string(),
            segments: vec![
                Segment {
                    start: 0.0,
                    end: 1.5,
                    text: " Namaste doctor,".to_string(),
                },
                Segment {
                    start: 1.5,
                    end: 3.0,
                    text: " mujhe fever hai.".to_string(),
                },
            ],
            language: Some(options.language.unwrap_or_else(|| "en".to_string())),
        })
    }

    async fn detect_language(&self, audio: &Path) -> Result<HashMap<String, f32>, ModelError> {
        self.record_path(audio);
        if self.fail {
            return Err(ModelError::Output("garbled".to_string()));
        }
        Ok(HashMap::from([
            ("hi".to_string(), 0.70),
            ("en".to_string(), 0.25),
            ("ta".to_string(), 0.045),
            ("mr".to_string(), 0.005),
        ]))
    }
}

enum Part<'a> {
    File {
        name: &'a str,
        filename: &'a str,
        data: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File {
                name,
                filename,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: audio/wav\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}",
                        name, value
                    )
                    .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload(uri: &str, parts: &[Part]) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(multipart_body(parts))
}

fn handler_config(temp_dir: &Path, max_file_size: usize) -> HandlerConfig {
    HandlerConfig {
        temp_dir: temp_dir.to_path_buf(),
        max_file_size,
        default_language: "hi".to_string(),
    }
}

fn staged_entries(temp_dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(temp_dir)
        .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default()
}

macro_rules! init_app {
    ($model:expr, $temp_dir:expr) => {
        init_app!($model, $temp_dir, 1 << 20)
    };
    ($model:expr, $temp_dir:expr, $max_file_size:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::from($model.clone() as Arc<dyn SpeechModel>))
                .app_data(web::Data::new(handler_config($temp_dir, $max_file_size)))
                .configure(configure),
        )
        .await
    };
}

// A short RIFF header is enough for the stub model
const WAV: &[u8] = b"RIFF\x24\x00\x00\x00WAVEfmt ";

#[actix_web::test]
async fn test_health_lists_supported_languages() {
    let temp = tempfile::tempdir().unwrap();
    let model = Arc::new(StubModel::default());
    let app = init_app!(model, temp.path());

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model"], "base");
    assert_eq!(
        body["supported_languages"],
        serde_json::json!(["en", "hi", "ta", "te", "bn", "mr", "gu", "kn", "ml"])
    );
}

#[actix_web::test]
async fn test_transcribe_without_audio_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let model = Arc::new(StubModel::default());
    let app = init_app!(model, temp.path());

    let req = upload(
        "/transcribe",
        &[Part::Text {
            name: "language",
            value: "hi",
        }],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "No audio file provided");
    assert!(model.calls.lock().unwrap().is_empty());
}

#[actix_web::test]
async fn test_transcribe_without_multipart_body_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let model = Arc::new(StubModel::default());
    let app = init_app!(model, temp.path());

    let req = test::TestRequest::post().uri("/transcribe").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_transcribe_with_empty_filename_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let model = Arc::new(StubModel::default());
    let app = init_app!(model, temp.path());

    let req = upload(
        "/transcribe",
        &[Part::File {
            name: "audio",
            filename: "",
            data: WAV,
        }],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "No selected file");
}

#[actix_web::test]
async fn test_transcribe_with_empty_payload_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let model = Arc::new(StubModel::default());
    let app = init_app!(model, temp.path());

    let req = upload(
        "/transcribe",
        &[Part::File {
            name: "audio",
            filename: "clip.wav",
            data: b"",
        }],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Empty audio file");
}

#[actix_web::test]
async fn test_transcribe_returns_ordered_segments_and_cleans_up() {
    let temp = tempfile::tempdir().unwrap();
    let model = Arc::new(StubModel::default());
    let app = init_app!(model, temp.path());

    let req = upload(
        "/transcribe",
        &[
            Part::File {
                name: "audio",
                filename: "clip.wav",
                data: WAV,
            },
            Part::Text {
                name: "language",
                value: "hi",
            },
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert!(body["transcription"].is_string());
    assert_eq!(body["language"], "hi");

    let segments = body["segments"].as_array().unwrap();
    assert_eq!(segments.len(), 2);
    let mut previous_start = f64::MIN;
    for segment in segments {
        let start = segment["start"].as_f64().unwrap();
        let end = segment["end"].as_f64().unwrap();
        assert!(start <= end);
        assert!(start >= previous_start);
        assert!(segment["text"].is_string());
        previous_start = start;
    }

    let call = model.last_call();
    assert_eq!(call.language.as_deref(), Some("hi"));
    assert_eq!(call.decoding, Decoding::Full);
    assert_eq!(*model.staged_seen.lock().unwrap(), vec![true]);
    assert!(staged_entries(temp.path()).is_empty());
}

#[actix_web::test]
async fn test_transcribe_defaults_to_hindi() {
    let temp = tempfile::tempdir().unwrap();
    let model = Arc::new(StubModel::default());
    let app = init_app!(model, temp.path());

    let req = upload(
        "/transcribe",
        &[Part::File {
            name: "audio",
            filename: "clip.wav",
            data: WAV,
        }],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(model.last_call().language.as_deref(), Some("hi"));
}

#[actix_web::test]
async fn test_unsupported_language_falls_back_to_auto_detection() {
    let temp = tempfile::tempdir().unwrap();
    let model = Arc::new(StubModel::default());
    let app = init_app!(model, temp.path());

    let req = upload(
        "/transcribe",
        &[
            Part::Text {
                name: "language",
                value: "pa",
            },
            Part::File {
                name: "audio",
                filename: "clip.wav",
                data: WAV,
            },
        ],
    )
    .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(model.last_call().language, None);
    // The resolved language comes back, not the requested one
    assert_eq!(body["language"], "en");
}

#[actix_web::test]
async fn test_blank_language_is_auto_detected() {
    let temp = tempfile::tempdir().unwrap();
    let model = Arc::new(StubModel::default());
    let app = init_app!(model, temp.path());

    let req = upload(
        "/transcribe",
        &[
            Part::Text {
                name: "language",
                value: "  ",
            },
            Part::File {
                name: "audio",
                filename: "clip.wav",
                data: WAV,
            },
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(model.last_call().language, None);
}

#[actix_web::test]
async fn test_model_failure_is_reported_and_staged_file_removed() {
    let temp = tempfile::tempdir().unwrap();
    let model = Arc::new(StubModel::failing());
    let app = init_app!(model, temp.path());

    let req = upload(
        "/transcribe",
        &[Part::File {
            name: "audio",
            filename: "clip.wav",
            data: WAV,
        }],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("model exploded"));
    assert_eq!(*model.staged_seen.lock().unwrap(), vec![true]);
    assert!(staged_entries(temp.path()).is_empty());
}

#[actix_web::test]
async fn test_repeated_requests_do_not_accumulate_files() {
    let temp = tempfile::tempdir().unwrap();
    let model = Arc::new(StubModel::default());
    let app = init_app!(model, temp.path());

    let mut transcriptions = Vec::new();
    for _ in 0..3 {
        let req = upload(
            "/transcribe",
            &[Part::File {
                name: "audio",
                filename: "clip.wav",
                data: WAV,
            }],
        )
        .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        transcriptions.push(body["transcription"].clone());
        assert!(staged_entries(temp.path()).is_empty());
    }

    assert!(transcriptions.windows(2).all(|w| w[0] == w[1]));
}

#[actix_web::test]
async fn test_oversized_upload_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let model = Arc::new(StubModel::default());
    let app = init_app!(model, temp.path(), 8);

    let req = upload(
        "/transcribe",
        &[Part::File {
            name: "audio",
            filename: "clip.wav",
            data: WAV,
        }],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(staged_entries(temp.path()).is_empty());
}

#[actix_web::test]
async fn test_truncated_part_after_audio_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let model = Arc::new(StubModel::default());
    let app = init_app!(model, temp.path());

    // A complete audio part followed by a part whose headers never end
    let mut body = multipart_body(&[Part::File {
        name: "audio",
        filename: "clip.wav",
        data: WAV,
    }]);
    let closing = format!("--{}--\r\n", BOUNDARY);
    body.truncate(body.len() - closing.len());
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"language\"\r\n",
            BOUNDARY
        )
        .as_bytes(),
    );

    let req = test::TestRequest::post()
        .uri("/transcribe")
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());
    assert!(body.get("success").is_none());
    assert!(model.calls.lock().unwrap().is_empty());
    assert!(staged_entries(temp.path()).is_empty());
}

#[actix_web::test]
async fn test_stream_returns_flat_text_with_fast_decoding() {
    let temp = tempfile::tempdir().unwrap();
    let model = Arc::new(StubModel::default());
    let app = init_app!(model, temp.path());

    let req = upload(
        "/transcribe-stream",
        &[
            Part::File {
                name: "audio_chunk",
                filename: "chunk.wav",
                data: WAV,
            },
            Part::Text {
                name: "language",
                value: "pa",
            },
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert!(body["text"].is_string());
    assert!(body.get("segments").is_none());
    assert_eq!(body["language"], "pa");

    let call = model.last_call();
    assert_eq!(call.decoding, Decoding::Fast);
    // Forwarded verbatim, unlike the full transcription route
    assert_eq!(call.language.as_deref(), Some("pa"));
    assert!(staged_entries(temp.path()).is_empty());
}

#[actix_web::test]
async fn test_stream_without_chunk_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let model = Arc::new(StubModel::default());
    let app = init_app!(model, temp.path());

    // An `audio` part does not count on the streaming route
    let req = upload(
        "/transcribe-stream",
        &[Part::File {
            name: "audio",
            filename: "clip.wav",
            data: WAV,
        }],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "No audio chunk provided");
}

#[actix_web::test]
async fn test_stream_failure_is_internal_error() {
    let temp = tempfile::tempdir().unwrap();
    let model = Arc::new(StubModel::failing());
    let app = init_app!(model, temp.path());

    let req = upload(
        "/transcribe-stream",
        &[Part::File {
            name: "audio_chunk",
            filename: "chunk.wav",
            data: WAV,
        }],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(staged_entries(temp.path()).is_empty());
}

#[actix_web::test]
async fn test_detect_language_reports_argmax_and_filtered_probabilities() {
    let temp = tempfile::tempdir().unwrap();
    let model = Arc::new(StubModel::default());
    let app = init_app!(model, temp.path());

    let req = upload(
        "/detect-language",
        &[Part::File {
            name: "audio",
            filename: "clip.wav",
            data: WAV,
        }],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["language"], "hi");

    let confidence = body["confidence"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&confidence));
    assert!((confidence - 0.70).abs() < 1e-6);

    let probabilities = body["all_probabilities"].as_object().unwrap();
    assert_eq!(probabilities.len(), 3);
    assert!(!probabilities.contains_key("mr"));
    assert!(probabilities.values().all(|p| p.as_f64().unwrap() > 0.01));

    assert_eq!(*model.staged_seen.lock().unwrap(), vec![true]);
    assert!(staged_entries(temp.path()).is_empty());
}

#[actix_web::test]
async fn test_detect_language_without_audio_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let model = Arc::new(StubModel::default());
    let app = init_app!(model, temp.path());

    let req = upload(
        "/detect-language",
        &[Part::File {
            name: "audio",
            filename: "",
            data: WAV,
        }],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "No audio file provided");
}

#[actix_web::test]
async fn test_detect_language_failure_is_internal_error() {
    let temp = tempfile::tempdir().unwrap();
    let model = Arc::new(StubModel::failing());
    let app = init_app!(model, temp.path());

    let req = upload(
        "/detect-language",
        &[Part::File {
            name: "audio",
            filename: "clip.wav",
            data: WAV,
        }],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(staged_entries(temp.path()).is_empty());
}
