// whisper.cpp command line backend
//
// Drives the `whisper-cli` binary from whisper.cpp. Transcriptions are read back
// from the JSON file the engine writes next to the staged audio; language
// detection is read from the engine's log output, which only names the winning
// language. The `native` backend reports the full distribution.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::process::Command;

use crate::config::WhisperConfig;
use crate::model::{
    Decoding, ModelError, Segment, SpeechModel, TranscribeOptions, TranscriptionResult,
};

/// Beam size and best-of used for full quality decoding
const FULL_SEARCH_WIDTH: u32 = 5;
/// Beam size and best-of used for fast decoding
const FAST_SEARCH_WIDTH: u32 = 1;

const AUTO_LANGUAGE: &str = "auto";
const DETECTION_MARKER: &str = "auto-detected language:";

/// JSON document written by `whisper-cli -oj`
#[derive(Debug, Deserialize)]
struct CliOutput {
    #[serde(default)]
    result: Option<CliResult>,
    #[serde(default)]
    transcription: Vec<CliSegment>,
}

#[derive(Debug, Deserialize)]
struct CliResult {
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CliSegment {
    offsets: CliOffsets,
    text: String,
}

/// Segment bounds in milliseconds
#[derive(Debug, Deserialize)]
struct CliOffsets {
    from: u64,
    to: u64,
}

/// Speech model backed by the whisper.cpp command line tool
#[derive(Debug, Clone)]
pub struct WhisperCppModel {
    config: WhisperConfig,
    model_path: PathBuf,
}

impl WhisperCppModel {
    /// Resolve and check the configured model weights.
    ///
    /// Called once at startup so a missing model stops the process before the
    /// listener accepts requests.
    pub fn load(config: WhisperConfig) -> Result<Self, ModelError> {
        let model_path = config.model_path();
        info!("Loading Whisper model: {}", config.model_size);

        if !model_path.is_file() {
            return Err(ModelError::ModelNotFound(model_path.display().to_string()));
        }

        info!(
            "Whisper model loaded successfully from {} (engine: {}, threads: {})",
            model_path.display(),
            config.command_path,
            config.threads
        );
        Ok(Self { config, model_path })
    }

    fn transcribe_args(&self, audio: &Path, options: &TranscribeOptions) -> Vec<OsString> {
        let width = match options.decoding {
            Decoding::Full => FULL_SEARCH_WIDTH,
            Decoding::Fast => FAST_SEARCH_WIDTH,
        }
        .to_string();
        let language = options
            .language
            .as_deref()
            .filter(|code| !code.is_empty())
            .unwrap_or(AUTO_LANGUAGE);

        let mut args = self.common_args(audio, language);
        args.extend(
            ["-bs", width.as_str(), "-bo", width.as_str(), "-oj", "-np", "-of"]
                .map(OsString::from),
        );
        args.push(output_stem(audio).into_os_string());
        args
    }

    fn detect_args(&self, audio: &Path) -> Vec<OsString> {
        let mut args = self.common_args(audio, AUTO_LANGUAGE);
        args.push("-dl".into());
        args
    }

    fn common_args(&self, audio: &Path, language: &str) -> Vec<OsString> {
        vec![
            "-m".into(),
            self.model_path.clone().into_os_string(),
            "-f".into(),
            audio.as_os_str().to_owned(),
            "-l".into(),
            language.into(),
            "-t".into(),
            self.config.threads.to_string().into(),
        ]
    }

    async fn run(&self, args: Vec<OsString>) -> Result<Output, ModelError> {
        debug!("Running {} {:?}", self.config.command_path, args);
        let output = Command::new(&self.config.command_path)
            .args(&args)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ModelError::Engine(if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            }));
        }
        Ok(output)
    }
}

#[async_trait]
impl SpeechModel for WhisperCppModel {
    fn model_name(&self) -> String {
        self.config.model_size.to_string()
    }

    async fn transcribe(
        &self,
        audio: &Path,
        options: TranscribeOptions,
    ) -> Result<TranscriptionResult, ModelError> {
        self.run(self.transcribe_args(audio, &options)).await?;

        let json_path = audio.with_extension("json");
        let content = fs::read_to_string(&json_path).map_err(|e| {
            ModelError::Output(format!("failed to read {}: {}", json_path.display(), e))
        })?;
        if let Err(e) = fs::remove_file(&json_path) {
            warn!("Failed to remove engine output {}: {}", json_path.display(), e);
        }

        parse_transcription(&content)
    }

    async fn detect_language(&self, audio: &Path) -> Result<HashMap<String, f32>, ModelError> {
        let output = self.run(self.detect_args(audio)).await?;

        // whisper.cpp logs to stderr, older builds print to stdout
        let logs = [output.stderr.as_slice(), output.stdout.as_slice()]
            .map(|bytes| String::from_utf8_lossy(bytes))
            .join("\n");
        let (language, probability) = parse_detection(&logs).ok_or_else(|| {
            ModelError::Output("no detected language in engine output".to_string())
        })?;

        Ok(HashMap::from([(language, probability)]))
    }
}

/// `-of` takes the output path without extension
fn output_stem(audio: &Path) -> PathBuf {
    audio.with_extension("")
}

fn parse_transcription(content: &str) -> Result<TranscriptionResult, ModelError> {
    let output: CliOutput = serde_json::from_str(content)?;

    let segments: Vec<Segment> = output
        .transcription
        .into_iter()
        .map(|s| Segment {
            start: s.offsets.from as f64 / 1000.0,
            end: s.offsets.to.max(s.offsets.from) as f64 / 1000.0,
            text: s.text,
        })
        .collect();
    let text = segments.iter().map(|s| s.text.as_str()).collect::<String>();

    Ok(TranscriptionResult {
        text,
        segments,
        language: output
            .result
            .and_then(|r| r.language)
            .filter(|l| !l.is_empty()),
    })
}

/// Extract `(code, probability)` from a line such as
/// `whisper_full_with_state: auto-detected language: hi (p = 0.912345)`
fn parse_detection(logs: &str) -> Option<(String, f32)> {
    logs.lines().find_map(|line| {
        let (_, rest) = line.split_once(DETECTION_MARKER)?;
        let mut parts = rest.trim().splitn(2, char::is_whitespace);
        let code = parts.next()?.trim();
        let probability = parts
            .next()?
            .trim()
            .strip_prefix("(p =")?
            .trim()
            .trim_end_matches(')')
            .trim()
            .parse::<f32>()
            .ok()?;
        if code.is_empty() {
            return None;
        }
        Some((code.to_string(), probability))
    })
}
