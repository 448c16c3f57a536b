// Transcription Gateway configuration
//
// This module contains configuration structures and constants for the gateway.
// Every structure reads its values from environment variables and falls back to
// the defaults below.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use log::warn;

/// Default values for configuration
pub mod defaults {
    // Listening address
    pub const HOST: &str = "0.0.0.0";

    // Listening port
    pub const PORT: u16 = 8000;

    // Client disconnect timeout in seconds
    pub const TIMEOUT: u64 = 480;

    // Keep-alive in seconds
    pub const KEEPALIVE: u64 = 480;

    // Number of HTTP workers (0 = one per CPU core)
    pub const WORKERS: usize = 0;

    // Name of the staging folder under the OS temp directory
    pub const TEMP_DIR_NAME: &str = "transcription_gateway";

    // Max upload size (512MB)
    pub const MAX_FILE_SIZE: usize = 536870912;

    // Language requested when the form carries none
    pub const LANGUAGE: &str = "hi";

    // whisper.cpp command line binary
    pub const WHISPER_CMD: &str = "whisper-cli";

    // Directory holding ggml model weights
    pub const WHISPER_MODELS_DIR: &str = "./models";

    // Inference backend, in-process when whisper-rs is compiled in
    #[cfg(feature = "native")]
    pub const WHISPER_BACKEND: &str = "native";
    #[cfg(not(feature = "native"))]
    pub const WHISPER_BACKEND: &str = "cli";
}

/// Environment variable names
pub mod env_vars {
    pub const HOST: &str = "GATEWAY_HOST";
    pub const PORT: &str = "PORT";
    pub const TIMEOUT: &str = "GATEWAY_TIMEOUT";
    pub const KEEPALIVE: &str = "GATEWAY_KEEPALIVE";
    pub const WORKERS: &str = "HTTP_WORKER_NUMBER";
    pub const TEMP_DIR: &str = "GATEWAY_TMP_DIR";
    pub const MAX_FILE_SIZE: &str = "MAX_FILE_SIZE";
    pub const MODEL_SIZE: &str = "WHISPER_MODEL_SIZE";
    pub const WHISPER_CMD: &str = "WHISPER_CMD";
    pub const WHISPER_MODELS_DIR: &str = "WHISPER_MODELS_DIR";
    pub const WHISPER_THREADS: &str = "WHISPER_THREADS";
    pub const WHISPER_BACKEND: &str = "WHISPER_BACKEND";
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// Capability/accuracy tier of the Whisper model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelSize {
    Tiny,
    #[default]
    Base,
    Small,
    Medium,
    Large,
}

impl ModelSize {
    pub const ALL: [&'static str; 5] = ["tiny", "base", "small", "medium", "large"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        }
    }

    /// File name of the ggml weights for this tier
    pub fn ggml_file_name(&self) -> String {
        match self {
            ModelSize::Large => "ggml-large-v3.bin".to_string(),
            other => format!("ggml-{}.bin", other.as_str()),
        }
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tiny" => Ok(ModelSize::Tiny),
            "base" => Ok(ModelSize::Base),
            "small" => Ok(ModelSize::Small),
            "medium" => Ok(ModelSize::Medium),
            "large" => Ok(ModelSize::Large),
            other => Err(format!(
                "unknown model size '{}', expected one of: {}",
                other,
                Self::ALL.join(", ")
            )),
        }
    }
}

/// How the Whisper model is run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineBackend {
    /// One `whisper-cli` process per request
    Cli,
    /// whisper.cpp linked in through whisper-rs
    Native,
}

impl EngineBackend {
    pub const ALL: [&'static str; 2] = ["cli", "native"];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineBackend::Cli => "cli",
            EngineBackend::Native => "native",
        }
    }
}

impl Default for EngineBackend {
    fn default() -> Self {
        if cfg!(feature = "native") {
            EngineBackend::Native
        } else {
            EngineBackend::Cli
        }
    }
}

impl fmt::Display for EngineBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cli" => Ok(EngineBackend::Cli),
            "native" => Ok(EngineBackend::Native),
            other => Err(format!(
                "unknown engine backend '{}', expected one of: {}",
                other,
                Self::ALL.join(", ")
            )),
        }
    }
}

/// HTTP server settings
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Client disconnect timeout in seconds
    pub timeout: u64,
    /// Keep-alive in seconds
    pub keepalive: u64,
    /// Number of workers, 0 lets actix pick one per core
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: env::var(env_vars::HOST).unwrap_or_else(|_| String::from(defaults::HOST)),
            port: env_parse(env_vars::PORT).unwrap_or(defaults::PORT),
            timeout: env_parse(env_vars::TIMEOUT).unwrap_or(defaults::TIMEOUT),
            keepalive: env_parse(env_vars::KEEPALIVE).unwrap_or(defaults::KEEPALIVE),
            workers: env_parse(env_vars::WORKERS).unwrap_or(defaults::WORKERS),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration for the request handlers
#[derive(Clone, Debug)]
pub struct HandlerConfig {
    /// Root directory for staged audio
    pub temp_dir: PathBuf,
    /// Upload size limit in bytes
    pub max_file_size: usize,
    /// Language used when the request carries none
    pub default_language: String,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            temp_dir: env::var(env_vars::TEMP_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir().join(defaults::TEMP_DIR_NAME)),
            max_file_size: env_parse(env_vars::MAX_FILE_SIZE).unwrap_or(defaults::MAX_FILE_SIZE),
            default_language: String::from(defaults::LANGUAGE),
        }
    }
}

impl HandlerConfig {
    /// Ensures the staging directory exists
    pub fn ensure_temp_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.temp_dir)
    }
}

/// Configuration for the whisper.cpp engine
#[derive(Clone, Debug)]
pub struct WhisperConfig {
    pub backend: EngineBackend,
    /// Path to the whisper.cpp command line binary
    pub command_path: String,
    /// Directory containing ggml weights
    pub models_dir: PathBuf,
    pub model_size: ModelSize,
    /// Threads handed to the engine
    pub threads: usize,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        let model_size = match env::var(env_vars::MODEL_SIZE) {
            Ok(value) => value.parse().unwrap_or_else(|e| {
                warn!("{}. Using default: {}", e, ModelSize::default());
                ModelSize::default()
            }),
            Err(_) => ModelSize::default(),
        };
        let backend = match env::var(env_vars::WHISPER_BACKEND) {
            Ok(value) => value.parse().unwrap_or_else(|e| {
                warn!("{}. Using default: {}", e, EngineBackend::default());
                EngineBackend::default()
            }),
            Err(_) => EngineBackend::default(),
        };

        Self {
            backend,
            command_path: env::var(env_vars::WHISPER_CMD)
                .unwrap_or_else(|_| String::from(defaults::WHISPER_CMD)),
            models_dir: env::var(env_vars::WHISPER_MODELS_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(defaults::WHISPER_MODELS_DIR)),
            model_size,
            threads: env_parse(env_vars::WHISPER_THREADS)
                .filter(|n: &usize| *n > 0)
                .unwrap_or_else(num_cpus::get),
        }
    }
}

impl WhisperConfig {
    /// Full path of the ggml weights for the configured model size
    pub fn model_path(&self) -> PathBuf {
        self.models_dir.join(self.model_size.ggml_file_name())
    }
}
