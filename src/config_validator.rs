// Configuration validation module for the Transcription Gateway
//
// This module validates configuration parameters and environment variables at
// startup, so that a bad deployment fails before the listener accepts traffic.
//
// The validation system is schema-driven: `CONFIG_PARAMS` is the single registry
// of parameter names, types, defaults and constraints.

use std::env;
use std::net::IpAddr;
use std::path::Path;
use std::str::FromStr;

use log::{error, info, warn};
use thiserror::Error;

use crate::config::{defaults, env_vars, EngineBackend, ModelSize};

/// Configuration parameter types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigType {
    String,
    UnsignedInteger,
    IpAddress,
    Port,
    DirectoryPath,
    Enum(&'static [&'static str]),
}

/// Validation severity levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValidationLevel {
    Critical, // Must be valid for the gateway to start
    Standard, // Important but the gateway can start with defaults
    Warning,  // Optional, generates warnings only
}

/// Configuration parameter definition
#[derive(Debug, Clone)]
pub struct ConfigParam {
    pub name: &'static str,
    pub description: &'static str,
    pub param_type: ConfigType,
    pub default_value: Option<&'static str>,
    pub validation_level: ValidationLevel,
    pub min_value: Option<u64>,
    pub max_value: Option<u64>,
}

/// Centralized configuration parameter registry
pub const CONFIG_PARAMS: &[ConfigParam] = &[
    // Server Configuration
    ConfigParam {
        name: env_vars::HOST,
        description: "Host IP address the gateway binds to",
        param_type: ConfigType::IpAddress,
        default_value: Some(defaults::HOST),
        validation_level: ValidationLevel::Critical,
        min_value: None,
        max_value: None,
    },
    ConfigParam {
        name: env_vars::PORT,
        description: "Port the gateway listens on",
        param_type: ConfigType::Port,
        default_value: Some("8000"),
        validation_level: ValidationLevel::Critical,
        min_value: None,
        max_value: None,
    },
    ConfigParam {
        name: env_vars::TIMEOUT,
        description: "Client disconnect timeout in seconds",
        param_type: ConfigType::UnsignedInteger,
        default_value: Some("480"),
        validation_level: ValidationLevel::Standard,
        min_value: Some(1),
        max_value: Some(3600),
    },
    ConfigParam {
        name: env_vars::KEEPALIVE,
        description: "Keep-alive timeout in seconds",
        param_type: ConfigType::UnsignedInteger,
        default_value: Some("480"),
        validation_level: ValidationLevel::Standard,
        min_value: Some(1),
        max_value: Some(3600),
    },
    ConfigParam {
        name: env_vars::WORKERS,
        description: "Number of HTTP workers (0 = use CPU cores)",
        param_type: ConfigType::UnsignedInteger,
        default_value: Some("0"),
        validation_level: ValidationLevel::Standard,
        min_value: Some(0),
        max_value: Some(64),
    },
    // Upload Configuration
    ConfigParam {
        name: env_vars::TEMP_DIR,
        description: "Directory for staged audio files",
        param_type: ConfigType::String, // created on startup when missing
        default_value: None,
        validation_level: ValidationLevel::Standard,
        min_value: None,
        max_value: None,
    },
    ConfigParam {
        name: env_vars::MAX_FILE_SIZE,
        description: "Maximum upload size in bytes",
        param_type: ConfigType::UnsignedInteger,
        default_value: Some("536870912"),
        validation_level: ValidationLevel::Standard,
        min_value: Some(1024),
        max_value: Some(10737418240),
    },
    // Model Configuration
    ConfigParam {
        name: env_vars::WHISPER_BACKEND,
        description: "Speech backend (native requires the `native` build feature)",
        param_type: ConfigType::Enum(&EngineBackend::ALL),
        default_value: Some(defaults::WHISPER_BACKEND),
        validation_level: ValidationLevel::Critical,
        min_value: None,
        max_value: None,
    },
    ConfigParam {
        name: env_vars::MODEL_SIZE,
        description: "Whisper model size",
        param_type: ConfigType::Enum(&ModelSize::ALL),
        default_value: Some("base"),
        validation_level: ValidationLevel::Warning,
        min_value: None,
        max_value: None,
    },
    ConfigParam {
        name: env_vars::WHISPER_CMD,
        description: "Path or name of the whisper.cpp command line binary",
        param_type: ConfigType::String,
        default_value: Some(defaults::WHISPER_CMD),
        validation_level: ValidationLevel::Critical,
        min_value: None,
        max_value: None,
    },
    ConfigParam {
        name: env_vars::WHISPER_MODELS_DIR,
        description: "Directory containing ggml model weights",
        param_type: ConfigType::DirectoryPath,
        default_value: Some(defaults::WHISPER_MODELS_DIR),
        validation_level: ValidationLevel::Critical,
        min_value: None,
        max_value: None,
    },
    ConfigParam {
        name: env_vars::WHISPER_THREADS,
        description: "Threads used by the engine (defaults to CPU cores)",
        param_type: ConfigType::UnsignedInteger,
        default_value: None,
        validation_level: ValidationLevel::Standard,
        min_value: Some(1),
        max_value: Some(256),
    },
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigErrorType {
    InvalidValue,
    InvalidFormat,
    InvalidRange,
    DirectoryNotFound,
}

/// Configuration validation errors with detailed context
#[derive(Error, Debug, Clone)]
#[error("Configuration error in '{field}' ({error_type:?}): {message} (value: '{value}'){}", suggestion_suffix(.suggestion))]
pub struct ConfigValidationError {
    pub field: String,
    pub value: String,
    pub error_type: ConfigErrorType,
    pub message: String,
    pub suggestion: Option<String>,
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" - Suggestion: {}", s))
        .unwrap_or_default()
}

impl ConfigValidationError {
    fn new(
        field: &str,
        value: &str,
        error_type: ConfigErrorType,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
            error_type,
            message: message.into(),
            suggestion: Some(suggestion.into()),
        }
    }
}

/// Result type for configuration validation
pub type ValidationResult<T> = Result<T, ConfigValidationError>;

/// Configuration validation results
#[derive(Debug, Default)]
pub struct ValidationResults {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResults {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ConfigValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ConfigValidationError) {
        self.warnings.push(warning);
    }

    pub fn print_summary(&self) {
        if !self.errors.is_empty() {
            error!(
                "Configuration validation found {} error(s):",
                self.errors.len()
            );
            for (i, err) in self.errors.iter().enumerate() {
                error!("  {}. {}", i + 1, err);
            }
        }

        if !self.warnings.is_empty() {
            warn!(
                "Configuration validation found {} warning(s):",
                self.warnings.len()
            );
            for (i, warn) in self.warnings.iter().enumerate() {
                warn!("  {}. {}", i + 1, warn);
            }
        }

        if self.is_valid() && self.warnings.is_empty() {
            info!("Configuration validation passed successfully");
        } else if self.is_valid() {
            info!(
                "Configuration validation passed with {} warning(s)",
                self.warnings.len()
            );
        }
    }
}

/// Helper functions for common validation patterns
pub mod validators {
    use super::*;

    /// Validate unsigned integer values with optional range
    pub fn validate_unsigned(
        field: &str,
        value: &str,
        min: Option<u64>,
        max: Option<u64>,
    ) -> ValidationResult<u64> {
        let parsed = value.parse::<u64>().map_err(|_| {
            ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                "Invalid unsigned integer format",
                "Use a valid positive integer number",
            )
        })?;

        if let Some(min) = min {
            if parsed < min {
                return Err(ConfigValidationError::new(
                    field,
                    value,
                    ConfigErrorType::InvalidRange,
                    format!("Value {} is below minimum {}", parsed, min),
                    format!("Use a value >= {}", min),
                ));
            }
        }

        if let Some(max) = max {
            if parsed > max {
                return Err(ConfigValidationError::new(
                    field,
                    value,
                    ConfigErrorType::InvalidRange,
                    format!("Value {} is above maximum {}", parsed, max),
                    format!("Use a value <= {}", max),
                ));
            }
        }

        Ok(parsed)
    }

    /// Validate enumerated values (case-insensitive)
    pub fn validate_enum(
        field: &str,
        value: &str,
        valid_values: &[&str],
    ) -> ValidationResult<String> {
        let lowered = value.trim().to_lowercase();
        if valid_values.iter().any(|v| v.to_lowercase() == lowered) {
            Ok(lowered)
        } else {
            Err(ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::InvalidValue,
                format!("Invalid value, must be one of: {}", valid_values.join(", ")),
                format!("Use one of: {}", valid_values.join(", ")),
            ))
        }
    }

    /// Validate IP address
    pub fn validate_ip_address(field: &str, value: &str) -> ValidationResult<IpAddr> {
        IpAddr::from_str(value).map_err(|_| {
            ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                "Invalid IP address format",
                "Use a valid IPv4 or IPv6 address (e.g., 0.0.0.0 or ::1)",
            )
        })
    }

    /// Validate port number
    pub fn validate_port(field: &str, value: &str) -> ValidationResult<u16> {
        let port = value.parse::<u16>().map_err(|_| {
            ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                "Invalid port number format",
                "Use a number between 1 and 65535",
            )
        })?;

        if port == 0 {
            return Err(ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::InvalidRange,
                "Port number cannot be 0",
                "Use a port between 1 and 65535",
            ));
        }

        Ok(port)
    }

    /// Validate that a directory exists
    pub fn validate_directory_exists(field: &str, value: &str) -> ValidationResult<()> {
        let path = Path::new(value);
        if !path.is_dir() {
            return Err(ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::DirectoryNotFound,
                "Directory does not exist",
                "Ensure the directory exists and the path is correct",
            ));
        }
        Ok(())
    }
}

/// Validate a single value against its parameter definition
pub fn validate_value(param: &ConfigParam, value: &str) -> ValidationResult<()> {
    match param.param_type {
        ConfigType::String => Ok(()),
        ConfigType::UnsignedInteger => {
            validators::validate_unsigned(param.name, value, param.min_value, param.max_value)
                .map(|_| ())
        }
        ConfigType::IpAddress => validators::validate_ip_address(param.name, value).map(|_| ()),
        ConfigType::Port => validators::validate_port(param.name, value).map(|_| ()),
        ConfigType::DirectoryPath => validators::validate_directory_exists(param.name, value),
        ConfigType::Enum(valid_values) => {
            validators::validate_enum(param.name, value, valid_values).map(|_| ())
        }
    }
}

/// Configuration validator for the gateway
pub struct GatewayConfigValidator;

impl GatewayConfigValidator {
    /// Validate every registered parameter against the process environment
    pub fn validate_env() -> ValidationResults {
        info!("Starting configuration validation...");
        let results = Self::validate_with(|name| env::var(name).ok());
        results.print_summary();
        results
    }

    /// Validate every registered parameter using the given lookup
    pub fn validate_with<F>(lookup: F) -> ValidationResults
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut results = ValidationResults::default();

        for param in CONFIG_PARAMS {
            let value = lookup(param.name)
                .or_else(|| param.default_value.map(String::from))
                .unwrap_or_default();

            // Unset parameters without a default resolve at runtime
            if value.trim().is_empty() {
                continue;
            }

            if let Err(error) = validate_value(param, value.trim()) {
                match param.validation_level {
                    ValidationLevel::Critical | ValidationLevel::Standard => {
                        results.add_error(error)
                    }
                    ValidationLevel::Warning => results.add_warning(error),
                }
            }
        }

        results
    }

    /// Generate a sample configuration file with all parameters and descriptions
    pub fn generate_sample_config() -> String {
        let mut output = String::new();
        output.push_str("# Transcription Gateway configuration file\n");
        output.push_str("# Values set in the environment take precedence over this file\n\n");

        for param in CONFIG_PARAMS {
            output.push_str(&format!("# {}\n", param.description));
            match param.default_value {
                Some(default) => output.push_str(&format!("{} = \"{}\"\n\n", param.name, default)),
                None => output.push_str(&format!("# {} = \"\"\n\n", param.name)),
            }
        }
        output
    }
}
