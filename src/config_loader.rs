// Configuration loader for the Transcription Gateway
//
// This module handles loading configuration from an optional TOML file and
// merging it into the process environment with appropriate precedence.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use toml::Value;

const CONFIG_FILE_PATH: &str = "transcription_gateway.conf";
const CONFIG_FILE_ENV: &str = "GATEWAY_CONFIG_FILE";

/// Location of the configuration file, overridable through `GATEWAY_CONFIG_FILE`
pub fn config_file_path() -> PathBuf {
    env::var(CONFIG_FILE_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE_PATH))
}

/// Loads configuration from the default TOML file
///
/// Configuration precedence (highest to lowest):
/// 1. Environment variables
/// 2. Configuration file values
/// 3. Default values (see `config::defaults`)
///
/// Returns true if the config file was successfully loaded, false otherwise
pub fn load_config() -> bool {
    load_config_from(&config_file_path())
}

/// Loads configuration from the given TOML file
pub fn load_config_from(config_path: &Path) -> bool {
    if !config_path.exists() {
        debug!("Configuration file not found at: {}", config_path.display());
        return false;
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read configuration file: {}", e);
            return false;
        }
    };

    let config_map = match parse_flat_table(&config_content) {
        Ok(map) => map,
        Err(e) => {
            warn!("Failed to parse configuration file: {}", e);
            return false;
        }
    };

    for (key, value) in config_map {
        // Only set if the environment variable doesn't already exist
        if env::var(&key).is_err() {
            debug!("Setting env var from config file: {} = {}", key, value);
            env::set_var(key, value);
        } else {
            debug!("Env var already exists, skipping: {}", key);
        }
    }

    info!("Configuration loaded from {}", config_path.display());
    true
}

/// Flattens a TOML document into string key/value pairs.
///
/// Only top-level scalars are kept; arrays and tables are skipped.
pub fn parse_flat_table(content: &str) -> Result<HashMap<String, String>, toml::de::Error> {
    let values: Value = content.parse()?;
    let mut config_map = HashMap::new();

    if let Value::Table(table) = values {
        for (key, value) in table {
            match value {
                Value::String(s) => {
                    config_map.insert(key, s);
                }
                Value::Integer(i) => {
                    config_map.insert(key, i.to_string());
                }
                Value::Float(f) => {
                    config_map.insert(key, f.to_string());
                }
                Value::Boolean(b) => {
                    config_map.insert(key, b.to_string());
                }
                _ => {
                    warn!("Skipping unsupported TOML value type for key: {}", key);
                }
            }
        }
    }

    Ok(config_map)
}
