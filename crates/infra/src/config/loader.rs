//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the access token is not set there, falls back to a file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `VKRPC_ACCESS_TOKEN`: Access token (required)
//! - `VKRPC_API_URL`: Method endpoint, defaults to `https://api.vk.com/method/`
//! - `VKRPC_API_VERSION`: Pinned protocol version, defaults to `5.92`
//! - `VKRPC_REQUEST_TIMEOUT_SECS`: Per-call deadline; `0` disables it
//! - `VKRPC_QUIET_ERRORS`: Comma separated failure phrases logged at debug
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./vkrpc.toml`, `./vkrpc.json`, `./config.toml`, `./config.json`
//! 2. The same names in the parent and grandparent directories
//! 3. Relative to executable location

use std::path::{Path, PathBuf};

use vkrpc_domain::{ApiError, ClientConfig, Result};

const FILE_NAMES: [&str; 4] = ["vkrpc.toml", "vkrpc.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the access token
/// is missing there, falls back to loading from a config file.
///
/// # Errors
/// Returns `ApiError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
pub fn load() -> Result<ClientConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `ApiError::Config` if `VKRPC_ACCESS_TOKEN` is missing or an
/// optional variable has an invalid value.
pub fn load_from_env() -> Result<ClientConfig> {
    let access_token = env_var("VKRPC_ACCESS_TOKEN")?;
    let defaults = ClientConfig::default();

    let request_timeout_secs = match optional_env("VKRPC_REQUEST_TIMEOUT_SECS") {
        Some(raw) => Some(
            raw.parse::<u64>()
                .map_err(|e| ApiError::Config(format!("Invalid request timeout: {e}")))?,
        ),
        None => None,
    };

    Ok(ClientConfig {
        access_token: Some(access_token),
        api_url: optional_env("VKRPC_API_URL").unwrap_or(defaults.api_url),
        api_version: optional_env("VKRPC_API_VERSION").unwrap_or(defaults.api_version),
        request_timeout_secs,
        retry: defaults.retry,
        quiet_errors: optional_env("VKRPC_QUIET_ERRORS").map(|raw| split_list(&raw)).unwrap_or_default(),
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Format is detected by file extension.
///
/// # Errors
/// Returns `ApiError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ApiError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ApiError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ApiError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content, by file extension.
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => {
            toml::from_str(contents).map_err(|e| ApiError::Config(format!("Invalid TOML format: {e}")))
        }
        "json" => serde_json::from_str(contents)
            .map_err(|e| ApiError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(ApiError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the working directory, its parent and grandparent, then the
/// executable's directory and its parents.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.extend([exe_dir.to_path_buf(), exe_dir.join(".."), exe_dir.join("../..")]);
        }
    }

    roots
        .iter()
        .flat_map(|root| FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    optional_env(key)
        .ok_or_else(|| ApiError::Config(format!("Missing required environment variable: {key}")))
}

/// Set and non-blank, trimmed.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}
