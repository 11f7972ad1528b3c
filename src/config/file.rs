//! JSON config file loading.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::ConfigError;

/// Resolves a user-supplied path and checks that it exists.
///
/// A leading `~` is expanded to the home directory and relative paths are
/// made absolute against the current directory. Runs at flag-parse time so
/// a bad path fails the invocation before any command logic.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] if nothing exists at the resolved path,
/// or [`ConfigError::FileRead`] if existence cannot be determined.
pub fn resolve_existing(raw: &str) -> Result<PathBuf, ConfigError> {
    let expanded = expand_tilde(raw);
    let path = std::path::absolute(&expanded).map_err(|source| ConfigError::FileRead {
        path: expanded.clone(),
        source,
    })?;

    match path.try_exists() {
        Ok(true) => Ok(path),
        Ok(false) => Err(ConfigError::NotFound { path }),
        Err(source) => Err(ConfigError::FileRead { path, source }),
    }
}

/// Reads a config file and parses it into a plain option object.
///
/// Files ending in `.json`, or without an extension, are parsed as JSON.
///
/// # Errors
///
/// Returns an error if the format is unsupported, the file cannot be read,
/// the JSON is malformed, or its root is not an object.
pub fn load_options(path: &Path) -> Result<Map<String, Value>, ConfigError> {
    if let Some(format) = unsupported_format(path) {
        return Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
            format,
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    parse_options(path, &content)
}

/// Parses config file content that has already been read.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or its root is not an object.
pub fn parse_options(path: &Path, content: &str) -> Result<Map<String, Value>, ConfigError> {
    let value: Value = serde_json::from_str(content).map_err(|source| ConfigError::FileParse {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Object(map) => {
            tracing::debug!("Loaded {} option(s) from {}", map.len(), path.display());
            Ok(map)
        }
        _ => Err(ConfigError::NotAnObject {
            path: path.to_path_buf(),
        }),
    }
}

fn unsupported_format(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_string_lossy();
    if extension.eq_ignore_ascii_case("json") {
        None
    } else {
        Some(extension.into_owned())
    }
}

fn expand_tilde(raw: &str) -> PathBuf {
    let rest = match raw.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with('/') || rest.starts_with('\\') => &rest[1..],
        _ => return PathBuf::from(raw),
    };

    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(raw),
    }
}
