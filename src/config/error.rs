//! Error types for option parsing, config files and normalization.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for configuration operations.
///
/// Covers config file loading, JSON coercion during normalization and
/// conversion of the normalized tree into typed configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A path flag points at a file that does not exist.
    #[error("File not found: '{}'", path.display())]
    NotFound {
        /// Absolute path that was checked
        path: PathBuf,
    },

    /// Failed to read the configuration file.
    #[error("Failed to read config file '{}': {source}", path.display())]
    FileRead {
        /// Path to the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The config file is not in a supported format.
    #[error("Unsupported config file format '{format}' for '{}': only JSON is supported", path.display())]
    UnsupportedFormat {
        /// Path to the config file
        path: PathBuf,
        /// The detected format (file extension)
        format: String,
    },

    /// The config file is not valid JSON.
    #[error("Failed to parse JSON config file '{}': {source}", path.display())]
    FileParse {
        /// Path to the config file
        path: PathBuf,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The config file parsed, but its root is not a JSON object.
    #[error("Config file '{}' must contain a JSON object", path.display())]
    NotAnObject {
        /// Path to the config file
        path: PathBuf,
    },

    /// A JSON-encoded option value is malformed.
    #[error("Invalid JSON for {option}: {source}")]
    InvalidJson {
        /// Dotted option name, e.g. `store.config`
        option: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The normalized configuration does not have the shape the service expects.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[source] serde_json::Error),
}

/// Well-known option names.
///
/// Use these constants for compile-time safety when matching option names.
pub mod field {
    /// Positional value of `encode` / `decode`.
    pub const VALUE: &str = "value";
    /// The tag of a new URL.
    pub const TAG: &str = "tag";
    /// Number of times a new URL can be used.
    pub const USES: &str = "uses";
    /// JSON parameters of a new URL.
    pub const PARAMS: &str = "params";
    /// Path to a JSON config file.
    pub const CONFIG_FILE: &str = "configFile";
    /// API key encoding.
    pub const ENCODING: &str = "encoding";
    /// Number of random bytes in an API key id.
    pub const NUM_BYTES_ID: &str = "numBytes.id";
    /// Number of random bytes in an API key secret.
    pub const NUM_BYTES_KEY: &str = "numBytes.key";
}
