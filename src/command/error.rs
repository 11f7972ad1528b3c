//! Error types for command validation and execution.

use thiserror::Error;

use crate::config::ConfigError;
use crate::service::ServiceError;

/// Error type for a command invocation.
///
/// Every variant ends the invocation with a single message on standard
/// error and a failing exit code.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A required option or argument was not supplied.
    #[error("Missing required argument: {field}")]
    MissingRequired {
        /// Name of the missing option
        field: &'static str,
    },

    /// An option that must be a non-negative integer is not one.
    #[error("Invalid {option} '{value}': expected a non-negative integer")]
    InvalidInteger {
        /// Name of the option
        option: &'static str,
        /// The rejected value
        value: String,
    },

    /// An option has the wrong type.
    #[error("Invalid {option}: expected {expected}")]
    InvalidType {
        /// Name of the option
        option: &'static str,
        /// Description of the expected type
        expected: &'static str,
    },

    /// A JSON-encoded option is malformed.
    #[error("Invalid JSON for {option}: {source}")]
    InvalidJson {
        /// Name of the option
        option: &'static str,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// URL generation was requested against a store that does not persist.
    #[error(
        "Cannot generate new URLs with the memory store backend: URLs must be stored durably to be redeemed later. Use --store.backend to select a persistent store"
    )]
    EphemeralStore,

    /// Loading or normalizing configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The service rejected the operation.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// A result could not be rendered as JSON.
    #[error("Failed to render result: {0}")]
    Render(#[source] serde_json::Error),
}

impl CommandError {
    /// Creates a `MissingRequired` error.
    #[must_use]
    pub const fn missing(field: &'static str) -> Self {
        Self::MissingRequired { field }
    }
}
