//! Successful command results.

use serde::Serialize;
use serde_json::Value;

use super::CommandError;

/// What a successful command leaves behind.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Plain text, written without a trailing newline
    Text(String),
    /// A JSON document, written pretty-printed
    Json(Value),
    /// A server that ran until it was shut down
    Stopped,
}

impl Outcome {
    /// Wraps a serializable result.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Render`] if `value` cannot be serialized.
    pub fn json(value: &impl Serialize) -> Result<Self, CommandError> {
        serde_json::to_value(value)
            .map(Self::Json)
            .map_err(CommandError::Render)
    }

    /// The text to write to standard output, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Render`] if a JSON document cannot be printed.
    pub fn render(&self) -> Result<Option<String>, CommandError> {
        match self {
            Self::Text(text) => Ok(Some(text.clone())),
            Self::Json(value) => serde_json::to_string_pretty(value)
                .map(|json| Some(format!("{json}\n")))
                .map_err(CommandError::Render),
            Self::Stopped => Ok(None),
        }
    }
}
