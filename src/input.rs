//! Piped standard input capture.
//!
//! When the process is not attached to a terminal, everything written to
//! standard input is buffered before arguments are parsed. A non-empty
//! payload then replaces the positional value of single-value commands.

use std::io::{self, IsTerminal, Read};

use thiserror::Error;

#[cfg(test)]
#[path = "input_tests.rs"]
mod tests;

/// Error type for standard input capture.
#[derive(Debug, Error)]
pub enum InputError {
    /// Reading standard input failed (including invalid UTF-8).
    #[error("Failed to read standard input: {0}")]
    Read(#[source] io::Error),
}

/// Payload piped into the process, captured once per invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StdinPayload {
    buffered: Option<String>,
}

impl StdinPayload {
    /// Captures the process's standard input.
    ///
    /// An interactive terminal is never read, so the call cannot block
    /// waiting for user input.
    ///
    /// # Errors
    ///
    /// Returns an error if the piped stream cannot be read.
    pub fn capture() -> Result<Self, InputError> {
        let stdin = io::stdin();
        let interactive = stdin.is_terminal();
        Self::from_reader(stdin.lock(), interactive)
    }

    /// Captures `reader` until end of stream unless `interactive` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be read.
    pub fn from_reader<R: Read>(mut reader: R, interactive: bool) -> Result<Self, InputError> {
        if interactive {
            return Ok(Self::none());
        }

        let mut buffered = String::new();
        reader
            .read_to_string(&mut buffered)
            .map_err(InputError::Read)?;

        tracing::debug!("Captured {} byte(s) from standard input", buffered.len());
        Ok(Self {
            buffered: Some(buffered),
        })
    }

    /// No payload, as for an interactive session.
    #[must_use]
    pub const fn none() -> Self {
        Self { buffered: None }
    }

    /// A payload with the given content.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            buffered: Some(text.into()),
        }
    }

    /// Returns the payload if one was captured and it is non-empty.
    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        self.buffered.as_deref().filter(|text| !text.is_empty())
    }

    /// Picks the effective value of a single-value command.
    ///
    /// A non-empty payload always wins over `positional`, with at most one
    /// trailing line terminator (`\n` or `\r\n`) stripped.
    #[must_use]
    pub fn resolve(&self, positional: Option<String>) -> Option<String> {
        match self.payload() {
            Some(text) => Some(strip_line_terminator(text).to_string()),
            None => positional,
        }
    }
}

fn strip_line_terminator(text: &str) -> &str {
    text.strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text)
}
