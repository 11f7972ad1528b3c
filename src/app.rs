//! Application startup and utilities.
//!
//! This module contains exit codes, tracing setup, and result reporting
//! that support the main entry point.

use std::io::{self, Write};
use std::process::ExitCode;

use lnurl_cli::command::{CommandError, Outcome};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;

/// Application exit codes.
pub mod exit_code {
    use std::process::ExitCode;

    use lnurl_cli::command::CommandError;

    /// Success (exit code 0).
    pub const SUCCESS: ExitCode = ExitCode::SUCCESS;

    /// Any failure of the invocation (exit code 1) - invalid options, config or service errors.
    pub const FAILURE: ExitCode = ExitCode::FAILURE;

    /// Selects the exit code of a finished command.
    #[must_use]
    pub fn for_result<T>(result: &Result<T, CommandError>) -> ExitCode {
        match result {
            Ok(_) => SUCCESS,
            Err(_) => FAILURE,
        }
    }
}

/// Sets up the tracing subscriber for logging.
///
/// Logs go to standard error; standard output carries command results only.
pub fn setup_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Writes a finished command's output or error and returns its exit code.
pub fn report(result: Result<Outcome, CommandError>) -> ExitCode {
    let rendered = result.and_then(|outcome| outcome.render());
    let code = exit_code::for_result(&rendered);

    match rendered {
        Ok(Some(text)) => {
            if let Err(e) = write_stdout(&text) {
                tracing::warn!("Failed to write output: {e}");
            }
        }
        Ok(None) => {}
        Err(e) => report_error(&e),
    }

    code
}

/// Logs an error to the diagnostic channel and echoes its message to standard error.
pub fn report_error(error: &CommandError) {
    tracing::error!("Command failed: {error:?}");
    eprintln!("{error}");
}

fn write_stdout(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()
}
