//! lnurl: lnurl configuration front-end
//!
//! Entry point for the lnurl command-line application.

use std::process::ExitCode;

use lnurl_cli::command::Dispatcher;
use lnurl_cli::config::FlagSchema;
use lnurl_cli::input::StdinPayload;
use lnurl_cli::service::{LocalService, Service};

mod app;

use app::{exit_code, report, setup_tracing};

/// Main entry point.
///
/// Excluded from coverage as it's the thin wrapper around testable components.
#[cfg(not(tarpaulin_include))]
fn main() -> ExitCode {
    // Piped input is captured before any argument is parsed
    let stdin = match StdinPayload::capture() {
        Ok(stdin) => stdin,
        Err(e) => {
            eprintln!("{e}");
            return exit_code::FAILURE;
        }
    };

    let service = LocalService::new();
    let schema = FlagSchema::new(service.defaults());
    let invocation = match schema.parse_args() {
        Ok(invocation) => invocation,
        Err(e) => e.exit(),
    };

    setup_tracing(invocation.verbose);

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");
    let dispatcher = Dispatcher::new(service, stdin);

    report(runtime.block_on(dispatcher.dispatch(invocation)))
}
