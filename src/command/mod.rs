//! Command dispatch.
//!
//! This module provides:
//! - The dispatcher that validates and executes invocations ([`Dispatcher`])
//! - Command results ([`Outcome`])
//! - Command errors ([`CommandError`])
//!
//! # Commands
//!
//! | Command          | Input                          | Output                 |
//! |------------------|--------------------------------|------------------------|
//! | `encode`         | positional value or stdin      | lnurl, no newline      |
//! | `decode`         | positional value or stdin      | URL, no newline        |
//! | `generateApiKey` | `--encoding`, `--numBytes.*`   | pretty JSON            |
//! | `generateNewUrl` | `--tag`, `--uses`, `--params`  | pretty JSON            |
//! | `server`         | server options or config file  | runs until stopped     |
//!
//! Piped standard input always wins over the positional value of `encode`
//! and `decode`. `generateNewUrl` refuses the memory store backend, since a
//! URL generated now must still exist when it is redeemed later.

mod dispatch;
mod error;
mod outcome;

#[cfg(test)]
mod dispatch_tests;

pub use dispatch::{
    Dispatcher, apply_config_file, normalized_config, parse_integer, parse_params,
};
pub use error::CommandError;
pub use outcome::Outcome;
