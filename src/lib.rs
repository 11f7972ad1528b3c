//! lnurl-cli: lnurl configuration front-end
//!
//! A library for composing command-line flags, JSON config files and
//! published defaults into lnurl service configuration, and dispatching
//! commands to an lnurl service.

pub mod command;
pub mod config;
pub mod input;
pub mod service;
