//! Configuration layer for lnurl-cli.
//!
//! This module provides:
//! - Flag declarations and command-line parsing ([`FlagSchema`], [`Invocation`])
//! - The raw per-invocation option bag ([`OptionBag`])
//! - Group normalization ([`normalize`], [`Group`])
//! - JSON config file loading ([`file`])
//! - Published default values ([`Defaults`], [`defaults`])
//!
//! # Sources
//!
//! Options come from three sources:
//!
//! 1. **Command-line flags** - dotted names (`--store.backend`) denote nested paths
//! 2. **Config file** - a JSON object given with `--configFile`
//! 3. **Published defaults** - supplied by the service
//!
//! A config file is authoritative: when present it **replaces** every flag
//! value instead of being merged with them. Defaults fill whatever the
//! remaining source leaves out.
//!
//! # Groups
//!
//! `auth`, `lightning` and `store` are normalized into nested objects holding
//! every published key. Within a group, a nested value wins over a dotted
//! flag, which wins over the default. See [`normalize`] for the JSON coercion
//! rules applied to `backend`, `config` and `apiKeys`.

mod bag;
pub mod defaults;
mod error;
pub mod file;
mod normalize;
mod schema;


pub use bag::{GroupInput, OptionBag};
pub use defaults::Defaults;
pub use error::{ConfigError, field};
pub use normalize::{Group, normalize, normalize_group};
pub use schema::{
    CommandKind, CommandSchema, FlagDeclaration, FlagSchema, Invocation, Transform,
};
