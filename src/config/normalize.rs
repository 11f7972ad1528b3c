//! Group normalization.
//!
//! Reconciles the flat, nested and default-sourced values of each
//! configuration group into one canonical nested object.
//!
//! # Precedence
//!
//! For every key published in a group's defaults, highest first:
//!
//! 1. **Nested** - `bag[group][key]`, typically from a config file
//! 2. **Flat** - `bag["<group>.<key>"]`, typically from a dotted flag
//! 3. **Default** - the published default for `group.key`
//!
//! Flat entries are always consumed, whichever source wins.
//!
//! # JSON coercion
//!
//! Some keys accept JSON passed as a string:
//! - `lightning.backend` / `store.backend`: parsed when the string starts with `{`
//! - `lightning.config` / `store.config`: parsed whenever it is a string
//! - `auth.apiKeys`: parsed whenever it is a string
//!
//! Already parsed values pass through, which makes normalization idempotent.

use std::fmt;

use serde_json::{Map, Value};

use super::bag::{GroupInput, OptionBag, insert_path};
use super::defaults::Defaults;
use super::error::ConfigError;

/// A named configuration subtree whose keys are published by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    /// API key authentication
    Auth,
    /// Lightning network backend
    Lightning,
    /// URL store backend
    Store,
}

impl Group {
    /// Every group, in normalization order.
    pub const ALL: [Self; 3] = [Self::Auth, Self::Lightning, Self::Store];

    /// Name of the group in configuration trees.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Lightning => "lightning",
            Self::Store => "store",
        }
    }

    /// Parses a group name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|group| group.name() == name)
    }

    /// Applies the group's JSON decoding rule to a resolved value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidJson`] if a value that must be JSON does not parse.
    pub fn coerce(self, key: &str, value: Value) -> Result<Value, ConfigError> {
        let Value::String(text) = value else {
            return Ok(value);
        };

        let is_json = match (self, key) {
            (Self::Lightning | Self::Store, "backend") => text.starts_with('{'),
            (Self::Lightning | Self::Store, "config") | (Self::Auth, "apiKeys") => true,
            _ => false,
        };

        if !is_json {
            return Ok(Value::String(text));
        }

        serde_json::from_str(&text).map_err(|source| ConfigError::InvalidJson {
            option: format!("{}.{key}", self.name()),
            source,
        })
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalizes one group.
///
/// Pure function of its inputs: resolves every default key by precedence,
/// coerces it, and drops keys that still resolve to `null` (a `null` source
/// value falls through to the next source). Keys outside the
/// published defaults are carried over (nested before flat) without
/// overriding resolved keys.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidJson`] if a coerced value is malformed.
pub fn normalize_group(
    group: Group,
    input: GroupInput,
    defaults: &Map<String, Value>,
) -> Result<Map<String, Value>, ConfigError> {
    let GroupInput { nested, mut flat } = input;
    let mut nested = nested.unwrap_or_default();
    let mut normalized = Map::new();

    for (key, default) in defaults {
        let flat_value = flat.remove(key).filter(|value| !value.is_null());
        let resolved = nested
            .remove(key)
            .filter(|value| !value.is_null())
            .or(flat_value)
            .unwrap_or_else(|| default.clone());

        let value = group.coerce(key, resolved)?;
        if !value.is_null() {
            normalized.insert(key.clone(), value);
        }
    }

    for (key, value) in nested {
        if !value.is_null() {
            tracing::debug!("Keeping unpublished option '{group}.{key}'");
            normalized.entry(key).or_insert(value);
        }
    }
    for (key, value) in flat {
        tracing::debug!("Keeping unpublished option '{group}.{key}'");
        insert_path(&mut normalized, &key, value);
    }

    Ok(normalized)
}

/// Normalizes `groups` in place.
///
/// Each group's flat and nested entries are replaced by a single nested
/// object holding every published key.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidJson`] if a coerced value is malformed. The
/// bag is left partially normalized in that case and should be discarded.
pub fn normalize(
    bag: &mut OptionBag,
    groups: &[Group],
    defaults: &Defaults,
) -> Result<(), ConfigError> {
    for &group in groups {
        let input = bag.take_group(group);
        let normalized = normalize_group(group, input, &defaults.group(group))?;
        bag.set_group(group, normalized);
    }
    Ok(())
}
