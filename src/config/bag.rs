//! The option bag produced by one command invocation.
//!
//! Options arrive from three sources: dotted command-line flags
//! (`store.backend`), nested objects from a config file
//! (`{"store": {"backend": ...}}`) and published defaults. The bag holds the
//! first two side by side until the group normalizer reconciles them.

use serde_json::{Map, Value};

use super::Group;
use super::defaults::Defaults;

/// Raw options of a single invocation, keyed by flag name.
///
/// Keys may be dotted (`store.backend`) or plain (`store`, `host`). Values
/// have no fixed shape: strings and numbers from flags, arbitrary JSON from
/// config files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionBag {
    entries: Map<String, Value>,
}

/// The two representations of one group found in a bag.
///
/// `nested` is the object stored under the group's own name, `flat` holds the
/// `"<group>.<key>"` entries with the group prefix stripped. Both can be
/// present at once; the normalizer decides which one wins per key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupInput {
    /// Object found at `bag[group]`, if any
    pub nested: Option<Map<String, Value>>,
    /// Entries found at `bag["<group>.<key>"]`, keyed by `<key>`
    pub flat: Map<String, Value>,
}

impl OptionBag {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bag from an already parsed JSON object.
    #[must_use]
    pub const fn from_map(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    /// Sets an option, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    /// Returns the option stored under `key` verbatim.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Removes and returns the option stored under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Returns true if an option is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of stored options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the bag holds no options.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the stored options.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Discards every option and takes `entries` instead.
    ///
    /// Used when a config file is supplied: the file is authoritative and is
    /// not merged with flags.
    pub fn replace_with(&mut self, entries: Map<String, Value>) {
        self.entries = entries;
    }

    /// Removes both representations of `group` from the bag.
    ///
    /// A non-object value stored under the group name is discarded; the
    /// normalized group replaces it anyway.
    pub fn take_group(&mut self, group: Group) -> GroupInput {
        let nested = match self.entries.remove(group.name()) {
            Some(Value::Object(map)) => Some(map),
            Some(other) => {
                tracing::warn!(
                    "Ignoring non-object value for '{}': {other}",
                    group.name()
                );
                None
            }
            None => None,
        };

        let prefix = format!("{}.", group.name());
        let flat_keys: Vec<String> = self
            .entries
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .cloned()
            .collect();

        let mut flat = Map::new();
        for key in flat_keys {
            if let Some(value) = self.entries.remove(&key) {
                flat.insert(key[prefix.len()..].to_string(), value);
            }
        }

        GroupInput { nested, flat }
    }

    /// Stores a normalized group under its name.
    pub fn set_group(&mut self, group: Group, values: Map<String, Value>) {
        self.entries
            .insert(group.name().to_string(), Value::Object(values));
    }

    /// Consumes the bag and folds every dotted key into nested structure.
    ///
    /// Plain keys are placed first, so an explicit nested value always wins
    /// over a dotted entry targeting the same path.
    #[must_use]
    pub fn into_tree(self) -> Map<String, Value> {
        let (dotted, plain): (Vec<_>, Vec<_>) = self
            .entries
            .into_iter()
            .partition(|(key, _)| key.contains('.'));

        let mut tree: Map<String, Value> = plain.into_iter().collect();
        for (key, value) in dotted {
            insert_path(&mut tree, &key, value);
        }
        tree
    }

    /// Consumes the bag into the final configuration tree.
    ///
    /// Dotted keys are folded as in [`OptionBag::into_tree`], then missing
    /// top-level scalars (`host`, `port`, ...) are filled from `defaults`.
    #[must_use]
    pub fn into_normalized(self, defaults: &Defaults) -> Map<String, Value> {
        let mut tree = self.into_tree();
        for (key, value) in defaults.scalars() {
            if tree.get(key).is_none_or(Value::is_null) {
                tree.insert(key.clone(), value.clone());
            }
        }
        tree
    }
}

impl From<Map<String, Value>> for OptionBag {
    fn from(entries: Map<String, Value>) -> Self {
        Self::from_map(entries)
    }
}

/// Inserts `value` at dotted `path` unless something already lives there.
///
/// Missing intermediate objects are created. Returns false when the path is
/// occupied or blocked by a non-object value.
pub(crate) fn insert_path(tree: &mut Map<String, Value>, path: &str, value: Value) -> bool {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(last) = segments.pop() else {
        return false;
    };

    let mut node = tree;
    for segment in segments {
        let child = node
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        match child {
            Value::Object(map) => node = map,
            _ => {
                tracing::debug!("Dropping '{path}': '{segment}' is not an object");
                return false;
            }
        }
    }

    if node.contains_key(last) {
        tracing::debug!("Dropping '{path}': value already present");
        return false;
    }
    node.insert(last.to_string(), value);
    true
}
