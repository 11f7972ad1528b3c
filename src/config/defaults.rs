//! Published default configuration tree.
//!
//! The service owns its defaults; this module holds the canonical values and
//! the [`Defaults`] handle that is injected into the flag schema, the group
//! normalizer and the dispatcher. Nothing reaches for a global copy.

use serde_json::{Map, Value, json};

use super::Group;

/// Default host the server binds to.
pub const HOST: &str = "localhost";

/// Default port the server listens on.
pub const PORT: u16 = 3000;

/// Default path of the lnurl endpoint.
pub const ENDPOINT: &str = "/lnurl";

/// Default protocol used when deriving the public URL.
pub const PROTOCOL: &str = "http";

/// Default lightning backend.
pub const LIGHTNING_BACKEND: &str = "dummy";

/// Default store backend. Not durable.
pub const STORE_BACKEND: &str = MEMORY_BACKEND;

/// Name of the in-memory store backend.
pub const MEMORY_BACKEND: &str = "memory";

/// Name of the JSON file store backend.
pub const FILE_BACKEND: &str = "file";

/// Default encoding for generated API keys.
pub const API_KEY_ENCODING: &str = "hex";

/// Default number of random bytes in an API key id.
pub const API_KEY_ID_BYTES: u64 = 5;

/// Default number of random bytes in an API key secret.
pub const API_KEY_KEY_BYTES: u64 = 32;

/// Immutable default-configuration tree.
///
/// Two trees are published: the server tree (top-level scalars plus one
/// object per [`Group`]) and the API key tree used by `generateApiKey`.
#[derive(Debug, Clone, PartialEq)]
pub struct Defaults {
    server: Map<String, Value>,
    api_key: Map<String, Value>,
}

impl Defaults {
    /// Creates a defaults handle from explicit trees.
    #[must_use]
    pub const fn new(server: Map<String, Value>, api_key: Map<String, Value>) -> Self {
        Self { server, api_key }
    }

    /// The defaults shipped with the bundled service.
    #[must_use]
    pub fn builtin() -> Self {
        let server = json!({
            "host": HOST,
            "port": PORT,
            "endpoint": ENDPOINT,
            "protocol": PROTOCOL,
            "auth": {
                "apiKeys": [],
            },
            "lightning": {
                "backend": LIGHTNING_BACKEND,
                "config": {},
            },
            "store": {
                "backend": STORE_BACKEND,
                "config": {},
            },
        });
        let api_key = json!({
            "encoding": API_KEY_ENCODING,
            "numBytes": {
                "id": API_KEY_ID_BYTES,
                "key": API_KEY_KEY_BYTES,
            },
        });

        Self::new(into_object(server), into_object(api_key))
    }

    /// The whole server tree.
    #[must_use]
    pub const fn server(&self) -> &Map<String, Value> {
        &self.server
    }

    /// Default keys and values of one group. Empty when the group is unpublished.
    #[must_use]
    pub fn group(&self, group: Group) -> Map<String, Value> {
        self.server
            .get(group.name())
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// Looks up a dotted path in the server tree, e.g. `store.backend`.
    #[must_use]
    pub fn server_value(&self, path: &str) -> Option<&Value> {
        lookup(&self.server, path)
    }

    /// Looks up a dotted path in the API key tree, e.g. `numBytes.id`.
    #[must_use]
    pub fn api_key_value(&self, path: &str) -> Option<&Value> {
        lookup(&self.api_key, path)
    }

    /// Top-level server scalars (everything that is not a group).
    pub fn scalars(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.server
            .iter()
            .filter(|(key, _)| Group::from_name(key).is_none())
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self::builtin()
    }
}

fn lookup<'a>(tree: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = tree.get(segments.next()?)?;
    segments.try_fold(first, |node, segment| node.get(segment))
}

fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
