//! Value types exchanged with the service.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::config::defaults::MEMORY_BACKEND;

/// Fully normalized server configuration.
///
/// Built from the normalized option tree; unknown top-level options are kept
/// in `extra` and handed to the service untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Host the server binds to
    pub host: String,
    /// Port the server listens on; config files may give it as text
    #[serde(deserialize_with = "port_from_number_or_text")]
    pub port: u16,
    /// Externally reachable URL; derived from protocol, host and port when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// URI path of the lnurl endpoint
    pub endpoint: String,
    /// Protocol used to derive the public URL
    pub protocol: String,
    /// API key authentication
    #[serde(default)]
    pub auth: AuthConfig,
    /// Lightning backend; absent for servers created without lightning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lightning: Option<BackendConfig>,
    /// URL store backend
    pub store: BackendConfig,
    /// Options not interpreted by the CLI
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServerConfig {
    /// Converts a normalized option tree.
    ///
    /// # Errors
    ///
    /// Returns an error if a field is missing or has the wrong type.
    pub fn from_tree(tree: Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(tree))
    }

    /// Externally reachable base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.url.as_ref().map_or_else(
            || format!("{}://{}:{}", self.protocol, self.host, self.port),
            |url| url.trim_end_matches('/').to_string(),
        )
    }
}

fn port_from_number_or_text<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u64),
        Text(String),
    }

    let (number, shown) = match Port::deserialize(deserializer)? {
        Port::Number(number) => (Some(number), number.to_string()),
        Port::Text(text) => (text.trim().parse().ok(), text),
    };
    number
        .and_then(|number| u16::try_from(number).ok())
        .ok_or_else(|| {
            D::Error::custom(format!(
                "invalid port '{shown}': expected an integer between 0 and 65535"
            ))
        })
}

/// API key authentication settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Keys accepted by the server
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
}

/// A backend selection plus its configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Which backend
    pub backend: Backend,
    /// Backend-specific settings
    #[serde(default)]
    pub config: Map<String, Value>,
}

/// A backend given by name or by an inline descriptor object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Backend {
    /// Built-in backend name, e.g. `memory`
    Name(String),
    /// Descriptor object, e.g. `{"path": "./custom-backend"}`
    Descriptor(Map<String, Value>),
}

impl Backend {
    /// The backend name, if given by name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Descriptor(_) => None,
        }
    }

    /// Returns true for the non-durable in-memory backend.
    #[must_use]
    pub fn is_memory(&self) -> bool {
        self.name() == Some(MEMORY_BACKEND)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Descriptor(descriptor) => write!(f, "{}", Value::Object(descriptor.clone())),
        }
    }
}

/// Text encoding of generated API keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyEncoding {
    /// Lowercase hexadecimal
    #[default]
    Hex,
    /// Standard base64 with padding
    Base64,
}

impl FromStr for KeyEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hex" => Ok(Self::Hex),
            "base64" => Ok(Self::Base64),
            other => Err(format!(
                "unknown encoding '{other}': expected hex or base64"
            )),
        }
    }
}

impl fmt::Display for KeyEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hex => f.write_str("hex"),
            Self::Base64 => f.write_str("base64"),
        }
    }
}

/// An API key accepted by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    /// Public identifier
    pub id: String,
    /// Shared secret
    pub key: String,
    /// Encoding of `id` and `key`
    #[serde(default)]
    pub encoding: KeyEncoding,
}

/// Options of API key generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyOptions {
    /// Requested encoding, validated by the service
    pub encoding: String,
    /// Random byte counts
    pub num_bytes: NumBytes,
}

/// Random byte counts of an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumBytes {
    /// Bytes in the id
    pub id: u64,
    /// Bytes in the key
    pub key: u64,
}

/// How a server instance is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerOptions {
    /// Bind and accept requests
    pub listen: bool,
    /// Connect the lightning backend
    pub lightning: bool,
}

impl ServerOptions {
    /// A full, listening server.
    pub const SERVE: Self = Self {
        listen: true,
        lightning: true,
    };

    /// A detached instance used only to generate URLs.
    pub const DETACHED: Self = Self {
        listen: false,
        lightning: false,
    };
}

/// Options of URL generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NewUrlOptions {
    /// Number of allowed uses; `Some(0)` is unlimited, `None` uses the service default
    pub uses: Option<u64>,
}

/// A generated single-use URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUrl {
    /// bech32-encoded `url`
    pub encoded: String,
    /// Secret embedded in `url`
    pub secret: String,
    /// Callback URL
    pub url: String,
}
