//! Bundled service implementation.
//!
//! Provides lnurl encoding, API key generation and URL generation against the
//! `memory` and `file` stores. The HTTP listener is not part of this bundle:
//! [`LocalServer::run`] validates the configuration and then reports the
//! listener as unsupported.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bech32::{Bech32, Hrp};
use rand::RngCore;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use url::Url;

use crate::config::Defaults;

use super::store::{StoredUrl, UrlStore};
use super::types::{
    ApiKey, ApiKeyOptions, KeyEncoding, NewUrl, NewUrlOptions, ServerConfig, ServerOptions,
};
use super::{Server, Service, ServiceError};

/// Human readable part of an lnurl.
const HRP: &str = "lnurl";

/// URI scheme wallets prepend to lnurls.
const LIGHTNING_SCHEME: &str = "lightning:";

/// Random bytes in a URL secret.
const SECRET_BYTES: usize = 32;

/// Upper bound of `numBytes.id` and `numBytes.key`.
const MAX_KEY_BYTES: usize = 1024;

/// Uses granted when none are requested.
const DEFAULT_USES: u64 = 1;

/// Tags a URL can be generated for.
const TAGS: [&str; 4] = ["channelRequest", "login", "payRequest", "withdrawRequest"];

/// Service backed by this crate.
#[derive(Debug, Clone, Default)]
pub struct LocalService {
    defaults: Defaults,
}

impl LocalService {
    /// Creates a service publishing the built-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::with_defaults(Defaults::builtin())
    }

    /// Creates a service publishing custom defaults.
    #[must_use]
    pub const fn with_defaults(defaults: Defaults) -> Self {
        Self { defaults }
    }
}

impl Service for LocalService {
    type Server = LocalServer;

    fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    fn encode(&self, value: &str) -> Result<String, ServiceError> {
        encode(value)
    }

    fn decode(&self, value: &str) -> Result<String, ServiceError> {
        let value = strip_scheme(value.trim());
        let (hrp, data) = bech32::decode(value).map_err(|e| ServiceError::Decode(e.to_string()))?;

        if hrp.to_lowercase() != HRP {
            return Err(ServiceError::InvalidInput(format!(
                "expected prefix '{HRP}', found '{}'",
                hrp.to_lowercase()
            )));
        }

        String::from_utf8(data).map_err(|e| ServiceError::Decode(e.to_string()))
    }

    fn generate_api_key(&self, options: &ApiKeyOptions) -> Result<ApiKey, ServiceError> {
        let encoding: KeyEncoding = options
            .encoding
            .parse()
            .map_err(ServiceError::InvalidOptions)?;
        let id_bytes = byte_count("numBytes.id", options.num_bytes.id)?;
        let key_bytes = byte_count("numBytes.key", options.num_bytes.key)?;

        Ok(ApiKey {
            id: render(&random_bytes(id_bytes), encoding),
            key: render(&random_bytes(key_bytes), encoding),
            encoding,
        })
    }

    fn create_server(
        &self,
        config: ServerConfig,
        options: ServerOptions,
    ) -> Result<LocalServer, ServiceError> {
        let store = UrlStore::open(&config.store)?;

        if options.lightning {
            let backend = config
                .lightning
                .as_ref()
                .map_or_else(|| "none".to_string(), |lightning| lightning.backend.to_string());
            tracing::debug!("Lightning backend: {backend}");
        }

        tracing::debug!(
            "Created server for {} (store: {}, listen: {})",
            config.base_url(),
            config.store.backend,
            options.listen
        );

        Ok(LocalServer {
            config,
            options,
            store,
        })
    }
}

/// Server instance of the [`LocalService`].
#[derive(Debug, Clone)]
pub struct LocalServer {
    config: ServerConfig,
    options: ServerOptions,
    store: UrlStore,
}

impl LocalServer {
    /// The configuration the server was created with.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The server's URL store.
    #[must_use]
    pub const fn store(&self) -> &UrlStore {
        &self.store
    }

    fn callback_url(&self, secret: &str) -> Result<Url, ServiceError> {
        let base = format!("{}{}", self.config.base_url(), self.config.endpoint);
        let mut url = Url::parse(&base).map_err(|source| ServiceError::InvalidUrl {
            url: base.clone(),
            source,
        })?;
        url.query_pairs_mut().append_pair("q", secret);
        Ok(url)
    }
}

impl Server for LocalServer {
    async fn generate_new_url(
        &self,
        tag: &str,
        params: Map<String, Value>,
        options: NewUrlOptions,
    ) -> Result<NewUrl, ServiceError> {
        if !TAGS.contains(&tag) {
            return Err(ServiceError::InvalidInput(format!(
                "unknown tag '{tag}': expected one of {}",
                TAGS.join(", ")
            )));
        }

        let secret_bytes = random_bytes(SECRET_BYTES);
        let secret = hex::encode(&secret_bytes);
        let hash = hex::encode(Sha256::digest(&secret_bytes));
        let remaining_uses = match options.uses.unwrap_or(DEFAULT_USES) {
            0 => None,
            uses => Some(uses),
        };

        let url = self.callback_url(&secret)?;
        let encoded = encode(url.as_str())?;

        self.store
            .create(
                hash,
                StoredUrl {
                    tag: tag.to_string(),
                    params,
                    remaining_uses,
                },
            )
            .await?;

        Ok(NewUrl {
            encoded,
            secret,
            url: url.into(),
        })
    }

    async fn run(self) -> Result<(), ServiceError> {
        tracing::info!(
            "Server configured at {}{} (listen: {})",
            self.config.base_url(),
            self.config.endpoint,
            self.options.listen
        );
        Err(ServiceError::Unsupported {
            operation: "HTTP listener",
        })
    }
}

fn encode(value: &str) -> Result<String, ServiceError> {
    if value.is_empty() {
        return Err(ServiceError::InvalidInput("nothing to encode".to_string()));
    }

    let hrp = Hrp::parse(HRP).map_err(|e| ServiceError::Encode(e.to_string()))?;
    bech32::encode_upper::<Bech32>(hrp, value.as_bytes())
        .map_err(|e| ServiceError::Encode(e.to_string()))
}

fn strip_scheme(value: &str) -> &str {
    match value.get(..LIGHTNING_SCHEME.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(LIGHTNING_SCHEME) => {
            &value[LIGHTNING_SCHEME.len()..]
        }
        _ => value,
    }
}

fn byte_count(option: &str, count: u64) -> Result<usize, ServiceError> {
    match usize::try_from(count) {
        Ok(0) => Err(ServiceError::InvalidOptions(format!(
            "{option} must be greater than 0"
        ))),
        Ok(count) if count > MAX_KEY_BYTES => Err(ServiceError::InvalidOptions(format!(
            "{option} must be at most {MAX_KEY_BYTES}"
        ))),
        Ok(count) => Ok(count),
        Err(_) => Err(ServiceError::InvalidOptions(format!(
            "{option} is too large"
        ))),
    }
}

fn random_bytes(count: usize) -> Vec<u8> {
    let mut bytes = vec![0; count];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

fn render(bytes: &[u8], encoding: KeyEncoding) -> String {
    match encoding {
        KeyEncoding::Hex => hex::encode(bytes),
        KeyEncoding::Base64 => STANDARD.encode(bytes),
    }
}
