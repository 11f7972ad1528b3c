//! Service layer the CLI dispatches to.
//!
//! This module provides:
//! - The operations the CLI invokes ([`Service`], [`Server`])
//! - Their value types ([`ServerConfig`], [`ApiKey`], [`NewUrl`], ...)
//! - The bundled implementation ([`LocalService`]) and its URL stores ([`UrlStore`])
//!
//! The CLI never implements lnurl behavior itself; it only builds
//! configuration and hands it to a [`Service`].

mod error;
mod local;
mod store;
mod types;


use serde_json::{Map, Value};

use crate::config::Defaults;

pub use error::ServiceError;
pub use local::{LocalServer, LocalService};
pub use store::{FileStore, MemoryStore, StoredUrl, UrlStore};
pub use types::{
    ApiKey, ApiKeyOptions, AuthConfig, Backend, BackendConfig, KeyEncoding, NewUrl,
    NewUrlOptions, NumBytes, ServerConfig, ServerOptions,
};

/// Entry points of an lnurl service library.
///
/// # Design
///
/// The dispatcher is generic over this trait, enabling:
/// - Injection of the published defaults without a global
/// - Testing command logic with fake services
/// - Swapping the bundled implementation for a full one
pub trait Service {
    /// Server instances created by this service.
    type Server: Server;

    /// The published default configuration.
    fn defaults(&self) -> &Defaults;

    /// Encodes a value as an lnurl.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the value cannot be encoded.
    fn encode(&self, value: &str) -> Result<String, ServiceError>;

    /// Decodes an lnurl.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the value is not a valid lnurl.
    fn decode(&self, value: &str) -> Result<String, ServiceError>;

    /// Generates a new API key.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidOptions`] for unknown encodings or zero byte counts.
    fn generate_api_key(&self, options: &ApiKeyOptions) -> Result<ApiKey, ServiceError>;

    /// Creates a server instance.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if a configured backend cannot be opened.
    fn create_server(
        &self,
        config: ServerConfig,
        options: ServerOptions,
    ) -> Result<Self::Server, ServiceError>;
}

/// A server instance created by a [`Service`].
pub trait Server: Send + Sync {
    /// Generates and stores a new URL for `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the tag or params are rejected or the store fails.
    fn generate_new_url(
        &self,
        tag: &str,
        params: Map<String, Value>,
        options: NewUrlOptions,
    ) -> impl std::future::Future<Output = Result<NewUrl, ServiceError>> + Send;

    /// Serves requests until the server shuts down.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the server cannot start or fails while running.
    fn run(self) -> impl std::future::Future<Output = Result<(), ServiceError>> + Send;
}
