//! Command validation and execution.

use std::path::Path;

use serde_json::{Map, Value};

use crate::config::{self, CommandKind, Defaults, Group, Invocation, OptionBag, field};
use crate::input::StdinPayload;
use crate::service::{
    ApiKeyOptions, NewUrlOptions, NumBytes, Server as _, ServerConfig, ServerOptions, Service,
};

use super::{CommandError, Outcome};

/// Routes parsed invocations to a [`Service`].
///
/// Each invocation runs Validate then Execute and ends in a single
/// [`Outcome`] or [`CommandError`]; no state survives between invocations.
#[derive(Debug)]
pub struct Dispatcher<S> {
    service: S,
    stdin: StdinPayload,
}

impl<S: Service> Dispatcher<S> {
    /// Creates a dispatcher for `service` with the captured standard input.
    #[must_use]
    pub const fn new(service: S, stdin: StdinPayload) -> Self {
        Self { service, stdin }
    }

    /// The service commands are dispatched to.
    #[must_use]
    pub const fn service(&self) -> &S {
        &self.service
    }

    /// Validates and executes one invocation.
    ///
    /// For `server` this only returns once the server stops.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] for validation failures, configuration
    /// errors and service rejections.
    pub async fn dispatch(&self, invocation: Invocation) -> Result<Outcome, CommandError> {
        let Invocation {
            command,
            positional,
            options,
            ..
        } = invocation;
        tracing::debug!("Dispatching {command} with {} option(s)", options.len());

        match command {
            CommandKind::Encode => {
                let value = self.single_value(positional)?;
                Ok(Outcome::Text(self.service.encode(&value)?))
            }
            CommandKind::Decode => {
                let value = self.single_value(positional)?;
                Ok(Outcome::Text(self.service.decode(&value)?))
            }
            CommandKind::GenerateApiKey => self.generate_api_key(&options),
            CommandKind::GenerateNewUrl => self.generate_new_url(options).await,
            CommandKind::Server => self.serve(options).await,
        }
    }

    fn single_value(&self, positional: Option<String>) -> Result<String, CommandError> {
        self.stdin
            .resolve(positional)
            .ok_or(CommandError::missing(field::VALUE))
    }

    fn generate_api_key(&self, options: &OptionBag) -> Result<Outcome, CommandError> {
        let defaults = self.service.defaults();
        let encoding = match options
            .get(field::ENCODING)
            .or_else(|| defaults.api_key_value(field::ENCODING))
        {
            Some(Value::String(encoding)) => encoding.clone(),
            Some(_) => {
                return Err(CommandError::InvalidType {
                    option: field::ENCODING,
                    expected: "a string",
                });
            }
            None => return Err(CommandError::missing(field::ENCODING)),
        };

        let num_bytes = NumBytes {
            id: byte_count(options, defaults, field::NUM_BYTES_ID)?,
            key: byte_count(options, defaults, field::NUM_BYTES_KEY)?,
        };

        let api_key = self
            .service
            .generate_api_key(&ApiKeyOptions { encoding, num_bytes })?;
        Outcome::json(&api_key)
    }

    async fn generate_new_url(&self, mut options: OptionBag) -> Result<Outcome, CommandError> {
        let tag = match options.remove(field::TAG) {
            Some(Value::String(tag)) if !tag.is_empty() => tag,
            _ => return Err(CommandError::missing(field::TAG)),
        };
        let uses = parse_integer(field::USES, options.remove(field::USES))?;
        let params = parse_params(options.remove(field::PARAMS))?;

        apply_config_file(&mut options)?;
        if options.take_group(Group::Lightning) != config::GroupInput::default() {
            tracing::debug!("Ignoring lightning options: new URLs are generated without lightning");
        }

        let config = normalized_config(options, &[Group::Store], self.service.defaults())?;
        if config.store.backend.is_memory() {
            return Err(CommandError::EphemeralStore);
        }

        tracing::debug!("Generating new {tag} URL (store: {})", config.store.backend);
        let server = self
            .service
            .create_server(config, ServerOptions::DETACHED)?;
        let new_url = server
            .generate_new_url(&tag, params, NewUrlOptions { uses })
            .await?;

        Outcome::json(&new_url)
    }

    async fn serve(&self, mut options: OptionBag) -> Result<Outcome, CommandError> {
        apply_config_file(&mut options)?;
        let config = normalized_config(options, &Group::ALL, self.service.defaults())?;

        tracing::info!(
            "Starting server on {}:{} (public url: {}{}, store: {})",
            config.host,
            config.port,
            config.base_url(),
            config.endpoint,
            config.store.backend
        );

        let server = self.service.create_server(config, ServerOptions::SERVE)?;
        server.run().await?;

        tracing::info!("Server stopped");
        Ok(Outcome::Stopped)
    }
}

/// Replaces every option with the contents of `--configFile`, if given.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded.
pub fn apply_config_file(options: &mut OptionBag) -> Result<(), CommandError> {
    let Some(path) = options.remove(field::CONFIG_FILE) else {
        return Ok(());
    };
    let Value::String(path) = path else {
        return Err(CommandError::InvalidType {
            option: field::CONFIG_FILE,
            expected: "a file path",
        });
    };

    let entries = config::file::load_options(Path::new(&path))?;
    tracing::info!("Using config file {path}; other options are ignored");
    options.replace_with(entries);
    Ok(())
}

/// Normalizes `groups` and converts the bag into a [`ServerConfig`].
///
/// # Errors
///
/// Returns an error if a JSON-encoded option is malformed or the result
/// does not have the expected shape.
pub fn normalized_config(
    mut options: OptionBag,
    groups: &[Group],
    defaults: &Defaults,
) -> Result<ServerConfig, CommandError> {
    config::normalize(&mut options, groups, defaults)?;
    let tree = options.into_normalized(defaults);
    ServerConfig::from_tree(tree)
        .map_err(config::ConfigError::InvalidConfig)
        .map_err(CommandError::from)
}

/// Parses an optional non-negative integer option.
///
/// Accepts JSON numbers and decimal strings; `0` is a valid value.
///
/// # Errors
///
/// Returns [`CommandError::InvalidInteger`] for anything else.
pub fn parse_integer(option: &'static str, value: Option<Value>) -> Result<Option<u64>, CommandError> {
    let invalid = |value: String| CommandError::InvalidInteger { option, value };

    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => number
            .as_u64()
            .map(Some)
            .ok_or_else(|| invalid(number.to_string())),
        Some(Value::String(text)) => text
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| invalid(text)),
        Some(other) => Err(invalid(other.to_string())),
    }
}

/// Parses the `--params` option into an object.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or not an object.
pub fn parse_params(value: Option<Value>) -> Result<Map<String, Value>, CommandError> {
    let value = match value {
        None | Some(Value::Null) => return Ok(Map::new()),
        Some(Value::String(text)) => {
            serde_json::from_str(&text).map_err(|source| CommandError::InvalidJson {
                option: field::PARAMS,
                source,
            })?
        }
        Some(value) => value,
    };

    match value {
        Value::Object(params) => Ok(params),
        _ => Err(CommandError::InvalidType {
            option: field::PARAMS,
            expected: "a JSON object",
        }),
    }
}

fn byte_count(
    options: &OptionBag,
    defaults: &Defaults,
    option: &'static str,
) -> Result<u64, CommandError> {
    let value = options
        .get(option)
        .or_else(|| defaults.api_key_value(option))
        .cloned();
    parse_integer(option, value)?.ok_or(CommandError::missing(option))
}
