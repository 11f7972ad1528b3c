//! Declarative flag schema and command-line parsing.
//!
//! Every command's flags are declared once, with their dotted destination
//! path, their default (taken from the injected [`Defaults`]) and the
//! transform applied to the raw text at parse time. The clap command tree is
//! generated from these declarations.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_json::Value;

use super::bag::OptionBag;
use super::defaults::Defaults;
use super::error::field;
use super::file;

const BIN_NAME: &str = "lnurl";
const VERBOSE: &str = "verbose";

/// Parse-time transform applied to a flag's raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Kept as a string
    Identity,
    /// Parsed as a signed integer
    Integer,
    /// Resolved to an absolute path that must exist
    ExistingFile,
}

/// One recognized flag of a command.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagDeclaration {
    /// Flag name and destination path, e.g. `store.backend`
    pub path: &'static str,
    /// Help text
    pub help: &'static str,
    /// Value used when the flag is not given
    pub default: Option<Value>,
    /// Transform applied to the raw text
    pub transform: Transform,
}

impl FlagDeclaration {
    /// A string flag without default.
    #[must_use]
    pub const fn new(path: &'static str, help: &'static str) -> Self {
        Self {
            path,
            help,
            default: None,
            transform: Transform::Identity,
        }
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, default: Option<&Value>) -> Self {
        self.default = default.cloned();
        self
    }

    /// Sets the parse-time transform.
    #[must_use]
    pub const fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    fn to_arg(&self) -> Arg {
        let help = match &self.default {
            Some(default) => {
                let shown = default
                    .as_str()
                    .map_or_else(|| default.to_string(), str::to_string);
                format!("{} [default: {shown}]", self.help)
            }
            None => self.help.to_string(),
        };

        let arg = Arg::new(self.path)
            .long(self.path)
            .help(help)
            .action(ArgAction::Set)
            .allow_negative_numbers(true);

        match self.transform {
            Transform::Identity => arg.value_parser(clap::value_parser!(String)),
            Transform::Integer => arg.value_parser(clap::value_parser!(i64)),
            Transform::ExistingFile => arg
                .value_name("PATH")
                .value_parser(file::resolve_existing),
        }
    }

    fn read(&self, matches: &ArgMatches) -> Option<Value> {
        match self.transform {
            Transform::Identity => matches
                .get_one::<String>(self.path)
                .map(|text| Value::String(text.clone())),
            Transform::Integer => matches.get_one::<i64>(self.path).map(|&n| Value::from(n)),
            Transform::ExistingFile => matches
                .get_one::<PathBuf>(self.path)
                .map(|path| Value::String(path.to_string_lossy().into_owned())),
        }
    }
}

/// The commands of the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Encode a URL as an lnurl
    Encode,
    /// Decode an lnurl back into a URL
    Decode,
    /// Generate an API key
    GenerateApiKey,
    /// Generate a single-use URL
    GenerateNewUrl,
    /// Start the server
    Server,
}

impl CommandKind {
    /// Every command, in help order.
    pub const ALL: [Self; 5] = [
        Self::Encode,
        Self::Decode,
        Self::GenerateApiKey,
        Self::GenerateNewUrl,
        Self::Server,
    ];

    /// Name used on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Encode => "encode",
            Self::Decode => "decode",
            Self::GenerateApiKey => "generateApiKey",
            Self::GenerateNewUrl => "generateNewUrl",
            Self::Server => "server",
        }
    }

    /// Parses a command name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    const fn about(self) -> &'static str {
        match self {
            Self::Encode => "Encode a url as a bech32-encoded string",
            Self::Decode => "Decode a bech32-encoded lnurl",
            Self::GenerateApiKey => "Generate a new API key for your lnurl server",
            Self::GenerateNewUrl => "Generate a new URL for a single-use lnurl",
            Self::Server => {
                "Start an lnurl application server (needs a service with an HTTP listener; the bundled service only validates the configuration)"
            }
        }
    }

    const fn positional(self) -> Option<&'static str> {
        match self {
            Self::Encode => Some("The unencoded value to be encoded"),
            Self::Decode => Some("The encoded value to be decoded"),
            _ => None,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Flags of one command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSchema {
    /// Which command
    pub kind: CommandKind,
    /// Declared flags; paths are unique within a command
    pub flags: Vec<FlagDeclaration>,
}

impl CommandSchema {
    /// Looks up a flag by path.
    #[must_use]
    pub fn flag(&self, path: &str) -> Option<&FlagDeclaration> {
        self.flags.iter().find(|flag| flag.path == path)
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(self.kind.name()).about(self.kind.about());
        if let Some(help) = self.kind.positional() {
            command = command.arg(Arg::new(field::VALUE).help(help));
        }
        self.flags
            .iter()
            .fold(command, |command, flag| command.arg(flag.to_arg()))
    }
}

/// A parsed command invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Selected command
    pub command: CommandKind,
    /// Positional value of `encode` / `decode`
    pub positional: Option<String>,
    /// Flag values and defaults, keyed by dotted path
    pub options: OptionBag,
    /// Verbose logging requested
    pub verbose: bool,
}

/// Flag declarations of every command.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagSchema {
    commands: Vec<CommandSchema>,
}

impl FlagSchema {
    /// Declares all commands, taking flag defaults from `defaults`.
    #[must_use]
    pub fn new(defaults: &Defaults) -> Self {
        let commands = CommandKind::ALL
            .into_iter()
            .map(|kind| CommandSchema {
                kind,
                flags: declare(kind, defaults),
            })
            .collect();
        Self { commands }
    }

    /// Returns the schema of one command.
    #[must_use]
    pub fn command(&self, kind: CommandKind) -> Option<&CommandSchema> {
        self.commands.iter().find(|schema| schema.kind == kind)
    }

    /// Builds the clap command tree.
    #[must_use]
    pub fn to_clap(&self) -> Command {
        let root = Command::new(BIN_NAME)
            .version(env!("CARGO_PKG_VERSION"))
            .about("Compose lnurl configuration and run lnurl operations")
            .subcommand_required(true)
            .arg_required_else_help(true)
            .arg(
                Arg::new(VERBOSE)
                    .long(VERBOSE)
                    .short('v')
                    .help("Enable verbose logging")
                    .action(ArgAction::SetTrue)
                    .global(true),
            );

        self.commands
            .iter()
            .fold(root, |root, schema| root.subcommand(schema.to_command()))
    }

    /// Parses the process arguments.
    ///
    /// # Errors
    ///
    /// Returns a clap error for usage problems, including path flags that do
    /// not point at an existing file.
    pub fn parse_args(&self) -> Result<Invocation, clap::Error> {
        self.parse_from(std::env::args_os())
    }

    /// Parses arguments from an iterator (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns a clap error for usage problems, including path flags that do
    /// not point at an existing file.
    pub fn parse_from<I, T>(&self, args: I) -> Result<Invocation, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut clap = self.to_clap();
        let matches = clap.try_get_matches_from_mut(args)?;

        let Some((name, sub)) = matches.subcommand() else {
            return Err(clap.error(ErrorKind::MissingSubcommand, "a command is required"));
        };
        let Some(schema) = CommandKind::from_name(name).and_then(|kind| self.command(kind))
        else {
            return Err(clap.error(
                ErrorKind::InvalidSubcommand,
                format!("unrecognized command '{name}'"),
            ));
        };

        let positional = schema
            .kind
            .positional()
            .and_then(|_| sub.get_one::<String>(field::VALUE).cloned());

        let mut options = OptionBag::new();
        for flag in &schema.flags {
            if let Some(value) = flag.read(sub).or_else(|| flag.default.clone()) {
                options.insert(flag.path, value);
            }
        }

        Ok(Invocation {
            command: schema.kind,
            positional,
            options,
            verbose: matches.get_flag(VERBOSE) || sub.get_flag(VERBOSE),
        })
    }
}

fn declare(kind: CommandKind, defaults: &Defaults) -> Vec<FlagDeclaration> {
    match kind {
        CommandKind::Encode | CommandKind::Decode => Vec::new(),
        CommandKind::GenerateApiKey => vec![
            FlagDeclaration::new(field::ENCODING, "Encoding to use for ID and key (hex or base64)")
                .with_default(defaults.api_key_value(field::ENCODING)),
            FlagDeclaration::new(field::NUM_BYTES_ID, "Number of random bytes to generate for ID")
                .with_default(defaults.api_key_value(field::NUM_BYTES_ID)),
            FlagDeclaration::new(field::NUM_BYTES_KEY, "Number of random bytes to generate for key")
                .with_default(defaults.api_key_value(field::NUM_BYTES_KEY)),
        ],
        CommandKind::GenerateNewUrl => {
            let mut flags = vec![
                FlagDeclaration::new(field::TAG, "The tag of the new URL (e.g. withdrawRequest)"),
                FlagDeclaration::new(
                    field::USES,
                    "Number of times the new URL can be used (0 = unlimited)",
                ),
                FlagDeclaration::new(field::PARAMS, "JSON-encoded parameters of the new URL"),
            ];
            flags.extend(server_flags(defaults));
            flags.extend(store_flags(defaults));
            flags
        }
        CommandKind::Server => {
            let mut flags = server_flags(defaults);
            flags.extend([
                FlagDeclaration::new("auth.apiKeys", "List of API keys (JSON array)")
                    .with_default(defaults.server_value("auth.apiKeys")),
                FlagDeclaration::new(
                    "lightning.backend",
                    "Lightning backend name, or JSON-encoded backend descriptor",
                )
                .with_default(defaults.server_value("lightning.backend")),
                FlagDeclaration::new("lightning.config", "Lightning backend config (JSON)")
                    .with_default(defaults.server_value("lightning.config")),
            ]);
            flags.extend(store_flags(defaults));
            flags
        }
    }
}

fn server_flags(defaults: &Defaults) -> Vec<FlagDeclaration> {
    vec![
        FlagDeclaration::new(field::CONFIG_FILE, "Path to a JSON config file; replaces all other options")
            .with_transform(Transform::ExistingFile),
        FlagDeclaration::new("host", "The host for the web server")
            .with_default(defaults.server_value("host")),
        FlagDeclaration::new("port", "The port for the web server")
            .with_default(defaults.server_value("port"))
            .with_transform(Transform::Integer),
        FlagDeclaration::new("protocol", "The protocol used to derive the public URL")
            .with_default(defaults.server_value("protocol")),
        FlagDeclaration::new(
            "url",
            "The URL where the server is externally reachable [default: protocol://host:port]",
        ),
        FlagDeclaration::new("endpoint", "The URI path of the lnurl endpoint")
            .with_default(defaults.server_value("endpoint")),
    ]
}

fn store_flags(defaults: &Defaults) -> [FlagDeclaration; 2] {
    [
        FlagDeclaration::new(
            "store.backend",
            "Store backend name, or JSON-encoded backend descriptor",
        )
        .with_default(defaults.server_value("store.backend")),
        FlagDeclaration::new("store.config", "Store backend config (JSON)")
            .with_default(defaults.server_value("store.config")),
    ]
}
