//! Tests for command dispatch.

use std::fs;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value, json};
use tempfile::TempDir;

use crate::config::{ConfigError, Defaults, FlagSchema, Invocation};
use crate::input::StdinPayload;
use crate::service::{
    ApiKey, ApiKeyOptions, Backend, FileStore, KeyEncoding, LocalService, NewUrl, NewUrlOptions,
    Server, ServerConfig, ServerOptions, Service, ServiceError,
};

use super::{CommandError, Dispatcher, Outcome, parse_integer, parse_params};

/// A call received by the fake service.
#[derive(Debug, Clone, PartialEq)]
enum Call {
    Encode(String),
    Decode(String),
    GenerateApiKey(ApiKeyOptions),
    CreateServer(Box<ServerConfig>, ServerOptions),
    GenerateNewUrl {
        tag: String,
        params: Map<String, Value>,
        uses: Option<u64>,
    },
    Run,
}

type Calls = Arc<Mutex<Vec<Call>>>;

/// Service that records calls and returns canned results.
#[derive(Debug, Default)]
struct FakeService {
    defaults: Defaults,
    calls: Calls,
}

impl FakeService {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Service for FakeService {
    type Server = FakeServer;

    fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    fn encode(&self, value: &str) -> Result<String, ServiceError> {
        self.record(Call::Encode(value.to_string()));
        Ok(format!("ENCODED:{value}"))
    }

    fn decode(&self, value: &str) -> Result<String, ServiceError> {
        self.record(Call::Decode(value.to_string()));
        if value.starts_with("LNURL1") {
            Ok(format!("decoded:{value}"))
        } else {
            Err(ServiceError::Decode("invalid checksum".to_string()))
        }
    }

    fn generate_api_key(&self, options: &ApiKeyOptions) -> Result<ApiKey, ServiceError> {
        self.record(Call::GenerateApiKey(options.clone()));
        Ok(ApiKey {
            id: "b6cb8e81e3".to_string(),
            key: "74a8f70391e48b7a35c676e5e448eda034db88c654213feff7b80228dcad7fa0".to_string(),
            encoding: KeyEncoding::Hex,
        })
    }

    fn create_server(
        &self,
        config: ServerConfig,
        options: ServerOptions,
    ) -> Result<FakeServer, ServiceError> {
        self.record(Call::CreateServer(Box::new(config), options));
        Ok(FakeServer {
            calls: Arc::clone(&self.calls),
        })
    }
}

#[derive(Debug)]
struct FakeServer {
    calls: Calls,
}

impl Server for FakeServer {
    async fn generate_new_url(
        &self,
        tag: &str,
        params: Map<String, Value>,
        options: NewUrlOptions,
    ) -> Result<NewUrl, ServiceError> {
        self.calls.lock().unwrap().push(Call::GenerateNewUrl {
            tag: tag.to_string(),
            params,
            uses: options.uses,
        });
        if tag == "rejectedRequest" {
            return Err(ServiceError::InvalidInput(format!("unknown tag '{tag}'")));
        }
        Ok(NewUrl {
            encoded: "LNURL1DP68GURN8GHJ7".to_string(),
            secret: "c2e0e6b5".to_string(),
            url: "http://localhost:3000/lnurl?q=c2e0e6b5".to_string(),
        })
    }

    async fn run(self) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push(Call::Run);
        Ok(())
    }
}

/// Helper to parse CLI args from a slice
fn invocation(args: &[&str]) -> Invocation {
    let mut full_args = vec!["lnurl"];
    full_args.extend(args);
    FlagSchema::new(&Defaults::builtin())
        .parse_from(full_args)
        .unwrap()
}

fn dispatcher(stdin: StdinPayload) -> Dispatcher<FakeService> {
    Dispatcher::new(FakeService::default(), stdin)
}

async fn run(args: &[&str]) -> (Result<Outcome, CommandError>, Vec<Call>) {
    let dispatcher = dispatcher(StdinPayload::none());
    let result = dispatcher.dispatch(invocation(args)).await;
    (result, dispatcher.service().calls())
}

fn created_config(calls: &[Call]) -> (&ServerConfig, ServerOptions) {
    calls
        .iter()
        .find_map(|call| match call {
            Call::CreateServer(config, options) => Some((config.as_ref(), *options)),
            _ => None,
        })
        .expect("server was not created")
}

fn write_config(content: &Value) -> (TempDir, String) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lnurl.json");
    fs::write(&path, content.to_string()).unwrap();
    (dir, path.to_string_lossy().into_owned())
}

mod single_value {
    use super::*;

    #[tokio::test]
    async fn encode_delegates_positional_value() {
        let (result, calls) = run(&["encode", "https://service.com/api?q=1"]).await;

        assert_eq!(
            result.unwrap(),
            Outcome::Text("ENCODED:https://service.com/api?q=1".to_string())
        );
        assert_eq!(
            calls,
            vec![Call::Encode("https://service.com/api?q=1".to_string())]
        );
    }

    #[tokio::test]
    async fn piped_input_replaces_positional() {
        let dispatcher = dispatcher(StdinPayload::from_text("abc\n"));

        let result = dispatcher.dispatch(invocation(&["encode", "xyz"])).await;

        assert_eq!(result.unwrap(), Outcome::Text("ENCODED:abc".to_string()));
        assert_eq!(dispatcher.service().calls(), vec![Call::Encode("abc".to_string())]);
    }

    #[tokio::test]
    async fn piped_input_is_enough_for_decode() {
        let dispatcher = dispatcher(StdinPayload::from_text("LNURL1ABC\n"));

        let result = dispatcher.dispatch(invocation(&["decode"])).await;

        assert_eq!(result.unwrap(), Outcome::Text("decoded:LNURL1ABC".to_string()));
    }

    #[tokio::test]
    async fn missing_value_is_rejected_without_a_call() {
        let (result, calls) = run(&["encode"]).await;

        assert!(matches!(
            result,
            Err(CommandError::MissingRequired { field: "value" })
        ));
        assert!(calls.is_empty());
    }

    #[tokio::test]
    async fn decoder_errors_surface_unchanged() {
        let (result, calls) = run(&["decode", "garbage"]).await;

        let error = result.unwrap_err();
        assert!(matches!(error, CommandError::Service(ServiceError::Decode(_))));
        assert_eq!(error.to_string(), "Failed to decode value: invalid checksum");
        assert_eq!(calls, vec![Call::Decode("garbage".to_string())]);
    }

    #[test]
    fn text_output_has_no_trailing_newline() {
        let rendered = Outcome::Text("LNURL1".to_string()).render().unwrap();

        assert_eq!(rendered.as_deref(), Some("LNURL1"));
    }
}

mod generate_api_key {
    use super::*;

    #[tokio::test]
    async fn defaults_are_used() {
        let (result, calls) = run(&["generateApiKey"]).await;

        assert_eq!(
            calls,
            vec![Call::GenerateApiKey(ApiKeyOptions {
                encoding: "hex".to_string(),
                num_bytes: crate::service::NumBytes { id: 5, key: 32 },
            })]
        );
        let Outcome::Json(value) = result.unwrap() else {
            panic!("expected JSON output");
        };
        assert_eq!(value["id"], json!("b6cb8e81e3"));
        assert_eq!(value["encoding"], json!("hex"));
    }

    #[tokio::test]
    async fn byte_counts_are_parsed_as_integers() {
        let (_, calls) = run(&[
            "generateApiKey",
            "--encoding",
            "base64",
            "--numBytes.id",
            "8",
            "--numBytes.key",
            "16",
        ])
        .await;

        assert_eq!(
            calls,
            vec![Call::GenerateApiKey(ApiKeyOptions {
                encoding: "base64".to_string(),
                num_bytes: crate::service::NumBytes { id: 8, key: 16 },
            })]
        );
    }

    #[tokio::test]
    async fn non_integer_byte_count_is_rejected() {
        let (result, calls) = run(&["generateApiKey", "--numBytes.key", "lots"]).await;

        assert!(matches!(
            result,
            Err(CommandError::InvalidInteger { option: "numBytes.key", .. })
        ));
        assert!(calls.is_empty());
    }

    #[test]
    fn json_output_is_pretty_printed() {
        let rendered = Outcome::Json(json!({"id": "a", "key": "b"}))
            .render()
            .unwrap()
            .unwrap();

        assert_eq!(rendered, "{\n  \"id\": \"a\",\n  \"key\": \"b\"\n}\n");
    }
}

mod generate_new_url {
    use super::*;

    #[tokio::test]
    async fn withdraw_request_with_unlimited_uses() {
        let (result, calls) = run(&[
            "generateNewUrl",
            "--tag",
            "withdrawRequest",
            "--uses",
            "0",
            "--params",
            r#"{"minWithdrawable":1000,"maxWithdrawable":5000}"#,
            "--store.backend",
            "sqlite",
        ])
        .await;

        let Outcome::Json(value) = result.unwrap() else {
            panic!("expected JSON output");
        };
        assert_eq!(value["encoded"], json!("LNURL1DP68GURN8GHJ7"));
        assert_eq!(value["secret"], json!("c2e0e6b5"));
        assert!(value["url"].as_str().unwrap().contains("?q="));

        let (config, options) = created_config(&calls);
        assert_eq!(config.store.backend, Backend::Name("sqlite".to_string()));
        assert_eq!(options, ServerOptions::DETACHED);
        assert_eq!(
            calls.last(),
            Some(&Call::GenerateNewUrl {
                tag: "withdrawRequest".to_string(),
                params: serde_json::from_value(
                    json!({"minWithdrawable": 1000, "maxWithdrawable": 5000})
                )
                .unwrap(),
                uses: Some(0),
            })
        );
    }

    #[tokio::test]
    async fn memory_store_is_rejected_without_a_call() {
        let (result, calls) = run(&[
            "generateNewUrl",
            "--tag",
            "payRequest",
            "--store.backend",
            "memory",
        ])
        .await;

        let error = result.unwrap_err();
        assert!(matches!(error, CommandError::EphemeralStore));
        assert!(error.to_string().contains("memory"));
        assert!(calls.is_empty());
    }

    #[tokio::test]
    async fn default_store_is_memory_and_rejected() {
        let (result, calls) = run(&["generateNewUrl", "--tag", "payRequest"]).await;

        assert!(matches!(result, Err(CommandError::EphemeralStore)));
        assert!(calls.is_empty());
    }

    #[tokio::test]
    async fn tag_is_required() {
        let (result, calls) = run(&["generateNewUrl", "--store.backend", "sqlite"]).await;

        assert!(matches!(
            result,
            Err(CommandError::MissingRequired { field: "tag" })
        ));
        assert!(calls.is_empty());
    }

    #[tokio::test]
    async fn non_integer_uses_is_rejected() {
        let (result, _) = run(&[
            "generateNewUrl",
            "--tag",
            "payRequest",
            "--uses",
            "1.5",
            "--store.backend",
            "sqlite",
        ])
        .await;

        assert!(matches!(
            result,
            Err(CommandError::InvalidInteger { option: "uses", ref value }) if value == "1.5"
        ));
    }

    #[tokio::test]
    async fn malformed_params_are_rejected() {
        let (result, calls) = run(&[
            "generateNewUrl",
            "--tag",
            "payRequest",
            "--params",
            "{minSendable:1}",
            "--store.backend",
            "sqlite",
        ])
        .await;

        assert!(matches!(
            result,
            Err(CommandError::InvalidJson { option: "params", .. })
        ));
        assert!(calls.is_empty());
    }

    #[tokio::test]
    async fn store_config_string_is_parsed() {
        let (_, calls) = run(&[
            "generateNewUrl",
            "--tag",
            "payRequest",
            "--store.backend",
            "knex",
            "--store.config",
            r#"{"client":"postgres"}"#,
        ])
        .await;

        let (config, _) = created_config(&calls);
        assert_eq!(config.store.config.get("client"), Some(&json!("postgres")));
        assert_eq!(config.lightning, None);
    }

    #[tokio::test]
    async fn config_file_replaces_flags() {
        let (_dir, path) = write_config(&json!({
            "port": 4000,
            "store": {"backend": "knex", "config": {"client": "sqlite3"}},
        }));

        let (result, calls) = run(&[
            "generateNewUrl",
            "--tag",
            "payRequest",
            "--host",
            "flag.example.com",
            "--store.backend",
            "memory",
            "--configFile",
            &path,
        ])
        .await;

        assert!(result.is_ok());
        let (config, _) = created_config(&calls);
        assert_eq!(config.store.backend, Backend::Name("knex".to_string()));
        assert_eq!(config.port, 4000);
        assert_eq!(config.host, "localhost");
    }

    #[tokio::test]
    async fn memory_store_from_config_file_is_rejected() {
        let (_dir, path) = write_config(&json!({"store": {"backend": "memory"}}));

        let (result, calls) = run(&[
            "generateNewUrl",
            "--tag",
            "payRequest",
            "--store.backend",
            "sqlite",
            "--configFile",
            &path,
        ])
        .await;

        assert!(matches!(result, Err(CommandError::EphemeralStore)));
        assert!(calls.is_empty());
    }

    #[tokio::test]
    async fn service_rejection_is_reported() {
        let (result, calls) = run(&[
            "generateNewUrl",
            "--tag",
            "rejectedRequest",
            "--store.backend",
            "sqlite",
        ])
        .await;

        let error = result.unwrap_err();
        assert_eq!(error.to_string(), "Invalid input: unknown tag 'rejectedRequest'");
        assert_eq!(calls.len(), 2);
    }
}

mod server {
    use super::*;

    #[tokio::test]
    async fn groups_are_normalized_and_server_runs() {
        let (result, calls) = run(&[
            "server",
            "--port",
            "8080",
            "--auth.apiKeys",
            r#"[{"id":"b6cb8e81e3","key":"74a8","encoding":"hex"}]"#,
            "--lightning.backend",
            "lnd",
            "--lightning.config",
            r#"{"hostname":"127.0.0.1:8080"}"#,
            "--store.backend",
            "knex",
        ])
        .await;

        assert_eq!(result.unwrap(), Outcome::Stopped);
        let (config, options) = created_config(&calls);
        assert_eq!(options, ServerOptions::SERVE);
        assert_eq!(config.port, 8080);
        assert_eq!(config.auth.api_keys.len(), 1);
        assert_eq!(config.auth.api_keys[0].id, "b6cb8e81e3");
        let lightning = config.lightning.as_ref().unwrap();
        assert_eq!(lightning.backend, Backend::Name("lnd".to_string()));
        assert_eq!(lightning.config.get("hostname"), Some(&json!("127.0.0.1:8080")));
        assert_eq!(calls.last(), Some(&Call::Run));
    }

    #[tokio::test]
    async fn defaults_fill_every_group() {
        let (_, calls) = run(&["server"]).await;

        let (config, _) = created_config(&calls);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 3000);
        assert_eq!(config.endpoint, "/lnurl");
        assert_eq!(config.url, None);
        assert!(config.auth.api_keys.is_empty());
        assert_eq!(
            config.lightning.as_ref().map(|l| l.backend.clone()),
            Some(Backend::Name("dummy".to_string()))
        );
        assert_eq!(config.store.backend, Backend::Name("memory".to_string()));
    }

    #[tokio::test]
    async fn backend_descriptor_is_decoded() {
        let (_, calls) = run(&["server", "--store.backend", r#"{"path":"./store.js"}"#]).await;

        let (config, _) = created_config(&calls);
        assert!(matches!(config.store.backend, Backend::Descriptor(ref d) if d["path"] == "./store.js"));
    }

    #[tokio::test]
    async fn malformed_group_json_fails_before_server_creation() {
        let (result, calls) = run(&["server", "--lightning.config", "{hostname"]).await;

        assert!(matches!(
            result,
            Err(CommandError::Config(ConfigError::InvalidJson { ref option, .. }))
                if option == "lightning.config"
        ));
        assert!(calls.is_empty());
    }

    #[tokio::test]
    async fn nested_config_file_is_authoritative() {
        let (_dir, path) = write_config(&json!({
            "host": "0.0.0.0",
            "url": "https://lnurl.example.com",
            "lightning": {"backend": "lnd", "config": "{\"cert\":\"/tls.cert\"}"},
            "store": {"backend": "knex"},
            "mock": true,
        }));

        let (_, calls) = run(&[
            "server",
            "--lightning.backend",
            "c-lightning",
            "--configFile",
            &path,
        ])
        .await;

        let (config, _) = created_config(&calls);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.url.as_deref(), Some("https://lnurl.example.com"));
        let lightning = config.lightning.as_ref().unwrap();
        assert_eq!(lightning.backend, Backend::Name("lnd".to_string()));
        assert_eq!(lightning.config.get("cert"), Some(&json!("/tls.cert")));
        assert!(config.store.config.is_empty());
        assert_eq!(config.extra.get("mock"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn config_file_port_as_text() {
        let (_dir, path) = write_config(&json!({"port": "4000"}));

        let (result, calls) = run(&["server", "--configFile", &path]).await;

        assert!(result.is_ok());
        assert_eq!(created_config(&calls).0.port, 4000);
    }

    #[tokio::test]
    async fn wrongly_shaped_config_is_rejected() {
        let (_dir, path) = write_config(&json!({"port": "not a port"}));

        let (result, calls) = run(&["server", "--configFile", &path]).await;

        assert!(matches!(
            result,
            Err(CommandError::Config(ConfigError::InvalidConfig(_)))
        ));
        assert!(calls.is_empty());
    }
}

mod bundled_service {
    use super::*;

    fn local_invocation(store_config: &Value) -> Invocation {
        let store_config = store_config.to_string();
        invocation(&[
            "generateNewUrl",
            "--tag",
            "withdrawRequest",
            "--uses",
            "0",
            "--params",
            r#"{"minWithdrawable":1000,"maxWithdrawable":5000}"#,
            "--store.backend",
            "file",
            "--store.config",
            &store_config,
        ])
    }

    #[tokio::test]
    async fn new_url_is_generated_and_persisted() {
        let dir = TempDir::new().unwrap();
        let store_path = dir.path().join("urls.json");
        let dispatcher = Dispatcher::new(LocalService::new(), StdinPayload::none());

        let result = dispatcher
            .dispatch(local_invocation(&json!({"path": store_path})))
            .await;

        let Outcome::Json(value) = result.unwrap() else {
            panic!("expected JSON output");
        };
        let secret = value["secret"].as_str().unwrap();
        assert_eq!(secret.len(), 64);
        assert_eq!(
            value["url"],
            json!(format!("http://localhost:3000/lnurl?q={secret}"))
        );
        assert_eq!(
            dispatcher.service().decode(value["encoded"].as_str().unwrap()).unwrap(),
            value["url"].as_str().unwrap()
        );

        let store = FileStore::new(&store_path);
        assert_eq!(store.len().await.unwrap(), 1);
        let stored = std::fs::read_to_string(&store_path).unwrap();
        assert!(stored.contains("\"minWithdrawable\": 1000"));
        assert!(stored.contains("\"remainingUses\": null"));
    }

    #[tokio::test]
    async fn unbundled_store_is_reported() {
        let dispatcher = Dispatcher::new(LocalService::new(), StdinPayload::none());

        let result = dispatcher
            .dispatch(invocation(&[
                "generateNewUrl",
                "--tag",
                "payRequest",
                "--store.backend",
                "sqlite",
            ]))
            .await;

        assert!(matches!(
            result,
            Err(CommandError::Service(ServiceError::UnsupportedBackend { group: "store", .. }))
        ));
    }

    #[tokio::test]
    async fn server_reports_missing_listener() {
        let dispatcher = Dispatcher::new(LocalService::new(), StdinPayload::none());

        let result = dispatcher.dispatch(invocation(&["server"])).await;

        assert!(matches!(
            result,
            Err(CommandError::Service(ServiceError::Unsupported { .. }))
        ));
    }
}

mod option_parsing {
    use super::*;

    #[test]
    fn integers_accept_numbers_and_text() {
        assert_eq!(parse_integer("uses", Some(json!(0))).unwrap(), Some(0));
        assert_eq!(parse_integer("uses", Some(json!(" 12 "))).unwrap(), Some(12));
        assert_eq!(parse_integer("uses", None).unwrap(), None);
    }

    #[test]
    fn negative_integers_are_rejected() {
        assert!(parse_integer("uses", Some(json!("-1"))).is_err());
        assert!(parse_integer("uses", Some(json!(-1))).is_err());
    }

    #[test]
    fn params_object_passes_through() {
        let params = parse_params(Some(json!({"k1": "abc"}))).unwrap();

        assert_eq!(params.get("k1"), Some(&json!("abc")));
    }

    #[test]
    fn params_default_to_empty() {
        assert!(parse_params(None).unwrap().is_empty());
    }

    #[test]
    fn params_must_be_an_object() {
        let result = parse_params(Some(json!("[1,2]")));

        assert!(matches!(
            result,
            Err(CommandError::InvalidType { option: "params", .. })
        ));
    }
}
