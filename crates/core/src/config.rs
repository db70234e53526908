use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub classifier: ClassifierConfig,
    pub directory: DirectoryConfig,
    pub connector: ConnectorConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// External intent classifier (LUIS-style ranked intents + entities).
#[derive(Clone, Debug)]
pub struct ClassifierConfig {
    pub endpoint: String,
    pub app_id: String,
    pub subscription_key: SecretString,
    pub timeout_secs: u64,
}

/// Remote enumeration backend. `RestProxy` talks to a thin REST facade with
/// credentials as query parameters; `ManagementApi` authorizes against the
/// cloud authority and calls the management endpoint directly. Which one runs
/// is a configuration concern, not a behavioral fork.
#[derive(Clone, Debug)]
pub struct DirectoryConfig {
    pub backend: DirectoryBackend,
    pub proxy_base_url: Option<String>,
    pub proxy_authorization: Option<SecretString>,
    pub authority_base_url: String,
    pub management_base_url: String,
    pub timeout_secs: u64,
}

/// Outbound reply delivery to the originating channel.
#[derive(Clone, Debug)]
pub struct ConnectorConfig {
    pub bearer_token: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryBackend {
    RestProxy,
    ManagementApi,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub classifier_endpoint: Option<String>,
    pub classifier_app_id: Option<String>,
    pub classifier_subscription_key: Option<String>,
    pub directory_backend: Option<DirectoryBackend>,
    pub directory_proxy_base_url: Option<String>,
    pub directory_proxy_authorization: Option<String>,
    pub connector_bearer_token: Option<String>,
    pub server_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://armbot.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            classifier: ClassifierConfig {
                endpoint: "https://api.cognitive.microsoft.com/luis/v1/application".to_string(),
                app_id: String::new(),
                subscription_key: String::new().into(),
                timeout_secs: 10,
            },
            directory: DirectoryConfig {
                backend: DirectoryBackend::RestProxy,
                proxy_base_url: None,
                proxy_authorization: None,
                authority_base_url: "https://login.microsoftonline.com".to_string(),
                management_base_url: "https://management.azure.com".to_string(),
                timeout_secs: 30,
            },
            connector: ConnectorConfig { bearer_token: None, timeout_secs: 10 },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 3978,
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for DirectoryBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rest_proxy" => Ok(Self::RestProxy),
            "management_api" => Ok(Self::ManagementApi),
            other => Err(ConfigError::Validation(format!(
                "unsupported directory backend `{other}` (expected rest_proxy|management_api)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    /// Load order: defaults, then the TOML file (with `${ENV}` interpolation),
    /// then `ARMBOT_*` environment overrides, then programmatic overrides,
    /// then a validation pass.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("armbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(classifier) = patch.classifier {
            if let Some(endpoint) = classifier.endpoint {
                self.classifier.endpoint = endpoint;
            }
            if let Some(app_id) = classifier.app_id {
                self.classifier.app_id = app_id;
            }
            if let Some(subscription_key_value) = classifier.subscription_key {
                self.classifier.subscription_key = secret_value(subscription_key_value);
            }
            if let Some(timeout_secs) = classifier.timeout_secs {
                self.classifier.timeout_secs = timeout_secs;
            }
        }

        if let Some(directory) = patch.directory {
            if let Some(backend) = directory.backend {
                self.directory.backend = backend;
            }
            if let Some(proxy_base_url) = directory.proxy_base_url {
                self.directory.proxy_base_url = Some(proxy_base_url);
            }
            if let Some(proxy_authorization_value) = directory.proxy_authorization {
                self.directory.proxy_authorization = Some(secret_value(proxy_authorization_value));
            }
            if let Some(authority_base_url) = directory.authority_base_url {
                self.directory.authority_base_url = authority_base_url;
            }
            if let Some(management_base_url) = directory.management_base_url {
                self.directory.management_base_url = management_base_url;
            }
            if let Some(timeout_secs) = directory.timeout_secs {
                self.directory.timeout_secs = timeout_secs;
            }
        }

        if let Some(connector) = patch.connector {
            if let Some(bearer_token_value) = connector.bearer_token {
                self.connector.bearer_token = Some(secret_value(bearer_token_value));
            }
            if let Some(timeout_secs) = connector.timeout_secs {
                self.connector.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ARMBOT_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("ARMBOT_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("ARMBOT_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("ARMBOT_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("ARMBOT_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ARMBOT_CLASSIFIER_ENDPOINT") {
            self.classifier.endpoint = value;
        }
        if let Some(value) = read_env("ARMBOT_CLASSIFIER_APP_ID") {
            self.classifier.app_id = value;
        }
        if let Some(value) = read_env("ARMBOT_CLASSIFIER_SUBSCRIPTION_KEY") {
            self.classifier.subscription_key = secret_value(value);
        }
        if let Some(value) = read_env("ARMBOT_CLASSIFIER_TIMEOUT_SECS") {
            self.classifier.timeout_secs = parse_u64("ARMBOT_CLASSIFIER_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ARMBOT_DIRECTORY_BACKEND") {
            self.directory.backend = value.parse()?;
        }
        if let Some(value) = read_env("ARMBOT_DIRECTORY_PROXY_BASE_URL") {
            self.directory.proxy_base_url = Some(value);
        }
        if let Some(value) = read_env("ARMBOT_DIRECTORY_PROXY_AUTHORIZATION") {
            self.directory.proxy_authorization = Some(secret_value(value));
        }
        if let Some(value) = read_env("ARMBOT_DIRECTORY_AUTHORITY_BASE_URL") {
            self.directory.authority_base_url = value;
        }
        if let Some(value) = read_env("ARMBOT_DIRECTORY_MANAGEMENT_BASE_URL") {
            self.directory.management_base_url = value;
        }
        if let Some(value) = read_env("ARMBOT_DIRECTORY_TIMEOUT_SECS") {
            self.directory.timeout_secs = parse_u64("ARMBOT_DIRECTORY_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ARMBOT_CONNECTOR_BEARER_TOKEN") {
            self.connector.bearer_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("ARMBOT_CONNECTOR_TIMEOUT_SECS") {
            self.connector.timeout_secs = parse_u64("ARMBOT_CONNECTOR_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ARMBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("ARMBOT_SERVER_PORT") {
            self.server.port = parse_u16("ARMBOT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("ARMBOT_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port = parse_u16("ARMBOT_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("ARMBOT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("ARMBOT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("ARMBOT_LOGGING_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("ARMBOT_LOGGING_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(endpoint) = overrides.classifier_endpoint {
            self.classifier.endpoint = endpoint;
        }
        if let Some(app_id) = overrides.classifier_app_id {
            self.classifier.app_id = app_id;
        }
        if let Some(subscription_key) = overrides.classifier_subscription_key {
            self.classifier.subscription_key = secret_value(subscription_key);
        }
        if let Some(backend) = overrides.directory_backend {
            self.directory.backend = backend;
        }
        if let Some(proxy_base_url) = overrides.directory_proxy_base_url {
            self.directory.proxy_base_url = Some(proxy_base_url);
        }
        if let Some(proxy_authorization) = overrides.directory_proxy_authorization {
            self.directory.proxy_authorization = Some(secret_value(proxy_authorization));
        }
        if let Some(bearer_token) = overrides.connector_bearer_token {
            self.connector.bearer_token = Some(secret_value(bearer_token));
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_classifier(&self.classifier)?;
        validate_directory(&self.directory)?;
        validate_connector(&self.connector)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("armbot.toml"), PathBuf::from("config/armbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_classifier(classifier: &ClassifierConfig) -> Result<(), ConfigError> {
    if !is_http_url(&classifier.endpoint) {
        return Err(ConfigError::Validation(
            "classifier.endpoint must start with http:// or https://".to_string(),
        ));
    }

    if classifier.app_id.trim().is_empty() {
        return Err(ConfigError::Validation("classifier.app_id is required".to_string()));
    }

    if classifier.subscription_key.expose_secret().is_empty() {
        return Err(ConfigError::Validation(
            "classifier.subscription_key is required".to_string(),
        ));
    }

    if classifier.timeout_secs == 0 || classifier.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "classifier.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_directory(directory: &DirectoryConfig) -> Result<(), ConfigError> {
    match directory.backend {
        DirectoryBackend::RestProxy => match &directory.proxy_base_url {
            Some(base_url) if is_http_url(base_url) => {}
            Some(_) => {
                return Err(ConfigError::Validation(
                    "directory.proxy_base_url must start with http:// or https://".to_string(),
                ));
            }
            None => {
                return Err(ConfigError::Validation(
                    "directory.backend is rest_proxy but directory.proxy_base_url is not set"
                        .to_string(),
                ));
            }
        },
        DirectoryBackend::ManagementApi => {
            if !is_http_url(&directory.authority_base_url) {
                return Err(ConfigError::Validation(
                    "directory.authority_base_url must start with http:// or https://".to_string(),
                ));
            }
            if !is_http_url(&directory.management_base_url) {
                return Err(ConfigError::Validation(
                    "directory.management_base_url must start with http:// or https://".to_string(),
                ));
            }
        }
    }

    if directory.timeout_secs == 0 || directory.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "directory.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_connector(connector: &ConnectorConfig) -> Result<(), ConfigError> {
    if connector.timeout_secs == 0 || connector.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "connector.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.health_check_port == server.port {
        return Err(ConfigError::Validation(
            "server.health_check_port must differ from server.port".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    classifier: Option<ClassifierPatch>,
    directory: Option<DirectoryPatch>,
    connector: Option<ConnectorPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ClassifierPatch {
    endpoint: Option<String>,
    app_id: Option<String>,
    subscription_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DirectoryPatch {
    backend: Option<DirectoryBackend>,
    proxy_base_url: Option<String>,
    proxy_authorization: Option<String>,
    authority_base_url: Option<String>,
    management_base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ConnectorPatch {
    bearer_token: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
