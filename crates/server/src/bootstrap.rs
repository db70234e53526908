use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use armbot_agent::{
    ArmDirectory, DialogStateMachine, LuisClassifier, ResourceDirectory, RestProxyDirectory,
};
use armbot_connector::{HttpReplyDelivery, ReplyDelivery};
use armbot_core::config::{AppConfig, ConfigError, DirectoryBackend, LoadOptions};
use armbot_db::{
    connect, migrations, ConversationStateRepository, DbPool, SqlConversationStateRepository,
};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub machine: Arc<DialogStateMachine>,
    pub states: Arc<dyn ConversationStateRepository>,
    pub replies: Arc<dyn ReplyDelivery>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("client construction failed: {0}")]
    Client(String),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let classifier = LuisClassifier::new(
        config.classifier.endpoint.clone(),
        config.classifier.app_id.clone(),
        config.classifier.subscription_key.clone(),
        Duration::from_secs(config.classifier.timeout_secs),
    )
    .map_err(|error| BootstrapError::Client(error.to_string()))?;

    let directory = build_directory(&config)?;
    info!(
        event_name = "system.bootstrap.directory_selected",
        correlation_id = "bootstrap",
        backend = ?config.directory.backend,
        "resource directory backend initialized"
    );

    let replies = HttpReplyDelivery::new(
        Duration::from_secs(config.connector.timeout_secs),
        config.connector.bearer_token.clone(),
    )
    .map_err(|error| BootstrapError::Client(error.to_string()))?;

    let machine = DialogStateMachine::new(Arc::new(classifier), directory);
    let states = SqlConversationStateRepository::new(db_pool.clone());

    Ok(Application {
        config,
        db_pool,
        machine: Arc::new(machine),
        states: Arc::new(states),
        replies: Arc::new(replies),
    })
}

fn build_directory(config: &AppConfig) -> Result<Arc<dyn ResourceDirectory>, BootstrapError> {
    let timeout = Duration::from_secs(config.directory.timeout_secs);

    match config.directory.backend {
        DirectoryBackend::RestProxy => {
            // validate() guarantees the base url is present for this backend.
            let base_url = config
                .directory
                .proxy_base_url
                .clone()
                .ok_or_else(|| BootstrapError::Client("directory.proxy_base_url unset".into()))?;
            let directory = RestProxyDirectory::new(
                base_url,
                config.directory.proxy_authorization.clone(),
                timeout,
            )
            .map_err(|error| BootstrapError::Client(error.to_string()))?;
            Ok(Arc::new(directory))
        }
        DirectoryBackend::ManagementApi => {
            let directory = ArmDirectory::new(
                config.directory.authority_base_url.clone(),
                config.directory.management_base_url.clone(),
                timeout,
            )
            .map_err(|error| BootstrapError::Client(error.to_string()))?;
            Ok(Arc::new(directory))
        }
    }
}
