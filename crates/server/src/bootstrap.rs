use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use retrospect_agent::llm::{CompletionError, CompletionService, DeepSeekClient};
use retrospect_core::{AppConfig, ConfigError, EventSink, LoadOptions, TracingEventSink};

use crate::routes::ApiState;
use crate::sessions::SessionStore;

pub struct Application {
    pub config: AppConfig,
    pub api_state: ApiState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("completion client construction failed: {0}")]
    Completion(#[from] CompletionError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let service: Arc<dyn CompletionService> = Arc::new(DeepSeekClient::from_config(&config.llm)?);
    let events: Arc<dyn EventSink> = Arc::new(TracingEventSink);

    let api_state = ApiState {
        store: Arc::new(SessionStore::new()),
        service,
        interview: config.interview.clone(),
        events,
    };

    info!(
        event_name = "system.bootstrap.completion_client_ready",
        provider = ?config.llm.provider,
        model = %config.llm.model,
        "completion client constructed"
    );

    Ok(Application { config, api_state })
}
