use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Serialize;

use retrospect_core::{LlmConfig, LlmProvider};

#[derive(Clone)]
pub struct HealthState {
    llm: LlmConfig,
    sessions: std::sync::Arc<crate::sessions::SessionStore>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub completion_endpoint: HealthCheck,
    pub active_sessions: usize,
    pub checked_at: String,
}

pub fn router(llm: LlmConfig, sessions: std::sync::Arc<crate::sessions::SessionStore>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { llm, sessions })
}

/// Reports configuration readiness only. No live completion call is made;
/// outages surface per turn as retryable 502s instead.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let completion_endpoint = completion_check(&state.llm);
    let ready = completion_endpoint.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "retrospect-server runtime initialized".to_string(),
        },
        completion_endpoint,
        active_sessions: state.sessions.len(),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn completion_check(llm: &LlmConfig) -> HealthCheck {
    let keyed = llm
        .api_key
        .as_ref()
        .map(|key| !key.expose_secret().is_empty())
        .unwrap_or(false);

    if llm.provider == LlmProvider::Ollama || keyed {
        HealthCheck {
            status: "ready",
            detail: format!("{} via {}", llm.model, llm.base_url),
        }
    } else {
        HealthCheck {
            status: "degraded",
            detail: "completion api key is not configured".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::Json;

    use retrospect_core::{AppConfig, LlmProvider};

    use crate::health::{health, HealthState};
    use crate::sessions::SessionStore;

    #[tokio::test]
    async fn health_degrades_without_an_api_key() {
        let config = AppConfig::default();
        let state =
            HealthState { llm: config.llm.clone(), sessions: Arc::new(SessionStore::new()) };

        let (status, Json(payload)) = health(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.active_sessions, 0);
    }

    #[tokio::test]
    async fn local_provider_is_ready_without_a_key() {
        let mut config = AppConfig::default();
        config.llm.provider = LlmProvider::Ollama;
        config.llm.base_url = "http://localhost:11434".to_string();
        let state = HealthState { llm: config.llm, sessions: Arc::new(SessionStore::new()) };

        let (status, Json(payload)) = health(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(payload.completion_endpoint.detail.contains("localhost"));
    }
}
