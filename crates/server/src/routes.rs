//! HTTP surface for interview sessions.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use retrospect_agent::extractor::SlotUpdate;
use retrospect_agent::llm::CompletionService;
use retrospect_agent::runtime::{AgentError, InterviewRuntime, TurnReply};
use retrospect_core::{
    CompletionSnapshot, DomainError, EventSink, Factsheet, InterviewConfig, Slot,
};

use crate::sessions::{SessionHandle, SessionStore};

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<SessionStore>,
    pub service: Arc<dyn CompletionService>,
    pub interview: InterviewConfig,
    pub events: Arc<dyn EventSink>,
}

impl ApiState {
    fn new_runtime(&self) -> InterviewRuntime {
        InterviewRuntime::new(self.service.clone(), &self.interview, self.events.clone())
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/interview/start", post(start_session))
        .route("/api/interview/{id}/message", post(send_message))
        .route("/api/interview/{id}/skip", post(skip_slot))
        .route("/api/interview/{id}/finish", post(finish_session))
        .route("/api/interview/{id}/reset", post(reset_session))
        .route("/api/interview/{id}/state", get(session_state))
        .route("/api/interview/{id}/slots/{key}", put(update_slot))
        .route("/api/interview/{id}", delete(delete_session))
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    UnknownSession(Uuid),
    StaleSession,
    Agent(AgentError),
}

impl From<AgentError> for ApiError {
    fn from(error: AgentError) -> Self {
        Self::Agent(error)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    retryable: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, retryable) = match &self {
            Self::UnknownSession(id) => {
                (StatusCode::NOT_FOUND, format!("no such session: {id}"), false)
            }
            Self::StaleSession => (
                StatusCode::CONFLICT,
                "session was reset while the turn was in flight".to_string(),
                false,
            ),
            Self::Agent(error) => match error {
                AgentError::QuestionGeneration(cause) => {
                    (StatusCode::BAD_GATEWAY, error.to_string(), cause.is_retryable())
                }
                AgentError::Domain(DomainError::SessionFinished) => {
                    (StatusCode::CONFLICT, error.to_string(), false)
                }
                AgentError::Domain(DomainError::UnknownSlot(_)) => {
                    (StatusCode::NOT_FOUND, error.to_string(), false)
                }
                AgentError::Domain(DomainError::NoFocusSlot) => {
                    (StatusCode::CONFLICT, error.to_string(), false)
                }
                AgentError::Domain(DomainError::InvariantViolation(_)) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, error.to_string(), false)
                }
                AgentError::NotStarted
                | AgentError::AlreadyStarted
                | AgentError::EmptyMessage => {
                    (StatusCode::BAD_REQUEST, error.to_string(), false)
                }
            },
        };

        (status, Json(ErrorBody { error: message, retryable })).into_response()
    }
}

#[derive(Serialize)]
struct TurnResponse {
    session_id: Uuid,
    message: String,
    finished: bool,
    updated_slots: Vec<SlotUpdate>,
    correction_applied: bool,
    round: u32,
    completion: CompletionSnapshot,
}

#[derive(Serialize)]
struct SessionView {
    session_id: Uuid,
    started: bool,
    finished: bool,
    round: u32,
    focus_slot: Option<String>,
    completion: CompletionSnapshot,
    slots: Vec<Slot>,
}

#[derive(Deserialize)]
struct MessageRequest {
    message: String,
}

#[derive(Deserialize)]
struct SlotEditRequest {
    value: Option<String>,
}

#[derive(Serialize)]
struct FactsheetResponse {
    session_id: Uuid,
    factsheet: Factsheet,
}

async fn start_session(
    State(state): State<ApiState>,
) -> Result<(StatusCode, Json<TurnResponse>), ApiError> {
    let mut runtime = state.new_runtime();
    let reply = runtime.start().await?;
    let (round, completion) = (runtime.state().conversation_round(), runtime.state().completion());

    let handle = state.store.create(runtime);
    info!(event_name = "api.session_started", session_id = %handle.id);

    Ok((
        StatusCode::CREATED,
        Json(turn_response(handle.id, reply, round, completion)),
    ))
}

async fn send_message(
    Path(id): Path<Uuid>,
    State(state): State<ApiState>,
    Json(body): Json<MessageRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let handle = require_session(&state, id)?;

    let (reply, round, completion) = {
        let mut runtime = handle.runtime.lock().await;
        let reply = runtime.send_message(&body.message).await?;
        (reply, runtime.state().conversation_round(), runtime.state().completion())
    };

    ensure_current(&state, &handle)?;
    Ok(Json(turn_response(id, reply, round, completion)))
}

async fn skip_slot(
    Path(id): Path<Uuid>,
    State(state): State<ApiState>,
) -> Result<Json<TurnResponse>, ApiError> {
    let handle = require_session(&state, id)?;

    let (reply, round, completion) = {
        let mut runtime = handle.runtime.lock().await;
        let reply = runtime.skip_current_slot().await?;
        (reply, runtime.state().conversation_round(), runtime.state().completion())
    };

    ensure_current(&state, &handle)?;
    Ok(Json(turn_response(id, reply, round, completion)))
}

async fn finish_session(
    Path(id): Path<Uuid>,
    State(state): State<ApiState>,
) -> Result<Json<FactsheetResponse>, ApiError> {
    let handle = require_session(&state, id)?;

    let factsheet = {
        let mut runtime = handle.runtime.lock().await;
        runtime.finish()?
    };

    ensure_current(&state, &handle)?;
    Ok(Json(FactsheetResponse { session_id: id, factsheet }))
}

/// Swaps in a freshly started runtime under the same session id. The old
/// handle stays valid for any in-flight turn, whose result is then rejected
/// as stale.
async fn reset_session(
    Path(id): Path<Uuid>,
    State(state): State<ApiState>,
) -> Result<Json<TurnResponse>, ApiError> {
    require_session(&state, id)?;

    let mut runtime = state.new_runtime();
    let reply = runtime.start().await?;
    let (round, completion) = (runtime.state().conversation_round(), runtime.state().completion());

    let handle = state.store.replace(id, runtime).ok_or(ApiError::UnknownSession(id))?;
    info!(event_name = "api.session_reset", session_id = %id, generation = handle.generation);

    Ok(Json(turn_response(id, reply, round, completion)))
}

async fn session_state(
    Path(id): Path<Uuid>,
    State(state): State<ApiState>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = require_session(&state, id)?;
    let runtime = handle.runtime.lock().await;
    Ok(Json(session_view(id, &runtime)))
}

async fn update_slot(
    Path((id, key)): Path<(Uuid, String)>,
    State(state): State<ApiState>,
    Json(body): Json<SlotEditRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = require_session(&state, id)?;

    let view = {
        let mut runtime = handle.runtime.lock().await;
        runtime.update_slot(&key, body.value.as_deref())?;
        session_view(id, &runtime)
    };

    ensure_current(&state, &handle)?;
    Ok(Json(view))
}

async fn delete_session(
    Path(id): Path<Uuid>,
    State(state): State<ApiState>,
) -> Result<StatusCode, ApiError> {
    if state.store.remove(id) {
        info!(event_name = "api.session_deleted", session_id = %id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::UnknownSession(id))
    }
}

fn require_session(state: &ApiState, id: Uuid) -> Result<Arc<SessionHandle>, ApiError> {
    state.store.get(id).ok_or(ApiError::UnknownSession(id))
}

fn ensure_current(state: &ApiState, handle: &Arc<SessionHandle>) -> Result<(), ApiError> {
    if state.store.is_current(handle) {
        Ok(())
    } else {
        Err(ApiError::StaleSession)
    }
}

fn turn_response(
    session_id: Uuid,
    reply: TurnReply,
    round: u32,
    completion: CompletionSnapshot,
) -> TurnResponse {
    TurnResponse {
        session_id,
        message: reply.message,
        finished: reply.finished,
        updated_slots: reply.updated_slots,
        correction_applied: reply.correction_applied,
        round,
        completion,
    }
}

fn session_view(session_id: Uuid, runtime: &InterviewRuntime) -> SessionView {
    let state = runtime.state();
    SessionView {
        session_id,
        started: runtime.is_started(),
        finished: state.is_finished(),
        round: state.conversation_round(),
        focus_slot: state.current_focus_slot().map(str::to_string),
        completion: state.completion(),
        slots: state.slots().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::util::ServiceExt;

    use retrospect_agent::testing::{ScriptedCompletionService, ScriptedReply};
    use retrospect_core::{InMemoryEventSink, InterviewConfig};

    use super::{router, ApiState};
    use crate::sessions::SessionStore;

    const VALID: &str = r#"{"is_valid": true, "reason": "", "severity": "low"}"#;

    fn api(replies: Vec<ScriptedReply>) -> (axum::Router, Arc<ScriptedCompletionService>) {
        let service = Arc::new(ScriptedCompletionService::new(replies));
        let state = ApiState {
            store: Arc::new(SessionStore::new()),
            service: service.clone(),
            interview: InterviewConfig::default(),
            events: Arc::new(InMemoryEventSink::default()),
        };
        (router(state), service)
    }

    async fn call(router: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.expect("request");
        let status = response.status();
        let bytes = response.into_body().collect().await.expect("body").to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn post_empty(uri: &str) -> Request<Body> {
        Request::builder().method("POST").uri(uri).body(Body::empty()).expect("request")
    }

    #[tokio::test]
    async fn start_then_message_round_trip() {
        let (router, _service) = api(vec![
            ScriptedReply::text("Welcome! What are you most proud of this year?"),
            ScriptedReply::text(VALID),
            ScriptedReply::text(
                r#"{"updates": [{"key": "achievement_1", "value": "Shipped billing"}]}"#,
            ),
            ScriptedReply::text("Great. What else?"),
        ]);

        let (status, started) = call(&router, post_empty("/api/interview/start")).await;
        assert_eq!(status, StatusCode::CREATED);
        let session_id = started["session_id"].as_str().expect("session id").to_string();
        assert_eq!(started["round"], 0);

        let (status, turn) = call(
            &router,
            post(
                &format!("/api/interview/{session_id}/message"),
                serde_json::json!({"message": "I shipped billing"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(turn["round"], 1);
        assert_eq!(turn["updated_slots"][0]["key"], "achievement_1");
        assert_eq!(turn["updated_slots"][0]["value"], "Shipped billing");
        assert_eq!(turn["finished"], false);
        assert_eq!(turn["completion"]["completed"], 1);
    }

    #[tokio::test]
    async fn unknown_session_is_404_and_bad_message_is_400() {
        let (router, _service) = api(vec![ScriptedReply::text("Welcome!")]);

        let missing = uuid::Uuid::new_v4();
        let (status, body) = call(
            &router,
            post(
                &format!("/api/interview/{missing}/message"),
                serde_json::json!({"message": "hi"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["retryable"], false);

        let (_, started) = call(&router, post_empty("/api/interview/start")).await;
        let session_id = started["session_id"].as_str().expect("session id").to_string();
        let (status, _) = call(
            &router,
            post(
                &format!("/api/interview/{session_id}/message"),
                serde_json::json!({"message": "   "}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn completion_outage_maps_to_retryable_502() {
        let (router, _service) = api(vec![
            ScriptedReply::text("Welcome!"),
            ScriptedReply::text(VALID),
            ScriptedReply::text(r#"{"updates": []}"#),
            ScriptedReply::fail("connection refused"),
        ]);

        let (_, started) = call(&router, post_empty("/api/interview/start")).await;
        let session_id = started["session_id"].as_str().expect("session id").to_string();

        let (status, body) = call(
            &router,
            post(
                &format!("/api/interview/{session_id}/message"),
                serde_json::json!({"message": "an answer"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["retryable"], true);
    }

    #[tokio::test]
    async fn reset_restarts_the_interview_under_the_same_id() {
        let (router, _service) = api(vec![
            ScriptedReply::text("Welcome!"),
            ScriptedReply::text(VALID),
            ScriptedReply::text(
                r#"{"updates": [{"key": "achievement_1", "value": "Shipped billing"}]}"#,
            ),
            ScriptedReply::text("Great. What else?"),
            ScriptedReply::text("Welcome back! What are you most proud of this year?"),
        ]);

        let (_, started) = call(&router, post_empty("/api/interview/start")).await;
        let session_id = started["session_id"].as_str().expect("session id").to_string();
        call(
            &router,
            post(
                &format!("/api/interview/{session_id}/message"),
                serde_json::json!({"message": "I shipped billing"}),
            ),
        )
        .await;

        let (status, turn) =
            call(&router, post_empty(&format!("/api/interview/{session_id}/reset"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(turn["session_id"], session_id.as_str());
        assert_eq!(turn["round"], 0);
        assert_eq!(turn["finished"], false);
        assert_eq!(turn["completion"]["completed"], 0);
        assert_eq!(turn["message"], "Welcome back! What are you most proud of this year?");
    }

    #[tokio::test]
    async fn manual_slot_edit_and_state_view() {
        let (router, _service) = api(vec![ScriptedReply::text("Welcome!")]);

        let (_, started) = call(&router, post_empty("/api/interview/start")).await;
        let session_id = started["session_id"].as_str().expect("session id").to_string();

        let edit = Request::builder()
            .method("PUT")
            .uri(format!("/api/interview/{session_id}/slots/future_goals"))
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({"value": "Mentor two juniors"}).to_string()))
            .expect("request");
        let (status, view) = call(&router, edit).await;
        assert_eq!(status, StatusCode::OK);
        let slot = view["slots"]
            .as_array()
            .expect("slots")
            .iter()
            .find(|slot| slot["key"] == "future_goals")
            .expect("future_goals present");
        assert_eq!(slot["value"], "Mentor two juniors");

        let state_request = Request::builder()
            .uri(format!("/api/interview/{session_id}/state"))
            .body(Body::empty())
            .expect("request");
        let (status, view) = call(&router, state_request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["focus_slot"], "achievement_1");
        assert_eq!(view["finished"], false);
    }

    #[tokio::test]
    async fn finish_returns_the_factsheet_and_seals_the_session() {
        let (router, _service) = api(vec![ScriptedReply::text("Welcome!")]);

        let (_, started) = call(&router, post_empty("/api/interview/start")).await;
        let session_id = started["session_id"].as_str().expect("session id").to_string();

        let (status, body) =
            call(&router, post_empty(&format!("/api/interview/{session_id}/finish"))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["factsheet"]["completion"]["percentage"].is_number());

        let (status, _) = call(
            &router,
            post(
                &format!("/api/interview/{session_id}/message"),
                serde_json::json!({"message": "one more"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn delete_removes_the_session() {
        let (router, _service) = api(vec![ScriptedReply::text("Welcome!")]);
        let (_, started) = call(&router, post_empty("/api/interview/start")).await;
        let session_id = started["session_id"].as_str().expect("session id").to_string();

        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/api/interview/{session_id}"))
            .body(Body::empty())
            .expect("request");
        let (status, _) = call(&router, request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let state_request = Request::builder()
            .uri(format!("/api/interview/{session_id}/state"))
            .body(Body::empty())
            .expect("request");
        let (status, _) = call(&router, state_request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
