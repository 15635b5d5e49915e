//! Scripted completion backend for tests.
//!
//! Lives in the main tree (not behind `cfg(test)`) so downstream crates can
//! drive full interview flows without a live model endpoint.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{CompletionError, CompletionRequest, CompletionResponse, CompletionService};

#[derive(Clone, Debug)]
pub enum ScriptedReply {
    Text(String),
    Fail(String),
}

impl ScriptedReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self::Fail(reason.into())
    }
}

/// Replays a fixed queue of replies and records every request it saw.
/// Running out of script is a test bug and fails the calling test loudly.
#[derive(Default)]
pub struct ScriptedCompletionService {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletionService {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self { replies: Mutex::new(replies.into()), requests: Mutex::new(Vec::new()) }
    }

    pub fn push(&self, reply: ScriptedReply) {
        self.replies.lock().expect("script lock").push_back(reply);
    }

    /// All requests received so far, in call order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("request lock").clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletionService {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError> {
        self.requests.lock().expect("request lock").push(request);

        let reply = self
            .replies
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| panic!("scripted completion service ran out of replies"));

        match reply {
            ScriptedReply::Text(content) => Ok(CompletionResponse { content }),
            ScriptedReply::Fail(reason) => Err(CompletionError::Transport(reason)),
        }
    }
}
