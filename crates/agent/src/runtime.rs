//! Orchestration of one interview session.
//!
//! Every user turn runs the same constrained loop: validate the reply, mine
//! it for slot values, ask the deterministic planner what comes next, then
//! generate exactly one conversational message. Validation and extraction
//! degrade gracefully; question generation is the only step whose failure
//! surfaces to the caller, because without it there is nothing to say.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use retrospect_core::{
    DomainError, EventOutcome, EventSink, Factsheet, InterviewConfig, InterviewEvent,
    InterviewState, PlannerDecision, Role, Slot, TurnPlanner,
};

use crate::extractor::{SlotExtractor, SlotUpdate};
use crate::interviewer::{is_wrap_up, Interviewer};
use crate::llm::{CompletionError, CompletionService};
use crate::validator::{InputValidator, ValidatorPolicy};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("question generation failed: {0}")]
    QuestionGeneration(#[from] CompletionError),
    #[error("interview has not been started")]
    NotStarted,
    #[error("interview was already started")]
    AlreadyStarted,
    #[error("message must not be empty")]
    EmptyMessage,
}

/// Outcome of one user-visible turn. `updated_slots` carries the values as
/// written, not just the keys, so callers can render them without a second
/// state fetch.
#[derive(Clone, Debug)]
pub struct TurnReply {
    pub message: String,
    pub finished: bool,
    pub updated_slots: Vec<SlotUpdate>,
    pub correction_applied: bool,
}

pub struct InterviewRuntime {
    session_id: Uuid,
    state: InterviewState,
    planner: TurnPlanner,
    validator: InputValidator,
    extractor: SlotExtractor,
    interviewer: Interviewer,
    events: Arc<dyn EventSink>,
    history_window: usize,
    started: bool,
}

impl InterviewRuntime {
    pub fn new(
        service: Arc<dyn CompletionService>,
        interview: &InterviewConfig,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            state: InterviewState::new(),
            planner: TurnPlanner::new(interview.planner_policy()),
            validator: InputValidator::new(
                service.clone(),
                ValidatorPolicy { correct_medium_severity: interview.correct_medium_severity },
            ),
            extractor: SlotExtractor::new(service.clone()),
            interviewer: Interviewer::new(service),
            events,
            history_window: interview.history_window,
            started: false,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> &InterviewState {
        &self.state
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Opens the interview with a model-generated greeting and first question.
    pub async fn start(&mut self) -> Result<TurnReply, AgentError> {
        if self.started {
            return Err(AgentError::AlreadyStarted);
        }

        let focus_key = self
            .planner
            .next_focus(self.state.slots())
            .map(str::to_string)
            .ok_or(DomainError::NoFocusSlot)?;
        let slot = self.require_slot(&focus_key)?;

        let message = self.interviewer.opening_question(&slot).await?;
        self.state.set_focus(Some(focus_key));
        self.state.append_turn(Role::Assistant, message.clone());
        self.started = true;

        self.emit(
            InterviewEvent::new(self.session_id.to_string(), "interview.started", EventOutcome::Success),
        );

        Ok(TurnReply { message, finished: false, updated_slots: Vec::new(), correction_applied: false })
    }

    /// Processes one user reply end to end.
    pub async fn send_message(&mut self, text: &str) -> Result<TurnReply, AgentError> {
        self.ensure_live()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(AgentError::EmptyMessage);
        }

        self.state.append_turn(Role::User, text);
        let history = self.history();

        let verdict = self.validator.validate(self.state.focus_slot(), text).await;
        if self.validator.requires_correction(&verdict) {
            let slot = self
                .state
                .focus_slot()
                .cloned()
                .ok_or(DomainError::NoFocusSlot)?;
            let message =
                self.interviewer.correction(&history, &slot, &verdict.reason).await?;
            self.state.append_turn(Role::Assistant, message.clone());

            // Corrective turns never advance the round counter.
            self.emit(
                InterviewEvent::new(
                    self.session_id.to_string(),
                    "turn.corrected",
                    EventOutcome::Rejected,
                )
                .with_metadata("reason", verdict.reason.clone()),
            );

            return Ok(TurnReply {
                message,
                finished: false,
                updated_slots: Vec::new(),
                correction_applied: true,
            });
        }

        let updates = self
            .extractor
            .extract(self.state.slots(), self.state.focus_slot(), text)
            .await;
        let mut updated_slots: Vec<SlotUpdate> = Vec::new();
        let mut dropped = 0usize;
        for update in updates {
            match self.state.apply_update(&update.key, &update.value) {
                Ok(true) => updated_slots.push(update),
                Ok(false) => dropped += 1,
                Err(error) => {
                    dropped += 1;
                    warn!(event_name = "runtime.update_rejected", %error, key = %update.key);
                }
            }
        }
        if !updated_slots.is_empty() || dropped > 0 {
            let outcome =
                if dropped > 0 { EventOutcome::Degraded } else { EventOutcome::Success };
            let keys: Vec<&str> =
                updated_slots.iter().map(|update| update.key.as_str()).collect();
            self.emit(
                InterviewEvent::new(self.session_id.to_string(), "slots.updated", outcome)
                    .with_metadata("count", updated_slots.len().to_string())
                    .with_metadata("dropped", dropped.to_string())
                    .with_metadata("keys", keys.join(",")),
            );
        }

        // The reply being processed counts as the next round; the counter
        // itself only moves once a question was successfully generated.
        let round = self.state.conversation_round() + 1;
        let decision = self.planner.plan(self.state.slots(), round);
        let completion = self.state.completion();

        let message = match &decision {
            PlannerDecision::ReadyToFinish => {
                self.interviewer.ready_to_finish(&history, completion).await?
            }
            PlannerDecision::Checkpoint { next_focus } => {
                let next_slot = match next_focus {
                    Some(key) => Some(self.require_slot(key)?),
                    None => None,
                };
                self.interviewer
                    .checkpoint(&history, completion, next_slot.as_ref())
                    .await?
            }
            PlannerDecision::Ask { focus_slot } => {
                let slot = self.require_slot(focus_slot)?;
                let allow_wrap_up = self.planner.allows_phrase_exit(round);
                self.interviewer
                    .next_question(&history, &slot, round, completion, allow_wrap_up)
                    .await?
            }
        };

        self.state.set_focus(decision.next_focus().map(str::to_string));
        self.state.append_turn(Role::Assistant, message.clone());
        self.state.advance_round();

        // Only the round-floored wrap-up phrase seals the session from this
        // path; a smart exit merely clears the focus and invites the user to
        // finish, so they can keep volunteering detail.
        let mut finished = false;
        if self.planner.allows_phrase_exit(self.state.conversation_round()) && is_wrap_up(&message)
        {
            self.state.finish();
            finished = true;
            self.emit(InterviewEvent::new(
                self.session_id.to_string(),
                "interview.phrase_exit",
                EventOutcome::Success,
            ));
        } else if matches!(decision, PlannerDecision::ReadyToFinish) {
            self.emit(InterviewEvent::new(
                self.session_id.to_string(),
                "interview.smart_exit",
                EventOutcome::Success,
            ));
        } else if decision.is_checkpoint() {
            self.emit(InterviewEvent::new(
                self.session_id.to_string(),
                "turn.checkpoint",
                EventOutcome::Success,
            ));
        }

        Ok(TurnReply { message, finished, updated_slots, correction_applied: false })
    }

    /// Marks the slot in focus as declined and moves on.
    pub async fn skip_current_slot(&mut self) -> Result<TurnReply, AgentError> {
        self.ensure_live()?;

        let skipped_key = self.state.skip_focus()?;
        let skipped = self.require_slot(&skipped_key)?;
        self.state.append_turn(Role::User, "[skipped]");
        let history = self.history();

        let round = self.state.conversation_round() + 1;
        let decision = self.planner.plan(self.state.slots(), round);
        let next_slot = match decision.next_focus() {
            Some(key) => Some(self.require_slot(key)?),
            None => None,
        };

        let message = self
            .interviewer
            .skip_acknowledgement(&history, &skipped, next_slot.as_ref())
            .await?;

        self.state.set_focus(decision.next_focus().map(str::to_string));
        self.state.append_turn(Role::Assistant, message.clone());
        self.state.advance_round();

        self.emit(
            InterviewEvent::new(
                self.session_id.to_string(),
                "slot.skipped",
                EventOutcome::Success,
            )
            .with_metadata("key", skipped_key),
        );

        // A skip never ends the session, even when nothing is left to ask;
        // the user finishes explicitly.
        Ok(TurnReply {
            message,
            finished: false,
            updated_slots: Vec::new(),
            correction_applied: false,
        })
    }

    /// Ends the session (if still live) and assembles the factsheet.
    pub fn finish(&mut self) -> Result<Factsheet, AgentError> {
        if !self.started {
            return Err(AgentError::NotStarted);
        }
        if !self.state.is_finished() {
            self.state.finish();
            self.emit(InterviewEvent::new(
                self.session_id.to_string(),
                "interview.finished",
                EventOutcome::Success,
            ));
        }
        Ok(Factsheet::assemble(&self.state))
    }

    /// Manual slot edit, available before and after the session ends.
    pub fn update_slot(&mut self, key: &str, value: Option<&str>) -> Result<(), AgentError> {
        self.state.set_slot(key, value)?;
        self.emit(
            InterviewEvent::new(self.session_id.to_string(), "slot.edited", EventOutcome::Success)
                .with_metadata("key", key.to_string()),
        );
        Ok(())
    }

    /// Discards all progress and returns the runtime to its pre-start state.
    pub fn reset(&mut self) {
        self.state = InterviewState::new();
        self.started = false;
        self.emit(InterviewEvent::new(
            self.session_id.to_string(),
            "interview.reset",
            EventOutcome::Success,
        ));
        info!(event_name = "runtime.reset", session_id = %self.session_id);
    }

    fn ensure_live(&self) -> Result<(), AgentError> {
        if !self.started {
            return Err(AgentError::NotStarted);
        }
        if self.state.is_finished() {
            return Err(DomainError::SessionFinished.into());
        }
        Ok(())
    }

    fn history(&self) -> Vec<retrospect_core::ConversationTurn> {
        self.state.recent_transcript(self.history_window).to_vec()
    }

    fn require_slot(&self, key: &str) -> Result<Slot, AgentError> {
        self.state
            .slot(key)
            .cloned()
            .ok_or_else(|| DomainError::UnknownSlot(key.to_string()).into())
    }

    fn emit(&self, event: InterviewEvent) {
        self.events.emit(event);
    }
}
