//! LLM-facing layer for the Retrospect intake service.
//!
//! This crate is the conversational "front half" of the system. It owns every
//! model call and nothing else:
//!
//! 1. **Input validation** (`validator`) - cheap low-temperature check that a
//!    reply is on topic for the slot currently in focus
//! 2. **Slot extraction** (`extractor`) - low-temperature structured pull of
//!    slot values out of free text
//! 3. **Question generation** (`interviewer`) - higher-temperature follow-up
//!    question or checkpoint prompt
//!
//! The [`runtime::InterviewRuntime`] stitches the three calls together around
//! the deterministic planner from `retrospect-core` and is the only type most
//! callers need.
//!
//! # Safety Principle
//!
//! The model never decides interview progress. Which slot comes next, when a
//! checkpoint fires, and when the session may end are all decided by the
//! planner from recorded state; the model only phrases questions and parses
//! answers.

pub mod extractor;
pub mod interviewer;
pub mod json;
pub mod llm;
pub mod runtime;
pub mod testing;
pub mod validator;

pub use extractor::{SlotExtractor, SlotUpdate};
pub use interviewer::Interviewer;
pub use llm::{
    ChatMessage, CompletionError, CompletionRequest, CompletionResponse, CompletionService,
    DeepSeekClient, EXTRACTION_TEMPERATURE, QUESTION_TEMPERATURE,
};
pub use runtime::{AgentError, InterviewRuntime, TurnReply};
pub use validator::{InputValidator, Severity, ValidationVerdict, ValidatorPolicy};
