//! Deterministic interview domain for the Retrospect intake service.
//!
//! Everything in this crate is pure state and policy: the slot schema the
//! interview wants to fill, the per-session interview state, the turn planner
//! that decides which slot to pursue next and when the interview may end, and
//! the event sink interested callers can observe. No I/O happens here; the
//! LLM-facing layer lives in `retrospect-agent`.

pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod planner;

pub use config::{
    AppConfig, ConfigError, ConfigOverrides, InterviewConfig, LlmConfig, LlmProvider, LoadOptions,
    LogFormat, ServerConfig,
};
pub use domain::factsheet::{Factsheet, FactsheetEntry, FactsheetSection};
pub use domain::session::{ConversationTurn, InterviewState, Role};
pub use domain::slot::{
    slot_registry, CompletionSnapshot, Slot, SlotCategory, SlotValue, SKIP_SENTINEL,
};
pub use errors::DomainError;
pub use events::{EventOutcome, EventSink, InMemoryEventSink, InterviewEvent, TracingEventSink};
pub use planner::{PlannerDecision, PlannerPolicy, TurnPlanner};
