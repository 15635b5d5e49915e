use serde::{Deserialize, Serialize};

/// What the session should do on the next turn.
///
/// `Checkpoint` carries the focus the interview falls back to if the user
/// chooses to keep going; `ReadyToFinish` means the planner stops proposing
/// slots and the caller may surface a "finish interview" affordance. Neither
/// forces termination on its own.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlannerDecision {
    Ask { focus_slot: String },
    Checkpoint { next_focus: Option<String> },
    ReadyToFinish,
}

impl PlannerDecision {
    pub fn next_focus(&self) -> Option<&str> {
        match self {
            Self::Ask { focus_slot } => Some(focus_slot.as_str()),
            Self::Checkpoint { next_focus } => next_focus.as_deref(),
            Self::ReadyToFinish => None,
        }
    }

    pub fn is_checkpoint(&self) -> bool {
        matches!(self, Self::Checkpoint { .. })
    }
}

/// Termination and cadence thresholds. The defaults are the contract; every
/// field is tunable through the `interview` config section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerPolicy {
    /// A continue-or-generate checkpoint is offered every N rounds.
    pub checkpoint_interval: u32,
    /// Checkpoints are only offered once completion reaches this percentage.
    pub checkpoint_min_completion_pct: u8,
    /// Smart exit never triggers before this many rounds.
    pub smart_exit_min_rounds: u32,
    /// Smart exit triggers at this completion percentage (past the round floor).
    pub smart_exit_min_completion_pct: u8,
    /// Smart exit also triggers once this many required slots are filled.
    pub smart_exit_min_filled: usize,
    /// Wrap-up phrasing in assistant output is ignored before this round.
    pub phrase_exit_min_rounds: u32,
}

impl Default for PlannerPolicy {
    fn default() -> Self {
        Self {
            checkpoint_interval: 5,
            checkpoint_min_completion_pct: 60,
            smart_exit_min_rounds: 5,
            smart_exit_min_completion_pct: 70,
            smart_exit_min_filled: 8,
            phrase_exit_min_rounds: 8,
        }
    }
}
