use crate::domain::slot::{CompletionSnapshot, Slot};
use crate::planner::states::{PlannerDecision, PlannerPolicy};

/// Decides which slot to pursue next and when the interview may conclude.
///
/// Pure policy over the current slot collection and round counter. Focus
/// priority is fixed: the first untouched required slot in registry order,
/// then the first untouched optional slot, then nothing left to target.
#[derive(Clone, Debug, Default)]
pub struct TurnPlanner {
    policy: PlannerPolicy,
}

impl TurnPlanner {
    pub fn new(policy: PlannerPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PlannerPolicy {
        &self.policy
    }

    /// Next slot to target, ignoring termination. Skipped slots are never
    /// revisited because only `Empty` values qualify.
    pub fn next_focus<'a>(&self, slots: &'a [Slot]) -> Option<&'a str> {
        slots
            .iter()
            .find(|slot| slot.required && slot.value.is_empty())
            .or_else(|| slots.iter().find(|slot| !slot.required && slot.value.is_empty()))
            .map(|slot| slot.key.as_str())
    }

    /// Smart exit: the planner autonomously stops proposing slots once the
    /// round floor is met and either completion or the filled count is high
    /// enough. Never before `smart_exit_min_rounds`, regardless of completion.
    pub fn smart_exit(&self, round: u32, completion: CompletionSnapshot) -> bool {
        round >= self.policy.smart_exit_min_rounds
            && (completion.percentage >= self.policy.smart_exit_min_completion_pct
                || completion.completed >= self.policy.smart_exit_min_filled)
    }

    /// Every Nth round, once enough is collected, pause and ask the user
    /// whether to continue deepening or move on to generation.
    pub fn is_checkpoint(&self, round: u32, completion: CompletionSnapshot) -> bool {
        round >= self.policy.checkpoint_interval
            && round % self.policy.checkpoint_interval == 0
            && completion.percentage >= self.policy.checkpoint_min_completion_pct
    }

    /// Assistant wrap-up phrasing only counts as a finish signal past this
    /// floor, so an unprompted "thank you for sharing" cannot end the
    /// interview early.
    pub fn allows_phrase_exit(&self, round: u32) -> bool {
        round >= self.policy.phrase_exit_min_rounds
    }

    /// Plan the turn that just completed its slot merge. `round` is the round
    /// number the turn is completing (already incremented by the caller).
    pub fn plan(&self, slots: &[Slot], round: u32) -> PlannerDecision {
        let completion = CompletionSnapshot::compute(slots);
        let next_focus = if self.smart_exit(round, completion) {
            None
        } else {
            self.next_focus(slots).map(str::to_string)
        };

        if self.is_checkpoint(round, completion) {
            return PlannerDecision::Checkpoint { next_focus };
        }
        match next_focus {
            Some(focus_slot) => PlannerDecision::Ask { focus_slot },
            None => PlannerDecision::ReadyToFinish,
        }
    }
}
