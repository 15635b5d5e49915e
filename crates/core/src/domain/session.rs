use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::slot::{slot_registry, CompletionSnapshot, Slot, SlotValue};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the append-only transcript. Turns are never mutated after
/// append, only windowed when building model context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn now(role: Role, text: impl Into<String>) -> Self {
        Self { role, text: text.into(), timestamp: Utc::now() }
    }
}

/// The full state of one interview session. Exclusively owned by one session;
/// destroyed on reset. All mutation goes through methods so the invariants
/// hold: the round counter never decreases, slot values are never empty
/// strings, and nothing changes once the interview is finished.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterviewState {
    slots: Vec<Slot>,
    conversation_round: u32,
    current_focus_slot: Option<String>,
    is_finished: bool,
    transcript: Vec<ConversationTurn>,
}

impl InterviewState {
    pub fn new() -> Self {
        Self {
            slots: slot_registry(),
            conversation_round: 0,
            current_focus_slot: None,
            is_finished: false,
            transcript: Vec::new(),
        }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn conversation_round(&self) -> u32 {
        self.conversation_round
    }

    pub fn current_focus_slot(&self) -> Option<&str> {
        self.current_focus_slot.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    pub fn transcript(&self) -> &[ConversationTurn] {
        &self.transcript
    }

    /// The last `window` turns, oldest first. Used to bound prompt size.
    pub fn recent_transcript(&self, window: usize) -> &[ConversationTurn] {
        let start = self.transcript.len().saturating_sub(window);
        &self.transcript[start..]
    }

    /// Always recomputed; a cached snapshot across a slot mutation is a bug.
    pub fn completion(&self) -> CompletionSnapshot {
        CompletionSnapshot::compute(&self.slots)
    }

    pub fn slot(&self, key: &str) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.key == key)
    }

    pub fn focus_slot(&self) -> Option<&Slot> {
        self.current_focus_slot.as_deref().and_then(|key| self.slot(key))
    }

    pub fn append_turn(&mut self, role: Role, text: impl Into<String>) {
        self.transcript.push(ConversationTurn::now(role, text));
    }

    /// Write an extracted value into a slot. Returns `Ok(true)` when a value
    /// was actually written; blank values are dropped so an empty string can
    /// never land in a slot, and the skip sentinel is ignored because only
    /// the explicit skip action may mark a slot skipped. Re-extraction may
    /// overwrite a filled or skipped slot with a more detailed value.
    pub fn apply_update(&mut self, key: &str, value: &str) -> Result<bool, DomainError> {
        if self.is_finished {
            return Err(DomainError::SessionFinished);
        }
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.key == key)
            .ok_or_else(|| DomainError::UnknownSlot(key.to_string()))?;

        match SlotValue::filled(value) {
            SlotValue::Empty | SlotValue::Skipped => Ok(false),
            filled => {
                slot.value = filled;
                Ok(true)
            }
        }
    }

    /// Manual slot edit. `None` or blank text clears the slot back to empty;
    /// this is the one path that may reopen a skipped slot, and the only
    /// mutation still allowed after the interview finished so the factsheet
    /// can be touched up during review.
    pub fn set_slot(&mut self, key: &str, value: Option<&str>) -> Result<(), DomainError> {
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.key == key)
            .ok_or_else(|| DomainError::UnknownSlot(key.to_string()))?;

        slot.value = match value {
            None => SlotValue::Empty,
            Some(text) => SlotValue::filled(text),
        };
        Ok(())
    }

    /// Mark the focus slot as explicitly skipped and clear the focus.
    /// Returns the skipped slot's key.
    pub fn skip_focus(&mut self) -> Result<String, DomainError> {
        if self.is_finished {
            return Err(DomainError::SessionFinished);
        }
        let key = self.current_focus_slot.take().ok_or(DomainError::NoFocusSlot)?;
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.key == key)
            .ok_or_else(|| DomainError::UnknownSlot(key.clone()))?;
        slot.value = SlotValue::Skipped;
        Ok(key)
    }

    pub fn set_focus(&mut self, key: Option<String>) {
        self.current_focus_slot = key;
    }

    pub fn advance_round(&mut self) {
        self.conversation_round += 1;
    }

    pub fn finish(&mut self) {
        self.is_finished = true;
        self.current_focus_slot = None;
    }
}

impl Default for InterviewState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{InterviewState, Role};
    use crate::domain::slot::SlotValue;
    use crate::errors::DomainError;

    #[test]
    fn fresh_state_starts_at_round_zero_with_untouched_slots() {
        let state = InterviewState::new();
        assert_eq!(state.conversation_round(), 0);
        assert!(!state.is_finished());
        assert!(state.current_focus_slot().is_none());
        assert!(state.slots().iter().all(|slot| slot.value.is_empty()));
        assert!(state.transcript().is_empty());
    }

    #[test]
    fn apply_update_writes_known_slots_and_drops_blanks() {
        let mut state = InterviewState::new();
        let written = state
            .apply_update("achievement_1", "shipped the payments rewrite in Q3")
            .expect("known slot");
        assert!(written);
        assert!(state.slot("achievement_1").expect("slot").is_complete());

        let written = state.apply_update("achievement_2", "   ").expect("known slot");
        assert!(!written, "blank values are dropped");
        assert!(state.slot("achievement_2").expect("slot").value.is_empty());

        let error = state.apply_update("not_a_slot", "value").expect_err("unknown slot");
        assert_eq!(error, DomainError::UnknownSlot("not_a_slot".to_string()));
    }

    #[test]
    fn apply_update_never_writes_the_skip_sentinel() {
        let mut state = InterviewState::new();
        let written = state
            .apply_update("achievement_1", crate::domain::slot::SKIP_SENTINEL)
            .expect("known slot");
        assert!(!written, "only the explicit skip action marks slots skipped");
        assert!(state.slot("achievement_1").expect("slot").value.is_empty());

        // An already-filled slot is not clobbered either.
        state.apply_update("achievement_1", "ran the incident review").expect("update");
        state.apply_update("achievement_1", " SKIPPED ").expect("known slot");
        assert!(state.slot("achievement_1").expect("slot").is_complete());
    }

    #[test]
    fn skip_focus_marks_sentinel_and_clears_focus() {
        let mut state = InterviewState::new();
        state.set_focus(Some("growth_skills".to_string()));

        let skipped = state.skip_focus().expect("focus set");
        assert_eq!(skipped, "growth_skills");
        assert!(state.current_focus_slot().is_none());
        assert_eq!(state.slot("growth_skills").expect("slot").value, SlotValue::Skipped);
    }

    #[test]
    fn skip_without_focus_is_rejected() {
        let mut state = InterviewState::new();
        assert_eq!(state.skip_focus().expect_err("no focus"), DomainError::NoFocusSlot);
    }

    #[test]
    fn finished_state_rejects_interview_mutation_but_allows_review_edits() {
        let mut state = InterviewState::new();
        state.set_focus(Some("achievement_1".to_string()));
        state.finish();

        assert!(state.is_finished());
        assert!(state.current_focus_slot().is_none(), "finish clears the focus");
        assert_eq!(
            state.apply_update("achievement_1", "late answer").expect_err("finished"),
            DomainError::SessionFinished
        );
        assert_eq!(state.skip_focus().expect_err("finished"), DomainError::SessionFinished);

        // Manual review edits stay open after the interview ends.
        state.set_slot("achievement_1", Some("polished wording")).expect("review edit");
        assert!(state.slot("achievement_1").expect("slot").is_complete());
    }

    #[test]
    fn manual_edit_can_reopen_a_skipped_slot() {
        let mut state = InterviewState::new();
        state.set_focus(Some("mentoring".to_string()));
        state.skip_focus().expect("skip");

        state.set_slot("mentoring", Some("onboarded two interns")).expect("edit");
        assert!(state.slot("mentoring").expect("slot").is_complete());

        state.set_slot("mentoring", None).expect("clear");
        assert!(state.slot("mentoring").expect("slot").value.is_empty());
    }

    #[test]
    fn transcript_is_append_only_and_windowed() {
        let mut state = InterviewState::new();
        for index in 0..10 {
            let role = if index % 2 == 0 { Role::Assistant } else { Role::User };
            state.append_turn(role, format!("turn {index}"));
        }

        assert_eq!(state.transcript().len(), 10);
        let recent = state.recent_transcript(6);
        assert_eq!(recent.len(), 6);
        assert_eq!(recent[0].text, "turn 4");
        assert_eq!(recent[5].text, "turn 9");

        let all = state.recent_transcript(100);
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn completion_reflects_current_slot_state() {
        let mut state = InterviewState::new();
        assert_eq!(state.completion().percentage, 0);

        state.apply_update("achievement_1", "led the search relaunch").expect("update");
        let after_one = state.completion();
        assert_eq!(after_one.completed, 1);

        state.set_slot("achievement_1", None).expect("clear");
        assert_eq!(state.completion().completed, 0, "snapshot is never cached");
    }
}
