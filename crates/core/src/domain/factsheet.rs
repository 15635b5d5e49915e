use serde::{Deserialize, Serialize};

use crate::domain::session::{ConversationTurn, InterviewState};
use crate::domain::slot::{CompletionSnapshot, SlotCategory};

/// The structured artifact handed to downstream report generation once the
/// interview concludes: filled slots grouped by category, plus the transcript
/// and completion figures. Derived from the session state, never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Factsheet {
    pub sections: Vec<FactsheetSection>,
    pub skipped_slots: Vec<String>,
    pub unanswered_slots: Vec<String>,
    pub completion: CompletionSnapshot,
    pub conversation_rounds: u32,
    pub transcript: Vec<ConversationTurn>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactsheetSection {
    pub category: SlotCategory,
    pub label: String,
    pub entries: Vec<FactsheetEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactsheetEntry {
    pub key: String,
    pub label: String,
    pub value: String,
}

impl Factsheet {
    pub fn assemble(state: &InterviewState) -> Self {
        let mut sections = Vec::new();
        for category in SlotCategory::ALL {
            let entries: Vec<FactsheetEntry> = state
                .slots()
                .iter()
                .filter(|slot| slot.category == category)
                .filter_map(|slot| {
                    slot.value.as_filled().map(|value| FactsheetEntry {
                        key: slot.key.clone(),
                        label: slot.label.clone(),
                        value: value.to_string(),
                    })
                })
                .collect();
            if !entries.is_empty() {
                sections.push(FactsheetSection {
                    category,
                    label: category.display_label().to_string(),
                    entries,
                });
            }
        }

        let skipped_slots = state
            .slots()
            .iter()
            .filter(|slot| slot.value.is_skipped())
            .map(|slot| slot.key.clone())
            .collect();
        let unanswered_slots = state
            .slots()
            .iter()
            .filter(|slot| slot.value.is_empty())
            .map(|slot| slot.key.clone())
            .collect();

        Self {
            sections,
            skipped_slots,
            unanswered_slots,
            completion: state.completion(),
            conversation_rounds: state.conversation_round(),
            transcript: state.transcript().to_vec(),
        }
    }
}
