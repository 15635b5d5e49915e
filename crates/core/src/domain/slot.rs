use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Wire sentinel for a slot the user explicitly bypassed. Downstream
/// consumers of the factsheet match on this exact string.
pub const SKIP_SENTINEL: &str = "SKIPPED";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotCategory {
    Achievements,
    Metrics,
    Challenges,
    Growth,
    Team,
    Future,
}

impl SlotCategory {
    pub const ALL: [SlotCategory; 6] = [
        Self::Achievements,
        Self::Metrics,
        Self::Challenges,
        Self::Growth,
        Self::Team,
        Self::Future,
    ];

    pub fn display_label(&self) -> &'static str {
        match self {
            Self::Achievements => "Key achievements",
            Self::Metrics => "Quantified evidence",
            Self::Challenges => "Challenges faced",
            Self::Growth => "Personal growth",
            Self::Team => "Team contribution",
            Self::Future => "Looking ahead",
        }
    }

    pub fn display_order(&self) -> u8 {
        match self {
            Self::Achievements => 1,
            Self::Metrics => 2,
            Self::Challenges => 3,
            Self::Growth => 4,
            Self::Team => 5,
            Self::Future => 6,
        }
    }
}

/// A slot value has exactly three meaningful states. A filled value is never
/// the empty string; the constructor normalizes blank input back to `Empty`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SlotValue {
    #[default]
    Empty,
    Filled(String),
    Skipped,
}

impl SlotValue {
    /// Build a filled value from free text. Blank (or whitespace-only) text
    /// collapses to `Empty` so an empty string can never be observed.
    pub fn filled(text: impl Into<String>) -> Self {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Self::Empty
        } else if trimmed == SKIP_SENTINEL {
            Self::Skipped
        } else if trimmed.len() == text.len() {
            Self::Filled(text)
        } else {
            Self::Filled(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// A slot is complete iff it holds a filled value. Skipped does not count.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Filled(_))
    }

    pub fn as_filled(&self) -> Option<&str> {
        match self {
            Self::Filled(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

// The wire shape is shared with the extraction contract and the original
// factsheet consumers: null, "SKIPPED", or a non-empty string.
impl Serialize for SlotValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Empty => serializer.serialize_none(),
            Self::Filled(text) => serializer.serialize_str(text),
            Self::Skipped => serializer.serialize_str(SKIP_SENTINEL),
        }
    }
}

impl<'de> Deserialize<'de> for SlotValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(Self::Empty),
            Some(text) if text == SKIP_SENTINEL => Ok(Self::Skipped),
            Some(text) => {
                if text.trim().is_empty() {
                    return Err(D::Error::custom("slot value must not be an empty string"));
                }
                Ok(Self::filled(text))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub key: String,
    pub label: String,
    pub description: String,
    pub category: SlotCategory,
    pub required: bool,
    #[serde(default)]
    pub value: SlotValue,
}

impl Slot {
    fn definition(
        key: &str,
        label: &str,
        description: &str,
        category: SlotCategory,
        required: bool,
    ) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            description: description.to_string(),
            category,
            required,
            value: SlotValue::Empty,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.value.is_complete()
    }
}

/// The canonical interview schema, in the order slots are pursued. Returns a
/// fresh deep copy so one session's edits never leak into another's.
pub fn slot_registry() -> Vec<Slot> {
    use SlotCategory::*;

    vec![
        Slot::definition(
            "achievement_1",
            "Primary achievement",
            "Your most important project or deliverable this year, including the project name, \
             your role, and when it was completed",
            Achievements,
            true,
        ),
        Slot::definition(
            "achievement_2",
            "Second achievement",
            "Your second most important project or deliverable",
            Achievements,
            true,
        ),
        Slot::definition(
            "achievement_3",
            "Third achievement",
            "A third project or deliverable worth mentioning",
            Achievements,
            false,
        ),
        Slot::definition(
            "metrics_achievement",
            "Quantified results",
            "Concrete numbers: percentages, efficiency gains, cost savings, or other \
             measurable impact",
            Metrics,
            true,
        ),
        Slot::definition(
            "evidence_feedback",
            "Feedback received",
            "Positive feedback or recognition from managers, peers, or customers",
            Metrics,
            false,
        ),
        Slot::definition(
            "awards_honors",
            "Awards and honors",
            "Awards, certifications, or public recognition received this year",
            Metrics,
            false,
        ),
        Slot::definition(
            "challenge_situation",
            "Biggest challenge",
            "The most difficult obstacle or setback you faced at work",
            Challenges,
            true,
        ),
        Slot::definition(
            "challenge_actions",
            "Actions taken",
            "The concrete steps you took to address that challenge",
            Challenges,
            true,
        ),
        Slot::definition(
            "challenge_outcome",
            "Outcome",
            "How the challenge resolved and what you took away from it",
            Challenges,
            true,
        ),
        Slot::definition(
            "growth_skills",
            "New skills",
            "New technologies, tools, or methods you picked up this year",
            Growth,
            false,
        ),
        Slot::definition(
            "growth_reflection",
            "Reflection",
            "What you would do differently and where you want to improve",
            Growth,
            false,
        ),
        Slot::definition(
            "team_contribution",
            "Team contribution",
            "Contributions to team culture, collaboration, or knowledge sharing",
            Team,
            false,
        ),
        Slot::definition(
            "mentoring",
            "Mentoring",
            "Onboarding new hires, training, or passing knowledge to others",
            Team,
            false,
        ),
        Slot::definition(
            "future_goals",
            "Goals for next year",
            "Work goals or achievements you want to reach next year",
            Future,
            true,
        ),
        Slot::definition(
            "support_needed",
            "Support needed",
            "Resources, training, or support you would like to receive",
            Future,
            false,
        ),
    ]
}

/// Derived completion figures over the required slots. Always recomputed from
/// the current slot state; never cache an instance across a slot mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionSnapshot {
    pub total: usize,
    pub completed: usize,
    pub percentage: u8,
}

impl CompletionSnapshot {
    pub fn compute(slots: &[Slot]) -> Self {
        let total = slots.iter().filter(|slot| slot.required).count();
        let completed = slots.iter().filter(|slot| slot.required && slot.is_complete()).count();
        let percentage = if total == 0 {
            100
        } else {
            ((completed as f64 / total as f64) * 100.0).round() as u8
        };
        Self { total, completed, percentage }
    }
}
