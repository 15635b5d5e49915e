//! Structured slot extraction from free-form replies.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use retrospect_core::Slot;

use crate::json::first_json_object;
use crate::llm::{ChatMessage, CompletionRequest, CompletionService, EXTRACTION_TEMPERATURE};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotUpdate {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct ExtractionPayload {
    #[serde(default)]
    updates: Vec<SlotUpdate>,
}

/// Mines slot values out of a user reply. One reply may fill several slots at
/// once, including slots that are not currently in focus. Extraction failures
/// degrade to "nothing extracted" rather than failing the turn.
pub struct SlotExtractor {
    service: Arc<dyn CompletionService>,
}

impl SlotExtractor {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self { service }
    }

    pub async fn extract(
        &self,
        slots: &[Slot],
        focus: Option<&Slot>,
        message: &str,
    ) -> Vec<SlotUpdate> {
        let request = CompletionRequest::new(
            vec![
                ChatMessage::system(EXTRACTOR_SYSTEM_PROMPT),
                ChatMessage::user(extraction_prompt(slots, focus, message)),
            ],
            EXTRACTION_TEMPERATURE,
        );

        let response = match self.service.complete(request).await {
            Ok(response) => response,
            Err(error) => {
                warn!(event_name = "extractor.call_failed", %error, "no slots extracted");
                return Vec::new();
            }
        };

        let Some(payload) = first_json_object(&response.content)
            .and_then(|value| serde_json::from_value::<ExtractionPayload>(value).ok())
        else {
            warn!(event_name = "extractor.unparseable_payload", "no slots extracted");
            return Vec::new();
        };

        payload
            .updates
            .into_iter()
            .filter(|update| {
                if update.value.trim().is_empty() {
                    return false;
                }
                let known = slots.iter().any(|slot| slot.key == update.key);
                if !known {
                    warn!(
                        event_name = "extractor.unknown_slot_key",
                        key = %update.key,
                        "dropping hallucinated slot"
                    );
                }
                known
            })
            .collect()
    }
}

const EXTRACTOR_SYSTEM_PROMPT: &str = "You extract year-end review facts from an \
interview reply into named slots. Rules:\n\
- Map content semantically: a reply can fill slots other than the one asked about.\n\
- Quantified results (numbers, percentages, money, time saved) belong in metric slots.\n\
- If the user declines a topic or adds nothing new, return no update for it.\n\
- A filled slot may only be updated when the reply is more detailed than the stored value.\n\
- Only include slots the reply actually supports. Never invent content.\n\
- Keep each value a concise self-contained summary in the user's own terms.\n\
Recognize implicit contributions:\n\
- building infrastructure, platforms, internal tools, documentation or processes, \
or helping other teams -> team_contribution\n\
- mentoring, training or onboarding colleagues -> mentoring; learning new skills, \
certifications, talks or writing -> growth_skills\n\
- performance, efficiency, cost or usage numbers -> metrics_achievement\n\
Respond with JSON only: {\"updates\": [{\"key\": string, \"value\": string}]}.\n\
Example: asked about a top achievement, the reply \"I led the checkout rewrite, \
cut page load by 40%\" yields {\"updates\": [{\"key\": \"achievement_1\", \"value\": \
\"Led the checkout rewrite\"}, {\"key\": \"metrics_achievement\", \"value\": \
\"Cut page load by 40%\"}]}.\n\
Example: the reply \"trained 3 new hires this year\" yields {\"updates\": \
[{\"key\": \"mentoring\", \"value\": \"Trained 3 new hires\"}]} even if the \
question was about something else.\n\
Example: the reply \"I'd rather skip that one\" yields {\"updates\": []}.";

fn extraction_prompt(slots: &[Slot], focus: Option<&Slot>, message: &str) -> String {
    let mut prompt = String::from("Slot schema (key (label): description [state]):\n");
    for slot in slots {
        let state = if slot.value.is_skipped() {
            "skipped".to_string()
        } else {
            match slot.value.as_filled() {
                Some(value) => format!("filled: {value}"),
                None => "empty".to_string(),
            }
        };
        prompt.push_str(&format!(
            "- {} ({}): {} [{}]\n",
            slot.key, slot.label, slot.description, state
        ));
    }

    if let Some(slot) = focus {
        prompt.push_str(&format!("\nQuestion the user was just asked: {}\n", slot.label));
    }

    prompt.push_str(&format!("\nUser reply:\n{message}"));
    prompt
}
