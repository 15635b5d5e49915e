//! Relevance check for user replies.
//!
//! Before a reply is mined for slot values, a cheap low-temperature call asks
//! whether the reply is plausibly on topic for the slot in focus. The check
//! fails open: any transport failure or unparseable verdict is treated as
//! valid so a flaky model can never block the interview.

use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use retrospect_core::Slot;

use crate::json::first_json_object;
use crate::llm::{ChatMessage, CompletionRequest, CompletionService, EXTRACTION_TEMPERATURE};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ValidationVerdict {
    pub is_valid: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub severity: Severity,
}

impl ValidationVerdict {
    pub fn valid() -> Self {
        Self { is_valid: true, reason: String::new(), severity: Severity::Low }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ValidatorPolicy {
    /// Treat medium-severity verdicts as correction-worthy, not just high.
    pub correct_medium_severity: bool,
}

pub struct InputValidator {
    service: Arc<dyn CompletionService>,
    policy: ValidatorPolicy,
}

impl InputValidator {
    pub fn new(service: Arc<dyn CompletionService>, policy: ValidatorPolicy) -> Self {
        Self { service, policy }
    }

    /// Whether a verdict should interrupt the turn with a corrective reply.
    pub fn requires_correction(&self, verdict: &ValidationVerdict) -> bool {
        if verdict.is_valid {
            return false;
        }
        match verdict.severity {
            Severity::High => true,
            Severity::Medium => self.policy.correct_medium_severity,
            Severity::Low => false,
        }
    }

    pub async fn validate(&self, focus: Option<&Slot>, message: &str) -> ValidationVerdict {
        let Some(slot) = focus else {
            // Nothing in focus yet, so nothing to be off topic about.
            return ValidationVerdict::valid();
        };

        let request = CompletionRequest::new(
            vec![
                ChatMessage::system(VALIDATOR_SYSTEM_PROMPT),
                ChatMessage::user(validation_prompt(slot, message)),
            ],
            EXTRACTION_TEMPERATURE,
        );

        let response = match self.service.complete(request).await {
            Ok(response) => response,
            Err(error) => {
                warn!(event_name = "validator.call_failed", %error, "treating reply as valid");
                return ValidationVerdict::valid();
            }
        };

        match first_json_object(&response.content)
            .and_then(|value| serde_json::from_value::<ValidationVerdict>(value).ok())
        {
            Some(verdict) => verdict,
            None => {
                warn!(
                    event_name = "validator.unparseable_verdict",
                    "treating reply as valid"
                );
                ValidationVerdict::valid()
            }
        }
    }
}

const VALIDATOR_SYSTEM_PROMPT: &str = "You are a relevance checker for a year-end \
review interview. Judge whether the user's reply is a reasonable answer to the \
current question. Replies may be partial, informal, or cover adjacent topics; \
only flag clearly off-topic or nonsense input. Respond with JSON only: \
{\"is_valid\": bool, \"reason\": string, \"severity\": \"low\"|\"medium\"|\"high\"}";

fn validation_prompt(slot: &Slot, message: &str) -> String {
    format!(
        "Current question topic: {label}\nTopic description: {description}\n\nUser reply:\n{message}",
        label = slot.label,
        description = slot.description,
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use retrospect_core::slot_registry;

    use super::{InputValidator, Severity, ValidationVerdict, ValidatorPolicy};
    use crate::testing::{ScriptedCompletionService, ScriptedReply};

    fn validator(
        replies: Vec<ScriptedReply>,
        policy: ValidatorPolicy,
    ) -> (InputValidator, Arc<ScriptedCompletionService>) {
        let service = Arc::new(ScriptedCompletionService::new(replies));
        (InputValidator::new(service.clone(), policy), service)
    }

    #[tokio::test]
    async fn parses_a_rejecting_verdict() {
        let (validator, _service) = validator(
            vec![ScriptedReply::text(
                r#"{"is_valid": false, "reason": "asked about lunch", "severity": "high"}"#,
            )],
            ValidatorPolicy::default(),
        );
        let registry = slot_registry();
        let verdict = validator.validate(Some(&registry[0]), "what's for lunch?").await;

        assert!(!verdict.is_valid);
        assert_eq!(verdict.severity, Severity::High);
        assert!(validator.requires_correction(&verdict));
    }

    #[tokio::test]
    async fn medium_severity_is_advisory_by_default() {
        let (validator, _service) = validator(
            vec![ScriptedReply::text(
                r#"{"is_valid": false, "reason": "tangent", "severity": "medium"}"#,
            )],
            ValidatorPolicy::default(),
        );
        let registry = slot_registry();
        let verdict = validator.validate(Some(&registry[0]), "well, adjacent story").await;

        assert!(!verdict.is_valid);
        assert!(!validator.requires_correction(&verdict));

        let strict = InputValidator::new(
            Arc::new(ScriptedCompletionService::new(vec![])),
            ValidatorPolicy { correct_medium_severity: true },
        );
        assert!(strict.requires_correction(&verdict));
    }

    #[tokio::test]
    async fn fails_open_on_transport_error() {
        let (validator, _service) =
            validator(vec![ScriptedReply::fail("boom")], ValidatorPolicy::default());
        let registry = slot_registry();
        let verdict = validator.validate(Some(&registry[0]), "my answer").await;
        assert!(verdict.is_valid);
    }

    #[tokio::test]
    async fn fails_open_on_garbage_output() {
        let (validator, _service) =
            validator(vec![ScriptedReply::text("sure thing!")], ValidatorPolicy::default());
        let registry = slot_registry();
        let verdict = validator.validate(Some(&registry[0]), "my answer").await;
        assert!(verdict.is_valid);
    }

    #[tokio::test]
    async fn no_focus_slot_skips_the_model_call() {
        let (validator, service) = validator(vec![], ValidatorPolicy::default());
        let verdict = validator.validate(None, "anything").await;
        assert!(verdict.is_valid);
        assert!(service.requests().is_empty());
    }

    #[test]
    fn missing_fields_default_sensibly() {
        let verdict: ValidationVerdict =
            serde_json::from_str(r#"{"is_valid": false}"#).expect("parses");
        assert_eq!(verdict.severity, Severity::Low);
        assert!(verdict.reason.is_empty());
    }
}
