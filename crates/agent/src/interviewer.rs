//! Question generation prompts and wrap-up detection.

use std::sync::Arc;

use retrospect_core::{CompletionSnapshot, ConversationTurn, Role, Slot};

use crate::llm::{
    ChatMessage, CompletionError, CompletionRequest, CompletionService, QUESTION_TEMPERATURE,
};

/// Phrases in a generated reply that signal the model wants to wind down.
/// Only honored past the planner's round floor.
pub const WRAP_UP_PHRASES: [&str; 3] =
    ["interview complete", "conclude the interview", "thank you for sharing"];

pub fn is_wrap_up(text: &str) -> bool {
    let lowered = text.to_lowercase();
    WRAP_UP_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

const SYSTEM_PROMPT: &str = "You are a warm, professional interviewer helping an \
employee gather material for their year-end review. Ask exactly one question per \
turn, grounded in what they already told you. Keep questions short and specific. \
Never summarize the whole interview unless asked to by the instructions.";

/// Generates the conversational surface of the interview. Unlike validation
/// and extraction, failures here propagate, the caller must retry or surface
/// the outage because there is no question to show without the model.
pub struct Interviewer {
    service: Arc<dyn CompletionService>,
}

impl Interviewer {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self { service }
    }

    pub async fn opening_question(&self, slot: &Slot) -> Result<String, CompletionError> {
        let instruction = format!(
            "Open the interview. Greet the user briefly, explain you will walk through \
             their year in review, then ask your first question about: {} ({}).",
            slot.label, slot.description,
        );
        self.generate(&[], &instruction).await
    }

    pub async fn next_question(
        &self,
        history: &[ConversationTurn],
        slot: &Slot,
        round: u32,
        completion: CompletionSnapshot,
        allow_wrap_up: bool,
    ) -> Result<String, CompletionError> {
        let clamp = if allow_wrap_up {
            ""
        } else {
            " Do not use wrap-up or closing language yet; the interview continues."
        };
        let instruction = format!(
            "Round {round}: {completed} of {total} core topics covered ({percentage}%). \
             Ask the next question, about: {} ({}). Acknowledge their last answer in a \
             few words first, then ask. Prefer follow-ups that draw out concrete \
             numbers, metrics or percentages.{clamp}",
            slot.label,
            slot.description,
            completed = completion.completed,
            total = completion.total,
            percentage = completion.percentage,
        );
        self.generate(history, &instruction).await
    }

    pub async fn checkpoint(
        &self,
        history: &[ConversationTurn],
        completion: CompletionSnapshot,
        next_focus: Option<&Slot>,
    ) -> Result<String, CompletionError> {
        let continuation = match next_focus {
            Some(slot) => format!(
                "then ask whether they want to continue with: {} ({}).",
                slot.label, slot.description
            ),
            None => "then ask whether they feel ready to wrap up. If so, say the interview \
                     is complete."
                .to_string(),
        };
        let instruction = format!(
            "Progress checkpoint: {completed} of {total} core topics covered \
             ({percentage}%). Recap in one or two sentences what has been captured so far, {continuation}",
            completed = completion.completed,
            total = completion.total,
            percentage = completion.percentage,
        );
        self.generate(history, &instruction).await
    }

    pub async fn correction(
        &self,
        history: &[ConversationTurn],
        slot: &Slot,
        reason: &str,
    ) -> Result<String, CompletionError> {
        let instruction = format!(
            "The user's last reply drifted off topic ({reason}). Gently steer back and \
             re-ask about: {} ({}). Do not scold.",
            slot.label, slot.description,
        );
        self.generate(history, &instruction).await
    }

    pub async fn skip_acknowledgement(
        &self,
        history: &[ConversationTurn],
        skipped: &Slot,
        next_focus: Option<&Slot>,
    ) -> Result<String, CompletionError> {
        let instruction = match next_focus {
            Some(slot) => format!(
                "The user chose to skip the topic `{}`. Acknowledge that in one short \
                 sentence and move on to: {} ({}).",
                skipped.label, slot.label, slot.description,
            ),
            None => format!(
                "The user chose to skip the topic `{}` and no topics remain. Tell them \
                 they can add anything further or finish whenever they are ready.",
                skipped.label,
            ),
        };
        self.generate(history, &instruction).await
    }

    /// Invitation once the planner considers enough material collected. The
    /// session stays live; only the user (or a late wrap-up phrase) ends it.
    pub async fn ready_to_finish(
        &self,
        history: &[ConversationTurn],
        completion: CompletionSnapshot,
    ) -> Result<String, CompletionError> {
        let instruction = format!(
            "Enough core topics are covered ({percentage}% of {total}). Tell the user \
             you have what you need for their review, and invite them to either add \
             anything they want on record or finish whenever they are ready. Do not \
             declare the interview over yourself.",
            percentage = completion.percentage,
            total = completion.total,
        );
        self.generate(history, &instruction).await
    }

    async fn generate(
        &self,
        history: &[ConversationTurn],
        instruction: &str,
    ) -> Result<String, CompletionError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(SYSTEM_PROMPT));
        for turn in history {
            messages.push(match turn.role {
                Role::Assistant => ChatMessage::assistant(turn.text.clone()),
                Role::User => ChatMessage::user(turn.text.clone()),
            });
        }
        messages.push(ChatMessage::system(instruction.to_string()));

        let request = CompletionRequest::new(messages, QUESTION_TEMPERATURE);
        let response = self.service.complete(request).await?;
        Ok(response.content)
    }
}
