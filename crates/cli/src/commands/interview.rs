use std::io::{BufRead, Write};
use std::sync::Arc;

use retrospect_agent::llm::DeepSeekClient;
use retrospect_agent::runtime::{AgentError, InterviewRuntime};
use retrospect_core::{AppConfig, Factsheet, InMemoryEventSink, LoadOptions};

use super::CommandResult;

pub async fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure("interview", "config", error.to_string(), 2),
    };

    let client = match DeepSeekClient::from_config(&config.llm) {
        Ok(client) => client,
        Err(error) => {
            return CommandResult::failure("interview", "completion_client", error.to_string(), 2)
        }
    };

    let mut runtime = InterviewRuntime::new(
        Arc::new(client),
        &config.interview,
        Arc::new(InMemoryEventSink::default()),
    );

    let opening = match runtime.start().await {
        Ok(reply) => reply,
        Err(error) => {
            return CommandResult::failure("interview", "completion_call", error.to_string(), 1)
        }
    };

    println!("(type /skip to skip a question, /finish to wrap up, /quit to abandon)\n");
    println!("{}\n", opening.message);

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF behaves like /finish
            Ok(_) => {}
            Err(error) => {
                return CommandResult::failure("interview", "stdin", error.to_string(), 1)
            }
        }
        let input = line.trim();

        match input {
            "/quit" => {
                return CommandResult::success("interview", "session abandoned, nothing saved");
            }
            "" => continue,
            "/finish" => break,
            "/skip" => match runtime.skip_current_slot().await {
                Ok(reply) => {
                    println!("\n{}\n", reply.message);
                    if reply.finished {
                        break;
                    }
                }
                Err(error) => {
                    if !report_turn_error(error) {
                        break;
                    }
                }
            },
            message => match runtime.send_message(message).await {
                Ok(reply) => {
                    println!("\n{}\n", reply.message);
                    if reply.finished {
                        break;
                    }
                }
                Err(error) => {
                    if !report_turn_error(error) {
                        break;
                    }
                }
            },
        }
    }

    match runtime.finish() {
        Ok(factsheet) => {
            println!("\n{}", render_factsheet(&factsheet));
            CommandResult::success("interview", "session complete, factsheet printed above")
        }
        Err(error) => CommandResult::failure("interview", "finish", error.to_string(), 1),
    }
}

/// Prints a turn failure. Returns `false` when the loop should stop.
fn report_turn_error(error: AgentError) -> bool {
    match error {
        AgentError::QuestionGeneration(cause) => {
            println!("\n[model unavailable: {cause}. Your answer was recorded; try again.]\n");
            true
        }
        other => {
            println!("\n[{other}]\n");
            false
        }
    }
}

fn render_factsheet(factsheet: &Factsheet) -> String {
    let mut lines = vec![
        "=== Year-End Review Factsheet ===".to_string(),
        format!(
            "core topics covered: {} of {} ({}%), rounds: {}",
            factsheet.completion.completed,
            factsheet.completion.total,
            factsheet.completion.percentage,
            factsheet.conversation_rounds,
        ),
    ];

    for section in &factsheet.sections {
        lines.push(format!("\n{}", section.label));
        for entry in &section.entries {
            lines.push(format!("  {}: {}", entry.label, entry.value));
        }
    }

    if !factsheet.skipped_slots.is_empty() {
        lines.push(format!("\nskipped: {}", factsheet.skipped_slots.join(", ")));
    }
    if !factsheet.unanswered_slots.is_empty() {
        lines.push(format!("unanswered: {}", factsheet.unanswered_slots.join(", ")));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use retrospect_core::{Factsheet, InterviewState};

    use super::render_factsheet;

    #[test]
    fn factsheet_rendering_lists_sections_and_gaps() {
        let mut state = InterviewState::new();
        state.apply_update("achievement_1", "Shipped the new billing platform").expect("update");
        state.set_focus(Some("growth_skills".to_string()));
        state.skip_focus().expect("skip");

        let rendered = render_factsheet(&Factsheet::assemble(&state));
        assert!(rendered.contains("Shipped the new billing platform"));
        assert!(rendered.contains("skipped: growth_skills"));
        assert!(rendered.contains("unanswered:"));
        assert!(rendered.contains("1 of 7"));
    }
}
