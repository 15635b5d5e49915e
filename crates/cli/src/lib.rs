pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "retrospect",
    about = "Retrospect operator CLI",
    long_about = "Inspect configuration, list the interview slot schema, run readiness checks, \
                  and hold an interview directly in the terminal.",
    after_help = "Examples:\n  retrospect doctor --json\n  retrospect config\n  retrospect interview"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "List the interview slot schema with categories and required markers")]
    Slots {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Validate config and completion-endpoint readiness without network calls")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run an interactive interview session in the terminal")]
    Interview,
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Slots { json } => {
            commands::CommandResult { exit_code: 0, output: commands::slots::run(json) }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Interview => commands::interview::run().await,
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
