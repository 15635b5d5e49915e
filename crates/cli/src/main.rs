use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    retrospect_cli::run().await
}
