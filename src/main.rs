use std::process::ExitCode;

use clap::Parser;

use tim_agent_core::cli::Cli;
use tim_agent_core::Invocation;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let executor = cli.executor();
    let cli_path = cli.cli_path.clone();
    let options = cli.into_options();

    match Invocation::run(options, executor, cli_path).await {
        Ok(result) => {
            if result.killed_by_inactivity {
                log::error!("agent killed after inactivity timeout");
                return ExitCode::FAILURE;
            }
            if let Some(failure) = &result.failure {
                log::error!("agent reported failure: {}", failure.summary);
                return ExitCode::FAILURE;
            }
            match result.exit_code {
                Some(code) if code != 0 => ExitCode::from(code as u8),
                _ => ExitCode::SUCCESS,
            }
        }
        Err(e) => {
            log::error!("invocation failed: {e}");
            ExitCode::FAILURE
        }
    }
}
