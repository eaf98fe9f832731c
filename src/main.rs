use clap::Parser;
use std::process::ExitCode;
use updraft::cli;
use updraft::core::user_friendly_error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    cli::init_logging(&cli.build_config().log_level);

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(code) => code,
        Err(e) => {
            user_friendly_error(e).display();
            ExitCode::FAILURE
        }
    }
}
