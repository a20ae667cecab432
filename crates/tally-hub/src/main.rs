use std::process::ExitCode;

use tally_hub::{config::Config, logging::init_logging};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::load();
    let _log_guard = init_logging(&config);
    match tally_hub::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(event = "hub_failed", error = %err);
            ExitCode::FAILURE
        }
    }
}
