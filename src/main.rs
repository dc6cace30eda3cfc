use std::process::ExitCode;

use bioos_mcp_gateway::{cli, infra};

#[tokio::main]
async fn main() -> ExitCode {
    infra::logging::init();

    // With a subcommand we act as an admin CLI; without one we serve.
    if std::env::args().len() > 1 {
        return cli::run().await;
    }

    match infra::boot::run_server().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "gateway terminated");
            ExitCode::FAILURE
        }
    }
}
