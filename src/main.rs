use std::{process::ExitCode, sync::Arc};

use clap::Parser as _;
use devproxy::config::{Args, Config};
use devproxy::cors::CorsForwarder;
use devproxy::forwarder::HttpForwarder;
use devproxy::server::Server;
use tracing::{error, info, info_span, Instrument as _};

mod logging;

#[tokio::main]
async fn main() -> ExitCode {
    // Usage errors exit here, before anything is bound.
    let args = Args::parse();

    if let Err(e) = logging::init_logging_from_env() {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(args).instrument(info_span!("devproxy")).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::from_args(args)?;

    let forwarder = CorsForwarder::new(HttpForwarder::new(config.upstream.clone()));
    let server = Server::bind(&config.listen, Arc::new(forwarder)).await?;

    info!(
        "Dev proxy listening on: {} redirecting to: {}",
        config.listen, config.upstream
    );

    server.run().await
}
