//! ftpserv - Entry Point

use clap::Parser;
use log::{error, info};
use std::process::ExitCode;
use std::sync::Arc;

use ftpserv::cli::Cli;
use ftpserv::{Listener, ServerConfig, ServerContext, logging};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match ServerConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    cli.apply(&mut config);
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    logging::init(config.log_file.as_deref());
    info!("Launching FTP server...");

    let context = Arc::new(ServerContext::local(config));
    let listener = match Listener::bind(context).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Server startup failed: {}", e);
            eprintln!("Server startup failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received"),
            Err(e) => {
                error!("Cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    match listener.run(shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
