//! poolftp - Entry Point
//!
//! A multi-client FTP server: one async acceptor feeding a fixed pool of
//! session worker threads.

use anyhow::Context;
use clap::Parser;
use log::info;

use poolftp::Server;
use poolftp::cli::Cli;
use poolftp::server::ServerConfig;
use poolftp::utils::logging::setup_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut config =
        ServerConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(port) = cli.port {
        config.control_port = port;
    }

    info!("Launching FTP server...");

    let server = Server::bind(config)
        .await
        .context("failed to start FTP server")?;
    server.run_until(shutdown_signal()).await?;
    server
        .drain()
        .await
        .context("failed while waiting for sessions to finish")?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
