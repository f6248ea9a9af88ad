use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rsvp_http::RsvpService;
use rsvp_model::SqlStatements;
use rsvp_trigger_http::{CliArgs, HttpServer};
use tokio::signal::ctrl_c;

use crate::runtime_config::StoreOptions;

/// Start the RSVP HTTP server.
#[derive(Parser, Debug)]
#[clap(about = "Start the RSVP HTTP server")]
pub struct UpCommand {
    #[clap(flatten)]
    pub http_args: CliArgs,

    #[clap(flatten)]
    pub store: StoreOptions,

    /// Run a SQLite statement such as a migration against the database.
    /// To run from a file, prefix the filename with @ e.g. rsvp up --sqlite @migration.sql
    #[clap(long = "sqlite")]
    pub sqlite_statements: Vec<String>,
}

impl UpCommand {
    pub async fn run(self) -> anyhow::Result<()> {
        let statements = SqlStatements::new(self.sqlite_statements.clone());
        let location = self.store.prepare(&statements)?;
        tracing::info!("Serving RSVPs from {}", location.summary());

        let service = RsvpService::new(location).context("failed to build request router")?;
        let server = Arc::new(HttpServer::new(self.http_args.listen_addr(), service));
        server.serve_until(shutdown_signal()).await
    }
}

/// Completes on Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
            Err(err) => {
                tracing::error!("Failed to install Ctrl+C handler: {err}");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                tracing::error!("Failed to install signal handler: {err}");
                std::future::pending::<()>().await
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
