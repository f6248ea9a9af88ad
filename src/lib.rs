//! The `rsvp` command line.

pub mod commands;
pub mod runtime_config;

use clap::Parser;

use crate::commands::{up::UpCommand, wagi::WagiCommand};

/// The RSVP service.
#[derive(Parser, Debug)]
#[clap(name = "rsvp", version)]
pub enum RsvpApp {
    /// Start the RSVP HTTP server.
    #[clap(alias = "serve")]
    Up(UpCommand),
    /// Handle a single request passed in CGI (WAGI) form.
    Wagi(WagiCommand),
}

impl RsvpApp {
    /// The main entry point to RSVP.
    pub async fn run(self) -> anyhow::Result<()> {
        match self {
            Self::Up(cmd) => cmd.run().await,
            Self::Wagi(cmd) => cmd.run(),
        }
    }
}
