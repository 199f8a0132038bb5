mod activity;
mod alerts;
mod cli;
mod cmd;
mod command;
mod config;
mod dashboard;
mod errors;
mod filechange;
mod history;
mod interrupt;
mod logger;
mod multiplexer;
mod robot;
mod send;
mod session_state;
mod snapshot;

use anyhow::Result;
use tracing::{error, info};

fn main() -> Result<()> {
    logger::init()?;
    info!(args = ?std::env::args().collect::<Vec<_>>(), "nzm start");

    match cli::run() {
        Ok(result) => {
            info!("nzm finished successfully");
            Ok(result)
        }
        Err(err) => {
            error!(error = ?err, "nzm failed");
            Err(err)
        }
    }
}
