use std::io::{self, IsTerminal};

use anyhow::Context;
use clap::Parser;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use mdsync_client::config::{Args, ClientConfig};
use mdsync_client::input::{read_terminal_keys, Input};
use mdsync_client::logging::init_logging;
use mdsync_client::{build_page, run};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let interactive = io::stdin().is_terminal();
    let config = ClientConfig::from_args(args).for_terminal(interactive);
    let _log_guard = init_logging(&config);
    config
        .base_url()
        .with_context(|| format!("invalid server address '{}'", config.addr))?;
    info!(event = "client_start", mode = %config.mode, addr = %config.addr, path = %config.path);

    let (tx, rx) = mpsc::channel::<Input>(64);
    if interactive {
        enable_raw_mode().context("enable raw mode")?;
        tokio::spawn(read_terminal_keys(tx));
    } else {
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("signal_error: {err}");
            }
            drop(tx);
        });
    }

    let page = build_page(&config);
    let session = run(&config, page, rx).await;

    if interactive {
        disable_raw_mode().context("disable raw mode")?;
    }
    info!(event = "client_stop", updates = session.updates_applied(), connection = ?session.connection());
    Ok(())
}
