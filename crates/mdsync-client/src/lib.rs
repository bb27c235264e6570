//! Terminal client for a live markdown preview server.
//!
//! Pairs the sans-IO [`mdsync_core::Session`] with a [`page::HeadlessPage`]
//! and drives it over a WebSocket ([`push`]) or HTTP polling ([`poll`]).

pub mod config;
pub mod error;
pub mod highlight;
pub mod input;
pub mod logging;
pub mod page;
pub mod poll;
pub mod push;

use mdsync_core::{PagePort, Session, SyncMode};
use tokio::sync::mpsc;

use crate::config::ClientConfig;
use crate::highlight::CodeHighlighter;
use crate::input::Input;
use crate::page::HeadlessPage;

/// Build the headless page described by `config`.
pub fn build_page(config: &ClientConfig) -> HeadlessPage {
    let mut page = HeadlessPage::new()
        .with_title(config.path.clone())
        .with_highlighter(CodeHighlighter::new());
    if let Ok(base) = config.base_url() {
        page = page.with_base(base.to_string());
    }
    if let Some(css) = &config.css {
        page = page.with_stylesheet(css);
    }
    if let Some(out) = &config.out {
        page = page.with_snapshot(out.clone());
    }
    page
}

/// Run the channel selected by `config.mode` until `inputs` closes.
pub async fn run<P: PagePort>(
    config: &ClientConfig,
    page: P,
    inputs: mpsc::Receiver<Input>,
) -> Session<P> {
    let session = Session::new(page, config.session_options());
    match config.mode {
        SyncMode::Push => push::run_push(config, session, inputs).await,
        SyncMode::Poll => poll::run_poll(config, session, inputs).await,
    }
}
