//! Poll mode: fixed-interval page fetches plus one-off stylesheet and export requests.

use mdsync_core::{Outbound, PagePort, Session, StylesheetReference};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::ChannelError;
use crate::input::{apply_input, Input};

/// Result of a finished fetch, delivered back to the session loop.
#[derive(Debug)]
enum Fetched {
    Page(String),
    Stylesheet(String),
    Exported(String),
}

/// Run a poll session until the input channel closes, then hand the session back.
pub async fn run_poll<P: PagePort>(
    config: &ClientConfig,
    mut session: Session<P>,
    mut inputs: mpsc::Receiver<Input>,
) -> Session<P> {
    let client = Client::new();
    let page_url = match config.page_url() {
        Ok(url) => Some(url),
        Err(err) => {
            error!("poll_endpoint_error: {err}");
            None
        }
    };
    let (tx, mut rx) = mpsc::channel::<Fetched>(64);
    let mut ticker = tokio::time::interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(url) = &page_url {
                    spawn_fetch(client.clone(), url.clone(), tx.clone(), Fetched::Page);
                }
            }
            Some(fetched) = rx.recv() => match fetched {
                Fetched::Page(body) => session.apply_poll_body(&body),
                Fetched::Stylesheet(path) => {
                    let path = path.trim();
                    if path.is_empty() {
                        warn!("css_fetch_empty");
                    } else {
                        session.apply_stylesheet(&StylesheetReference::new(path));
                    }
                }
                Fetched::Exported(reply) => info!("export_response: {reply}"),
            },
            input = inputs.recv() => {
                let Some(input) = input else {
                    break;
                };
                for outbound in apply_input(&mut session, input) {
                    dispatch(config, &client, &tx, outbound);
                }
            }
        }
    }
    session
}

fn dispatch(config: &ClientConfig, client: &Client, tx: &mpsc::Sender<Fetched>, outbound: Outbound) {
    match outbound {
        Outbound::FetchStylesheet { offset } => match config.stylesheet_url(offset) {
            Ok(url) => spawn_fetch(client.clone(), url, tx.clone(), Fetched::Stylesheet),
            Err(err) => warn!("css_fetch_error: {err}"),
        },
        Outbound::ExportMarkup(markup) => match config.export_url() {
            Ok(url) => spawn_export(client.clone(), url, markup, tx.clone()),
            Err(err) => warn!("export_error: {err}"),
        },
        Outbound::Command(command) => {
            debug!("poll_command_dropped: {}", command.tag());
        }
    }
}

fn spawn_fetch(
    client: Client,
    url: Url,
    tx: mpsc::Sender<Fetched>,
    wrap: fn(String) -> Fetched,
) {
    tokio::spawn(async move {
        match fetch_text(&client, url.clone()).await {
            Ok(body) => {
                let _ = tx.send(wrap(body)).await;
            }
            Err(err) => warn!("fetch_error: {url}: {err}"),
        }
    });
}

fn spawn_export(client: Client, url: Url, markup: String, tx: mpsc::Sender<Fetched>) {
    tokio::spawn(async move {
        match post_markup(&client, url, markup).await {
            Ok(reply) => {
                let _ = tx.send(Fetched::Exported(reply)).await;
            }
            Err(err) => warn!("export_error: {err}"),
        }
    });
}

async fn fetch_text(client: &Client, url: Url) -> Result<String, ChannelError> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.text().await?)
}

async fn post_markup(client: &Client, url: Url, markup: String) -> Result<String, ChannelError> {
    let response = client
        .post(url)
        .header(CONTENT_TYPE, "text/html")
        .body(markup)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.text().await?)
}
