use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use mdsync_core::keys::DEFAULT_SCROLL_STEP;
use mdsync_core::reconcile::PostProcessPolicy;
use mdsync_core::{SessionOptions, SyncMode};
use url::Url;

use crate::error::ChannelError;

pub const DEFAULT_ADDR: &str = "localhost:2323";
pub const DEFAULT_PATH: &str = "README.md";
pub const DEFAULT_LOG_DIR: &str = ".mdsync/logs";
pub const POLL_INTERVAL: Duration = Duration::from_millis(1000);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_SCROLL_STEP: i64 = 100_000;

const PUSH_ROUTE: &str = "ws/";
const STYLESHEET_ROUTE: &str = "api/get-css";
const EXPORT_ROUTE: &str = "api/post-html";

/// How the logical document path is carried in the push endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PathAddressing {
    /// `ws://<addr>/ws/?path=<path>`
    Query,
    /// `ws://<addr>/ws/<path>`
    Segment,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "mdsync", about = "Mirror a live markdown preview into a local page")]
pub struct Args {
    /// Markdown file to follow, relative to the server root.
    #[arg(default_value = DEFAULT_PATH)]
    pub path: String,
    #[arg(long, env = "MDSYNC_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: String,
    #[arg(long, env = "MDSYNC_MODE", default_value = "push")]
    pub mode: SyncMode,
    #[arg(long, value_enum, default_value_t = PathAddressing::Query)]
    pub addressing: PathAddressing,
    /// Initial stylesheet for the page.
    #[arg(long)]
    pub css: Option<String>,
    /// Write an HTML snapshot of the page here after every change.
    #[arg(long, env = "MDSYNC_OUT")]
    pub out: Option<PathBuf>,
    /// Pixels moved by `j` and `k`.
    #[arg(
        long,
        default_value_t = DEFAULT_SCROLL_STEP,
        value_parser = clap::value_parser!(i64).range(1..=MAX_SCROLL_STEP)
    )]
    pub scroll_step: i64,
    /// Give up on the push handshake after this many milliseconds.
    #[arg(long, default_value_t = CONNECT_TIMEOUT.as_millis() as u64)]
    pub connect_timeout_ms: u64,
    /// Tag task lists on the first push update too.
    #[arg(long)]
    pub tag_first_update: bool,
    #[arg(long, env = "MDSYNC_LOG_DIR", default_value = DEFAULT_LOG_DIR)]
    pub log_dir: String,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub addr: String,
    pub path: String,
    pub mode: SyncMode,
    pub addressing: PathAddressing,
    pub css: Option<String>,
    pub out: Option<PathBuf>,
    pub scroll_step: i64,
    pub tag_first_update: bool,
    pub poll_interval: Duration,
    pub connect_timeout: Duration,
    pub log_dir: String,
    pub log_stdout: bool,
}

impl ClientConfig {
    pub fn from_args(args: Args) -> Self {
        Self {
            addr: args.addr.trim().to_string(),
            path: normalize_path(&args.path),
            mode: args.mode,
            addressing: args.addressing,
            css: args.css.filter(|css| !css.trim().is_empty()),
            out: args.out,
            scroll_step: args.scroll_step,
            tag_first_update: args.tag_first_update,
            poll_interval: POLL_INTERVAL,
            connect_timeout: Duration::from_millis(args.connect_timeout_ms),
            log_dir: args.log_dir,
            log_stdout: resolve_log_stdout(),
        }
    }

    /// Config for a server at `addr` with every other setting at its default.
    pub fn for_addr(addr: &str, mode: SyncMode) -> Self {
        Self {
            addr: addr.trim().to_string(),
            path: DEFAULT_PATH.to_string(),
            mode,
            addressing: PathAddressing::Query,
            css: None,
            out: None,
            scroll_step: DEFAULT_SCROLL_STEP,
            tag_first_update: false,
            poll_interval: POLL_INTERVAL,
            connect_timeout: CONNECT_TIMEOUT,
            log_dir: String::new(),
            log_stdout: false,
        }
    }

    /// Console logging would interleave with raw-mode terminal output, so it
    /// is switched off while the terminal is in raw mode.
    pub fn for_terminal(mut self, raw_mode: bool) -> Self {
        if raw_mode {
            self.log_stdout = false;
        }
        self
    }

    pub fn session_options(&self) -> SessionOptions {
        let mut options = SessionOptions::new(self.mode);
        options.scroll_step = self.scroll_step;
        if self.tag_first_update {
            options.post_process = PostProcessPolicy::Always;
        }
        options
    }

    /// `http://<addr>/`, the root every endpoint hangs off.
    pub fn base_url(&self) -> Result<Url, ChannelError> {
        let addr = self.addr.trim_end_matches('/');
        if addr.is_empty() {
            return Err(ChannelError::Address(self.addr.clone()));
        }
        let raw = if addr.contains("://") {
            format!("{addr}/")
        } else {
            format!("http://{addr}/")
        };
        let url = Url::parse(&raw)?;
        if url.host_str().is_none() {
            return Err(ChannelError::Address(self.addr.clone()));
        }
        Ok(url)
    }

    pub fn push_url(&self) -> Result<Url, ChannelError> {
        let mut url = self.base_url()?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| ChannelError::Address(self.addr.clone()))?;
        let mut url = url.join(PUSH_ROUTE)?;
        match self.addressing {
            PathAddressing::Query => {
                url.query_pairs_mut().append_pair("path", &self.path);
                Ok(url)
            }
            PathAddressing::Segment => Ok(url.join(&self.path)?),
        }
    }

    /// The page URL polled for full updates, addressed like the push endpoint.
    pub fn page_url(&self) -> Result<Url, ChannelError> {
        let mut url = match self.addressing {
            PathAddressing::Query => {
                let mut url = self.base_url()?;
                url.query_pairs_mut().append_pair("path", &self.path);
                url
            }
            PathAddressing::Segment => self.base_url()?.join(&self.path)?,
        };
        url.query_pairs_mut().append_pair("update", "true");
        Ok(url)
    }

    pub fn stylesheet_url(&self, offset: i64) -> Result<Url, ChannelError> {
        let mut url = self.base_url()?.join(STYLESHEET_ROUTE)?;
        url.query_pairs_mut().append_pair("n", &offset.to_string());
        Ok(url)
    }

    pub fn export_url(&self) -> Result<Url, ChannelError> {
        Ok(self.base_url()?.join(EXPORT_ROUTE)?)
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_start_matches("./").trim_start_matches('/');
    if trimmed.is_empty() {
        DEFAULT_PATH.to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn resolve_log_stdout() -> bool {
    std::env::var("MDSYNC_LOG_STDOUT")
        .ok()
        .and_then(|value| parse_bool_flag(&value))
        .unwrap_or(false)
}
