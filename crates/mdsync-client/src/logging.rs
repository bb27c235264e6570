use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing_subscriber::{fmt::writer::BoxMakeWriter, EnvFilter};

use crate::config::ClientConfig;

type SharedFile = Arc<Mutex<std::fs::File>>;

/// Keeps the log file open for the life of the process.
pub struct LogGuard {
    file: Option<SharedFile>,
    path: Option<PathBuf>,
}

impl LogGuard {
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

struct MultiWriter {
    stdout_enabled: bool,
    file: Option<SharedFile>,
}

pub fn init_logging(config: &ClientConfig) -> Option<LogGuard> {
    let level = std::env::var("MDSYNC_LOG_LEVEL")
        .ok()
        .filter(|level| !level.trim().is_empty())
        .unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let guard = match open_log_file(&config.log_dir, &config.path) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("log_file_error: {err}");
            LogGuard {
                file: None,
                path: None,
            }
        }
    };
    let file = guard.file.clone();
    let stdout_enabled = config.log_stdout;
    let make_writer = BoxMakeWriter::new(move || MultiWriter::new(file.clone(), stdout_enabled));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(make_writer)
        .with_ansi(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return None;
    }
    Some(guard)
}

impl MultiWriter {
    fn new(file: Option<SharedFile>, stdout_enabled: bool) -> Self {
        Self {
            stdout_enabled,
            file,
        }
    }
}

impl Write for MultiWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.stdout_enabled {
            let _ = io::stdout().write_all(buf);
        }
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.write_all(buf);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.stdout_enabled {
            let _ = io::stdout().flush();
        }
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
        Ok(())
    }
}

fn open_log_file(log_dir: &str, document: &str) -> io::Result<LogGuard> {
    if log_dir.trim().is_empty() {
        return Ok(LogGuard {
            file: None,
            path: None,
        });
    }
    let dir = PathBuf::from(log_dir);
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(log_file_name(document));
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok(LogGuard {
        file: Some(Arc::new(Mutex::new(file))),
        path: Some(path),
    })
}

pub fn log_file_name(document: &str) -> String {
    format!("mdsync-{}.log", sanitize_component(document))
}

pub fn sanitize_component(input: &str) -> String {
    input
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}
