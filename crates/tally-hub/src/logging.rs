use std::{
    fs::{File, OpenOptions},
    io,
    path::Path,
    sync::Arc,
};
use tracing_subscriber::{
    fmt::writer::{BoxMakeWriter, MakeWriterExt},
    EnvFilter,
};

use crate::config::Config;

pub const LOG_FILE_NAME: &str = "tally-hub.log";

/// Keeps the log file open for the lifetime of the process and syncs it on
/// drop.
pub struct LogGuard {
    file: Option<Arc<File>>,
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        if let Some(file) = &self.file {
            let _ = file.sync_all();
        }
    }
}

/// Installs the global subscriber. Output goes to stdout and, when a log
/// directory is configured, to [`LOG_FILE_NAME`] inside it.
pub fn init_logging(config: &Config) -> Option<LogGuard> {
    let file = match open_log_file(&config.log_dir) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("log_file_error: {err}");
            None
        }
    };
    let writer = match &file {
        Some(file) => BoxMakeWriter::new(io::stdout.and(Arc::clone(file))),
        None => BoxMakeWriter::new(io::stdout),
    };

    let directives = filter_directives(
        config.debug,
        std::env::var("RUST_LOG").ok(),
        std::env::var("TALLY_LOG_LEVEL").ok(),
    );
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|err| {
        eprintln!("log_filter_error: {directives:?}: {err}");
        EnvFilter::new("info")
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok()?;
    Some(LogGuard { file })
}

/// `--debug` wins over everything, then `RUST_LOG`, then `TALLY_LOG_LEVEL`.
fn filter_directives(
    debug: bool,
    rust_log: Option<String>,
    tally_level: Option<String>,
) -> String {
    if debug {
        return "debug".to_string();
    }
    [rust_log, tally_level]
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| "info".to_string())
}

fn open_log_file(log_dir: &str) -> io::Result<Option<Arc<File>>> {
    if log_dir.trim().is_empty() {
        return Ok(None);
    }
    let dir = Path::new(log_dir);
    std::fs::create_dir_all(dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE_NAME))?;
    Ok(Some(Arc::new(file)))
}
