use serde::{Deserialize, Serialize};
use slog::{o, Drain, Logger};

pub use slog;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoggingSettings {
    pub stdout: bool,
    pub level: String,
    pub log_path: Option<String>,
    pub name: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            stdout: true,
            level: String::from("info"),
            log_path: None,
            name: String::from("ledger"),
        }
    }
}

fn parse_level(level: &str) -> Result<slog::Level, std::io::Error> {
    match level {
        "trace" => Ok(slog::Level::Trace),
        "debug" => Ok(slog::Level::Debug),
        "info" => Ok(slog::Level::Info),
        "warn" | "warning" => Ok(slog::Level::Warning),
        "error" => Ok(slog::Level::Error),
        "critical" => Ok(slog::Level::Critical),
        st => Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("Unknown logging level {:?}", st),
        )),
    }
}

/// Builds the root logger. Stdout and file drains are duplicated when both
/// are configured; with neither, records are discarded.
pub fn init_log(config: &LoggingSettings) -> Result<Logger, std::io::Error> {
    let LoggingSettings {
        stdout,
        level,
        log_path,
        name,
    } = config;

    let level = parse_level(level.as_str())?;

    let drain_stdout_async = if *stdout {
        let decorator = slog_term::TermDecorator::new().build();
        let drain = slog_term::FullFormat::new(decorator).build().fuse();
        Some(slog_async::Async::new(drain).build().fuse())
    } else {
        None
    };

    let file_drain = match log_path {
        Some(path) => Some(build_file_drain(path)?),
        None => None,
    };

    let logger = match (drain_stdout_async, file_drain) {
        (Some(drain_stdout), Some(file_drain)) => {
            let drain = slog::Duplicate::new(drain_stdout, file_drain).fuse();
            let filter_drain = slog::LevelFilter::new(drain, level).fuse();
            slog::Logger::root(filter_drain, o!("name" => name.to_string()))
        }
        (Some(drain_stdout), None) => {
            let filter_drain = slog::LevelFilter::new(drain_stdout, level).fuse();
            slog::Logger::root(filter_drain, o!("name" => name.to_string()))
        }
        (None, Some(file_drain)) => {
            let filter_drain = slog::LevelFilter::new(file_drain, level).fuse();
            slog::Logger::root(filter_drain, o!("name" => name.to_string()))
        }
        (None, None) => discard(),
    };

    Ok(logger)
}

/// Logger that drops everything. Used by tests and embedders without logging.
pub fn discard() -> Logger {
    slog::Logger::root(slog::Discard, o!())
}

fn build_file_drain(log_path: &str) -> Result<slog::Fuse<slog_async::Async>, std::io::Error> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    let decorator = slog_term::PlainSyncDecorator::new(file);
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Ok(drain)
}
