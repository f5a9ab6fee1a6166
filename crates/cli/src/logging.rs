use std::fs::{self, File};
use std::path::Path;
use std::sync::Mutex;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use vaultsync_core::config::ResolvedConfig;

/// Keeps the background log writer alive for the life of the process.
static FILE_WRITER: Mutex<Option<WorkerGuard>> = Mutex::new(None);

/// Install the stderr layer and, when `[logging] file` is set, a file layer.
///
/// `RUST_LOG` takes precedence over both configured levels.
pub fn init(cfg: &ResolvedConfig) {
    let logging = &cfg.logging;
    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::env::var_os("NO_COLOR").is_none())
        .with_target(false)
        .with_filter(filter(&logging.level, LevelFilter::INFO));

    let file = logging.file.as_deref().map(|path| {
        let level = logging.file_level.as_deref().unwrap_or(&logging.level);
        fmt::layer()
            .with_writer(open_file_writer(path))
            .with_ansi(false)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(filter(level, LevelFilter::DEBUG))
    });

    // An absent file layer is `None`, which the registry treats as a no-op.
    tracing_subscriber::registry().with(stderr).with(file).init();
}

fn filter(level: &str, fallback: LevelFilter) -> EnvFilter {
    let level = parse_level(level).unwrap_or(fallback);
    EnvFilter::builder().with_default_directive(level.into()).from_env_lossy()
}

fn open_file_writer(path: &Path) -> NonBlocking {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let file = File::create(path).unwrap_or_else(|e| {
        eprintln!("Failed to create log file {}: {}", path.display(), e);
        std::process::exit(1);
    });

    let (writer, guard) = tracing_appender::non_blocking(file);
    if let Ok(mut slot) = FILE_WRITER.lock() {
        *slot = Some(guard);
    }
    writer
}

fn parse_level(s: &str) -> Option<LevelFilter> {
    match s.to_ascii_lowercase().as_str() {
        "off" => Some(LevelFilter::OFF),
        "error" => Some(LevelFilter::ERROR),
        "warn" => Some(LevelFilter::WARN),
        "info" => Some(LevelFilter::INFO),
        "debug" => Some(LevelFilter::DEBUG),
        "trace" => Some(LevelFilter::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("error"), Some(LevelFilter::ERROR));
        assert_eq!(parse_level("WARN"), Some(LevelFilter::WARN));
        assert_eq!(parse_level("Info"), Some(LevelFilter::INFO));
        assert_eq!(parse_level("trace"), Some(LevelFilter::TRACE));
        assert_eq!(parse_level("off"), Some(LevelFilter::OFF));
        assert_eq!(parse_level("chatty"), None);
        assert_eq!(parse_level(""), None);
    }
}
