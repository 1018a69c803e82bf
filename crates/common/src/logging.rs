//! Logging and tracing initialization.
//!
//! Output goes to stderr by default; set [`LoggingConfig::file`] to append
//! to a log file instead (ANSI colors are disabled for file sinks).

use std::fs::File;
use std::sync::Arc;

use crate::config::LoggingConfig;

/// Initialize the tracing subscriber with the given configuration.
///
/// An unreadable log file falls back to stderr rather than failing startup.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_sink = config.file.as_deref().and_then(|path| {
        match File::options().create(true).append(true).open(path) {
            Ok(file) => Some(Arc::new(file)),
            Err(err) => {
                eprintln!("failed to open log file {}: {err}", path.display());
                None
            }
        }
    });

    match (file_sink, config.json) {
        (Some(sink), true) => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_writer(sink)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        (Some(sink), false) => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_writer(sink)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        (None, true) => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        (None, false) => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
    }
}

/// Initialize logging with defaults (useful for tests and quick scripts).
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_with_file_sink_creates_the_file() {
        let dir = std::env::temp_dir().join("zoomcast-logging-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("zoomcast-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);

        init_logging(&LoggingConfig {
            level: "info".to_string(),
            json: false,
            file: Some(path.clone()),
        });

        // The sink is opened during init even if another test already
        // installed the global subscriber.
        assert!(path.exists());
        let _ = std::fs::remove_file(&path);
    }
}
