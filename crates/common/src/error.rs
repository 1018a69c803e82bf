//! Error types shared across Zoomcast crates.

use std::path::PathBuf;

/// Top-level error type for Zoomcast operations.
#[derive(Debug, thiserror::Error)]
pub enum ZoomcastError {
    #[error("Event log error: {message}")]
    EventLog { message: String },

    #[error("Source error: {message}")]
    Source { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Encoder error: {message}")]
    Encoder { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ZoomcastError.
pub type ZoomcastResult<T> = Result<T, ZoomcastError>;

impl ZoomcastError {
    pub fn event_log(msg: impl Into<String>) -> Self {
        Self::EventLog {
            message: msg.into(),
        }
    }

    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder {
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error must abort an in-flight export.
    ///
    /// Encoder, unsupported, and configuration conditions are terminal for
    /// a whole job. Anything else hitting a single frame (a failed seek, a
    /// failed frame read) is tolerated by skipping that frame.
    pub fn is_terminal_for_export(&self) -> bool {
        matches!(
            self,
            Self::Encoder { .. } | Self::Unsupported { .. } | Self::Config { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoder_errors_are_terminal() {
        assert!(ZoomcastError::encoder("codec closed").is_terminal_for_export());
        assert!(ZoomcastError::unsupported("profile").is_terminal_for_export());
    }

    #[test]
    fn frame_level_errors_are_transient() {
        assert!(!ZoomcastError::source("seek failed").is_terminal_for_export());
        assert!(!ZoomcastError::render("draw failed").is_terminal_for_export());
    }
}
