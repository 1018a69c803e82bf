//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default export settings.
    pub export: ExportDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDefaults {
    /// Frame sampling rate for export (frames per second).
    pub fps: u32,

    /// Target video bitrate in kbit/s.
    pub video_bitrate_kbps: u32,

    /// Maximum coded area (width * height) accepted by the encoder
    /// profile. 1920x1080 for H.264 High at level 4.0.
    pub max_coded_area: u32,

    /// Default output file name.
    pub output_name: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "zoomcast=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            export: ExportDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            fps: 40,
            video_bitrate_kbps: 8000,
            max_coded_area: 1920 * 1080,
            output_name: "zoomcast-export.mp4".to_string(),
        }
    }
}

impl ExportDefaults {
    /// Output name with a local-time suffix so repeated exports of the
    /// same source never overwrite each other.
    pub fn timestamped_output_name(&self) -> String {
        let stem = self.output_name.trim_end_matches(".mp4");
        format!("{stem}-{}.mp4", chrono::Local::now().format("%Y%m%d-%H%M%S"))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("zoomcast").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_defaults_respect_encoder_budget() {
        let defaults = ExportDefaults::default();
        assert_eq!(defaults.max_coded_area, 2_073_600);
        assert_eq!(defaults.fps, 40);
    }

    #[test]
    fn config_roundtrips_through_json() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.export.fps, config.export.fps);
        assert_eq!(parsed.logging.level, config.logging.level);
    }

    #[test]
    fn timestamped_name_keeps_stem_and_extension() {
        let name = ExportDefaults::default().timestamped_output_name();
        assert!(name.starts_with("zoomcast-export-"));
        assert!(name.ends_with(".mp4"));
        assert_eq!(name.len(), "zoomcast-export-".len() + 15 + ".mp4".len());
    }
}
