//! Runner configuration.
//!
//! Loaded from `ronin.toml`; every field has a default so a partial or
//! missing file still yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::filter::{EnvFilter, ParseError};

/// Configuration file name.
pub const CONFIG_FILE: &str = "ronin.toml";

/// Tracing filter used until a configuration names another.
pub const DEFAULT_LOG_FILTER: &str = "ronin=info";

/// Runner configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Simulation ===
    /// Simulated frames per second; the frame delta is its reciprocal
    pub target_fps: u32,
    /// Hard cap on simulated frames
    pub frame_limit: u64,
    /// Seed for enemy decisions
    pub seed: u64,
    /// Frames to keep simulating after the level leaves `Normal`
    pub linger_frames: u64,

    // === Data ===
    /// Level layout TOML (built-in demo level when unset)
    pub layout_path: Option<PathBuf>,
    /// Move set TOML (built-in roster when unset)
    pub moveset_path: Option<PathBuf>,
    /// Input script JSON (no input when unset)
    pub script_path: Option<PathBuf>,

    // === Output ===
    /// Where the JSON report is written (stdout when unset)
    pub output_path: Option<PathBuf>,
    /// Pretty-print the JSON report
    pub pretty: bool,
    /// Default tracing filter directive
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            frame_limit: 3600,
            seed: 0x5eed,
            linger_frames: 0,

            layout_path: None,
            moveset_path: None,
            script_path: None,

            output_path: None,
            pretty: true,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl EngineConfig {
    /// Reads `path`, falling back to defaults when the file is missing or
    /// malformed. Values read from disk are clamped by [`Self::validate`].
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No config at {}, running with defaults", path.display());
                return Self::default();
            },
            Err(e) => {
                warn!("Cannot read {}: {e}; running with defaults", path.display());
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&source) {
            Ok(mut config) => {
                config.validate();
                info!(
                    "Run config from {}: {} fps, limit {} frames, seed {:#x}",
                    path.display(),
                    config.target_fps,
                    config.frame_limit,
                    config.seed
                );
                config
            },
            Err(e) => {
                warn!("Ignoring malformed {}: {e}", path.display());
                Self::default()
            },
        }
    }

    /// Writes the configuration as TOML, creating missing parent directories.
    pub fn save_to(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let source = toml::to_string_pretty(self).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, source)?;
        info!("Wrote run config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.target_fps = self.target_fps.clamp(10, 240);
        self.frame_limit = self.frame_limit.clamp(1, 1_000_000);
        self.linger_frames = self.linger_frames.min(self.frame_limit);
        if self.log_filter.trim().is_empty() {
            self.log_filter = DEFAULT_LOG_FILTER.to_string();
        }
    }

    /// Tracing filter for this run. A non-empty `env` (the `RUST_LOG`
    /// value) wins over the configured directives.
    pub fn env_filter(&self, env: Option<&str>) -> Result<EnvFilter, ParseError> {
        match env.map(str::trim).filter(|env| !env.is_empty()) {
            Some(env) => EnvFilter::try_new(env),
            None => EnvFilter::try_new(&self.log_filter),
        }
    }

    /// Frame delta in seconds.
    #[must_use]
    pub fn frame_dt(&self) -> f32 {
        1.0 / self.target_fps.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.target_fps, 60);
        assert_eq!(config.log_filter, "ronin=info");
        assert!(config.layout_path.is_none());
        assert!((config.frame_dt() - 1.0 / 60.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig {
            target_fps: 1,
            frame_limit: 0,
            linger_frames: 50,
            log_filter: "  ".to_string(),
            ..EngineConfig::default()
        };

        config.validate();

        assert_eq!(config.target_fps, 10);
        assert_eq!(config.frame_limit, 1);
        assert_eq!(config.linger_frames, 1);
        assert_eq!(config.log_filter, "ronin=info");
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join(CONFIG_FILE);

        let config = EngineConfig {
            seed: 12345,
            frame_limit: 600,
            script_path: Some(PathBuf::from("scripts/advance.json")),
            pretty: false,
            ..EngineConfig::default()
        };
        config.save_to(&config_path).expect("Failed to save config");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "seed = 9\ntarget_fps = 1000\n").expect("write");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded.seed, 9);
        assert_eq!(loaded.target_fps, 240);
        assert_eq!(loaded.frame_limit, 3600);
    }

    #[test]
    fn test_config_load_missing_or_invalid_file() {
        let config = EngineConfig::load_from("/nonexistent/path/ronin.toml");
        assert_eq!(config, EngineConfig::default());

        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "seed = \"not a number\"").expect("write");
        assert_eq!(EngineConfig::load_from(&config_path), EngineConfig::default());
    }

    #[test]
    fn test_env_filter_prefers_environment() {
        let config = EngineConfig {
            log_filter: "ronin_gameplay=debug".to_string(),
            ..EngineConfig::default()
        };

        let configured = config.env_filter(None).expect("configured filter");
        assert!(configured.to_string().contains("ronin_gameplay=debug"));
        let blank = config.env_filter(Some("  ")).expect("blank env");
        assert!(blank.to_string().contains("ronin_gameplay=debug"));
        let env = config.env_filter(Some("ronin_engine=trace")).expect("env filter");
        assert!(env.to_string().contains("ronin_engine=trace"));

        let broken = EngineConfig {
            log_filter: "ronin=loudest".to_string(),
            ..EngineConfig::default()
        };
        assert!(broken.env_filter(None).is_err());
    }

    #[test]
    fn test_unreadable_path_falls_back_to_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        // a directory exists but cannot be read as a file
        assert_eq!(EngineConfig::load_from(temp_dir.path()), EngineConfig::default());
        assert_eq!(EngineConfig::default().log_filter, DEFAULT_LOG_FILTER);
    }
}
