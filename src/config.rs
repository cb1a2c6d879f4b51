//! Configuration for eva-controller.
//!
//! Loaded from an optional TOML file; every field has a default matching the
//! constants the original Python controller hardcoded, so the daemon runs
//! with zero configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub socket: SocketConfig,
    #[serde(default)]
    pub debounce: DebounceConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub stage: StageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketConfig {
    /// Path the control server listens on (spec §6).
    pub control_path: PathBuf,
    /// Symlink prefix used when the derived Hyprland IPC directory would
    /// exceed the Unix socket path length budget (spec §4.A, §6).
    pub short_path_prefix: String,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            control_path: PathBuf::from("/tmp/hyprland_controller.sock"),
            short_path_prefix: "/tmp/.eva-controller".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DebounceConfig {
    /// Minimum spacing between processed open/close events per workspace
    /// (spec §4.F.4, centralised per spec §9's design note).
    pub stage_event_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self { stage_event_ms: 100 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CacheConfig {
    pub short_ttl_secs: u64,
    /// Unused today (no query kind currently asks for a long-lived cache
    /// entry) but kept named since the original distinguished it; see
    /// SPEC_FULL.md Open Questions.
    pub long_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            short_ttl_secs: 1,
            long_ttl_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StageConfig {
    /// Maximum windows per stage-manager group before a new group starts
    /// (spec §4.F.1).
    pub max_group_size: usize,
    pub main_width_fraction: f64,
    pub main_height_fraction: f64,
    pub main_right_padding: i32,
    pub mini_width_fraction: f64,
    pub mini_height_fraction: f64,
    pub mini_vertical_gap: i32,
    pub mini_horizontal_gap: i32,
    /// Retry budget when a freshly applied layout doesn't change the ledger
    /// length (spec §4.F.6).
    pub apply_retry_attempts: u32,
    pub apply_retry_spacing_secs: u64,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            max_group_size: 10,
            main_width_fraction: 0.80,
            main_height_fraction: 0.90,
            main_right_padding: 20,
            mini_width_fraction: 0.18,
            mini_height_fraction: 0.24,
            mini_vertical_gap: 30,
            mini_horizontal_gap: 30,
            apply_retry_attempts: 5,
            apply_retry_spacing_secs: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub logfile: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            logfile: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket: SocketConfig::default(),
            debounce: DebounceConfig::default(),
            cache: CacheConfig::default(),
            stage: StageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults (with
    /// a logged warning, not an error) when the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            log::warn!(
                "config file {} not found, using defaults",
                path.display()
            );
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.stage.max_group_size == 0 {
            return Err("stage.max_group_size must be non-zero".into());
        }
        if !(0.0..=1.0).contains(&self.stage.main_width_fraction)
            || !(0.0..=1.0).contains(&self.stage.main_height_fraction)
            || !(0.0..=1.0).contains(&self.stage.mini_width_fraction)
            || !(0.0..=1.0).contains(&self.stage.mini_height_fraction)
        {
            return Err("stage layout fractions must be in [0, 1]".into());
        }
        if self.cache.short_ttl_secs == 0 {
            return Err("cache.short_ttl_secs must be non-zero".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = Config::load(Path::new("/nonexistent/eva-controller.toml")).unwrap();
        assert_eq!(cfg.stage.max_group_size, 10);
    }

    #[test]
    fn rejects_bad_fraction() {
        let mut cfg = Config::default();
        cfg.stage.main_width_fraction = 1.5;
        assert!(cfg.validate().is_err());
    }
}
