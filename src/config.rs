//! Configuration management for packed-alu.
//!
//! Configuration is loaded from multiple sources in priority order:
//! 1. Environment variables (PACKED_ALU_WAVE_SIZE, etc.)
//! 2. Project-local config file (`./packed-alu.toml`)
//! 3. User config file (`~/.config/packed-alu/config.toml`)
//! 4. Built-in defaults
//!
//! # Config File Format
//!
//! ```toml
//! # packed-alu.toml
//!
//! # Lanes per wavefront (32 or 64)
//! wave_size = 64
//!
//! # VGPRs in the unified register file
//! vgprs = 512
//!
//! # First register of the accumulator half
//! accum_offset = 256
//!
//! # binary16 rounding: nearest, up, down, zero
//! rounding = "nearest"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

use crate::alu::{AccumWindow, RoundingMode, WaveContext};

/// Global cached configuration.
static CONFIG: OnceLock<Config> = OnceLock::new();

pub const DEFAULT_WAVE_SIZE: usize = 64;
pub const DEFAULT_VGPRS: usize = 512;
pub const DEFAULT_ACCUM_OFFSET: u32 = 256;

/// Invalid configuration values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("wave size must be 32 or 64, got {0}")]
    WaveSize(usize),

    #[error("accumulator offset {offset} leaves no room in a {vgprs}-register file")]
    AccumWindow { offset: u32, vgprs: usize },

    #[error("unknown rounding mode: {0}")]
    Rounding(String),
}

/// packed-alu configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Lanes per wavefront.
    pub wave_size: Option<usize>,

    /// Registers in the unified VGPR/accumulator file.
    pub vgprs: Option<usize>,

    /// Register index where the accumulator half begins.
    pub accum_offset: Option<u32>,

    /// binary16 rounding mode name.
    pub rounding: Option<String>,
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Project-local `packed-alu.toml`
    /// 3. User config `~/.config/packed-alu/config.toml`
    /// 4. Defaults
    pub fn load() -> Self {
        let mut config = Self::default();

        // Load user config first (lowest priority of file configs)
        if let Some(user_config) = Self::load_user_config() {
            config.merge(user_config);
        }

        // Load project-local config (higher priority)
        if let Some(local_config) = Self::load_local_config() {
            config.merge(local_config);
        }

        // Environment variables override everything
        config.apply_env_overrides();

        config
    }

    /// Get the cached global configuration.
    ///
    /// Loads configuration on first call and caches it.
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(|| {
            let config = Self::load();
            log::debug!("Loaded configuration: {:?}", config);
            config
        })
    }

    pub fn wave_size(&self) -> usize {
        self.wave_size.unwrap_or(DEFAULT_WAVE_SIZE)
    }

    pub fn vgprs(&self) -> usize {
        self.vgprs.unwrap_or(DEFAULT_VGPRS)
    }

    pub fn accum_offset(&self) -> u32 {
        self.accum_offset.unwrap_or(DEFAULT_ACCUM_OFFSET)
    }

    /// Rounding mode, defaulting to round-to-nearest-even.
    pub fn rounding_mode(&self) -> Result<RoundingMode, ConfigError> {
        match self.rounding.as_deref() {
            None => Ok(RoundingMode::default()),
            Some(name) => match name.to_ascii_lowercase().as_str() {
                "nearest" | "rne" | "even" => Ok(RoundingMode::TiesToEven),
                "up" | "positive" => Ok(RoundingMode::TowardPositive),
                "down" | "negative" => Ok(RoundingMode::TowardNegative),
                "zero" | "truncate" => Ok(RoundingMode::TowardZero),
                _ => Err(ConfigError::Rounding(name.to_string())),
            },
        }
    }

    /// Check that the values describe a usable register file.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let wave = self.wave_size();
        if wave != 32 && wave != 64 {
            return Err(ConfigError::WaveSize(wave));
        }
        let offset = self.accum_offset();
        if offset as usize >= self.vgprs() {
            return Err(ConfigError::AccumWindow {
                offset,
                vgprs: self.vgprs(),
            });
        }
        self.rounding_mode()?;
        Ok(())
    }

    /// A zeroed wavefront sized by this configuration.
    pub fn wave_context(&self) -> Result<WaveContext, ConfigError> {
        self.validate()?;
        Ok(WaveContext::new(self.wave_size(), self.vgprs())
            .with_accum(AccumWindow::new(self.accum_offset())))
    }

    /// Load user configuration from ~/.config/packed-alu/config.toml
    fn load_user_config() -> Option<Self> {
        let config_path = Self::user_config_path()?;
        Self::load_from_file(&config_path)
    }

    /// Load project-local configuration from ./packed-alu.toml
    fn load_local_config() -> Option<Self> {
        Self::load_from_file(Path::new("packed-alu.toml"))
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Merge another config into this one.
    /// Only overrides fields that are Some in the other config.
    fn merge(&mut self, other: Self) {
        if other.wave_size.is_some() {
            self.wave_size = other.wave_size;
        }
        if other.vgprs.is_some() {
            self.vgprs = other.vgprs;
        }
        if other.accum_offset.is_some() {
            self.accum_offset = other.accum_offset;
        }
        if other.rounding.is_some() {
            self.rounding = other.rounding;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(key: &str, raw: &str) -> Option<T> {
            match raw.trim().parse() {
                Ok(v) => {
                    log::info!("Using {} from environment: {}", key, raw);
                    Some(v)
                }
                Err(_) => {
                    log::warn!("Ignoring {}: not a number: {}", key, raw);
                    None
                }
            }
        }

        if let Some(raw) = lookup("PACKED_ALU_WAVE_SIZE") {
            if let Some(v) = parsed("PACKED_ALU_WAVE_SIZE", &raw) {
                self.wave_size = Some(v);
            }
        }
        if let Some(raw) = lookup("PACKED_ALU_VGPRS") {
            if let Some(v) = parsed("PACKED_ALU_VGPRS", &raw) {
                self.vgprs = Some(v);
            }
        }
        if let Some(raw) = lookup("PACKED_ALU_ACCUM_OFFSET") {
            if let Some(v) = parsed("PACKED_ALU_ACCUM_OFFSET", &raw) {
                self.accum_offset = Some(v);
            }
        }
        if let Some(raw) = lookup("PACKED_ALU_ROUNDING") {
            log::info!("Using PACKED_ALU_ROUNDING from environment: {}", raw);
            self.rounding = Some(raw);
        }
    }

    /// Get the path to the user config file (for display/creation).
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("packed-alu").join("config.toml"))
    }

    /// Generate a sample config file content.
    pub fn sample_config() -> String {
        r#"# packed-alu configuration
# Place this file at ~/.config/packed-alu/config.toml or ./packed-alu.toml

# Lanes per wavefront (32 or 64)
wave_size = 64

# Registers in the unified VGPR/accumulator file
vgprs = 512

# First accumulator register; v_accvgpr_read/write add this to their index
accum_offset = 256

# binary16 rounding mode: nearest, up, down, zero
# rounding = "nearest"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.wave_size(), 64);
        assert_eq!(config.vgprs(), 512);
        assert_eq!(config.accum_offset(), 256);
        assert_eq!(config.rounding_mode(), Ok(RoundingMode::TiesToEven));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config {
            wave_size: Some(32),
            vgprs: None,
            accum_offset: Some(128),
            rounding: None,
        };

        let overlay = Config {
            wave_size: None,
            vgprs: Some(256),
            accum_offset: Some(64),
            rounding: Some("zero".to_string()),
        };

        base.merge(overlay);

        // wave_size unchanged (overlay was None)
        assert_eq!(base.wave_size, Some(32));
        // vgprs set from overlay
        assert_eq!(base.vgprs, Some(256));
        // accum_offset overridden by overlay
        assert_eq!(base.accum_offset, Some(64));
        assert_eq!(base.rounding_mode(), Ok(RoundingMode::TowardZero));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PACKED_ALU_WAVE_SIZE", "32"),
            ("PACKED_ALU_VGPRS", "not-a-number"),
            ("PACKED_ALU_ACCUM_OFFSET", " 8 "),
        ]
        .into_iter()
        .collect();

        let mut config = Config {
            vgprs: Some(64),
            ..Default::default()
        };
        config.apply_overrides_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.wave_size, Some(32));
        // Unparseable value ignored
        assert_eq!(config.vgprs, Some(64));
        assert_eq!(config.accum_offset, Some(8));
    }

    #[test]
    fn test_validation() {
        let bad_wave = Config {
            wave_size: Some(48),
            ..Default::default()
        };
        assert_eq!(bad_wave.validate(), Err(ConfigError::WaveSize(48)));

        let bad_window = Config {
            vgprs: Some(256),
            accum_offset: Some(256),
            ..Default::default()
        };
        assert!(matches!(
            bad_window.validate(),
            Err(ConfigError::AccumWindow { offset: 256, vgprs: 256 })
        ));

        let bad_rounding = Config {
            rounding: Some("sideways".to_string()),
            ..Default::default()
        };
        assert!(bad_rounding.wave_context().is_err());
    }

    #[test]
    fn test_wave_context_from_config() {
        let config = Config {
            wave_size: Some(32),
            vgprs: Some(16),
            accum_offset: Some(8),
            rounding: None,
        };
        let ctx = config.wave_context().unwrap();
        assert_eq!(ctx.lanes(), 32);
        assert_eq!(ctx.vgprs.count(), 16);
        assert_eq!(ctx.accum.offset, 8);
    }

    #[test]
    fn test_sample_config_parses() {
        let sample = Config::sample_config();
        let config: Config = toml::from_str(&sample).expect("Sample config should parse");
        assert_eq!(config.wave_size, Some(64));
        assert!(config.validate().is_ok());
    }
}
