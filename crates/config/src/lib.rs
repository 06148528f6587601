//! # Config - seekz settings
//!
//! All settings come from environment variables, each with a default:
//!
//! ```text
//! SEEKZ_FRAME_SIZE   decompressed bytes per frame   (default: 1048576 = 1 MiB)
//! SEEKZ_LEVEL        zstd compression level         (default: 3)
//! SEEKZ_LOG          tracing filter directive       (default: "warn")
//! ```
//!
//! ## Example
//!
//! ```rust
//! use config::Config;
//!
//! let cfg = Config::from_lookup(|key| match key {
//!     "SEEKZ_FRAME_SIZE" => Some("65536".to_string()),
//!     _ => None,
//! })
//! .unwrap();
//! assert_eq!(cfg.frame_size, 64 * 1024);
//! assert_eq!(cfg.level, config::DEFAULT_LEVEL);
//! ```

use thiserror::Error;

/// Default frame size: 1 MiB of decompressed data per frame.
pub const DEFAULT_FRAME_SIZE: usize = 1024 * 1024;
/// Default zstd level (zstd's own default).
pub const DEFAULT_LEVEL: i32 = 3;
/// Default log filter.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Lowest and highest levels zstd accepts (negative levels are the fast modes).
pub const MIN_LEVEL: i32 = -131_072;
pub const MAX_LEVEL: i32 = 22;

pub const ENV_FRAME_SIZE: &str = "SEEKZ_FRAME_SIZE";
pub const ENV_LEVEL: &str = "SEEKZ_LEVEL";
pub const ENV_LOG: &str = "SEEKZ_LOG";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}: cannot parse {value:?} as a number")]
    NotANumber { key: &'static str, value: String },

    #[error("{key}: frame size {value} must be between 1 and {max}", max = u32::MAX)]
    FrameSize { key: &'static str, value: usize },

    #[error(
        "{key}: level {value} must be between {min} and {max}",
        min = MIN_LEVEL,
        max = MAX_LEVEL
    )]
    Level { key: &'static str, value: i32 },
}

/// Settings shared by the writer and the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Decompressed bytes per frame.
    pub frame_size: usize,
    /// zstd compression level.
    pub level: i32,
    /// Directive for the tracing subscriber (e.g. `"info"`, `"seekable=trace"`).
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            level: DEFAULT_LEVEL,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`Config::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through `lookup`, falling back to the defaults
    /// for missing keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a value does not parse or is out of range.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();

        if let Some(v) = lookup(ENV_FRAME_SIZE) {
            cfg.frame_size = parse(ENV_FRAME_SIZE, &v)?;
        }
        if let Some(v) = lookup(ENV_LEVEL) {
            cfg.level = parse(ENV_LEVEL, &v)?;
        }
        if let Some(v) = lookup(ENV_LOG) {
            cfg.log_filter = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks that every value is in range.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_size == 0 || u32::try_from(self.frame_size).is_err() {
            return Err(ConfigError::FrameSize {
                key: ENV_FRAME_SIZE,
                value: self.frame_size,
            });
        }
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&self.level) {
            return Err(ConfigError::Level {
                key: ENV_LEVEL,
                value: self.level,
            });
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::NotANumber {
        key,
        value: value.to_string(),
    })
}
