//! Engine configuration.
//!
//! # Responsibility
//! - Carry the tunables the embedding app may override.
//! - Validate values before any component is built from them.
//!
//! The app owns the file format; this type only derives serde.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_AUTO_EXPAND_DELAY_MS: u64 = 800;
pub const MAX_AUTO_EXPAND_DELAY_MS: u64 = 10_000;
pub const DEFAULT_MAX_BULK_MOVE: usize = 500;

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnsupportedLogLevel(String),
    RelativeLogDir(PathBuf),
    AutoExpandDelayOutOfRange(u64),
    ZeroBulkLimit,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLogLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::RelativeLogDir(path) => {
                write!(f, "log_dir must be an absolute path, got `{}`", path.display())
            }
            Self::AutoExpandDelayOutOfRange(value) => write!(
                f,
                "auto_expand_delay_ms must be within 1..={MAX_AUTO_EXPAND_DELAY_MS}, got {value}"
            ),
            Self::ZeroBulkLimit => write!(f, "max_bulk_move must be at least 1"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub log_level: String,
    /// Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub auto_expand_delay_ms: u64,
    /// Upper bound on ids accepted by one bulk leaf move.
    pub max_bulk_move: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            auto_expand_delay_ms: DEFAULT_AUTO_EXPAND_DELAY_MS,
            max_bulk_move: DEFAULT_MAX_BULK_MOVE,
        }
    }
}

impl CoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.log_level.trim().to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "warning" | "error" => {}
            _ => return Err(ConfigError::UnsupportedLogLevel(self.log_level.clone())),
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::RelativeLogDir(dir.clone()));
            }
        }
        if !(1..=MAX_AUTO_EXPAND_DELAY_MS).contains(&self.auto_expand_delay_ms) {
            return Err(ConfigError::AutoExpandDelayOutOfRange(
                self.auto_expand_delay_ms,
            ));
        }
        if self.max_bulk_move == 0 {
            return Err(ConfigError::ZeroBulkLimit);
        }
        Ok(())
    }

    pub fn auto_expand_delay(&self) -> Duration {
        Duration::from_millis(self.auto_expand_delay_ms)
    }
}
