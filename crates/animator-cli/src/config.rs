//! CLI configuration.
//!
//! Defaults for encoding and logging, read from `animator.toml`. Command-line
//! flags take precedence over everything in here.

use animator_model::CompressionLevel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "animator.toml";

/// Default log directive.
const DEFAULT_LOG_FILTER: &str = "animator=info";

/// Animator configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimatorConfig {
    /// Compression level used by `print` when `--level` is not given
    pub compression: CompressionLevel,
    /// Wrap printed output in HTML highlighting markup
    pub colorize: bool,
    /// Log directive, overridden by `RUST_LOG`
    pub log_filter: String,
}

impl Default for AnimatorConfig {
    fn default() -> Self {
        Self {
            compression: CompressionLevel::Medium,
            colorize: false,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
        }
    }
}

impl AnimatorConfig {
    /// Load configuration from `animator.toml` in the working directory.
    pub fn load() -> Self {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                info!("Loaded config from {}", path.display());
                config.validate();
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Replace an empty log directive with the default.
    pub fn validate(&mut self) {
        if self.log_filter.trim().is_empty() {
            self.log_filter = DEFAULT_LOG_FILTER.to_owned();
        }
    }
}
