//! Run-wide settings.
//!
//! Settings are read from an optional TOML file and then overridden by
//! environment variables:
//!
//! ```toml
//! # soft-assume.toml
//! show-locals = true
//! max-repr-len = 120
//! ```
//!
//! | variable                   | setting        |
//! |----------------------------|----------------|
//! | `SOFT_ASSUME_CONFIG`       | config path    |
//! | `SOFT_ASSUME_SHOW_LOCALS`  | `show-locals`  |
//! | `SOFT_ASSUME_MAX_REPR_LEN` | `max-repr-len` |

use crate::errors::{AssumeError, AssumeResult};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default maximum length of a formatted local value.
pub const DEFAULT_MAX_REPR_LEN: usize = 240;

/// File name looked up in the working directory when `SOFT_ASSUME_CONFIG` is unset.
pub const CONFIG_FILE_NAME: &str = "soft-assume.toml";

pub const ENV_CONFIG: &str = "SOFT_ASSUME_CONFIG";
pub const ENV_SHOW_LOCALS: &str = "SOFT_ASSUME_SHOW_LOCALS";
pub const ENV_MAX_REPR_LEN: &str = "SOFT_ASSUME_MAX_REPR_LEN";

static GLOBAL: Lazy<Settings> = Lazy::new(|| match Settings::resolve() {
    Ok(settings) => settings,
    Err(err) => {
        tracing::warn!(error = %err, "falling back to default soft-assume settings");
        Settings::default()
    }
});

/// Settings consumed by the check primitive when a failure is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
    /// Capture the supplied locals for every failed check.
    pub show_locals: bool,
    /// Maximum length of each formatted local value.
    pub max_repr_len: usize,
}

impl Settings {
    /// Settings resolved once for the whole process.
    pub fn global() -> &'static Settings {
        &GLOBAL
    }

    /// Resolve settings from the config file and the process environment.
    pub fn resolve() -> AssumeResult<Self> {
        let path = std::env::var(ENV_CONFIG).unwrap_or_else(|_| CONFIG_FILE_NAME.to_string());
        Self::load(Path::new(&path))?.with_env(|var| std::env::var(var).ok())
    }

    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> AssumeResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| AssumeError::ReadConfig {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let settings: Self = toml::from_str(&content).map_err(|e| AssumeError::ParseConfig {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        check_max_repr_len(settings.max_repr_len).map_err(|message| AssumeError::ParseConfig {
            path: path.display().to_string(),
            message: format!("max-repr-len {}", message),
        })?;
        Ok(settings)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn with_env<F>(mut self, lookup: F) -> AssumeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_SHOW_LOCALS) {
            self.show_locals = parse_flag(&value).ok_or_else(|| AssumeError::InvalidEnv {
                var: ENV_SHOW_LOCALS.to_string(),
                value: value.clone(),
                message: "expected one of 1, 0, true, false, yes, no, on, off".to_string(),
            })?;
        }

        if let Some(value) = lookup(ENV_MAX_REPR_LEN) {
            let parsed = value
                .trim()
                .parse::<usize>()
                .map_err(|e| e.to_string())
                .and_then(|len| check_max_repr_len(len).map_err(str::to_string));
            self.max_repr_len = parsed.map_err(|message| AssumeError::InvalidEnv {
                var: ENV_MAX_REPR_LEN.to_string(),
                value,
                message,
            })?;
        }

        Ok(self)
    }

    /// Enable or disable locals capture.
    pub fn show_locals(mut self, enabled: bool) -> Self {
        self.show_locals = enabled;
        self
    }

    /// Set the maximum formatted length of captured values.
    pub fn max_repr_len(mut self, len: usize) -> Self {
        self.max_repr_len = len;
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_locals: false,
            max_repr_len: DEFAULT_MAX_REPR_LEN,
        }
    }
}

/// The same bound applies to file and environment values.
fn check_max_repr_len(len: usize) -> Result<usize, &'static str> {
    if len == 0 {
        Err("must be greater than zero")
    } else {
        Ok(len)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
