//! Expected failures tracking via TOML file.
//!
//! ```toml
//! [[xfail]]
//! test = "checkout::applies_discount"
//! reason = "rounding differs on the new pricing service"
//! strict = true
//! matches = "Failed Assumptions"
//! ```

use crate::errors::{HarnessError, ManifestResult};
use crate::unit::XFail;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Loaded expected failures manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpectedFailures {
    #[serde(default)]
    pub xfail: Vec<XFailEntry>,
}

/// A single manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XFailEntry {
    /// Unit name, compared exactly.
    pub test: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub strict: bool,
    #[serde(default = "default_run")]
    pub run: bool,
    #[serde(default)]
    pub matches: Option<String>,
}

fn default_run() -> bool {
    true
}

impl XFailEntry {
    pub fn new(test: impl Into<String>) -> Self {
        Self {
            test: test.into(),
            reason: None,
            strict: false,
            run: true,
            matches: None,
        }
    }

    pub fn marker(&self) -> XFail {
        XFail {
            reason: self.reason.clone(),
            strict: self.strict,
            run: self.run,
            matches: self.matches.clone(),
        }
    }
}

impl ExpectedFailures {
    /// Load from a TOML file. A missing file is an empty manifest.
    pub fn load(path: &Path) -> ManifestResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no expected-failures manifest");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| HarnessError::Load {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| HarnessError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Marker for a unit, if the manifest lists it.
    pub fn marker_for(&self, test: &str) -> Option<XFail> {
        self.get_entry(test).map(XFailEntry::marker)
    }

    pub fn get_entry(&self, test: &str) -> Option<&XFailEntry> {
        self.xfail.iter().find(|entry| entry.test == test)
    }

    pub fn count(&self) -> usize {
        self.xfail.len()
    }
}
