//! Extraction settings.
//!
//! Settings can be loaded from a YAML file and then overridden from the
//! command line:
//!
//! ```yaml
//! exclude_dirs:
//!   - benchmarks
//! source_prefixes:
//!   - src
//!   - lib
//! respect_gitignore: false
//! inference: all-packages
//! threads: 4
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractorError, Result};

/// Directory names that are never descended into
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    "tests",
    "test",
    "docs",
    "examples",
    ".venv",
    "build",
    "dist",
    ".git",
    "__pycache__",
    ".mypy_cache",
    ".pytest_cache",
];

/// Which package initializers get inferred exports when they declare
/// neither re-exports nor subpackage aliases
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum InferencePolicy {
    /// Every package initializer
    #[default]
    AllPackages,
    /// Only initializers that carry an `__all__` list
    Declared,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Extra directory names to skip, on top of the fixed set
    pub exclude_dirs: Vec<String>,
    /// Leading path segments stripped from module identifiers
    pub source_prefixes: Vec<String>,
    pub respect_gitignore: bool,
    pub inference: InferencePolicy,
    /// Worker threads for collection; rayon's default when unset
    pub threads: Option<usize>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            exclude_dirs: Vec::new(),
            source_prefixes: vec!["src".to_string()],
            respect_gitignore: false,
            inference: InferencePolicy::default(),
            threads: None,
        }
    }
}

impl ExtractorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.threads == Some(0) {
            return Err(ExtractorError::Config("threads must be at least 1".to_string()));
        }
        if let Some(bad) = self
            .source_prefixes
            .iter()
            .find(|p| p.is_empty() || p.contains(['/', '\\', '.']))
        {
            return Err(ExtractorError::Config(format!(
                "source prefix must be a single path segment: '{}'",
                bad
            )));
        }
        Ok(())
    }

    /// Whether a path component names an excluded directory
    pub fn is_excluded_name(&self, name: &str) -> bool {
        if name.starts_with('.') {
            return true;
        }
        DEFAULT_EXCLUDED_DIRS.contains(&name) || self.exclude_dirs.iter().any(|d| d == name)
    }
}
