//! Run defaults loaded from an optional TOML file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::tail::DEFAULT_TAIL_CAPACITY;

/// Defaults for `tailpipe` runs (TOML).
///
/// Intended to be edited by humans. Missing fields keep their defaults and
/// a missing file yields `RunnerConfig::default()`. Command-line flags win
/// over config values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunnerConfig {
    /// Trailing output lines retained for failure reports.
    pub tail_capacity: usize,

    /// Wall-clock budget in seconds; absent means no timeout.
    pub timeout_secs: Option<u64>,

    /// Exit codes treated as success.
    pub acceptable_exit_codes: Vec<i32>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tail_capacity: DEFAULT_TAIL_CAPACITY,
            timeout_secs: None,
            acceptable_exit_codes: vec![0],
        }
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == Some(0) {
            return Err(anyhow!("timeout_secs must be > 0 when set"));
        }
        if self.acceptable_exit_codes.is_empty() {
            return Err(anyhow!("acceptable_exit_codes must not be empty"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RunnerConfig::default()`.
pub fn load_config(path: &Path) -> Result<RunnerConfig> {
    if !path.exists() {
        let cfg = RunnerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RunnerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = load_config(Path::new("/nonexistent/tailpipe.toml")).expect("defaults");
        assert_eq!(cfg, RunnerConfig::default());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let cfg: RunnerConfig = toml::from_str("tail_capacity = 3\n").expect("parse");
        assert_eq!(cfg.tail_capacity, 3);
        assert_eq!(cfg.acceptable_exit_codes, vec![0]);
        assert!(cfg.timeout_secs.is_none());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let cfg: RunnerConfig = toml::from_str("timeout_secs = 0\n").expect("parse");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_acceptable_codes_are_rejected() {
        let cfg: RunnerConfig = toml::from_str("acceptable_exit_codes = []\n").expect("parse");
        assert!(cfg.validate().is_err());
    }
}
