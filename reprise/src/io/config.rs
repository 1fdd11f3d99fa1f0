//! Run configuration stored as TOML, usually `reprise.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "reprise.toml";

/// Run configuration (TOML).
///
/// Missing fields take their defaults. Command-line flags override values
/// read from the file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RepriseConfig {
    /// Passes allowed per test case before it is stopped as runaway.
    pub max_passes: u32,

    /// Seed handed to test bodies for random generators.
    pub seed: u64,

    /// Stop the run after this many failed cases; 0 runs everything.
    pub abort_after: u32,

    /// Write a JSON run summary here when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_json: Option<PathBuf>,
}

impl Default for RepriseConfig {
    fn default() -> Self {
        Self {
            max_passes: 10_000,
            seed: 0x5EED,
            abort_after: 0,
            report_json: None,
        }
    }
}

impl RepriseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_passes == 0 {
            return Err(anyhow!("max_passes must be > 0"));
        }
        if self
            .report_json
            .as_ref()
            .is_some_and(|path| path.as_os_str().is_empty())
        {
            return Err(anyhow!("report_json must not be empty"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RepriseConfig::default()`.
pub fn load_config(path: &Path) -> Result<RepriseConfig> {
    if !path.exists() {
        let cfg = RepriseConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RepriseConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &RepriseConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, RepriseConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested/reprise.toml");
        let cfg = RepriseConfig {
            seed: 99,
            report_json: Some(PathBuf::from("out/report.json")),
            ..RepriseConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("reprise.toml");
        fs::write(&path, "abort_after = 2\n").expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded.abort_after, 2);
        assert_eq!(loaded.max_passes, 10_000);
    }

    #[test]
    fn zero_max_passes_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("reprise.toml");
        fs::write(&path, "max_passes = 0\n").expect("write");
        let err = load_config(&path).expect_err("invalid");
        assert!(format!("{:#}", err).contains("max_passes must be > 0"));
    }
}
