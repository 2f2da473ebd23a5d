//! Configuration file support for the workbook
//!
//! Loads per-directory configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.workbookrc.json` in the working directory
//! 3. `workbook.config.json` in the working directory
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::report::ReportFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Data directory used when none is configured
pub const DEFAULT_DATA_DIR: &str = ".workbook";

const RC_FILE: &str = ".workbookrc.json";
const CONFIG_FILE: &str = "workbook.config.json";

/// Workbook configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkbookConfig {
    /// Directory holding `project.json` and `preferences.json` (default: `.workbook`)
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Report format: "text" or "json" (default: text)
    #[serde(default)]
    pub format: Option<String>,

    /// Directory reports are written to; stdout when unset
    #[serde(default)]
    pub report_dir: Option<String>,
}

/// Resolved configuration with paths anchored at the working directory
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub data_dir: PathBuf,
    pub format: ReportFormat,
    pub report_dir: Option<PathBuf>,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl WorkbookConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(ref dir) = self.data_dir {
            if dir.trim().is_empty() {
                anyhow::bail!("data_dir must not be empty");
            }
        }
        if let Some(ref dir) = self.report_dir {
            if dir.trim().is_empty() {
                anyhow::bail!("report_dir must not be empty");
            }
        }
        if let Some(ref format) = self.format {
            if ReportFormat::parse(format).is_none() {
                anyhow::bail!("format must be \"text\" or \"json\" (got \"{}\")", format);
            }
        }
        Ok(())
    }

    /// Resolve relative paths against `root`
    pub fn resolve(&self, root: &Path) -> Result<ResolvedConfig> {
        self.validate()?;

        let data_dir = root.join(self.data_dir.as_deref().unwrap_or(DEFAULT_DATA_DIR));
        let format = self
            .format
            .as_deref()
            .and_then(ReportFormat::parse)
            .unwrap_or_default();
        let report_dir = self.report_dir.as_deref().map(|dir| root.join(dir));

        Ok(ResolvedConfig {
            data_dir,
            format,
            report_dir,
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults(root: &Path) -> Result<Self> {
        WorkbookConfig::default().resolve(root)
    }
}

/// Discover and load a config file from `root`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(root: &Path) -> Result<Option<(WorkbookConfig, PathBuf)>> {
    for name in [RC_FILE, CONFIG_FILE] {
        let path = root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<WorkbookConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: WorkbookConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config in `root`.
/// Returns default config if nothing is found.
pub fn load_and_resolve(root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(root)? {
            Some((config, path)) => (config, Some(path)),
            None => (WorkbookConfig::default(), None),
        }
    };

    let mut resolved = config.resolve(root)?;
    resolved.config_path = source_path;
    tracing::debug!(
        data_dir = %resolved.data_dir.display(),
        config = ?resolved.config_path,
        "configuration resolved"
    );
    Ok(resolved)
}
