//! Curation configuration helpers.
//!
//! Configuration is an explicit struct handed to the components that need
//! it; nothing reads process state except `resolve_lm_command`.
use crate::reconcile::DEFAULT_THRESHOLD;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_SCHEMA_VERSION: u32 = 1;
pub const LM_COMMAND_ENV: &str = "DCUR_LM_COMMAND";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CurateConfig {
    pub schema_version: u32,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lm_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

pub fn default_config() -> CurateConfig {
    CurateConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        threshold: DEFAULT_THRESHOLD,
        lm_command: None,
        output_dir: None,
    }
}

/// Render a pretty JSON config stub.
pub fn config_stub() -> Result<String> {
    serde_json::to_string_pretty(&default_config()).context("serialize config stub")
}

/// Load a config file, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<CurateConfig> {
    let Some(path) = path else {
        return Ok(default_config());
    };
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: CurateConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &CurateConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    validate_threshold(config.threshold)?;
    if let Some(command) = config.lm_command.as_deref() {
        if command.trim().is_empty() {
            return Err(anyhow!("lm_command must be non-empty when set"));
        }
    }
    Ok(())
}

pub fn validate_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(anyhow!("threshold must be within [0, 1] (got {threshold})"));
    }
    Ok(())
}

/// Resolve the LM command: CLI flag, then config, then environment.
pub fn resolve_lm_command(flag: Option<&str>, config: &CurateConfig) -> Option<String> {
    resolve_lm_command_from(flag, config, env::var(LM_COMMAND_ENV).ok())
}

fn resolve_lm_command_from(
    flag: Option<&str>,
    config: &CurateConfig,
    env_value: Option<String>,
) -> Option<String> {
    flag.map(str::to_string)
        .or_else(|| config.lm_command.clone())
        .or(env_value)
        .filter(|command| !command.trim().is_empty())
}

/// Output directory: CLI flag, then config, else the store's directory.
pub fn resolve_output_dir(
    flag: Option<&Path>,
    config: &CurateConfig,
    store_path: &Path,
) -> PathBuf {
    if let Some(dir) = flag {
        return dir.to_path_buf();
    }
    if let Some(dir) = &config.output_dir {
        return dir.clone();
    }
    match store_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
