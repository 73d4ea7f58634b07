//! User configuration, read once at startup and passed down explicitly.
//!
//! Everything lives in one directory (default `~/.config/cfkit`):
//!
//! - `config.yaml` — compiler command, file names, harness timeout,
//!   normalization policy. Every key is optional.
//! - `template.cpp` — source template for `setup`. The built-in template is
//!   used when absent.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::compile::{Compiler, ExecutableTarget};
use crate::extract::Normalization;
use crate::harness::DEFAULT_TIMEOUT;
use crate::template::SourceTemplate;

pub const CONFIG_FILE: &str = "config.yaml";
pub const TEMPLATE_FILE: &str = "template.cpp";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub command: String,
    pub flags: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            command: "g++".to_string(),
            flags: "-Wall -Wextra -O2 -std=c++23".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub compiler: CompilerConfig,
    pub source_name: String,
    pub executable_name: String,
    /// Per-sample wall-clock limit. `null` disables it.
    pub timeout_secs: Option<u64>,
    pub normalization: Normalization,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compiler: CompilerConfig::default(),
            source_name: "main.cpp".to_string(),
            executable_name: "main".to_string(),
            timeout_secs: Some(DEFAULT_TIMEOUT.as_secs()),
            normalization: Normalization::default(),
        }
    }
}

impl Config {
    /// Loads `config.yaml` from `dir`, falling back to defaults when it does not exist.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        debug!(path = %path.display(), ?config, "config loaded");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        // an empty file deserializes to unit, not to a mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn target(&self) -> ExecutableTarget {
        ExecutableTarget::new(&self.source_name, &self.executable_name)
    }

    pub fn compiler(&self) -> Compiler {
        Compiler {
            command: self.compiler.command.clone(),
            flags: self.compiler.flags.clone(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// `$HOME/.config/cfkit`.
pub fn default_dir() -> Result<PathBuf> {
    let home = env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .ok_or_else(|| anyhow!("could not determine the home directory"))?;
    Ok(PathBuf::from(home).join(".config").join("cfkit"))
}

/// Reads `template.cpp` from `dir`, or renders the built-in template.
pub fn load_template(dir: &Path, problem_url: Option<&str>) -> Result<String> {
    let path = dir.join(TEMPLATE_FILE);
    if path.exists() {
        debug!(path = %path.display(), "using custom template");
        return fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    Ok(SourceTemplate { problem_url }.generate()?)
}
