use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use strum::Display;
use tracing::{debug, info};

/// A source file and the executable built from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableTarget {
    pub source: PathBuf,
    pub executable: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Staleness {
    #[strum(serialize = "missing")]
    Missing,
    #[strum(serialize = "outdated")]
    Outdated,
    #[strum(serialize = "up to date")]
    UpToDate,
}

impl Staleness {
    pub fn needs_build(self) -> bool {
        self != Staleness::UpToDate
    }
}

impl ExecutableTarget {
    /// Bare names are anchored to the working directory so running the
    /// executable never goes through `PATH`.
    pub fn new(source: impl Into<PathBuf>, executable: impl AsRef<Path>) -> Self {
        let executable = executable.as_ref();
        let executable = if executable.components().count() == 1 && executable.is_relative() {
            Path::new(".").join(executable)
        } else {
            executable.to_path_buf()
        };
        Self {
            source: source.into(),
            executable,
        }
    }

    pub fn staleness(&self) -> Result<Staleness> {
        let source = fs::metadata(&self.source)
            .with_context(|| format!("{} not found", self.source.display()))?
            .modified()?;
        let executable = match fs::metadata(&self.executable) {
            Ok(meta) => meta.modified()?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Staleness::Missing),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("could not get info for {}", self.executable.display())
                })
            }
        };
        Ok(if source > executable {
            Staleness::Outdated
        } else {
            Staleness::UpToDate
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiler {
    pub command: String,
    pub flags: String,
}

impl Compiler {
    pub fn args(&self, target: &ExecutableTarget) -> Vec<String> {
        let mut args: Vec<String> = self.flags.split_whitespace().map(String::from).collect();
        args.push(target.source.display().to_string());
        args.push("-o".to_string());
        args.push(target.executable.display().to_string());
        args
    }

    pub fn compile(&self, target: &ExecutableTarget) -> Result<()> {
        if !target.source.exists() {
            bail!("{} not found. Cannot compile.", target.source.display());
        }
        let args = self.args(target);
        debug!(command = %self.command, ?args, "invoking compiler");
        let status = Command::new(&self.command)
            .args(&args)
            .status()
            .with_context(|| format!("failed to start {}", self.command))?;
        if !status.success() {
            bail!("{} command failed: {}", self.command, status);
        }
        info!(executable = %target.executable.display(), "build finished");
        Ok(())
    }
}
