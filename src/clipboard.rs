//! System clipboard access through the platform's command-line tools.

use std::io::{self, Write};
use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;

#[cfg(target_os = "windows")]
const TOOLS: &[&[&str]] = &[&["cmd", "/c", "clip"]];
#[cfg(target_os = "macos")]
const TOOLS: &[&[&str]] = &[&["pbcopy"]];
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const TOOLS: &[&[&str]] = &[
    &["wl-copy"],
    &["xclip", "-selection", "clipboard"],
    &["xsel", "--clipboard", "--input"],
];

/// Copies `content` using the first clipboard tool that is installed.
pub fn copy(content: &str) -> Result<()> {
    for tool in TOOLS {
        let (program, args) = tool
            .split_first()
            .ok_or_else(|| anyhow!("empty clipboard command"))?;
        match pipe_into(program, args, content) {
            Ok(()) => {
                debug!(program, "copied to clipboard");
                return Ok(());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(program, "clipboard tool not installed");
            }
            Err(e) => return Err(e).with_context(|| format!("failed to copy to clipboard with {program}")),
        }
    }
    let names: Vec<&str> = TOOLS.iter().filter_map(|t| t.first().copied()).collect();
    bail!("no clipboard utility found ({})", names.join(", "))
}

fn pipe_into(program: &str, args: &[&str], content: &str) -> io::Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(content.as_bytes())?;
    }
    let status = child.wait()?;
    if !status.success() {
        return Err(io::Error::other(format!("{program} exited with {status}")));
    }
    Ok(())
}
