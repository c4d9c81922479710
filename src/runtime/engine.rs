use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};

/// Verify that the container daemon behind `binary` is reachable.
pub fn ensure_available(binary: &str) -> Result<()> {
    let status = Command::new(binary)
        .args(["version", "--format", "{{.Server.Version}}"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("failed to invoke `{binary}`, is it installed and on PATH?"))?;

    if !status.success() {
        bail!("{binary} daemon is not running (exit {status})");
    }
    Ok(())
}
