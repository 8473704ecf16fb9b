use std::{fmt, io, time::Duration};

use crate::{
    config::ToolCommand,
    error::ProbeError,
    process::run_bounded,
};

pub const UNKNOWN_VERSION: &str = "unknown";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolVersion(pub String);

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Asks an external tool for its version under a short timeout.
#[derive(Clone, Debug)]
pub struct ToolProbe {
    tool: ToolCommand,
    version_arg: &'static str,
    timeout: Duration,
}

impl ToolProbe {
    pub fn new(tool: ToolCommand, version_arg: &'static str, timeout: Duration) -> Self {
        Self {
            tool,
            version_arg,
            timeout,
        }
    }

    /// The rendering engine answers `--version`.
    pub fn engine(tool: &ToolCommand, timeout: Duration) -> Self {
        Self::new(tool.clone(), "--version", timeout)
    }

    /// ffmpeg answers `-version`.
    pub fn transcoder(tool: &ToolCommand, timeout: Duration) -> Self {
        Self::new(tool.clone(), "-version", timeout)
    }

    pub fn program(&self) -> String {
        self.tool.display_name()
    }

    pub fn version(&self) -> Result<ToolVersion, ProbeError> {
        let program = self.program();
        let mut cmd = self.tool.command();
        cmd.arg(self.version_arg);

        let out = run_bounded(&mut cmd, self.timeout).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ProbeError::NotFound(program.clone()),
            _ => ProbeError::Spawn {
                program: program.clone(),
                source: e,
            },
        })?;

        if out.timed_out() {
            return Err(ProbeError::TimedOut {
                program,
                timeout: self.timeout,
            });
        }
        if !out.success() {
            return Err(ProbeError::NonZeroExit {
                program,
                exit_code: out.exit_code(),
                stderr: out.stderr,
            });
        }

        Ok(ToolVersion(out.stdout.trim().to_string()))
    }

    /// Never fails: any probe error means "not available".
    pub fn is_available(&self) -> bool {
        match self.version() {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(%err, "tool probe failed");
                false
            }
        }
    }

    /// Version string, or [`UNKNOWN_VERSION`] when the probe fails.
    pub fn version_or_unknown(&self) -> String {
        match self.version() {
            Ok(v) => v.0,
            Err(err) => {
                tracing::warn!(%err, "version probe failed, recording '{UNKNOWN_VERSION}'");
                UNKNOWN_VERSION.to_string()
            }
        }
    }
}
