use std::{fmt, path::PathBuf, time::Duration};

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("scene file '{}' not found", .0.display())]
    SceneFileNotFound(PathBuf),

    #[error("unknown quality tier '{tier}' (expected one of: {expected})")]
    UnknownQualityTier { tier: String, expected: String },

    #[error("rendering engine '{program}' is not installed or not on PATH")]
    EngineNotInstalled { program: String },

    #[error("failed to start rendering engine '{program}': {source}")]
    EngineSpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transcoder '{program}' is not installed or not on PATH")]
    TranscodeToolUnavailable { program: String },

    #[error("failed to create workspace '{}': {source}", path.display())]
    WorkspaceCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("render failed ({}): {}", exit_label(*exit_code), stderr.trim())]
    RenderFailed {
        exit_code: Option<i32>,
        stderr: String,
        log_path: PathBuf,
    },

    #[error("render timed out after {}s", timeout.as_secs())]
    RenderTimedOut { timeout: Duration, log_path: PathBuf },

    #[error("source artifact '{}' not found", .0.display())]
    SourceArtifactMissing(PathBuf),

    #[error("transcode failed: {0}")]
    TranscodeFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Failure classes an operator acts on differently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InputValidation,
    EnvironmentUnavailable,
    WorkspaceCreation,
    RenderFailed,
    RenderTimedOut,
    Transcode,
    Internal,
}

impl BuildError {
    pub fn unknown_tier(tier: impl Into<String>, expected: &[&str]) -> Self {
        Self::UnknownQualityTier {
            tier: tier.into(),
            expected: expected.join(", "),
        }
    }

    pub fn transcode(msg: impl Into<String>) -> Self {
        Self::TranscodeFailed(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SceneFileNotFound(_) | Self::UnknownQualityTier { .. } => {
                ErrorKind::InputValidation
            }
            Self::EngineNotInstalled { .. }
            | Self::EngineSpawnFailed { .. }
            | Self::TranscodeToolUnavailable { .. } => ErrorKind::EnvironmentUnavailable,
            Self::WorkspaceCreationFailed { .. } => ErrorKind::WorkspaceCreation,
            Self::RenderFailed { .. } => ErrorKind::RenderFailed,
            Self::RenderTimedOut { .. } => ErrorKind::RenderTimedOut,
            Self::SourceArtifactMissing(_) | Self::TranscodeFailed(_) => ErrorKind::Transcode,
            Self::Other(_) => ErrorKind::Internal,
        }
    }

    /// What the operator should try next, when there is a concrete answer.
    pub fn remediation(&self) -> Option<String> {
        match self {
            Self::UnknownQualityTier { expected, .. } => {
                Some(format!("choose one of: {expected}"))
            }
            Self::EngineNotInstalled { .. } => {
                Some("install the engine (e.g. `pip install manim`) or pass --engine".to_string())
            }
            Self::EngineSpawnFailed { program, .. } => Some(format!(
                "check that '{program}' is executable and its interpreter line is valid"
            )),
            Self::TranscodeToolUnavailable { .. } => Some(
                "install ffmpeg (e.g. `sudo apt-get install ffmpeg`) or pass --ffmpeg".to_string(),
            ),
            Self::RenderFailed { log_path, .. } => {
                Some(format!("see the build log at {}", log_path.display()))
            }
            Self::RenderTimedOut { .. } => {
                Some("use a lower quality tier or simplify the scene".to_string())
            }
            _ => None,
        }
    }
}

/// Errors from probing an external tool for its version.
#[derive(thiserror::Error, Debug)]
pub enum ProbeError {
    #[error("'{0}' was not found on PATH")]
    NotFound(String),

    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {}: {}", exit_label(*exit_code), stderr.trim())]
    NonZeroExit {
        program: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("'{program}' did not answer within {}ms", timeout.as_millis())]
    TimedOut { program: String, timeout: Duration },
}

/// Non-fatal outcomes attached to an otherwise successful build.
#[derive(Debug)]
pub enum BuildWarning {
    ArtifactNotLocated { search_root: PathBuf },
    Transcode(BuildError),
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArtifactNotLocated { search_root } => write!(
                f,
                "render succeeded but no video was found under '{}'",
                search_root.display()
            ),
            Self::Transcode(err) => write!(f, "secondary export skipped: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            BuildError::SceneFileNotFound("x.py".into()).kind(),
            ErrorKind::InputValidation
        );
        assert_eq!(
            BuildError::unknown_tier("8k", &["low", "high"]).kind(),
            ErrorKind::InputValidation
        );
        assert_eq!(
            BuildError::EngineNotInstalled {
                program: "manim".into()
            }
            .kind(),
            ErrorKind::EnvironmentUnavailable
        );
        assert_eq!(
            BuildError::RenderTimedOut {
                timeout: Duration::from_secs(300),
                log_path: "logs/build.log".into(),
            }
            .kind(),
            ErrorKind::RenderTimedOut
        );
        assert_eq!(
            BuildError::transcode("boom").kind(),
            ErrorKind::Transcode
        );
    }

    #[test]
    fn timeout_remediation_differs_from_failure() {
        let timeout = BuildError::RenderTimedOut {
            timeout: Duration::from_secs(300),
            log_path: "logs/build.log".into(),
        };
        let failed = BuildError::RenderFailed {
            exit_code: Some(1),
            stderr: "Traceback".into(),
            log_path: "logs/build.log".into(),
        };
        assert!(timeout.remediation().unwrap().contains("lower quality"));
        assert!(failed.remediation().unwrap().contains("logs/build.log"));
        assert!(failed.to_string().contains("exit code 1"));
    }

    #[test]
    fn unknown_tier_lists_choices() {
        let err = BuildError::unknown_tier("8k", &["low", "medium"]);
        assert!(err.to_string().contains("'8k'"));
        assert!(err.to_string().contains("low, medium"));
    }

    #[test]
    fn spawn_failure_keeps_os_error() {
        use std::error::Error as _;

        let err = BuildError::EngineSpawnFailed {
            program: "manim".into(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(err.kind(), ErrorKind::EnvironmentUnavailable);
        assert!(!err.to_string().contains("not installed"));
        assert!(err.source().is_some());
        assert!(!err.remediation().unwrap().contains("pip install"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = BuildError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
