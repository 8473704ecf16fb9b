use std::{
    fs, io,
    path::{Path, PathBuf},
    process::Command,
    time::Duration,
};

use anyhow::Context as _;

use crate::{
    config::BuildConfig,
    error::{BuildError, BuildResult},
    probe::ToolProbe,
    process::{command_line, run_bounded},
    quality::QualityProfile,
    workspace::Workspace,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderStatus {
    Succeeded,
    Failed { exit_code: Option<i32> },
    TimedOut,
}

/// Everything observed from one engine run.
#[derive(Clone, Debug)]
pub struct RenderOutcome {
    pub command_line: String,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub elapsed: Duration,
    pub log_path: PathBuf,
}

impl RenderOutcome {
    pub fn status(&self) -> RenderStatus {
        if self.timed_out {
            RenderStatus::TimedOut
        } else if self.exit_code == Some(0) {
            RenderStatus::Succeeded
        } else {
            RenderStatus::Failed {
                exit_code: self.exit_code,
            }
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status() == RenderStatus::Succeeded
    }

    /// Map a failed or timed-out run to its fatal error.
    pub fn into_result(self, timeout: Duration) -> BuildResult<Self> {
        match self.status() {
            RenderStatus::Succeeded => Ok(self),
            RenderStatus::Failed { exit_code } => Err(BuildError::RenderFailed {
                exit_code,
                stderr: self.stderr,
                log_path: self.log_path,
            }),
            RenderStatus::TimedOut => Err(BuildError::RenderTimedOut {
                timeout,
                log_path: self.log_path,
            }),
        }
    }
}

/// Runs the external rendering engine for one scene.
pub struct RenderInvoker<'a> {
    config: &'a BuildConfig,
}

impl<'a> RenderInvoker<'a> {
    pub fn new(config: &'a BuildConfig) -> Self {
        Self { config }
    }

    /// Check, in order: the scene file exists, the engine answers, the tier
    /// is known. The first failure wins.
    pub fn preflight(&self, scene_file: &Path, tier: &str) -> BuildResult<&'a QualityProfile> {
        if !scene_file.exists() {
            return Err(BuildError::SceneFileNotFound(scene_file.to_path_buf()));
        }
        let probe = ToolProbe::engine(&self.config.engine, self.config.probe_timeout);
        if !probe.is_available() {
            return Err(BuildError::EngineNotInstalled {
                program: probe.program(),
            });
        }
        self.config.catalog.resolve(tier)
    }

    #[tracing::instrument(skip(self, workspace), fields(root = %workspace.root().display()))]
    pub fn invoke(
        &self,
        scene_file: &Path,
        scene: &str,
        tier: &str,
        workspace: &Workspace,
    ) -> BuildResult<RenderOutcome> {
        let profile = self.preflight(scene_file, tier)?;
        self.copy_scene(scene_file, workspace)?;
        self.execute(scene_file, scene, profile, workspace)
    }

    /// Keep a copy of the scene source next to the build it produced.
    pub fn copy_scene(&self, scene_file: &Path, workspace: &Workspace) -> BuildResult<PathBuf> {
        let dest = workspace.scene_copy_path();
        ensure_parent_dir(&dest)?;
        fs::copy(scene_file, &dest).with_context(|| {
            format!(
                "copy scene '{}' to '{}'",
                scene_file.display(),
                dest.display()
            )
        })?;
        tracing::debug!(dest = %dest.display(), "scene source copied");
        Ok(dest)
    }

    /// Run the engine and overwrite the build log. Assumes
    /// [`Self::preflight`] already passed.
    pub fn execute(
        &self,
        scene_file: &Path,
        scene: &str,
        profile: &QualityProfile,
        workspace: &Workspace,
    ) -> BuildResult<RenderOutcome> {
        let mut cmd = self.command(scene_file, scene, profile, workspace);
        let line = command_line(&cmd);
        let log_path = workspace.build_log();
        tracing::info!(command = %line, "starting render");

        let out = match run_bounded(&mut cmd, self.config.render_timeout) {
            Ok(out) => out,
            Err(e) => {
                // still leave a record of what was attempted
                let stderr = format!("failed to start engine: {e}");
                write_log(&log_path, &line, "", &stderr, None)?;
                let program = self.config.engine.display_name();
                return Err(if e.kind() == io::ErrorKind::NotFound {
                    BuildError::EngineNotInstalled { program }
                } else {
                    BuildError::EngineSpawnFailed { program, source: e }
                });
            }
        };
        let trailer = out
            .timed_out()
            .then(|| format!("Timed out after {}s", self.config.render_timeout.as_secs()));
        write_log(&log_path, &line, &out.stdout, &out.stderr, trailer.as_deref())?;

        let outcome = RenderOutcome {
            command_line: line,
            exit_code: out.exit_code(),
            timed_out: out.timed_out(),
            stdout: out.stdout,
            stderr: out.stderr,
            elapsed: out.elapsed,
            log_path,
        };
        match outcome.status() {
            RenderStatus::Succeeded => {
                tracing::info!(elapsed = ?outcome.elapsed, "render finished")
            }
            RenderStatus::Failed { exit_code } => {
                tracing::warn!(?exit_code, "render failed")
            }
            RenderStatus::TimedOut => {
                tracing::warn!(timeout = ?self.config.render_timeout, "render timed out")
            }
        }
        Ok(outcome)
    }

    fn command(
        &self,
        scene_file: &Path,
        scene: &str,
        profile: &QualityProfile,
        workspace: &Workspace,
    ) -> Command {
        let mut cmd = self.config.engine.command();
        cmd.arg(profile.engine_flag)
            .arg(&self.config.engine_output_flag)
            .arg(workspace.output_dir())
            .arg(scene_file)
            .arg(scene);
        cmd
    }
}

/// Overwrite the build log with the command and both captured streams.
fn write_log(
    path: &Path,
    command_line: &str,
    stdout: &str,
    stderr: &str,
    trailer: Option<&str>,
) -> BuildResult<()> {
    let mut text = format!("Command: {command_line}\n\nSTDOUT:\n{stdout}\n\nSTDERR:\n{stderr}\n");
    if let Some(trailer) = trailer {
        text.push_str(&format!("\n{trailer}\n"));
    }
    ensure_parent_dir(path)?;
    fs::write(path, text).with_context(|| format!("write build log '{}'", path.display()))?;
    Ok(())
}

pub(crate) fn ensure_parent_dir(path: &Path) -> BuildResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolCommand;

    fn outcome(exit_code: Option<i32>, timed_out: bool) -> RenderOutcome {
        RenderOutcome {
            command_line: "manim -qh".into(),
            exit_code,
            stdout: String::new(),
            stderr: "Traceback".into(),
            timed_out,
            elapsed: Duration::from_secs(1),
            log_path: "ws/logs/build.log".into(),
        }
    }

    #[test]
    fn status_classification() {
        assert_eq!(outcome(Some(0), false).status(), RenderStatus::Succeeded);
        assert_eq!(
            outcome(Some(1), false).status(),
            RenderStatus::Failed { exit_code: Some(1) }
        );
        assert_eq!(
            outcome(None, false).status(),
            RenderStatus::Failed { exit_code: None }
        );
        assert_eq!(outcome(None, true).status(), RenderStatus::TimedOut);
    }

    #[test]
    fn into_result_distinguishes_timeout() {
        let timeout = Duration::from_secs(300);
        assert!(outcome(Some(0), false).into_result(timeout).is_ok());
        assert!(matches!(
            outcome(Some(2), false).into_result(timeout),
            Err(BuildError::RenderFailed { exit_code: Some(2), .. })
        ));
        assert!(matches!(
            outcome(None, true).into_result(timeout),
            Err(BuildError::RenderTimedOut { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn command_places_flag_output_scene_and_name() {
        let cfg = BuildConfig::default();
        let catalog = cfg.catalog.clone();
        let profile = catalog.resolve("high").unwrap();
        let ws = Workspace::adopt("ws");
        let cmd = RenderInvoker::new(&cfg).command(Path::new("scene.py"), "Demo", profile, &ws);
        assert_eq!(command_line(&cmd), "manim -qh -o ws/output scene.py Demo");
    }

    #[test]
    fn preflight_checks_scene_file_first() {
        // engine is missing too, but the missing file must win
        let cfg = BuildConfig::default().with_engine(ToolCommand::new("scenebuild-no-such-engine"));
        let err = RenderInvoker::new(&cfg)
            .preflight(Path::new("does/not/exist.py"), "nope")
            .unwrap_err();
        assert!(matches!(err, BuildError::SceneFileNotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_engine_keeps_spawn_error() {
        let tmp = tempfile::tempdir().unwrap();
        let scene = tmp.path().join("scene.py");
        fs::write(&scene, "class Demo: pass\n").unwrap();
        let engine = tmp.path().join("engine");
        fs::write(&engine, "#!/bin/sh\nexit 0\n").unwrap();

        let cfg = BuildConfig::default().with_engine(ToolCommand::new(&engine));
        let profile = cfg.catalog.resolve("low").unwrap();
        let ws = Workspace::adopt(tmp.path().join("ws"));
        let err = RenderInvoker::new(&cfg)
            .execute(&scene, "Demo", profile, &ws)
            .unwrap_err();

        match &err {
            BuildError::EngineSpawnFailed { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied)
            }
            other => panic!("expected EngineSpawnFailed, got {other:?}"),
        }
        let log = fs::read_to_string(ws.build_log()).unwrap();
        assert!(log.contains("failed to start engine"));
    }

    #[test]
    fn copy_scene_lands_in_workspace_root() {
        let tmp = tempfile::tempdir().unwrap();
        let scene = tmp.path().join("demo.py");
        fs::write(&scene, "class Demo: pass\n").unwrap();
        let cfg = BuildConfig::default();
        let ws = Workspace::adopt(tmp.path().join("custom/ws"));

        let dest = RenderInvoker::new(&cfg).copy_scene(&scene, &ws).unwrap();
        assert_eq!(dest, ws.scene_copy_path());
        assert_eq!(fs::read_to_string(dest).unwrap(), "class Demo: pass\n");
    }

    #[test]
    fn preflight_checks_engine_before_tier() {
        let tmp = tempfile::tempdir().unwrap();
        let scene = tmp.path().join("scene.py");
        fs::write(&scene, "class Demo: pass\n").unwrap();
        let cfg = BuildConfig::default().with_engine(ToolCommand::new("scenebuild-no-such-engine"));
        let err = RenderInvoker::new(&cfg).preflight(&scene, "nope").unwrap_err();
        assert!(matches!(err, BuildError::EngineNotInstalled { .. }));
    }
}
