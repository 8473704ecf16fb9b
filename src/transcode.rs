use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::Context as _;

use crate::{
    config::BuildConfig,
    error::{BuildError, BuildResult},
    probe::ToolProbe,
    process::{command_line, run_bounded},
    workspace::Workspace,
};

pub const ANIMATED_IMAGE_EXTENSION: &str = "gif";
pub const STILL_IMAGE_EXTENSION: &str = "png";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TranscodeOpts {
    pub fps: u32,
    /// Multiplier applied to both input dimensions.
    pub scale: f64,
}

impl Default for TranscodeOpts {
    fn default() -> Self {
        Self {
            fps: 30,
            scale: 1.0,
        }
    }
}

impl TranscodeOpts {
    pub fn validate(&self) -> BuildResult<()> {
        if self.fps == 0 {
            return Err(BuildError::transcode("fps must be non-zero"));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(BuildError::transcode(format!(
                "scale must be a positive number, got {}",
                self.scale
            )));
        }
        Ok(())
    }

    fn filter(&self) -> String {
        format!(
            "scale=iw*{scale}:ih*{scale},fps={fps}",
            scale = self.scale,
            fps = self.fps
        )
    }
}

/// Derives gif/png files from a rendered video with the external transcoder.
/// Outputs always land in the workspace's `thumbnails/` directory.
pub struct TranscodePipeline<'a> {
    config: &'a BuildConfig,
}

impl<'a> TranscodePipeline<'a> {
    pub fn new(config: &'a BuildConfig) -> Self {
        Self { config }
    }

    #[tracing::instrument(skip(self, workspace))]
    pub fn export_animated_image(
        &self,
        input: &Path,
        workspace: &Workspace,
        opts: TranscodeOpts,
    ) -> BuildResult<PathBuf> {
        opts.validate()?;
        let out_path = self.prepare(input, workspace, ANIMATED_IMAGE_EXTENSION)?;

        let mut cmd = self.config.transcoder.command();
        cmd.arg("-i")
            .arg(input)
            .args(["-vf", &opts.filter()])
            .arg("-y")
            .arg(&out_path);
        self.run(cmd, &out_path)
    }

    /// Extract the first frame of `input` as a png.
    #[tracing::instrument(skip(self, workspace))]
    pub fn export_still_image(&self, input: &Path, workspace: &Workspace) -> BuildResult<PathBuf> {
        let out_path = self.prepare(input, workspace, STILL_IMAGE_EXTENSION)?;

        let mut cmd = self.config.transcoder.command();
        cmd.arg("-i")
            .arg(input)
            .args(["-frames:v", "1", "-update", "1"])
            .arg("-y")
            .arg(&out_path);
        self.run(cmd, &out_path)
    }

    /// Check preconditions and pick the output path. Nothing is written
    /// unless both the input and the transcoder are present.
    fn prepare(&self, input: &Path, workspace: &Workspace, extension: &str) -> BuildResult<PathBuf> {
        if !input.is_file() {
            return Err(BuildError::SourceArtifactMissing(input.to_path_buf()));
        }
        let probe = ToolProbe::transcoder(&self.config.transcoder, self.config.probe_timeout);
        if !probe.is_available() {
            return Err(BuildError::TranscodeToolUnavailable {
                program: probe.program(),
            });
        }

        let file_name = input
            .with_extension(extension)
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| BuildError::transcode(format!("'{}' has no file name", input.display())))?;
        let dir = workspace.thumbnails_dir();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create directory '{}'", dir.display()))?;
        Ok(dir.join(file_name))
    }

    fn run(&self, mut cmd: Command, out_path: &Path) -> BuildResult<PathBuf> {
        let line = command_line(&cmd);
        tracing::info!(command = %line, "starting transcode");

        let out = run_bounded(&mut cmd, self.config.transcode_timeout)
            .map_err(|e| BuildError::transcode(format!("failed to run transcoder: {e}")))?;
        if out.timed_out() {
            return Err(BuildError::transcode(format!(
                "timed out after {}s: {}",
                self.config.transcode_timeout.as_secs(),
                out.stderr.trim()
            )));
        }
        if !out.success() {
            return Err(BuildError::transcode(format!(
                "transcoder exited with {:?}: {}",
                out.exit_code(),
                out.stderr.trim()
            )));
        }

        tracing::info!(out = %out_path.display(), "transcode finished");
        Ok(out_path.to_path_buf())
    }
}
