use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Command,
    time::Duration,
};

use crate::quality::QualityCatalog;

pub const DEFAULT_BASE_DIR: &str = "manim_outputs";
pub const DEFAULT_ENGINE: &str = "manim";
pub const DEFAULT_TRANSCODER: &str = "ffmpeg";

/// An external program plus any leading arguments it must always receive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    pub fn display_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

/// Everything a build needs that is not part of the request itself.
///
/// Constructed once at startup and shared by reference; nothing mutates it
/// afterwards.
#[derive(Clone, Debug)]
pub struct BuildConfig {
    pub base_dir: PathBuf,
    pub engine: ToolCommand,
    pub transcoder: ToolCommand,
    /// Engine flag that precedes the output directory argument.
    pub engine_output_flag: String,
    pub probe_timeout: Duration,
    pub render_timeout: Duration,
    pub transcode_timeout: Duration,
    pub catalog: QualityCatalog,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            engine: ToolCommand::new(DEFAULT_ENGINE),
            transcoder: ToolCommand::new(DEFAULT_TRANSCODER),
            engine_output_flag: "-o".to_string(),
            probe_timeout: Duration::from_secs(5),
            render_timeout: Duration::from_secs(300),
            transcode_timeout: Duration::from_secs(60),
            catalog: QualityCatalog::default(),
        }
    }
}

impl BuildConfig {
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn with_engine(mut self, engine: ToolCommand) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_transcoder(mut self, transcoder: ToolCommand) -> Self {
        self.transcoder = transcoder;
        self
    }

    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = timeout;
        self
    }

    pub fn with_transcode_timeout(mut self, timeout: Duration) -> Self {
        self.transcode_timeout = timeout;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}
