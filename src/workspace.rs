use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};

use crate::{
    config::BuildConfig,
    error::{BuildError, BuildResult},
    probe::ToolProbe,
    quality::{QualityProfile, QualityTier},
};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SUMMARY_FILE: &str = "README.md";
pub const SCENE_COPY_FILE: &str = "scene.py";
pub const OUTPUT_DIR: &str = "output";
pub const LOGS_DIR: &str = "logs";
pub const THUMBNAILS_DIR: &str = "thumbnails";
pub const BUILD_LOG_FILE: &str = "build.log";

/// On-disk home of one build.
///
/// The layout is a contract: every component derives its paths from here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
    tier: Option<QualityTier>,
    managed: bool,
}

impl Workspace {
    /// Use a caller-managed directory as-is. No subtree, manifest or summary
    /// is created for it.
    pub fn adopt(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tier: None,
            managed: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True when the layout was created by [`WorkspaceManager`].
    pub fn is_managed(&self) -> bool {
        self.managed
    }

    pub fn tier(&self) -> Option<QualityTier> {
        self.tier
    }

    /// Directory handed to the engine as its output root.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join(LOGS_DIR)
    }

    pub fn build_log(&self) -> PathBuf {
        self.logs_dir().join(BUILD_LOG_FILE)
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.root.join(THUMBNAILS_DIR)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.root.join(SUMMARY_FILE)
    }

    pub fn scene_copy_path(&self) -> PathBuf {
        self.root.join(SCENE_COPY_FILE)
    }
}

/// Build parameters and environment, written once when the workspace is
/// created.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Manifest {
    pub scene: String,
    pub tier: QualityTier,
    pub description: String,
    pub timestamp: String,
    pub created_at: DateTime<Local>,
    pub engine_version: String,
    pub resolution: String,
    pub frame_rate: u32,
}

impl Manifest {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context as _;
        let text = fs::read_to_string(path)
            .with_context(|| format!("read manifest '{}'", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse manifest '{}'", path.display()))
    }
}

/// `year-month-day_hourminutesecond`, e.g. `2024-05-01_134502`.
pub fn timestamp_token(now: &DateTime<Local>) -> String {
    now.format("%Y-%m-%d_%H%M%S").to_string()
}

pub struct WorkspaceManager<'a> {
    config: &'a BuildConfig,
}

impl<'a> WorkspaceManager<'a> {
    pub fn new(config: &'a BuildConfig) -> Self {
        Self { config }
    }

    pub fn create(
        &self,
        scene: &str,
        tier: QualityTier,
        description: &str,
    ) -> BuildResult<Workspace> {
        self.create_at(scene, tier, description, Local::now())
    }

    /// Create `<base>/<scene>_<timestamp>/` with its subtree, manifest and
    /// summary.
    ///
    /// Two builds of the same scene within one second land in the same
    /// directory; nothing here detects that.
    pub fn create_at(
        &self,
        scene: &str,
        tier: QualityTier,
        description: &str,
        now: DateTime<Local>,
    ) -> BuildResult<Workspace> {
        let timestamp = timestamp_token(&now);
        let root = self.config.base_dir().join(format!("{scene}_{timestamp}"));
        let workspace = Workspace {
            root,
            tier: Some(tier),
            managed: true,
        };
        let profile = self.config.catalog.profile(tier);

        let fail = |source: io::Error| BuildError::WorkspaceCreationFailed {
            path: workspace.root().to_path_buf(),
            source,
        };

        for dir in [
            workspace.output_dir().join(tier.as_str()),
            workspace.logs_dir(),
            workspace.thumbnails_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(fail)?;
        }

        let engine_version =
            ToolProbe::engine(&self.config.engine, self.config.probe_timeout).version_or_unknown();
        let manifest = Manifest {
            scene: scene.to_string(),
            tier,
            description: description.to_string(),
            timestamp: timestamp.clone(),
            created_at: now,
            engine_version,
            resolution: profile.resolution.to_string(),
            frame_rate: profile.frame_rate,
        };
        let json = serde_json::to_string_pretty(&manifest).map_err(|e| fail(e.into()))?;
        fs::write(workspace.manifest_path(), json + "\n").map_err(fail)?;
        fs::write(
            workspace.summary_path(),
            render_summary(scene, &timestamp, description, profile),
        )
        .map_err(fail)?;

        tracing::info!(root = %workspace.root().display(), %tier, "workspace created");
        Ok(workspace)
    }
}

fn render_summary(
    scene: &str,
    timestamp: &str,
    description: &str,
    profile: &QualityProfile,
) -> String {
    let mut out = format!("# {scene}\n\nGenerated: {timestamp}\n\n");
    if !description.is_empty() {
        out.push_str(description);
        out.push_str("\n\n");
    }
    out.push_str(&format!(
        "## Settings\n\
         - Quality: {tier} ({label})\n\
         - Resolution: {resolution}\n\
         - Frame rate: {fps} fps\n\n\
         ## Files\n\
         - `{SCENE_COPY_FILE}`: scene source as built\n\
         - `{OUTPUT_DIR}/{tier}/`: rendered video\n\
         - `{LOGS_DIR}/{BUILD_LOG_FILE}`: engine command and output\n\
         - `{THUMBNAILS_DIR}/`: gif/png exports\n\
         - `{MANIFEST_FILE}`: build parameters\n",
        tier = profile.tier,
        label = profile.label,
        resolution = profile.resolution,
        fps = profile.frame_rate,
    ));
    out
}
