use std::path::{Path, PathBuf};

use crate::{
    config::BuildConfig,
    error::{BuildError, BuildResult, BuildWarning},
    locate::ArtifactLocator,
    quality::QualityTier,
    render::RenderInvoker,
    transcode::{TranscodeOpts, TranscodePipeline},
    workspace::{Workspace, WorkspaceManager},
};

pub const DEFAULT_SCENE: &str = "Scene";
pub const DEFAULT_QUALITY: &str = "high";

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum OutputFormat {
    #[default]
    Video,
    AnimatedImage(TranscodeOpts),
    /// First frame as a png.
    StillImage,
}

/// One build, as asked for by the operator.
#[derive(Clone, Debug)]
pub struct BuildRequest {
    pub scene_file: PathBuf,
    pub scene: String,
    /// Tier name; validated against the catalog, never defaulted silently.
    pub quality: String,
    pub description: String,
    pub format: OutputFormat,
    /// Use this directory as the workspace root instead of creating one.
    pub output_dir: Option<PathBuf>,
}

impl BuildRequest {
    pub fn new(scene_file: impl Into<PathBuf>) -> Self {
        Self {
            scene_file: scene_file.into(),
            scene: DEFAULT_SCENE.to_string(),
            quality: DEFAULT_QUALITY.to_string(),
            description: String::new(),
            format: OutputFormat::Video,
            output_dir: None,
        }
    }

    pub fn scene(mut self, scene: impl Into<String>) -> Self {
        self.scene = scene.into();
        self
    }

    pub fn quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = quality.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}

/// Where a build stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildStage {
    ValidateInputs,
    CreateWorkspace,
    CopyScene,
    Invoke,
    LocateArtifact,
    Transcode,
    Succeeded,
}

/// Outcome of [`Orchestrator::run`]. Success means the engine exited 0;
/// location and transcoding problems only add warnings.
#[derive(Debug)]
pub struct BuildReport {
    pub stage: BuildStage,
    pub workspace: Option<Workspace>,
    pub artifact: Option<PathBuf>,
    pub derived: Option<PathBuf>,
    pub warnings: Vec<BuildWarning>,
    pub failure: Option<BuildError>,
}

impl BuildReport {
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.workspace.as_ref().map(Workspace::build_log)
    }

    fn failed(stage: BuildStage, workspace: Option<Workspace>, err: BuildError) -> Self {
        tracing::info!(?stage, %err, "build failed");
        Self {
            stage,
            workspace,
            artifact: None,
            derived: None,
            warnings: Vec::new(),
            failure: Some(err),
        }
    }
}

/// Sequences one build: validate, create the workspace, render, locate the
/// video, optionally derive a gif/png.
pub struct Orchestrator<'a> {
    config: &'a BuildConfig,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a BuildConfig) -> Self {
        Self { config }
    }

    /// Never returns an error: every failure is folded into the report.
    /// Workspaces of failed builds are left on disk.
    #[tracing::instrument(skip(self, request), fields(scene = %request.scene, quality = %request.quality))]
    pub fn run(&self, request: &BuildRequest) -> BuildReport {
        let invoker = RenderInvoker::new(self.config);

        let profile = match invoker.preflight(&request.scene_file, &request.quality) {
            Ok(profile) => profile,
            Err(err) => return BuildReport::failed(BuildStage::ValidateInputs, None, err),
        };

        let workspace = match self.workspace_for(request, profile.tier) {
            Ok(ws) => ws,
            Err(err) => return BuildReport::failed(BuildStage::CreateWorkspace, None, err),
        };

        if let Err(err) = invoker.copy_scene(&request.scene_file, &workspace) {
            return BuildReport::failed(BuildStage::CopyScene, Some(workspace), err);
        }

        let outcome = invoker
            .execute(&request.scene_file, &request.scene, profile, &workspace)
            .and_then(|outcome| outcome.into_result(self.config.render_timeout));
        if let Err(err) = outcome {
            return BuildReport::failed(BuildStage::Invoke, Some(workspace), err);
        }

        let mut report = BuildReport {
            stage: BuildStage::LocateArtifact,
            workspace: None,
            artifact: None,
            derived: None,
            warnings: Vec::new(),
            failure: None,
        };

        let output_root = workspace.output_dir();
        report.artifact =
            ArtifactLocator::new(&self.config.catalog).locate(&output_root, &request.scene, profile.tier);
        match &report.artifact {
            Some(path) => tracing::info!(artifact = %path.display(), "video located"),
            None => {
                tracing::warn!(root = %output_root.display(), "render succeeded but no video located");
                report.warnings.push(BuildWarning::ArtifactNotLocated {
                    search_root: output_root,
                });
            }
        }

        if let Some(video) = report.artifact.as_deref() {
            report.stage = BuildStage::Transcode;
            match self.derive(video, &workspace, request.format) {
                Ok(derived) => report.derived = derived,
                Err(err) => {
                    tracing::warn!(%err, "secondary export failed");
                    report.warnings.push(BuildWarning::Transcode(err));
                }
            }
        }

        report.stage = BuildStage::Succeeded;
        report.workspace = Some(workspace);
        report
    }

    fn workspace_for(&self, request: &BuildRequest, tier: QualityTier) -> BuildResult<Workspace> {
        match &request.output_dir {
            Some(dir) => {
                tracing::info!(root = %dir.display(), "using caller-managed output directory");
                Ok(Workspace::adopt(dir))
            }
            None => WorkspaceManager::new(self.config).create(
                &request.scene,
                tier,
                &request.description,
            ),
        }
    }

    fn derive(
        &self,
        video: &Path,
        workspace: &Workspace,
        format: OutputFormat,
    ) -> BuildResult<Option<PathBuf>> {
        let pipeline = TranscodePipeline::new(self.config);
        match format {
            OutputFormat::Video => Ok(None),
            OutputFormat::AnimatedImage(opts) => {
                pipeline.export_animated_image(video, workspace, opts).map(Some)
            }
            OutputFormat::StillImage => pipeline.export_still_image(video, workspace).map(Some),
        }
    }
}
