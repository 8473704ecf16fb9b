//! Build orchestration for scene renders.
//!
//! A build takes a scene source file and a scene name, lays out a
//! timestamped workspace, runs the external rendering engine under a
//! timeout, finds the video it produced and optionally derives a gif or png
//! from it with ffmpeg.
#![forbid(unsafe_code)]

pub mod build;
pub mod config;
pub mod error;
pub mod locate;
pub mod probe;
pub mod process;
pub mod quality;
pub mod render;
pub mod transcode;
pub mod workspace;

pub use build::{BuildReport, BuildRequest, BuildStage, Orchestrator, OutputFormat};
pub use config::{BuildConfig, ToolCommand};
pub use error::{BuildError, BuildResult, BuildWarning, ErrorKind, ProbeError};
pub use locate::{ArtifactLocator, LocateStrategy};
pub use probe::{ToolProbe, ToolVersion, UNKNOWN_VERSION};
pub use quality::{QualityCatalog, QualityProfile, QualityTier};
pub use render::{RenderInvoker, RenderOutcome, RenderStatus};
pub use transcode::{TranscodeOpts, TranscodePipeline};
pub use workspace::{Manifest, Workspace, WorkspaceManager};
