use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::quality::{QualityCatalog, QualityTier};

pub const VIDEO_EXTENSION: &str = "mp4";

/// One place the engine may have put its video.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocateStrategy {
    /// `<root>/<label>/<name>.mp4`
    LabelDir { capitalized: bool },
    /// `<root>/<name>.mp4`
    OutputRoot { capitalized: bool },
    /// First `*.mp4` anywhere under `<root>`, in sorted traversal order.
    AnyVideo,
}

impl LocateStrategy {
    /// Tried in this order; the first hit wins.
    pub const STANDARD: [LocateStrategy; 5] = [
        Self::LabelDir { capitalized: false },
        Self::LabelDir { capitalized: true },
        Self::OutputRoot { capitalized: false },
        Self::OutputRoot { capitalized: true },
        Self::AnyVideo,
    ];

    fn find(self, root: &Path, scene: &str, label: &str) -> Option<PathBuf> {
        let file = |capitalized: bool| {
            let name = if capitalized {
                capitalize_first(scene)
            } else {
                scene.to_string()
            };
            format!("{name}.{VIDEO_EXTENSION}")
        };
        match self {
            Self::LabelDir { capitalized } => {
                existing_file(root.join(label).join(file(capitalized)))
            }
            Self::OutputRoot { capitalized } => existing_file(root.join(file(capitalized))),
            Self::AnyVideo => first_video_under(root),
        }
    }
}

/// Finds the engine's output video despite naming differences between
/// engine versions.
#[derive(Clone, Debug)]
pub struct ArtifactLocator<'a> {
    catalog: &'a QualityCatalog,
    strategies: Vec<LocateStrategy>,
}

impl<'a> ArtifactLocator<'a> {
    pub fn new(catalog: &'a QualityCatalog) -> Self {
        Self::with_strategies(catalog, LocateStrategy::STANDARD.to_vec())
    }

    pub fn with_strategies(catalog: &'a QualityCatalog, strategies: Vec<LocateStrategy>) -> Self {
        Self {
            catalog,
            strategies,
        }
    }

    pub fn strategies(&self) -> &[LocateStrategy] {
        &self.strategies
    }

    /// `None` is not an error: the caller decides whether a missing video
    /// matters.
    pub fn locate(&self, output_root: &Path, scene: &str, tier: QualityTier) -> Option<PathBuf> {
        let label = self.catalog.profile(tier).label;
        self.strategies.iter().find_map(|strategy| {
            let hit = strategy.find(output_root, scene, label);
            tracing::debug!(?strategy, found = hit.is_some(), "locate strategy");
            hit
        })
    }
}

fn existing_file(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

fn first_video_under(root: &Path) -> Option<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .find(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(VIDEO_EXTENSION))
        })
}

/// Upper-cases the first character and keeps the rest as written, so
/// `myScene` becomes `MyScene` rather than `Myscene`.
fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
