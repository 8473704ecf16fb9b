use std::{fmt, str::FromStr};

use crate::error::{BuildError, BuildResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    Medium,
    High,
    Ultra,
}

impl QualityTier {
    pub const ALL: [QualityTier; 4] = [Self::Low, Self::Medium, Self::High, Self::Ultra];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Ultra => "ultra",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|t| t.as_str()).collect()
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for QualityTier {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            // engines usually call the top preset "4k"
            "ultra" | "4k" => Ok(Self::Ultra),
            other => Err(BuildError::unknown_tier(other, &Self::names())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QualityProfile {
    pub tier: QualityTier,
    /// Flag passed to the rendering engine, e.g. `-qh`.
    pub engine_flag: &'static str,
    /// Display label; also the engine's output subdirectory name, e.g. `1080p`.
    pub label: &'static str,
    pub resolution: &'static str,
    pub frame_rate: u32,
}

/// Fixed tier -> profile table. Every flag, label, resolution and frame rate
/// used anywhere in the crate comes from here.
#[derive(Clone, Debug)]
pub struct QualityCatalog {
    profiles: [QualityProfile; 4],
}

impl Default for QualityCatalog {
    fn default() -> Self {
        Self {
            profiles: [
                QualityProfile {
                    tier: QualityTier::Low,
                    engine_flag: "-ql",
                    label: "480p",
                    resolution: "854x480",
                    frame_rate: 15,
                },
                QualityProfile {
                    tier: QualityTier::Medium,
                    engine_flag: "-qm",
                    label: "720p",
                    resolution: "1280x720",
                    frame_rate: 30,
                },
                QualityProfile {
                    tier: QualityTier::High,
                    engine_flag: "-qh",
                    label: "1080p",
                    resolution: "1920x1080",
                    frame_rate: 30,
                },
                QualityProfile {
                    tier: QualityTier::Ultra,
                    engine_flag: "-qk",
                    label: "2160p",
                    resolution: "3840x2160",
                    frame_rate: 60,
                },
            ],
        }
    }
}

impl QualityCatalog {
    pub fn profile(&self, tier: QualityTier) -> &QualityProfile {
        // `profiles` is ordered like `QualityTier::ALL`
        &self.profiles[tier as usize]
    }

    /// Resolve a tier name. Unknown names are an error, never a default.
    pub fn resolve(&self, name: &str) -> BuildResult<&QualityProfile> {
        let tier: QualityTier = name.parse()?;
        Ok(self.profile(tier))
    }

    pub fn iter(&self) -> impl Iterator<Item = &QualityProfile> {
        self.profiles.iter()
    }
}
