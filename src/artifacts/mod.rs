//! Reconciliation of dataset artifacts (videos, pose arrays, annotations).
//!
//! Every artifact on disk belongs to one dataset instance; the instance id is
//! the file name with its extension stripped. The submodules reconcile the
//! independently-produced artifact sets into one normalized record batch.

pub mod annotations;
pub mod coverage;
pub mod duplicates;
pub mod linker;
pub mod manifest;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Dataset splits, each with its own manifest shape and delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    /// Continuous signing clips; tab-separated manifest.
    Continuous,
    /// Isolated single-sign clips; comma-separated manifest.
    Isolated,
}

impl Split {
    /// Field delimiter used by this split's instance manifest.
    ///
    /// The two splits ship with different delimiters; this difference is part
    /// of the dataset contract and must not be normalized away.
    pub fn delimiter(self) -> char {
        match self {
            Split::Continuous => '\t',
            Split::Isolated => ',',
        }
    }

    /// Stable identifier used in the store and in log output.
    pub fn as_str(self) -> &'static str {
        match self {
            Split::Continuous => "continuous",
            Split::Isolated => "isolated",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body parts captured as separate pose streams.
///
/// Declaration order matches the lexical order of the directory names, so the
/// derived `Ord` gives the deterministic grouping order used during linking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    Face,
    LeftHand,
    Pose,
    RightHand,
}

impl BodyPart {
    /// All body parts in lexical directory-name order.
    pub const ALL: [BodyPart; 4] = [
        BodyPart::Face,
        BodyPart::LeftHand,
        BodyPart::Pose,
        BodyPart::RightHand,
    ];

    /// Subfolder name under the split's `poses` directory.
    pub fn dir_name(self) -> &'static str {
        match self {
            BodyPart::Face => "face",
            BodyPart::LeftHand => "left_hand",
            BodyPart::Pose => "pose",
            BodyPart::RightHand => "right_hand",
        }
    }

    /// Parse a subfolder name back into a body part.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        BodyPart::ALL.into_iter().find(|part| part.dir_name() == name)
    }

    /// The artifact kind carried by files under this subfolder.
    pub fn artifact_kind(self) -> ArtifactKind {
        match self {
            BodyPart::Face => ArtifactKind::PoseFace,
            BodyPart::LeftHand => ArtifactKind::PoseLeftHand,
            BodyPart::Pose => ArtifactKind::PoseBody,
            BodyPart::RightHand => ArtifactKind::PoseRightHand,
        }
    }
}

impl fmt::Display for BodyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Kinds of artifacts that can be attached to a dataset instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Video,
    PoseFace,
    PoseBody,
    PoseLeftHand,
    PoseRightHand,
    WordAnnotation,
    Subtitle,
}

/// One artifact on disk, keyed by the instance id shared across artifact sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactKey {
    /// Join key across all artifact kinds for one clip.
    pub instance_id: String,
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

/// Derive the instance id from a file path by stripping the extension.
pub fn instance_id_from(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}
