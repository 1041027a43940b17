//! Word and subtitle annotation bundles keyed by instance id.
//!
//! The continuous split ships six word bundles, one per hand-type and
//! sign-type combination, plus a subtitles bundle. Each bundle is a JSON
//! object mapping instance ids to timed values.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One timed annotation value, as stored in the bundles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedValue {
    /// The annotated word, or the subtitle text.
    pub value: String,
    /// Start time in milliseconds.
    pub start: i64,
    /// End time in milliseconds.
    pub end: i64,
}

/// A parsed bundle: instance id to its timed values.
pub type AnnotationBundle = BTreeMap<String, Vec<TimedValue>>;

/// Which hand performs the annotated sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandType {
    LeftHand,
    RightHand,
    BothHands,
}

impl HandType {
    pub fn as_str(self) -> &'static str {
        match self {
            HandType::LeftHand => "left_hand",
            HandType::RightHand => "right_hand",
            HandType::BothHands => "both_hands",
        }
    }
}

impl fmt::Display for HandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the annotated sign is a regular or special sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignType {
    Normal,
    Special,
}

impl SignType {
    pub fn as_str(self) -> &'static str {
        match self {
            SignType::Normal => "normal",
            SignType::Special => "special",
        }
    }
}

impl fmt::Display for SignType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The six word bundles shipped with the continuous split.
pub const WORD_BUNDLES: [(&str, HandType, SignType); 6] = [
    ("signs_left_hand.json", HandType::LeftHand, SignType::Normal),
    ("signs_right_hand.json", HandType::RightHand, SignType::Normal),
    ("signs_both_hands.json", HandType::BothHands, SignType::Normal),
    ("special_signs_left_hand.json", HandType::LeftHand, SignType::Special),
    ("special_signs_right_hand.json", HandType::RightHand, SignType::Special),
    ("special_signs_both_hands.json", HandType::BothHands, SignType::Special),
];

/// File name of the subtitles bundle.
pub const SUBTITLES_FILE: &str = "subtitles.json";

/// Errors raised while loading an annotation bundle.
#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid annotation bundle {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Load one JSON bundle from disk.
pub fn load_bundle(path: &Path) -> Result<AnnotationBundle, AnnotationError> {
    let file = File::open(path).map_err(|source| AnnotationError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| AnnotationError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn bundle_parses_instances_and_timed_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("signs_left_hand.json");
        std::fs::write(
            &path,
            r#"{
                "CLSFB01": [
                    {"value": "MAISON", "start": 0, "end": 420},
                    {"value": "PARTIR", "start": 420, "end": 900}
                ],
                "CLSFB02": []
            }"#,
        )
        .unwrap();

        let bundle = load_bundle(&path).unwrap();
        assert_eq!(bundle.len(), 2);
        let values = bundle.get("CLSFB01").unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(
            values[0],
            TimedValue {
                value: "MAISON".to_string(),
                start: 0,
                end: 420,
            }
        );
        assert!(bundle.get("CLSFB02").unwrap().is_empty());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("signs_left_hand.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = load_bundle(&path).unwrap_err();
        assert!(matches!(err, AnnotationError::Parse { .. }));
    }

    #[test]
    fn word_bundle_table_covers_every_combination() {
        let mut combos: Vec<(HandType, SignType)> =
            WORD_BUNDLES.iter().map(|(_, hand, sign)| (*hand, *sign)).collect();
        combos.dedup();
        assert_eq!(combos.len(), 6);
    }
}
