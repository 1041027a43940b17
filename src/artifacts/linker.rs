//! Linking scanned artifacts to manifest instances and batching them into
//! the store.
//!
//! Each artifact category (instances, videos, word annotations, subtitles,
//! poses) is committed as its own transaction, in that order. A category
//! that fails is rolled back and recorded, but already-committed categories
//! stay in place and later categories still run.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use super::annotations::{self, SUBTITLES_FILE, WORD_BUNDLES};
use super::manifest::{self, ManifestError};
use super::{ArtifactKey, ArtifactKind, BodyPart, Split, instance_id_from};
use crate::store::{DatasetDb, DatasetWriteBatch};

/// File name of the instance manifest inside a split root.
pub const MANIFEST_FILE: &str = "instances.csv";
/// Subfolder holding the split's video files.
pub const VIDEOS_DIR: &str = "videos";
/// Subfolder holding per-body-part pose subfolders.
pub const POSES_DIR: &str = "poses";
/// Subfolder holding annotation bundles (continuous split only).
pub const ANNOTATIONS_DIR: &str = "annotations";

/// Video container extensions accepted when scanning the videos folder.
const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "mov", "webm"];
const POSE_EXTENSION: &str = "npy";

/// Artifact categories committed as independent batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Instances,
    Videos,
    WordAnnotations,
    Subtitles,
    Poses,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Instances => "instances",
            Category::Videos => "videos",
            Category::WordAnnotations => "word_annotations",
            Category::Subtitles => "subtitles",
            Category::Poses => "poses",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A category whose batch could not be committed.
#[derive(Debug, Clone)]
pub struct CategoryFailure {
    pub category: Category,
    pub error: String,
}

/// Outcome of linking one split.
#[derive(Debug)]
pub struct IngestReport {
    pub split: Split,
    /// Rows inserted per category.
    pub instances: usize,
    pub videos: usize,
    pub word_annotations: usize,
    pub subtitles: usize,
    pub poses: usize,
    /// Artifacts whose instance id matched no manifest row.
    pub skipped: Vec<ArtifactKey>,
    /// Extra video files for an instance that already had one.
    pub duplicate_videos: Vec<ArtifactKey>,
    /// Categories rolled back; earlier commits are retained.
    pub failures: Vec<CategoryFailure>,
}

impl IngestReport {
    fn new(split: Split) -> Self {
        Self {
            split,
            instances: 0,
            videos: 0,
            word_annotations: 0,
            subtitles: 0,
            poses: 0,
            skipped: Vec::new(),
            duplicate_videos: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// True when every category committed cleanly.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Errors fatal to a whole linking run.
///
/// Category-level problems are reported through [`IngestReport::failures`]
/// instead; only a missing root or an unreadable manifest aborts the run,
/// since without the manifest there is nothing to link against.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Dataset root is not a directory: {0}")]
    InvalidRoot(PathBuf),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Link the continuous split at `root` into the store.
pub fn ingest_continuous(db: &DatasetDb, root: &Path) -> Result<IngestReport, LinkError> {
    if !root.is_dir() {
        return Err(LinkError::InvalidRoot(root.to_path_buf()));
    }
    let rows = manifest::load_continuous(&root.join(MANIFEST_FILE))?;
    let known: BTreeSet<&str> = rows.iter().map(|row| row.id.as_str()).collect();
    let mut report = IngestReport::new(Split::Continuous);

    let outcome = run_category(db, Category::Instances, &mut report.failures, |batch| {
        for row in &rows {
            batch
                .insert_continuous_instance(row)
                .map_err(|err| err.to_string())?;
        }
        Ok(CategoryOutcome::counted(rows.len()))
    });
    report.instances = outcome.inserted;

    let videos_dir = root.join(VIDEOS_DIR);
    let outcome = run_category(db, Category::Videos, &mut report.failures, |batch| {
        link_videos(batch, Split::Continuous, &videos_dir, &known)
    });
    report.videos = outcome.inserted;
    absorb(&mut report, outcome);

    let annotations_dir = root.join(ANNOTATIONS_DIR);
    let outcome = run_category(db, Category::WordAnnotations, &mut report.failures, |batch| {
        link_word_annotations(batch, &annotations_dir, &known)
    });
    report.word_annotations = outcome.inserted;
    absorb(&mut report, outcome);

    let outcome = run_category(db, Category::Subtitles, &mut report.failures, |batch| {
        link_subtitles(batch, &annotations_dir, &known)
    });
    report.subtitles = outcome.inserted;
    absorb(&mut report, outcome);

    let poses_dir = root.join(POSES_DIR);
    let outcome = run_category(db, Category::Poses, &mut report.failures, |batch| {
        link_poses(batch, Split::Continuous, &poses_dir, &known)
    });
    report.poses = outcome.inserted;
    absorb(&mut report, outcome);

    Ok(report)
}

/// Link the isolated split at `root` into the store.
///
/// The isolated split carries no annotation bundles, so only instances,
/// videos, and poses are linked.
pub fn ingest_isolated(db: &DatasetDb, root: &Path) -> Result<IngestReport, LinkError> {
    if !root.is_dir() {
        return Err(LinkError::InvalidRoot(root.to_path_buf()));
    }
    let rows = manifest::load_isolated(&root.join(MANIFEST_FILE))?;
    let known: BTreeSet<&str> = rows.iter().map(|row| row.id.as_str()).collect();
    let mut report = IngestReport::new(Split::Isolated);

    let outcome = run_category(db, Category::Instances, &mut report.failures, |batch| {
        for row in &rows {
            batch
                .insert_isolated_instance(row)
                .map_err(|err| err.to_string())?;
        }
        Ok(CategoryOutcome::counted(rows.len()))
    });
    report.instances = outcome.inserted;

    let videos_dir = root.join(VIDEOS_DIR);
    let outcome = run_category(db, Category::Videos, &mut report.failures, |batch| {
        link_videos(batch, Split::Isolated, &videos_dir, &known)
    });
    report.videos = outcome.inserted;
    absorb(&mut report, outcome);

    let poses_dir = root.join(POSES_DIR);
    let outcome = run_category(db, Category::Poses, &mut report.failures, |batch| {
        link_poses(batch, Split::Isolated, &poses_dir, &known)
    });
    report.poses = outcome.inserted;
    absorb(&mut report, outcome);

    Ok(report)
}

#[derive(Debug, Default)]
struct CategoryOutcome {
    inserted: usize,
    skipped: Vec<ArtifactKey>,
    duplicates: Vec<ArtifactKey>,
}

impl CategoryOutcome {
    fn counted(inserted: usize) -> Self {
        Self {
            inserted,
            ..Self::default()
        }
    }
}

fn absorb(report: &mut IngestReport, outcome: CategoryOutcome) {
    report.skipped.extend(outcome.skipped);
    report.duplicate_videos.extend(outcome.duplicates);
}

/// Run one category inside its own transaction.
///
/// On any error the batch is dropped (rolled back) and the failure recorded;
/// the caller moves on to the next category.
fn run_category(
    db: &DatasetDb,
    category: Category,
    failures: &mut Vec<CategoryFailure>,
    link: impl FnOnce(&mut DatasetWriteBatch<'_>) -> Result<CategoryOutcome, String>,
) -> CategoryOutcome {
    let mut record = |error: String| {
        warn!(category = %category, error = %error, "Category batch failed; earlier categories are retained");
        failures.push(CategoryFailure { category, error });
        CategoryOutcome::default()
    };
    let mut batch = match db.write_batch() {
        Ok(batch) => batch,
        Err(err) => return record(err.to_string()),
    };
    match link(&mut batch) {
        Ok(outcome) => match batch.commit() {
            Ok(()) => outcome,
            Err(err) => record(err.to_string()),
        },
        Err(error) => record(error),
    }
}

fn link_videos(
    batch: &mut DatasetWriteBatch<'_>,
    split: Split,
    videos_dir: &Path,
    known: &BTreeSet<&str>,
) -> Result<CategoryOutcome, String> {
    let mut outcome = CategoryOutcome::default();
    let mut linked: BTreeSet<String> = BTreeSet::new();
    for path in list_sorted_files(videos_dir, &VIDEO_EXTENSIONS)? {
        let Some(id) = instance_id_from(&path) else {
            continue;
        };
        let key = ArtifactKey {
            instance_id: id.clone(),
            kind: ArtifactKind::Video,
            path: path.clone(),
        };
        if !known.contains(id.as_str()) {
            warn!(split = %split, instance_id = %id, path = %path.display(), "Video has no matching instance; skipping");
            outcome.skipped.push(key);
            continue;
        }
        if !linked.insert(id.clone()) {
            warn!(split = %split, instance_id = %id, path = %path.display(), "Instance already has a video; reporting extra file");
            outcome.duplicates.push(key);
            continue;
        }
        batch
            .insert_video(split, &id, &path)
            .map_err(|err| err.to_string())?;
        outcome.inserted += 1;
    }
    Ok(outcome)
}

fn link_word_annotations(
    batch: &mut DatasetWriteBatch<'_>,
    annotations_dir: &Path,
    known: &BTreeSet<&str>,
) -> Result<CategoryOutcome, String> {
    let mut outcome = CategoryOutcome::default();
    for (file_name, hand_type, sign_type) in WORD_BUNDLES {
        let path = annotations_dir.join(file_name);
        if !path.is_file() {
            warn!(path = %path.display(), "Word bundle missing; treating as empty");
            continue;
        }
        let bundle = annotations::load_bundle(&path).map_err(|err| err.to_string())?;
        for (instance_id, values) in &bundle {
            if !known.contains(instance_id.as_str()) {
                warn!(instance_id = %instance_id, bundle = file_name, "Word annotations for unknown instance; skipping");
                outcome.skipped.push(ArtifactKey {
                    instance_id: instance_id.clone(),
                    kind: ArtifactKind::WordAnnotation,
                    path: path.clone(),
                });
                continue;
            }
            for value in values {
                batch
                    .insert_word_annotation(instance_id, hand_type, sign_type, value)
                    .map_err(|err| err.to_string())?;
                outcome.inserted += 1;
            }
        }
    }
    Ok(outcome)
}

fn link_subtitles(
    batch: &mut DatasetWriteBatch<'_>,
    annotations_dir: &Path,
    known: &BTreeSet<&str>,
) -> Result<CategoryOutcome, String> {
    let mut outcome = CategoryOutcome::default();
    let path = annotations_dir.join(SUBTITLES_FILE);
    if !path.is_file() {
        warn!(path = %path.display(), "Subtitles bundle missing; treating as empty");
        return Ok(outcome);
    }
    let bundle = annotations::load_bundle(&path).map_err(|err| err.to_string())?;
    for (instance_id, values) in &bundle {
        if !known.contains(instance_id.as_str()) {
            warn!(instance_id = %instance_id, "Subtitles for unknown instance; skipping");
            outcome.skipped.push(ArtifactKey {
                instance_id: instance_id.clone(),
                kind: ArtifactKind::Subtitle,
                path: path.clone(),
            });
            continue;
        }
        for value in values {
            batch
                .insert_subtitle(instance_id, value)
                .map_err(|err| err.to_string())?;
            outcome.inserted += 1;
        }
    }
    Ok(outcome)
}

fn link_poses(
    batch: &mut DatasetWriteBatch<'_>,
    split: Split,
    poses_dir: &Path,
    known: &BTreeSet<&str>,
) -> Result<CategoryOutcome, String> {
    let mut outcome = CategoryOutcome::default();
    let mut groups: BTreeMap<String, Vec<(BodyPart, PathBuf)>> = BTreeMap::new();
    for part in BodyPart::ALL {
        let dir = poses_dir.join(part.dir_name());
        if !dir.is_dir() {
            continue;
        }
        for path in list_sorted_files(&dir, &[POSE_EXTENSION])? {
            if let Some(id) = instance_id_from(&path) {
                groups.entry(id).or_default().push((part, path));
            }
        }
    }
    for (instance_id, mut parts) in groups {
        parts.sort_by_key(|(part, _)| *part);
        if !known.contains(instance_id.as_str()) {
            warn!(split = %split, instance_id = %instance_id, "Pose files have no matching instance; skipping");
            for (part, path) in parts {
                outcome.skipped.push(ArtifactKey {
                    instance_id: instance_id.clone(),
                    kind: part.artifact_kind(),
                    path,
                });
            }
            continue;
        }
        for (part, path) in parts {
            batch
                .insert_pose(split, &instance_id, part, &path)
                .map_err(|err| err.to_string())?;
            outcome.inserted += 1;
        }
    }
    Ok(outcome)
}

/// List regular files under `dir` with one of the given extensions, sorted
/// by file name. A missing directory is an empty listing, not an error.
fn list_sorted_files(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, String> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "Artifact folder missing; treating as empty");
        return Ok(Vec::new());
    }
    let entries =
        fs::read_dir(dir).map_err(|err| format!("Failed to read {}: {err}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| format!("Failed to read entry in {}: {err}", dir.display()))?;
        let is_file = entry
            .file_type()
            .map(|file_type| file_type.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.contains(&ext));
        if matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
