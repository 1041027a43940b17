//! Presence scan comparing two dataset roots per body-part subfolder.
//!
//! Coverage asks "which instances have this artifact on each side?", so it
//! deliberately ignores extensions and only looks one level deep. Duplicate
//! detection in [`super::duplicates`] answers a different question with the
//! opposite choices; the two must stay separate operations.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use super::instance_id_from;

/// Presence of one instance id on each scanned side, for one subfolder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageRow {
    /// Body-part subfolder the id was found under.
    pub subfolder: String,
    pub instance_id: String,
    /// Present under the first root.
    pub in_first: bool,
    /// Present under the second root.
    pub in_second: bool,
}

/// Errors that can occur while scanning coverage.
#[derive(Debug, Error)]
pub enum CoverageError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Compare `first_root/<part>` against `second_root/<part>` for every listed
/// subfolder, reporting each instance id found on either side.
///
/// The scan is single-level and extension-insensitive. A missing subfolder is
/// an empty set, not an error; dataset splits are allowed to be incomplete.
/// Every reported id is present on at least one side by construction.
pub fn reconcile(
    first_root: &Path,
    second_root: &Path,
    subfolders: &[&str],
) -> Result<Vec<CoverageRow>, CoverageError> {
    let mut rows = Vec::new();
    for part in subfolders {
        let first = list_stems(&first_root.join(part))?;
        let second = list_stems(&second_root.join(part))?;
        for id in first.union(&second) {
            rows.push(CoverageRow {
                subfolder: (*part).to_string(),
                instance_id: id.clone(),
                in_first: first.contains(id),
                in_second: second.contains(id),
            });
        }
    }
    Ok(rows)
}

/// List the extension-stripped names of regular files directly under `dir`.
fn list_stems(dir: &Path) -> Result<BTreeSet<String>, CoverageError> {
    let mut stems = BTreeSet::new();
    if !dir.is_dir() {
        return Ok(stems);
    }
    let entries = fs::read_dir(dir).map_err(|source| CoverageError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "Failed to read directory entry during coverage scan");
                continue;
            }
        };
        let is_file = entry
            .file_type()
            .map(|file_type| file_type.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }
        if let Some(id) = instance_id_from(&entry.path()) {
            stems.insert(id);
        }
    }
    Ok(stems)
}

/// Write coverage rows as CSV with one line per (subfolder, instance id).
///
/// `first_label` and `second_label` name the scanned sides in the header,
/// e.g. "poses" and "videos".
pub fn write_csv<W: Write>(
    rows: &[CoverageRow],
    first_label: &str,
    second_label: &str,
    writer: &mut W,
) -> io::Result<()> {
    writeln!(writer, "subfolder,instance_id,{first_label},{second_label}")?;
    for row in rows {
        writeln!(
            writer,
            "{},{},{},{}",
            row.subfolder,
            row.instance_id,
            presence(row.in_first),
            presence(row.in_second)
        )?;
    }
    Ok(())
}

fn presence(present: bool) -> &'static str {
    if present { "present" } else { "absent" }
}
