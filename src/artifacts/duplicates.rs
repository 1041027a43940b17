//! Recursive duplicate filename detection across directory trees.
//!
//! A duplicate here is two files sharing the exact name, extension included,
//! anywhere under any of the walked trees. This is the opposite identity
//! notion from [`super::coverage`] and must not be merged with it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Map from full file name to every path bearing it (2+ occurrences only).
pub type DuplicateMap = BTreeMap<String, Vec<PathBuf>>;

/// Walk every supplied tree and report file names occurring more than once
/// across all of them combined.
///
/// Symlinks are not followed. Unreadable directories are logged and skipped
/// rather than aborting the walk. Paths in each group are sorted so callers
/// get deterministic output.
pub fn find_duplicates(directories: &[PathBuf]) -> DuplicateMap {
    let mut by_name: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for dir in directories {
        walk(dir, &mut by_name);
    }
    by_name.retain(|_, paths| paths.len() > 1);
    for paths in by_name.values_mut() {
        paths.sort();
    }
    by_name
}

fn walk(root: &Path, by_name: &mut BTreeMap<String, Vec<PathBuf>>) {
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "Failed to read directory during duplicate scan");
                continue;
            }
        };
        for entry_result in entries {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(dir = %dir.display(), error = %err, "Failed to read directory entry during duplicate scan");
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Failed to read file type during duplicate scan");
                    continue;
                }
            };
            if file_type.is_symlink() {
                continue;
            }
            if file_type.is_dir() {
                stack.push(path);
                continue;
            }
            if file_type.is_file() {
                let name = entry.file_name().to_string_lossy().into_owned();
                by_name.entry(name).or_default().push(path);
            }
        }
    }
}
