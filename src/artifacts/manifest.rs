//! Tabular instance manifests, one row shape per dataset split.
//!
//! The continuous split ships a tab-separated `instances.csv`, the isolated
//! split a comma-separated one. Columns are addressed by header name so the
//! column order in the file does not matter.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use super::Split;

/// One row of the continuous split manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContinuousInstance {
    pub id: String,
    pub signer_id: i64,
    pub session_id: i64,
    pub task_id: i64,
    pub n_frames: i64,
    pub n_signs: i64,
}

/// One row of the isolated split manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IsolatedInstance {
    pub id: String,
    pub sign: String,
    pub signer: String,
    pub start: i64,
    pub end: i64,
}

/// Errors raised while parsing an instance manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Manifest {path} has no header row")]
    Empty { path: PathBuf },
    #[error("Manifest {path} is missing column '{column}'")]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("Manifest {path} line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("Manifest {path} line {line}: invalid integer in '{column}': {source}")]
    ParseInt {
        path: PathBuf,
        line: usize,
        column: &'static str,
        source: std::num::ParseIntError,
    },
}

/// Load the continuous split manifest (tab-separated).
pub fn load_continuous(path: &Path) -> Result<Vec<ContinuousInstance>, ManifestError> {
    let table = Table::read(path, Split::Continuous.delimiter())?;
    let id = table.column("id")?;
    let signer_id = table.column("signer_id")?;
    let session_id = table.column("session_id")?;
    let task_id = table.column("task_id")?;
    let n_frames = table.column("n_frames")?;
    let n_signs = table.column("n_signs")?;

    let mut rows = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        rows.push(ContinuousInstance {
            id: row.field(id).to_string(),
            signer_id: row.integer(signer_id, "signer_id")?,
            session_id: row.integer(session_id, "session_id")?,
            task_id: row.integer(task_id, "task_id")?,
            n_frames: row.integer(n_frames, "n_frames")?,
            n_signs: row.integer(n_signs, "n_signs")?,
        });
    }
    Ok(rows)
}

/// Load the isolated split manifest (comma-separated).
pub fn load_isolated(path: &Path) -> Result<Vec<IsolatedInstance>, ManifestError> {
    let table = Table::read(path, Split::Isolated.delimiter())?;
    let id = table.column("id")?;
    let sign = table.column("sign")?;
    let signer = table.column("signer")?;
    let start = table.column("start")?;
    let end = table.column("end")?;

    let mut rows = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        rows.push(IsolatedInstance {
            id: row.field(id).to_string(),
            sign: row.field(sign).to_string(),
            signer: row.field(signer).to_string(),
            start: row.integer(start, "start")?,
            end: row.integer(end, "end")?,
        });
    }
    Ok(rows)
}

/// A delimiter-split manifest held in memory with header-addressed columns.
struct Table {
    path: PathBuf,
    header: Vec<String>,
    rows: Vec<Row>,
}

struct Row {
    path: PathBuf,
    line: usize,
    fields: Vec<String>,
}

impl Table {
    fn read(path: &Path, delimiter: char) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
            .filter(|(_, line)| !line.trim().is_empty());

        let Some((_, header_line)) = lines.next() else {
            return Err(ManifestError::Empty {
                path: path.to_path_buf(),
            });
        };
        let header: Vec<String> = header_line
            .split(delimiter)
            .map(|field| field.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (line, content) in lines {
            let fields: Vec<String> = content
                .split(delimiter)
                .map(|field| field.trim().to_string())
                .collect();
            if fields.len() != header.len() {
                return Err(ManifestError::FieldCount {
                    path: path.to_path_buf(),
                    line,
                    expected: header.len(),
                    found: fields.len(),
                });
            }
            rows.push(Row {
                path: path.to_path_buf(),
                line,
                fields,
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
            header,
            rows,
        })
    }

    fn column(&self, name: &'static str) -> Result<usize, ManifestError> {
        self.header
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| ManifestError::MissingColumn {
                path: self.path.clone(),
                column: name,
            })
    }
}

impl Row {
    fn field(&self, index: usize) -> &str {
        &self.fields[index]
    }

    fn integer(&self, index: usize, column: &'static str) -> Result<i64, ManifestError> {
        self.fields[index]
            .parse()
            .map_err(|source| ManifestError::ParseInt {
                path: self.path.clone(),
                line: self.line,
                column,
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn continuous_manifest_is_tab_separated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("instances.csv");
        std::fs::write(
            &path,
            "id\tsigner_id\tsession_id\ttask_id\tn_frames\tn_signs\n\
             CLSFB01\t4\t1\t2\t1200\t37\n\
             CLSFB02\t5\t1\t2\t900\t21\n",
        )
        .unwrap();

        let rows = load_continuous(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            ContinuousInstance {
                id: "CLSFB01".to_string(),
                signer_id: 4,
                session_id: 1,
                task_id: 2,
                n_frames: 1200,
                n_signs: 37,
            }
        );
    }

    #[test]
    fn isolated_manifest_is_comma_separated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("instances.csv");
        std::fs::write(
            &path,
            "id,sign,signer,start,end\nISOL01,MAISON,S004,120,310\n",
        )
        .unwrap();

        let rows = load_isolated(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sign, "MAISON");
        assert_eq!(rows[0].start, 120);
        assert_eq!(rows[0].end, 310);
    }

    #[test]
    fn wrong_delimiter_surfaces_as_missing_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("instances.csv");
        // Comma-separated content fed through the continuous (tab) loader.
        std::fs::write(&path, "id,signer_id,session_id,task_id,n_frames,n_signs\n").unwrap();

        let err = load_continuous(&path).unwrap_err();
        assert!(matches!(err, ManifestError::MissingColumn { column: "id", .. }));
    }

    #[test]
    fn short_row_is_rejected_with_its_line_number() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("instances.csv");
        std::fs::write(
            &path,
            "id,sign,signer,start,end\nISOL01,MAISON,S004,120\n",
        )
        .unwrap();

        let err = load_isolated(&path).unwrap_err();
        assert!(matches!(
            err,
            ManifestError::FieldCount {
                line: 2,
                expected: 5,
                found: 4,
                ..
            }
        ));
    }

    #[test]
    fn column_order_does_not_matter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("instances.csv");
        std::fs::write(
            &path,
            "sign,id,end,start,signer\nMAISON,ISOL02,310,120,S004\n",
        )
        .unwrap();

        let rows = load_isolated(&path).unwrap();
        assert_eq!(rows[0].id, "ISOL02");
        assert_eq!(rows[0].signer, "S004");
    }

    #[test]
    fn bad_integer_reports_line_and_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("instances.csv");
        std::fs::write(
            &path,
            "id,sign,signer,start,end\nISOL03,MAISON,S004,abc,310\n",
        )
        .unwrap();

        let err = load_isolated(&path).unwrap_err();
        assert!(matches!(
            err,
            ManifestError::ParseInt {
                line: 2,
                column: "start",
                ..
            }
        ));
    }
}
