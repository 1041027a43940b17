//! SQLite persistence for the normalized dataset model.
//!
//! One database file holds both splits. The two instance tables keep their
//! genuinely different row shapes; videos and poses share a table with a
//! split discriminator. The `(split, instance_id)` primary key on `videos`
//! backs the one-video-per-instance invariant at the store level.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, Transaction, params};
use thiserror::Error;

use crate::artifacts::annotations::{HandType, SignType, TimedValue};
use crate::artifacts::manifest::{ContinuousInstance, IsolatedInstance};
use crate::artifacts::{BodyPart, Split};

/// Errors returned by the dataset store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database query failed: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("Could not create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("SQLite returned an unexpected result")]
    Unexpected,
}

/// Row counts per table, for ingest summaries and sanity checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub continuous_instances: i64,
    pub isolated_instances: i64,
    pub videos: i64,
    pub poses: i64,
    pub word_annotations: i64,
    pub subtitle_annotations: i64,
}

/// SQLite wrapper owning the connection to one dataset database.
pub struct DatasetDb {
    connection: Connection,
}

impl DatasetDb {
    /// Open (or create) the database at the given file path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let connection = Connection::open(path)?;
        let db = Self { connection };
        db.apply_pragmas()?;
        db.apply_schema()?;
        Ok(db)
    }

    /// Open an in-memory database. Used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let db = Self {
            connection: Connection::open_in_memory()?,
        };
        db.apply_schema()?;
        Ok(db)
    }

    /// Start a write batch that wraps related mutations in one transaction.
    pub fn write_batch(&self) -> Result<DatasetWriteBatch<'_>, StoreError> {
        Ok(DatasetWriteBatch {
            tx: self.connection.unchecked_transaction()?,
        })
    }

    /// Fetch the video path linked to an instance, if any.
    pub fn video_path(
        &self,
        split: Split,
        instance_id: &str,
    ) -> Result<Option<PathBuf>, StoreError> {
        let path: Option<String> = self
            .connection
            .query_row(
                "SELECT path FROM videos WHERE split = ?1 AND instance_id = ?2",
                params![split.as_str(), instance_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(path.map(PathBuf::from))
    }

    /// Fetch the pose files linked to an instance, in body-part order.
    pub fn pose_paths(
        &self,
        split: Split,
        instance_id: &str,
    ) -> Result<Vec<(BodyPart, PathBuf)>, StoreError> {
        let mut stmt = self.connection.prepare(
            "SELECT body_part, path FROM poses
             WHERE split = ?1 AND instance_id = ?2
             ORDER BY body_part ASC",
        )?;
        let rows = stmt
            .query_map(params![split.as_str(), instance_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(part, path)| {
                BodyPart::from_dir_name(&part)
                    .map(|part| (part, PathBuf::from(path)))
                    .ok_or(StoreError::Unexpected)
            })
            .collect()
    }

    /// Fetch the word annotations stored for an instance, in time order.
    pub fn word_annotations(
        &self,
        instance_id: &str,
    ) -> Result<Vec<(HandType, SignType, TimedValue)>, StoreError> {
        let mut stmt = self.connection.prepare(
            "SELECT hand_type, sign_type, word, start_ms, end_ms FROM word_annotations
             WHERE instance_id = ?1
             ORDER BY start_ms ASC, end_ms ASC",
        )?;
        let rows = stmt
            .query_map(params![instance_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    TimedValue {
                        value: row.get(2)?,
                        start: row.get(3)?,
                        end: row.get(4)?,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(hand, sign, value)| {
                let hand = parse_hand_type(&hand).ok_or(StoreError::Unexpected)?;
                let sign = parse_sign_type(&sign).ok_or(StoreError::Unexpected)?;
                Ok((hand, sign, value))
            })
            .collect()
    }

    /// Row counts across all tables.
    pub fn counts(&self) -> Result<StoreCounts, StoreError> {
        Ok(StoreCounts {
            continuous_instances: self.count_table("continuous_instances")?,
            isolated_instances: self.count_table("isolated_instances")?,
            videos: self.count_table("videos")?,
            poses: self.count_table("poses")?,
            word_annotations: self.count_table("word_annotations")?,
            subtitle_annotations: self.count_table("subtitle_annotations")?,
        })
    }

    fn count_table(&self, table: &str) -> Result<i64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        Ok(self.connection.query_row(&sql, [], |row| row.get(0))?)
    }

    fn apply_pragmas(&self) -> Result<(), StoreError> {
        self.connection.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;
             PRAGMA temp_store=MEMORY;",
        )?;
        Ok(())
    }

    fn apply_schema(&self) -> Result<(), StoreError> {
        self.connection.execute_batch(
            "CREATE TABLE IF NOT EXISTS continuous_instances (
                id TEXT PRIMARY KEY,
                signer_id INTEGER NOT NULL,
                session_id INTEGER NOT NULL,
                task_id INTEGER NOT NULL,
                n_frames INTEGER NOT NULL,
                n_signs INTEGER NOT NULL
            );
             CREATE TABLE IF NOT EXISTS isolated_instances (
                id TEXT PRIMARY KEY,
                sign TEXT NOT NULL,
                signer TEXT NOT NULL,
                start_frame INTEGER NOT NULL,
                end_frame INTEGER NOT NULL
            );
             CREATE TABLE IF NOT EXISTS videos (
                split TEXT NOT NULL,
                instance_id TEXT NOT NULL,
                path TEXT NOT NULL,
                PRIMARY KEY (split, instance_id)
            );
             CREATE TABLE IF NOT EXISTS poses (
                split TEXT NOT NULL,
                instance_id TEXT NOT NULL,
                body_part TEXT NOT NULL,
                path TEXT NOT NULL,
                PRIMARY KEY (split, instance_id, body_part)
            );
             CREATE TABLE IF NOT EXISTS word_annotations (
                word_id INTEGER PRIMARY KEY AUTOINCREMENT,
                instance_id TEXT NOT NULL,
                word TEXT NOT NULL,
                sign_type TEXT NOT NULL,
                hand_type TEXT NOT NULL,
                start_ms INTEGER NOT NULL,
                end_ms INTEGER NOT NULL
            );
             CREATE TABLE IF NOT EXISTS subtitle_annotations (
                sub_id INTEGER PRIMARY KEY AUTOINCREMENT,
                instance_id TEXT NOT NULL,
                text TEXT NOT NULL,
                start_ms INTEGER NOT NULL,
                end_ms INTEGER NOT NULL
            );
             CREATE INDEX IF NOT EXISTS idx_word_annotations_instance
                 ON word_annotations(instance_id);
             CREATE INDEX IF NOT EXISTS idx_subtitle_annotations_instance
                 ON subtitle_annotations(instance_id);",
        )?;
        Ok(())
    }
}

/// Groups related inserts into one transaction using cached statements.
pub struct DatasetWriteBatch<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> DatasetWriteBatch<'conn> {
    /// Insert one continuous manifest row.
    pub fn insert_continuous_instance(
        &mut self,
        row: &ContinuousInstance,
    ) -> Result<(), StoreError> {
        self.tx
            .prepare_cached(
                "INSERT INTO continuous_instances (id, signer_id, session_id, task_id, n_frames, n_signs)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?
            .execute(params![
                row.id,
                row.signer_id,
                row.session_id,
                row.task_id,
                row.n_frames,
                row.n_signs
            ])?;
        Ok(())
    }

    /// Insert one isolated manifest row.
    pub fn insert_isolated_instance(&mut self, row: &IsolatedInstance) -> Result<(), StoreError> {
        self.tx
            .prepare_cached(
                "INSERT INTO isolated_instances (id, sign, signer, start_frame, end_frame)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?
            .execute(params![row.id, row.sign, row.signer, row.start, row.end])?;
        Ok(())
    }

    /// Link a video file to an instance. At most one per instance and split.
    pub fn insert_video(
        &mut self,
        split: Split,
        instance_id: &str,
        path: &Path,
    ) -> Result<(), StoreError> {
        let path_text = path.to_string_lossy();
        self.tx
            .prepare_cached("INSERT INTO videos (split, instance_id, path) VALUES (?1, ?2, ?3)")?
            .execute(params![split.as_str(), instance_id, path_text.as_ref()])?;
        Ok(())
    }

    /// Link one body part's pose file to an instance.
    pub fn insert_pose(
        &mut self,
        split: Split,
        instance_id: &str,
        body_part: BodyPart,
        path: &Path,
    ) -> Result<(), StoreError> {
        let path_text = path.to_string_lossy();
        self.tx
            .prepare_cached(
                "INSERT INTO poses (split, instance_id, body_part, path) VALUES (?1, ?2, ?3, ?4)",
            )?
            .execute(params![
                split.as_str(),
                instance_id,
                body_part.dir_name(),
                path_text.as_ref()
            ])?;
        Ok(())
    }

    /// Insert one word annotation for an instance.
    pub fn insert_word_annotation(
        &mut self,
        instance_id: &str,
        hand_type: HandType,
        sign_type: SignType,
        value: &TimedValue,
    ) -> Result<(), StoreError> {
        self.tx
            .prepare_cached(
                "INSERT INTO word_annotations (instance_id, word, sign_type, hand_type, start_ms, end_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?
            .execute(params![
                instance_id,
                value.value,
                sign_type.as_str(),
                hand_type.as_str(),
                value.start,
                value.end
            ])?;
        Ok(())
    }

    /// Insert one subtitle for an instance.
    pub fn insert_subtitle(
        &mut self,
        instance_id: &str,
        value: &TimedValue,
    ) -> Result<(), StoreError> {
        self.tx
            .prepare_cached(
                "INSERT INTO subtitle_annotations (instance_id, text, start_ms, end_ms)
                 VALUES (?1, ?2, ?3, ?4)",
            )?
            .execute(params![instance_id, value.value, value.start, value.end])?;
        Ok(())
    }

    /// Commit every insert in this batch atomically.
    pub fn commit(self) -> Result<(), StoreError> {
        self.tx.commit()?;
        Ok(())
    }
}

fn parse_hand_type(value: &str) -> Option<HandType> {
    match value {
        "left_hand" => Some(HandType::LeftHand),
        "right_hand" => Some(HandType::RightHand),
        "both_hands" => Some(HandType::BothHands),
        _ => None,
    }
}

fn parse_sign_type(value: &str) -> Option<SignType> {
    match value {
        "normal" => Some(SignType::Normal),
        "special" => Some(SignType::Special),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_instance(id: &str) -> ContinuousInstance {
        ContinuousInstance {
            id: id.to_string(),
            signer_id: 4,
            session_id: 1,
            task_id: 2,
            n_frames: 1200,
            n_signs: 37,
        }
    }

    #[test]
    fn batch_commit_persists_rows() {
        let db = DatasetDb::open_in_memory().unwrap();
        let mut batch = db.write_batch().unwrap();
        batch.insert_continuous_instance(&sample_instance("CLSFB01")).unwrap();
        batch
            .insert_video(Split::Continuous, "CLSFB01", Path::new("/data/videos/CLSFB01.mp4"))
            .unwrap();
        batch.commit().unwrap();

        let counts = db.counts().unwrap();
        assert_eq!(counts.continuous_instances, 1);
        assert_eq!(counts.videos, 1);
        assert_eq!(
            db.video_path(Split::Continuous, "CLSFB01").unwrap(),
            Some(PathBuf::from("/data/videos/CLSFB01.mp4"))
        );
    }

    #[test]
    fn dropped_batch_leaves_no_rows() {
        let db = DatasetDb::open_in_memory().unwrap();
        {
            let mut batch = db.write_batch().unwrap();
            batch.insert_continuous_instance(&sample_instance("CLSFB01")).unwrap();
            // Dropped without commit.
        }
        assert_eq!(db.counts().unwrap().continuous_instances, 0);
    }

    #[test]
    fn second_video_for_same_instance_is_rejected() {
        let db = DatasetDb::open_in_memory().unwrap();
        let mut batch = db.write_batch().unwrap();
        batch
            .insert_video(Split::Continuous, "CLSFB01", Path::new("a.mp4"))
            .unwrap();
        let err = batch.insert_video(Split::Continuous, "CLSFB01", Path::new("b.mp4"));
        assert!(err.is_err());
    }

    #[test]
    fn same_instance_id_may_carry_a_video_per_split() {
        let db = DatasetDb::open_in_memory().unwrap();
        let mut batch = db.write_batch().unwrap();
        batch
            .insert_video(Split::Continuous, "SHARED", Path::new("cont.mp4"))
            .unwrap();
        batch
            .insert_video(Split::Isolated, "SHARED", Path::new("isol.mp4"))
            .unwrap();
        batch.commit().unwrap();
        assert_eq!(db.counts().unwrap().videos, 2);
    }

    #[test]
    fn pose_paths_come_back_in_body_part_order() {
        let db = DatasetDb::open_in_memory().unwrap();
        let mut batch = db.write_batch().unwrap();
        for part in [BodyPart::RightHand, BodyPart::Face, BodyPart::Pose, BodyPart::LeftHand] {
            batch
                .insert_pose(
                    Split::Continuous,
                    "CLSFB01",
                    part,
                    Path::new(&format!("poses/{}/CLSFB01.npy", part.dir_name())),
                )
                .unwrap();
        }
        batch.commit().unwrap();

        let parts: Vec<BodyPart> = db
            .pose_paths(Split::Continuous, "CLSFB01")
            .unwrap()
            .into_iter()
            .map(|(part, _)| part)
            .collect();
        assert_eq!(
            parts,
            vec![BodyPart::Face, BodyPart::LeftHand, BodyPart::Pose, BodyPart::RightHand]
        );
    }

    #[test]
    fn word_annotations_roundtrip_with_their_types() {
        let db = DatasetDb::open_in_memory().unwrap();
        let mut batch = db.write_batch().unwrap();
        batch
            .insert_word_annotation(
                "CLSFB01",
                HandType::BothHands,
                SignType::Special,
                &TimedValue {
                    value: "MAISON".to_string(),
                    start: 120,
                    end: 480,
                },
            )
            .unwrap();
        batch.commit().unwrap();

        let rows = db.word_annotations("CLSFB01").unwrap();
        assert_eq!(rows.len(), 1);
        let (hand, sign, value) = &rows[0];
        assert_eq!(*hand, HandType::BothHands);
        assert_eq!(*sign, SignType::Special);
        assert_eq!(value.value, "MAISON");
    }
}
