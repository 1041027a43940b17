//! End-to-end ingest over a synthetic dataset tree, through to playback.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::tempdir;

use signpal::artifacts::coverage;
use signpal::artifacts::linker;
use signpal::artifacts::{ArtifactKind, BodyPart, Split};
use signpal::config::PlaybackSettings;
use signpal::skeleton::frames::{PoseFrameSet, StreamPaths};
use signpal::skeleton::player::SkeletonPlayer;
use signpal::store::DatasetDb;

/// Encode a minimal little-endian f4 `.npy` array.
fn npy_bytes(shape: &[usize; 3], values: &[f32]) -> Vec<u8> {
    let mut header = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}, {}), }}",
        shape[0], shape[1], shape[2]
    );
    while (10 + header.len() + 1) % 64 != 0 {
        header.push(' ');
    }
    header.push('\n');

    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"\x93NUMPY");
    bytes.push(1);
    bytes.push(0);
    bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn write_stream(path: &Path, frames: usize, keypoints: usize) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let values: Vec<f32> = (0..frames * keypoints * 3)
        .map(|idx| idx as f32 * 0.25)
        .collect();
    fs::write(path, npy_bytes(&[frames, keypoints, 3], &values)).unwrap();
}

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"").unwrap();
}

/// Build a small continuous split with one fully-covered instance, one with
/// partial coverage, and stray artifacts that match no manifest row.
fn build_continuous_root(base: &Path) -> PathBuf {
    let root = base.join("cont");
    fs::create_dir_all(&root).unwrap();
    fs::write(
        root.join("instances.csv"),
        "id\tsigner_id\tsession_id\ttask_id\tn_frames\tn_signs\n\
         CLSFB01\t4\t1\t2\t3\t2\n\
         CLSFB02\t5\t1\t2\t3\t1\n",
    )
    .unwrap();

    touch(&root.join("videos/CLSFB01.mp4"));
    touch(&root.join("videos/CLSFB02.mp4"));
    touch(&root.join("videos/CLSFB99.mp4"));

    write_stream(&root.join("poses/pose/CLSFB01.npy"), 3, 33);
    write_stream(&root.join("poses/left_hand/CLSFB01.npy"), 3, 21);
    write_stream(&root.join("poses/right_hand/CLSFB01.npy"), 4, 21);
    write_stream(&root.join("poses/face/CLSFB01.npy"), 3, 478);
    // CLSFB02 only has a body stream; the viewer cannot open it, but the
    // linker still records what exists.
    write_stream(&root.join("poses/pose/CLSFB02.npy"), 3, 33);

    fs::create_dir_all(root.join("annotations")).unwrap();
    fs::write(
        root.join("annotations/signs_right_hand.json"),
        r#"{"CLSFB01": [{"value": "MAISON", "start": 0, "end": 400}]}"#,
    )
    .unwrap();
    fs::write(
        root.join("annotations/subtitles.json"),
        r#"{"CLSFB01": [{"value": "la maison est grande", "start": 0, "end": 1200}],
            "CLSFB99": [{"value": "orpheline", "start": 0, "end": 100}]}"#,
    )
    .unwrap();
    root
}

#[test]
fn continuous_split_links_and_plays_back() {
    let dir = tempdir().unwrap();
    let root = build_continuous_root(dir.path());
    let db = DatasetDb::open(dir.path().join("signpal.db")).unwrap();

    let report = linker::ingest_continuous(&db, &root).unwrap();
    assert!(report.is_clean(), "failures: {:?}", report.failures);
    assert_eq!(report.instances, 2);
    assert_eq!(report.videos, 2);
    assert_eq!(report.word_annotations, 1);
    assert_eq!(report.subtitles, 1);
    assert_eq!(report.poses, 5);

    // Stray artifacts were skipped, never inserted.
    let skipped: Vec<(&str, ArtifactKind)> = report
        .skipped
        .iter()
        .map(|key| (key.instance_id.as_str(), key.kind))
        .collect();
    assert!(skipped.contains(&("CLSFB99", ArtifactKind::Video)));
    assert!(skipped.contains(&("CLSFB99", ArtifactKind::Subtitle)));
    assert!(db.video_path(Split::Continuous, "CLSFB99").unwrap().is_none());

    // Pose grouping follows lexical body-part order.
    let pose_paths = db.pose_paths(Split::Continuous, "CLSFB01").unwrap();
    let parts: Vec<BodyPart> = pose_paths.iter().map(|(part, _)| *part).collect();
    assert_eq!(
        parts,
        vec![BodyPart::Face, BodyPart::LeftHand, BodyPart::Pose, BodyPart::RightHand]
    );

    // Open a viewing session straight from the linked paths.
    let by_part = |wanted: BodyPart| {
        pose_paths
            .iter()
            .find(|(part, _)| *part == wanted)
            .map(|(_, path)| path.clone())
            .unwrap()
    };
    let frames = PoseFrameSet::load(&StreamPaths {
        pose: by_part(BodyPart::Pose),
        left_hand: by_part(BodyPart::LeftHand),
        right_hand: by_part(BodyPart::RightHand),
        face: by_part(BodyPart::Face),
    })
    .unwrap();
    // The right hand has one extra frame; playback stops at the shortest.
    assert_eq!(frames.playable_frames(), 3);

    let mut player = SkeletonPlayer::new(frames, &PlaybackSettings::default());
    let scene = player.tick();
    assert_eq!(scene.frame, 0);
    assert_eq!(scene.points.len(), 33 + 21 + 21 + 478);
    let relay_count = scene
        .edges
        .iter()
        .filter(|edge| edge.a.stream != edge.b.stream)
        .count();
    assert_eq!(relay_count, 2);
    assert!(player.seek(3).is_err());
    assert_eq!(player.render_looped(4).frame, 1);

    // A partially-covered instance cannot open a session.
    let partial = db.pose_paths(Split::Continuous, "CLSFB02").unwrap();
    assert_eq!(partial.len(), 1);
    assert_eq!(partial[0].0, BodyPart::Pose);
}

#[test]
fn both_splits_share_one_database() {
    let dir = tempdir().unwrap();
    let cont_root = build_continuous_root(dir.path());

    let isol_root = dir.path().join("isol");
    fs::create_dir_all(&isol_root).unwrap();
    fs::write(
        isol_root.join("instances.csv"),
        "id,sign,signer,start,end\nCLSFB01,MAISON,S004,0,90\n",
    )
    .unwrap();
    touch(&isol_root.join("videos/CLSFB01.mp4"));
    write_stream(&isol_root.join("poses/pose/CLSFB01.npy"), 2, 33);

    let db = DatasetDb::open(dir.path().join("signpal.db")).unwrap();
    let cont = linker::ingest_continuous(&db, &cont_root).unwrap();
    let isol = linker::ingest_isolated(&db, &isol_root).unwrap();
    assert!(cont.is_clean() && isol.is_clean());

    // The same instance id may exist in both splits without colliding.
    let counts = db.counts().unwrap();
    assert_eq!(counts.continuous_instances, 2);
    assert_eq!(counts.isolated_instances, 1);
    assert_eq!(counts.videos, 3);
    assert_ne!(
        db.video_path(Split::Continuous, "CLSFB01").unwrap(),
        db.video_path(Split::Isolated, "CLSFB01").unwrap()
    );
}

#[test]
fn coverage_scan_flags_videos_without_poses() {
    let dir = tempdir().unwrap();
    let root = build_continuous_root(dir.path());

    // Mirror the artifact layout into per-part video folders the way the
    // extraction pipeline stages them for comparison.
    let staged = dir.path().join("staged_videos");
    touch(&staged.join("pose/CLSFB01.mp4"));
    touch(&staged.join("pose/CLSFB02.mp4"));
    touch(&staged.join("pose/CLSFB03.mp4"));

    let parts: Vec<&str> = BodyPart::ALL.iter().map(|part| part.dir_name()).collect();
    let rows = coverage::reconcile(&root.join("poses"), &staged, &parts).unwrap();

    let find = |part: &str, id: &str| {
        rows.iter()
            .find(|row| row.subfolder == part && row.instance_id == id)
    };
    // Pose and video both present.
    let both = find("pose", "CLSFB01").unwrap();
    assert!(both.in_first && both.in_second);
    // Video staged with no matching pose file.
    let missing_pose = find("pose", "CLSFB03").unwrap();
    assert!(!missing_pose.in_first && missing_pose.in_second);
    // Pose parts that exist only on the pose side still show up.
    let face_only = find("face", "CLSFB01").unwrap();
    assert!(face_only.in_first && !face_only.in_second);

    // Each (part, id) pair appears exactly once.
    let mut keys: Vec<(String, String)> = rows
        .iter()
        .map(|row| (row.subfolder.clone(), row.instance_id.clone()))
        .collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), rows.len());
}

#[test]
fn session_load_fails_without_all_four_streams() {
    let dir = tempdir().unwrap();
    write_stream(&dir.path().join("pose.npy"), 2, 33);
    write_stream(&dir.path().join("left.npy"), 2, 21);
    write_stream(&dir.path().join("face.npy"), 2, 478);

    let err = PoseFrameSet::load(&StreamPaths {
        pose: dir.path().join("pose.npy"),
        left_hand: dir.path().join("left.npy"),
        right_hand: dir.path().join("missing.npy"),
        face: dir.path().join("face.npy"),
    })
    .unwrap_err();
    assert!(err.to_string().contains("right_hand"));
}
