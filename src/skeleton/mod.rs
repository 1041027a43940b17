//! Frame-synchronized skeletal playback over per-body-part keypoint streams.
//!
//! A viewing session loads four independently-extracted keypoint time series
//! and plays them back as one animation. Streams are frame-rate-aligned by
//! construction (same video, same extraction pass); alignment is by frame
//! index, not timestamps.

pub mod frames;
pub mod npy;
pub mod player;

use std::fmt;

use serde::{Deserialize, Serialize};

/// The four keypoint streams of one viewing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stream {
    Pose,
    LeftHand,
    RightHand,
    Face,
}

impl Stream {
    /// All streams in render order.
    pub const ALL: [Stream; 4] = [Stream::Pose, Stream::LeftHand, Stream::RightHand, Stream::Face];

    /// Keypoints per frame produced by the extraction pass for this stream.
    pub fn expected_keypoints(self) -> usize {
        match self {
            Stream::Pose => 33,
            Stream::LeftHand | Stream::RightHand => 21,
            Stream::Face => 478,
        }
    }

    /// Fixed skeletal edges for this stream's anatomical topology.
    ///
    /// The face is rendered as a scatter only and has no edges.
    pub fn edges(self) -> &'static [(usize, usize)] {
        match self {
            Stream::Pose => &POSE_EDGES,
            Stream::LeftHand | Stream::RightHand => &HAND_EDGES,
            Stream::Face => &[],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stream::Pose => "pose",
            Stream::LeftHand => "left_hand",
            Stream::RightHand => "right_hand",
            Stream::Face => "face",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shoulder, arm, and hip segments of the 33-point body topology.
pub const POSE_EDGES: [(usize, usize); 8] = [
    (11, 12),
    (11, 13),
    (13, 15),
    (12, 14),
    (14, 16),
    (11, 23),
    (12, 24),
    (23, 24),
];

/// The 21-point hand topology: four segments per finger, fanned from the
/// wrist.
pub const HAND_EDGES: [(usize, usize); 20] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (0, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (0, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
];

/// Body keypoint index of the left wrist, where the left hand attaches.
pub const LEFT_WRIST: usize = 15;
/// Body keypoint index of the right wrist, where the right hand attaches.
pub const RIGHT_WRIST: usize = 16;
/// Hand keypoint index bridged to the wrist by a relay edge.
pub const HAND_ORIGIN: usize = 0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topology_sizes_match_the_capture_model() {
        assert_eq!(Stream::Pose.edges().len(), 8);
        assert_eq!(Stream::LeftHand.edges().len(), 20);
        assert_eq!(Stream::RightHand.edges().len(), 20);
        assert!(Stream::Face.edges().is_empty());
    }

    #[test]
    fn edges_stay_within_expected_keypoint_counts() {
        for stream in Stream::ALL {
            let count = stream.expected_keypoints();
            for &(a, b) in stream.edges() {
                assert!(a < count && b < count, "{stream} edge ({a}, {b}) out of range");
            }
        }
        assert!(LEFT_WRIST < Stream::Pose.expected_keypoints());
        assert!(RIGHT_WRIST < Stream::Pose.expected_keypoints());
        assert!(HAND_ORIGIN < Stream::LeftHand.expected_keypoints());
    }
}
