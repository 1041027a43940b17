//! Aligned keypoint streams for one viewing session.

use std::path::PathBuf;

use ndarray::{Array3, ArrayView2, Axis};
use thiserror::Error;

use super::Stream;
use super::npy::{self, NpyError};

/// File paths for the four streams of one instance.
#[derive(Debug, Clone)]
pub struct StreamPaths {
    pub pose: PathBuf,
    pub left_hand: PathBuf,
    pub right_hand: PathBuf,
    pub face: PathBuf,
}

/// Errors fatal to entering a viewing session.
#[derive(Debug, Error)]
pub enum FrameSetError {
    /// One stream failed to load; there is no partial-skeleton mode.
    #[error("Failed to load {stream} stream: {source}")]
    Load { stream: Stream, source: NpyError },
    /// A stream decoded fine but carries no frames to play.
    #[error("The {stream} stream has no frames")]
    EmptyStream { stream: Stream },
}

/// Four frame-aligned keypoint streams loaded for one instance.
///
/// Immutable once constructed; the playable range is the shortest stream's
/// frame count. Streams are aligned by frame index, not timestamps.
#[derive(Debug, Clone)]
pub struct PoseFrameSet {
    pose: Array3<f32>,
    left_hand: Array3<f32>,
    right_hand: Array3<f32>,
    face: Array3<f32>,
    playable: usize,
}

impl PoseFrameSet {
    /// Build a frame set from decoded arrays.
    ///
    /// Every stream must carry at least one frame; a zero-frame stream would
    /// leave nothing playable and is treated like a failed load.
    pub fn new(
        pose: Array3<f32>,
        left_hand: Array3<f32>,
        right_hand: Array3<f32>,
        face: Array3<f32>,
    ) -> Result<Self, FrameSetError> {
        let lengths = [
            (Stream::Pose, pose.len_of(Axis(0))),
            (Stream::LeftHand, left_hand.len_of(Axis(0))),
            (Stream::RightHand, right_hand.len_of(Axis(0))),
            (Stream::Face, face.len_of(Axis(0))),
        ];
        for (stream, frames) in lengths {
            if frames == 0 {
                return Err(FrameSetError::EmptyStream { stream });
            }
        }
        let playable = lengths
            .iter()
            .map(|(_, frames)| *frames)
            .min()
            .unwrap_or(0);
        Ok(Self {
            pose,
            left_hand,
            right_hand,
            face,
            playable,
        })
    }

    /// Load all four streams from disk. Any failure is fatal.
    pub fn load(paths: &StreamPaths) -> Result<Self, FrameSetError> {
        let load = |stream: Stream, path: &PathBuf| {
            npy::load_array(path).map_err(|source| FrameSetError::Load { stream, source })
        };
        Self::new(
            load(Stream::Pose, &paths.pose)?,
            load(Stream::LeftHand, &paths.left_hand)?,
            load(Stream::RightHand, &paths.right_hand)?,
            load(Stream::Face, &paths.face)?,
        )
    }

    /// Number of frames playable across all streams.
    pub fn playable_frames(&self) -> usize {
        self.playable
    }

    /// Borrow the full array backing one stream.
    pub fn stream(&self, stream: Stream) -> &Array3<f32> {
        match stream {
            Stream::Pose => &self.pose,
            Stream::LeftHand => &self.left_hand,
            Stream::RightHand => &self.right_hand,
            Stream::Face => &self.face,
        }
    }

    /// Keypoints of one stream at a frame index within the playable range.
    pub(crate) fn frame(&self, stream: Stream, frame: usize) -> ArrayView2<'_, f32> {
        self.stream(stream).index_axis(Axis(0), frame)
    }
}
