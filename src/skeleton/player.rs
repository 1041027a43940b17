//! Playback state machine producing drawable per-frame scenes.
//!
//! One `SkeletonPlayer` owns all playback state for a viewing session: the
//! current frame, the play/pause flag, and the tick interval. An external
//! clock drives `tick`; scrub controls call `seek`. Ticks never overlap and
//! the two entry points never run concurrently.
//!
//! Frame indexing differs by driver on purpose: the clock wraps past the end
//! (looping playback), while a direct seek is strictly bounds-checked so the
//! displayed index can never silently diverge from the scrub control.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use super::frames::PoseFrameSet;
use super::{HAND_ORIGIN, LEFT_WRIST, RIGHT_WRIST, Stream};
use crate::config::PlaybackSettings;

/// A 2D-projected keypoint tagged with its stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenePoint {
    pub stream: Stream,
    /// Keypoint index within the stream.
    pub index: usize,
    pub x: f32,
    pub y: f32,
}

/// Endpoint of a scene edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PointRef {
    pub stream: Stream,
    pub index: usize,
}

/// An edge between two keypoints.
///
/// Skeletal edges connect two keypoints of the same stream; relay edges are
/// the only ones whose endpoints name two different streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SceneEdge {
    pub a: PointRef,
    pub b: PointRef,
}

/// Drawable snapshot of one frame.
///
/// Coordinates come straight from the source arrays with the depth
/// coordinate dropped; inverting the vertical axis for screen space is the
/// drawing layer's concern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub frame: usize,
    pub points: Vec<ScenePoint>,
    pub edges: Vec<SceneEdge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayState {
    Playing,
    Paused,
}

/// Errors raised by direct user input.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Frame {requested} is out of range (playable frames: {playable})")]
    FrameOutOfRange { requested: usize, playable: usize },
}

/// Playback over one loaded frame set.
pub struct SkeletonPlayer {
    frames: PoseFrameSet,
    state: PlayState,
    current: usize,
    interval: Duration,
    bounds: PlaybackSettings,
}

impl SkeletonPlayer {
    /// Start a session over loaded streams. Playback begins at frame zero.
    pub fn new(frames: PoseFrameSet, playback: &PlaybackSettings) -> Self {
        Self {
            frames,
            state: PlayState::Playing,
            current: 0,
            interval: Duration::from_millis(playback.clamp_interval(playback.interval_ms)),
            bounds: *playback,
        }
    }

    /// Number of frames playable across all streams.
    pub fn playable_frames(&self) -> usize {
        self.frames.playable_frames()
    }

    /// Frame the next tick will render.
    pub fn current_frame(&self) -> usize {
        self.current
    }

    pub fn is_paused(&self) -> bool {
        self.state == PlayState::Paused
    }

    /// Tick period the external clock should schedule with.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Reconfigure the auto-advance period, clamped to the configured range.
    ///
    /// The clock reads the interval when scheduling its next tick, so the
    /// change takes effect then, not immediately.
    pub fn set_playback_interval(&mut self, ms: u64) {
        self.interval = Duration::from_millis(self.bounds.clamp_interval(ms));
    }

    /// Stop auto-advancing. A no-op when already paused.
    pub fn pause(&mut self) {
        self.state = PlayState::Paused;
    }

    /// Resume auto-advancing. A no-op when already playing.
    pub fn resume(&mut self) {
        self.state = PlayState::Playing;
    }

    /// One clock tick: render the current frame, then advance while playing.
    ///
    /// Advancing wraps past the end of the playable range.
    pub fn tick(&mut self) -> Scene {
        let scene = self.render(self.current);
        if self.state == PlayState::Playing {
            self.current = (self.current + 1) % self.playable_frames();
        }
        scene
    }

    /// Render a clock-driven frame request; out-of-range indices wrap.
    pub fn render_looped(&mut self, frame: usize) -> Scene {
        let frame = frame % self.playable_frames();
        self.current = frame;
        self.render(frame)
    }

    /// Scrub to a frame. Strict bounds, and the play/pause state survives.
    pub fn seek(&mut self, frame: usize) -> Result<Scene, PlayerError> {
        let scene = self.render_frame(frame)?;
        self.current = frame;
        Ok(scene)
    }

    /// Render one frame without touching playback state. Strict bounds.
    pub fn render_frame(&self, frame: usize) -> Result<Scene, PlayerError> {
        if frame >= self.playable_frames() {
            return Err(PlayerError::FrameOutOfRange {
                requested: frame,
                playable: self.playable_frames(),
            });
        }
        Ok(self.render(frame))
    }

    fn render(&self, frame: usize) -> Scene {
        let mut points = Vec::new();
        let mut edges = Vec::new();
        for stream in Stream::ALL {
            let keypoints = self.frames.frame(stream, frame);
            for (index, keypoint) in keypoints.outer_iter().enumerate() {
                points.push(ScenePoint {
                    stream,
                    index,
                    x: keypoint[0],
                    y: keypoint[1],
                });
            }
            let count = keypoints.nrows();
            for &(a, b) in stream.edges() {
                if a < count && b < count {
                    edges.push(SceneEdge {
                        a: PointRef { stream, index: a },
                        b: PointRef { stream, index: b },
                    });
                }
            }
        }

        let pose_count = self.frames.frame(Stream::Pose, frame).nrows();
        let relays = [
            (LEFT_WRIST, Stream::LeftHand),
            (RIGHT_WRIST, Stream::RightHand),
        ];
        for (wrist, hand) in relays {
            let hand_count = self.frames.frame(hand, frame).nrows();
            if pose_count > wrist && hand_count > HAND_ORIGIN {
                edges.push(SceneEdge {
                    a: PointRef {
                        stream: Stream::Pose,
                        index: wrist,
                    },
                    b: PointRef {
                        stream: hand,
                        index: HAND_ORIGIN,
                    },
                });
            }
        }

        Scene {
            frame,
            points,
            edges,
        }
    }
}
