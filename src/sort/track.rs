use std::collections::VecDeque;

use ndarray::prelude::*;

use crate::sort::kalman_filter::{KalmanFilter, MotionState};
use crate::sort::{BBox, Detection, Ltrb, Xyah};

/// Number of per-frame keypoint observations a track accumulates before its
/// window can feed the temporal action classifier.
pub const WINDOW_LEN: usize = 30;

/// Lifecycle of a single target. New tracks are `Tentative` until enough
/// consecutive matches accumulate, then `Confirmed`. Dead tracks are marked
/// `Deleted` for removal from the active set. Transitions are one-directional.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrackState {
    Tentative,
    Confirmed,
    Deleted,
}

/// A single target: identity, motion estimate, lifecycle counters and the
/// rolling window of the most recent pose observations.
///
/// `hits` counts measurement updates, `age` frames since creation and
/// `time_since_update` frames since the last match (reset to 0 on match).
/// The window holds at most [`WINDOW_LEN`] keypoint matrices, oldest evicted.
#[derive(Clone)]
pub struct Track {
    track_id: u64,
    motion: MotionState,
    hits: u32,
    age: u32,
    time_since_update: u32,
    state: TrackState,
    n_init: u32,
    max_age: u32,
    window: VecDeque<Array2<f32>>,
}

impl Track {
    pub fn new(
        motion: MotionState,
        track_id: u64,
        n_init: u32,
        max_age: u32,
        keypoints: Option<Array2<f32>>,
    ) -> Self {
        let mut window = VecDeque::with_capacity(WINDOW_LEN);
        if let Some(kpts) = keypoints {
            window.push_back(kpts);
        }

        // the spawning detection counts as the first hit
        let state = if n_init <= 1 {
            TrackState::Confirmed
        } else {
            TrackState::Tentative
        };

        Self {
            track_id,
            motion,
            hits: 1,
            age: 1,
            time_since_update: 0,
            state,
            n_init,
            max_age,
            window,
        }
    }

    #[inline]
    pub fn track_id(&self) -> u64 {
        self.track_id
    }

    #[inline]
    pub fn hits(&self) -> u32 {
        self.hits
    }

    #[inline]
    pub fn age(&self) -> u32 {
        self.age
    }

    #[inline]
    pub fn time_since_update(&self) -> u32 {
        self.time_since_update
    }

    #[inline]
    pub fn motion(&self) -> &MotionState {
        &self.motion
    }

    /// Current estimate as a state-space box.
    #[inline]
    pub fn bbox(&self) -> BBox<Xyah> {
        self.motion.bbox()
    }

    /// Current estimate in corner format, for association and rendering.
    #[inline]
    pub fn to_ltrb(&self) -> BBox<Ltrb> {
        self.motion.bbox().as_ltrb()
    }

    /// Estimated box center, e.g. for label placement.
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        let mean = self.motion.mean();
        (mean[0], mean[1])
    }

    /// Advance the motion estimate one frame.
    pub fn predict(&mut self, kf: &KalmanFilter) {
        kf.predict(&mut self.motion);
        self.age += 1;
        self.time_since_update += 1;
    }

    /// Fuse a matched detection: correct the motion estimate, extend the
    /// pose window and confirm the track once `n_init` hits accumulate.
    pub fn update(&mut self, kf: &KalmanFilter, detection: &Detection) {
        kf.correct(&mut self.motion, &detection.bbox().as_xyah());

        if let Some(kpts) = detection.keypoints() {
            if self.window.len() == WINDOW_LEN {
                self.window.pop_front();
            }
            self.window.push_back(kpts.to_owned());
        }

        self.hits += 1;
        self.time_since_update = 0;

        if self.state == TrackState::Tentative && self.hits >= self.n_init {
            self.state = TrackState::Confirmed;
        }
    }

    /// No detection matched this track in the current frame. A tentative
    /// track dies immediately; a confirmed one once `time_since_update`
    /// exceeds `max_age`.
    pub fn mark_missed(&mut self) {
        if self.state == TrackState::Tentative {
            self.state = TrackState::Deleted;
        } else if self.time_since_update > self.max_age {
            self.state = TrackState::Deleted;
        }
    }

    #[inline]
    pub fn state(&self) -> TrackState {
        self.state
    }

    #[inline]
    pub fn is_tentative(&self) -> bool {
        self.state == TrackState::Tentative
    }

    #[inline]
    pub fn is_confirmed(&self) -> bool {
        self.state == TrackState::Confirmed
    }

    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.state == TrackState::Deleted
    }

    /// Number of keypoint observations currently buffered.
    #[inline]
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    #[inline]
    pub fn is_window_full(&self) -> bool {
        self.window.len() == WINDOW_LEN
    }

    /// Most recent keypoint observation, e.g. for skeleton drawing.
    #[inline]
    pub fn last_keypoints(&self) -> Option<ArrayView2<'_, f32>> {
        self.window.back().map(|k| k.view())
    }

    /// Ordered snapshot of the full window, oldest first, as a
    /// `WINDOW_LEN x K x 3` array. `None` until the window is full.
    pub fn pose_window(&self) -> Option<Array3<f32>> {
        if self.window.len() < WINDOW_LEN {
            return None;
        }

        let views: Vec<_> = self
            .window
            .iter()
            .map(|k| k.view().insert_axis(Axis(0)))
            .collect();

        ndarray::stack(Axis(0), &views).ok()
    }
}
