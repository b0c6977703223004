pub mod error;
pub mod sort;

pub use error::Error;
pub use sort::{
    BBox, Detection, FrameReport, Ltrb, MotionState, Track, TrackState, Tracker, Xyah, WINDOW_LEN,
};

use log::warn;
use ndarray::prelude::*;

/// Downstream temporal action classifier.
///
/// Receives a full `WINDOW_LEN x K x 3` pose window (oldest frame first) and
/// the source frame `(height, width)`, and returns a score distribution over
/// its label set. The tracker treats both the call and the labels as opaque.
pub trait ActionClassifier {
    fn predict(
        &mut self,
        window: ArrayView3<'_, f32>,
        frame_size: (u32, u32),
    ) -> Result<Array1<f32>, Error>;
}

/// Label state for one confirmed track on one frame.
#[derive(Debug, Clone)]
pub enum ActionLabel {
    /// The pose window is not full yet, or the classifier call failed.
    Pending,
    /// Score distribution returned by the classifier.
    Scores(Array1<f32>),
}

/// Per-frame output for one confirmed track, for rendering and downstream
/// consumers.
#[derive(Debug, Clone)]
pub struct TrackOutput {
    pub track_id: u64,
    pub bbox: BBox<Ltrb>,
    pub state: TrackState,
    pub action: ActionLabel,
}

/// Tracker configuration. The association gate has no universal default and
/// must be chosen for the deployment; `max_age` and `n_init` default to the
/// values the surrounding pipeline was tuned with.
pub struct PoseSortConfig {
    /// Association gate: candidate pairs with `1 - iou` above this value
    /// never match. 0.7 is a common starting point.
    pub max_iou_distance: f32,
    /// Misses a confirmed track survives before deletion.
    pub max_age: u32,
    /// Consecutive matches required to confirm a tentative track.
    pub n_init: u32,
}

impl PoseSortConfig {
    pub fn new(max_iou_distance: f32) -> Self {
        Self {
            max_iou_distance,
            max_age: 30,
            n_init: 3,
        }
    }
}

/// Frame-level pipeline: tracking plus action classification of every
/// confirmed track whose pose window is full.
pub struct PoseSort<C: ActionClassifier> {
    tracker: Tracker,
    classifier: C,
}

impl<C: ActionClassifier> PoseSort<C> {
    pub fn new(config: PoseSortConfig, classifier: C) -> Self {
        Self {
            tracker: Tracker::new(config.max_iou_distance, config.max_age, config.n_init),
            classifier,
        }
    }

    #[inline]
    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// One full frame cycle: predict, associate and update, then classify.
    ///
    /// A failed classifier call degrades that track's label to
    /// [`ActionLabel::Pending`]; it never affects lifecycle bookkeeping.
    pub fn process(
        &mut self,
        detections: &[Detection],
        frame_size: (u32, u32),
    ) -> (FrameReport, Vec<TrackOutput>) {
        self.tracker.predict();
        let report = self.tracker.update(detections);

        let mut outputs = Vec::new();
        for track in self.tracker.active_tracks() {
            if !track.is_confirmed() {
                continue;
            }

            let action = match track.pose_window() {
                Some(window) => match self.classifier.predict(window.view(), frame_size) {
                    Ok(scores) => ActionLabel::Scores(scores),
                    Err(err) => {
                        warn!("classifier failed for track {}: {}", track.track_id(), err);
                        ActionLabel::Pending
                    }
                },
                None => ActionLabel::Pending,
            };

            outputs.push(TrackOutput {
                track_id: track.track_id(),
                bbox: track.to_ltrb(),
                state: track.state(),
                action,
            });
        }

        (report, outputs)
    }
}
