use log::debug;

use crate::sort::iou_matching;
use crate::sort::linear_assignment::{self, gate_cost_matrix, matching_cascade};
use crate::sort::{Detection, KalmanFilter, Track};

/// What happened to the track set during one `update` call.
///
/// `matched` pairs a surviving track id with the index of the detection that
/// updated it; `created`, `confirmed` and `removed` list the ids whose
/// lifecycle changed this frame.
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    pub matched: Vec<(u64, usize)>,
    pub created: Vec<u64>,
    pub confirmed: Vec<u64>,
    pub removed: Vec<u64>,
}

/// The multi-target tracker: owns every non-deleted track and the identity
/// counter, and drives the per-frame predict / associate / update /
/// lifecycle cycle.
///
/// Call [`predict`](Tracker::predict) once per frame, then
/// [`update`](Tracker::update) with that frame's detections. Track ids are
/// strictly increasing and never reused for the lifetime of the tracker.
#[derive(Clone)]
pub struct Tracker {
    max_iou_distance: f32,
    max_age: u32,
    n_init: u32,
    kf: KalmanFilter,
    tracks: Vec<Track>,
    next_id: u64,
}

impl Tracker {
    /// `max_iou_distance` gates the association: candidate pairs with
    /// `1 - iou` above it never match. `max_age` is the number of misses a
    /// confirmed track survives, `n_init` the hits required to confirm.
    pub fn new(max_iou_distance: f32, max_age: u32, n_init: u32) -> Self {
        Self {
            max_iou_distance,
            max_age,
            n_init,
            kf: KalmanFilter::default(),
            tracks: Vec::new(),
            next_id: 1,
        }
    }

    #[inline]
    pub fn tracks(&self) -> &[Track] {
        self.tracks.as_slice()
    }

    /// All live tracks in ascending id order. The iterator borrows the
    /// current collection state; it does not survive the next `update`.
    #[inline]
    pub fn active_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    /// Propagate every track one time step forward. Must run once per
    /// frame, before `update`.
    pub fn predict(&mut self) {
        for track in &mut self.tracks {
            track.predict(&self.kf);
        }
    }

    /// Run association and track management for one frame's detections.
    ///
    /// Matched tracks are corrected and their pose windows extended,
    /// unmatched tracks are marked missed, unmatched detections spawn
    /// tentative tracks, and tracks that died this frame are dropped from
    /// the collection for good.
    pub fn update(&mut self, detections: &[Detection]) -> FrameReport {
        let (matches, unmatched_tracks, unmatched_detections) = self.associate(detections);

        let mut report = FrameReport::default();

        for (track_idx, detection_idx) in matches {
            let track = &mut self.tracks[track_idx];
            let was_tentative = track.is_tentative();

            track.update(&self.kf, &detections[detection_idx]);
            report.matched.push((track.track_id(), detection_idx));

            if was_tentative && track.is_confirmed() {
                debug!("track {} confirmed", track.track_id());
                report.confirmed.push(track.track_id());
            }
        }

        for track_idx in unmatched_tracks {
            self.tracks[track_idx].mark_missed();
        }

        for detection_idx in unmatched_detections {
            let id = self.initiate_track(&detections[detection_idx]);
            debug!("track {} created", id);
            report.created.push(id);
        }

        for track in &self.tracks {
            if track.is_deleted() {
                debug!("track {} removed", track.track_id());
                report.removed.push(track.track_id());
            }
        }
        self.tracks.retain(|t| !t.is_deleted());

        report
    }

    /// IoU cost over predicted boxes, Mahalanobis-gated, resolved by the
    /// recency cascade so recently seen tracks win contested detections.
    fn associate(&self, detections: &[Detection]) -> linear_assignment::Matches {
        let gated_iou = |tracks: &[Track],
                         dets: &[Detection],
                         track_indices: &[usize],
                         detection_indices: &[usize]| {
            let mut cost_matrix =
                iou_matching::iou_cost(tracks, dets, track_indices, detection_indices);

            gate_cost_matrix(
                &self.kf,
                cost_matrix.view_mut(),
                tracks,
                dets,
                track_indices,
                detection_indices,
                None,
                None,
            );

            cost_matrix
        };

        matching_cascade(
            &gated_iou,
            self.max_iou_distance,
            self.max_age,
            &self.tracks,
            detections,
            None,
            None,
        )
    }

    fn initiate_track(&mut self, detection: &Detection) -> u64 {
        let motion = self.kf.initiate(&detection.bbox().as_xyah());
        let id = self.next_id;
        self.next_id += 1;

        self.tracks.push(Track::new(
            motion,
            id,
            self.n_init,
            self.max_age,
            detection.keypoints().map(|k| k.to_owned()),
        ));

        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::{BBox, WINDOW_LEN};
    use ndarray::prelude::*;

    fn detection_at(left: f32, top: f32) -> Detection {
        Detection::new(
            BBox::ltrb(left, top, left + 20.0, top + 40.0),
            0.9,
            Some(Array2::from_elem((4, 3), left)),
        )
        .unwrap()
    }

    fn step(tracker: &mut Tracker, detections: &[Detection]) -> FrameReport {
        tracker.predict();
        tracker.update(detections)
    }

    #[test]
    fn stationary_detection_confirms_after_n_init_frames() {
        let mut tracker = Tracker::new(0.7, 30, 3);

        let r1 = step(&mut tracker, &[detection_at(50.0, 50.0)]);
        assert_eq!(r1.created, vec![1]);
        assert!(tracker.tracks()[0].is_tentative());
        assert_eq!(tracker.tracks()[0].hits(), 1);

        let r2 = step(&mut tracker, &[detection_at(50.0, 50.0)]);
        assert_eq!(r2.matched, vec![(1, 0)]);
        assert!(r2.confirmed.is_empty());
        assert!(tracker.tracks()[0].is_tentative());

        let r3 = step(&mut tracker, &[detection_at(50.0, 50.0)]);
        assert_eq!(r3.confirmed, vec![1]);
        assert!(tracker.tracks()[0].is_confirmed());
        assert_eq!(tracker.tracks()[0].track_id(), 1);
    }

    #[test]
    fn missed_tentative_track_dies_at_once() {
        let mut tracker = Tracker::new(0.7, 30, 3);

        step(&mut tracker, &[detection_at(50.0, 50.0)]);
        let r = step(&mut tracker, &[]);

        assert_eq!(r.removed, vec![1]);
        assert!(tracker.tracks().is_empty());
    }

    #[test]
    fn confirmed_track_outlives_short_occlusion() {
        let mut tracker = Tracker::new(0.7, 30, 3);

        for _ in 0..10 {
            step(&mut tracker, &[detection_at(50.0, 50.0)]);
        }
        let window_before = tracker.tracks()[0].window_len();

        for _ in 0..5 {
            let r = step(&mut tracker, &[]);
            assert!(r.removed.is_empty());
        }

        let track = &tracker.tracks()[0];
        assert!(track.is_confirmed());
        assert_eq!(track.time_since_update(), 5);
        assert_eq!(track.window_len(), window_before);
    }

    #[test]
    fn confirmed_track_removed_when_max_age_exceeded() {
        let mut tracker = Tracker::new(0.7, 3, 1);

        step(&mut tracker, &[detection_at(50.0, 50.0)]);
        assert!(tracker.tracks()[0].is_confirmed());

        for expected_tsu in 1..=3u32 {
            let r = step(&mut tracker, &[]);
            assert!(r.removed.is_empty());
            assert_eq!(tracker.tracks()[0].time_since_update(), expected_tsu);
        }

        // time_since_update reaches 4 > max_age: removed this frame
        let r = step(&mut tracker, &[]);
        assert_eq!(r.removed, vec![1]);
        assert!(tracker.tracks().is_empty());
    }

    #[test]
    fn identities_increase_and_are_never_reused() {
        let mut tracker = Tracker::new(0.7, 30, 3);

        step(&mut tracker, &[detection_at(50.0, 50.0)]);
        step(&mut tracker, &[]); // tentative miss kills track 1
        assert!(tracker.tracks().is_empty());

        let r = step(&mut tracker, &[detection_at(50.0, 50.0)]);
        assert_eq!(r.created, vec![2]);
    }

    #[test]
    fn two_targets_keep_distinct_identities() {
        let mut tracker = Tracker::new(0.7, 30, 3);

        for _ in 0..5 {
            let r = step(
                &mut tracker,
                &[detection_at(0.0, 0.0), detection_at(200.0, 0.0)],
            );
            assert_eq!(tracker.tracks().len(), 2);
            assert_eq!(r.removed, Vec::<u64>::new());
        }

        let ids: Vec<_> = tracker.active_tracks().map(|t| t.track_id()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(tracker.active_tracks().all(|t| t.is_confirmed()));
    }

    #[test]
    fn window_fills_on_frame_thirty_and_stays_full() {
        let mut tracker = Tracker::new(0.7, 60, 3);

        for frame in 1..=(WINDOW_LEN - 1) {
            step(&mut tracker, &[detection_at(50.0, 50.0)]);
            assert_eq!(tracker.tracks()[0].window_len(), frame);
            assert!(!tracker.tracks()[0].is_window_full());
        }

        step(&mut tracker, &[detection_at(50.0, 50.0)]);
        assert!(tracker.tracks()[0].is_window_full());

        for _ in 0..5 {
            step(&mut tracker, &[detection_at(50.0, 50.0)]);
            assert!(tracker.tracks()[0].is_window_full());
        }
    }

    #[test]
    fn empty_frame_on_empty_tracker_is_a_no_op() {
        let mut tracker = Tracker::new(0.7, 30, 3);
        let r = step(&mut tracker, &[]);

        assert!(r.matched.is_empty());
        assert!(r.created.is_empty());
        assert!(r.removed.is_empty());
        assert!(tracker.tracks().is_empty());
    }

    #[test]
    fn track_follows_moving_target() {
        let mut tracker = Tracker::new(0.7, 30, 3);

        for frame in 0..20 {
            let x = 50.0 + 2.0 * frame as f32;
            let r = step(&mut tracker, &[detection_at(x, 50.0)]);
            if frame > 0 {
                assert_eq!(r.matched, vec![(1, 0)]);
            }
        }

        let track = &tracker.tracks()[0];
        assert_eq!(track.track_id(), 1);
        let bbox = track.to_ltrb();
        assert!((bbox.left() - 88.0).abs() < 5.0);
    }
}
