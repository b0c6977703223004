use std::collections::HashSet;

use ndarray::prelude::*;

use crate::sort::kalman_filter::CHI_2_INV_95;
use crate::sort::{Detection, KalmanFilter, Track};

/// Cost assigned to pairs ruled out by gating. Any value above the matching
/// threshold works; this one is unambiguous in debug output.
pub const INFTY_COST: f32 = 1e+5;

/// `(matched pairs, unmatched track indices, unmatched detection indices)`
pub type Matches = (Vec<(usize, usize)>, Vec<usize>, Vec<usize>);

/// Solve the assignment between a set of tracks and detections.
///
/// The cost matrix is padded to a square with an above-threshold filler and
/// handed to the Hungarian solver, so the result is an optimal partial
/// bijection: every pair with cost above `max_distance` stays unmatched.
/// Returns `(matches, unmatched_tracks, unmatched_detections)` where matches
/// hold `(track index, detection index)` into the original slices. The solver
/// is deterministic; equal-cost ties resolve to the lower row, i.e. the
/// earlier (lower-id) track.
pub fn min_cost_matching<D>(
    distance_metric: &D,
    max_distance: f32,
    tracks: &[Track],
    detections: &[Detection],
    track_indices: Option<Vec<usize>>,
    detection_indices: Option<Vec<usize>>,
) -> Matches
where
    D: Fn(&[Track], &[Detection], &[usize], &[usize]) -> Array2<f32>,
{
    let track_indices = track_indices.unwrap_or_else(|| (0..tracks.len()).collect());
    let detection_indices = detection_indices.unwrap_or_else(|| (0..detections.len()).collect());

    if detection_indices.is_empty() || track_indices.is_empty() {
        return (vec![], track_indices, detection_indices); // Nothing to match.
    }

    let cost_matrix = distance_metric(tracks, detections, &track_indices, &detection_indices);

    let nt = track_indices.len();
    let nd = detection_indices.len();
    let n = nt.max(nd);

    // Square padding; filler sits above the gate so padded cells never match.
    let filler = max_distance + 1.0e-5;
    let mut padded = Array2::from_elem((n, n), filler);
    padded
        .slice_mut(s![..nt, ..nd])
        .assign(&cost_matrix.mapv(|x| if x > max_distance { filler } else { x }));

    let mut weights =
        munkres::WeightMatrix::from_row_vec(n, padded.iter().copied().collect());
    let assignment = munkres::solve_assignment(&mut weights).unwrap();

    let mut matches = vec![];
    let mut matched_rows = HashSet::new();
    let mut matched_cols = HashSet::new();

    for pos in assignment {
        if pos.row < nt && pos.column < nd && padded[(pos.row, pos.column)] <= max_distance {
            matches.push((track_indices[pos.row], detection_indices[pos.column]));
            matched_rows.insert(pos.row);
            matched_cols.insert(pos.column);
        }
    }

    let unmatched_tracks = track_indices
        .iter()
        .enumerate()
        .filter(|(row, _)| !matched_rows.contains(row))
        .map(|(_, &idx)| idx)
        .collect();

    let unmatched_detections = detection_indices
        .iter()
        .enumerate()
        .filter(|(col, _)| !matched_cols.contains(col))
        .map(|(_, &idx)| idx)
        .collect();

    (matches, unmatched_tracks, unmatched_detections)
}

/// Match tracks to detections in increasing order of `time_since_update`.
///
/// Level 0 holds tracks seen last frame, level 1 tracks missed once, and so
/// on up to `cascade_depth`. Recently observed tracks therefore win contested
/// detections; detections still unmatched after the deepest level are
/// reported for track initiation.
pub fn matching_cascade<D>(
    distance_metric: &D,
    max_distance: f32,
    cascade_depth: u32,
    tracks: &[Track],
    detections: &[Detection],
    track_indices: Option<Vec<usize>>,
    detection_indices: Option<Vec<usize>>,
) -> Matches
where
    D: Fn(&[Track], &[Detection], &[usize], &[usize]) -> Array2<f32>,
{
    let track_indices = track_indices.unwrap_or_else(|| (0..tracks.len()).collect());
    let detection_indices = detection_indices.unwrap_or_else(|| (0..detections.len()).collect());

    let mut unmatched_detections = detection_indices;
    let mut matches = vec![];

    for level in 0..cascade_depth {
        if unmatched_detections.is_empty() {
            break;
        }

        let track_indices_l: Vec<_> = track_indices
            .iter()
            .copied()
            .filter(|&idx| tracks[idx].time_since_update() == 1 + level)
            .collect();

        if track_indices_l.is_empty() {
            continue;
        }

        let (mut matches_l, _, remaining) = min_cost_matching(
            distance_metric,
            max_distance,
            tracks,
            detections,
            Some(track_indices_l),
            Some(unmatched_detections.clone()),
        );

        unmatched_detections = remaining;
        matches.append(&mut matches_l);
    }

    let matched_tracks: HashSet<_> = matches.iter().map(|&(t, _)| t).collect();
    let unmatched_tracks = track_indices
        .into_iter()
        .filter(|idx| !matched_tracks.contains(idx))
        .collect();

    (matches, unmatched_tracks, unmatched_detections)
}

/// Invalidate cost entries whose measurement is implausible under the
/// track's state distribution: squared Mahalanobis distance above the 0.95
/// chi-square quantile forces the cost to `gated_cost`.
pub fn gate_cost_matrix(
    kf: &KalmanFilter,
    mut cost_matrix: ArrayViewMut2<'_, f32>,
    tracks: &[Track],
    detections: &[Detection],
    track_indices: &[usize],
    detection_indices: &[usize],
    gated_cost: Option<f32>,
    only_position: Option<bool>,
) {
    let gated_cost = gated_cost.unwrap_or(INFTY_COST);
    let only_position = only_position.unwrap_or(false);

    let gating_dim = if only_position { 1 } else { 3 }; // 2 resp. 4 degrees of freedom
    let gating_threshold = CHI_2_INV_95[gating_dim];

    let mut measurements: Array2<f32> = Array2::zeros((detection_indices.len(), 4));
    for (mut row, &idx) in measurements.axis_iter_mut(Axis(0)).zip(detection_indices.iter()) {
        row.assign(&detections[idx].bbox().as_xyah().as_view());
    }

    for (row, &track_idx) in track_indices.iter().enumerate() {
        let gating_distance = kf.gating_distance(
            tracks[track_idx].motion(),
            measurements.view(),
            only_position,
        );

        let mut axis = cost_matrix.index_axis_mut(Axis(0), row);
        for (col, val) in axis.indexed_iter_mut() {
            if gating_distance[col] > gating_threshold {
                *val = gated_cost;
            }
        }
    }
}
