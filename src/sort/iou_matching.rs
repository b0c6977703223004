use ndarray::prelude::*;

use crate::sort::{BBox, Detection, Ltrb, Track};

/// Intersection over union of two corner-format boxes, in `[0, 1]`.
pub fn iou(a: &BBox<Ltrb>, b: &BBox<Ltrb>) -> f32 {
    let iw = (a.right().min(b.right()) - a.left().max(b.left())).max(0.0);
    let ih = (a.bottom().min(b.bottom()) - a.top().max(b.top())).max(0.0);
    let intersection = iw * ih;

    let union = a.area() + b.area() - intersection;
    if union <= 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Cost matrix of shape `(track_indices, detection_indices)` where entry
/// `(i, j)` is `1 - iou` between the i-th track's predicted box and the
/// j-th detection's box.
pub fn iou_cost(
    tracks: &[Track],
    detections: &[Detection],
    track_indices: &[usize],
    detection_indices: &[usize],
) -> Array2<f32> {
    let mut cost_matrix = Array2::zeros((track_indices.len(), detection_indices.len()));

    for (row, &track_idx) in track_indices.iter().enumerate() {
        let track_box = tracks[track_idx].to_ltrb();

        for (col, &det_idx) in detection_indices.iter().enumerate() {
            cost_matrix[(row, col)] = 1.0 - iou(&track_box, detections[det_idx].bbox());
        }
    }

    cost_matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_boxes_full_overlap() {
        let a = BBox::ltrb(0.0, 0.0, 10.0, 10.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn disjoint_boxes_zero_overlap() {
        let a = BBox::ltrb(0.0, 0.0, 10.0, 10.0);
        let b = BBox::ltrb(20.0, 20.0, 30.0, 30.0);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn partial_overlap() {
        // 5x10 intersection over 10x10 + 10x10 - 50 union
        let a = BBox::ltrb(0.0, 0.0, 10.0, 10.0);
        let b = BBox::ltrb(5.0, 0.0, 15.0, 10.0);
        assert!((iou(&a, &b) - 50.0 / 150.0).abs() < 1e-6);
    }

    #[test]
    fn touching_boxes_zero_overlap() {
        let a = BBox::ltrb(0.0, 0.0, 10.0, 10.0);
        let b = BBox::ltrb(10.0, 0.0, 20.0, 10.0);
        assert_eq!(iou(&a, &b), 0.0);
    }
}
