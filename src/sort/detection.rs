use ndarray::prelude::*;

use crate::error::Error;
use crate::sort::{BBox, Ltrb};

/// One observation from the detector/pose stage of a single frame.
///
/// Carries a corner-format bounding box, the detector confidence and,
/// when the pose stage ran, a `K x 3` keypoint matrix with `(x, y, score)`
/// rows. Construction validates the geometry, so the tracker core never
/// sees a degenerate box.
#[derive(Debug, Clone)]
pub struct Detection {
    bbox: BBox<Ltrb>,
    confidence: f32,
    keypoints: Option<Array2<f32>>,
}

impl Detection {
    pub fn new(
        bbox: BBox<Ltrb>,
        confidence: f32,
        keypoints: Option<Array2<f32>>,
    ) -> Result<Self, Error> {
        let c = bbox.coords();

        if c.iter().any(|v| !v.is_finite()) || c[2] <= c[0] || c[3] <= c[1] {
            return Err(Error::InvalidBBox(c));
        }

        if let Some(ref kpts) = keypoints {
            if kpts.ncols() != 3 {
                return Err(Error::KeypointShape(kpts.ncols()));
            }
        }

        Ok(Self {
            bbox,
            confidence,
            keypoints,
        })
    }

    /// Build a detection whose box is the axis-aligned hull of the keypoints,
    /// expanded by `margin` pixels on every side.
    pub fn from_keypoints(
        keypoints: Array2<f32>,
        margin: f32,
        confidence: f32,
    ) -> Result<Self, Error> {
        if keypoints.nrows() == 0 {
            return Err(Error::EmptyKeypoints);
        }

        let xs = keypoints.index_axis(Axis(1), 0);
        let ys = keypoints.index_axis(Axis(1), 1);

        let (mut x_min, mut x_max) = (f32::INFINITY, f32::NEG_INFINITY);
        for &x in xs.iter() {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
        }

        let (mut y_min, mut y_max) = (f32::INFINITY, f32::NEG_INFINITY);
        for &y in ys.iter() {
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }

        Self::new(
            BBox::ltrb(x_min - margin, y_min - margin, x_max + margin, y_max + margin),
            confidence,
            Some(keypoints),
        )
    }

    #[inline]
    pub fn bbox(&self) -> &BBox<Ltrb> {
        &self.bbox
    }

    #[inline]
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    #[inline]
    pub fn keypoints(&self) -> Option<ArrayView2<'_, f32>> {
        self.keypoints.as_ref().map(|k| k.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_box() {
        let det = Detection::new(BBox::ltrb(0.0, 0.0, 10.0, 20.0), 0.9, None).unwrap();
        assert_eq!(det.confidence(), 0.9);
        assert!(det.keypoints().is_none());
    }

    #[test]
    fn rejects_inverted_box() {
        assert!(Detection::new(BBox::ltrb(10.0, 0.0, 0.0, 20.0), 0.9, None).is_err());
        assert!(Detection::new(BBox::ltrb(0.0, 20.0, 10.0, 0.0), 0.9, None).is_err());
    }

    #[test]
    fn rejects_non_finite_box() {
        assert!(Detection::new(BBox::ltrb(f32::NAN, 0.0, 10.0, 20.0), 0.9, None).is_err());
        assert!(Detection::new(BBox::ltrb(0.0, 0.0, f32::INFINITY, 20.0), 0.9, None).is_err());
    }

    #[test]
    fn rejects_bad_keypoint_shape() {
        let kpts = Array2::<f32>::zeros((13, 2));
        let err = Detection::new(BBox::ltrb(0.0, 0.0, 10.0, 20.0), 0.9, Some(kpts));
        assert!(err.is_err());
    }

    #[test]
    fn box_from_keypoint_hull() {
        let kpts = arr2(&[
            [10.0, 40.0, 0.9],
            [30.0, 20.0, 0.8],
            [20.0, 60.0, 0.7],
        ]);

        let det = Detection::from_keypoints(kpts, 5.0, 0.8).unwrap();
        assert_eq!(det.bbox().coords(), [5.0, 15.0, 35.0, 65.0]);
        assert_eq!(det.keypoints().unwrap().nrows(), 3);
    }

    #[test]
    fn empty_keypoints_cannot_form_box() {
        let kpts = Array2::<f32>::zeros((0, 3));
        assert!(Detection::from_keypoints(kpts, 5.0, 0.8).is_err());
    }
}
