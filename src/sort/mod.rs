pub mod detection;
pub mod iou_matching;
pub mod kalman_filter;
pub mod linear_assignment;
pub mod track;
pub mod tracker;

pub use detection::Detection;
pub use kalman_filter::{KalmanFilter, MotionState};
pub use track::{Track, TrackState, WINDOW_LEN};
pub use tracker::{FrameReport, Tracker};

use core::marker::PhantomData;
use ndarray::prelude::*;

pub trait BBoxFormat: std::fmt::Debug {}

/// `(left, top, width, height)`
#[derive(Debug, Copy, Clone)]
pub struct Ltwh;
impl BBoxFormat for Ltwh {}

/// `(center x, center y, aspect ratio, height)` — the Kalman state space.
#[derive(Debug, Copy, Clone)]
pub struct Xyah;
impl BBoxFormat for Xyah {}

/// `(left, top, right, bottom)` — the detector/renderer corner format.
#[derive(Debug, Copy, Clone)]
pub struct Ltrb;
impl BBoxFormat for Ltrb {}

/// A bounding box tagged with its coordinate format.
#[derive(Debug, Clone)]
pub struct BBox<F: BBoxFormat>([f32; 4], PhantomData<F>);

impl<F: BBoxFormat> BBox<F> {
    #[inline]
    pub fn as_view(&self) -> ArrayView1<'_, f32> {
        aview1(&self.0)
    }

    #[inline]
    pub fn coords(&self) -> [f32; 4] {
        self.0
    }
}

impl BBox<Ltwh> {
    #[inline]
    pub fn ltwh(left: f32, top: f32, width: f32, height: f32) -> Self {
        BBox([left, top, width, height], Default::default())
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3]
    }

    #[inline]
    pub fn as_xyah(&self) -> BBox<Xyah> {
        self.into()
    }

    #[inline]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        self.into()
    }
}

impl BBox<Ltrb> {
    #[inline]
    pub fn ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        BBox([left, top, right, bottom], Default::default())
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.0[3]
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.0[2] - self.0[0]
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.0[3] - self.0[1]
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    #[inline]
    pub fn as_ltwh(&self) -> BBox<Ltwh> {
        self.into()
    }

    #[inline]
    pub fn as_xyah(&self) -> BBox<Xyah> {
        (&self.as_ltwh()).into()
    }
}

impl BBox<Xyah> {
    #[inline]
    pub fn xyah(cx: f32, cy: f32, aspect: f32, height: f32) -> Self {
        BBox([cx, cy, aspect, height], Default::default())
    }

    #[inline(always)]
    pub fn cx(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn cy(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn aspect(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3]
    }

    #[inline]
    pub fn as_ltwh(&self) -> BBox<Ltwh> {
        self.into()
    }

    #[inline]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        (&self.as_ltwh()).into()
    }
}

impl<'a> From<&'a BBox<Ltwh>> for BBox<Xyah> {
    #[inline]
    fn from(v: &'a BBox<Ltwh>) -> Self {
        Self(
            [
                v.0[0] + v.0[2] / 2.0,
                v.0[1] + v.0[3] / 2.0,
                v.0[2] / v.0[3],
                v.0[3],
            ],
            Default::default(),
        )
    }
}

impl<'a> From<&'a BBox<Ltwh>> for BBox<Ltrb> {
    #[inline]
    fn from(v: &'a BBox<Ltwh>) -> Self {
        Self(
            [v.0[0], v.0[1], v.0[0] + v.0[2], v.0[1] + v.0[3]],
            Default::default(),
        )
    }
}

impl<'a> From<&'a BBox<Ltrb>> for BBox<Ltwh> {
    #[inline]
    fn from(v: &'a BBox<Ltrb>) -> Self {
        Self(
            [v.0[0], v.0[1], v.0[2] - v.0[0], v.0[3] - v.0[1]],
            Default::default(),
        )
    }
}

impl<'a> From<&'a BBox<Xyah>> for BBox<Ltwh> {
    #[inline]
    fn from(v: &'a BBox<Xyah>) -> Self {
        let height = v.0[3];
        let width = v.0[2] * height;

        Self(
            [v.0[0] - width / 2.0, v.0[1] - height / 2.0, width, height],
            Default::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ltrb_xyah_round_trip() {
        let b = BBox::ltrb(10.0, 20.0, 50.0, 100.0);
        let x = b.as_xyah();

        assert_eq!(x.cx(), 30.0);
        assert_eq!(x.cy(), 60.0);
        assert_eq!(x.aspect(), 0.5);
        assert_eq!(x.height(), 80.0);

        let back = x.as_ltrb();
        assert_eq!(back.coords(), [10.0, 20.0, 50.0, 100.0]);
    }

    #[test]
    fn ltrb_extents() {
        let b = BBox::ltrb(0.0, 0.0, 4.0, 8.0);
        assert_eq!(b.width(), 4.0);
        assert_eq!(b.height(), 8.0);
        assert_eq!(b.area(), 32.0);
    }
}
