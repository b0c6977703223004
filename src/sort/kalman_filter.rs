use ndarray::prelude::*;
use ndarray_linalg::cholesky::*;
use ndarray_linalg::triangular::*;

use crate::sort::{BBox, Xyah};

/// 0.95 quantile of the chi-square distribution with N degrees of freedom
/// (N = 1..9). Used as the Mahalanobis gating threshold.
pub const CHI_2_INV_95: [f32; 9] = [
    3.8415, // 1
    5.9915, // 2
    7.8147, // 3
    9.4877, // 4
    11.070, // 5
    12.592, // 6
    14.067, // 7
    15.507, // 8
    16.919, // 9
];

/// Mean and covariance of one track's motion estimate.
///
/// The 8-dimensional state is `(x, y, a, h, vx, vy, va, vh)`: bounding box
/// center, aspect ratio, height and their velocities. Owned by the track,
/// mutated only through [`KalmanFilter::predict`] and
/// [`KalmanFilter::correct`].
#[derive(Debug, Clone)]
pub struct MotionState {
    mean: Array1<f32>,
    covariance: Array2<f32>,
}

impl MotionState {
    #[inline]
    pub fn mean(&self) -> ArrayView1<'_, f32> {
        self.mean.view()
    }

    #[inline]
    pub fn covariance(&self) -> ArrayView2<'_, f32> {
        self.covariance.view()
    }

    /// The positional part of the state as a box in state-space format.
    #[inline]
    pub fn bbox(&self) -> BBox<Xyah> {
        BBox::xyah(self.mean[0], self.mean[1], self.mean[2], self.mean[3])
    }
}

/// Constant-velocity Kalman filter over bounding boxes in image space.
///
/// The box `(x, y, a, h)` is taken as a direct (linear) observation of the
/// state. Process and observation noise are scaled by the current box height,
/// following the usual SORT parameterization.
#[derive(Clone)]
pub struct KalmanFilter {
    motion_mat: Array2<f32>,
    update_mat: Array2<f32>,
    std_weight_position: f32,
    std_weight_velocity: f32,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        let (ndim, dt) = (4, 1.0);

        let mut motion_mat = Array2::eye(2 * ndim);
        for i in 0..ndim {
            motion_mat[(i, ndim + i)] = dt;
        }

        let mut update_mat = Array2::zeros((ndim, 2 * ndim));
        for i in 0..ndim {
            update_mat[(i, i)] = 1.0;
        }

        // Uncertainty weights relative to the current state estimate.
        let std_weight_position = 1.0 / 20.0;
        let std_weight_velocity = 1.0 / 160.0;

        Self {
            motion_mat,
            update_mat,
            std_weight_position,
            std_weight_velocity,
        }
    }
}

impl KalmanFilter {
    /// Create the state for a track from an unassociated measurement.
    /// Velocities start at zero mean with high uncertainty.
    pub fn initiate(&self, measurement: &BBox<Xyah>) -> MotionState {
        let mut mean = Array1::zeros(8);
        mean.slice_mut(s![..4]).assign(&measurement.as_view());

        let h = measurement.height();
        let std = arr1(&[
            2.0 * self.std_weight_position * h,
            2.0 * self.std_weight_position * h,
            1.0e-2,
            2.0 * self.std_weight_position * h,
            10.0 * self.std_weight_velocity * h,
            10.0 * self.std_weight_velocity * h,
            1.0e-5,
            10.0 * self.std_weight_velocity * h,
        ]);

        MotionState {
            mean,
            covariance: Array2::from_diag(&(&std * &std)),
        }
    }

    /// Advance the state one time step, inflating the covariance with the
    /// height-relative process noise.
    pub fn predict(&self, state: &mut MotionState) {
        let h = state.mean[3];
        let std = arr1(&[
            // position
            self.std_weight_position * h,
            self.std_weight_position * h,
            1e-2,
            self.std_weight_position * h,
            // velocity
            self.std_weight_velocity * h,
            self.std_weight_velocity * h,
            1e-5,
            self.std_weight_velocity * h,
        ]);

        let motion_cov = Array2::from_diag(&(&std * &std));
        let mean = self.motion_mat.dot(&state.mean);
        let covariance = self
            .motion_mat
            .dot(&state.covariance)
            .dot(&self.motion_mat.t());

        state.mean = mean;
        state.covariance = covariance + motion_cov;
    }

    /// Project the state distribution into measurement space.
    fn project(
        &self,
        mean: ArrayView1<'_, f32>,
        covariance: ArrayView2<'_, f32>,
    ) -> (Array1<f32>, Array2<f32>) {
        let h = mean[3];
        let std = arr1(&[
            self.std_weight_position * h,
            self.std_weight_position * h,
            1e-1,
            self.std_weight_position * h,
        ]);

        let innovation_cov = Array2::from_diag(&(&std * &std));
        let mean = self.update_mat.dot(&mean);
        let covariance = self.update_mat.dot(&covariance).dot(&self.update_mat.t());

        (mean, covariance + innovation_cov)
    }

    /// Fuse an observed box into the state. The innovation covariance is
    /// positive definite by construction, so the Cholesky solve cannot fail.
    pub fn correct(&self, state: &mut MotionState, measurement: &BBox<Xyah>) {
        let (projected_mean, projected_cov) =
            self.project(state.mean.view(), state.covariance.view());

        let chol = projected_cov.factorizec(UPLO::Lower).unwrap();

        // kalman_gain rows solve S x = (P H^T)_row, shape (8, 4)
        let mut kalman_gain = state.covariance.dot(&self.update_mat.t());
        for mut row in kalman_gain.axis_iter_mut(Axis(0)) {
            chol.solvec_inplace(&mut row).unwrap();
        }

        let innovation = &measurement.as_view() - &projected_mean;

        state.mean = &state.mean + &innovation.dot(&kalman_gain.t());
        state.covariance =
            &state.covariance - &kalman_gain.dot(&projected_cov).dot(&kalman_gain.t());
    }

    /// Squared Mahalanobis distance between the state and each measurement
    /// row `(x, y, a, h)`. Compare against [`CHI_2_INV_95`] — 4 degrees of
    /// freedom, or 2 when `only_position` restricts the distance to the
    /// box center.
    pub fn gating_distance(
        &self,
        state: &MotionState,
        measurements: ArrayView2<'_, f32>,
        only_position: bool,
    ) -> Array1<f32> {
        let (mean, covariance) = self.project(state.mean.view(), state.covariance.view());

        let (mean, covariance, measurements) = if only_position {
            (
                mean.slice(s!(..2)),
                covariance.slice(s!(..2, ..2)),
                measurements.slice(s!(.., ..2)),
            )
        } else {
            (mean.view(), covariance.view(), measurements.view())
        };

        let d = &measurements - &mean;

        let cholesky_lower = covariance.cholesky(UPLO::Lower).unwrap();
        let z = cholesky_lower
            .solve_triangular_into(UPLO::Lower, Diag::NonUnit, d.reversed_axes())
            .unwrap();

        (&z * &z).sum_axis(Axis(0))
    }
}
