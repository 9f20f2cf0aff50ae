//! Constant-velocity Kalman filter over bounding boxes.
//!
//! State is `(cx, cy, a, h, vx, vy, va, vh)`: box center, aspect ratio,
//! height and their velocities. Measurements are `(cx, cy, a, h)`.

use nalgebra as na;
use ndarray::{Array1, Array2};

/// Filter state of one track.
#[derive(Debug, Clone, PartialEq)]
pub struct KalmanState {
    pub mean: Array1<f64>,
    pub covariance: Array2<f64>,
}

impl KalmanState {
    /// Box implied by the position part of the mean, as XYAH.
    #[inline]
    pub fn xyah(&self) -> [f64; 4] {
        [self.mean[0], self.mean[1], self.mean[2], self.mean[3]]
    }
}

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Array2<f64>,
    update_mat: Array2<f64>,
    std_weight_position: f64,
    std_weight_velocity: f64,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

fn diag_squared(std: &[f64]) -> Array2<f64> {
    Array2::from_diag(&Array1::from_iter(std.iter().map(|s| s * s)))
}

impl KalmanFilter {
    const NDIM: usize = 4;

    pub fn new() -> Self {
        let ndim = Self::NDIM;
        let mut motion_mat = Array2::eye(2 * ndim);
        for i in 0..ndim {
            motion_mat[[i, ndim + i]] = 1.0;
        }

        let mut update_mat = Array2::zeros((ndim, 2 * ndim));
        for i in 0..ndim {
            update_mat[[i, i]] = 1.0;
        }

        Self {
            motion_mat,
            update_mat,
            std_weight_position: 1.0 / 20.0,
            std_weight_velocity: 1.0 / 160.0,
        }
    }

    /// Start a track from an unassociated measurement with zero velocity.
    pub fn initiate(&self, measurement: [f64; 4]) -> KalmanState {
        let mut mean = Array1::zeros(2 * Self::NDIM);
        for (i, v) in measurement.iter().enumerate() {
            mean[i] = *v;
        }

        let h = measurement[3];
        let pos = 2.0 * self.std_weight_position * h;
        let vel = 10.0 * self.std_weight_velocity * h;
        let covariance = diag_squared(&[pos, pos, 1e-2, pos, vel, vel, 1e-5, vel]);

        KalmanState { mean, covariance }
    }

    pub fn predict(&self, state: &KalmanState) -> KalmanState {
        let h = state.mean[3];
        let pos = self.std_weight_position * h;
        let vel = self.std_weight_velocity * h;
        let motion_cov = diag_squared(&[pos, pos, 1e-2, pos, vel, vel, 1e-5, vel]);

        KalmanState {
            mean: self.motion_mat.dot(&state.mean),
            covariance: self.motion_mat.dot(&state.covariance).dot(&self.motion_mat.t())
                + motion_cov,
        }
    }

    /// Project the state into measurement space.
    pub fn project(&self, state: &KalmanState) -> (Array1<f64>, Array2<f64>) {
        let h = state.mean[3];
        let pos = self.std_weight_position * h;
        let innovation_cov = diag_squared(&[pos, pos, 1e-1, pos]);

        let mean = self.update_mat.dot(&state.mean);
        let covariance =
            self.update_mat.dot(&state.covariance).dot(&self.update_mat.t()) + innovation_cov;
        (mean, covariance)
    }

    /// Correct the state with a measurement.
    ///
    /// Returns `None` when the innovation covariance is singular; callers
    /// keep the predicted state in that case.
    pub fn update(&self, state: &KalmanState, measurement: [f64; 4]) -> Option<KalmanState> {
        let (projected_mean, projected_cov) = self.project(state);
        let innovation = Array1::from_iter(measurement) - projected_mean;

        let s_inv = invert_4x4(&projected_cov)?;
        // P * H^T is 8x4, so is the gain
        let kalman_gain = state.covariance.dot(&self.update_mat.t()).dot(&s_inv);

        Some(KalmanState {
            mean: &state.mean + &kalman_gain.dot(&innovation),
            covariance: &state.covariance
                - &kalman_gain.dot(&projected_cov).dot(&kalman_gain.t()),
        })
    }
}

fn invert_4x4(m: &Array2<f64>) -> Option<Array2<f64>> {
    let nm = na::Matrix4::from_fn(|i, j| m[[i, j]]);
    let inv = nm.try_inverse()?;
    Some(Array2::from_shape_fn((4, 4), |(i, j)| inv[(i, j)]))
}
