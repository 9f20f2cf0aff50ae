//! Planar projective transform fitted from four point correspondences.

use nalgebra as na;

use crate::error::{Error, Result};

/// 3x3 homography mapping source points (pixels) to destination points
/// (longitude, latitude).
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveTransform {
    matrix: na::Matrix3<f64>,
}

impl PerspectiveTransform {
    /// Solve the homography with `h33 = 1` mapping each `src[i]` to `dst[i]`.
    ///
    /// Exactly four pairs are required.
    pub fn from_pairs(src: &[na::Point2<f32>], dst: &[na::Point2<f32>]) -> Result<Self> {
        if src.len() != 4 || dst.len() != 4 {
            return Err(Error::InvalidCalibration(src.len().min(dst.len())));
        }
        if !in_general_position(src) || !in_general_position(dst) {
            return Err(Error::SingularTransform);
        }

        let mut a = na::SMatrix::<f64, 8, 8>::zeros();
        let mut b = na::SVector::<f64, 8>::zeros();

        for i in 0..4 {
            let (x, y) = (src[i].x as f64, src[i].y as f64);
            let (u, v) = (dst[i].x as f64, dst[i].y as f64);

            a[(i, 0)] = x;
            a[(i, 1)] = y;
            a[(i, 2)] = 1.0;
            a[(i, 6)] = -x * u;
            a[(i, 7)] = -y * u;
            b[i] = u;

            a[(i + 4, 3)] = x;
            a[(i + 4, 4)] = y;
            a[(i + 4, 5)] = 1.0;
            a[(i + 4, 6)] = -x * v;
            a[(i + 4, 7)] = -y * v;
            b[i + 4] = v;
        }

        let h = a.lu().solve(&b).ok_or(Error::SingularTransform)?;
        if h.iter().any(|v| !v.is_finite()) {
            return Err(Error::SingularTransform);
        }

        let matrix = na::Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);

        Ok(Self { matrix })
    }

    /// Map a point through the homography, dividing by the homogeneous
    /// component. Points mapped to infinity yield `None`.
    pub fn apply(&self, p: na::Point2<f32>) -> Option<na::Point2<f32>> {
        let v = self.matrix * na::Vector3::new(p.x as f64, p.y as f64, 1.0);
        let scale = v[2];
        if scale.abs() < f64::EPSILON {
            return None;
        }
        Some(na::Point2::new((v[0] / scale) as f32, (v[1] / scale) as f32))
    }
}

/// No three of the four corners may be collinear.
fn in_general_position(pts: &[na::Point2<f32>]) -> bool {
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    TRIPLES.iter().all(|&[i, j, k]| {
        let (a, b, c) = (pts[i].cast::<f64>(), pts[j].cast::<f64>(), pts[k].cast::<f64>());
        let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
        cross.abs() > 1e-12
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibration() -> (Vec<na::Point2<f32>>, Vec<na::Point2<f32>>) {
        let src = vec![
            na::Point2::new(1200.0, 278.0),
            na::Point2::new(87.0, 328.0),
            na::Point2::new(36.0, 583.0),
            na::Point2::new(1205.0, 698.0),
        ];
        let dst = vec![
            na::Point2::new(6.602018, 52.036769),
            na::Point2::new(6.603227, 52.036181),
            na::Point2::new(6.603638, 52.036558),
            na::Point2::new(6.603560, 52.036730),
        ];
        (src, dst)
    }

    #[test]
    fn test_round_trip_on_calibration_points() {
        let (src, dst) = calibration();
        let transform = PerspectiveTransform::from_pairs(&src, &dst).unwrap();

        for (s, d) in src.iter().zip(dst.iter()) {
            let res = transform.apply(*s).unwrap();
            assert!((res.x - d.x).abs() < 1e-5, "{} vs {}", res.x, d.x);
            assert!((res.y - d.y).abs() < 1e-5, "{} vs {}", res.y, d.y);
        }
    }

    #[test]
    fn test_identity_square() {
        let square = vec![
            na::Point2::new(0.0, 0.0),
            na::Point2::new(1.0, 0.0),
            na::Point2::new(1.0, 1.0),
            na::Point2::new(0.0, 1.0),
        ];
        let transform = PerspectiveTransform::from_pairs(&square, &square).unwrap();
        let p = transform.apply(na::Point2::new(0.25, 0.75)).unwrap();
        assert!((p.x - 0.25).abs() < 1e-6);
        assert!((p.y - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_wrong_number_of_pairs() {
        let (src, dst) = calibration();
        let err = PerspectiveTransform::from_pairs(&src[..3], &dst[..3]).unwrap_err();
        assert!(matches!(err, Error::InvalidCalibration(3)));
    }

    #[test]
    fn test_collinear_points_are_rejected() {
        let line = vec![
            na::Point2::new(0.0, 0.0),
            na::Point2::new(1.0, 1.0),
            na::Point2::new(2.0, 2.0),
            na::Point2::new(3.0, 3.0),
        ];
        assert!(PerspectiveTransform::from_pairs(&line, &line).is_err());
    }
}
