use nalgebra as na;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometers between two `(longitude, latitude)`
/// points given in degrees.
pub fn haversine(src: na::Point2<f32>, dst: na::Point2<f32>) -> f32 {
    let lat1 = (src.y as f64).to_radians();
    let lon1 = (src.x as f64).to_radians();
    let lat2 = (dst.y as f64).to_radians();
    let lon2 = (dst.x as f64).to_radians();

    let diff_lat = lat2 - lat1;
    let diff_lon = lon2 - lon1;

    let a = (diff_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (diff_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    (c * EARTH_RADIUS_KM) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine() {
        let src = na::Point2::new(6.602018, 52.036769);
        let dst = na::Point2::new(6.603560, 52.036730);
        let dist = haversine(src, dst);
        assert!((dist - 0.105_567_72).abs() < 1e-5, "got {dist}");
    }

    #[test]
    fn test_haversine_same_point() {
        let p = na::Point2::new(37.61, 55.75);
        assert_eq!(haversine(p, p), 0.0);
    }

    #[test]
    fn test_haversine_is_symmetric() {
        let a = na::Point2::new(30.3, 59.9);
        let b = na::Point2::new(37.6, 55.7);
        assert!((haversine(a, b) - haversine(b, a)).abs() < 1e-4);
    }
}
