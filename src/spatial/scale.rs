use nalgebra as na;

use crate::geometry::{Point, Rect};

/// Source-to-display scale factors: `source = display * factor`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub x: f64,
    pub y: f64,
}

impl Default for Scale {
    fn default() -> Self {
        Self::identity()
    }
}

impl Scale {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn identity() -> Self {
        Self { x: 1.0, y: 1.0 }
    }

    /// Factors between the full frame and the reduced frame the detector
    /// and tracker work on.
    pub fn from_dims(width: u32, height: u32, reduced_width: u32, reduced_height: u32) -> Self {
        Self {
            x: width as f64 / reduced_width.max(1) as f64,
            y: height as f64 / reduced_height.max(1) as f64,
        }
    }

    /// Source point to display point, rounded to the nearest pixel.
    #[inline]
    pub fn to_display(&self, p: Point) -> Point {
        Point::new(
            (p.x as f64 / self.x).round() as i32,
            (p.y as f64 / self.y).round() as i32,
        )
    }

    /// Source rectangle to display rectangle, corners rounded.
    pub fn rect_to_display(&self, r: Rect) -> Rect {
        let tl = self.to_display(Point::new(r.x, r.y));
        let br = self.to_display(Point::new(r.right(), r.bottom()));
        Rect::from_ltrb(tl.x, tl.y, br.x, br.y)
    }

    /// Display point back to (sub-pixel) source coordinates.
    #[inline]
    pub fn to_source(&self, p: Point) -> na::Point2<f32> {
        na::Point2::new((p.x as f64 * self.x) as f32, (p.y as f64 * self.y) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dims() {
        let scale = Scale::from_dims(1280, 720, 640, 360);
        assert_eq!(scale, Scale::new(2.0, 2.0));
        assert_eq!(scale.to_display(Point::new(101, 35)), Point::new(51, 18));
        assert_eq!(scale.to_source(Point::new(51, 18)), na::Point2::new(102.0, 36.0));
        assert_eq!(
            scale.rect_to_display(Rect::from_ltrb(52, 16, 88, 37)),
            Rect::from_ltrb(26, 8, 44, 19)
        );
    }

    #[test]
    fn test_zero_reduced_dims_do_not_divide_by_zero() {
        let scale = Scale::from_dims(640, 360, 0, 0);
        assert!(scale.x.is_finite() && scale.y.is_finite());
    }
}
