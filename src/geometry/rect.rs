use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::Point;

/// Axis-aligned integer bounding box with format conversion utilities.
///
/// Stored as LTWH (left, top, width, height). Conversions are provided for
/// LTRB (left, top, right, bottom) and XYAH (center x, center y, aspect
/// ratio w/h, height), the latter being the Kalman filter measurement space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// Left x coordinate
    pub x: i32,
    /// Top y coordinate
    pub y: i32,
    /// Width of the bounding box
    pub width: i32,
    /// Height of the bounding box
    pub height: i32,
}

impl Rect {
    /// Create a new Rect from top-left coordinates and dimensions (LTWH format).
    #[inline]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a Rect from LTRB format (left, top, right, bottom).
    #[inline]
    pub const fn from_ltrb(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Create a Rect from XYAH format (center x, center y, aspect ratio, height).
    #[inline]
    pub fn from_xyah(cx: f64, cy: f64, aspect_ratio: f64, height: f64) -> Self {
        let width = aspect_ratio * height;
        Self {
            x: (cx - width / 2.0).round() as i32,
            y: (cy - height / 2.0).round() as i32,
            width: width.round() as i32,
            height: height.round() as i32,
        }
    }

    #[inline]
    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    #[inline]
    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Convert to LTRB format: (x1, y1, x2, y2).
    #[inline]
    pub const fn to_ltrb(&self) -> [i32; 4] {
        [self.x, self.y, self.right(), self.bottom()]
    }

    /// Convert to XYAH format: (center_x, center_y, aspect_ratio, height).
    #[inline]
    pub fn to_xyah(&self) -> [f64; 4] {
        let cx = self.x as f64 + self.width as f64 / 2.0;
        let cy = self.y as f64 + self.height as f64 / 2.0;
        let aspect_ratio = if self.height > 0 {
            self.width as f64 / self.height as f64
        } else {
            0.0
        };
        [cx, cy, aspect_ratio, self.height as f64]
    }

    /// Integer center of the bounding box, `(min + max) / 2` per axis.
    #[inline]
    pub const fn center(&self) -> Point {
        Point::new((self.x + self.right()) / 2, (self.y + self.bottom()) / 2)
    }

    #[inline]
    pub const fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    /// Calculate Intersection over Union (IoU) with another bounding box.
    pub fn iou(&self, other: &Rect) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        let inter_width = (x2 - x1).max(0) as i64;
        let inter_height = (y2 - y1).max(0) as i64;
        let inter_area = inter_width * inter_height;

        let union_area = self.area() + other.area() - inter_area;

        if union_area > 0 {
            inter_area as f32 / union_area as f32
        } else {
            0.0
        }
    }

    /// Map a rectangle from display space to source space, flooring each
    /// corner the way the frame cropper expects.
    pub fn rescaled(&self, scale_x: f64, scale_y: f64) -> Rect {
        let x1 = (self.x as f64 * scale_x).floor() as i32;
        let y1 = (self.y as f64 * scale_y).floor() as i32;
        let x2 = (self.right() as f64 * scale_x).floor() as i32;
        let y2 = (self.bottom() as f64 * scale_y).floor() as i32;
        Rect::from_ltrb(x1, y1, x2, y2)
    }

    #[inline]
    pub const fn translated(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Clamp the rectangle into a `cols x rows` frame so it can be used as a
    /// crop region.
    pub fn clamped(&self, cols: i32, rows: i32) -> Rect {
        let [mut x1, mut y1, mut x2, mut y2] = self.to_ltrb();
        if x1 <= 0 {
            x1 = 0;
        }
        if y1 < 0 {
            y1 = 0;
        }
        if x2 >= cols {
            x2 = cols - 1;
        }
        if y2 >= rows {
            y2 = rows - 1;
        }
        Rect::from_ltrb(x1, y1, x2, y2)
    }
}

/// Calculate IoU matrix between two sets of bounding boxes.
///
/// Returns a matrix of shape (M, N) where M is the length of `boxes_a`
/// and N is the length of `boxes_b`.
pub fn iou_batch(boxes_a: &[Rect], boxes_b: &[Rect]) -> Array2<f32> {
    let mut ious = Array2::zeros((boxes_a.len(), boxes_b.len()));
    for (i, a) in boxes_a.iter().enumerate() {
        for (j, b) in boxes_b.iter().enumerate() {
            ious[[i, j]] = a.iou(b);
        }
    }
    ious
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_conversions() {
        let rect = Rect::new(10, 20, 30, 40);

        assert_eq!(rect.to_ltrb(), [10, 20, 40, 60]);

        let xyah = rect.to_xyah();
        assert_eq!(xyah[0], 25.0);
        assert_eq!(xyah[1], 40.0);
        assert!((xyah[2] - 0.75).abs() < 1e-9);
        assert_eq!(xyah[3], 40.0);
    }

    #[test]
    fn test_from_ltrb() {
        let rect = Rect::from_ltrb(10, 20, 40, 60);
        assert_eq!(rect, Rect::new(10, 20, 30, 40));
    }

    #[test]
    fn test_from_xyah() {
        let rect = Rect::from_xyah(25.0, 40.0, 0.75, 40.0);
        assert_eq!(rect, Rect::new(10, 20, 30, 40));
    }

    #[test]
    fn test_center() {
        assert_eq!(Rect::from_ltrb(26, 8, 44, 18).center(), Point::new(35, 13));
        assert_eq!(Rect::from_ltrb(29, 17, 43, 26).center(), Point::new(36, 21));
    }

    #[test]
    fn test_iou() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);

        // Intersection: 5x5 = 25
        // Union: 100 + 100 - 25 = 175
        let iou = a.iou(&b);
        assert!((iou - 25.0 / 175.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_no_overlap() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(20, 20, 10, 10);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_same_box() {
        let a = Rect::new(0, 0, 10, 10);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_empty_boxes() {
        let a = Rect::new(3, 3, 0, 0);
        assert_eq!(a.iou(&a), 0.0);
    }

    #[test]
    fn test_rescaled_and_clamped() {
        let rect = Rect::from_ltrb(10, 10, 300, 200);
        let source = rect.rescaled(2.0, 2.0).translated(5, 10);
        assert_eq!(source.to_ltrb(), [25, 30, 605, 410]);

        let fixed = source.clamped(600, 400);
        assert_eq!(fixed.to_ltrb(), [25, 30, 599, 399]);

        let negative = Rect::from_ltrb(-4, -2, 10, 10).clamped(600, 400);
        assert_eq!(negative.to_ltrb(), [0, 0, 10, 10]);
    }

    #[test]
    fn test_iou_batch_shape() {
        let a = [Rect::new(0, 0, 10, 10), Rect::new(50, 50, 10, 10)];
        let b = [Rect::new(0, 0, 10, 10)];
        let ious = iou_batch(&a, &b);
        assert_eq!(ious.dim(), (2, 1));
        assert!((ious[[0, 0]] - 1.0).abs() < 1e-6);
        assert_eq!(ious[[1, 0]], 0.0);
    }
}
