//! Builder for creating Detection objects from various input formats.

use crate::geometry::Rect;
use crate::tracker::Detection;

/// Builder for creating `Detection` objects from float model outputs.
///
/// Coordinates are rounded to whole pixels on [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    class_id: i32,
    class_name: String,
    confidence: f32,
}

impl DetectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bounding box in LTRB format (x1, y1, x2, y2).
    pub fn ltrb(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.x1 = x1;
        self.y1 = y1;
        self.x2 = x2;
        self.y2 = y2;
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.x1 = cx - w / 2.0;
        self.y1 = cy - h / 2.0;
        self.x2 = cx + w / 2.0;
        self.y2 = cy + h / 2.0;
        self
    }

    /// Set bounding box in LTWH format (left, top, width, height).
    pub fn ltwh(mut self, l: f32, t: f32, w: f32, h: f32) -> Self {
        self.x1 = l;
        self.y1 = t;
        self.x2 = l + w;
        self.y2 = t + h;
        self
    }

    pub fn class(mut self, class_id: i32, class_name: impl Into<String>) -> Self {
        self.class_id = class_id;
        self.class_name = class_name.into();
        self
    }

    /// Set the confidence, clamped to `[0, 1]`.
    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn build(self) -> Detection {
        let rect = Rect::from_ltrb(
            self.x1.round() as i32,
            self.y1.round() as i32,
            self.x2.round() as i32,
            self.y2.round() as i32,
        );
        Detection::new(rect, self.class_id, self.class_name, self.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_builder() {
        let det = DetectionBuilder::new()
            .ltrb(10.0, 20.0, 50.0, 80.0)
            .class(2, "car")
            .confidence(0.95)
            .build();

        assert_eq!(det.confidence, 0.95);
        assert_eq!(det.rect, Rect::new(10, 20, 40, 60));
        assert_eq!(det.class_name, "car");
    }

    #[test]
    fn test_xywh_rounds() {
        let det = DetectionBuilder::new().xywh(35.2, 13.0, 18.0, 10.0).build();
        assert_eq!(det.rect.to_ltrb(), [26, 8, 44, 18]);
        assert_eq!(det.rect.center().x, 35);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let det = DetectionBuilder::new().confidence(1.7).build();
        assert_eq!(det.confidence, 1.0);
    }
}
