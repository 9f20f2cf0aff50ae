use serde::{Deserialize, Serialize};

use super::Scale;
use crate::geometry::{Point, segments_intersect};
use crate::tracker::TrackedEntity;

/// Traffic direction a line reacts to.
///
/// `ToDetector` means objects moving down the frame (towards the camera)
/// for horizontal lines, or from the negative to the non-negative side of
/// the line equation for oblique ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    ToDetector,
    FromDetector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineType {
    Horizontal,
    Oblique,
}

/// Directed segment that fires once per tracked object crossing it.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualLine {
    id: i64,
    source: [Point; 2],
    display: [Point; 2],
    scale: Scale,
    direction: Direction,
    crop_object: bool,
    detect_classes: Vec<String>,
}

impl VirtualLine {
    /// Line between two source-space endpoints, displayed at `scale`.
    pub fn new(id: i64, a: Point, b: Point, scale: Scale) -> Self {
        Self {
            id,
            source: [a, b],
            display: [scale.to_display(a), scale.to_display(b)],
            scale,
            direction: Direction::default(),
            crop_object: false,
            detect_classes: Vec::new(),
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_crop_object(mut self, crop_object: bool) -> Self {
        self.crop_object = crop_object;
        self
    }

    /// Restrict the line to the given class names. Empty means every class.
    pub fn with_detect_classes(mut self, classes: Vec<String>) -> Self {
        self.detect_classes = classes;
        self
    }

    /// Recompute display endpoints from the source endpoints.
    pub fn rescale(&mut self, scale: Scale) {
        self.scale = scale;
        self.display = [scale.to_display(self.source[0]), scale.to_display(self.source[1])];
    }

    #[inline]
    pub fn id(&self) -> i64 {
        self.id
    }

    #[inline]
    pub fn source_points(&self) -> [Point; 2] {
        self.source
    }

    #[inline]
    pub fn display_points(&self) -> [Point; 2] {
        self.display
    }

    #[inline]
    pub fn scale(&self) -> Scale {
        self.scale
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    #[inline]
    pub fn crop_object(&self) -> bool {
        self.crop_object
    }

    pub fn accepts_class(&self, class_name: &str) -> bool {
        self.detect_classes.is_empty() || self.detect_classes.iter().any(|c| c == class_name)
    }

    pub fn line_type(&self) -> LineType {
        if self.display[0].y == self.display[1].y {
            LineType::Horizontal
        } else {
            LineType::Oblique
        }
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.display[0] == self.display[1]
    }

    /// Whether the movement `prev -> curr` crosses the line in its direction.
    pub fn crossed(&self, prev: Point, curr: Point) -> bool {
        if self.is_degenerate() {
            return false;
        }
        let [l, r] = self.display;

        match self.line_type() {
            LineType::Horizontal => {
                if curr.x < l.x.min(r.x) || curr.x > l.x.max(r.x) {
                    return false;
                }
                let y = l.y;
                match self.direction {
                    Direction::ToDetector => prev.y <= y && curr.y > y,
                    Direction::FromDetector => prev.y > y && curr.y <= y,
                }
            }
            LineType::Oblique => {
                let side = |p: Point| -> i64 {
                    (l.y - r.y) as i64 * p.x as i64
                        + (r.x - l.x) as i64 * p.y as i64
                        + (l.x as i64 * r.y as i64 - r.x as i64 * l.y as i64)
                };
                let (fp, fc) = (side(prev), side(curr));
                let in_direction = match self.direction {
                    Direction::ToDetector => fp < 0 && fc >= 0,
                    Direction::FromDetector => fp >= 0 && fc < 0,
                };
                in_direction && segments_intersect(prev, curr, l, r)
            }
        }
    }

    /// Crossing check against the entity's last two track points.
    ///
    /// Fires at most once per entity: the first positive result latches the
    /// line on the entity.
    pub fn is_blob_crossed(&self, entity: &mut TrackedEntity) -> bool {
        if entity.has_crossed(self.id) {
            return false;
        }
        let Some((prev, curr)) = entity.last_two_points() else {
            return false;
        };
        if !self.crossed(prev, curr) {
            return false;
        }
        entity.mark_crossed(self.id);
        true
    }
}
