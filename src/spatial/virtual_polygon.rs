use super::Scale;
use crate::error::{Error, Result};
use crate::geometry::{Orientation, Point, cross_product, on_segment, orientation};
use crate::tracker::TrackedEntity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonKind {
    Convex,
    Concave,
}

impl PolygonKind {
    /// Classify a closed vertex sequence by the sign of consecutive cross
    /// products. Collinear triples are skipped; fewer than 3 vertices count
    /// as concave.
    pub fn classify(points: &[Point]) -> Self {
        let n = points.len();
        if n < 3 {
            return PolygonKind::Concave;
        }

        let mut sign = 0i64;
        for i in 0..n {
            let cross = cross_product(points[i], points[(i + 1) % n], points[(i + 2) % n]);
            if cross == 0 {
                continue;
            }
            let s = cross.signum();
            if sign == 0 {
                sign = s;
            } else if s != sign {
                return PolygonKind::Concave;
            }
        }
        PolygonKind::Convex
    }
}

/// Closed region raising enter/leave events for tracked objects.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualPolygon {
    id: i64,
    source: Vec<Point>,
    display: Vec<Point>,
    scale: Scale,
    kind: PolygonKind,
    detect_classes: Vec<String>,
}

impl VirtualPolygon {
    pub fn new(id: i64, points: Vec<Point>, scale: Scale) -> Result<Self> {
        if points.len() < 3 {
            return Err(Error::InvalidPolygon {
                id,
                got: points.len(),
            });
        }
        let kind = PolygonKind::classify(&points);
        let display = points.iter().map(|p| scale.to_display(*p)).collect();
        Ok(Self {
            id,
            source: points,
            display,
            scale,
            kind,
            detect_classes: Vec::new(),
        })
    }

    /// Restrict the polygon to the given class names. Empty means every class.
    pub fn with_detect_classes(mut self, classes: Vec<String>) -> Self {
        self.detect_classes = classes;
        self
    }

    /// Recompute display vertices from the source vertices.
    pub fn rescale(&mut self, scale: Scale) {
        self.scale = scale;
        self.display = self.source.iter().map(|p| scale.to_display(*p)).collect();
    }

    #[inline]
    pub fn id(&self) -> i64 {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> PolygonKind {
        self.kind
    }

    #[inline]
    pub fn source_points(&self) -> &[Point] {
        &self.source
    }

    #[inline]
    pub fn display_points(&self) -> &[Point] {
        &self.display
    }

    #[inline]
    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn accepts_class(&self, class_name: &str) -> bool {
        self.detect_classes.is_empty() || self.detect_classes.iter().any(|c| c == class_name)
    }

    /// Point-in-polygon on display vertices, boundary inclusive.
    ///
    /// Even-odd rule with a ray towards +x. Edges are treated as half-open
    /// in y so a ray passing through a vertex is counted once.
    pub fn contains_point(&self, p: Point) -> bool {
        let pts = &self.display;
        let n = pts.len();
        if n < 3 {
            return false;
        }

        let mut inside = false;
        for i in 0..n {
            let a = pts[i];
            let b = pts[(i + 1) % n];

            if orientation(a, p, b) == Orientation::Collinear && on_segment(a, p, b) {
                return true;
            }

            if (a.y > p.y) != (b.y > p.y) {
                let cross = cross_product(a, b, p);
                if (b.y > a.y) == (cross > 0) {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Whether the entity's current center lies in the polygon.
    pub fn contains_blob(&self, entity: &TrackedEntity) -> bool {
        entity
            .last_point()
            .is_some_and(|center| self.contains_point(center))
    }

    /// Previous track point outside, current one inside.
    pub fn blob_entered(&self, entity: &TrackedEntity) -> bool {
        entity
            .last_two_points()
            .is_some_and(|(prev, curr)| !self.contains_point(prev) && self.contains_point(curr))
    }

    /// Previous track point inside, current one outside.
    pub fn blob_left(&self, entity: &TrackedEntity) -> bool {
        entity
            .last_two_points()
            .is_some_and(|(prev, curr)| self.contains_point(prev) && !self.contains_point(curr))
    }
}
