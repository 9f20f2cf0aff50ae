//! Orientation and segment intersection tests on integer points.
//!
//! Coordinates are widened to `i64` before any subtraction, so neither the
//! differences nor their products overflow for far apart points.

use super::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Collinear,
    Clockwise,
    CounterClockwise,
}

/// Z component of `(b - a) x (c - a)`.
#[inline]
pub fn cross_product(a: Point, b: Point, c: Point) -> i64 {
    let x1 = b.x as i64 - a.x as i64;
    let y1 = b.y as i64 - a.y as i64;
    let x2 = c.x as i64 - a.x as i64;
    let y2 = c.y as i64 - a.y as i64;
    x1 * y2 - y1 * x2
}

/// Orientation of the ordered triple `p -> q -> r`.
pub fn orientation(p: Point, q: Point, r: Point) -> Orientation {
    let val = (q.y as i64 - p.y as i64) * (r.x as i64 - q.x as i64)
        - (q.x as i64 - p.x as i64) * (r.y as i64 - q.y as i64);
    match val {
        0 => Orientation::Collinear,
        v if v > 0 => Orientation::Clockwise,
        _ => Orientation::CounterClockwise,
    }
}

/// Whether `q` lies within the bounding box of segment `pr`.
///
/// Only meaningful when `p`, `q` and `r` are collinear.
#[inline]
pub fn on_segment(p: Point, q: Point, r: Point) -> bool {
    q.x <= p.x.max(r.x) && q.x >= p.x.min(r.x) && q.y <= p.y.max(r.y) && q.y >= p.y.min(r.y)
}

/// Whether segment `p1q1` intersects segment `p2q2`, touching included.
pub fn segments_intersect(p1: Point, q1: Point, p2: Point, q2: Point) -> bool {
    let o1 = orientation(p1, q1, p2);
    let o2 = orientation(p1, q1, q2);
    let o3 = orientation(p2, q2, p1);
    let o4 = orientation(p2, q2, q1);

    if o1 != o2 && o3 != o4 {
        return true;
    }

    (o1 == Orientation::Collinear && on_segment(p1, p2, q1))
        || (o2 == Orientation::Collinear && on_segment(p1, q2, q1))
        || (o3 == Orientation::Collinear && on_segment(p2, p1, q2))
        || (o4 == Orientation::Collinear && on_segment(p2, q1, q2))
}
