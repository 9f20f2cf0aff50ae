mod haversine;
mod perspective;
mod point;
mod rect;
mod segment;

pub use haversine::{EARTH_RADIUS_KM, haversine};
pub use perspective::PerspectiveTransform;
pub use point::Point;
pub use rect::{Rect, iou_batch};
pub use segment::{Orientation, cross_product, on_segment, orientation, segments_intersect};
