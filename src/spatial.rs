//! Virtual lines and polygons: user-configured trigger regions in image space.
//!
//! Both keep their *source* (full resolution) coordinates as the only input
//! and derive *display* (reduced resolution) coordinates from the current
//! [`Scale`]. Tracks are produced on the display frame, so every predicate
//! works on display coordinates.

mod scale;
mod virtual_line;
mod virtual_polygon;

pub use scale::Scale;
pub use virtual_line::{Direction, LineType, VirtualLine};
pub use virtual_polygon::{PolygonKind, VirtualPolygon};
