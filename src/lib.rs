//! Object detection and monitoring core.
//!
//! Consumes per-frame detections produced by an external detector, keeps
//! persistent tracks of the detected objects and raises spatial events when
//! a tracked object crosses a virtual line or enters/leaves a virtual
//! polygon. Optionally estimates object speed through a pixel→WGS84
//! perspective transform and forwards events to a remote collector.

pub mod config;
pub mod error;
pub mod events;
pub mod geometry;
pub mod integration;
pub mod spatial;
pub mod speed;
pub mod tracker;

pub use config::{RawSettings, Settings};
pub use error::{Error, Result};
pub use events::{Event, EventKind, SpatialObjectKind, SpatialObjectRef};
pub use geometry::{Point, Rect};
pub use integration::{DetectionBuilder, DetectionSource, Pipeline};
pub use spatial::{Scale, VirtualLine, VirtualPolygon};
pub use speed::SpeedEstimator;
pub use tracker::{Detection, TrackStore, TrackedEntity, TrackerConfig};
