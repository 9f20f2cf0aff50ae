//! Track-based speed estimation through a pixel to WGS84 mapping.

use chrono::{DateTime, Utc};
use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::{PerspectiveTransform, Point, haversine};
use crate::spatial::Scale;
use crate::tracker::{TrackHistory, TrackedEntity};

/// Speed in km/h between two source pixel positions.
///
/// `None` when no time passed between the two samples or a point cannot be
/// mapped.
pub fn estimate_speed(
    first: na::Point2<f32>,
    last: na::Point2<f32>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    transform: &PerspectiveTransform,
) -> Option<f32> {
    if end <= start {
        return None;
    }
    let hours = (end - start).num_microseconds()? as f64 / 3_600_000_000.0;
    let distance = haversine(transform.apply(first)?, transform.apply(last)?) as f64;
    let speed = (distance / hours) as f32;
    speed.is_finite().then_some(speed)
}

/// One calibration pair of the mapper: image pixel to `(longitude, latitude)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapperPoint {
    pub image_coordinates: [f32; 2],
    pub epsg4326: [f32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Wgs84Point {
    pub longitude: f32,
    pub latitude: f32,
}

/// Track point in source pixels with its geodetic position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackPoint {
    pub x: f32,
    pub y: f32,
    pub wgs84: Option<Wgs84Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackInfo {
    pub estimated_speed: Option<f32>,
    pub points: Vec<TrackPoint>,
}

/// Speed estimator working on display-space tracks.
///
/// Calibration points are given in source pixels, tracks live in display
/// pixels; points are scaled back before being mapped.
#[derive(Debug, Clone)]
pub struct SpeedEstimator {
    transform: PerspectiveTransform,
    scale: Scale,
}

impl SpeedEstimator {
    pub fn new(transform: PerspectiveTransform, scale: Scale) -> Self {
        Self { transform, scale }
    }

    /// Build from exactly four mapper pairs.
    pub fn from_mapper(mapper: &[MapperPoint], scale: Scale) -> Result<Self> {
        let src: Vec<na::Point2<f32>> = mapper
            .iter()
            .map(|m| na::Point2::new(m.image_coordinates[0], m.image_coordinates[1]))
            .collect();
        let dst: Vec<na::Point2<f32>> = mapper
            .iter()
            .map(|m| na::Point2::new(m.epsg4326[0], m.epsg4326[1]))
            .collect();
        Ok(Self::new(PerspectiveTransform::from_pairs(&src, &dst)?, scale))
    }

    #[inline]
    pub fn transform(&self) -> &PerspectiveTransform {
        &self.transform
    }

    /// Display point to `(longitude, latitude)`.
    pub fn to_wgs84(&self, p: Point) -> Option<Wgs84Point> {
        let mapped = self.transform.apply(self.scale.to_source(p))?;
        Some(Wgs84Point {
            longitude: mapped.x,
            latitude: mapped.y,
        })
    }

    /// Speed between the oldest and the newest point of a track.
    pub fn estimate(&self, history: &TrackHistory) -> Option<f32> {
        if history.len() < 2 {
            return None;
        }
        let (first, start) = history.first()?;
        let (last, end) = history.last()?;
        estimate_speed(
            self.scale.to_source(first),
            self.scale.to_source(last),
            start,
            end,
            &self.transform,
        )
    }

    /// Track of the entity in source pixels and WGS84, with its speed.
    pub fn track_info(&self, entity: &TrackedEntity) -> TrackInfo {
        let points = entity
            .history()
            .points()
            .map(|p| {
                let source = self.scale.to_source(p);
                TrackPoint {
                    x: source.x,
                    y: source.y,
                    wgs84: self.to_wgs84(p),
                }
            })
            .collect();
        TrackInfo {
            estimated_speed: entity.estimated_speed(),
            points,
        }
    }
}
