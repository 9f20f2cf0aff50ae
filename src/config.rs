//! Typed settings.
//!
//! [`RawSettings`] mirrors the JSON layout users write; [`Settings::prepare`]
//! normalises it once into the immutable snapshot the pipeline runs on.
//! Anything invalid is defaulted or disabled with a warning, never fatal.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Error;
use crate::geometry::Point;
use crate::spatial::{Direction, Scale, VirtualLine, VirtualPolygon};
use crate::speed::{MapperPoint, SpeedEstimator};
use crate::tracker::{MatchStrategy, TrackerConfig, TrackerKind};

pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 360;
pub const DEFAULT_MAX_POINTS_IN_TRACK: usize = 10;
pub const DEFAULT_FORWARD_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSettings {
    pub video_settings: RawVideoSettings,
    pub tracker_settings: RawTrackerSettings,
    #[serde(alias = "forwarding")]
    pub grpc_settings: RawForwardingSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawVideoSettings {
    pub source: String,
    pub width: i32,
    pub height: i32,
    pub reduced_width: i32,
    pub reduced_height: i32,
    pub camera_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTrackerSettings {
    /// `simple` or `kalman`
    pub tracker_type: String,
    pub max_points_in_track: i32,
    pub max_no_match: Option<u32>,
    pub min_iou: Option<f32>,
    pub match_strategy: Option<MatchStrategy>,
    pub lines_settings: Vec<RawLineSettings>,
    pub polygons_settings: Vec<RawPolygonSettings>,
    pub speed_estimation_settings: RawSpeedEstimationSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawLineSettings {
    pub line_id: i64,
    pub begin: [i32; 2],
    pub end: [i32; 2],
    /// `to_detector` or `from_detector`
    pub direction: String,
    pub detect_classes: Vec<String>,
    /// `crop` or `no_crop`
    pub crop_mode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPolygonSettings {
    pub polygon_id: i64,
    pub coordinates: Vec<[i32; 2]>,
    pub detect_classes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSpeedEstimationSettings {
    pub enabled: bool,
    /// Attach track info (points and speed) to forwarded events
    #[serde(alias = "send_grpc")]
    pub send_track_info: bool,
    pub mapper: Vec<MapperPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawForwardingSettings {
    pub enable: bool,
    pub server_ip: String,
    pub server_port: u16,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoSettings {
    pub source: String,
    pub camera_id: String,
    pub width: u32,
    pub height: u32,
    pub reduced_width: u32,
    pub reduced_height: u32,
    /// Full frame over reduced frame
    pub scale: Scale,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForwardingSettings {
    pub enable: bool,
    pub server_ip: String,
    pub server_port: u16,
    pub timeout: Duration,
}

impl Default for ForwardingSettings {
    fn default() -> Self {
        Self {
            enable: false,
            server_ip: String::new(),
            server_port: 0,
            timeout: DEFAULT_FORWARD_TIMEOUT,
        }
    }
}

/// Normalised, immutable configuration snapshot.
#[derive(Debug, Clone)]
pub struct Settings {
    pub video: VideoSettings,
    pub tracker: TrackerConfig,
    pub lines: Vec<VirtualLine>,
    pub polygons: Vec<VirtualPolygon>,
    /// `None` when speed estimation is disabled or misconfigured
    pub speed_estimator: Option<SpeedEstimator>,
    pub send_track_info: bool,
    pub forwarding: ForwardingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self::prepare(RawSettings::default())
    }
}

impl Settings {
    pub fn prepare(raw: RawSettings) -> Self {
        let video = prepare_video(raw.video_settings);
        let scale = video.scale;
        let raw_tracker = raw.tracker_settings;

        let tracker = prepare_tracker(&raw_tracker);

        if raw_tracker.lines_settings.is_empty() {
            warn!("no 'lines_settings', line crossing is disabled");
        }
        let lines = raw_tracker
            .lines_settings
            .into_iter()
            .filter_map(|l| prepare_line(l, scale))
            .collect();

        if raw_tracker.polygons_settings.is_empty() {
            warn!("no 'polygons_settings', polygon events are disabled");
        }
        let polygons = raw_tracker
            .polygons_settings
            .into_iter()
            .filter_map(|p| prepare_polygon(p, scale))
            .collect();

        let speed = raw_tracker.speed_estimation_settings;
        let speed_estimator = if speed.enabled {
            match SpeedEstimator::from_mapper(&speed.mapper, scale) {
                Ok(estimator) => Some(estimator),
                Err(err) => {
                    warn!(%err, "speed estimation is disabled");
                    None
                }
            }
        } else {
            None
        };
        let send_track_info = speed.send_track_info && speed_estimator.is_some();

        let forwarding = ForwardingSettings {
            enable: raw.grpc_settings.enable,
            server_ip: raw.grpc_settings.server_ip,
            server_port: raw.grpc_settings.server_port,
            timeout: raw
                .grpc_settings
                .timeout_secs
                .map_or(DEFAULT_FORWARD_TIMEOUT, Duration::from_secs),
        };

        Self {
            video,
            tracker,
            lines,
            polygons,
            speed_estimator,
            send_track_info,
            forwarding,
        }
    }

    #[inline]
    pub fn scale(&self) -> Scale {
        self.video.scale
    }
}

fn positive_or(value: i32, default: u32, field: &str) -> u32 {
    if value <= 0 {
        warn!(field, default, "'video_settings' field is missing or <= 0, using default");
        default
    } else {
        value as u32
    }
}

fn prepare_video(raw: RawVideoSettings) -> VideoSettings {
    let width = positive_or(raw.width, DEFAULT_WIDTH, "width");
    let height = positive_or(raw.height, DEFAULT_HEIGHT, "height");
    let mut reduced_width = positive_or(raw.reduced_width, width, "reduced_width");
    let mut reduced_height = positive_or(raw.reduced_height, height, "reduced_height");

    if reduced_width > width {
        warn!(reduced_width, width, "'reduced_width' > 'width', using reduced_width = width");
        reduced_width = width;
    }
    if reduced_height > height {
        warn!(reduced_height, height, "'reduced_height' > 'height', using reduced_height = height");
        reduced_height = height;
    }

    VideoSettings {
        source: raw.source,
        camera_id: raw.camera_id,
        width,
        height,
        reduced_width,
        reduced_height,
        scale: Scale::from_dims(width, height, reduced_width, reduced_height),
    }
}

fn prepare_tracker(raw: &RawTrackerSettings) -> TrackerConfig {
    let defaults = TrackerConfig::default();

    let kind = match raw.tracker_type.to_lowercase().as_str() {
        "simple" => TrackerKind::Simple,
        "kalman" => TrackerKind::Kalman,
        "" => {
            warn!("'tracker_type' is empty, using 'simple'");
            TrackerKind::Simple
        }
        other => {
            warn!(tracker_type = other, "'tracker_type' is not supported, using 'simple'");
            TrackerKind::Simple
        }
    };

    let max_points_in_track = if raw.max_points_in_track < 1 {
        warn!(
            got = raw.max_points_in_track,
            "'max_points_in_track' should be >= 1, using {DEFAULT_MAX_POINTS_IN_TRACK}"
        );
        DEFAULT_MAX_POINTS_IN_TRACK
    } else {
        raw.max_points_in_track as usize
    };

    let min_iou = match raw.min_iou {
        Some(v) if (0.0..=1.0).contains(&v) => v,
        Some(v) => {
            warn!(min_iou = v, "'min_iou' must be within [0, 1], using {}", defaults.min_iou);
            defaults.min_iou
        }
        None => defaults.min_iou,
    };

    TrackerConfig {
        kind,
        strategy: raw.match_strategy.unwrap_or(defaults.strategy),
        min_iou,
        max_no_match: raw.max_no_match.unwrap_or(defaults.max_no_match),
        max_points_in_track,
    }
}

fn prepare_line(raw: RawLineSettings, scale: Scale) -> Option<VirtualLine> {
    let begin = Point::from(raw.begin);
    let end = Point::from(raw.end);
    if begin == end {
        let err = Error::DegenerateLine { id: raw.line_id };
        warn!(%err, "line is skipped");
        return None;
    }

    let direction = match raw.direction.as_str() {
        "from_detector" => Direction::FromDetector,
        "to_detector" | "" => Direction::ToDetector,
        other => {
            warn!(line_id = raw.line_id, direction = other, "unknown 'direction', using 'to_detector'");
            Direction::ToDetector
        }
    };

    let crop_object = match raw.crop_mode.as_str() {
        "crop" => true,
        "no_crop" => false,
        other => {
            warn!(line_id = raw.line_id, crop_mode = other, "unknown 'crop_mode', using 'crop'");
            true
        }
    };

    Some(
        VirtualLine::new(raw.line_id, begin, end, scale)
            .with_direction(direction)
            .with_crop_object(crop_object)
            .with_detect_classes(raw.detect_classes),
    )
}

fn prepare_polygon(raw: RawPolygonSettings, scale: Scale) -> Option<VirtualPolygon> {
    let points = raw.coordinates.iter().copied().map(Point::from).collect();
    match VirtualPolygon::new(raw.polygon_id, points, scale) {
        Ok(polygon) => Some(polygon.with_detect_classes(raw.detect_classes)),
        Err(err) => {
            warn!(%err, "polygon is skipped");
            None
        }
    }
}
