//! Per-frame driver: detections to tracks to spatial events.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::Result;
use crate::events::{Event, EventKind, SpatialObjectRef};
use crate::geometry::Point;
use crate::spatial::{VirtualLine, VirtualPolygon};
use crate::speed::TrackInfo;
use crate::tracker::{Detection, EntitySnapshot, MatchReport, TrackStore, TrackedEntity};

use super::DetectionSource;

/// Track store shared between the pipeline (writer) and renderers (readers).
pub type SharedTrackStore = Arc<RwLock<TrackStore>>;

/// An event together with everything needed to forward it.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub event: Event,
    /// Entity state at the time of the event
    pub entity: EntitySnapshot,
    /// Source-space geometry of the line or polygon
    pub source_geometry: Vec<Point>,
    /// Forward a crop of the entity instead of the full frame
    pub crop_object: bool,
    pub track_info: Option<TrackInfo>,
}

/// Runs one frame at a time through matching, speed estimation and the
/// line/polygon predicates.
pub struct Pipeline {
    settings: Arc<Settings>,
    store: SharedTrackStore,
    /// ENTER events waiting for their LEAVE, per (entity, polygon)
    visits: HashMap<(u64, i64), Event>,
}

impl Pipeline {
    pub fn new(settings: Arc<Settings>) -> Self {
        let store = Arc::new(RwLock::new(TrackStore::new(settings.tracker.clone())));
        Self {
            settings,
            store,
            visits: HashMap::new(),
        }
    }

    #[inline]
    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    /// Handle to the track store for concurrent readers.
    pub fn store(&self) -> SharedTrackStore {
        Arc::clone(&self.store)
    }

    pub fn lines(&self) -> &[VirtualLine] {
        &self.settings.lines
    }

    pub fn polygons(&self) -> &[VirtualPolygon] {
        &self.settings.polygons
    }

    /// Current entities, for rendering.
    pub fn snapshot(&self) -> Vec<EntitySnapshot> {
        self.store.read().snapshot()
    }

    /// Number of polygon visits waiting for a leave event.
    pub fn open_visits(&self) -> usize {
        self.visits.len()
    }

    /// Detect on one frame of `width` x `height` source pixels, map the
    /// boxes onto the reduced frame and apply them.
    pub fn process_frame<D: DetectionSource>(
        &mut self,
        detector: &mut D,
        input: &[u8],
        width: u32,
        height: u32,
        timestamp: DateTime<Utc>,
    ) -> std::result::Result<Vec<Trigger>, D::Error> {
        let scale = self.settings.scale();
        let detections: Vec<Detection> = detector
            .detect(input, width, height)?
            .into_iter()
            .map(|mut d| {
                d.rect = scale.rect_to_display(d.rect);
                d
            })
            .collect();
        Ok(self.apply_detections(&detections, timestamp))
    }

    /// Apply one frame of detections (display coordinates) and return the
    /// events it raised.
    pub fn apply_detections(
        &mut self,
        detections: &[Detection],
        timestamp: DateTime<Utc>,
    ) -> Vec<Trigger> {
        let settings = Arc::clone(&self.settings);
        let shared = Arc::clone(&self.store);
        let mut store = shared.write();

        let report = store.match_detections(detections, timestamp);
        self.forget_evicted(&report);

        if let Some(estimator) = &settings.speed_estimator {
            for entity in store.iter_mut() {
                if entity.history().len() >= 2 {
                    let speed = estimator.estimate(entity.history());
                    entity.set_estimated_speed(speed);
                }
            }
        }

        let mut triggers = Vec::new();

        for line in &settings.lines {
            for entity in store.iter_mut() {
                if !entity.is_tracking() || !line.accepts_class(entity.class_name()) {
                    continue;
                }
                if !line.is_blob_crossed(entity) {
                    continue;
                }
                entity.stop_tracking();

                let object = SpatialObjectRef::line(line.id());
                match Event::at(EventKind::CrossLine, object, entity.id(), None, timestamp) {
                    Ok(event) => {
                        info!(
                            line_id = line.id(),
                            entity_id = entity.id(),
                            class = entity.class_name(),
                            "line crossed"
                        );
                        let geometry = line.source_points().to_vec();
                        triggers.push(self.trigger(event, entity, geometry, line.crop_object()));
                    }
                    Err(err) => debug!(%err, "cross line event dropped"),
                }
            }
        }

        for polygon in &settings.polygons {
            for entity in store.iter_mut() {
                if !entity.is_tracking() || !polygon.accepts_class(entity.class_name()) {
                    continue;
                }
                if let Some(event) = self.polygon_event(polygon, entity, timestamp) {
                    let geometry = polygon.source_points().to_vec();
                    triggers.push(self.trigger(event, entity, geometry, false));
                }
            }
        }

        triggers
    }

    fn polygon_event(
        &mut self,
        polygon: &VirtualPolygon,
        entity: &TrackedEntity,
        timestamp: DateTime<Utc>,
    ) -> Option<Event> {
        let key = (entity.id(), polygon.id());
        let object = SpatialObjectRef::polygon(polygon.id());

        if polygon.blob_entered(entity) {
            let event = self.checked(Event::at(
                EventKind::EnterPolygon,
                object,
                entity.id(),
                None,
                timestamp,
            ))?;
            info!(polygon_id = polygon.id(), entity_id = entity.id(), "polygon entered");
            self.visits.insert(key, event.clone());
            return Some(event);
        }

        if polygon.blob_left(entity) {
            let Some(enter) = self.visits.remove(&key) else {
                debug!(
                    polygon_id = polygon.id(),
                    entity_id = entity.id(),
                    "leave without a recorded enter, skipped"
                );
                return None;
            };
            let event = self.checked(Event::at(
                EventKind::LeavePolygon,
                object,
                entity.id(),
                Some(&enter),
                timestamp,
            ))?;
            info!(polygon_id = polygon.id(), entity_id = entity.id(), "polygon left");
            return Some(event);
        }

        None
    }

    fn checked(&self, event: Result<Event>) -> Option<Event> {
        event.map_err(|err| debug!(%err, "event dropped")).ok()
    }

    fn trigger(
        &self,
        event: Event,
        entity: &TrackedEntity,
        source_geometry: Vec<Point>,
        crop_object: bool,
    ) -> Trigger {
        let track_info = match (&self.settings.speed_estimator, self.settings.send_track_info) {
            (Some(estimator), true) => Some(estimator.track_info(entity)),
            _ => None,
        };
        Trigger {
            event,
            entity: EntitySnapshot::from(entity),
            source_geometry,
            crop_object,
            track_info,
        }
    }

    fn forget_evicted(&mut self, report: &MatchReport) {
        if report.evicted.is_empty() {
            return;
        }
        self.visits
            .retain(|(entity_id, _), _| !report.evicted.contains(entity_id));
    }
}
