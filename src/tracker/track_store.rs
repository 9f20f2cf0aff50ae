//! Entity registry and per-frame association.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{Point, Rect, iou_batch};
use crate::tracker::blob::TrackedEntity;
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::{self, AssignmentResult, Detection, MatchStrategy};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerKind {
    #[default]
    Simple,
    Kalman,
}

/// Configuration for the [`TrackStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub kind: TrackerKind,
    pub strategy: MatchStrategy,
    /// Minimum IoU for a detection to continue an entity
    pub min_iou: f32,
    /// Consecutive misses tolerated before eviction
    pub max_no_match: u32,
    /// Bound of each entity's history
    pub max_points_in_track: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            kind: TrackerKind::Simple,
            strategy: MatchStrategy::Greedy,
            min_iou: 0.3,
            max_no_match: 5,
            max_points_in_track: 10,
        }
    }
}

/// Outcome of one [`TrackStore::match_detections`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchReport {
    pub matched: Vec<u64>,
    pub created: Vec<u64>,
    pub evicted: Vec<u64>,
}

/// Read-only view of an entity for renderers and forwarders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySnapshot {
    pub id: u64,
    pub class_id: i32,
    pub class_name: String,
    pub rect: Rect,
    pub track: Vec<Point>,
    pub estimated_speed: Option<f32>,
    pub tracking: bool,
}

impl From<&TrackedEntity> for EntitySnapshot {
    fn from(e: &TrackedEntity) -> Self {
        Self {
            id: e.id(),
            class_id: e.class_id(),
            class_name: e.class_name().to_owned(),
            rect: e.rect(),
            track: e.history().points().collect(),
            estimated_speed: e.estimated_speed(),
            tracking: e.is_tracking(),
        }
    }
}

pub struct TrackStore {
    config: TrackerConfig,
    /// Kept in creation order
    entities: Vec<TrackedEntity>,
    kalman_filter: KalmanFilter,
}

impl TrackStore {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            entities: Vec::new(),
            kalman_filter: KalmanFilter::default(),
        }
    }

    #[inline]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&TrackedEntity> {
        self.entities.iter().find(|e| e.id() == id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut TrackedEntity> {
        self.entities.iter_mut().find(|e| e.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedEntity> {
        self.entities.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TrackedEntity> {
        self.entities.iter_mut()
    }

    pub fn snapshot(&self) -> Vec<EntitySnapshot> {
        self.entities.iter().map(EntitySnapshot::from).collect()
    }

    pub fn clear(&mut self) {
        self.entities.clear();
    }

    /// Associate one frame of detections with the known entities.
    ///
    /// Matched entities get the detection center appended to their track,
    /// unmatched detections start new entities and entities missed more
    /// than `max_no_match` times in a row are evicted.
    pub fn match_detections(
        &mut self,
        detections: &[Detection],
        timestamp: DateTime<Utc>,
    ) -> MatchReport {
        for entity in self.entities.iter_mut() {
            entity.predict(&self.kalman_filter);
        }

        let entity_rects: Vec<Rect> = self.entities.iter().map(|e| e.match_rect()).collect();
        let det_rects: Vec<Rect> = detections.iter().map(|d| d.rect).collect();
        let affinity = iou_batch(&entity_rects, &det_rects);

        let AssignmentResult {
            matches,
            unmatched_tracks,
            unmatched_detections,
        } = matching::assign(&affinity, self.config.min_iou, self.config.strategy);

        let mut report = MatchReport::default();

        for (ientity, idet) in matches {
            let entity = &mut self.entities[ientity];
            entity.observe(&detections[idet], timestamp, &self.kalman_filter);
            report.matched.push(entity.id());
        }

        let mut evict = vec![false; self.entities.len()];
        for ientity in unmatched_tracks {
            let entity = &mut self.entities[ientity];
            if entity.mark_missed() > self.config.max_no_match {
                entity.mark_evicted();
                evict[ientity] = true;
                report.evicted.push(entity.id());
                debug!(id = entity.id(), class = entity.class_name(), "entity evicted");
            }
        }
        if !report.evicted.is_empty() {
            let mut flags = evict.into_iter();
            self.entities.retain(|_| !flags.next().unwrap_or(false));
        }

        for idet in unmatched_detections {
            let entity = self.spawn(&detections[idet], timestamp);
            report.created.push(entity.id());
            self.entities.push(entity);
        }

        report
    }

    fn spawn(&self, detection: &Detection, timestamp: DateTime<Utc>) -> TrackedEntity {
        let max_points = self.config.max_points_in_track;
        match self.config.kind {
            TrackerKind::Simple => TrackedEntity::new(detection, timestamp, max_points),
            TrackerKind::Kalman => {
                TrackedEntity::new_kalman(detection, timestamp, max_points, &self.kalman_filter)
            }
        }
    }
}
