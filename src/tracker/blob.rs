//! Tracked entity ("blob"): one object followed across frames.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use crate::geometry::{Point, Rect};
use crate::tracker::history::TrackHistory;
use crate::tracker::kalman_filter::{KalmanFilter, KalmanState};
use crate::tracker::matching::Detection;
use crate::tracker::track_state::TrackState;

/// Global entity ID counter for unique ID generation.
static TRACK_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_track_id() -> u64 {
    TRACK_ID_COUNTER.fetch_add(1, Ordering::SeqCst) + 1
}

/// Motion model of an entity.
#[derive(Debug, Clone)]
pub enum Motion {
    /// Last detection is the position estimate
    Simple,
    /// Kalman filtered position; `predicted` is the prior for the current frame
    Kalman {
        state: KalmanState,
        predicted: Option<Rect>,
    },
}

#[derive(Debug, Clone)]
pub struct TrackedEntity {
    id: u64,
    class_id: i32,
    class_name: String,
    confidence: f32,
    rect: Rect,
    history: TrackHistory,
    motion: Motion,
    state: TrackState,
    no_match: u32,
    tracking: bool,
    crossed_lines: HashSet<i64>,
    estimated_speed: Option<f32>,
}

impl TrackedEntity {
    /// Entity following the simple motion model.
    pub fn new(detection: &Detection, timestamp: DateTime<Utc>, max_points: usize) -> Self {
        let mut history = TrackHistory::new(max_points);
        history.push(detection.rect.center(), timestamp);
        Self {
            id: next_track_id(),
            class_id: detection.class_id,
            class_name: detection.class_name.clone(),
            confidence: detection.confidence,
            rect: detection.rect,
            history,
            motion: Motion::Simple,
            state: TrackState::New,
            no_match: 0,
            tracking: true,
            crossed_lines: HashSet::new(),
            estimated_speed: None,
        }
    }

    /// Entity following the Kalman motion model.
    pub fn new_kalman(
        detection: &Detection,
        timestamp: DateTime<Utc>,
        max_points: usize,
        kalman_filter: &KalmanFilter,
    ) -> Self {
        let mut entity = Self::new(detection, timestamp, max_points);
        entity.motion = Motion::Kalman {
            state: kalman_filter.initiate(detection.rect.to_xyah()),
            predicted: None,
        };
        entity
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn class_id(&self) -> i32 {
        self.class_id
    }

    #[inline]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    #[inline]
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Current bounding box: last detection, or the filter posterior.
    #[inline]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Box used for association in the current frame.
    pub fn match_rect(&self) -> Rect {
        match &self.motion {
            Motion::Kalman {
                predicted: Some(r), ..
            } => *r,
            _ => self.rect,
        }
    }

    #[inline]
    pub fn history(&self) -> &TrackHistory {
        &self.history
    }

    #[inline]
    pub fn last_point(&self) -> Option<Point> {
        self.history.last().map(|(p, _)| p)
    }

    #[inline]
    pub fn last_two_points(&self) -> Option<(Point, Point)> {
        self.history.last_two()
    }

    #[inline]
    pub fn motion(&self) -> &Motion {
        &self.motion
    }

    #[inline]
    pub fn is_kalman(&self) -> bool {
        matches!(self.motion, Motion::Kalman { .. })
    }

    #[inline]
    pub fn state(&self) -> TrackState {
        self.state
    }

    #[inline]
    pub fn no_match_count(&self) -> u32 {
        self.no_match
    }

    #[inline]
    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Exclude the entity from line and polygon evaluation.
    pub fn stop_tracking(&mut self) {
        self.tracking = false;
    }

    #[inline]
    pub fn has_crossed(&self, line_id: i64) -> bool {
        self.crossed_lines.contains(&line_id)
    }

    /// Latch a line as crossed. Returns `false` when already latched.
    pub fn mark_crossed(&mut self, line_id: i64) -> bool {
        self.crossed_lines.insert(line_id)
    }

    #[inline]
    pub fn estimated_speed(&self) -> Option<f32> {
        self.estimated_speed
    }

    pub fn set_estimated_speed(&mut self, speed: Option<f32>) {
        self.estimated_speed = speed;
    }

    /// Advance the filter one frame. No-op for the simple model.
    pub fn predict(&mut self, kalman_filter: &KalmanFilter) {
        if let Motion::Kalman { state, predicted } = &mut self.motion {
            let mut prior = state.clone();
            if self.state != TrackState::Active {
                // height velocity of a missed track is unreliable
                prior.mean[7] = 0.0;
            }
            *state = kalman_filter.predict(&prior);
            let [cx, cy, a, h] = state.xyah();
            *predicted = Some(Rect::from_xyah(cx, cy, a, h));
        }
    }

    /// Apply a matched detection.
    pub fn observe(
        &mut self,
        detection: &Detection,
        timestamp: DateTime<Utc>,
        kalman_filter: &KalmanFilter,
    ) {
        self.history.push(detection.rect.center(), timestamp);
        self.confidence = detection.confidence;
        self.no_match = 0;
        self.state = TrackState::Active;

        match &mut self.motion {
            Motion::Simple => {
                self.rect = detection.rect;
            }
            Motion::Kalman { state, predicted } => {
                if let Some(posterior) = kalman_filter.update(state, detection.rect.to_xyah()) {
                    *state = posterior;
                }
                let [cx, cy, a, h] = state.xyah();
                self.rect = Rect::from_xyah(cx, cy, a, h);
                *predicted = None;
                self.class_id = detection.class_id;
                self.class_name.clone_from(&detection.class_name);
            }
        }
    }

    /// Register a frame without a match. Returns the new no-match count.
    pub fn mark_missed(&mut self) -> u32 {
        self.no_match = self.no_match.saturating_add(1);
        self.state = TrackState::Stale;
        if let Motion::Kalman { predicted, .. } = &mut self.motion {
            *predicted = None;
        }
        self.no_match
    }

    pub fn mark_evicted(&mut self) {
        self.state = TrackState::Evicted;
    }
}
