//! Bounded track of center points with their timestamps.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::geometry::Point;

/// Time ordered `(point, timestamp)` pairs, oldest first.
///
/// Holding both in one entry keeps points and timestamps the same length.
#[derive(Debug, Clone)]
pub struct TrackHistory {
    entries: VecDeque<(Point, DateTime<Utc>)>,
    max_len: usize,
}

impl TrackHistory {
    /// `max_len` of zero is treated as one.
    pub fn new(max_len: usize) -> Self {
        let max_len = max_len.max(1);
        Self {
            entries: VecDeque::with_capacity(max_len),
            max_len,
        }
    }

    /// Append a point, dropping the oldest ones beyond the bound.
    pub fn push(&mut self, point: Point, timestamp: DateTime<Utc>) {
        while self.entries.len() >= self.max_len {
            self.entries.pop_front();
        }
        self.entries.push_back((point, timestamp));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn points(&self) -> impl ExactSizeIterator<Item = Point> + '_ {
        self.entries.iter().map(|(p, _)| *p)
    }

    pub fn timestamps(&self) -> impl ExactSizeIterator<Item = DateTime<Utc>> + '_ {
        self.entries.iter().map(|(_, t)| *t)
    }

    #[inline]
    pub fn first(&self) -> Option<(Point, DateTime<Utc>)> {
        self.entries.front().copied()
    }

    #[inline]
    pub fn last(&self) -> Option<(Point, DateTime<Utc>)> {
        self.entries.back().copied()
    }

    /// Previous and current points.
    pub fn last_two(&self) -> Option<(Point, Point)> {
        let n = self.entries.len();
        if n < 2 {
            return None;
        }
        Some((self.entries[n - 2].0, self.entries[n - 1].0))
    }
}
