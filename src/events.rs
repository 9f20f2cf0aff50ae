//! Spatial events raised by virtual lines and polygons.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    CrossLine,
    EnterPolygon,
    LeavePolygon,
}

impl EventKind {
    /// Whether an event of this kind must link to a preceding event.
    #[inline]
    pub fn requires_previous(self) -> bool {
        matches!(self, EventKind::LeavePolygon)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::CrossLine => "EVENT_CROSS_LINE",
            EventKind::EnterPolygon => "EVENT_ENTER_POLYGON",
            EventKind::LeavePolygon => "EVENT_LEAVE_POLYGON",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialObjectKind {
    VirtualLine,
    VirtualPolygon,
}

/// Line or polygon an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpatialObjectRef {
    pub id: i64,
    pub kind: SpatialObjectKind,
}

impl SpatialObjectRef {
    #[inline]
    pub const fn line(id: i64) -> Self {
        Self {
            id,
            kind: SpatialObjectKind::VirtualLine,
        }
    }

    #[inline]
    pub const fn polygon(id: i64) -> Self {
        Self {
            id,
            kind: SpatialObjectKind::VirtualPolygon,
        }
    }
}

/// Immutable record of something a tracked object did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    id: Uuid,
    kind: EventKind,
    timestamp: DateTime<Utc>,
    previous: Option<Uuid>,
    spatial_object: SpatialObjectRef,
    entity_id: u64,
}

impl Event {
    /// New event stamped with the current UTC time.
    ///
    /// `LeavePolygon` requires `previous`; other kinds ignore it.
    pub fn new(
        kind: EventKind,
        spatial_object: SpatialObjectRef,
        entity_id: u64,
        previous: Option<&Event>,
    ) -> Result<Self> {
        Self::at(kind, spatial_object, entity_id, previous, Utc::now())
    }

    /// Same as [`Event::new`] with an explicit timestamp.
    pub fn at(
        kind: EventKind,
        spatial_object: SpatialObjectRef,
        entity_id: u64,
        previous: Option<&Event>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        let previous = if kind.requires_previous() {
            Some(previous.ok_or(Error::MissingPreviousEvent(kind))?.id)
        } else {
            None
        };
        Ok(Self {
            id: Uuid::new_v4(),
            kind,
            timestamp,
            previous,
            spatial_object,
            entity_id,
        })
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[inline]
    pub fn previous(&self) -> Option<Uuid> {
        self.previous
    }

    #[inline]
    pub fn spatial_object(&self) -> SpatialObjectRef {
        self.spatial_object
    }

    #[inline]
    pub fn entity_id(&self) -> u64 {
        self.entity_id
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Event info:\n\tID: {}\n\tEvent type: {}\n\tEvent time: {}",
            self.id, self.kind, self.timestamp
        )?;
        if let Some(previous) = self.previous {
            write!(f, "\n\tPrevious event id: {previous}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leave_requires_previous() {
        let err = Event::new(EventKind::LeavePolygon, SpatialObjectRef::polygon(1), 7, None)
            .unwrap_err();
        assert!(matches!(err, Error::MissingPreviousEvent(EventKind::LeavePolygon)));
    }

    #[test]
    fn test_leave_links_enter() {
        let enter = Event::new(EventKind::EnterPolygon, SpatialObjectRef::polygon(1), 7, None).unwrap();
        let leave =
            Event::new(EventKind::LeavePolygon, SpatialObjectRef::polygon(1), 7, Some(&enter)).unwrap();
        assert_eq!(leave.previous(), Some(enter.id()));
        assert_ne!(leave.id(), enter.id());
        assert!(leave.to_string().contains(&enter.id().to_string()));
    }

    #[test]
    fn test_cross_line_has_no_previous() {
        let first = Event::new(EventKind::CrossLine, SpatialObjectRef::line(2), 1, None).unwrap();
        let second =
            Event::new(EventKind::CrossLine, SpatialObjectRef::line(2), 1, Some(&first)).unwrap();
        assert_eq!(second.previous(), None);
        assert_eq!(second.spatial_object().kind, SpatialObjectKind::VirtualLine);
    }

    #[test]
    fn test_kind_display_and_serde() {
        assert_eq!(EventKind::EnterPolygon.to_string(), "EVENT_ENTER_POLYGON");
        assert_eq!(
            serde_json::to_string(&EventKind::CrossLine).unwrap(),
            "\"CROSS_LINE\""
        );
    }
}
