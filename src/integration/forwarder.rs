//! Fire-and-forget delivery of events to a remote collector.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::events::{Event, SpatialObjectRef};
use crate::geometry::{Point, Rect};
use crate::spatial::Scale;
use crate::speed::TrackInfo;

use super::frame_queue::Frame;
use super::pipeline::Trigger;

/// Extra margin added to the crop region, in source pixels.
const CROP_OFFSET: (i32, i32) = (5, 10);

/// Everything a collector receives for one event.
#[derive(Debug, Clone, Serialize)]
pub struct EventPayload {
    pub camera_id: String,
    /// Unix seconds, UTC
    pub timestamp: i64,
    /// Encoded full frame or crop
    pub image: Vec<u8>,
    /// Detection box relative to `image`
    pub detection: Rect,
    pub class_id: i32,
    pub class_name: String,
    pub spatial_object: SpatialObjectRef,
    pub source_geometry: Vec<Point>,
    pub event: Event,
    pub track_info: Option<TrackInfo>,
}

/// Answer of the collector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkReply {
    pub message: String,
    pub warning: String,
    pub error: String,
}

/// Transport to the collector.
pub trait EventSink: Send + Sync + 'static {
    fn send(&self, payload: EventPayload) -> impl Future<Output = Result<SinkReply>> + Send;
}

/// Turns a frame (or a region of it) into the bytes sent with an event.
pub trait FrameEncoder {
    fn encode(&self, frame: &Frame, region: Option<Rect>) -> Result<Vec<u8>>;
}

/// Send one payload, giving up after `timeout`.
pub async fn send_with_timeout<S: EventSink>(
    sink: &S,
    payload: EventPayload,
    timeout: Duration,
) -> Result<SinkReply> {
    tokio::time::timeout(timeout, sink.send(payload))
        .await
        .map_err(|_| Error::Timeout(timeout))?
}

pub struct Forwarder<S> {
    sink: Arc<S>,
    handle: Handle,
    timeout: Duration,
    camera_id: String,
    scale: Scale,
}

impl<S: EventSink> Forwarder<S> {
    pub fn new(sink: S, handle: Handle, settings: &Settings) -> Self {
        Self {
            sink: Arc::new(sink),
            handle,
            timeout: settings.forwarding.timeout,
            camera_id: settings.video.camera_id.clone(),
            scale: settings.scale(),
        }
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Display rectangle mapped to source pixels, widened and clamped to
    /// the frame.
    pub fn crop_rect(&self, display_rect: Rect, frame_width: u32, frame_height: u32) -> Rect {
        let (dx, dy) = CROP_OFFSET;
        display_rect
            .rescaled(self.scale.x, self.scale.y)
            .translated(dx, dy)
            .clamped(frame_width as i32, frame_height as i32)
    }

    pub fn build_payload<E: FrameEncoder>(
        &self,
        trigger: &Trigger,
        frame: &Frame,
        encoder: &E,
    ) -> EventPayload {
        let crop = self.crop_rect(trigger.entity.rect, frame.width, frame.height);

        let (region, detection) = if trigger.crop_object {
            (Some(crop), Rect::new(0, 0, crop.width, crop.height))
        } else {
            (None, crop)
        };
        let image = encoder.encode(frame, region).unwrap_or_else(|err| {
            warn!(%err, cropped = trigger.crop_object, "can't prepare image buffer");
            Vec::new()
        });

        EventPayload {
            camera_id: self.camera_id.clone(),
            timestamp: trigger.event.timestamp().timestamp(),
            image,
            detection,
            class_id: trigger.entity.class_id,
            class_name: trigger.entity.class_name.clone(),
            spatial_object: trigger.event.spatial_object(),
            source_geometry: trigger.source_geometry.clone(),
            event: trigger.event.clone(),
            track_info: trigger.track_info.clone(),
        }
    }

    /// Spawn the delivery on the runtime and return immediately.
    pub fn forward(&self, payload: EventPayload) -> JoinHandle<()> {
        let sink = Arc::clone(&self.sink);
        let timeout = self.timeout;
        let event_id = payload.event.id();
        self.handle.spawn(async move {
            match send_with_timeout(sink.as_ref(), payload, timeout).await {
                Err(err) => error!(%err, %event_id, "event send failed"),
                Ok(reply) => {
                    if !reply.error.is_empty() {
                        error!(%event_id, error = %reply.error, "collector rejected event");
                        return;
                    }
                    if !reply.warning.is_empty() {
                        warn!(%event_id, warning = %reply.warning, "collector accepted event with warning");
                        return;
                    }
                    info!(%event_id, message = %reply.message, "collector answer");
                }
            }
        })
    }
}
