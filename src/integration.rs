//! Glue between the core and its collaborators: detectors, frame sources
//! and the event collector.

mod builder;
mod detector;
mod forwarder;
mod frame_queue;
mod pipeline;
mod runner;

pub use builder::DetectionBuilder;
pub use detector::DetectionSource;
pub use forwarder::{
    EventPayload, EventSink, Forwarder, FrameEncoder, SinkReply, send_with_timeout,
};
pub use frame_queue::{Frame, LatestReceiver, LatestSender, latest_channel};
pub use pipeline::{Pipeline, SharedTrackStore, Trigger};
pub use runner::{Backoff, FrameSource, RunStats, Runner};
