//! End-to-end loop: frame reader thread, latest-frame queue, detection,
//! tracking and event forwarding.

use std::thread;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::{Error, Result};

use super::forwarder::{EventSink, Forwarder, FrameEncoder};
use super::frame_queue::{Frame, latest_channel};
use super::{DetectionSource, Pipeline};

/// Where frames come from.
pub trait FrameSource: Send + 'static {
    /// Next frame; `Ok(None)` ends the stream, an error stops reading.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Pauses applied after a frame is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub empty_frame: Duration,
    pub detector_failure: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            empty_frame: Duration::from_millis(400),
            detector_failure: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Frames taken from the queue
    pub received: u64,
    /// Frames replaced in the queue before being consumed
    pub dropped: u64,
    /// Empty frames
    pub skipped: u64,
    pub detector_failures: u64,
    pub events: u64,
}

struct Delivery<S, E> {
    forwarder: Forwarder<S>,
    encoder: E,
}

pub struct Runner<D, S, E> {
    pipeline: Pipeline,
    detector: D,
    delivery: Option<Delivery<S, E>>,
    backoff: Backoff,
}

impl<D, S, E> Runner<D, S, E>
where
    D: DetectionSource,
    S: EventSink,
    E: FrameEncoder,
{
    pub fn new(pipeline: Pipeline, detector: D) -> Self {
        Self {
            pipeline,
            detector,
            delivery: None,
            backoff: Backoff::default(),
        }
    }

    /// Forward every event through `forwarder`, images encoded by `encoder`.
    pub fn with_forwarding(mut self, forwarder: Forwarder<S>, encoder: E) -> Self {
        self.delivery = Some(Delivery { forwarder, encoder });
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    #[inline]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Consume `source` until it ends. Frames arriving while the previous
    /// one is still processed replace each other.
    pub fn run<F: FrameSource>(&mut self, mut source: F) -> Result<RunStats> {
        let (tx, rx) = latest_channel::<Frame>();

        let reader = thread::Builder::new()
            .name("frame-reader".into())
            .spawn(move || {
                let mut dropped = 0u64;
                loop {
                    match source.next_frame() {
                        Ok(Some(frame)) => {
                            if tx.push(frame).is_some() {
                                dropped += 1;
                            }
                        }
                        Ok(None) => {
                            debug!("frame source exhausted");
                            break;
                        }
                        Err(err) => {
                            error!(%err, "frame source failed, stop reading");
                            break;
                        }
                    }
                }
                dropped
            })
            .map_err(|err| Error::Source(err.to_string()))?;

        let mut stats = RunStats::default();
        while let Some(frame) = rx.recv() {
            stats.received += 1;
            self.handle_frame(&frame, &mut stats);
        }

        stats.dropped = reader
            .join()
            .map_err(|_| Error::Source("frame reader panicked".into()))?;
        debug!(?stats, "runner finished");
        Ok(stats)
    }

    fn handle_frame(&mut self, frame: &Frame, stats: &mut RunStats) {
        if frame.is_empty() {
            stats.skipped += 1;
            warn!(backoff = ?self.backoff.empty_frame, "empty frame, skipped");
            thread::sleep(self.backoff.empty_frame);
            return;
        }

        let triggers = match self.pipeline.process_frame(
            &mut self.detector,
            &frame.data,
            frame.width,
            frame.height,
            frame.timestamp,
        ) {
            Ok(triggers) => triggers,
            Err(err) => {
                stats.detector_failures += 1;
                warn!(%err, backoff = ?self.backoff.detector_failure, "can't detect objects");
                thread::sleep(self.backoff.detector_failure);
                return;
            }
        };
        stats.events += triggers.len() as u64;

        if let Some(delivery) = &self.delivery {
            for trigger in &triggers {
                let payload = delivery
                    .forwarder
                    .build_payload(trigger, frame, &delivery.encoder);
                delivery.forwarder.forward(payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RawLineSettings, RawSettings, RawTrackerSettings, RawVideoSettings, Settings};
    use crate::geometry::Rect;
    use crate::integration::forwarder::{EventPayload, SinkReply};
    use crate::tracker::Detection;
    use chrono::{TimeDelta, Utc};
    use crossbeam_channel::{Receiver, Sender, unbounded};
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::Arc;

    /// Hands out frames one by one, waiting for the detector to finish the
    /// previous one when gated.
    struct ScriptedSource {
        frames: VecDeque<Frame>,
        gate: Option<Receiver<()>>,
        first: bool,
    }

    impl FrameSource for ScriptedSource {
        fn next_frame(&mut self) -> Result<Option<Frame>> {
            if !self.first {
                if let Some(gate) = &self.gate {
                    if gate.recv().is_err() {
                        return Ok(None);
                    }
                }
            }
            self.first = false;
            Ok(self.frames.pop_front())
        }
    }

    /// Returns the frame's first byte as the top edge of a single box.
    struct ByteDetector {
        ack: Sender<()>,
        fail_on: Option<u8>,
    }

    impl DetectionSource for ByteDetector {
        type Error = Error;

        fn detect(&mut self, input: &[u8], _width: u32, _height: u32) -> Result<Vec<Detection>> {
            let _ = self.ack.send(());
            let y = input[0];
            if self.fail_on == Some(y) {
                return Err(Error::Detector("inference failed".into()));
            }
            let y = y as i32;
            Ok(vec![Detection::from_ltrb(40, y, 120, y + 40, "car")])
        }
    }

    struct ChannelSink(Sender<EventPayload>);

    impl EventSink for ChannelSink {
        fn send(&self, payload: EventPayload) -> impl Future<Output = Result<SinkReply>> + Send {
            let sent = self.0.send(payload).map_err(|e| Error::Forward(e.to_string()));
            async move {
                sent?;
                Ok(SinkReply::default())
            }
        }
    }

    struct RawEncoder;

    impl FrameEncoder for RawEncoder {
        fn encode(&self, frame: &Frame, _region: Option<Rect>) -> Result<Vec<u8>> {
            Ok(frame.data.clone())
        }
    }

    fn settings() -> Arc<Settings> {
        Arc::new(Settings::prepare(RawSettings {
            video_settings: RawVideoSettings {
                width: 1280,
                height: 720,
                reduced_width: 640,
                reduced_height: 360,
                camera_id: "gate".into(),
                ..Default::default()
            },
            tracker_settings: RawTrackerSettings {
                max_points_in_track: 10,
                min_iou: Some(0.1),
                lines_settings: vec![RawLineSettings {
                    line_id: 9,
                    begin: [0, 100],
                    end: [320, 100],
                    crop_mode: "no_crop".into(),
                    ..Default::default()
                }],
                ..Default::default()
            },
            ..Default::default()
        }))
    }

    fn no_backoff() -> Backoff {
        Backoff {
            empty_frame: Duration::ZERO,
            detector_failure: Duration::ZERO,
        }
    }

    fn frames(tops: &[u8]) -> VecDeque<Frame> {
        let t0 = Utc::now();
        tops.iter()
            .enumerate()
            .map(|(i, &y)| Frame::new(vec![y; 4], 1280, 720, t0 + TimeDelta::milliseconds(40 * i as i64)))
            .collect()
    }

    type TestRunner = Runner<ByteDetector, ChannelSink, RawEncoder>;

    #[test]
    fn test_run_forwards_crossing() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_time()
            .build()
            .unwrap();
        let settings = settings();
        let (ack_tx, ack_rx) = unbounded();
        let (payload_tx, payload_rx) = unbounded();

        let forwarder = Forwarder::new(ChannelSink(payload_tx), rt.handle().clone(), &settings);
        let mut runner = TestRunner::new(Pipeline::new(settings), ByteDetector { ack: ack_tx, fail_on: None })
            .with_forwarding(forwarder, RawEncoder)
            .with_backoff(no_backoff());

        // display centers 40, 45, 50, 55, 60, 63 against the line at y=50
        let source = ScriptedSource {
            frames: frames(&[60, 70, 80, 90, 100, 106]),
            gate: Some(ack_rx),
            first: true,
        };
        let stats = runner.run(source).unwrap();

        assert_eq!(stats.received, 6);
        assert_eq!(stats.dropped, 0);
        assert_eq!(stats.events, 1);

        let payload = payload_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(payload.camera_id, "gate");
        assert_eq!(payload.class_name, "car");
        assert_eq!(payload.image, vec![90; 4]);
        assert!(payload.track_info.is_none());
    }

    #[test]
    fn test_detector_failures_are_skipped() {
        let (ack_tx, ack_rx) = unbounded();
        let mut runner = TestRunner::new(
            Pipeline::new(settings()),
            ByteDetector {
                ack: ack_tx,
                fail_on: Some(70),
            },
        )
        .with_backoff(no_backoff());

        let source = ScriptedSource {
            frames: frames(&[60, 70, 80]),
            gate: Some(ack_rx),
            first: true,
        };
        let stats = runner.run(source).unwrap();
        assert_eq!(stats.received, 3);
        assert_eq!(stats.detector_failures, 1);
        assert_eq!(runner.pipeline().snapshot().len(), 1);
    }

    #[test]
    fn test_empty_frames_are_skipped() {
        let (ack_tx, _ack_rx) = unbounded();
        let mut runner = TestRunner::new(
            Pipeline::new(settings()),
            ByteDetector {
                ack: ack_tx,
                fail_on: None,
            },
        )
        .with_backoff(no_backoff());

        let t0 = Utc::now();
        let source = ScriptedSource {
            frames: VecDeque::from(vec![Frame::new(vec![], 1280, 720, t0), Frame::new(vec![1], 0, 0, t0)]),
            gate: None,
            first: true,
        };
        let stats = runner.run(source).unwrap();
        assert_eq!(stats.received + stats.dropped, 2);
        assert_eq!(stats.skipped, stats.received);
        assert!(runner.pipeline().snapshot().is_empty());
    }
}
