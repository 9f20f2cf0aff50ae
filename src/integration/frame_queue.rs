//! Capacity-one queue where the newest frame wins.

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use std::time::Duration;

/// Decoded frame handed from acquisition to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Raw image bytes, layout defined by the source/detector pair
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: DateTime<Utc>,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp: DateTime<Utc>) -> Self {
        Self {
            data,
            width,
            height,
            timestamp,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() || self.width == 0 || self.height == 0
    }
}

/// Producer side. Pushing never blocks: a full slot is emptied first.
#[derive(Debug, Clone)]
pub struct LatestSender<T> {
    tx: Sender<T>,
    // drains the stale item when the slot is taken
    rx: Receiver<T>,
}

/// Consumer side.
#[derive(Debug, Clone)]
pub struct LatestReceiver<T> {
    rx: Receiver<T>,
}

pub fn latest_channel<T>() -> (LatestSender<T>, LatestReceiver<T>) {
    let (tx, rx) = bounded(1);
    (
        LatestSender {
            tx,
            rx: rx.clone(),
        },
        LatestReceiver { rx },
    )
}

impl<T> LatestSender<T> {
    /// Publish `item`, replacing an unconsumed one. Returns the dropped item.
    pub fn push(&self, mut item: T) -> Option<T> {
        let mut dropped = None;
        loop {
            match self.tx.try_send(item) {
                Ok(()) => return dropped,
                Err(TrySendError::Full(back)) => {
                    item = back;
                    if let Ok(old) = self.rx.try_recv() {
                        dropped = Some(old);
                    }
                }
                // unreachable while `self.rx` is alive
                Err(TrySendError::Disconnected(_)) => return dropped,
            }
        }
    }
}

impl<T> LatestReceiver<T> {
    /// Block until an item arrives. `None` once all senders are dropped.
    pub fn recv(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    /// `Ok(None)` on timeout, `Err(())` once disconnected.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<T>, ()> {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Ok(Some(item)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(()),
        }
    }
}
