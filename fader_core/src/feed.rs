//! Bounded, never-blocking event feed from the control thread.
//!
//! When the queue is full the producer discards the oldest event and retries,
//! so a slow consumer only ever loses history, never stalls the loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crossbeam_channel as xch;

use crate::status::FaderEvent;

/// Producer side of the event feed, owned by the control loop.
#[derive(Debug, Clone)]
pub struct PositionFeed {
    tx: xch::Sender<FaderEvent>,
    // Kept to pop the oldest event on overflow.
    evict: xch::Receiver<FaderEvent>,
    // f32 bits of the last published position; NaN until the first event.
    last: Arc<AtomicU32>,
}

impl PositionFeed {
    /// Create a feed and its consumer end. `capacity` is clamped to at least 1.
    pub fn bounded(capacity: usize) -> (Self, xch::Receiver<FaderEvent>) {
        let (tx, rx) = xch::bounded(capacity.max(1));
        (
            Self {
                tx,
                evict: rx.clone(),
                last: Arc::new(AtomicU32::new(f32::NAN.to_bits())),
            },
            rx,
        )
    }

    /// Queue an event, dropping the oldest queued ones if needed.
    pub fn publish(&self, mut ev: FaderEvent) {
        self.last.store(ev.position().to_bits(), Ordering::Release);
        loop {
            match self.tx.try_send(ev) {
                Ok(()) => return,
                Err(xch::TrySendError::Full(back)) => {
                    if let Ok(old) = self.evict.try_recv() {
                        tracing::trace!(?old, "event feed full, dropping oldest");
                    }
                    ev = back;
                }
                // Our own receiver keeps the channel alive.
                Err(xch::TrySendError::Disconnected(_)) => return,
            }
        }
    }

    /// Position carried by the most recent event, even if it was evicted.
    pub fn latest(&self) -> Option<f32> {
        let p = f32::from_bits(self.last.load(Ordering::Acquire));
        (!p.is_nan()).then_some(p)
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}
