//! Progress reporting from the producer.
//!
//! Reporters are called after every read, outside the queue lock. They must
//! never block: a slow observer loses updates instead of stalling the
//! producer.

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::ipc::events::{percent_of, ProgressEvent};

/// Fire-and-forget sink for `(current_bytes, total_bytes)` updates.
pub trait ProgressReporter: Send {
    fn report(&mut self, current_bytes: u64, total_bytes: u64);
}

/// Discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&mut self, _current_bytes: u64, _total_bytes: u64) {}
}

impl<F> ProgressReporter for F
where
    F: FnMut(u64, u64) + Send,
{
    fn report(&mut self, current_bytes: u64, total_bytes: u64) {
        self(current_bytes, total_bytes)
    }
}

/// Publishes `ProgressEvent`s on a bounded crossbeam channel.
///
/// Events are only sent when the whole-number percentage moves, and
/// intermediate ones are dropped when the channel is full. The 100% event is
/// always delivered: if the channel is full, the oldest queued update is
/// evicted to make room for it.
pub struct ChannelProgress {
    tx: Sender<ProgressEvent>,
    /// Used only to evict a stale update in favour of completion.
    evict: Receiver<ProgressEvent>,
    last_bytes: u64,
    last_whole_percent: Option<u32>,
    dropped: u64,
}

impl ChannelProgress {
    /// Create a reporter and the receiver observers read from.
    pub fn bounded(capacity: usize) -> (Self, Receiver<ProgressEvent>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        (
            Self {
                tx,
                evict: rx.clone(),
                last_bytes: 0,
                last_whole_percent: None,
                dropped: 0,
            },
            rx,
        )
    }

    /// Updates lost because the channel was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl ProgressReporter for ChannelProgress {
    fn report(&mut self, current_bytes: u64, total_bytes: u64) {
        // Monotonic: never report going backwards.
        if current_bytes < self.last_bytes {
            return;
        }
        self.last_bytes = current_bytes;

        let whole = percent_of(current_bytes, total_bytes).floor() as u32;
        if self.last_whole_percent == Some(whole) {
            return;
        }

        let complete = whole >= 100;
        let mut event = ProgressEvent::new(current_bytes, total_bytes);
        loop {
            match self.tx.try_send(event) {
                Ok(()) => {
                    self.last_whole_percent = Some(whole);
                    return;
                }
                Err(TrySendError::Full(back)) => {
                    self.dropped += 1;
                    if !complete {
                        return;
                    }
                    // Single sender: after one eviction the retry has room.
                    let _ = self.evict.try_recv();
                    event = back;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}
