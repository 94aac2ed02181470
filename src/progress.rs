//! Training progress reporting and cancellation.
//!
//! Training emits one [`EpochEvent`] per completed epoch. Observers are
//! plain closures or the sending half of a [`progress_channel`]; the core
//! never depends on how events are displayed.

use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Loss reported at the end of an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochEvent {
    /// Zero-based epoch index.
    pub epoch: usize,
    /// Mean squared error over the training windows for this epoch.
    pub loss: f64,
}

impl EpochEvent {
    /// `1 - loss`, plotted next to the loss curve by progress displays.
    /// Not a classification accuracy.
    pub fn pseudo_accuracy(&self) -> f64 {
        1.0 - self.loss
    }
}

/// Receiver of per-epoch progress.
pub trait ProgressObserver {
    fn on_epoch(&mut self, event: EpochEvent);
}

impl<F> ProgressObserver for F
where
    F: FnMut(EpochEvent),
{
    fn on_epoch(&mut self, event: EpochEvent) {
        self(event)
    }
}

/// Observer that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_epoch(&mut self, _event: EpochEvent) {}
}

/// Sending half of a progress channel.
///
/// Dropping the sender ends the stream seen by [`ProgressReceiver`].
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: Sender<EpochEvent>,
}

impl ProgressObserver for ProgressSender {
    fn on_epoch(&mut self, event: EpochEvent) {
        // A receiver that went away only means nobody is watching.
        let _ = self.tx.send(event);
    }
}

/// Receiving half of a progress channel.
///
/// Iterating yields events in epoch order and stops once every sender has
/// been dropped, i.e. when training has finished.
#[derive(Debug, Clone)]
pub struct ProgressReceiver {
    rx: Receiver<EpochEvent>,
}

impl ProgressReceiver {
    /// Next event without blocking, if one is queued.
    pub fn try_next(&self) -> Option<EpochEvent> {
        self.rx.try_recv().ok()
    }
}

impl Iterator for ProgressReceiver {
    type Item = EpochEvent;

    fn next(&mut self) -> Option<EpochEvent> {
        self.rx.recv().ok()
    }
}

/// Create an unbounded progress channel.
///
/// # Example
/// ```
/// use aquacast::progress::{progress_channel, EpochEvent, ProgressObserver};
///
/// let (mut tx, rx) = progress_channel();
/// tx.on_epoch(EpochEvent { epoch: 0, loss: 0.5 });
/// drop(tx);
/// let events: Vec<EpochEvent> = rx.collect();
/// assert_eq!(events.len(), 1);
/// ```
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (ProgressSender { tx }, ProgressReceiver { rx })
}

/// Cooperative cancellation flag checked between epochs.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; every clone observes it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
