//! The activity recording stage.
//!
//! A single consumer thread drains a bounded queue of [`TimedEvent`]s into an
//! [`EventSink`]. The single consumer is what guarantees per-account ordering:
//! events for one account land in the order they were enqueued.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Sender};
use metrics::gauge;
use tracing::{debug, warn};

use crate::events::TimedEvent;
use crate::timeline::EventSink;

/// Cloneable producer side of the recorder queue.
#[derive(Clone)]
pub struct RecorderHandle {
    tx: Sender<TimedEvent>,
}

impl RecorderHandle {
    /// Enqueue an event for recording. Blocks when the queue is full; this
    /// is the stage's backpressure.
    pub fn request_recording(&self, event: TimedEvent) {
        match self.tx.send(event) {
            Ok(()) => {
                gauge!("operational_stats", "events" => "backlog").increment(1.0);
            }
            Err(err) => {
                warn!(did = %err.0.did, "recorder stopped; dropping event");
            }
        }
    }
}

/// The recorder stage: queue plus consumer thread.
pub struct EventRecorder<S: EventSink + 'static> {
    handle: RecorderHandle,
    thread: JoinHandle<S>,
}

impl<S: EventSink + 'static> EventRecorder<S> {
    /// Spawn the consumer thread over `sink` with a queue bound of `bound`.
    pub fn spawn(mut sink: S, bound: usize) -> Self {
        let (tx, rx) = bounded::<TimedEvent>(bound);
        let thread = thread::spawn(move || {
            while let Ok(event) = rx.recv() {
                gauge!("operational_stats", "events" => "backlog").decrement(1.0);
                sink.append(event);
            }
            debug!("event recorder drained");
            sink
        });
        Self {
            handle: RecorderHandle { tx },
            thread,
        }
    }

    /// Producer handle for other stages.
    pub fn handle(&self) -> RecorderHandle {
        self.handle.clone()
    }

    /// Drain-then-exit shutdown. Callers must drop any cloned handles first;
    /// the consumer keeps running until every producer is gone, then finishes
    /// the backlog and returns the sink.
    pub fn shutdown(self) -> S {
        let EventRecorder { handle, thread } = self;
        drop(handle);
        thread.join().expect("event recorder thread panicked")
    }
}
