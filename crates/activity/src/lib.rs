//! Firesift activity layer.
//!
//! Time-stamped per-account events, the append-only timelines they land in,
//! and the bounded recording stage that serializes them. The recorder is the
//! second consumer in the pipeline: the post-processor forwards tracked
//! account events here, and a single consumer thread appends them to the
//! configured [`EventSink`].
//!
//! Ordering: events for the same account appear in the order they were
//! enqueued. No order is promised across accounts.

mod events;
mod recorder;
mod timeline;

pub use crate::events::{DownReason, EventBody, TimedEvent};
pub use crate::recorder::{EventRecorder, RecorderHandle};
pub use crate::timeline::{AccountTimelines, EventSink};
