//! Umbrella crate for the firesift pipeline.
//!
//! Firesift ingests the real-time event stream of a federated social network
//! (the firehose), decodes its binary record batches, scores user-generated
//! text against a rule set, and emits both time-series metrics and
//! per-account activity events for downstream abuse-signal detection.
//!
//! The layers live in their own crates and are re-exported here so
//! applications can drive the whole pipeline through a single dependency:
//!
//! - [`matcher`](::matcher): rule loading, canonicalization, and the
//!   multi-pattern keyword automaton.
//! - [`firehose`](::firehose): frame and content-addressed archive decoding.
//! - [`activity`](::activity): timed per-account events, timelines, and the
//!   recording stage.
//! - [`pipeline`](::pipeline): the post-processor worker, candidate
//!   extraction, metric vocabulary, and the labeled-account cache.
//!
//! ## Wiring
//!
//! A deployment constructs the shared pieces once at startup and hands them
//! down; there are no hidden singletons:
//!
//! ```no_run
//! use std::sync::Arc;
//! use firesift::{
//!     AccountTimelines, EventRecorder, LabeledAccounts, Matcher, PipelineConfig,
//!     PostProcessor, RuleSet,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let rules = RuleSet::from_file("rules.txt")?;
//! let matcher = Arc::new(Matcher::new(&rules)?);
//! let labeled = Arc::new(LabeledAccounts::default());
//!
//! let recorder = EventRecorder::spawn(AccountTimelines::default(), 10_000);
//! let processor = PostProcessor::spawn(
//!     matcher,
//!     recorder.handle(),
//!     labeled,
//!     PipelineConfig::default(),
//! );
//!
//! // The network reader feeds raw frames:
//! processor.enqueue(vec![/* one frame */]);
//!
//! // Shutdown drains each queue in turn.
//! processor.shutdown();
//! let timelines = recorder.shutdown();
//! # let _ = timelines;
//! # Ok(())
//! # }
//! ```

pub mod config;

pub use activity::{
    AccountTimelines, DownReason, EventBody, EventRecorder, EventSink, RecorderHandle, TimedEvent,
};
pub use firehose::{
    Archive, CommitBlocks, CommitPayload, Frame, FrameError, FrameHeader, OpAction, OpType,
    Payload, RepoOp,
};
pub use matcher::{
    canonicalize, Candidate, MatchError, MatchHit, MatchResult, Matcher, RuleSet,
};
pub use pipeline::{
    mask_password, report_account, FacetThresholds, LabeledAccounts, ModerationStore,
    PipelineConfig, PipelineError, PostProcessor, Refresher, StoreError,
};

pub use crate::config::{ConfigLoadError, FiresiftConfig};
