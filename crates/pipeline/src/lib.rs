//! Firesift post-processing layer.
//!
//! Connects the decoding, matching, and activity stages into the concurrent
//! pipeline: a bounded frame queue drained by the post-processor worker,
//! which classifies each payload, extracts candidates, runs the matcher,
//! publishes metrics, and forwards per-account events to the activity
//! recorder. Also home to the metric vocabulary ([`telemetry`]), the
//! candidate extractor ([`extract`]), and the labeled-account moderation
//! cache ([`moderation`]).
//!
//! Backpressure is by blocking: every queue is bounded, and a full queue
//! blocks its producer rather than dropping or buffering unboundedly.

pub mod extract;
pub mod moderation;
mod processor;
pub mod telemetry;

pub use crate::extract::FacetThresholds;
pub use crate::moderation::{
    mask_password, report_account, LabeledAccounts, ModerationStore, Refresher, StoreError,
    DEFAULT_REFRESH_INTERVAL,
};
pub use crate::processor::{PipelineConfig, PipelineError, PostProcessor};
