//! Timed per-account events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why an account went inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownReason {
    Unknown,
    Tombstone,
    Takedown,
    Deactivated,
    Deleted,
    Suspended,
}

impl DownReason {
    /// Parse the `status` string from an account payload; anything
    /// unrecognized maps to `Unknown`.
    pub fn parse(status: &str) -> Self {
        match status {
            "tombstone" => Self::Tombstone,
            "takedown" => Self::Takedown,
            "deactivated" => Self::Deactivated,
            "deleted" => Self::Deleted,
            "suspended" => Self::Suspended,
            _ => Self::Unknown,
        }
    }
}

/// What an account did, as observed on the stream.
///
/// `path` fields are the repo-relative `collection/rkey` location of the
/// record that produced the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventBody {
    Post { path: String },
    Reply { path: String, root: String, parent: String },
    Quote { path: String, quoted_uri: String },
    Like { path: String, uri: String },
    Repost { path: String, uri: String },
    Follow { path: String, subject: String },
    Block { path: String, subject: String },
    Profile { path: String },
    Handle { new_handle: String },
    Active,
    Inactive { reason: DownReason },
    /// Rule hits across one message's candidates.
    Matches { count: usize },
    Mentions { count: usize },
    Links { count: usize },
    Tags { count: usize },
    Facets { count: usize },
}

/// One event on an account's timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub did: String,
    pub at: DateTime<Utc>,
    pub body: EventBody,
}

impl TimedEvent {
    pub fn new(did: impl Into<String>, at: DateTime<Utc>, body: EventBody) -> Self {
        Self {
            did: did.into(),
            at,
            body,
        }
    }
}
