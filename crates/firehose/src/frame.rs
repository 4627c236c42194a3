//! Outer frame decoding.
//!
//! A frame is exactly two concatenated CBOR items: a small header map
//! (`op`, and `t` when `op` is a message) followed by a payload map whose
//! shape depends on `t`. Anything else is malformed.

use std::io::Cursor;

use ipld_core::cid::Cid;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FrameError;

/// Header `op` for an error frame.
pub const OP_ERROR: i64 = -1;
/// Header `op` for a regular message frame.
pub const OP_MESSAGE: i64 = 1;

/// First CBOR item of every frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameHeader {
    pub op: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

/// Payload operation types carried in `header.t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpType {
    Commit,
    Identity,
    Handle,
    Account,
    Tombstone,
    Info,
    Migrate,
}

impl OpType {
    /// Parse a `t` value; the wire prefixes a `#` which we accept either way.
    pub fn from_label(t: &str) -> Option<Self> {
        match t.strip_prefix('#').unwrap_or(t) {
            "commit" => Some(Self::Commit),
            "identity" => Some(Self::Identity),
            "handle" => Some(Self::Handle),
            "account" => Some(Self::Account),
            "tombstone" => Some(Self::Tombstone),
            "info" => Some(Self::Info),
            "migrate" => Some(Self::Migrate),
            _ => None,
        }
    }

    /// Stable label used for metrics.
    pub fn label(self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Identity => "identity",
            Self::Handle => "handle",
            Self::Account => "account",
            Self::Tombstone => "tombstone",
            Self::Info => "info",
            Self::Migrate => "migrate",
        }
    }
}

/// One repository mutation within a commit.
///
/// Field order follows the canonical DAG-CBOR key ordering so re-encoding a
/// decoded op is byte-stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoOp {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<Cid>,
    pub path: String,
    pub action: String,
}

/// Parsed `RepoOp::action` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpAction {
    Create,
    Update,
    Delete,
    Unknown(String),
}

impl OpAction {
    pub fn parse(action: &str) -> Self {
        match action {
            "create" => Self::Create,
            "update" => Self::Update,
            "delete" => Self::Delete,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl RepoOp {
    /// Split `path` into `(collection, record key)`.
    ///
    /// The path must have exactly two non-empty components; anything else is
    /// a decode error for the frame.
    pub fn split_path(&self) -> Result<(&str, &str), FrameError> {
        let mut parts = self.path.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(collection), Some(rkey), None) if !collection.is_empty() && !rkey.is_empty() => {
                Ok((collection, rkey))
            }
            _ => Err(FrameError::BadOpPath(self.path.clone())),
        }
    }
}

/// Commit payload: one atomic set of record mutations for a single account.
/// Fields the core ignores (`commit`, `blobs`, `prevData`, ...) are dropped
/// on decode.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitPayload {
    #[serde(default)]
    pub seq: i64,
    pub repo: String,
    #[serde(default)]
    pub rev: Option<String>,
    #[serde(default)]
    pub since: Option<String>,
    #[serde(rename = "tooBig", default)]
    pub too_big: bool,
    #[serde(with = "serde_bytes", default)]
    pub blocks: Vec<u8>,
    pub ops: Vec<RepoOp>,
    pub time: String,
}

/// Identity and handle payloads share a shape; `handle` is optional on
/// identity events.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityPayload {
    #[serde(default)]
    pub seq: i64,
    pub did: String,
    #[serde(default)]
    pub handle: Option<String>,
    pub time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountPayload {
    #[serde(default)]
    pub seq: i64,
    pub did: String,
    pub active: bool,
    #[serde(default)]
    pub status: Option<String>,
    pub time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TombstonePayload {
    #[serde(default)]
    pub seq: i64,
    pub did: String,
    pub time: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct InfoPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MigratePayload {
    #[serde(default)]
    pub seq: i64,
    pub did: String,
    #[serde(rename = "migrateTo", default)]
    pub migrate_to: Option<String>,
}

/// Error frame payload (`op = -1`).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ErrorPayload {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Second CBOR item of a frame, typed by `header.t`.
#[derive(Debug, Clone)]
pub enum Payload {
    Commit(CommitPayload),
    Identity(IdentityPayload),
    Handle(IdentityPayload),
    Account(AccountPayload),
    Tombstone(TombstonePayload),
    Info(InfoPayload),
    Migrate(MigratePayload),
    Error(ErrorPayload),
    /// Unknown `t`: propagated so the caller can count and skip it.
    Unknown(String),
}

impl Payload {
    /// Stable metric label for the payload type.
    pub fn type_label(&self) -> &'static str {
        match self {
            Payload::Commit(_) => "commit",
            Payload::Identity(_) => "identity",
            Payload::Handle(_) => "handle",
            Payload::Account(_) => "account",
            Payload::Tombstone(_) => "tombstone",
            Payload::Info(_) => "info",
            Payload::Migrate(_) => "migrate",
            Payload::Error(_) => "error",
            Payload::Unknown(_) => "unknown",
        }
    }
}

/// A fully decoded frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Payload,
}

impl Frame {
    /// Decode one raw frame. Exactly two CBOR items; exhaustion before the
    /// second item or trailing bytes after it are malformed.
    pub fn decode(data: &[u8]) -> Result<Self, FrameError> {
        let mut cursor = Cursor::new(data);
        let header: FrameHeader = ciborium::from_reader(&mut cursor)
            .map_err(|err| FrameError::MalformedFrame(format!("unreadable header: {err}")))?;
        let offset = cursor.position() as usize;
        let rest = &data[offset..];
        if rest.is_empty() {
            return Err(FrameError::MalformedFrame("missing payload record".into()));
        }

        let payload = match header.op {
            OP_ERROR => Payload::Error(decode_payload(rest, "error")?),
            OP_MESSAGE => {
                let t = header.t.as_deref().ok_or_else(|| {
                    FrameError::MalformedFrame("message frame without a type".into())
                })?;
                match OpType::from_label(t) {
                    Some(OpType::Commit) => Payload::Commit(decode_payload(rest, t)?),
                    Some(OpType::Identity) => Payload::Identity(decode_payload(rest, t)?),
                    Some(OpType::Handle) => Payload::Handle(decode_payload(rest, t)?),
                    Some(OpType::Account) => Payload::Account(decode_payload(rest, t)?),
                    Some(OpType::Tombstone) => Payload::Tombstone(decode_payload(rest, t)?),
                    Some(OpType::Info) => Payload::Info(decode_payload(rest, t)?),
                    Some(OpType::Migrate) => Payload::Migrate(decode_payload(rest, t)?),
                    None => {
                        // Still require a well-formed second item so garbage
                        // after the header is caught.
                        check_single_item(rest)?;
                        debug!(op_type = t, "unknown firehose op type");
                        Payload::Unknown(t.to_string())
                    }
                }
            }
            other => {
                return Err(FrameError::MalformedFrame(format!(
                    "unsupported header op {other}"
                )));
            }
        };

        Ok(Frame { header, payload })
    }
}

/// Decode the payload item, requiring it to consume the rest of the frame.
fn decode_payload<T: serde::de::DeserializeOwned>(
    rest: &[u8],
    op_type: &str,
) -> Result<T, FrameError> {
    serde_ipld_dagcbor::from_slice(rest)
        .map_err(|err| FrameError::MalformedFrame(format!("unreadable {op_type} payload: {err}")))
}

/// Verify `rest` holds exactly one CBOR item with nothing after it.
fn check_single_item(rest: &[u8]) -> Result<(), FrameError> {
    let mut cursor = Cursor::new(rest);
    let _: ciborium::value::Value = ciborium::from_reader(&mut cursor)
        .map_err(|err| FrameError::MalformedFrame(format!("unreadable payload: {err}")))?;
    if (cursor.position() as usize) < rest.len() {
        return Err(FrameError::MalformedFrame(
            "trailing bytes after payload record".into(),
        ));
    }
    Ok(())
}
