//! Firesift firehose decoding layer.
//!
//! Turns one raw binary frame from the event stream into typed structures the
//! pipeline can work with:
//!
//! - [`Frame::decode`] parses the two outer CBOR items (header + payload) and
//!   types the payload by the header's `t` value.
//! - [`Archive`] reads a commit's content-addressed block batch, verifying
//!   each block's cid against a recomputed sha2-256 digest.
//! - [`CommitBlocks`] partitions the decoded blocks into matchable, content,
//!   and other records, and indexes op paths by cid.
//!
//! Decoding is deliberately tolerant where the stream is: unknown record
//! types and op types are classified and propagated rather than rejected, so
//! the pipeline can count and skip them. Structural violations (wrong outer
//! item count, blank op-path components, truncated archives) are errors.

mod blocks;
mod car;
mod error;
mod frame;
pub mod records;

pub use crate::blocks::CommitBlocks;
pub use crate::car::Archive;
pub use crate::error::FrameError;
pub use crate::frame::{
    AccountPayload, CommitPayload, ErrorPayload, Frame, FrameHeader, IdentityPayload, InfoPayload,
    MigratePayload, OpAction, OpType, Payload, RepoOp, TombstonePayload, OP_ERROR, OP_MESSAGE,
};
