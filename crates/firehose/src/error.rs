//! Error types produced by the `firehose` crate.

use thiserror::Error;

/// Errors raised while decoding a frame or its embedded archive.
///
/// The pipeline absorbs all of these per frame; none of them should ever
/// terminate a worker.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FrameError {
    /// Wrong outer shape: not exactly two CBOR items, undecodable header or
    /// payload, or an out-of-range `op`.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    /// The commit `blocks` bytes are not a readable archive.
    #[error("failed to decode archive: {0}")]
    ArchiveDecode(String),
    /// A block's bytes do not hash to its claimed cid. Fatal for the block,
    /// not the frame.
    #[error("cid {cid} does not match block digest")]
    CidMismatch { cid: String },
    /// An op path did not have exactly two non-empty components.
    #[error("bad op path {0:?}")]
    BadOpPath(String),
}
