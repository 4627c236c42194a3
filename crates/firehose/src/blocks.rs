//! Partitioned view of a commit's decoded archive.

use std::collections::HashMap;

use ipld_core::cid::Cid;
use ipld_core::ipld::Ipld;
use tracing::{debug, error, warn};

use crate::car::Archive;
use crate::error::FrameError;
use crate::frame::CommitPayload;
use crate::records::{classify, record_type_of, RecordClass};

/// Decoded commit blocks, bucketed by classification, plus the op-path index.
#[derive(Debug, Default)]
pub struct CommitBlocks {
    /// Known record types with scannable text fields (post, profile).
    pub matchable: HashMap<Cid, Ipld>,
    /// Remaining known record types (like, repost, follow, block).
    pub content: HashMap<Cid, Ipld>,
    /// Commit manifests and unknown `$type`s.
    pub other: HashMap<Cid, Ipld>,
    /// Op path for each cid referenced by the commit's ops.
    pub path_by_cid: HashMap<Cid, String>,
}

impl CommitBlocks {
    /// Decode a commit's archive and index its ops.
    ///
    /// Op paths are validated here (two non-empty components). A duplicate
    /// cid across ops is logged with full diagnostics and the first binding
    /// wins. An op cid with no matching block is logged, not fatal.
    pub fn from_commit(commit: &CommitPayload) -> Result<Self, FrameError> {
        let archive = Archive::decode(&commit.blocks)?;

        let mut blocks = CommitBlocks::default();
        for (cid, record) in archive.blocks {
            match classify(&record) {
                RecordClass::Matchable => blocks.matchable.insert(cid, record),
                RecordClass::Content => blocks.content.insert(cid, record),
                RecordClass::Other => {
                    if let Some(record_type) = record_type_of(&record) {
                        debug!(cid = %cid, record_type, "unrecognized record type");
                    }
                    blocks.other.insert(cid, record)
                }
            };
        }

        for op in &commit.ops {
            op.split_path()?;
            let Some(cid) = op.cid else { continue };
            if let Some(existing) = blocks.path_by_cid.get(&cid) {
                // Seen very rarely, for graph block operations. Log enough
                // context to track it down; the first path wins.
                error!(
                    cid = %cid,
                    path = %op.path,
                    existing_path = %existing,
                    repo = %commit.repo,
                    seq = commit.seq,
                    ops = ?commit.ops,
                    "duplicate cid in commit ops"
                );
                continue;
            }
            if !blocks.matchable.contains_key(&cid)
                && !blocks.content.contains_key(&cid)
                && !blocks.other.contains_key(&cid)
            {
                warn!(cid = %cid, path = %op.path, repo = %commit.repo, "op cid missing from archive");
            }
            blocks.path_by_cid.insert(cid, op.path.clone());
        }

        Ok(blocks)
    }

    /// Op path for a decoded block, when the commit's ops referenced it.
    pub fn path_for(&self, cid: &Cid) -> Option<&str> {
        self.path_by_cid.get(cid).map(String::as_str)
    }

    /// All classified records (content then matchable) with their cids.
    pub fn classified(&self) -> impl Iterator<Item = (&Cid, &Ipld)> {
        self.content.iter().chain(self.matchable.iter())
    }
}
