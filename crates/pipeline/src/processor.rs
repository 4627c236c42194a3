//! The post-processing stage.
//!
//! A single worker thread consumes raw frames from a bounded queue, drives
//! the frame decoder and candidate extractor, runs the matcher, publishes
//! metrics, and forwards tracked account events to the activity recorder.
//!
//! Error policy: every per-frame failure is absorbed here. A frame that
//! cannot be decoded (or violates a structural invariant) is logged, counted
//! under `firehose{op="error"}`, and dropped; the worker never dies for
//! input.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender};
use ipld_core::cid::Cid;
use ipld_core::ipld::Ipld;
use metrics::{counter, gauge, histogram};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use activity::{DownReason, EventBody, RecorderHandle, TimedEvent};
use firehose::{
    records, AccountPayload, CommitBlocks, CommitPayload, Frame, FrameError, IdentityPayload,
    Payload, TombstonePayload, OP_ERROR,
};
use matcher::{Candidate, Matcher};

use crate::extract::{self, FacetThresholds};
use crate::moderation::{self, LabeledAccounts};
use crate::telemetry::{
    collection_label, facet, kind_label, language_label, FIREHOSE, FIREHOSE_FACETS,
    MESSAGE_FIELD_MATCHES, OPERATIONAL_STATS,
};

/// Errors that drop a frame.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PipelineError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("invalid timestamp {value:?}: {reason}")]
    Timestamp { value: String, reason: String },
    #[error("{collection} record missing required field {path}")]
    MissingField { collection: String, path: String },
    #[error("no op path for decoded block {cid}")]
    MissingOpPath { cid: String },
}

/// Post-processor stage configuration.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Queue bound; the producer blocks when it is reached.
    pub queue_bound: usize,
    pub thresholds: FacetThresholds,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_bound: 10_000,
            thresholds: FacetThresholds::default(),
        }
    }
}

/// The post-processor stage: bounded frame queue plus worker thread.
pub struct PostProcessor {
    tx: Sender<Vec<u8>>,
    matcher: Arc<Matcher>,
    thread: JoinHandle<()>,
}

impl PostProcessor {
    /// Spawn the worker. The matcher is shared read-only; the recorder
    /// handle forwards account events to the activity stage; the labeled
    /// cache suppresses duplicate alerts.
    pub fn spawn(
        matcher: Arc<Matcher>,
        recorder: RecorderHandle,
        labeled: Arc<LabeledAccounts>,
        config: PipelineConfig,
    ) -> Self {
        let (tx, rx) = bounded::<Vec<u8>>(config.queue_bound);
        let worker = Worker {
            matcher: Arc::clone(&matcher),
            recorder,
            labeled,
            thresholds: config.thresholds,
        };
        let thread = thread::spawn(move || worker.run(rx));
        Self {
            tx,
            matcher,
            thread,
        }
    }

    /// Enqueue one raw frame. Blocks when the queue is full; this is the
    /// pipeline's primary backpressure.
    pub fn enqueue(&self, frame: Vec<u8>) {
        match self.tx.send(frame) {
            Ok(()) => {
                gauge!(OPERATIONAL_STATS, "message" => "backlog").increment(1.0);
            }
            Err(_) => warn!("post-processor stopped; dropping frame"),
        }
    }

    /// The shared matcher.
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Drain-then-exit shutdown: close the queue, let the worker finish the
    /// backlog, and join it.
    pub fn shutdown(self) {
        let PostProcessor { tx, thread, .. } = self;
        drop(tx);
        thread.join().expect("post-processor thread panicked");
    }
}

struct Worker {
    matcher: Arc<Matcher>,
    recorder: RecorderHandle,
    labeled: Arc<LabeledAccounts>,
    thresholds: FacetThresholds,
}

impl Worker {
    fn run(&self, rx: Receiver<Vec<u8>>) {
        while let Ok(frame) = rx.recv() {
            gauge!(OPERATIONAL_STATS, "message" => "backlog").decrement(1.0);
            if let Err(err) = self.process_frame(&frame) {
                error!(error = %err, "dropping frame");
                counter!(FIREHOSE, "op" => "error").increment(1);
            }
        }
        debug!("post-processor drained");
    }

    fn process_frame(&self, data: &[u8]) -> Result<(), PipelineError> {
        let frame = Frame::decode(data)?;
        if frame.header.op == OP_ERROR {
            counter!(FIREHOSE, "op" => "error").increment(1);
            if let Payload::Error(err) = &frame.payload {
                error!(error = ?err.error, message = ?err.message, "error frame from upstream");
            }
            return Ok(());
        }

        counter!(FIREHOSE, "op" => "message").increment(1);
        let type_label = frame.payload.type_label();
        counter!(FIREHOSE, "op" => "message", "type" => type_label).increment(1);

        let mut candidates = Vec::new();
        let repo = match &frame.payload {
            Payload::Commit(commit) => {
                self.handle_commit(commit, &mut candidates)?;
                Some(commit.repo.clone())
            }
            Payload::Identity(identity) | Payload::Handle(identity) => {
                self.handle_identity(type_label, identity, &mut candidates)?;
                Some(identity.did.clone())
            }
            Payload::Account(account) => {
                self.handle_account(account)?;
                Some(account.did.clone())
            }
            Payload::Tombstone(tombstone) => {
                self.handle_tombstone(tombstone)?;
                Some(tombstone.did.clone())
            }
            Payload::Info(info) => {
                debug!(name = ?info.name, message = ?info.message, "info frame");
                None
            }
            Payload::Migrate(migrate) => {
                debug!(did = %migrate.did, to = ?migrate.migrate_to, "migrate frame");
                None
            }
            Payload::Unknown(t) => {
                debug!(op_type = %t, "skipping unknown op type");
                None
            }
            // An error payload only appears under op = -1, handled above.
            Payload::Error(_) => None,
        };

        if let Some(repo) = repo {
            self.run_matches(&repo, &candidates);
        }
        Ok(())
    }

    fn handle_commit(
        &self,
        commit: &CommitPayload,
        candidates: &mut Vec<Candidate>,
    ) -> Result<(), PipelineError> {
        let blocks = CommitBlocks::from_commit(commit)?;

        for op in &commit.ops {
            let (collection, _rkey) = op.split_path()?;
            counter!(
                FIREHOSE,
                "op" => "message",
                "type" => "commit",
                "collection" => collection_label(collection),
                "kind" => kind_label(&op.action)
            )
            .increment(1);
        }

        for record in blocks.matchable.values() {
            if let Some(collection) = records::record_type_of(record) {
                candidates.extend(extract::candidates_for(collection, record));
            }
        }

        for (cid, record) in blocks.classified() {
            if let Err(err) = self.handle_content(&commit.repo, cid, record, &blocks, candidates) {
                // A bad record spoils itself, not the frame.
                error!(cid = %cid, error = %err, "skipping content record");
            }
        }
        Ok(())
    }

    fn handle_content(
        &self,
        repo: &str,
        cid: &Cid,
        record: &Ipld,
        blocks: &CommitBlocks,
        candidates: &mut Vec<Candidate>,
    ) -> Result<(), PipelineError> {
        let path = blocks
            .path_for(cid)
            .ok_or_else(|| PipelineError::MissingOpPath {
                cid: cid.to_string(),
            })?;
        let Some(collection) = records::record_type_of(record) else {
            debug!(cid = %cid, path, "skipping untyped block");
            return Ok(());
        };

        match collection {
            records::APP_BSKY_FEED_POST => {
                self.handle_post(repo, path, collection, record, candidates)
            }
            records::APP_BSKY_ACTOR_PROFILE => {
                let at = match extract::string_at(record, "/createdAt") {
                    Some(value) => parse_timestamp(value)?,
                    None => Utc::now(),
                };
                self.record(repo, at, EventBody::Profile { path: path.into() });
                Ok(())
            }
            records::APP_BSKY_GRAPH_FOLLOW => {
                let subject = required_str(record, "/subject", collection)?;
                let at = parse_timestamp(required_str(record, "/createdAt", collection)?)?;
                self.record(
                    repo,
                    at,
                    EventBody::Follow {
                        path: path.into(),
                        subject: subject.into(),
                    },
                );
                Ok(())
            }
            records::APP_BSKY_GRAPH_BLOCK => {
                let subject = required_str(record, "/subject", collection)?;
                let at = parse_timestamp(required_str(record, "/createdAt", collection)?)?;
                self.record(
                    repo,
                    at,
                    EventBody::Block {
                        path: path.into(),
                        subject: subject.into(),
                    },
                );
                Ok(())
            }
            records::APP_BSKY_FEED_LIKE => {
                let uri = required_str(record, "/subject/uri", collection)?;
                let at = parse_timestamp(required_str(record, "/createdAt", collection)?)?;
                self.record(
                    repo,
                    at,
                    EventBody::Like {
                        path: path.into(),
                        uri: uri.into(),
                    },
                );
                Ok(())
            }
            records::APP_BSKY_FEED_REPOST => {
                let uri = required_str(record, "/subject/uri", collection)?;
                let at = parse_timestamp(required_str(record, "/createdAt", collection)?)?;
                self.record(
                    repo,
                    at,
                    EventBody::Repost {
                        path: path.into(),
                        uri: uri.into(),
                    },
                );
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn handle_post(
        &self,
        repo: &str,
        path: &str,
        collection: &str,
        record: &Ipld,
        candidates: &mut Vec<Candidate>,
    ) -> Result<(), PipelineError> {
        let created_at = parse_timestamp(required_str(record, "/createdAt", collection)?)?;

        // Classify the post; a quote embed overrides a reply as the recorded
        // activity, and only one activity is emitted per post.
        let mut body = EventBody::Post { path: path.into() };
        if extract::pointer(record, "/reply").is_some() {
            body = EventBody::Reply {
                path: path.into(),
                root: required_str(record, "/reply/root/uri", collection)?.into(),
                parent: required_str(record, "/reply/parent/uri", collection)?.into(),
            };
        }
        match extract::string_at(record, "/embed/$type") {
            Some(records::APP_BSKY_EMBED_RECORD) => {
                body = EventBody::Quote {
                    path: path.into(),
                    quoted_uri: required_str(record, "/embed/record/uri", collection)?.into(),
                };
            }
            Some(records::APP_BSKY_EMBED_RECORD_WITH_MEDIA) => {
                body = EventBody::Quote {
                    path: path.into(),
                    quoted_uri: required_str(record, "/embed/record/record/uri", collection)?
                        .into(),
                };
            }
            Some(records::APP_BSKY_EMBED_VIDEO) => {
                for lang in extract::strings_at(record, "/embed/langs") {
                    counter!(
                        FIREHOSE,
                        "embed" => records::APP_BSKY_EMBED_VIDEO,
                        "language" => language_label(lang)
                    )
                    .increment(1);
                }
            }
            _ => {}
        }

        let scan = extract::scan_facets(collection, record);
        let extract::FacetScan {
            mentions,
            links,
            tags,
            has_facets,
            link_candidates,
        } = scan;
        candidates.extend(link_candidates);

        if mentions > 0 {
            histogram!(FIREHOSE_FACETS, "facet" => facet::MENTION).record(mentions as f64);
            if mentions > self.thresholds.mentions {
                self.record(repo, created_at, EventBody::Mentions { count: mentions });
            }
        }
        if links > 0 {
            histogram!(FIREHOSE_FACETS, "facet" => facet::LINK).record(links as f64);
            // Links share the mention threshold.
            if links > self.thresholds.mentions {
                self.record(repo, created_at, EventBody::Links { count: links });
            }
        }
        if tags > 0 {
            histogram!(FIREHOSE_FACETS, "facet" => facet::TAG).record(tags as f64);
            if tags > self.thresholds.tags {
                self.record(repo, created_at, EventBody::Tags { count: tags });
            }
        }
        if has_facets {
            let total = mentions + links + tags;
            histogram!(FIREHOSE_FACETS, "facet" => facet::TOTAL).record(total as f64);
            if total > self.thresholds.total {
                self.record(repo, created_at, EventBody::Facets { count: total });
            }
        }

        for lang in extract::strings_at(record, "/langs") {
            counter!(
                FIREHOSE,
                "collection" => collection_label(collection),
                "language" => language_label(lang)
            )
            .increment(1);
        }

        self.record(repo, created_at, body);
        Ok(())
    }

    fn handle_identity(
        &self,
        type_label: &str,
        identity: &IdentityPayload,
        candidates: &mut Vec<Candidate>,
    ) -> Result<(), PipelineError> {
        let Some(handle) = &identity.handle else {
            return Ok(());
        };
        candidates.push(Candidate::new(type_label, "handle", handle.clone()));
        let at = parse_timestamp(&identity.time)?;
        self.record(
            &identity.did,
            at,
            EventBody::Handle {
                new_handle: handle.clone(),
            },
        );
        Ok(())
    }

    fn handle_account(&self, account: &AccountPayload) -> Result<(), PipelineError> {
        let status = if account.active { "active" } else { "inactive" };
        counter!(
            FIREHOSE,
            "op" => "message",
            "type" => "account",
            "status" => status
        )
        .increment(1);

        let at = parse_timestamp(&account.time)?;
        let body = if account.active {
            EventBody::Active
        } else {
            EventBody::Inactive {
                reason: account
                    .status
                    .as_deref()
                    .map(DownReason::parse)
                    .unwrap_or(DownReason::Unknown),
            }
        };
        self.record(&account.did, at, body);
        Ok(())
    }

    fn handle_tombstone(&self, tombstone: &TombstonePayload) -> Result<(), PipelineError> {
        let at = parse_timestamp(&tombstone.time)?;
        self.record(
            &tombstone.did,
            at,
            EventBody::Inactive {
                reason: DownReason::Tombstone,
            },
        );
        Ok(())
    }

    fn run_matches(&self, repo: &str, candidates: &[Candidate]) {
        if candidates.is_empty() {
            return;
        }
        let results = self.matcher.all_matches_for(candidates);
        if results.is_empty() {
            return;
        }

        let mut total = 0usize;
        for result in &results {
            info!(
                repo,
                record_type = %result.candidate.record_type,
                field = %result.candidate.field,
                value = %result.candidate.value,
                hits = result.hits.len(),
                "candidate matched"
            );
            total += result.hits.len();
            for hit in &result.hits {
                counter!(
                    MESSAGE_FIELD_MATCHES,
                    "type" => result.candidate.record_type.clone(),
                    "field" => result.candidate.field.clone(),
                    "filter" => hit.keyword.clone()
                )
                .increment(1);
            }
        }

        self.record(repo, Utc::now(), EventBody::Matches { count: total });
        moderation::report_account(&self.labeled, repo, total);
    }

    fn record(&self, did: &str, at: DateTime<Utc>, body: EventBody) {
        self.recorder
            .request_recording(TimedEvent::new(did, at, body));
    }
}

fn required_str<'a>(
    record: &'a Ipld,
    path: &str,
    collection: &str,
) -> Result<&'a str, PipelineError> {
    extract::string_at(record, path).ok_or_else(|| PipelineError::MissingField {
        collection: collection.to_string(),
        path: path.to_string(),
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, PipelineError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| PipelineError::Timestamp {
            value: value.to_string(),
            reason: err.to_string(),
        })
}
