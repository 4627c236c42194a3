//! Labeled-account cache and the moderation-store seam.
//!
//! The moderation store itself is an external collaborator; this module owns
//! the snapshot cache the pipeline reads and the refresher thread that polls
//! the store. Reads are lock-free: the snapshot is swapped atomically, so a
//! reader sees either the previous or the next full set, never a partial
//! update.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use arc_swap::ArcSwap;
use metrics::counter;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::telemetry::REALTIME_ALERTS;

/// Default interval between labeled-account refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(600);

/// Errors surfaced by a moderation store implementation.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    #[error("moderation store unavailable: {0}")]
    Unavailable(String),
    #[error("moderation store query failed: {0}")]
    Query(String),
}

/// External moderation store: answers which accounts moderators have already
/// labeled. Queried on the refresher's interval, never on the hot path.
pub trait ModerationStore: Send + Sync {
    fn labeled_dids(&self) -> Result<HashSet<String>, StoreError>;
}

/// Atomic snapshot of labeled account identifiers.
pub struct LabeledAccounts {
    snapshot: ArcSwap<HashSet<String>>,
}

impl LabeledAccounts {
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(HashSet::new()),
        }
    }

    /// Lock-free membership check; the sole read operation.
    pub fn contains(&self, did: &str) -> bool {
        self.snapshot.load().contains(did)
    }

    /// Atomically replace the whole snapshot.
    pub fn replace(&self, dids: HashSet<String>) {
        self.snapshot.store(Arc::new(dids));
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }
}

impl Default for LabeledAccounts {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodic labeled-account refresher thread.
pub struct Refresher {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl Refresher {
    /// Poll `store` on `interval`, replacing the cache snapshot on success.
    /// A failed poll keeps the stale snapshot serving until the next tick.
    pub fn spawn(
        cache: Arc<LabeledAccounts>,
        store: Arc<dyn ModerationStore>,
        interval: Duration,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let thread = thread::spawn(move || {
            while !stop_flag.load(Ordering::Relaxed) {
                match store.labeled_dids() {
                    Ok(dids) => {
                        info!(labeled = dids.len(), "refreshed labeled accounts");
                        cache.replace(dids);
                    }
                    Err(err) => {
                        warn!(error = %err, "labeled-account refresh failed; serving stale snapshot");
                    }
                }
                // Sleep in short steps so shutdown is prompt.
                let mut waited = Duration::ZERO;
                while waited < interval && !stop_flag.load(Ordering::Relaxed) {
                    let step = Duration::from_millis(200).min(interval - waited);
                    thread::sleep(step);
                    waited += step;
                }
            }
        });
        Self { stop, thread }
    }

    pub fn stop(self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.thread.join();
    }
}

/// Mask the password in a store connection string before logging it.
pub fn mask_password(connection_string: &str) -> String {
    const SENTINEL: &str = "password=";
    const MASK: &str = "********";
    match connection_string.find(SENTINEL) {
        Some(found) => {
            let start = found + SENTINEL.len();
            let end = connection_string[start..]
                .find(' ')
                .map(|offset| start + offset)
                .unwrap_or(connection_string.len());
            let mut masked = connection_string.to_string();
            masked.replace_range(start..end, MASK);
            masked
        }
        None => connection_string.to_string(),
    }
}

/// Reporting stub: raise an alert for suspect activity unless moderators have
/// already labeled the account. Filing the actual report is the moderation
/// service's job.
pub fn report_account(labeled: &LabeledAccounts, did: &str, hits: usize) {
    if labeled.contains(did) {
        debug!(did, "account already labeled; suppressing alert");
        return;
    }
    counter!(REALTIME_ALERTS, "reason" => "filter_match").increment(1);
    info!(did, hits, "suspect activity alert");
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn snapshot_replacement_is_total() {
        let cache = LabeledAccounts::new();
        assert!(!cache.contains("did:plc:a"));

        cache.replace(HashSet::from(["did:plc:a".to_string()]));
        assert!(cache.contains("did:plc:a"));

        cache.replace(HashSet::from(["did:plc:b".to_string()]));
        assert!(!cache.contains("did:plc:a"));
        assert!(cache.contains("did:plc:b"));
        assert_eq!(cache.len(), 1);
    }

    struct ScriptedStore {
        responses: Mutex<Vec<Result<HashSet<String>, StoreError>>>,
    }

    impl ModerationStore for ScriptedStore {
        fn labeled_dids(&self) -> Result<HashSet<String>, StoreError> {
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(StoreError::Unavailable("script exhausted".into())))
        }
    }

    #[test]
    fn refresh_failure_keeps_stale_snapshot() {
        let cache = Arc::new(LabeledAccounts::new());
        // Responses pop in reverse: first a good set, then an outage.
        let store = Arc::new(ScriptedStore {
            responses: Mutex::new(vec![
                Err(StoreError::Unavailable("down".into())),
                Ok(HashSet::from(["did:plc:x".to_string()])),
            ]),
        });

        let refresher = Refresher::spawn(Arc::clone(&cache), store, Duration::from_millis(10));
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while !cache.contains("did:plc:x") && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        thread::sleep(Duration::from_millis(50));
        refresher.stop();

        assert!(cache.contains("did:plc:x"), "stale snapshot must survive outage");
    }

    #[test]
    fn masks_passwords_in_connection_strings() {
        assert_eq!(
            mask_password("host=db password=hunter2 dbname=ozone"),
            "host=db password=******** dbname=ozone"
        );
        assert_eq!(
            mask_password("host=db password=hunter2"),
            "host=db password=********"
        );
        assert_eq!(mask_password("host=db dbname=ozone"), "host=db dbname=ozone");
    }
}
