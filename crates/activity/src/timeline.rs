//! Per-account timelines and the persistence seam.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::events::{EventBody, TimedEvent};

/// Where recorded events go. The recorder thread owns its sink exclusively,
/// so implementations need no internal locking.
pub trait EventSink: Send {
    fn append(&mut self, event: TimedEvent);
}

/// In-memory append-only timelines, one per account, in arrival order.
///
/// This is the default sink; it also answers the threshold and velocity
/// queries downstream abuse scoring runs against.
#[derive(Debug, Default)]
pub struct AccountTimelines {
    accounts: HashMap<String, Vec<TimedEvent>>,
}

impl AccountTimelines {
    pub fn record(&mut self, event: TimedEvent) {
        self.accounts
            .entry(event.did.clone())
            .or_default()
            .push(event);
    }

    /// The full timeline for an account, oldest first.
    pub fn timeline(&self, did: &str) -> Option<&[TimedEvent]> {
        self.accounts.get(did).map(Vec::as_slice)
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn event_count(&self) -> usize {
        self.accounts.values().map(Vec::len).sum()
    }

    /// Events recorded for `did` at or after `since`.
    pub fn count_since(&self, did: &str, since: DateTime<Utc>) -> usize {
        self.accounts
            .get(did)
            .map(|events| events.iter().filter(|event| event.at >= since).count())
            .unwrap_or(0)
    }

    /// Total rule hits recorded for `did` at or after `since`.
    pub fn matches_since(&self, did: &str, since: DateTime<Utc>) -> usize {
        self.accounts
            .get(did)
            .map(|events| {
                events
                    .iter()
                    .filter(|event| event.at >= since)
                    .filter_map(|event| match event.body {
                        EventBody::Matches { count } => Some(count),
                        _ => None,
                    })
                    .sum()
            })
            .unwrap_or(0)
    }
}

impl EventSink for AccountTimelines {
    fn append(&mut self, event: TimedEvent) {
        self.record(event);
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn timelines_keep_arrival_order_per_account() {
        let mut timelines = AccountTimelines::default();
        timelines.record(TimedEvent::new(
            "did:plc:a",
            at(10),
            EventBody::Post { path: "p/1".into() },
        ));
        timelines.record(TimedEvent::new("did:plc:b", at(11), EventBody::Active));
        timelines.record(TimedEvent::new(
            "did:plc:a",
            at(5),
            EventBody::Matches { count: 2 },
        ));

        let events = timelines.timeline("did:plc:a").unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].body, EventBody::Post { .. }));
        assert!(matches!(events[1].body, EventBody::Matches { .. }));
    }

    #[test]
    fn velocity_queries() {
        let mut timelines = AccountTimelines::default();
        for (secs, count) in [(10, 1), (20, 3), (30, 5)] {
            timelines.record(TimedEvent::new(
                "did:plc:a",
                at(secs),
                EventBody::Matches { count },
            ));
        }

        assert_eq!(timelines.count_since("did:plc:a", at(15)), 2);
        assert_eq!(timelines.matches_since("did:plc:a", at(15)), 8);
        assert_eq!(timelines.matches_since("did:plc:missing", at(0)), 0);
    }
}
