//! Metric names, bounded label vocabularies, and exporter installation.
//!
//! Every label value emitted at runtime comes from an enumeration in this
//! module (or from the compiled rule set, whose size is fixed at startup).
//! Free-form strings off the wire are clamped before they become labels.

use std::net::SocketAddr;

use metrics::{describe_counter, describe_gauge, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher as MetricMatcher, PrometheusBuilder};

use firehose::{records, OpAction};

/// Counter: statistics about received firehose data.
pub const FIREHOSE: &str = "firehose";
/// Counter: matches within each scanned field of a message.
pub const MESSAGE_FIELD_MATCHES: &str = "message_field_matches";
/// Gauge: client internals (queue backlogs).
pub const OPERATIONAL_STATS: &str = "operational_stats";
/// Histogram: facet counts per post.
pub const FIREHOSE_FACETS: &str = "firehose_facets";
/// Counter: alerts generated for possibly suspect activity.
pub const REALTIME_ALERTS: &str = "realtime_alerts";

/// `facet` label values for [`FIREHOSE_FACETS`].
pub mod facet {
    pub const LINK: &str = "link";
    pub const MENTION: &str = "mention";
    pub const TAG: &str = "tag";
    pub const TOTAL: &str = "total";

    pub const ALL: [&str; 4] = [LINK, MENTION, TAG, TOTAL];
}

const KNOWN_COLLECTIONS: [&str; 6] = [
    records::APP_BSKY_FEED_POST,
    records::APP_BSKY_ACTOR_PROFILE,
    records::APP_BSKY_FEED_LIKE,
    records::APP_BSKY_FEED_REPOST,
    records::APP_BSKY_GRAPH_FOLLOW,
    records::APP_BSKY_GRAPH_BLOCK,
];

/// Clamp a collection name to the known vocabulary.
pub fn collection_label(collection: &str) -> &'static str {
    KNOWN_COLLECTIONS
        .iter()
        .find(|known| **known == collection)
        .copied()
        .unwrap_or("unknown")
}

/// Stable label for an op action.
pub fn kind_label(action: &str) -> &'static str {
    match OpAction::parse(action) {
        OpAction::Create => "create",
        OpAction::Update => "update",
        OpAction::Delete => "delete",
        OpAction::Unknown(_) => "unknown",
    }
}

/// Reduce a declared language to its lowercased BCP-47 primary subtag.
pub fn language_label(lang: &str) -> String {
    let primary = lang.split(['-', '_']).next().unwrap_or("");
    if primary.is_empty() || primary.len() > 8 || !primary.chars().all(|c| c.is_ascii_alphabetic())
    {
        return "unknown".to_string();
    }
    primary.to_ascii_lowercase()
}

/// Bind the Prometheus exporter and register the metric families.
///
/// Fatal at startup when the listen address cannot be bound; the facet
/// histogram gets integer buckets 0..=30 and its label values are
/// instantiated up front since histograms cannot be created on demand.
pub fn install(listen: SocketAddr) -> Result<(), BuildError> {
    let buckets: Vec<f64> = (0..=30).map(f64::from).collect();
    PrometheusBuilder::new()
        .with_http_listener(listen)
        .set_buckets_for_metric(MetricMatcher::Full(FIREHOSE_FACETS.to_string()), &buckets)?
        .install()?;
    register();
    Ok(())
}

/// Describe the metric families and pre-create the facet histograms.
pub fn register() {
    describe_counter!(FIREHOSE, "Statistics about received firehose data");
    describe_counter!(
        MESSAGE_FIELD_MATCHES,
        "Number of matches within each field of a message"
    );
    describe_gauge!(OPERATIONAL_STATS, "Statistics about client internals");
    describe_histogram!(
        FIREHOSE_FACETS,
        "Distribution of facet counts per post"
    );
    describe_counter!(
        REALTIME_ALERTS,
        "Alerts generated for possibly suspect activity"
    );
    for label in facet::ALL {
        let _ = histogram!(FIREHOSE_FACETS, "facet" => label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collections_clamp_to_known_set() {
        assert_eq!(
            collection_label("app.bsky.feed.post"),
            records::APP_BSKY_FEED_POST
        );
        assert_eq!(collection_label("com.example.custom"), "unknown");
    }

    #[test]
    fn kinds_clamp_to_known_actions() {
        assert_eq!(kind_label("create"), "create");
        assert_eq!(kind_label("obliterate"), "unknown");
    }

    #[test]
    fn languages_reduce_to_primary_subtag() {
        assert_eq!(language_label("en-US"), "en");
        assert_eq!(language_label("PT_br"), "pt");
        assert_eq!(language_label(""), "unknown");
        assert_eq!(language_label("x!!"), "unknown");
        assert_eq!(language_label("waylongsubtag"), "unknown");
    }
}
