//! Record `$type` vocabulary and block classification.

use ipld_core::ipld::Ipld;

pub const APP_BSKY_FEED_POST: &str = "app.bsky.feed.post";
pub const APP_BSKY_ACTOR_PROFILE: &str = "app.bsky.actor.profile";
pub const APP_BSKY_FEED_LIKE: &str = "app.bsky.feed.like";
pub const APP_BSKY_FEED_REPOST: &str = "app.bsky.feed.repost";
pub const APP_BSKY_GRAPH_FOLLOW: &str = "app.bsky.graph.follow";
pub const APP_BSKY_GRAPH_BLOCK: &str = "app.bsky.graph.block";

pub const APP_BSKY_EMBED_EXTERNAL: &str = "app.bsky.embed.external";
pub const APP_BSKY_EMBED_IMAGES: &str = "app.bsky.embed.images";
pub const APP_BSKY_EMBED_RECORD: &str = "app.bsky.embed.record";
pub const APP_BSKY_EMBED_RECORD_WITH_MEDIA: &str = "app.bsky.embed.recordWithMedia";
pub const APP_BSKY_EMBED_VIDEO: &str = "app.bsky.embed.video";

pub const FACET_LINK: &str = "app.bsky.richtext.facet#link";
pub const FACET_MENTION: &str = "app.bsky.richtext.facet#mention";
pub const FACET_TAG: &str = "app.bsky.richtext.facet#tag";

/// Record types whose text fields are eligible for candidate extraction.
pub const MATCHABLE_TYPES: [&str; 2] = [APP_BSKY_FEED_POST, APP_BSKY_ACTOR_PROFILE];

/// Remaining record types the classifier understands.
pub const CONTENT_TYPES: [&str; 4] = [
    APP_BSKY_FEED_LIKE,
    APP_BSKY_FEED_REPOST,
    APP_BSKY_GRAPH_FOLLOW,
    APP_BSKY_GRAPH_BLOCK,
];

/// How the decoder buckets a decoded block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordClass {
    /// Known record type with fields the rule engine scans.
    Matchable,
    /// Known record type without scannable fields.
    Content,
    /// Commit manifests, unknown `$type`s, anything else.
    Other,
}

/// Read the `$type` discriminator of a decoded record, if it has one.
pub fn record_type_of(record: &Ipld) -> Option<&str> {
    if let Ipld::Map(map) = record {
        if let Some(Ipld::String(t)) = map.get("$type") {
            return Some(t.as_str());
        }
    }
    None
}

/// Classify a decoded block by its `$type`.
pub fn classify(record: &Ipld) -> RecordClass {
    match record_type_of(record) {
        Some(t) if MATCHABLE_TYPES.contains(&t) => RecordClass::Matchable,
        Some(t) if CONTENT_TYPES.contains(&t) => RecordClass::Content,
        _ => RecordClass::Other,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn record_with_type(t: &str) -> Ipld {
        let mut map = BTreeMap::new();
        map.insert("$type".to_string(), Ipld::String(t.to_string()));
        Ipld::Map(map)
    }

    #[test]
    fn posts_and_profiles_are_matchable() {
        assert_eq!(
            classify(&record_with_type(APP_BSKY_FEED_POST)),
            RecordClass::Matchable
        );
        assert_eq!(
            classify(&record_with_type(APP_BSKY_ACTOR_PROFILE)),
            RecordClass::Matchable
        );
    }

    #[test]
    fn graph_records_are_content() {
        for t in CONTENT_TYPES {
            assert_eq!(classify(&record_with_type(t)), RecordClass::Content);
        }
    }

    #[test]
    fn unknown_or_untyped_is_other() {
        assert_eq!(
            classify(&record_with_type("com.example.new.thing")),
            RecordClass::Other
        );
        assert_eq!(classify(&Ipld::Map(BTreeMap::new())), RecordClass::Other);
        assert_eq!(classify(&Ipld::String("not a map".into())), RecordClass::Other);
    }
}
