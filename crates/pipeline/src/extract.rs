//! Candidate extraction from decoded records.
//!
//! Extraction is driven by a static table mapping each collection to the
//! field paths the rule engine scans. Paths use a simple pointer syntax
//! (`/text`, `/embed/external/uri`); segments index into maps by key and
//! into lists by position. Missing fields are skipped silently; a non-string
//! value at a schema path is a schema violation logged at debug level.

use ipld_core::ipld::Ipld;
use matcher::Candidate;
use tracing::debug;

use firehose::records;

/// Field paths scanned per collection.
static TARGET_FIELDS: &[(&str, &[&str])] = &[
    (
        records::APP_BSKY_FEED_POST,
        &[
            "/text",
            "/embed/external/uri",
            "/embed/external/title",
            "/embed/external/description",
        ],
    ),
    (
        records::APP_BSKY_ACTOR_PROFILE,
        &["/displayName", "/description"],
    ),
];

/// Facet-count thresholds above which activity events fire.
///
/// `mentions` doubles as the link threshold; the two have always shared one
/// constant.
#[derive(Debug, Clone, Copy)]
pub struct FacetThresholds {
    pub mentions: usize,
    pub tags: usize,
    pub total: usize,
}

impl Default for FacetThresholds {
    fn default() -> Self {
        Self {
            mentions: 4,
            tags: 4,
            total: 6,
        }
    }
}

/// The schema paths scanned for a collection; empty for collections without
/// text fields.
pub fn target_fields(collection: &str) -> &'static [&'static str] {
    TARGET_FIELDS
        .iter()
        .find(|(known, _)| *known == collection)
        .map(|(_, fields)| *fields)
        .unwrap_or(&[])
}

/// Walk a pointer path into a decoded record.
pub fn pointer<'a>(record: &'a Ipld, path: &str) -> Option<&'a Ipld> {
    let mut node = record;
    for segment in path.split('/').skip(1) {
        node = match node {
            Ipld::Map(map) => map.get(segment)?,
            Ipld::List(list) => list.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(node)
}

/// String value at a pointer path, or `None` (logging when the field exists
/// but is not a string).
pub fn string_at<'a>(record: &'a Ipld, path: &str) -> Option<&'a str> {
    match pointer(record, path)? {
        Ipld::String(value) => Some(value.as_str()),
        other => {
            debug!(path, kind = ipld_kind(other), "non-string value at schema path");
            None
        }
    }
}

/// All string elements of a list at a pointer path.
pub fn strings_at<'a>(record: &'a Ipld, path: &str) -> Vec<&'a str> {
    match pointer(record, path) {
        Some(Ipld::List(items)) => items
            .iter()
            .filter_map(|item| match item {
                Ipld::String(value) => Some(value.as_str()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Candidates for the fields present at the collection's schema paths.
pub fn candidates_for(collection: &str, record: &Ipld) -> Vec<Candidate> {
    target_fields(collection)
        .iter()
        .filter_map(|path| {
            string_at(record, path)
                .map(|value| Candidate::new(collection, field_name(path), value))
        })
        .collect()
}

fn field_name(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Facet tallies for one post.
#[derive(Debug, Default)]
pub struct FacetScan {
    pub mentions: usize,
    pub links: usize,
    pub tags: usize,
    /// True when the record carries a non-empty `facets` array.
    pub has_facets: bool,
    /// Link facet uris, nominated for rule matching.
    pub link_candidates: Vec<Candidate>,
}

/// Enumerate facet features and the top-level `tags` field of a post.
pub fn scan_facets(collection: &str, record: &Ipld) -> FacetScan {
    let mut scan = FacetScan::default();
    if let Some(Ipld::List(tags)) = pointer(record, "/tags") {
        scan.tags = tags.len();
    }
    let Some(Ipld::List(facets)) = pointer(record, "/facets") else {
        return scan;
    };
    for facet in facets {
        scan.has_facets = true;
        let Some(Ipld::List(features)) = pointer(facet, "/features") else {
            continue;
        };
        for feature in features {
            match string_at(feature, "/$type") {
                Some(records::FACET_MENTION) => scan.mentions += 1,
                Some(records::FACET_TAG) => scan.tags += 1,
                Some(records::FACET_LINK) => {
                    scan.links += 1;
                    if let Some(uri) = string_at(feature, "/uri") {
                        scan.link_candidates
                            .push(Candidate::new(collection, "link", uri));
                    }
                }
                _ => {}
            }
        }
    }
    scan
}

fn ipld_kind(value: &Ipld) -> &'static str {
    match value {
        Ipld::Null => "null",
        Ipld::Bool(_) => "bool",
        Ipld::Integer(_) => "integer",
        Ipld::Float(_) => "float",
        Ipld::String(_) => "string",
        Ipld::Bytes(_) => "bytes",
        Ipld::List(_) => "list",
        Ipld::Map(_) => "map",
        Ipld::Link(_) => "link",
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn map(entries: Vec<(&str, Ipld)>) -> Ipld {
        Ipld::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    fn s(value: &str) -> Ipld {
        Ipld::String(value.to_string())
    }

    fn feature(facet_type: &str, uri: Option<&str>) -> Ipld {
        let mut entries = vec![("$type", s(facet_type))];
        if let Some(uri) = uri {
            entries.push(("uri", s(uri)));
        }
        map(entries)
    }

    fn facet(features: Vec<Ipld>) -> Ipld {
        map(vec![("features", Ipld::List(features))])
    }

    #[test]
    fn pointer_walks_maps_and_lists() {
        let record = map(vec![(
            "embed",
            map(vec![("images", Ipld::List(vec![map(vec![("alt", s("a dog"))])]))]),
        )]);
        assert_eq!(string_at(&record, "/embed/images/0/alt"), Some("a dog"));
        assert_eq!(string_at(&record, "/embed/images/1/alt"), None);
        assert_eq!(string_at(&record, "/missing"), None);
    }

    #[test]
    fn candidate_count_matches_fields_present() {
        let record = map(vec![
            ("$type", s(records::APP_BSKY_FEED_POST)),
            ("text", s("hello")),
            (
                "embed",
                map(vec![(
                    "external",
                    map(vec![("uri", s("https://example.com")), ("title", s("t"))]),
                )]),
            ),
        ]);
        let candidates = candidates_for(records::APP_BSKY_FEED_POST, &record);
        // text, embed/external/uri, embed/external/title present; description absent.
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].field, "text");
        assert_eq!(candidates[1].field, "embed/external/uri");
    }

    #[test]
    fn non_string_schema_field_is_skipped() {
        let record = map(vec![
            ("$type", s(records::APP_BSKY_FEED_POST)),
            ("text", Ipld::Integer(42)),
        ]);
        assert!(candidates_for(records::APP_BSKY_FEED_POST, &record).is_empty());
    }

    #[test]
    fn unknown_collection_has_no_target_fields() {
        assert!(target_fields("app.bsky.graph.follow").is_empty());
    }

    #[test]
    fn scan_counts_facets_and_top_level_tags() {
        let record = map(vec![
            ("tags", Ipld::List(vec![s("one"), s("two")])),
            (
                "facets",
                Ipld::List(vec![facet(vec![
                    feature(records::FACET_MENTION, None),
                    feature(records::FACET_TAG, None),
                    feature(records::FACET_LINK, Some("https://spam.example")),
                ])]),
            ),
        ]);

        let scan = scan_facets(records::APP_BSKY_FEED_POST, &record);
        assert!(scan.has_facets);
        assert_eq!(scan.mentions, 1);
        assert_eq!(scan.links, 1);
        assert_eq!(scan.tags, 3);
        assert_eq!(scan.link_candidates.len(), 1);
        assert_eq!(scan.link_candidates[0].field, "link");
        assert_eq!(scan.link_candidates[0].value, "https://spam.example");
    }

    #[test]
    fn record_without_facets_scans_empty() {
        let scan = scan_facets(records::APP_BSKY_FEED_POST, &map(vec![("text", s("hi"))]));
        assert!(!scan.has_facets);
        assert_eq!(scan.mentions + scan.links + scan.tags, 0);
    }
}
