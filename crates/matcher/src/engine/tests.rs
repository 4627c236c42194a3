use super::*;

fn matcher_for(patterns: &[&str]) -> Matcher {
    let rules = RuleSet::from_patterns(patterns.iter().copied()).unwrap();
    Matcher::new(&rules).unwrap()
}

#[test]
fn single_hit_with_offsets() {
    let matcher = matcher_for(&["cat"]);
    let hits = matcher.matches("Hello Cat world");
    assert_eq!(
        hits,
        vec![MatchHit {
            keyword: "cat".into(),
            start: 6,
            end: 9,
        }]
    );
}

#[test]
fn case_erased_unicode_match() {
    let matcher = matcher_for(&["café"]);
    assert_eq!(matcher.matches("CAFÉ au lait").len(), 1);
}

#[test]
fn overlapping_hits_all_reported() {
    let matcher = matcher_for(&["cat", "category"]);
    let hits = matcher.matches("category");
    let keywords: Vec<&str> = hits.iter().map(|hit| hit.keyword.as_str()).collect();
    assert!(keywords.contains(&"cat"));
    assert!(keywords.contains(&"category"));
}

#[test]
fn repeated_keyword_reported_per_occurrence() {
    let matcher = matcher_for(&["ab"]);
    let hits = matcher.matches("ab ab ab");
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[1].start, 3);
}

#[test]
fn adding_a_rule_never_reduces_hits() {
    let inputs = ["the cat sat", "no match here", "dogma and category"];
    let small = matcher_for(&["cat"]);
    let large = matcher_for(&["cat", "dog"]);
    for input in inputs {
        assert!(large.matches(input).len() >= small.matches(input).len());
    }
}

#[test]
fn all_matches_for_preserves_order_and_drops_misses() {
    let matcher = matcher_for(&["cat", "dog"]);
    let candidates = vec![
        Candidate::new("app.bsky.feed.post", "text", "a dog barked"),
        Candidate::new("app.bsky.feed.post", "text", "nothing here"),
        Candidate::new("app.bsky.actor.profile", "description", "cat person"),
    ];

    let results = matcher.all_matches_for(&candidates);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].candidate.value, "a dog barked");
    assert_eq!(results[0].hits[0].keyword, "dog");
    assert_eq!(results[1].candidate.record_type, "app.bsky.actor.profile");
    assert!(!results[1].hits.is_empty());
}

#[test]
fn empty_rule_set_matches_nothing() {
    let matcher = Matcher::new(&RuleSet::default()).unwrap();
    assert!(matcher.matches("anything at all").is_empty());
}
