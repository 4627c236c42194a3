use thiserror::Error;

/// Errors produced while loading rules or compiling the matcher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MatchError {
    #[error("empty pattern at rule {0}")]
    EmptyPattern(usize),
    #[error("rule file {path}: {reason}")]
    RuleFile { path: String, reason: String },
    #[error("failed to compile match automaton: {0}")]
    Compile(String),
}

/// A field value nominated for rule matching.
///
/// `record_type` is the collection (or operation type) the value came from,
/// `field` the extraction path within the record, `value` the raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub record_type: String,
    pub field: String,
    pub value: String,
}

impl Candidate {
    pub fn new(
        record_type: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            record_type: record_type.into(),
            field: field.into(),
            value: value.into(),
        }
    }
}

/// One keyword occurrence inside a canonicalized candidate value.
///
/// Offsets are byte positions in the canonical form of the scanned value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchHit {
    pub keyword: String,
    pub start: usize,
    pub end: usize,
}

/// A candidate together with every keyword hit found in it. `hits` is never
/// empty; candidates without hits are dropped by
/// [`Matcher::all_matches_for`](crate::Matcher::all_matches_for).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub candidate: Candidate,
    pub hits: Vec<MatchHit>,
}
