use aho_corasick::AhoCorasick;

use crate::canonical::canonicalize;
use crate::rules::RuleSet;
use crate::types::{Candidate, MatchError, MatchHit, MatchResult};

#[cfg(test)]
mod tests;

/// Multi-pattern keyword matcher over case-erased text.
///
/// All patterns are searched simultaneously in one left-to-right pass, linear
/// in input length plus hits. Read-only after construction; share with `&` or
/// `Arc` across threads.
pub struct Matcher {
    automaton: AhoCorasick,
    keywords: Vec<String>,
}

impl Matcher {
    /// Compile the automaton from a rule set. Patterns are canonicalized
    /// before insertion so matching and reporting both use the canonical
    /// form.
    pub fn new(rules: &RuleSet) -> Result<Self, MatchError> {
        let keywords: Vec<String> = rules.iter().map(canonicalize).collect();
        let automaton =
            AhoCorasick::new(&keywords).map_err(|err| MatchError::Compile(err.to_string()))?;
        Ok(Self {
            automaton,
            keywords,
        })
    }

    /// Number of compiled patterns.
    pub fn pattern_count(&self) -> usize {
        self.keywords.len()
    }

    /// Report every keyword occurrence in `value`, including overlapping
    /// hits: with rules `cat` and `category`, the input "category" fires
    /// both. The input is canonicalized once; hit offsets are byte positions
    /// in that canonical form, in scan order.
    pub fn matches(&self, value: &str) -> Vec<MatchHit> {
        let haystack = canonicalize(value);
        self.automaton
            .find_overlapping_iter(&haystack)
            .map(|found| MatchHit {
                keyword: self.keywords[found.pattern().as_usize()].clone(),
                start: found.start(),
                end: found.end(),
            })
            .collect()
    }

    /// Run [`Matcher::matches`] over a candidate list, dropping candidates
    /// with no hits. Result order mirrors the input order.
    pub fn all_matches_for(&self, candidates: &[Candidate]) -> Vec<MatchResult> {
        candidates
            .iter()
            .filter_map(|candidate| {
                let hits = self.matches(&candidate.value);
                if hits.is_empty() {
                    None
                } else {
                    Some(MatchResult {
                        candidate: candidate.clone(),
                        hits,
                    })
                }
            })
            .collect()
    }
}
