//! Firesift matching layer.
//!
//! This crate owns the rule set and the multi-pattern keyword automaton used
//! to scan candidate strings pulled out of firehose records. Matching is done
//! over a case-erased canonical form so that rules fire regardless of how a
//! post is capitalized.
//!
//! ## Main entry points
//!
//! Load rules with [`RuleSet::from_file`] (one pattern per line) or build one
//! in code with [`RuleSet::from_patterns`], then compile a [`Matcher`]:
//!
//! ```
//! use matcher::{Matcher, RuleSet};
//!
//! let rules = RuleSet::from_patterns(["cat", "dog"]).unwrap();
//! let matcher = Matcher::new(&rules).unwrap();
//!
//! let hits = matcher.matches("Hello Cat world");
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].keyword, "cat");
//! assert_eq!(hits[0].start, 6);
//! ```
//!
//! The matcher is immutable once built and is shared by reference across the
//! pipeline worker threads without synchronization.

mod canonical;
mod engine;
mod rules;
mod types;

pub use crate::canonical::canonicalize;
pub use crate::engine::Matcher;
pub use crate::rules::RuleSet;
pub use crate::types::{Candidate, MatchError, MatchHit, MatchResult};
