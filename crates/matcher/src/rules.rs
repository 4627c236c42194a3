//! Rule set loading.
//!
//! Rules are plain UTF-8 substring patterns, kept in the order they were
//! supplied. The set is immutable after construction; pattern text is
//! canonicalized later, at automaton build time.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::types::MatchError;

/// An immutable, ordered set of match patterns.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    patterns: Vec<String>,
}

impl RuleSet {
    /// Build a rule set from an iterator of patterns.
    ///
    /// Fails with [`MatchError::EmptyPattern`] if any pattern is empty or
    /// whitespace-only; the index of the offending rule is reported.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, MatchError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = Vec::new();
        for (index, pattern) in patterns.into_iter().enumerate() {
            let pattern = pattern.into();
            if pattern.trim().is_empty() {
                return Err(MatchError::EmptyPattern(index));
            }
            out.push(pattern);
        }
        Ok(Self { patterns: out })
    }

    /// Load rules from a file: one pattern per line, blank lines and lines
    /// starting with `#` skipped. Invalid UTF-8 is a load error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MatchError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| MatchError::RuleFile {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        let patterns: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect();
        let rules = Self::from_patterns(patterns)?;
        info!(path = %path.display(), rules = rules.len(), "loaded match rules");
        Ok(rules)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn preserves_order() {
        let rules = RuleSet::from_patterns(["zebra", "apple", "mango"]).unwrap();
        let listed: Vec<&str> = rules.iter().collect();
        assert_eq!(listed, ["zebra", "apple", "mango"]);
    }

    #[test]
    fn rejects_empty_pattern() {
        let result = RuleSet::from_patterns(["ok", "  "]);
        assert_eq!(result.unwrap_err(), MatchError::EmptyPattern(1));
    }

    #[test]
    fn loads_file_skipping_comments() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# toxic keywords").unwrap();
        writeln!(file, "cat").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  dog  ").unwrap();

        let rules = RuleSet::from_file(file.path()).unwrap();
        let listed: Vec<&str> = rules.iter().collect();
        assert_eq!(listed, ["cat", "dog"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = RuleSet::from_file("/nonexistent/rules.txt");
        assert!(matches!(result, Err(MatchError::RuleFile { .. })));
    }
}
