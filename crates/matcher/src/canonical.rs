//! Case-erased canonical form used for all matching.

/// Canonicalize text for matching: Unicode lowercase, no locale.
///
/// Idempotent: canonicalizing an already-canonical string returns it
/// unchanged. Byte offsets reported by the matcher refer to this form, not
/// the original input.
pub fn canonicalize(input: &str) -> String {
    input.chars().flat_map(char::to_lowercase).collect()
}
