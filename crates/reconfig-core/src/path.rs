//! Dotted key helpers

/// Join a prefix and a segment with `.`, skipping an empty prefix
#[inline]
#[must_use]
pub fn join_key(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}
