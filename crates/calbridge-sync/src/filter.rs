//! Title-based exclusion of source events.

use std::sync::OnceLock;

use regex::Regex;

/// Bracketed marker, full-width or half-width, containing one of the
/// skip keywords or nothing at all.
const IGNORE_PATTERN: &str = r"(?i)[【\[](skip|postponed|延期|)[】\]]";

// The pattern is a compile-time constant, covered by tests.
#[allow(clippy::unwrap_used)]
fn ignore_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(IGNORE_PATTERN).unwrap())
}

/// Whether a source event is excluded from sync entirely based on its
/// subject. Excluded events are never matched against the destination,
/// so marking an already-synced event only stops future updates; the
/// orphan pass is what removes its destination copy.
pub fn should_ignore(subject: &str) -> bool {
    ignore_regex().is_match(subject)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_markers_are_ignored() {
        assert!(should_ignore("[skip] meeting"));
        assert!(should_ignore("[SKIP] meeting"));
        assert!(should_ignore("【skip】meeting"));
        assert!(should_ignore("【延期】meeting"));
        assert!(should_ignore("[postponed] meeting"));
    }

    #[test]
    fn empty_brackets_are_ignored() {
        assert!(should_ignore("[] meeting"));
        assert!(should_ignore("【】meeting"));
    }

    #[test]
    fn marker_position_does_not_matter() {
        assert!(should_ignore("meeting [skip]"));
    }

    #[test]
    fn mixed_bracket_styles_match() {
        assert!(should_ignore("[延期】meeting"));
    }

    #[test]
    fn plain_titles_pass() {
        assert!(!should_ignore("meeting"));
        assert!(!should_ignore("skip the small talk"));
    }

    #[test]
    fn other_bracketed_markers_pass() {
        assert!(!should_ignore("[important] meeting"));
        assert!(!should_ignore("【重要】meeting"));
    }
}
