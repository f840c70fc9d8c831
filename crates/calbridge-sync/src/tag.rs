//! Correlation tag codec.
//!
//! The tag is the only durable link between a source event and its
//! destination copy: a `sync-id=<id>` line embedded at the end of the
//! destination event's description.

const TAG_PREFIX: &str = "sync-id=";

/// Render the correlation tag for a source event id.
pub fn format_sync_id(source_id: i64) -> String {
    format!("{}{}", TAG_PREFIX, source_id)
}

/// Extract the correlation tag from a destination description, if any
/// line carries one. Returns the trimmed tag line including its prefix.
pub fn find_sync_id(description: &str) -> Option<&str> {
    description
        .lines()
        .find(|line| line.starts_with(TAG_PREFIX))
        .map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_is_stable() {
        assert_eq!(format_sync_id(42), "sync-id=42");
        assert_eq!(format_sync_id(42), format_sync_id(42));
        assert_eq!(format_sync_id(0), "sync-id=0");
    }

    #[test]
    fn round_trip_through_a_description() {
        for id in [0, 1, 42, 9_007_199_254_740_993] {
            let description = format!("https://example/view\nnotes\n{}", format_sync_id(id));
            assert_eq!(find_sync_id(&description), Some(format_sync_id(id).as_str()));
        }
    }

    #[test]
    fn tag_anywhere_in_the_text_is_found() {
        let description = "sync-id=7\ntrailing text";
        assert_eq!(find_sync_id(description), Some("sync-id=7"));
    }

    #[test]
    fn trailing_whitespace_is_trimmed() {
        assert_eq!(find_sync_id("sync-id=7  \n"), Some("sync-id=7"));
    }

    #[test]
    fn missing_tag_yields_none() {
        assert_eq!(find_sync_id("no tag here"), None);
        assert_eq!(find_sync_id(""), None);
    }

    #[test]
    fn tag_must_start_the_line() {
        assert_eq!(find_sync_id("see sync-id=7 above"), None);
    }
}
