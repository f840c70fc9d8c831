//! Canonical event form and the source-side canonicalizer.

use calbridge_garoon::GaroonEvent;
use calbridge_gcal::{EventPayload, EventTime};
use chrono::{Days, SecondsFormat};

use crate::filter::should_ignore;
use crate::tag::format_sync_id;

/// Attendee names rendered before the omission marker cuts the list off.
const ATTENDEE_DISPLAY_LIMIT: usize = 12;
const ATTENDEE_OMISSION_MARKER: &str = "...その他省略";
const DESCRIPTION_DELIMITER: &str = "----------";

/// Comparison-ready representation of one source event.
///
/// `description` is the fully rendered destination text, so the
/// correlation tag is already embedded as its last line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalEvent {
    pub source_id: i64,
    pub summary: String,
    pub all_day: bool,
    pub start: EventTime,
    pub end: EventTime,
    pub description: String,
}

impl CanonicalEvent {
    /// Correlation tag, a pure function of the source id.
    pub fn sync_id(&self) -> String {
        format_sync_id(self.source_id)
    }

    /// The write payload for the destination API.
    pub fn payload(&self) -> EventPayload {
        EventPayload {
            summary: self.summary.clone(),
            description: self.description.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
        }
    }
}

/// Map one source event into canonical form.
///
/// `link_base` is the configured base URL for deep links back into the
/// source system.
pub fn canonicalize(event: &GaroonEvent, link_base: &str) -> CanonicalEvent {
    let (start, end) = if event.is_all_day {
        // The source end date is inclusive; the destination convention
        // is exclusive, hence the one-day shift.
        let start_date = event.start.date_time.date_naive();
        let end_date = event.end.date_time.date_naive() + Days::new(1);
        (
            EventTime::date(start_date.format("%Y-%m-%d").to_string()),
            EventTime::date(end_date.format("%Y-%m-%d").to_string()),
        )
    } else {
        (
            EventTime::date_time(
                event
                    .start
                    .date_time
                    .to_rfc3339_opts(SecondsFormat::Secs, false),
            ),
            EventTime::date_time(
                event
                    .end
                    .date_time
                    .to_rfc3339_opts(SecondsFormat::Secs, false),
            ),
        )
    };

    let url = format!(
        "{}/schedule/view?event={}",
        link_base.trim_end_matches('/'),
        event.id
    );
    let attendees = render_attendee_line(event);
    let sync_id = format_sync_id(event.id);

    let description = format!(
        "{}\n{}\n\n{}\n{}\n{}\n{}",
        url, attendees, DESCRIPTION_DELIMITER, event.notes, DESCRIPTION_DELIMITER, sync_id
    );

    CanonicalEvent {
        source_id: event.id,
        summary: event.subject.clone(),
        all_day: event.is_all_day,
        start,
        end,
        description,
    }
}

fn render_attendee_line(event: &GaroonEvent) -> String {
    let mut line = format!("参加者({}名): ", event.attendees.len());
    for attendee in event.attendees.iter().take(ATTENDEE_DISPLAY_LIMIT) {
        line.push_str(&attendee.name);
        line.push_str("  ");
    }
    if event.attendees.len() >= ATTENDEE_DISPLAY_LIMIT {
        line.push_str(ATTENDEE_OMISSION_MARKER);
    }
    line
}

/// Canonicalize a listing, dropping title-filtered events.
///
/// Skipped events are reported on the audit trace; they are not looked
/// up on the destination side at all.
pub fn canonicalize_all(events: &[GaroonEvent], link_base: &str) -> Vec<CanonicalEvent> {
    events
        .iter()
        .filter(|event| {
            if should_ignore(&event.subject) {
                println!("Title ignore {}", event.subject);
                tracing::info!(subject = %event.subject, "title ignore");
                false
            } else {
                true
            }
        })
        .map(|event| canonicalize(event, link_base))
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use calbridge_garoon::{GaroonAttendee, GaroonDateTime};
    use chrono::{DateTime, FixedOffset, TimeZone};

    fn jst(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
    }

    fn event(id: i64, subject: &str) -> GaroonEvent {
        GaroonEvent {
            id,
            subject: subject.into(),
            notes: "body text".into(),
            is_all_day: false,
            start: GaroonDateTime {
                date_time: jst(2024, 6, 14, 10, 0),
                time_zone: "Asia/Tokyo".into(),
            },
            end: GaroonDateTime {
                date_time: jst(2024, 6, 14, 11, 0),
                time_zone: "Asia/Tokyo".into(),
            },
            attendees: vec![],
        }
    }

    fn attendees(n: usize) -> Vec<GaroonAttendee> {
        (0..n)
            .map(|i| GaroonAttendee {
                name: format!("名前{}", i),
                code: format!("user{}", i),
            })
            .collect()
    }

    #[test]
    fn timed_event_keeps_the_offset() {
        let canonical = canonicalize(&event(42, "meeting"), "https://grn.example.com");
        assert_eq!(
            canonical.start,
            EventTime::date_time("2024-06-14T10:00:00+09:00")
        );
        assert_eq!(
            canonical.end,
            EventTime::date_time("2024-06-14T11:00:00+09:00")
        );
        assert!(!canonical.all_day);
    }

    #[test]
    fn single_day_all_day_event_gets_exclusive_end() {
        let mut e = event(42, "holiday");
        e.is_all_day = true;
        e.start.date_time = jst(2024, 6, 14, 0, 0);
        e.end.date_time = jst(2024, 6, 14, 0, 0);

        let canonical = canonicalize(&e, "https://grn.example.com");
        assert_eq!(canonical.start, EventTime::date("2024-06-14"));
        assert_eq!(canonical.end, EventTime::date("2024-06-15"));
    }

    #[test]
    fn all_day_end_rolls_over_month_boundaries() {
        let mut e = event(1, "offsite");
        e.is_all_day = true;
        e.start.date_time = jst(2024, 6, 28, 0, 0);
        e.end.date_time = jst(2024, 6, 30, 0, 0);

        let canonical = canonicalize(&e, "https://grn.example.com");
        assert_eq!(canonical.end, EventTime::date("2024-07-01"));
    }

    #[test]
    fn description_layout_is_deterministic() {
        let canonical = canonicalize(&event(42, "meeting"), "https://grn.example.com");
        assert_eq!(
            canonical.description,
            "https://grn.example.com/schedule/view?event=42\n\
             参加者(0名): \n\
             \n\
             ----------\n\
             body text\n\
             ----------\n\
             sync-id=42"
        );
    }

    #[test]
    fn tag_is_the_last_line_of_the_description() {
        let canonical = canonicalize(&event(7, "meeting"), "https://grn.example.com");
        assert_eq!(canonical.description.lines().last(), Some("sync-id=7"));
        assert_eq!(canonical.sync_id(), "sync-id=7");
    }

    #[test]
    fn trailing_slash_on_link_base_is_tolerated() {
        let canonical = canonicalize(&event(7, "meeting"), "https://grn.example.com/");
        assert!(canonical
            .description
            .starts_with("https://grn.example.com/schedule/view?event=7\n"));
    }

    #[test]
    fn attendee_truncation_after_twelve_names() {
        let mut e = event(1, "big meeting");
        e.attendees = attendees(13);
        let canonical = canonicalize(&e, "https://grn.example.com");

        let line = canonical.description.lines().nth(1).unwrap();
        assert!(line.starts_with("参加者(13名): "));
        assert!(line.contains("名前11"));
        assert!(!line.contains("名前12"));
        assert!(line.ends_with(ATTENDEE_OMISSION_MARKER));
    }

    #[test]
    fn few_attendees_render_without_marker() {
        let mut e = event(1, "small meeting");
        e.attendees = attendees(5);
        let canonical = canonicalize(&e, "https://grn.example.com");

        let line = canonical.description.lines().nth(1).unwrap();
        assert_eq!(line, "参加者(5名): 名前0  名前1  名前2  名前3  名前4  ");
        assert!(!line.contains(ATTENDEE_OMISSION_MARKER));
    }

    #[test]
    fn canonicalize_is_stable_across_calls() {
        let e = event(42, "meeting");
        assert_eq!(
            canonicalize(&e, "https://grn.example.com"),
            canonicalize(&e, "https://grn.example.com")
        );
    }

    #[test]
    fn canonicalize_all_drops_filtered_titles() {
        let events = vec![event(1, "[skip] standup"), event(2, "standup")];
        let canonical = canonicalize_all(&events, "https://grn.example.com");
        assert_eq!(canonical.len(), 1);
        assert_eq!(canonical[0].source_id, 2);
    }

    #[test]
    fn payload_mirrors_the_canonical_fields() {
        let canonical = canonicalize(&event(42, "meeting"), "https://grn.example.com");
        let payload = canonical.payload();
        assert_eq!(payload.summary, canonical.summary);
        assert_eq!(payload.description, canonical.description);
        assert_eq!(payload.start, canonical.start);
        assert_eq!(payload.end, canonical.end);
    }
}
