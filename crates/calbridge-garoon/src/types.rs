//! Garoon schedule API types.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer};

/// One schedule event as returned by `GET /schedule/events`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GaroonEvent {
    /// Garoon event ids are non-empty integers serialized as strings.
    #[serde(deserialize_with = "id_from_string")]
    pub id: i64,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub is_all_day: bool,
    pub start: GaroonDateTime,
    pub end: GaroonDateTime,
    #[serde(default)]
    pub attendees: Vec<GaroonAttendee>,
}

/// Instant with the tenant's timezone attached.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GaroonDateTime {
    pub date_time: DateTime<FixedOffset>,
    #[serde(default)]
    pub time_zone: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GaroonAttendee {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
}

/// Envelope of the event search response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListResponse {
    #[serde(default)]
    pub events: Vec<GaroonEvent>,
    #[serde(default)]
    pub has_next: bool,
}

fn id_from_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrInt {
        String(String),
        Int(i64),
    }

    match StringOrInt::deserialize(deserializer)? {
        StringOrInt::String(s) => s.parse().map_err(serde::de::Error::custom),
        StringOrInt::Int(i) => Ok(i),
    }
}
