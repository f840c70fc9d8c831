//! Google Calendar integration for calbridge.
//!
//! Destination-side client: list, insert, update, delete.

pub mod client;
pub mod error;
pub mod types;

pub use client::GcalClient;
pub use error::GcalError;
pub use types::{
    CalendarListResponse, EventListResponse, EventPayload, EventTime, GcalCalendar, GcalEvent,
    Organizer,
};
