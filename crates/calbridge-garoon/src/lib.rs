//! Garoon schedule integration for calbridge.
//!
//! Read-only client for the authoritative schedule source.

pub mod client;
pub mod error;
pub mod types;

pub use client::{GaroonClient, SearchEventParams};
pub use error::GaroonError;
pub use types::{EventListResponse, GaroonAttendee, GaroonDateTime, GaroonEvent};
