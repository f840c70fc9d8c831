//! The reconciliation engine.
//!
//! Pipeline: title filter → canonicalizer → reconciler → change
//! applier. The reconcile step is pure; all I/O is confined to the
//! applier, which talks to the destination client.

pub mod apply;
pub mod canonical;
pub mod filter;
pub mod reconcile;
pub mod tag;

pub use apply::{Applier, ApplyError, ApplyStats, RetryPolicy};
pub use canonical::{canonicalize, canonicalize_all, CanonicalEvent};
pub use filter::should_ignore;
pub use reconcile::{differs, reconcile, SyncPlan, UpdatePair};
pub use tag::{find_sync_id, format_sync_id};
