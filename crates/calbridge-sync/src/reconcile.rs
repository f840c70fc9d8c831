//! The reconciliation pass: compute the minimal action set that makes
//! the destination mirror the source window.

use std::collections::BTreeMap;

use calbridge_gcal::{EventTime, GcalEvent};

use crate::canonical::CanonicalEvent;
use crate::tag::find_sync_id;

/// A matched pair whose compared fields differ.
#[derive(Debug, Clone)]
pub struct UpdatePair {
    pub source: CanonicalEvent,
    pub dest: GcalEvent,
}

/// Result of one reconciliation pass.
///
/// Creates and updates are ordered as the source listing; deletes are
/// ordered by destination id (the leftover pool's key order).
#[derive(Debug, Default)]
pub struct SyncPlan {
    pub creates: Vec<CanonicalEvent>,
    pub updates: Vec<UpdatePair>,
    pub deletes: Vec<GcalEvent>,
    pub unchanged: Vec<CanonicalEvent>,
}

impl SyncPlan {
    pub fn is_noop(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Compute {create, update, delete, ignore} actions for one window.
///
/// Pure: no I/O, no clock. Each destination event can be claimed by at
/// most one source event; candidates are scanned in ascending
/// destination-id order so a tag tie always resolves the same way.
/// Whatever remains unclaimed after all source events are processed is
/// deleted, which is how source-side deletions propagate.
pub fn reconcile(sources: &[CanonicalEvent], dests: Vec<GcalEvent>) -> SyncPlan {
    let mut remaining: BTreeMap<String, GcalEvent> = dests
        .into_iter()
        .map(|event| (event.id.clone(), event))
        .collect();

    let mut plan = SyncPlan::default();

    for source in sources {
        let tag = source.sync_id();
        let matched_id = remaining
            .iter()
            .find(|(_, dest)| find_sync_id(&dest.description) == Some(tag.as_str()))
            .map(|(id, _)| id.clone());

        match matched_id.and_then(|id| remaining.remove(&id)) {
            Some(dest) => {
                if differs(source, &dest) {
                    plan.updates.push(UpdatePair {
                        source: source.clone(),
                        dest,
                    });
                } else {
                    plan.unchanged.push(source.clone());
                }
            }
            None => plan.creates.push(source.clone()),
        }
    }

    plan.deletes = remaining.into_values().collect();
    plan
}

/// The explicit comparison contract: exactly {summary, description,
/// start, end}. Destination-managed metadata never participates.
pub fn differs(source: &CanonicalEvent, dest: &GcalEvent) -> bool {
    source.summary != dest.summary
        || source.description != dest.description
        || !time_eq(&source.start, &dest.start)
        || !time_eq(&source.end, &dest.end)
}

// Compare only the value fields; the destination may attach a timeZone
// we never write.
fn time_eq(a: &EventTime, b: &EventTime) -> bool {
    a.date == b.date && a.date_time == b.date_time
}
