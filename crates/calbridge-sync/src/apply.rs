//! Change application against the destination calendar.
//!
//! Creates and deletes are fail-fast: the first error aborts the run.
//! Updates are retried with exponential backoff and jitter before the
//! last error is surfaced. Nothing is rolled back; re-running the sync
//! is the recovery path, which is safe because matching is by
//! correlation tag rather than destination id.

use std::time::Duration;

use calbridge_gcal::{GcalClient, GcalError};
use rand::Rng;
use thiserror::Error;

use crate::reconcile::SyncPlan;

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("insert of event {summary:?} failed: {source}")]
    Insert {
        summary: String,
        #[source]
        source: GcalError,
    },

    #[error("update of event {summary:?} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        summary: String,
        attempts: u32,
        #[source]
        source: GcalError,
    },

    #[error("delete of event {summary:?} failed: {source}")]
    Delete {
        summary: String,
        #[source]
        source: GcalError,
    },
}

/// Backoff schedule for update retries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Unit for the exponential schedule; the n-th retry waits
    /// `base_delay * 2^n` plus a random jitter in `[0, base_delay)`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.base_delay * factor + self.jitter()
    }

    fn jitter(&self) -> Duration {
        self.base_delay.mul_f64(rand::thread_rng().gen_range(0.0..1.0))
    }
}

/// Counts of applied actions, for the end-of-run summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplyStats {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

pub struct Applier<'a> {
    client: &'a GcalClient,
    calendar_id: &'a str,
    retry: RetryPolicy,
}

impl<'a> Applier<'a> {
    pub fn new(client: &'a GcalClient, calendar_id: &'a str) -> Self {
        Self {
            client,
            calendar_id,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Execute a plan: creates and updates in source-listing order,
    /// deletes afterward. Each action is announced on the audit trace
    /// before it runs, so an aborted run remains auditable.
    pub async fn apply(&self, plan: SyncPlan) -> Result<ApplyStats, ApplyError> {
        let mut stats = ApplyStats {
            unchanged: plan.unchanged.len(),
            ..ApplyStats::default()
        };

        for event in &plan.unchanged {
            println!("Ignore event {}", event.summary);
        }

        for event in &plan.creates {
            println!("Insert new event {}", event.summary);
            self.client
                .insert_event(self.calendar_id, &event.payload())
                .await
                .map_err(|source| ApplyError::Insert {
                    summary: event.summary.clone(),
                    source,
                })?;
            stats.created += 1;
        }

        for pair in &plan.updates {
            println!("Update event {}", pair.source.summary);
            self.update_with_retry(&pair.source.summary, &pair.dest.id, &pair.source)
                .await?;
            stats.updated += 1;
        }

        for event in &plan.deletes {
            println!("Delete event {}", event.summary);
            self.client
                .delete_event(self.calendar_id, &event.id)
                .await
                .map_err(|source| ApplyError::Delete {
                    summary: event.summary.clone(),
                    source,
                })?;
            stats.deleted += 1;
        }

        Ok(stats)
    }

    async fn update_with_retry(
        &self,
        summary: &str,
        dest_id: &str,
        source: &crate::canonical::CanonicalEvent,
    ) -> Result<(), ApplyError> {
        let payload = source.payload();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match self
                .client
                .update_event(self.calendar_id, dest_id, &payload)
                .await
            {
                Ok(_) => return Ok(()),
                Err(err) => {
                    let retry = attempts; // next retry number, 1-based
                    if retry > self.retry.max_retries {
                        return Err(ApplyError::RetriesExhausted {
                            summary: summary.to_string(),
                            attempts,
                            source: err,
                        });
                    }
                    let delay = self.retry.delay_for_retry(retry);
                    tracing::warn!(
                        %err,
                        retry,
                        max_retries = self.retry.max_retries,
                        ?delay,
                        "update failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::canonical::CanonicalEvent;
    use crate::reconcile::UpdatePair;
    use calbridge_gcal::{EventTime, GcalEvent};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
        }
    }

    fn canonical(id: i64, summary: &str) -> CanonicalEvent {
        CanonicalEvent {
            source_id: id,
            summary: summary.into(),
            all_day: false,
            start: EventTime::date_time("2024-06-14T10:00:00+09:00"),
            end: EventTime::date_time("2024-06-14T11:00:00+09:00"),
            description: format!("link\n\n----------\nnotes\n----------\nsync-id={}", id),
        }
    }

    fn dest(dest_id: &str, summary: &str) -> GcalEvent {
        serde_json::from_value(serde_json::json!({
            "id": dest_id,
            "summary": summary,
            "description": "old",
            "start": {"dateTime": "2024-06-14T10:00:00+09:00"},
            "end": {"dateTime": "2024-06-14T11:00:00+09:00"}
        }))
        .unwrap()
    }

    fn created_body() -> serde_json::Value {
        serde_json::json!({"id": "new1", "summary": "x"})
    }

    #[test]
    fn backoff_grows_exponentially() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
        };
        let d1 = policy.delay_for_retry(1);
        let d3 = policy.delay_for_retry(3);

        // 2^1 * 100ms plus jitter below 100ms.
        assert!(d1 >= Duration::from_millis(200) && d1 < Duration::from_millis(300));
        assert!(d3 >= Duration::from_millis(800) && d3 < Duration::from_millis(900));
    }

    #[tokio::test]
    async fn create_inserts_the_payload() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(created_body()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = GcalClient::with_base_url("token", &mock_server.uri());
        let plan = SyncPlan {
            creates: vec![canonical(1, "new event")],
            ..SyncPlan::default()
        };

        let stats = Applier::new(&client, "primary").apply(plan).await.unwrap();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.updated, 0);
    }

    #[tokio::test]
    async fn create_failure_aborts_without_retry() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = GcalClient::with_base_url("token", &mock_server.uri());
        let plan = SyncPlan {
            creates: vec![canonical(1, "first"), canonical(2, "second")],
            ..SyncPlan::default()
        };

        let err = Applier::new(&client, "primary").apply(plan).await.unwrap_err();
        assert!(matches!(err, ApplyError::Insert { .. }));
    }

    #[tokio::test]
    async fn update_retries_until_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/calendars/primary/events/d1"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&mock_server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/calendars/primary/events/d1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(created_body()))
            .mount(&mock_server)
            .await;

        let client = GcalClient::with_base_url("token", &mock_server.uri());
        let plan = SyncPlan {
            updates: vec![UpdatePair {
                source: canonical(1, "changed"),
                dest: dest("d1", "changed"),
            }],
            ..SyncPlan::default()
        };

        let stats = Applier::new(&client, "primary")
            .with_retry_policy(fast_policy(5))
            .apply(plan)
            .await
            .unwrap();
        assert_eq!(stats.updated, 1);
    }

    #[tokio::test]
    async fn update_surfaces_last_error_when_retries_run_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/calendars/primary/events/d1"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3) // initial attempt + 2 retries
            .mount(&mock_server)
            .await;

        let client = GcalClient::with_base_url("token", &mock_server.uri());
        let plan = SyncPlan {
            updates: vec![UpdatePair {
                source: canonical(1, "stuck"),
                dest: dest("d1", "stuck"),
            }],
            ..SyncPlan::default()
        };

        let err = Applier::new(&client, "primary")
            .with_retry_policy(fast_policy(2))
            .apply(plan)
            .await
            .unwrap_err();

        match err {
            ApplyError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn delete_failure_aborts_without_retry() {
        let mock_server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/calendars/primary/events/gone1"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = GcalClient::with_base_url("token", &mock_server.uri());
        let plan = SyncPlan {
            deletes: vec![dest("gone1", "orphan")],
            ..SyncPlan::default()
        };

        let err = Applier::new(&client, "primary").apply(plan).await.unwrap_err();
        assert!(matches!(err, ApplyError::Delete { .. }));
    }

    #[tokio::test]
    async fn deletes_run_after_creates() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(created_body()))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/calendars/primary/events/old1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = GcalClient::with_base_url("token", &mock_server.uri());
        let plan = SyncPlan {
            creates: vec![canonical(1, "incoming")],
            deletes: vec![dest("old1", "outgoing")],
            ..SyncPlan::default()
        };

        let stats = Applier::new(&client, "primary").apply(plan).await.unwrap();
        assert_eq!(
            stats,
            ApplyStats {
                created: 1,
                deleted: 1,
                ..ApplyStats::default()
            }
        );
    }
}
