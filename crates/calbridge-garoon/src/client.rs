//! Garoon schedule API client.

use chrono::{DateTime, FixedOffset, SecondsFormat};
use tracing::instrument;

use crate::error::GaroonError;
use crate::types::{EventListResponse, GaroonEvent};

/// Search parameters for `GET /schedule/events`.
///
/// Unset fields are omitted from the query string entirely.
#[derive(Debug, Clone, Default)]
pub struct SearchEventParams {
    pub limit: u32,
    pub offset: u32,
    pub fields: Vec<String>,
    pub order_by: Option<String>,
    pub range_start: Option<DateTime<FixedOffset>>,
    pub range_end: Option<DateTime<FixedOffset>>,
    pub target: Option<String>,
    /// "user", "organization" or "facility".
    pub target_type: Option<String>,
    pub keyword: Option<String>,
    /// Any of: subject, company, notes, comments.
    pub exclude_from_search: Vec<String>,
}

impl SearchEventParams {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if self.limit != 0 {
            pairs.push(("limit", self.limit.to_string()));
        }
        if self.offset != 0 {
            pairs.push(("offset", self.offset.to_string()));
        }
        if !self.fields.is_empty() {
            pairs.push(("fields", self.fields.join(",")));
        }
        if let Some(order_by) = &self.order_by {
            pairs.push(("orderBy", order_by.clone()));
        }
        if let Some(start) = &self.range_start {
            pairs.push(("rangeStart", start.to_rfc3339_opts(SecondsFormat::Secs, false)));
        }
        if let Some(end) = &self.range_end {
            pairs.push(("rangeEnd", end.to_rfc3339_opts(SecondsFormat::Secs, false)));
        }
        if let Some(target) = &self.target {
            pairs.push(("target", target.clone()));
        }
        if let Some(target_type) = &self.target_type {
            pairs.push(("targetType", target_type.clone()));
        }
        if let Some(keyword) = &self.keyword {
            pairs.push(("keyword", keyword.clone()));
        }
        if !self.exclude_from_search.is_empty() {
            pairs.push(("excludeFromSearch", self.exclude_from_search.join(",")));
        }
        pairs
    }
}

pub struct GaroonClient {
    client: reqwest::Client,
    base_url: String,
    user: String,
    password: String,
}

impl GaroonClient {
    /// Client for a cloud tenant (`https://<subdomain>.cybozu.com/g/api/v1`).
    pub fn new(subdomain: &str, user: &str, password: &str) -> Self {
        Self::with_base_url(
            &format!("https://{}.cybozu.com/g/api/v1", subdomain),
            user,
            password,
        )
    }

    /// Client with an explicit API base URL (package installations, tests).
    pub fn with_base_url(base_url: &str, user: &str, password: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user: user.to_string(),
            password: password.to_string(),
        }
    }

    /// Search schedule events.
    #[instrument(skip(self, params), level = "info")]
    pub async fn search_events(
        &self,
        params: &SearchEventParams,
    ) -> Result<EventListResponse, GaroonError> {
        let url = format!("{}/schedule/events", self.base_url);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.user, Some(&self.password))
            .query(&params.query_pairs())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| GaroonError::ApiError(format!("JSON parse error: {}", e)))
        } else if status.as_u16() == 401 || status.as_u16() == 403 {
            Err(GaroonError::AuthRejected)
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(GaroonError::ApiError(format!("{}: {}", status, text)))
        }
    }

    /// All events of one user inside the window, following pagination.
    #[instrument(skip(self), level = "info")]
    pub async fn events_by_user(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        user_id: Option<&str>,
    ) -> Result<Vec<GaroonEvent>, GaroonError> {
        let mut params = SearchEventParams {
            limit: 1000,
            range_start: Some(start),
            range_end: Some(end),
            ..SearchEventParams::default()
        };
        if let Some(user_id) = user_id {
            params.target = Some(user_id.to_string());
            params.target_type = Some("user".to_string());
        }

        let mut events = Vec::new();
        loop {
            let page = self.search_events(&params).await?;
            let fetched = page.events.len() as u32;
            events.extend(page.events);
            if !page.has_next || fetched == 0 {
                break;
            }
            params.offset += fetched;
        }
        Ok(events)
    }
}
