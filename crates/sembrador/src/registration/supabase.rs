//! PostgREST binding of [`RegistrationBackend`] for a hosted Supabase project.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::backend::{BackendError, RegistrationBackend};
use super::domain::{
    ConfirmationOutcome, Event, EventWithSubscriptions, Subscription, SubscriptionByToken,
};
use super::validation::ValidatedRegistration;
use crate::config::BackendProject;

pub const SUBSCRIPTIONS_PAGE_SIZE: usize = 1000;

const CREATE_SUBSCRIPTION_RPC: &str = "create_subscription_with_increment";
const SUBSCRIPTIONS_BY_TOKEN_RPC: &str = "get_subscriptions_by_token";
const CONFIRM_ATTENDANCE_RPC: &str = "confirm_attendance_by_token";

pub struct SupabaseBackend {
    http: Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for SupabaseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseBackend")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl SupabaseBackend {
    pub fn new(project: &BackendProject, timeout: Duration) -> Result<Self, BackendError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, &project.url, &project.api_key))
    }

    pub fn with_client(http: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn table(&self, table: &str) -> RequestBuilder {
        self.authorized(self.http.get(format!("{}/rest/v1/{table}", self.base_url)))
    }

    fn rpc(&self, function: &str, params: serde_json::Value) -> RequestBuilder {
        self.authorized(
            self.http
                .post(format!("{}/rest/v1/rpc/{function}", self.base_url))
                .json(&params),
        )
    }

    async fn fetch_subscriptions_for_event(
        &self,
        event_id: &str,
    ) -> Result<Vec<Subscription>, BackendError> {
        let mut all = Vec::new();
        let mut offset = 0usize;
        let event_filter = format!("eq.{event_id}");

        loop {
            let response = self
                .table("event_subscriptions")
                .query(&[
                    ("select", "*"),
                    ("event_id", event_filter.as_str()),
                    ("order", "created_at.desc"),
                ])
                .query(&[("offset", offset), ("limit", SUBSCRIPTIONS_PAGE_SIZE)])
                .send()
                .await?;
            let page: Vec<SubscriptionRow> = read_json(response).await?;
            let page_len = page.len();
            all.extend(page.into_iter().map(Subscription::from));

            if page_len < SUBSCRIPTIONS_PAGE_SIZE {
                break;
            }
            offset += SUBSCRIPTIONS_PAGE_SIZE;
        }

        debug!(event_id, count = all.len(), "fetched event subscriptions");
        Ok(all)
    }
}

#[async_trait]
impl RegistrationBackend for SupabaseBackend {
    async fn fetch_events(&self) -> Result<Vec<Event>, BackendError> {
        let response = self
            .table("events")
            .query(&[("select", "*")])
            .send()
            .await?;
        let rows: Vec<EventRow> = read_json(response).await?;
        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn create_subscription(
        &self,
        registration: &ValidatedRegistration,
    ) -> Result<(), BackendError> {
        let input = registration.input();
        let response = self
            .rpc(
                CREATE_SUBSCRIPTION_RPC,
                json!({
                    "p_name": input.name,
                    "p_email": input.email,
                    "p_phone": input.phone,
                    "p_event_id": input.event_id,
                    "p_accepts_data_policy": input.accepts_data_policy,
                }),
            )
            .send()
            .await?;
        ensure_success(response).await
    }

    async fn fetch_subscriptions_by_token(
        &self,
        token: &str,
    ) -> Result<Vec<SubscriptionByToken>, BackendError> {
        let response = self
            .rpc(SUBSCRIPTIONS_BY_TOKEN_RPC, json!({ "p_token": token }))
            .send()
            .await?;
        let rows: Vec<SubscriptionByTokenRow> = read_json(response).await?;
        Ok(rows.into_iter().map(SubscriptionByToken::from).collect())
    }

    async fn confirm_attendance_by_token(
        &self,
        token: &str,
        event_ids: &[String],
    ) -> Result<ConfirmationOutcome, BackendError> {
        let response = self
            .rpc(
                CONFIRM_ATTENDANCE_RPC,
                json!({ "p_token": token, "p_event_ids": event_ids }),
            )
            .send()
            .await?;
        let raw: String = read_json(response).await?;
        ConfirmationOutcome::parse(&raw)
            .ok_or_else(|| BackendError::Decode(format!("unknown confirmation result '{raw}'")))
    }

    async fn fetch_events_with_subscriptions(
        &self,
    ) -> Result<Vec<EventWithSubscriptions>, BackendError> {
        let response = self
            .table("events")
            .query(&[("select", "*"), ("order", "created_at.asc")])
            .send()
            .await?;
        let events: Vec<EventRow> = read_json(response).await?;

        try_join_all(events.into_iter().map(|row| async move {
            let event = Event::from(row);
            let subscriptions = self.fetch_subscriptions_for_event(&event.id).await?;
            Ok::<_, BackendError>(EventWithSubscriptions {
                id: event.id,
                name: event.name,
                max_capacity: event.max_capacity,
                current_count: event.current_count,
                subscriptions,
            })
        }))
        .await
    }
}

/// Error body returned by PostgREST for failed queries and RPCs.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: String,
}

async fn failure(response: Response) -> BackendError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let error = match serde_json::from_str::<PostgrestError>(&body) {
        Ok(parsed) => BackendError::classify(parsed.code.as_deref(), &parsed.message),
        Err(_) => BackendError::Rpc {
            code: Some(status.as_u16().to_string()),
            message: body,
        },
    };
    warn!(%status, error = %error, "backend call failed");
    error
}

async fn ensure_success(response: Response) -> Result<(), BackendError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(failure(response).await)
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    if !response.status().is_success() {
        return Err(failure(response).await);
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| BackendError::Decode(err.to_string()))
}

fn clamp_count(value: Option<i64>) -> u32 {
    value.unwrap_or(0).clamp(0, i64::from(u32::MAX)) as u32
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventRow {
    pub(crate) id: String,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) max_capacity: Option<i64>,
    #[serde(default)]
    pub(crate) current_count: Option<i64>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            max_capacity: clamp_count(row.max_capacity),
            current_count: clamp_count(row.current_count),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubscriptionRow {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) phone: String,
    pub(crate) event_id: String,
    #[serde(default)]
    pub(crate) accepts_data_policy: Option<bool>,
    #[serde(default)]
    pub(crate) created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) confirmation_token: Option<String>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            event_id: row.event_id,
            accepts_data_policy: row.accepts_data_policy.unwrap_or(false),
            created_at: row.created_at,
            confirmed_at: row.confirmed_at,
            confirmation_token: row.confirmation_token,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubscriptionByTokenRow {
    pub(crate) subscription_id: String,
    pub(crate) event_id: String,
    pub(crate) event_name: String,
    #[serde(default)]
    pub(crate) confirmed_at: Option<DateTime<Utc>>,
}

impl From<SubscriptionByTokenRow> for SubscriptionByToken {
    fn from(row: SubscriptionByTokenRow) -> Self {
        Self {
            subscription_id: row.subscription_id,
            event_id: row.event_id,
            event_name: row.event_name,
            confirmed_at: row.confirmed_at,
        }
    }
}
