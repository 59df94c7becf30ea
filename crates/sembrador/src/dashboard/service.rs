use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use super::table::{SubscriberExport, SubscriberSort};
use super::views::{search_subscribers, EventOverview, SubscriberMatch};
use crate::registration::backend::{BackendError, RegistrationBackend};

/// Read side of the admin dashboard.
pub struct DashboardService<B: ?Sized> {
    backend: Arc<B>,
}

impl<B> DashboardService<B>
where
    B: RegistrationBackend + ?Sized + 'static,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub async fn overview(&self) -> Result<Vec<EventOverview>, DashboardError> {
        let events = self.backend.fetch_events_with_subscriptions().await?;
        Ok(events.into_iter().map(EventOverview::from_event).collect())
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SubscriberMatch>, DashboardError> {
        if query.chars().count() < super::views::MIN_SEARCH_CHARS {
            return Ok(Vec::new());
        }
        let events = self.backend.fetch_events_with_subscriptions().await?;
        Ok(search_subscribers(&events, query))
    }

    /// Snapshot of one event's subscriber table in the requested order.
    pub async fn export(
        &self,
        event_id: &str,
        order: SubscriberSort,
        date: NaiveDate,
    ) -> Result<SubscriberExport, DashboardError> {
        let events = self.backend.fetch_events_with_subscriptions().await?;
        let event = events
            .iter()
            .find(|event| event.id == event_id)
            .ok_or_else(|| DashboardError::UnknownEvent(event_id.to_string()))?;

        let export = SubscriberExport::snapshot(event, order, date);
        info!(
            event_id,
            rows = export.rows.len(),
            filename = %export.filename,
            "subscriber export prepared"
        );
        Ok(export)
    }

    /// Snapshots for every event, in dashboard order.
    pub async fn export_all(
        &self,
        order: SubscriberSort,
        date: NaiveDate,
    ) -> Result<Vec<SubscriberExport>, DashboardError> {
        let events = self.backend.fetch_events_with_subscriptions().await?;
        Ok(events
            .iter()
            .map(|event| SubscriberExport::snapshot(event, order, date))
            .collect())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("event '{0}' not found")]
    UnknownEvent(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}
