use serde::Serialize;

use crate::registration::domain::{EventWithSubscriptions, Subscription};

/// Minimum query length before the subscriber search returns anything.
pub const MIN_SEARCH_CHARS: usize = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOverview {
    pub id: String,
    pub name: String,
    pub max_capacity: u32,
    pub current_count: u32,
    pub occupancy_pct: u32,
    pub fill_pct: u32,
    pub subscriber_count: usize,
    pub subscriptions: Vec<Subscription>,
}

impl EventOverview {
    pub fn from_event(event: EventWithSubscriptions) -> Self {
        let occupancy_pct = occupancy_pct(event.current_count, event.max_capacity);
        Self {
            occupancy_pct,
            fill_pct: occupancy_pct.min(100),
            subscriber_count: event.subscriptions.len(),
            id: event.id,
            name: event.name,
            max_capacity: event.max_capacity,
            current_count: event.current_count,
            subscriptions: event.subscriptions,
        }
    }

    /// Header line shown above each subscriber table.
    pub fn capacity_label(&self) -> String {
        format!(
            "{} / {} inscritos ({}%)",
            self.current_count, self.max_capacity, self.occupancy_pct
        )
    }
}

/// Rounded share of seats taken. Zero when the event has no capacity set.
pub fn occupancy_pct(current_count: u32, max_capacity: u32) -> u32 {
    if max_capacity == 0 {
        return 0;
    }
    let pct = f64::from(current_count) / f64::from(max_capacity) * 100.0;
    pct.round() as u32
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberMatch {
    pub subscription_id: String,
    pub event_id: String,
    pub event_name: String,
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Subscribers across all events whose email contains `query`, ignoring case.
pub fn search_subscribers(
    events: &[EventWithSubscriptions],
    query: &str,
) -> Vec<SubscriberMatch> {
    if query.chars().count() < MIN_SEARCH_CHARS {
        return Vec::new();
    }

    let needle = query.to_lowercase();
    events
        .iter()
        .flat_map(|event| {
            event
                .subscriptions
                .iter()
                .filter(|subscription| subscription.email.to_lowercase().contains(&needle))
                .map(move |subscription| SubscriberMatch {
                    subscription_id: subscription.id.clone(),
                    event_id: event.id.clone(),
                    event_name: event.name.clone(),
                    name: subscription.name.clone(),
                    email: subscription.email.clone(),
                    phone: subscription.phone.clone(),
                })
        })
        .collect()
}
