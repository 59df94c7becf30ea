use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Deserialize;

use crate::export::CsvPayload;
use crate::registration::domain::{EventWithSubscriptions, Subscription};

pub const EXPORT_HEADERS: [&str; 6] = ["#", "Nombre", "Email", "Teléfono", "Fecha", "Confirmado"];

const CONFIRMED_LABEL: &str = "Sí";

/// Dates are displayed in Colombia time (UTC-5, no daylight saving).
const DISPLAY_UTC_OFFSET_SECS: i32 = -5 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    Email,
    Phone,
    CreatedAt,
    Confirmed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Column ordering selected on the subscriber table. No key keeps the fetched order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct SubscriberSort {
    #[serde(default)]
    pub sort: Option<SortKey>,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SubscriberSort {
    pub fn by(key: SortKey, direction: SortDirection) -> Self {
        Self {
            sort: Some(key),
            direction,
        }
    }
}

/// Rows as currently displayed. Sorting is stable, so ties keep the fetched order.
pub fn sorted_subscribers(
    subscriptions: &[Subscription],
    order: SubscriberSort,
) -> Vec<&Subscription> {
    let mut rows: Vec<&Subscription> = subscriptions.iter().collect();
    let Some(key) = order.sort else {
        return rows;
    };

    rows.sort_by(|left, right| {
        let ordering = compare(left, right, key);
        match order.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
    rows
}

fn compare(left: &Subscription, right: &Subscription, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => left.name.to_lowercase().cmp(&right.name.to_lowercase()),
        SortKey::Email => left.email.to_lowercase().cmp(&right.email.to_lowercase()),
        SortKey::Phone => left.phone.cmp(&right.phone),
        SortKey::CreatedAt => left.created_at.cmp(&right.created_at),
        SortKey::Confirmed => left.is_confirmed().cmp(&right.is_confirmed()),
    }
}

pub fn display_date(timestamp: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(DISPLAY_UTC_OFFSET_SECS) {
        Some(offset) => timestamp.with_timezone(&offset).format("%-d/%-m/%Y").to_string(),
        None => timestamp.format("%-d/%-m/%Y").to_string(),
    }
}

/// Cells for the export, numbered in display order.
pub fn export_rows(rows: &[&Subscription]) -> Vec<Vec<String>> {
    rows.iter()
        .enumerate()
        .map(|(index, subscription)| {
            vec![
                (index + 1).to_string(),
                subscription.name.clone(),
                subscription.email.clone(),
                subscription.phone.clone(),
                subscription.created_at.map(display_date).unwrap_or_default(),
                if subscription.is_confirmed() {
                    CONFIRMED_LABEL.to_string()
                } else {
                    String::new()
                },
            ]
        })
        .collect()
}

/// `<event-slug>-inscritos-<YYYY-MM-DD>.csv`. Path separators count as
/// whitespace so the name always stays a single path component.
pub fn export_filename(event_name: &str, date: NaiveDate) -> String {
    let slug = event_name
        .to_lowercase()
        .replace(['/', '\\'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    format!("{slug}-inscritos-{}.csv", date.format("%Y-%m-%d"))
}

/// Snapshot of one event's subscriber table ready to be delivered as a file.
#[derive(Debug, Clone)]
pub struct SubscriberExport {
    pub filename: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SubscriberExport {
    pub fn snapshot(event: &EventWithSubscriptions, order: SubscriberSort, date: NaiveDate) -> Self {
        let displayed = sorted_subscribers(&event.subscriptions, order);
        Self {
            filename: export_filename(&event.name, date),
            headers: EXPORT_HEADERS.iter().map(|header| header.to_string()).collect(),
            rows: export_rows(&displayed),
        }
    }

    pub fn payload(&self) -> CsvPayload {
        CsvPayload::render(&self.headers, &self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn subscription(id: &str, name: &str, email: &str, created: (u32, u32)) -> Subscription {
        Subscription {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            phone: "3001111111".to_string(),
            event_id: "evt-1".to_string(),
            accepts_data_policy: true,
            created_at: Some(
                Utc.with_ymd_and_hms(2025, 6, created.0, created.1, 0, 0)
                    .single()
                    .expect("valid timestamp"),
            ),
            confirmed_at: None,
            confirmation_token: None,
        }
    }

    fn sample_event() -> EventWithSubscriptions {
        EventWithSubscriptions {
            id: "evt-1".to_string(),
            name: "Emociones y Liderazgo".to_string(),
            max_capacity: 200,
            current_count: 3,
            subscriptions: vec![
                subscription("sub-3", "beatriz Ruiz", "bea@example.com", (17, 9)),
                subscription("sub-2", "Carlos López", "carlos@example.com", (16, 12)),
                subscription("sub-1", "Ana García", "ana@example.com", (15, 10)),
            ],
        }
    }

    #[test]
    fn filename_uses_slug_and_iso_date() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 16).expect("valid date");
        assert_eq!(
            export_filename("Emociones y Liderazgo", date),
            "emociones-y-liderazgo-inscritos-2026-02-16.csv"
        );
    }

    #[test]
    fn filename_never_contains_path_separators() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 16).expect("valid date");
        assert_eq!(
            export_filename("Taller 1/2: Finanzas", date),
            "taller-1-2:-finanzas-inscritos-2026-02-16.csv"
        );
        assert_eq!(
            export_filename("Ahorro \\ Inversión / Deuda", date),
            "ahorro-inversión-deuda-inscritos-2026-02-16.csv"
        );
    }

    #[test]
    fn display_date_uses_colombia_calendar_day() {
        let late_evening = Utc
            .with_ymd_and_hms(2025, 6, 16, 3, 30, 0)
            .single()
            .expect("valid timestamp");
        assert_eq!(display_date(late_evening), "15/6/2025");
    }

    #[test]
    fn default_order_keeps_fetched_rows() {
        let event = sample_event();
        let rows = sorted_subscribers(&event.subscriptions, SubscriberSort::default());
        let ids: Vec<_> = rows.iter().map(|row| row.id.as_str()).collect();
        assert_eq!(ids, ["sub-3", "sub-2", "sub-1"]);
    }

    #[test]
    fn name_sort_ignores_case() {
        let event = sample_event();
        let rows = sorted_subscribers(
            &event.subscriptions,
            SubscriberSort::by(SortKey::Name, SortDirection::Asc),
        );
        let names: Vec<_> = rows.iter().map(|row| row.name.as_str()).collect();
        assert_eq!(names, ["Ana García", "beatriz Ruiz", "Carlos López"]);
    }

    #[test]
    fn export_snapshot_follows_displayed_order() {
        let event = sample_event();
        let date = NaiveDate::from_ymd_opt(2026, 2, 16).expect("valid date");
        let export = SubscriberExport::snapshot(
            &event,
            SubscriberSort::by(SortKey::CreatedAt, SortDirection::Asc),
            date,
        );

        assert_eq!(export.headers, EXPORT_HEADERS);
        assert_eq!(
            export.rows[0],
            ["1", "Ana García", "ana@example.com", "3001111111", "15/6/2025", ""]
        );
        assert_eq!(export.rows[2][0], "3");
        assert_eq!(export.rows[2][1], "beatriz Ruiz");
        assert!(export
            .payload()
            .as_str()
            .starts_with("\u{feff}#,Nombre,Email,Teléfono,Fecha,Confirmado\n1,Ana García"));
    }

    #[test]
    fn confirmed_subscribers_are_flagged() {
        let mut event = sample_event();
        event.subscriptions[0].confirmed_at = event.subscriptions[0].created_at;
        let date = NaiveDate::from_ymd_opt(2026, 2, 16).expect("valid date");
        let export = SubscriberExport::snapshot(&event, SubscriberSort::default(), date);
        assert_eq!(export.rows[0][5], "Sí");
        assert_eq!(export.rows[1][5], "");
    }
}
