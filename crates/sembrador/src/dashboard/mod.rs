//! Admin dashboard: capacity overview, subscriber search, and the sortable
//! subscriber table that feeds CSV exports.

pub mod router;
pub mod service;
pub mod table;
pub mod views;

pub use router::dashboard_router;
pub use service::{DashboardError, DashboardService};
pub use table::{
    export_filename, sorted_subscribers, SortDirection, SortKey, SubscriberExport,
    SubscriberSort, EXPORT_HEADERS,
};
pub use views::{occupancy_pct, search_subscribers, EventOverview, SubscriberMatch};
