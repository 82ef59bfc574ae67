//! # Derived Views
//!
//! Read-only projections of the report list. Nothing in this module touches a
//! backend, resolves a location, or mutates its input in place: every function
//! takes the list (and, where distances matter, an optional origin) and returns
//! a new value.
//!
//! - [`filter`]: category and radius filters.
//! - [`sort`]: newest / urgent / nearest ordering.
//! - [`geo`]: haversine distance, rounded to 0.1 km.
//! - [`analytics`]: status buckets, top lists, daily histogram, dashboard counts.
//!
//! ## Distances
//!
//! "No distance" is `None`, never zero. A report without a location is therefore
//! dropped by an active radius filter and sorted after every located report by
//! the nearest sort. When there is no origin at all, radius filtering is skipped
//! and the nearest sort degrades to newest first.
//!
//! ## Queries
//!
//! [`ReportQuery`] bundles the three dashboard controls and applies them in a
//! fixed order: category, then radius, then sort.

pub mod analytics;
pub mod filter;
pub mod geo;
pub mod sort;

pub use analytics::{compute_analytics, dashboard_stats, Analytics, DashboardStats};
pub use filter::{filter_by_category, filter_by_radius, CategoryFilter, RadiusFilter};
pub use geo::{distance_km, report_distance, Coordinates};
pub use sort::{sort_reports, SortMode};

use crate::model::Report;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReportQuery {
    pub category: CategoryFilter,
    pub radius: RadiusFilter,
    pub sort: SortMode,
}

impl ReportQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: CategoryFilter) -> Self {
        self.category = category;
        self
    }

    pub fn with_radius(mut self, radius: RadiusFilter) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_sort(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }

    pub fn apply(&self, reports: Vec<Report>, origin: Option<Coordinates>) -> Vec<Report> {
        let reports = filter_by_category(reports, self.category);
        let reports = filter_by_radius(reports, self.radius, origin);
        sort_reports(reports, self.sort, origin)
    }
}
