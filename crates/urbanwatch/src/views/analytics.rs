//! Aggregates for the analytics screen and the dashboard header.
//!
//! Everything here is a pure function of the report list (and, for the daily
//! histogram, of "now"), so the same list always yields the same numbers.

use crate::model::{Priority, Report, Status};
use chrono::{DateTime, Days, Local, NaiveDate, TimeZone};
use serde::Serialize;

/// How many categories and cities the ranking views keep.
pub const TOP_N: usize = 6;
/// Length of the daily histogram, today included.
pub const HISTOGRAM_DAYS: u64 = 7;
/// City label for reports that have no city.
pub const UNKNOWN_CITY: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    /// Short weekday name, e.g. `Mon`.
    pub label: String,
    pub count: usize,
}

/// Status buckets. `open` is everything still waiting for work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusBuckets {
    pub open: usize,
    pub resolved: usize,
    pub other: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analytics {
    pub total: usize,
    pub by_status: StatusBuckets,
    pub top_categories: Vec<LabelCount>,
    pub top_cities: Vec<LabelCount>,
    pub top_city: Option<String>,
    pub last_7_days: Vec<DayCount>,
    /// Percentage of resolved reports, rounded half up.
    pub resolved_rate: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    pub resolved: usize,
    pub pending: usize,
    pub urgent: usize,
}

/// Analytics relative to the current local time.
pub fn compute_analytics(reports: &[Report]) -> Analytics {
    compute_analytics_at(reports, Local::now())
}

/// Analytics with an explicit "now". Days are calendar days in `now`'s time zone.
pub fn compute_analytics_at<Tz: TimeZone>(reports: &[Report], now: DateTime<Tz>) -> Analytics {
    let tz = now.timezone();
    let today = now.date_naive();

    let mut by_status = StatusBuckets::default();
    let mut categories = Tally::default();
    let mut cities = Tally::default();
    let days: Vec<NaiveDate> = (0..HISTOGRAM_DAYS)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .collect();
    let mut day_counts = vec![0usize; days.len()];

    for report in reports {
        match report.status {
            Status::Pending => by_status.open += 1,
            Status::Resolved => by_status.resolved += 1,
            Status::InProgress | Status::Rejected | Status::Other(_) => by_status.other += 1,
        }

        categories.add(report.category.as_str());
        cities.add(city_label(report));

        let day = report.timestamp.with_timezone(&tz).date_naive();
        if let Some(slot) = days.iter().position(|d| *d == day) {
            day_counts[slot] += 1;
        }
    }

    let total = reports.len();
    let top_cities = cities.top(TOP_N);
    let top_city = top_cities.first().map(|c| c.label.clone());

    Analytics {
        total,
        by_status,
        top_categories: categories.top(TOP_N),
        top_cities,
        top_city,
        last_7_days: days
            .into_iter()
            .zip(day_counts)
            .map(|(date, count)| DayCount {
                date,
                label: date.format("%a").to_string(),
                count,
            })
            .collect(),
        resolved_rate: percent(by_status.resolved, total),
    }
}

pub fn dashboard_stats(reports: &[Report]) -> DashboardStats {
    reports
        .iter()
        .fold(DashboardStats::default(), |mut stats, report| {
            stats.total += 1;
            match report.status {
                Status::Resolved => stats.resolved += 1,
                Status::Pending => stats.pending += 1,
                _ => {}
            }
            if report.priority == Priority::Urgent {
                stats.urgent += 1;
            }
            stats
        })
}

fn city_label(report: &Report) -> &str {
    report
        .city()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(UNKNOWN_CITY)
}

/// `round(part / total * 100)` with halves rounded up, in integer arithmetic.
fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part * 200 + total) / (2 * total)) as u32
}

/// Frequency counter that remembers first-seen order for tie breaking.
#[derive(Default)]
struct Tally {
    entries: Vec<(String, usize)>,
}

impl Tally {
    fn add(&mut self, label: &str) {
        match self.entries.iter_mut().find(|(l, _)| l == label) {
            Some((_, count)) => *count += 1,
            None => self.entries.push((label.to_string(), 1)),
        }
    }

    fn top(mut self, n: usize) -> Vec<LabelCount> {
        self.entries.sort_by(|a, b| b.1.cmp(&a.1));
        self.entries
            .into_iter()
            .take(n)
            .map(|(label, count)| LabelCount { label, count })
            .collect()
    }
}
