use super::geo::{report_distance, Coordinates};
use crate::model::{Priority, Report};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Newest,
    Urgent,
    Nearest,
}

impl SortMode {
    pub const ALL: [SortMode; 3] = [SortMode::Newest, SortMode::Urgent, SortMode::Nearest];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Newest => "newest",
            SortMode::Urgent => "urgent",
            SortMode::Nearest => "nearest",
        }
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("Unknown sort mode: {}", s))
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sorts reports for display. All modes are stable.
///
/// - `Newest`: timestamp descending.
/// - `Urgent`: urgent-priority reports first, each group newest first.
/// - `Nearest`: ascending distance from `origin`; reports without a location
///   go last. Equal distances fall back to newest first. Without an origin
///   this is the same as `Newest`.
pub fn sort_reports(
    mut reports: Vec<Report>,
    mode: SortMode,
    origin: Option<Coordinates>,
) -> Vec<Report> {
    match (mode, origin) {
        (SortMode::Urgent, _) => {
            reports.sort_by(|a, b| {
                let a_urgent = a.priority == Priority::Urgent;
                let b_urgent = b.priority == Priority::Urgent;
                b_urgent.cmp(&a_urgent).then_with(|| newest_first(a, b))
            });
        }
        (SortMode::Nearest, Some(origin)) => {
            // Distances are computed once per report, not once per comparison
            let mut keyed: Vec<(Option<f64>, Report)> = reports
                .into_iter()
                .map(|r| (report_distance(&r, origin), r))
                .collect();
            keyed.sort_by(|(da, a), (db, b)| {
                compare_distance(*da, *db).then_with(|| newest_first(a, b))
            });
            return keyed.into_iter().map(|(_, r)| r).collect();
        }
        (SortMode::Newest, _) | (SortMode::Nearest, None) => {
            reports.sort_by(newest_first);
        }
    }
    reports
}

fn newest_first(a: &Report, b: &Report) -> Ordering {
    b.timestamp.cmp(&a.timestamp)
}

/// `None` ("no distance") orders after every real distance.
fn compare_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ReportInput, ReportLocation};
    use chrono::{Duration, TimeZone, Utc};

    fn at(id: &str, minutes: i64) -> ReportInput {
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        ReportInput::new()
            .with_id(id)
            .with_timestamp(base + Duration::minutes(minutes))
    }

    fn ids(reports: &[Report]) -> Vec<&str> {
        reports.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn newest_first_is_stable() {
        let reports = vec![
            at("old", 0).normalize(),
            at("tie-1", 5).normalize(),
            at("new", 10).normalize(),
            at("tie-2", 5).normalize(),
        ];
        let sorted = sort_reports(reports, SortMode::Newest, None);
        assert_eq!(ids(&sorted), vec!["new", "tie-1", "tie-2", "old"]);
    }

    #[test]
    fn urgent_first_then_newest() {
        let reports = vec![
            at("u1", 1).with_priority(Priority::Urgent).normalize(),
            at("n1", 3).normalize(),
            at("u2", 2).with_priority(Priority::Urgent).normalize(),
            at("h1", 4).with_priority(Priority::High).normalize(),
        ];
        let sorted = sort_reports(reports, SortMode::Urgent, None);
        assert_eq!(ids(&sorted), vec!["u2", "u1", "h1", "n1"]);
    }

    #[test]
    fn nearest_puts_locationless_last() {
        let origin = Coordinates::new(0.0, 0.0);
        let reports = vec![
            at("far", 3)
                .with_location(ReportLocation::new(0.0, 1.0))
                .normalize(),
            at("none-old", 1).normalize(),
            at("near", 1)
                .with_location(ReportLocation::new(0.0, 0.01))
                .normalize(),
            at("none-new", 2).normalize(),
        ];
        let sorted = sort_reports(reports, SortMode::Nearest, Some(origin));
        assert_eq!(ids(&sorted), vec!["near", "far", "none-new", "none-old"]);
    }

    #[test]
    fn nearest_ties_break_by_newest() {
        let origin = Coordinates::new(0.0, 0.0);
        let spot = ReportLocation::new(0.0, 0.02);
        let reports = vec![
            at("older", 1).with_location(spot.clone()).normalize(),
            at("newer", 2).with_location(spot).normalize(),
        ];
        let sorted = sort_reports(reports, SortMode::Nearest, Some(origin));
        assert_eq!(ids(&sorted), vec!["newer", "older"]);
    }

    #[test]
    fn nearest_without_fix_is_newest() {
        let reports = vec![
            at("a", 1)
                .with_location(ReportLocation::new(0.0, 0.0))
                .normalize(),
            at("b", 2).normalize(),
        ];
        let nearest = sort_reports(reports.clone(), SortMode::Nearest, None);
        let newest = sort_reports(reports, SortMode::Newest, None);
        assert_eq!(nearest, newest);
    }

    #[test]
    fn parse_sort_mode() {
        assert_eq!("nearest".parse::<SortMode>(), Ok(SortMode::Nearest));
        assert!("Nearest".parse::<SortMode>().is_err());
    }
}
