use super::geo::{report_distance, Coordinates};
use crate::model::{Category, Report};
use std::fmt;
use std::str::FromStr;

/// Category selector for the report list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl FromStr for CategoryFilter {
    type Err = String;

    /// `all` or an exact category value. Matching is case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(CategoryFilter::All);
        }
        s.parse::<Category>().map(CategoryFilter::Only)
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("all"),
            CategoryFilter::Only(category) => write!(f, "{}", category),
        }
    }
}

impl CategoryFilter {
    pub fn matches(&self, report: &Report) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => report.category == *category,
        }
    }
}

pub fn filter_by_category(reports: Vec<Report>, filter: CategoryFilter) -> Vec<Report> {
    reports.into_iter().filter(|r| filter.matches(r)).collect()
}

/// Radius selector. The dashboard offers 5 km, 10 km and "any".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RadiusFilter {
    Within(f64),
    #[default]
    Any,
}

impl RadiusFilter {
    pub const SELECTORS: [u32; 3] = [5, 10, 0];

    /// Maps a selector value in kilometres to a filter; `0` means "any".
    pub fn from_selector(km: u32) -> Self {
        if km == 0 {
            RadiusFilter::Any
        } else {
            RadiusFilter::Within(f64::from(km))
        }
    }

    pub fn as_selector(&self) -> u32 {
        match self {
            RadiusFilter::Within(km) => km.round() as u32,
            RadiusFilter::Any => 0,
        }
    }
}

/// Keeps reports whose rounded distance from `origin` is at most the radius.
///
/// With no origin, or with [`RadiusFilter::Any`], the list is returned as is,
/// location-less reports included. An active radius drops reports that have
/// no location.
pub fn filter_by_radius(
    reports: Vec<Report>,
    radius: RadiusFilter,
    origin: Option<Coordinates>,
) -> Vec<Report> {
    let (RadiusFilter::Within(km), Some(origin)) = (radius, origin) else {
        return reports;
    };
    reports
        .into_iter()
        .filter(|r| report_distance(r, origin).is_some_and(|d| d <= km))
        .collect()
}
