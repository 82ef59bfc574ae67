//! Terminal output. Functions here return strings so tests can check them
//! without capturing stdout; `print_*` wrappers do the printing.

use chrono::{DateTime, Utc};
use colored::*;
use urbanwatch::draft::Draft;
use urbanwatch::location::{LocationFix, LocationSource};
use urbanwatch::model::{Priority, Report, Status};
use urbanwatch::views::{Analytics, DashboardStats};

const TIME_WIDTH: usize = 16;
const TITLE_WIDTH: usize = 40;
const BAR_WIDTH: usize = 30;

pub fn render_report_line(report: &Report, distance: Option<f64>) -> String {
    let marker = if report.priority == Priority::Urgent {
        "!".red().bold()
    } else {
        " ".normal()
    };
    let title = truncate(display_title(report), TITLE_WIDTH);
    let distance = distance
        .map(|d| format!("{:>7.1} km", d))
        .unwrap_or_else(|| " ".repeat(10));

    format!(
        "{} {}  {:<w$}  {:<14} {:<12} {} {}",
        marker,
        report.id.dimmed(),
        title,
        colored_status(&report.status),
        report.category.as_str(),
        distance.cyan(),
        format_time_ago(report.timestamp).dimmed(),
        w = TITLE_WIDTH
    )
}

pub fn print_report_list(reports: &[(Report, Option<f64>)]) {
    if reports.is_empty() {
        println!("No reports found.");
        return;
    }
    for (report, distance) in reports {
        println!("{}", render_report_line(report, *distance));
    }
}

pub fn render_report_detail(report: &Report, distance: Option<f64>) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", display_title(report).bold()));
    out.push_str(&format!("{}\n", "-".repeat(32)));
    out.push_str(&format!("id:        {}\n", report.id));
    out.push_str(&format!("status:    {}\n", colored_status(&report.status)));
    out.push_str(&format!("priority:  {}\n", colored_priority(report.priority)));
    out.push_str(&format!("category:  {}\n", report.category));
    out.push_str(&format!(
        "filed:     {} ({})\n",
        report.timestamp.format("%Y-%m-%d %H:%M UTC"),
        format_time_ago(report.timestamp).trim()
    ));
    if let Some(location) = &report.location {
        out.push_str(&format!(
            "location:  {:.5}, {:.5}",
            location.latitude, location.longitude
        ));
        if let Some(distance) = distance {
            out.push_str(&format!(" ({:.1} km away)", distance));
        }
        out.push('\n');
        if let Some(address) = &location.address {
            out.push_str(&format!("address:   {}\n", address));
        }
        if let Some(city) = &location.city {
            out.push_str(&format!("city:      {}\n", city));
        }
    }
    if let Some(image) = &report.image {
        out.push_str(&format!("image:     {}\n", image));
    }
    if !report.description.is_empty() {
        out.push('\n');
        out.push_str(&report.description);
        out.push('\n');
    }
    out
}

pub fn render_analytics(analytics: &Analytics) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} reports, {}% resolved\n",
        analytics.total.to_string().bold(),
        analytics.resolved_rate
    ));
    out.push_str(&format!(
        "open {}  resolved {}  other {}\n",
        analytics.by_status.open, analytics.by_status.resolved, analytics.by_status.other
    ));
    out.push_str(&format!(
        "top city: {}\n",
        analytics.top_city.as_deref().unwrap_or("—")
    ));

    out.push_str(&format!("\n{}\n", "Top categories".bold()));
    for entry in &analytics.top_categories {
        out.push_str(&format!("  {:<16} {}\n", entry.label, entry.count));
    }
    out.push_str(&format!("\n{}\n", "Top cities".bold()));
    for entry in &analytics.top_cities {
        out.push_str(&format!("  {:<16} {}\n", entry.label, entry.count));
    }

    out.push_str(&format!("\n{}\n", "Last 7 days".bold()));
    let max = analytics
        .last_7_days
        .iter()
        .map(|d| d.count)
        .max()
        .unwrap_or(0)
        .max(1);
    for day in &analytics.last_7_days {
        let bar = "█".repeat(day.count * BAR_WIDTH / max);
        out.push_str(&format!(
            "  {} {:>3}  {}\n",
            day.label,
            day.count,
            bar.green()
        ));
    }
    out
}

pub fn render_stats(stats: &DashboardStats) -> String {
    format!(
        "total {}  resolved {}  pending {}  urgent {}",
        stats.total.to_string().bold(),
        stats.resolved.to_string().green(),
        stats.pending.to_string().yellow(),
        stats.urgent.to_string().red()
    )
}

pub fn render_location(fix: &LocationFix) -> String {
    let place = match (&fix.city, &fix.country) {
        (Some(city), Some(country)) => format!("{}, {}", city, country),
        (Some(city), None) => city.clone(),
        (None, Some(country)) => country.clone(),
        (None, None) => "unknown place".to_string(),
    };
    let source = match fix.source {
        LocationSource::Fallback => fix.source.as_str().yellow(),
        _ => fix.source.as_str().normal(),
    };
    let mut out = format!(
        "{:.4}, {:.4}  {}  [{}]",
        fix.latitude, fix.longitude, place, source
    );
    if let Some(accuracy) = fix.accuracy {
        out.push_str(&format!("  ±{:.0} m", accuracy));
    }
    out
}

pub fn render_draft(draft: &Draft) -> String {
    let mut out = String::new();
    let field = |name: &str, value: Option<String>| match value {
        Some(v) => format!("{:<12} {}\n", format!("{}:", name), v),
        None => String::new(),
    };
    out.push_str(&field("title", draft.title.clone()));
    out.push_str(&field("description", draft.description.clone()));
    out.push_str(&field("category", draft.category.map(|c| c.to_string())));
    out.push_str(&field("priority", draft.priority.map(|p| p.to_string())));
    out.push_str(&field("image", draft.image.clone()));
    out.push_str(&field(
        "location",
        draft
            .location
            .as_ref()
            .map(|l| format!("{:.5}, {:.5}", l.latitude, l.longitude)),
    ));
    if let Some(ts) = draft.timestamp {
        out.push_str(&field("edited", Some(format_time_ago(ts).trim().to_string())));
    }
    out
}

fn display_title(report: &Report) -> &str {
    if report.title.trim().is_empty() {
        "(untitled)"
    } else {
        &report.title
    }
}

fn colored_status(status: &Status) -> ColoredString {
    let label = status.as_str();
    match status {
        Status::Pending => label.yellow(),
        Status::InProgress => label.blue(),
        Status::Resolved => label.green(),
        Status::Rejected | Status::Other(_) => label.dimmed(),
    }
}

fn colored_priority(priority: Priority) -> ColoredString {
    let label = priority.as_str();
    match priority {
        Priority::Urgent => label.red().bold(),
        Priority::High => label.red(),
        Priority::Normal => label.normal(),
        Priority::Low => label.dimmed(),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    let formatter = timeago::Formatter::new();
    let time_str = formatter.convert(duration.to_std().unwrap_or_default());
    format!("{:>width$}", time_str, width = TIME_WIDTH)
}
