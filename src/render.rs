//! Terminal rendering of a week view using owo_colors.

use chrono::NaiveDate;
use chrono_tz::Tz;
use owo_colors::OwoColorize;
use weekcal_core::{DayBucket, NormalizedEvent, WeekReport};

/// Render all seven days, followed by a note if recurrences were cut off.
pub fn render_week(report: &WeekReport, zone: Tz, today: NaiveDate) -> String {
    let mut sections: Vec<String> = report
        .view
        .iter()
        .map(|day| render_day(day, zone, today))
        .collect();

    if report.is_truncated() {
        sections.push(
            format!(
                "Some recurring events were cut off at the iteration limit: {}",
                report.truncated.join(", ")
            )
            .dimmed()
            .to_string(),
        );
    }

    sections.join("\n\n")
}

fn render_day(day: &DayBucket, zone: Tz, today: NaiveDate) -> String {
    let mut lines = vec![format_date_label(day.date, today).bold().to_string()];

    if day.is_empty() {
        lines.push(format!("  {}", "No events".dimmed()));
    }
    for event in &day.events {
        lines.push(render_event(event, zone));
    }

    lines.join("\n")
}

fn render_event(event: &NormalizedEvent, zone: Tz) -> String {
    let mut line = format!("  {} {}", format_time_range(event, zone), event.summary);
    if let Some(location) = &event.location {
        line.push_str(&format!(" {}", format!("@ {}", location).dimmed()));
    }
    line
}

/// Format a date as a human-readable label (e.g. "Today", "Tomorrow", "Wed Feb 25")
fn format_date_label(date: NaiveDate, today: NaiveDate) -> String {
    match (date - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        _ => date.format("%a %b %-d").to_string(),
    }
}

/// "09:00 - 09:15" in the viewer's zone, or "all-day"
fn format_time_range(event: &NormalizedEvent, zone: Tz) -> String {
    if event.all_day {
        return format!("{:<13}", "all-day");
    }
    let start = event.start.with_timezone(&zone).format("%H:%M");
    let end = event.end.with_timezone(&zone).format("%H:%M");
    format!("{} - {}", start, end)
}
