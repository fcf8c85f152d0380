//! Date parsing, formatting and table printing helpers shared by the CLI and TUI.

use chrono::{Datelike, Duration, NaiveDate};

use crate::board::TaskStats;
use crate::task::Task;

/// Parse human-readable due date input relative to `today`.
///
/// Supports:
/// - "today", "tomorrow"
/// - "monday", "next friday", "this wed"
/// - "end of week"/"eow", "end of month"/"eom"
/// - "in 3d", "in 2w"
/// - "YYYY-MM-DD"
pub fn parse_due_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "end of week" | "eow" => return Some(start_end_of_this_week(today).1),
        "end of month" | "eom" => {
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            let first_of_next = NaiveDate::from_ymd_opt(year, month, 1)?;
            return Some(first_of_next - Duration::days(1));
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(n) = rest.strip_suffix('d') {
            let days = Duration::try_days(n.trim().parse().ok()?)?;
            return today.checked_add_signed(days);
        }
        if let Some(n) = rest.strip_suffix('w') {
            let weeks = Duration::try_weeks(n.trim().parse().ok()?)?;
            return today.checked_add_signed(weeks);
        }
    }

    let (next, day_name) = match s.split_once(' ') {
        Some(("next", day)) => (true, day),
        Some(("this", day)) => (false, day),
        _ => (false, s.as_str()),
    };
    if let Some(target) = weekday_index(day_name) {
        let current = today.weekday().num_days_from_monday() as i64;
        let mut ahead = (target + 7 - current) % 7;
        if next {
            ahead += 7;
        }
        return Some(today + Duration::days(ahead));
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

fn weekday_index(name: &str) -> Option<i64> {
    const DAYS: [&str; 7] = ["monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday"];
    DAYS.iter()
        .position(|d| *d == name || (name.len() == 3 && d.starts_with(name)))
        .map(|i| i as i64)
}

/// Calculate the start and end dates of the current ISO week (Monday to Sunday).
pub fn start_end_of_this_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let weekday = today.weekday().num_days_from_monday() as i64;
    let start = today - Duration::days(weekday);
    (start, start + Duration::days(6))
}

/// Format a due date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: Option<NaiveDate>, today: NaiveDate) -> String {
    match due {
        None => "-".into(),
        Some(d) => match (d - today).num_days() {
            0 => "today".into(),
            1 => "tomorrow".into(),
            n if n > 1 => format!("in {n}d"),
            n => format!("{}d late", -n),
        },
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// One-line summary matching the metric tiles above the task list.
pub fn format_stats(stats: &TaskStats) -> String {
    format!(
        "Total: {}  Pending: {}  Completed: {}  Due soon: {}",
        stats.total, stats.pending, stats.completed, stats.due_soon
    )
}

/// Print tasks in a formatted table.
pub fn print_table(tasks: &[&Task], today: NaiveDate) {
    println!(
        "{:<9} {:<4} {:<9} {:<11} {:<10} {:<24} {}",
        "ID", "Done", "Urgency", "Due", "By when", "From", "Task"
    );
    for t in tasks {
        let marker = if t.is_due_soon(today) { "!" } else { " " };
        println!(
            "{:<9} {:<4} {:<9} {:<11} {:<10} {:<24} {}{}",
            t.id,
            if t.completed { "[x]" } else { "[ ]" },
            t.urgency,
            format!("{}{}", marker, format_due_relative(t.due_date(), today)),
            truncate(&t.by_when, 10),
            truncate(&t.assigned_by, 24),
            t.task_name,
            if t.description.is_empty() {
                String::new()
            } else {
                format!(" - {}", truncate(&t.description, 40))
            }
        );
    }
}
