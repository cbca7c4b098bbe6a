//! Display formatting helpers.
//!
//! Pure label builders the presentation layer uses for agenda rows and
//! check-in history: clock times in 12h/24h style and compact relative
//! date labels. No locale machinery — one fixed English set, matching the
//! rest of the library's display strings.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// "08:05" style.
pub fn format_time_24h(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// "8:05 AM" style. Midnight is 12 AM, noon 12 PM.
pub fn format_time_12h(time: NaiveTime) -> String {
    let hour = time.hour();
    let period = if hour >= 12 { "PM" } else { "AM" };
    let display_hour = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:{:02} {}", display_hour, time.minute(), period)
}

/// Compact label for a date relative to `today`: "Today", "Yesterday", the
/// weekday name within the last week, otherwise "Mar 5". Future dates get
/// the month-day form too.
pub fn relative_date_label(date: NaiveDate, today: NaiveDate) -> String {
    let days_ago = (today - date).num_days();
    match days_ago {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=6 => WEEKDAY_NAMES[date.weekday().num_days_from_monday() as usize].to_string(),
        _ => format!("{} {}", MONTH_NAMES[date.month0() as usize], date.day()),
    }
}
