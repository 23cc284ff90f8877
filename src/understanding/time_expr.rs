//! Time expressions: spotting them in a clause and resolving them to a date/time.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

/// Day words with an optional attached clock time, or a bare clock time
pub(crate) static TIME_EXPRESSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        \b(?:(?:next|this)\s+)?
          (?:monday|tuesday|wednesday|thursday|friday|saturday|sunday|today|tonight|tomorrow)\b
          (?:\s+(?:at\s+)?(?:\d{1,2}(?::\d{2})?\s*(?:am|pm)\b|\d{1,2}:\d{2}\b))?
        |
        \b(?:at\s+)?\d{1,2}:\d{2}(?:\s*(?:am|pm))?\b
        |
        \b(?:at\s+)?\d{1,2}\s*(?:am|pm)\b
        ",
    )
    .expect("valid time expression regex")
});

static CLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b").expect("valid clock regex")
});

static DAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(next\s+)?(monday|tuesday|wednesday|thursday|friday|saturday|sunday|today|tonight|tomorrow)\b",
    )
    .expect("valid day regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTime {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
}

/// All time-expression fragments in `text`, lowercased and space-joined
pub fn find_time_expression(text: &str) -> Option<String> {
    let parts: Vec<String> = TIME_EXPRESSION_RE
        .find_iter(text)
        .map(|m| {
            let s = m.as_str().to_lowercase();
            s.strip_prefix("at ").map(str::to_string).unwrap_or(s)
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Resolve an expression such as "friday 6pm" relative to `now`.
///
/// Weekdays resolve to the next occurrence (today counts unless prefixed with
/// "next"); a bare clock time resolves to today. Returns `None` when neither a
/// day nor a valid clock time is present.
pub fn resolve(expression: &str, now: NaiveDateTime) -> Option<ResolvedTime> {
    let today = now.date();
    let lower = expression.to_lowercase();
    let day_part = DAY_RE.captures(&lower);

    let mut time = parse_clock(&lower);
    let date = match &day_part {
        Some(caps) => {
            let forced_next = caps.get(1).is_some();
            match &caps[2] {
                "today" => today,
                "tonight" => {
                    time = time.or_else(|| NaiveTime::from_hms_opt(20, 0, 0));
                    today
                }
                "tomorrow" => today + Duration::days(1),
                day => {
                    let weekday: Weekday = day.parse().ok()?;
                    next_weekday(today, weekday, forced_next)
                }
            }
        }
        None if time.is_some() => today,
        None => return None,
    };

    Some(ResolvedTime { date, time })
}

fn next_weekday(today: NaiveDate, weekday: Weekday, forced_next: bool) -> NaiveDate {
    let current = today.weekday().num_days_from_monday() as i64;
    let target = weekday.num_days_from_monday() as i64;
    let mut ahead = (target - current).rem_euclid(7);
    if ahead == 0 && forced_next {
        ahead = 7;
    }
    today + Duration::days(ahead)
}

/// Clock time from "6pm", "6:30 pm", "14:30"; bare numbers are not times
fn parse_clock(text: &str) -> Option<NaiveTime> {
    CLOCK_RE.captures_iter(text).find_map(|caps| {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        let meridiem = caps.get(3).map(|m| m.as_str().to_lowercase());
        if caps.get(2).is_none() && meridiem.is_none() {
            return None;
        }
        let hour = match meridiem.as_deref() {
            Some("am") if hour == 12 => 0,
            Some("am") => hour,
            Some("pm") if hour == 12 => 12,
            Some("pm") => hour + 12,
            _ => hour,
        };
        NaiveTime::from_hms_opt(hour, minute, 0)
    })
}
