//! Time formatting helpers used in status reasons

use chrono::{DateTime, Utc};

/// Render `then` relative to `now`, e.g. "5 secs ago" or "in 2 mins"
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(then);
    let future = delta.num_milliseconds() < 0;
    let secs = delta.num_seconds().unsigned_abs();

    if secs < 1 {
        return "just now".to_string();
    }

    let (amount, unit) = if secs < 60 {
        (secs, "sec")
    } else if secs < 3_600 {
        (secs / 60, "min")
    } else if secs < 86_400 {
        (secs / 3_600, "hour")
    } else {
        (secs / 86_400, "day")
    };

    let plural = if amount == 1 { "" } else { "s" };
    if future {
        format!("in {} {}{}", amount, unit, plural)
    } else {
        format!("{} {}{} ago", amount, unit, plural)
    }
}

/// Render `then` relative to the current wall-clock time
pub fn to_relative_time(then: DateTime<Utc>) -> String {
    relative_time(then, Utc::now())
}
