use chrono::{DateTime, Utc};

// Human distance between `ts` and `now`, e.g. "about 3 hours ago".
// Buckets follow the usual "time ago" conventions; future stamps read "in ...".
pub fn format_relative(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(ts);
    let future = delta.num_seconds() < 0;
    let secs = delta.num_seconds().unsigned_abs();
    let mins = (secs + 30) / 60;

    let phrase = if secs < 30 {
        "less than a minute".to_string()
    } else if mins < 2 {
        "1 minute".to_string()
    } else if mins < 45 {
        format!("{} minutes", mins)
    } else if mins < 90 {
        "about 1 hour".to_string()
    } else if mins < 24 * 60 {
        format!("about {} hours", (mins + 30) / 60)
    } else if mins < 42 * 60 {
        "1 day".to_string()
    } else if mins < 30 * 24 * 60 {
        format!("{} days", (mins + 12 * 60) / (24 * 60))
    } else if mins < 45 * 24 * 60 {
        "about 1 month".to_string()
    } else if mins < 365 * 24 * 60 {
        format!("{} months", ((mins / (24 * 60)) + 15) / 30)
    } else {
        let years = mins / (365 * 24 * 60);
        if years == 1 { "about 1 year".to_string() } else { format!("about {} years", years) }
    };

    if future { format!("in {}", phrase) } else { format!("{} ago", phrase) }
}
