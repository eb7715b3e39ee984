use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// "3d ago" style age of an RFC 3339 timestamp. Months are 30 days.
pub fn relative_age(timestamp: &str, now: OffsetDateTime) -> String {
    let Ok(then) = OffsetDateTime::parse(timestamp, &Rfc3339) else {
        return "at an unknown time".to_string();
    };
    let minutes = (now - then).whole_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    let days = hours / 24;
    if days < 30 {
        return format!("{days}d ago");
    }
    let months = days / 30;
    if months < 12 {
        return format!("{months}mo ago");
    }
    format!("{}y ago", months / 12)
}

pub fn age_now(timestamp: &str) -> String {
    relative_age(timestamp, OffsetDateTime::now_utc())
}
