//! Candle period bounds.
//!
//! A bound is either absolute or relative to a reference instant:
//!
//! - `now`, `today` (00:00 UTC), `yesterday` (00:00 UTC of the day before)
//! - `±N` followed by `d`, `h`, `m` or `s`, e.g. `-7d`, `+36h`
//! - RFC 3339 (`2024-03-01T12:00:00Z`), or a date / date-time without offset,
//!   read as UTC (`2024-03-01`, `2024-03-01 12:00`, `2024-03-01T12:00:00`)

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

pub fn parse_flexible_date(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let text = raw.trim();
    match text.to_ascii_lowercase().as_str() {
        "now" => return Some(now),
        "today" => return start_of_day(now),
        "yesterday" => return start_of_day(now)?.checked_sub_signed(TimeDelta::try_days(1)?),
        _ => {}
    }

    if let Some(shift) = parse_relative(&text.to_ascii_lowercase()) {
        return now.checked_add_signed(shift?);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
}

/// `Some(None)` when the text has the relative shape but the amount
/// overflows.
fn parse_relative(text: &str) -> Option<Option<TimeDelta>> {
    let unit = text.chars().last()?;
    let amount = &text[..text.len() - unit.len_utf8()];
    let digits = amount.strip_prefix(['+', '-']).unwrap_or(amount);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let Ok(value) = amount.parse::<i64>() else {
        return Some(None);
    };
    let delta = match unit {
        'd' => TimeDelta::try_days(value),
        'h' => TimeDelta::try_hours(value),
        'm' => TimeDelta::try_minutes(value),
        's' => TimeDelta::try_seconds(value),
        _ => return None,
    };
    Some(delta)
}

fn start_of_day(dt: DateTime<Utc>) -> Option<DateTime<Utc>> {
    dt.date_naive().and_hms_opt(0, 0, 0).map(|naive| naive.and_utc())
}

/// Floor an epoch-ms instant to the open time of its candle. Intervals longer
/// than a day align to midnight.
pub fn align_to_interval(time_ms: i64, interval_minutes: u32) -> i64 {
    const DAY_MINUTES: u32 = 24 * 60;
    let minutes = interval_minutes.clamp(1, DAY_MINUTES);
    let step = i64::from(minutes) * 60_000;
    time_ms - time_ms.rem_euclid(step)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
    }

    fn reference() -> DateTime<Utc> {
        at("2024-03-10T15:42:07Z")
    }

    fn parse(raw: &str) -> Option<DateTime<Utc>> {
        parse_flexible_date(raw, reference())
    }

    #[test]
    fn keywords() {
        assert_eq!(parse("now"), Some(reference()));
        assert_eq!(parse(" Today "), Some(at("2024-03-10T00:00:00Z")));
        assert_eq!(parse("yesterday"), Some(at("2024-03-09T00:00:00Z")));
    }

    #[test]
    fn relative_shifts() {
        assert_eq!(parse("-7d"), Some(at("2024-03-03T15:42:07Z")));
        assert_eq!(parse("+36h"), Some(at("2024-03-12T03:42:07Z")));
        assert_eq!(parse("-30m"), Some(at("2024-03-10T15:12:07Z")));
        assert_eq!(parse("5s"), Some(at("2024-03-10T15:42:12Z")));
        assert_eq!(parse("-7D"), Some(at("2024-03-03T15:42:07Z")));
    }

    #[test]
    fn absolute_dates_are_utc() {
        assert_eq!(parse("2024-01-02"), Some(at("2024-01-02T00:00:00Z")));
        assert_eq!(parse("2024-01-02 03:04"), Some(at("2024-01-02T03:04:00Z")));
        assert_eq!(parse("2024-01-02T03:04:05"), Some(at("2024-01-02T03:04:05Z")));
        assert_eq!(parse("2024-01-02T03:04:05+02:00"), Some(at("2024-01-02T01:04:05Z")));
    }

    #[test]
    fn invalid_dates() {
        for raw in ["", "soon", "7x", "-d", "2024-13-01", "99999999999999999999d"] {
            assert_eq!(parse(raw), None, "{raw}");
        }
    }

    #[test]
    fn align_floors_to_candle_open() {
        let t = at("2024-03-10T15:42:07Z").timestamp_millis();
        assert_eq!(align_to_interval(t, 15), at("2024-03-10T15:30:00Z").timestamp_millis());
        assert_eq!(align_to_interval(t, 60), at("2024-03-10T15:00:00Z").timestamp_millis());
        assert_eq!(align_to_interval(t, 240), at("2024-03-10T12:00:00Z").timestamp_millis());
        assert_eq!(align_to_interval(t, 2880), at("2024-03-10T00:00:00Z").timestamp_millis());
    }
}
