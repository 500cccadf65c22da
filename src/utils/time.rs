use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone};

/// This is the standard way of converting a date to a string in tasktally.
pub fn date_to_day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Returns start of the next day. When a DST change skips midnight the day starts at the first
/// full hour that exists.
pub fn next_day_start<Tz: TimeZone>(date: DateTime<Tz>) -> DateTime<Tz> {
    let next = date + Duration::days(1);
    (0..24)
        .filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
        .find_map(|time| next.with_time(time).earliest())
        .unwrap_or(next)
}
