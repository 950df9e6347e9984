// ABOUTME: Local-day time helpers
// ABOUTME: Day-granularity operations normalize to local midnight before storage/lookup

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Today's date in the server's local timezone
pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

/// The UTC instants bounding a local calendar day: [start, end)
pub fn local_day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_hms_opt(0, 0, 0).expect("midnight exists for every date");
    let end = start + Duration::days(1);
    (local_to_utc(start), local_to_utc(end))
}

/// The local calendar day containing a UTC instant
pub fn local_date_of(instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&Local).date_naive()
}

fn local_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        // DST fold: take the earlier instant
        LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        // DST gap at midnight (rare but real in some zones)
        LocalResult::None => Utc.from_utc_datetime(&naive),
    }
}
