// src/utils/time.rs

//! Calendar arithmetic and date formatting in a display timezone.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

/// Human format used by mail bodies and webhooks, e.g. `05 Oct 2026 03:04 PM`.
pub const HUMAN_FORMAT: &str = "%d %b %Y %I:%M %p";

/// SQL-style datetime, e.g. `2026-10-05 15:04:00`.
pub const SQL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format an instant in the display timezone.
pub fn format_in(dt: &DateTime<Utc>, tz: &Tz, fmt: &str) -> String {
    dt.with_timezone(tz).format(fmt).to_string()
}

/// Calendar date of an instant in the display timezone.
pub fn local_date(dt: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    dt.with_timezone(tz).date_naive()
}

/// First instant of `date` at `hour` local time.
///
/// Local times skipped by a DST transition resolve to the next existing hour.
pub fn local_instant(tz: &Tz, date: NaiveDate, hour: u32) -> DateTime<Utc> {
    let base = date.and_time(NaiveTime::MIN) + TimeDelta::hours(i64::from(hour));
    (0..3)
        .find_map(|shift| {
            tz.from_local_datetime(&(base + TimeDelta::hours(shift)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&base))
}

/// The previous full calendar week relative to `now`, Monday 00:00 inclusive
/// to the following Monday 00:00 exclusive.
pub fn previous_week(now: DateTime<Utc>, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = local_date(&now, tz);
    let this_monday = today - Days::new(u64::from(today.weekday().num_days_from_monday()));
    let last_monday = this_monday - Days::new(7);

    (
        local_instant(tz, last_monday, 0),
        local_instant(tz, this_monday, 0),
    )
}

/// Next instant strictly after `now` falling on `weekday` at `hour` local time.
pub fn next_weekly_run(now: DateTime<Utc>, tz: &Tz, weekday: Weekday, hour: u32) -> DateTime<Utc> {
    let today = local_date(&now, tz);
    let days_ahead = (7 + weekday.num_days_from_monday() - today.weekday().num_days_from_monday()) % 7;
    let date = today + Days::new(u64::from(days_ahead));

    let candidate = local_instant(tz, date, hour);
    if candidate > now {
        candidate
    } else {
        local_instant(tz, date + Days::new(7), hour)
    }
}
