//! Parsing of departure-board time labels into "minutes from now".
//!
//! Upstream boards mix several representations for the same concept:
//! relative labels (`"Nu"`, `"5 min"`), wall-clock times (`"14:07"`) and
//! absolute timestamps. [`parse_minutes`] folds all of them into a single
//! real number so the scorer can compare departures.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;

/// Returned for absent or unparseable labels. Larger than any sensible
/// lookahead horizon, so such departures never count as "soon".
pub const UNKNOWN_MINUTES: f64 = 999.0;

/// A clock time at most this many minutes in the past is kept as a
/// (slightly late) departure today instead of being moved to tomorrow.
pub const CLOCK_PAST_TOLERANCE_MINUTES: f64 = 5.0;

const MINUTES_PER_DAY: f64 = 1440.0;

const NOW_TOKENS: [&str; 2] = ["now", "nu"];

const NAIVE_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

static RELATIVE_MINUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+)\s*min$").expect("relative minutes pattern"));

static CLOCK_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]?\d|2[0-3]):([0-5]\d)$").expect("clock pattern"));

/// Converts a departure time label into minutes relative to `now`.
///
/// Forms are tried in this order:
///
/// 1. `now` / `nu` (any case) → `0`
/// 2. `<n> min` → `n`
/// 3. `H:MM` / `HH:MM` on `now`'s local date; results more than
///    [`CLOCK_PAST_TOLERANCE_MINUTES`] in the past wrap to the next day
/// 4. RFC 3339 or naive ISO-8601 timestamp (naive values are read in
///    `now`'s time zone)
///
/// Anything else, including `None`, yields [`UNKNOWN_MINUTES`].
pub fn parse_minutes<Tz: TimeZone>(label: Option<&str>, now: &DateTime<Tz>) -> f64 {
    let Some(label) = label.map(str::trim) else {
        return UNKNOWN_MINUTES;
    };

    if NOW_TOKENS.iter().any(|t| label.eq_ignore_ascii_case(t)) {
        return 0.0;
    }

    if let Some(caps) = RELATIVE_MINUTES.captures(label) {
        return caps[1].parse::<u32>().map_or(UNKNOWN_MINUTES, f64::from);
    }

    if let Some(caps) = CLOCK_TIME.captures(label) {
        let hour = caps[1].parse::<u32>().ok();
        let minute = caps[2].parse::<u32>().ok();
        return hour
            .zip(minute)
            .and_then(|(h, m)| clock_minutes(h, m, now))
            .unwrap_or(UNKNOWN_MINUTES);
    }

    absolute_minutes(label, now).unwrap_or(UNKNOWN_MINUTES)
}

fn clock_minutes<Tz: TimeZone>(hour: u32, minute: u32, now: &DateTime<Tz>) -> Option<f64> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    let local = now.date_naive().and_time(time);
    let target = now.timezone().from_local_datetime(&local).earliest()?;

    let minutes = minutes_between(&target, now);
    if minutes < -CLOCK_PAST_TOLERANCE_MINUTES {
        Some(minutes + MINUTES_PER_DAY)
    } else {
        Some(minutes)
    }
}

fn absolute_minutes<Tz: TimeZone>(label: &str, now: &DateTime<Tz>) -> Option<f64> {
    if let Ok(at) = DateTime::parse_from_rfc3339(label) {
        return Some(minutes_between(&at, now));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(label, fmt).ok())?;
    let at = now.timezone().from_local_datetime(&naive).earliest()?;
    Some(minutes_between(&at, now))
}

fn minutes_between<A: TimeZone, B: TimeZone>(target: &DateTime<A>, now: &DateTime<B>) -> f64 {
    let delta = target.with_timezone(&Utc) - now.with_timezone(&Utc);
    delta.num_milliseconds() as f64 / 60_000.0
}
