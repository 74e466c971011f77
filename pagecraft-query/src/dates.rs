//! Date handling - relative preset resolution and RFC 3339 bounds.
//!
//! All arithmetic is on UTC Unix seconds. Presets are anchored at UTC
//! midnight; weeks start on Sunday.

use std::time::{SystemTime, UNIX_EPOCH};

use pagecraft_core::{DatePreset, DateRange};

const SECS_PER_DAY: i64 = 86_400;

/// Source of "now" for preset resolution.
pub trait Clock: Send + Sync {
    /// Current time as Unix seconds.
    fn now_secs(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
    }
}

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub i64);

impl FixedClock {
    /// Freeze at an RFC 3339 timestamp.
    #[must_use]
    pub fn at(timestamp: &str) -> Option<Self> {
        parse_rfc3339(timestamp).map(Self)
    }
}

impl Clock for FixedClock {
    fn now_secs(&self) -> i64 {
        self.0
    }
}

/// Absolute date bounds, as sent on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRange {
    /// Inclusive lower bound.
    pub from: Option<String>,
    /// Upper bound.
    pub to: Option<String>,
}

impl ResolvedRange {
    /// Whether neither bound is set.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// Resolve a date range against `now`.
///
/// Explicit bounds are passed through untouched; otherwise the preset is
/// expanded; otherwise the range is unbounded.
#[must_use]
pub fn resolve_range(range: Option<&DateRange>, now: i64) -> ResolvedRange {
    let Some(range) = range else {
        return ResolvedRange::default();
    };
    if range.is_explicit() {
        return ResolvedRange {
            from: range.from.clone(),
            to: range.to.clone(),
        };
    }
    match range.preset {
        Some(preset) => {
            let (from, to) = preset_bounds(preset, now);
            ResolvedRange {
                from: Some(format_rfc3339(from)),
                to: Some(format_rfc3339(to)),
            }
        }
        None => ResolvedRange::default(),
    }
}

/// Absolute `(from, to)` seconds for a preset.
#[must_use]
pub fn preset_bounds(preset: DatePreset, now: i64) -> (i64, i64) {
    let days = now.div_euclid(SECS_PER_DAY);
    let midnight = days * SECS_PER_DAY;
    match preset {
        DatePreset::Today => (midnight, now),
        DatePreset::Yesterday => (midnight - SECS_PER_DAY, midnight),
        DatePreset::ThisWeek => (midnight - weekday(days) * SECS_PER_DAY, now),
        DatePreset::ThisMonth => {
            let (year, month, _) = civil_from_days(days);
            (days_from_civil(year, month, 1) * SECS_PER_DAY, now)
        }
        DatePreset::ThisYear => {
            let (year, _, _) = civil_from_days(days);
            (days_from_civil(year, 1, 1) * SECS_PER_DAY, now)
        }
    }
}

/// Day of week with Sunday = 0. Day 0 (1970-01-01) was a Thursday.
fn weekday(days: i64) -> i64 {
    (days + 4).rem_euclid(7)
}

/// Days since 1970-01-01 for a proleptic Gregorian date.
#[must_use]
pub fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let yoe = year - era * 400;
    let month = i64::from(month);
    let mp = if month > 2 { month - 3 } else { month + 9 };
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Proleptic Gregorian `(year, month, day)` for days since 1970-01-01.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    // Both values are small and non-negative by construction
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

/// Format Unix seconds as `YYYY-MM-DDTHH:MM:SSZ`.
#[must_use]
pub fn format_rfc3339(secs: i64) -> String {
    let days = secs.div_euclid(SECS_PER_DAY);
    let rem = secs.rem_euclid(SECS_PER_DAY);
    let (year, month, day) = civil_from_days(days);
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}Z",
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60
    )
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date into Unix seconds.
///
/// Years run from 0000 to 9999 and offsets up to ±23:59. Fractional seconds
/// are ignored. Returns `None` for anything malformed or out of range.
#[must_use]
pub fn parse_rfc3339(input: &str) -> Option<i64> {
    let input = input.trim();
    let (date, time) = match input.find(['T', 't', ' ']) {
        Some(at) => (&input[..at], Some(&input[at + 1..])),
        None => (input, None),
    };

    let mut parts = date.splitn(3, '-');
    let year: u16 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;
    if year > 9999 || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    let midnight = days_from_civil(i64::from(year), month, day).checked_mul(SECS_PER_DAY)?;

    let Some(time) = time else {
        return Some(midnight);
    };

    let (clock, offset) = split_offset(time)?;
    let mut fields = clock.splitn(3, ':');
    let hour: u8 = fields.next()?.parse().ok()?;
    let minute: u8 = fields.next()?.parse().ok()?;
    let second: u8 = match fields.next() {
        Some(s) => s.split('.').next()?.parse().ok()?,
        None => 0,
    };
    if hour > 23 || minute > 59 || second > 60 {
        return None;
    }
    let within_day = i64::from(hour) * 3600 + i64::from(minute) * 60 + i64::from(second);
    midnight.checked_add(within_day)?.checked_sub(offset)
}

/// Split `HH:MM:SS[.f](Z|±HH:MM)` into the clock part and the offset in seconds.
fn split_offset(time: &str) -> Option<(&str, i64)> {
    if let Some(clock) = time.strip_suffix(['Z', 'z']) {
        return Some((clock, 0));
    }
    match time.rfind(['+', '-']) {
        Some(at) => {
            let sign = if time.as_bytes()[at] == b'-' { -1 } else { 1 };
            let mut offset = time[at + 1..].splitn(2, ':');
            let hours: u8 = offset.next()?.parse().ok()?;
            let minutes: u8 = offset.next().map_or(Some(0), |m| m.parse().ok())?;
            if hours > 23 || minutes > 59 {
                return None;
            }
            Some((&time[..at], sign * (i64::from(hours) * 3600 + i64::from(minutes) * 60)))
        }
        None => Some((time, 0)),
    }
}
