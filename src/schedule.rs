use jiff::civil::{Date, DateTime};
use jiff::tz::TimeZone;
use jiff::{Timestamp, ToSpan};
use std::fmt::{Display, Formatter};
use tracing::debug;

const SEARCH_YEARS: i16 = 5;

#[derive(Debug, Clone, Copy)]
struct FieldRange {
    name: &'static str,
    min: u8,
    max: u8,
    names: &'static [&'static str],
}

const MINUTES: FieldRange = FieldRange {
    name: "minute",
    min: 0,
    max: 59,
    names: &[],
};
const HOURS: FieldRange = FieldRange {
    name: "hour",
    min: 0,
    max: 23,
    names: &[],
};
const DAYS_OF_MONTH: FieldRange = FieldRange {
    name: "day-of-month",
    min: 1,
    max: 31,
    names: &[],
};
const MONTHS: FieldRange = FieldRange {
    name: "month",
    min: 1,
    max: 12,
    names: &[
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ],
};
// 7 is accepted as an alias for Sunday and folded into bit 0 after parsing.
const DAYS_OF_WEEK: FieldRange = FieldRange {
    name: "day-of-week",
    min: 0,
    max: 7,
    names: &["sun", "mon", "tue", "wed", "thu", "fri", "sat"],
};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ScheduleError {
    Empty,
    FieldCount(usize),
    UnknownDescriptor(String),
    InvalidField { field: &'static str, value: String },
}

impl Display for ScheduleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty schedule"),
            Self::FieldCount(count) => write!(f, "expected 5 fields, found {count}"),
            Self::UnknownDescriptor(descriptor) => write!(f, "unknown descriptor {descriptor}"),
            Self::InvalidField { field, value } => write!(f, "invalid {field} field '{value}'"),
        }
    }
}

impl std::error::Error for ScheduleError {}

/// A parsed 5-field cron expression. Each field is a bitmask indexed by value.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CronSchedule {
    minutes: u64,
    hours: u64,
    days_of_month: u64,
    months: u64,
    days_of_week: u64,
    day_of_month_star: bool,
    day_of_week_star: bool,
    time_zone: Option<String>,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let (time_zone, body) = split_time_zone_prefix(expression.trim());
        let body = body.trim();
        if body.is_empty() {
            return Err(ScheduleError::Empty);
        }

        let expanded = if body.starts_with('@') {
            expand_descriptor(body)?
        } else {
            body
        };

        let fields = expanded.split_whitespace().collect::<Vec<_>>();
        if fields.len() != 5 {
            return Err(ScheduleError::FieldCount(fields.len()));
        }

        let mut days_of_week = parse_field(fields[4], DAYS_OF_WEEK)?;
        if days_of_week & (1 << 7) != 0 {
            days_of_week = (days_of_week & !(1 << 7)) | 1;
        }

        Ok(Self {
            minutes: parse_field(fields[0], MINUTES)?,
            hours: parse_field(fields[1], HOURS)?,
            days_of_month: parse_field(fields[2], DAYS_OF_MONTH)?,
            months: parse_field(fields[3], MONTHS)?,
            days_of_week,
            day_of_month_star: is_star(fields[2]),
            day_of_week_star: is_star(fields[4]),
            time_zone: time_zone.map(str::to_string),
        })
    }

    /// Timezone named by a `CRON_TZ=` / `TZ=` prefix, if any.
    pub fn time_zone(&self) -> Option<&str> {
        self.time_zone.as_deref()
    }

    /// First matching minute at or after `now`, evaluated on the civil clock of `zone`.
    /// Searches at most five years ahead.
    pub fn next_at_or_after(&self, now: Timestamp, zone: &TimeZone) -> Option<Timestamp> {
        let local = now.to_zoned(zone.clone()).datetime();
        let mut cursor = local.date().at(local.hour(), local.minute(), 0, 0);
        if cursor < local {
            cursor = cursor.checked_add(1.minute()).ok()?;
        }
        let last_year = cursor.year().saturating_add(SEARCH_YEARS);

        while cursor.year() <= last_year {
            if !has(self.months, cursor.month()) {
                cursor = start_of_next_month(cursor.date())?;
                continue;
            }
            if !self.day_matches(cursor.date()) {
                cursor = cursor.date().tomorrow().ok()?.at(0, 0, 0, 0);
                continue;
            }
            if !has(self.hours, cursor.hour()) {
                cursor = cursor
                    .date()
                    .at(cursor.hour(), 0, 0, 0)
                    .checked_add(1.hour())
                    .ok()?;
                continue;
            }
            if !has(self.minutes, cursor.minute()) {
                cursor = cursor.checked_add(1.minute()).ok()?;
                continue;
            }

            // Gap times resolve forward; folds resolve to the earlier instant.
            let candidate = cursor.to_zoned(zone.clone()).ok()?.timestamp();
            if candidate >= now {
                return Some(candidate);
            }
            cursor = cursor.checked_add(1.minute()).ok()?;
        }

        None
    }

    fn day_matches(&self, date: Date) -> bool {
        let day_of_month = has(self.days_of_month, date.day());
        let day_of_week = has(
            self.days_of_week,
            date.weekday().to_sunday_zero_offset(),
        );
        if self.day_of_month_star || self.day_of_week_star {
            day_of_month && day_of_week
        } else {
            day_of_month || day_of_week
        }
    }
}

/// Next run of `expression` at or after `now`. A `CRON_TZ=` prefix wins over
/// `time_zone`; an unknown or missing zone means UTC. Unparsable or empty expressions
/// have no next run.
pub fn next_run(expression: &str, time_zone: Option<&str>, now: Timestamp) -> Option<Timestamp> {
    let schedule = match CronSchedule::parse(expression) {
        Ok(schedule) => schedule,
        Err(ScheduleError::Empty) => return None,
        Err(error) => {
            debug!("ignoring schedule '{expression}': {error}");
            return None;
        }
    };
    let zone = resolve_time_zone(schedule.time_zone().or(time_zone));
    schedule.next_at_or_after(now, &zone)
}

pub fn resolve_time_zone(name: Option<&str>) -> TimeZone {
    let Some(name) = name.map(str::trim).filter(|name| !name.is_empty()) else {
        return TimeZone::UTC;
    };
    if name.eq_ignore_ascii_case("UTC") || name.eq_ignore_ascii_case("Etc/UTC") {
        return TimeZone::UTC;
    }
    match TimeZone::get(name) {
        Ok(zone) => zone,
        Err(error) => {
            debug!("unknown timezone '{name}', using UTC: {error}");
            TimeZone::UTC
        }
    }
}

/// Splits a schedule into its five display columns (minute, hour, day, month, weekday).
pub fn cron_fields(expression: &str) -> [String; 5] {
    let (_, body) = split_time_zone_prefix(expression.trim());
    let body = body.trim();
    let body = if body.starts_with('@') {
        match expand_descriptor(body) {
            Ok(expanded) => expanded,
            Err(_) => return placeholder_fields(),
        }
    } else {
        body
    };

    let fields = body.split_whitespace().collect::<Vec<_>>();
    if fields.len() < 5 {
        return placeholder_fields();
    }
    std::array::from_fn(|index| fields[index].to_string())
}

fn placeholder_fields() -> [String; 5] {
    std::array::from_fn(|_| "-".to_string())
}

fn split_time_zone_prefix(expression: &str) -> (Option<&str>, &str) {
    for prefix in ["CRON_TZ=", "TZ="] {
        if let Some(rest) = expression.strip_prefix(prefix) {
            return match rest.split_once(char::is_whitespace) {
                Some((zone, body)) => (Some(zone), body),
                None => (Some(rest), ""),
            };
        }
    }
    (None, expression)
}

fn expand_descriptor(descriptor: &str) -> Result<&'static str, ScheduleError> {
    match descriptor.to_ascii_lowercase().as_str() {
        "@yearly" | "@annually" => Ok("0 0 1 1 *"),
        "@monthly" => Ok("0 0 1 * *"),
        "@weekly" => Ok("0 0 * * 0"),
        "@daily" | "@midnight" => Ok("0 0 * * *"),
        "@hourly" => Ok("0 * * * *"),
        _ => Err(ScheduleError::UnknownDescriptor(descriptor.to_string())),
    }
}

/// An unrestricted part is `*` or `?`, optionally with a step of 1.
fn is_star(field: &str) -> bool {
    field.split(',').any(|part| {
        let (base, step) = part.split_once('/').unwrap_or((part, "1"));
        (base == "*" || base == "?") && step.parse::<u8>() == Ok(1)
    })
}

fn parse_field(field: &str, range: FieldRange) -> Result<u64, ScheduleError> {
    let invalid = || ScheduleError::InvalidField {
        field: range.name,
        value: field.to_string(),
    };

    let mut mask = 0u64;
    for part in field.split(',') {
        let (base, step) = match part.split_once('/') {
            Some((base, step)) => {
                let step = step.parse::<u8>().map_err(|_| invalid())?;
                if step == 0 {
                    return Err(invalid());
                }
                (base, Some(step))
            }
            None => (part, None),
        };

        let (start, end) = if base == "*" || base == "?" {
            (range.min, range.max)
        } else if let Some((low, high)) = base.split_once('-') {
            (
                parse_value(low, range).ok_or_else(invalid)?,
                parse_value(high, range).ok_or_else(invalid)?,
            )
        } else {
            let value = parse_value(base, range).ok_or_else(invalid)?;
            // "N/step" runs from N to the end of the range.
            if step.is_some() {
                (value, range.max)
            } else {
                (value, value)
            }
        };

        if start > end || start < range.min || end > range.max {
            return Err(invalid());
        }

        for value in (start..=end).step_by(usize::from(step.unwrap_or(1))) {
            mask |= 1 << value;
        }
    }

    Ok(mask)
}

fn parse_value(raw: &str, range: FieldRange) -> Option<u8> {
    if let Ok(value) = raw.parse::<u8>() {
        return Some(value);
    }
    let lower = raw.to_ascii_lowercase();
    let position = range.names.iter().position(|name| *name == lower)?;
    u8::try_from(position).ok().map(|offset| offset + range.min)
}

fn has(mask: u64, value: i8) -> bool {
    u32::try_from(value).is_ok_and(|bit| bit < 64 && mask & (1 << bit) != 0)
}

fn start_of_next_month(date: Date) -> Option<DateTime> {
    let next = date.first_of_month().checked_add(1.month()).ok()?;
    Some(next.at(0, 0, 0, 0))
}
