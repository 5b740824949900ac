//! Date expressions and the "next change" tracker.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Utc};

use crate::error::{RuleError, RuleResult};
use crate::model::{DateExpression, DateSpec, DurationSpec};

/// Earliest future instant at which some evaluated rule would flip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NextChange(Option<DateTime<Utc>>);

impl NextChange {
    pub fn new() -> Self {
        Self(None)
    }

    pub fn update(&mut self, at: DateTime<Utc>) {
        if self.0.is_none_or(|current| at < current) {
            self.0 = Some(at);
        }
    }

    pub fn get(&self) -> Option<DateTime<Utc>> {
        self.0
    }
}

/// Parse an ISO-8601 style timestamp. Values without an offset are UTC.
pub fn parse_date(text: &str) -> RuleResult<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Ok(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
        .ok_or_else(|| RuleError::InvalidDate(text.to_string()))
}

pub fn add_duration(start: DateTime<Utc>, duration: &DurationSpec) -> Option<DateTime<Utc>> {
    let months = duration.years.unwrap_or(0) * 12 + duration.months.unwrap_or(0);
    let shifted = if months >= 0 {
        start.checked_add_months(Months::new(u32::try_from(months).ok()?))?
    } else {
        start.checked_sub_months(Months::new(u32::try_from(-months).ok()?))?
    };
    let seconds = duration.weeks.unwrap_or(0) * 604_800
        + duration.days.unwrap_or(0) * 86_400
        + duration.hours.unwrap_or(0) * 3_600
        + duration.minutes.unwrap_or(0) * 60
        + duration.seconds.unwrap_or(0);
    shifted.checked_add_signed(TimeDelta::try_seconds(seconds)?)
}

fn one_second_after(t: DateTime<Utc>) -> DateTime<Utc> {
    t + TimeDelta::seconds(1)
}

/// Evaluate a date expression at `now`, recording when the outcome changes.
pub fn evaluate_date(
    expr: &DateExpression,
    now: DateTime<Utc>,
    next: &mut NextChange,
) -> RuleResult<bool> {
    let id = expr.id.clone().unwrap_or_default();
    let start = expr.start.as_deref().map(parse_date).transpose()?;

    match expr.operation.as_str() {
        "in_range" => {
            let end = match (&expr.end, start, &expr.duration) {
                (Some(end), _, _) => Some(parse_date(end)?),
                (None, Some(start), Some(duration)) => Some(
                    add_duration(start, duration)
                        .ok_or_else(|| RuleError::InvalidDate(format!("{start} + duration")))?,
                ),
                _ => None,
            };
            if start.is_none() && end.is_none() {
                return Err(RuleError::MissingBound(id));
            }
            if let Some(start) = start {
                if now < start {
                    next.update(start);
                    return Ok(false);
                }
            }
            if let Some(end) = end {
                if now > end {
                    return Ok(false);
                }
                next.update(one_second_after(end));
            }
            Ok(true)
        }
        "gt" => {
            let start = start.ok_or(RuleError::MissingBound(id))?;
            if now > start {
                Ok(true)
            } else {
                next.update(one_second_after(start));
                Ok(false)
            }
        }
        "lt" => {
            let end = expr
                .end
                .as_deref()
                .map(parse_date)
                .transpose()?
                .ok_or(RuleError::MissingBound(id))?;
            if now < end {
                next.update(end);
                Ok(true)
            } else {
                Ok(false)
            }
        }
        "date_spec" => match &expr.date_spec {
            Some(spec) => date_spec_matches(spec, now),
            None => Err(RuleError::MissingBound(id)),
        },
        other => Err(RuleError::UnknownOperation(other.to_string())),
    }
}

fn in_range(field: &Option<String>, value: i64) -> RuleResult<bool> {
    let Some(range) = field else {
        return Ok(true);
    };
    let parse = |s: &str| {
        s.trim()
            .parse::<i64>()
            .map_err(|_| RuleError::InvalidRange(range.clone()))
    };
    let (low, high) = match range.split_once('-') {
        Some((low, high)) => (parse(low)?, parse(high)?),
        None => {
            let single = parse(range)?;
            (single, single)
        }
    };
    Ok(low <= value && value <= high)
}

/// Whether every field of a calendar specification matches `now`.
pub fn date_spec_matches(spec: &DateSpec, now: DateTime<Utc>) -> RuleResult<bool> {
    let checks = [
        (&spec.years, now.year() as i64),
        (&spec.months, now.month() as i64),
        (&spec.monthdays, now.day() as i64),
        (&spec.weekdays, now.weekday().number_from_monday() as i64),
        (&spec.yeardays, now.ordinal() as i64),
        (&spec.weeks, now.iso_week().week() as i64),
        (&spec.hours, now.hour() as i64),
        (&spec.minutes, now.minute() as i64),
        (&spec.seconds, now.second() as i64),
    ];
    for (field, value) in checks {
        if !in_range(field, value)? {
            return Ok(false);
        }
    }
    Ok(true)
}
