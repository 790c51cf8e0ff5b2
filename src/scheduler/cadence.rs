// ABOUTME: Five-field cadence expressions evaluated with the cron crate
// ABOUTME: Translates standard minute/hour/day/month/weekday fields and computes next run times

use chrono::{DateTime, Utc};
use cron::Schedule;
use std::collections::BTreeSet;
use std::str::FromStr;
use thiserror::Error;

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CadenceError {
    #[error("expected 5 fields, found {0}")]
    FieldCount(usize),

    #[error("invalid day-of-week field '{0}'")]
    DayOfWeek(String),

    #[error("{0}")]
    Invalid(String),
}

/// A parsed cadence. All five fields are honoured; day-of-week accepts 0 and 7 for Sunday.
/// When both day-of-month and day-of-week are restricted, a day matching either one fires.
#[derive(Debug, Clone)]
pub struct Cadence {
    expression: String,
    schedules: Vec<Schedule>,
}

impl Cadence {
    pub fn parse(expression: &str) -> Result<Self, CadenceError> {
        let expression = expression.trim();

        let translated = if expression.starts_with('@') {
            vec![expression.to_string()]
        } else {
            let fields: Vec<&str> = expression.split_whitespace().collect();
            if fields.len() != 5 {
                return Err(CadenceError::FieldCount(fields.len()));
            }
            let (minute, hour, day_of_month, month) = (fields[0], fields[1], fields[2], fields[3]);
            let day_of_week = translate_day_of_week(fields[4])?;

            if is_restricted(day_of_month) && is_restricted(fields[4]) {
                vec![
                    format!("0 {} {} {} {} *", minute, hour, day_of_month, month),
                    format!("0 {} {} * {} {}", minute, hour, month, day_of_week),
                ]
            } else {
                vec![format!(
                    "0 {} {} {} {} {}",
                    minute, hour, day_of_month, month, day_of_week
                )]
            }
        };

        let schedules = translated
            .iter()
            .map(|source| {
                Schedule::from_str(source).map_err(|e| CadenceError::Invalid(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            expression: expression.to_string(),
            schedules,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedules
            .iter()
            .filter_map(|schedule| schedule.after(&after).next())
            .min()
    }

    pub fn upcoming(&self, after: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        let mut times = Vec::with_capacity(count);
        let mut cursor = after;
        while times.len() < count {
            let Some(next) = self.next_after(cursor) else {
                break;
            };
            times.push(next);
            cursor = next;
        }
        times
    }
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.expression)
    }
}

/// cron numbers weekdays 1-7 from Sunday; expand the standard 0-7 form into names
fn translate_day_of_week(field: &str) -> Result<String, CadenceError> {
    if field == "*" || field == "?" {
        return Ok(field.to_string());
    }

    let invalid = || CadenceError::DayOfWeek(field.to_string());
    let mut days = BTreeSet::new();

    for item in field.split(',') {
        let (base, step) = match item.split_once('/') {
            Some((base, step)) => {
                let step: usize = step.parse().map_err(|_| invalid())?;
                if step == 0 {
                    return Err(invalid());
                }
                (base, Some(step))
            }
            None => (item, None),
        };

        let (start, end) = if base == "*" {
            (0, 6)
        } else if let Some((a, b)) = base.split_once('-') {
            (day_number(a).ok_or_else(invalid)?, day_number(b).ok_or_else(invalid)?)
        } else {
            let day = day_number(base).ok_or_else(invalid)?;
            (day, if step.is_some() { 6 } else { day })
        };

        if start > end {
            return Err(invalid());
        }

        for day in (start..=end).step_by(step.unwrap_or(1)) {
            days.insert(day % 7);
        }
    }

    Ok(days
        .into_iter()
        .map(|d| DAY_NAMES[d])
        .collect::<Vec<_>>()
        .join(","))
}

/// A leading `*` (including `*/n`) leaves a day field unrestricted
fn is_restricted(field: &str) -> bool {
    !(field.starts_with('*') || field == "?")
}

fn day_number(token: &str) -> Option<usize> {
    if let Ok(n) = token.parse::<usize>() {
        return (n <= 7).then_some(n);
    }
    DAY_NAMES
        .iter()
        .position(|name| name.eq_ignore_ascii_case(token))
}
