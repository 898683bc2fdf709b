//! Quartz-style cron expressions.
//!
//! Only the structure is checked here; computing fire times belongs to the
//! scheduler that triggers bulk runs.
//!
//! ```text
//! sec min hour day-of-month month day-of-week [year]
//! 0   0   2    ?            *     MON-FRI
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigurationError;

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];
const DAYS: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Second,
    Minute,
    Hour,
    DayOfMonth,
    Month,
    DayOfWeek,
    Year,
}

impl Field {
    const ORDER: [Field; 7] = [
        Field::Second,
        Field::Minute,
        Field::Hour,
        Field::DayOfMonth,
        Field::Month,
        Field::DayOfWeek,
        Field::Year,
    ];

    fn name(self) -> &'static str {
        match self {
            Field::Second => "seconds",
            Field::Minute => "minutes",
            Field::Hour => "hours",
            Field::DayOfMonth => "day-of-month",
            Field::Month => "month",
            Field::DayOfWeek => "day-of-week",
            Field::Year => "year",
        }
    }

    fn bounds(self) -> (u32, u32) {
        match self {
            Field::Second | Field::Minute => (0, 59),
            Field::Hour => (0, 23),
            Field::DayOfMonth => (1, 31),
            Field::Month => (1, 12),
            Field::DayOfWeek => (1, 7),
            Field::Year => (1970, 2099),
        }
    }

    fn names(self) -> &'static [&'static str] {
        match self {
            Field::Month => &MONTHS,
            Field::DayOfWeek => &DAYS,
            _ => &[],
        }
    }
}

/// A structurally valid cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpression {
    source: String,
    fields: Vec<String>,
}

impl CronExpression {
    pub fn parse(expression: &str) -> Result<Self, ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidSchedule {
            expression: expression.to_string(),
            reason,
        };

        let fields: Vec<String> = expression
            .split_whitespace()
            .map(str::to_ascii_uppercase)
            .collect();
        if !(6..=7).contains(&fields.len()) {
            return Err(invalid(format!("expected 6 or 7 fields, found {}", fields.len())));
        }

        for (field, value) in Field::ORDER.iter().zip(&fields) {
            check_field(*field, value).map_err(|reason| {
                invalid(format!("{} field '{}': {}", field.name(), value, reason))
            })?;
        }

        let dom_unset = fields[3] == "?";
        let dow_unset = fields[5] == "?";
        if dom_unset == dow_unset {
            return Err(invalid(
                "exactly one of day-of-month and day-of-week must be '?'".to_string(),
            ));
        }

        Ok(Self {
            source: expression.trim().to_string(),
            fields,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn has_year(&self) -> bool {
        self.fields.len() == 7
    }
}

impl fmt::Display for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for CronExpression {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn check_field(field: Field, value: &str) -> Result<(), String> {
    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || "*?/,-#".contains(*c)))
    {
        return Err(format!("unexpected character '{}'", bad));
    }
    if value == "?" {
        return match field {
            Field::DayOfMonth | Field::DayOfWeek => Ok(()),
            _ => Err("'?' is only allowed in day fields".to_string()),
        };
    }
    for part in value.split(',') {
        check_part(field, part)?;
    }
    Ok(())
}

fn check_part(field: Field, part: &str) -> Result<(), String> {
    let (base, step) = match part.split_once('/') {
        Some((base, step)) => (base, Some(step)),
        None => (part, None),
    };
    if let Some(step) = step {
        match step.parse::<u32>() {
            Ok(n) if n > 0 => {}
            _ => return Err(format!("invalid increment '{}'", step)),
        }
    }

    match (field, base) {
        (_, "*") => Ok(()),
        (Field::DayOfMonth, "L" | "LW") | (Field::DayOfWeek, "L") => Ok(()),
        (Field::DayOfMonth, _) if base.starts_with("L-") => {
            let offset = &base[2..];
            match offset.parse::<u32>() {
                Ok(n) if n <= 30 => Ok(()),
                _ => Err(format!("invalid offset '{}'", offset)),
            }
        }
        (Field::DayOfMonth, _) if base.ends_with('W') => {
            check_value(field, &base[..base.len() - 1]).map(|_| ())
        }
        (Field::DayOfWeek, _) if base.contains('#') => {
            let (day, nth) = base.split_once('#').unwrap_or((base, ""));
            check_value(field, day)?;
            match nth.parse::<u32>() {
                Ok(n) if (1..=5).contains(&n) => Ok(()),
                _ => Err(format!("invalid occurrence '{}'", nth)),
            }
        }
        (Field::DayOfWeek, _) if base.len() > 1 && base.ends_with('L') => {
            check_value(field, &base[..base.len() - 1]).map(|_| ())
        }
        _ => match base.split_once('-') {
            Some((from, to)) => {
                check_value(field, from)?;
                check_value(field, to)?;
                Ok(())
            }
            None => check_value(field, base).map(|_| ()),
        },
    }
}

fn check_value(field: Field, value: &str) -> Result<u32, String> {
    if let Some(pos) = field.names().iter().position(|n| *n == value) {
        return Ok(pos as u32 + 1);
    }
    let (min, max) = field.bounds();
    match value.parse::<u32>() {
        Ok(n) if (min..=max).contains(&n) => Ok(n),
        Ok(n) => Err(format!("{} is outside {}-{}", n, min, max)),
        Err(_) => Err(format!("'{}' is not a valid value", value)),
    }
}
