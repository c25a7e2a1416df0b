//! Per-field date parsing for stored record fields.
//!
//! Stored dates arrive as strings in table-specific formats ("MM/YY" card
//! expiries, "YYYY-MM-DD" birthdates, "YYYY-MM-DD HH:MM:SS" transaction
//! times). Each parsed field carries its own [`DateFieldFormat`], so a
//! format change is a configuration edit, and a mismatch surfaces the field
//! name, raw value, and expected pattern.

use chrono::format::{parse, Parsed, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFieldKind {
    /// Month/year values with no day component; the day is pinned to the
    /// first of the month before completing the date.
    MonthYear,
    Date,
    DateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateFieldFormat {
    pub pattern: String,
    pub kind: DateFieldKind,
}

impl DateFieldFormat {
    pub fn month_year(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            kind: DateFieldKind::MonthYear,
        }
    }

    pub fn date(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            kind: DateFieldKind::Date,
        }
    }

    pub fn datetime(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            kind: DateFieldKind::DateTime,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("field {field} value '{value}' does not match format {format}")]
pub struct MalformedDate {
    pub field: &'static str,
    pub value: String,
    pub format: String,
}

pub fn parse_date(
    field: &'static str,
    raw: &str,
    format: &DateFieldFormat,
) -> Result<NaiveDate, MalformedDate> {
    match format.kind {
        DateFieldKind::MonthYear => {
            let mut parsed = Parsed::new();
            parse(&mut parsed, raw, StrftimeItems::new(&format.pattern))
                .map_err(|_| malformed(field, raw, format))?;
            parsed
                .set_day(1)
                .map_err(|_| malformed(field, raw, format))?;
            parsed
                .to_naive_date()
                .map_err(|_| malformed(field, raw, format))
        }
        DateFieldKind::Date => NaiveDate::parse_from_str(raw, &format.pattern)
            .map_err(|_| malformed(field, raw, format)),
        DateFieldKind::DateTime => NaiveDateTime::parse_from_str(raw, &format.pattern)
            .map(|ts| ts.date())
            .map_err(|_| malformed(field, raw, format)),
    }
}

pub fn parse_datetime(
    field: &'static str,
    raw: &str,
    format: &DateFieldFormat,
) -> Result<NaiveDateTime, MalformedDate> {
    match format.kind {
        DateFieldKind::DateTime => NaiveDateTime::parse_from_str(raw, &format.pattern)
            .map_err(|_| malformed(field, raw, format)),
        DateFieldKind::MonthYear | DateFieldKind::Date => {
            parse_date(field, raw, format).map(|date| date.and_time(NaiveTime::MIN))
        }
    }
}

fn malformed(field: &'static str, raw: &str, format: &DateFieldFormat) -> MalformedDate {
    MalformedDate {
        field,
        value: raw.to_string(),
        format: format.pattern.clone(),
    }
}
