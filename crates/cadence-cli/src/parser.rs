use cadence_core::models::{Frequency, RecurrencePattern, TaskPriority};
use chrono::{Local, NaiveDate};
use chrono_english::{parse_date_string, Dialect};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("Failed to parse date '{0}': {1}")]
    Date(String, String),
    #[error("--on is only used with --every weekly")]
    WeekdaysWithoutWeekly,
    #[error("--month is only used with --every yearly")]
    MonthWithoutYearly,
    #[error("--day is only used with --every monthly or yearly")]
    DayWithoutMonthlyOrYearly,
}

/// Parses an ISO date or a natural phrase ('tomorrow', 'next friday')
/// relative to the local clock.
pub fn parse_date(input: &str) -> Result<NaiveDate, ParseError> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    parse_date_string(trimmed, Local::now(), Dialect::Us)
        .map(|dt| dt.date_naive())
        .map_err(|e| ParseError::Date(input.to_string(), e.to_string()))
}

pub fn parse_priority(input: &str) -> Result<TaskPriority, String> {
    input.parse::<TaskPriority>().map_err(|e| e.to_string())
}

/// Splits 'mon,wed, fri' into tokens. Unrecognized names are kept; the
/// rule compiler drops them.
pub fn parse_weekdays(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Builds a pattern from `recur add` flags, rejecting flags that do not
/// apply to the chosen frequency.
pub fn build_pattern(
    frequency: Frequency,
    on: Option<&str>,
    day: Option<i32>,
    month: Option<i32>,
) -> Result<RecurrencePattern, ParseError> {
    if on.is_some() && frequency != Frequency::Weekly {
        return Err(ParseError::WeekdaysWithoutWeekly);
    }
    if month.is_some() && frequency != Frequency::Yearly {
        return Err(ParseError::MonthWithoutYearly);
    }
    if day.is_some() && !matches!(frequency, Frequency::Monthly | Frequency::Yearly) {
        return Err(ParseError::DayWithoutMonthlyOrYearly);
    }

    let weekdays = on.map(parse_weekdays).unwrap_or_default();
    Ok(RecurrencePattern::from_parts(frequency, weekdays, day, month))
}
