use chrono::{Duration, NaiveDate, Weekday};
use rrule::RRuleSet;

use crate::models::RecurrencePattern;

/// Horizon applied when a caller does not configure one.
pub const DEFAULT_HORIZON_DAYS: i64 = 365;

/// Largest accepted horizon. Larger values are clamped.
pub const MAX_HORIZON_DAYS: i64 = 36_500;

const WEEKDAYS_PRESET: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];
const WEEKENDS_PRESET: [Weekday; 2] = [Weekday::Sat, Weekday::Sun];

// ============================================================================
// Recurrence Pattern Compiler
// ============================================================================

/// Compiles a pattern into a canonical RFC 5545 rule with an explicit DTSTART.
///
/// The compiler never fails: weekday tokens it does not recognize are dropped
/// and out-of-range day or month values leave their field out of the rule,
/// which makes the rule looser rather than invalid. `end` is inclusive.
///
/// ```
/// use cadence_core::models::RecurrencePattern;
/// use cadence_core::recurrence::compile_rule;
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
/// let rule = compile_rule(
///     &RecurrencePattern::Weekly { weekdays: vec!["fri".into(), "MO".into()] },
///     start,
///     None,
/// );
/// assert_eq!(rule, "DTSTART:20250101T000000Z\nRRULE:FREQ=WEEKLY;BYDAY=MO,FR");
/// ```
pub fn compile_rule(pattern: &RecurrencePattern, start: NaiveDate, end: Option<NaiveDate>) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(4);

    match pattern {
        RecurrencePattern::Daily => parts.push("FREQ=DAILY".to_string()),
        RecurrencePattern::Weekdays => {
            parts.push("FREQ=WEEKLY".to_string());
            parts.push(format!("BYDAY={}", byday_list(&WEEKDAYS_PRESET)));
        }
        RecurrencePattern::Weekends => {
            parts.push("FREQ=WEEKLY".to_string());
            parts.push(format!("BYDAY={}", byday_list(&WEEKENDS_PRESET)));
        }
        RecurrencePattern::Weekly { weekdays } => {
            parts.push("FREQ=WEEKLY".to_string());
            let days = canonical_weekdays(weekdays);
            if !days.is_empty() {
                parts.push(format!("BYDAY={}", byday_list(&days)));
            }
        }
        RecurrencePattern::Monthly { day_of_month } => {
            parts.push("FREQ=MONTHLY".to_string());
            if let Some(day) = day_of_month.filter(|d| (1..=31).contains(d)) {
                parts.push(format!("BYMONTHDAY={}", day));
            }
        }
        RecurrencePattern::Yearly { month, day_of_month } => {
            parts.push("FREQ=YEARLY".to_string());
            if let Some(month) = month.filter(|m| (1..=12).contains(m)) {
                parts.push(format!("BYMONTH={}", month));
            }
            if let Some(day) = day_of_month.filter(|d| (1..=31).contains(d)) {
                parts.push(format!("BYMONTHDAY={}", day));
            }
        }
    }

    if let Some(end) = end {
        parts.push(format!("UNTIL={}T235959Z", end.format("%Y%m%d")));
    }

    format!(
        "DTSTART:{}T000000Z\nRRULE:{}",
        start.format("%Y%m%d"),
        parts.join(";")
    )
}

/// Parses one weekday token: RFC codes (`MO`), short (`mon`) or full names,
/// case-insensitive.
pub fn parse_weekday(token: &str) -> Option<Weekday> {
    let token = token.trim();
    match token.to_ascii_uppercase().as_str() {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => token.parse::<Weekday>().ok(),
    }
}

/// Recognized weekdays, deduplicated, Monday first.
fn canonical_weekdays(tokens: &[String]) -> Vec<Weekday> {
    let mut days: Vec<Weekday> = tokens.iter().filter_map(|t| parse_weekday(t)).collect();
    days.sort_by_key(|d| d.num_days_from_monday());
    days.dedup();
    days
}

fn byday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

fn byday_list(days: &[Weekday]) -> String {
    days.iter().map(|d| byday_code(*d)).collect::<Vec<_>>().join(",")
}

// ============================================================================
// Occurrence Expander
// ============================================================================

/// OccurrenceExpander: turns a compiled rule into concrete calendar dates.
///
/// Every call re-parses the rule and walks it from DTSTART; nothing is cached
/// between calls. Work is bounded by the horizon, counted from the anchor.
#[derive(Debug, Clone)]
pub struct OccurrenceExpander {
    horizon_days: i64,
}

impl Default for OccurrenceExpander {
    fn default() -> Self {
        Self::new(DEFAULT_HORIZON_DAYS)
    }
}

impl OccurrenceExpander {
    pub fn new(horizon_days: i64) -> Self {
        Self { horizon_days: horizon_days.clamp(0, MAX_HORIZON_DAYS) }
    }

    pub fn horizon_days(&self) -> i64 {
        self.horizon_days
    }

    /// Returns ascending occurrence dates strictly after `after`, no later than
    /// `after + horizon`, at most `limit` of them when a limit is given.
    ///
    /// An unparseable rule yields an empty list.
    pub fn expand(&self, rule: &str, after: NaiveDate, limit: Option<usize>) -> Vec<NaiveDate> {
        let limit = limit.unwrap_or(usize::MAX);
        if limit == 0 {
            return Vec::new();
        }

        let rule_set: RRuleSet = match rule.parse() {
            Ok(set) => set,
            Err(err) => {
                tracing::warn!(%err, rule, "unparseable recurrence rule, treating as empty");
                return Vec::new();
            }
        };

        let horizon = Duration::try_days(self.horizon_days)
            .and_then(|span| after.checked_add_signed(span))
            .unwrap_or(NaiveDate::MAX);

        let mut dates = Vec::new();
        for occurrence in &rule_set {
            let date = occurrence.date_naive();
            if date <= after {
                continue;
            }
            if date > horizon {
                break;
            }
            dates.push(date);
            if dates.len() >= limit {
                break;
            }
        }
        dates
    }
}
