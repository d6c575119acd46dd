use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    None,
    Low,
    Medium,
    High,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task priority: {0}")]
pub struct ParseTaskPriorityError(String);

impl FromStr for TaskPriority {
    type Err = ParseTaskPriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(TaskPriority::None),
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            _ => Err(ParseTaskPriorityError(s.to_string())),
        }
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskPriority::None => write!(f, "none"),
            TaskPriority::Low => write!(f, "low"),
            TaskPriority::Medium => write!(f, "medium"),
            TaskPriority::High => write!(f, "high"),
        }
    }
}

// ============================================================================
// Recurrence
// ============================================================================

/// Frequency tag of a recurring item. Per-variant parameters live in
/// [`RecurrencePattern`]; the tag alone decides the generation cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekdays,
    Weekends,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Maximum number of tasks one generation pass may create for this frequency.
    pub fn generation_cap(self) -> usize {
        match self {
            Frequency::Daily | Frequency::Weekdays | Frequency::Weekends => 15,
            Frequency::Weekly => 8,
            Frequency::Monthly => 6,
            Frequency::Yearly => 2,
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekdays => write!(f, "weekdays"),
            Frequency::Weekends => write!(f, "weekends"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Monthly => write!(f, "monthly"),
            Frequency::Yearly => write!(f, "yearly"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid frequency: {0}")]
pub struct ParseFrequencyError(String);

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekdays" => Ok(Frequency::Weekdays),
            "weekends" => Ok(Frequency::Weekends),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            _ => Err(ParseFrequencyError(s.to_string())),
        }
    }
}

/// A frequency selection together with the parameters that variant accepts.
///
/// Parameters are kept as the user supplied them; the compiler decides what
/// survives into the rule (unknown weekdays and out-of-range days are dropped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrencePattern {
    Daily,
    Weekdays,
    Weekends,
    Weekly { weekdays: Vec<String> },
    Monthly { day_of_month: Option<i32> },
    Yearly { month: Option<i32>, day_of_month: Option<i32> },
}

impl RecurrencePattern {
    pub fn frequency(&self) -> Frequency {
        match self {
            RecurrencePattern::Daily => Frequency::Daily,
            RecurrencePattern::Weekdays => Frequency::Weekdays,
            RecurrencePattern::Weekends => Frequency::Weekends,
            RecurrencePattern::Weekly { .. } => Frequency::Weekly,
            RecurrencePattern::Monthly { .. } => Frequency::Monthly,
            RecurrencePattern::Yearly { .. } => Frequency::Yearly,
        }
    }

    /// Builds a pattern from a frequency tag and a loose parameter bag, keeping
    /// only the parameters that apply to that frequency.
    pub fn from_parts(
        frequency: Frequency,
        weekdays: Vec<String>,
        day_of_month: Option<i32>,
        month: Option<i32>,
    ) -> Self {
        match frequency {
            Frequency::Daily => RecurrencePattern::Daily,
            Frequency::Weekdays => RecurrencePattern::Weekdays,
            Frequency::Weekends => RecurrencePattern::Weekends,
            Frequency::Weekly => RecurrencePattern::Weekly { weekdays },
            Frequency::Monthly => RecurrencePattern::Monthly { day_of_month },
            Frequency::Yearly => RecurrencePattern::Yearly { month, day_of_month },
        }
    }
}

/// A recurrence template owned by one user.
///
/// Holds no collection of its generated tasks; those are found through
/// `TaskStore::find_by_recurring_item`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecurringItem {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub priority: TaskPriority,
    pub sections: Json<Vec<String>>,
    pub frequency: Frequency,
    /// Comma-separated weekday tokens (weekly only), as supplied
    pub weekdays: Option<String>,
    pub day_of_month: Option<i32>,
    pub month: Option<i32>,
    /// Canonical RFC 5545 rule with DTSTART, produced by the compiler
    pub rrule: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub due_offset_days: i32,
    /// Latest scheduled date materialized so far
    pub last_generated_date: Option<NaiveDate>,
    /// Optional per-item cap below the frequency cap; 0 means "use the frequency cap"
    pub look_ahead_count: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringItem {
    pub fn pattern(&self) -> RecurrencePattern {
        let weekdays = self
            .weekdays
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        RecurrencePattern::from_parts(self.frequency, weekdays, self.day_of_month, self.month)
    }

    /// Number of tasks a single generation pass may create for this item.
    pub fn generation_limit(&self) -> usize {
        let cap = self.frequency.generation_cap();
        match usize::try_from(self.look_ahead_count) {
            Ok(count) if count > 0 => count.min(cap),
            _ => cap,
        }
    }
}

/// A schedulable unit of work.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub priority: TaskPriority,
    pub sections: Json<Vec<String>>,
    pub scheduled_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    /// Opaque fractional-index key; only its byte order is meaningful
    pub position: String,
    /// Weak back-link to the recurring item that produced this task
    pub recurring_item_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Task {
    fn default() -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: String::new(),
            title: String::new(),
            description: None,
            category_id: None,
            priority: TaskPriority::None,
            sections: Json(Vec::new()),
            scheduled_date: None,
            due_date: None,
            completed: false,
            completed_at: None,
            position: String::new(),
            recurring_item_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

// ============================================================================
// Data Transfer Objects (DTOs)
// ============================================================================

/// Data required to create a new recurring item
#[derive(Debug, Clone)]
pub struct NewRecurringItem {
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub priority: Option<TaskPriority>,
    pub sections: Vec<String>,
    pub pattern: RecurrencePattern,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub due_offset_days: i32,
    pub look_ahead_count: Option<i32>,
}

/// Data for modifying an existing recurring item. The schedule itself
/// (frequency, parameters, start date) is fixed after creation.
#[derive(Debug, Clone, Default)]
pub struct UpdateRecurringItem {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category_id: Option<Option<Uuid>>,
    pub priority: Option<TaskPriority>,
    pub sections: Option<Vec<String>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub due_offset_days: Option<i32>,
    pub look_ahead_count: Option<i32>,
    pub active: Option<bool>,
    /// Recompiled rule; filled in by the planner when the end date changes
    pub rrule: Option<String>,
}

/// Data for a task created directly by the user
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub priority: Option<TaskPriority>,
    pub sections: Vec<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<TaskPriority>,
    pub scheduled_date: Option<Option<NaiveDate>>,
    pub due_date: Option<Option<NaiveDate>>,
    /// Toggling completion also sets or clears `completed_at`
    pub completed: Option<bool>,
    pub position: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Frequency::Daily, 15)]
    #[case(Frequency::Weekdays, 15)]
    #[case(Frequency::Weekends, 15)]
    #[case(Frequency::Weekly, 8)]
    #[case(Frequency::Monthly, 6)]
    #[case(Frequency::Yearly, 2)]
    fn generation_cap_per_frequency(#[case] frequency: Frequency, #[case] cap: usize) {
        assert_eq!(frequency.generation_cap(), cap);
    }

    #[test]
    fn frequency_round_trips_through_display() {
        for frequency in [
            Frequency::Daily,
            Frequency::Weekdays,
            Frequency::Weekends,
            Frequency::Weekly,
            Frequency::Monthly,
            Frequency::Yearly,
        ] {
            assert_eq!(frequency.to_string().parse::<Frequency>(), Ok(frequency));
        }
        assert!("fortnightly".parse::<Frequency>().is_err());
        assert_eq!("WEEKLY".parse::<Frequency>(), Ok(Frequency::Weekly));
    }

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("High".parse::<TaskPriority>(), Ok(TaskPriority::High));
        assert!("urgent".parse::<TaskPriority>().is_err());
    }

    #[test]
    fn pattern_keeps_only_applicable_parameters() {
        let pattern = RecurrencePattern::from_parts(
            Frequency::Monthly,
            vec!["MO".to_string()],
            Some(15),
            Some(3),
        );
        assert_eq!(pattern, RecurrencePattern::Monthly { day_of_month: Some(15) });
        assert_eq!(pattern.frequency(), Frequency::Monthly);
    }

    fn item(frequency: Frequency, look_ahead_count: i32) -> RecurringItem {
        RecurringItem {
            id: Uuid::now_v7(),
            user_id: "user".to_string(),
            title: "Water plants".to_string(),
            description: None,
            category_id: None,
            priority: TaskPriority::None,
            sections: Json(Vec::new()),
            frequency,
            weekdays: Some("MO, we,,fri".to_string()),
            day_of_month: None,
            month: None,
            rrule: String::new(),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: None,
            due_offset_days: 0,
            last_generated_date: None,
            look_ahead_count,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn look_ahead_count_only_lowers_the_cap() {
        assert_eq!(item(Frequency::Daily, 0).generation_limit(), 15);
        assert_eq!(item(Frequency::Daily, 5).generation_limit(), 5);
        assert_eq!(item(Frequency::Weekly, 30).generation_limit(), 8);
        assert_eq!(item(Frequency::Yearly, -1).generation_limit(), 2);
    }

    #[test]
    fn stored_weekdays_are_split_and_trimmed() {
        assert_eq!(
            item(Frequency::Weekly, 0).pattern(),
            RecurrencePattern::Weekly {
                weekdays: vec!["MO".to_string(), "we".to_string(), "fri".to_string()]
            }
        );
    }
}
