use std::collections::HashSet;
use std::time::Instant;

use chrono::{Duration, Local, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{RecurringItem, Task};
use crate::position;
use crate::recurrence::{OccurrenceExpander, DEFAULT_HORIZON_DAYS, MAX_HORIZON_DAYS};
use crate::repository::{RecurringItemStore, TaskStore};

/// Configuration for generation behavior
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// How far past the anchor the expander may look, in days
    pub horizon_days: i64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_HORIZON_DAYS,
        }
    }
}

// ============================================================================
// Task Materializer
// ============================================================================

/// Materializer: turns one recurring item's occurrences into task records.
///
/// Pure: it reads nothing and writes nothing. The caller supplies the dates
/// that already have a task and the key to append after.
pub struct Materializer<'a> {
    expander: &'a OccurrenceExpander,
}

impl<'a> Materializer<'a> {
    pub fn new(expander: &'a OccurrenceExpander) -> Self {
        Self { expander }
    }

    /// Builds tasks for occurrences on or after `from_date`.
    ///
    /// At most `item.generation_limit()` occurrences are considered; those
    /// already present in `existing_dates` are dropped after the cap is
    /// applied. Positions ascend across the batch, starting after
    /// `append_after`. An unparseable rule produces no tasks.
    pub fn materialize(
        &self,
        item: &RecurringItem,
        from_date: NaiveDate,
        existing_dates: &HashSet<NaiveDate>,
        append_after: Option<&str>,
    ) -> Vec<Task> {
        let Some(anchor) = from_date.pred_opt() else {
            return Vec::new();
        };

        let dates = self
            .expander
            .expand(&item.rrule, anchor, Some(item.generation_limit()));

        let now = Utc::now();
        let mut last_position = append_after
            .filter(|k| position::is_valid_key(k))
            .map(str::to_owned);

        dates
            .into_iter()
            .filter(|date| item.end_date.map_or(true, |end| *date <= end))
            .filter(|date| !existing_dates.contains(date))
            .map(|date| {
                let key = position::append_after(last_position.as_deref());
                last_position = Some(key.clone());
                Task {
                    id: Uuid::now_v7(),
                    user_id: item.user_id.clone(),
                    title: item.title.clone(),
                    description: item.description.clone(),
                    category_id: item.category_id,
                    priority: item.priority.clone(),
                    sections: item.sections.clone(),
                    scheduled_date: Some(date),
                    due_date: due_date_for(date, item.due_offset_days),
                    completed: false,
                    completed_at: None,
                    position: key,
                    recurring_item_id: Some(item.id),
                    created_at: now,
                    updated_at: now,
                }
            })
            .collect()
    }
}

/// `scheduled + offset` for a nonzero offset, otherwise no due date.
pub fn due_date_for(scheduled: NaiveDate, offset_days: i32) -> Option<NaiveDate> {
    if offset_days == 0 {
        return None;
    }
    Duration::try_days(i64::from(offset_days)).and_then(|span| scheduled.checked_add_signed(span))
}

// ============================================================================
// Lazy Generation Orchestrator
// ============================================================================

/// Outcome of one generation pass over a user's recurring items
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    /// Tasks actually inserted during this pass
    pub generated_tasks: Vec<Task>,
    /// Number of stale items processed
    pub items_processed: usize,
    /// Number of items whose pass failed
    pub items_with_errors: usize,
    /// Detailed error messages
    pub errors: Vec<String>,
    /// Time taken for the pass
    pub duration_ms: u64,
}

/// GenerationManager: drives materialization inline with reads.
///
/// There is no scheduler. Any read that shows a date range calls
/// [`GenerationManager::ensure_generated`] first; stale items are topped up and
/// their watermark advanced. Duplicate passes are harmless because existing
/// dates are skipped and the store refuses duplicate (item, date) rows.
#[derive(Debug, Clone)]
pub struct GenerationManager {
    config: GenerationConfig,
    expander: OccurrenceExpander,
}

impl GenerationManager {
    /// The horizon is clamped to `0..=MAX_HORIZON_DAYS`.
    pub fn new(mut config: GenerationConfig) -> Self {
        config.horizon_days = config.horizon_days.clamp(0, MAX_HORIZON_DAYS);
        let expander = OccurrenceExpander::new(config.horizon_days);
        Self { config, expander }
    }

    pub fn with_defaults() -> Self {
        Self::new(GenerationConfig::default())
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn expander(&self) -> &OccurrenceExpander {
        &self.expander
    }

    /// Generates pending tasks for `user_id`, treating the local date as today.
    pub async fn ensure_generated<S>(&self, store: &S, user_id: &str) -> GenerationReport
    where
        S: RecurringItemStore + TaskStore + ?Sized,
    {
        self.ensure_generated_on(store, user_id, Local::now().date_naive())
            .await
    }

    /// Generates pending tasks for every stale item of `user_id`.
    ///
    /// Never fails: errors are logged and recorded in the report so the read
    /// that triggered generation can carry on.
    pub async fn ensure_generated_on<S>(&self, store: &S, user_id: &str, today: NaiveDate) -> GenerationReport
    where
        S: RecurringItemStore + TaskStore + ?Sized,
    {
        let started = Instant::now();
        let mut report = GenerationReport::default();

        let stale = match store.get_items_needing_generation(user_id, today).await {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!(user_id, error = %err, "could not load recurring items for generation");
                report.errors.push(format!("loading recurring items: {}", err));
                report.duration_ms = started.elapsed().as_millis() as u64;
                return report;
            }
        };

        for item in &stale {
            report.items_processed += 1;
            match self.generate_for_item(store, item).await {
                Ok(mut tasks) => {
                    tracing::debug!(recurring_item_id = %item.id, created = tasks.len(), "generation pass");
                    report.generated_tasks.append(&mut tasks);
                }
                Err(err) => {
                    tracing::warn!(recurring_item_id = %item.id, error = %err, "generation failed for recurring item");
                    report.items_with_errors += 1;
                    report.errors.push(format!("{}: {}", item.id, err));
                }
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        report
    }

    /// One item's pass: dedup against existing tasks, materialize, insert,
    /// then advance the watermark.
    ///
    /// When every capped candidate already has a task, as after a pass that
    /// inserted rows but never recorded them, the pass steps past those dates
    /// and tries again. The watermark follows the latest persisted date,
    /// whether inserted now or found already present.
    pub async fn generate_for_item<S>(&self, store: &S, item: &RecurringItem) -> Result<Vec<Task>, CoreError>
    where
        S: RecurringItemStore + TaskStore + ?Sized,
    {
        let existing_dates = existing_dates(store, item.id).await?;
        let materializer = Materializer::new(&self.expander);

        let mut from_date = match item.last_generated_date {
            Some(watermark) => next_day(watermark)?,
            None => item.start_date,
        };
        let mut covered = None;

        let tasks = loop {
            let append_after = self.window_tail(store, &item.user_id, from_date).await?;
            let tasks = materializer.materialize(item, from_date, &existing_dates, append_after.as_deref());
            if !tasks.is_empty() {
                break tasks;
            }

            let Some(anchor) = from_date.pred_opt() else {
                break tasks;
            };
            let candidates = self
                .expander
                .expand(&item.rrule, anchor, Some(item.generation_limit()));
            match candidates.last() {
                Some(last) if candidates.iter().all(|d| existing_dates.contains(d)) => {
                    covered = Some(*last);
                    from_date = next_day(*last)?;
                }
                _ => break tasks,
            }
        };

        let inserted = if tasks.is_empty() {
            Vec::new()
        } else {
            store.create_batch(&tasks).await?
        };

        let latest = inserted.iter().filter_map(|t| t.scheduled_date).max().max(covered);
        if let Some(latest) = latest {
            if Some(latest) > item.last_generated_date {
                store.update_watermark(item.id, latest).await?;
            }
        }
        Ok(inserted)
    }

    /// Recreates missing tasks for occurrences from `today` up to the
    /// watermark. Used after a paused item is resumed, since pausing removes
    /// tasks the watermark already covers. The watermark is left untouched.
    pub async fn restore_for_item<S>(&self, store: &S, item: &RecurringItem, today: NaiveDate) -> Result<Vec<Task>, CoreError>
    where
        S: RecurringItemStore + TaskStore + ?Sized,
    {
        let from_date = today.max(item.start_date);
        let Some(watermark) = item.last_generated_date.filter(|w| *w >= from_date) else {
            return Ok(Vec::new());
        };

        let existing_dates = existing_dates(store, item.id).await?;
        let append_after = self.window_tail(store, &item.user_id, from_date).await?;
        let tasks: Vec<Task> = Materializer::new(&self.expander)
            .materialize(item, from_date, &existing_dates, append_after.as_deref())
            .into_iter()
            .filter(|t| t.scheduled_date.is_some_and(|d| d <= watermark))
            .collect();

        if tasks.is_empty() {
            return Ok(Vec::new());
        }
        let restored = store.create_batch(&tasks).await?;
        tracing::debug!(recurring_item_id = %item.id, restored = restored.len(), "restored tasks after resume");
        Ok(restored)
    }

    /// Largest valid key among the user's tasks in `[from_date, from_date + horizon]`.
    ///
    /// New keys go after it, so each day's list keeps distinct positions and
    /// new rows land at the end.
    async fn window_tail<S>(&self, store: &S, user_id: &str, from_date: NaiveDate) -> Result<Option<String>, CoreError>
    where
        S: TaskStore + ?Sized,
    {
        let window_end = Duration::try_days(self.config.horizon_days)
            .and_then(|span| from_date.checked_add_signed(span))
            .unwrap_or(NaiveDate::MAX);
        let scheduled = store.find_by_user_and_date_range(user_id, from_date, window_end).await?;
        Ok(position::max_key(scheduled.iter().map(|t| t.position.as_str())).map(str::to_owned))
    }
}

fn next_day(date: NaiveDate) -> Result<NaiveDate, CoreError> {
    date.succ_opt()
        .ok_or_else(|| CoreError::InvalidInput(format!("watermark {} has no following day", date)))
}

async fn existing_dates<S>(store: &S, recurring_item_id: Uuid) -> Result<HashSet<NaiveDate>, CoreError>
where
    S: TaskStore + ?Sized,
{
    Ok(store
        .find_by_recurring_item(recurring_item_id)
        .await?
        .into_iter()
        .filter_map(|t| t.scheduled_date)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Frequency, RecurrencePattern, TaskPriority};
    use crate::recurrence::compile_rule;
    use rstest::rstest;
    use sqlx::types::Json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_test_item(pattern: RecurrencePattern, start: NaiveDate) -> RecurringItem {
        RecurringItem {
            id: Uuid::now_v7(),
            user_id: "user-1".to_string(),
            title: "Stretch".to_string(),
            description: Some("ten minutes".to_string()),
            category_id: Some(Uuid::now_v7()),
            priority: TaskPriority::Medium,
            sections: Json(vec!["morning".to_string()]),
            frequency: pattern.frequency(),
            weekdays: None,
            day_of_month: None,
            month: None,
            rrule: compile_rule(&pattern, start, None),
            start_date: start,
            end_date: None,
            due_offset_days: 0,
            last_generated_date: None,
            look_ahead_count: 0,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    mod materializer_tests {
        use super::*;

        #[test]
        fn daily_from_scratch_produces_fifteen_consecutive_days() {
            let expander = OccurrenceExpander::default();
            let item = create_test_item(RecurrencePattern::Daily, date(2025, 1, 1));
            let tasks = Materializer::new(&expander).materialize(&item, date(2025, 1, 1), &HashSet::new(), None);

            assert_eq!(tasks.len(), 15);
            assert_eq!(tasks[0].scheduled_date, Some(date(2025, 1, 1)));
            assert_eq!(tasks[14].scheduled_date, Some(date(2025, 1, 15)));
        }

        #[rstest]
        #[case(RecurrencePattern::Daily, 15)]
        #[case(RecurrencePattern::Weekdays, 15)]
        #[case(RecurrencePattern::Weekends, 15)]
        #[case(RecurrencePattern::Weekly { weekdays: vec!["MO".into(), "TH".into()] }, 8)]
        #[case(RecurrencePattern::Monthly { day_of_month: Some(10) }, 6)]
        #[case(RecurrencePattern::Yearly { month: Some(3), day_of_month: Some(1) }, 2)]
        fn never_exceeds_the_frequency_cap(#[case] pattern: RecurrencePattern, #[case] cap: usize) {
            // A long horizon so sparse rules could produce more than the cap.
            let expander = OccurrenceExpander::new(3650);
            let item = create_test_item(pattern, date(2025, 1, 1));
            let tasks = Materializer::new(&expander).materialize(&item, date(2025, 1, 1), &HashSet::new(), None);
            assert_eq!(tasks.len(), cap);
        }

        #[test]
        fn yearly_within_default_horizon_is_bounded_by_the_horizon() {
            let expander = OccurrenceExpander::default();
            let item = create_test_item(
                RecurrencePattern::Yearly { month: Some(3), day_of_month: Some(1) },
                date(2025, 1, 1),
            );
            let tasks = Materializer::new(&expander).materialize(&item, date(2025, 1, 1), &HashSet::new(), None);
            assert_eq!(tasks.len(), 1);
            assert_eq!(tasks[0].scheduled_date, Some(date(2025, 3, 1)));
        }

        #[test]
        fn existing_dates_are_skipped() {
            let expander = OccurrenceExpander::default();
            let item = create_test_item(RecurrencePattern::Daily, date(2025, 1, 1));
            let existing: HashSet<NaiveDate> = [date(2025, 1, 2), date(2025, 1, 5)].into_iter().collect();
            let tasks = Materializer::new(&expander).materialize(&item, date(2025, 1, 1), &existing, None);

            assert_eq!(tasks.len(), 13);
            assert!(tasks.iter().all(|t| !existing.contains(&t.scheduled_date.unwrap())));
        }

        #[rstest]
        #[case(0, None)]
        #[case(3, Some(date(2025, 1, 4)))]
        fn due_date_follows_the_offset(#[case] offset: i32, #[case] first_due: Option<NaiveDate>) {
            let expander = OccurrenceExpander::default();
            let mut item = create_test_item(RecurrencePattern::Daily, date(2025, 1, 1));
            item.due_offset_days = offset;
            let tasks = Materializer::new(&expander).materialize(&item, date(2025, 1, 1), &HashSet::new(), None);

            assert_eq!(tasks[0].due_date, first_due);
            for task in &tasks {
                assert_eq!(task.due_date, due_date_for(task.scheduled_date.unwrap(), offset));
            }
        }

        #[test]
        fn template_fields_are_copied_and_linked() {
            let expander = OccurrenceExpander::default();
            let item = create_test_item(RecurrencePattern::Daily, date(2025, 1, 1));
            let tasks = Materializer::new(&expander).materialize(&item, date(2025, 1, 1), &HashSet::new(), None);

            for task in &tasks {
                assert_eq!(task.title, item.title);
                assert_eq!(task.description, item.description);
                assert_eq!(task.category_id, item.category_id);
                assert_eq!(task.priority, item.priority);
                assert_eq!(task.sections.0, item.sections.0);
                assert_eq!(task.user_id, item.user_id);
                assert_eq!(task.recurring_item_id, Some(item.id));
                assert!(!task.completed);
                assert!(task.completed_at.is_none());
            }
        }

        #[test]
        fn positions_ascend_after_the_given_key() {
            let expander = OccurrenceExpander::default();
            let item = create_test_item(RecurrencePattern::Daily, date(2025, 1, 1));
            let tasks = Materializer::new(&expander).materialize(&item, date(2025, 1, 1), &HashSet::new(), Some("x"));

            assert!(tasks[0].position.as_str() > "x");
            assert!(tasks.windows(2).all(|w| w[0].position < w[1].position));
        }

        #[test]
        fn invalid_append_key_starts_from_min() {
            let expander = OccurrenceExpander::default();
            let item = create_test_item(RecurrencePattern::Daily, date(2025, 1, 1));
            let tasks = Materializer::new(&expander).materialize(&item, date(2025, 1, 1), &HashSet::new(), Some("1000.0"));
            assert_eq!(tasks[0].position, position::min());
        }

        #[test]
        fn end_date_stops_generation() {
            let expander = OccurrenceExpander::default();
            let mut item = create_test_item(RecurrencePattern::Daily, date(2025, 1, 1));
            item.end_date = Some(date(2025, 1, 3));
            item.rrule = compile_rule(&RecurrencePattern::Daily, item.start_date, item.end_date);
            let tasks = Materializer::new(&expander).materialize(&item, date(2025, 1, 1), &HashSet::new(), None);
            assert_eq!(tasks.len(), 3);
        }

        #[test]
        fn broken_rule_produces_no_tasks() {
            let expander = OccurrenceExpander::default();
            let mut item = create_test_item(RecurrencePattern::Daily, date(2025, 1, 1));
            item.rrule = "RRULE:FREQ=SOMETIMES".to_string();
            let tasks = Materializer::new(&expander).materialize(&item, date(2025, 1, 1), &HashSet::new(), None);
            assert!(tasks.is_empty());
        }
    }

    mod generation_manager_tests {
        use super::*;

        #[test]
        fn defaults_use_a_one_year_horizon() {
            let manager = GenerationManager::with_defaults();
            assert_eq!(manager.config().horizon_days, 365);
            assert_eq!(manager.expander().horizon_days(), 365);
        }

        #[rstest]
        #[case(-30, 0)]
        #[case(i64::MAX, MAX_HORIZON_DAYS)]
        fn out_of_range_horizons_are_clamped(#[case] configured: i64, #[case] expected: i64) {
            let manager = GenerationManager::new(GenerationConfig { horizon_days: configured });
            assert_eq!(manager.config().horizon_days, expected);
            assert_eq!(manager.expander().horizon_days(), expected);
        }

        #[test]
        fn huge_due_offsets_yield_no_due_date() {
            assert_eq!(due_date_for(NaiveDate::MAX, 1), None);
            assert_eq!(due_date_for(date(2025, 1, 1), i32::MAX), None);
        }

        #[test]
        fn report_starts_empty() {
            let report = GenerationReport::default();
            assert!(report.generated_tasks.is_empty());
            assert_eq!(report.items_processed, 0);
            assert_eq!(report.items_with_errors, 0);
            assert!(report.errors.is_empty());
        }

        #[test]
        fn frequency_of_test_item_matches_pattern() {
            let item = create_test_item(RecurrencePattern::Weekends, date(2025, 1, 1));
            assert_eq!(item.frequency, Frequency::Weekends);
        }
    }
}
