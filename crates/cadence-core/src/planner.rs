//! Service layer over the stores: recurring item lifecycle, task creation and
//! completion, and reads that trigger lazy generation.

use chrono::{Local, NaiveDate, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::CoreError;
use crate::materialization::{GenerationManager, GenerationReport};
use crate::models::{
    NewRecurringItem, NewTask, RecurrencePattern, RecurringItem, Task, TaskPriority, UpdateRecurringItem, UpdateTask,
};
use crate::position;
use crate::recurrence::compile_rule;
use crate::reorder::{self, ReorderOutcome};
use crate::repository::Repository;

/// Minimum length accepted by [`Planner::resolve_task_id`].
pub const MIN_SHORT_ID_LEN: usize = 2;

/// Hex digits shown as a short id.
pub const SHORT_ID_LEN: usize = 8;

/// Trailing hex digits of `id`. UUIDv7 ids created together share their
/// leading timestamp digits, so short ids come from the random tail.
pub fn short_id(id: Uuid) -> String {
    let simple = id.simple().to_string();
    simple[simple.len() - SHORT_ID_LEN..].to_string()
}

pub struct Planner<R: Repository> {
    store: R,
    generation: GenerationManager,
}

impl<R: Repository> Planner<R> {
    pub fn new(store: R, generation: GenerationManager) -> Self {
        Self { store, generation }
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    pub fn generation(&self) -> &GenerationManager {
        &self.generation
    }

    // ------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------

    pub async fn ensure_generated(&self, user_id: &str) -> GenerationReport {
        self.generation.ensure_generated(&self.store, user_id).await
    }

    pub async fn ensure_generated_on(&self, user_id: &str, today: NaiveDate) -> GenerationReport {
        self.generation.ensure_generated_on(&self.store, user_id, today).await
    }

    /// Tasks scheduled in `[start, end]`, after topping up recurring items.
    pub async fn list_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<(Vec<Task>, GenerationReport), CoreError> {
        if end < start {
            return Err(CoreError::InvalidInput(format!(
                "Range end {} is before its start {}",
                end, start
            )));
        }
        let report = self.ensure_generated_on(user_id, today).await;
        let tasks = self.store.find_by_user_and_date_range(user_id, start, end).await?;
        Ok((tasks, report))
    }

    // ------------------------------------------------------------------
    // Recurring items
    // ------------------------------------------------------------------

    pub async fn create_recurring_item(&self, data: NewRecurringItem) -> Result<RecurringItem, CoreError> {
        let title = data.title.trim();
        if title.is_empty() {
            return Err(CoreError::InvalidInput("Title cannot be empty".to_string()));
        }
        if let Some(end) = data.end_date {
            if end < data.start_date {
                return Err(CoreError::InvalidInput(format!(
                    "End date {} is before start date {}",
                    end, data.start_date
                )));
            }
        }
        if data.due_offset_days < 0 {
            return Err(CoreError::InvalidInput("Due offset cannot be negative".to_string()));
        }
        if data.look_ahead_count.is_some_and(|n| n < 0) {
            return Err(CoreError::InvalidInput("Look-ahead count cannot be negative".to_string()));
        }

        let (weekdays, day_of_month, month) = match &data.pattern {
            RecurrencePattern::Weekly { weekdays } => (Some(weekdays.join(",")), None, None),
            RecurrencePattern::Monthly { day_of_month } => (None, *day_of_month, None),
            RecurrencePattern::Yearly { month, day_of_month } => (None, *day_of_month, *month),
            _ => (None, None, None),
        };

        let now = Utc::now();
        let item = RecurringItem {
            id: Uuid::now_v7(),
            user_id: data.user_id,
            title: title.to_string(),
            description: data.description,
            category_id: data.category_id,
            priority: data.priority.unwrap_or(TaskPriority::None),
            sections: Json(data.sections),
            frequency: data.pattern.frequency(),
            weekdays,
            day_of_month,
            month,
            rrule: compile_rule(&data.pattern, data.start_date, data.end_date),
            start_date: data.start_date,
            end_date: data.end_date,
            due_offset_days: data.due_offset_days,
            last_generated_date: None,
            look_ahead_count: data.look_ahead_count.unwrap_or(0),
            active: true,
            created_at: now,
            updated_at: now,
        };

        let created = self.store.create(&item).await?;
        tracing::debug!(recurring_item_id = %created.id, frequency = %created.frequency, "created recurring item");
        Ok(created)
    }

    /// Applies template and lifecycle changes, treating the local date as today.
    pub async fn update_recurring_item(&self, id: Uuid, data: UpdateRecurringItem) -> Result<RecurringItem, CoreError> {
        self.update_recurring_item_on(id, data, Local::now().date_naive())
            .await
    }

    /// Applies template and lifecycle changes.
    ///
    /// Template edits affect future generation only. Any request that leaves
    /// the item inactive removes its uncompleted generated tasks, so a failed
    /// pause can simply be repeated. Resuming moves the watermark up to
    /// yesterday, skipping the paused days, and recreates the tasks from
    /// `today` that pausing removed.
    pub async fn update_recurring_item_on(
        &self,
        id: Uuid,
        mut data: UpdateRecurringItem,
        today: NaiveDate,
    ) -> Result<RecurringItem, CoreError> {
        let current = self.get_recurring_item(id).await?;

        if let Some(title) = &data.title {
            if title.trim().is_empty() {
                return Err(CoreError::InvalidInput("Title cannot be empty".to_string()));
            }
        }
        if data.due_offset_days.is_some_and(|n| n < 0) {
            return Err(CoreError::InvalidInput("Due offset cannot be negative".to_string()));
        }
        if data.look_ahead_count.is_some_and(|n| n < 0) {
            return Err(CoreError::InvalidInput("Look-ahead count cannot be negative".to_string()));
        }
        if let Some(end_date) = data.end_date {
            if let Some(end) = end_date {
                if end < current.start_date {
                    return Err(CoreError::InvalidInput(format!(
                        "End date {} is before start date {}",
                        end, current.start_date
                    )));
                }
            }
            data.rrule = Some(compile_rule(&current.pattern(), current.start_date, end_date));
        }

        let updated = self.store.update(id, &data).await?;

        if !updated.active && data.active == Some(false) {
            let removed = self.store.delete_uncompleted_by_recurring_item(id).await?;
            tracing::debug!(recurring_item_id = %id, removed, "deactivated recurring item");
        } else if !current.active && updated.active {
            if let Some(yesterday) = today.pred_opt().filter(|d| *d >= updated.start_date) {
                self.store.update_watermark(id, yesterday).await?;
            }
            let resumed = self.get_recurring_item(id).await?;
            self.generation.restore_for_item(&self.store, &resumed, today).await?;
            tracing::debug!(recurring_item_id = %id, "reactivated recurring item");
        }

        self.get_recurring_item(id).await
    }

    /// Deletes the item and its uncompleted generated tasks. Completed tasks
    /// stay, keeping their now-dangling link.
    pub async fn delete_recurring_item(&self, id: Uuid) -> Result<u64, CoreError> {
        self.get_recurring_item(id).await?;
        let removed = self.store.delete_uncompleted_by_recurring_item(id).await?;
        self.store.delete(id).await?;
        Ok(removed)
    }

    pub async fn get_recurring_item(&self, id: Uuid) -> Result<RecurringItem, CoreError> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Recurring item with id {} not found", id)))
    }

    pub async fn list_recurring_items(&self, user_id: &str, active_only: bool) -> Result<Vec<RecurringItem>, CoreError> {
        self.store.get_by_user_id(user_id, active_only).await
    }

    /// Upcoming occurrence dates from the local today, without writing anything.
    pub async fn preview_occurrences(&self, id: Uuid, count: usize) -> Result<Vec<NaiveDate>, CoreError> {
        self.preview_occurrences_on(id, count, Local::now().date_naive())
            .await
    }

    /// Occurrence dates on or after the later of `today` and the item's start.
    pub async fn preview_occurrences_on(&self, id: Uuid, count: usize, today: NaiveDate) -> Result<Vec<NaiveDate>, CoreError> {
        let item = self.get_recurring_item(id).await?;
        let Some(anchor) = item.start_date.max(today).pred_opt() else {
            return Ok(Vec::new());
        };
        Ok(self.generation.expander().expand(&item.rrule, anchor, Some(count)))
    }

    /// Resolves a recurring item id from its full form or a unique short id.
    pub async fn resolve_recurring_item_id(&self, user_id: &str, short_id: &str) -> Result<Uuid, CoreError> {
        if let Ok(id) = Uuid::parse_str(short_id) {
            return Ok(id);
        }
        check_short_id(short_id)?;
        let needle = normalize_short_id(short_id);
        let matches: Vec<RecurringItem> = self
            .store
            .get_by_user_id(user_id, false)
            .await?
            .into_iter()
            .filter(|item| item.id.simple().to_string().ends_with(&needle))
            .collect();
        single_match(short_id, matches.into_iter().map(|i| (i.id, i.title)).collect())
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    /// Creates a user task at the end of its date's list.
    pub async fn add_task(&self, data: NewTask) -> Result<Task, CoreError> {
        let title = data.title.trim();
        if title.is_empty() {
            return Err(CoreError::InvalidInput("Title cannot be empty".to_string()));
        }

        let scope = self.store.find_by_user_and_date(&data.user_id, data.scheduled_date).await?;
        let last = position::max_key(scope.iter().map(|t| t.position.as_str()));

        let now = Utc::now();
        let task = Task {
            id: Uuid::now_v7(),
            user_id: data.user_id.clone(),
            title: title.to_string(),
            description: data.description,
            category_id: data.category_id,
            priority: data.priority.unwrap_or(TaskPriority::None),
            sections: Json(data.sections),
            scheduled_date: data.scheduled_date,
            due_date: data.due_date,
            completed: false,
            completed_at: None,
            position: position::append_after(last),
            recurring_item_id: None,
            created_at: now,
            updated_at: now,
        };
        self.store.create_task(&task).await
    }

    pub async fn get_task(&self, id: Uuid) -> Result<Task, CoreError> {
        self.store
            .find_task_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Task with id {} not found", id)))
    }

    /// Marks a task done, or undone when `completed` is false.
    pub async fn complete_task(&self, id: Uuid, completed: bool) -> Result<Task, CoreError> {
        let update = UpdateTask {
            completed: Some(completed),
            ..Default::default()
        };
        self.store.update_task(id, &update).await
    }

    pub async fn delete_task(&self, id: Uuid) -> Result<(), CoreError> {
        self.store.delete_task(id).await
    }

    /// Moves a task within its own date's list.
    pub async fn move_task(&self, id: Uuid, new_index: usize) -> Result<ReorderOutcome, CoreError> {
        let task = self.get_task(id).await?;
        reorder::apply_reorder(&self.store, &task.user_id, task.scheduled_date, id, new_index).await
    }

    /// One list scope in display order. `None` is the unscheduled list.
    pub async fn list_scope(&self, user_id: &str, date: Option<NaiveDate>) -> Result<Vec<Task>, CoreError> {
        self.store.find_by_user_and_date(user_id, date).await
    }

    /// Resolves a task id from its full form or a unique short id.
    pub async fn resolve_task_id(&self, user_id: &str, short_id: &str) -> Result<Uuid, CoreError> {
        if let Ok(id) = Uuid::parse_str(short_id) {
            return Ok(id);
        }
        check_short_id(short_id)?;
        let tasks = self.store.find_tasks_by_short_id(user_id, short_id).await?;
        single_match(short_id, tasks.into_iter().map(|t| (t.id, t.title)).collect())
    }
}

fn check_short_id(short_id: &str) -> Result<(), CoreError> {
    if short_id.len() < MIN_SHORT_ID_LEN {
        return Err(CoreError::InvalidInput(format!(
            "Short ID must be at least {} characters long.",
            MIN_SHORT_ID_LEN
        )));
    }
    if !short_id.chars().all(|c| c == '-' || c.is_ascii_hexdigit()) {
        return Err(CoreError::InvalidInput(format!(
            "Short ID '{}' may only contain hexadecimal digits.",
            short_id
        )));
    }
    Ok(())
}

fn normalize_short_id(short_id: &str) -> String {
    short_id
        .chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn single_match(short_id: &str, mut matches: Vec<(Uuid, String)>) -> Result<Uuid, CoreError> {
    match matches.len() {
        0 => Err(CoreError::NotFound(format!("Nothing found with ID '{}'", short_id))),
        1 => Ok(matches.remove(0).0),
        _ => Err(CoreError::AmbiguousId(
            matches.into_iter().map(|(id, title)| (id.to_string(), title)).collect(),
        )),
    }
}
