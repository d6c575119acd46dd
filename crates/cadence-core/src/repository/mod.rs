use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{RecurringItem, Task, UpdateRecurringItem, UpdateTask};
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

pub mod recurring_items;
pub mod tasks;

/// Persistence contract for recurring items.
#[async_trait]
pub trait RecurringItemStore: Send + Sync {
    async fn create(&self, item: &RecurringItem) -> Result<RecurringItem, CoreError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<RecurringItem>, CoreError>;
    async fn get_by_user_id(&self, user_id: &str, active_only: bool) -> Result<Vec<RecurringItem>, CoreError>;
    async fn update(&self, id: Uuid, data: &UpdateRecurringItem) -> Result<RecurringItem, CoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), CoreError>;
    /// Moves the watermark forward to `date`. An earlier date is a no-op.
    async fn update_watermark(&self, id: Uuid, date: NaiveDate) -> Result<(), CoreError>;
    /// Active items of `user_id` whose watermark is unset or before `today`.
    async fn get_items_needing_generation(&self, user_id: &str, today: NaiveDate) -> Result<Vec<RecurringItem>, CoreError>;
}

/// Persistence contract for tasks.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, task: &Task) -> Result<Task, CoreError>;
    /// Inserts in one transaction and returns only the rows actually written;
    /// a task whose (recurring item, scheduled date) already exists is skipped.
    async fn create_batch(&self, tasks: &[Task]) -> Result<Vec<Task>, CoreError>;
    async fn find_task_by_id(&self, id: Uuid) -> Result<Option<Task>, CoreError>;
    /// Tasks of `user_id` whose id ends with the hex digits of `short_id`.
    async fn find_tasks_by_short_id(&self, user_id: &str, short_id: &str) -> Result<Vec<Task>, CoreError>;
    /// One list scope, ordered by position. `None` is the unscheduled list.
    async fn find_by_user_and_date(&self, user_id: &str, date: Option<NaiveDate>) -> Result<Vec<Task>, CoreError>;
    /// Scheduled tasks with `start <= scheduled_date <= end`, ordered by date then position.
    async fn find_by_user_and_date_range(&self, user_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Task>, CoreError>;
    async fn find_by_recurring_item(&self, recurring_item_id: Uuid) -> Result<Vec<Task>, CoreError>;
    async fn update_task(&self, id: Uuid, data: &UpdateTask) -> Result<Task, CoreError>;
    /// Writes every (id, position) pair or none of them.
    async fn update_positions(&self, positions: &[(Uuid, String)]) -> Result<(), CoreError>;
    async fn delete_task(&self, id: Uuid) -> Result<(), CoreError>;
    /// Returns the number of tasks removed.
    async fn delete_uncompleted_by_recurring_item(&self, recurring_item_id: Uuid) -> Result<u64, CoreError>;
}

/// Both stores behind one bound.
pub trait Repository: RecurringItemStore + TaskStore {}

impl<T: RecurringItemStore + TaskStore + ?Sized> Repository for T {}

/// SQLite implementation of both stores
#[derive(Clone)]
pub struct SqliteRepository {
    pool: DbPool,
}

impl SqliteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the database pool for internal use across modules
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }
}
