use crate::error::CoreError;
use crate::models::{Task, UpdateTask};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, Transaction};
use uuid::Uuid;

#[async_trait]
impl super::TaskStore for SqliteRepository {
    async fn create_task(&self, task: &Task) -> Result<Task, CoreError> {
        let mut tx = self.pool().begin().await?;
        let inserted = Self::insert_task_in_transaction(&mut tx, task).await?;
        tx.commit().await?;

        if !inserted {
            return Err(CoreError::InvalidInput(format!(
                "A task for this recurring item already exists on {}",
                task.scheduled_date.map(|d| d.to_string()).unwrap_or_default()
            )));
        }
        Ok(task.clone())
    }

    async fn create_batch(&self, tasks: &[Task]) -> Result<Vec<Task>, CoreError> {
        let mut tx = self.pool().begin().await?;
        let mut created = Vec::with_capacity(tasks.len());

        for task in tasks {
            if Self::insert_task_in_transaction(&mut tx, task).await? {
                created.push(task.clone());
            }
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn find_task_by_id(&self, id: Uuid) -> Result<Option<Task>, CoreError> {
        let task = sqlx::query_as("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(task)
    }

    async fn find_tasks_by_short_id(&self, user_id: &str, short_id: &str) -> Result<Vec<Task>, CoreError> {
        // Ids are stored as 16-byte blobs; match against the tail of their hex form.
        let mut pattern = String::with_capacity(short_id.len() + 1);
        pattern.push('%');
        pattern.extend(short_id.chars().filter(|c| *c != '-').map(|c| c.to_ascii_uppercase()));

        let tasks: Vec<Task> = sqlx::query_as(
            "SELECT * FROM tasks WHERE user_id = $1 AND hex(id) LIKE $2 ORDER BY created_at"
        )
        .bind(user_id)
        .bind(pattern)
        .fetch_all(self.pool())
        .await?;
        Ok(tasks)
    }

    async fn find_by_user_and_date(&self, user_id: &str, date: Option<NaiveDate>) -> Result<Vec<Task>, CoreError> {
        let tasks = sqlx::query_as(
            "SELECT * FROM tasks WHERE user_id = $1 AND scheduled_date IS $2 ORDER BY position, created_at"
        )
        .bind(user_id)
        .bind(date)
        .fetch_all(self.pool())
        .await?;
        Ok(tasks)
    }

    async fn find_by_user_and_date_range(&self, user_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Task>, CoreError> {
        let tasks = sqlx::query_as(
            r#"SELECT * FROM tasks
            WHERE user_id = $1 AND scheduled_date BETWEEN $2 AND $3
            ORDER BY scheduled_date, position, created_at"#
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(self.pool())
        .await?;
        Ok(tasks)
    }

    async fn find_by_recurring_item(&self, recurring_item_id: Uuid) -> Result<Vec<Task>, CoreError> {
        let tasks = sqlx::query_as(
            "SELECT * FROM tasks WHERE recurring_item_id = $1 ORDER BY scheduled_date"
        )
        .bind(recurring_item_id)
        .fetch_all(self.pool())
        .await?;
        Ok(tasks)
    }

    async fn update_task(&self, id: Uuid, data: &UpdateTask) -> Result<Task, CoreError> {
        let now = Utc::now();
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE tasks SET updated_at = ");
        qb.push_bind(now);

        if let Some(title) = &data.title {
            qb.push(", title = ");
            qb.push_bind(title);
        }
        if let Some(description) = &data.description {
            qb.push(", description = ");
            qb.push_bind(description);
        }
        if let Some(priority) = &data.priority {
            qb.push(", priority = ");
            qb.push_bind(priority);
        }
        if let Some(scheduled_date) = data.scheduled_date {
            qb.push(", scheduled_date = ");
            qb.push_bind(scheduled_date);
        }
        if let Some(due_date) = data.due_date {
            qb.push(", due_date = ");
            qb.push_bind(due_date);
        }
        if let Some(completed) = data.completed {
            qb.push(", completed = ");
            qb.push_bind(completed);
            qb.push(", completed_at = ");
            qb.push_bind(completed.then_some(now));
        }
        if let Some(position) = &data.position {
            qb.push(", position = ");
            qb.push_bind(position);
        }

        qb.push(" WHERE id = ");
        qb.push_bind(id);

        let result = qb.build().execute(self.pool()).await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(id.to_string()));
        }

        let task = sqlx::query_as("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_one(self.pool())
            .await?;
        Ok(task)
    }

    async fn update_positions(&self, positions: &[(Uuid, String)]) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;
        let now = Utc::now();

        for (id, position) in positions {
            let result = sqlx::query("UPDATE tasks SET position = $1, updated_at = $2 WHERE id = $3")
                .bind(position)
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await?;

            // Dropping the transaction rolls back every earlier row.
            if result.rows_affected() == 0 {
                return Err(CoreError::NotFound(id.to_string()));
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_task(&self, id: Uuid) -> Result<(), CoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete_uncompleted_by_recurring_item(&self, recurring_item_id: Uuid) -> Result<u64, CoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE recurring_item_id = $1 AND completed = 0")
            .bind(recurring_item_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }
}

impl SqliteRepository {
    /// Inserts one task; returns `false` when the (recurring item, scheduled
    /// date) pair already exists and the row was skipped.
    pub(crate) async fn insert_task_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        task: &Task,
    ) -> Result<bool, CoreError> {
        let result = sqlx::query(
            r#"INSERT INTO tasks (id, user_id, title, description, category_id, priority, sections, scheduled_date, due_date, completed, completed_at, position, recurring_item_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (recurring_item_id, scheduled_date) DO NOTHING"#
        )
        .bind(task.id)
        .bind(&task.user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.category_id)
        .bind(&task.priority)
        .bind(&task.sections)
        .bind(task.scheduled_date)
        .bind(task.due_date)
        .bind(task.completed)
        .bind(task.completed_at)
        .bind(&task.position)
        .bind(task.recurring_item_id)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
