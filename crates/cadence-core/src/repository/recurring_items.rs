use crate::error::CoreError;
use crate::models::{RecurringItem, UpdateRecurringItem};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

#[async_trait]
impl super::RecurringItemStore for SqliteRepository {
    async fn create(&self, item: &RecurringItem) -> Result<RecurringItem, CoreError> {
        sqlx::query(
            r#"INSERT INTO recurring_items (id, user_id, title, description, category_id, priority, sections, frequency, weekdays, day_of_month, month, rrule, start_date, end_date, due_offset_days, last_generated_date, look_ahead_count, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)"#
        )
        .bind(item.id)
        .bind(&item.user_id)
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.category_id)
        .bind(&item.priority)
        .bind(&item.sections)
        .bind(item.frequency)
        .bind(&item.weekdays)
        .bind(item.day_of_month)
        .bind(item.month)
        .bind(&item.rrule)
        .bind(item.start_date)
        .bind(item.end_date)
        .bind(item.due_offset_days)
        .bind(item.last_generated_date)
        .bind(item.look_ahead_count)
        .bind(item.active)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(self.pool())
        .await?;

        Ok(item.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<RecurringItem>, CoreError> {
        let item = sqlx::query_as("SELECT * FROM recurring_items WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(item)
    }

    async fn get_by_user_id(&self, user_id: &str, active_only: bool) -> Result<Vec<RecurringItem>, CoreError> {
        let items = sqlx::query_as(
            "SELECT * FROM recurring_items WHERE user_id = $1 AND ($2 = 0 OR active = 1) ORDER BY created_at"
        )
        .bind(user_id)
        .bind(active_only)
        .fetch_all(self.pool())
        .await?;
        Ok(items)
    }

    async fn update(&self, id: Uuid, data: &UpdateRecurringItem) -> Result<RecurringItem, CoreError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE recurring_items SET updated_at = ");
        qb.push_bind(Utc::now());

        if let Some(title) = &data.title {
            qb.push(", title = ");
            qb.push_bind(title);
        }
        if let Some(description) = &data.description {
            qb.push(", description = ");
            qb.push_bind(description);
        }
        if let Some(category_id) = data.category_id {
            qb.push(", category_id = ");
            qb.push_bind(category_id);
        }
        if let Some(priority) = &data.priority {
            qb.push(", priority = ");
            qb.push_bind(priority);
        }
        if let Some(sections) = &data.sections {
            qb.push(", sections = ");
            qb.push_bind(Json(sections));
        }
        if let Some(end_date) = data.end_date {
            qb.push(", end_date = ");
            qb.push_bind(end_date);
        }
        if let Some(offset) = data.due_offset_days {
            qb.push(", due_offset_days = ");
            qb.push_bind(offset);
        }
        if let Some(count) = data.look_ahead_count {
            qb.push(", look_ahead_count = ");
            qb.push_bind(count);
        }
        if let Some(active) = data.active {
            qb.push(", active = ");
            qb.push_bind(active);
        }
        if let Some(rrule) = &data.rrule {
            qb.push(", rrule = ");
            qb.push_bind(rrule);
        }

        qb.push(" WHERE id = ");
        qb.push_bind(id);

        let result = qb.build().execute(self.pool()).await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Recurring item with id {} not found", id)));
        }

        let item = sqlx::query_as("SELECT * FROM recurring_items WHERE id = $1")
            .bind(id)
            .fetch_one(self.pool())
            .await?;
        Ok(item)
    }

    async fn delete(&self, id: Uuid) -> Result<(), CoreError> {
        let result = sqlx::query("DELETE FROM recurring_items WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Recurring item with id {} not found", id)));
        }
        Ok(())
    }

    async fn update_watermark(&self, id: Uuid, date: NaiveDate) -> Result<(), CoreError> {
        // Guarded so two concurrent passes can never pull the watermark back.
        let result = sqlx::query(
            r#"UPDATE recurring_items SET last_generated_date = $1, updated_at = $2
            WHERE id = $3 AND (last_generated_date IS NULL OR last_generated_date < $1)"#
        )
        .bind(date)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recurring_items WHERE id = $1")
                .bind(id)
                .fetch_one(self.pool())
                .await?;
            if exists == 0 {
                return Err(CoreError::NotFound(format!("Recurring item with id {} not found", id)));
            }
        }
        Ok(())
    }

    async fn get_items_needing_generation(&self, user_id: &str, today: NaiveDate) -> Result<Vec<RecurringItem>, CoreError> {
        let items = sqlx::query_as(
            r#"SELECT * FROM recurring_items
            WHERE user_id = $1 AND active = 1
            AND (last_generated_date IS NULL OR last_generated_date < $2)
            ORDER BY created_at"#
        )
        .bind(user_id)
        .bind(today)
        .fetch_all(self.pool())
        .await?;
        Ok(items)
    }
}
