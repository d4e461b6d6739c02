use chrono::{DateTime, Utc};
use spark_core::model::{Task, TaskId, TaskPatch};

use super::SqliteRepository;
use super::mapping::{map_task_row, ser, status_to_str, tags_to_json};
use crate::repository::{StorageError, TaskRepository};

const TASK_COLUMNS: &str = "id, title, subject, status, due_date, original_date, priority, tags, notes, created_at, updated_at";

pub(super) fn write_error(e: sqlx::Error) -> StorageError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

#[async_trait::async_trait]
impl TaskRepository for SqliteRepository {
    async fn insert_task(&self, task: &Task) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO tasks (
                id, title, subject, status, due_date, original_date,
                priority, tags, notes, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )
        .bind(task.id().to_string())
        .bind(task.title())
        .bind(task.subject())
        .bind(status_to_str(task.status()))
        .bind(task.due_date())
        .bind(task.original_date())
        .bind(task.priority().map(|p| p.as_str()))
        .bind(tags_to_json(task.tags())?)
        .bind(task.notes())
        .bind(task.created_at())
        .bind(task.updated_at())
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        Ok(())
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, StorageError> {
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_task_row).transpose()
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_task_row).collect()
    }

    async fn update_task(
        &self,
        id: TaskId,
        patch: TaskPatch,
        now: DateTime<Utc>,
    ) -> Result<Task, StorageError> {
        let mut tx = self.begin_write().await?;

        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .ok_or(StorageError::NotFound)?;

        let mut task = map_task_row(&row)?;
        task.apply_patch(patch, now).map_err(ser)?;

        sqlx::query(
            r"
            UPDATE tasks SET
                title = ?2,
                subject = ?3,
                status = ?4,
                due_date = ?5,
                original_date = ?6,
                priority = ?7,
                tags = ?8,
                notes = ?9,
                updated_at = ?10
            WHERE id = ?1
            ",
        )
        .bind(task.id().to_string())
        .bind(task.title())
        .bind(task.subject())
        .bind(status_to_str(task.status()))
        .bind(task.due_date())
        .bind(task.original_date())
        .bind(task.priority().map(|p| p.as_str()))
        .bind(tags_to_json(task.tags())?)
        .bind(task.notes())
        .bind(task.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(task)
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM tasks WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
