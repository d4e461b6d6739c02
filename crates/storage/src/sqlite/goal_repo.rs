use chrono::{DateTime, Utc};
use spark_core::model::{Goal, GoalId, GoalPatch};

use super::SqliteRepository;
use super::mapping::{map_goal_row, ser};
use super::task_repo::write_error;
use crate::repository::{GoalRepository, StorageError};

const GOAL_COLUMNS: &str = "id, title, description, target_date, created_at, updated_at, progress, subject, book_id, chapter_start, chapter_end";

#[async_trait::async_trait]
impl GoalRepository for SqliteRepository {
    async fn insert_goal(&self, goal: &Goal) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO goals (
                id, title, description, target_date, created_at, updated_at,
                progress, subject, book_id, chapter_start, chapter_end
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )
        .bind(goal.id().to_string())
        .bind(goal.title())
        .bind(goal.description())
        .bind(goal.target_date())
        .bind(goal.created_at())
        .bind(goal.updated_at())
        .bind(i64::from(goal.progress()))
        .bind(goal.subject())
        .bind(goal.book_id())
        .bind(goal.chapters().map(|c| i64::from(c.start())))
        .bind(goal.chapters().map(|c| i64::from(c.end())))
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        Ok(())
    }

    async fn get_goal(&self, id: GoalId) -> Result<Option<Goal>, StorageError> {
        let row = sqlx::query(&format!("SELECT {GOAL_COLUMNS} FROM goals WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_goal_row).transpose()
    }

    async fn list_goals(&self) -> Result<Vec<Goal>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {GOAL_COLUMNS} FROM goals ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_goal_row).collect()
    }

    async fn update_goal(
        &self,
        id: GoalId,
        patch: GoalPatch,
        now: DateTime<Utc>,
    ) -> Result<Goal, StorageError> {
        let mut tx = self.begin_write().await?;

        let row = sqlx::query(&format!("SELECT {GOAL_COLUMNS} FROM goals WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .ok_or(StorageError::NotFound)?;

        let mut goal = map_goal_row(&row)?;
        goal.apply_patch(patch, now).map_err(ser)?;

        sqlx::query(
            r"
            UPDATE goals SET
                title = ?2,
                description = ?3,
                target_date = ?4,
                updated_at = ?5,
                progress = ?6,
                subject = ?7,
                book_id = ?8,
                chapter_start = ?9,
                chapter_end = ?10
            WHERE id = ?1
            ",
        )
        .bind(goal.id().to_string())
        .bind(goal.title())
        .bind(goal.description())
        .bind(goal.target_date())
        .bind(goal.updated_at())
        .bind(i64::from(goal.progress()))
        .bind(goal.subject())
        .bind(goal.book_id())
        .bind(goal.chapters().map(|c| i64::from(c.start())))
        .bind(goal.chapters().map(|c| i64::from(c.end())))
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(goal)
    }

    async fn delete_goal(&self, id: GoalId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM goals WHERE id = ?1")
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
