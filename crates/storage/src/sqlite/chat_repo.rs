use spark_core::model::{ChatMessage, ChatMessageId, NewChatMessage};

use super::SqliteRepository;
use super::mapping::{map_chat_row, ser};
use crate::repository::{ChatRepository, StorageError};

#[async_trait::async_trait]
impl ChatRepository for SqliteRepository {
    async fn insert_message(
        &self,
        message: NewChatMessage,
    ) -> Result<ChatMessageId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO chat_messages (role, persona, body, sent_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(message.role.as_str())
        .bind(message.persona.as_str())
        .bind(message.body)
        .bind(message.sent_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let id = u64::try_from(res.last_insert_rowid()).map_err(|_| ser("chat id sign overflow"))?;
        Ok(ChatMessageId::new(id))
    }

    async fn recent_messages(&self, limit: u32) -> Result<Vec<ChatMessage>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, role, persona, body, sent_at FROM (
                SELECT id, role, persona, body, sent_at
                FROM chat_messages
                ORDER BY id DESC
                LIMIT ?1
            )
            ORDER BY id ASC
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_chat_row).collect()
    }

    async fn clear_messages(&self) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM chat_messages")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(res.rows_affected())
    }
}
