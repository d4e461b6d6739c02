use chrono::{DateTime, NaiveDate, Utc};
use spark_core::model::{
    ChapterRange, ChatMessage, ChatMessageId, ChatRole, CoachPersona, Goal, GoalId, Priority, Task,
    TaskId, TaskStatus, parse_status,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn task_id_from_str(raw: &str) -> Result<TaskId, StorageError> {
    raw.parse().map_err(ser)
}

pub(crate) fn goal_id_from_str(raw: &str) -> Result<GoalId, StorageError> {
    raw.parse().map_err(ser)
}

pub(crate) fn status_to_str(status: Option<TaskStatus>) -> Option<&'static str> {
    status.map(TaskStatus::as_str)
}

/// NULL is the unset status; anything outside the three literals is corrupt.
pub(crate) fn status_from_str(raw: Option<&str>) -> Result<Option<TaskStatus>, StorageError> {
    match raw {
        None => Ok(None),
        Some(s) => match parse_status(s).map_err(ser)? {
            Some(status) => Ok(Some(status)),
            None => Err(StorageError::Serialization(format!("invalid status: {s:?}"))),
        },
    }
}

pub(crate) fn priority_from_str(raw: Option<&str>) -> Result<Option<Priority>, StorageError> {
    raw.map(str::parse::<Priority>).transpose().map_err(ser)
}

pub(crate) fn tags_to_json(tags: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(tags).map_err(ser)
}

pub(crate) fn tags_from_json(raw: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn map_task_row(row: &SqliteRow) -> Result<Task, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let status: Option<String> = row.try_get("status").map_err(ser)?;
    let priority: Option<String> = row.try_get("priority").map_err(ser)?;
    let tags: String = row.try_get("tags").map_err(ser)?;
    let due_date: Option<NaiveDate> = row.try_get("due_date").map_err(ser)?;
    let original_date: Option<NaiveDate> = row.try_get("original_date").map_err(ser)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(ser)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(ser)?;

    Task::from_persisted(
        task_id_from_str(&id)?,
        row.try_get("title").map_err(ser)?,
        row.try_get("subject").map_err(ser)?,
        status_from_str(status.as_deref())?,
        due_date,
        original_date,
        priority_from_str(priority.as_deref())?,
        tags_from_json(&tags)?,
        row.try_get("notes").map_err(ser)?,
        created_at,
        updated_at,
    )
    .map_err(ser)
}

fn chapters_from_columns(
    start: Option<i64>,
    end: Option<i64>,
) -> Result<Option<ChapterRange>, StorageError> {
    match (start, end) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => {
            let start = u32::try_from(start).map_err(|_| ser("chapter_start overflow"))?;
            let end = u32::try_from(end).map_err(|_| ser("chapter_end overflow"))?;
            ChapterRange::new(start, end).map(Some).map_err(ser)
        }
        _ => Err(ser("chapter range is half set")),
    }
}

pub(crate) fn map_goal_row(row: &SqliteRow) -> Result<Goal, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let progress_i64: i64 = row.try_get("progress").map_err(ser)?;
    let progress = u8::try_from(progress_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid progress: {progress_i64}")))?;
    let target_date: Option<NaiveDate> = row.try_get("target_date").map_err(ser)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(ser)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(ser)?;

    Goal::from_persisted(
        goal_id_from_str(&id)?,
        row.try_get("title").map_err(ser)?,
        row.try_get("description").map_err(ser)?,
        target_date,
        created_at,
        updated_at,
        progress,
        row.try_get("subject").map_err(ser)?,
        row.try_get("book_id").map_err(ser)?,
        chapters_from_columns(
            row.try_get("chapter_start").map_err(ser)?,
            row.try_get("chapter_end").map_err(ser)?,
        )?,
    )
    .map_err(ser)
}

pub(crate) fn map_chat_row(row: &SqliteRow) -> Result<ChatMessage, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let role: String = row.try_get("role").map_err(ser)?;
    let persona: String = row.try_get("persona").map_err(ser)?;
    Ok(ChatMessage {
        id: ChatMessageId::new(
            u64::try_from(id).map_err(|_| ser("chat message id sign overflow"))?,
        ),
        role: role.parse::<ChatRole>().map_err(ser)?,
        persona: persona.parse::<CoachPersona>().map_err(ser)?,
        body: row.try_get("body").map_err(ser)?,
        sent_at: row.try_get("sent_at").map_err(ser)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_status_is_unset() {
        assert_eq!(status_from_str(None).unwrap(), None);
        assert_eq!(
            status_from_str(Some("partial")).unwrap(),
            Some(TaskStatus::Partial)
        );
    }

    #[test]
    fn unset_spellings_are_not_valid_column_values() {
        assert!(status_from_str(Some("none")).is_err());
        assert!(status_from_str(Some("done")).is_err());
    }

    #[test]
    fn half_set_chapters_are_rejected() {
        assert!(chapters_from_columns(Some(1), None).is_err());
        assert_eq!(
            chapters_from_columns(Some(2), Some(4)).unwrap(),
            Some(ChapterRange::new(2, 4).unwrap())
        );
    }

    #[test]
    fn tags_round_trip_through_json() {
        let tags = vec!["a".to_string(), "b c".to_string()];
        let json = tags_to_json(&tags).unwrap();
        assert_eq!(json, r#"["a","b c"]"#);
        assert_eq!(tags_from_json(&json).unwrap(), tags);
    }
}
