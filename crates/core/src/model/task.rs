use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{GoalId, TaskId};
use crate::model::status::TaskStatus;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TaskError {
    #[error("task title cannot be empty")]
    EmptyTitle,

    #[error("unknown priority: {0:?}")]
    UnknownPriority(String),

    #[error("invalid persisted task: {0}")]
    InvalidPersistedState(String),
}

//
// ─── PRIORITY ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(TaskError::UnknownPriority(s.to_string())),
        }
    }
}

/// Trim, drop empties and de-duplicate while keeping first-seen order.
#[must_use]
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for tag in tags {
        let trimmed = tag.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            out.push(trimmed.to_string());
        }
    }
    out
}

fn normalize_title(raw: &str) -> Result<String, TaskError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TaskError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// User input for a new spark task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub subject: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
}

impl TaskDraft {
    #[must_use]
    pub fn new(title: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subject: subject.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn due(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    #[must_use]
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Tag the task with a goal so it counts toward that goal's progress.
    #[must_use]
    pub fn for_goal(self, goal_id: GoalId) -> Self {
        self.tag(goal_id.as_tag())
    }

    /// Validate the draft and build a task with no status.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::EmptyTitle` if the title is blank.
    pub fn into_task(self, id: TaskId, now: DateTime<Utc>) -> Result<Task, TaskError> {
        Ok(Task {
            id,
            title: normalize_title(&self.title)?,
            subject: self.subject.trim().to_string(),
            status: None,
            due_date: self.due_date,
            original_date: None,
            priority: self.priority,
            tags: normalize_tags(&self.tags),
            notes: normalize_optional(self.notes),
            created_at: now,
            updated_at: now,
        })
    }
}

//
// ─── PATCH ─────────────────────────────────────────────────────────────────────
//

/// Partial update for a task.
///
/// `None` leaves a field untouched. Nullable fields use `Some(None)` to clear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub status: Option<Option<TaskStatus>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub original_date: Option<Option<NaiveDate>>,
    pub priority: Option<Option<Priority>>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<Option<String>>,
}

impl TaskPatch {
    /// Patch that sets exactly the status field.
    #[must_use]
    pub fn status(status: Option<TaskStatus>) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check the patch without applying it.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::EmptyTitle` if the patch sets a blank title.
    pub fn validate(&self) -> Result<(), TaskError> {
        if let Some(title) = self.title.as_deref() {
            normalize_title(title)?;
        }
        Ok(())
    }
}

//
// ─── TASK ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    title: String,
    subject: String,
    status: Option<TaskStatus>,
    due_date: Option<NaiveDate>,
    original_date: Option<NaiveDate>,
    priority: Option<Priority>,
    tags: Vec<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    /// Rehydrate a task from storage.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::InvalidPersistedState` if the stored title is blank
    /// or the timestamps are out of order.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: TaskId,
        title: String,
        subject: String,
        status: Option<TaskStatus>,
        due_date: Option<NaiveDate>,
        original_date: Option<NaiveDate>,
        priority: Option<Priority>,
        tags: Vec<String>,
        notes: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, TaskError> {
        if title.trim().is_empty() {
            return Err(TaskError::InvalidPersistedState("blank title".into()));
        }
        if updated_at < created_at {
            return Err(TaskError::InvalidPersistedState(
                "updated_at precedes created_at".into(),
            ));
        }
        Ok(Self {
            id,
            title,
            subject,
            status,
            due_date,
            original_date,
            priority,
            tags: normalize_tags(&tags),
            notes,
            created_at,
            updated_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn status(&self) -> Option<TaskStatus> {
        self.status
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == Some(TaskStatus::Complete)
    }

    #[must_use]
    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    #[must_use]
    pub fn original_date(&self) -> Option<NaiveDate> {
        self.original_date
    }

    #[must_use]
    pub fn priority(&self) -> Option<Priority> {
        self.priority
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Due strictly before `today` and not yet complete.
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_complete() && self.due_date.is_some_and(|due| due < today)
    }

    /// Patch that moves the due date, remembering the first due date it had.
    #[must_use]
    pub fn reschedule_patch(&self, new_due: Option<NaiveDate>) -> TaskPatch {
        let original_date = match (self.original_date, self.due_date) {
            (None, Some(previous)) if Some(previous) != new_due => Some(Some(previous)),
            _ => None,
        };
        TaskPatch {
            due_date: Some(new_due),
            original_date,
            ..TaskPatch::default()
        }
    }

    /// Apply a partial update. Validation happens before any field changes,
    /// so a rejected patch leaves the task untouched.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::EmptyTitle` if the patch sets a blank title.
    pub fn apply_patch(&mut self, patch: TaskPatch, now: DateTime<Utc>) -> Result<(), TaskError> {
        let title = patch.title.as_deref().map(normalize_title).transpose()?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(subject) = patch.subject {
            self.subject = subject.trim().to_string();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(original_date) = patch.original_date {
            self.original_date = original_date;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(tags) = patch.tags {
            self.tags = normalize_tags(&tags);
        }
        if let Some(notes) = patch.notes {
            self.notes = normalize_optional(notes);
        }
        if now > self.updated_at {
            self.updated_at = now;
        }
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn build(draft: TaskDraft) -> Task {
        draft.into_task(TaskId::generate(), fixed_now()).unwrap()
    }

    #[test]
    fn draft_rejects_blank_title() {
        let err = TaskDraft::new("   ", "math")
            .into_task(TaskId::generate(), fixed_now())
            .unwrap_err();
        assert_eq!(err, TaskError::EmptyTitle);
    }

    #[test]
    fn draft_normalizes_tags() {
        let task = build(
            TaskDraft::new("Read ch. 3", "history")
                .tag(" exam ")
                .tag("exam")
                .tag("")
                .tag("week-2"),
        );
        assert_eq!(task.tags(), ["exam", "week-2"]);
        assert_eq!(task.status(), None);
    }

    #[test]
    fn patch_leaves_unspecified_fields() {
        let mut task = build(
            TaskDraft::new("Flashcards", "spanish")
                .priority(Priority::High)
                .due(date(2024, 3, 1)),
        );
        task.apply_patch(TaskPatch::status(Some(TaskStatus::Partial)), fixed_now())
            .unwrap();

        assert_eq!(task.status(), Some(TaskStatus::Partial));
        assert_eq!(task.title(), "Flashcards");
        assert_eq!(task.priority(), Some(Priority::High));
        assert_eq!(task.due_date(), Some(date(2024, 3, 1)));
    }

    #[test]
    fn rejected_patch_changes_nothing() {
        let mut task = build(TaskDraft::new("Essay", "english"));
        let before = task.clone();
        let patch = TaskPatch {
            title: Some(" ".into()),
            status: Some(Some(TaskStatus::Complete)),
            ..TaskPatch::default()
        };
        assert!(task.apply_patch(patch, fixed_now()).is_err());
        assert_eq!(task, before);
    }

    #[test]
    fn patch_can_clear_nullable_fields() {
        let mut task = build(TaskDraft::new("Lab report", "chemistry").due(date(2024, 1, 10)));
        let patch = TaskPatch {
            due_date: Some(None),
            ..TaskPatch::default()
        };
        task.apply_patch(patch, fixed_now()).unwrap();
        assert_eq!(task.due_date(), None);
    }

    #[test]
    fn reschedule_keeps_first_original_date() {
        let mut task = build(TaskDraft::new("Quiz prep", "biology").due(date(2024, 5, 1)));

        let first = task.reschedule_patch(Some(date(2024, 5, 3)));
        task.apply_patch(first, fixed_now()).unwrap();
        assert_eq!(task.original_date(), Some(date(2024, 5, 1)));
        assert_eq!(task.due_date(), Some(date(2024, 5, 3)));

        let second = task.reschedule_patch(Some(date(2024, 5, 9)));
        task.apply_patch(second, fixed_now()).unwrap();
        assert_eq!(task.original_date(), Some(date(2024, 5, 1)));
        assert_eq!(task.due_date(), Some(date(2024, 5, 9)));
    }

    #[test]
    fn reschedule_without_prior_due_records_nothing() {
        let task = build(TaskDraft::new("Review", "math"));
        let patch = task.reschedule_patch(Some(date(2024, 2, 2)));
        assert_eq!(patch.original_date, None);
    }

    #[test]
    fn overdue_ignores_complete_tasks() {
        let mut task = build(TaskDraft::new("Worksheet", "math").due(date(2024, 1, 1)));
        assert!(task.is_overdue(date(2024, 1, 2)));
        assert!(!task.is_overdue(date(2024, 1, 1)));

        task.apply_patch(TaskPatch::status(Some(TaskStatus::Complete)), fixed_now())
            .unwrap();
        assert!(!task.is_overdue(date(2024, 1, 2)));
    }

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn for_goal_adds_goal_tag() {
        let goal = GoalId::generate();
        let task = build(TaskDraft::new("Chapter 4", "physics").for_goal(goal));
        assert!(task.has_tag(&goal.as_tag()));
    }
}
