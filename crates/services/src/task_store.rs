use std::sync::Arc;

use chrono::NaiveDate;
use spark_core::model::{
    GoalId, Task, TaskDraft, TaskId, TaskPatch, TaskStatus, parse_status, toggle_status,
};
use spark_core::progress::{self, ProgressBreakdown};
use storage::repository::{StorageError, TaskRepository};

use crate::Clock;
use crate::error::TaskStoreError;
use crate::events::{EventBus, StoreEvent};

/// Read-side filter for `TaskStore::list_filtered`. Empty matches everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Case-insensitive subject match.
    pub subject: Option<String>,
    /// `Some(None)` selects tasks with no status.
    pub status: Option<Option<TaskStatus>>,
    pub tag: Option<String>,
    pub goal: Option<GoalId>,
    /// Due on or before this date.
    pub due_by: Option<NaiveDate>,
    /// Only tasks due before today that are not complete.
    pub overdue: bool,
}

impl TaskFilter {
    #[must_use]
    pub fn for_goal(goal: GoalId) -> Self {
        Self {
            goal: Some(goal),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn overdue() -> Self {
        Self {
            overdue: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn matches(&self, task: &Task, today: NaiveDate) -> bool {
        if let Some(subject) = &self.subject {
            if task.subject().to_lowercase() != subject.trim().to_lowercase() {
                return false;
            }
        }
        if let Some(status) = self.status {
            if task.status() != status {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !task.has_tag(tag) {
                return false;
            }
        }
        if let Some(goal) = self.goal {
            if !progress::is_associated(task, goal) {
                return false;
            }
        }
        if let Some(due_by) = self.due_by {
            if !task.due_date().is_some_and(|due| due <= due_by) {
                return false;
            }
        }
        if self.overdue && !task.is_overdue(today) {
            return false;
        }
        true
    }
}

/// Owns the task collection: create, partial update, delete, and reads.
#[derive(Clone)]
pub struct TaskStore {
    clock: Clock,
    tasks: Arc<dyn TaskRepository>,
    events: EventBus,
}

impl TaskStore {
    #[must_use]
    pub fn new(clock: Clock, tasks: Arc<dyn TaskRepository>, events: EventBus) -> Self {
        Self {
            clock,
            tasks,
            events,
        }
    }

    /// Validate and persist a new task with no status.
    ///
    /// # Errors
    ///
    /// Returns `TaskStoreError::Task` for validation failures.
    /// Returns `TaskStoreError::Storage` if persistence fails.
    pub async fn create(&self, draft: TaskDraft) -> Result<TaskId, TaskStoreError> {
        let task = draft.into_task(TaskId::generate(), self.clock.now())?;
        self.tasks.insert_task(&task).await?;
        tracing::debug!(task_id = %task.id(), title = task.title(), "task created");
        self.events.publish(StoreEvent::TaskCreated(task.id()));
        Ok(task.id())
    }

    /// Fetch a task by id; `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `TaskStoreError::Storage` if repository access fails.
    pub async fn get(&self, id: TaskId) -> Result<Option<Task>, TaskStoreError> {
        Ok(self.tasks.get_task(id).await?)
    }

    /// Snapshot of the whole collection.
    ///
    /// # Errors
    ///
    /// Returns `TaskStoreError::Storage` if repository access fails.
    pub async fn list(&self) -> Result<Vec<Task>, TaskStoreError> {
        Ok(self.tasks.list_tasks().await?)
    }

    /// Tasks matching `filter`, ordered by due date (undated last) then title.
    ///
    /// # Errors
    ///
    /// Returns `TaskStoreError::Storage` if repository access fails.
    pub async fn list_filtered(&self, filter: &TaskFilter) -> Result<Vec<Task>, TaskStoreError> {
        let today = self.clock.today();
        let mut tasks: Vec<Task> = self
            .tasks
            .list_tasks()
            .await?
            .into_iter()
            .filter(|task| filter.matches(task, today))
            .collect();
        tasks.sort_by(|a, b| {
            let due = match (a.due_date(), b.due_date()) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            };
            due.then_with(|| a.title().cmp(b.title()))
        });
        Ok(tasks)
    }

    /// Apply a partial update. Unspecified fields stay unchanged.
    ///
    /// # Errors
    ///
    /// Returns `TaskStoreError::Task` if the patch is invalid (checked before
    /// the store is touched), or `TaskStoreError::Storage` with
    /// `StorageError::NotFound` for an unknown id.
    pub async fn update(&self, id: TaskId, patch: TaskPatch) -> Result<Task, TaskStoreError> {
        patch.validate()?;
        let task = self
            .tasks
            .update_task(id, patch, self.clock.now())
            .await
            .inspect_err(|error| tracing::warn!(task_id = %id, %error, "task update failed"))?;
        self.events.publish(StoreEvent::TaskUpdated(id));
        Ok(task)
    }

    /// # Errors
    ///
    /// Returns `TaskStoreError::Storage` (`NotFound` for an unknown id).
    pub async fn delete(&self, id: TaskId) -> Result<(), TaskStoreError> {
        self.tasks.delete_task(id).await?;
        tracing::debug!(task_id = %id, "task deleted");
        self.events.publish(StoreEvent::TaskDeleted(id));
        Ok(())
    }

    /// Flip the task between `complete` and unset, returning the new status.
    ///
    /// # Errors
    ///
    /// Returns `TaskStoreError::Storage` (`NotFound` for an unknown id).
    pub async fn toggle_status(&self, id: TaskId) -> Result<Option<TaskStatus>, TaskStoreError> {
        let task = self.tasks.get_task(id).await?.ok_or(StorageError::NotFound)?;
        let next = toggle_status(task.status());
        let updated = self.update(id, TaskPatch::status(next)).await?;
        Ok(updated.status())
    }

    /// Set exactly the status field.
    ///
    /// # Errors
    ///
    /// Returns `TaskStoreError::Storage` (`NotFound` for an unknown id).
    pub async fn set_status(
        &self,
        id: TaskId,
        status: Option<TaskStatus>,
    ) -> Result<Task, TaskStoreError> {
        self.update(id, TaskPatch::status(status)).await
    }

    /// Parse `raw` against the four-value status domain, then set it.
    ///
    /// # Errors
    ///
    /// Returns `TaskStoreError::Status` for unknown values without touching
    /// the store.
    pub async fn set_status_str(&self, id: TaskId, raw: &str) -> Result<Task, TaskStoreError> {
        let status = parse_status(raw)?;
        self.set_status(id, status).await
    }

    /// Move the due date; the first move records the old date as `original_date`.
    ///
    /// # Errors
    ///
    /// Returns `TaskStoreError::Storage` (`NotFound` for an unknown id).
    pub async fn reschedule(
        &self,
        id: TaskId,
        new_due: Option<NaiveDate>,
    ) -> Result<Task, TaskStoreError> {
        let task = self.tasks.get_task(id).await?.ok_or(StorageError::NotFound)?;
        self.update(id, task.reschedule_patch(new_due)).await
    }

    /// Completion across every task.
    ///
    /// # Errors
    ///
    /// Returns `TaskStoreError::Storage` if repository access fails.
    pub async fn overall_progress(&self) -> Result<ProgressBreakdown, TaskStoreError> {
        let tasks = self.tasks.list_tasks().await?;
        Ok(progress::breakdown(&tasks))
    }
}
