use async_trait::async_trait;
use chrono::{DateTime, Utc};
use spark_core::model::{
    ChatMessage, ChatMessageId, Goal, GoalId, GoalPatch, NewChatMessage, Preferences, Profile,
    Task, TaskId, TaskPatch,
};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for spark tasks.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Persist a new task.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a task with the same id exists.
    async fn insert_task(&self, task: &Task) -> Result<(), StorageError>;

    /// Fetch a task by id; `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, StorageError>;

    /// Snapshot of every task, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_tasks(&self) -> Result<Vec<Task>, StorageError>;

    /// Apply a partial update and return the stored result.
    ///
    /// Concurrent updates to the same task are last-write-wins.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the task does not exist.
    async fn update_task(
        &self,
        id: TaskId,
        patch: TaskPatch,
        now: DateTime<Utc>,
    ) -> Result<Task, StorageError>;

    /// Remove a task.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the task does not exist.
    async fn delete_task(&self, id: TaskId) -> Result<(), StorageError>;
}

/// Repository contract for goals.
#[async_trait]
pub trait GoalRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a goal with the same id exists.
    async fn insert_goal(&self, goal: &Goal) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_goal(&self, id: GoalId) -> Result<Option<Goal>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_goals(&self) -> Result<Vec<Goal>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the goal does not exist.
    async fn update_goal(
        &self,
        id: GoalId,
        patch: GoalPatch,
        now: DateTime<Utc>,
    ) -> Result<Goal, StorageError>;

    /// Remove a goal. Task tags that reference it are left alone.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the goal does not exist.
    async fn delete_goal(&self, id: GoalId) -> Result<(), StorageError>;
}

/// Single-user profile and preference storage.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_profile(&self) -> Result<Option<Profile>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn save_profile(&self, profile: &Profile) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_preferences(&self) -> Result<Option<Preferences>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn save_preferences(&self, preferences: &Preferences) -> Result<(), StorageError>;
}

/// Chat transcript storage.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Append a message and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn insert_message(&self, message: NewChatMessage)
    -> Result<ChatMessageId, StorageError>;

    /// Most recent `limit` messages, returned oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn recent_messages(&self, limit: u32) -> Result<Vec<ChatMessage>, StorageError>;

    /// Delete the whole transcript, returning how many messages were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn clear_messages(&self) -> Result<u64, StorageError>;
}

fn invalid<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Transcript plus the last id handed out; ids are never reused after a clear.
#[derive(Default)]
struct ChatLog {
    messages: Vec<ChatMessage>,
    last_id: u64,
}

/// Simple in-memory repository implementation for testing and ephemeral sessions.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tasks: Arc<Mutex<Vec<Task>>>,
    goals: Arc<Mutex<Vec<Goal>>>,
    profile: Arc<Mutex<(Option<Profile>, Option<Preferences>)>>,
    chat: Arc<Mutex<ChatLog>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryRepository {
    async fn insert_task(&self, task: &Task) -> Result<(), StorageError> {
        let mut guard = self.tasks.lock().map_err(poisoned)?;
        if guard.iter().any(|t| t.id() == task.id()) {
            return Err(StorageError::Conflict);
        }
        guard.push(task.clone());
        Ok(())
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, StorageError> {
        let guard = self.tasks.lock().map_err(poisoned)?;
        Ok(guard.iter().find(|t| t.id() == id).cloned())
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, StorageError> {
        let guard = self.tasks.lock().map_err(poisoned)?;
        Ok(guard.clone())
    }

    async fn update_task(
        &self,
        id: TaskId,
        patch: TaskPatch,
        now: DateTime<Utc>,
    ) -> Result<Task, StorageError> {
        let mut guard = self.tasks.lock().map_err(poisoned)?;
        let task = guard
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or(StorageError::NotFound)?;
        task.apply_patch(patch, now).map_err(invalid)?;
        Ok(task.clone())
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), StorageError> {
        let mut guard = self.tasks.lock().map_err(poisoned)?;
        let before = guard.len();
        guard.retain(|t| t.id() != id);
        if guard.len() == before {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl GoalRepository for InMemoryRepository {
    async fn insert_goal(&self, goal: &Goal) -> Result<(), StorageError> {
        let mut guard = self.goals.lock().map_err(poisoned)?;
        if guard.iter().any(|g| g.id() == goal.id()) {
            return Err(StorageError::Conflict);
        }
        guard.push(goal.clone());
        Ok(())
    }

    async fn get_goal(&self, id: GoalId) -> Result<Option<Goal>, StorageError> {
        let guard = self.goals.lock().map_err(poisoned)?;
        Ok(guard.iter().find(|g| g.id() == id).cloned())
    }

    async fn list_goals(&self) -> Result<Vec<Goal>, StorageError> {
        let guard = self.goals.lock().map_err(poisoned)?;
        Ok(guard.clone())
    }

    async fn update_goal(
        &self,
        id: GoalId,
        patch: GoalPatch,
        now: DateTime<Utc>,
    ) -> Result<Goal, StorageError> {
        let mut guard = self.goals.lock().map_err(poisoned)?;
        let goal = guard
            .iter_mut()
            .find(|g| g.id() == id)
            .ok_or(StorageError::NotFound)?;
        goal.apply_patch(patch, now).map_err(invalid)?;
        Ok(goal.clone())
    }

    async fn delete_goal(&self, id: GoalId) -> Result<(), StorageError> {
        let mut guard = self.goals.lock().map_err(poisoned)?;
        let before = guard.len();
        guard.retain(|g| g.id() != id);
        if guard.len() == before {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn get_profile(&self) -> Result<Option<Profile>, StorageError> {
        let guard = self.profile.lock().map_err(poisoned)?;
        Ok(guard.0.clone())
    }

    async fn save_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        let mut guard = self.profile.lock().map_err(poisoned)?;
        guard.0 = Some(profile.clone());
        Ok(())
    }

    async fn get_preferences(&self) -> Result<Option<Preferences>, StorageError> {
        let guard = self.profile.lock().map_err(poisoned)?;
        Ok(guard.1.clone())
    }

    async fn save_preferences(&self, preferences: &Preferences) -> Result<(), StorageError> {
        let mut guard = self.profile.lock().map_err(poisoned)?;
        guard.1 = Some(preferences.clone());
        Ok(())
    }
}

#[async_trait]
impl ChatRepository for InMemoryRepository {
    async fn insert_message(
        &self,
        message: NewChatMessage,
    ) -> Result<ChatMessageId, StorageError> {
        let mut guard = self.chat.lock().map_err(poisoned)?;
        guard.last_id += 1;
        let id = ChatMessageId::new(guard.last_id);
        guard.messages.push(message.assign_id(id));
        Ok(id)
    }

    async fn recent_messages(&self, limit: u32) -> Result<Vec<ChatMessage>, StorageError> {
        let guard = self.chat.lock().map_err(poisoned)?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let skip = guard.messages.len().saturating_sub(limit);
        Ok(guard.messages[skip..].to_vec())
    }

    async fn clear_messages(&self) -> Result<u64, StorageError> {
        let mut guard = self.chat.lock().map_err(poisoned)?;
        let removed = guard.messages.len() as u64;
        guard.messages.clear();
        Ok(removed)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub tasks: Arc<dyn TaskRepository>,
    pub goals: Arc<dyn GoalRepository>,
    pub profile: Arc<dyn ProfileRepository>,
    pub chat: Arc<dyn ChatRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            tasks: Arc::new(repo.clone()),
            goals: Arc::new(repo.clone()),
            profile: Arc::new(repo.clone()),
            chat: Arc::new(repo),
        }
    }
}
