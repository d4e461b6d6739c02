//! Shared error types for the services crate.

use thiserror::Error;

use spark_core::model::{ChatError, GoalError, GoalId, ProfileError, StatusError, TaskError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `TaskStore`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaskStoreError {
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `GoalStore`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GoalStoreError {
    #[error(transparent)]
    Goal(#[from] GoalError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressTracker`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("goal {0} does not exist")]
    UnknownGoal(GoalId),
    #[error(transparent)]
    Tasks(#[from] TaskStoreError),
    #[error(transparent)]
    Goals(#[from] GoalStoreError),
}

/// Errors emitted by `ProfileStore`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProfileStoreError {
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by a `CoachResponder`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoachError {
    #[error("coach is unavailable: {0}")]
    Unavailable(String),
    #[error("coach returned an empty reply")]
    EmptyReply,
}

/// Errors emitted by `ChatRoom`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChatRoomError {
    #[error(transparent)]
    Message(#[from] ChatError),
    #[error(transparent)]
    Coach(#[from] CoachError),
    #[error(transparent)]
    Tasks(#[from] TaskStoreError),
    #[error(transparent)]
    Profile(#[from] ProfileStoreError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
