use std::sync::Arc;

use spark_core::model::{Goal, GoalDraft, GoalId, GoalPatch};
use storage::repository::GoalRepository;

use crate::Clock;
use crate::error::GoalStoreError;
use crate::events::{EventBus, StoreEvent};

/// Owns the goal collection.
///
/// Deleting a goal leaves tagged tasks untouched; their tag simply stops
/// resolving to a goal.
#[derive(Clone)]
pub struct GoalStore {
    clock: Clock,
    goals: Arc<dyn GoalRepository>,
    events: EventBus,
}

impl GoalStore {
    #[must_use]
    pub fn new(clock: Clock, goals: Arc<dyn GoalRepository>, events: EventBus) -> Self {
        Self {
            clock,
            goals,
            events,
        }
    }

    /// Validate and persist a new goal with progress 0.
    ///
    /// # Errors
    ///
    /// Returns `GoalStoreError::Goal` for validation failures.
    /// Returns `GoalStoreError::Storage` if persistence fails.
    pub async fn create(&self, draft: GoalDraft) -> Result<GoalId, GoalStoreError> {
        let goal = draft.into_goal(GoalId::generate(), self.clock.now())?;
        self.goals.insert_goal(&goal).await?;
        tracing::debug!(goal_id = %goal.id(), title = goal.title(), "goal created");
        self.events.publish(StoreEvent::GoalCreated(goal.id()));
        Ok(goal.id())
    }

    /// # Errors
    ///
    /// Returns `GoalStoreError::Storage` if repository access fails.
    pub async fn get(&self, id: GoalId) -> Result<Option<Goal>, GoalStoreError> {
        Ok(self.goals.get_goal(id).await?)
    }

    /// # Errors
    ///
    /// Returns `GoalStoreError::Storage` if repository access fails.
    pub async fn list(&self) -> Result<Vec<Goal>, GoalStoreError> {
        Ok(self.goals.list_goals().await?)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `GoalStoreError::Goal` for an invalid patch (nothing is
    /// written), or `GoalStoreError::Storage` with `NotFound` for an unknown id.
    pub async fn update(&self, id: GoalId, patch: GoalPatch) -> Result<Goal, GoalStoreError> {
        patch.validate()?;
        let goal = self
            .goals
            .update_goal(id, patch, self.clock.now())
            .await
            .inspect_err(|error| tracing::warn!(goal_id = %id, %error, "goal update failed"))?;
        self.events.publish(StoreEvent::GoalUpdated(id));
        Ok(goal)
    }

    /// # Errors
    ///
    /// Returns `GoalStoreError::Storage` (`NotFound` for an unknown id).
    pub async fn delete(&self, id: GoalId) -> Result<(), GoalStoreError> {
        self.goals.delete_goal(id).await?;
        tracing::debug!(goal_id = %id, "goal deleted");
        self.events.publish(StoreEvent::GoalDeleted(id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use spark_core::model::{ChapterRange, GoalError};
    use spark_core::time::fixed_clock;
    use storage::repository::{InMemoryRepository, StorageError};

    fn store() -> GoalStore {
        GoalStore::new(
            fixed_clock(),
            Arc::new(InMemoryRepository::new()),
            EventBus::default(),
        )
    }

    #[tokio::test]
    async fn create_starts_at_zero_progress() {
        let store = store();
        let id = store
            .create(GoalDraft {
                title: "Finish algebra".into(),
                chapters: Some(ChapterRange::new(1, 4).unwrap()),
                ..GoalDraft::default()
            })
            .await
            .unwrap();

        let goal = store.get(id).await.unwrap().unwrap();
        assert_eq!(goal.progress(), 0);
        assert_eq!(goal.chapters().map(|c| c.chapter_count()), Some(4));
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let store = store();
        let err = store.create(GoalDraft::new("   ")).await.unwrap_err();
        assert!(matches!(err, GoalStoreError::Goal(GoalError::EmptyTitle)));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn out_of_range_progress_is_rejected_before_write() {
        let store = store();
        let id = store.create(GoalDraft::new("Essay")).await.unwrap();
        let mut rx = store.events.subscribe();

        let err = store.update(id, GoalPatch::progress(101)).await.unwrap_err();
        assert!(matches!(
            err,
            GoalStoreError::Goal(GoalError::InvalidProgress(101))
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn delete_unknown_goal_is_not_found() {
        let store = store();
        let err = store.delete(GoalId::generate()).await.unwrap_err();
        assert!(matches!(
            err,
            GoalStoreError::Storage(StorageError::NotFound)
        ));
    }
}
