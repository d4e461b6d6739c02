use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use spark_core::model::{Goal, GoalDraft, GoalId, GoalPatch, TaskDraft};
use spark_core::time::fixed_clock;
use services::{EventBus, GoalStore, GoalStoreError, ProgressError, ProgressTracker, TaskStore};
use storage::repository::{GoalRepository, InMemoryRepository, StorageError};

/// Goal repository whose writes can be switched off.
struct FlakyGoals {
    inner: InMemoryRepository,
    fail_updates: AtomicBool,
}

#[async_trait]
impl GoalRepository for FlakyGoals {
    async fn insert_goal(&self, goal: &Goal) -> Result<(), StorageError> {
        self.inner.insert_goal(goal).await
    }

    async fn get_goal(&self, id: GoalId) -> Result<Option<Goal>, StorageError> {
        self.inner.get_goal(id).await
    }

    async fn list_goals(&self) -> Result<Vec<Goal>, StorageError> {
        self.inner.list_goals().await
    }

    async fn update_goal(
        &self,
        id: GoalId,
        patch: GoalPatch,
        now: DateTime<Utc>,
    ) -> Result<Goal, StorageError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("disk unplugged".into()));
        }
        self.inner.update_goal(id, patch, now).await
    }

    async fn delete_goal(&self, id: GoalId) -> Result<(), StorageError> {
        self.inner.delete_goal(id).await
    }
}

#[tokio::test]
async fn failed_progress_write_keeps_previous_value() {
    let repo = InMemoryRepository::new();
    let goals_repo = Arc::new(FlakyGoals {
        inner: repo.clone(),
        fail_updates: AtomicBool::new(false),
    });
    let events = EventBus::default();
    let tasks = TaskStore::new(fixed_clock(), Arc::new(repo), events.clone());
    let goals = GoalStore::new(fixed_clock(), goals_repo.clone(), events.clone());
    let tracker = ProgressTracker::new(tasks.clone(), goals.clone());

    let goal = goals.create(GoalDraft::new("Lab report")).await.unwrap();
    let a = tasks
        .create(TaskDraft::new("Draft", "Chem").for_goal(goal))
        .await
        .unwrap();
    let b = tasks
        .create(TaskDraft::new("Edit", "Chem").for_goal(goal))
        .await
        .unwrap();

    tasks.toggle_status(a).await.unwrap();
    assert_eq!(tracker.refresh_goal(goal).await.unwrap().current, 50);

    goals_repo.fail_updates.store(true, Ordering::SeqCst);
    tasks.toggle_status(b).await.unwrap();
    let mut rx = events.subscribe();

    let err = tracker.refresh_goal(goal).await.unwrap_err();
    assert!(matches!(
        err,
        ProgressError::Goals(GoalStoreError::Storage(StorageError::Connection(_)))
    ));
    assert_eq!(goals.get(goal).await.unwrap().unwrap().progress(), 50);
    assert!(rx.try_recv().is_err());

    goals_repo.fail_updates.store(false, Ordering::SeqCst);
    let refresh = tracker.refresh_goal(goal).await.unwrap();
    assert_eq!((refresh.previous, refresh.current), (50, 100));
}
