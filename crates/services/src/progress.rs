use spark_core::model::{Goal, GoalId, GoalPatch, Task};
use spark_core::progress::{self, ProgressBreakdown};

use crate::error::ProgressError;
use crate::goal_store::GoalStore;
use crate::task_store::TaskStore;

/// Outcome of recomputing one goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressRefresh {
    pub goal_id: GoalId,
    pub previous: u8,
    pub current: u8,
    pub breakdown: ProgressBreakdown,
    /// False when the stored value already matched and no write was issued.
    pub written: bool,
}

/// A goal paired with counts computed from the current task list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalOverview {
    pub goal: Goal,
    pub breakdown: ProgressBreakdown,
}

impl GoalOverview {
    /// True when the stored progress lags the computed value.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.goal.progress() != self.breakdown.percent
    }
}

/// Recomputes goal progress from task statuses and persists changes.
///
/// Recomputation only happens when a caller asks for it.
#[derive(Clone)]
pub struct ProgressTracker {
    tasks: TaskStore,
    goals: GoalStore,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(tasks: TaskStore, goals: GoalStore) -> Self {
        Self { tasks, goals }
    }

    /// Recompute one goal and write the value if it changed.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownGoal` if the goal does not exist.
    /// Returns `ProgressError::Goals` if persisting fails; the stored progress
    /// is left as it was.
    pub async fn refresh_goal(&self, goal_id: GoalId) -> Result<ProgressRefresh, ProgressError> {
        let goal = self
            .goals
            .get(goal_id)
            .await?
            .ok_or(ProgressError::UnknownGoal(goal_id))?;
        let tasks = self.tasks.list().await?;
        self.refresh_loaded(&goal, &tasks).await
    }

    /// Recompute every goal against one task snapshot.
    ///
    /// Returns one entry per goal, in goal list order. Stops at the first
    /// failed write.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if loading or persisting fails.
    pub async fn refresh_all(&self) -> Result<Vec<ProgressRefresh>, ProgressError> {
        let goals = self.goals.list().await?;
        let tasks = self.tasks.list().await?;
        let mut refreshed = Vec::with_capacity(goals.len());
        for goal in &goals {
            refreshed.push(self.refresh_loaded(goal, &tasks).await?);
        }
        let writes = refreshed.iter().filter(|r| r.written).count();
        tracing::debug!(goals = goals.len(), writes, "refreshed goal progress");
        Ok(refreshed)
    }

    /// Every goal with freshly computed counts. Never writes.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if loading fails.
    pub async fn goal_overview(&self) -> Result<Vec<GoalOverview>, ProgressError> {
        let goals = self.goals.list().await?;
        let tasks = self.tasks.list().await?;
        Ok(goals
            .into_iter()
            .map(|goal| {
                let breakdown = progress::goal_breakdown(goal.id(), &tasks);
                GoalOverview { goal, breakdown }
            })
            .collect())
    }

    async fn refresh_loaded(
        &self,
        goal: &Goal,
        tasks: &[Task],
    ) -> Result<ProgressRefresh, ProgressError> {
        let breakdown = progress::goal_breakdown(goal.id(), tasks);
        let previous = goal.progress();
        let current = breakdown.percent;
        let written = previous != current;

        if written {
            self.goals
                .update(goal.id(), GoalPatch::progress(current))
                .await
                .inspect_err(|error| {
                    tracing::warn!(goal_id = %goal.id(), %error, "failed to persist goal progress");
                })?;
            tracing::debug!(goal_id = %goal.id(), previous, current, "goal progress updated");
        }

        Ok(ProgressRefresh {
            goal_id: goal.id(),
            previous,
            current,
            breakdown,
            written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use spark_core::model::{GoalDraft, TaskDraft, TaskStatus};
    use spark_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    use crate::events::{EventBus, StoreEvent};

    fn tracker() -> (ProgressTracker, EventBus) {
        let repo = InMemoryRepository::new();
        let events = EventBus::default();
        let tasks = TaskStore::new(fixed_clock(), Arc::new(repo.clone()), events.clone());
        let goals = GoalStore::new(fixed_clock(), Arc::new(repo), events.clone());
        (ProgressTracker::new(tasks, goals), events)
    }

    #[tokio::test]
    async fn refresh_writes_once_then_is_idempotent() {
        let (tracker, events) = tracker();
        let goal = tracker.goals.create(GoalDraft::new("Quiz")).await.unwrap();
        let a = tracker
            .tasks
            .create(TaskDraft::new("a", "math").for_goal(goal))
            .await
            .unwrap();
        tracker
            .tasks
            .create(TaskDraft::new("b", "math").for_goal(goal))
            .await
            .unwrap();
        tracker
            .tasks
            .set_status(a, Some(TaskStatus::Complete))
            .await
            .unwrap();

        let mut rx = events.subscribe();
        let first = tracker.refresh_goal(goal).await.unwrap();
        assert!(first.written);
        assert_eq!((first.previous, first.current), (0, 50));
        assert_eq!(rx.try_recv().unwrap(), StoreEvent::GoalUpdated(goal));

        let second = tracker.refresh_goal(goal).await.unwrap();
        assert!(!second.written);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn goal_without_tasks_stays_at_zero_without_write() {
        let (tracker, _) = tracker();
        let goal = tracker.goals.create(GoalDraft::new("Empty")).await.unwrap();

        let refresh = tracker.refresh_goal(goal).await.unwrap();
        assert_eq!(refresh.current, 0);
        assert!(!refresh.written);
    }

    #[tokio::test]
    async fn tasks_count_only_toward_their_goal() {
        let (tracker, _) = tracker();
        let g1 = tracker.goals.create(GoalDraft::new("g1")).await.unwrap();
        let g2 = tracker.goals.create(GoalDraft::new("g2")).await.unwrap();
        let t = tracker
            .tasks
            .create(TaskDraft::new("t", "bio").for_goal(g1))
            .await
            .unwrap();
        tracker.tasks.toggle_status(t).await.unwrap();

        let all = tracker.refresh_all().await.unwrap();
        assert_eq!(all.len(), 2);
        let by_goal = |id| all.iter().find(|r| r.goal_id == id).unwrap().current;
        assert_eq!(by_goal(g1), 100);
        assert_eq!(by_goal(g2), 0);
    }

    #[tokio::test]
    async fn overview_reports_stale_goals_without_writing() {
        let (tracker, _) = tracker();
        let goal = tracker.goals.create(GoalDraft::new("Read")).await.unwrap();
        let t = tracker
            .tasks
            .create(TaskDraft::new("ch1", "english").for_goal(goal))
            .await
            .unwrap();
        tracker.tasks.toggle_status(t).await.unwrap();

        let overview = tracker.goal_overview().await.unwrap();
        assert_eq!(overview.len(), 1);
        assert!(overview[0].is_stale());
        assert_eq!(overview[0].breakdown.percent, 100);
        assert_eq!(tracker.goals.get(goal).await.unwrap().unwrap().progress(), 0);
    }

    #[tokio::test]
    async fn unknown_goal_is_reported() {
        let (tracker, _) = tracker();
        let missing = GoalId::generate();
        let err = tracker.refresh_goal(missing).await.unwrap_err();
        assert!(matches!(err, ProgressError::UnknownGoal(id) if id == missing));
    }
}
