//! Completion percentages for goals and task lists.
//!
//! Rounding is round-half-up on the exact ratio, done in integer arithmetic
//! so `1/2 -> 50`, `1/3 -> 33`, `2/3 -> 67` and `1/8 -> 13` never depend on
//! floating point representation.

use crate::model::{GoalId, Task};

/// Counts behind a completion percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressBreakdown {
    pub total: usize,
    pub completed: usize,
    pub percent: u8,
}

impl ProgressBreakdown {
    /// `completed` is clamped to `total`.
    #[must_use]
    pub fn from_counts(completed: usize, total: usize) -> Self {
        let completed = completed.min(total);
        Self {
            total,
            completed,
            percent: round_percent(completed, total),
        }
    }

    #[must_use]
    pub fn open(&self) -> usize {
        self.total.saturating_sub(self.completed)
    }
}

/// `round(100 * completed / total)` with halves rounded up; 0 when `total == 0`.
///
/// `completed` is clamped to `total`.
#[must_use]
pub fn round_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u128;
    let total = total as u128;
    let percent = (200 * completed + total) / (2 * total);
    u8::try_from(percent).unwrap_or(100)
}

/// True when the task carries the goal's id among its tags.
#[must_use]
pub fn is_associated(task: &Task, goal_id: GoalId) -> bool {
    let tag = goal_id.as_tag();
    task.has_tag(&tag)
}

/// Breakdown for any task list.
#[must_use]
pub fn breakdown<'a, I>(tasks: I) -> ProgressBreakdown
where
    I: IntoIterator<Item = &'a Task>,
{
    let (completed, total) = tasks.into_iter().fold((0, 0), |(done, all), task| {
        (done + usize::from(task.is_complete()), all + 1)
    });
    ProgressBreakdown::from_counts(completed, total)
}

/// Percent of the list marked complete; 0 for an empty list.
#[must_use]
pub fn percent_complete(tasks: &[Task]) -> u8 {
    breakdown(tasks).percent
}

/// Breakdown restricted to tasks associated with `goal_id`.
#[must_use]
pub fn goal_breakdown(goal_id: GoalId, tasks: &[Task]) -> ProgressBreakdown {
    let tag = goal_id.as_tag();
    breakdown(tasks.iter().filter(|task| task.has_tag(&tag)))
}

/// Percent of the goal's associated tasks marked complete.
#[must_use]
pub fn goal_progress(goal_id: GoalId, tasks: &[Task]) -> u8 {
    goal_breakdown(goal_id, tasks).percent
}
