use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::GoalId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GoalError {
    #[error("goal title cannot be empty")]
    EmptyTitle,

    #[error("chapter range must start at 1 or later")]
    InvalidChapterStart,

    #[error("chapter range start {start} is after end {end}")]
    InvalidChapterRange { start: u32, end: u32 },

    #[error("progress must be between 0 and 100, got {0}")]
    InvalidProgress(u8),

    #[error("invalid persisted goal: {0}")]
    InvalidPersistedState(String),
}

//
// ─── CHAPTER RANGE ─────────────────────────────────────────────────────────────
//

/// Inclusive chapter span of a book-backed goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRange {
    start: u32,
    end: u32,
}

impl ChapterRange {
    /// # Errors
    ///
    /// Returns `GoalError` if `start` is zero or greater than `end`.
    pub fn new(start: u32, end: u32) -> Result<Self, GoalError> {
        if start == 0 {
            return Err(GoalError::InvalidChapterStart);
        }
        if start > end {
            return Err(GoalError::InvalidChapterRange { start, end });
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub fn start(&self) -> u32 {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> u32 {
        self.end
    }

    #[must_use]
    pub fn chapter_count(&self) -> u32 {
        self.end - self.start + 1
    }
}

fn normalize_title(raw: &str) -> Result<String, GoalError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(GoalError::EmptyTitle);
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

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalDraft {
    pub title: String,
    pub description: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub subject: Option<String>,
    pub book_id: Option<String>,
    pub chapters: Option<ChapterRange>,
}

impl GoalDraft {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Validate and build a goal with zero progress.
    ///
    /// # Errors
    ///
    /// Returns `GoalError::EmptyTitle` if the title is blank.
    pub fn into_goal(self, id: GoalId, now: DateTime<Utc>) -> Result<Goal, GoalError> {
        Ok(Goal {
            id,
            title: normalize_title(&self.title)?,
            description: normalize_optional(self.description),
            target_date: self.target_date,
            created_at: now,
            updated_at: now,
            progress: 0,
            subject: normalize_optional(self.subject),
            book_id: normalize_optional(self.book_id),
            chapters: self.chapters,
        })
    }
}

//
// ─── PATCH ─────────────────────────────────────────────────────────────────────
//

/// Partial update for a goal; same conventions as `TaskPatch`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub target_date: Option<Option<NaiveDate>>,
    pub progress: Option<u8>,
    pub subject: Option<Option<String>>,
    pub book_id: Option<Option<String>>,
    pub chapters: Option<Option<ChapterRange>>,
}

impl GoalPatch {
    /// Patch that only writes the cached progress.
    #[must_use]
    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
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
    /// Returns `GoalError` for a blank title or progress above 100.
    pub fn validate(&self) -> Result<(), GoalError> {
        if let Some(title) = self.title.as_deref() {
            normalize_title(title)?;
        }
        match self.progress {
            Some(progress) if progress > 100 => Err(GoalError::InvalidProgress(progress)),
            _ => Ok(()),
        }
    }
}

//
// ─── GOAL ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    id: GoalId,
    title: String,
    description: Option<String>,
    target_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    progress: u8,
    subject: Option<String>,
    book_id: Option<String>,
    chapters: Option<ChapterRange>,
}

impl Goal {
    /// Rehydrate a goal from storage.
    ///
    /// # Errors
    ///
    /// Returns `GoalError` if the stored title is blank or progress exceeds 100.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: GoalId,
        title: String,
        description: Option<String>,
        target_date: Option<NaiveDate>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        progress: u8,
        subject: Option<String>,
        book_id: Option<String>,
        chapters: Option<ChapterRange>,
    ) -> Result<Self, GoalError> {
        if title.trim().is_empty() {
            return Err(GoalError::InvalidPersistedState("blank title".into()));
        }
        if progress > 100 {
            return Err(GoalError::InvalidProgress(progress));
        }
        Ok(Self {
            id,
            title,
            description,
            target_date,
            created_at,
            updated_at,
            progress,
            subject,
            book_id,
            chapters,
        })
    }

    #[must_use]
    pub fn id(&self) -> GoalId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn target_date(&self) -> Option<NaiveDate> {
        self.target_date
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Cached completion percentage, last written by a progress refresh.
    #[must_use]
    pub fn progress(&self) -> u8 {
        self.progress
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    #[must_use]
    pub fn book_id(&self) -> Option<&str> {
        self.book_id.as_deref()
    }

    #[must_use]
    pub fn chapters(&self) -> Option<ChapterRange> {
        self.chapters
    }

    /// Apply a partial update; validation runs before any field changes.
    ///
    /// # Errors
    ///
    /// Returns `GoalError` for a blank title or progress above 100.
    pub fn apply_patch(&mut self, patch: GoalPatch, now: DateTime<Utc>) -> Result<(), GoalError> {
        patch.validate()?;

        if let Some(title) = patch.title.as_deref() {
            self.title = normalize_title(title)?;
        }
        if let Some(description) = patch.description {
            self.description = normalize_optional(description);
        }
        if let Some(target_date) = patch.target_date {
            self.target_date = target_date;
        }
        if let Some(progress) = patch.progress {
            self.progress = progress;
        }
        if let Some(subject) = patch.subject {
            self.subject = normalize_optional(subject);
        }
        if let Some(book_id) = patch.book_id {
            self.book_id = normalize_optional(book_id);
        }
        if let Some(chapters) = patch.chapters {
            self.chapters = chapters;
        }
        if now > self.updated_at {
            self.updated_at = now;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn chapter_range_rejects_reversed_bounds() {
        assert_eq!(
            ChapterRange::new(5, 2).unwrap_err(),
            GoalError::InvalidChapterRange { start: 5, end: 2 }
        );
        assert_eq!(
            ChapterRange::new(0, 2).unwrap_err(),
            GoalError::InvalidChapterStart
        );
        assert_eq!(ChapterRange::new(3, 3).unwrap().chapter_count(), 1);
    }

    #[test]
    fn new_goal_starts_at_zero_progress() {
        let goal = GoalDraft::new("  Finish algebra  ")
            .into_goal(GoalId::generate(), fixed_now())
            .unwrap();
        assert_eq!(goal.title(), "Finish algebra");
        assert_eq!(goal.progress(), 0);
        assert_eq!(goal.created_at(), goal.updated_at());
    }

    #[test]
    fn blank_title_is_rejected() {
        let err = GoalDraft::new("")
            .into_goal(GoalId::generate(), fixed_now())
            .unwrap_err();
        assert_eq!(err, GoalError::EmptyTitle);
    }

    #[test]
    fn progress_patch_only_touches_progress() {
        let mut goal = GoalDraft {
            title: "Read Dune".into(),
            book_id: Some("dune".into()),
            chapters: Some(ChapterRange::new(1, 12).unwrap()),
            ..GoalDraft::default()
        }
        .into_goal(GoalId::generate(), fixed_now())
        .unwrap();

        let later = fixed_now() + chrono::Duration::minutes(5);
        goal.apply_patch(GoalPatch::progress(40), later).unwrap();

        assert_eq!(goal.progress(), 40);
        assert_eq!(goal.book_id(), Some("dune"));
        assert_eq!(goal.chapters().unwrap().end(), 12);
        assert_eq!(goal.updated_at(), later);
    }

    #[test]
    fn out_of_range_progress_is_rejected() {
        let mut goal = GoalDraft::new("Goal")
            .into_goal(GoalId::generate(), fixed_now())
            .unwrap();
        let err = goal.apply_patch(GoalPatch::progress(101), fixed_now()).unwrap_err();
        assert_eq!(err, GoalError::InvalidProgress(101));
        assert_eq!(goal.progress(), 0);
    }
}
