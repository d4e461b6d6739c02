use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StatusError {
    #[error("unknown task status: {0:?}")]
    Unknown(String),
}

//
// ─── STATUS ───────────────────────────────────────────────────────────────────
//

/// Outcome recorded against a spark task.
///
/// The "unset" state is modelled as `Option::<TaskStatus>::None` so that the
/// persisted form is one of the three literal strings or null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Complete,
    Partial,
    Incorrect,
}

impl TaskStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Complete => "complete",
            TaskStatus::Partial => "partial",
            TaskStatus::Incorrect => "incorrect",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// "Mark done" gesture.
///
/// `complete` flips back to unset; anything else, including `partial` and
/// `incorrect`, becomes `complete`. This is not a four-state cycle.
#[must_use]
pub fn toggle_status(current: Option<TaskStatus>) -> Option<TaskStatus> {
    match current {
        Some(TaskStatus::Complete) => None,
        Some(TaskStatus::Partial | TaskStatus::Incorrect) | None => Some(TaskStatus::Complete),
    }
}

/// Parse a status from user or wire input.
///
/// Accepts the three literal names (case-insensitive) plus `""`, `"none"`,
/// `"unset"` and `"null"` for the absent status.
///
/// # Errors
///
/// Returns `StatusError::Unknown` for anything outside the four-value domain.
pub fn parse_status(raw: &str) -> Result<Option<TaskStatus>, StatusError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "complete" => Ok(Some(TaskStatus::Complete)),
        "partial" => Ok(Some(TaskStatus::Partial)),
        "incorrect" => Ok(Some(TaskStatus::Incorrect)),
        "" | "none" | "unset" | "null" => Ok(None),
        _ => Err(StatusError::Unknown(raw.to_string())),
    }
}

/// Display form of an optional status (`"unset"` for `None`).
#[must_use]
pub fn status_as_str(status: Option<TaskStatus>) -> &'static str {
    status.map_or("unset", TaskStatus::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_complete_clears_status() {
        assert_eq!(toggle_status(Some(TaskStatus::Complete)), None);
    }

    #[test]
    fn toggle_anything_else_marks_complete() {
        for status in [None, Some(TaskStatus::Partial), Some(TaskStatus::Incorrect)] {
            assert_eq!(toggle_status(status), Some(TaskStatus::Complete));
        }
    }

    #[test]
    fn double_toggle_collapses_partial() {
        let once = toggle_status(Some(TaskStatus::Partial));
        assert_eq!(toggle_status(once), None);
    }

    #[test]
    fn parse_accepts_the_four_values() {
        assert_eq!(parse_status("complete").unwrap(), Some(TaskStatus::Complete));
        assert_eq!(parse_status("Partial").unwrap(), Some(TaskStatus::Partial));
        assert_eq!(parse_status(" incorrect ").unwrap(), Some(TaskStatus::Incorrect));
        assert_eq!(parse_status("none").unwrap(), None);
        assert_eq!(parse_status("").unwrap(), None);
    }

    #[test]
    fn parse_rejects_unknown_values() {
        let err = parse_status("done").unwrap_err();
        assert_eq!(err, StatusError::Unknown("done".into()));
    }

    #[test]
    fn serializes_as_lowercase_literals_or_null() {
        let json = serde_json::to_string(&Some(TaskStatus::Incorrect)).unwrap();
        assert_eq!(json, "\"incorrect\"");
        let unset: Option<TaskStatus> = None;
        assert_eq!(serde_json::to_string(&unset).unwrap(), "null");
        let back: Option<TaskStatus> = serde_json::from_str("\"partial\"").unwrap();
        assert_eq!(back, Some(TaskStatus::Partial));
    }
}
