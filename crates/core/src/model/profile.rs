use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::coach::CoachPersona;

pub const DEFAULT_DISPLAY_NAME: &str = "Student";
pub const DEFAULT_DAILY_MINUTES: u16 = 30;
pub const MAX_DAILY_MINUTES: u16 = 720;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("display name cannot be empty")]
    EmptyDisplayName,
    #[error("grade level must be between 1 and 13, got {0}")]
    InvalidGradeLevel(u8),
    #[error("daily study minutes must be between 1 and 720, got {0}")]
    InvalidDailyMinutes(u16),
    #[error("unknown week start: {0:?}")]
    UnknownWeekStart(String),
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

//
// ─── PROFILE ───────────────────────────────────────────────────────────────────
//

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    display_name: String,
    school: Option<String>,
    grade_level: Option<u8>,
}

#[derive(Clone, Debug, Default)]
pub struct ProfileDraft {
    pub display_name: String,
    pub school: Option<String>,
    pub grade_level: Option<u8>,
}

impl ProfileDraft {
    /// Validate and normalize the draft.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError` for a blank name or an out-of-range grade level.
    pub fn validate(self) -> Result<Profile, ProfileError> {
        let display_name = self.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(ProfileError::EmptyDisplayName);
        }
        if let Some(grade) = self.grade_level {
            if !(1..=13).contains(&grade) {
                return Err(ProfileError::InvalidGradeLevel(grade));
            }
        }
        Ok(Profile {
            display_name,
            school: normalize_optional(self.school),
            grade_level: self.grade_level,
        })
    }
}

impl Profile {
    /// # Errors
    ///
    /// Returns `ProfileError` if the stored values no longer validate.
    pub fn from_persisted(
        display_name: String,
        school: Option<String>,
        grade_level: Option<u8>,
    ) -> Result<Self, ProfileError> {
        ProfileDraft {
            display_name,
            school,
            grade_level,
        }
        .validate()
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn school(&self) -> Option<&str> {
        self.school.as_deref()
    }

    #[must_use]
    pub fn grade_level(&self) -> Option<u8> {
        self.grade_level
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            school: None,
            grade_level: None,
        }
    }
}

//
// ─── PREFERENCES ───────────────────────────────────────────────────────────────
//

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

impl WeekStart {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WeekStart::Monday => "monday",
            WeekStart::Sunday => "sunday",
        }
    }
}

impl std::str::FromStr for WeekStart {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monday" => Ok(WeekStart::Monday),
            "sunday" => Ok(WeekStart::Sunday),
            _ => Err(ProfileError::UnknownWeekStart(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    coach: CoachPersona,
    daily_minutes: u16,
    reminders_enabled: bool,
    week_start: WeekStart,
}

#[derive(Clone, Debug)]
pub struct PreferencesDraft {
    pub coach: CoachPersona,
    pub daily_minutes: u16,
    pub reminders_enabled: bool,
    pub week_start: WeekStart,
}

impl Default for PreferencesDraft {
    fn default() -> Self {
        let prefs = Preferences::default();
        prefs.to_draft()
    }
}

impl PreferencesDraft {
    /// # Errors
    ///
    /// Returns `ProfileError::InvalidDailyMinutes` outside `1..=720`.
    pub fn validate(self) -> Result<Preferences, ProfileError> {
        if !(1..=MAX_DAILY_MINUTES).contains(&self.daily_minutes) {
            return Err(ProfileError::InvalidDailyMinutes(self.daily_minutes));
        }
        Ok(Preferences {
            coach: self.coach,
            daily_minutes: self.daily_minutes,
            reminders_enabled: self.reminders_enabled,
            week_start: self.week_start,
        })
    }
}

impl Preferences {
    #[must_use]
    pub fn coach(&self) -> CoachPersona {
        self.coach
    }

    #[must_use]
    pub fn daily_minutes(&self) -> u16 {
        self.daily_minutes
    }

    #[must_use]
    pub fn reminders_enabled(&self) -> bool {
        self.reminders_enabled
    }

    #[must_use]
    pub fn week_start(&self) -> WeekStart {
        self.week_start
    }

    /// Editable copy, used to change a single field and re-validate.
    #[must_use]
    pub fn to_draft(&self) -> PreferencesDraft {
        PreferencesDraft {
            coach: self.coach,
            daily_minutes: self.daily_minutes,
            reminders_enabled: self.reminders_enabled,
            week_start: self.week_start,
        }
    }
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            coach: CoachPersona::default(),
            daily_minutes: DEFAULT_DAILY_MINUTES,
            reminders_enabled: true,
            week_start: WeekStart::Monday,
        }
    }
}
