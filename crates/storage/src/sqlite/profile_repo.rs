use spark_core::model::{CoachPersona, Preferences, PreferencesDraft, Profile, WeekStart};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::ser;
use crate::repository::{ProfileRepository, StorageError};

#[async_trait::async_trait]
impl ProfileRepository for SqliteRepository {
    async fn get_profile(&self) -> Result<Option<Profile>, StorageError> {
        let row = sqlx::query("SELECT display_name, school, grade_level FROM profile WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let grade_level = row
            .try_get::<Option<i64>, _>("grade_level")
            .map_err(ser)?
            .map(|g| u8::try_from(g).map_err(|_| ser("grade_level overflow")))
            .transpose()?;

        Profile::from_persisted(
            row.try_get("display_name").map_err(ser)?,
            row.try_get("school").map_err(ser)?,
            grade_level,
        )
        .map(Some)
        .map_err(ser)
    }

    async fn save_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO profile (id, display_name, school, grade_level)
            VALUES (1, ?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                school = excluded.school,
                grade_level = excluded.grade_level
            ",
        )
        .bind(profile.display_name())
        .bind(profile.school())
        .bind(profile.grade_level().map(i64::from))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_preferences(&self) -> Result<Option<Preferences>, StorageError> {
        let row = sqlx::query(
            "SELECT coach, daily_minutes, reminders_enabled, week_start FROM preferences WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let coach: String = row.try_get("coach").map_err(ser)?;
        let week_start: String = row.try_get("week_start").map_err(ser)?;
        let daily_minutes: i64 = row.try_get("daily_minutes").map_err(ser)?;

        PreferencesDraft {
            coach: coach.parse::<CoachPersona>().map_err(ser)?,
            daily_minutes: u16::try_from(daily_minutes)
                .map_err(|_| ser("daily_minutes overflow"))?,
            reminders_enabled: row.try_get::<i64, _>("reminders_enabled").map_err(ser)? != 0,
            week_start: week_start.parse::<WeekStart>().map_err(ser)?,
        }
        .validate()
        .map(Some)
        .map_err(ser)
    }

    async fn save_preferences(&self, preferences: &Preferences) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO preferences (id, coach, daily_minutes, reminders_enabled, week_start)
            VALUES (1, ?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                coach = excluded.coach,
                daily_minutes = excluded.daily_minutes,
                reminders_enabled = excluded.reminders_enabled,
                week_start = excluded.week_start
            ",
        )
        .bind(preferences.coach().as_str())
        .bind(i64::from(preferences.daily_minutes()))
        .bind(i64::from(preferences.reminders_enabled()))
        .bind(preferences.week_start().as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
