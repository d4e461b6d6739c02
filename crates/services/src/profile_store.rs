use std::sync::Arc;

use spark_core::model::{CoachPersona, Preferences, PreferencesDraft, Profile, ProfileDraft};
use storage::repository::ProfileRepository;

use crate::error::ProfileStoreError;
use crate::events::{EventBus, StoreEvent};

/// Profile and preferences as loaded, with defaults filled in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileSnapshot {
    pub profile: Profile,
    pub preferences: Preferences,
}

/// Reads and writes the single-row profile and preferences.
#[derive(Clone)]
pub struct ProfileStore {
    repo: Arc<dyn ProfileRepository>,
    events: EventBus,
}

impl ProfileStore {
    #[must_use]
    pub fn new(repo: Arc<dyn ProfileRepository>, events: EventBus) -> Self {
        Self { repo, events }
    }

    /// Load both records, falling back to defaults for anything never saved.
    ///
    /// # Errors
    ///
    /// Returns `ProfileStoreError::Storage` if repository access fails.
    pub async fn load(&self) -> Result<ProfileSnapshot, ProfileStoreError> {
        let profile = self.repo.get_profile().await?.unwrap_or_default();
        let preferences = self.preferences().await?;
        Ok(ProfileSnapshot {
            profile,
            preferences,
        })
    }

    /// # Errors
    ///
    /// Returns `ProfileStoreError::Storage` if repository access fails.
    pub async fn preferences(&self) -> Result<Preferences, ProfileStoreError> {
        Ok(self.repo.get_preferences().await?.unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns `ProfileStoreError::Profile` for invalid input.
    /// Returns `ProfileStoreError::Storage` if persistence fails.
    pub async fn save_profile(&self, draft: ProfileDraft) -> Result<Profile, ProfileStoreError> {
        let profile = draft.validate()?;
        self.repo.save_profile(&profile).await?;
        tracing::debug!(display_name = profile.display_name(), "profile saved");
        self.events.publish(StoreEvent::ProfileSaved);
        Ok(profile)
    }

    /// # Errors
    ///
    /// Returns `ProfileStoreError::Profile` for invalid input.
    /// Returns `ProfileStoreError::Storage` if persistence fails.
    pub async fn save_preferences(
        &self,
        draft: PreferencesDraft,
    ) -> Result<Preferences, ProfileStoreError> {
        let preferences = draft.validate()?;
        self.repo.save_preferences(&preferences).await?;
        tracing::debug!(
            coach = %preferences.coach(),
            daily_minutes = preferences.daily_minutes(),
            "preferences saved"
        );
        self.events.publish(StoreEvent::PreferencesSaved);
        Ok(preferences)
    }

    /// Change only the coach persona.
    ///
    /// # Errors
    ///
    /// Returns `ProfileStoreError::Storage` if repository access fails.
    pub async fn select_coach(
        &self,
        persona: CoachPersona,
    ) -> Result<Preferences, ProfileStoreError> {
        let mut draft = self.preferences().await?.to_draft();
        draft.coach = persona;
        self.save_preferences(draft).await
    }
}
