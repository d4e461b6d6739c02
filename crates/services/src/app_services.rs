use std::sync::Arc;

use spark_core::model::Preferences;
use storage::repository::{ProfileRepository, Storage};

use crate::Clock;
use crate::chat_room::ChatRoom;
use crate::coach::{CoachResponder, ScriptedCoach};
use crate::error::AppServicesError;
use crate::events::EventBus;
use crate::goal_store::GoalStore;
use crate::profile_store::ProfileStore;
use crate::progress::ProgressTracker;
use crate::task_store::TaskStore;

/// Assembles app-facing services over one storage backend and event bus.
#[derive(Clone)]
pub struct AppServices {
    first_launch: bool,
    events: EventBus,
    tasks: Arc<TaskStore>,
    goals: Arc<GoalStore>,
    progress: Arc<ProgressTracker>,
    profile: Arc<ProfileStore>,
    chat: Arc<ChatRoom>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage with the scripted coach.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or default
    /// preference setup fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let first_launch = ensure_default_preferences(storage.profile.as_ref()).await?;
        let mut services = Self::new(storage, clock, Arc::new(ScriptedCoach::new()));
        services.first_launch = first_launch;
        Ok(services)
    }

    /// Ephemeral services for tests and demos.
    #[must_use]
    pub fn in_memory(clock: Clock, coach: Arc<dyn CoachResponder>) -> Self {
        Self::new(Storage::in_memory(), clock, coach)
    }

    #[must_use]
    pub fn new(storage: Storage, clock: Clock, coach: Arc<dyn CoachResponder>) -> Self {
        let events = EventBus::default();
        let tasks = TaskStore::new(clock, Arc::clone(&storage.tasks), events.clone());
        let goals = GoalStore::new(clock, Arc::clone(&storage.goals), events.clone());
        let profile = ProfileStore::new(Arc::clone(&storage.profile), events.clone());
        let progress = ProgressTracker::new(tasks.clone(), goals.clone());
        let chat = ChatRoom::new(
            clock,
            Arc::clone(&storage.chat),
            tasks.clone(),
            profile.clone(),
            coach,
            events.clone(),
        );

        Self {
            first_launch: false,
            events,
            tasks: Arc::new(tasks),
            goals: Arc::new(goals),
            progress: Arc::new(progress),
            profile: Arc::new(profile),
            chat: Arc::new(chat),
        }
    }

    /// True when this process created the initial preferences row.
    #[must_use]
    pub fn first_launch(&self) -> bool {
        self.first_launch
    }

    #[must_use]
    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    #[must_use]
    pub fn tasks(&self) -> Arc<TaskStore> {
        Arc::clone(&self.tasks)
    }

    #[must_use]
    pub fn goals(&self) -> Arc<GoalStore> {
        Arc::clone(&self.goals)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn profile(&self) -> Arc<ProfileStore> {
        Arc::clone(&self.profile)
    }

    #[must_use]
    pub fn chat(&self) -> Arc<ChatRoom> {
        Arc::clone(&self.chat)
    }
}

async fn ensure_default_preferences(
    profile: &dyn ProfileRepository,
) -> Result<bool, AppServicesError> {
    if profile.get_preferences().await?.is_some() {
        return Ok(false);
    }
    profile.save_preferences(&Preferences::default()).await?;
    tracing::info!("stored default preferences");
    Ok(true)
}
