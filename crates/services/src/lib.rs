#![forbid(unsafe_code)]

pub mod app_services;
pub mod chat_room;
pub mod coach;
pub mod error;
pub mod events;
pub mod goal_store;
pub mod profile_store;
pub mod progress;
pub mod task_store;

pub use spark_core::Clock;

pub use app_services::AppServices;
pub use chat_room::{ChatExchange, ChatRoom};
pub use coach::{CoachRequest, CoachResponder, ScriptedCoach, StudySnapshot};
pub use error::{
    AppServicesError, ChatRoomError, CoachError, GoalStoreError, ProfileStoreError, ProgressError,
    TaskStoreError,
};
pub use events::{EventBus, StoreEvent};
pub use goal_store::GoalStore;
pub use profile_store::{ProfileSnapshot, ProfileStore};
pub use progress::{GoalOverview, ProgressRefresh, ProgressTracker};
pub use task_store::{TaskFilter, TaskStore};
