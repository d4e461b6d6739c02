mod chat;
mod coach;
mod goal;
mod ids;
mod profile;
mod status;
mod task;

pub use ids::{ChatMessageId, GoalId, ParseIdError, TaskId};

pub use chat::{ChatError, ChatMessage, ChatRole, MessageDraft, NewChatMessage, MAX_MESSAGE_CHARS};
pub use coach::{CoachPersona, UnknownPersona};
pub use goal::{ChapterRange, Goal, GoalDraft, GoalError, GoalPatch};
pub use profile::{
    Preferences, PreferencesDraft, Profile, ProfileDraft, ProfileError, WeekStart,
};
pub use status::{StatusError, TaskStatus, parse_status, status_as_str, toggle_status};
pub use task::{Priority, Task, TaskDraft, TaskError, TaskPatch, normalize_tags};
