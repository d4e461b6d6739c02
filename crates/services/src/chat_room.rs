use std::sync::Arc;

use spark_core::model::{ChatMessage, CoachPersona, MessageDraft, NewChatMessage};
use storage::repository::ChatRepository;

use crate::Clock;
use crate::coach::{CoachRequest, CoachResponder, StudySnapshot};
use crate::error::{ChatRoomError, CoachError};
use crate::events::{EventBus, StoreEvent};
use crate::profile_store::ProfileStore;
use crate::task_store::TaskStore;

/// Messages handed to the coach as context for each reply.
pub const DEFAULT_HISTORY_WINDOW: u32 = 20;

/// One user turn and the coach's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatExchange {
    pub user: ChatMessage,
    pub reply: ChatMessage,
}

/// Chat transcript plus the coach that answers in it.
#[derive(Clone)]
pub struct ChatRoom {
    clock: Clock,
    chat: Arc<dyn ChatRepository>,
    tasks: TaskStore,
    profile: ProfileStore,
    coach: Arc<dyn CoachResponder>,
    events: EventBus,
    history_window: u32,
}

impl ChatRoom {
    #[must_use]
    pub fn new(
        clock: Clock,
        chat: Arc<dyn ChatRepository>,
        tasks: TaskStore,
        profile: ProfileStore,
        coach: Arc<dyn CoachResponder>,
        events: EventBus,
    ) -> Self {
        Self {
            clock,
            chat,
            tasks,
            profile,
            coach,
            events,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    #[must_use]
    pub fn with_history_window(mut self, window: u32) -> Self {
        self.history_window = window.max(1);
        self
    }

    /// The selected persona and its opening line.
    ///
    /// # Errors
    ///
    /// Returns `ChatRoomError::Profile` if preferences cannot be read.
    pub async fn greeting(&self) -> Result<(CoachPersona, &'static str), ChatRoomError> {
        let persona = self.profile.preferences().await?.coach();
        Ok((persona, persona.greeting()))
    }

    /// Store the user's message, ask the coach, and store the reply.
    ///
    /// A responder failure leaves the user message in the transcript.
    ///
    /// # Errors
    ///
    /// Returns `ChatRoomError::Message` for an empty or oversized body (nothing
    /// is stored), `ChatRoomError::Coach` if the responder fails, or a storage
    /// error from any of the stores involved.
    pub async fn send(&self, text: &str) -> Result<ChatExchange, ChatRoomError> {
        let persona = self.profile.preferences().await?.coach();
        let draft = MessageDraft::user(persona, text).validate(self.clock.now())?;
        let user = self.post(draft).await?;

        let history = self.chat.recent_messages(self.history_window).await?;
        let snapshot = StudySnapshot::from(self.tasks.overall_progress().await?);
        let request = CoachRequest {
            persona,
            history,
            snapshot,
        };

        let reply = self
            .coach
            .reply(request)
            .await
            .inspect_err(|error| tracing::warn!(%persona, %error, "coach reply failed"))?;
        if reply.trim().is_empty() {
            tracing::warn!(%persona, "coach returned an empty reply");
            return Err(CoachError::EmptyReply.into());
        }

        let draft = MessageDraft::coach(persona, reply).validate(self.clock.now())?;
        let reply = self.post(draft).await?;
        Ok(ChatExchange { user, reply })
    }

    /// Most recent `limit` messages, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ChatRoomError::Storage` if repository access fails.
    pub async fn history(&self, limit: u32) -> Result<Vec<ChatMessage>, ChatRoomError> {
        Ok(self.chat.recent_messages(limit).await?)
    }

    /// Empty the transcript, returning how many messages were removed.
    ///
    /// # Errors
    ///
    /// Returns `ChatRoomError::Storage` if repository access fails.
    pub async fn clear(&self) -> Result<u64, ChatRoomError> {
        let removed = self.chat.clear_messages().await?;
        tracing::debug!(removed, "chat transcript cleared");
        self.events.publish(StoreEvent::ChatCleared);
        Ok(removed)
    }

    async fn post(&self, message: NewChatMessage) -> Result<ChatMessage, ChatRoomError> {
        let id = self.chat.insert_message(message.clone()).await?;
        tracing::debug!(
            message_id = id.value(),
            role = message.role.as_str(),
            "chat message stored"
        );
        self.events.publish(StoreEvent::ChatMessagePosted(id));
        Ok(message.assign_id(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use spark_core::model::{ChatError, ChatRole, TaskDraft};
    use spark_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    use crate::coach::ScriptedCoach;

    struct Offline;

    #[async_trait]
    impl CoachResponder for Offline {
        async fn reply(&self, _request: CoachRequest) -> Result<String, CoachError> {
            Err(CoachError::Unavailable("offline".into()))
        }
    }

    struct Echo;

    #[async_trait]
    impl CoachResponder for Echo {
        async fn reply(&self, request: CoachRequest) -> Result<String, CoachError> {
            Ok(format!(
                "{} open, history {}",
                request.snapshot.open_tasks,
                request.history.len()
            ))
        }
    }

    fn room(coach: Arc<dyn CoachResponder>) -> ChatRoom {
        let repo = InMemoryRepository::new();
        let events = EventBus::default();
        let tasks = TaskStore::new(fixed_clock(), Arc::new(repo.clone()), events.clone());
        let profile = ProfileStore::new(Arc::new(repo.clone()), events.clone());
        ChatRoom::new(fixed_clock(), Arc::new(repo), tasks, profile, coach, events)
    }

    #[tokio::test]
    async fn send_stores_user_and_coach_messages() {
        let room = room(Arc::new(Echo));
        room.tasks
            .create(TaskDraft::new("Read", "english"))
            .await
            .unwrap();

        let exchange = room.send("  what should I do?  ").await.unwrap();
        assert_eq!(exchange.user.body, "what should I do?");
        assert_eq!(exchange.user.role, ChatRole::User);
        assert_eq!(exchange.reply.role, ChatRole::Coach);
        assert_eq!(exchange.reply.body, "1 open, history 1");
        assert_eq!(exchange.reply.persona, CoachPersona::Encouraging);

        let history = room.history(10).await.unwrap();
        assert_eq!(history, vec![exchange.user, exchange.reply]);
    }

    #[tokio::test]
    async fn responder_failure_keeps_user_message() {
        let room = room(Arc::new(Offline));
        let err = room.send("hello?").await.unwrap_err();
        assert!(matches!(
            err,
            ChatRoomError::Coach(CoachError::Unavailable(_))
        ));

        let history = room.history(10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, ChatRole::User);
    }

    #[tokio::test]
    async fn empty_message_is_rejected_without_storing() {
        let room = room(Arc::new(Echo));
        let mut rx = room.events.subscribe();
        let err = room.send("   ").await.unwrap_err();
        assert!(matches!(err, ChatRoomError::Message(ChatError::EmptyMessage)));
        assert!(room.history(10).await.unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn replies_use_selected_persona() {
        let room = room(Arc::new(ScriptedCoach::seeded(3)));
        room.profile
            .select_coach(CoachPersona::Socratic)
            .await
            .unwrap();

        let (persona, greeting) = room.greeting().await.unwrap();
        assert_eq!(persona, CoachPersona::Socratic);

        let exchange = room.send("hi").await.unwrap();
        assert_eq!(exchange.reply.persona, CoachPersona::Socratic);
        assert!(exchange.reply.body.starts_with(greeting));
    }

    #[tokio::test]
    async fn clear_empties_transcript() {
        let room = room(Arc::new(Echo));
        room.send("one").await.unwrap();
        room.send("two").await.unwrap();

        assert_eq!(room.clear().await.unwrap(), 4);
        assert!(room.history(10).await.unwrap().is_empty());
    }
}
