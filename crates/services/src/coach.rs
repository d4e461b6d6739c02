use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use spark_core::model::{ChatMessage, ChatRole, CoachPersona};
use spark_core::progress::ProgressBreakdown;

use crate::error::CoachError;

/// Study numbers a coach can mention in a reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StudySnapshot {
    pub open_tasks: usize,
    pub percent_complete: u8,
}

impl From<ProgressBreakdown> for StudySnapshot {
    fn from(breakdown: ProgressBreakdown) -> Self {
        Self {
            open_tasks: breakdown.open(),
            percent_complete: breakdown.percent,
        }
    }
}

/// Everything a responder sees for one turn.
#[derive(Debug, Clone)]
pub struct CoachRequest {
    pub persona: CoachPersona,
    /// Recent transcript, oldest first, ending with the user's message.
    pub history: Vec<ChatMessage>,
    pub snapshot: StudySnapshot,
}

impl CoachRequest {
    /// The user message this turn answers.
    #[must_use]
    pub fn latest_user_message(&self) -> Option<&ChatMessage> {
        self.history
            .iter()
            .rev()
            .find(|message| message.role == ChatRole::User)
    }

    /// True when the coach has not spoken yet in the visible transcript.
    #[must_use]
    pub fn is_first_reply(&self) -> bool {
        !self
            .history
            .iter()
            .any(|message| message.role == ChatRole::Coach)
    }
}

/// Produces coach replies for the chat room.
#[async_trait]
pub trait CoachResponder: Send + Sync {
    /// # Errors
    ///
    /// Returns `CoachError` when no reply can be produced.
    async fn reply(&self, request: CoachRequest) -> Result<String, CoachError>;
}

/// Local coach that answers from the persona's reply templates.
pub struct ScriptedCoach {
    rng: Mutex<StdRng>,
}

impl ScriptedCoach {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic template choice for a given seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn pick_template(&self, persona: CoachPersona) -> Result<&'static str, CoachError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|e| CoachError::Unavailable(e.to_string()))?;
        persona
            .reply_templates()
            .choose(&mut *rng)
            .copied()
            .ok_or(CoachError::EmptyReply)
    }
}

impl Default for ScriptedCoach {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoachResponder for ScriptedCoach {
    async fn reply(&self, request: CoachRequest) -> Result<String, CoachError> {
        let template = self.pick_template(request.persona)?;
        let body = fill_template(template, request.snapshot);
        if request.is_first_reply() {
            Ok(format!("{} {body}", request.persona.greeting()))
        } else {
            Ok(body)
        }
    }
}

/// Substitute `{open}` and `{percent}`.
#[must_use]
pub fn fill_template(template: &str, snapshot: StudySnapshot) -> String {
    template
        .replace("{open}", &snapshot.open_tasks.to_string())
        .replace("{percent}", &snapshot.percent_complete.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    use spark_core::model::{ChatMessageId, MessageDraft};
    use spark_core::time::fixed_now;

    fn message(id: u64, draft: MessageDraft) -> ChatMessage {
        draft
            .validate(fixed_now())
            .unwrap()
            .assign_id(ChatMessageId::new(id))
    }

    fn request(persona: CoachPersona, history: Vec<ChatMessage>) -> CoachRequest {
        CoachRequest {
            persona,
            history,
            snapshot: StudySnapshot {
                open_tasks: 3,
                percent_complete: 40,
            },
        }
    }

    #[test]
    fn fill_template_replaces_every_placeholder() {
        let filled = fill_template(
            "{open} open, {percent}% done, {open} to go",
            StudySnapshot {
                open_tasks: 2,
                percent_complete: 67,
            },
        );
        assert_eq!(filled, "2 open, 67% done, 2 to go");
    }

    #[test]
    fn snapshot_from_breakdown_counts_open_tasks() {
        let snapshot = StudySnapshot::from(ProgressBreakdown::from_counts(1, 4));
        assert_eq!(snapshot.open_tasks, 3);
        assert_eq!(snapshot.percent_complete, 25);
    }

    #[tokio::test]
    async fn first_reply_starts_with_greeting() {
        let coach = ScriptedCoach::seeded(7);
        let history = vec![message(1, MessageDraft::user(CoachPersona::Strict, "hi"))];

        let reply = coach
            .reply(request(CoachPersona::Strict, history))
            .await
            .unwrap();
        assert!(reply.starts_with(CoachPersona::Strict.greeting()));
        assert!(!reply.contains('{'));
    }

    #[tokio::test]
    async fn later_replies_come_from_persona_templates() {
        let coach = ScriptedCoach::seeded(11);
        let history = vec![
            message(1, MessageDraft::user(CoachPersona::Playful, "hi")),
            message(2, MessageDraft::coach(CoachPersona::Playful, "hey")),
            message(3, MessageDraft::user(CoachPersona::Playful, "what now?")),
        ];
        let req = request(CoachPersona::Playful, history);
        assert_eq!(req.latest_user_message().unwrap().body, "what now?");

        let reply = coach.reply(req.clone()).await.unwrap();
        let expected: Vec<String> = CoachPersona::Playful
            .reply_templates()
            .iter()
            .map(|t| fill_template(t, req.snapshot))
            .collect();
        assert!(expected.contains(&reply));
    }

    #[tokio::test]
    async fn same_seed_gives_same_replies() {
        let a = ScriptedCoach::seeded(42);
        let b = ScriptedCoach::seeded(42);
        for _ in 0..5 {
            let req = request(CoachPersona::Socratic, Vec::new());
            assert_eq!(
                a.reply(req.clone()).await.unwrap(),
                b.reply(req).await.unwrap()
            );
        }
    }
}
