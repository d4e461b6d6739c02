use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown coach persona: {0:?}")]
pub struct UnknownPersona(pub String);

/// Voice the study coach replies in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoachPersona {
    #[default]
    Encouraging,
    Strict,
    Socratic,
    Playful,
}

impl CoachPersona {
    pub const ALL: [CoachPersona; 4] = [
        CoachPersona::Encouraging,
        CoachPersona::Strict,
        CoachPersona::Socratic,
        CoachPersona::Playful,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CoachPersona::Encouraging => "encouraging",
            CoachPersona::Strict => "strict",
            CoachPersona::Socratic => "socratic",
            CoachPersona::Playful => "playful",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            CoachPersona::Encouraging => "Coach Sunny",
            CoachPersona::Strict => "Coach Flint",
            CoachPersona::Socratic => "Coach Sage",
            CoachPersona::Playful => "Coach Pip",
        }
    }

    #[must_use]
    pub fn greeting(self) -> &'static str {
        match self {
            CoachPersona::Encouraging => "Hi! Every spark counts. What are we working on today?",
            CoachPersona::Strict => "Let's get to work. Which task is first?",
            CoachPersona::Socratic => "What would you like to understand better today?",
            CoachPersona::Playful => "Ready to light some sparks? Pick a task and let's go!",
        }
    }

    /// Reply templates. `{open}` is the open task count and `{percent}` the
    /// overall percent complete.
    #[must_use]
    pub fn reply_templates(self) -> &'static [&'static str] {
        match self {
            CoachPersona::Encouraging => &[
                "You're {percent}% of the way there. Only {open} tasks left, you've got this!",
                "Nice effort! With {open} open tasks, pick the smallest one and start there.",
                "Progress is progress: {percent}% done. Keep the streak alive!",
            ],
            CoachPersona::Strict => &[
                "{open} tasks are still open. Finish one before the next break.",
                "{percent}% complete is not 100%. Back to it.",
                "No more planning. Do the next task on the list.",
            ],
            CoachPersona::Socratic => &[
                "You're at {percent}%. Which of your {open} open tasks feels hardest, and why?",
                "What would change if you finished one of the {open} open tasks today?",
                "What did the last task you completed teach you?",
            ],
            CoachPersona::Playful => &[
                "{percent}% charged! {open} sparks left to light.",
                "Boss fight: {open} tasks. Your power level: {percent}%.",
                "Snack, stretch, then smash one of those {open} tasks!",
            ],
        }
    }
}

impl std::fmt::Display for CoachPersona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CoachPersona {
    type Err = UnknownPersona;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        CoachPersona::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| UnknownPersona(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_persona_name() {
        for persona in CoachPersona::ALL {
            assert_eq!(persona.as_str().parse::<CoachPersona>().unwrap(), persona);
        }
        assert!("grumpy".parse::<CoachPersona>().is_err());
    }

    #[test]
    fn every_persona_has_templates() {
        for persona in CoachPersona::ALL {
            assert!(!persona.reply_templates().is_empty());
        }
    }
}
