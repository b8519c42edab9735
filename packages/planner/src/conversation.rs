// ABOUTME: Conversation turn types and the append-only turn log
// ABOUTME: Turns are never reordered or edited except to attach a rating to an assistant turn

use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};

/// Role of the message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// Thumbs up/down feedback on an assistant turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Up,
    Down,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            rating: None,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            rating: None,
        }
    }
}

/// Ordered, append-only sequence of turns
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TurnLog {
    turns: Vec<ConversationTurn>,
}

impl TurnLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> usize {
        self.turns.push(ConversationTurn::user(text));
        self.turns.len() - 1
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) -> usize {
        self.turns.push(ConversationTurn::assistant(text));
        self.turns.len() - 1
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    /// Index of the most recent assistant turn
    pub fn last_assistant_index(&self) -> Option<usize> {
        self.turns.iter().rposition(|t| t.role == Role::Assistant)
    }

    /// Attach a rating to an assistant turn. User turns cannot be rated.
    pub fn rate(&mut self, index: usize, rating: Rating) -> Result<()> {
        let len = self.turns.len();
        let turn = self
            .turns
            .get_mut(index)
            .ok_or(PlannerError::IndexOutOfRange { index, len })?;
        if turn.role != Role::Assistant {
            return Err(PlannerError::InvalidTarget(format!(
                "turn {} was written by the user and cannot be rated",
                index
            )));
        }
        turn.rating = Some(rating);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

/// Render turns as a plain transcript for prompts
pub fn render_transcript(turns: &[ConversationTurn]) -> String {
    if turns.is_empty() {
        return "(no messages yet)".to_string();
    }
    turns
        .iter()
        .map(|t| format!("{}: {}", t.role.label(), t.text))
        .collect::<Vec<_>>()
        .join("\n")
}
