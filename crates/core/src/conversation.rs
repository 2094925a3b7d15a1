//! Conversation-related types.

use daytrip_model::ModelMessage;
use serde::{Deserialize, Serialize};

/// Who authored a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The traveler.
    User,
    /// The planner.
    Assistant,
}

/// A turn in the conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// The author.
    pub role: Role,
    /// The text of the turn.
    pub content: String,
}

/// The chat history between the traveler and the planner.
///
/// The history is owned by the caller. A planning run copies it into its
/// own working conversation and never changes the caller's copy.
#[derive(Clone, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Creates an empty conversation.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a traveler turn.
    #[inline]
    pub fn push_user<S: Into<String>>(&mut self, content: S) {
        self.turns.push(Turn {
            role: Role::User,
            content: content.into(),
        });
    }

    /// Appends a planner turn.
    #[inline]
    pub fn push_assistant<S: Into<String>>(&mut self, content: S) {
        self.turns.push(Turn {
            role: Role::Assistant,
            content: content.into(),
        });
    }

    /// Returns the turns in order.
    #[inline]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Returns the number of turns.
    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns `true` if nothing has been said yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub(crate) fn to_messages(&self) -> impl Iterator<Item = ModelMessage> + '_ {
        self.turns.iter().map(|turn| match turn.role {
            Role::User => ModelMessage::User(turn.content.clone()),
            Role::Assistant => ModelMessage::assistant_text(turn.content.clone()),
        })
    }
}
