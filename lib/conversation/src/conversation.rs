//! Append-only conversation state.

use llm_flows_ai::Turn;
use llm_flows_core::ConversationId;

/// Ordered turns of a single exchange.
///
/// Turns can only be appended; the history is handed to the completion
/// service as context and discarded when the exchange ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    id: ConversationId,
    turns: Vec<Turn>,
}

impl Conversation {
    /// Creates an empty conversation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: ConversationId::new(),
            turns: Vec::new(),
        }
    }

    /// Returns the conversation identifier.
    #[must_use]
    pub fn id(&self) -> ConversationId {
        self.id
    }

    /// Appends a turn.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Returns the turns, oldest first.
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Returns the number of tool-result turns.
    #[must_use]
    pub fn tool_result_count(&self) -> usize {
        self.turns
            .iter()
            .filter(|t| matches!(t, Turn::ToolResult { .. }))
            .count()
    }

    /// Returns the number of turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns whether the conversation has no turns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
