//! Flagged snippet - a fragment of an answer marked as factually dubious.

use crate::domain::foundation::{SnippetId, TurnId};
use serde::{Deserialize, Serialize};

/// A questionable fragment attached to the turn whose answer contained it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlaggedSnippet {
    id: SnippetId,
    turn_id: TurnId,
    text: String,
}

impl FlaggedSnippet {
    pub fn new(turn_id: TurnId, text: impl Into<String>) -> Self {
        Self {
            id: SnippetId::new(),
            turn_id,
            text: text.into(),
        }
    }

    pub fn reconstitute(id: SnippetId, turn_id: TurnId, text: String) -> Self {
        Self { id, turn_id, text }
    }

    /// Builds one snippet per entry, all referencing the same turn.
    pub fn batch_for(turn_id: TurnId, texts: &[String]) -> Vec<Self> {
        texts.iter().map(|t| Self::new(turn_id, t.as_str())).collect()
    }

    pub fn id(&self) -> &SnippetId {
        &self.id
    }

    pub fn turn_id(&self) -> &TurnId {
        &self.turn_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_attaches_every_snippet_to_turn() {
        let turn_id = TurnId::new();
        let batch = FlaggedSnippet::batch_for(
            turn_id,
            &["born in 1850".to_string(), "met Napoleon".to_string()],
        );

        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(|s| *s.turn_id() == turn_id));
        assert_eq!(batch[1].text(), "met Napoleon");
        assert_ne!(batch[0].id(), batch[1].id());
    }

    #[test]
    fn empty_batch_is_empty() {
        assert!(FlaggedSnippet::batch_for(TurnId::new(), &[]).is_empty());
    }
}
