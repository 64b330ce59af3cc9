//! Per-session state: the active word and its history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::{History, SessionId};

/// One tutoring session.
///
/// Replaying the system instructions rendered for `word` followed by
/// `history` reproduces the exact context every stored assistant turn saw,
/// so nothing that affects model context may live outside this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,

    word: String,

    pub history: History,

    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: SessionId, word: impl Into<String>) -> Self {
        Self {
            id,
            word: word.into(),
            history: History::new(),
            created_at: Utc::now(),
        }
    }

    /// The active vocabulary word.
    pub fn word(&self) -> &str {
        &self.word
    }

    /// Switch the active word. Only allowed before the first turn.
    ///
    /// Returns `false` (and leaves the word untouched) once any turn exists.
    pub fn switch_word(&mut self, word: impl Into<String>) -> bool {
        if !self.history.is_empty() {
            return false;
        }
        self.word = word.into();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn word_switch_allowed_only_before_first_turn() {
        let mut session = Session::new(SessionId::new(), "apple");
        assert!(session.switch_word("boy"));
        assert_eq!(session.word(), "boy");

        session.history.push(Message::user("boy"));
        assert!(!session.switch_word("cat"));
        assert_eq!(session.word(), "boy");
    }
}
