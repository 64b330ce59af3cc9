//! Decides whether a session continues or ends after the latest user turn.

use wordtutor_core::{Message, Role};

/// Inputs that end a session, compared after trimming and lowercasing.
pub const QUIT_KEYWORDS: [&str; 4] = ["exit", "quit", "q", "退出"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Continue,
    Terminate,
}

#[derive(Debug, Clone)]
pub struct QuitDetector {
    keywords: Vec<String>,
}

impl Default for QuitDetector {
    fn default() -> Self {
        Self::with_keywords(QUIT_KEYWORDS)
    }
}

impl QuitDetector {
    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .collect(),
        }
    }

    pub fn is_quit(&self, text: &str) -> bool {
        let normalized = text.trim().to_lowercase();
        self.keywords.iter().any(|k| *k == normalized)
    }

    /// Look at the most recent user turn only. No user turn means continue.
    pub fn decide(&self, history: &[Message]) -> Route {
        match history.iter().rev().find(|m| m.role == Role::User) {
            Some(turn) if self.is_quit(&turn.content) => Route::Terminate,
            _ => Route::Continue,
        }
    }
}
