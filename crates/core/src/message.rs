//! Turns and the per-session history they are appended to.
//!
//! A turn is immutable once appended. Append order is the only ordering
//! guarantee, so turns carry no ids or timestamps.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque key identifying one tutoring session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// A fresh random id, used by transports that own their session
    /// (one CLI run, one WebSocket connection).
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    /// Tool output, answering an assistant turn's tool call.
    Tool,
}

/// A single turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,

    pub content: String,

    /// Tool calls requested by the assistant
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// For tool results: which call this answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::with_role(Role::Tool, content)
        }
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageToolCall {
    pub id: String,

    pub name: String,

    /// Arguments as a JSON string, exactly as the model produced them
    pub arguments: String,
}

/// Append-only, ordered sequence of turns: user and assistant text plus any
/// tool round-trips between them.
///
/// There is no way to remove or edit a turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    turns: Vec<Message>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn at the end.
    pub fn push(&mut self, message: Message) {
        self.turns.push(message);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.turns.iter()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.turns
    }

    /// The most recent user turn, if any.
    pub fn last_user(&self) -> Option<&Message> {
        self.turns.iter().rev().find(|m| m.role == Role::User)
    }

    pub fn last(&self) -> Option<&Message> {
        self.turns.last()
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_preserves_append_order() {
        let mut history = History::new();
        history.push(Message::user("apple"));
        history.push(Message::assistant("这个单词的意思是‘苹果’，你理解这个意思了吗？"));
        history.push(Message::user("例句"));

        let roles: Vec<Role> = history.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
        assert_eq!(history.as_slice()[0].content, "apple");
        assert_eq!(history.last().unwrap().content, "例句");
    }

    #[test]
    fn last_user_skips_assistant_turns() {
        let mut history = History::new();
        history.push(Message::user("first"));
        history.push(Message::assistant("reply"));
        assert_eq!(history.last_user().unwrap().content, "first");
    }

    #[test]
    fn last_user_on_empty_history() {
        assert!(History::new().last_user().is_none());
    }

    #[test]
    fn tool_result_serializes_call_id() {
        let msg = Message::tool_result("call_1", "apple 的例句是...");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call_1");
        assert!(json.get("tool_calls").is_none());
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
        assert_eq!(SessionId::from("default_user").as_str(), "default_user");
    }
}
