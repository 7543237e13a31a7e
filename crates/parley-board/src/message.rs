//! Blackboard message records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sequence number of a message. The first message is `1`.
pub type MessageId = u64;

/// Author of a blackboard message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Sender {
    /// External input typed by the user.
    User,
    /// Notices produced by the runtime itself.
    System,
    /// An agent, identified by its stable name.
    Agent(String),
}

impl Sender {
    /// Create an agent sender.
    pub fn agent(name: impl Into<String>) -> Self {
        Self::Agent(name.into())
    }

    /// Check if this is the user.
    pub fn is_user(&self) -> bool {
        matches!(self, Self::User)
    }

    /// Check if this is an agent.
    pub fn is_agent(&self) -> bool {
        matches!(self, Self::Agent(_))
    }

    /// Check if this sender is the named agent.
    pub fn is(&self, agent: &str) -> bool {
        matches!(self, Self::Agent(name) if name == agent)
    }

    /// Display name of the sender.
    pub fn name(&self) -> &str {
        match self {
            Self::User => "user",
            Self::System => "system",
            Self::Agent(name) => name,
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for Sender {
    fn from(name: &str) -> Self {
        match name {
            "user" => Self::User,
            "system" => Self::System,
            other => Self::Agent(other.to_string()),
        }
    }
}

/// An immutable blackboard entry.
///
/// Messages are only created by [`Blackboard::append`](crate::Blackboard::append),
/// which assigns the id; there is no way to mutate one afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    id: MessageId,
    sender: Sender,
    text: String,
    timestamp: DateTime<Utc>,
}

impl Message {
    pub(crate) fn new(id: MessageId, sender: Sender, text: String) -> Self {
        Self {
            id,
            sender,
            text,
            timestamp: Utc::now(),
        }
    }

    /// Sequence id.
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Author.
    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    /// Message body.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Time the message was appended.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Check if the named agent wrote this message.
    pub fn is_from(&self, agent: &str) -> bool {
        self.sender.is(agent)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.sender, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sender_from_str() {
        assert_eq!(Sender::from("user"), Sender::User);
        assert_eq!(Sender::from("system"), Sender::System);
        assert_eq!(Sender::from("writer"), Sender::agent("writer"));
    }

    #[test]
    fn test_sender_predicates() {
        let writer = Sender::agent("writer");
        assert!(writer.is_agent());
        assert!(writer.is("writer"));
        assert!(!writer.is("editor"));
        assert!(!Sender::User.is("user"));
        assert!(Sender::User.is_user());
        assert_eq!(writer.to_string(), "writer");
        assert_eq!(Sender::System.to_string(), "system");
    }

    #[test]
    fn test_message_display() {
        let msg = Message::new(3, Sender::agent("editor"), "Better draft".into());
        assert_eq!(msg.to_string(), "editor: Better draft");
        assert!(msg.is_from("editor"));
        assert_eq!(msg.id(), 3);
    }

    #[test]
    fn test_message_serialization() {
        let msg = Message::new(1, Sender::agent("critic"), "Risky".into());
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["id"], json!(1));
        assert_eq!(value["sender"]["kind"], json!("agent"));
        assert_eq!(value["sender"]["name"], json!("critic"));
        assert_eq!(value["text"], json!("Risky"));
    }
}
