use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }

    pub fn is_assistant(self) -> bool {
        self == Role::Assistant
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(format!("invalid message role: {value}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

/// Citation attached to an assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl Source {
    pub fn new(kind: impl Into<String>, title: impl Into<String>, url: Option<String>) -> Self {
        Self {
            kind: kind.into(),
            title: title.into(),
            url,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.kind.trim().is_empty() && !self.title.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One turn in the transcript.
///
/// `active_tools` and `streaming` describe the in-flight exchange only and
/// are never written to a snapshot; a reloaded message is always finished
/// and has no tool activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    #[serde(skip)]
    pub active_tools: Option<Vec<String>>,
    #[serde(skip)]
    pub streaming: bool,
}

impl Message {
    pub fn user(id: MessageId, content: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::User,
            content: content.into(),
            sources: None,
            active_tools: None,
            streaming: false,
        }
    }

    /// An empty assistant reply that is waiting for its stream.
    pub fn pending_assistant(id: MessageId) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: String::new(),
            sources: None,
            active_tools: None,
            streaming: true,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role.is_user()
    }

    pub fn is_assistant(&self) -> bool {
        self.role.is_assistant()
    }

    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_strings() {
        assert_eq!(Role::try_from("user"), Ok(Role::User));
        assert_eq!(Role::try_from("assistant"), Ok(Role::Assistant));
        assert!(Role::try_from("system").is_err());
        assert_eq!(String::from(Role::Assistant), "assistant");
    }

    #[test]
    fn serialization_drops_transient_fields() {
        let mut message = Message::pending_assistant(MessageId::new("msg_1_0"));
        message.content = "hello".into();
        message.active_tools = Some(vec!["lookup".into()]);

        let json = serde_json::to_value(&message).expect("serialize message");
        assert_eq!(
            json,
            serde_json::json!({"id": "msg_1_0", "role": "assistant", "content": "hello"})
        );

        let restored: Message = serde_json::from_value(json).expect("deserialize message");
        assert_eq!(restored.active_tools, None);
        assert!(!restored.streaming);
    }

    #[test]
    fn source_validity_requires_kind_and_title() {
        assert!(Source::new("wiki", "Page", None).is_valid());
        assert!(!Source::new("", "Page", None).is_valid());
        assert!(!Source::new("wiki", "  ", Some("https://example.com".into())).is_valid());
    }
}
