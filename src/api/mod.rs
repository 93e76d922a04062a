use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::message::{Role, Source};

/// One prior turn as sent to the chat endpoint. Ids, sources and tool
/// activity never leave the client.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

impl ChatRequest {
    pub fn streaming(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            stream: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventKind {
    Token,
    ToolCall,
    Sources,
    Done,
    Error,
}

/// A single `data:` payload pushed by the chat endpoint.
///
/// Only one payload field is meaningful per kind; combinations that carry
/// the wrong field are accepted here and ignored when applied.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub kind: StreamEventKind,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<Source>>,
}

impl StreamEvent {
    pub fn token(content: impl Into<String>) -> Self {
        Self::with_content(StreamEventKind::Token, content)
    }

    pub fn tool_call(name: impl Into<String>) -> Self {
        Self::with_content(StreamEventKind::ToolCall, name)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::with_content(StreamEventKind::Error, content)
    }

    pub fn sources(sources: Vec<Source>) -> Self {
        Self {
            kind: StreamEventKind::Sources,
            content: None,
            sources: Some(sources),
        }
    }

    pub fn done() -> Self {
        Self {
            kind: StreamEventKind::Done,
            content: None,
            sources: None,
        }
    }

    fn with_content(kind: StreamEventKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: Some(content.into()),
            sources: None,
        }
    }
}

/// Body of the backend health probe. Only `status` is guaranteed; the rest
/// is whatever counters the server chooses to report.
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}
