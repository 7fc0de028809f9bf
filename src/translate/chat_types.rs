//! Types exchanged with the browser chat page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conversation role. Unknown role strings are kept verbatim and forwarded
/// to the backend unchanged; the backend decides whether to reject them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
    System,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Other(role) => role.as_str(),
        }
    }
}

impl From<String> for Role {
    fn from(role: String) -> Self {
        match role.as_str() {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "system" => Self::System,
            _ => Self::Other(role),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(role) => role,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Body of `POST /api/chat`. An empty `messages` list is accepted and forwarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl ChatRequest {
    pub fn is_streaming(&self) -> bool {
        self.stream.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatResponse {
    /// Stamp a finished reply with the current time.
    pub fn completed(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            timestamp: Utc::now(),
        }
    }
}

/// One server-sent-event frame sent to the caller while streaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    Text(String),
    Error(String),
    Done,
}

impl StreamFrame {
    pub fn error(err: impl std::fmt::Display) -> Self {
        Self::Error(err.to_string())
    }

    /// Payload of the `data:` line for this frame.
    pub fn data(&self) -> String {
        match self {
            Self::Text(text) => serde_json::json!({ "text": text }).to_string(),
            Self::Error(message) => serde_json::json!({ "error": message }).to_string(),
            Self::Done => "[DONE]".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_roles() {
        let msgs: Vec<Message> = serde_json::from_str(
            r#"[{"role":"user","content":"hi"},{"role":"tool","content":"x"}]"#,
        )
        .unwrap();
        assert_eq!(msgs[0].role, Role::User);
        assert_eq!(msgs[1].role, Role::Other("tool".to_string()));

        let back = serde_json::to_value(&msgs[1]).unwrap();
        assert_eq!(back["role"], "tool");
    }

    #[test]
    fn test_stream_defaults_to_false() {
        let req: ChatRequest = serde_json::from_str(r#"{"messages":[]}"#).unwrap();
        assert!(!req.is_streaming());
        assert!(req.messages.is_empty());

        let req: ChatRequest =
            serde_json::from_str(r#"{"messages":[],"stream":null}"#).unwrap();
        assert!(!req.is_streaming());
    }

    #[test]
    fn test_frame_data() {
        assert_eq!(
            StreamFrame::Text("say \"hi\"\n".to_string()).data(),
            r#"{"text":"say \"hi\"\n"}"#
        );
        assert_eq!(
            StreamFrame::Error("boom".to_string()).data(),
            r#"{"error":"boom"}"#
        );
        assert_eq!(StreamFrame::Done.data(), "[DONE]");
    }
}
