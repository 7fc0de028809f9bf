//! Map the caller's conversation into a backend request.
//!
//! The Messages API takes the persona prompt in its dedicated `system` field;
//! Ollama takes it as a leading `system`-role message. Caller messages are
//! copied in order and roles are forwarded verbatim.

use super::anthropic_types::{AnthropicMessage, MessagesRequest};
use super::chat_types::Message;
use super::ollama_types::{OllamaChatRequest, OllamaMessage};

pub fn to_anthropic(
    messages: &[Message],
    system_prompt: &str,
    model: &str,
    max_tokens: u32,
    stream: bool,
) -> MessagesRequest {
    MessagesRequest {
        model: model.to_string(),
        max_tokens,
        system: system_prompt.to_string(),
        messages: messages
            .iter()
            .map(|m| AnthropicMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect(),
        stream,
    }
}

pub fn to_ollama(
    messages: &[Message],
    system_prompt: &str,
    model: &str,
    stream: bool,
) -> OllamaChatRequest {
    let mut out = Vec::with_capacity(messages.len() + 1);

    out.push(OllamaMessage {
        role: "system".to_string(),
        content: system_prompt.to_string(),
    });

    out.extend(messages.iter().map(|m| OllamaMessage {
        role: m.role.as_str().to_string(),
        content: m.content.clone(),
    }));

    OllamaChatRequest {
        model: model.to_string(),
        messages: out,
        stream,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::chat_types::Role;

    fn conversation() -> Vec<Message> {
        vec![
            Message::new(Role::User, "What is CFAR?"),
            Message::new(Role::Assistant, "Constant false alarm rate detection."),
            Message::new(Role::User, "Compare CA-CFAR and OS-CFAR."),
        ]
    }

    #[test]
    fn test_anthropic_puts_prompt_in_system_field() {
        let req = to_anthropic(&conversation(), "PROMPT", "claude-x", 4096, false);

        assert_eq!(req.system, "PROMPT");
        assert_eq!(req.model, "claude-x");
        assert_eq!(req.max_tokens, 4096);
        assert_eq!(req.messages.len(), 3);
        assert_eq!(req.messages[0].content, "What is CFAR?");
        assert_eq!(req.messages[1].role, "assistant");
        assert_eq!(req.messages[2].content, "Compare CA-CFAR and OS-CFAR.");

        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("stream").is_none());
    }

    #[test]
    fn test_anthropic_stream_flag_serialized() {
        let req = to_anthropic(&conversation(), "PROMPT", "claude-x", 1024, true);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["stream"], true);
    }

    #[test]
    fn test_ollama_prepends_system_message() {
        let req = to_ollama(&conversation(), "PROMPT", "llama3.2", true);

        assert_eq!(req.messages.len(), 4);
        assert_eq!(req.messages[0].role, "system");
        assert_eq!(req.messages[0].content, "PROMPT");
        let roles: Vec<&str> = req.messages[1..].iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["user", "assistant", "user"]);
        assert!(req.stream);
    }

    #[test]
    fn test_empty_conversation_and_unknown_roles_pass_through() {
        let req = to_anthropic(&[], "PROMPT", "claude-x", 4096, false);
        assert!(req.messages.is_empty());

        let odd = vec![Message::new(Role::Other("tool".to_string()), "42")];
        let req = to_ollama(&odd, "PROMPT", "llama3.2", false);
        assert_eq!(req.messages[1].role, "tool");
    }
}
