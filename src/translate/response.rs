use super::anthropic_types::{ErrorResponse, MessagesResponse, ResponseContentBlock};
use super::ollama_types::OllamaChatResponse;
use crate::backend::BackendKind;
use crate::error::RelayError;

/// Full reply text of a Messages API response: every text block, in order.
pub fn anthropic_reply_text(resp: &MessagesResponse) -> String {
    resp.content
        .iter()
        .filter_map(|block| match block {
            ResponseContentBlock::Text { text } => Some(text.as_str()),
            ResponseContentBlock::Other => None,
        })
        .collect()
}

/// Full reply text of a non-streamed Ollama chat response.
pub fn ollama_reply_text(resp: &OllamaChatResponse) -> Result<String, RelayError> {
    if let Some(ref err) = resp.error {
        return Err(RelayError::provider(err.clone()));
    }
    Ok(resp.content().to_string())
}

/// Map a non-success backend status to the caller-visible error.
pub fn classify_status(kind: BackendKind, status: u16, body: &str, key_env: &str) -> RelayError {
    match kind {
        BackendKind::Anthropic => match status {
            401 => RelayError::Unauthorized {
                key_env: key_env.to_string(),
            },
            429 => RelayError::RateLimited,
            _ => {
                let message = serde_json::from_str::<ErrorResponse>(body)
                    .map(|e| e.error.message)
                    .unwrap_or_else(|_| truncate(body, 500).to_string());
                RelayError::provider(format!(
                    "{kind} returned status {status}: {message}"
                ))
            }
        },
        BackendKind::Ollama => RelayError::Upstream {
            backend: kind.to_string(),
            status,
            body: body.to_string(),
        },
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
