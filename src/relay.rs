use crate::backend::BackendKind;
use crate::config::AppConfig;
use crate::error::{RelayError, Result};
use crate::translate::anthropic_types::MessagesResponse;
use crate::translate::chat_types::{ChatResponse, Message, StreamFrame};
use crate::translate::ollama_types::OllamaChatResponse;
use crate::translate::request::{to_anthropic, to_ollama};
use crate::translate::response::{
    anthropic_reply_text, classify_status, ollama_reply_text, truncate,
};
use crate::translate::streaming::{decode_anthropic_event, NdjsonDecoder, StreamUpdate};

use eventsource_stream::Eventsource;
use futures::stream::Stream;
use futures::StreamExt;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, info, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Frames for one streaming reply. Always ends with `Done` or a single `Error`.
pub type FrameStream = Pin<Box<dyn Stream<Item = StreamFrame> + Send>>;

type UpdateStream = Pin<Box<dyn Stream<Item = Result<StreamUpdate>> + Send>>;

/// Where a request is going, kept so transport failures can name it.
#[derive(Debug, Clone)]
struct BackendTarget {
    kind: BackendKind,
    address: String,
    key_env: String,
}

impl BackendTarget {
    fn from_config(config: &AppConfig) -> Self {
        Self {
            kind: config.backend.kind,
            address: config.effective_base_url(),
            key_env: config.api_key_env().unwrap_or_default(),
        }
    }

    fn unavailable(&self) -> RelayError {
        RelayError::unavailable(self.kind.to_string(), &self.address)
    }

    fn stalled(&self, fragments: usize) -> RelayError {
        RelayError::Stalled {
            backend: self.kind.to_string(),
            fragments,
        }
    }

    fn truncated(&self) -> RelayError {
        RelayError::Truncated {
            backend: self.kind.to_string(),
        }
    }

    fn send_error(&self, err: reqwest::Error) -> RelayError {
        if err.is_connect() || err.is_timeout() {
            self.unavailable()
        } else {
            RelayError::Http(err)
        }
    }

    fn status_error(&self, status: u16, body: &str) -> RelayError {
        classify_status(self.kind, status, body, &self.key_env)
    }
}

/// Build the outbound request for the configured backend. No I/O happens here;
/// a missing hosted API key is the only way this fails.
fn backend_request(
    messages: &[Message],
    stream: bool,
    config: &AppConfig,
    client: &reqwest::Client,
) -> Result<reqwest::RequestBuilder> {
    let base_url = config.effective_base_url();
    let model = config.effective_model();

    match config.backend.kind {
        BackendKind::Anthropic => {
            let api_key = config.resolve_api_key()?;
            let url = format!("{base_url}/v1/messages");
            let body = to_anthropic(
                messages,
                config.system_prompt(),
                &model,
                config.backend.max_tokens,
                stream,
            );

            info!(url = %url, model = %model, stream, messages = messages.len(), "POST");

            Ok(client
                .post(url)
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body))
        }
        BackendKind::Ollama => {
            let url = format!("{base_url}/api/chat");
            let body = to_ollama(messages, config.system_prompt(), &model, stream);

            info!(url = %url, model = %model, stream, messages = messages.len(), "POST");

            Ok(client.post(url).json(&body))
        }
    }
}

/// Forward a conversation and wait for the whole reply.
pub async fn relay_non_streaming(
    messages: &[Message],
    config: &AppConfig,
    client: &reqwest::Client,
) -> Result<ChatResponse> {
    let target = BackendTarget::from_config(config);
    let request = backend_request(messages, false, config, client)?;

    let response = request
        .timeout(config.timeout())
        .send()
        .await
        .map_err(|e| target.send_error(e))?;

    let status = response.status().as_u16();
    let body = response.text().await.map_err(|e| target.send_error(e))?;

    debug!(status, body_len = body.len(), "Backend response");

    if status >= 400 {
        warn!(status, body = truncate(&body, 300), "Backend returned error");
        return Err(target.status_error(status, &body));
    }

    let text = match target.kind {
        BackendKind::Anthropic => {
            let parsed: MessagesResponse = serde_json::from_str(&body).map_err(|e| {
                RelayError::provider(format!(
                    "Failed to parse backend response: {}. Body: {}",
                    e,
                    truncate(&body, 300)
                ))
            })?;
            anthropic_reply_text(&parsed)
        }
        BackendKind::Ollama => {
            let parsed: OllamaChatResponse = serde_json::from_str(&body).map_err(|e| {
                RelayError::provider(format!(
                    "Failed to parse backend response: {}. Body: {}",
                    e,
                    truncate(&body, 300)
                ))
            })?;
            ollama_reply_text(&parsed)?
        }
    };

    info!(reply_len = text.len(), "Completed");

    Ok(ChatResponse::completed(text))
}

/// Forward a conversation and relay the reply as it is generated.
///
/// Only configuration problems fail here. Everything that goes wrong once the
/// backend is contacted is reported as a single error frame inside the stream.
pub fn relay_streaming(
    messages: &[Message],
    config: &AppConfig,
    client: &reqwest::Client,
) -> Result<FrameStream> {
    let target = BackendTarget::from_config(config);
    let request = backend_request(messages, true, config, client)?;

    Ok(Box::pin(frame_stream(request, target, config.timeout())))
}

fn frame_stream(
    request: reqwest::RequestBuilder,
    target: BackendTarget,
    read_timeout: Duration,
) -> impl Stream<Item = StreamFrame> + Send + 'static {
    async_stream::stream! {
        match open_stream(request, &target, read_timeout).await {
            Err(e) => {
                warn!(error = %e, "Stream failed to start");
                yield StreamFrame::error(e);
            }
            Ok(response) => {
                let mut updates: UpdateStream = match target.kind {
                    BackendKind::Anthropic => Box::pin(anthropic_updates(response)),
                    BackendKind::Ollama => Box::pin(ollama_updates(response)),
                };
                let mut fragments = 0usize;

                loop {
                    let next = match tokio::time::timeout(read_timeout, updates.next()).await {
                        Ok(next) => next,
                        Err(_) => {
                            warn!(fragments, "Timed out waiting for backend");
                            yield StreamFrame::error(target.stalled(fragments));
                            break;
                        }
                    };

                    match next {
                        Some(Ok(StreamUpdate::Text(text))) => {
                            fragments += 1;
                            yield StreamFrame::Text(text);
                        }
                        Some(Ok(StreamUpdate::Done)) => {
                            info!(fragments, "Stream completed");
                            yield StreamFrame::Done;
                            break;
                        }
                        // connection ended without message_stop / done:true
                        None => {
                            warn!(fragments, "Backend closed stream before completion");
                            yield StreamFrame::error(target.truncated());
                            break;
                        }
                        Some(Ok(StreamUpdate::Failed(message))) => {
                            warn!(fragments, error = %message, "Backend reported error mid-stream");
                            yield StreamFrame::Error(message);
                            break;
                        }
                        Some(Err(e)) => {
                            warn!(fragments, error = %e, "Stream broken");
                            yield StreamFrame::error(e);
                            break;
                        }
                    }
                }
            }
        }
    }
}

async fn open_stream(
    request: reqwest::RequestBuilder,
    target: &BackendTarget,
    read_timeout: Duration,
) -> Result<reqwest::Response> {
    let response = tokio::time::timeout(read_timeout, request.send())
        .await
        .map_err(|_| target.unavailable())?
        .map_err(|e| target.send_error(e))?;

    let status = response.status().as_u16();
    if status >= 400 {
        let body = tokio::time::timeout(read_timeout, response.text())
            .await
            .ok()
            .and_then(std::result::Result::ok)
            .unwrap_or_default();
        warn!(status, body = truncate(&body, 300), "Streaming request rejected");
        return Err(target.status_error(status, &body));
    }

    info!(status, "Stream opened");
    Ok(response)
}

/// Messages API: SSE events, text in `content_block_delta`, end at `message_stop`.
fn anthropic_updates(response: reqwest::Response) -> impl Stream<Item = Result<StreamUpdate>> + Send {
    response
        .bytes_stream()
        .eventsource()
        .filter_map(|event| async move {
            match event {
                Ok(event) => decode_anthropic_event(&event.data).map(Ok),
                Err(e) => Some(Err(RelayError::provider(format!("Stream decode error: {e}")))),
            }
        })
}

/// Ollama: newline-delimited JSON records, end at `"done": true`.
fn ollama_updates(response: reqwest::Response) -> impl Stream<Item = Result<StreamUpdate>> + Send {
    async_stream::stream! {
        let mut decoder = NdjsonDecoder::new();
        let byte_stream = response.bytes_stream();
        tokio::pin!(byte_stream);

        while let Some(chunk) = byte_stream.next().await {
            match chunk {
                Ok(chunk) => {
                    for update in decoder.push(&chunk) {
                        yield Ok(update);
                    }
                }
                Err(e) => {
                    yield Err(RelayError::Http(e));
                    break;
                }
            }
        }

        for update in decoder.finish() {
            yield Ok(update);
        }
    }
}
