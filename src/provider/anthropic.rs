use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use super::sse::{self, SseEvent};
use super::{send_checked, text_stream, CompletionProvider, Frame, ProviderError, TextStream};
use crate::config::ProviderSettings;

const NAME: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";

/// Messages API request types
#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// Streaming event types
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: Delta },
    MessageStop,
    Error { error: ApiError },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

/// Streams completions from the Anthropic Messages API.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    url: String,
}

impl AnthropicProvider {
    pub fn new(client: reqwest::Client, settings: &ProviderSettings) -> Self {
        Self {
            client,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            url: format!("{}/v1/messages", settings.base_url.trim_end_matches('/')),
        }
    }
}

fn parse_event(event: &SseEvent) -> Result<Frame, ProviderError> {
    let parsed: StreamEvent = serde_json::from_str(&event.data)?;
    Ok(match parsed {
        StreamEvent::ContentBlockDelta {
            delta: Delta::TextDelta { text },
        } => Frame::Text(text),
        StreamEvent::MessageStop => Frame::Stop,
        StreamEvent::Error { error } => return Err(ProviderError::Upstream(error.message)),
        StreamEvent::ContentBlockDelta { .. } | StreamEvent::Other => Frame::Skip,
    })
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn stream_completion(&self, prompt: &str) -> Result<TextStream, ProviderError> {
        if !self.is_configured() {
            return Err(ProviderError::MissingCredential(NAME));
        }

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            stream: true,
        };

        log::debug!("Opening {NAME} stream with model {}", self.model);
        let request = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);
        let resp = send_checked(NAME, request).await?;

        let frames = sse::decode_stream(resp.bytes_stream())
            .map(|event| event.and_then(|e| parse_event(&e)));
        Ok(text_stream(frames))
    }
}
