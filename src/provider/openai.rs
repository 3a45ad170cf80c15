use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use super::sse::{self, SseEvent};
use super::{send_checked, text_stream, CompletionProvider, Frame, ProviderError, TextStream};
use crate::config::ProviderSettings;

const NAME: &str = "openai";
const DONE: &str = "[DONE]";

/// Chat Completions request types
#[derive(Serialize)]
struct ChatRequest<'a> {
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

/// Streaming chunk types
#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    delta: ChoiceDelta,
}

#[derive(Deserialize, Default)]
struct ChoiceDelta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

/// Streams completions from the OpenAI Chat Completions API.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    url: String,
}

impl OpenAiProvider {
    pub fn new(client: reqwest::Client, settings: &ProviderSettings) -> Self {
        Self {
            client,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            url: format!(
                "{}/v1/chat/completions",
                settings.base_url.trim_end_matches('/')
            ),
        }
    }
}

fn parse_event(event: &SseEvent) -> Result<Frame, ProviderError> {
    if event.data.trim() == DONE {
        return Ok(Frame::Stop);
    }
    let chunk: ChatChunk = serde_json::from_str(&event.data)?;
    if let Some(error) = chunk.error {
        return Err(ProviderError::Upstream(error.message));
    }
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .map(Frame::Text)
        .unwrap_or(Frame::Skip))
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
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

        let body = ChatRequest {
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
            .bearer_auth(&self.api_key)
            .json(&body);
        let resp = send_checked(NAME, request).await?;

        let frames = sse::decode_stream(resp.bytes_stream())
            .map(|event| event.and_then(|e| parse_event(&e)));
        Ok(text_stream(frames))
    }
}
