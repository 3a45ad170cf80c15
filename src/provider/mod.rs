//! Hosted text-generation providers behind one streaming interface.
//!
//! The relay only sees [`CompletionProvider`]; swapping vendors means building
//! a different implementation in [`from_settings`].

mod anthropic;
mod openai;
pub mod sse;

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future;
use futures_util::{Stream, StreamExt};

use crate::config::{ProviderKind, ProviderSettings};

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

/// Ordered stream of generated text fragments.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("no API key configured for {0}")]
    MissingCredential(&'static str),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{provider} API error {status}: {body}")]
    Status {
        provider: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed stream event: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("upstream error: {0}")]
    Upstream(String),
}

/// Capability: stream a text completion for a fully rendered prompt.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short identifier, e.g. `"anthropic"`.
    fn name(&self) -> &'static str;

    /// Whether a credential is present. Calls fail at request time otherwise.
    fn is_configured(&self) -> bool;

    async fn stream_completion(&self, prompt: &str) -> Result<TextStream, ProviderError>;
}

/// Build the provider selected in the configuration.
pub fn from_settings(
    settings: &ProviderSettings,
    client: reqwest::Client,
) -> Arc<dyn CompletionProvider> {
    match settings.kind {
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(client, settings)),
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(client, settings)),
    }
}

/// One decoded upstream event.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Frame {
    Text(String),
    Stop,
    Skip,
}

/// Send `request` and fail with the upstream body on a non-2xx status.
pub(crate) async fn send_checked(
    provider: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, ProviderError> {
    let resp = request.send().await?;
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            provider,
            status,
            body,
        });
    }
    Ok(resp)
}

/// Turn decoded frames into text fragments, ending at the first `Stop`.
pub(crate) fn text_stream<S>(frames: S) -> TextStream
where
    S: Stream<Item = Result<Frame, ProviderError>> + Send + 'static,
{
    let stream = frames
        .take_while(|frame| future::ready(!matches!(frame, Ok(Frame::Stop))))
        .filter_map(|frame| {
            future::ready(match frame {
                Ok(Frame::Text(text)) if !text.is_empty() => Some(Ok(text)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
        });
    Box::pin(stream)
}
