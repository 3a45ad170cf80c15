//! Relay client and event loop for hosting the state machine outside the
//! browser, e.g. native front ends and end-to-end tests.

use futures_util::StreamExt;

use crate::library::KeyValueStore;
use crate::relay::{TranslateRequest, TRANSLATE_PATH};

use super::decoder::Utf8Decoder;
use super::event_handler::handle_event;
use super::speech::Speaker;
use super::state::{AppState, AppStatus, Command, UiEvent};

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("relay request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("relay returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("event channel closed")]
    ChannelClosed,
}

/// Client for the relay endpoint.
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    url: String,
}

impl RelayClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:3000`.
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            url: format!("{}{TRANSLATE_PATH}", base_url.trim_end_matches('/')),
        }
    }

    /// Stream the conversion of `text`, sending one `ChunkReceived` per
    /// decoded fragment.
    pub async fn stream_into(
        &self,
        text: &str,
        sender: &async_channel::Sender<UiEvent>,
    ) -> Result<(), GenerationError> {
        let body = TranslateRequest {
            text: Some(text.to_string()),
        };
        let resp = self.client.post(&self.url).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Status { status, body });
        }

        let mut decoder = Utf8Decoder::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let decoded = decoder.push(&chunk?);
            send_chunk(sender, decoded).await?;
        }
        send_chunk(sender, decoder.finish()).await
    }
}

async fn send_chunk(
    sender: &async_channel::Sender<UiEvent>,
    text: String,
) -> Result<(), GenerationError> {
    if text.is_empty() {
        return Ok(());
    }
    sender
        .send(UiEvent::ChunkReceived(text))
        .await
        .map_err(|_| GenerationError::ChannelClosed)
}

/// Dispatch a generation on the tokio runtime. Exactly one
/// `StreamFinished` or `StreamFailed` follows the chunks.
pub fn dispatch_generation(
    client: RelayClient,
    text: String,
    sender: async_channel::Sender<UiEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let outcome = match client.stream_into(&text, &sender).await {
            Ok(()) => UiEvent::StreamFinished,
            Err(e) => {
                log::warn!("Generation failed: {e}");
                UiEvent::StreamFailed(e.to_string())
            }
        };
        let _ = sender.send(outcome).await;
    })
}

/// Apply `event`, starting a generation if the state machine asks for one.
pub fn apply<S, P>(
    state: &mut AppState<S, P>,
    event: UiEvent,
    client: &RelayClient,
    sender: &async_channel::Sender<UiEvent>,
) -> Option<tokio::task::JoinHandle<()>>
where
    S: KeyValueStore,
    P: Speaker,
{
    match handle_event(state, event)? {
        Command::StartGeneration(text) => {
            Some(dispatch_generation(client.clone(), text, sender.clone()))
        }
    }
}

/// Feed events from `receiver` into the state machine until the current
/// generation has finished or failed.
pub async fn run_until_idle<S, P>(
    state: &mut AppState<S, P>,
    receiver: &async_channel::Receiver<UiEvent>,
) where
    S: KeyValueStore,
    P: Speaker,
{
    while state.status != AppStatus::Idle {
        match receiver.recv().await {
            Ok(event) => {
                handle_event(state, event);
            }
            Err(_) => {
                handle_event(state, UiEvent::StreamFailed("event channel closed".into()));
            }
        }
    }
}
