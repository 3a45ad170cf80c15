use serde::{Deserialize, Serialize};

use crate::library::{DocumentLibrary, KeyValueStore, SavedDocument};

use super::speech::Speaker;

/// Events from the user and from the generation task. On the wire they are
/// `{"type": "chunkReceived", "value": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum UiEvent {
    InputChanged(String),
    TabSelected(Tab),
    GenerateRequested,
    ChunkReceived(String),
    StreamFinished,
    StreamFailed(String),
    SaveRequested,
    LoadRequested(usize),
    SpeakToggled,
    SpeechEnded,
}

/// Generation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppStatus {
    #[default]
    Idle,
    /// Request open, nothing received yet.
    Generating,
    Streaming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Input,
    Preview,
    Saved,
}

/// Blocking message for the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Saved,
    SaveFailed,
    GenerationFailed,
}

impl Notice {
    pub fn message(self) -> &'static str {
        match self {
            Notice::Saved => "ドキュメントを保存しました",
            Notice::SaveFailed => "保存に失敗しました",
            Notice::GenerationFailed => "テキストの生成に失敗しました",
        }
    }
}

/// Work the host must start in response to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartGeneration(String),
}

/// Presentation state. One instance per page; single-threaded.
pub struct AppState<S, P> {
    pub status: AppStatus,
    pub tab: Tab,
    pub input_text: String,
    pub preview_text: String,
    pub saving: bool,
    pub speaking: bool,
    pub documents: Vec<SavedDocument>,
    pub notice: Option<Notice>,

    pub(super) library: DocumentLibrary<S>,
    pub(super) speaker: P,
}

impl<S: KeyValueStore, P: Speaker> AppState<S, P> {
    pub fn new(library: DocumentLibrary<S>, speaker: P) -> Self {
        let documents = library.load().unwrap_or_else(|e| {
            log::warn!("Failed to load saved documents: {e}");
            Vec::new()
        });

        Self {
            status: AppStatus::Idle,
            tab: Tab::Input,
            input_text: String::new(),
            preview_text: String::new(),
            saving: false,
            speaking: false,
            documents,
            notice: None,
            library,
            speaker,
        }
    }

    pub fn can_generate(&self) -> bool {
        self.status == AppStatus::Idle && !self.input_text.is_empty()
    }

    pub fn can_speak(&self) -> bool {
        self.status == AppStatus::Idle && !self.preview_text.is_empty()
    }

    pub fn can_save(&self) -> bool {
        !self.saving && !self.input_text.is_empty() && !self.preview_text.is_empty()
    }

    /// Take the pending notice, if any.
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    pub fn speaker(&self) -> &P {
        &self.speaker
    }

    pub fn library(&self) -> &DocumentLibrary<S> {
        &self.library
    }
}
