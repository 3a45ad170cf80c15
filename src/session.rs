//! Page session. The browser posts every UI event together with its current
//! view and the raw `localStorage["documents"]` value. The state machine runs
//! here, and the reply carries the next view plus the effects the page has
//! to perform, in order.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::app::{handle_event, AppState, AppStatus, Command, Speaker, Tab, UiEvent};
use crate::library::{DocumentLibrary, MemoryStore, SavedDocument, DOCUMENTS_KEY};
use crate::relay::plain;
use crate::ui::markdown;

pub const SESSION_PATH: &str = "/api/session/event";

const INVALID_EVENT: &str = "イベントを解釈できません";
const EXCERPT_CHARS: usize = 100;

const GENERATING_HTML: &str = r#"<div class="pulse">生成中...</div>"#;
const EMPTY_PREVIEW_HTML: &str =
    r#"<div class="placeholder">生成されたテキストがここに表示されます</div>"#;
const EMPTY_SAVED_HTML: &str =
    r#"<div class="placeholder">保存されたドキュメントはありません</div>"#;

/// What the page shows. `saving` is not part of it: a save starts and ends
/// within one event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct View {
    pub status: AppStatus,
    pub tab: Tab,
    pub input_text: String,
    pub preview_text: String,
    pub speaking: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    #[serde(default)]
    pub view: View,
    /// Raw stored list, `None` when nothing was ever saved.
    #[serde(default)]
    pub stored: Option<String>,
    pub event: UiEvent,
}

/// Side effect the page performs after rendering the reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Effect {
    CancelSpeech,
    Speak {
        text: String,
        lang: String,
    },
    /// Write `value` under `key` in `localStorage`. On failure the page shows
    /// `failure_message` and skips the remaining effects.
    Store {
        key: String,
        value: String,
        #[serde(rename = "failureMessage")]
        failure_message: String,
    },
    StartGeneration {
        text: String,
    },
    Notice {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub view: View,
    pub can_generate: bool,
    /// Speak button: stop while speaking, start when there is something to read.
    pub can_toggle_speech: bool,
    pub can_save: bool,
    pub preview_html: String,
    pub saved_html: String,
    pub effects: Vec<Effect>,
}

/// Speaker that records requests as page effects.
#[derive(Debug, Default)]
pub struct PageSpeaker {
    effects: Vec<Effect>,
}

impl PageSpeaker {
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }
}

impl Speaker for PageSpeaker {
    fn speak(&mut self, text: &str, lang: &str) {
        self.effects.push(Effect::Speak {
            text: text.to_string(),
            lang: lang.to_string(),
        });
    }

    fn cancel(&mut self) {
        self.effects.push(Effect::CancelSpeech);
    }
}

fn preview_html(state: &AppState<MemoryStore, PageSpeaker>) -> String {
    if state.status == AppStatus::Generating {
        GENERATING_HTML.to_string()
    } else if state.preview_text.is_empty() {
        EMPTY_PREVIEW_HTML.to_string()
    } else {
        markdown::to_html(&state.preview_text)
    }
}

fn excerpt(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Saved list, oldest first. The page localizes each `<time>`.
fn saved_html(documents: &[SavedDocument]) -> String {
    if documents.is_empty() {
        return EMPTY_SAVED_HTML.to_string();
    }
    let mut items = String::new();
    for (index, doc) in documents.iter().enumerate() {
        let saved_at = doc.saved_at.to_rfc3339();
        let title = markdown::escape(&excerpt(&doc.input_text));
        items.push_str(&format!(r#"<li data-index="{index}">"#));
        items.push_str(&format!(r#"<time datetime="{saved_at}">{saved_at}</time>"#));
        items.push_str(&format!("<div>{title}</div></li>"));
    }
    format!("<ol>{items}</ol>")
}

/// Run one page event.
pub fn apply(request: EventRequest) -> EventResponse {
    let EventRequest {
        view,
        stored,
        event,
    } = request;

    let store = match stored.as_deref() {
        Some(raw) => MemoryStore::with_entry(DOCUMENTS_KEY, raw),
        None => MemoryStore::new(),
    };
    let mut state = AppState::new(DocumentLibrary::new(store), PageSpeaker::default());
    state.status = view.status;
    state.tab = view.tab;
    state.input_text = view.input_text;
    state.preview_text = view.preview_text;
    state.speaking = view.speaking;

    let command = handle_event(&mut state, event);

    let mut effects = state.speaker().effects().to_vec();
    match state.library().raw() {
        Ok(Some(value)) if stored.as_deref() != Some(value.as_str()) => {
            effects.push(Effect::Store {
                key: DOCUMENTS_KEY.to_string(),
                value,
                failure_message: crate::app::Notice::SaveFailed.message().to_string(),
            });
        }
        Ok(_) => {}
        Err(e) => log::warn!("Failed to read page storage: {e}"),
    }
    if let Some(Command::StartGeneration(text)) = command {
        effects.push(Effect::StartGeneration { text });
    }
    if let Some(notice) = state.take_notice() {
        effects.push(Effect::Notice {
            message: notice.message().to_string(),
        });
    }

    EventResponse {
        can_generate: state.can_generate(),
        can_toggle_speech: state.speaking || state.can_speak(),
        can_save: state.can_save(),
        preview_html: preview_html(&state),
        saved_html: saved_html(&state.documents),
        view: View {
            status: state.status,
            tab: state.tab,
            input_text: state.input_text,
            preview_text: state.preview_text,
            speaking: state.speaking,
        },
        effects,
    }
}

pub async fn event(payload: Result<Json<EventRequest>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(request)) => Json(apply(request)).into_response(),
        Err(rejection) => {
            log::warn!("Rejected page event: {rejection}");
            plain(StatusCode::BAD_REQUEST, INVALID_EVENT)
        }
    }
}
