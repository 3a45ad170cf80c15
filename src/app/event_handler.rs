use crate::library::{KeyValueStore, SavedDocument};

use super::speech::{Speaker, SPEECH_LANG};
use super::state::{AppState, AppStatus, Command, Notice, Tab, UiEvent};

/// Handle a UI event. This is the core state machine.
pub fn handle_event<S, P>(state: &mut AppState<S, P>, event: UiEvent) -> Option<Command>
where
    S: KeyValueStore,
    P: Speaker,
{
    match event {
        UiEvent::InputChanged(text) => {
            state.input_text = text;
        }
        UiEvent::TabSelected(tab) => {
            state.tab = tab;
        }
        UiEvent::GenerateRequested => {
            if !state.can_generate() {
                log::debug!("Ignoring generate while status={:?}", state.status);
                return None;
            }
            // The preview being read is about to be replaced.
            if state.speaking {
                state.speaker.cancel();
                state.speaking = false;
            }
            state.preview_text.clear();
            state.tab = Tab::Preview;
            state.status = AppStatus::Generating;
            return Some(Command::StartGeneration(state.input_text.clone()));
        }
        UiEvent::ChunkReceived(chunk) => {
            if state.status == AppStatus::Idle {
                log::warn!("Dropping chunk received while idle");
                return None;
            }
            state.status = AppStatus::Streaming;
            state.preview_text.push_str(&chunk);
        }
        UiEvent::StreamFinished => {
            let chars = state.preview_text.chars().count();
            log::info!("Generation finished ({chars} chars)");
            state.status = AppStatus::Idle;
        }
        UiEvent::StreamFailed(err) => {
            log::error!("Generation failed: {err}");
            state.status = AppStatus::Idle;
            state.notice = Some(Notice::GenerationFailed);
        }
        UiEvent::SaveRequested => save_document(state),
        UiEvent::LoadRequested(index) => match state.documents.get(index) {
            Some(doc) => {
                state.input_text = doc.input_text.clone();
                state.preview_text = doc.generated_text.clone();
                state.tab = Tab::Input;
            }
            None => log::warn!("No saved document at index {index}"),
        },
        UiEvent::SpeakToggled => {
            if state.speaking {
                state.speaker.cancel();
                state.speaking = false;
            } else if state.can_speak() {
                // One utterance at a time.
                state.speaker.cancel();
                state.speaker.speak(&state.preview_text, SPEECH_LANG);
                state.speaking = true;
            }
        }
        UiEvent::SpeechEnded => {
            state.speaking = false;
        }
    }
    None
}

fn save_document<S: KeyValueStore, P: Speaker>(state: &mut AppState<S, P>) {
    if !state.can_save() {
        return;
    }

    state.saving = true;
    let document = SavedDocument::new(&state.input_text, &state.preview_text);
    match state.library.append(document) {
        Ok(documents) => {
            state.documents = documents;
            state.notice = Some(Notice::Saved);
        }
        Err(e) => {
            log::error!("Failed to save document: {e}");
            state.notice = Some(Notice::SaveFailed);
        }
    }
    state.saving = false;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{DocumentLibrary, LibraryError, MemoryStore};
    use chrono::Utc;

    #[derive(Debug, Default)]
    struct RecordingSpeaker {
        spoken: Vec<(String, String)>,
        cancels: usize,
    }

    impl Speaker for RecordingSpeaker {
        fn speak(&mut self, text: &str, lang: &str) {
            self.spoken.push((text.to_string(), lang.to_string()));
        }

        fn cancel(&mut self) {
            self.cancels += 1;
        }
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, LibraryError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), LibraryError> {
            Err(LibraryError::Unavailable("quota exceeded".into()))
        }
    }

    fn new_state() -> AppState<MemoryStore, RecordingSpeaker> {
        AppState::new(
            DocumentLibrary::new(MemoryStore::new()),
            RecordingSpeaker::default(),
        )
    }

    fn generate(
        state: &mut AppState<MemoryStore, RecordingSpeaker>,
        input: &str,
        chunks: &[&str],
    ) {
        handle_event(state, UiEvent::InputChanged(input.into()));
        handle_event(state, UiEvent::GenerateRequested);
        for chunk in chunks {
            handle_event(state, UiEvent::ChunkReceived(chunk.to_string()));
        }
        handle_event(state, UiEvent::StreamFinished);
    }

    #[test]
    fn test_generate_requires_input() {
        let mut state = new_state();
        assert!(!state.can_generate());
        assert_eq!(handle_event(&mut state, UiEvent::GenerateRequested), None);
        assert_eq!(state.status, AppStatus::Idle);
    }

    #[test]
    fn test_generation_lifecycle() {
        let mut state = new_state();
        state.preview_text = "old".into();
        handle_event(&mut state, UiEvent::InputChanged("# 見出し".into()));

        let cmd = handle_event(&mut state, UiEvent::GenerateRequested);
        assert_eq!(cmd, Some(Command::StartGeneration("# 見出し".into())));
        assert_eq!(state.status, AppStatus::Generating);
        assert_eq!(state.tab, Tab::Preview);
        assert!(state.preview_text.is_empty());
        assert!(!state.can_generate());
        assert!(!state.can_speak());

        // Second click while busy is ignored.
        assert_eq!(handle_event(&mut state, UiEvent::GenerateRequested), None);

        handle_event(&mut state, UiEvent::ChunkReceived("# 見".into()));
        assert_eq!(state.status, AppStatus::Streaming);
        handle_event(&mut state, UiEvent::ChunkReceived("出し".into()));
        handle_event(&mut state, UiEvent::StreamFinished);

        assert_eq!(state.status, AppStatus::Idle);
        assert_eq!(state.preview_text, "# 見出し");
        assert!(state.take_notice().is_none());
    }

    #[test]
    fn test_failure_keeps_partial_output() {
        let mut state = new_state();
        handle_event(&mut state, UiEvent::InputChanged("doc".into()));
        handle_event(&mut state, UiEvent::GenerateRequested);
        handle_event(&mut state, UiEvent::ChunkReceived("part".into()));
        handle_event(&mut state, UiEvent::StreamFailed("reset".into()));

        assert_eq!(state.status, AppStatus::Idle);
        assert_eq!(state.preview_text, "part");
        assert_eq!(state.take_notice(), Some(Notice::GenerationFailed));
        assert_eq!(Notice::GenerationFailed.message(), "テキストの生成に失敗しました");
    }

    #[test]
    fn test_chunk_while_idle_is_dropped() {
        let mut state = new_state();
        handle_event(&mut state, UiEvent::ChunkReceived("stray".into()));
        assert!(state.preview_text.is_empty());
        assert_eq!(state.status, AppStatus::Idle);
    }

    #[test]
    fn test_save_appends_exactly_one_record() {
        let mut state = new_state();
        generate(&mut state, "入力", &["出力"]);

        let before = Utc::now();
        handle_event(&mut state, UiEvent::SaveRequested);

        assert!(!state.saving);
        assert_eq!(state.take_notice(), Some(Notice::Saved));
        let stored = state.library.load().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].input_text, "入力");
        assert_eq!(stored[0].generated_text, "出力");
        assert!(stored[0].saved_at >= before);
        assert_eq!(state.documents, stored);
    }

    #[test]
    fn test_save_requires_both_texts() {
        let mut state = new_state();
        handle_event(&mut state, UiEvent::InputChanged("only input".into()));
        assert!(!state.can_save());
        handle_event(&mut state, UiEvent::SaveRequested);
        assert!(state.library.load().unwrap().is_empty());
        assert!(state.take_notice().is_none());
    }

    #[test]
    fn test_duplicate_saves_are_kept() {
        let mut state = new_state();
        generate(&mut state, "a", &["b"]);
        handle_event(&mut state, UiEvent::SaveRequested);
        handle_event(&mut state, UiEvent::SaveRequested);
        assert_eq!(state.documents.len(), 2);
    }

    #[test]
    fn test_storage_failure_is_reported_and_abandoned() {
        let mut state = AppState::new(
            DocumentLibrary::new(BrokenStore),
            RecordingSpeaker::default(),
        );
        state.input_text = "a".into();
        state.preview_text = "b".into();

        handle_event(&mut state, UiEvent::SaveRequested);
        assert!(!state.saving);
        assert!(state.documents.is_empty());
        assert_eq!(state.take_notice(), Some(Notice::SaveFailed));
    }

    #[test]
    fn test_load_restores_input() {
        let mut state = new_state();
        generate(&mut state, "first", &["FIRST"]);
        handle_event(&mut state, UiEvent::SaveRequested);
        generate(&mut state, "second", &["SECOND"]);
        handle_event(&mut state, UiEvent::TabSelected(Tab::Saved));

        handle_event(&mut state, UiEvent::LoadRequested(0));
        assert_eq!(state.input_text, "first");
        assert_eq!(state.preview_text, "FIRST");
        assert_eq!(state.tab, Tab::Input);

        handle_event(&mut state, UiEvent::LoadRequested(9));
        assert_eq!(state.input_text, "first");
    }

    #[test]
    fn test_documents_survive_reload() {
        let store = MemoryStore::with_entry(
            crate::library::DOCUMENTS_KEY,
            r#"[{"inputText":"x","generatedText":"y","savedAt":"2024-03-01T09:30:00Z"}]"#,
        );
        let mut state = AppState::new(DocumentLibrary::new(store), RecordingSpeaker::default());
        assert_eq!(state.documents.len(), 1);
        handle_event(&mut state, UiEvent::LoadRequested(0));
        assert_eq!(state.input_text, "x");
    }

    #[test]
    fn test_speak_toggle() {
        let mut state = new_state();
        handle_event(&mut state, UiEvent::SpeakToggled);
        assert!(!state.speaking, "nothing to speak yet");

        generate(&mut state, "in", &["読み上げ"]);
        handle_event(&mut state, UiEvent::SpeakToggled);
        assert!(state.speaking);
        assert_eq!(
            state.speaker().spoken,
            vec![("読み上げ".to_string(), "ja-JP".to_string())]
        );

        handle_event(&mut state, UiEvent::SpeakToggled);
        assert!(!state.speaking);
        assert_eq!(state.speaker().spoken.len(), 1);
        assert_eq!(state.speaker().cancels, 2);
    }

    #[test]
    fn test_speech_ended_clears_flag() {
        let mut state = new_state();
        generate(&mut state, "in", &["out"]);
        handle_event(&mut state, UiEvent::SpeakToggled);
        handle_event(&mut state, UiEvent::SpeechEnded);
        assert!(!state.speaking);
    }

    #[test]
    fn test_cannot_speak_while_generating() {
        let mut state = new_state();
        generate(&mut state, "in", &["out"]);
        handle_event(&mut state, UiEvent::GenerateRequested);
        handle_event(&mut state, UiEvent::ChunkReceived("x".into()));
        handle_event(&mut state, UiEvent::SpeakToggled);
        assert!(!state.speaking);
        assert!(state.speaker().spoken.is_empty());
    }

    #[test]
    fn test_generate_stops_speech_of_old_preview() {
        let mut state = new_state();
        generate(&mut state, "in", &["古いプレビュー"]);
        handle_event(&mut state, UiEvent::SpeakToggled);
        assert!(state.speaking);
        let cancels = state.speaker().cancels;

        let cmd = handle_event(&mut state, UiEvent::GenerateRequested);
        assert_eq!(cmd, Some(Command::StartGeneration("in".into())));
        assert!(!state.speaking);
        assert_eq!(state.speaker().cancels, cancels + 1);
        assert_eq!(state.speaker().spoken.len(), 1);
    }

    #[test]
    fn test_generate_while_silent_does_not_cancel() {
        let mut state = new_state();
        handle_event(&mut state, UiEvent::InputChanged("in".into()));
        handle_event(&mut state, UiEvent::GenerateRequested);
        assert_eq!(state.speaker().cancels, 0);
    }
}
