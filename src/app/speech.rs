/// Language tag used for every utterance.
pub const SPEECH_LANG: &str = "ja-JP";

/// Platform speech synthesis. In the browser this is `speechSynthesis`,
/// reached through [`PageSpeaker`](crate::session::PageSpeaker) effects.
///
/// Playback is fire-and-forget; the host reports the end of an utterance
/// with [`UiEvent::SpeechEnded`](super::UiEvent::SpeechEnded).
pub trait Speaker {
    fn speak(&mut self, text: &str, lang: &str);
    /// Drop the current utterance and anything queued behind it.
    fn cancel(&mut self);
}
