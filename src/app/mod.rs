mod decoder;
mod event_handler;
mod pipeline;
mod speech;
mod state;

pub use decoder::Utf8Decoder;
pub use event_handler::handle_event;
pub use pipeline::{apply, dispatch_generation, run_until_idle, GenerationError, RelayClient};
pub use speech::{Speaker, SPEECH_LANG};
pub use state::{AppState, AppStatus, Command, Notice, Tab, UiEvent};
