//! Read-aloud assistant: a relay that streams LLM rewrites of technical
//! documents into speech-friendly Japanese, plus the presentation model and
//! document library used by the browser shell.

pub mod app;
pub mod config;
pub mod library;
pub mod prompt;
pub mod provider;
pub mod relay;
pub mod session;
pub mod ui;
