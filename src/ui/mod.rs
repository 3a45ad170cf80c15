//! Browser shell. One static page that binds the DOM to the page session
//! endpoint and performs its effects: the relay stream, `localStorage`
//! (key `documents`) and `speechSynthesis`.

pub mod markdown;

use axum::response::Html;

const INDEX_HTML: &str = include_str!("index.html");

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
