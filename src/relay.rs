//! HTTP relay: forwards a document to the provider and streams the
//! converted text back as chunked plain text. Also serves the page and
//! mounts the page session.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::prompt;
use crate::provider::CompletionProvider;
use crate::{session, ui};

pub const TRANSLATE_PATH: &str = "/api/translate";

const MISSING_TEXT: &str = "テキストが提供されていません";
const TRANSLATION_FAILED: &str = "翻訳処理中にエラーが発生しました";
const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// Body of `POST /api/translate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslateRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub provider: &'static str,
    pub credential_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Shared across handlers.
#[derive(Clone)]
pub struct RelayState {
    pub provider: Arc<dyn CompletionProvider>,
}

impl RelayState {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }
}

pub(crate) fn plain(status: StatusCode, message: &'static str) -> Response {
    (status, [(header::CONTENT_TYPE, PLAIN_TEXT)], message).into_response()
}

pub async fn translate(
    State(state): State<RelayState>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> Response {
    let text = match payload {
        Ok(Json(TranslateRequest { text: Some(text) })) if !text.is_empty() => text,
        Ok(_) => return plain(StatusCode::BAD_REQUEST, MISSING_TEXT),
        Err(rejection) => {
            log::warn!("Rejected translate request: {rejection}");
            return plain(StatusCode::BAD_REQUEST, MISSING_TEXT);
        }
    };

    let provider = state.provider.name();
    log::info!("Translating {} chars via {provider}", text.chars().count());

    let mut upstream = match state.provider.stream_completion(&prompt::render(&text)).await {
        Ok(upstream) => upstream,
        Err(e) => {
            log::error!("Translation error: {e}");
            return plain(StatusCode::INTERNAL_SERVER_ERROR, TRANSLATION_FAILED);
        }
    };

    // Wait for the first fragment so early failures still get a 500.
    let first = match upstream.next().await {
        Some(Ok(fragment)) => Some(fragment),
        Some(Err(e)) => {
            log::error!("Translation error: {e}");
            return plain(StatusCode::INTERNAL_SERVER_ERROR, TRANSLATION_FAILED);
        }
        None => None,
    };

    let rest = upstream.inspect(|item| {
        if let Err(e) = item {
            log::error!("Translation stream aborted: {e}");
        }
    });
    let body = stream::iter(first.map(Ok)).chain(rest);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, PLAIN_TEXT)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(body))
        .unwrap_or_else(|_| plain(StatusCode::INTERNAL_SERVER_ERROR, TRANSLATION_FAILED))
}

pub async fn status(State(state): State<RelayState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        provider: state.provider.name(),
        credential_configured: state.provider.is_configured(),
    })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/", get(ui::index))
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route(TRANSLATE_PATH, post(translate))
        .route(session::SESSION_PATH, post(session::event))
        .layer(CorsLayer::permissive())
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use super::testing::{Script, ScriptedProvider};
    use super::*;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app(script: Script) -> (Router, Arc<ScriptedProvider>) {
        let provider = Arc::new(ScriptedProvider::new(script));
        (router(RelayState::new(provider.clone())), provider)
    }

    fn translate_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(TRANSLATE_PATH)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(resp: Response) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_streams_fragments_in_order() {
        let fragments = vec!["# Title\n", "このコード", "ブロックでは"];
        let (app, provider) = app(Script::Fragments(fragments));
        let resp = app
            .oneshot(translate_request(r##"{"text":"# Title"}"##))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], PLAIN_TEXT);
        assert_eq!(body_text(resp).await, "# Title\nこのコードブロックでは");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_document_is_sent_inside_prompt() {
        let doc = "# Title\n```js\nconst x=1;\n```";
        let (app, provider) = app(Script::Fragments(vec!["ok"]));
        let body = serde_json::json!({ "text": doc }).to_string();
        let resp = app.oneshot(translate_request(&body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let prompt = provider.last_prompt.lock().unwrap().clone().unwrap();
        assert_eq!(prompt, crate::prompt::render(doc));
    }

    #[tokio::test]
    async fn test_empty_or_missing_text_is_rejected_without_calling_provider() {
        for body in [r#"{"text":""}"#, "{}", r#"{"text":null}"#, "not json"] {
            let (app, provider) = app(Script::Fragments(vec!["unused"]));
            let resp = app.oneshot(translate_request(body)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(body_text(resp).await, MISSING_TEXT);
            assert_eq!(provider.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_provider_refusal_is_500() {
        let (app, _) = app(Script::Refuse);
        let resp = app
            .oneshot(translate_request(r#"{"text":"doc"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(resp).await, TRANSLATION_FAILED);
    }

    #[tokio::test]
    async fn test_failure_before_first_fragment_is_500() {
        let (app, _) = app(Script::FailAfter(vec![]));
        let resp = app
            .oneshot(translate_request(r#"{"text":"doc"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_failure_mid_stream_aborts_body() {
        let (app, _) = app(Script::FailAfter(vec!["partial"]));
        let resp = app
            .oneshot(translate_request(r#"{"text":"doc"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.into_body().collect().await.is_err());
    }

    #[tokio::test]
    async fn test_status_reports_provider() {
        let (app, _) = app(Script::Refuse);
        let resp = app
            .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(json["provider"], "scripted");
        assert_eq!(json["credentialConfigured"], true);
    }

    #[tokio::test]
    async fn test_health_is_ok() {
        let (app, provider) = app(Script::Refuse);
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "ok" }));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_index_page_is_served() {
        let (app, _) = app(Script::Refuse);
        let resp = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let page = body_text(resp).await;
        assert!(page.contains(TRANSLATE_PATH));
        assert!(page.contains(session::SESSION_PATH));
    }

    #[tokio::test]
    async fn test_session_route_runs_state_machine() {
        let (app, provider) = app(Script::Refuse);
        let body = serde_json::json!({
            "view": { "inputText": "doc" },
            "event": { "type": "generateRequested" },
        });
        let resp = app
            .oneshot(
                Request::post(session::SESSION_PATH)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(json["view"]["status"], "generating");
        assert_eq!(json["effects"][0]["type"], "startGeneration");
        assert_eq!(json["effects"][0]["text"], "doc");
        // The page opens the relay stream itself.
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_session_route_rejects_unknown_event() {
        let (app, _) = app(Script::Refuse);
        let resp = app
            .oneshot(
                Request::post(session::SESSION_PATH)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"event":{"type":"reboot"}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
