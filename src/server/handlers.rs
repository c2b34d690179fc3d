use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

use crate::languages::Tone;
use crate::settings;
use crate::translator::MAX_INPUT_CHARS;

use super::models::{ErrorResponse, ServerRequest, ServerResponse};
use super::state::ServerState;
use super::translate::translate_request;

pub async fn run_server(settings: settings::Settings, addr: String) -> Result<()> {
    let state = Arc::new(ServerState {
        settings,
        registry: crate::languages::LanguageRegistry::load()?,
    });
    let app = Router::new()
        .route("/health", get(health))
        .route("/translate", post(translate))
        .route("/settings", get(settings_info))
        .with_state(state)
        .layer(axum::middleware::from_fn(cors_middleware));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| "failed to bind server address")?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type,authorization"),
    );
}

async fn translate(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<ServerRequest>,
) -> Result<Json<ServerResponse>, (StatusCode, Json<ErrorResponse>)> {
    match translate_request(state.as_ref(), payload).await {
        Ok(response) => Ok(Json(response)),
        Err(err) => Err((err.status, Json(ErrorResponse { error: err.message }))),
    }
}

#[derive(serde::Serialize)]
struct SettingsInfo {
    languages: Vec<SelectOption>,
    tones: Vec<SelectOption>,
    default_lang: String,
    default_tone: String,
    max_input_chars: usize,
}

#[derive(serde::Serialize)]
struct SelectOption {
    value: String,
    label: String,
}

async fn settings_info(State(state): State<Arc<ServerState>>) -> Json<SettingsInfo> {
    let languages = state
        .settings
        .system_languages
        .iter()
        .map(|code| SelectOption {
            value: code.clone(),
            label: state
                .registry
                .label(code)
                .unwrap_or(code.as_str())
                .to_string(),
        })
        .collect();
    let tones = Tone::all()
        .into_iter()
        .map(|tone| SelectOption {
            value: tone.as_str().to_string(),
            label: tone.label().to_string(),
        })
        .collect();
    Json(SettingsInfo {
        languages,
        tones,
        default_lang: "en".to_string(),
        default_tone: "formal".to_string(),
        max_input_chars: MAX_INPUT_CHARS,
    })
}
