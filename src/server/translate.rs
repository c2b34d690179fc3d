use tracing::warn;

use crate::highlight;
use crate::languages::Tone;
use crate::providers;
use crate::translations::TranslateOptions;
use crate::translator::{MAX_INPUT_CHARS, Translator};

use super::models::{SegmentPayload, ServerRequest, ServerResponse};
use super::state::ServerState;

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: axum::http::StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: axum::http::StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn gateway(message: impl Into<String>) -> Self {
        Self {
            status: axum::http::StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }
}

pub(crate) async fn translate_request(
    state: &ServerState,
    request: ServerRequest,
) -> Result<ServerResponse, ServerError> {
    let Some(text) = request.text else {
        return Err(ServerError::bad_request("text is required"));
    };
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(ServerError::bad_request("text is empty"));
    }
    let chars = text.chars().count();
    if chars > MAX_INPUT_CHARS {
        return Err(ServerError::bad_request(format!(
            "text cannot exceed {} characters (got {})",
            MAX_INPUT_CHARS, chars
        )));
    }

    let lang = request.lang.unwrap_or_else(|| "en".to_string());
    if !state.registry.is_valid_code(&lang) {
        return Err(ServerError::bad_request(format!(
            "invalid target language code '{}'",
            lang
        )));
    }
    let tone: Tone = request
        .tone
        .as_deref()
        .unwrap_or("formal")
        .parse()
        .map_err(|err: anyhow::Error| ServerError::bad_request(err.to_string()))?;

    let selection =
        providers::resolve_provider_selection(request.model.as_deref(), request.key.as_deref())
            .map_err(|err| ServerError::bad_request(err.to_string()))?;
    let key = providers::resolve_key(selection.provider, request.key.as_deref())
        .map_err(|err| ServerError::bad_request(err.to_string()))?;
    let provider = providers::build_provider(selection.provider, key, selection.requested_model);
    let translator = Translator::new(provider, state.settings.clone());

    let options = TranslateOptions { lang, tone };
    let execution = translator.exec(&text, options).await.map_err(|err| {
        warn!(error = %err, "gateway translation failed");
        ServerError::gateway("translation failed")
    })?;

    let segments = highlight::highlight(&execution.result.translation, &execution.result.idioms)
        .into_iter()
        .map(SegmentPayload::from)
        .collect();

    Ok(ServerResponse {
        translation: execution.result.translation,
        idioms: execution.result.idioms,
        alternative_translations: execution.result.alternative_translations,
        segments,
        model: execution.model,
        usage: execution.usage,
    })
}
