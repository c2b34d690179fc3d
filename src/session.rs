use anyhow::{Result, anyhow};
use tracing::warn;

use crate::highlight::{self, HighlightSegment};
use crate::languages::LanguageRegistry;
use crate::providers::Provider;
use crate::speech::{PlaybackController, PlaybackState, SpeechPlatform};
use crate::translations::{TranslateOptions, TranslationResult};
use crate::translator::Translator;

/// The generic message shown for any failed request; the underlying cause is
/// logged, never surfaced.
pub const REQUEST_FAILED_MESSAGE: &str =
    "Translation failed. Please check your input or try again later.";

/// One page worth of state: the current result, the last user-facing error,
/// and spoken playback. Each submission supersedes the previous result
/// wholesale; exclusive `&mut` access keeps submissions strictly sequential.
pub struct Session<S: SpeechPlatform> {
    registry: LanguageRegistry,
    playback: PlaybackController<S>,
    result: Option<TranslationResult>,
    error: Option<String>,
    last_lang: Option<String>,
}

impl<S: SpeechPlatform> Session<S> {
    pub fn new(registry: LanguageRegistry, platform: S) -> Self {
        Self {
            registry,
            playback: PlaybackController::new(platform),
            result: None,
            error: None,
            last_lang: None,
        }
    }

    /// Submits one translation request through `translator`. Active playback
    /// is stopped and the previous result discarded before the gateway is
    /// called; on failure the stored error is the generic retryable message.
    pub async fn submit<P: Provider + Clone>(
        &mut self,
        translator: &Translator<P>,
        text: &str,
        options: TranslateOptions,
    ) -> Result<&TranslationResult> {
        self.playback.stop();
        self.result = None;
        self.error = None;
        self.last_lang = Some(options.lang.clone());

        match translator.exec(text, options).await {
            Ok(execution) => Ok(&*self.result.insert(execution.result)),
            Err(err) => {
                warn!(error = %err, "translation request failed");
                self.error = Some(REQUEST_FAILED_MESSAGE.to_string());
                Err(err)
            }
        }
    }

    pub fn result(&self) -> Option<&TranslationResult> {
        self.result.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Highlight segments for the current translation, empty without one.
    pub fn segments(&self) -> Vec<HighlightSegment> {
        self.result
            .as_ref()
            .map(|result| highlight::highlight(&result.translation, &result.idioms))
            .unwrap_or_default()
    }

    /// Speaks the current translation, hinting the engine with the target
    /// language of the submission that produced it.
    pub fn speak(&mut self) -> Result<()> {
        let Some(result) = &self.result else {
            return Err(anyhow!("no translation to speak"));
        };
        if !self.playback.available() {
            return Err(anyhow!("speech is not available on this system"));
        }
        self.playback
            .play(&result.translation, self.last_lang.as_deref(), &self.registry)
            .map_err(|err| anyhow!("{}", err.message()))
    }

    pub fn stop_speaking(&mut self) {
        self.playback.stop();
    }

    pub fn pump_playback(&mut self) {
        self.playback.pump();
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback.state()
    }

    pub fn speech_available(&self) -> bool {
        self.playback.available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::Tone;
    use crate::providers::{ProviderFuture, ProviderResponse, ToolSpec};
    use crate::settings::Settings;
    use crate::speech::{PlaybackError, PlaybackEvent};
    use serde_json::json;

    #[derive(Debug, Clone)]
    struct CannedProvider {
        response: std::result::Result<serde_json::Value, String>,
    }

    impl Provider for CannedProvider {
        fn append_system_input(self, _input: String) -> Self {
            self
        }

        fn append_user_input(self, _input: String) -> Self {
            self
        }

        fn register_tool(self, _tool: ToolSpec) -> Self {
            self
        }

        fn call_tool(self, _tool_name: &str) -> ProviderFuture {
            let response = self.response.clone();
            Box::pin(async move {
                match response {
                    Ok(args) => Ok(ProviderResponse {
                        args,
                        model: None,
                        usage: None,
                    }),
                    Err(message) => Err(anyhow!(message)),
                }
            })
        }
    }

    struct ScriptedSpeech;

    impl SpeechPlatform for ScriptedSpeech {
        fn available(&self) -> bool {
            true
        }

        fn speak(&mut self, _text: &str, _voice: Option<&str>) -> Result<(), PlaybackError> {
            Ok(())
        }

        fn cancel(&mut self) {}

        fn poll(&mut self) -> Option<PlaybackEvent> {
            None
        }
    }

    fn translator(
        response: std::result::Result<serde_json::Value, String>,
    ) -> Translator<CannedProvider> {
        let mut settings = Settings::default();
        for tone in Tone::all() {
            settings
                .tones
                .insert(tone.as_str().to_string(), "guidance".to_string());
        }
        Translator::new(CannedProvider { response }, settings)
    }

    fn session() -> Session<ScriptedSpeech> {
        let registry = LanguageRegistry::load().unwrap();
        Session::new(registry, ScriptedSpeech)
    }

    fn options(lang: &str) -> TranslateOptions {
        TranslateOptions {
            lang: lang.to_string(),
            tone: Tone::Formal,
        }
    }

    #[tokio::test]
    async fn submit_stores_result_and_segments() {
        let translator = translator(Ok(json!({
            "translation": "Mucha mierda esta noche",
            "idioms": ["mucha mierda"],
            "alternative_translations": ["Buena suerte esta noche"]
        })));
        let mut session = session();
        session
            .submit(&translator, "Break a leg tonight", options("es"))
            .await
            .unwrap();
        assert!(session.error_message().is_none());
        let segments = session.segments();
        assert!(segments.iter().any(|s| s.is_idiom()));
        let rejoined: String = segments.iter().map(|s| s.text()).collect();
        assert_eq!(rejoined, "Mucha mierda esta noche");
    }

    #[tokio::test]
    async fn failed_submit_sets_generic_error_and_clears_result() {
        let translator = translator(Err("boom".to_string()));
        let mut session = session();
        assert!(session.submit(&translator, "text", options("es")).await.is_err());
        assert_eq!(session.error_message(), Some(REQUEST_FAILED_MESSAGE));
        assert!(session.result().is_none());
        assert!(session.segments().is_empty());
    }

    #[tokio::test]
    async fn new_submission_stops_playback_and_replaces_result() {
        let first = translator(Ok(json!({
            "translation": "primero",
            "idioms": [],
            "alternative_translations": []
        })));
        let second = translator(Ok(json!({
            "translation": "segundo",
            "idioms": [],
            "alternative_translations": []
        })));
        let mut session = session();
        session.submit(&first, "one", options("es")).await.unwrap();
        session.speak().unwrap();
        assert_eq!(session.playback_state(), PlaybackState::Speaking);

        session.submit(&second, "two", options("es")).await.unwrap();
        assert_eq!(session.playback_state(), PlaybackState::Idle);
        assert_eq!(session.result().unwrap().translation, "segundo");
    }

    #[tokio::test]
    async fn error_is_cleared_by_the_next_successful_submission() {
        let failing = translator(Err("boom".to_string()));
        let working = translator(Ok(json!({
            "translation": "ok",
            "idioms": [],
            "alternative_translations": []
        })));
        let mut session = session();
        let _ = session.submit(&failing, "text", options("fr")).await;
        assert!(session.error_message().is_some());
        session.submit(&working, "text", options("fr")).await.unwrap();
        assert!(session.error_message().is_none());
    }

    #[tokio::test]
    async fn speak_without_result_is_an_error() {
        let mut session = session();
        assert!(session.speak().is_err());
    }
}
