use std::fmt;

use tracing::warn;

use crate::languages::{self, LanguageRegistry};

mod command;

pub use command::CommandSpeech;

/// Why a started utterance failed, mirroring the vocabulary reported by
/// common speech engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackError {
    LanguageUnavailable,
    VoiceUnavailable,
    AudioBusy,
    SynthesisFailed,
    SynthesisUnavailable,
    TextTooLong,
    InvalidArgument,
    Unknown,
}

impl PlaybackError {
    pub fn from_platform(code: &str) -> Self {
        match code.trim() {
            "language-unavailable" => PlaybackError::LanguageUnavailable,
            "voice-unavailable" => PlaybackError::VoiceUnavailable,
            "audio-busy" => PlaybackError::AudioBusy,
            "synthesis-failed" => PlaybackError::SynthesisFailed,
            "synthesis-unavailable" => PlaybackError::SynthesisUnavailable,
            "text-too-long" => PlaybackError::TextTooLong,
            "invalid-argument" => PlaybackError::InvalidArgument,
            _ => PlaybackError::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackError::LanguageUnavailable => "language-unavailable",
            PlaybackError::VoiceUnavailable => "voice-unavailable",
            PlaybackError::AudioBusy => "audio-busy",
            PlaybackError::SynthesisFailed => "synthesis-failed",
            PlaybackError::SynthesisUnavailable => "synthesis-unavailable",
            PlaybackError::TextTooLong => "text-too-long",
            PlaybackError::InvalidArgument => "invalid-argument",
            PlaybackError::Unknown => "unknown",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            PlaybackError::LanguageUnavailable => {
                "The selected language is not available for speech on this system."
            }
            PlaybackError::VoiceUnavailable => {
                "No voice is available for the selected language on this system."
            }
            PlaybackError::AudioBusy => "The audio output is currently busy. Please try again.",
            PlaybackError::SynthesisFailed => "Speech synthesis failed. Please try again.",
            PlaybackError::SynthesisUnavailable => {
                "Speech synthesis is currently unavailable. Please try again later."
            }
            PlaybackError::TextTooLong => {
                "The text is too long to be spoken by the speech engine."
            }
            PlaybackError::InvalidArgument => {
                "An invalid argument was provided to the speech engine."
            }
            PlaybackError::Unknown => {
                "Could not speak the text. The selected language may not be supported, or another issue occurred."
            }
        }
    }
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Speaking,
    Error(PlaybackError),
}

/// Notification emitted by a speech platform about the current utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started,
    Finished,
    Failed(PlaybackError),
}

/// Injected speech capability. Implementations start at most one utterance
/// at a time; `cancel` must be safe to call in any state.
pub trait SpeechPlatform {
    fn available(&self) -> bool;

    /// Begins synthesizing `text`, optionally with an engine voice hint.
    /// Returns an error when synthesis cannot start.
    fn speak(&mut self, text: &str, voice: Option<&str>) -> Result<(), PlaybackError>;

    /// Stops any in-flight utterance. No-op when nothing is playing.
    fn cancel(&mut self);

    /// Drains the next pending event for the current utterance, if any.
    fn poll(&mut self) -> Option<PlaybackEvent>;
}

/// Speech platform for hosts without any engine; playback is reported as
/// unavailable up front.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSpeech;

impl SpeechPlatform for NullSpeech {
    fn available(&self) -> bool {
        false
    }

    fn speak(&mut self, _text: &str, _voice: Option<&str>) -> Result<(), PlaybackError> {
        Err(PlaybackError::SynthesisUnavailable)
    }

    fn cancel(&mut self) {}

    fn poll(&mut self) -> Option<PlaybackEvent> {
        None
    }
}

/// State machine over a [`SpeechPlatform`].
///
/// Guarantees at most one active utterance: `play` cancels any in-flight
/// utterance before starting the next. Dropping the controller cancels
/// playback and resets the state, so an owning view being torn down never
/// leaks a speaking utterance.
pub struct PlaybackController<S: SpeechPlatform> {
    platform: S,
    state: PlaybackState,
}

impl<S: SpeechPlatform> PlaybackController<S> {
    pub fn new(platform: S) -> Self {
        Self {
            platform,
            state: PlaybackState::Idle,
        }
    }

    pub fn available(&self) -> bool {
        self.platform.available()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_speaking(&self) -> bool {
        matches!(self.state, PlaybackState::Speaking)
    }

    /// Starts speaking `text`. A recognized language hint selects the engine
    /// voice; an unrecognized one is logged and the platform default is used.
    pub fn play(
        &mut self,
        text: &str,
        lang_hint: Option<&str>,
        registry: &LanguageRegistry,
    ) -> Result<(), PlaybackError> {
        if !self.platform.available() {
            self.state = PlaybackState::Error(PlaybackError::SynthesisUnavailable);
            return Err(PlaybackError::SynthesisUnavailable);
        }
        if matches!(self.state, PlaybackState::Speaking) {
            self.platform.cancel();
            self.state = PlaybackState::Idle;
        }
        let voice = resolve_voice(lang_hint, registry);
        match self.platform.speak(text, voice) {
            Ok(()) => {
                self.state = PlaybackState::Speaking;
                Ok(())
            }
            Err(err) => {
                self.state = PlaybackState::Error(err);
                Err(err)
            }
        }
    }

    /// No-op unless currently speaking.
    pub fn stop(&mut self) {
        if matches!(self.state, PlaybackState::Speaking) {
            self.platform.cancel();
            self.state = PlaybackState::Idle;
        }
    }

    /// Clears an error state back to idle. No automatic retry is performed;
    /// the next `play` is a fresh attempt.
    pub fn dismiss_error(&mut self) {
        if matches!(self.state, PlaybackState::Error(_)) {
            self.state = PlaybackState::Idle;
        }
    }

    /// Applies pending platform events to the state machine.
    pub fn pump(&mut self) {
        while let Some(event) = self.platform.poll() {
            match event {
                PlaybackEvent::Started => {
                    if matches!(self.state, PlaybackState::Idle) {
                        self.state = PlaybackState::Speaking;
                    }
                }
                PlaybackEvent::Finished => {
                    if matches!(self.state, PlaybackState::Speaking) {
                        self.state = PlaybackState::Idle;
                    }
                }
                PlaybackEvent::Failed(err) => {
                    if matches!(self.state, PlaybackState::Speaking) {
                        self.state = PlaybackState::Error(err);
                    }
                }
            }
        }
    }
}

impl<S: SpeechPlatform> Drop for PlaybackController<S> {
    fn drop(&mut self) {
        self.platform.cancel();
        self.state = PlaybackState::Idle;
    }
}

fn resolve_voice(lang_hint: Option<&str>, registry: &LanguageRegistry) -> Option<&'static str> {
    let hint = lang_hint?;
    if !registry.is_valid_code(hint) {
        warn!(lang = hint, "language hint not in registry; using platform default voice");
        return None;
    }
    match languages::speech_voice_for(hint) {
        Some(voice) => Some(voice),
        None => {
            warn!(lang = hint, "no speech voice mapping; using platform default voice");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum FakeCall {
        Speak { text: String, voice: Option<String> },
        Cancel,
    }

    #[derive(Default)]
    struct FakeSpeech {
        calls: Arc<Mutex<Vec<FakeCall>>>,
        fail_with: Option<PlaybackError>,
        events: VecDeque<PlaybackEvent>,
    }

    impl FakeSpeech {
        fn recording(calls: Arc<Mutex<Vec<FakeCall>>>) -> Self {
            Self {
                calls,
                ..Default::default()
            }
        }
    }

    impl SpeechPlatform for FakeSpeech {
        fn available(&self) -> bool {
            true
        }

        fn speak(&mut self, text: &str, voice: Option<&str>) -> Result<(), PlaybackError> {
            self.calls.lock().unwrap().push(FakeCall::Speak {
                text: text.to_string(),
                voice: voice.map(str::to_string),
            });
            match self.fail_with {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        fn cancel(&mut self) {
            self.calls.lock().unwrap().push(FakeCall::Cancel);
        }

        fn poll(&mut self) -> Option<PlaybackEvent> {
            self.events.pop_front()
        }
    }

    fn registry() -> LanguageRegistry {
        LanguageRegistry::load().unwrap()
    }

    #[test]
    fn play_transitions_idle_to_speaking_with_voice_hint() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut controller = PlaybackController::new(FakeSpeech::recording(calls.clone()));
        controller.play("hola", Some("es"), &registry()).unwrap();
        assert_eq!(controller.state(), PlaybackState::Speaking);
        assert_eq!(
            calls.lock().unwrap().as_slice(),
            &[FakeCall::Speak {
                text: "hola".to_string(),
                voice: Some("es".to_string()),
            }]
        );
    }

    #[test]
    fn unrecognized_hint_falls_back_to_default_voice() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut controller = PlaybackController::new(FakeSpeech::recording(calls.clone()));
        controller.play("text", Some("tlh"), &registry()).unwrap();
        assert_eq!(
            calls.lock().unwrap().as_slice(),
            &[FakeCall::Speak {
                text: "text".to_string(),
                voice: None,
            }]
        );
    }

    #[test]
    fn second_play_cancels_first_utterance() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut controller = PlaybackController::new(FakeSpeech::recording(calls.clone()));
        controller.play("first", None, &registry()).unwrap();
        controller.play("second", None, &registry()).unwrap();
        assert_eq!(controller.state(), PlaybackState::Speaking);
        let recorded = calls.lock().unwrap();
        assert_eq!(recorded.len(), 3);
        assert!(matches!(recorded[0], FakeCall::Speak { .. }));
        assert_eq!(recorded[1], FakeCall::Cancel);
        assert!(matches!(
            recorded[2],
            FakeCall::Speak { ref text, .. } if text == "second"
        ));
    }

    #[test]
    fn stop_while_idle_is_a_noop() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut controller = PlaybackController::new(FakeSpeech::recording(calls.clone()));
        controller.stop();
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn stop_while_speaking_cancels_and_returns_to_idle() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut controller = PlaybackController::new(FakeSpeech::recording(calls.clone()));
        controller.play("text", None, &registry()).unwrap();
        controller.stop();
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(calls.lock().unwrap().last(), Some(&FakeCall::Cancel));
    }

    #[test]
    fn voice_unavailable_failure_reports_the_missing_voice() {
        let mut platform = FakeSpeech::default();
        platform
            .events
            .push_back(PlaybackEvent::Failed(PlaybackError::VoiceUnavailable));
        let mut controller = PlaybackController::new(platform);
        controller.play("text", Some("ja"), &registry()).unwrap();
        controller.pump();
        let PlaybackState::Error(err) = controller.state() else {
            panic!("expected error state, got {:?}", controller.state());
        };
        assert_eq!(err, PlaybackError::VoiceUnavailable);
        assert!(err.message().to_lowercase().contains("voice"));
    }

    #[test]
    fn immediate_speak_failure_moves_to_error_without_retry() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut platform = FakeSpeech::recording(calls.clone());
        platform.fail_with = Some(PlaybackError::AudioBusy);
        let mut controller = PlaybackController::new(platform);
        let err = controller.play("text", None, &registry()).unwrap_err();
        assert_eq!(err, PlaybackError::AudioBusy);
        assert_eq!(controller.state(), PlaybackState::Error(PlaybackError::AudioBusy));
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn error_can_be_dismissed_and_retried() {
        let mut platform = FakeSpeech::default();
        platform
            .events
            .push_back(PlaybackEvent::Failed(PlaybackError::SynthesisFailed));
        let mut controller = PlaybackController::new(platform);
        controller.play("text", None, &registry()).unwrap();
        controller.pump();
        assert!(matches!(controller.state(), PlaybackState::Error(_)));
        controller.dismiss_error();
        assert_eq!(controller.state(), PlaybackState::Idle);
        controller.play("again", None, &registry()).unwrap();
        assert_eq!(controller.state(), PlaybackState::Speaking);
    }

    #[test]
    fn natural_completion_returns_to_idle() {
        let mut platform = FakeSpeech::default();
        platform.events.push_back(PlaybackEvent::Finished);
        let mut controller = PlaybackController::new(platform);
        controller.play("text", None, &registry()).unwrap();
        controller.pump();
        assert_eq!(controller.state(), PlaybackState::Idle);
    }

    #[test]
    fn drop_while_speaking_cancels_the_utterance() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        {
            let mut controller = PlaybackController::new(FakeSpeech::recording(calls.clone()));
            controller.play("text", None, &registry()).unwrap();
        }
        assert_eq!(calls.lock().unwrap().last(), Some(&FakeCall::Cancel));
    }

    #[test]
    fn unavailable_platform_rejects_play_up_front() {
        let mut controller = PlaybackController::new(NullSpeech);
        assert!(!controller.available());
        let err = controller.play("text", None, &registry()).unwrap_err();
        assert_eq!(err, PlaybackError::SynthesisUnavailable);
    }
}
