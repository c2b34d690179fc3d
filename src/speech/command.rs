use std::process::{Child, Command, Stdio};

use tracing::debug;

use super::{PlaybackError, PlaybackEvent, SpeechPlatform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Engine {
    Say,
    Espeak,
}

/// Speech platform backed by the host's command-line engine: macOS `say` or
/// Linux `espeak`. The spawned process is the utterance; killing it is the
/// cancellation.
pub struct CommandSpeech {
    engine: Option<Engine>,
    child: Option<Child>,
}

impl CommandSpeech {
    /// Picks the first engine found on the host.
    pub fn detect() -> Self {
        Self {
            engine: detect_engine(None),
            child: None,
        }
    }

    /// Honors the configured engine preference: `say`, `espeak`, `off`, or
    /// `auto` for detection.
    pub fn with_preference(preference: &str) -> Self {
        Self {
            engine: detect_engine(Some(preference)),
            child: None,
        }
    }
}

impl SpeechPlatform for CommandSpeech {
    fn available(&self) -> bool {
        self.engine.is_some()
    }

    fn speak(&mut self, text: &str, voice: Option<&str>) -> Result<(), PlaybackError> {
        self.cancel();
        let Some(engine) = self.engine else {
            return Err(PlaybackError::SynthesisUnavailable);
        };
        let text = text.replace('\n', " ");
        let mut command = match engine {
            Engine::Say => {
                // `say` picks its voice from the system preferences; it has
                // no language-code selector.
                let mut command = Command::new("say");
                command.arg(&text);
                command
            }
            Engine::Espeak => {
                let mut command = Command::new("espeak");
                if let Some(voice) = voice {
                    command.arg("-v").arg(voice);
                }
                command.arg(&text);
                command
            }
        };
        let child = command
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                debug!(error = %err, "failed to spawn speech engine");
                if err.kind() == std::io::ErrorKind::NotFound {
                    PlaybackError::SynthesisUnavailable
                } else {
                    PlaybackError::SynthesisFailed
                }
            })?;
        self.child = Some(child);
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn poll(&mut self) -> Option<PlaybackEvent> {
        let child = self.child.as_mut()?;
        match child.try_wait() {
            Ok(Some(status)) => {
                self.child = None;
                if status.success() {
                    Some(PlaybackEvent::Finished)
                } else {
                    Some(PlaybackEvent::Failed(PlaybackError::SynthesisFailed))
                }
            }
            Ok(None) => None,
            Err(_) => {
                self.child = None;
                Some(PlaybackEvent::Failed(PlaybackError::SynthesisFailed))
            }
        }
    }
}

impl Drop for CommandSpeech {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn detect_engine(preference: Option<&str>) -> Option<Engine> {
    match preference.map(str::trim) {
        Some("off") => None,
        Some("say") => command_exists("say").then_some(Engine::Say),
        Some("espeak") => command_exists("espeak").then_some(Engine::Espeak),
        _ => {
            if command_exists("say") {
                Some(Engine::Say)
            } else if command_exists("espeak") {
                Some(Engine::Espeak)
            } else {
                None
            }
        }
    }
}

fn command_exists(cmd: &str) -> bool {
    match Command::new(cmd).arg("-h").output() {
        Ok(_) => true,
        Err(err) => err.kind() != std::io::ErrorKind::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn off_preference_disables_the_engine() {
        let platform = CommandSpeech::with_preference("off");
        assert!(!platform.available());
    }

    #[test]
    fn unavailable_engine_rejects_speak() {
        let mut platform = CommandSpeech::with_preference("off");
        let err = platform.speak("text", None).unwrap_err();
        assert_eq!(err, PlaybackError::SynthesisUnavailable);
    }
}
