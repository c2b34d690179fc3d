use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

pub mod highlight;
pub mod languages;
pub mod logging;
mod providers;
pub mod server;
pub mod session;
pub mod settings;
pub mod speech;
#[cfg(test)]
pub(crate) mod test_util;
pub mod translations;
mod translator;

pub use providers::{
    Claude, Gemini, OpenAI, Provider, ProviderImpl, ProviderKind, ProviderUsage,
};
pub use translations::{TranslateOptions, TranslationResult};
pub use translator::{ExecutionOutput, MAX_INPUT_CHARS, Translator};

use highlight::HighlightSegment;
use languages::{LanguageRegistry, Tone};
use speech::PlaybackState;

#[derive(Debug, Clone)]
pub struct Config {
    pub lang: String,
    pub tone: String,
    pub model: Option<String>,
    pub key: Option<String>,
    pub speak: bool,
    pub settings_path: Option<String>,
    pub show_enabled_languages: bool,
    pub show_enabled_tones: bool,
    pub with_idioms: bool,
    pub with_alternatives: bool,
    pub with_using_tokens: bool,
    pub with_using_model: bool,
}

pub async fn run(config: Config, input: Option<String>) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;
    let registry = languages::LanguageRegistry::load()?;

    if config.show_enabled_languages || config.show_enabled_tones {
        return Ok(format_show_output(&config, &settings, &registry));
    }

    let input = input.unwrap_or_default();
    let input = input.trim();
    if input.is_empty() {
        return Err(anyhow!("stdin is empty"));
    }

    let tone: Tone = config.tone.parse()?;
    if !registry.is_valid_code(&config.lang) {
        return Err(anyhow!(
            "invalid target language code '{}' (see --show-enabled-languages)",
            config.lang
        ));
    }

    let translator =
        build_translator(config.model.as_deref(), config.key.as_deref(), &settings)?;
    let options = TranslateOptions {
        lang: config.lang.clone(),
        tone,
    };
    let execution = translator.exec(input, options).await?;

    if config.speak {
        speak_translation(
            &execution.result.translation,
            &config.lang,
            &settings,
            &registry,
        )
        .await?;
    }

    Ok(format_execution_output(&execution, &config))
}

/// Resolves the provider from `--model`/`--key` (or the environment) and
/// wraps it in a ready translator.
pub fn build_translator(
    model: Option<&str>,
    key: Option<&str>,
    settings: &settings::Settings,
) -> Result<Translator<ProviderImpl>> {
    let selection = providers::resolve_provider_selection(model, key)?;
    let resolved_key = providers::resolve_key(selection.provider, key)
        .with_context(|| "no API key found for selected provider")?;
    let provider = providers::build_provider(selection.provider, resolved_key, selection.requested_model);
    Ok(Translator::new(provider, settings.clone()))
}

fn format_execution_output(execution: &ExecutionOutput, config: &Config) -> String {
    let segments = highlight::highlight(&execution.result.translation, &execution.result.idioms);
    let mut output = render_segments(&segments);
    let mut meta_lines = Vec::new();

    if config.with_idioms && !execution.result.idioms.is_empty() {
        meta_lines.push(format!("idioms: {}", execution.result.idioms.join(", ")));
    }

    if config.with_alternatives && !execution.result.alternative_translations.is_empty() {
        meta_lines.push("alternatives:".to_string());
        for alternative in &execution.result.alternative_translations {
            meta_lines.push(format!("  - {}", alternative));
        }
    }

    if config.with_using_model {
        let model = execution.model.as_deref().unwrap_or("unavailable");
        meta_lines.push(format!("model: {}", model));
    }

    if config.with_using_tokens {
        meta_lines.push(format_usage(execution.usage.as_ref()));
    }

    if !meta_lines.is_empty() {
        output.push('\n');
        output.push_str(&meta_lines.join("\n"));
    }

    output
}

/// Concatenates segments for terminal display, underlining idiom spans when
/// stdout is a terminal.
pub fn render_segments(segments: &[HighlightSegment]) -> String {
    let stylize = std::io::stdout().is_terminal();
    let mut output = String::new();
    for segment in segments {
        match segment {
            HighlightSegment::Plain(text) => output.push_str(text),
            HighlightSegment::Idiom { text, .. } => {
                if stylize {
                    output.push_str("\x1b[4m");
                    output.push_str(text);
                    output.push_str("\x1b[0m");
                } else {
                    output.push_str(text);
                }
            }
        }
    }
    output
}

fn format_usage(usage: Option<&ProviderUsage>) -> String {
    let Some(usage) = usage else {
        return "tokens: unavailable".to_string();
    };
    let total = usage.total_tokens.or_else(|| {
        usage
            .prompt_tokens
            .zip(usage.completion_tokens)
            .map(|(prompt, completion)| prompt + completion)
    });

    let mut parts = Vec::new();
    if let Some(prompt) = usage.prompt_tokens {
        parts.push(format!("prompt={}", prompt));
    }
    if let Some(completion) = usage.completion_tokens {
        parts.push(format!("completion={}", completion));
    }
    if let Some(total) = total {
        parts.push(format!("total={}", total));
    }

    if parts.is_empty() {
        "tokens: unavailable".to_string()
    } else {
        format!("tokens: {}", parts.join(", "))
    }
}

fn format_show_output(
    config: &Config,
    settings: &settings::Settings,
    registry: &LanguageRegistry,
) -> String {
    let mut sections = Vec::new();

    if config.show_enabled_languages {
        let mut lines = Vec::new();
        for code in &settings.system_languages {
            let label = registry.label(code).unwrap_or(code.as_str());
            lines.push(format!("{}\t{}", code, label));
        }
        sections.push(lines.join("\n"));
    }

    if config.show_enabled_tones {
        let mut lines = Vec::new();
        for tone in Tone::all() {
            let guidance = settings
                .tones
                .get(tone.as_str())
                .map(String::as_str)
                .unwrap_or("");
            lines.push(format!("{}\t{}", tone.as_str(), guidance));
        }
        sections.push(lines.join("\n"));
    }

    sections.join("\n")
}

async fn speak_translation(
    text: &str,
    lang: &str,
    settings: &settings::Settings,
    registry: &LanguageRegistry,
) -> Result<()> {
    let platform = speech::CommandSpeech::with_preference(&settings.speech_engine);
    let mut controller = speech::PlaybackController::new(platform);
    if !controller.available() {
        return Err(anyhow!(
            "no speech engine found (install macOS 'say' or Linux 'espeak')"
        ));
    }
    controller
        .play(text, Some(lang), registry)
        .map_err(|err| anyhow!("{}", err.message()))?;
    while controller.is_speaking() {
        tokio::time::sleep(Duration::from_millis(50)).await;
        controller.pump();
    }
    if let PlaybackState::Error(err) = controller.state() {
        return Err(anyhow!("{}", err.message()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            lang: "en".to_string(),
            tone: "formal".to_string(),
            model: None,
            key: None,
            speak: false,
            settings_path: None,
            show_enabled_languages: false,
            show_enabled_tones: false,
            with_idioms: false,
            with_alternatives: false,
            with_using_tokens: false,
            with_using_model: false,
        }
    }

    #[tokio::test]
    async fn show_enabled_languages_lists_registry_labels() {
        let mut config = base_config();
        config.show_enabled_languages = true;
        let output = run(config, None).await.unwrap();
        assert!(output.contains("en\tEnglish"));
        assert!(output.contains("zh-cn\tChinese (Simplified)"));
    }

    #[tokio::test]
    async fn show_enabled_tones_lists_all_three() {
        let mut config = base_config();
        config.show_enabled_tones = true;
        let output = run(config, None).await.unwrap();
        for key in ["formal", "slang", "colloquial"] {
            assert!(output.contains(key), "missing {}", key);
        }
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let err = run(base_config(), Some("   ".to_string())).await.unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[tokio::test]
    async fn invalid_tone_is_rejected() {
        let mut config = base_config();
        config.tone = "casual".to_string();
        assert!(run(config, Some("hello".to_string())).await.is_err());
    }

    #[tokio::test]
    async fn invalid_language_is_rejected() {
        let mut config = base_config();
        config.lang = "tlh".to_string();
        assert!(run(config, Some("hello".to_string())).await.is_err());
    }

    #[test]
    fn meta_lines_follow_the_translation() {
        let execution = ExecutionOutput {
            result: TranslationResult {
                translation: "piece of cake".to_string(),
                idioms: vec!["piece of cake".to_string()],
                alternative_translations: vec!["very easy".to_string()],
            },
            model: Some("gpt-4o-mini".to_string()),
            usage: Some(ProviderUsage {
                prompt_tokens: Some(10),
                completion_tokens: Some(5),
                total_tokens: None,
            }),
        };
        let mut config = base_config();
        config.with_idioms = true;
        config.with_alternatives = true;
        config.with_using_model = true;
        config.with_using_tokens = true;
        let output = format_execution_output(&execution, &config);
        assert!(output.contains("idioms: piece of cake"));
        assert!(output.contains("  - very easy"));
        assert!(output.contains("model: gpt-4o-mini"));
        assert!(output.contains("tokens: prompt=10, completion=5, total=15"));
    }
}
