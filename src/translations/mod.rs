use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tera::{Context as TeraContext, Tera};

use crate::languages::Tone;
use crate::providers::ToolSpec;
use crate::settings::Settings;

pub const TOOL_NAME: &str = "deliver_translation";

#[derive(Debug, Clone)]
pub struct TranslateOptions {
    pub lang: String,
    pub tone: Tone,
}

/// What the gateway returns for one request. The idiom list is model output
/// and is not guaranteed to occur in `translation`.
#[derive(Debug, Clone, Serialize)]
pub struct TranslationResult {
    pub translation: String,
    pub idioms: Vec<String>,
    pub alternative_translations: Vec<String>,
}

pub fn tool_spec(tool_name: &str) -> ToolSpec {
    let parameters = json!({
        "type": "object",
        "properties": {
            "translation": {"type": "string"},
            "idioms": {"type": "array", "items": {"type": "string"}},
            "alternative_translations": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["translation", "idioms", "alternative_translations"]
    });

    ToolSpec {
        name: tool_name.to_string(),
        description: "Return the translation with the idioms used and alternative phrasings."
            .to_string(),
        parameters,
    }
}

pub fn render_system_prompt(
    options: &TranslateOptions,
    tool_name: &str,
    settings: &Settings,
) -> Result<String> {
    let template = include_str!("prompts/system_prompt.tera");
    let mut context = TeraContext::new();
    context.insert("target_lang", options.lang.as_str());
    context.insert("tone", options.tone.as_str());
    let guidance = tone_guidance(options.tone, settings)?;
    context.insert("tone_guidance", &guidance);
    context.insert("tool_name", tool_name);

    Tera::one_off(template, &context, false).with_context(|| "failed to render system prompt")
}

pub fn parse_tool_args(value: Value) -> Result<TranslationResult> {
    let args: ToolArgs =
        serde_json::from_value(value).with_context(|| "failed to parse tool arguments")?;
    if args.translation.trim().is_empty() {
        return Err(anyhow!("translation is empty"));
    }
    Ok(TranslationResult {
        translation: args.translation,
        idioms: args.idioms,
        alternative_translations: args.alternative_translations,
    })
}

fn tone_guidance(tone: Tone, settings: &Settings) -> Result<String> {
    settings
        .tones
        .get(tone.as_str())
        .cloned()
        .ok_or_else(|| anyhow!("missing tone guidance for '{}'", tone.as_str()))
}

#[derive(Debug, Deserialize)]
struct ToolArgs {
    translation: String,
    #[serde(default)]
    idioms: Vec<String>,
    #[serde(default)]
    alternative_translations: Vec<String>,
}
