use anyhow::{Result, anyhow};

use crate::providers::{Provider, ProviderUsage};
use crate::settings::Settings;
use crate::translations::{self, TOOL_NAME, TranslateOptions, TranslationResult};

/// Upper bound on the text accepted for one request, enforced before any
/// gateway dispatch.
pub const MAX_INPUT_CHARS: usize = 5000;

#[derive(Debug, Clone)]
pub struct Translator<P: Provider + Clone> {
    provider: P,
    settings: Settings,
}

#[derive(Debug, Clone)]
pub struct ExecutionOutput {
    pub result: TranslationResult,
    pub model: Option<String>,
    pub usage: Option<ProviderUsage>,
}

impl<P: Provider + Clone> Translator<P> {
    pub fn new(provider: P, settings: Settings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn exec(&self, input: &str, options: TranslateOptions) -> Result<ExecutionOutput> {
        let input = input.trim();
        if input.is_empty() {
            return Err(anyhow!("text to translate is empty"));
        }
        let chars = input.chars().count();
        if chars > MAX_INPUT_CHARS {
            return Err(anyhow!(
                "text to translate exceeds {} characters (got {})",
                MAX_INPUT_CHARS,
                chars
            ));
        }

        let tool = translations::tool_spec(TOOL_NAME);
        let system_prompt = translations::render_system_prompt(&options, TOOL_NAME, &self.settings)?;

        let response = self
            .provider
            .clone()
            .register_tool(tool)
            .append_system_input(system_prompt)
            .append_user_input(input.to_string())
            .call_tool(TOOL_NAME)
            .await?;

        let result = translations::parse_tool_args(response.args)?;
        Ok(ExecutionOutput {
            result,
            model: response.model,
            usage: response.usage,
        })
    }
}
