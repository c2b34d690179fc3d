use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Selectable target languages, loaded from the embedded table.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    ordered: Vec<LanguageEntry>,
    by_code: HashMap<String, usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageEntry {
    pub code: String,
    pub label: String,
}

impl LanguageRegistry {
    pub fn load() -> Result<Self> {
        let raw = include_str!("languages.json");
        let parsed: LanguageData =
            serde_json::from_str(raw).with_context(|| "failed to parse embedded language data")?;
        let mut by_code = HashMap::new();
        for (index, entry) in parsed.languages.iter().enumerate() {
            by_code.insert(normalize_code(&entry.code), index);
        }
        Ok(LanguageRegistry {
            ordered: parsed.languages,
            by_code,
        })
    }

    pub fn is_valid_code(&self, code: &str) -> bool {
        self.by_code.contains_key(&normalize_code(code))
    }

    pub fn label(&self, code: &str) -> Option<&str> {
        self.by_code
            .get(&normalize_code(code))
            .map(|&index| self.ordered[index].label.as_str())
    }

    /// Entries in declaration order, for populating selection UIs.
    pub fn entries(&self) -> &[LanguageEntry] {
        &self.ordered
    }
}

/// Stylistic register requested for a translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Formal,
    Slang,
    Colloquial,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Formal => "formal",
            Tone::Slang => "slang",
            Tone::Colloquial => "colloquial",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tone::Formal => "Formal",
            Tone::Slang => "Slang",
            Tone::Colloquial => "Colloquial",
        }
    }

    pub fn all() -> [Tone; 3] {
        [Tone::Formal, Tone::Slang, Tone::Colloquial]
    }
}

impl FromStr for Tone {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "formal" => Ok(Tone::Formal),
            "slang" => Ok(Tone::Slang),
            "colloquial" => Ok(Tone::Colloquial),
            other => Err(anyhow!(
                "invalid tone '{}' (expected formal, slang, or colloquial)",
                other
            )),
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a registry language code to the voice identifier the local speech
/// engine understands. Unmapped codes fall back to the platform default.
pub fn speech_voice_for(lang: &str) -> Option<&'static str> {
    match normalize_code(lang).as_str() {
        "en" => Some("en"),
        "es" => Some("es"),
        "fr" => Some("fr"),
        "de" => Some("de"),
        "pl" => Some("pl"),
        "it" => Some("it"),
        "pt" => Some("pt"),
        "ja" => Some("ja"),
        "ko" => Some("ko"),
        "zh-cn" => Some("zh"),
        "ru" => Some("ru"),
        "ar" => Some("ar"),
        _ => None,
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

#[derive(Debug, Deserialize)]
struct LanguageData {
    languages: Vec<LanguageEntry>,
}
