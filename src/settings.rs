use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    /// Guidance text per tone key, interpolated into the system prompt.
    pub tones: HashMap<String, String>,
    pub system_languages: Vec<String>,
    /// Speech engine preference: auto, say, espeak, or off.
    pub speech_engine: String,
    pub server_addr: String,
    pub client_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tones: HashMap::new(),
            system_languages: Vec::new(),
            speech_engine: "auto".to_string(),
            server_addr: "127.0.0.1:8135".to_string(),
            client_addr: "127.0.0.1:8136".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    tones: Option<HashMap<String, String>>,
    system: Option<SystemSettings>,
    speech: Option<SpeechSettings>,
    server: Option<ServerSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct SystemSettings {
    languages: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct SpeechSettings {
    engine: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
    client_addr: Option<String>,
}

/// Loads settings layered over the embedded defaults: cwd `settings.toml`
/// and `settings.local.toml`, then the home directory pair, then an explicit
/// extra file. Later layers win.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile = toml::from_str(DEFAULT_SETTINGS_TOML)
        .with_context(|| "failed to parse embedded default settings")?;
    settings.merge(defaults);
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(map) = incoming.tones {
            for (key, value) in map {
                self.tones.insert(key, value);
            }
        }
        if let Some(system) = incoming.system {
            if let Some(languages) = system.languages {
                if !languages.is_empty() {
                    self.system_languages = languages;
                }
            }
        }
        if let Some(speech) = incoming.speech {
            if let Some(engine) = speech.engine {
                if !engine.trim().is_empty() {
                    self.speech_engine = engine;
                }
            }
        }
        if let Some(server) = incoming.server {
            if let Some(addr) = server.addr {
                if !addr.trim().is_empty() {
                    self.server_addr = addr;
                }
            }
            if let Some(addr) = server.client_addr {
                if !addr.trim().is_empty() {
                    self.client_addr = addr;
                }
            }
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".lingualens"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    #[test]
    fn defaults_carry_all_three_tones() {
        with_temp_home(|_| {
            let settings = load_settings(None).unwrap();
            for key in ["formal", "slang", "colloquial"] {
                assert!(settings.tones.contains_key(key), "missing tone {}", key);
            }
            assert!(settings.system_languages.contains(&"zh-cn".to_string()));
            assert_eq!(settings.speech_engine, "auto");
        });
    }

    #[test]
    fn extra_settings_file_overrides_defaults() {
        with_temp_home(|dir| {
            let path = dir.join("extra.toml");
            fs::write(
                &path,
                "[speech]\nengine = \"espeak\"\n\n[tones]\nformal = \"Very stiff.\"\n",
            )
            .unwrap();
            let settings = load_settings(Some(&path)).unwrap();
            assert_eq!(settings.speech_engine, "espeak");
            assert_eq!(settings.tones.get("formal").map(String::as_str), Some("Very stiff."));
            // untouched keys survive the merge
            assert!(settings.tones.contains_key("slang"));
        });
    }

    #[test]
    fn missing_extra_settings_file_is_an_error() {
        with_temp_home(|dir| {
            let missing = dir.join("nope.toml");
            assert!(load_settings(Some(&missing)).is_err());
        });
    }

    #[test]
    fn home_settings_file_is_bootstrapped() {
        with_temp_home(|dir| {
            load_settings(None).unwrap();
            assert!(dir.join(".lingualens").join("settings.toml").exists());
        });
    }
}
