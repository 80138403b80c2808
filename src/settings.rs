use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::extract::UnitMatching;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");
const HOME_DIR_NAME: &str = ".nutri-label-advisor";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system_prompt: String,
    pub output_dir: PathBuf,
    pub unit_matching: UnitMatching,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 250,
            temperature: 0.4,
            system_prompt: "You are a nutrition expert.".to_string(),
            output_dir: PathBuf::from("./uploads"),
            unit_matching: UnitMatching::Loose,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    llm: Option<LlmSettings>,
    output: Option<OutputSettings>,
    nutrition: Option<NutritionSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmSettings {
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    system_prompt: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputSettings {
    dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NutritionSettings {
    unit_matching: Option<UnitMatching>,
}

/// Layers, later wins: built-in defaults, `./settings.toml`,
/// `./settings.local.toml`, the same two under `~/.nutri-label-advisor`,
/// then `extra_path`.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
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
            settings
                .merge_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
        }
    }

    Ok(settings)
}

impl Settings {
    pub fn merge_str(&mut self, content: &str) -> Result<()> {
        let parsed: SettingsFile = toml::from_str(content)?;
        self.merge(parsed);
        Ok(())
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(llm) = incoming.llm {
            if let Some(model) = llm.model {
                if !model.trim().is_empty() {
                    self.model = model.trim().to_string();
                }
            }
            if let Some(max_tokens) = llm.max_tokens {
                if max_tokens > 0 {
                    self.max_tokens = max_tokens;
                }
            }
            if let Some(temperature) = llm.temperature {
                if (0.0..=2.0).contains(&temperature) {
                    self.temperature = temperature;
                }
            }
            if let Some(prompt) = llm.system_prompt {
                if !prompt.trim().is_empty() {
                    self.system_prompt = prompt;
                }
            }
        }
        if let Some(output) = incoming.output {
            if let Some(dir) = output.dir {
                if !dir.trim().is_empty() {
                    self.output_dir = PathBuf::from(dir.trim());
                }
            }
        }
        if let Some(nutrition) = incoming.nutrition {
            if let Some(unit_matching) = nutrition.unit_matching {
                self.unit_matching = unit_matching;
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
            Some(Path::new(home).join(HOME_DIR_NAME))
        }
    })
}
