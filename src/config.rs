use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{Result, WortblickError};

/// CEFR proficiency level the translation is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    pub const ALL: [CefrLevel; 6] = [
        CefrLevel::A1,
        CefrLevel::A2,
        CefrLevel::B1,
        CefrLevel::B2,
        CefrLevel::C1,
        CefrLevel::C2,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "A1" => Some(CefrLevel::A1),
            "A2" => Some(CefrLevel::A2),
            "B1" => Some(CefrLevel::B1),
            "B2" => Some(CefrLevel::B2),
            "C1" => Some(CefrLevel::C1),
            "C2" => Some(CefrLevel::C2),
            _ => None,
        }
    }
}

impl fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Modifier key that switches the page into sentence mode while held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentenceModifier {
    Alt,
    Control,
    Shift,
    Meta,
}

impl SentenceModifier {
    pub const ALL: [SentenceModifier; 4] = [
        SentenceModifier::Alt,
        SentenceModifier::Control,
        SentenceModifier::Shift,
        SentenceModifier::Meta,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "alt" | "option" => Some(SentenceModifier::Alt),
            "control" | "ctrl" => Some(SentenceModifier::Control),
            "shift" => Some(SentenceModifier::Shift),
            "meta" | "cmd" | "super" => Some(SentenceModifier::Meta),
            _ => None,
        }
    }
}

impl fmt::Display for SentenceModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SentenceModifier::Alt => "alt",
            SentenceModifier::Control => "control",
            SentenceModifier::Shift => "shift",
            SentenceModifier::Meta => "meta",
        };
        f.write_str(name)
    }
}

/// Reader settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Language glosses and explanations are written in
    #[serde(default = "default_native_language")]
    pub native_language: String,

    /// Language the page is translated into
    #[serde(default = "default_target_language")]
    pub target_language: String,

    #[serde(default = "default_cefr_level")]
    pub cefr_level: CefrLevel,

    /// Simplify vocabulary and sentence structure to the CEFR level
    #[serde(default = "default_true")]
    pub simplify: bool,

    /// Translate pages as soon as they are opened
    #[serde(default)]
    pub auto_translate: bool,

    /// API key for the translation/analysis endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// OpenAI-compatible API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Blocks per translation request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Hard timeout for a single translation batch
    #[serde(default = "default_batch_timeout")]
    pub batch_timeout_secs: u64,

    #[serde(default = "default_modifier")]
    pub sentence_modifier: SentenceModifier,
}

fn default_native_language() -> String {
    "English".to_string()
}

fn default_target_language() -> String {
    "German".to_string()
}

fn default_cefr_level() -> CefrLevel {
    CefrLevel::B1
}

fn default_true() -> bool {
    true
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_batch_size() -> usize {
    8
}

fn default_batch_timeout() -> u64 {
    60
}

fn default_modifier() -> SentenceModifier {
    SentenceModifier::Alt
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            native_language: default_native_language(),
            target_language: default_target_language(),
            cefr_level: default_cefr_level(),
            simplify: true,
            auto_translate: false,
            api_key: None,
            api_base: default_api_base(),
            model: default_model(),
            batch_size: default_batch_size(),
            batch_timeout_secs: default_batch_timeout(),
            sentence_modifier: default_modifier(),
        }
    }
}

impl Settings {
    /// Load settings from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Load settings, falling back to defaults when the file is unreadable
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Could not read settings, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| WortblickError::ConfigError(e.to_string()))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Get the settings file path
    ///
    /// Supports WORTBLICK_CONFIG environment variable for test isolation
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("WORTBLICK_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        let dirs = ProjectDirs::from("", "", "wortblick").ok_or_else(|| {
            WortblickError::ConfigError("Could not determine config directory".into())
        })?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path (offline glossaries live here)
    pub fn data_dir() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "wortblick").ok_or_else(|| {
            WortblickError::ConfigError("Could not determine data directory".into())
        })?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// The API key to use, preferring WORTBLICK_API_KEY over the file
    pub fn credential(&self) -> Result<String> {
        if let Ok(key) = std::env::var("WORTBLICK_API_KEY") {
            if !key.trim().is_empty() {
                return Ok(key.trim().to_string());
            }
        }
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .ok_or(WortblickError::MissingCredential)
    }

    /// Key shown in `settings show`, masked
    pub fn masked_key(&self) -> Option<String> {
        self.api_key.as_ref().map(|key| {
            let visible: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
            format!("…{}", visible)
        })
    }
}
