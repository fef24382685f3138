//! Settings commands: show, set, setup, reset

use colored::Colorize;
use inquire::{Confirm, Password, Select, Text};

use wortblick::config::{CefrLevel, SentenceModifier, Settings};
use wortblick::error::{Result, WortblickError};

/// Fields `settings set` may change; `None` leaves a field alone
pub struct SettingsUpdate {
    pub native: Option<String>,
    pub target: Option<String>,
    pub level: Option<String>,
    pub simplify: Option<bool>,
    pub auto_translate: Option<bool>,
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub model: Option<String>,
    pub batch_size: Option<usize>,
    pub batch_timeout: Option<u64>,
    pub modifier: Option<String>,
}

impl SettingsUpdate {
    fn is_empty(&self) -> bool {
        self.native.is_none()
            && self.target.is_none()
            && self.level.is_none()
            && self.simplify.is_none()
            && self.auto_translate.is_none()
            && self.api_key.is_none()
            && self.api_base.is_none()
            && self.model.is_none()
            && self.batch_size.is_none()
            && self.batch_timeout.is_none()
            && self.modifier.is_none()
    }

    fn apply(self, settings: &mut Settings) -> Result<()> {
        if let Some(level) = self.level {
            settings.cefr_level = CefrLevel::parse(&level).ok_or_else(|| {
                WortblickError::ConfigError(format!("Invalid CEFR level '{}'. Use A1-C2", level))
            })?;
        }
        if let Some(modifier) = self.modifier {
            settings.sentence_modifier = SentenceModifier::parse(&modifier).ok_or_else(|| {
                WortblickError::ConfigError(format!(
                    "Invalid modifier '{}'. Use alt, control, shift or meta",
                    modifier
                ))
            })?;
        }
        if let Some(size) = self.batch_size {
            if size == 0 {
                return Err(WortblickError::ConfigError("Batch size must be at least 1".into()));
            }
            settings.batch_size = size;
        }
        if let Some(secs) = self.batch_timeout {
            if secs == 0 {
                return Err(WortblickError::ConfigError("Batch timeout must be at least 1s".into()));
            }
            settings.batch_timeout_secs = secs;
        }
        if let Some(base) = self.api_base {
            url::Url::parse(&base)?;
            settings.api_base = base;
        }
        if let Some(native) = self.native {
            settings.native_language = native;
        }
        if let Some(target) = self.target {
            settings.target_language = target;
        }
        if let Some(simplify) = self.simplify {
            settings.simplify = simplify;
        }
        if let Some(auto) = self.auto_translate {
            settings.auto_translate = auto;
        }
        if let Some(key) = self.api_key {
            settings.api_key = if key.trim().is_empty() { None } else { Some(key.trim().to_string()) };
        }
        if let Some(model) = self.model {
            settings.model = model;
        }
        Ok(())
    }
}

fn yes_no(value: bool) -> colored::ColoredString {
    if value {
        "on".green()
    } else {
        "off".normal()
    }
}

/// Show current settings
pub fn cmd_settings_show(json: bool) -> Result<()> {
    let settings = Settings::load()?;

    if json {
        let mut shown = settings.clone();
        shown.api_key = settings.masked_key();
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    println!("\n{}\n", "Reader Settings".bold());
    println!("  Native language:  {}", settings.native_language);
    println!("  Target language:  {}", settings.target_language);
    println!("  CEFR level:       {}", settings.cefr_level);
    println!("  Simplify:         {}", yes_no(settings.simplify));
    println!("  Auto-translate:   {}", yes_no(settings.auto_translate));
    println!("  Sentence key:     {}", settings.sentence_modifier);

    println!("\n{}\n", "Translation Service".bold());
    println!("  API base:         {}", settings.api_base);
    println!("  Model:            {}", settings.model);
    match (settings.masked_key(), std::env::var("WORTBLICK_API_KEY").is_ok()) {
        (_, true) => println!("  API key:          {}", "from WORTBLICK_API_KEY".cyan()),
        (Some(masked), false) => println!("  API key:          {}", masked),
        (None, false) => println!("  API key:          {}", "not set".yellow()),
    }
    println!("  Batch size:       {}", settings.batch_size);
    println!("  Batch timeout:    {}s", settings.batch_timeout_secs);

    if let Ok(path) = Settings::config_path() {
        println!("\n  Config file: {}", path.display());
    }
    if let Ok(dir) = Settings::data_dir() {
        println!("  Glossaries:  {}", dir.display());
    }

    Ok(())
}

/// Change individual settings
pub fn cmd_settings_set(update: SettingsUpdate) -> Result<()> {
    if update.is_empty() {
        println!("Nothing to change. See `wortblick settings set --help`.");
        return Ok(());
    }

    let mut settings = Settings::load()?;
    update.apply(&mut settings)?;
    settings.save()?;
    println!("{} Settings saved.", "✓".green());
    Ok(())
}

/// Interactive settings wizard
pub fn cmd_settings_setup() -> Result<()> {
    let mut settings = Settings::load_or_default();
    let prompt_err = |e: inquire::InquireError| WortblickError::ConfigError(e.to_string());

    println!("\n{}", "wortblick setup".bold());
    println!("Press Enter to keep the value in brackets.\n");

    settings.native_language = Text::new("Your native language:")
        .with_default(&settings.native_language)
        .prompt()
        .map_err(prompt_err)?;

    settings.target_language = Text::new("Language you are learning:")
        .with_default(&settings.target_language)
        .prompt()
        .map_err(prompt_err)?;

    let current = CefrLevel::ALL
        .iter()
        .position(|&l| l == settings.cefr_level)
        .unwrap_or(2);
    settings.cefr_level = Select::new("Your level:", CefrLevel::ALL.to_vec())
        .with_starting_cursor(current)
        .prompt()
        .map_err(prompt_err)?;

    settings.simplify = Confirm::new("Simplify translations to your level?")
        .with_default(settings.simplify)
        .prompt()
        .map_err(prompt_err)?;

    settings.auto_translate = Confirm::new("Translate pages automatically when opened?")
        .with_default(settings.auto_translate)
        .prompt()
        .map_err(prompt_err)?;

    let current = SentenceModifier::ALL
        .iter()
        .position(|&m| m == settings.sentence_modifier)
        .unwrap_or(0);
    settings.sentence_modifier = Select::new(
        "Key to hold for showing original sentences:",
        SentenceModifier::ALL.to_vec(),
    )
    .with_starting_cursor(current)
    .prompt()
    .map_err(prompt_err)?;

    let key = Password::new("API key (leave empty to keep the current one):")
        .without_confirmation()
        .prompt()
        .map_err(prompt_err)?;
    if !key.trim().is_empty() {
        settings.api_key = Some(key.trim().to_string());
    }

    settings.save()?;
    println!("\n{} Settings saved.", "✓".green());
    if settings.credential().is_err() {
        println!(
            "{}: no API key configured. Translation needs one:\n  wortblick settings set --api-key <KEY>",
            "Note".yellow()
        );
    }
    Ok(())
}

/// Reset all settings to defaults
pub fn cmd_settings_reset(skip_confirm: bool) -> Result<()> {
    if !skip_confirm {
        let confirm = Confirm::new("Reset all settings to defaults (including the API key)?")
            .with_default(false)
            .prompt()
            .map_err(|e| WortblickError::ConfigError(e.to_string()))?;

        if !confirm {
            println!("Cancelled.");
            return Ok(());
        }
    }

    Settings::default().save()?;
    println!("Settings reset to defaults.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> SettingsUpdate {
        SettingsUpdate {
            native: None,
            target: None,
            level: None,
            simplify: None,
            auto_translate: None,
            api_key: None,
            api_base: None,
            model: None,
            batch_size: None,
            batch_timeout: None,
            modifier: None,
        }
    }

    #[test]
    fn test_apply_update() {
        let mut settings = Settings::default();
        let update = SettingsUpdate {
            level: Some("a2".into()),
            modifier: Some("ctrl".into()),
            target: Some("Spanish".into()),
            api_key: Some("  sk-1  ".into()),
            ..empty()
        };
        assert!(!update.is_empty());
        update.apply(&mut settings).unwrap();
        assert_eq!(settings.cefr_level, CefrLevel::A2);
        assert_eq!(settings.sentence_modifier, SentenceModifier::Control);
        assert_eq!(settings.target_language, "Spanish");
        assert_eq!(settings.api_key.as_deref(), Some("sk-1"));
    }

    #[test]
    fn test_invalid_update_is_rejected() {
        let mut settings = Settings::default();
        let update = SettingsUpdate { level: Some("Z9".into()), ..empty() };
        assert!(update.apply(&mut settings).is_err());

        let update = SettingsUpdate { batch_size: Some(0), ..empty() };
        assert!(update.apply(&mut settings).is_err());

        let update = SettingsUpdate { api_base: Some("not a url".into()), ..empty() };
        assert!(update.apply(&mut settings).is_err());
        assert!(empty().is_empty());
    }

    #[test]
    fn test_empty_key_clears() {
        let mut settings = Settings::default();
        settings.api_key = Some("old".into());
        SettingsUpdate { api_key: Some(" ".into()), ..empty() }
            .apply(&mut settings)
            .unwrap();
        assert!(settings.api_key.is_none());
    }
}
