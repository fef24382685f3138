//! Fast offline single-word translation.
//!
//! Glossaries are tab-separated files named `<source>-<target>.tsv` in the
//! data directory (`word<TAB>gloss` per line, `#` comments). The translator
//! is only initialized on the first word lookup and may not exist at all,
//! in which case lookups go straight to the deeper analysis.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::config::Settings;
use crate::error::Result;

/// Single-word translator available without a network round trip
pub trait WordTranslator: Send + Sync {
    fn available(&self, source: &str, target: &str) -> bool;

    fn translate(&self, word: &str) -> Option<String>;
}

/// Word translator backed by a TSV glossary
#[derive(Debug, Clone)]
pub struct GlossaryTranslator {
    source: String,
    target: String,
    entries: HashMap<String, String>,
}

impl GlossaryTranslator {
    /// Glossary file for a language pair
    pub fn path_for(dir: &Path, source: &str, target: &str) -> PathBuf {
        dir.join(format!("{}-{}.tsv", source.to_lowercase(), target.to_lowercase()))
    }

    pub fn parse(source: &str, target: &str, content: &str) -> Self {
        let entries = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('\t'))
            .map(|(word, gloss)| (word.trim().to_lowercase(), gloss.trim().to_string()))
            .filter(|(word, gloss)| !word.is_empty() && !gloss.is_empty())
            .collect();

        Self {
            source: source.to_lowercase(),
            target: target.to_lowercase(),
            entries,
        }
    }

    pub fn load(dir: &Path, source: &str, target: &str) -> Result<Self> {
        let content = std::fs::read_to_string(Self::path_for(dir, source, target))?;
        Ok(Self::parse(source, target, &content))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl WordTranslator for GlossaryTranslator {
    fn available(&self, source: &str, target: &str) -> bool {
        !self.entries.is_empty()
            && self.source == source.to_lowercase()
            && self.target == target.to_lowercase()
    }

    fn translate(&self, word: &str) -> Option<String> {
        self.entries.get(&word.to_lowercase()).cloned()
    }
}

type InitFn = Box<dyn Fn() -> Option<Arc<dyn WordTranslator>> + Send + Sync>;

/// Word translator whose initialization is deferred to first use
pub struct LazyWordTranslator {
    init: InitFn,
    cell: OnceCell<Option<Arc<dyn WordTranslator>>>,
}

impl LazyWordTranslator {
    pub fn new<F>(init: F) -> Self
    where
        F: Fn() -> Option<Arc<dyn WordTranslator>> + Send + Sync + 'static,
    {
        Self {
            init: Box::new(init),
            cell: OnceCell::new(),
        }
    }

    /// A translator that never becomes available
    pub fn unavailable() -> Self {
        Self::new(|| None)
    }

    /// Glossary for the settings' target → native language pair, loaded
    /// from the data directory on first use
    pub fn for_settings(settings: &Settings) -> Self {
        let source = settings.target_language.clone();
        let target = settings.native_language.clone();
        Self::new(move || {
            let dir = Settings::data_dir().ok()?;
            match GlossaryTranslator::load(&dir, &source, &target) {
                Ok(glossary) if glossary.available(&source, &target) => {
                    log::debug!("Loaded {} glossary entries for {}-{}", glossary.len(), source, target);
                    Some(Arc::new(glossary) as Arc<dyn WordTranslator>)
                }
                Ok(_) => None,
                Err(e) => {
                    log::debug!("No offline glossary for {}-{}: {}", source, target, e);
                    None
                }
            }
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The translator, initializing it on first call
    pub fn get(&self) -> Option<Arc<dyn WordTranslator>> {
        self.cell.get_or_init(|| (self.init)()).clone()
    }

    /// Translate a word, or `None` when unavailable or unknown
    pub fn translate(&self, word: &str) -> Option<String> {
        self.get().and_then(|t| t.translate(word))
    }
}
