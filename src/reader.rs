//! Page orchestration.
//!
//! A [`Reader`] owns one page: its document, the translation session and the
//! interaction controller. Everything that mutates the page goes through it.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::blocks::split_blocks;
use crate::config::SentenceModifier;
use crate::dom::{Document, Dom, NodeId};
use crate::error::{Result, WortblickError};
use crate::extract::Extractor;
use crate::interaction::{Effect, InputEvent, InteractionController, PopupId};
use crate::lookup::{LookupResult, LookupWorker};
use crate::matcher::{match_blocks, MatchOptions};
use crate::rewrite::apply_translations;
use crate::session::{SessionManager, TranslationSession};
use crate::translate::{translate_blocks, BatchOptions, BlockTranslator};

/// `id` of the stylesheet added to translated pages
pub const STYLE_ID: &str = "wb-style";

const STYLESHEET: &str = "\
.wb-word { cursor: pointer; }
.wb-word:hover { text-decoration: underline dotted; }
html.wb-sentence-mode .wb-word { pointer-events: none; }
html.wb-sentence-mode .wb-translated { cursor: help; }
.wb-sentence-hover { background: rgba(255, 214, 0, 0.25); }
";

/// Summary of one `translate_page` run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageReport {
    pub title: Option<String>,
    /// Blocks the splitter produced from the article
    pub blocks: usize,
    /// Blocks located in the live page
    pub matched: usize,
    /// Elements rewritten, including those from failed batches
    pub translated: usize,
    /// Rewritten elements that kept their original text
    pub untranslated: usize,
    pub failed_batches: usize,
    pub total_batches: usize,
}

pub struct Reader {
    document: Document,
    sessions: SessionManager,
    controller: InteractionController,
    lookups: Option<LookupWorker>,
    match_options: MatchOptions,
}

impl Reader {
    pub fn new(document: Document, modifier: SentenceModifier) -> Self {
        Self {
            document,
            sessions: SessionManager::new(),
            controller: InteractionController::new(modifier),
            lookups: None,
            match_options: MatchOptions::default(),
        }
    }

    pub fn from_html(html: &str, modifier: SentenceModifier) -> Self {
        Self::new(Document::parse(html), modifier)
    }

    /// Run word lookups through `worker`
    pub fn with_lookups(mut self, worker: LookupWorker) -> Self {
        self.lookups = Some(worker);
        self
    }

    pub fn with_match_options(mut self, options: MatchOptions) -> Self {
        self.match_options = options;
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn session(&self) -> Option<&TranslationSession> {
        self.sessions.active()
    }

    pub fn is_translated(&self) -> bool {
        self.sessions.is_active()
    }

    /// Extract, match, translate and rewrite the page.
    ///
    /// Nothing in the document changes unless every step up to the rewrite
    /// succeeds.
    pub fn translate_page(
        &mut self,
        extractor: &dyn Extractor,
        translator: Arc<dyn BlockTranslator>,
        options: BatchOptions,
    ) -> Result<PageReport> {
        self.sessions.ensure_idle()?;

        let article = extractor
            .extract(&self.document.to_html())
            .ok_or(WortblickError::ExtractionFailure)?;
        log::info!("Extracted article: {} chars", article.length);

        let blocks = split_blocks(&article.html);
        let matches = match_blocks(&blocks, &self.document, self.match_options);
        log::info!("Matched {} of {} blocks", matches.len(), blocks.len());
        if matches.is_empty() {
            return Err(WortblickError::MatchFailure);
        }

        let texts: Vec<String> = matches.iter().map(|m| m.block.text.clone()).collect();
        let outcome = translate_blocks(translator, &texts, options)?;
        if outcome.failed_batches > 0 {
            log::warn!(
                "{} of {} batches failed; their blocks keep the original text",
                outcome.failed_batches,
                outcome.total_batches
            );
        }

        let elements: Vec<_> = matches.iter().map(|m| m.element).collect();
        let session = apply_translations(&mut self.document, &elements, &outcome.blocks);
        let translated = session.len();
        self.sessions.start(session)?;
        self.install_stylesheet();

        Ok(PageReport {
            title: article.title.or_else(|| self.document.title()),
            blocks: blocks.len(),
            matched: matches.len(),
            translated,
            untranslated: outcome.failed_blocks.min(translated),
            failed_batches: outcome.failed_batches,
            total_batches: outcome.total_batches,
        })
    }

    /// Undo the translation: close any popup, drop highlights and sentence
    /// mode, put every element back. Returns the number of elements restored;
    /// 0 when nothing was translated.
    pub fn restore(&mut self) -> usize {
        self.controller.reset(&mut self.document);
        let restored = self.sessions.restore(&mut self.document);
        self.remove_stylesheet();
        if restored > 0 {
            log::info!("Restored {} elements", restored);
        }
        restored
    }

    /// Pick up a translation left in the markup by an earlier run
    pub fn recover(&mut self) -> Result<usize> {
        let found = self.sessions.recover(&mut self.document)?;
        if found > 0 {
            self.install_stylesheet();
        }
        Ok(found)
    }

    /// Feed an input event to the interaction controller and start any
    /// lookups it asks for
    pub fn dispatch(&mut self, event: InputEvent) -> Vec<Effect> {
        let effects = self.controller.dispatch(&mut self.document, event);

        for effect in &effects {
            if let Effect::RequestGloss { popup, word } = effect {
                match self.lookups.as_mut() {
                    Some(worker) => worker.request_gloss(*popup, word),
                    None => {
                        self.controller.resolve_gloss(*popup, None);
                    }
                }
            }
        }
        effects
    }

    /// Ask for the deeper analysis of the open word popup. Returns the popup
    /// it was requested for, `None` when no word popup accepts a request.
    pub fn request_analysis(&mut self) -> Option<PopupId> {
        let id = self.controller.popup()?.id;
        let request = self.controller.request_analysis(id)?;

        match self.lookups.as_mut() {
            Some(worker) => worker.request_analysis(request),
            None => {
                self.controller
                    .resolve_analysis(id, Err("No word analyzer configured".into()));
            }
        }
        Some(id)
    }

    fn apply_lookup(&mut self, result: LookupResult) -> bool {
        match result {
            LookupResult::Gloss { popup, gloss } => self.controller.resolve_gloss(popup, gloss),
            LookupResult::Analysis { popup, result } => {
                self.controller.resolve_analysis(popup, result)
            }
        }
    }

    /// Apply finished lookups without blocking. Returns how many changed the
    /// open popup.
    pub fn pump(&mut self) -> usize {
        let results = match self.lookups.as_mut() {
            Some(worker) => worker.poll(),
            None => return 0,
        };
        let mut applied = 0;
        for result in results {
            if self.apply_lookup(result) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for outstanding lookups, giving each at most `timeout`
    pub fn wait_for_lookups(&mut self, timeout: Duration) -> usize {
        let mut applied = 0;
        while let Some(result) = self.lookups.as_mut().and_then(|w| w.wait(timeout)) {
            if self.apply_lookup(result) {
                applied += 1;
            }
        }
        applied
    }

    fn stylesheet(&self) -> Option<NodeId> {
        self.document
            .elements_by_tag(&["style"])
            .into_iter()
            .find(|&id| self.document.attribute(id, "id") == Some(STYLE_ID))
    }

    fn install_stylesheet(&mut self) {
        if self.stylesheet().is_some() {
            return;
        }
        let head = self
            .document
            .elements_by_tag(&["head"])
            .first()
            .copied()
            .unwrap_or_else(|| self.document.body());
        let style = self.document.append_element(head, "style");
        self.document.set_attribute(style, "id", STYLE_ID);
        self.document.append_text(style, STYLESHEET);
    }

    fn remove_stylesheet(&mut self) {
        if let Some(style) = self.stylesheet() {
            self.document.detach(style);
        }
    }
}
