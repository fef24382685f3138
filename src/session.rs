use crate::dom::{Dom, Listener, NodeId};
use crate::error::{Result, WortblickError};
use crate::rewrite::{self, ORIGINAL_KEY, TRANSLATED_CLASS, WORD_CLASS};

/// What a rewritten element looked like before the rewrite
#[derive(Debug)]
pub(crate) struct SavedElement {
    pub element: NodeId,
    pub original: String,
    /// Raw `class` attribute; `None` for a recovered session, where only the
    /// marker class can be stripped
    pub class: Option<Option<String>>,
    /// Detached original children, when the rewrite happened in this process
    pub children: Option<Vec<NodeId>>,
}

/// Undo record of one page translation
#[derive(Debug, Default)]
pub struct TranslationSession {
    saved: Vec<SavedElement>,
}

impl TranslationSession {
    pub(crate) fn record(&mut self, saved: SavedElement) {
        self.saved.push(saved);
    }

    /// Original text of each rewritten element, in rewrite order
    pub fn originals(&self) -> impl Iterator<Item = &str> {
        self.saved.iter().map(|s| s.original.as_str())
    }

    pub fn len(&self) -> usize {
        self.saved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.saved.is_empty()
    }

    pub(crate) fn into_saved(self) -> Vec<SavedElement> {
        self.saved
    }
}

/// Owner of the single active translation of a page
#[derive(Debug, Default)]
pub struct SessionManager {
    active: Option<TranslationSession>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&TranslationSession> {
        self.active.as_ref()
    }

    /// Fail if a translation is already active
    pub fn ensure_idle(&self) -> Result<()> {
        if self.is_active() {
            return Err(WortblickError::SessionActive);
        }
        Ok(())
    }

    /// Make `session` the active one
    pub fn start(&mut self, session: TranslationSession) -> Result<()> {
        self.ensure_idle()?;
        self.active = Some(session);
        Ok(())
    }

    /// Restore the active session, if any. Returns the number of elements
    /// restored; 0 when nothing was active.
    pub fn restore<D: Dom + ?Sized>(&mut self, dom: &mut D) -> usize {
        match self.active.take() {
            Some(session) => rewrite::restore(dom, session),
            None => 0,
        }
    }

    /// Rebuild the active session from a page that was translated and
    /// serialized earlier, re-arming its interaction handlers.
    ///
    /// Returns the number of translated elements found.
    pub fn recover<D: Dom + ?Sized>(&mut self, dom: &mut D) -> Result<usize> {
        self.ensure_idle()?;

        let mut session = TranslationSession::default();
        for node in dom.descendants(dom.document_element()) {
            if !dom.has_class(node, TRANSLATED_CLASS) {
                continue;
            }
            let Some(original) = dom.metadata(node, ORIGINAL_KEY).map(String::from) else {
                continue;
            };

            dom.add_listener(node, Listener::SentenceClick);
            for unit in dom.descendants(node) {
                if dom.has_class(unit, WORD_CLASS) {
                    dom.add_listener(unit, Listener::WordClick);
                }
            }
            session.record(SavedElement {
                element: node,
                original,
                class: None,
                children: None,
            });
        }

        let found = session.len();
        if found > 0 {
            self.active = Some(session);
        }
        Ok(found)
    }
}
