//! Interaction mode controller.
//!
//! Two modes share the rewritten page: clicking a word unit opens a gloss
//! popup, while holding the sentence modifier turns whole translated blocks
//! into targets that reveal their original text. Every input goes through
//! [`InteractionController::dispatch`]; while the modifier is held, word
//! clicks are suppressed so one click never triggers both.

use crate::analysis::WordAnalysis;
use crate::config::SentenceModifier;
use crate::dom::{Dom, Listener, NodeId};
use crate::rewrite::{CONTEXT_KEY, ORIGINAL_KEY, TRANSLATED_CLASS, WORD_CLASS, WORD_KEY};

/// Set on the document element while the modifier is held; the stylesheet
/// turns off pointer events on word units under it
pub const SENTENCE_MODE_CLASS: &str = "wb-sentence-mode";
/// Set on the translated block under the pointer in sentence mode
pub const HOVER_CLASS: &str = "wb-sentence-hover";

/// Keys the controller cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Alt,
    AltGraph,
    Control,
    Shift,
    Meta,
    Escape,
    Other,
}

impl Key {
    /// Whether releasing or pressing this key toggles sentence mode
    fn is_tracked(self, modifier: SentenceModifier) -> bool {
        matches!(
            (modifier, self),
            (SentenceModifier::Alt, Key::Alt)
                | (SentenceModifier::Alt, Key::AltGraph)
                | (SentenceModifier::Control, Key::Control)
                | (SentenceModifier::Shift, Key::Shift)
                | (SentenceModifier::Meta, Key::Meta)
        )
    }
}

/// Where a click landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    /// A page node
    Node(NodeId),
    /// Inside the popup
    Popup,
    /// Nowhere in particular (page margin, another frame)
    Outside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown(Key),
    KeyUp(Key),
    /// The window lost focus
    Blur,
    /// Pointer moved over `target` (`None` when off the page)
    PointerMove(Option<NodeId>),
    Click(ClickTarget),
}

/// Derived interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    WordFocused(NodeId),
    SentenceHover(NodeId),
    SentenceRevealed(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PopupId(pub u64);

/// Progress of a word lookup shown in its popup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupStatus {
    /// Waiting for the offline gloss
    Loading,
    /// Gloss shown (if any) with an offer of deeper analysis
    Offer,
    /// Deeper analysis requested; the control is busy
    AnalysisPending,
    Analyzed(WordAnalysis),
    /// Analysis failed; the control offers a manual retry
    AnalysisFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordPopup {
    pub word: String,
    pub context: String,
    pub gloss: Option<String>,
    pub status: LookupStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupKind {
    Word(WordPopup),
    Original(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popup {
    pub id: PopupId,
    /// Word unit or translated block the popup belongs to
    pub anchor: NodeId,
    pub kind: PopupKind,
}

/// Side effects of a dispatch, for the embedder to render or act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SentenceMode(bool),
    Highlighted(NodeId),
    Unhighlighted(NodeId),
    PopupOpened(PopupId),
    PopupClosed(PopupId),
    /// Start the offline gloss for a freshly opened word popup
    RequestGloss { popup: PopupId, word: String },
}

/// Deeper analysis the embedder should run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub popup: PopupId,
    pub word: String,
    pub context: String,
}

#[derive(Debug)]
pub struct InteractionController {
    modifier: SentenceModifier,
    modifier_held: bool,
    pointer: Option<NodeId>,
    hovered: Option<NodeId>,
    // Raw `class` attributes to put back when sentence mode or a highlight ends
    root_class: Option<Option<String>>,
    hovered_class: Option<String>,
    popup: Option<Popup>,
    next_popup: u64,
}

impl InteractionController {
    pub fn new(modifier: SentenceModifier) -> Self {
        Self {
            modifier,
            modifier_held: false,
            pointer: None,
            hovered: None,
            root_class: None,
            hovered_class: None,
            popup: None,
            next_popup: 1,
        }
    }

    pub fn modifier_held(&self) -> bool {
        self.modifier_held
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    pub fn mode(&self) -> Mode {
        let popup = self.popup.as_ref();
        if self.modifier_held {
            if let Some(hovered) = self.hovered {
                return match popup {
                    Some(p) if p.anchor == hovered && matches!(p.kind, PopupKind::Original(_)) => {
                        Mode::SentenceRevealed(hovered)
                    }
                    _ => Mode::SentenceHover(hovered),
                };
            }
        }
        match popup {
            Some(p) => match p.kind {
                PopupKind::Word(_) => Mode::WordFocused(p.anchor),
                PopupKind::Original(_) => Mode::SentenceRevealed(p.anchor),
            },
            None => Mode::Idle,
        }
    }

    /// Feed one input event through the state machine
    pub fn dispatch<D: Dom + ?Sized>(&mut self, dom: &mut D, event: InputEvent) -> Vec<Effect> {
        let mut effects = Vec::new();

        match event {
            InputEvent::KeyDown(Key::Escape) => self.close_popup(&mut effects),
            InputEvent::KeyDown(key) if key.is_tracked(self.modifier) => {
                if !self.modifier_held {
                    self.modifier_held = true;
                    let root = dom.document_element();
                    self.root_class = Some(dom.class_attribute(root).map(String::from));
                    dom.add_class(root, SENTENCE_MODE_CLASS);
                    effects.push(Effect::SentenceMode(true));
                }
                let pointer = self.pointer;
                self.hover(dom, pointer, &mut effects);
            }
            InputEvent::KeyUp(key) if key.is_tracked(self.modifier) => {
                self.release_modifier(dom, &mut effects)
            }
            InputEvent::Blur => self.release_modifier(dom, &mut effects),
            InputEvent::KeyDown(_) | InputEvent::KeyUp(_) => {}
            InputEvent::PointerMove(target) => {
                self.pointer = target;
                if self.modifier_held {
                    self.hover(dom, target, &mut effects);
                }
            }
            InputEvent::Click(ClickTarget::Popup) => {}
            InputEvent::Click(ClickTarget::Outside) => self.close_popup(&mut effects),
            InputEvent::Click(ClickTarget::Node(target)) => {
                if self.modifier_held {
                    self.sentence_click(dom, target, &mut effects);
                } else {
                    self.word_click(dom, target, &mut effects);
                }
            }
        }

        effects
    }

    /// Translated block containing `node`, if it still has its handler
    fn translated_block<D: Dom + ?Sized>(dom: &D, node: NodeId) -> Option<NodeId> {
        dom.closest_with_class(node, TRANSLATED_CLASS)
            .filter(|&block| dom.has_listener(block, Listener::SentenceClick))
    }

    fn word_unit<D: Dom + ?Sized>(dom: &D, node: NodeId) -> Option<NodeId> {
        dom.closest_with_class(node, WORD_CLASS)
            .filter(|&unit| dom.has_listener(unit, Listener::WordClick))
    }

    fn hover<D: Dom + ?Sized>(&mut self, dom: &mut D, target: Option<NodeId>, effects: &mut Vec<Effect>) {
        let block = target.and_then(|t| Self::translated_block(dom, t));
        if block == self.hovered {
            return;
        }
        if let Some(previous) = self.hovered.take() {
            dom.set_class_attribute(previous, self.hovered_class.take().as_deref());
            effects.push(Effect::Unhighlighted(previous));
        }
        if let Some(block) = block {
            self.hovered_class = dom.class_attribute(block).map(String::from);
            dom.add_class(block, HOVER_CLASS);
            effects.push(Effect::Highlighted(block));
            self.hovered = Some(block);
        }
    }

    fn release_modifier<D: Dom + ?Sized>(&mut self, dom: &mut D, effects: &mut Vec<Effect>) {
        if self.modifier_held {
            self.modifier_held = false;
            let root = dom.document_element();
            match self.root_class.take() {
                Some(class) => dom.set_class_attribute(root, class.as_deref()),
                None => dom.remove_class(root, SENTENCE_MODE_CLASS),
            }
            effects.push(Effect::SentenceMode(false));
        }
        self.hover(dom, None, effects);
    }

    fn sentence_click<D: Dom + ?Sized>(&mut self, dom: &mut D, target: NodeId, effects: &mut Vec<Effect>) {
        let Some(block) = Self::translated_block(dom, target) else {
            self.close_popup(effects);
            return;
        };
        let original = dom.metadata(block, ORIGINAL_KEY).unwrap_or_default().to_string();
        self.open_popup(block, PopupKind::Original(original), effects);
    }

    fn word_click<D: Dom + ?Sized>(&mut self, dom: &mut D, target: NodeId, effects: &mut Vec<Effect>) {
        let Some(unit) = Self::word_unit(dom, target) else {
            // Gaps between words inside a translated block are not "outside"
            if Self::translated_block(dom, target).is_none() {
                self.close_popup(effects);
            }
            return;
        };

        let same_unit = self
            .popup
            .as_ref()
            .map(|p| p.anchor == unit && matches!(p.kind, PopupKind::Word(_)))
            .unwrap_or(false);
        if same_unit {
            self.close_popup(effects);
            return;
        }

        let word = dom.metadata(unit, WORD_KEY).unwrap_or_default().to_string();
        let context = Self::translated_block(dom, unit)
            .and_then(|block| dom.metadata(block, CONTEXT_KEY))
            .unwrap_or_default()
            .to_string();

        let popup = self.open_popup(
            unit,
            PopupKind::Word(WordPopup {
                word: word.clone(),
                context,
                gloss: None,
                status: LookupStatus::Loading,
            }),
            effects,
        );
        effects.push(Effect::RequestGloss { popup, word });
    }

    fn open_popup(&mut self, anchor: NodeId, kind: PopupKind, effects: &mut Vec<Effect>) -> PopupId {
        self.close_popup(effects);
        let id = PopupId(self.next_popup);
        self.next_popup += 1;
        self.popup = Some(Popup { id, anchor, kind });
        effects.push(Effect::PopupOpened(id));
        id
    }

    fn close_popup(&mut self, effects: &mut Vec<Effect>) {
        if let Some(popup) = self.popup.take() {
            effects.push(Effect::PopupClosed(popup.id));
        }
    }

    /// Word popup `id`, if it is still the open one
    fn active_word_popup(&mut self, id: PopupId) -> Option<&mut WordPopup> {
        match self.popup.as_mut() {
            Some(Popup {
                id: open,
                kind: PopupKind::Word(word),
                ..
            }) if *open == id => Some(word),
            _ => None,
        }
    }

    /// Apply the offline gloss for popup `id`. Returns false when the popup
    /// is gone (a stale result) and nothing changed.
    pub fn resolve_gloss(&mut self, id: PopupId, gloss: Option<String>) -> bool {
        match self.active_word_popup(id) {
            Some(popup) if popup.status == LookupStatus::Loading => {
                popup.gloss = gloss;
                popup.status = LookupStatus::Offer;
                true
            }
            _ => {
                log::debug!("Dropping stale gloss for {:?}", id);
                false
            }
        }
    }

    /// Start (or retry) the deeper analysis for popup `id`
    pub fn request_analysis(&mut self, id: PopupId) -> Option<AnalysisRequest> {
        let popup = self.active_word_popup(id)?;
        match popup.status {
            LookupStatus::Offer | LookupStatus::AnalysisFailed(_) => {
                popup.status = LookupStatus::AnalysisPending;
                Some(AnalysisRequest {
                    popup: id,
                    word: popup.word.clone(),
                    context: popup.context.clone(),
                })
            }
            _ => None,
        }
    }

    /// Apply an analysis result for popup `id`. Returns false for stale results.
    pub fn resolve_analysis(&mut self, id: PopupId, result: Result<WordAnalysis, String>) -> bool {
        match self.active_word_popup(id) {
            Some(popup) if popup.status == LookupStatus::AnalysisPending => {
                popup.status = match result {
                    Ok(analysis) => LookupStatus::Analyzed(analysis),
                    Err(message) => LookupStatus::AnalysisFailed(message),
                };
                true
            }
            _ => {
                log::debug!("Dropping stale analysis for {:?}", id);
                false
            }
        }
    }

    /// Close the popup, drop any highlight and leave sentence mode
    pub fn reset<D: Dom + ?Sized>(&mut self, dom: &mut D) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.close_popup(&mut effects);
        self.release_modifier(dom, &mut effects);
        effects
    }
}
