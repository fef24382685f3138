//! Reversible in-place rewrite of matched elements.
//!
//! A translated element keeps its original text in `data-wb-original`, the
//! source sentence in `data-wb-context`, and carries the `wb-translated`
//! class. Its content becomes a run of word units and plain text whose
//! concatenation is exactly the translated string. [`restore`] undoes all of
//! it.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::{Dom, Listener, NodeId};
use crate::session::{SavedElement, TranslationSession};
use crate::translate::TranslatedBlock;

pub const TRANSLATED_CLASS: &str = "wb-translated";
pub const WORD_CLASS: &str = "wb-word";
pub const ORIGINAL_KEY: &str = "wb-original";
pub const CONTEXT_KEY: &str = "wb-context";
pub const WORD_KEY: &str = "wb-key";

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+").expect("Invalid whitespace regex pattern")
});

static LETTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\p{L}").expect("Invalid letter regex pattern")
});

// Everything that is not a letter, mark, apostrophe or hyphen
static NON_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\p{L}\p{M}'’\-]").expect("Invalid word key regex pattern")
});

/// A piece of translated text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment<'a> {
    /// Interactive word unit; `key` is what gets looked up
    Word { text: &'a str, key: String },
    /// Whitespace or letterless text, rendered as-is
    Plain(&'a str),
}

impl<'a> Fragment<'a> {
    pub fn text(&self) -> &'a str {
        match self {
            Fragment::Word { text, .. } => text,
            Fragment::Plain(text) => text,
        }
    }
}

/// Lookup key for a word fragment: `"Wort."` → `"Wort"`
pub fn word_key(fragment: &str) -> String {
    NON_KEY_RE.replace_all(fragment, "").into_owned()
}

fn classify(piece: &str) -> Fragment<'_> {
    if LETTER_RE.is_match(piece) {
        Fragment::Word {
            text: piece,
            key: word_key(piece),
        }
    } else {
        Fragment::Plain(piece)
    }
}

/// Split text on whitespace while keeping the whitespace runs, so the
/// fragments concatenate back to `text`
pub fn tokenize(text: &str) -> Vec<Fragment<'_>> {
    let mut fragments = Vec::new();
    let mut last = 0;

    for ws in WHITESPACE_RE.find_iter(text) {
        if ws.start() > last {
            fragments.push(classify(&text[last..ws.start()]));
        }
        fragments.push(Fragment::Plain(ws.as_str()));
        last = ws.end();
    }
    if last < text.len() {
        fragments.push(classify(&text[last..]));
    }

    fragments
}

/// Replace the content of `element` with interactive word units for `translated`
pub fn render_tokenized<D: Dom + ?Sized>(dom: &mut D, element: NodeId, translated: &str) {
    dom.take_children(element);

    for fragment in tokenize(translated) {
        match fragment {
            Fragment::Word { text, key } => {
                let unit = dom.append_element(element, "span");
                dom.add_class(unit, WORD_CLASS);
                dom.set_metadata(unit, WORD_KEY, &key);
                dom.append_text(unit, text);
                dom.add_listener(unit, Listener::WordClick);
            }
            Fragment::Plain(text) => {
                dom.append_text(element, text);
            }
        }
    }
}

/// Rewrite each element with its translation, pairing them by position.
///
/// Surplus elements or translations are ignored.
pub fn apply_translations<D: Dom + ?Sized>(
    dom: &mut D,
    elements: &[NodeId],
    translations: &[TranslatedBlock],
) -> TranslationSession {
    let mut session = TranslationSession::default();

    for (&element, block) in elements.iter().zip(translations) {
        let original = dom.text_content(element);
        let class = dom.class_attribute(element).map(String::from);

        dom.set_metadata(element, ORIGINAL_KEY, &original);
        dom.set_metadata(element, CONTEXT_KEY, &block.original);
        dom.add_class(element, TRANSLATED_CLASS);

        let saved = dom.take_children(element);
        render_tokenized(dom, element, &block.translated);
        dom.add_listener(element, Listener::SentenceClick);

        session.record(SavedElement {
            element,
            original,
            class: Some(class),
            children: Some(saved),
        });
    }

    if elements.len() != translations.len() {
        log::debug!(
            "Applied {} translations ({} elements, {} translated blocks)",
            session.len(),
            elements.len(),
            translations.len()
        );
    }

    session
}

/// Put every recorded element back the way it was. Elements no longer in the
/// document are skipped. Returns the number restored.
pub fn restore<D: Dom + ?Sized>(dom: &mut D, session: TranslationSession) -> usize {
    let mut restored = 0;

    for saved in session.into_saved() {
        let element = saved.element;
        if !dom.is_connected(element) {
            log::debug!("Skipping restore of detached element {:?}", element);
            continue;
        }

        dom.remove_listener(element, Listener::SentenceClick);
        for node in dom.descendants(element) {
            dom.remove_listener(node, Listener::WordClick);
        }

        match saved.children {
            Some(children) => dom.replace_children(element, children),
            None => dom.set_text_content(element, &saved.original),
        }

        match saved.class {
            Some(class) => dom.set_class_attribute(element, class.as_deref()),
            None => dom.remove_class(element, TRANSLATED_CLASS),
        }
        dom.remove_metadata(element, ORIGINAL_KEY);
        dom.remove_metadata(element, CONTEXT_KEY);
        restored += 1;
    }

    restored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn concat(fragments: &[Fragment<'_>]) -> String {
        fragments.iter().map(|f| f.text()).collect()
    }

    #[test]
    fn test_word_key_strips_punctuation() {
        assert_eq!(word_key("Wort."), "Wort");
        assert_eq!(word_key("„Straße“,"), "Straße");
        assert_eq!(word_key("don't"), "don't");
        assert_eq!(word_key("E-Mail!"), "E-Mail");
        assert_eq!(word_key("(1990er)"), "er");
    }

    #[test]
    fn test_tokenize_round_trip() {
        for text in [
            "The dog runs quickly.",
            "  leading and trailing  ",
            "tabs\tand\nnewlines\r\n here",
            "Zahlen 42 und — Striche",
            "single",
        ] {
            assert_eq!(concat(&tokenize(text)), text);
        }
    }

    #[test]
    fn test_tokenize_marks_letterless_fragments_plain() {
        let fragments = tokenize("Preis: 42 € — gut");
        let words: Vec<&str> = fragments
            .iter()
            .filter_map(|f| match f {
                Fragment::Word { key, .. } => Some(key.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(words, vec!["Preis", "gut"]);
        assert!(fragments.contains(&Fragment::Plain("42")));
        assert!(fragments.contains(&Fragment::Plain("—")));
    }

    #[test]
    fn test_render_tokenized_builds_word_units() {
        let mut doc = Document::parse("<html><body><p>old</p></body></html>");
        let p = doc.elements_by_tag(&["p"])[0];

        render_tokenized(&mut doc, p, "Hallo, Welt!");
        assert_eq!(doc.text_content(p), "Hallo, Welt!");
        assert_eq!(
            doc.inner_html(p),
            "<span class=\"wb-word\" data-wb-key=\"Hallo\">Hallo,</span> <span class=\"wb-word\" data-wb-key=\"Welt\">Welt!</span>"
        );
        let units = doc.elements_by_tag(&["span"]);
        assert!(units.iter().all(|&u| doc.has_listener(u, Listener::WordClick)));
    }

    #[test]
    fn test_apply_and_restore_is_lossless() {
        let html = "<html><head></head><body><p class=\"lead\">Der <a href=\"/hund\">Hund</a> läuft.</p><p>Zweiter Absatz hier.</p></body></html>";
        let mut doc = Document::parse(html);
        let before = doc.to_html();
        let ps = doc.elements_by_tag(&["p"]);

        let session = apply_translations(
            &mut doc,
            &ps,
            &[
                TranslatedBlock::new("Der Hund läuft.", "The dog runs."),
                TranslatedBlock::new("Zweiter Absatz hier.", "Second paragraph here."),
            ],
        );
        assert_eq!(session.len(), 2);
        assert_eq!(doc.text_content(ps[0]), "The dog runs.");
        assert_eq!(doc.metadata(ps[0], ORIGINAL_KEY), Some("Der Hund läuft."));
        assert_eq!(doc.metadata(ps[0], CONTEXT_KEY), Some("Der Hund läuft."));
        assert!(doc.has_class(ps[0], TRANSLATED_CLASS));
        assert!(doc.has_listener(ps[0], Listener::SentenceClick));

        assert_eq!(restore(&mut doc, session), 2);
        assert_eq!(doc.to_html(), before);
        assert!(!doc.has_listener(ps[0], Listener::SentenceClick));
    }

    #[test]
    fn test_restore_keeps_class_attribute_verbatim() {
        let html = "<html><head></head><body><p class=\"lead  intro \">Der Hund bellt.</p><p class=\"\">Die Katze schläft.</p></body></html>";
        let mut doc = Document::parse(html);
        let before = doc.to_html();
        let ps = doc.elements_by_tag(&["p"]);

        let session = apply_translations(
            &mut doc,
            &ps,
            &[
                TranslatedBlock::new("Der Hund bellt.", "The dog barks."),
                TranslatedBlock::new("Die Katze schläft.", "The cat sleeps."),
            ],
        );
        assert!(doc.has_class(ps[0], TRANSLATED_CLASS));
        assert!(doc.has_class(ps[0], "intro"));

        assert_eq!(restore(&mut doc, session), 2);
        assert_eq!(doc.attribute(ps[0], "class"), Some("lead  intro "));
        assert_eq!(doc.attribute(ps[1], "class"), Some(""));
        assert_eq!(doc.to_html(), before);
    }

    #[test]
    fn test_surplus_is_ignored() {
        let mut doc = Document::parse("<html><body><p>a</p><p>b</p><p>c</p></body></html>");
        let ps = doc.elements_by_tag(&["p"]);

        let session = apply_translations(&mut doc, &ps, &[TranslatedBlock::new("a", "x")]);
        assert_eq!(session.len(), 1);
        assert_eq!(doc.text_content(ps[1]), "b");

        let mut doc = Document::parse("<html><body><p>a</p></body></html>");
        let ps = doc.elements_by_tag(&["p"]);
        let session = apply_translations(
            &mut doc,
            &ps,
            &[TranslatedBlock::new("a", "x"), TranslatedBlock::new("b", "y")],
        );
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_restore_skips_detached_elements() {
        let mut doc = Document::parse("<html><body><div><p>one</p></div><p>two</p></body></html>");
        let div = doc.elements_by_tag(&["div"])[0];
        let ps = doc.elements_by_tag(&["p"]);

        let session = apply_translations(
            &mut doc,
            &ps,
            &[TranslatedBlock::new("one", "eins"), TranslatedBlock::new("two", "zwei")],
        );
        // Page script removed the first paragraph
        doc.take_children(div);

        assert_eq!(restore(&mut doc, session), 1);
        assert_eq!(doc.text_content(ps[1]), "two");
        assert!(!doc.has_class(ps[1], TRANSLATED_CLASS));
    }
}
