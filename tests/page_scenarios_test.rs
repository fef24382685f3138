//! End-to-end page scenarios against the in-memory document, with fake
//! extraction and translation.

use std::collections::HashMap;
use std::sync::Arc;

use wortblick::blocks::CandidateBlock;
use wortblick::config::SentenceModifier;
use wortblick::dom::{Document, Dom};
use wortblick::extract::{Article, Extractor};
use wortblick::interaction::{InputEvent, Key};
use wortblick::matcher::{match_blocks, MatchOptions};
use wortblick::reader::Reader;
use wortblick::rewrite::{apply_translations, restore, WORD_KEY};
use wortblick::translate::{BatchOptions, BlockTranslator, CancelToken, TranslatedBlock};
use wortblick::{Result, WortblickError};

/// Treats the page's `<main>` (or `<body>`) as the article
struct MainExtractor;

impl Extractor for MainExtractor {
    fn extract(&self, html: &str) -> Option<Article> {
        let doc = Document::parse(html);
        let main = doc
            .elements_by_tag(&["main"])
            .first()
            .copied()
            .unwrap_or_else(|| doc.body());
        Some(Article {
            title: doc.title(),
            html: doc.outer_html(main),
            length: doc.text_content(main).chars().count(),
        })
    }
}

struct NoArticle;

impl Extractor for NoArticle {
    fn extract(&self, _html: &str) -> Option<Article> {
        None
    }
}

/// Looks translations up in a table; fails any batch containing `poison`
struct TableTranslator {
    table: HashMap<String, String>,
    poison: Option<String>,
}

impl TableTranslator {
    fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            table: pairs.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect(),
            poison: None,
        }
    }

    fn failing_on(mut self, word: &str) -> Self {
        self.poison = Some(word.to_string());
        self
    }
}

impl BlockTranslator for TableTranslator {
    fn translate_batch(&self, blocks: &[String], _cancel: &CancelToken) -> Result<Vec<String>> {
        if let Some(poison) = &self.poison {
            if blocks.iter().any(|b| b.contains(poison.as_str())) {
                return Err(WortblickError::TranslationFailed("service unavailable".into()));
            }
        }
        Ok(blocks
            .iter()
            .map(|b| self.table.get(b).cloned().unwrap_or_else(|| b.clone()))
            .collect())
    }
}

const DOG: &str = "Der Hund läuft schnell durch den großen grünen Park in der Stadt.";
const DOG_EN: &str = "The dog runs quickly through the large green park in the city.";
const CAT: &str = "Die Katze schläft den ganzen Nachmittag auf dem warmen Sofa.";

fn page(paragraphs: &[&str]) -> String {
    let body: String = paragraphs.iter().map(|p| format!("<p>{}</p>", p)).collect();
    format!(
        "<!DOCTYPE html><html><head><title>Tiere</title></head><body><header>Menü</header><main>{}</main></body></html>",
        body
    )
}

#[test]
fn test_extraction_failure_mutates_nothing() {
    let mut reader = Reader::from_html(&page(&[DOG]), SentenceModifier::Alt);
    let before = reader.document().to_html();

    let err = reader
        .translate_page(&NoArticle, Arc::new(TableTranslator::new(&[])), BatchOptions::default())
        .unwrap_err();

    assert!(matches!(err, WortblickError::ExtractionFailure));
    assert_eq!(reader.document().to_html(), before);
    assert!(!reader.is_translated());
}

#[test]
fn test_translated_block_renders_word_units() {
    let mut reader = Reader::from_html(&page(&[DOG]), SentenceModifier::Alt);
    let translator = TableTranslator::new(&[(DOG, DOG_EN)]);

    let report = reader
        .translate_page(&MainExtractor, Arc::new(translator), BatchOptions::default())
        .unwrap();
    assert_eq!(report.translated, 1);

    let doc = reader.document();
    let p = doc.elements_by_tag(&["p"])[0];
    assert_eq!(doc.text_content(p), DOG_EN);

    let keys: Vec<&str> = doc
        .element_children(p)
        .into_iter()
        .filter_map(|unit| doc.metadata(unit, WORD_KEY))
        .collect();
    assert_eq!(
        keys,
        vec!["The", "dog", "runs", "quickly", "through", "the", "large", "green", "park", "in", "the", "city"]
    );
}

#[test]
fn test_failed_batch_keeps_original_text() {
    let mut reader = Reader::from_html(&page(&[DOG, CAT]), SentenceModifier::Alt);
    let translator = TableTranslator::new(&[(DOG, DOG_EN)]).failing_on("Katze");
    let options = BatchOptions {
        batch_size: 1,
        ..BatchOptions::default()
    };

    let report = reader
        .translate_page(&MainExtractor, Arc::new(translator), options)
        .unwrap();

    assert_eq!(report.failed_batches, 1);
    assert_eq!(report.total_batches, 2);
    assert_eq!(report.translated, 2);
    assert_eq!(report.untranslated, 1);

    let doc = reader.document();
    let ps = doc.elements_by_tag(&["p"]);
    assert_eq!(doc.text_content(ps[0]), DOG_EN);
    assert_eq!(doc.text_content(ps[1]), CAT);
}

#[test]
fn test_restore_returns_page_to_original_markup() {
    let html = "<html><head><title>T</title></head><body><main>\
        <h2>Ein <em>kurzer</em> Bericht über den Hund im Park</h2>\
        <p class=\"lead\">Der Hund läuft <a href=\"/park\">durch den Park</a> und bellt laut.</p>\
        <ul><li>Erstens: der Hund ist sehr schnell unterwegs heute.</li></ul>\
        </main></body></html>";
    let mut reader = Reader::from_html(html, SentenceModifier::Alt);
    let before = reader.document().to_html();

    let identity = TableTranslator::new(&[]);
    let report = reader
        .translate_page(&MainExtractor, Arc::new(identity), BatchOptions::default())
        .unwrap();
    assert_eq!(report.translated, 3);

    assert_eq!(reader.restore(), 3);
    assert_eq!(reader.document().to_html(), before);
}

#[test]
fn test_restore_keeps_irregular_class_whitespace() {
    let html = format!(
        "<html><head><title>T</title></head><body><main><p class=\"lead  intro \">{}</p></main></body></html>",
        DOG
    );
    let mut reader = Reader::from_html(&html, SentenceModifier::Alt);
    let before = reader.document().to_html();

    reader
        .translate_page(&MainExtractor, Arc::new(TableTranslator::new(&[(DOG, DOG_EN)])), BatchOptions::default())
        .unwrap();
    assert_eq!(reader.restore(), 1);

    let doc = reader.document();
    let p = doc.elements_by_tag(&["p"])[0];
    assert_eq!(doc.attribute(p, "class"), Some("lead  intro "));
    assert_eq!(doc.to_html(), before);
}

#[test]
fn test_sentence_mode_then_restore_keeps_empty_root_class() {
    let html = format!(
        "<html class=\"\"><head><title>T</title></head><body><main><p>{}</p></main></body></html>",
        DOG
    );
    let mut reader = Reader::from_html(&html, SentenceModifier::Alt);
    let before = reader.document().to_html();

    reader
        .translate_page(&MainExtractor, Arc::new(TableTranslator::new(&[(DOG, DOG_EN)])), BatchOptions::default())
        .unwrap();
    reader.dispatch(InputEvent::KeyDown(Key::Alt));
    reader.restore();

    let doc = reader.document();
    assert_eq!(doc.attribute(doc.document_element(), "class"), Some(""));
    assert_eq!(doc.to_html(), before);
}

#[test]
fn test_apply_then_restore_preserves_text_of_every_element() {
    let mut doc = Document::parse(&page(&[DOG, CAT, "Kurz."]));
    let ps = doc.elements_by_tag(&["p"]);
    let texts: Vec<String> = ps.iter().map(|&p| doc.text_content(p)).collect();

    let session = apply_translations(
        &mut doc,
        &ps,
        &[
            TranslatedBlock::new(DOG, DOG_EN),
            TranslatedBlock::new(CAT, "  The cat\tsleeps.  "),
            TranslatedBlock::new("Kurz.", "Short."),
        ],
    );
    assert_eq!(doc.text_content(ps[1]), "  The cat\tsleeps.  ");

    restore(&mut doc, session);
    let after: Vec<String> = ps.iter().map(|&p| doc.text_content(p)).collect();
    assert_eq!(after, texts);
}

#[test]
fn test_matcher_never_reuses_an_element() {
    let doc = Document::parse(&page(&[DOG, DOG]));
    let blocks = vec![CandidateBlock::new(DOG), CandidateBlock::new(DOG), CandidateBlock::new(DOG)];

    let results = match_blocks(&blocks, &doc, MatchOptions::default());
    assert_eq!(results.len(), 2);
    assert_ne!(results[0].element, results[1].element);
}

#[test]
fn test_matcher_skips_ancestors_of_matched_elements() {
    // The paragraph is not a direct child, so the div stays a candidate
    let html = format!(
        "<html><body><div>Vorwort: <article><p>{}</p></article></div></body></html>",
        DOG
    );
    let doc = Document::parse(&html);
    let outer_text = format!("Vorwort: {}", DOG);
    let blocks = vec![CandidateBlock::new(DOG), CandidateBlock::new(outer_text)];

    let results = match_blocks(&blocks, &doc, MatchOptions::default());
    assert_eq!(results.len(), 1);
    assert_eq!(doc.tag_name(results[0].element), Some("p"));
}

#[test]
fn test_second_translation_is_rejected_until_restored() {
    let mut reader = Reader::from_html(&page(&[DOG]), SentenceModifier::Alt);
    let translator: Arc<dyn BlockTranslator> = Arc::new(TableTranslator::new(&[(DOG, DOG_EN)]));

    reader
        .translate_page(&MainExtractor, Arc::clone(&translator), BatchOptions::default())
        .unwrap();
    assert!(matches!(
        reader.translate_page(&MainExtractor, Arc::clone(&translator), BatchOptions::default()),
        Err(WortblickError::SessionActive)
    ));

    reader.restore();
    reader
        .translate_page(&MainExtractor, translator, BatchOptions::default())
        .unwrap();
    assert!(reader.is_translated());
}
