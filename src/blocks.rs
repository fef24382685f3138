use once_cell::sync::Lazy;
use scraper::{Html, Selector};

/// Blocks shorter than this (in characters) are not worth translating
pub const MIN_BLOCK_CHARS: usize = 30;

static BLOCK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("p, h1, h2, h3, h4, h5, h6, li, blockquote")
        .expect("Invalid block selector")
});

/// One paragraph/heading/list-item/quote of the extracted article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateBlock {
    pub text: String,
}

impl CandidateBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Split the extractor's cleaned HTML into translatable text blocks, in
/// document order
pub fn split_blocks(cleaned_html: &str) -> Vec<CandidateBlock> {
    let fragment = Html::parse_fragment(cleaned_html);

    fragment
        .select(&BLOCK_SELECTOR)
        .map(|el| el.text().collect::<String>())
        .map(|text| text.trim().to_string())
        .filter(|text| text.chars().count() > MIN_BLOCK_CHARS)
        .map(CandidateBlock::new)
        .collect()
}
