use scraper::{ElementRef, Html, Selector};

/// Below this many characters of text an extraction is treated as a miss
pub const MIN_ARTICLE_CHARS: usize = 100;

/// The readable part of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: Option<String>,
    /// Cleaned article markup
    pub html: String,
    /// Character count of the article text
    pub length: usize,
}

/// Finds the main article of a page.
///
/// Implementations work on a serialized copy of the page and never see the
/// live document.
pub trait Extractor {
    fn extract(&self, html: &str) -> Option<Article>;
}

fn page_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let title: String = document.select(&selector).next()?.text().collect();
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Mozilla Readability running in an embedded JS engine
pub struct ReadabilityExtractor {
    readability: readability_js::Readability,
}

impl ReadabilityExtractor {
    /// Start the JS engine; `None` when it cannot be created
    pub fn new() -> Option<Self> {
        match readability_js::Readability::new() {
            Ok(readability) => Some(Self { readability }),
            Err(e) => {
                log::warn!("Readability engine unavailable: {:?}", e);
                None
            }
        }
    }
}

impl Extractor for ReadabilityExtractor {
    fn extract(&self, html: &str) -> Option<Article> {
        let article = match self.readability.parse(html) {
            Ok(article) => article,
            Err(e) => {
                log::debug!("Readability could not parse page: {:?}", e);
                return DensityExtractor.extract(html);
            }
        };

        let length = article.text_content.trim().chars().count();
        if length < MIN_ARTICLE_CHARS {
            log::debug!("Readability result too short ({} chars)", length);
            return None;
        }

        Some(Article {
            title: page_title(&Html::parse_document(html)),
            html: article.content,
            length,
        })
    }
}

/// Built-in extractor that picks the densest block of prose.
///
/// Scores every structural element by text length, paragraph count, link
/// density, tag semantics and class/id hints, and returns the best one.
#[derive(Debug, Clone, Copy, Default)]
pub struct DensityExtractor;

const CANDIDATES: &str = "article, main, section, div, td, body";

const POSITIVE_HINTS: &[&str] = &["content", "article", "post", "entry", "story", "body-text"];
const NEGATIVE_HINTS: &[&str] = &[
    "sidebar", "nav", "menu", "comment", "footer", "header", "banner", "social", "share", "widget",
];

fn text_len(el: ElementRef<'_>) -> usize {
    el.text().map(|t| t.trim().chars().count()).sum()
}

fn link_density(el: ElementRef<'_>, total: usize) -> f32 {
    let Ok(links) = Selector::parse("a") else {
        return 0.0;
    };
    let linked: usize = el.select(&links).map(text_len).sum();
    if total == 0 {
        0.0
    } else {
        linked as f32 / total as f32
    }
}

fn score(el: ElementRef<'_>) -> f32 {
    let len = text_len(el);
    if len < 25 {
        return f32::MIN;
    }

    let mut score = (len as f32).ln().min(8.0);
    score -= link_density(el, len) * 25.0;

    score += match el.value().name() {
        "article" | "main" => 10.0,
        "section" => 5.0,
        "div" | "td" => 1.0,
        "body" => -2.0,
        _ => 0.0,
    };

    let hints = format!(
        "{} {}",
        el.value().attr("id").unwrap_or(""),
        el.value().attr("class").unwrap_or("")
    )
    .to_lowercase();
    for hint in POSITIVE_HINTS {
        if hints.contains(hint) {
            score += 8.0;
        }
    }
    for hint in NEGATIVE_HINTS {
        if hints.contains(hint) {
            score -= 8.0;
        }
    }

    // Paragraphs directly inside the element, and their prose
    let paragraphs: Vec<usize> = el
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "p" | "blockquote" | "pre" | "h2" | "h3"))
        .map(text_len)
        .collect();
    score += paragraphs.len() as f32 * 3.0;
    score += (paragraphs.iter().sum::<usize>() as f32 / 100.0).min(20.0);

    score
}

impl Extractor for DensityExtractor {
    fn extract(&self, html: &str) -> Option<Article> {
        let document = Html::parse_document(html);
        let selector = Selector::parse(CANDIDATES).ok()?;

        let best = document
            .select(&selector)
            .map(|el| (score(el), el))
            .filter(|(s, _)| *s > f32::MIN)
            .fold(None, |best: Option<(f32, ElementRef<'_>)>, (s, el)| match best {
                Some((b, _)) if b >= s => best,
                _ => Some((s, el)),
            })?
            .1;

        let length = text_len(best);
        if length < MIN_ARTICLE_CHARS {
            log::debug!("Densest block too short ({} chars)", length);
            return None;
        }

        log::debug!("Density extractor picked <{}> with {} chars", best.value().name(), length);
        Some(Article {
            title: page_title(&document),
            html: best.html(),
            length,
        })
    }
}

/// Readability when its engine starts, the density scorer otherwise
pub fn default_extractor() -> Box<dyn Extractor> {
    match ReadabilityExtractor::new() {
        Some(extractor) => Box::new(extractor),
        None => Box::new(DensityExtractor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title> Der Hund </title></head><body>
        <nav class="menu"><a href="/">Start</a> <a href="/a">Archiv</a> <a href="/k">Kontakt und Impressum</a></nav>
        <div id="sidebar"><p>Werbung für ein Produkt, das niemand braucht und niemand kauft.</p></div>
        <div class="article-body">
            <h2>Ein Tag im Park</h2>
            <p>Der Hund läuft schnell durch den großen grünen Park in der Stadt.</p>
            <p>Am Nachmittag schläft er lange unter einem alten Baum am Ufer.</p>
            <p>Abends gehen wir gemeinsam nach Hause und essen zusammen.</p>
        </div>
        <footer>Copyright 2024, alle Rechte vorbehalten, bitte nicht kopieren.</footer>
    </body></html>"#;

    #[test]
    fn test_density_picks_article_body() {
        let article = DensityExtractor.extract(PAGE).unwrap();
        assert_eq!(article.title.as_deref(), Some("Der Hund"));
        assert!(article.html.starts_with("<div class=\"article-body\">"));
        assert!(article.html.contains("Der Hund läuft schnell"));
        assert!(!article.html.contains("Werbung"));
        assert!(article.length >= MIN_ARTICLE_CHARS);
    }

    #[test]
    fn test_density_rejects_short_pages() {
        let html = "<html><body><p>Nur ein kurzer Satz, der nicht reicht.</p></body></html>";
        assert!(DensityExtractor.extract(html).is_none());
        assert!(DensityExtractor.extract("").is_none());
    }

    #[test]
    fn test_link_heavy_blocks_lose() {
        let links = "<a href=\"#\">Ein sehr langer Linktext der viel Platz einnimmt</a> ".repeat(6);
        let prose = "<p>Ein ganz normaler Absatz mit einigen Sätzen darin, die etwas erzählen.</p>".repeat(3);
        let html = format!(
            "<html><body><div id=\"links\">{}</div><div id=\"text\">{}</div></body></html>",
            links, prose
        );
        let article = DensityExtractor.extract(&html).unwrap();
        assert!(article.html.starts_with("<div id=\"text\">"));
    }

    #[test]
    fn test_page_title_missing() {
        let doc = Html::parse_document("<html><head><title>  </title></head></html>");
        assert_eq!(page_title(&doc), None);
    }
}
