//! Page commands: translate, restore, preview

use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;

use wortblick::blocks::split_blocks;
use wortblick::config::{CefrLevel, Settings};
use wortblick::diff::compare_restored;
use wortblick::dom::{Document, Dom};
use wortblick::error::{Result, WortblickError};
use wortblick::extract::default_extractor;
use wortblick::fetch;
use wortblick::matcher::{match_blocks, MatchOptions};
use wortblick::reader::Reader;
use wortblick::translate::{BatchOptions, BlockTranslator, LlmTranslator};

use crate::utils::{truncate_str, write_page};

/// Translate the article of a page and write the rewritten page
#[allow(clippy::too_many_arguments)]
pub fn cmd_translate(
    page: &str,
    output: Option<PathBuf>,
    level: Option<String>,
    target: Option<String>,
    no_simplify: bool,
    batch_size: Option<usize>,
    verify_restore: bool,
    json: bool,
) -> Result<()> {
    let mut settings = Settings::load_or_default();
    if let Some(level) = level {
        settings.cefr_level = CefrLevel::parse(&level).ok_or_else(|| {
            WortblickError::ConfigError(format!("Invalid CEFR level '{}'. Use A1-C2", level))
        })?;
    }
    if let Some(target) = target {
        settings.target_language = target;
    }
    if no_simplify {
        settings.simplify = false;
    }
    if let Some(size) = batch_size {
        settings.batch_size = size;
    }

    // Fail on a missing key before fetching anything
    let translator: Arc<dyn BlockTranslator> = Arc::new(LlmTranslator::new(&settings)?);

    eprintln!("\n{} {}", "Loading".cyan().bold(), page);
    let content = fetch::load_page(page)?;
    eprintln!("  {} Loaded {} bytes of HTML", "✓".green(), content.html.len());

    let mut reader = Reader::from_html(&content.html, settings.sentence_modifier);
    let original = reader.document().to_html();

    eprintln!(
        "  Translating into {} at {}{}",
        settings.target_language,
        settings.cefr_level,
        if settings.simplify { " (simplified)" } else { "" }
    );
    let extractor = default_extractor();
    let report = reader.translate_page(
        extractor.as_ref(),
        translator,
        BatchOptions::from_settings(&settings),
    )?;

    if json {
        eprintln!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if let Some(title) = &report.title {
            eprintln!("  Article: {}", title.bold());
        }
        eprintln!(
            "  {} Translated {} of {} blocks",
            "✓".green(),
            report.translated - report.untranslated,
            report.blocks
        );
        if report.failed_batches > 0 {
            eprintln!(
                "  {} {} of {} batches failed; those blocks keep the original text",
                "!".yellow(),
                report.failed_batches,
                report.total_batches
            );
        }
    }

    let translated = reader.document().to_html();
    write_page(&translated, output.as_deref())?;
    if let Some(path) = &output {
        eprintln!("  Wrote {}", path.display());
    }

    if verify_restore {
        reader.restore();
        let diff = compare_restored(&original, &reader.document().to_html(), 400);
        if diff.identical {
            eprintln!("  {} Restore reproduces the original page exactly", "✓".green());
        } else {
            eprintln!("  {} Restore differs from the original: {}", "✗".red(), diff.summary());
            eprintln!("{}", diff.excerpt.dimmed());
        }
    }

    Ok(())
}

/// Restore a page written by `translate`
pub fn cmd_restore(page: &Path, output: Option<PathBuf>) -> Result<()> {
    let settings = Settings::load_or_default();
    let html = std::fs::read_to_string(page)?;
    let mut reader = Reader::from_html(&html, settings.sentence_modifier);

    let found = reader.recover()?;
    if found == 0 {
        eprintln!("No translated content found in {}", page.display());
    } else {
        let restored = reader.restore();
        eprintln!("{} Restored {} elements", "✓".green(), restored);
    }

    write_page(&reader.into_document().to_html(), output.as_deref())?;
    Ok(())
}

/// Show the extracted article blocks and where they land in the page
pub fn cmd_preview(page: &str, limit: usize, json: bool) -> Result<()> {
    let content = fetch::load_page(page)?;
    let extractor = default_extractor();
    let article = extractor
        .extract(&content.html)
        .ok_or(WortblickError::ExtractionFailure)?;

    let blocks = split_blocks(&article.html);
    let document = Document::parse(&content.html);
    let matches = match_blocks(&blocks, &document, MatchOptions::default());

    if json {
        let rows: Vec<serde_json::Value> = blocks
            .iter()
            .map(|block| {
                let hit = matches.iter().find(|m| m.block == *block);
                serde_json::json!({
                    "text": block.text,
                    "element": hit.and_then(|m| document.tag_name(m.element)),
                    "score": hit.map(|m| m.score),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "title": article.title,
                "length": article.length,
                "blocks": rows,
            }))?
        );
        return Ok(());
    }

    println!("\n{} {}", "Preview".cyan().bold(), content.location);
    if let Some(title) = &article.title {
        println!("  Article: {}", title.bold());
    }
    println!(
        "  {} chars, {} blocks, {} matched in page\n",
        article.length,
        blocks.len(),
        matches.len()
    );

    println!("{}", "─".repeat(60).dimmed());
    for block in &blocks {
        match matches.iter().find(|m| m.block == *block) {
            Some(m) => println!(
                "  {} <{}> {:.2}  {}",
                "✓".green(),
                document.tag_name(m.element).unwrap_or("?"),
                m.score,
                truncate_str(&block.text, limit)
            ),
            None => println!("  {} {}", "✗".red(), truncate_str(&block.text, limit).dimmed()),
        }
    }
    println!("{}", "─".repeat(60).dimmed());

    Ok(())
}
