//! Word lookup command

use colored::Colorize;

use wortblick::analysis::{LlmAnalyzer, WordAnalysis, WordAnalyzer};
use wortblick::config::Settings;
use wortblick::error::Result;
use wortblick::gloss::LazyWordTranslator;
use wortblick::rewrite::word_key;

/// Gloss a word offline, then analyze it when asked or when no gloss exists
pub fn cmd_lookup(word: &str, context: Option<String>, analyze: bool, json: bool) -> Result<()> {
    let settings = Settings::load_or_default();
    let key = word_key(word);
    let key = if key.is_empty() { word.trim().to_string() } else { key };

    let gloss = LazyWordTranslator::for_settings(&settings).translate(&key);

    let analysis: Option<WordAnalysis> = if analyze || gloss.is_none() {
        let analyzer = LlmAnalyzer::new(&settings)?;
        let context = context.unwrap_or_else(|| key.clone());
        Some(analyzer.analyze(&key, &context, &settings)?)
    } else {
        None
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "word": key,
                "gloss": gloss,
                "analysis": analysis,
            }))?
        );
        return Ok(());
    }

    println!("\n{}", key.bold());
    match &gloss {
        Some(gloss) => println!("  {} {}", "Gloss:".dimmed(), gloss),
        None => println!("  {}", "No offline gloss".dimmed()),
    }

    if let Some(analysis) = analysis {
        println!("  {} {}", "Translation:".dimmed(), analysis.translation.green());
        if let Some(pos) = &analysis.pos {
            println!("  {} {}", "Part of speech:".dimmed(), pos);
        }
        if let Some(article) = &analysis.article {
            println!("  {} {}", "Article:".dimmed(), article);
        }
        if let Some(example) = &analysis.example {
            println!("  {} {}", "Example:".dimmed(), example.italic());
        }
        if let Some(explanation) = &analysis.explanation {
            println!("\n  {}", explanation);
        }
    } else {
        println!("\n  {}", "Run with --analyze for grammar details".dimmed());
    }

    Ok(())
}
