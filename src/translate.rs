//! Batch translation of article blocks.
//!
//! Blocks are cut into batches which are translated concurrently, one thread
//! per batch, under a shared hard deadline. Results are reassembled in block
//! order; a failed or timed-out batch keeps its original text.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::{CefrLevel, Settings};
use crate::error::{Result, WortblickError};
use crate::llm::{strip_code_fencing, LlmClient};

/// A block and its translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedBlock {
    pub original: String,
    pub translated: String,
}

impl TranslatedBlock {
    pub fn new(original: impl Into<String>, translated: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            translated: translated.into(),
        }
    }

    /// A block whose batch failed: shown untranslated
    fn untranslated(original: &str) -> Self {
        Self::new(original, original)
    }
}

/// Result of translating all blocks of a page
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    /// One entry per input block, in input order
    pub blocks: Vec<TranslatedBlock>,
    /// Blocks left untranslated because their batch failed or timed out
    pub failed_blocks: usize,
    pub failed_batches: usize,
    pub total_batches: usize,
}

/// Set once a batch's deadline has passed; translators check it before
/// handing back a late result
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Translates one batch of blocks, returning one string per block
pub trait BlockTranslator: Send + Sync {
    fn translate_batch(&self, blocks: &[String], cancel: &CancelToken) -> Result<Vec<String>>;
}

/// Batching knobs
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub batch_size: usize,
    pub timeout: Duration,
}

impl BatchOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            batch_size: settings.batch_size.max(1),
            timeout: Duration::from_secs(settings.batch_timeout_secs.max(1)),
        }
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Translate `blocks` in concurrent batches.
///
/// Batch failures are counted, not returned, except when every batch failed
/// on the credential: that error is returned so the caller can point the user
/// at their settings.
pub fn translate_blocks(
    translator: Arc<dyn BlockTranslator>,
    blocks: &[String],
    options: BatchOptions,
) -> Result<BatchOutcome> {
    let batch_size = options.batch_size.max(1);
    let batches: Vec<Vec<String>> = blocks.chunks(batch_size).map(|c| c.to_vec()).collect();
    let total_batches = batches.len();
    if total_batches == 0 {
        return Ok(BatchOutcome::default());
    }

    let cancel = CancelToken::new();
    let (tx, rx) = mpsc::channel();

    for (index, batch) in batches.iter().cloned().enumerate() {
        let tx = tx.clone();
        let translator = Arc::clone(&translator);
        let cancel = cancel.clone();
        thread::spawn(move || {
            let result = translator.translate_batch(&batch, &cancel);
            let _ = tx.send((index, result));
        });
    }
    drop(tx);

    let deadline = Instant::now() + options.timeout;
    let mut results: Vec<Option<Result<Vec<String>>>> = (0..total_batches).map(|_| None).collect();
    let mut received = 0;

    while received < total_batches {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok((index, result)) => {
                results[index] = Some(result);
                received += 1;
            }
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Translation timed out after {:?}; {} of {} batches outstanding",
                    options.timeout,
                    total_batches - received,
                    total_batches
                );
                cancel.cancel();
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let mut outcome = BatchOutcome {
        blocks: Vec::with_capacity(blocks.len()),
        failed_blocks: 0,
        failed_batches: 0,
        total_batches,
    };
    let mut credential_error = None;

    for (index, (batch, result)) in batches.iter().zip(results).enumerate() {
        match result {
            Some(Ok(translated)) => {
                if translated.len() != batch.len() {
                    log::warn!(
                        "Batch {} returned {} translations for {} blocks",
                        index,
                        translated.len(),
                        batch.len()
                    );
                }
                // Pad short replies with originals so later batches stay aligned
                for (i, original) in batch.iter().enumerate() {
                    match translated.get(i) {
                        Some(text) if !text.trim().is_empty() => {
                            outcome.blocks.push(TranslatedBlock::new(original.as_str(), text.as_str()))
                        }
                        _ => outcome.blocks.push(TranslatedBlock::untranslated(original)),
                    }
                }
            }
            Some(Err(e)) => {
                log::warn!("Batch {} failed: {}", index, e);
                outcome.failed_batches += 1;
                outcome.failed_blocks += batch.len();
                if e.is_credential_error() && credential_error.is_none() {
                    credential_error = Some(e);
                }
                outcome
                    .blocks
                    .extend(batch.iter().map(|b| TranslatedBlock::untranslated(b)));
            }
            None => {
                outcome.failed_batches += 1;
                outcome.failed_blocks += batch.len();
                outcome
                    .blocks
                    .extend(batch.iter().map(|b| TranslatedBlock::untranslated(b)));
            }
        }
    }

    if outcome.failed_batches == total_batches {
        if let Some(e) = credential_error {
            return Err(e);
        }
    }

    Ok(outcome)
}

/// What the translation should look like
#[derive(Debug, Clone)]
pub struct TranslationStyle {
    pub target_language: String,
    pub cefr_level: CefrLevel,
    pub simplify: bool,
}

impl TranslationStyle {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            target_language: settings.target_language.clone(),
            cefr_level: settings.cefr_level,
            simplify: settings.simplify,
        }
    }
}

const TRANSLATE_SYSTEM_PROMPT: &str = "You are a translator for language learners. Respond only with a JSON array of strings, one per input block, in the same order. Do not include any text before or after the JSON.";

/// Block translator backed by the chat completions endpoint
pub struct LlmTranslator {
    client: LlmClient,
    style: TranslationStyle,
}

impl LlmTranslator {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: LlmClient::from_settings(settings)?,
            style: TranslationStyle::from_settings(settings),
        })
    }
}

/// Build the user prompt for one batch
fn build_prompt(style: &TranslationStyle, blocks: &[String]) -> String {
    let level_rule = if style.simplify {
        format!(
            "Rewrite for a reader at CEFR level {}: use vocabulary and sentence structure appropriate for that level, keeping the meaning.",
            style.cefr_level
        )
    } else {
        format!(
            "Translate faithfully; the reader is at CEFR level {}, but do not simplify.",
            style.cefr_level
        )
    };
    let input = serde_json::to_string_pretty(blocks).unwrap_or_default();

    format!(
        "Translate each of the following {count} text blocks into {lang}.\n{rule}\nReturn exactly {count} strings.\n\nBlocks:\n{input}",
        count = blocks.len(),
        lang = style.target_language,
        rule = level_rule,
        input = input
    )
}

/// Parse the model's JSON array reply
fn parse_reply(reply: &str) -> Result<Vec<String>> {
    let json = strip_code_fencing(reply);
    serde_json::from_str(&json)
        .map_err(|e| WortblickError::TranslationFailed(format!("Malformed translation reply: {}", e)))
}

impl BlockTranslator for LlmTranslator {
    fn translate_batch(&self, blocks: &[String], cancel: &CancelToken) -> Result<Vec<String>> {
        let prompt = build_prompt(&self.style, blocks);
        let reply = self.client.complete(TRANSLATE_SYSTEM_PROMPT, &prompt)?;
        if cancel.is_cancelled() {
            return Err(WortblickError::TranslationFailed("Batch cancelled after timeout".into()));
        }
        parse_reply(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl BlockTranslator for Upper {
        fn translate_batch(&self, blocks: &[String], _cancel: &CancelToken) -> Result<Vec<String>> {
            Ok(blocks.iter().map(|b| b.to_uppercase()).collect())
        }
    }

    /// Fails every batch whose first block starts with "fail"
    struct Picky;

    impl BlockTranslator for Picky {
        fn translate_batch(&self, blocks: &[String], _cancel: &CancelToken) -> Result<Vec<String>> {
            if blocks[0].starts_with("fail") {
                return Err(WortblickError::TranslationFailed("upstream rejected".into()));
            }
            Ok(blocks.iter().map(|b| format!("<{}>", b)).collect())
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn options(batch_size: usize, timeout_ms: u64) -> BatchOptions {
        BatchOptions {
            batch_size,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    #[test]
    fn test_results_reassembled_in_order() {
        let blocks = strings(&["a", "b", "c", "d", "e"]);
        let outcome = translate_blocks(Arc::new(Upper), &blocks, options(2, 5000)).unwrap();
        assert_eq!(outcome.total_batches, 3);
        assert_eq!(outcome.failed_batches, 0);
        let translated: Vec<&str> = outcome.blocks.iter().map(|b| b.translated.as_str()).collect();
        assert_eq!(translated, vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn test_failed_batch_keeps_original_text() {
        let blocks = strings(&["ok one", "ok two", "fail three", "fail four"]);
        let outcome = translate_blocks(Arc::new(Picky), &blocks, options(2, 5000)).unwrap();
        assert_eq!(outcome.total_batches, 2);
        assert_eq!(outcome.failed_batches, 1);
        assert_eq!(outcome.failed_blocks, 2);
        assert_eq!(outcome.blocks[0].translated, "<ok one>");
        assert_eq!(outcome.blocks[2].translated, "fail three");
        assert_eq!(outcome.blocks[3].original, "fail four");
    }

    #[test]
    fn test_short_reply_is_padded() {
        struct Short;
        impl BlockTranslator for Short {
            fn translate_batch(&self, blocks: &[String], _c: &CancelToken) -> Result<Vec<String>> {
                Ok(vec![format!("x{}", blocks[0])])
            }
        }
        let blocks = strings(&["a", "b", "c"]);
        let outcome = translate_blocks(Arc::new(Short), &blocks, options(2, 5000)).unwrap();
        let translated: Vec<&str> = outcome.blocks.iter().map(|b| b.translated.as_str()).collect();
        assert_eq!(translated, vec!["xa", "b", "xc"]);
    }

    #[test]
    fn test_timed_out_batch_counts_as_failed() {
        struct Slow;
        impl BlockTranslator for Slow {
            fn translate_batch(&self, blocks: &[String], cancel: &CancelToken) -> Result<Vec<String>> {
                if blocks[0] == "slow" {
                    thread::sleep(Duration::from_millis(2000));
                    assert!(cancel.is_cancelled());
                }
                Ok(blocks.iter().map(|b| b.to_uppercase()).collect())
            }
        }
        let blocks = strings(&["fast", "slow"]);
        let started = Instant::now();
        let outcome = translate_blocks(Arc::new(Slow), &blocks, options(1, 200)).unwrap();
        assert!(started.elapsed() < Duration::from_millis(1500));
        assert_eq!(outcome.failed_batches, 1);
        assert_eq!(outcome.failed_blocks, 1);
        assert_eq!(outcome.blocks[0].translated, "FAST");
        assert_eq!(outcome.blocks[1].translated, "slow");
    }

    #[test]
    fn test_all_batches_rejected_credential_is_error() {
        struct Rejected;
        impl BlockTranslator for Rejected {
            fn translate_batch(&self, _b: &[String], _c: &CancelToken) -> Result<Vec<String>> {
                Err(WortblickError::InvalidCredential("HTTP 401".into()))
            }
        }
        let blocks = strings(&["a", "b"]);
        let result = translate_blocks(Arc::new(Rejected), &blocks, options(1, 5000));
        assert!(matches!(result, Err(WortblickError::InvalidCredential(_))));
    }

    #[test]
    fn test_empty_input() {
        let outcome = translate_blocks(Arc::new(Upper), &[], options(4, 100)).unwrap();
        assert_eq!(outcome.total_batches, 0);
        assert!(outcome.blocks.is_empty());
    }

    #[test]
    fn test_prompt_mentions_level_and_language() {
        let style = TranslationStyle {
            target_language: "German".into(),
            cefr_level: CefrLevel::A2,
            simplify: true,
        };
        let prompt = build_prompt(&style, &strings(&["one", "two"]));
        assert!(prompt.contains("into German"));
        assert!(prompt.contains("CEFR level A2"));
        assert!(prompt.contains("exactly 2 strings"));
    }

    #[test]
    fn test_parse_reply() {
        assert_eq!(
            parse_reply("```json\n[\"Hallo\", \"Welt\"]\n```").unwrap(),
            vec!["Hallo", "Welt"]
        );
        assert!(matches!(
            parse_reply("Sorry, I cannot help."),
            Err(WortblickError::TranslationFailed(_))
        ));
    }
}
