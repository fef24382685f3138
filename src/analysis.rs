use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::{Result, WortblickError};
use crate::llm::{strip_code_fencing, LlmClient};

/// Grammar analysis of one word in its sentence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordAnalysis {
    /// Translation into the reader's native language
    pub translation: String,
    /// Part of speech (e.g., "noun", "verb")
    #[serde(default)]
    pub pos: Option<String>,
    /// Grammatical article for nouns (e.g., "der")
    #[serde(default)]
    pub article: Option<String>,
    /// Example sentence using the word
    #[serde(default)]
    pub example: Option<String>,
    /// Short grammar explanation in the native language
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Explains a word using the sentence it appeared in
pub trait WordAnalyzer: Send + Sync {
    fn analyze(&self, word: &str, context: &str, settings: &Settings) -> Result<WordAnalysis>;
}

const ANALYSIS_PROMPT: &str = r#"A {{native}} speaker learning {{target}} (CEFR level {{level}}) clicked a word while reading.

Word: {{word}}
Sentence: {{context}}

Explain the word as it is used in this sentence.
Respond ONLY with JSON, no other text:
{
  "translation": "translation into {{native}}",
  "pos": "part of speech",
  "article": "grammatical article if the word is a noun, else null",
  "example": "a short example sentence in {{target}}",
  "explanation": "one or two sentences in {{native}} about form and grammar"
}"#;

const ANALYSIS_SYSTEM_PROMPT: &str = "You are a patient language teacher. Respond only with valid JSON matching the schema provided. Do not include any text before or after the JSON.";

/// Truncate context to keep prompts small
fn truncate_context(context: &str, max_chars: usize) -> String {
    if context.chars().count() <= max_chars {
        context.to_string()
    } else {
        let cut: String = context.chars().take(max_chars).collect();
        format!("{}…", cut)
    }
}

fn build_prompt(word: &str, context: &str, settings: &Settings) -> String {
    ANALYSIS_PROMPT
        .replace("{{native}}", &settings.native_language)
        .replace("{{target}}", &settings.target_language)
        .replace("{{level}}", &settings.cefr_level.to_string())
        .replace("{{word}}", word)
        .replace("{{context}}", &truncate_context(context, 1000))
}

/// Parse and validate the model's reply
fn parse_analysis(reply: &str) -> Result<WordAnalysis> {
    let json = strip_code_fencing(reply);
    let analysis: WordAnalysis = serde_json::from_str(&json)
        .map_err(|e| WortblickError::AnalysisFailed(format!("Malformed analysis reply: {}", e)))?;

    if analysis.translation.trim().is_empty() {
        return Err(WortblickError::AnalysisFailed("Reply has no translation".into()));
    }
    Ok(analysis)
}

/// Word analyzer backed by the chat completions endpoint
pub struct LlmAnalyzer {
    client: LlmClient,
}

impl LlmAnalyzer {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: LlmClient::from_settings(settings)?,
        })
    }
}

impl WordAnalyzer for LlmAnalyzer {
    fn analyze(&self, word: &str, context: &str, settings: &Settings) -> Result<WordAnalysis> {
        let prompt = build_prompt(word, context, settings);
        let reply = self
            .client
            .complete(ANALYSIS_SYSTEM_PROMPT, &prompt)
            .map_err(|e| match e {
                e if e.is_credential_error() => e,
                other => WortblickError::AnalysisFailed(other.to_string()),
            })?;
        parse_analysis(&reply)
    }
}
