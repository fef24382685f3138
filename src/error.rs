use thiserror::Error;

#[derive(Error, Debug)]
pub enum WortblickError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] ureq::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("No readable content found on this page")]
    ExtractionFailure,

    #[error("Could not match the article content to the page")]
    MatchFailure,

    #[error("No API key configured")]
    MissingCredential,

    #[error("API key was rejected: {0}")]
    InvalidCredential(String),

    #[error("Translation failed: {0}")]
    TranslationFailed(String),

    #[error("Word analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("A translation is already active on this page")]
    SessionActive,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl WortblickError {
    /// Get an actionable hint for how to resolve this error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            WortblickError::HttpError(_) => Some(
                "Check your internet connection and the configured API base:\n  wortblick settings show"
            ),
            WortblickError::ExtractionFailure => Some(
                "This page has no article-like content. Try a different page."
            ),
            WortblickError::MatchFailure => Some(
                "The article was found but not located in the page markup.\nRun `wortblick preview <page>` to inspect the extracted blocks"
            ),
            WortblickError::MissingCredential => Some(
                "Set an API key: wortblick settings set --api-key <KEY>\nOr export WORTBLICK_API_KEY"
            ),
            WortblickError::InvalidCredential(_) => Some(
                "Update your API key: wortblick settings set --api-key <KEY>"
            ),
            WortblickError::AnalysisFailed(_) => Some(
                "Retry the lookup; the rest of the page is unaffected"
            ),
            WortblickError::SessionActive => Some(
                "Restore the page first, then translate again"
            ),
            WortblickError::ConfigError(_) | WortblickError::TomlError(_) => Some(
                "Inspect your settings with `wortblick settings show`\nOr start over with `wortblick settings reset`"
            ),
            _ => None,
        }
    }

    /// Whether this error means the credential must be fixed in settings
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            WortblickError::MissingCredential | WortblickError::InvalidCredential(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, WortblickError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors_point_to_settings() {
        let err = WortblickError::MissingCredential;
        assert!(err.is_credential_error());
        assert!(err.hint().unwrap().contains("settings set"));

        let err = WortblickError::InvalidCredential("401".into());
        assert!(err.is_credential_error());
        assert!(err.hint().unwrap().contains("--api-key"));
    }

    #[test]
    fn test_translation_failure_has_no_credential_hint() {
        let err = WortblickError::TranslationFailed("timeout".into());
        assert!(!err.is_credential_error());
        assert!(err.hint().is_none());
    }
}
