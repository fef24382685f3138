//! Background word lookups.
//!
//! Gloss and analysis requests run on their own threads and report back over
//! a channel. The owner polls for results and hands them to the interaction
//! controller, which discards anything meant for a popup that has closed.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use crate::analysis::{WordAnalysis, WordAnalyzer};
use crate::config::Settings;
use crate::gloss::LazyWordTranslator;
use crate::interaction::{AnalysisRequest, PopupId};

/// A finished lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    Gloss {
        popup: PopupId,
        gloss: Option<String>,
    },
    Analysis {
        popup: PopupId,
        result: Result<WordAnalysis, String>,
    },
}

pub struct LookupWorker {
    gloss: Arc<LazyWordTranslator>,
    analyzer: Option<Arc<dyn WordAnalyzer>>,
    settings: Arc<Settings>,
    tx: mpsc::Sender<LookupResult>,
    rx: mpsc::Receiver<LookupResult>,
    pending: usize,
}

impl LookupWorker {
    pub fn new(
        gloss: LazyWordTranslator,
        analyzer: Option<Arc<dyn WordAnalyzer>>,
        settings: Settings,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            gloss: Arc::new(gloss),
            analyzer,
            settings: Arc::new(settings),
            tx,
            rx,
            pending: 0,
        }
    }

    /// Look up the offline gloss for `word` in the background
    pub fn request_gloss(&mut self, popup: PopupId, word: &str) {
        let gloss = Arc::clone(&self.gloss);
        let tx = self.tx.clone();
        let word = word.to_string();

        self.pending += 1;
        std::thread::spawn(move || {
            let result = gloss.translate(&word);
            let _ = tx.send(LookupResult::Gloss { popup, gloss: result });
        });
    }

    /// Run the deeper analysis in the background
    pub fn request_analysis(&mut self, request: AnalysisRequest) {
        let tx = self.tx.clone();
        self.pending += 1;

        let Some(analyzer) = self.analyzer.clone() else {
            let _ = tx.send(LookupResult::Analysis {
                popup: request.popup,
                result: Err("No word analyzer configured".into()),
            });
            return;
        };
        let settings = Arc::clone(&self.settings);

        std::thread::spawn(move || {
            let result = analyzer
                .analyze(&request.word, &request.context, &settings)
                .map_err(|e| {
                    log::warn!("Analysis of '{}' failed: {}", request.word, e);
                    e.to_string()
                });
            let _ = tx.send(LookupResult::Analysis {
                popup: request.popup,
                result,
            });
        });
    }

    /// Number of lookups started but not yet collected
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Collect finished lookups without blocking
    pub fn poll(&mut self) -> Vec<LookupResult> {
        let mut done = Vec::new();
        while let Ok(result) = self.rx.try_recv() {
            done.push(result);
        }
        self.pending = self.pending.saturating_sub(done.len());
        done
    }

    /// Block until the next lookup finishes or `timeout` passes
    pub fn wait(&mut self, timeout: Duration) -> Option<LookupResult> {
        if self.pending == 0 {
            return None;
        }
        let result = self.rx.recv_timeout(timeout).ok()?;
        self.pending -= 1;
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, WortblickError};
    use crate::gloss::{GlossaryTranslator, WordTranslator};

    struct EchoAnalyzer;

    impl WordAnalyzer for EchoAnalyzer {
        fn analyze(&self, word: &str, _context: &str, _settings: &Settings) -> Result<WordAnalysis> {
            if word == "kaputt" {
                return Err(WortblickError::AnalysisFailed("no idea".into()));
            }
            Ok(WordAnalysis {
                translation: word.to_uppercase(),
                pos: None,
                article: None,
                example: None,
                explanation: None,
            })
        }
    }

    fn glossary() -> LazyWordTranslator {
        LazyWordTranslator::new(|| {
            Some(Arc::new(GlossaryTranslator::parse("German", "English", "Hund\tdog\n")) as Arc<dyn WordTranslator>)
        })
    }

    fn wait_all(worker: &mut LookupWorker) -> Vec<LookupResult> {
        let mut results = Vec::new();
        while let Some(result) = worker.wait(Duration::from_secs(5)) {
            results.push(result);
        }
        results
    }

    #[test]
    fn test_gloss_lookup_reports_back() {
        let mut worker = LookupWorker::new(glossary(), None, Settings::default());
        let id = PopupId(1);
        worker.request_gloss(id, "Hund");
        assert_eq!(worker.pending(), 1);

        let results = wait_all(&mut worker);
        assert_eq!(
            results,
            vec![LookupResult::Gloss { popup: id, gloss: Some("dog".into()) }]
        );
        assert_eq!(worker.pending(), 0);
    }

    #[test]
    fn test_analysis_success_and_failure() {
        let analyzer: Arc<dyn WordAnalyzer> = Arc::new(EchoAnalyzer);
        let mut worker = LookupWorker::new(glossary(), Some(analyzer), Settings::default());
        let id = PopupId(1);

        worker.request_analysis(AnalysisRequest { popup: id, word: "dog".into(), context: String::new() });
        worker.request_analysis(AnalysisRequest { popup: id, word: "kaputt".into(), context: String::new() });

        let results = wait_all(&mut worker);
        assert_eq!(results.len(), 2);
        let ok = results.iter().any(|r| matches!(r, LookupResult::Analysis { result: Ok(a), .. } if a.translation == "DOG"));
        let failed = results.iter().any(|r| matches!(r, LookupResult::Analysis { result: Err(_), .. }));
        assert!(ok && failed);
    }

    #[test]
    fn test_missing_analyzer_fails_immediately() {
        let mut worker = LookupWorker::new(LazyWordTranslator::unavailable(), None, Settings::default());
        let id = PopupId(2);
        worker.request_analysis(AnalysisRequest { popup: id, word: "dog".into(), context: String::new() });

        let results = worker.poll();
        assert!(matches!(&results[..], [LookupResult::Analysis { result: Err(_), .. }]));
        assert_eq!(worker.pending(), 0);
        assert!(worker.wait(Duration::from_millis(10)).is_none());
    }
}
