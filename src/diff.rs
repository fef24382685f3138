//! Comparison of a page before translation with the same page after restore.

use similar::{ChangeTag, TextDiff};

/// How a restored page differs from the original
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreDiff {
    pub identical: bool,
    /// Tokens present only in the restored page
    pub additions: usize,
    /// Tokens present only in the original
    pub deletions: usize,
    /// Changed tokens marked `[-old]` / `[+new]`, with short context
    pub excerpt: String,
}

impl RestoreDiff {
    pub fn summary(&self) -> String {
        if self.identical {
            "identical".to_string()
        } else {
            format!("+{} / -{} tokens", self.additions, self.deletions)
        }
    }
}

/// Compare the original markup with the restored markup, token by token
pub fn compare_restored(original: &str, restored: &str, max_excerpt: usize) -> RestoreDiff {
    if original == restored {
        return RestoreDiff {
            identical: true,
            additions: 0,
            deletions: 0,
            excerpt: String::new(),
        };
    }

    let text_diff = TextDiff::from_words(original, restored);
    let mut excerpt = String::new();
    let mut additions = 0;
    let mut deletions = 0;

    for change in text_diff.iter_all_changes() {
        let piece = match change.tag() {
            ChangeTag::Delete => {
                deletions += 1;
                format!("[-{}]", change.value())
            }
            ChangeTag::Insert => {
                additions += 1;
                format!("[+{}]", change.value())
            }
            // Short runs only, long stretches of equal markup are noise
            ChangeTag::Equal if change.value().len() <= 20 => change.value().to_string(),
            ChangeTag::Equal => continue,
        };
        if excerpt.len() < max_excerpt {
            excerpt.push_str(&piece);
        }
    }

    RestoreDiff {
        identical: false,
        additions,
        deletions,
        excerpt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_pages() {
        let diff = compare_restored("<p>Hallo Welt</p>", "<p>Hallo Welt</p>", 100);
        assert!(diff.identical);
        assert_eq!(diff.summary(), "identical");
    }

    #[test]
    fn test_leftover_class_is_reported() {
        let diff = compare_restored(
            "<p class=\"lead\">Hallo Welt</p>",
            "<p class=\"lead wb-translated\">Hallo Welt</p>",
            100,
        );
        assert!(!diff.identical);
        assert!(diff.additions >= 1);
        assert!(diff.excerpt.contains("[+"));
        assert!(diff.summary().starts_with('+'));
    }

    #[test]
    fn test_excerpt_is_bounded() {
        let original = "a ".repeat(200);
        let restored = "b ".repeat(200);
        let diff = compare_restored(&original, &restored, 50);
        assert!(diff.excerpt.len() < 60);
        assert_eq!(diff.deletions, diff.additions);
    }
}
