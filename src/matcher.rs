//! Live-DOM matcher.
//!
//! The extractor works on a copy of the page, so its blocks carry no link to
//! the elements the user is looking at. This module finds, for each block,
//! the live element holding the same text: exact normalized match first,
//! Jaccard similarity above a threshold otherwise.

use std::collections::HashSet;

use crate::blocks::{CandidateBlock, MIN_BLOCK_CHARS};
use crate::dom::{Dom, NodeId};
use crate::normalize::{normalize, similarity};

/// Live elements that may hold an article block
pub const CANDIDATE_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote", "td", "th", "caption", "div",
    "section",
];

/// Minimum similarity for a fuzzy match. A tuned heuristic, not an invariant.
pub const FUZZY_THRESHOLD: f64 = 0.85;

/// Matching knobs
#[derive(Debug, Clone, Copy)]
pub struct MatchOptions {
    /// Fuzzy matches must score strictly above this
    pub threshold: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            threshold: FUZZY_THRESHOLD,
        }
    }
}

/// A block paired with the live element that holds it
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub block: CandidateBlock,
    pub element: NodeId,
    /// 1.0 for an exact normalized match
    pub score: f64,
}

/// Whether `node` wraps another substantial block, in which case the inner
/// block is the one to match
fn is_container<D: Dom + ?Sized>(dom: &D, node: NodeId) -> bool {
    dom.element_children(node).into_iter().any(|child| {
        dom.tag_name(child)
            .map(|tag| CANDIDATE_TAGS.contains(&tag))
            .unwrap_or(false)
            && dom.text_content(child).trim().chars().count() > MIN_BLOCK_CHARS
    })
}

/// Find the live element for each block, preserving block order.
///
/// Blocks without a match are dropped. An element is matched at most once,
/// and once matched neither it nor any ancestor below `<body>` can be matched
/// again.
pub fn match_blocks<D: Dom + ?Sized>(
    blocks: &[CandidateBlock],
    dom: &D,
    options: MatchOptions,
) -> Vec<MatchResult> {
    let body = dom.body();
    let mut excluded: HashSet<NodeId> = HashSet::new();
    let mut results = Vec::new();

    // The candidate set only shrinks, so texts are computed once
    let candidates: Vec<(NodeId, String)> = dom
        .elements_by_tag(CANDIDATE_TAGS)
        .into_iter()
        .filter(|&node| !is_container(dom, node))
        .map(|node| (node, normalize(&dom.text_content(node))))
        .collect();

    for block in blocks {
        let target = normalize(&block.text);
        let mut best: Option<(NodeId, f64)> = None;

        for (node, text) in &candidates {
            if excluded.contains(node) {
                continue;
            }

            if *text == target {
                best = Some((*node, 1.0));
                break;
            }

            let score = similarity(text, &target);
            if score > options.threshold && best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((*node, score));
            }
        }

        let Some((element, score)) = best else {
            log::debug!("No live element for block: {:.40}", block.text);
            continue;
        };

        log::debug!("Matched block (score {:.2}): {:.40}", score, block.text);
        excluded.insert(element);
        let mut ancestor = dom.parent(element);
        while let Some(id) = ancestor {
            if id == body {
                break;
            }
            excluded.insert(id);
            ancestor = dom.parent(id);
        }

        results.push(MatchResult {
            block: block.clone(),
            element,
            score,
        });
    }

    results
}
