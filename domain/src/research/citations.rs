//! Citation extraction from model answers.
//!
//! Answers reference sources as `[Source N]`, `[N]`, `(Source N)`, or bare
//! `Source N`; `N` is a 1-based index into the research results.

use crate::research::entities::ResearchResult;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn citation_patterns() -> &'static [Regex; 4] {
    static PATTERNS: OnceLock<[Regex; 4]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"\[Source\s+(\d+)\]").unwrap(),
            Regex::new(r"\[(\d+)\]").unwrap(),
            Regex::new(r"\(Source\s+(\d+)\)").unwrap(),
            Regex::new(r"\bSource\s+(\d+)\b").unwrap(),
        ]
    })
}

/// Extract 1-based source references from an answer, in pattern order then
/// order of appearance, deduplicated.
pub fn extract_source_refs(text: &str) -> Vec<usize> {
    let mut seen = HashSet::new();
    let mut refs = Vec::new();
    for pattern in citation_patterns() {
        for capture in pattern.captures_iter(text) {
            if let Ok(n) = capture[1].parse::<usize>() {
                if n >= 1 && seen.insert(n) {
                    refs.push(n);
                }
            }
        }
    }
    refs
}

/// Aggregate the citation list for a research outcome.
///
/// Walks the final answer, then each per-model answer, mapping references to
/// result urls; finally appends every result url (the sources were consumed
/// to produce the answers). Deduplicated, preserving first-seen order.
pub fn aggregate_citations<'a>(
    final_answer: &str,
    model_answers: impl IntoIterator<Item = &'a str>,
    results: &[ResearchResult],
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut citations = Vec::new();
    let mut push = |url: &str| {
        if seen.insert(url.to_string()) {
            citations.push(url.to_string());
        }
    };

    for n in extract_source_refs(final_answer) {
        if let Some(result) = results.get(n - 1) {
            push(&result.url);
        }
    }
    for answer in model_answers {
        for n in extract_source_refs(answer) {
            if let Some(result) = results.get(n - 1) {
                push(&result.url);
            }
        }
    }
    for result in results {
        push(&result.url);
    }
    citations
}
