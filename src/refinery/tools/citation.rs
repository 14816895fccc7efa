// SPDX-License-Identifier: MIT

//! Citation extraction and provenance tracking

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Numeric `[3]`, `(Author 2020)` and `(Author et al. 2020)`
static CITATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\[(\d+)\]",
        r"\(([A-Za-z]+\s+\d{4})\)",
        r"\(([A-Za-z]+\s+et\s+al\.\s+\d{4})\)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// A claim and the source it was attributed to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub claim: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationReport {
    pub citations_found: usize,
    pub citations: Vec<String>,
    pub citation_graph: BTreeMap<usize, Provenance>,
}

/// A citation with the line of text it appeared in
#[derive(Debug, Clone, PartialEq)]
pub struct CitationMatch<'a> {
    pub citation: &'a str,
    pub context: &'a str,
}

#[derive(Debug, Default)]
pub struct CitationTracker {
    citations: BTreeMap<usize, Provenance>,
    count: usize,
}

impl CitationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Citations grouped by pattern: numeric first, then author-year
    pub fn extract_citations(text: &str) -> Vec<CitationMatch<'_>> {
        CITATION_PATTERNS
            .iter()
            .flat_map(|re| re.captures_iter(text))
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let inner = caps.get(1)?;
                Some(CitationMatch {
                    citation: inner.as_str(),
                    context: line_at(text, whole.start()),
                })
            })
            .collect()
    }

    pub fn validate_format(citation: &str) -> bool {
        !citation.is_empty()
    }

    /// Register a claim/source pair; ids start at 1
    pub fn track_provenance(&mut self, claim: impl Into<String>, source: impl Into<String>) -> usize {
        self.count += 1;
        self.citations.insert(
            self.count,
            Provenance {
                claim: claim.into(),
                source: source.into(),
            },
        );
        self.count
    }

    /// Id of an already registered (claim, source) pair
    pub fn find(&self, claim: &str, source: &str) -> Option<usize> {
        self.citations
            .iter()
            .find(|(_, p)| p.claim == claim && p.source == source)
            .map(|(id, _)| *id)
    }

    pub fn citation_graph(&self) -> &BTreeMap<usize, Provenance> {
        &self.citations
    }
}

fn line_at(text: &str, offset: usize) -> &str {
    let start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    let end = text[offset..].find('\n').map_or(text.len(), |i| offset + i);
    text[start..end].trim()
}
