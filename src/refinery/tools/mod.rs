// SPDX-License-Identifier: MIT

//! Scoring and validation tools used by the workflow nodes
//!
//! All tools are pure text heuristics. They never see or mutate workflow
//! state; nodes decide what to do with their reports.

pub mod bias;
pub mod citation;
pub mod facts;
pub mod quality;

pub use bias::{BiasDetector, BiasReport, Contradiction};
pub use citation::{CitationReport, CitationTracker, Provenance};
pub use facts::{FactValidation, FactValidator};
pub use quality::{QualityMetrics, QualityScorer};

use std::sync::{Mutex, PoisonError};

/// Front door to the tools for one engine.
///
/// The citation tracker is the only stateful piece; its provenance
/// registry grows across the iterations of a run.
#[derive(Debug, Default)]
pub struct ToolManager {
    citation_tracker: Mutex<CitationTracker>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate_quality(
        &self,
        text: &str,
        fact_check_results: &str,
        required_sections: &[&str],
    ) -> QualityMetrics {
        QualityScorer::evaluate(text, fact_check_results, required_sections)
    }

    pub fn validate_facts(&self, text: &str, reference: &str) -> FactValidation {
        FactValidator::validate(text, reference)
    }

    /// Extract citations and record the provenance of any not seen before
    pub fn validate_citations(&self, text: &str) -> CitationReport {
        let found = CitationTracker::extract_citations(text);
        let mut tracker = self
            .citation_tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut citations = Vec::with_capacity(found.len());
        for m in found {
            if !CitationTracker::validate_format(m.citation) {
                continue;
            }
            if tracker.find(m.context, m.citation).is_none() {
                tracker.track_provenance(m.context, m.citation);
            }
            citations.push(m.citation.to_string());
        }

        CitationReport {
            citations_found: citations.len(),
            citations,
            citation_graph: tracker.citation_graph().clone(),
        }
    }

    pub fn detect_bias(&self, text: &str) -> BiasReport {
        BiasDetector::analyze(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_citation_graph_accumulates_across_calls() {
        let tools = ToolManager::new();

        let first = tools.validate_citations("Output doubled [1].");
        assert_eq!(first.citations_found, 1);
        assert_eq!(first.citation_graph.len(), 1);
        assert_eq!(first.citation_graph[&1].claim, "Output doubled [1].");
        assert_eq!(first.citation_graph[&1].source, "1");

        let second = tools.validate_citations("Costs fell (Okafor 2022).\nNo cite here.");
        assert_eq!(second.citations, vec!["Okafor 2022".to_string()]);
        assert_eq!(second.citation_graph.len(), 2);
    }

    #[test]
    fn test_repeated_passes_do_not_duplicate_provenance() {
        let tools = ToolManager::new();
        for _ in 0..4 {
            let report = tools.validate_citations("Claim [1].");
            assert_eq!(report.citations_found, 1);
            assert_eq!(report.citation_graph.len(), 1);
        }
    }

    #[test]
    fn test_text_without_citations() {
        let report = ToolManager::new().validate_citations("Plain text only.");
        assert_eq!(report.citations_found, 0);
        assert!(report.citations.is_empty());
        assert!(report.citation_graph.is_empty());
    }

    #[test]
    fn test_manager_delegates_scoring() {
        let tools = ToolManager::new();
        let metrics = tools.evaluate_quality("short", "", &[]);
        assert_eq!(metrics, QualityScorer::evaluate("short", "", &[]));
        assert_eq!(tools.validate_facts("", "").total_claims, 0);
        assert_eq!(tools.detect_bias("clearly").bias_count, 1);
    }
}
