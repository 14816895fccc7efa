// SPDX-License-Identifier: MIT

//! Text-heuristic quality scoring
//!
//! Four sub-scores in [0, 1] and a weighted overall score. All values are
//! rounded to three decimals; the overall score is computed from the
//! unrounded sub-scores.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const ACCURACY_WEIGHT: f64 = 0.35;
const COHERENCE_WEIGHT: f64 = 0.25;
const COMPLETENESS_WEIGHT: f64 = 0.25;
const DEPTH_WEIGHT: f64 = 0.15;

const VERIFIED_MARKERS: [&str; 3] = ["verified", "accurate", "correct"];
const FLAGGED_MARKERS: [&str; 3] = ["flagged", "incorrect", "false"];

/// Ideal average sentence length, in words
const IDEAL_SENTENCE_LEN: f64 = 17.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub accuracy: f64,
    pub coherence: f64,
    pub completeness: f64,
    pub depth: f64,
    pub overall: f64,
}

pub struct QualityScorer;

impl QualityScorer {
    pub fn evaluate(
        text: &str,
        fact_check_results: &str,
        required_sections: &[&str],
    ) -> QualityMetrics {
        let accuracy = Self::score_accuracy(fact_check_results);
        let coherence = Self::score_coherence(text);
        let completeness = Self::score_completeness(text, required_sections);
        let depth = Self::score_depth(text);
        let overall = Self::overall(accuracy, coherence, completeness, depth);

        QualityMetrics {
            accuracy: round3(accuracy),
            coherence: round3(coherence),
            completeness: round3(completeness),
            depth: round3(depth),
            overall: round3(overall),
        }
    }

    /// Verification vs. flag vocabulary in the fact-check text
    pub fn score_accuracy(fact_check_results: &str) -> f64 {
        let lower = fact_check_results.to_lowercase();
        let count = |markers: &[&str]| -> usize {
            markers.iter().map(|m| lower.matches(m).count()).sum()
        };
        let verified = count(&VERIFIED_MARKERS);
        let flagged = count(&FLAGGED_MARKERS);

        if verified > flagged {
            (0.7 + verified as f64 * 0.1).min(1.0)
        } else if flagged > verified {
            (0.3 - flagged as f64 * 0.1).max(0.0)
        } else {
            0.5
        }
    }

    /// Sentence-length fit and vocabulary diversity
    pub fn score_coherence(text: &str) -> f64 {
        if text.trim().chars().count() < 50 {
            return 0.2;
        }

        let sentence_count = sentences(text).count();
        if sentence_count < 3 {
            return 0.3;
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        let word_count = words.len() as f64;

        let avg_len = word_count / sentence_count as f64;
        let length_score = (1.0 - (avg_len - IDEAL_SENTENCE_LEN).abs() / IDEAL_SENTENCE_LEN)
            .clamp(0.3, 1.0);

        let unique: HashSet<String> = words.iter().map(|w| w.to_lowercase()).collect();
        let diversity_score = (unique.len() as f64 / word_count).min(0.8);

        length_score * 0.6 + diversity_score * 0.4
    }

    /// Fraction of required sections mentioned; partial credit for any word
    pub fn score_completeness(text: &str, required_sections: &[&str]) -> f64 {
        if required_sections.is_empty() {
            return 0.8;
        }

        let lower = text.to_lowercase();
        let score: f64 = required_sections
            .iter()
            .map(|section| {
                let section = section.to_lowercase();
                if lower.contains(&section) {
                    1.0
                } else if section.split_whitespace().any(|w| lower.contains(w)) {
                    0.5
                } else {
                    0.0
                }
            })
            .sum();

        (score / required_sections.len() as f64).min(1.0)
    }

    /// Step function over word count
    pub fn score_depth(text: &str) -> f64 {
        match text.split_whitespace().count() {
            0..=99 => 0.3,
            100..=299 => 0.5,
            300..=499 => 0.7,
            500..=999 => 0.9,
            _ => 1.0,
        }
    }

    pub fn overall(accuracy: f64, coherence: f64, completeness: f64, depth: f64) -> f64 {
        accuracy * ACCURACY_WEIGHT
            + coherence * COHERENCE_WEIGHT
            + completeness * COMPLETENESS_WEIGHT
            + depth * DEPTH_WEIGHT
    }
}

/// Non-empty, trimmed '.'-delimited sentences
pub(crate) fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split('.').map(str::trim).filter(|s| !s.is_empty())
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "
Artificial intelligence has revolutionized healthcare in recent years. Machine learning algorithms
can now detect diseases from medical images with accuracy comparable to human experts. Natural
language processing helps analyze patient records and extract valuable insights. Deep learning
models predict patient outcomes and recommend personalized treatment plans. AI-powered diagnostic
tools reduce the workload on healthcare professionals while improving patient care quality.
";

    #[test]
    fn test_sample_document_scores() {
        let fact_check =
            "verified: AI in healthcare, verified: machine learning accuracy, verified: NLP applications";
        let metrics =
            QualityScorer::evaluate(SAMPLE, fact_check, &["introduction", "applications", "benefits"]);

        assert_eq!(metrics.accuracy, 1.0);
        assert_eq!(metrics.coherence, 0.731);
        assert_eq!(metrics.completeness, 0.0);
        assert_eq!(metrics.depth, 0.3);
        assert_eq!(metrics.overall, 0.578);
    }

    #[test]
    fn test_neutral_fact_check_scores_half() {
        let metrics =
            QualityScorer::evaluate(SAMPLE, "", &["introduction", "findings", "conclusion"]);
        assert_eq!(metrics.accuracy, 0.5);
        assert_eq!(metrics.overall, 0.403);
    }

    #[test]
    fn test_short_text_with_flags() {
        let metrics = QualityScorer::evaluate("short", "flagged incorrect", &[]);
        assert_eq!(metrics.accuracy, 0.1);
        assert_eq!(metrics.coherence, 0.2);
        assert_eq!(metrics.completeness, 0.8);
        assert_eq!(metrics.depth, 0.3);
        assert_eq!(metrics.overall, 0.33);
    }

    #[test]
    fn test_accuracy_is_case_insensitive_and_capped() {
        assert_eq!(
            QualityScorer::score_accuracy("VERIFIED Verified verified accurate correct"),
            1.0
        );
        assert_eq!(QualityScorer::score_accuracy("verified, flagged"), 0.5);
        assert_eq!(QualityScorer::score_accuracy("false false false false"), 0.0);
    }

    #[test]
    fn test_coherence_needs_three_sentences() {
        let two = "This sentence is long enough to pass the length gate. So is this one here";
        assert_eq!(QualityScorer::score_coherence(two), 0.3);
    }

    #[test]
    fn test_completeness_partial_credit() {
        let text = "An introduction. Some key findings follow.";
        let score = QualityScorer::score_completeness(text, &["introduction", "key results"]);
        assert_eq!(score, 0.75);
    }

    #[test]
    fn test_depth_steps() {
        let words = |n: usize| vec!["word"; n].join(" ");
        assert_eq!(QualityScorer::score_depth(&words(99)), 0.3);
        assert_eq!(QualityScorer::score_depth(&words(100)), 0.5);
        assert_eq!(QualityScorer::score_depth(&words(300)), 0.7);
        assert_eq!(QualityScorer::score_depth(&words(999)), 0.9);
        assert_eq!(QualityScorer::score_depth(&words(1000)), 1.0);
    }

    #[test]
    fn test_scores_stay_in_unit_range() {
        let long = SAMPLE.repeat(40);
        let texts = ["", "a.b.c.d.e.f", SAMPLE, long.as_str()];
        for text in texts {
            let m = QualityScorer::evaluate(text, "correct correct", &["conclusion"]);
            for v in [m.accuracy, m.coherence, m.completeness, m.depth, m.overall] {
                assert!((0.0..=1.0).contains(&v), "{} out of range", v);
            }
        }
    }
}
