// SPDX-License-Identifier: MIT

//! Keyword-level bias and contradiction markers

use serde::{Deserialize, Serialize};

const BIAS_KEYWORDS: [&str; 9] = [
    "always",
    "never",
    "obviously",
    "clearly",
    "everyone knows",
    "undoubtedly",
    "certainly",
    "absolutely",
    "definitely",
];

const CONTRADICTION_MARKERS: [&str; 5] = ["however", "but", "although", "despite", "nevertheless"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contradiction {
    pub sentence: String,
    pub marker: String,
    /// Index of the sentence among the '.'-split segments
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasReport {
    pub biases: Vec<String>,
    pub contradictions: Vec<Contradiction>,
    pub bias_count: usize,
    pub contradiction_count: usize,
}

pub struct BiasDetector;

impl BiasDetector {
    pub fn detect_bias(text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        BIAS_KEYWORDS
            .iter()
            .filter(|k| lower.contains(*k))
            .map(|k| format!("Potential bias: '{}'", k))
            .collect()
    }

    /// Markers are matched as substrings, one entry per marker per sentence
    pub fn detect_contradictions(text: &str) -> Vec<Contradiction> {
        let mut found = Vec::new();
        for (position, sentence) in text.split('.').enumerate() {
            let lower = sentence.to_lowercase();
            for marker in CONTRADICTION_MARKERS {
                if lower.contains(marker) {
                    found.push(Contradiction {
                        sentence: sentence.trim().to_string(),
                        marker: marker.to_string(),
                        position,
                    });
                }
            }
        }
        found
    }

    pub fn analyze(text: &str) -> BiasReport {
        let biases = Self::detect_bias(text);
        let contradictions = Self::detect_contradictions(text);
        BiasReport {
            bias_count: biases.len(),
            contradiction_count: contradictions.len(),
            biases,
            contradictions,
        }
    }
}
