// SPDX-License-Identifier: MIT

//! Claim extraction and reference cross-checking

use super::quality::sentences;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Sentences shorter than this many words are not treated as claims
const MIN_CLAIM_WORDS: usize = 5;
/// Unreferenced claims longer than this are flagged
const FLAG_CLAIM_WORDS: usize = 15;
const REFERENCE_OVERLAP: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactValidation {
    pub total_claims: usize,
    pub validated: Vec<String>,
    pub flagged: Vec<String>,
    pub confidence: f64,
}

pub struct FactValidator;

impl FactValidator {
    pub fn extract_claims(text: &str) -> Vec<&str> {
        sentences(text)
            .filter(|s| s.split_whitespace().count() > MIN_CLAIM_WORDS)
            .collect()
    }

    /// True when more than 30% of the claim's distinct words occur in `reference`
    pub fn cross_reference(claim: &str, reference: &str) -> bool {
        let claim_words = lower_words(claim);
        let reference_words = lower_words(reference);
        let overlap = claim_words.intersection(&reference_words).count();
        overlap as f64 > claim_words.len() as f64 * REFERENCE_OVERLAP
    }

    pub fn validate(text: &str, reference: &str) -> FactValidation {
        let claims = Self::extract_claims(text);
        let mut validated = Vec::new();
        let mut flagged = Vec::new();

        for claim in &claims {
            if !reference.is_empty() && Self::cross_reference(claim, reference) {
                validated.push(claim.to_string());
            } else if claim.split_whitespace().count() > FLAG_CLAIM_WORDS {
                flagged.push(claim.to_string());
            }
        }

        let confidence = if claims.is_empty() {
            0.0
        } else {
            validated.len() as f64 / claims.len() as f64
        };

        FactValidation {
            total_claims: claims.len(),
            validated,
            flagged,
            confidence,
        }
    }
}

fn lower_words(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}
