// SPDX-License-Identifier: MIT

//! Loop-or-exit decision taken after every editor pass

use crate::refinery::config::WorkflowConfig;
use crate::refinery::workflow::nodes::NodeName;
use crate::refinery::workflow::state::ResearchState;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Another review/edit pass
    Continue,
    Finalize,
}

impl Decision {
    pub fn target(&self) -> NodeName {
        match self {
            Decision::Continue => NodeName::Review,
            Decision::Finalize => NodeName::Finalize,
        }
    }
}

/// Fixed for the lifetime of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergencePolicy {
    max_iterations: u32,
    threshold: f64,
}

impl ConvergencePolicy {
    pub fn new(config: &WorkflowConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            threshold: config.convergence_threshold,
        }
    }

    /// The iteration cap is checked before quality
    pub fn decide(&self, state: &ResearchState) -> Decision {
        if state.iteration >= self.max_iterations {
            log::info!(
                "Iteration cap reached ({}/{}), finalizing",
                state.iteration,
                self.max_iterations
            );
            Decision::Finalize
        } else if state.quality_score >= self.threshold {
            log::info!(
                "Quality {:.3} meets threshold {:.3}, finalizing",
                state.quality_score,
                self.threshold
            );
            Decision::Finalize
        } else {
            log::info!(
                "Quality {:.3} below threshold {:.3}, starting pass {}",
                state.quality_score,
                self.threshold,
                state.iteration + 1
            );
            Decision::Continue
        }
    }
}
