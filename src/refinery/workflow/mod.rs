// SPDX-License-Identifier: MIT

//! Iterative refinement workflow
//!
//! - `state` - shared record and its reducer
//! - `nodes` - the six node functions
//! - `convergence` - loop/exit decision after each editor pass
//! - `engine` - sequencing, run-to-completion and streaming
//! - `runner` - builds agents and engines for callers

pub mod convergence;
pub mod diagram;
pub mod engine;
pub mod nodes;
pub mod runner;
pub mod state;

pub use convergence::{ConvergencePolicy, Decision};
pub use engine::{Execution, NodeUpdate, RunFailure, WorkflowEngine};
pub use nodes::{NodeContext, NodeName};
pub use runner::WorkflowRunner;
pub use state::{AgentMessage, ResearchState, StateDelta};
