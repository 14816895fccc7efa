// SPDX-License-Identifier: MIT

//! Agent development kit: model clients, agents and the error type
//! shared by everything built on top of them.

pub mod agent;
pub mod error;
pub mod model;
