// SPDX-License-Identifier: MIT

pub mod agents;
pub mod config;
pub mod server;
pub mod tools;
pub mod workflow;
