// SPDX-License-Identifier: MIT

//! Text renderings of the node graph

use crate::refinery::workflow::convergence::Decision;
use crate::refinery::workflow::nodes::NodeName;

use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramFormat {
    #[default]
    Mermaid,
    Ascii,
}

impl FromStr for DiagramFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mermaid" => Ok(DiagramFormat::Mermaid),
            "ascii" => Ok(DiagramFormat::Ascii),
            other => Err(format!("Unknown diagram format: {}", other)),
        }
    }
}

pub fn render(format: DiagramFormat) -> String {
    match format {
        DiagramFormat::Mermaid => mermaid(),
        DiagramFormat::Ascii => ascii(),
    }
}

fn label(node: NodeName) -> String {
    match node.role() {
        Some(role) => format!("{}<br/>{}", node, role.display_name()),
        None => node.to_string(),
    }
}

pub fn mermaid() -> String {
    let mut out = String::from("graph TD\n");
    let _ = writeln!(out, "    START([START]) --> {}", NodeName::ENTRY);

    for node in NodeName::ALL {
        let _ = writeln!(out, "    {}[\"{}\"]", node, label(node));
    }
    for node in NodeName::ALL {
        if let Some(next) = node.next() {
            let _ = writeln!(out, "    {} --> {}", node, next);
        }
    }

    let _ = writeln!(out, "    {} --> decision{{converged?}}", NodeName::Editor);
    for decision in [Decision::Continue, Decision::Finalize] {
        let edge = match decision {
            Decision::Continue => "continue",
            Decision::Finalize => "finalize",
        };
        let _ = writeln!(out, "    decision -->|{}| {}", edge, decision.target());
    }
    let _ = writeln!(out, "    {} --> END([END])", NodeName::Finalize);
    out
}

pub fn ascii() -> String {
    const WIDTH: usize = 24;
    let boxed = |out: &mut String, title: &str, sub: &str| {
        let _ = writeln!(out, "    +{}+", "-".repeat(WIDTH));
        let _ = writeln!(out, "    |{:^w$}|", title, w = WIDTH);
        if !sub.is_empty() {
            let _ = writeln!(out, "    |{:^w$}|", sub, w = WIDTH);
        }
        let _ = writeln!(out, "    +{}+", "-".repeat(WIDTH));
    };
    let arrow = |out: &mut String| {
        let _ = writeln!(out, "    {:^w$}", "|", w = WIDTH + 2);
        let _ = writeln!(out, "    {:^w$}", "v", w = WIDTH + 2);
    };

    let mut out = String::new();
    boxed(&mut out, "START", "");
    let mut node = Some(NodeName::ENTRY);
    while let Some(current) = node {
        arrow(&mut out);
        let title = current.as_str().to_uppercase();
        let sub = current.role().map(|r| r.display_name()).unwrap_or("");
        boxed(&mut out, &title, sub);
        node = current.next();
    }

    arrow(&mut out);
    boxed(&mut out, "DECISION", "converged?");
    let _ = writeln!(
        out,
        "      continue -> {}   finalize -> {}",
        Decision::Continue.target().as_str().to_uppercase(),
        Decision::Finalize.target().as_str().to_uppercase()
    );
    arrow(&mut out);
    boxed(&mut out, "FINALIZE", "");
    arrow(&mut out);
    boxed(&mut out, "END", "");
    out.push_str("\n  Finalize when iteration >= max_iterations\n");
    out.push_str("  or quality_score >= convergence_threshold\n");
    out
}
