// SPDX-License-Identifier: MIT

use clap::{Args as ClapArgs, Parser, Subcommand};
use dotenv::dotenv;
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::mpsc;

use refinery_rs::refinery::agents::AgentRole;
use refinery_rs::refinery::config::{ModelDistribution, ModelId, Settings};
use refinery_rs::refinery::server;
use refinery_rs::refinery::workflow::diagram::{self, DiagramFormat};
use refinery_rs::refinery::workflow::{NodeName, NodeUpdate, ResearchState, WorkflowRunner};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the refinement workflow to completion
    Run(RunArgs),
    /// Run the workflow, printing progress after every node
    Stream {
        #[command(flatten)]
        run: RunArgs,

        /// Also print agent output as it is generated
        #[arg(long)]
        tokens: bool,
    },
    /// Print the workflow graph
    Graph {
        #[arg(short, long, default_value = "mermaid")]
        format: DiagramFormat,
    },
    /// Start the HTTP API
    Serve {
        #[arg(short, long, default_value_t = 3000)]
        port: u16,

        /// Settings file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// Research topic
    #[arg(short, long)]
    topic: String,

    /// Maximum editor passes
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Quality score at which the loop stops
    #[arg(long)]
    threshold: Option<f64>,

    /// Role assignment, e.g. `reviewer=anthropic` (repeatable)
    #[arg(short, long = "model", value_parser = ModelDistribution::parse_assignment)]
    models: Vec<(AgentRole, ModelId)>,

    /// Settings file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the final state as JSON
    #[arg(long)]
    json: bool,
}

impl RunArgs {
    fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(n) = self.max_iterations {
            settings.workflow.max_iterations = n;
        }
        if let Some(t) = self.threshold {
            settings.workflow.convergence_threshold = t;
        }
        for (role, model) in &self.models {
            settings.distribution.set(*role, *model);
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Run(run) => {
            let settings = run.settings()?;
            let runner = WorkflowRunner::new(None, &settings)?;

            match runner.run(run.topic.as_str()).await {
                Ok(state) => print_state(&state, run.json)?,
                Err(failure) => {
                    eprintln!("Workflow failed at node '{}'", failure.node);
                    if run.json {
                        println!("{}", serde_json::to_string_pretty(&failure.state)?);
                    }
                    return Err(failure.into());
                }
            }
        }
        Commands::Stream { run, tokens } => {
            let settings = run.settings()?;
            let mut runner = WorkflowRunner::new(None, &settings)?;

            let printer = if tokens {
                let (tx, mut rx) = mpsc::channel::<String>(256);
                runner = runner.with_chunks(tx);
                Some(tokio::spawn(async move {
                    while let Some(chunk) = rx.recv().await {
                        print!("{}", chunk);
                        let _ = std::io::stdout().flush();
                    }
                }))
            } else {
                None
            };

            let mut state = ResearchState::new(run.topic.as_str());
            let mut updates = runner.stream(run.topic.as_str());
            drop(runner);

            while let Some(item) = updates.next().await {
                match item {
                    Ok(update) => {
                        println!("{}", describe(&update));
                        state.apply(update.delta);
                    }
                    Err(failure) => {
                        eprintln!("Workflow failed at node '{}'", failure.node);
                        return Err(failure.into());
                    }
                }
            }
            drop(updates);
            if let Some(printer) = printer {
                printer.await?;
            }
            print_state(&state, run.json)?;
        }
        Commands::Graph { format } => {
            println!("{}", diagram::render(format));
        }
        Commands::Serve { port, config } => {
            let settings = Settings::load(config.as_deref())?;
            server::serve(port, settings).await?;
        }
    }

    Ok(())
}

fn describe(update: &NodeUpdate) -> String {
    let delta = &update.delta;
    match update.node {
        NodeName::Review => format!(
            "[review] quality score: {:.3}",
            delta.quality_score.unwrap_or_default()
        ),
        NodeName::Editor => format!(
            "[editor] completed iteration {}",
            delta.iteration.unwrap_or_default()
        ),
        NodeName::Finalize => "[finalize] document ready".to_string(),
        node => {
            let chars = delta
                .agent_messages
                .first()
                .map(|m| m.content.chars().count())
                .unwrap_or_default();
            format!("[{}] {} chars", node, chars)
        }
    }
}

fn print_state(state: &ResearchState, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(state)?);
        return Ok(());
    }

    println!("\n=== {} ===\n", state.topic);
    println!("{}", state.final_document);
    println!(
        "\nIterations: {}  Quality: {:.3}  Messages: {}",
        state.iteration,
        state.quality_score,
        state.agent_messages.len()
    );
    Ok(())
}
