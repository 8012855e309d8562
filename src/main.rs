//! warehouse-kb CLI: run the knowledge-based agent in the hazardous warehouse.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use warehouse_kb::agent::{Agent, RunSummary};
use warehouse_kb::config::RunConfig;
use warehouse_kb::world::{Layout, Warehouse};

#[derive(Parser)]
#[command(
    name = "warehouse-kb",
    version,
    about = "Knowledge-based agent for the hazardous warehouse"
)]
struct Cli {
    /// TOML run config (`[agent]` and optional `[layout]` tables).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Only log warnings and errors (RUST_LOG still wins).
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent to completion and print the run summary.
    Run {
        #[command(flatten)]
        layout: LayoutArgs,

        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Render a layout with its hidden contents revealed.
    Show {
        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Run the agent, then print what it believes about every cell.
    Classify {
        #[command(flatten)]
        layout: LayoutArgs,
    },
}

/// Where the layout comes from. Defaults to the config's `[layout]`, then
/// the built-in example.
#[derive(Args)]
struct LayoutArgs {
    /// TOML layout file.
    #[arg(long, conflicts_with = "seed")]
    layout: Option<PathBuf>,

    /// Generate a random layout from this seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Random layout width.
    #[arg(long, default_value = "4")]
    width: i32,

    /// Random layout height.
    #[arg(long, default_value = "4")]
    height: i32,

    /// Number of damaged floor cells in a random layout.
    #[arg(long, default_value = "2")]
    damaged: usize,
}

impl LayoutArgs {
    fn resolve(&self, config: &RunConfig) -> Result<Layout> {
        if let Some(path) = &self.layout {
            return Ok(Layout::load(path)?);
        }
        if let Some(seed) = self.seed {
            return Ok(Layout::random(self.width, self.height, self.damaged, seed)?);
        }
        Ok(config.layout_or_example())
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    let cli = Cli::parse();

    let default_level = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };

    match cli.command {
        Commands::Run { layout, json } => {
            let layout = layout.resolve(&config)?;
            let mut world = Warehouse::new(layout)?;
            let mut agent = Agent::for_environment(config.agent.clone(), &world);
            let summary = agent.run(&mut world)?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&summary).into_diagnostic()?
                );
            } else {
                print_summary(&summary);
                println!();
                println!("{}", world.render(true));
            }
        }

        Commands::Show { layout } => {
            let layout = layout.resolve(&config)?;
            let world = Warehouse::new(layout)?;
            println!("{}", world.render(true));
        }

        Commands::Classify { layout } => {
            let layout = layout.resolve(&config)?;
            let mut world = Warehouse::new(layout)?;
            let mut agent = Agent::for_environment(config.agent.clone(), &world);
            let summary = agent.run(&mut world)?;

            println!("Outcome: {} after {} steps", summary.outcome, summary.steps);
            println!();
            println!("{}", agent.render_beliefs()?);
            println!();
            for (cell, safety) in agent.safety_map()? {
                let visited = if agent.visited().contains(&cell) {
                    " (visited)"
                } else {
                    ""
                };
                println!("  {:<6} {safety}{visited}", cell.to_string());
            }
            let kb = agent.knowledge();
            println!();
            println!(
                "Knowledge base: {} propositions, {} constraints, {} clauses ({})",
                kb.proposition_count(),
                kb.constraint_count(),
                kb.clause_count(),
                kb.backend_name()
            );
        }
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("Outcome:   {}", summary.outcome);
    println!("Steps:     {}", summary.steps);
    println!("Reward:    {}", summary.total_reward);
    println!(
        "Package:   {}",
        if summary.package_retrieved {
            "retrieved"
        } else {
            "not retrieved"
        }
    );
    println!(
        "Shutdown:  {}",
        if summary.shutdown_used { "used" } else { "unused" }
    );
    println!("Visited:   {} cells", summary.cells_visited);
    println!();
    for record in &summary.trace {
        println!(
            "  {:>3}  {:<10}  at {} facing {:<5}  {:>5}  {}",
            record.step, record.action, record.cell, record.facing, record.reward, record.percept
        );
    }
}
