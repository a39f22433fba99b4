use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use kviri::{output, Config, ExpressionEvaluator, OutputFormat, Plan};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "kviri")]
#[command(about = "Kviri - LINQ-style queries over JSON and CSV data", long_about = None)]
struct Args {
    /// Configuration file (defaults to ./kviri.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set (e.g. "kviri=debug")
    #[arg(long, global = true)]
    log: Option<String>,

    /// Maximum number of bindings a query may hold
    #[arg(long, global = true)]
    max_bindings: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a plan and print its results
    Run {
        /// Plan file
        plan: PathBuf,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Validate a plan without loading any data
    Check {
        /// Plan file
        plan: PathBuf,
    },
    /// Run a plan and show the binding count after each clause
    Explain {
        /// Plan file
        plan: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    let format = match &args.command {
        Command::Run { format, .. } => *format,
        _ => None,
    };
    config.apply_cli(args.log, format, args.max_bindings);

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Logging is only available once the configuration is known
    match &config.source {
        Some(path) => tracing::debug!(path = %path.display(), "loaded configuration file"),
        None => tracing::debug!("no configuration file, using defaults"),
    }
    tracing::debug!(
        format = %config.format,
        max_bindings = config.max_bindings,
        "configuration resolved"
    );

    match args.command {
        Command::Run { plan, .. } => run(&plan, &config),
        Command::Check { plan } => check(&plan),
        Command::Explain { plan } => explain(&plan, &config),
    }
}

fn load_plan(path: &Path) -> anyhow::Result<Plan> {
    Plan::load(path).with_context(|| format!("Failed to load plan {}", path.display()))
}

fn run(path: &Path, config: &Config) -> anyhow::Result<()> {
    let plan = load_plan(path)?;
    let query = plan
        .run(config.limits())
        .with_context(|| format!("Plan {} failed", path.display()))?;

    if query.is_stale() {
        tracing::warn!("clauses after the last select/by changed the bindings; printing the earlier results");
    }

    println!("{}", output::render(&query, config.format)?);
    Ok(())
}

fn check(path: &Path) -> anyhow::Result<()> {
    let plan = load_plan(path)?;
    let steps = plan
        .check(&ExpressionEvaluator::new())
        .with_context(|| format!("Plan {} is invalid", path.display()))?;

    println!(
        "{} {} ({} clauses, {} sources)",
        "OK".green().bold(),
        path.display(),
        steps.len(),
        plan.sources.len()
    );
    Ok(())
}

fn explain(path: &Path, config: &Config) -> anyhow::Result<()> {
    let plan = load_plan(path)?;
    for (name, source) in &plan.sources {
        println!("{} {} = {}", "source".dimmed(), name.cyan(), source.describe());
    }

    let report = plan
        .explain(config.limits())
        .with_context(|| format!("Plan {} failed", path.display()))?;

    let width = report.iter().map(|s| s.clause.len()).max().unwrap_or(0);
    for step in &report {
        let results = match step.results {
            Some(n) => format!(", {} results", n),
            None => String::new(),
        };
        println!(
            "{:>3}  {:<width$}  {}",
            step.index,
            step.clause,
            format!("{} bindings{}", step.bindings, results).yellow(),
            width = width
        );
    }
    Ok(())
}
