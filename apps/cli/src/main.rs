#![deny(warnings)]

//! Headless CLI: load a scenario, run it under a purchase policy and write the
//! purchase log.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use sim_ai::{CheapestAffordable, Idle, PurchasePolicy, RandomAffordable, ScriptedPlan};
use sim_core::{LifetimeEffectPolicy, SimConfig};
use sim_runtime::Simulation;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    ", built ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PolicyKind {
    /// Never buy
    Idle,
    /// Buy the cheapest template whenever affordable
    Cheapest,
    /// Buy one random affordable template per turn
    Random,
    /// Replay the purchases listed in --plan
    Plan,
}

#[derive(Parser, Debug)]
#[command(author, version, long_version = LONG_VERSION, about, long_about = None)]
struct Args {
    /// Scenario file (plain-text format, or .json)
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the purchase log
    #[arg(short, long, default_value = "output.txt")]
    output: PathBuf,

    /// Purchase policy
    #[arg(long, value_enum, default_value_t = PolicyKind::Cheapest)]
    policy: PolicyKind,

    /// YAML purchase plan (turn -> ids), used with --policy plan
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Seed for --policy random
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Also write the full run summary as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Sum all active lifetime effects instead of using the first one
    #[arg(long)]
    stack_lifetime_effects: bool,

    /// Suppress per-turn lines
    #[arg(short, long)]
    quiet: bool,
}

fn build_policy(args: &Args) -> Result<Box<dyn PurchasePolicy>> {
    Ok(match args.policy {
        PolicyKind::Idle => Box::new(Idle),
        PolicyKind::Cheapest => Box::new(CheapestAffordable),
        PolicyKind::Random => Box::new(RandomAffordable::new(args.seed)),
        PolicyKind::Plan => {
            let Some(path) = &args.plan else {
                bail!("--policy plan requires --plan <file>");
            };
            let plan = ScriptedPlan::load(path)
                .with_context(|| format!("loading plan {}", path.display()))?;
            info!(turns = plan.scheduled_turns(), "plan loaded");
            Box::new(plan)
        }
    })
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!(input = %args.input.display(), policy = ?args.policy, "starting CLI");

    let scenario = sim_io::load_scenario(&args.input)?;
    let config = SimConfig {
        lifetime_effects: if args.stack_lifetime_effects {
            LifetimeEffectPolicy::Stack
        } else {
            LifetimeEffectPolicy::FirstActiveWins
        },
    };
    let mut policy = build_policy(&args)?;
    let mut sim = Simulation::new(scenario, config).context("invalid scenario")?;

    while let Some(r) = sim.step_with(policy.as_mut()) {
        if !args.quiet {
            println!(
                "Turn {}: Budget = {}, Production = {}, Profit = {}, Maintenance = {}",
                r.turn, r.budget, r.production, r.profit, r.maintenance
            );
        }
    }
    let summary = sim.finish();

    sim_io::save_purchase_log(&args.output, &summary)?;
    if let Some(path) = &args.report {
        sim_io::save_report(path, &summary)?;
    }

    println!(
        "Final | turns: {} | budget: {} | profit: {} | maintenance: {} | stored: {}/{}",
        summary.turns.len(),
        summary.final_budget,
        summary.total_profit(),
        summary.total_maintenance(),
        summary.final_accumulator.stored(),
        summary.final_accumulator.capacity()
    );

    Ok(())
}
