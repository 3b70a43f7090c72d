//! Transition Testbed
//!
//! Loads a rule set and a scene, steps the rule engine and prints what
//! changed. Without arguments the built-in demo kitchen is used.
//!
//! Set `RUST_LOG=debug` to see individual rule firings.

use anyhow::Context;
use clap::Parser;
use logic::RuleSetConfig;
use std::path::PathBuf;
use testbed::demo;
use tracing_subscriber::EnvFilter;
use world::SceneConfig;

/// Transition Testbed
#[derive(Parser)]
#[command(name = "testbed")]
#[command(about = "Step object transition rules against a scene")]
struct Args {
    /// Rule set (RON). Defaults to the demo kitchen rules
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Scene (RON). Defaults to the demo kitchen
    #[arg(short, long)]
    scene: Option<PathBuf>,

    /// Number of steps to run
    #[arg(short = 'n', long, default_value_t = 5)]
    steps: u64,

    /// Print the active rule set as RON and exit
    #[arg(long)]
    dump_rules: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let rules = match &args.rules {
        Some(path) => RuleSetConfig::load_from_file(path)
            .with_context(|| format!("failed to load rules from {}", path.display()))?,
        None => demo::kitchen_rules(),
    };
    if args.dump_rules {
        println!("{}", rules.to_ron_string()?);
        return Ok(());
    }

    let mut scene = match &args.scene {
        Some(path) => SceneConfig::load_from_file(path)
            .and_then(|config| config.build())
            .with_context(|| format!("failed to load scene from {}", path.display()))?,
        None => demo::kitchen()?,
    };
    let mut engine = rules.build()?;
    tracing::info!(rules = engine.rule_count(), objects = scene.len(), "starting");

    for summary in testbed::run(&mut engine, &mut scene, args.steps)? {
        if summary.is_idle() {
            println!("step {}: idle", summary.step);
            continue;
        }
        println!(
            "step {}: fired [{}], spawned [{}], removed {}",
            summary.step,
            summary.fired.join(", "),
            summary.spawned.join(", "),
            summary.removed
        );
        for rule in &summary.failed {
            println!("  failed: {}", rule);
        }
    }

    println!("\nfinal scene ({} objects):", scene.len());
    for name in scene.names() {
        println!("  {}", name);
    }
    Ok(())
}
