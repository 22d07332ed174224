use crate::commands::read_log;
use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use quire_model::{Document, OperationReplayer};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Operation log to replay
    pub log: PathBuf,

    /// Apply at most this many operations
    #[arg(short, long)]
    pub steps: Option<usize>,

    /// Delay between operations in milliseconds (overrides config)
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Print roots as JSON node trees instead of markup
    #[arg(long)]
    pub json: bool,
}

pub fn replay(args: ReplayArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let log = read_log(cwd, &args.log)?;
    let delay = args.delay_ms.map(Duration::from_millis).unwrap_or_else(|| config.replay_delay());

    let mut doc = config.build_document()?;
    println!("{}", "▶ Replaying operations...".bright_blue().bold());

    let applied = run_replay(&mut doc, &config.separator, &log, args.steps, delay)?;

    println!("  {} Applied {} operations", "✓".green(), applied);
    println!("  Version: {}", doc.version());
    println!();

    if args.json {
        println!("{}", render_json(&doc)?);
    } else {
        for name in doc.root_names(false) {
            let markup = doc.stringify_root(&name).unwrap_or_default();
            println!("{} {}", format!("{name}:").bright_white().bold(), markup);
        }
    }

    Ok(())
}

/// Replay `log` into `doc`, all of it or `steps` operations
pub fn run_replay(doc: &mut Document, separator: &str, log: &str, steps: Option<usize>, delay: Duration) -> Result<usize> {
    let mut replayer = OperationReplayer::new(doc, separator, log).context("Invalid operation log")?;
    let applied = match steps {
        Some(steps) => replayer.apply_operations(steps),
        None => replayer.play(delay),
    };
    let applied = applied.context("Replay failed")?;
    info!(applied, version = replayer.document().version(), "replay finished");
    Ok(applied)
}

/// Attached roots and their content as a JSON object
pub fn render_json(doc: &Document) -> Result<String> {
    let mut roots = serde_json::Map::new();
    for name in doc.root_names(false) {
        if let Some(root) = doc.get_root(&name) {
            let children = doc.tree().snapshot_children(root)?;
            roots.insert(name, serde_json::to_value(children)?);
        }
    }
    Ok(serde_json::to_string_pretty(&roots)?)
}
