use crate::commands::read_log;
use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use quire_model::{from_json, Document};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Operation log to inspect
    pub log: PathBuf,
}

/// One decoded entry of a log
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub class_name: &'static str,
    pub op_type: &'static str,
    pub base_version: Option<u64>,
}

pub fn inspect(args: InspectArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let log = read_log(cwd, &args.log)?;
    let mut doc = config.build_document()?;

    let entries = decode_log(&mut doc, &config.separator, &log)?;
    println!(
        "{}",
        format!("🔍 {} operations in {}", entries.len(), args.log.display())
            .bright_blue()
            .bold()
    );
    for (i, entry) in entries.iter().enumerate() {
        let version = entry
            .base_version
            .map(|v| format!("v{v}"))
            .unwrap_or_else(|| "detached".to_string());
        println!(
            "  {:>4}  {:<24} {:<20} {}",
            format!("#{i}").dimmed(),
            entry.class_name,
            entry.op_type.bright_white(),
            version.dimmed()
        );
    }
    Ok(())
}

/// Decode every operation of `log` without applying any of them. Roots
/// added by root operations are registered on `doc` so later entries resolve.
pub fn decode_log(doc: &mut Document, separator: &str, log: &str) -> Result<Vec<LogEntry>> {
    log.split(separator)
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .enumerate()
        .map(|(i, chunk)| {
            let json: serde_json::Value =
                serde_json::from_str(chunk).with_context(|| format!("Entry #{i} is not valid JSON"))?;
            let op = from_json(&json, doc).with_context(|| format!("Entry #{i} is not a valid operation"))?;
            Ok(LogEntry {
                class_name: op.class_name(),
                op_type: op.op_type(),
                base_version: op.base_version(),
            })
        })
        .collect()
}
