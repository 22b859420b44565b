//! Replay command implementation

use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;

use super::utils::parse_instant;
use crate::driver::load_issues;
use crate::replay::replay_many;

#[derive(Args)]
pub struct ReplayArgs {
    /// JSON file holding an array of issues
    #[arg(short = 'i', long, value_name = "FILE")]
    pub issues: PathBuf,

    /// Instant to reconstruct (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub as_of: String,

    /// Only replay this issue number
    #[arg(short = 'n', long, value_name = "NUMBER")]
    pub number: Option<u64>,
}

pub fn run(args: ReplayArgs) -> Result<()> {
    let as_of = parse_instant(&args.as_of)?;
    let issues = load_issues(&args.issues)?;

    let selected: Vec<_> = match args.number {
        Some(number) => issues.iter().filter(|issue| issue.number == number).collect(),
        None => issues.iter().collect(),
    };
    if let (Some(number), true) = (args.number, selected.is_empty()) {
        bail!("Issue #{number} not found in {}", args.issues.display());
    }

    let snapshots = replay_many(selected, as_of)?;
    println!("{}", serde_json::to_string_pretty(&snapshots)?);
    Ok(())
}
