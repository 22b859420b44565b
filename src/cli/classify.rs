//! Classify command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;

use super::utils::{current_dir, parse_instants};
use crate::config::load_rules;
use crate::driver::{classify, classify_history, load_issues, ClassifyOptions};
use crate::render::{render_summary, write_report};

#[derive(Args)]
pub struct ClassifyArgs {
    /// JSON file holding an array of issues
    #[arg(short = 'i', long, value_name = "FILE")]
    pub issues: PathBuf,

    /// Rules file (treeage.toml or .treeage.yml); discovered when omitted
    #[arg(short = 'r', long, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// Classify as of these dates instead of now (repeatable or comma-separated)
    #[arg(long, value_name = "DATE", value_delimiter = ',')]
    pub as_of: Vec<String>,

    /// Record ambiguous matches instead of aborting
    #[arg(long)]
    pub catch_ambiguity: bool,

    /// Write a JSON report to this path
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Write the dispatch graph of the last run as Graphviz DOT
    #[arg(long, value_name = "FILE")]
    pub dot: Option<PathBuf>,

    /// Omit the generation timestamp from the report
    #[arg(long)]
    pub no_timestamp: bool,
}

pub fn run(args: ClassifyArgs) -> Result<()> {
    let rules = load_rules(&current_dir()?, args.rules.as_deref())?;
    let issues = load_issues(&args.issues)?;
    let options = ClassifyOptions { catch_ambiguity: args.catch_ambiguity };

    let dates = parse_instants(&args.as_of)?;
    let runs = if dates.is_empty() {
        vec![classify(&issues, &rules, None, options)?]
    } else {
        classify_history(&issues, &rules, &dates, options)?
    };

    for (index, run) in runs.iter().enumerate() {
        if index > 0 {
            println!();
        }
        print!("{}", render_summary(run));
    }

    if let Some(report_path) = &args.report {
        write_report(report_path, &runs, args.rules.as_deref(), !args.no_timestamp)
            .with_context(|| format!("Failed writing report: {}", report_path.display()))?;
        tracing::info!("Wrote report to {}", report_path.display());
    }

    if let (Some(dot_path), Some(last)) = (&args.dot, runs.last()) {
        fs::write(dot_path, &last.dot)
            .with_context(|| format!("Failed writing graph: {}", dot_path.display()))?;
        tracing::info!("Wrote graph to {}", dot_path.display());
    }

    Ok(())
}
