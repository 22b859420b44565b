//! Graph command implementation

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::utils::current_dir;
use crate::config::load_rules;
use crate::driver::build_tree;
use crate::render::render_dot;

#[derive(Args)]
pub struct GraphArgs {
    /// Rules file (treeage.toml or .treeage.yml); discovered when omitted
    #[arg(short = 'r', long, value_name = "FILE")]
    pub rules: Option<PathBuf>,
}

pub fn run(args: GraphArgs) -> Result<()> {
    let rules = load_rules(&current_dir()?, args.rules.as_deref())?;
    let built = build_tree(&rules, false)?;
    print!("{}", render_dot(&built.tree, built.root));
    Ok(())
}
