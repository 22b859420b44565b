//! treeage: classify GitHub issues with declarative dispatch rules

use anyhow::Result;

fn main() -> Result<()> {
    treeage::cli::run()
}
