//! Rules file loading

use super::rules::RulesConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Section name under which rules may be nested inside a shared config file.
const SECTION: &str = "treeage";

pub fn load_rules(search_dir: &Path, rules_path: Option<&Path>) -> Result<RulesConfig> {
    let rules_file = match rules_path {
        Some(path) => path.to_path_buf(),
        None => discover_rules(search_dir).with_context(|| {
            format!("No rules file given and none found in {}", search_dir.display())
        })?,
    };
    tracing::debug!("Loading rules from {}", rules_file.display());

    let content = fs::read_to_string(&rules_file)
        .with_context(|| format!("Failed reading rules file: {}", rules_file.display()))?;

    let ext = rules_file.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    let rules = match ext.as_str() {
        "toml" => parse_toml_rules(&content, &rules_file)?,
        "yaml" | "yml" => parse_yaml_rules(&content, &rules_file)?,
        other => anyhow::bail!(
            "Unsupported rules extension '.{}' for file {}",
            other,
            rules_file.display()
        ),
    };

    rules.validate().with_context(|| format!("Invalid rules in {}", rules_file.display()))?;
    Ok(rules)
}

/// Parse TOML rules, supporting a nested `[treeage]` section.
fn parse_toml_rules(content: &str, rules_file: &Path) -> Result<RulesConfig> {
    let raw: toml::Value = toml::from_str(content)
        .with_context(|| format!("Invalid TOML syntax: {}", rules_file.display()))?;

    let rules_val = match raw.get(SECTION) {
        Some(nested) => nested.clone(),
        None => raw,
    };

    rules_val.try_into().with_context(|| format!("Invalid TOML rules: {}", rules_file.display()))
}

/// Parse YAML rules, supporting a nested `treeage` section.
fn parse_yaml_rules(content: &str, rules_file: &Path) -> Result<RulesConfig> {
    let raw: serde_yaml::Value = serde_yaml::from_str(content)
        .with_context(|| format!("Invalid YAML syntax: {}", rules_file.display()))?;

    let rules_val = match raw.get(SECTION) {
        Some(nested) => nested.clone(),
        None => raw,
    };

    serde_yaml::from_value(rules_val)
        .with_context(|| format!("Invalid YAML rules: {}", rules_file.display()))
}

fn discover_rules(search_dir: &Path) -> Option<PathBuf> {
    let candidates = [
        "treeage.toml",
        ".treeage.toml",
        "treeage.yml",
        ".treeage.yml",
        "treeage.yaml",
        ".treeage.yaml",
    ];

    candidates.iter().map(|candidate| search_dir.join(candidate)).find(|path| path.exists())
}
