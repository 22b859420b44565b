//! Declarative rule sets describing a dispatch graph.

use crate::dispatch::PathMode;
use crate::domain::IssueState;
use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

static NODE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap());

/// A whole rules file: the entry node plus every node definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesConfig {
    pub root: String,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    pub name: String,
    #[serde(default)]
    pub mode: PathMode,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub paths: Vec<PathSpec>,
    /// Node created as this node's fallback branch.
    #[serde(default)]
    pub otherwise: Option<String>,
    /// Bucket receiving issue numbers when traversal ends here.
    #[serde(default)]
    pub bucket: Option<String>,
    /// Bucket receiving issue numbers on every visit.
    #[serde(default)]
    pub track: Option<String>,
    /// Record ambiguities at or below this node instead of failing.
    #[serde(default)]
    pub catch: bool,
}

impl NodeSpec {
    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathSpec {
    pub when: Condition,
    pub to: String,
}

/// Conjunction of every field that is set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Condition {
    /// Label name, compared case-insensitively.
    #[serde(default)]
    pub label: Option<String>,
    /// Regex matched against every label name.
    #[serde(default)]
    pub label_matches: Option<String>,
    /// `true` when the issue has no labels at all.
    #[serde(default)]
    pub unlabeled: Option<bool>,
    #[serde(default)]
    pub state: Option<IssueState>,
    /// Shorthand for `state = "open"` (or `"closed"` when `false`).
    #[serde(default)]
    pub open: Option<bool>,
    /// Shorthand for `state = "closed"` (or `"open"` when `false`).
    #[serde(default)]
    pub closed: Option<bool>,
    #[serde(default)]
    pub locked: Option<bool>,
    #[serde(default)]
    pub pull_request: Option<bool>,
    #[serde(default)]
    pub all: Option<Vec<Condition>>,
    #[serde(default)]
    pub any: Option<Vec<Condition>>,
    #[serde(default)]
    pub not: Option<Box<Condition>>,
    /// Grouping test of another node; must be the only field.
    #[serde(default)]
    pub group: Option<String>,
}

impl Condition {
    fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.label_matches.is_none()
            && self.unlabeled.is_none()
            && self.state.is_none()
            && self.open.is_none()
            && self.closed.is_none()
            && self.locked.is_none()
            && self.pull_request.is_none()
            && self.all.is_none()
            && self.any.is_none()
            && self.not.is_none()
            && self.group.is_none()
    }

    fn validate(&self, top_level: bool) -> Result<()> {
        if self.is_empty() {
            bail!("empty condition");
        }
        if let Some(group) = &self.group {
            if !top_level {
                bail!("group '{group}' can only be used directly as a path condition");
            }
            let alone = Condition { group: None, ..self.clone() };
            if !alone.is_empty() {
                bail!("group '{group}' cannot be combined with other tests");
            }
        }
        if let Some(pattern) = &self.label_matches {
            Regex::new(pattern).with_context(|| format!("invalid label pattern '{pattern}'"))?;
        }
        for nested in self.all.iter().chain(self.any.iter()).flatten() {
            nested.validate(false)?;
        }
        if let Some(nested) = &self.not {
            nested.validate(false)?;
        }
        Ok(())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(group) = &self.group {
            parts.push(format!("group {group}"));
        }
        if let Some(label) = &self.label {
            parts.push(format!("label={label}"));
        }
        if let Some(pattern) = &self.label_matches {
            parts.push(format!("label~/{pattern}/"));
        }
        if let Some(unlabeled) = self.unlabeled {
            parts.push(if unlabeled { "unlabeled".to_string() } else { "labeled".to_string() });
        }
        if let Some(state) = self.state {
            parts.push(match state {
                IssueState::Open => "open".to_string(),
                IssueState::Closed => "closed".to_string(),
            });
        }
        if let Some(open) = self.open {
            parts.push(if open { "open".to_string() } else { "closed".to_string() });
        }
        if let Some(closed) = self.closed {
            parts.push(if closed { "closed".to_string() } else { "open".to_string() });
        }
        if let Some(locked) = self.locked {
            parts.push(if locked { "locked".to_string() } else { "unlocked".to_string() });
        }
        if let Some(pull_request) = self.pull_request {
            parts.push(if pull_request { "pr".to_string() } else { "issue".to_string() });
        }
        if let Some(all) = &self.all {
            parts.push(format!("all({})", join(all)));
        }
        if let Some(any) = &self.any {
            parts.push(format!("any({})", join(any)));
        }
        if let Some(not) = &self.not {
            parts.push(format!("not({not})"));
        }
        f.write_str(&parts.join(" && "))
    }
}

fn join(conditions: &[Condition]) -> String {
    conditions.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl RulesConfig {
    pub fn node(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Check references and patterns so a bad rules file fails before any
    /// issue is processed.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for node in &self.nodes {
            if !NODE_NAME.is_match(&node.name) {
                bail!("invalid node name '{}'", node.name);
            }
            if !names.insert(node.name.as_str()) {
                bail!("duplicate node '{}'", node.name);
            }
        }
        if !names.contains(self.root.as_str()) {
            bail!("root node '{}' is not defined", self.root);
        }

        // Fallback branches are created fresh, so their node can have no other parent.
        let mut otherwise_parent: HashMap<&str, &str> = HashMap::new();
        let mut path_targets = HashSet::new();
        for node in &self.nodes {
            for path in &node.paths {
                if !names.contains(path.to.as_str()) {
                    bail!("node '{}' routes to undefined node '{}'", node.name, path.to);
                }
                if let Some(group) = &path.when.group {
                    if !names.contains(group.as_str()) {
                        bail!("node '{}' groups undefined node '{group}'", node.name);
                    }
                }
                path.when
                    .validate(true)
                    .with_context(|| format!("node '{}' path to '{}'", node.name, path.to))?;
                path_targets.insert(path.to.as_str());
            }
            if let Some(fallback) = &node.otherwise {
                if !names.contains(fallback.as_str()) {
                    bail!("node '{}' falls back to undefined node '{fallback}'", node.name);
                }
                if let Some(previous) = otherwise_parent.insert(fallback, &node.name) {
                    bail!(
                        "node '{fallback}' is the otherwise branch of both '{previous}' and '{}'",
                        node.name
                    );
                }
            }
        }
        for (fallback, parent) in &otherwise_parent {
            if path_targets.contains(fallback) || *fallback == self.root {
                bail!("node '{fallback}' is the otherwise branch of '{parent}' and cannot be shared");
            }
        }
        Ok(())
    }
}
