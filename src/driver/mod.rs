//! Report driver: runs classification batches over stored issues.
//!
//! The driver owns everything the engine leaves out: reading issues from disk,
//! building one tree per run, replaying issues to historical dates and
//! collecting bucket contents and counters.

pub mod build;
pub mod condition;

pub use build::{build_tree, AmbiguityRecord, BuiltTree, Collector};

use crate::config::RulesConfig;
use crate::dispatch::NodeStats;
use crate::domain::Issue;
use crate::render::render_dot;
use crate::replay::{replay, Replayed};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyOptions {
    /// Record ambiguities no node catches instead of aborting.
    pub catch_ambiguity: bool,
}

/// Result of classifying a batch once.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// `None` for the live state.
    pub as_of: Option<DateTime<Utc>>,
    pub processed: usize,
    pub not_yet_created: usize,
    pub buckets: BTreeMap<String, Vec<u64>>,
    pub ambiguities: Vec<AmbiguityRecord>,
    pub stats: Vec<NodeStats>,
    pub dot: String,
}

/// Read a JSON array of issues, as cached from the GitHub API.
pub fn load_issues(path: &Path) -> Result<Vec<Issue>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed reading issues file: {}", path.display()))?;
    let issues: Vec<Issue> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid issues JSON: {}", path.display()))?;
    tracing::info!("Loaded {} issues from {}", issues.len(), path.display());
    Ok(issues)
}

/// Classify `issues` with a freshly built tree, optionally as of `as_of`.
pub fn classify(
    issues: &[Issue],
    rules: &RulesConfig,
    as_of: Option<DateTime<Utc>>,
    options: ClassifyOptions,
) -> Result<RunOutcome> {
    let BuiltTree { mut tree, root, collector, .. } = build_tree(rules, options.catch_ambiguity)?;

    let mut processed = 0usize;
    let mut not_yet_created = 0usize;
    for issue in issues {
        let snapshot: Cow<'_, Issue> = match as_of {
            None => Cow::Borrowed(issue),
            Some(when) => match replay(issue, when)? {
                Replayed::Snapshot(snapshot) => Cow::Owned(snapshot),
                Replayed::NotYetCreated => {
                    not_yet_created += 1;
                    continue;
                }
            },
        };
        tree.process(root, &snapshot)
            .with_context(|| format!("Failed classifying issue #{}", issue.number))?;
        processed += 1;
    }

    let stats = tree.stats(root);
    let dot = render_dot(&tree, root);
    drop(tree);
    let collected = collector.borrow().clone();

    match as_of {
        Some(when) => tracing::info!(
            "Classified {processed} issues as of {when} ({not_yet_created} not yet created)"
        ),
        None => tracing::info!("Classified {processed} issues"),
    }

    Ok(RunOutcome {
        as_of,
        processed,
        not_yet_created,
        buckets: collected.buckets,
        ambiguities: collected.ambiguities,
        stats,
        dot,
    })
}

/// One run per date, each with its own tree so counters never mix.
pub fn classify_history(
    issues: &[Issue],
    rules: &RulesConfig,
    dates: &[DateTime<Utc>],
    options: ClassifyOptions,
) -> Result<Vec<RunOutcome>> {
    dates.iter().map(|when| classify(issues, rules, Some(*when), options)).collect()
}
