//! Compile rule conditions into issue predicates.

use crate::config::Condition;
use crate::domain::Issue;
use anyhow::{bail, Context, Result};
use regex::Regex;

type Matcher = Box<dyn Fn(&Issue) -> bool>;

/// Build a matcher for every field of `condition` except `group`, which needs
/// the tree and is wired by the builder.
pub fn compile(condition: &Condition) -> Result<Matcher> {
    if condition.group.is_some() {
        bail!("group conditions are resolved against the tree, not compiled");
    }

    let mut tests: Vec<Matcher> = Vec::new();
    if let Some(label) = condition.label.clone() {
        tests.push(Box::new(move |issue: &Issue| issue.has_label(&label)));
    }
    if let Some(pattern) = &condition.label_matches {
        let regex =
            Regex::new(pattern).with_context(|| format!("invalid label pattern '{pattern}'"))?;
        tests.push(Box::new(move |issue: &Issue| {
            issue.label_names().any(|name| regex.is_match(name))
        }));
    }
    if let Some(unlabeled) = condition.unlabeled {
        tests.push(Box::new(move |issue: &Issue| issue.labels.is_empty() == unlabeled));
    }
    if let Some(state) = condition.state {
        tests.push(Box::new(move |issue: &Issue| issue.state == state));
    }
    if let Some(open) = condition.open {
        tests.push(Box::new(move |issue: &Issue| issue.is_open() == open));
    }
    if let Some(closed) = condition.closed {
        tests.push(Box::new(move |issue: &Issue| issue.is_closed() == closed));
    }
    if let Some(locked) = condition.locked {
        tests.push(Box::new(move |issue: &Issue| issue.locked == locked));
    }
    if let Some(pull_request) = condition.pull_request {
        tests.push(Box::new(move |issue: &Issue| issue.is_pull_request == pull_request));
    }
    if let Some(all) = &condition.all {
        let nested = all.iter().map(compile).collect::<Result<Vec<_>>>()?;
        tests.push(Box::new(move |issue: &Issue| nested.iter().all(|test| test(issue))));
    }
    if let Some(any) = &condition.any {
        let nested = any.iter().map(compile).collect::<Result<Vec<_>>>()?;
        tests.push(Box::new(move |issue: &Issue| nested.iter().any(|test| test(issue))));
    }
    if let Some(not) = &condition.not {
        let nested = compile(not)?;
        tests.push(Box::new(move |issue: &Issue| !nested(issue)));
    }

    Ok(Box::new(move |issue: &Issue| tests.iter().all(|test| test(issue))))
}
