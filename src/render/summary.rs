//! Human-readable run summaries for the terminal.

use crate::driver::RunOutcome;
use std::fmt::Write;

const MAX_LISTED: usize = 10;

pub fn render_summary(run: &RunOutcome) -> String {
    let mut out = String::new();
    match run.as_of {
        Some(when) => {
            let _ = writeln!(
                out,
                "As of {}: {} issues classified ({} not yet created)",
                when.to_rfc3339(),
                run.processed,
                run.not_yet_created
            );
        }
        None => {
            let _ = writeln!(out, "Current: {} issues classified", run.processed);
        }
    }

    if !run.buckets.is_empty() {
        let _ = writeln!(out, "Buckets:");
        for (name, numbers) in &run.buckets {
            let listed: Vec<String> =
                numbers.iter().take(MAX_LISTED).map(|n| format!("#{n}")).collect();
            let more = if numbers.len() > MAX_LISTED { ", ..." } else { "" };
            let _ = writeln!(out, "  {}: {} ({}{})", name, numbers.len(), listed.join(", "), more);
        }
    }

    if !run.ambiguities.is_empty() {
        let _ = writeln!(out, "Ambiguities: {}", run.ambiguities.len());
        for record in &run.ambiguities {
            let _ = writeln!(
                out,
                "  #{} at '{}': {}",
                record.number,
                record.node,
                record.predicates.join(", ")
            );
        }
    }

    let _ = writeln!(out, "Nodes:");
    for node in &run.stats {
        let name = node.description.clone().unwrap_or_else(|| format!("node #{}", node.id));
        let _ = writeln!(
            out,
            "  {} [{}] hits={} terminal={}",
            name, node.mode, node.hits, node.terminal_hits
        );
    }
    out
}
