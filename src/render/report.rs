//! Report JSON generation.

use crate::domain::REPORT_SCHEMA_VERSION;
use crate::driver::RunOutcome;
use anyhow::Result;
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::path::Path;

pub fn write_report(
    report_path: &Path,
    runs: &[RunOutcome],
    rules_path: Option<&Path>,
    include_timestamp: bool,
) -> Result<()> {
    let mut report = Map::new();
    report.insert("schema_version".to_string(), Value::String(REPORT_SCHEMA_VERSION.to_string()));
    if include_timestamp {
        report.insert(
            "generated_at".to_string(),
            Value::String(Utc::now().format("%Y-%m-%dT%H:%M:%S+00:00").to_string()),
        );
    }
    if let Some(path) = rules_path {
        report.insert("rules".to_string(), Value::String(path.display().to_string()));
    }
    let runs = runs.iter().map(run_value).collect::<Result<Vec<_>>>()?;
    report.insert("runs".to_string(), Value::Array(runs));

    if let Some(parent) = report_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(report_path, serde_json::to_string_pretty(&Value::Object(report))?)?;
    Ok(())
}

fn run_value(run: &RunOutcome) -> Result<Value> {
    Ok(json!({
        "as_of": run.as_of.map(|t| t.to_rfc3339()),
        "processed": run.processed,
        "not_yet_created": run.not_yet_created,
        "buckets": serde_json::to_value(&run.buckets)?,
        "ambiguities": serde_json::to_value(&run.ambiguities)?,
        "nodes": serde_json::to_value(&run.stats)?,
    }))
}
