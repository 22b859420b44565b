//! treeage: rule-dispatch triage of GitHub issues and pull requests
//!
//! Issues are routed through a declarative graph of predicate-guarded nodes
//! ([`dispatch`]), optionally after being rewound to an earlier instant by
//! replaying their timelines backwards ([`replay`]). The [`driver`] ties both
//! together for batch runs over cached issue data.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod driver;
pub mod render;
pub mod replay;
