//! Rules file loading
//!
//! Rules come from an explicit `--rules` path or are discovered in the working
//! directory, and are validated before a dispatch tree is built from them.

pub mod loader;
pub mod rules;

pub use loader::load_rules;
pub use rules::{Condition, NodeSpec, PathSpec, RulesConfig};
