//! Dispatch nodes and their configuration.

use super::predicate::Predicate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side effect invoked with the record being classified.
pub type Action<T> = Box<dyn FnMut(&T)>;

/// Callback receiving ambiguities raised at or below the node it is installed on.
pub type AmbiguityHandler<T> = Box<dyn FnMut(&super::Ambiguity, &T)>;

/// Stable handle to a node inside a [`super::DispatchTree`].
///
/// Handles are only meaningful for the tree that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node #{}", self.0)
    }
}

/// How a node resolves several matching edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathMode {
    /// Take the first matching edge in registration order.
    First,
    /// Exactly one edge may match; more is an ambiguity.
    #[default]
    Single,
    /// Fan out into every matching edge.
    Multiple,
}

impl PathMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PathMode::First => "first",
            PathMode::Single => "single",
            PathMode::Multiple => "multiple",
        }
    }
}

impl fmt::Display for PathMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeOptions {
    pub mode: PathMode,
}

impl NodeOptions {
    pub fn mode(mode: PathMode) -> Self {
        Self { mode }
    }
}

pub(crate) struct Edge<T> {
    pub predicate: Predicate<T>,
    pub target: NodeId,
}

pub(crate) struct Node<T> {
    pub description: Option<String>,
    pub mode: PathMode,
    pub edges: Vec<Edge<T>>,
    pub otherwise: Option<NodeId>,
    pub terminal_actions: Vec<Action<T>>,
    pub always_actions: Vec<Action<T>>,
    pub handler: Option<AmbiguityHandler<T>>,
    pub hits: u64,
    pub terminal_hits: u64,
}

impl<T> Node<T> {
    pub fn new(options: NodeOptions) -> Self {
        Self {
            description: None,
            mode: options.mode,
            edges: Vec::new(),
            otherwise: None,
            terminal_actions: Vec::new(),
            always_actions: Vec::new(),
            handler: None,
            hits: 0,
            terminal_hits: 0,
        }
    }
}

/// Counter snapshot for one node, as reported by [`super::DispatchTree::stats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStats {
    pub id: usize,
    pub description: Option<String>,
    pub mode: PathMode,
    pub hits: u64,
    pub terminal_hits: u64,
}
