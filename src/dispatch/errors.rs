//! Dispatch error types.

use super::node::NodeId;
use std::fmt;
use thiserror::Error;

/// Several edges of a `single`-mode node matched the same record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguity {
    pub node: NodeId,
    pub description: Option<String>,
    /// Descriptions of every matching predicate, in edge order.
    pub predicates: Vec<String>,
}

impl fmt::Display for Ambiguity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "'{}' ({})", description, self.node)?,
            None => write!(f, "{}", self.node)?,
        }
        write!(f, " matched {} paths: {}", self.predicates.len(), self.predicates.join(", "))
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{node} already has an otherwise branch")]
    DuplicateOtherwise { node: NodeId },

    #[error("edge from {from} to {to} would create a cycle")]
    Cycle { from: NodeId, to: NodeId },

    #[error("unhandled ambiguity at {0}")]
    UnhandledAmbiguity(Ambiguity),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguity_message_lists_predicates() {
        let ambiguity = Ambiguity {
            node: NodeId::from_index(3),
            description: Some("Kind".to_string()),
            predicates: vec!["bug".to_string(), "feature".to_string()],
        };
        let err = DispatchError::UnhandledAmbiguity(ambiguity);
        assert_eq!(
            err.to_string(),
            "unhandled ambiguity at 'Kind' (node #3) matched 2 paths: bug, feature"
        );
    }
}
