//! Described boolean tests guarding dispatch edges.

use super::node::NodeId;

pub(crate) enum Test<T> {
    Fn(Box<dyn Fn(&T) -> bool>),
    /// True when any outgoing predicate of the referenced node matches.
    Group(NodeId),
}

pub struct Predicate<T> {
    description: String,
    pub(crate) test: Test<T>,
}

impl<T> Predicate<T> {
    pub fn new<F>(description: impl Into<String>, test: F) -> Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        Self { description: description.into(), test: Test::Fn(Box::new(test)) }
    }

    pub(crate) fn group(description: impl Into<String>, node: NodeId) -> Self {
        Self { description: description.into(), test: Test::Group(node) }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Node whose edges this predicate defers to, if it is a grouping predicate.
    pub fn group_target(&self) -> Option<NodeId> {
        match self.test {
            Test::Group(node) => Some(node),
            Test::Fn(_) => None,
        }
    }
}

impl<T> std::fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predicate")
            .field("description", &self.description)
            .field("group", &self.group_target())
            .finish()
    }
}
