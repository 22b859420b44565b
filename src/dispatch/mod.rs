//! Predicate dispatch tree
//!
//! Routes a record through a graph of predicate-guarded edges. Nodes live in an
//! arena owned by [`DispatchTree`] and are addressed by [`NodeId`], so a node can
//! be the target of several parents (shared sub-trees) and its counters then
//! aggregate traffic from every entry path.

pub mod errors;
pub mod node;
pub mod predicate;
pub mod tree;

pub use errors::{Ambiguity, DispatchError};
pub use node::{NodeId, NodeOptions, NodeStats, PathMode};
pub use predicate::Predicate;
pub use tree::{DispatchTree, NodeMut};
