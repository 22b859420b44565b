//! Arena-backed dispatch graph: construction and traversal.

use super::errors::{Ambiguity, DispatchError};
use super::node::{Edge, Node, NodeId, NodeOptions, NodeStats, PathMode};
use super::predicate::{Predicate, Test};
use std::collections::HashSet;

/// A graph of dispatch nodes built once and then fed records with
/// [`DispatchTree::process`].
///
/// Traversal mutates per-node counters, so one tree serves one thread. Build a
/// tree per worker (or per reporting date) when running in parallel.
pub struct DispatchTree<T> {
    nodes: Vec<Node<T>>,
}

impl<T> Default for DispatchTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DispatchTree<T> {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Create a detached node. The first node created is usually the root.
    pub fn create(&mut self, options: NodeOptions) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(Node::new(options));
        id
    }

    /// Fluent construction handle for `id`.
    pub fn node(&mut self, id: NodeId) -> NodeMut<'_, T> {
        NodeMut { tree: self, id }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn hit_count(&self, id: NodeId) -> u64 {
        self.get(id).hits
    }

    pub fn terminal_hit_count(&self, id: NodeId) -> u64 {
        self.get(id).terminal_hits
    }

    pub fn description(&self, id: NodeId) -> Option<&str> {
        self.get(id).description.as_deref()
    }

    pub fn mode(&self, id: NodeId) -> PathMode {
        self.get(id).mode
    }

    /// Outgoing edges of `id` as `(predicate description, target)`, in order.
    pub fn edges(&self, id: NodeId) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.get(id).edges.iter().map(|e| (e.predicate.description(), e.target))
    }

    pub fn otherwise_of(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).otherwise
    }

    /// A predicate that is true iff any outgoing predicate of `id` matches.
    ///
    /// Wiring it with [`NodeMut::add_path_to`] lets a parent treat a pre-built
    /// sub-tree as a single edge.
    pub fn grouping_predicate(&self, id: NodeId) -> Predicate<T> {
        let description = match self.description(id) {
            Some(description) => format!("any of {description}"),
            None => format!("any of {id}"),
        };
        Predicate::group(description, id)
    }

    /// Evaluate the grouping predicate of `id` against `item`.
    pub fn matches_any(&self, id: NodeId, item: &T) -> bool {
        self.get(id).edges.iter().any(|edge| self.test(&edge.predicate, item))
    }

    /// Every node reachable from `root`, depth-first, each listed once.
    pub fn walk(&self, root: NodeId) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            let node = self.get(id);
            if let Some(fallback) = node.otherwise {
                stack.push(fallback);
            }
            for edge in node.edges.iter().rev() {
                stack.push(edge.target);
            }
        }
        order
    }

    /// Counters of every node reachable from `root`, depth-first.
    pub fn stats(&self, root: NodeId) -> Vec<NodeStats> {
        self.walk(root)
            .into_iter()
            .map(|id| {
                let node = self.get(id);
                NodeStats {
                    id: id.index(),
                    description: node.description.clone(),
                    mode: node.mode,
                    hits: node.hits,
                    terminal_hits: node.terminal_hits,
                }
            })
            .collect()
    }

    /// Classify `item` starting at `root`.
    ///
    /// Fails only when a `single`-mode node matches several edges and no node on
    /// the path from `root` has an ambiguity handler installed.
    pub fn process(&mut self, root: NodeId, item: &T) -> Result<(), DispatchError> {
        self.visit(root, item, None)
    }

    fn visit(
        &mut self,
        id: NodeId,
        item: &T,
        inherited: Option<NodeId>,
    ) -> Result<(), DispatchError> {
        let handler = if self.get(id).handler.is_some() { Some(id) } else { inherited };
        self.get_mut(id).hits += 1;

        let node = self.get(id);
        let matched: Vec<usize> = node
            .edges
            .iter()
            .enumerate()
            .filter(|(_, edge)| self.test(&edge.predicate, item))
            .map(|(index, _)| index)
            .collect();
        tracing::trace!(node = id.index(), matched = matched.len(), "dispatch visit");

        let otherwise = node.otherwise;
        let next: Vec<NodeId> = match (node.mode, matched.len()) {
            (_, 0) => Vec::new(),
            (PathMode::First, _) | (PathMode::Single, 1) => vec![node.edges[matched[0]].target],
            (PathMode::Multiple, _) => matched.iter().map(|&i| node.edges[i].target).collect(),
            (PathMode::Single, _) => {
                let ambiguity = Ambiguity {
                    node: id,
                    description: node.description.clone(),
                    predicates: matched
                        .iter()
                        .map(|&i| node.edges[i].predicate.description().to_string())
                        .collect(),
                };
                self.raise(ambiguity, handler, item)?;
                self.run_always(id, item);
                return Ok(());
            }
        };

        if !next.is_empty() {
            for child in next {
                self.visit(child, item, handler)?;
            }
        } else if let Some(fallback) = otherwise {
            self.visit(fallback, item, handler)?;
        } else {
            let node = self.get_mut(id);
            node.terminal_hits += 1;
            for action in node.terminal_actions.iter_mut() {
                action(item);
            }
        }

        self.run_always(id, item);
        Ok(())
    }

    fn raise(
        &mut self,
        ambiguity: Ambiguity,
        handler: Option<NodeId>,
        item: &T,
    ) -> Result<(), DispatchError> {
        let Some(owner) = handler else {
            return Err(DispatchError::UnhandledAmbiguity(ambiguity));
        };
        tracing::debug!(handler = owner.index(), "{ambiguity}");
        if let Some(callback) = self.get_mut(owner).handler.as_mut() {
            callback(&ambiguity, item);
        }
        Ok(())
    }

    fn run_always(&mut self, id: NodeId, item: &T) {
        for action in self.get_mut(id).always_actions.iter_mut() {
            action(item);
        }
    }

    fn test(&self, predicate: &Predicate<T>, item: &T) -> bool {
        match &predicate.test {
            Test::Fn(test) => test(item),
            Test::Group(node) => self.matches_any(*node, item),
        }
    }

    /// Whether `to` can be reached from `from` through edges, otherwise
    /// branches or grouping references.
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            let node = self.get(id);
            stack.extend(node.otherwise);
            for edge in &node.edges {
                stack.push(edge.target);
                stack.extend(edge.predicate.group_target());
            }
        }
        false
    }

    fn connect(
        &mut self,
        from: NodeId,
        predicate: Predicate<T>,
        target: NodeId,
    ) -> Result<(), DispatchError> {
        if self.reaches(target, from) {
            return Err(DispatchError::Cycle { from, to: target });
        }
        if let Some(group) = predicate.group_target() {
            if self.reaches(group, from) {
                return Err(DispatchError::Cycle { from, to: group });
            }
        }
        self.get_mut(from).edges.push(Edge { predicate, target });
        Ok(())
    }

    fn get(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id.index()]
    }

    fn get_mut(&mut self, id: NodeId) -> &mut Node<T> {
        &mut self.nodes[id.index()]
    }
}

/// Construction handle returned by [`DispatchTree::node`].
///
/// Methods that create a child return the child's handle, so paths can be
/// chained; use [`NodeMut::id`] to keep a reference for later wiring.
pub struct NodeMut<'a, T> {
    tree: &'a mut DispatchTree<T>,
    id: NodeId,
}

impl<'a, T> NodeMut<'a, T> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn describe(self, name: impl Into<String>) -> Self {
        self.tree.get_mut(self.id).description = Some(name.into());
        self
    }

    /// Create a child with default options behind `predicate`.
    pub fn add_path(self, predicate: Predicate<T>) -> Result<NodeMut<'a, T>, DispatchError> {
        self.add_path_with(predicate, NodeOptions::default())
    }

    pub fn add_path_with(
        self,
        predicate: Predicate<T>,
        options: NodeOptions,
    ) -> Result<NodeMut<'a, T>, DispatchError> {
        let child = self.tree.create(options);
        if let Err(err) = self.tree.connect(self.id, predicate, child) {
            self.tree.nodes.pop();
            return Err(err);
        }
        Ok(NodeMut { tree: self.tree, id: child })
    }

    /// Route `predicate` to an existing node, sharing it with other parents.
    pub fn add_path_to(
        self,
        predicate: Predicate<T>,
        target: NodeId,
    ) -> Result<Self, DispatchError> {
        self.tree.connect(self.id, predicate, target)?;
        Ok(self)
    }

    /// Route to `target` whenever any of its own edges would match.
    pub fn add_group(self, target: NodeId) -> Result<Self, DispatchError> {
        let predicate = self.tree.grouping_predicate(target);
        self.add_path_to(predicate, target)
    }

    /// Create the fallback child taken when no edge matches.
    pub fn otherwise(self) -> Result<NodeMut<'a, T>, DispatchError> {
        self.otherwise_with(NodeOptions::default())
    }

    pub fn otherwise_with(self, options: NodeOptions) -> Result<NodeMut<'a, T>, DispatchError> {
        if self.tree.get(self.id).otherwise.is_some() {
            return Err(DispatchError::DuplicateOtherwise { node: self.id });
        }
        let child = self.tree.create(options);
        self.tree.get_mut(self.id).otherwise = Some(child);
        Ok(NodeMut { tree: self.tree, id: child })
    }

    /// Run `action` when traversal ends at this node.
    pub fn add_terminal_action<F>(self, action: F) -> Self
    where
        F: FnMut(&T) + 'static,
    {
        self.tree.get_mut(self.id).terminal_actions.push(Box::new(action));
        self
    }

    /// Run `action` on every visit, after the chosen branch completes.
    pub fn add_always_action<F>(self, action: F) -> Self
    where
        F: FnMut(&T) + 'static,
    {
        self.tree.get_mut(self.id).always_actions.push(Box::new(action));
        self
    }

    /// Handle ambiguities raised at this node or any descendant without its own handler.
    pub fn catch<F>(self, handler: F) -> Self
    where
        F: FnMut(&Ambiguity, &T) + 'static,
    {
        self.tree.get_mut(self.id).handler = Some(Box::new(handler));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug)]
    struct Item {
        labels: Vec<&'static str>,
    }

    fn item(labels: &[&'static str]) -> Item {
        Item { labels: labels.to_vec() }
    }

    fn label(name: &'static str) -> Predicate<Item> {
        Predicate::new(name, move |i: &Item| i.labels.contains(&name))
    }

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&'static str) -> Box<dyn FnMut(&Item)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let make = {
            let log = Rc::clone(&log);
            move |tag: &'static str| -> Box<dyn FnMut(&Item)> {
                let log = Rc::clone(&log);
                Box::new(move |_: &Item| log.borrow_mut().push(tag.to_string()))
            }
        };
        (log, make)
    }

    #[test]
    fn single_match_descends_only_into_that_child() {
        let mut tree = DispatchTree::new();
        let root = tree.create(NodeOptions::default());
        let bug = tree.node(root).add_path(label("bug")).expect("path").id();
        let feature = tree.node(root).add_path(label("feature")).expect("path").id();
        let (log, make) = recorder();
        tree.node(root).add_always_action(make("root-always"));
        tree.node(bug).add_terminal_action(make("bug-terminal"));

        tree.process(root, &item(&["bug"])).expect("process");

        assert_eq!(tree.hit_count(root), 1);
        assert_eq!(tree.hit_count(bug), 1);
        assert_eq!(tree.hit_count(feature), 0);
        assert_eq!(tree.terminal_hit_count(root), 0);
        assert_eq!(*log.borrow(), vec!["bug-terminal", "root-always"]);
    }

    #[test]
    fn ambiguity_goes_to_nearest_handler_without_descending() {
        let mut tree = DispatchTree::new();
        let root = tree.create(NodeOptions::default());
        let root_seen = Rc::new(RefCell::new(Vec::new()));
        let inner_seen = Rc::new(RefCell::new(Vec::<Ambiguity>::new()));
        {
            let root_seen = Rc::clone(&root_seen);
            tree.node(root).catch(move |a: &Ambiguity, _: &Item| root_seen.borrow_mut().push(a.clone()));
        }
        let kind = tree.node(root).add_path(label("triaged")).expect("path").describe("Kind").id();
        {
            let inner_seen = Rc::clone(&inner_seen);
            tree.node(kind).catch(move |a: &Ambiguity, _: &Item| inner_seen.borrow_mut().push(a.clone()));
        }
        let bug = tree.node(kind).add_path(label("bug")).expect("path").id();
        let feature = tree.node(kind).add_path(label("feature")).expect("path").id();

        tree.process(root, &item(&["triaged", "bug", "feature"])).expect("handled");

        assert!(root_seen.borrow().is_empty());
        let seen = inner_seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].node, kind);
        assert_eq!(seen[0].predicates, vec!["bug", "feature"]);
        assert_eq!(tree.hit_count(bug), 0);
        assert_eq!(tree.hit_count(feature), 0);
        assert_eq!(tree.terminal_hit_count(kind), 0);
    }

    #[test]
    fn handler_is_inherited_from_ancestor() {
        let mut tree = DispatchTree::new();
        let root = tree.create(NodeOptions::default());
        let count = Rc::new(RefCell::new(0));
        {
            let count = Rc::clone(&count);
            tree.node(root).catch(move |_: &Ambiguity, _: &Item| *count.borrow_mut() += 1);
        }
        let mid = tree.node(root).otherwise().expect("otherwise").id();
        tree.node(mid).add_path(label("a")).expect("path");
        tree.node(mid).add_path(label("b")).expect("path");

        tree.process(root, &item(&["a", "b"])).expect("handled by root");
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn unhandled_ambiguity_is_an_error() {
        let mut tree = DispatchTree::new();
        let root = tree.create(NodeOptions::default());
        tree.node(root).add_path(label("a")).expect("path");
        tree.node(root).add_path(label("b")).expect("path");

        let err = tree.process(root, &item(&["a", "b"])).expect_err("must fail");
        match err {
            DispatchError::UnhandledAmbiguity(ambiguity) => {
                assert_eq!(ambiguity.node, root);
                assert_eq!(ambiguity.predicates, vec!["a", "b"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn otherwise_runs_instead_of_terminal_actions() {
        let mut tree = DispatchTree::new();
        let root = tree.create(NodeOptions::default());
        let (log, make) = recorder();
        tree.node(root).add_path(label("bug")).expect("path");
        tree.node(root).add_terminal_action(make("root-terminal"));
        let other = tree.node(root).otherwise().expect("otherwise").id();
        tree.node(other).add_terminal_action(make("other-terminal"));

        tree.process(root, &item(&[])).expect("process");

        assert_eq!(tree.terminal_hit_count(root), 0);
        assert_eq!(tree.terminal_hit_count(other), 1);
        assert_eq!(*log.borrow(), vec!["other-terminal"]);
    }

    #[test]
    fn terminal_actions_run_once_in_registration_order() {
        let mut tree: DispatchTree<Item> = DispatchTree::new();
        let root = tree.create(NodeOptions::default());
        let (log, make) = recorder();
        tree.node(root)
            .add_terminal_action(make("first"))
            .add_terminal_action(make("second"))
            .add_always_action(make("always"));

        tree.process(root, &item(&["anything"])).expect("process");

        assert_eq!(tree.terminal_hit_count(root), 1);
        assert_eq!(*log.borrow(), vec!["first", "second", "always"]);
    }

    #[test]
    fn otherwise_twice_fails_at_construction() {
        let mut tree: DispatchTree<Item> = DispatchTree::new();
        let root = tree.create(NodeOptions::default());
        tree.node(root).otherwise().expect("first otherwise");
        let err = tree.node(root).otherwise().err().expect("second otherwise must fail");
        assert!(matches!(err, DispatchError::DuplicateOtherwise { node } if node == root));
        assert_eq!(tree.hit_count(root), 0);
    }

    #[test]
    fn first_mode_takes_earliest_match_only() {
        let mut tree = DispatchTree::new();
        let root = tree.create(NodeOptions::mode(PathMode::First));
        let a = tree.node(root).add_path(label("a")).expect("path").id();
        let b = tree.node(root).add_path(label("b")).expect("path").id();

        tree.process(root, &item(&["b", "a"])).expect("process");

        assert_eq!(tree.hit_count(a), 1);
        assert_eq!(tree.hit_count(b), 0);
    }

    #[test]
    fn shared_node_counts_every_entry_path() {
        let mut tree = DispatchTree::new();
        let root = tree.create(NodeOptions::mode(PathMode::Multiple));
        let left = tree.node(root).add_path(label("x")).expect("path").id();
        let right = tree.node(root).add_path(label("y")).expect("path").id();
        let shared = tree.create(NodeOptions::default());
        tree.node(left).add_path_to(label("z"), shared).expect("edge");
        tree.node(right).add_path_to(label("z"), shared).expect("edge");

        tree.process(root, &item(&["x", "y", "z"])).expect("process");

        assert_eq!(tree.hit_count(shared), 2);
        assert_eq!(tree.terminal_hit_count(shared), 2);
        assert_eq!(tree.walk(root).len(), 4);
    }

    #[test]
    fn grouping_predicate_treats_subtree_as_one_edge() {
        let mut tree = DispatchTree::new();
        let kinds = tree.create(NodeOptions::mode(PathMode::First));
        tree.node(kinds).describe("kinds");
        let bug = tree.node(kinds).add_path(label("bug")).expect("path").id();
        tree.node(kinds).add_path(label("feature")).expect("path");

        let root = tree.create(NodeOptions::default());
        tree.node(root).add_group(kinds).expect("group");
        let other = tree.node(root).otherwise().expect("otherwise").id();

        assert!(tree.matches_any(kinds, &item(&["feature"])));
        assert!(!tree.matches_any(kinds, &item(&["docs"])));
        assert_eq!(tree.edges(root).next().map(|(d, _)| d.to_string()), Some("any of kinds".to_string()));

        tree.process(root, &item(&["bug"])).expect("process");
        tree.process(root, &item(&["docs"])).expect("process");

        assert_eq!(tree.hit_count(kinds), 1);
        assert_eq!(tree.hit_count(bug), 1);
        assert_eq!(tree.hit_count(other), 1);
    }

    #[test]
    fn edges_closing_a_cycle_are_rejected() {
        let mut tree: DispatchTree<Item> = DispatchTree::new();
        let root = tree.create(NodeOptions::default());
        let child = tree.node(root).add_path(label("a")).expect("path").id();

        let err = tree.node(child).add_path_to(label("back"), root).err().expect("cycle");
        assert!(matches!(err, DispatchError::Cycle { .. }));
        let err = tree.node(root).add_path_to(label("self"), root).err().expect("self loop");
        assert!(matches!(err, DispatchError::Cycle { .. }));
        let grouping = tree.grouping_predicate(root);
        let err = tree.node(child).add_path(grouping).err().expect("group cycle");
        assert!(matches!(err, DispatchError::Cycle { .. }));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn always_actions_follow_descendants() {
        let mut tree = DispatchTree::new();
        let root = tree.create(NodeOptions::default());
        let (log, make) = recorder();
        tree.node(root).add_always_action(make("root"));
        tree.node(root)
            .add_path(label("a"))
            .expect("path")
            .add_always_action(make("child-always"))
            .add_terminal_action(make("child-terminal"));

        tree.process(root, &item(&["a"])).expect("process");

        assert_eq!(*log.borrow(), vec!["child-terminal", "child-always", "root"]);
    }

    #[test]
    fn bug_or_other_end_to_end() {
        let mut tree = DispatchTree::new();
        let root = tree.create(NodeOptions::default());
        let bug = tree.node(root).add_path(label("Bug")).expect("path").describe("Bug").id();
        let other = tree.node(root).otherwise().expect("otherwise").describe("Other").id();

        tree.process(root, &item(&["Bug"])).expect("bug");
        tree.process(root, &item(&[])).expect("empty");

        assert_eq!(tree.hit_count(root), 2);
        assert_eq!(tree.hit_count(bug), 1);
        assert_eq!(tree.hit_count(other), 1);
        assert_eq!(tree.terminal_hit_count(other), 1);

        let stats = tree.stats(root);
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[1].description.as_deref(), Some("Bug"));
    }
}
