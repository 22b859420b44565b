//! Build a dispatch tree from a validated rule set.

use super::condition::compile;
use crate::config::{NodeSpec, RulesConfig};
use crate::dispatch::{Ambiguity, DispatchTree, NodeId, NodeOptions, Predicate};
use crate::domain::Issue;
use anyhow::{anyhow, bail, Result};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

/// An ambiguity recorded by a `catch` handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguityRecord {
    pub number: u64,
    pub node: String,
    pub predicates: Vec<String>,
}

/// Side effects collected while processing a batch.
#[derive(Debug, Default, Clone)]
pub struct Collector {
    pub buckets: BTreeMap<String, Vec<u64>>,
    pub ambiguities: Vec<AmbiguityRecord>,
}

pub struct BuiltTree {
    pub tree: DispatchTree<Issue>,
    pub root: NodeId,
    pub names: HashMap<String, NodeId>,
    pub collector: Rc<RefCell<Collector>>,
}

/// Build the tree described by `rules`. With `catch_all`, ambiguities that no
/// node catches are recorded at the root instead of aborting the run.
pub fn build_tree(rules: &RulesConfig, catch_all: bool) -> Result<BuiltTree> {
    let mut builder = Builder {
        rules,
        tree: DispatchTree::new(),
        names: HashMap::new(),
        in_progress: HashSet::new(),
        collector: Rc::new(RefCell::new(Collector::default())),
    };

    let root_spec = builder.spec(&rules.root)?;
    let root = builder.tree.create(NodeOptions::mode(root_spec.mode));
    builder.configure(root_spec, root)?;
    if catch_all && !root_spec.catch {
        builder.install_catch(root, root_spec.label().to_string());
    }

    tracing::debug!(nodes = builder.tree.len(), root = %rules.root, "built dispatch tree");
    Ok(BuiltTree {
        tree: builder.tree,
        root,
        names: builder.names,
        collector: builder.collector,
    })
}

struct Builder<'r> {
    rules: &'r RulesConfig,
    tree: DispatchTree<Issue>,
    names: HashMap<String, NodeId>,
    in_progress: HashSet<String>,
    collector: Rc<RefCell<Collector>>,
}

impl<'r> Builder<'r> {
    fn spec(&self, name: &str) -> Result<&'r NodeSpec> {
        self.rules.node(name).ok_or_else(|| anyhow!("undefined node '{name}'"))
    }

    /// Id of an already built node; building it detached when first seen.
    fn resolve(&mut self, name: &str) -> Result<NodeId> {
        if let Some(id) = self.existing(name)? {
            return Ok(id);
        }
        let spec = self.spec(name)?;
        let id = self.tree.create(NodeOptions::mode(spec.mode));
        self.configure(spec, id)?;
        Ok(id)
    }

    fn existing(&self, name: &str) -> Result<Option<NodeId>> {
        if self.in_progress.contains(name) {
            bail!("rules loop back into node '{name}'");
        }
        Ok(self.names.get(name).copied())
    }

    fn configure(&mut self, spec: &'r NodeSpec, id: NodeId) -> Result<()> {
        self.names.insert(spec.name.clone(), id);
        self.in_progress.insert(spec.name.clone());
        self.tree.node(id).describe(spec.label());

        if let Some(bucket) = spec.bucket.clone() {
            let action = self.bucket_action(bucket);
            self.tree.node(id).add_terminal_action(action);
        }
        if let Some(bucket) = spec.track.clone() {
            let action = self.bucket_action(bucket);
            self.tree.node(id).add_always_action(action);
        }
        if spec.catch {
            self.install_catch(id, spec.label().to_string());
        }

        for path in &spec.paths {
            let predicate = match &path.when.group {
                Some(group) => {
                    let group_id = self.resolve(group)?;
                    self.tree.grouping_predicate(group_id)
                }
                None => {
                    let test = compile(&path.when)?;
                    Predicate::new(path.when.to_string(), move |issue: &Issue| test(issue))
                }
            };

            match self.existing(&path.to)? {
                Some(target) => {
                    self.tree.node(id).add_path_to(predicate, target)?;
                }
                None => {
                    let target_spec = self.spec(&path.to)?;
                    let child = self
                        .tree
                        .node(id)
                        .add_path_with(predicate, NodeOptions::mode(target_spec.mode))?
                        .id();
                    self.configure(target_spec, child)?;
                }
            }
        }

        if let Some(fallback) = &spec.otherwise {
            if self.names.contains_key(fallback) {
                bail!("otherwise node '{fallback}' of '{}' is already wired elsewhere", spec.name);
            }
            let fallback_spec = self.spec(fallback)?;
            let child =
                self.tree.node(id).otherwise_with(NodeOptions::mode(fallback_spec.mode))?.id();
            self.configure(fallback_spec, child)?;
        }

        self.in_progress.remove(&spec.name);
        Ok(())
    }

    fn bucket_action(&self, bucket: String) -> impl FnMut(&Issue) + 'static {
        let collector = Rc::clone(&self.collector);
        move |issue: &Issue| {
            collector.borrow_mut().buckets.entry(bucket.clone()).or_default().push(issue.number);
        }
    }

    fn install_catch(&mut self, id: NodeId, node_label: String) {
        let collector = Rc::clone(&self.collector);
        self.tree.node(id).catch(move |ambiguity: &Ambiguity, issue: &Issue| {
            tracing::warn!(number = issue.number, "ambiguous classification at {ambiguity}");
            collector.borrow_mut().ambiguities.push(AmbiguityRecord {
                number: issue.number,
                node: ambiguity.description.clone().unwrap_or_else(|| node_label.clone()),
                predicates: ambiguity.predicates.clone(),
            });
        });
    }
}
