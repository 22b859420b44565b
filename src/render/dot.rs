//! Graphviz DOT export of a dispatch graph, including live hit counts.

use crate::dispatch::{DispatchTree, NodeId};
use std::collections::HashMap;

/// Render every node reachable from `root`.
///
/// Each distinct node is declared once. A node reached again through another
/// parent only gets the extra edge, so shared sub-trees are not duplicated.
pub fn render_dot<T>(tree: &DispatchTree<T>, root: NodeId) -> String {
    let mut writer = DotWriter { ids: HashMap::new(), lines: Vec::new() };
    writer.lines.push("digraph treeage {".to_string());
    writer.lines.push("    node [shape=box];".to_string());
    writer.assign(root);
    writer.visit(tree, root);
    writer.lines.push("}".to_string());
    format!("{}\n", writer.lines.join("\n"))
}

struct DotWriter {
    ids: HashMap<NodeId, String>,
    lines: Vec<String>,
}

impl DotWriter {
    /// Returns the generated id and whether it was newly assigned.
    fn assign(&mut self, id: NodeId) -> (String, bool) {
        if let Some(existing) = self.ids.get(&id) {
            return (existing.clone(), false);
        }
        let name = format!("n{}", self.ids.len());
        self.ids.insert(id, name.clone());
        (name, true)
    }

    fn visit<T>(&mut self, tree: &DispatchTree<T>, id: NodeId) {
        let name = self.ids[&id].clone();
        let title = match tree.description(id) {
            Some(description) => description.to_string(),
            None => id.to_string(),
        };
        self.lines.push(format!(
            "    {name} [label=\"{}\\n{} | hits={} terminal={}\"];",
            escape(&title),
            tree.mode(id),
            tree.hit_count(id),
            tree.terminal_hit_count(id),
        ));

        let edges: Vec<(String, NodeId)> =
            tree.edges(id).map(|(description, target)| (description.to_string(), target)).collect();
        for (description, target) in edges {
            let (child, fresh) = self.assign(target);
            self.lines.push(format!("    {name} -> {child} [label=\"{}\"];", escape(&description)));
            if fresh {
                self.visit(tree, target);
            }
        }

        if let Some(fallback) = tree.otherwise_of(id) {
            let (child, fresh) = self.assign(fallback);
            self.lines.push(format!("    {name} -> {child} [label=\"otherwise\", style=dashed];"));
            if fresh {
                self.visit(tree, fallback);
            }
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
