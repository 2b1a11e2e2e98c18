//! Use-def liveness over statement units
//!
//! A unit is a statement, except that declarations are split into their
//! declarators. Liveness starts at units with observable effects and flows to
//! the units that define what they read and to the units that contain them.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;

use crate::model::NodeKind;
use crate::tree::{CanonicalTree, IdentRole, Resolution, TreeNodeId};

/// Why liveness flows along an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// From a reading unit to a defining unit.
    Data,
    /// From a nested unit to its enclosing unit.
    Containment,
}

/// Dependency graph between statement units of one tree.
#[derive(Debug)]
pub struct UseDefGraph {
    graph: DiGraph<TreeNodeId, Flow>,
    index: HashMap<TreeNodeId, NodeIndex>,
    roots: Vec<TreeNodeId>,
}

impl UseDefGraph {
    pub fn build(tree: &CanonicalTree) -> Self {
        let units = unit_map(tree);
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        for id in tree.ids() {
            if units[id.index()] == Some(id) {
                index.insert(id, graph.add_node(id));
            }
        }

        let defs = definitions(tree, &units);
        for node in tree.iter() {
            if node.kind != NodeKind::Identifier || node.role != Some(IdentRole::Use) || is_plain_target(tree, node.id) {
                continue;
            }
            let (Some(user), Some(Resolution::Local { binding, .. })) = (units[node.id.index()], node.resolution) else {
                continue;
            };
            for def in defs.get(&binding).into_iter().flatten() {
                if *def != user {
                    graph.add_edge(index[&user], index[def], Flow::Data);
                }
            }
        }

        let mut roots = Vec::new();
        for (&unit, &ix) in &index {
            if let Some(container) = tree.parent(unit).and_then(|p| units[p.index()]) {
                graph.add_edge(ix, index[&container], Flow::Containment);
            }
            if has_effect(tree, unit, &units) {
                roots.push(unit);
            }
        }
        roots.sort();

        UseDefGraph { graph, index, roots }
    }

    /// Units with an observable effect of their own.
    pub fn roots(&self) -> &[TreeNodeId] {
        &self.roots
    }

    pub fn unit_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Every unit reachable from a root.
    pub fn live_units(&self) -> Vec<TreeNodeId> {
        let mut seen = vec![false; self.graph.node_count()];
        for root in &self.roots {
            let mut dfs = Dfs::new(&self.graph, self.index[root]);
            while let Some(ix) = dfs.next(&self.graph) {
                seen[ix.index()] = true;
            }
        }
        let mut live: Vec<TreeNodeId> = self
            .graph
            .node_indices()
            .filter(|ix| seen[ix.index()])
            .map(|ix| self.graph[ix])
            .collect();
        live.sort();
        live
    }
}

/// Set `live` on every unit and on every declaration.
pub(crate) fn compute_liveness(tree: &mut CanonicalTree) {
    let (units, live) = {
        let view: &CanonicalTree = tree;
        let graph = UseDefGraph::build(view);
        let units: Vec<TreeNodeId> = view.ids().filter(|id| is_unit(view, *id)).collect();
        (units, graph.live_units())
    };
    for unit in &units {
        tree.node_mut(*unit).live = Some(live.binary_search(unit).is_ok());
    }
    let declarations: Vec<TreeNodeId> = tree.ids().filter(|id| tree.kind(*id) == NodeKind::Declaration).collect();
    for declaration in declarations {
        let any_live = tree
            .children(declaration)
            .iter()
            .any(|d| tree.node(*d).live.unwrap_or(true));
        tree.node_mut(declaration).live = Some(any_live);
    }
}

fn is_unit(tree: &CanonicalTree, id: TreeNodeId) -> bool {
    match tree.kind(id) {
        NodeKind::Declaration => false,
        NodeKind::Declarator => tree.parent(id).is_some_and(|p| tree.kind(p) == NodeKind::Declaration),
        _ => tree.is_statement(id),
    }
}

/// Nearest enclosing unit of every node, including the node itself.
fn unit_map(tree: &CanonicalTree) -> Vec<Option<TreeNodeId>> {
    let mut units: Vec<Option<TreeNodeId>> = vec![None; tree.len()];
    for id in tree.ids() {
        units[id.index()] = if is_unit(tree, id) {
            Some(id)
        } else {
            tree.parent(id).and_then(|p| units[p.index()])
        };
    }
    units
}

/// Binding id to the units that write it.
fn definitions(tree: &CanonicalTree, units: &[Option<TreeNodeId>]) -> HashMap<TreeNodeId, Vec<TreeNodeId>> {
    let mut defs: HashMap<TreeNodeId, Vec<TreeNodeId>> = HashMap::new();
    for node in tree.iter() {
        if node.kind != NodeKind::Identifier {
            continue;
        }
        let Some(Resolution::Local { binding, .. }) = node.resolution else {
            continue;
        };
        let writes = node.role == Some(IdentRole::Binding) || is_write_target(tree, node.id);
        if !writes {
            continue;
        }
        if let Some(unit) = units[node.id.index()] {
            let entry = defs.entry(binding).or_default();
            if !entry.contains(&unit) {
                entry.push(unit);
            }
        }
    }
    defs
}

/// Left side of an assignment or operand of `++`/`--`.
fn is_write_target(tree: &CanonicalTree, id: TreeNodeId) -> bool {
    match tree.parent(id) {
        Some(parent) => match tree.kind(parent) {
            NodeKind::Assignment => tree.child(parent, 0) == Some(id),
            NodeKind::UpdateOp => true,
            _ => false,
        },
        None => false,
    }
}

/// Left side of a plain `=`, which writes without reading.
fn is_plain_target(tree: &CanonicalTree, id: TreeNodeId) -> bool {
    tree.parent(id).is_some_and(|p| {
        tree.kind(p) == NodeKind::Assignment && tree.label(p) == Some("=") && tree.child(p, 0) == Some(id)
    })
}

/// Whether the unit itself, excluding nested units, has an observable effect.
fn has_effect(tree: &CanonicalTree, unit: TreeNodeId, units: &[Option<TreeNodeId>]) -> bool {
    match tree.kind(unit) {
        NodeKind::Return
        | NodeKind::Throw
        | NodeKind::Break
        | NodeKind::Continue
        | NodeKind::Import
        | NodeKind::Export => return true,
        _ => {}
    }
    tree.subtree(unit)
        .filter(|id| units[id.index()] == Some(unit))
        .any(|id| is_effect(tree, id))
}

fn is_effect(tree: &CanonicalTree, id: TreeNodeId) -> bool {
    let node = tree.node(id);
    match node.kind {
        NodeKind::CallExpression | NodeKind::NewExpression | NodeKind::PrototypeExtension => true,
        NodeKind::Assignment | NodeKind::UpdateOp => match node.children.first() {
            Some(target) => !writes_local(tree, *target),
            None => false,
        },
        NodeKind::UnaryOp => matches!(node.label(), Some("delete") | Some("await")),
        NodeKind::Other => matches!(
            node.label(),
            Some("await_expression") | Some("yield_expression") | Some("await") | Some("yield")
        ),
        _ => false,
    }
}

fn writes_local(tree: &CanonicalTree, target: TreeNodeId) -> bool {
    match tree.kind(target) {
        NodeKind::Identifier => matches!(tree.node(target).resolution, Some(Resolution::Local { .. })),
        NodeKind::ObjectLiteral | NodeKind::ArrayLiteral => tree
            .pattern_bindings(target)
            .iter()
            .all(|i| writes_local(tree, *i)),
        _ => false,
    }
}
