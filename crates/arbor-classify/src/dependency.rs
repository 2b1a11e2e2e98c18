//! Dependency annotations on the new version
//!
//! A data dependency ties a read to a changed definition of the binding it
//! reads, provided the definition's value is CHANGED or TOP. A control
//! dependency ties a statement to the changed condition of the branch or loop
//! that directly governs it. Both are reported next to the change records and
//! never alter a category.

use std::collections::HashMap;
use std::fmt;

use arbor_core::{Alignment, BindingClass, CanonicalTree, IdentRole, NodeKind, Resolution, Span, TreeNodeId};
use serde::{Deserialize, Serialize};

use crate::category::Certainty;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Data,
    Control,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Data => "data",
            DependencyKind::Control => "control",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A new-version node that is affected by a change made elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyRecord {
    pub kind: DependencyKind,
    /// The name read, for data dependencies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The dependent read or statement.
    pub span: Span,
    /// The changed definition or condition.
    pub source: Span,
    pub enclosing: Option<String>,
    pub certainty: Certainty,
}

/// Data and control dependencies of the new tree on changed code, ordered by
/// position of the dependent node.
pub fn dependencies(old: &CanonicalTree, new: &CanonicalTree, alignment: &Alignment) -> Vec<DependencyRecord> {
    let view = ChangeView { old, new, alignment };
    let mut found: Vec<(TreeNodeId, DependencyRecord)> = Vec::new();
    view.data_dependencies(&mut found);
    view.control_dependencies(&mut found);
    found.sort_by(|(a, ra), (b, rb)| a.cmp(b).then(ra.kind.cmp(&rb.kind)));
    tracing::debug!(dependencies = found.len(), "annotated dependencies");
    found.into_iter().map(|(_, record)| record).collect()
}

struct ChangeView<'a> {
    old: &'a CanonicalTree,
    new: &'a CanonicalTree,
    alignment: &'a Alignment,
}

impl ChangeView<'_> {
    /// Inserted, or different from its counterpart.
    fn is_changed(&self, id: TreeNodeId) -> bool {
        match self.alignment.counterpart_of_new(id) {
            Some(old) => self.old.hash(old) != self.new.hash(id),
            None => true,
        }
    }

    fn data_dependencies(&self, found: &mut Vec<(TreeNodeId, DependencyRecord)>) {
        let tree = self.new;
        let mut definitions: HashMap<TreeNodeId, Vec<TreeNodeId>> = HashMap::new();
        for id in tree.ids() {
            if !matches!(tree.kind(id), NodeKind::Declarator | NodeKind::Assignment) {
                continue;
            }
            let Some(binding) = tree.node(id).binding else {
                continue;
            };
            if binding.class == BindingClass::Unchanged || !self.is_changed(id) {
                continue;
            }
            for target in written_bindings(tree, id) {
                definitions.entry(target).or_default().push(id);
            }
        }
        if definitions.is_empty() {
            return;
        }

        for node in tree.iter() {
            if node.kind != NodeKind::Identifier || node.role != Some(IdentRole::Use) || is_overwritten(tree, node.id) {
                continue;
            }
            let Some(Resolution::Local { binding, .. }) = node.resolution else {
                continue;
            };
            let Some(sites) = definitions.get(&binding) else {
                continue;
            };
            // A definition reading its own binding sees the previous value.
            if sites.iter().any(|d| tree.is_ancestor(*d, node.id)) {
                continue;
            }
            let Some(site) = sites.iter().rev().find(|d| **d < node.id).or(sites.first()).copied() else {
                continue;
            };
            let Some(value) = tree.node(site).binding else {
                continue;
            };
            let certainty = if value.certain && value.class == BindingClass::Changed {
                Certainty::Definite
            } else {
                Certainty::Heuristic
            };
            found.push((
                node.id,
                DependencyRecord {
                    kind: DependencyKind::Data,
                    name: node.label().map(str::to_string),
                    span: node.span,
                    source: tree.node(site).span,
                    enclosing: tree.enclosing_declaration(node.id),
                    certainty,
                },
            ));
        }
    }

    fn control_dependencies(&self, found: &mut Vec<(TreeNodeId, DependencyRecord)>) {
        let tree = self.new;
        for id in tree.ids() {
            let Some((conditions, bodies)) = branch_parts(tree, id) else {
                continue;
            };
            let Some(condition) = conditions.into_iter().find(|c| self.is_changed(*c)) else {
                continue;
            };
            let source = tree.node(condition).span;
            for statement in bodies.into_iter().flat_map(|body| governed_statements(tree, body)) {
                found.push((
                    statement,
                    DependencyRecord {
                        kind: DependencyKind::Control,
                        name: None,
                        span: tree.node(statement).span,
                        source,
                        enclosing: tree.enclosing_declaration(statement),
                        certainty: Certainty::Definite,
                    },
                ));
            }
        }
    }
}

/// Local bindings a declarator or assignment writes.
fn written_bindings(tree: &CanonicalTree, id: TreeNodeId) -> Vec<TreeNodeId> {
    let Some(target) = tree.child(id, 0) else {
        return Vec::new();
    };
    let idents = match tree.kind(id) {
        NodeKind::Declarator => tree.pattern_bindings(target),
        _ if tree.kind(target) == NodeKind::Identifier => vec![target],
        _ => Vec::new(),
    };
    idents
        .into_iter()
        .filter_map(|ident| tree.node(ident).resolution.and_then(|r| r.binding()))
        .collect()
}

/// Left side of a plain `=`.
fn is_overwritten(tree: &CanonicalTree, id: TreeNodeId) -> bool {
    tree.parent(id).is_some_and(|p| {
        tree.kind(p) == NodeKind::Assignment && tree.label(p) == Some("=") && tree.child(p, 0) == Some(id)
    })
}

/// Condition children and governed children of a branch or loop.
fn branch_parts(tree: &CanonicalTree, id: TreeNodeId) -> Option<(Vec<TreeNodeId>, Vec<TreeNodeId>)> {
    let children = tree.children(id);
    match tree.kind(id) {
        NodeKind::Conditional | NodeKind::Switch => {
            let (condition, rest) = children.split_first()?;
            Some((vec![*condition], rest.to_vec()))
        }
        NodeKind::Loop => {
            let body = if tree.label(id) == Some("do") { 0 } else { children.len().checked_sub(1)? };
            let body_id = *children.get(body)?;
            let conditions = children.iter().copied().filter(|c| *c != body_id).collect();
            Some((conditions, vec![body_id]))
        }
        _ => None,
    }
}

/// The outermost statements under `root`, looking through blocks, cases
/// and else clauses.
fn governed_statements(tree: &CanonicalTree, root: TreeNodeId) -> Vec<TreeNodeId> {
    let mut statements = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if tree.is_statement(id) {
            statements.push(id);
        } else if tree.kind(id).holds_statements() {
            stack.extend(tree.children(id).iter().rev().copied());
        }
    }
    statements
}
