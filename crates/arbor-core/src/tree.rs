//! Canonical tree arena with pre-order node ids

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::hash::StructuralHash;
use crate::model::{NodeKind, Span, SyntaxNode};
use crate::normalize::binding::Binding;

/// Pre-order index of a node in its [`CanonicalTree`].
///
/// A subtree rooted at `id` occupies ids `id .. id + size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeNodeId(pub u32);

impl TreeNodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TreeNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether an identifier declares a name or reads one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentRole {
    Binding,
    Use,
}

/// What an identifier refers to after the scope walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Declared in an enclosing scope. `hops` counts scopes walked outward.
    Local { binding: TreeNodeId, hops: u32, slot: u32, program: bool },
    /// A configured host global.
    Builtin,
    Unresolved,
}

impl Resolution {
    pub fn binding(&self) -> Option<TreeNodeId> {
        match self {
            Resolution::Local { binding, .. } => Some(*binding),
            _ => None,
        }
    }
}

/// One node of a canonical tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: TreeNodeId,
    pub kind: NodeKind,
    pub label: Option<String>,
    pub span: Span,
    pub parent: Option<TreeNodeId>,
    pub children: Vec<TreeNodeId>,
    pub depth: u32,
    /// Nodes in this subtree, including itself.
    pub size: u32,
    pub hash: StructuralHash,
    pub shape: StructuralHash,
    pub role: Option<IdentRole>,
    pub resolution: Option<Resolution>,
    pub binding: Option<Binding>,
    /// Set on statement units by the use-def pass.
    pub live: Option<bool>,
}

impl TreeNode {
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Immutable, normalized syntax tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalTree {
    nodes: Vec<TreeNode>,
}

impl CanonicalTree {
    /// Flatten an owned syntax tree into pre-order. Hashes are left empty.
    pub fn from_syntax(root: SyntaxNode) -> Self {
        let mut nodes = Vec::with_capacity(root.size());
        flatten(root, None, 0, &mut nodes);
        CanonicalTree { nodes }
    }

    pub fn root(&self) -> TreeNodeId {
        TreeNodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: TreeNodeId) -> &TreeNode {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: TreeNodeId) -> &mut TreeNode {
        &mut self.nodes[id.index()]
    }

    pub fn kind(&self, id: TreeNodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn label(&self, id: TreeNodeId) -> Option<&str> {
        self.node(id).label()
    }

    pub fn children(&self, id: TreeNodeId) -> &[TreeNodeId] {
        &self.node(id).children
    }

    pub fn child(&self, id: TreeNodeId, index: usize) -> Option<TreeNodeId> {
        self.node(id).children.get(index).copied()
    }

    pub fn parent(&self, id: TreeNodeId) -> Option<TreeNodeId> {
        self.node(id).parent
    }

    pub fn hash(&self, id: TreeNodeId) -> StructuralHash {
        self.node(id).hash
    }

    pub fn size(&self, id: TreeNodeId) -> u32 {
        self.node(id).size
    }

    /// Iterate over all nodes in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = TreeNodeId> + '_ {
        (0..self.nodes.len() as u32).map(TreeNodeId)
    }

    /// Ids of the subtree rooted at `id`, in pre-order, including `id`.
    pub fn subtree(&self, id: TreeNodeId) -> impl Iterator<Item = TreeNodeId> {
        self.subtree_range(id).map(TreeNodeId)
    }

    pub fn subtree_range(&self, id: TreeNodeId) -> Range<u32> {
        id.0..id.0 + self.size(id)
    }

    /// Proper ancestors, nearest first.
    pub fn ancestors(&self, id: TreeNodeId) -> Ancestors<'_> {
        Ancestors { tree: self, next: self.parent(id) }
    }

    /// `id` itself, then its ancestors.
    pub fn ancestors_or_self(&self, id: TreeNodeId) -> Ancestors<'_> {
        Ancestors { tree: self, next: Some(id) }
    }

    pub fn is_ancestor(&self, ancestor: TreeNodeId, id: TreeNodeId) -> bool {
        ancestor != id && self.subtree_range(ancestor).contains(&id.0)
    }

    /// Position of `id` among its parent's children.
    pub fn child_index(&self, id: TreeNodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// The child of `ancestor` whose subtree contains `id`.
    pub fn slot_of(&self, ancestor: TreeNodeId, id: TreeNodeId) -> Option<(usize, TreeNodeId)> {
        self.children(ancestor)
            .iter()
            .enumerate()
            .find(|(_, c)| *c == &id || self.is_ancestor(**c, id))
            .map(|(i, c)| (i, *c))
    }

    /// Whether `id` sits directly in a statement list.
    pub fn in_statement_position(&self, id: TreeNodeId) -> bool {
        match self.parent(id) {
            Some(parent) => self.kind(parent).holds_statements(),
            None => false,
        }
    }

    pub fn is_statement(&self, id: TreeNodeId) -> bool {
        let kind = self.kind(id);
        kind.is_statement()
            || (matches!(kind, NodeKind::FunctionDef | NodeKind::ClassDef) && self.in_statement_position(id))
    }

    /// Name declared by a function, method, class or declarator.
    pub fn declared_name(&self, id: TreeNodeId) -> Option<&str> {
        let node = self.node(id);
        if !node.kind.is_named_declaration() {
            return None;
        }
        let first = *node.children.first()?;
        match self.kind(first) {
            NodeKind::Identifier | NodeKind::PropertyName => self.label(first),
            _ => None,
        }
    }

    /// Names a node contributes to its enclosing-declaration path.
    fn scope_name(&self, id: TreeNodeId) -> Option<String> {
        let kind = self.kind(id);
        if !matches!(kind, NodeKind::FunctionDef | NodeKind::MethodDef | NodeKind::ClassDef) {
            return None;
        }
        if let Some(name) = self.declared_name(id) {
            return Some(name.to_string());
        }
        // Anonymous function: borrow the name of whatever it is bound to.
        let parent = self.parent(id)?;
        match self.kind(parent) {
            NodeKind::Declarator | NodeKind::Property => {
                let first = self.child(parent, 0)?;
                self.label(first).map(str::to_string)
            }
            NodeKind::Assignment | NodeKind::PrototypeExtension => {
                let target = self.child(parent, 0)?;
                Some(self.dotted_text(target))
            }
            _ => Some("<anonymous>".to_string()),
        }
    }

    /// Dotted path of enclosing declarations of `id`, including `id` itself.
    pub fn enclosing_declaration(&self, id: TreeNodeId) -> Option<String> {
        let mut names: Vec<String> = self
            .ancestors_or_self(id)
            .filter_map(|a| self.scope_name(a))
            .collect();
        if names.is_empty() {
            return None;
        }
        names.reverse();
        Some(names.join("."))
    }

    /// Render a member chain such as `module.exports` from its labels.
    pub fn dotted_text(&self, id: TreeNodeId) -> String {
        match self.kind(id) {
            NodeKind::MemberAccess => self
                .children(id)
                .iter()
                .map(|c| self.dotted_text(*c))
                .collect::<Vec<_>>()
                .join("."),
            NodeKind::This => "this".to_string(),
            _ => self.label(id).unwrap_or("?").to_string(),
        }
    }

    /// Identifiers that a declaration pattern binds.
    pub fn pattern_bindings(&self, pattern: TreeNodeId) -> Vec<TreeNodeId> {
        let mut out = Vec::new();
        self.collect_pattern(pattern, &mut out);
        out
    }

    fn collect_pattern(&self, id: TreeNodeId, out: &mut Vec<TreeNodeId>) {
        match self.kind(id) {
            NodeKind::Identifier => out.push(id),
            NodeKind::ObjectLiteral | NodeKind::ArrayLiteral | NodeKind::Spread | NodeKind::Parameters => {
                for child in self.children(id) {
                    self.collect_pattern(*child, out);
                }
            }
            // `{ key: target }` binds the value side.
            NodeKind::Property => {
                if let Some(last) = self.children(id).last() {
                    self.collect_pattern(*last, out);
                }
            }
            // Defaults bind their left side only.
            NodeKind::Assignment => {
                if let Some(first) = self.child(id, 0) {
                    self.collect_pattern(first, out);
                }
            }
            _ => {}
        }
    }
}

/// Walks parent links upward.
pub struct Ancestors<'a> {
    tree: &'a CanonicalTree,
    next: Option<TreeNodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = TreeNodeId;

    fn next(&mut self) -> Option<TreeNodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

fn flatten(node: SyntaxNode, parent: Option<TreeNodeId>, depth: u32, out: &mut Vec<TreeNode>) -> TreeNodeId {
    let id = TreeNodeId(out.len() as u32);
    let SyntaxNode { kind, label, span, children } = node;
    out.push(TreeNode {
        id,
        kind,
        label,
        span,
        parent,
        children: Vec::with_capacity(children.len()),
        depth,
        size: 1,
        hash: StructuralHash::default(),
        shape: StructuralHash::default(),
        role: None,
        resolution: None,
        binding: None,
        live: None,
    });
    let mut child_ids = Vec::with_capacity(children.len());
    for child in children {
        child_ids.push(flatten(child, Some(id), depth + 1, out));
    }
    let size = out.len() as u32 - id.0;
    let entry = &mut out[id.index()];
    entry.children = child_ids;
    entry.size = size;
    id
}
