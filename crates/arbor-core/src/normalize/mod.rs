//! Tree normalization: cosmetic collapse, scope resolution, binding
//! classification, structural hashing and use-def liveness

pub mod binding;
pub mod scope;
pub mod usedef;

use crate::config::DiffOptions;
use crate::hash::{LabelKey, StructuralHash};
use crate::model::{NodeKind, SyntaxNode};
use crate::tree::{CanonicalTree, Resolution};

pub use binding::{binding_classes, binding_sites, Binding, BindingClass, BindingSite};

/// Normalize a lowered syntax tree into a canonical tree.
pub fn normalize(root: SyntaxNode, options: &DiffOptions) -> CanonicalTree {
    let root = canonicalize(root);
    let mut tree = CanonicalTree::from_syntax(root);
    scope::resolve(&mut tree, options);
    binding::classify(&mut tree, options);
    compute_hashes(&mut tree, options.alpha_rename);
    usedef::compute_liveness(&mut tree);
    tracing::debug!(nodes = tree.len(), "normalized tree");
    tree
}

/// Syntax-level rewrites applied bottom-up before flattening.
pub fn canonicalize(mut node: SyntaxNode) -> SyntaxNode {
    let children = std::mem::take(&mut node.children);
    node.children = children
        .into_iter()
        .filter(|c| !c.kind.is_trivia())
        .map(canonicalize)
        .collect();

    match node.kind {
        NodeKind::StringLiteral => {
            if let Some(raw) = node.label.take() {
                node.label = Some(unquote(&raw));
            }
            node.children.clear();
            node
        }
        NodeKind::TemplateLiteral if node.children.iter().all(|c| c.kind == NodeKind::StringLiteral) => {
            let text: String = node.children.iter().filter_map(|c| c.label.as_deref()).collect();
            SyntaxNode::new(NodeKind::StringLiteral, node.span).with_label(text)
        }
        NodeKind::BinaryOp if node.label() == Some("+") && is_string_pair(&node.children) => {
            let text: String = node.children.iter().filter_map(|c| c.label.as_deref()).collect();
            SyntaxNode::new(NodeKind::StringLiteral, node.span).with_label(text)
        }
        NodeKind::Assignment if node.children.first().is_some_and(extends_prototype) => {
            node.kind = NodeKind::PrototypeExtension;
            node
        }
        _ => node,
    }
}

fn is_string_pair(children: &[SyntaxNode]) -> bool {
    children.len() == 2 && children.iter().all(|c| c.kind == NodeKind::StringLiteral)
}

/// `String.prototype.x` or `Foo.prototype` as an assignment target.
fn extends_prototype(target: &SyntaxNode) -> bool {
    let mut current = target;
    while current.kind == NodeKind::MemberAccess {
        if current.children.iter().any(|c| c.kind == NodeKind::PropertyName && c.label() == Some("prototype")) {
            return true;
        }
        match current.children.first() {
            Some(object) => current = object,
            None => return false,
        }
    }
    false
}

/// Strip quotes and string prefixes, decoding the common escapes.
pub fn unquote(raw: &str) -> String {
    let trimmed = raw.trim_start_matches(|c: char| matches!(c, 'r' | 'b' | 'u' | 'f' | 'R' | 'B' | 'U' | 'F'));
    let body = ["\"\"\"", "'''", "\"", "'", "`"]
        .iter()
        .find_map(|q| {
            trimmed
                .strip_prefix(q)
                .and_then(|rest| rest.strip_suffix(q))
        })
        .unwrap_or(raw);

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(q @ ('\\' | '\'' | '"' | '`')) => out.push(q),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Fill structural and shape hashes, children before parents.
fn compute_hashes(tree: &mut CanonicalTree, alpha_rename: bool) {
    let mut child_hashes = Vec::new();
    let mut child_shapes = Vec::new();
    for index in (0..tree.len() as u32).rev() {
        let id = crate::tree::TreeNodeId(index);
        child_hashes.clear();
        child_shapes.clear();
        for child in tree.children(id) {
            let node = tree.node(*child);
            child_hashes.push(node.hash);
            child_shapes.push(node.shape);
        }
        let node = tree.node(id);
        let key = match (node.kind, node.resolution, node.label()) {
            (NodeKind::Identifier, Some(Resolution::Local { hops, slot, program: false, .. }), _) if alpha_rename => {
                LabelKey::Local { hops, slot }
            }
            (_, _, Some(text)) => LabelKey::Text(text),
            (_, _, None) => LabelKey::None,
        };
        let hash = StructuralHash::compute(node.kind, key, &child_hashes);
        let shape = StructuralHash::shape(node.kind, &child_shapes);
        let node = tree.node_mut(id);
        node.hash = hash;
        node.shape = shape;
    }
}
