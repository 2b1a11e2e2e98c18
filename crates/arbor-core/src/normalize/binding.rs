//! Binding classification: UNCHANGED / CHANGED / TOP per declaration site

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::DiffOptions;
use crate::model::{NodeKind, Span};
use crate::tree::{CanonicalTree, IdentRole, Resolution, TreeNodeId};

/// Whether a bound value is provably stable, provably fresh, or unknown
/// across versions. Ordered as a join semilattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BindingClass {
    Unchanged,
    Changed,
    Top,
}

impl BindingClass {
    pub fn join(self, other: BindingClass) -> BindingClass {
        self.max(other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BindingClass::Unchanged => "UNCHANGED",
            BindingClass::Changed => "CHANGED",
            BindingClass::Top => "TOP",
        }
    }
}

impl fmt::Display for BindingClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classification plus whether it holds without aliasing assumptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Binding {
    pub class: BindingClass,
    pub certain: bool,
}

impl Binding {
    pub const fn certain(class: BindingClass) -> Self {
        Binding { class, certain: true }
    }

    pub const fn assumed(class: BindingClass) -> Self {
        Binding { class, certain: false }
    }

    pub fn join(self, other: Binding) -> Binding {
        match self.class.cmp(&other.class) {
            std::cmp::Ordering::Less => other,
            std::cmp::Ordering::Greater => self,
            std::cmp::Ordering::Equal => Binding {
                class: self.class,
                certain: self.certain || other.certain,
            },
        }
    }
}

/// One declared name and its classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingSite {
    pub name: String,
    pub class: BindingClass,
    pub certain: bool,
    pub span: Span,
}

/// Every declaration site in document order.
pub fn binding_sites(tree: &CanonicalTree) -> Vec<BindingSite> {
    let mut sites = Vec::new();
    for node in tree.iter().filter(|n| n.kind == NodeKind::Declarator) {
        let Some(pattern) = node.children.first() else {
            continue;
        };
        for ident in tree.pattern_bindings(*pattern) {
            let ident_node = tree.node(ident);
            if let (Some(name), Some(binding)) = (ident_node.label(), ident_node.binding) {
                sites.push(BindingSite {
                    name: name.to_string(),
                    class: binding.class,
                    certain: binding.certain,
                    span: ident_node.span,
                });
            }
        }
    }
    sites
}

/// Declared names with their classes, in document order.
pub fn binding_classes(tree: &CanonicalTree) -> Vec<(String, BindingClass)> {
    binding_sites(tree).into_iter().map(|site| (site.name, site.class)).collect()
}

struct Classifier<'a> {
    tree: &'a CanonicalTree,
    options: &'a DiffOptions,
    known: HashMap<TreeNodeId, Binding>,
}

/// Annotate declarators, assignments and binding identifiers.
pub(crate) fn classify(tree: &mut CanonicalTree, options: &DiffOptions) {
    let updates = {
        let view: &CanonicalTree = tree;
        collect_bindings(view, options)
    };
    for (id, binding) in updates {
        tree.node_mut(id).binding = Some(binding);
    }
}

fn collect_bindings(tree: &CanonicalTree, options: &DiffOptions) -> Vec<(TreeNodeId, Binding)> {
    let mut updates = Vec::new();
    let mut classifier = Classifier { tree, options, known: HashMap::new() };
    classifier.seed_implicit_bindings();

    for id in tree.ids() {
        match tree.kind(id) {
            NodeKind::Declarator => {
                let binding = match tree.child(id, 1) {
                    Some(init) => classifier.eval(init),
                    None => Binding::certain(BindingClass::Changed),
                };
                updates.push((id, binding));
                if let Some(pattern) = tree.child(id, 0) {
                    for ident in tree.pattern_bindings(pattern) {
                        updates.push((ident, binding));
                        if let Some(target) = tree.node(ident).resolution.and_then(|r| r.binding()) {
                            classifier.known.insert(target, binding);
                        }
                    }
                }
            }
            NodeKind::Assignment | NodeKind::PrototypeExtension if tree.children(id).len() >= 2 => {
                let Some(value) = tree.children(id).last().copied() else {
                    continue;
                };
                let binding = classifier.eval(value);
                updates.push((id, binding));
                if let Some(target) = tree.child(id, 0) {
                    if let Some(Resolution::Local { binding: local, .. }) = tree.node(target).resolution {
                        classifier.known.insert(local, binding);
                    }
                }
            }
            _ => {}
        }
    }
    updates
}

impl Classifier<'_> {
    /// Parameters, catch parameters, imports, and declared functions get a
    /// class before any initializer is read.
    fn seed_implicit_bindings(&mut self) {
        let tree = self.tree;
        for node in tree.iter() {
            if node.kind != NodeKind::Identifier || node.role != Some(IdentRole::Binding) {
                continue;
            }
            let Some(parent) = node.parent else {
                continue;
            };
            let context = tree
                .ancestors(node.id)
                .find(|a| !matches!(
                    tree.kind(*a),
                    NodeKind::ObjectLiteral | NodeKind::ArrayLiteral | NodeKind::Property | NodeKind::Spread | NodeKind::Assignment
                ))
                .unwrap_or(parent);
            let binding = match tree.kind(context) {
                NodeKind::Parameters | NodeKind::Catch => Binding::assumed(BindingClass::Top),
                NodeKind::Import => Binding::certain(BindingClass::Top),
                NodeKind::FunctionDef | NodeKind::ClassDef => Binding::certain(BindingClass::Changed),
                _ => continue,
            };
            self.known.insert(node.id, binding);
        }
    }

    fn eval(&self, id: TreeNodeId) -> Binding {
        let node = self.tree.node(id);
        match node.kind {
            NodeKind::CallExpression => {
                let callee = self.tree.child(id, 0).map(|c| self.tree.dotted_text(c));
                let import = callee.as_deref().is_some_and(|name| self.options.is_import_function(name));
                Binding { class: BindingClass::Top, certain: import }
            }
            NodeKind::NewExpression | NodeKind::This => Binding::assumed(BindingClass::Top),
            NodeKind::FunctionDef | NodeKind::ClassDef | NodeKind::MethodDef => {
                Binding::certain(BindingClass::Changed)
            }
            NodeKind::Identifier => match node.resolution {
                Some(Resolution::Local { binding, .. }) => self
                    .known
                    .get(&binding)
                    .copied()
                    .unwrap_or(Binding::certain(BindingClass::Changed)),
                // Only module references are stable; other host values are fresh reads.
                Some(Resolution::Builtin) => match node.label() {
                    Some(name) if self.options.is_stable_global(name) => Binding::certain(BindingClass::Unchanged),
                    _ => Binding::certain(BindingClass::Changed),
                },
                _ => Binding::assumed(BindingClass::Top),
            },
            NodeKind::MemberAccess => match self.tree.child(id, 0) {
                Some(object) => self.eval(object),
                None => Binding::certain(BindingClass::Changed),
            },
            NodeKind::Index => {
                let object = self.tree.child(id, 0).map(|c| self.eval(c));
                let index = self.tree.child(id, 1);
                match (object, index) {
                    (Some(object), Some(index)) if self.tree.kind(index).is_literal() => object,
                    (Some(object), Some(index)) => object.join(self.eval(index)),
                    (Some(object), None) => object,
                    (None, _) => Binding::certain(BindingClass::Changed),
                }
            }
            NodeKind::Assignment | NodeKind::Sequence => match node.children.last() {
                Some(last) => self.eval(*last),
                None => Binding::certain(BindingClass::Changed),
            },
            kind if kind.is_literal() => Binding::certain(BindingClass::Changed),
            _ => node
                .children
                .iter()
                .filter(|c| self.tree.kind(**c) != NodeKind::PropertyName)
                .fold(Binding::certain(BindingClass::Changed), |acc, c| acc.join(self.eval(*c))),
        }
    }
}
