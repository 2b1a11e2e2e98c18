//! Single-pass lexical scope walk
//!
//! Resolves every identifier against a stack of scopes keyed by name. Function
//! scopes receive hoisted `var` and function declarations; block scopes receive
//! `let`, `const`, classes and catch parameters.

use std::collections::HashMap;

use crate::config::DiffOptions;
use crate::model::NodeKind;
use crate::tree::{CanonicalTree, IdentRole, Resolution, TreeNodeId};

#[derive(Debug)]
struct Scope {
    program: bool,
    names: HashMap<String, (TreeNodeId, u32)>,
}

impl Scope {
    fn new(program: bool) -> Self {
        Scope { program, names: HashMap::new() }
    }
}

struct ScopeWalker<'a> {
    tree: &'a mut CanonicalTree,
    options: &'a DiffOptions,
    stack: Vec<Scope>,
}

/// Assign roles and resolutions to every identifier in `tree`.
pub(crate) fn resolve(tree: &mut CanonicalTree, options: &DiffOptions) {
    if tree.is_empty() {
        return;
    }
    let root = tree.root();
    let mut walker = ScopeWalker { tree, options, stack: Vec::new() };
    walker.visit(root);
}

impl ScopeWalker<'_> {
    fn visit(&mut self, id: TreeNodeId) {
        match self.tree.kind(id) {
            NodeKind::Program => {
                self.stack.push(Scope::new(true));
                self.hoist_vars(id);
                self.hoist_lexical(id);
                self.visit_children(id);
                self.stack.pop();
            }
            NodeKind::FunctionDef | NodeKind::MethodDef => self.visit_function(id),
            NodeKind::ClassDef => self.visit_class(id),
            NodeKind::Block | NodeKind::Loop => {
                self.stack.push(Scope::new(false));
                self.hoist_lexical(id);
                self.visit_children(id);
                self.stack.pop();
            }
            NodeKind::Switch => {
                self.stack.push(Scope::new(false));
                let cases: Vec<TreeNodeId> = self.tree.children(id).to_vec();
                for case in cases {
                    if self.tree.kind(case) == NodeKind::Case {
                        self.hoist_lexical(case);
                    }
                }
                self.visit_children(id);
                self.stack.pop();
            }
            NodeKind::Catch => {
                self.stack.push(Scope::new(false));
                if let Some(param) = self.tree.child(id, 0) {
                    if self.tree.kind(param) != NodeKind::Block {
                        self.declare_pattern(param);
                    }
                }
                self.visit_children(id);
                self.stack.pop();
            }
            NodeKind::Declarator => {
                if let Some(pattern) = self.tree.child(id, 0) {
                    self.bind_pattern(pattern);
                }
                self.visit_children(id);
            }
            NodeKind::Import => {
                for ident in self.identifiers_in(id) {
                    self.bind_existing(ident);
                }
            }
            NodeKind::Identifier => self.resolve_use(id),
            NodeKind::PropertyName => {}
            _ => self.visit_children(id),
        }
    }

    fn visit_children(&mut self, id: TreeNodeId) {
        let children = self.tree.children(id).to_vec();
        for child in children {
            self.visit(child);
        }
    }

    fn visit_function(&mut self, id: TreeNodeId) {
        let children = self.tree.children(id).to_vec();
        let named = children
            .first()
            .is_some_and(|c| matches!(self.tree.kind(*c), NodeKind::Identifier | NodeKind::PropertyName));
        let mut scopes = 0;

        if named && self.tree.kind(id) == NodeKind::FunctionDef {
            let name = children[0];
            if self.tree.in_statement_position(id) {
                self.bind_existing(name);
            } else {
                // A named function expression sees its own name.
                self.stack.push(Scope::new(false));
                scopes += 1;
                self.declare(name);
                self.mark_binding(name);
            }
        }

        self.stack.push(Scope::new(false));
        scopes += 1;
        let rest = if named { &children[1..] } else { &children[..] };
        for child in rest {
            if self.tree.kind(*child) == NodeKind::Parameters {
                self.declare_pattern(*child);
            }
        }
        for child in rest {
            if self.tree.kind(*child) == NodeKind::Block {
                self.hoist_vars(*child);
            }
        }
        for child in rest {
            self.visit(*child);
        }
        for _ in 0..scopes {
            self.stack.pop();
        }
    }

    fn visit_class(&mut self, id: TreeNodeId) {
        let children = self.tree.children(id).to_vec();
        let mut rest = &children[..];
        if let Some(first) = children.first() {
            if self.tree.kind(*first) == NodeKind::Identifier {
                if self.tree.in_statement_position(id) {
                    self.bind_existing(*first);
                } else {
                    self.mark_binding(*first);
                }
                rest = &children[1..];
            }
        }
        for child in rest {
            self.visit(*child);
        }
    }

    /// Declare `var` bindings and function declarations in the current
    /// function scope, without entering nested functions or classes.
    fn hoist_vars(&mut self, root: TreeNodeId) {
        let children = self.tree.children(root).to_vec();
        for child in children {
            match self.tree.kind(child) {
                NodeKind::Declaration if self.tree.label(child) == Some("var") => {
                    for declarator in self.tree.children(child).to_vec() {
                        if let Some(pattern) = self.tree.child(declarator, 0) {
                            self.declare_pattern(pattern);
                        }
                    }
                    for declarator in self.tree.children(child).to_vec() {
                        self.hoist_vars(declarator);
                    }
                }
                NodeKind::FunctionDef => {
                    if self.tree.in_statement_position(child) {
                        if let Some(name) = self.tree.child(child, 0) {
                            if self.tree.kind(name) == NodeKind::Identifier {
                                self.declare(name);
                            }
                        }
                    }
                }
                NodeKind::MethodDef | NodeKind::ClassDef => {}
                _ => self.hoist_vars(child),
            }
        }
    }

    /// Declare block-scoped names found directly in `block`.
    fn hoist_lexical(&mut self, block: TreeNodeId) {
        let children = self.tree.children(block).to_vec();
        for child in children {
            match self.tree.kind(child) {
                NodeKind::Declaration if self.tree.label(child) != Some("var") => {
                    for declarator in self.tree.children(child).to_vec() {
                        if let Some(pattern) = self.tree.child(declarator, 0) {
                            self.declare_pattern(pattern);
                        }
                    }
                }
                NodeKind::ClassDef => {
                    if let Some(name) = self.tree.child(child, 0) {
                        if self.tree.kind(name) == NodeKind::Identifier {
                            self.declare(name);
                        }
                    }
                }
                NodeKind::Import => {
                    for ident in self.identifiers_in(child) {
                        self.declare(ident);
                    }
                }
                NodeKind::Export => self.hoist_lexical(child),
                _ => {}
            }
        }
    }

    fn identifiers_in(&self, id: TreeNodeId) -> Vec<TreeNodeId> {
        self.tree
            .subtree(id)
            .filter(|i| self.tree.kind(*i) == NodeKind::Identifier)
            .collect()
    }

    fn declare_pattern(&mut self, pattern: TreeNodeId) {
        for ident in self.tree.pattern_bindings(pattern) {
            self.declare(ident);
            self.mark_binding(ident);
        }
    }

    fn bind_pattern(&mut self, pattern: TreeNodeId) {
        for ident in self.tree.pattern_bindings(pattern) {
            self.bind_existing(ident);
        }
    }

    /// Mark a declaration site, declaring it here if hoisting missed it.
    fn bind_existing(&mut self, ident: TreeNodeId) {
        let Some(name) = self.tree.label(ident).map(str::to_string) else {
            return;
        };
        if self.lookup(&name).is_none() {
            self.declare(ident);
        }
        self.mark_binding(ident);
    }

    fn declare(&mut self, ident: TreeNodeId) {
        let Some(name) = self.tree.label(ident).map(str::to_string) else {
            return;
        };
        if let Some(scope) = self.stack.last_mut() {
            let slot = scope.names.len() as u32;
            scope.names.entry(name).or_insert((ident, slot));
        }
    }

    fn mark_binding(&mut self, ident: TreeNodeId) {
        let resolution = self
            .tree
            .label(ident)
            .map(str::to_string)
            .and_then(|name| self.lookup(&name));
        let node = self.tree.node_mut(ident);
        node.role = Some(IdentRole::Binding);
        node.resolution = resolution;
    }

    fn resolve_use(&mut self, ident: TreeNodeId) {
        if self.tree.node(ident).role == Some(IdentRole::Binding) {
            return;
        }
        let name = self.tree.label(ident).unwrap_or_default().to_string();
        let resolution = match self.lookup(&name) {
            Some(local) => local,
            None if self.options.is_builtin(&name) => Resolution::Builtin,
            None => Resolution::Unresolved,
        };
        let node = self.tree.node_mut(ident);
        node.role = Some(IdentRole::Use);
        node.resolution = Some(resolution);
    }

    fn lookup(&self, name: &str) -> Option<Resolution> {
        self.stack.iter().rev().enumerate().find_map(|(hops, scope)| {
            scope.names.get(name).map(|(binding, slot)| Resolution::Local {
                binding: *binding,
                hops: hops as u32,
                slot: *slot,
                program: scope.program,
            })
        })
    }
}
