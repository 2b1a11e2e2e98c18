//! Change classification
//!
//! Every changed edge is attributed to its nearest owner node: a statement,
//! declarator, function, call, assignment or the program. Inserted and
//! deleted regions are attributed through their root only. The owner on each
//! side, the binding transition between them and the aspect of the owner that
//! changed are looked up in the rule table. Owners are keyed independently,
//! so the result does not depend on the order edges are visited in.

use std::collections::{BTreeMap, HashSet};

use arbor_core::{
    Alignment, CanonicalTree, IdentRole, MatchKind, NodeKind, Resolution, StructuralHash, TreeNodeId,
};

use crate::category::{Certainty, ChangeCategory};
use crate::report::ChangeRecord;
use crate::rules::{self, Aspect, RuleInput, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Old,
    New,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Inserted,
    Deleted,
    Moved,
    Renamed,
    Label,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct OwnerKey {
    old: Option<TreeNodeId>,
    new: Option<TreeNodeId>,
    aspect: Aspect,
}

/// Classify an alignment into change records, ordered by position in the
/// new tree.
pub fn classify(old: &CanonicalTree, new: &CanonicalTree, alignment: &Alignment) -> Vec<ChangeRecord> {
    let classifier = Classifier {
        old,
        new,
        alignment,
        old_unresolved: unresolved_names(old),
        findings: BTreeMap::new(),
    };
    let records = classifier.run();
    tracing::debug!(records = records.len(), "classified changes");
    records
}

struct Classifier<'a> {
    old: &'a CanonicalTree,
    new: &'a CanonicalTree,
    alignment: &'a Alignment,
    old_unresolved: HashSet<&'a str>,
    /// Changed nodes per owner key.
    findings: BTreeMap<OwnerKey, Vec<(Side, TreeNodeId)>>,
}

impl<'a> Classifier<'a> {
    fn run(mut self) -> Vec<ChangeRecord> {
        let alignment = self.alignment;
        for edge in &alignment.edges {
            match (edge.kind, edge.old, edge.new) {
                (MatchKind::Inserted, _, Some(new)) => self.region(Side::New, new, Trigger::Inserted),
                (MatchKind::Deleted, Some(old), _) => self.region(Side::Old, old, Trigger::Deleted),
                (MatchKind::Moved, _, Some(new)) => self.attribute(Side::New, new, Trigger::Moved),
                (MatchKind::Renamed, _, Some(new)) => self.attribute(Side::New, new, Trigger::Renamed),
                (MatchKind::Updated, _, Some(new)) if edge.label_changed => {
                    self.attribute(Side::New, new, Trigger::Label)
                }
                _ => {}
            }
        }
        self.try_handlers();

        let mut ordered: Vec<((u32, u32), ChangeRecord)> = self
            .findings
            .iter()
            .filter_map(|(key, regions)| Some((self.order_of(key), self.record(key, regions)?)))
            .collect();
        ordered.sort_by(|(a, ra), (b, rb)| a.cmp(b).then(ra.category.cmp(&rb.category)));
        ordered.into_iter().map(|(_, record)| record).collect()
    }

    fn tree(&self, side: Side) -> &'a CanonicalTree {
        match side {
            Side::Old => self.old,
            Side::New => self.new,
        }
    }

    fn counterpart(&self, side: Side, id: TreeNodeId) -> Option<TreeNodeId> {
        match side {
            Side::Old => self.alignment.counterpart_of_old(id),
            Side::New => self.alignment.counterpart_of_new(id),
        }
    }

    /// Only the root of an unmatched region is attributed.
    fn region(&mut self, side: Side, id: TreeNodeId, trigger: Trigger) {
        let tree = self.tree(side);
        let is_root = match tree.parent(id) {
            Some(parent) => self.counterpart(side, parent).is_some(),
            None => true,
        };
        if is_root {
            self.attribute(side, id, trigger);
        }
    }

    fn attribute(&mut self, side: Side, id: TreeNodeId, trigger: Trigger) {
        let tree = self.tree(side);
        let own = match trigger {
            Trigger::Inserted | Trigger::Deleted if reports_itself(tree, id) => {
                Some((id, placement_aspect(tree, id, trigger == Trigger::Inserted)))
            }
            Trigger::Moved if reports_itself(tree, id) => Some((id, Aspect::Moved)),
            Trigger::Label if is_owner(tree, id) => Some((id, Aspect::Label)),
            _ => None,
        };
        let (owner, aspect) = match own {
            Some(found) => found,
            None => {
                let Some(owner) = tree.ancestors(id).find(|a| is_owner(tree, *a)) else {
                    return;
                };
                // A change inside an unmatched owner belongs to that owner's region.
                if self.counterpart(side, owner).is_none() {
                    return;
                }
                (owner, slot_aspect(tree, owner, id))
            }
        };
        let counterpart = self.counterpart(side, owner);
        let key = match side {
            Side::Old => OwnerKey { old: Some(owner), new: counterpart, aspect },
            Side::New => OwnerKey { old: counterpart, new: Some(owner), aspect },
        };
        self.findings.entry(key).or_default().push((side, id));
    }

    /// Every changed `try` gets a handler aspect of its own.
    fn try_handlers(&mut self) {
        let alignment = self.alignment;
        for edge in &alignment.edges {
            let (Some(old), Some(new)) = (edge.old, edge.new) else {
                continue;
            };
            if self.old.kind(old) != NodeKind::Try
                || self.new.kind(new) != NodeKind::Try
                || self.old.hash(old) == self.new.hash(new)
            {
                continue;
            }
            let aspect = if handler_hashes(self.old, old) == handler_hashes(self.new, new) {
                Aspect::HandlerUnchanged
            } else {
                Aspect::HandlerChanged
            };
            self.findings
                .entry(OwnerKey { old: Some(old), new: Some(new), aspect })
                .or_default();
        }
    }

    fn record(&self, key: &OwnerKey, regions: &[(Side, TreeNodeId)]) -> Option<ChangeRecord> {
        let edge = match (key.new, key.old) {
            (Some(new), _) => *self.alignment.edge_for_new(new),
            (None, Some(old)) => *self.alignment.edge_for_old(old),
            (None, None) => return None,
        };
        let transition = match (key.old, key.new) {
            (Some(old), Some(new)) => self.old.node(old).binding.zip(self.new.node(new).binding),
            _ => None,
        };
        let input = RuleInput {
            old: key.old.map(|id| rule_kind(self.old, id)),
            new: key.new.map(|id| rule_kind(self.new, id)),
            transition,
            aspect: key.aspect,
        };
        let (mut category, mut certainty, mut note) = match rules::lookup(&input) {
            Verdict::Matched { category, certainty } => (category, certainty, None),
            Verdict::Unknown { note } => {
                tracing::debug!("unclassified change: {}", note);
                (ChangeCategory::Unclassified, Certainty::Heuristic, Some(note))
            }
        };
        if !category.outranks_potential_bug() {
            if let Some(name) = self.new_unresolved_read(regions) {
                category = ChangeCategory::PotentialBug;
                certainty = Certainty::Heuristic;
                note = Some(format!("reads unresolved `{}`", name));
            }
        }

        let (node_kind, enclosing) = match (key.new, key.old) {
            (Some(new), _) => (self.new.kind(new), self.new.enclosing_declaration(new)),
            (None, Some(old)) => (self.old.kind(old), self.old.enclosing_declaration(old)),
            (None, None) => return None,
        };
        Some(ChangeRecord {
            edge,
            category,
            certainty,
            node_kind,
            old_span: key.old.map(|id| self.old.node(id).span),
            new_span: key.new.map(|id| self.new.node(id).span),
            enclosing,
            note,
        })
    }

    /// An unresolved, non-callee name read in a changed new-side region that
    /// the old version never read unresolved.
    fn new_unresolved_read(&self, regions: &[(Side, TreeNodeId)]) -> Option<&'a str> {
        let tree = self.new;
        regions
            .iter()
            .filter(|(side, _)| *side == Side::New)
            .flat_map(|(_, root)| tree.subtree(*root))
            .filter(|id| is_unresolved_read(tree, *id) && !is_callee(tree, *id))
            .filter_map(|id| tree.label(id))
            .find(|name| !self.old_unresolved.contains(name))
    }

    /// Position in the new tree, then in the old tree.
    fn order_of(&self, key: &OwnerKey) -> (u32, u32) {
        let old_position = key.old.map_or(u32::MAX, |id| id.0);
        match (key.new, key.old) {
            (Some(new), _) => (new.0, old_position),
            (None, Some(old)) => (self.deletion_anchor(old), old_position),
            (None, None) => (u32::MAX, old_position),
        }
    }

    /// New position of the next matched sibling, or the end of the parent's
    /// counterpart.
    fn deletion_anchor(&self, old: TreeNodeId) -> u32 {
        let mut current = old;
        while let Some(parent) = self.old.parent(current) {
            let siblings = self.old.children(parent);
            let after = siblings.iter().position(|s| *s == current).map_or(siblings.len(), |i| i + 1);
            if let Some(next) = siblings[after..]
                .iter()
                .find_map(|s| self.alignment.counterpart_of_old(*s))
            {
                return next.0;
            }
            if let Some(counterpart) = self.alignment.counterpart_of_old(parent) {
                return self.new.subtree_range(counterpart).end;
            }
            current = parent;
        }
        self.new.len() as u32
    }
}

fn unresolved_names(tree: &CanonicalTree) -> HashSet<&str> {
    tree.ids()
        .filter(|id| is_unresolved_read(tree, *id))
        .filter_map(|id| tree.label(id))
        .collect()
}

fn is_unresolved_read(tree: &CanonicalTree, id: TreeNodeId) -> bool {
    let node = tree.node(id);
    node.kind == NodeKind::Identifier
        && node.role == Some(IdentRole::Use)
        && node.resolution == Some(Resolution::Unresolved)
}

fn is_callee(tree: &CanonicalTree, id: TreeNodeId) -> bool {
    let Some(parent) = tree.parent(id) else {
        return false;
    };
    matches!(tree.kind(parent), NodeKind::CallExpression | NodeKind::NewExpression) && tree.child(parent, 0) == Some(id)
}

fn is_owner(tree: &CanonicalTree, id: TreeNodeId) -> bool {
    tree.is_statement(id)
        || matches!(
            tree.kind(id),
            NodeKind::Declarator
                | NodeKind::FunctionDef
                | NodeKind::MethodDef
                | NodeKind::ClassDef
                | NodeKind::CallExpression
                | NodeKind::NewExpression
                | NodeKind::Assignment
                | NodeKind::PrototypeExtension
                | NodeKind::Program
        )
}

/// Inserted or deleted nodes that stand as a change of their own.
fn reports_itself(tree: &CanonicalTree, id: TreeNodeId) -> bool {
    tree.is_statement(id) || matches!(tree.kind(id), NodeKind::Declarator | NodeKind::MethodDef)
}

/// The kind a node is looked up under. A statement that only extends a
/// prototype is keyed as the extension.
fn rule_kind(tree: &CanonicalTree, id: TreeNodeId) -> NodeKind {
    let kind = tree.kind(id);
    if kind == NodeKind::ExpressionStatement {
        if let [only] = tree.children(id) {
            if tree.kind(*only) == NodeKind::PrototypeExtension {
                return NodeKind::PrototypeExtension;
            }
        }
    }
    kind
}

fn placement_aspect(tree: &CanonicalTree, id: TreeNodeId, inserted: bool) -> Aspect {
    match (is_guard(tree, id), is_dead(tree, id), inserted) {
        (true, _, true) => Aspect::GuardInserted,
        (true, _, false) => Aspect::GuardRemoved,
        (false, true, true) => Aspect::DeadInserted,
        (false, true, false) => Aspect::DeadRemoved,
        (false, false, true) => Aspect::Inserted,
        (false, false, false) => Aspect::Deleted,
    }
}

/// A conditional without an else branch whose consequence exits early.
pub fn is_guard(tree: &CanonicalTree, id: TreeNodeId) -> bool {
    if tree.kind(id) != NodeKind::Conditional {
        return false;
    }
    let children = tree.children(id);
    if children.iter().any(|c| tree.kind(*c) == NodeKind::ElseClause) {
        return false;
    }
    let Some(&consequence) = children.get(1) else {
        return false;
    };
    match tree.kind(consequence) {
        kind if kind.is_exit() => true,
        NodeKind::Block => tree
            .children(consequence)
            .last()
            .is_some_and(|last| tree.kind(*last).is_exit()),
        _ => false,
    }
}

/// A unit the use-def pass found unreachable from any effect. Named
/// functions and classes are declarations whatever their use.
fn is_dead(tree: &CanonicalTree, id: TreeNodeId) -> bool {
    let node = tree.node(id);
    !matches!(node.kind, NodeKind::FunctionDef | NodeKind::ClassDef | NodeKind::MethodDef) && node.live == Some(false)
}

/// Which part of `owner` the subtree holding `id` is.
fn slot_aspect(tree: &CanonicalTree, owner: TreeNodeId, id: TreeNodeId) -> Aspect {
    let Some((index, child)) = tree.slot_of(owner, id) else {
        return Aspect::Content;
    };
    let children = tree.children(owner);
    match tree.kind(owner) {
        NodeKind::CallExpression | NodeKind::NewExpression => {
            if index == 0 {
                Aspect::Callee
            } else {
                Aspect::Arguments
            }
        }
        NodeKind::Conditional | NodeKind::Switch => {
            if index == 0 {
                Aspect::Condition
            } else {
                Aspect::Body
            }
        }
        NodeKind::Loop => {
            let body = if tree.label(owner) == Some("do") { 0 } else { children.len() - 1 };
            if index == body {
                Aspect::Body
            } else {
                Aspect::Condition
            }
        }
        NodeKind::Declarator => {
            if index == 0 {
                Aspect::Renamed
            } else {
                Aspect::Initializer
            }
        }
        NodeKind::Assignment | NodeKind::PrototypeExtension => {
            if index == 0 {
                Aspect::Target
            } else {
                Aspect::Initializer
            }
        }
        NodeKind::FunctionDef | NodeKind::MethodDef | NodeKind::ClassDef => match tree.kind(child) {
            NodeKind::Identifier | NodeKind::PropertyName if index == 0 => Aspect::Renamed,
            NodeKind::Parameters => Aspect::Signature,
            NodeKind::Block => Aspect::Body,
            _ => Aspect::Content,
        },
        NodeKind::Try => match tree.kind(child) {
            NodeKind::Catch | NodeKind::Finally => Aspect::HandlerChanged,
            _ => Aspect::Body,
        },
        _ => Aspect::Content,
    }
}

fn handler_hashes(tree: &CanonicalTree, id: TreeNodeId) -> Vec<StructuralHash> {
    tree.children(id)
        .iter()
        .filter(|c| matches!(tree.kind(**c), NodeKind::Catch | NodeKind::Finally))
        .map(|c| tree.hash(*c))
        .collect()
}
