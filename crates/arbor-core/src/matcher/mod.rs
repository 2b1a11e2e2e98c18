//! Tree matcher: hash anchors first, then top-down sibling alignment
//!
//! Phase 1 maps identical subtrees, largest first, ties going to the leftmost
//! then topmost candidate. Phase 2 walks matched parent pairs from the root and
//! aligns their unmatched children by exact-hash LCS, then by exact hash in any
//! order, then by similarity LCS. Leftovers become insertions and deletions.

pub mod budget;
pub mod lcs;

use std::cmp::Reverse;
use std::collections::{HashMap, VecDeque};

use crate::config::DiffOptions;
use crate::edit::{Alignment, MatchDiagnostics, MatchEdge, MatchKind};
use crate::hash::StructuralHash;
use crate::model::NodeKind;
use crate::tree::{CanonicalTree, TreeNodeId};

pub use budget::MatchBudget;
pub use lcs::lcs_pairs;

/// Align `old` against `new`. Never fails; an exhausted budget only makes the
/// result coarser.
pub fn match_trees(old: &CanonicalTree, new: &CanonicalTree, options: &DiffOptions) -> Alignment {
    let mut matcher = Matcher::new(old, new, options);
    if !old.is_empty() && !new.is_empty() {
        if options.line_mode {
            matcher.match_top_level();
        } else {
            matcher.match_anchors();
            matcher.refine();
        }
    }
    matcher.finish()
}

struct Matcher<'a> {
    old: &'a CanonicalTree,
    new: &'a CanonicalTree,
    options: &'a DiffOptions,
    budget: MatchBudget,
    old_to_new: Vec<Option<TreeNodeId>>,
    new_to_old: Vec<Option<TreeNodeId>>,
    anchor_root: Vec<bool>,
    anchors: u32,
    coarse_fallbacks: u32,
}

impl<'a> Matcher<'a> {
    fn new(old: &'a CanonicalTree, new: &'a CanonicalTree, options: &'a DiffOptions) -> Self {
        Matcher {
            old,
            new,
            options,
            budget: MatchBudget::from_options(options),
            old_to_new: vec![None; old.len()],
            new_to_old: vec![None; new.len()],
            anchor_root: vec![false; old.len()],
            anchors: 0,
            coarse_fallbacks: 0,
        }
    }

    fn is_old_matched(&self, id: TreeNodeId) -> bool {
        self.old_to_new[id.index()].is_some()
    }

    fn is_new_matched(&self, id: TreeNodeId) -> bool {
        self.new_to_old[id.index()].is_some()
    }

    fn link(&mut self, old: TreeNodeId, new: TreeNodeId) {
        self.old_to_new[old.index()] = Some(new);
        self.new_to_old[new.index()] = Some(old);
    }

    /// Map two isomorphic subtrees node by node.
    fn map_subtree(&mut self, old: TreeNodeId, new: TreeNodeId) {
        for offset in 0..self.old.size(old) {
            self.link(TreeNodeId(old.0 + offset), TreeNodeId(new.0 + offset));
        }
    }

    /// Same pre-order sequence of kinds and subtree sizes.
    fn isomorphic(&self, old: TreeNodeId, new: TreeNodeId) -> bool {
        let size = self.old.size(old);
        if size != self.new.size(new) {
            return false;
        }
        (0..size).all(|offset| {
            let (o, n) = (TreeNodeId(old.0 + offset), TreeNodeId(new.0 + offset));
            self.old.kind(o) == self.new.kind(n) && self.old.size(o) == self.new.size(n)
        })
    }

    fn identical(&self, old: TreeNodeId, new: TreeNodeId) -> bool {
        self.old.hash(old) == self.new.hash(new) && self.isomorphic(old, new)
    }

    // ── Phase 1: anchors ────────────────────────────────────

    fn match_anchors(&mut self) {
        let min = self.options.min_anchor_size;
        let mut candidates: HashMap<StructuralHash, (Vec<TreeNodeId>, usize)> = HashMap::new();
        for id in self.new.ids().skip(1) {
            if self.new.size(id) >= min {
                candidates.entry(self.new.hash(id)).or_default().0.push(id);
            }
        }

        let mut order: Vec<TreeNodeId> = self.old.ids().skip(1).filter(|id| self.old.size(*id) >= min).collect();
        order.sort_by_key(|id| (Reverse(self.old.size(*id)), *id));

        for old in order {
            if self.is_old_matched(old) {
                continue;
            }
            let Some((list, cursor)) = candidates.get_mut(&self.old.hash(old)) else {
                continue;
            };
            while *cursor < list.len() && self.new_to_old[list[*cursor].index()].is_some() {
                *cursor += 1;
            }
            let pick = list[*cursor..]
                .iter()
                .copied()
                .find(|n| self.new_to_old[n.index()].is_none() && self.isomorphic(old, *n));
            if let Some(new) = pick {
                self.map_subtree(old, new);
                self.anchor_root[old.index()] = true;
                self.anchors += 1;
            }
        }
        tracing::debug!(anchors = self.anchors, "anchor phase complete");
    }

    // ── Phase 2: top-down refinement ────────────────────────

    fn refine(&mut self) {
        let (old_root, new_root) = (self.old.root(), self.new.root());
        if !self.is_old_matched(old_root) && !self.is_new_matched(new_root) {
            self.link(old_root, new_root);
        }
        let mut queue = VecDeque::new();
        queue.push_back((old_root, new_root));
        while let Some((old, new)) = queue.pop_front() {
            self.align_children(old, new, &mut queue);
        }
    }

    fn unmatched_children(&self, old: TreeNodeId, new: TreeNodeId) -> (Vec<TreeNodeId>, Vec<TreeNodeId>) {
        let oc = self.old.children(old).iter().copied().filter(|c| !self.is_old_matched(*c)).collect();
        let nc = self.new.children(new).iter().copied().filter(|c| !self.is_new_matched(*c)).collect();
        (oc, nc)
    }

    fn align_children(&mut self, old: TreeNodeId, new: TreeNodeId, queue: &mut VecDeque<(TreeNodeId, TreeNodeId)>) {
        let (oc, nc) = self.unmatched_children(old, new);
        if oc.is_empty() || nc.is_empty() {
            return;
        }
        if !self.budget.admits_table(oc.len() * nc.len()) {
            self.coarse_fallbacks += 1;
            return;
        }

        // Identical subtrees in order.
        for (i, j) in lcs_pairs(&oc, &nc, |a, b| self.identical(*a, *b)) {
            self.map_subtree(oc[i], nc[j]);
        }

        // Identical subtrees that were reordered.
        let (oc, nc) = self.unmatched_children(old, new);
        for a in &oc {
            let pick = nc.iter().copied().find(|b| !self.is_new_matched(*b) && self.identical(*a, *b));
            if let Some(b) = pick {
                self.map_subtree(*a, b);
            }
        }

        // Similar subtrees in order; these recurse.
        let (oc, nc) = self.unmatched_children(old, new);
        if oc.is_empty() || nc.is_empty() {
            return;
        }
        let was_exhausted = self.budget.is_exhausted();
        let pairs = lcs_pairs(&oc, &nc, |a, b| self.similar(*a, *b));
        if self.budget.is_exhausted() && !was_exhausted {
            self.coarse_fallbacks += 1;
        }
        for (i, j) in pairs {
            self.link(oc[i], nc[j]);
            queue.push_back((oc[i], nc[j]));
        }
    }

    fn similar(&mut self, old: TreeNodeId, new: TreeNodeId) -> bool {
        if self.old.kind(old) != self.new.kind(new) {
            return false;
        }
        if self.old.node(old).shape == self.new.node(new).shape {
            return true;
        }
        if self.old.node(old).is_leaf() && self.new.node(new).is_leaf() {
            return true;
        }
        if let (Some(a), Some(b)) = (declared_names(self.old, old), declared_names(self.new, new)) {
            if a == b {
                return true;
            }
        }
        let cost = (self.old.size(old) + self.new.size(new)) as u64;
        if !self.budget.spend(cost) {
            return false;
        }
        dice(self.old, old, self.new, new) >= self.options.similarity_threshold
    }

    // ── Line mode ───────────────────────────────────────────

    fn match_top_level(&mut self) {
        let (old_root, new_root) = (self.old.root(), self.new.root());
        self.link(old_root, new_root);
        let (oc, nc) = self.unmatched_children(old_root, new_root);
        if !self.budget.admits_table(oc.len() * nc.len()) {
            self.coarse_fallbacks += 1;
            return;
        }
        for (i, j) in lcs_pairs(&oc, &nc, |a, b| self.identical(*a, *b)) {
            self.map_subtree(oc[i], nc[j]);
        }
    }

    // ── Edges ───────────────────────────────────────────────

    fn edge_kind(&self, old: TreeNodeId, new: TreeNodeId) -> (MatchKind, bool) {
        let label_changed = self.old.label(old) != self.new.label(new);
        if self.anchor_root[old.index()] {
            let old_parent = self.old.parent(old);
            let new_parent = self.new.parent(new);
            if let (Some(op), Some(np)) = (old_parent, new_parent) {
                if self.old_to_new[op.index()] != Some(np) {
                    return (MatchKind::Moved, label_changed);
                }
            }
        }
        let kind = if label_changed && matches!(self.old.kind(old), NodeKind::Identifier | NodeKind::PropertyName) {
            MatchKind::Renamed
        } else if !label_changed && self.old.hash(old) == self.new.hash(new) {
            MatchKind::Unchanged
        } else {
            MatchKind::Updated
        };
        (kind, label_changed)
    }

    fn finish(self) -> Alignment {
        let mut edges = Vec::with_capacity(self.old.len().max(self.new.len()));
        let mut old_edge = vec![0; self.old.len()];
        let mut new_edge = vec![0; self.new.len()];

        for old in self.old.ids() {
            old_edge[old.index()] = edges.len();
            match self.old_to_new[old.index()] {
                Some(new) => {
                    let (kind, label_changed) = self.edge_kind(old, new);
                    new_edge[new.index()] = edges.len();
                    edges.push(MatchEdge::matched(old, new, kind, label_changed));
                }
                None => edges.push(MatchEdge::deleted(old)),
            }
        }
        for new in self.new.ids() {
            if self.new_to_old[new.index()].is_none() {
                new_edge[new.index()] = edges.len();
                edges.push(MatchEdge::inserted(new));
            }
        }

        let diagnostics = MatchDiagnostics {
            anchors: self.anchors,
            coarse_fallbacks: self.coarse_fallbacks,
            budget_exceeded: self.budget.exceeded().cloned(),
        };
        tracing::debug!(
            edges = edges.len(),
            visits = self.budget.visits_used,
            fallbacks = self.coarse_fallbacks,
            "alignment complete"
        );
        Alignment {
            edges,
            old_to_new: self.old_to_new,
            new_to_old: self.new_to_old,
            old_edge,
            new_edge,
            diagnostics,
        }
    }
}

/// Names a declaration-like node introduces, used to pair edited declarations.
fn declared_names(tree: &CanonicalTree, id: TreeNodeId) -> Option<Vec<&str>> {
    match tree.kind(id) {
        NodeKind::Declaration => {
            let names: Vec<&str> = tree.children(id).iter().filter_map(|d| tree.declared_name(*d)).collect();
            (!names.is_empty()).then_some(names)
        }
        NodeKind::Property => {
            let key = tree.child(id, 0)?;
            tree.label(key).map(|k| vec![k])
        }
        _ => tree.declared_name(id).map(|n| vec![n]),
    }
}

/// Dice coefficient over the multisets of proper-descendant hashes.
fn dice(old: &CanonicalTree, a: TreeNodeId, new: &CanonicalTree, b: TreeNodeId) -> f64 {
    let total = (old.size(a) - 1) + (new.size(b) - 1);
    if total == 0 {
        return 1.0;
    }
    let mut counts: HashMap<StructuralHash, u32> = HashMap::new();
    for d in old.subtree(a).skip(1) {
        *counts.entry(old.hash(d)).or_default() += 1;
    }
    let mut common = 0u32;
    for d in new.subtree(b).skip(1) {
        if let Some(count) = counts.get_mut(&new.hash(d)) {
            if *count > 0 {
                *count -= 1;
                common += 1;
            }
        }
    }
    2.0 * common as f64 / total as f64
}
