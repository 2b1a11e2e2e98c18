//! Match edges and the alignment produced by the tree matcher

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MatcherBudgetExceeded;
use crate::tree::TreeNodeId;

/// How a node relates to its counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Unchanged,
    Renamed,
    Updated,
    Moved,
    Inserted,
    Deleted,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Unchanged => "unchanged",
            MatchKind::Renamed => "renamed",
            MatchKind::Updated => "updated",
            MatchKind::Moved => "moved",
            MatchKind::Inserted => "inserted",
            MatchKind::Deleted => "deleted",
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relation between an old node and a new node. One side is absent for
/// insertions and deletions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchEdge {
    pub old: Option<TreeNodeId>,
    pub new: Option<TreeNodeId>,
    pub kind: MatchKind,
    /// The node's own label differs, independent of its children.
    pub label_changed: bool,
}

impl MatchEdge {
    pub fn matched(old: TreeNodeId, new: TreeNodeId, kind: MatchKind, label_changed: bool) -> Self {
        MatchEdge { old: Some(old), new: Some(new), kind, label_changed }
    }

    pub fn inserted(new: TreeNodeId) -> Self {
        MatchEdge { old: None, new: Some(new), kind: MatchKind::Inserted, label_changed: false }
    }

    pub fn deleted(old: TreeNodeId) -> Self {
        MatchEdge { old: Some(old), new: None, kind: MatchKind::Deleted, label_changed: false }
    }

    pub fn is_change(&self) -> bool {
        self.kind != MatchKind::Unchanged
    }
}

/// Edge counts per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditStats {
    pub unchanged: u32,
    pub renamed: u32,
    pub updated: u32,
    pub moved: u32,
    pub inserted: u32,
    pub deleted: u32,
}

impl EditStats {
    pub fn record(&mut self, kind: MatchKind) {
        match kind {
            MatchKind::Unchanged => self.unchanged += 1,
            MatchKind::Renamed => self.renamed += 1,
            MatchKind::Updated => self.updated += 1,
            MatchKind::Moved => self.moved += 1,
            MatchKind::Inserted => self.inserted += 1,
            MatchKind::Deleted => self.deleted += 1,
        }
    }

    pub fn changes(&self) -> u32 {
        self.renamed + self.updated + self.moved + self.inserted + self.deleted
    }

    pub fn is_empty(&self) -> bool {
        self.changes() == 0
    }
}

/// Soft diagnostics from one matcher run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchDiagnostics {
    pub anchors: u32,
    pub coarse_fallbacks: u32,
    pub budget_exceeded: Option<MatcherBudgetExceeded>,
}

/// The complete alignment between two canonical trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alignment {
    pub edges: Vec<MatchEdge>,
    pub old_to_new: Vec<Option<TreeNodeId>>,
    pub new_to_old: Vec<Option<TreeNodeId>>,
    /// Edge index per old node.
    pub old_edge: Vec<usize>,
    /// Edge index per new node.
    pub new_edge: Vec<usize>,
    pub diagnostics: MatchDiagnostics,
}

impl Alignment {
    pub fn stats(&self) -> EditStats {
        let mut stats = EditStats::default();
        for edge in &self.edges {
            stats.record(edge.kind);
        }
        stats
    }

    pub fn edge_for_old(&self, id: TreeNodeId) -> &MatchEdge {
        &self.edges[self.old_edge[id.index()]]
    }

    pub fn edge_for_new(&self, id: TreeNodeId) -> &MatchEdge {
        &self.edges[self.new_edge[id.index()]]
    }

    pub fn counterpart_of_old(&self, id: TreeNodeId) -> Option<TreeNodeId> {
        self.old_to_new.get(id.index()).copied().flatten()
    }

    pub fn counterpart_of_new(&self, id: TreeNodeId) -> Option<TreeNodeId> {
        self.new_to_old.get(id.index()).copied().flatten()
    }

    /// Every node maps to itself and nothing changed.
    pub fn is_identity(&self) -> bool {
        self.old_to_new.len() == self.new_to_old.len()
            && self
                .old_to_new
                .iter()
                .enumerate()
                .all(|(i, n)| n.is_some_and(|n| n.index() == i))
            && self.edges.iter().all(|e| e.kind == MatchKind::Unchanged)
    }
}
