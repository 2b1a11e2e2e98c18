//! Arbor Core — syntax model, tree normalization and the tree matcher

pub mod config;
pub mod edit;
pub mod error;
pub mod hash;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod tree;

#[cfg(test)]
pub mod tests;

#[cfg(test)]
pub mod test_utils;

pub use config::{DiffOptions, CONFIG_FILE};
pub use edit::{Alignment, EditStats, MatchDiagnostics, MatchEdge, MatchKind};
pub use error::{BudgetLimit, ConfigError, MatcherBudgetExceeded, ParseError};
pub use hash::StructuralHash;
pub use matcher::{match_trees, MatchBudget};
pub use model::{Language, NodeKind, ParseStatus, SourceUnit, Span, SyntaxNode};
pub use normalize::usedef::UseDefGraph;
pub use normalize::{binding_classes, binding_sites, normalize, Binding, BindingClass, BindingSite};
pub use tree::{CanonicalTree, IdentRole, Resolution, TreeNode, TreeNodeId};
