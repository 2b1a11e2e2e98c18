//! The closed change taxonomy

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category label of one classified change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChangeCategory {
    /// A binding that was unknown stays unknown under a new initializer.
    #[serde(rename = "VarRebind-Top")]
    VarRebindTop,
    /// A binding becomes unknown.
    #[serde(rename = "VarRebind-ToTop")]
    VarRebindToTop,
    #[serde(rename = "VarRebind-Changed")]
    VarRebindChanged,
    #[serde(rename = "VarRebind-Unchanged")]
    VarRebindUnchanged,
    CallArgChanged,
    CallTargetChanged,
    ControlFlowRewrite,
    GuardInserted,
    GuardRemoved,
    ExceptionHandlingUnchanged,
    ExceptionHandlingChanged,
    DeadCodeInserted,
    DeadCodeRemoved,
    LogicChanged,
    DeclarationInserted,
    DeclarationRemoved,
    SignatureChanged,
    IdentifierRenamed,
    StatementMoved,
    PrototypeExtensionChanged,
    DependencyChanged,
    PotentialBug,
    Unclassified,
}

impl ChangeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeCategory::VarRebindTop => "VarRebind-Top",
            ChangeCategory::VarRebindToTop => "VarRebind-ToTop",
            ChangeCategory::VarRebindChanged => "VarRebind-Changed",
            ChangeCategory::VarRebindUnchanged => "VarRebind-Unchanged",
            ChangeCategory::CallArgChanged => "CallArgChanged",
            ChangeCategory::CallTargetChanged => "CallTargetChanged",
            ChangeCategory::ControlFlowRewrite => "ControlFlowRewrite",
            ChangeCategory::GuardInserted => "GuardInserted",
            ChangeCategory::GuardRemoved => "GuardRemoved",
            ChangeCategory::ExceptionHandlingUnchanged => "ExceptionHandlingUnchanged",
            ChangeCategory::ExceptionHandlingChanged => "ExceptionHandlingChanged",
            ChangeCategory::DeadCodeInserted => "DeadCodeInserted",
            ChangeCategory::DeadCodeRemoved => "DeadCodeRemoved",
            ChangeCategory::LogicChanged => "LogicChanged",
            ChangeCategory::DeclarationInserted => "DeclarationInserted",
            ChangeCategory::DeclarationRemoved => "DeclarationRemoved",
            ChangeCategory::SignatureChanged => "SignatureChanged",
            ChangeCategory::IdentifierRenamed => "IdentifierRenamed",
            ChangeCategory::StatementMoved => "StatementMoved",
            ChangeCategory::PrototypeExtensionChanged => "PrototypeExtensionChanged",
            ChangeCategory::DependencyChanged => "DependencyChanged",
            ChangeCategory::PotentialBug => "PotentialBug",
            ChangeCategory::Unclassified => "Unclassified",
        }
    }

    /// Categories an unresolved read never overrides.
    pub fn outranks_potential_bug(&self) -> bool {
        matches!(
            self,
            ChangeCategory::DeadCodeInserted
                | ChangeCategory::DeadCodeRemoved
                | ChangeCategory::StatementMoved
                | ChangeCategory::DeclarationInserted
                | ChangeCategory::DeclarationRemoved
        )
    }
}

impl fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a classification needed alias or points-to assumptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Certainty {
    Definite,
    Heuristic,
}

impl Certainty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Certainty::Definite => "definite",
            Certainty::Heuristic => "heuristic",
        }
    }

    /// The weaker of two certainties.
    pub fn weaker(self, other: Certainty) -> Certainty {
        if self == Certainty::Heuristic || other == Certainty::Heuristic {
            Certainty::Heuristic
        } else {
            Certainty::Definite
        }
    }
}

impl fmt::Display for Certainty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_match_display() {
        for category in [
            ChangeCategory::VarRebindTop,
            ChangeCategory::VarRebindToTop,
            ChangeCategory::CallArgChanged,
            ChangeCategory::Unclassified,
        ] {
            let json = serde_json::to_value(category).unwrap();
            assert_eq!(json, category.as_str());
        }
        assert_eq!(serde_json::to_value(Certainty::Heuristic).unwrap(), "heuristic");
    }
}
