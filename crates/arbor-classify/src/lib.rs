//! Arbor Classify — change classification, reports and the diff pipeline

pub mod category;
pub mod classifier;
pub mod dependency;
pub mod engine;
pub mod report;
pub mod rules;

#[cfg(test)]
mod tests;

pub use category::{Certainty, ChangeCategory};
pub use classifier::classify;
pub use dependency::{dependencies, DependencyKind, DependencyRecord};
pub use engine::DiffEngine;
pub use report::{
    ChangeRecord, DeclarationGroup, DeclarationGroups, OutputFormat, RenderError, Report, ReportDiagnostics,
    SourceSummary, SCHEMA_VERSION,
};
pub use rules::{Aspect, Rule, RuleInput, Verdict, RULES};
