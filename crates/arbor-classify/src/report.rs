//! Report schema, ordering, declaration grouping and output formats

use std::fmt::Write as _;
use std::path::PathBuf;
use std::str::FromStr;

use arbor_core::{
    Alignment, EditStats, Language, MatchEdge, MatcherBudgetExceeded, NodeKind, ParseError, ParseStatus,
    SourceUnit, Span,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::category::{Certainty, ChangeCategory};
use crate::dependency::DependencyRecord;

pub const SCHEMA_VERSION: u32 = 1;

/// One classified difference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub edge: MatchEdge,
    pub category: ChangeCategory,
    pub certainty: Certainty,
    pub node_kind: NodeKind,
    pub old_span: Option<Span>,
    pub new_span: Option<Span>,
    /// Dotted path of enclosing declarations, `None` at top level.
    pub enclosing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ChangeRecord {
    pub fn span(&self) -> Option<Span> {
        self.new_span.or(self.old_span)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub path: Option<PathBuf>,
    pub status: ParseStatus,
    pub errors: Vec<ParseError>,
}

impl SourceSummary {
    pub fn of(unit: &SourceUnit) -> Self {
        SourceSummary { path: unit.path.clone(), status: unit.status(), errors: unit.errors.clone() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportDiagnostics {
    pub anchors: u32,
    pub coarse_fallbacks: u32,
    pub budget_exceeded: Option<MatcherBudgetExceeded>,
    pub unclassified: u32,
}

/// The structured result of one diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub schema_version: u32,
    pub language: Language,
    pub old: SourceSummary,
    pub new: SourceSummary,
    pub unparseable: bool,
    pub error: Option<ParseError>,
    pub changes: Vec<ChangeRecord>,
    /// Reads and statements of the new version that depend on changed code.
    #[serde(default)]
    pub dependencies: Vec<DependencyRecord>,
    pub stats: EditStats,
    pub diagnostics: ReportDiagnostics,
}

impl Report {
    pub fn new(
        old: &SourceUnit,
        new: &SourceUnit,
        alignment: &Alignment,
        changes: Vec<ChangeRecord>,
        dependencies: Vec<DependencyRecord>,
    ) -> Self {
        let unclassified = changes
            .iter()
            .filter(|c| c.category == ChangeCategory::Unclassified)
            .count() as u32;
        let diagnostics = ReportDiagnostics {
            anchors: alignment.diagnostics.anchors,
            coarse_fallbacks: alignment.diagnostics.coarse_fallbacks,
            budget_exceeded: alignment.diagnostics.budget_exceeded.clone(),
            unclassified,
        };
        Report {
            schema_version: SCHEMA_VERSION,
            language: new.language,
            old: SourceSummary::of(old),
            new: SourceSummary::of(new),
            unparseable: false,
            error: None,
            changes,
            dependencies,
            stats: alignment.stats(),
            diagnostics,
        }
    }

    /// A report for inputs that produced no tree.
    pub fn unparseable(old: &SourceUnit, new: &SourceUnit) -> Self {
        let error = [old, new]
            .into_iter()
            .find(|unit| !unit.is_parseable())
            .and_then(|unit| unit.first_error().cloned());
        Report {
            schema_version: SCHEMA_VERSION,
            language: new.language,
            old: SourceSummary::of(old),
            new: SourceSummary::of(new),
            unparseable: true,
            error,
            changes: Vec::new(),
            dependencies: Vec::new(),
            stats: EditStats::default(),
            diagnostics: ReportDiagnostics::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn count(&self, category: ChangeCategory) -> usize {
        self.changes.iter().filter(|c| c.category == category).count()
    }

    /// Runs of consecutive records that share an enclosing declaration.
    /// Every call starts from the first record.
    pub fn groups(&self) -> DeclarationGroups<'_> {
        DeclarationGroups { records: &self.changes }
    }

    pub fn render(&self, format: OutputFormat) -> Result<String, RenderError> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(self)?),
            OutputFormat::Text => Ok(self.to_text()),
        }
    }

    fn to_text(&self) -> String {
        let mut out = String::new();
        let old = display_path(&self.old.path);
        let new = display_path(&self.new.path);
        let _ = writeln!(out, "{} -> {} ({})", old, new, self.language);
        if self.unparseable {
            match &self.error {
                Some(error) => {
                    let _ = writeln!(out, "unparseable: {}", error);
                }
                None => out.push_str("unparseable\n"),
            }
            return out;
        }
        for record in &self.changes {
            let location = record.span().map(position).unwrap_or_else(|| "-".to_string());
            let _ = write!(
                out,
                "{:<8} {:<28} {:<9} {:<18} {}",
                location,
                record.category.as_str(),
                record.certainty.as_str(),
                record.node_kind.as_str(),
                record.enclosing.as_deref().unwrap_or("-"),
            );
            if let Some(note) = &record.note {
                let _ = write!(out, "  ({})", note);
            }
            out.push('\n');
        }
        for dependency in &self.dependencies {
            let _ = write!(
                out,
                "{:<8} {:<28} {:<9} on {:<15} {}",
                position(dependency.span),
                format!("{} dependency", dependency.kind),
                dependency.certainty.as_str(),
                position(dependency.source),
                dependency.enclosing.as_deref().unwrap_or("-"),
            );
            if let Some(name) = &dependency.name {
                let _ = write!(out, "  (reads `{}`)", name);
            }
            out.push('\n');
        }
        let _ = writeln!(
            out,
            "{} changes, {} dependencies; {} edges changed of {}",
            self.changes.len(),
            self.dependencies.len(),
            self.stats.changes(),
            self.stats.changes() + self.stats.unchanged
        );
        if let Some(exceeded) = &self.diagnostics.budget_exceeded {
            let _ = writeln!(out, "warning: {}", exceeded);
        }
        out
    }
}

fn position(span: Span) -> String {
    format!("{}:{}", span.start_line, span.start_column)
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<input>".to_string())
}

/// Records sharing one enclosing declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeclarationGroup<'a> {
    pub enclosing: Option<&'a str>,
    pub records: &'a [ChangeRecord],
}

/// Lazy iterator over [`DeclarationGroup`]s.
#[derive(Debug, Clone)]
pub struct DeclarationGroups<'a> {
    records: &'a [ChangeRecord],
}

impl<'a> Iterator for DeclarationGroups<'a> {
    type Item = DeclarationGroup<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.records.first()?;
        let enclosing = first.enclosing.as_deref();
        let len = self
            .records
            .iter()
            .position(|r| r.enclosing.as_deref() != enclosing)
            .unwrap_or(self.records.len());
        let (group, rest) = self.records.split_at(len);
        self.records = rest;
        Some(DeclarationGroup { enclosing, records: group })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Text,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "text" | "txt" => Ok(OutputFormat::Text),
            other => Err(format!("unknown format `{}` (expected json, yaml or text)", other)),
        }
    }
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
