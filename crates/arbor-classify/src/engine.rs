//! The diff pipeline: parse, normalize, match, classify, report

use std::path::Path;
use std::time::Instant;

use arbor_core::{
    binding_sites, match_trees, normalize, BindingSite, CanonicalTree, ConfigError, DiffOptions, Language, SourceUnit,
};
use arbor_parser::{parse_file, parse_source};

use crate::classifier::classify;
use crate::dependency::dependencies;
use crate::report::Report;

/// Runs diffs under one validated set of options.
#[derive(Debug, Clone)]
pub struct DiffEngine {
    options: DiffOptions,
}

impl DiffEngine {
    pub fn new(options: DiffOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(DiffEngine { options })
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    pub fn diff_sources(&self, old: &str, new: &str, language: Language) -> Report {
        let old = parse_source(old, language);
        let new = parse_source(new, language);
        self.diff_units(&old, &new)
    }

    /// Diff two files. The language comes from `language`, or else from the
    /// old file's extension, and applies to both files.
    pub fn diff_files(&self, old: &Path, new: &Path, language: Option<Language>) -> Result<Report, ConfigError> {
        let old = parse_file(old, language)?;
        let new = parse_file(new, Some(old.language))?;
        Ok(self.diff_units(&old, &new))
    }

    pub fn diff_units(&self, old: &SourceUnit, new: &SourceUnit) -> Report {
        let (Some(old_tree), Some(new_tree)) = (self.canonical(old), self.canonical(new)) else {
            tracing::warn!(
                old = ?old.path,
                new = ?new.path,
                "input could not be parsed; reporting it as unparseable"
            );
            return Report::unparseable(old, new);
        };

        let started = Instant::now();
        let alignment = match_trees(&old_tree, &new_tree, &self.options);
        let matched = started.elapsed();
        if let Some(exceeded) = &alignment.diagnostics.budget_exceeded {
            tracing::warn!(%exceeded, "alignment fell back to coarse delete+insert");
        }

        let changes = classify(&old_tree, &new_tree, &alignment);
        let dependencies = dependencies(&old_tree, &new_tree, &alignment);
        tracing::debug!(
            match_ms = matched.as_millis() as u64,
            total_ms = started.elapsed().as_millis() as u64,
            changes = changes.len(),
            dependencies = dependencies.len(),
            "diff complete"
        );
        Report::new(old, new, &alignment, changes, dependencies)
    }

    /// Binding classification of every declaration site in `unit`.
    pub fn bindings(&self, unit: &SourceUnit) -> Vec<BindingSite> {
        self.canonical(unit).map(|tree| binding_sites(&tree)).unwrap_or_default()
    }

    fn canonical(&self, unit: &SourceUnit) -> Option<CanonicalTree> {
        if !unit.is_parseable() {
            return None;
        }
        let root = unit.root.clone()?;
        let started = Instant::now();
        let tree = normalize(root, &self.options);
        tracing::debug!(
            nodes = tree.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "normalized tree"
        );
        Some(tree)
    }
}
