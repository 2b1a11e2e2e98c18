//! Batch diffing: fixture directories and paired trees, run in parallel

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arbor_classify::{DiffEngine, OutputFormat, Report};
use arbor_core::{DiffOptions, Language};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;

/// Where batch pairs come from.
#[derive(Debug, Clone)]
pub enum PairSource {
    /// `NAME_old.EXT` next to `NAME_new.EXT`.
    Fixtures(PathBuf),
    /// Files at the same relative path under two roots.
    Directories { old: PathBuf, new: PathBuf, include: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FilePair {
    pub old: PathBuf,
    pub new: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct PairOutcome {
    pub old: PathBuf,
    pub new: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Report>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn run(source: PairSource, language: Option<Language>, format: OutputFormat, options: DiffOptions) -> Result<()> {
    let engine = DiffEngine::new(options)?;
    let pairs = match &source {
        PairSource::Fixtures(dir) => fixture_pairs(dir)?,
        PairSource::Directories { old, new, include } => directory_pairs(old, new, include)?,
    };
    tracing::info!("Diffing {} file pairs", pairs.len());

    let outcomes = diff_pairs(&engine, &pairs, language);
    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
    if failed > 0 {
        tracing::warn!("{} of {} pairs failed", failed, outcomes.len());
    }
    println!("{}", render(&outcomes, format)?.trim_end());
    Ok(())
}

pub fn fixture_pairs(dir: &Path) -> Result<Vec<FilePair>> {
    let pattern = Regex::new(r"^(?P<stem>.+)_old\.(?P<ext>[A-Za-z0-9]+)$")?;
    let entries = std::fs::read_dir(dir).with_context(|| format!("cannot read fixture directory {}", dir.display()))?;

    let mut pairs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(captures) = pattern.captures(name) else {
            continue;
        };
        let new = dir.join(format!("{}_new.{}", &captures["stem"], &captures["ext"]));
        if new.is_file() {
            pairs.push(FilePair { old: path, new });
        } else {
            tracing::warn!("{} has no _new counterpart", path.display());
        }
    }
    pairs.sort();
    Ok(pairs)
}

/// Pair files by relative path. Without include patterns, every file of a
/// supported language is paired.
pub fn directory_pairs(old_root: &Path, new_root: &Path, include: &[String]) -> Result<Vec<FilePair>> {
    let filter = build_globset(include)?;

    let mut pairs = Vec::new();
    for entry in WalkBuilder::new(old_root).build() {
        let entry = entry?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let relative = entry.path().strip_prefix(old_root)?;
        let wanted = match &filter {
            Some(filter) => filter.is_match(relative),
            None => Language::from_path(relative).is_some(),
        };
        if !wanted {
            continue;
        }
        let new = new_root.join(relative);
        if new.is_file() {
            pairs.push(FilePair { old: entry.path().to_path_buf(), new });
        } else {
            tracing::debug!("{} has no counterpart under {}", relative.display(), new_root.display());
        }
    }
    pairs.sort();
    Ok(pairs)
}

fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("invalid include pattern `{}`", pattern))?);
    }
    Ok(Some(builder.build()?))
}

pub fn diff_pairs(engine: &DiffEngine, pairs: &[FilePair], language: Option<Language>) -> Vec<PairOutcome> {
    pairs
        .par_iter()
        .map(|pair| {
            let (report, error) = match engine.diff_files(&pair.old, &pair.new, language) {
                Ok(report) => (Some(report), None),
                Err(e) => {
                    tracing::warn!("{}: {}", pair.old.display(), e);
                    (None, Some(e.to_string()))
                }
            };
            PairOutcome { old: pair.old.clone(), new: pair.new.clone(), report, error }
        })
        .collect()
}

pub fn render(outcomes: &[PairOutcome], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(outcomes)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(outcomes)?),
        OutputFormat::Text => {
            let mut out = String::new();
            for outcome in outcomes {
                write!(out, "{} -> {}: ", outcome.old.display(), outcome.new.display())?;
                match (&outcome.report, &outcome.error) {
                    (_, Some(error)) => writeln!(out, "error: {}", error)?,
                    (Some(report), None) if report.unparseable => writeln!(out, "unparseable")?,
                    (Some(report), None) => writeln!(out, "{}", summarize(report))?,
                    (None, None) => writeln!(out, "no result")?,
                }
            }
            Ok(out)
        }
    }
}

/// `3 changes (GuardInserted 1, LogicChanged 2)`
fn summarize(report: &Report) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for change in &report.changes {
        *counts.entry(change.category.as_str()).or_default() += 1;
    }
    if counts.is_empty() {
        return "no changes".to_string();
    }
    let parts: Vec<String> = counts.iter().map(|(category, n)| format!("{} {}", category, n)).collect();
    format!("{} changes ({})", report.changes.len(), parts.join(", "))
}
