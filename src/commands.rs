//! CLI command implementations

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use arbor_classify::{DiffEngine, OutputFormat};
use arbor_core::{ConfigError, DiffOptions, Language};
use arbor_parser::create_parser_pool;

/// Options from `--config`, else `./arbor.toml`, else defaults. Flags win.
pub fn load_options(config: Option<&Path>, line_mode: bool) -> Result<DiffOptions, ConfigError> {
    let mut options = match config {
        Some(path) => DiffOptions::load(path)?,
        None => DiffOptions::discover(Path::new("."))?,
    };
    if line_mode {
        options.line_mode = true;
    }
    Ok(options)
}

pub fn parse_language(tag: Option<&str>) -> Result<Option<Language>, ConfigError> {
    tag.map(|tag| Language::from_tag(tag).ok_or_else(|| ConfigError::UnsupportedLanguage(tag.to_string())))
        .transpose()
}

pub async fn diff(
    old: PathBuf,
    new: PathBuf,
    language: Option<Language>,
    format: OutputFormat,
    options: DiffOptions,
) -> anyhow::Result<()> {
    let engine = DiffEngine::new(options)?;
    let language = match language {
        Some(language) => language,
        None => Language::from_path(&old).ok_or_else(|| ConfigError::UnknownLanguage(old.clone()))?,
    };
    tracing::info!("Diffing {} -> {} as {}", old.display(), new.display(), language);

    let pool = create_parser_pool();
    let (old_unit, new_unit) = tokio::join!(
        pool.parse_file(&old, Some(language)),
        pool.parse_file(&new, Some(language)),
    );
    let old_unit = old_unit.with_context(|| format!("cannot load {}", old.display()))?;
    let new_unit = new_unit.with_context(|| format!("cannot load {}", new.display()))?;

    let report = engine.diff_units(&old_unit, &new_unit);
    if report.unparseable {
        tracing::warn!("Input could not be parsed; the report is flagged unparseable");
    } else {
        tracing::info!("{} classified changes", report.changes.len());
    }

    let rendered = report.render(format)?;
    println!("{}", rendered.trim_end());
    Ok(())
}

pub fn bindings(
    file: PathBuf,
    language: Option<Language>,
    format: OutputFormat,
    options: DiffOptions,
) -> anyhow::Result<()> {
    let engine = DiffEngine::new(options)?;
    let unit = arbor_parser::parse_file(&file, language)?;
    if !unit.is_parseable() {
        let reason = unit.first_error().map(|e| e.to_string()).unwrap_or_default();
        anyhow::bail!("{} could not be parsed: {}", file.display(), reason);
    }
    let sites = engine.bindings(&unit);
    tracing::info!("{} declaration sites in {}", sites.len(), file.display());

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&sites)?,
        OutputFormat::Yaml => serde_yaml::to_string(&sites)?,
        OutputFormat::Text => {
            let mut out = String::new();
            for site in &sites {
                let certainty = if site.certain { "definite" } else { "heuristic" };
                writeln!(out, "{}:{}\t{}\t{}\t{}", site.span.start_line, site.span.start_column, site.name, site.class, certainty)?;
            }
            out
        }
    };
    println!("{}", rendered.trim_end());
    Ok(())
}
