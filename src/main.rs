//! Arbor CLI entry point

use arbor_classify::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod batch;
mod commands;

#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Structural source diff with classified changes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Options file (defaults to ./arbor.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Diff two versions of a source file
    Diff {
        old: PathBuf,
        new: PathBuf,

        /// Language of both files (defaults to the old file's extension)
        #[arg(short, long)]
        lang: Option<String>,

        /// Output format: json, yaml or text
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,

        /// Align top-level statements only, like a line diff
        #[arg(long)]
        line_mode: bool,
    },
    /// Diff many file pairs in parallel
    Batch {
        /// Directory of NAME_old.EXT / NAME_new.EXT fixtures
        #[arg(long, conflicts_with_all = ["old_dir", "new_dir"], required_unless_present = "old_dir")]
        fixtures: Option<PathBuf>,

        /// Old tree, paired with --new-dir by relative path
        #[arg(long, requires = "new_dir")]
        old_dir: Option<PathBuf>,

        #[arg(long, requires = "old_dir")]
        new_dir: Option<PathBuf>,

        /// Glob patterns of files to pair (defaults to every supported language)
        #[arg(long)]
        include: Vec<String>,

        #[arg(short, long)]
        lang: Option<String>,

        /// Output format: json, yaml or text
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },
    /// Print the binding class of every declaration site
    Bindings {
        file: PathBuf,

        #[arg(short, long)]
        lang: Option<String>,

        /// Output format: json or text
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the report.
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "arbor={0},arbor_core={0},arbor_parser={0},arbor_classify={0}",
            log_level
        ))
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Arbor v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Diff { old, new, lang, format, line_mode } => {
            let options = commands::load_options(cli.config.as_deref(), line_mode)?;
            let language = commands::parse_language(lang.as_deref())?;
            commands::diff(old, new, language, format, options).await
        }
        Commands::Batch { fixtures, old_dir, new_dir, include, lang, format } => {
            let options = commands::load_options(cli.config.as_deref(), false)?;
            let language = commands::parse_language(lang.as_deref())?;
            let source = match (fixtures, old_dir, new_dir) {
                (Some(dir), _, _) => batch::PairSource::Fixtures(dir),
                (None, Some(old), Some(new)) => batch::PairSource::Directories { old, new, include },
                _ => anyhow::bail!("batch needs --fixtures DIR or --old-dir A --new-dir B"),
            };
            tokio::task::spawn_blocking(move || batch::run(source, language, format, options)).await?
        }
        Commands::Bindings { file, lang, format } => {
            let options = commands::load_options(cli.config.as_deref(), false)?;
            let language = commands::parse_language(lang.as_deref())?;
            commands::bindings(file, language, format, options)
        }
        Commands::Version => {
            println!("Arbor v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
