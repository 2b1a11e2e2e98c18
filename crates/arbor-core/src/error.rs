//! Error taxonomy for the diff pipeline
//!
//! Only [`ConfigError`] is ever returned as an `Err`. Parse errors and budget
//! overruns are data carried on the report.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Span;

/// Invalid invocation. Reported before any parsing begins.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing input: {0}")]
    MissingInput(PathBuf),

    #[error("cannot read {path}: {source}")]
    UnreadableInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("cannot determine language for {0}; pass a language tag")]
    UnknownLanguage(PathBuf),

    #[error("invalid option `{name}`: {reason}")]
    InvalidOption { name: &'static str, reason: String },

    #[error("cannot read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Malformed input, localized to a span.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message} at {span}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        ParseError { message: message.into(), span }
    }
}

/// Why the matcher stopped refining an alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetLimit {
    NodeVisits,
    WallClock,
    SiblingCells,
}

impl fmt::Display for BudgetLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetLimit::NodeVisits => f.write_str("node visit budget"),
            BudgetLimit::WallClock => f.write_str("time budget"),
            BudgetLimit::SiblingCells => f.write_str("sibling alignment ceiling"),
        }
    }
}

/// Soft failure: the matcher fell back to coarse delete+insert.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("matcher exceeded {limit} after {visits} visits ({elapsed_ms} ms)")]
pub struct MatcherBudgetExceeded {
    pub limit: BudgetLimit,
    pub visits: u64,
    pub elapsed_ms: u64,
}
