//! Source parsing: tree-sitter grammars lowered to the arbor syntax model

pub mod languages;
pub mod lower;
pub mod parser_pool;


use std::path::{Path, PathBuf};

use arbor_core::{ConfigError, Language, ParseError, SourceUnit, Span};
use tree_sitter::Parser;

pub use languages::grammar_for;
pub use lower::{FieldRule, Grammar, Label, Shape, MAX_NESTING_DEPTH};
pub use parser_pool::{create_parser_pool, ParseRequest, ParserPool};

/// Parse `text` as `language`. Never fails; problems are recorded on the unit.
pub fn parse_source(text: &str, language: Language) -> SourceUnit {
    let mut parser = Parser::new();
    lower::parse_with(&mut parser, grammar_for(language), text.to_string(), None)
}

/// Read and parse a file, taking the language from its extension when not
/// given.
pub fn parse_file(path: &Path, language: Option<Language>) -> Result<SourceUnit, ConfigError> {
    match read_input(path, language)? {
        Input::Text { path, language, text } => {
            let mut parser = Parser::new();
            Ok(lower::parse_with(&mut parser, grammar_for(language), text, Some(path)))
        }
        Input::Invalid(unit) => Ok(unit),
    }
}

/// A file read from disk, before parsing.
#[derive(Debug)]
pub enum Input {
    Text { path: PathBuf, language: Language, text: String },
    /// The file is not UTF-8; the unit is already unparseable.
    Invalid(SourceUnit),
}

/// Read `path` and settle its language.
pub fn read_input(path: &Path, language: Option<Language>) -> Result<Input, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::MissingInput(path.to_path_buf()));
    }
    let language = match language {
        Some(language) => language,
        None => Language::from_path(path).ok_or_else(|| ConfigError::UnknownLanguage(path.to_path_buf()))?,
    };
    let bytes = std::fs::read(path).map_err(|source| ConfigError::UnreadableInput {
        path: path.to_path_buf(),
        source,
    })?;

    match String::from_utf8(bytes) {
        Ok(text) => Ok(Input::Text { path: path.to_path_buf(), language, text }),
        Err(e) => {
            let offset = e.utf8_error().valid_up_to();
            let text = String::from_utf8_lossy(e.as_bytes()).into_owned();
            let line = text[..text.len().min(offset)].matches('\n').count() as u32 + 1;
            let span = Span::new(offset as u32, offset as u32 + 1, (line, 0), (line, 0));
            tracing::warn!("{}: invalid UTF-8 at byte {}", path.display(), offset);
            Ok(Input::Invalid(SourceUnit {
                path: Some(path.to_path_buf()),
                language,
                text,
                root: None,
                errors: vec![ParseError::new(format!("invalid UTF-8 at byte {}", offset), span)],
            }))
        }
    }
}
