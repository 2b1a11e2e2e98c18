//! Per-language lowering rules

pub mod generic;
pub mod javascript;
pub mod python;
pub mod typescript;

use arbor_core::Language;

use crate::lower::Grammar;
use generic::Generic;
use javascript::JavaScript;
use python::Python;
use typescript::TypeScript;

static RUST: Generic = Generic::new(Language::Rust);
static GO: Generic = Generic::new(Language::Go);
static JAVA: Generic = Generic::new(Language::Java);
static C: Generic = Generic::new(Language::C);
static CPP: Generic = Generic::new(Language::Cpp);

/// The lowering rules for `language`.
pub fn grammar_for(language: Language) -> &'static dyn Grammar {
    match language {
        Language::JavaScript => &JavaScript,
        Language::TypeScript => &TypeScript,
        Language::Python => &Python,
        Language::Rust => &RUST,
        Language::Go => &GO,
        Language::Java => &JAVA,
        Language::C => &C,
        Language::Cpp => &CPP,
    }
}
