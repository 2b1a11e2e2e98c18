//! Core data structures for syntax trees and source units

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Languages with a tree-sitter front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Rust,
    Go,
    Java,
    C,
    Cpp,
}

impl Language {
    /// Detect language from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str())? {
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "ts" | "tsx" | "mts" | "cts" => Some(Language::TypeScript),
            "py" | "pyi" => Some(Language::Python),
            "rs" => Some(Language::Rust),
            "go" => Some(Language::Go),
            "java" => Some(Language::Java),
            "c" | "h" => Some(Language::C),
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Some(Language::Cpp),
            _ => None,
        }
    }

    /// Parse a language tag such as `js`, `python` or `c++`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "javascript" | "js" | "jsx" | "node" => Some(Language::JavaScript),
            "typescript" | "ts" | "tsx" => Some(Language::TypeScript),
            "python" | "py" => Some(Language::Python),
            "rust" | "rs" => Some(Language::Rust),
            "go" | "golang" => Some(Language::Go),
            "java" => Some(Language::Java),
            "c" => Some(Language::C),
            "cpp" | "c++" | "cxx" => Some(Language::Cpp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of a node in its source text.
///
/// Lines are 1-based, columns are 0-based byte offsets within the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start_byte: u32,
    pub end_byte: u32,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Span {
    pub fn new(start_byte: u32, end_byte: u32, start: (u32, u32), end: (u32, u32)) -> Self {
        Span {
            start_byte,
            end_byte,
            start_line: start.0,
            start_column: start.1,
            end_line: end.0,
            end_column: end.1,
        }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(&self, other: &Span) -> Span {
        let (start_byte, start_line, start_column) = if other.start_byte < self.start_byte {
            (other.start_byte, other.start_line, other.start_column)
        } else {
            (self.start_byte, self.start_line, self.start_column)
        };
        let (end_byte, end_line, end_column) = if other.end_byte > self.end_byte {
            (other.end_byte, other.end_line, other.end_column)
        } else {
            (self.end_byte, self.end_line, self.end_column)
        };
        Span { start_byte, end_byte, start_line, start_column, end_line, end_column }
    }

    pub fn len(&self) -> u32 {
        self.end_byte.saturating_sub(self.start_byte)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start_line, self.start_column, self.end_line, self.end_column
        )
    }
}

/// Language-neutral syntax node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    // ── Containers ──────────────────────────────────────────
    Program,
    FunctionDef,
    ClassDef,
    MethodDef,
    Parameters,
    Block,

    // ── Bindings ────────────────────────────────────────────
    Declaration,
    Declarator,
    Assignment,
    PrototypeExtension,

    // ── Expressions ─────────────────────────────────────────
    CallExpression,
    NewExpression,
    Arguments,
    MemberAccess,
    Index,
    Identifier,
    PropertyName,
    This,
    StringLiteral,
    NumberLiteral,
    BooleanLiteral,
    NullLiteral,
    RegexLiteral,
    TemplateLiteral,
    ObjectLiteral,
    Property,
    ArrayLiteral,
    BinaryOp,
    UnaryOp,
    UpdateOp,
    Ternary,
    Sequence,
    Spread,

    // ── Statements ──────────────────────────────────────────
    ExpressionStatement,
    Conditional,
    ElseClause,
    Loop,
    Switch,
    Case,
    Try,
    Catch,
    Finally,
    Return,
    Throw,
    Break,
    Continue,
    Import,
    Export,

    // ── Trivia ──────────────────────────────────────────────
    Comment,
    Empty,

    // ── Fallback ────────────────────────────────────────────
    Other,
}

impl NodeKind {
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            NodeKind::StringLiteral
                | NodeKind::NumberLiteral
                | NodeKind::BooleanLiteral
                | NodeKind::NullLiteral
                | NodeKind::RegexLiteral
                | NodeKind::TemplateLiteral
        )
    }

    pub fn is_trivia(&self) -> bool {
        matches!(self, NodeKind::Comment | NodeKind::Empty)
    }

    /// Kinds that are statements wherever they appear.
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            NodeKind::Declaration
                | NodeKind::ExpressionStatement
                | NodeKind::Conditional
                | NodeKind::Loop
                | NodeKind::Switch
                | NodeKind::Try
                | NodeKind::Return
                | NodeKind::Throw
                | NodeKind::Break
                | NodeKind::Continue
                | NodeKind::Import
                | NodeKind::Export
        )
    }

    /// Kinds whose children are statements.
    pub fn holds_statements(&self) -> bool {
        matches!(
            self,
            NodeKind::Program
                | NodeKind::Block
                | NodeKind::Case
                | NodeKind::ElseClause
                | NodeKind::Finally
                | NodeKind::Export
        )
    }

    /// Kinds that open a function scope.
    pub fn is_function(&self) -> bool {
        matches!(self, NodeKind::FunctionDef | NodeKind::MethodDef)
    }

    /// Kinds that carry a declared name as their first child.
    pub fn is_named_declaration(&self) -> bool {
        matches!(
            self,
            NodeKind::FunctionDef | NodeKind::MethodDef | NodeKind::ClassDef | NodeKind::Declarator
        )
    }

    /// Statements that transfer control out of the enclosing block.
    pub fn is_exit(&self) -> bool {
        matches!(
            self,
            NodeKind::Return | NodeKind::Throw | NodeKind::Break | NodeKind::Continue
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Program => "Program",
            NodeKind::FunctionDef => "FunctionDef",
            NodeKind::ClassDef => "ClassDef",
            NodeKind::MethodDef => "MethodDef",
            NodeKind::Parameters => "Parameters",
            NodeKind::Block => "Block",
            NodeKind::Declaration => "Declaration",
            NodeKind::Declarator => "Declarator",
            NodeKind::Assignment => "Assignment",
            NodeKind::PrototypeExtension => "PrototypeExtension",
            NodeKind::CallExpression => "CallExpression",
            NodeKind::NewExpression => "NewExpression",
            NodeKind::Arguments => "Arguments",
            NodeKind::MemberAccess => "MemberAccess",
            NodeKind::Index => "Index",
            NodeKind::Identifier => "Identifier",
            NodeKind::PropertyName => "PropertyName",
            NodeKind::This => "This",
            NodeKind::StringLiteral => "StringLiteral",
            NodeKind::NumberLiteral => "NumberLiteral",
            NodeKind::BooleanLiteral => "BooleanLiteral",
            NodeKind::NullLiteral => "NullLiteral",
            NodeKind::RegexLiteral => "RegexLiteral",
            NodeKind::TemplateLiteral => "TemplateLiteral",
            NodeKind::ObjectLiteral => "ObjectLiteral",
            NodeKind::Property => "Property",
            NodeKind::ArrayLiteral => "ArrayLiteral",
            NodeKind::BinaryOp => "BinaryOp",
            NodeKind::UnaryOp => "UnaryOp",
            NodeKind::UpdateOp => "UpdateOp",
            NodeKind::Ternary => "Ternary",
            NodeKind::Sequence => "Sequence",
            NodeKind::Spread => "Spread",
            NodeKind::ExpressionStatement => "ExpressionStatement",
            NodeKind::Conditional => "Conditional",
            NodeKind::ElseClause => "ElseClause",
            NodeKind::Loop => "Loop",
            NodeKind::Switch => "Switch",
            NodeKind::Case => "Case",
            NodeKind::Try => "Try",
            NodeKind::Catch => "Catch",
            NodeKind::Finally => "Finally",
            NodeKind::Return => "Return",
            NodeKind::Throw => "Throw",
            NodeKind::Break => "Break",
            NodeKind::Continue => "Continue",
            NodeKind::Import => "Import",
            NodeKind::Export => "Export",
            NodeKind::Comment => "Comment",
            NodeKind::Empty => "Empty",
            NodeKind::Other => "Other",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lowered syntax node. Children are owned exclusively by their parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    /// Names, operators and literal text.
    pub label: Option<String>,
    pub span: Span,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        SyntaxNode { kind, label: None, span, children: Vec::new() }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_children(mut self, children: Vec<SyntaxNode>) -> Self {
        self.children = children;
        self
    }

    pub fn push(&mut self, child: SyntaxNode) {
        self.children.push(child);
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(SyntaxNode::size).sum::<usize>()
    }
}

/// How much of a source unit could be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStatus {
    Clean,
    Partial,
    Unparseable,
}

/// One version of one file. Immutable after parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceUnit {
    pub path: Option<PathBuf>,
    pub language: Language,
    pub text: String,
    pub root: Option<SyntaxNode>,
    pub errors: Vec<ParseError>,
}

impl SourceUnit {
    pub fn status(&self) -> ParseStatus {
        match &self.root {
            None => ParseStatus::Unparseable,
            Some(root) => {
                if self.errors.is_empty() {
                    ParseStatus::Clean
                } else if root.children.is_empty() && !self.text.trim().is_empty() {
                    ParseStatus::Unparseable
                } else {
                    ParseStatus::Partial
                }
            }
        }
    }

    pub fn is_parseable(&self) -> bool {
        self.status() != ParseStatus::Unparseable
    }

    /// The first recorded parse error, if any.
    pub fn first_error(&self) -> Option<&ParseError> {
        self.errors.first()
    }
}
