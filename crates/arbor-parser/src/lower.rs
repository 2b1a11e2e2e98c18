//! Lowering from tree-sitter concrete syntax to the neutral `SyntaxNode` model
//!
//! Each grammar decides, per concrete node, whether it becomes a neutral node,
//! a leaf, a declaration wrapper, disappears entirely or passes its children
//! through to its parent. `ERROR` regions and `MISSING` tokens are recorded as
//! parse errors and left out of the lowered tree.

use std::path::PathBuf;

use arbor_core::{Language, NodeKind, ParseError, SourceUnit, Span, SyntaxNode};
use tree_sitter::{Node, Parser};

/// Deepest concrete nesting that is lowered. Deeper subtrees are cut and
/// reported as a parse error, which leaves the unit `Partial`.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Where a lowered node takes its label from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    None,
    /// The node's own source text.
    Text,
    /// The source text of the named field.
    Field(&'static str),
    Fixed(&'static str),
    /// The grammar's node kind.
    Kind,
    /// The anonymous tokens among the node's children, such as `not in`.
    Tokens,
}

/// What a concrete node lowers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Node(NodeKind, Label),
    /// A node whose concrete children are ignored.
    Leaf(NodeKind, Label),
    /// `Declaration[Declarator[children]]`, for grammars without declarators.
    Declaration(Label),
    /// Children are spliced into the parent.
    Transparent,
    Skip,
}

/// How a child in a given field is attached to its lowered parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    Keep,
    Skip,
    /// Nest the lowered child inside these kinds, outermost first.
    Wrap(&'static [NodeKind]),
    /// Replace the kind of the lowered child.
    Retag(NodeKind),
}

/// A tree-sitter grammar together with its lowering rules.
pub trait Grammar: Send + Sync {
    fn language(&self) -> Language;

    fn ts_language(&self) -> tree_sitter::Language;

    fn shape(&self, node: Node<'_>, source: &str) -> Shape;

    /// Rule for a child found under `parent`, in `field` when it has one.
    fn field_rule(&self, _parent: &str, _field: Option<&str>, _child: &str) -> FieldRule {
        FieldRule::Keep
    }
}

/// Parse `text` with `parser` and lower the result.
pub fn parse_with(parser: &mut Parser, grammar: &dyn Grammar, text: String, path: Option<PathBuf>) -> SourceUnit {
    let language = grammar.language();
    if let Err(e) = parser.set_language(&grammar.ts_language()) {
        return SourceUnit {
            path,
            language,
            errors: vec![ParseError::new(format!("grammar unavailable: {}", e), Span::default())],
            root: None,
            text,
        };
    }
    let Some(tree) = parser.parse(&text, None) else {
        return SourceUnit {
            path,
            language,
            errors: vec![ParseError::new("parser produced no tree", Span::default())],
            root: None,
            text,
        };
    };

    let mut lowerer = Lowerer { grammar, source: &text, errors: Vec::new(), depth: 0 };
    let root = lowerer.lower_root(tree.root_node());
    let errors = lowerer.errors;

    if !errors.is_empty() {
        tracing::warn!(
            language = %language,
            errors = errors.len(),
            "parse errors; diffing the recoverable part (first: {})",
            errors[0]
        );
    }
    tracing::debug!(language = %language, nodes = root.size(), "lowered syntax tree");

    SourceUnit { path, language, root: Some(root), errors, text }
}

/// Span of a tree-sitter node: 1-based lines, byte columns.
pub fn span_of(node: &Node<'_>) -> Span {
    let start = node.start_position();
    let end = node.end_position();
    Span::new(
        node.start_byte() as u32,
        node.end_byte() as u32,
        (start.row as u32 + 1, start.column as u32),
        (end.row as u32 + 1, end.column as u32),
    )
}

struct Lowerer<'a> {
    grammar: &'a dyn Grammar,
    source: &'a str,
    errors: Vec<ParseError>,
    depth: usize,
}

impl Lowerer<'_> {
    fn lower_root(&mut self, root: Node<'_>) -> SyntaxNode {
        let span = span_of(&root);
        if root.is_error() {
            self.record_error(root);
            return SyntaxNode::new(NodeKind::Program, span);
        }
        let mut lowered = self.lower(root);
        if lowered.len() == 1 && lowered[0].kind == NodeKind::Program {
            return lowered.remove(0);
        }
        SyntaxNode::new(NodeKind::Program, span).with_children(lowered)
    }

    fn lower(&mut self, node: Node<'_>) -> Vec<SyntaxNode> {
        if self.depth >= MAX_NESTING_DEPTH {
            self.errors.push(ParseError::new(
                format!("nesting deeper than {} levels", MAX_NESTING_DEPTH),
                span_of(&node),
            ));
            return Vec::new();
        }
        self.depth += 1;
        let lowered = self.lower_node(node);
        self.depth -= 1;
        lowered
    }

    fn lower_node(&mut self, node: Node<'_>) -> Vec<SyntaxNode> {
        if node.is_error() {
            self.record_error(node);
            return Vec::new();
        }
        if node.is_missing() {
            self.record_missing(node);
            return Vec::new();
        }

        match self.grammar.shape(node, self.source) {
            Shape::Skip => Vec::new(),
            Shape::Transparent => self.lower_children(node, false),
            Shape::Leaf(kind, label) => {
                if node.has_error() {
                    self.collect_errors(node);
                }
                vec![self.build(node, kind, label, Vec::new())]
            }
            Shape::Node(kind, label) => {
                let children = self.lower_children(node, kind.is_named_declaration());
                vec![self.build(node, kind, label, children)]
            }
            Shape::Declaration(label) => {
                let children = self.lower_children(node, true);
                let declarator = SyntaxNode::new(NodeKind::Declarator, span_of(&node)).with_children(children);
                vec![self.build(node, NodeKind::Declaration, label, vec![declarator])]
            }
        }
    }

    fn build(&self, node: Node<'_>, kind: NodeKind, label: Label, children: Vec<SyntaxNode>) -> SyntaxNode {
        let mut lowered = SyntaxNode::new(kind, span_of(&node)).with_children(children);
        lowered.label = self.label_of(node, label);
        lowered
    }

    fn label_of(&self, node: Node<'_>, label: Label) -> Option<String> {
        match label {
            Label::None => None,
            Label::Text => Some(self.text(node).to_string()),
            Label::Field(field) => node.child_by_field_name(field).map(|f| self.text(f).to_string()),
            Label::Fixed(text) => Some(text.to_string()),
            Label::Kind => Some(node.kind().to_string()),
            Label::Tokens => {
                let mut cursor = node.walk();
                let tokens: Vec<&str> = node
                    .children(&mut cursor)
                    .filter(|c| !c.is_named() && !c.is_missing())
                    .map(|c| self.text(c))
                    .collect();
                (!tokens.is_empty()).then(|| tokens.join(" "))
            }
        }
    }

    /// Lower the named children of `node`, applying field rules. With
    /// `name_first`, children in the `name` field lead.
    fn lower_children(&mut self, node: Node<'_>, name_first: bool) -> Vec<SyntaxNode> {
        let mut named = Vec::new();
        let mut rest = Vec::new();
        let mut cursor = node.walk();
        if cursor.goto_first_child() {
            loop {
                let child = cursor.node();
                let field = cursor.field_name();
                if child.is_missing() {
                    self.record_missing(child);
                } else if child.is_named() || child.is_error() {
                    let lowered = self.lower(child);
                    let lowered = self.apply_rule(node.kind(), field, child, lowered);
                    if name_first && field == Some("name") {
                        named.extend(lowered);
                    } else {
                        rest.extend(lowered);
                    }
                }
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }
        named.extend(rest);
        named
    }

    fn apply_rule(
        &self,
        parent: &str,
        field: Option<&str>,
        child: Node<'_>,
        lowered: Vec<SyntaxNode>,
    ) -> Vec<SyntaxNode> {
        if lowered.is_empty() {
            return lowered;
        }
        match self.grammar.field_rule(parent, field, child.kind()) {
            FieldRule::Keep => lowered,
            FieldRule::Skip => Vec::new(),
            FieldRule::Retag(kind) => lowered
                .into_iter()
                .map(|mut n| {
                    n.kind = kind;
                    n
                })
                .collect(),
            FieldRule::Wrap(kinds) => {
                let span = span_of(&child);
                let mut inner = lowered;
                for kind in kinds.iter().rev() {
                    inner = vec![SyntaxNode::new(*kind, span).with_children(inner)];
                }
                inner
            }
        }
    }

    fn text(&self, node: Node<'_>) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or_default()
    }

    fn record_error(&mut self, node: Node<'_>) {
        let snippet: String = self.text(node).chars().take(40).collect();
        let snippet = snippet.split('\n').next().unwrap_or_default().trim();
        let message = if snippet.is_empty() {
            "syntax error".to_string()
        } else {
            format!("syntax error near `{}`", snippet)
        };
        self.errors.push(ParseError::new(message, span_of(&node)));
    }

    fn record_missing(&mut self, node: Node<'_>) {
        self.errors
            .push(ParseError::new(format!("missing `{}`", node.kind()), span_of(&node)));
    }

    /// Errors buried under a node whose children are not lowered.
    fn collect_errors(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.is_error() {
                self.record_error(child);
            } else if child.is_missing() {
                self.record_missing(child);
            } else if child.has_error() {
                self.collect_errors(child);
            }
        }
    }
}
