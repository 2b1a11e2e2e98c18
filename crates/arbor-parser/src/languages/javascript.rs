//! JavaScript lowering

use arbor_core::{Language, NodeKind};
use tree_sitter::Node;

use crate::lower::{FieldRule, Grammar, Label, Shape};

pub struct JavaScript;

impl Grammar for JavaScript {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn ts_language(&self) -> tree_sitter::Language {
        tree_sitter_javascript::LANGUAGE.into()
    }

    fn shape(&self, node: Node<'_>, _source: &str) -> Shape {
        shape(node)
    }

    fn field_rule(&self, parent: &str, field: Option<&str>, child: &str) -> FieldRule {
        field_rule(parent, field, child)
    }
}

/// Shapes shared with the TypeScript lowering.
pub(crate) fn shape(node: Node<'_>) -> Shape {
    use NodeKind::*;
    match node.kind() {
        "program" => Shape::Node(Program, Label::None),
        "expression_statement" => Shape::Node(ExpressionStatement, Label::None),
        "empty_statement" => Shape::Leaf(Empty, Label::None),
        "comment" | "hash_bang_line" => Shape::Leaf(Comment, Label::Text),

        // Declarations
        "variable_declaration" => Shape::Node(Declaration, Label::Fixed("var")),
        "lexical_declaration" => Shape::Node(Declaration, Label::Field("kind")),
        "variable_declarator" => Shape::Node(Declarator, Label::None),
        "function_declaration"
        | "generator_function_declaration"
        | "function_expression"
        | "function"
        | "generator_function"
        | "arrow_function" => Shape::Node(FunctionDef, Label::None),
        "method_definition" => Shape::Node(MethodDef, Label::None),
        "class_declaration" | "class" => Shape::Node(ClassDef, Label::None),
        "class_body" => Shape::Node(Block, Label::None),
        "field_definition" => Shape::Node(Property, Label::None),
        "formal_parameters" => Shape::Node(Parameters, Label::None),
        "statement_block" => Shape::Node(Block, Label::None),

        // Control flow
        "if_statement" => Shape::Node(Conditional, Label::None),
        "else_clause" => Shape::Node(ElseClause, Label::None),
        "for_statement" => Shape::Node(Loop, Label::Fixed("for")),
        "for_in_statement" => Shape::Node(Loop, Label::Fixed("for-in")),
        "while_statement" => Shape::Node(Loop, Label::Fixed("while")),
        "do_statement" => Shape::Node(Loop, Label::Fixed("do")),
        "switch_statement" => Shape::Node(Switch, Label::None),
        "switch_body" => Shape::Transparent,
        "switch_case" => Shape::Node(Case, Label::None),
        "switch_default" => Shape::Node(Case, Label::Fixed("default")),
        "try_statement" => Shape::Node(Try, Label::None),
        "catch_clause" => Shape::Node(Catch, Label::None),
        "finally_clause" => Shape::Node(Finally, Label::None),
        "return_statement" => Shape::Node(Return, Label::None),
        "throw_statement" => Shape::Node(Throw, Label::None),
        "break_statement" => Shape::Node(Break, Label::None),
        "continue_statement" => Shape::Node(Continue, Label::None),
        "labeled_statement" => Shape::Transparent,
        "import_statement" => Shape::Node(Import, Label::None),
        "import_clause" | "named_imports" | "namespace_import" | "import_specifier" => Shape::Transparent,
        "export_statement" => Shape::Node(Export, Label::None),
        "export_clause" | "export_specifier" => Shape::Transparent,

        // Expressions
        "call_expression" => Shape::Node(CallExpression, Label::None),
        "new_expression" => Shape::Node(NewExpression, Label::None),
        "arguments" => Shape::Node(Arguments, Label::None),
        "member_expression" => Shape::Node(MemberAccess, Label::None),
        "subscript_expression" => Shape::Node(Index, Label::None),
        "assignment_expression" | "assignment_pattern" | "object_assignment_pattern" => {
            Shape::Node(Assignment, Label::Fixed("="))
        }
        "augmented_assignment_expression" => Shape::Node(Assignment, Label::Field("operator")),
        "binary_expression" => Shape::Node(BinaryOp, Label::Field("operator")),
        "unary_expression" => Shape::Node(UnaryOp, Label::Field("operator")),
        "update_expression" => Shape::Node(UpdateOp, Label::Field("operator")),
        "ternary_expression" => Shape::Node(Ternary, Label::None),
        "sequence_expression" => Shape::Node(Sequence, Label::None),
        "parenthesized_expression" | "computed_property_name" | "template_substitution" => Shape::Transparent,
        "object" | "object_pattern" => Shape::Node(ObjectLiteral, Label::None),
        "pair" | "pair_pattern" => Shape::Node(Property, Label::None),
        "array" | "array_pattern" => Shape::Node(ArrayLiteral, Label::None),
        "spread_element" | "rest_pattern" => Shape::Node(Spread, Label::None),
        "template_string" => Shape::Node(TemplateLiteral, Label::None),
        "await_expression" | "yield_expression" => Shape::Node(Other, Label::Kind),

        // Leaves
        "identifier" | "shorthand_property_identifier" | "shorthand_property_identifier_pattern" | "super" => {
            Shape::Leaf(Identifier, Label::Text)
        }
        "property_identifier" | "private_property_identifier" | "statement_identifier" => {
            Shape::Leaf(PropertyName, Label::Text)
        }
        "this" => Shape::Leaf(This, Label::Fixed("this")),
        "string" => Shape::Leaf(StringLiteral, Label::Text),
        "string_fragment" | "escape_sequence" => Shape::Leaf(StringLiteral, Label::Text),
        "number" => Shape::Leaf(NumberLiteral, Label::Text),
        "true" | "false" => Shape::Leaf(BooleanLiteral, Label::Text),
        "null" | "undefined" => Shape::Leaf(NullLiteral, Label::Text),
        "regex" => Shape::Leaf(RegexLiteral, Label::Text),

        _ if node.named_child_count() == 0 => Shape::Leaf(Other, Label::Text),
        _ => Shape::Node(Other, Label::Kind),
    }
}

pub(crate) fn field_rule(parent: &str, field: Option<&str>, child: &str) -> FieldRule {
    use NodeKind::*;
    match (parent, field) {
        ("arrow_function", Some("parameter")) => FieldRule::Wrap(&[Parameters]),
        ("arrow_function", Some("body")) if child != "statement_block" => FieldRule::Wrap(&[Block, Return]),
        ("for_in_statement", Some("left")) if matches!(child, "identifier" | "object_pattern" | "array_pattern") => {
            FieldRule::Wrap(&[Declaration, Declarator])
        }
        ("labeled_statement", Some("label")) => FieldRule::Skip,
        _ => FieldRule::Keep,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_source;
    use arbor_core::ParseStatus;

    fn kinds(node: &arbor_core::SyntaxNode) -> Vec<NodeKind> {
        node.children.iter().map(|c| c.kind).collect()
    }

    #[test]
    fn test_lower_declarations() {
        let unit = parse_source("var a = require('foo'), b = 10;\nconst c = b;", Language::JavaScript);
        assert_eq!(unit.status(), ParseStatus::Clean);
        let root = unit.root.as_ref().unwrap();
        assert_eq!(kinds(root), vec![NodeKind::Declaration, NodeKind::Declaration]);
        assert_eq!(root.children[0].label(), Some("var"));
        assert_eq!(root.children[1].label(), Some("const"));
        let declarator = &root.children[0].children[0];
        assert_eq!(kinds(declarator), vec![NodeKind::Identifier, NodeKind::CallExpression]);
        assert_eq!(declarator.children[0].label(), Some("a"));
    }

    #[test]
    fn test_arrow_expression_body_becomes_return() {
        let unit = parse_source("const inc = x => x + 1;", Language::JavaScript);
        let root = unit.root.unwrap();
        let function = &root.children[0].children[0].children[1];
        assert_eq!(function.kind, NodeKind::FunctionDef);
        assert_eq!(kinds(function), vec![NodeKind::Parameters, NodeKind::Block]);
        assert_eq!(kinds(&function.children[1]), vec![NodeKind::Return]);
    }

    #[test]
    fn test_operators_are_labels() {
        let unit = parse_source("if (!x) { y += 2; }", Language::JavaScript);
        let root = unit.root.unwrap();
        let conditional = &root.children[0];
        assert_eq!(conditional.kind, NodeKind::Conditional);
        assert_eq!(conditional.children[0].kind, NodeKind::UnaryOp);
        assert_eq!(conditional.children[0].label(), Some("!"));
        let assignment = &conditional.children[1].children[0].children[0];
        assert_eq!(assignment.kind, NodeKind::Assignment);
        assert_eq!(assignment.label(), Some("+="));
    }

    #[test]
    fn test_member_access_uses_property_names() {
        let unit = parse_source("console.log(x.greeting);", Language::JavaScript);
        let root = unit.root.unwrap();
        let call = &root.children[0].children[0];
        assert_eq!(call.kind, NodeKind::CallExpression);
        let callee = &call.children[0];
        assert_eq!(kinds(callee), vec![NodeKind::Identifier, NodeKind::PropertyName]);
    }

    #[test]
    fn test_spans_are_one_based_lines() {
        let unit = parse_source("\n\nfoo();", Language::JavaScript);
        let root = unit.root.unwrap();
        let statement = &root.children[0];
        assert_eq!(statement.span.start_line, 3);
        assert_eq!(statement.span.start_column, 0);
        assert_eq!(statement.span.start_byte, 2);
    }
}
