//! Python lowering
//!
//! Assignments to plain names at statement level become `var` declarations,
//! which gives them the function-scoped binding Python has.

use arbor_core::{Language, NodeKind};
use tree_sitter::Node;

use crate::lower::{FieldRule, Grammar, Label, Shape};

pub struct Python;

impl Grammar for Python {
    fn language(&self) -> Language {
        Language::Python
    }

    fn ts_language(&self) -> tree_sitter::Language {
        tree_sitter_python::LANGUAGE.into()
    }

    fn shape(&self, node: Node<'_>, _source: &str) -> Shape {
        use NodeKind::*;
        match node.kind() {
            "module" => Shape::Node(Program, Label::None),
            "expression_statement" => {
                if node.named_child(0).is_some_and(|c| declares_names(&c)) {
                    Shape::Node(Declaration, Label::Fixed("var"))
                } else {
                    Shape::Node(ExpressionStatement, Label::None)
                }
            }
            "assignment" => {
                let at_statement = node.parent().is_some_and(|p| p.kind() == "expression_statement");
                if at_statement && declares_names(&node) {
                    Shape::Node(Declarator, Label::None)
                } else {
                    Shape::Node(Assignment, Label::Fixed("="))
                }
            }
            "augmented_assignment" => Shape::Node(Assignment, Label::Field("operator")),
            "comment" => Shape::Leaf(Comment, Label::Text),
            "pass_statement" => Shape::Leaf(Empty, Label::None),

            // Definitions
            "function_definition" => Shape::Node(FunctionDef, Label::None),
            "lambda" => Shape::Node(FunctionDef, Label::None),
            "class_definition" => Shape::Node(ClassDef, Label::None),
            "decorated_definition" => Shape::Transparent,
            "parameters" | "lambda_parameters" => Shape::Node(Parameters, Label::None),
            "default_parameter" | "typed_default_parameter" => Shape::Node(Assignment, Label::Fixed("=")),
            "typed_parameter" => Shape::Transparent,
            "list_splat_pattern" | "dictionary_splat_pattern" | "list_splat" | "dictionary_splat" => {
                Shape::Node(Spread, Label::None)
            }
            "block" => Shape::Node(Block, Label::None),

            // Control flow
            "if_statement" => Shape::Node(Conditional, Label::None),
            "elif_clause" => Shape::Node(ElseClause, Label::Fixed("elif")),
            "else_clause" => Shape::Node(ElseClause, Label::None),
            "for_statement" => Shape::Node(Loop, Label::Fixed("for")),
            "while_statement" => Shape::Node(Loop, Label::Fixed("while")),
            "try_statement" => Shape::Node(Try, Label::None),
            "except_clause" | "except_group_clause" => Shape::Node(Catch, Label::None),
            "as_pattern" => Shape::Node(Property, Label::Fixed("as")),
            "as_pattern_target" => Shape::Transparent,
            "finally_clause" => Shape::Node(Finally, Label::None),
            "return_statement" => Shape::Node(Return, Label::None),
            "raise_statement" => Shape::Node(Throw, Label::None),
            "break_statement" => Shape::Leaf(Break, Label::None),
            "continue_statement" => Shape::Leaf(Continue, Label::None),
            "import_statement" | "import_from_statement" | "future_import_statement" => {
                Shape::Node(Import, Label::None)
            }
            "aliased_import" => Shape::Transparent,
            "dotted_name" => Shape::Leaf(Identifier, Label::Text),
            "relative_import" => Shape::Leaf(PropertyName, Label::Text),
            "wildcard_import" => Shape::Skip,

            // Expressions
            "call" => Shape::Node(CallExpression, Label::None),
            "argument_list" => Shape::Node(Arguments, Label::None),
            "keyword_argument" => Shape::Node(Property, Label::None),
            "attribute" => Shape::Node(MemberAccess, Label::None),
            "subscript" => Shape::Node(Index, Label::None),
            "binary_operator" | "boolean_operator" => Shape::Node(BinaryOp, Label::Field("operator")),
            "comparison_operator" => Shape::Node(BinaryOp, Label::Tokens),
            "not_operator" => Shape::Node(UnaryOp, Label::Fixed("not")),
            "unary_operator" => Shape::Node(UnaryOp, Label::Field("operator")),
            "conditional_expression" => Shape::Node(Ternary, Label::None),
            "parenthesized_expression" => Shape::Transparent,
            "dictionary" => Shape::Node(ObjectLiteral, Label::None),
            "pair" => Shape::Node(Property, Label::None),
            "list" | "tuple" | "set" | "expression_list" | "pattern_list" | "tuple_pattern" | "list_pattern" => {
                Shape::Node(ArrayLiteral, Label::None)
            }
            "concatenated_string" => Shape::Node(BinaryOp, Label::Fixed("+")),
            "await" => Shape::Node(Other, Label::Fixed("await")),
            "yield" => Shape::Node(Other, Label::Fixed("yield")),

            // Leaves
            "identifier" => Shape::Leaf(Identifier, Label::Text),
            "string" => Shape::Leaf(StringLiteral, Label::Text),
            "integer" | "float" => Shape::Leaf(NumberLiteral, Label::Text),
            "true" | "false" => Shape::Leaf(BooleanLiteral, Label::Text),
            "none" => Shape::Leaf(NullLiteral, Label::Text),

            _ if node.named_child_count() == 0 => Shape::Leaf(Other, Label::Text),
            _ => Shape::Node(Other, Label::Kind),
        }
    }

    fn field_rule(&self, parent: &str, field: Option<&str>, child: &str) -> FieldRule {
        use NodeKind::*;
        match (parent, field) {
            (_, Some("type" | "return_type")) => FieldRule::Skip,
            ("attribute", Some("attribute")) => FieldRule::Retag(PropertyName),
            ("keyword_argument", Some("name")) => FieldRule::Retag(PropertyName),
            ("import_from_statement", Some("module_name")) => FieldRule::Retag(PropertyName),
            ("aliased_import", Some("name")) => FieldRule::Retag(PropertyName),
            ("lambda", Some("body")) => FieldRule::Wrap(&[Block, Return]),
            ("for_statement", Some("left")) => FieldRule::Wrap(&[Declaration, Declarator]),
            ("except_clause" | "except_group_clause", _) if child != "block" && child != "as_pattern" => {
                FieldRule::Wrap(&[Other])
            }
            _ => FieldRule::Keep,
        }
    }
}

/// An assignment whose targets are all plain names or name patterns.
fn declares_names(node: &Node<'_>) -> bool {
    if node.kind() != "assignment" {
        return false;
    }
    node.child_by_field_name("left").is_some_and(|left| is_name_pattern(&left))
}

fn is_name_pattern(node: &Node<'_>) -> bool {
    match node.kind() {
        "identifier" => true,
        "pattern_list" | "tuple_pattern" | "list_pattern" => {
            let mut cursor = node.walk();
            let all = node.named_children(&mut cursor).all(|c| is_name_pattern(&c));
            all
        }
        _ => false,
    }
}
