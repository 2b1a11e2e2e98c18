//! Naming-convention lowering for Rust, Go, Java, C and C++
//!
//! These grammars share enough vocabulary (`*_statement`, `call_expression`,
//! `parameter_list`, ...) that one table gives comparable trees for all of
//! them. Types are dropped; names, operators and literals are kept.

use arbor_core::{Language, NodeKind};
use tree_sitter::Node;

use crate::lower::{FieldRule, Grammar, Label, Shape};

pub struct Generic {
    language: Language,
}

impl Generic {
    pub const fn new(language: Language) -> Self {
        Generic { language }
    }
}

impl Grammar for Generic {
    fn language(&self) -> Language {
        self.language
    }

    fn ts_language(&self) -> tree_sitter::Language {
        match self.language {
            Language::Go => tree_sitter_go::LANGUAGE.into(),
            Language::Java => tree_sitter_java::LANGUAGE.into(),
            Language::C => tree_sitter_c::LANGUAGE.into(),
            Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            _ => tree_sitter_rust::LANGUAGE.into(),
        }
    }

    fn shape(&self, node: Node<'_>, _source: &str) -> Shape {
        use NodeKind::*;
        let kind = node.kind();
        match kind {
            "source_file" | "translation_unit" | "program" | "compilation_unit" => Shape::Node(Program, Label::None),
            "expression_statement" => Shape::Node(ExpressionStatement, Label::None),
            "empty_statement" => Shape::Leaf(Empty, Label::None),

            // Declarations
            "let_declaration" | "short_var_declaration" | "const_item" | "static_item" => {
                Shape::Declaration(Label::Fixed("let"))
            }
            "local_variable_declaration" | "declaration" | "var_declaration" | "const_declaration" => {
                Shape::Node(Declaration, Label::Kind)
            }
            "variable_declarator" | "init_declarator" | "var_spec" | "const_spec" => Shape::Node(Declarator, Label::None),
            "function_item" | "function_definition" | "function_declaration" => Shape::Node(FunctionDef, Label::None),
            "closure_expression" | "lambda_expression" | "func_literal" => Shape::Node(FunctionDef, Label::None),
            "method_declaration" | "constructor_declaration" => Shape::Node(MethodDef, Label::None),
            "struct_item" | "enum_item" | "trait_item" | "impl_item" | "class_declaration" | "interface_declaration"
            | "enum_declaration" | "class_specifier" | "struct_specifier" | "type_declaration" => {
                Shape::Node(ClassDef, Label::Kind)
            }
            "function_declarator" | "var_spec_list" | "parameter" | "formal_parameter" | "parameter_declaration"
            | "expression_list" => Shape::Transparent,
            "parameters" | "parameter_list" | "formal_parameters" | "closure_parameters" => {
                Shape::Node(Parameters, Label::None)
            }
            "block" | "compound_statement" | "constructor_body" | "class_body" | "declaration_list"
            | "field_declaration_list" | "interface_body" | "enum_body" => Shape::Node(Block, Label::None),

            // Control flow
            "if_statement" | "if_expression" => Shape::Node(Conditional, Label::None),
            "else_clause" => Shape::Node(ElseClause, Label::None),
            "for_statement" | "for_expression" | "while_statement" | "while_expression" | "loop_expression"
            | "do_statement" | "enhanced_for_statement" | "for_range_loop" => Shape::Node(Loop, Label::Kind),
            "switch_statement" | "match_expression" | "expression_switch_statement" | "type_switch_statement"
            | "switch_expression" => Shape::Node(Switch, Label::None),
            "match_block" | "switch_block" | "switch_body" => Shape::Transparent,
            "match_arm" | "case_statement" | "switch_block_statement_group" | "switch_rule" | "expression_case"
            | "default_case" | "type_case" => Shape::Node(Case, Label::None),
            "try_statement" | "try_with_resources_statement" => Shape::Node(Try, Label::None),
            "catch_clause" => Shape::Node(Catch, Label::None),
            "finally_clause" => Shape::Node(Finally, Label::None),
            "return_statement" | "return_expression" => Shape::Node(Return, Label::None),
            "throw_statement" => Shape::Node(Throw, Label::None),
            "break_statement" | "break_expression" => Shape::Node(Break, Label::None),
            "continue_statement" | "continue_expression" => Shape::Node(Continue, Label::None),
            "use_declaration" | "import_declaration" | "preproc_include" | "using_declaration" => {
                Shape::Node(Import, Label::None)
            }

            // Expressions
            "call_expression" | "method_invocation" | "macro_invocation" => Shape::Node(CallExpression, Label::None),
            "arguments" | "argument_list" | "token_tree" => Shape::Node(Arguments, Label::None),
            "object_creation_expression" | "new_expression" | "struct_expression" | "composite_literal" => {
                Shape::Node(NewExpression, Label::None)
            }
            "field_expression" | "field_access" | "selector_expression" | "scoped_identifier" => {
                Shape::Node(MemberAccess, Label::None)
            }
            "index_expression" | "subscript_expression" | "array_access" => Shape::Node(Index, Label::None),
            "assignment_expression" | "assignment_statement" | "compound_assignment_expr" | "inc_statement"
            | "dec_statement" => Shape::Node(Assignment, Label::Tokens),
            "binary_expression" => Shape::Node(BinaryOp, Label::Tokens),
            "unary_expression" | "pointer_expression" | "reference_expression" => Shape::Node(UnaryOp, Label::Tokens),
            "update_expression" => Shape::Node(UpdateOp, Label::Tokens),
            "ternary_expression" | "conditional_expression" => Shape::Node(Ternary, Label::None),
            "parenthesized_expression" | "condition_clause" => Shape::Transparent,
            "array_expression" | "array_creation_expression" | "initializer_list" | "tuple_expression" => {
                Shape::Node(ArrayLiteral, Label::None)
            }
            "await_expression" => Shape::Node(Other, Label::Kind),

            // Types
            "type_arguments" | "type_parameters" | "primitive_type" | "generic_type" | "reference_type"
            | "sized_type_specifier" | "attribute_item" | "modifiers" | "visibility_modifier" => Shape::Skip,

            // Leaves
            "identifier" | "self" | "shorthand_field_identifier" => Shape::Leaf(Identifier, Label::Text),
            "field_identifier" | "type_identifier" | "property_identifier" | "package_identifier"
            | "namespace_identifier" => Shape::Leaf(PropertyName, Label::Text),
            "this" => Shape::Leaf(This, Label::Fixed("this")),
            "true" | "false" | "boolean_literal" => Shape::Leaf(BooleanLiteral, Label::Text),
            "null" | "nil" | "null_literal" | "nullptr" => Shape::Leaf(NullLiteral, Label::Text),
            _ if kind.contains("comment") => Shape::Leaf(Comment, Label::Text),
            _ if kind.contains("string") || kind.contains("char_literal") || kind == "character_literal" => {
                Shape::Leaf(StringLiteral, Label::Text)
            }
            _ if is_number(kind) => Shape::Leaf(NumberLiteral, Label::Text),

            _ if node.named_child_count() == 0 => Shape::Leaf(Other, Label::Text),
            _ => Shape::Node(Other, Label::Kind),
        }
    }

    fn field_rule(&self, _parent: &str, field: Option<&str>, _child: &str) -> FieldRule {
        match field {
            Some("type" | "return_type" | "result" | "dimensions") => FieldRule::Skip,
            _ => FieldRule::Keep,
        }
    }
}

fn is_number(kind: &str) -> bool {
    kind.ends_with("_literal")
        && ["integer", "float", "int", "number", "decimal", "hex", "octal", "binary", "imaginary", "rune"]
            .iter()
            .any(|prefix| kind.starts_with(prefix))
}
