//! TypeScript lowering: the JavaScript rules with type-only syntax removed

use arbor_core::{Language, NodeKind};
use tree_sitter::Node;

use super::javascript;
use crate::lower::{FieldRule, Grammar, Label, Shape};

pub struct TypeScript;

impl Grammar for TypeScript {
    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn ts_language(&self) -> tree_sitter::Language {
        tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
    }

    fn shape(&self, node: Node<'_>, _source: &str) -> Shape {
        match node.kind() {
            "type_annotation"
            | "type_arguments"
            | "type_parameters"
            | "interface_declaration"
            | "type_alias_declaration"
            | "ambient_declaration"
            | "implements_clause"
            | "accessibility_modifier"
            | "override_modifier"
            | "predefined_type"
            | "type_predicate_annotation"
            | "asserts_annotation"
            | "opting_type_annotation"
            | "omitting_type_annotation"
            | "index_signature" => Shape::Skip,
            "required_parameter" | "optional_parameter" => {
                if node.child_by_field_name("value").is_some() {
                    Shape::Node(NodeKind::Assignment, Label::Fixed("="))
                } else {
                    Shape::Transparent
                }
            }
            "as_expression" | "satisfies_expression" | "non_null_expression" | "type_assertion" => {
                Shape::Transparent
            }
            "abstract_class_declaration" => Shape::Node(NodeKind::ClassDef, Label::None),
            "public_field_definition" => Shape::Node(NodeKind::Property, Label::None),
            "abstract_method_signature" | "method_signature" | "function_signature" => Shape::Skip,
            "type_identifier" => Shape::Leaf(NodeKind::Identifier, Label::Text),
            "enum_declaration" => Shape::Node(NodeKind::Other, Label::Kind),
            _ => javascript::shape(node),
        }
    }

    fn field_rule(&self, parent: &str, field: Option<&str>, child: &str) -> FieldRule {
        match (parent, field) {
            ("as_expression" | "satisfies_expression" | "type_assertion", _) if is_type_node(child) => {
                FieldRule::Skip
            }
            (_, Some("type" | "return_type")) => FieldRule::Skip,
            _ => javascript::field_rule(parent, field, child),
        }
    }
}

fn is_type_node(kind: &str) -> bool {
    kind.ends_with("_type") || matches!(kind, "type_identifier" | "type_arguments" | "type_query")
}
