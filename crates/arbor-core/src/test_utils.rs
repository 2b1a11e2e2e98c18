//! Test utilities: hand-built syntax trees

use crate::model::{NodeKind, Span, SyntaxNode};

/// A distinct span per call site keeps nodes apart in assertions.
pub fn span_at(line: u32) -> Span {
    Span::new(line * 100, line * 100 + 10, (line, 0), (line, 10))
}

pub fn node(kind: NodeKind, children: Vec<SyntaxNode>) -> SyntaxNode {
    SyntaxNode::new(kind, Span::default()).with_children(children)
}

pub fn labeled(kind: NodeKind, label: &str, children: Vec<SyntaxNode>) -> SyntaxNode {
    node(kind, children).with_label(label)
}

pub fn ident(name: &str) -> SyntaxNode {
    labeled(NodeKind::Identifier, name, vec![])
}

pub fn prop(name: &str) -> SyntaxNode {
    labeled(NodeKind::PropertyName, name, vec![])
}

pub fn num(value: &str) -> SyntaxNode {
    labeled(NodeKind::NumberLiteral, value, vec![])
}

/// A quoted string literal, as a parser would produce it.
pub fn string(raw: &str) -> SyntaxNode {
    labeled(NodeKind::StringLiteral, raw, vec![])
}

pub fn member(object: SyntaxNode, property: &str) -> SyntaxNode {
    node(NodeKind::MemberAccess, vec![object, prop(property)])
}

pub fn call(callee: SyntaxNode, args: Vec<SyntaxNode>) -> SyntaxNode {
    node(NodeKind::CallExpression, vec![callee, node(NodeKind::Arguments, args)])
}

pub fn binary(op: &str, left: SyntaxNode, right: SyntaxNode) -> SyntaxNode {
    labeled(NodeKind::BinaryOp, op, vec![left, right])
}

pub fn unary(op: &str, operand: SyntaxNode) -> SyntaxNode {
    labeled(NodeKind::UnaryOp, op, vec![operand])
}

pub fn assign(target: SyntaxNode, value: SyntaxNode) -> SyntaxNode {
    labeled(NodeKind::Assignment, "=", vec![target, value])
}

pub fn var(name: &str, init: Option<SyntaxNode>) -> SyntaxNode {
    let mut declarator = vec![ident(name)];
    declarator.extend(init);
    labeled(NodeKind::Declaration, "var", vec![node(NodeKind::Declarator, declarator)])
}

pub fn expr(expression: SyntaxNode) -> SyntaxNode {
    node(NodeKind::ExpressionStatement, vec![expression])
}

pub fn ret(value: Option<SyntaxNode>) -> SyntaxNode {
    node(NodeKind::Return, value.into_iter().collect())
}

pub fn block(statements: Vec<SyntaxNode>) -> SyntaxNode {
    node(NodeKind::Block, statements)
}

pub fn func(name: &str, params: &[&str], body: Vec<SyntaxNode>) -> SyntaxNode {
    node(
        NodeKind::FunctionDef,
        vec![
            ident(name),
            node(NodeKind::Parameters, params.iter().map(|p| ident(p)).collect()),
            block(body),
        ],
    )
}

pub fn if_then(condition: SyntaxNode, consequence: SyntaxNode) -> SyntaxNode {
    node(NodeKind::Conditional, vec![condition, consequence])
}

pub fn comment(text: &str) -> SyntaxNode {
    labeled(NodeKind::Comment, text, vec![])
}

pub fn program(statements: Vec<SyntaxNode>) -> SyntaxNode {
    node(NodeKind::Program, statements)
}

/// `console.log(<arg>);`
pub fn log(arg: SyntaxNode) -> SyntaxNode {
    expr(call(member(ident("console"), "log"), vec![arg]))
}
