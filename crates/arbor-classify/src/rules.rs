//! First-match rule table from owner kinds, binding transitions and the
//! changed aspect to a category

use std::fmt;

use arbor_core::{Binding, BindingClass, NodeKind};

use crate::category::{Certainty, ChangeCategory};

/// Which part of an owner node a change touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Aspect {
    /// The owner itself was inserted or deleted.
    Inserted,
    Deleted,
    GuardInserted,
    GuardRemoved,
    DeadInserted,
    DeadRemoved,
    Moved,
    /// The owner's own label, such as `var` to `let` or `=` to `+=`.
    Label,
    Callee,
    Arguments,
    Condition,
    Body,
    Initializer,
    Target,
    Signature,
    Renamed,
    HandlerUnchanged,
    HandlerChanged,
    Content,
}

impl Aspect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aspect::Inserted => "inserted",
            Aspect::Deleted => "deleted",
            Aspect::GuardInserted => "guard inserted",
            Aspect::GuardRemoved => "guard removed",
            Aspect::DeadInserted => "dead code inserted",
            Aspect::DeadRemoved => "dead code removed",
            Aspect::Moved => "moved",
            Aspect::Label => "label",
            Aspect::Callee => "callee",
            Aspect::Arguments => "arguments",
            Aspect::Condition => "condition",
            Aspect::Body => "body",
            Aspect::Initializer => "initializer",
            Aspect::Target => "target",
            Aspect::Signature => "signature",
            Aspect::Renamed => "name",
            Aspect::HandlerUnchanged => "handler unchanged",
            Aspect::HandlerChanged => "handler changed",
            Aspect::Content => "content",
        }
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum KindPattern {
    Any,
    /// No counterpart on this side.
    Absent,
    OneOf(&'static [NodeKind]),
}

impl KindPattern {
    fn matches(&self, kind: Option<NodeKind>) -> bool {
        match (self, kind) {
            (KindPattern::Any, _) => true,
            (KindPattern::Absent, None) => true,
            (KindPattern::OneOf(kinds), Some(kind)) => kinds.contains(&kind),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ClassPattern {
    Any,
    Is(BindingClass),
}

impl ClassPattern {
    fn matches(&self, class: BindingClass) -> bool {
        match self {
            ClassPattern::Any => true,
            ClassPattern::Is(expected) => *expected == class,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum BindingPattern {
    Any,
    /// Both owners carry a binding and the pair moves between these classes.
    Transition(ClassPattern, ClassPattern),
}

impl BindingPattern {
    fn matches(&self, transition: Option<(Binding, Binding)>) -> bool {
        match (self, transition) {
            (BindingPattern::Any, _) => true,
            (BindingPattern::Transition(from, to), Some((old, new))) => {
                from.matches(old.class) && to.matches(new.class)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub old: KindPattern,
    pub new: KindPattern,
    pub binding: BindingPattern,
    /// Empty matches every aspect.
    pub aspects: &'static [Aspect],
    pub category: ChangeCategory,
    pub certainty: Certainty,
}

/// What a rule is matched against.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput {
    pub old: Option<NodeKind>,
    pub new: Option<NodeKind>,
    pub transition: Option<(Binding, Binding)>,
    pub aspect: Aspect,
}

impl Rule {
    pub fn matches(&self, input: &RuleInput) -> bool {
        (self.aspects.is_empty() || self.aspects.contains(&input.aspect))
            && self.old.matches(input.old)
            && self.new.matches(input.new)
            && self.binding.matches(input.transition)
    }
}

const DECLARATIONS: &[NodeKind] = &[
    NodeKind::Declaration,
    NodeKind::Declarator,
    NodeKind::FunctionDef,
    NodeKind::ClassDef,
    NodeKind::MethodDef,
];
const CONTROL: &[NodeKind] = &[
    NodeKind::Conditional,
    NodeKind::Loop,
    NodeKind::Switch,
    NodeKind::Return,
    NodeKind::Throw,
    NodeKind::Break,
    NodeKind::Continue,
];
const BINDERS: &[NodeKind] = &[NodeKind::Declarator, NodeKind::Assignment];
const CALLS: &[NodeKind] = &[NodeKind::CallExpression, NodeKind::NewExpression];
const FUNCTIONS: &[NodeKind] = &[NodeKind::FunctionDef, NodeKind::MethodDef, NodeKind::ClassDef];
const IMPORT: &[NodeKind] = &[NodeKind::Import];
const TRY: &[NodeKind] = &[NodeKind::Try];
const CLASS: &[NodeKind] = &[NodeKind::ClassDef];
const PROTOTYPE: &[NodeKind] = &[NodeKind::PrototypeExtension];
const ASSIGNMENT: &[NodeKind] = &[NodeKind::Assignment];
const PLAIN: &[NodeKind] = &[
    NodeKind::Declaration,
    NodeKind::Declarator,
    NodeKind::ExpressionStatement,
    NodeKind::Assignment,
    NodeKind::CallExpression,
    NodeKind::NewExpression,
    NodeKind::Return,
    NodeKind::Throw,
    NodeKind::Break,
    NodeKind::Continue,
    NodeKind::Export,
];

const fn rule(
    old: KindPattern,
    new: KindPattern,
    binding: BindingPattern,
    aspects: &'static [Aspect],
    category: ChangeCategory,
    certainty: Certainty,
) -> Rule {
    Rule { old, new, binding, aspects, category, certainty }
}

use BindingPattern::Transition;
use Certainty::{Definite, Heuristic};
use ChangeCategory as C;
use ClassPattern::Is;
use KindPattern::{Absent, Any, OneOf};

/// The built-in table. Order matters: the first matching rule wins.
pub static RULES: &[Rule] = &[
    // Aspects that decide the category on their own
    rule(Any, Any, BindingPattern::Any, &[Aspect::GuardInserted], C::GuardInserted, Definite),
    rule(Any, Any, BindingPattern::Any, &[Aspect::GuardRemoved], C::GuardRemoved, Definite),
    rule(Any, Any, BindingPattern::Any, &[Aspect::DeadInserted], C::DeadCodeInserted, Heuristic),
    rule(Any, Any, BindingPattern::Any, &[Aspect::DeadRemoved], C::DeadCodeRemoved, Heuristic),
    rule(Any, Any, BindingPattern::Any, &[Aspect::Moved], C::StatementMoved, Definite),
    rule(Any, Any, BindingPattern::Any, &[Aspect::HandlerUnchanged], C::ExceptionHandlingUnchanged, Definite),
    rule(Any, Any, BindingPattern::Any, &[Aspect::HandlerChanged], C::ExceptionHandlingChanged, Definite),
    // Prototype extensions
    rule(OneOf(PROTOTYPE), Any, BindingPattern::Any, &[], C::PrototypeExtensionChanged, Definite),
    rule(Any, OneOf(PROTOTYPE), BindingPattern::Any, &[], C::PrototypeExtensionChanged, Definite),
    // Whole statements
    rule(Absent, OneOf(DECLARATIONS), BindingPattern::Any, &[Aspect::Inserted], C::DeclarationInserted, Definite),
    rule(OneOf(DECLARATIONS), Absent, BindingPattern::Any, &[Aspect::Deleted], C::DeclarationRemoved, Definite),
    rule(Absent, OneOf(IMPORT), BindingPattern::Any, &[Aspect::Inserted], C::DependencyChanged, Definite),
    rule(OneOf(IMPORT), Absent, BindingPattern::Any, &[Aspect::Deleted], C::DependencyChanged, Definite),
    rule(Absent, OneOf(TRY), BindingPattern::Any, &[Aspect::Inserted], C::ExceptionHandlingChanged, Definite),
    rule(OneOf(TRY), Absent, BindingPattern::Any, &[Aspect::Deleted], C::ExceptionHandlingChanged, Definite),
    rule(Absent, OneOf(CONTROL), BindingPattern::Any, &[Aspect::Inserted], C::ControlFlowRewrite, Definite),
    rule(OneOf(CONTROL), Absent, BindingPattern::Any, &[Aspect::Deleted], C::ControlFlowRewrite, Definite),
    rule(Absent, Any, BindingPattern::Any, &[Aspect::Inserted], C::LogicChanged, Definite),
    rule(Any, Absent, BindingPattern::Any, &[Aspect::Deleted], C::LogicChanged, Definite),
    // Rebinding
    rule(
        OneOf(BINDERS),
        OneOf(BINDERS),
        Transition(Is(BindingClass::Top), Is(BindingClass::Top)),
        &[Aspect::Initializer],
        C::VarRebindTop,
        Heuristic,
    ),
    rule(
        OneOf(BINDERS),
        OneOf(BINDERS),
        Transition(ClassPattern::Any, Is(BindingClass::Top)),
        &[Aspect::Initializer],
        C::VarRebindToTop,
        Heuristic,
    ),
    rule(
        OneOf(BINDERS),
        OneOf(BINDERS),
        Transition(ClassPattern::Any, Is(BindingClass::Changed)),
        &[Aspect::Initializer],
        C::VarRebindChanged,
        Definite,
    ),
    rule(
        OneOf(BINDERS),
        OneOf(BINDERS),
        Transition(ClassPattern::Any, Is(BindingClass::Unchanged)),
        &[Aspect::Initializer],
        C::VarRebindUnchanged,
        Definite,
    ),
    rule(OneOf(ASSIGNMENT), OneOf(ASSIGNMENT), BindingPattern::Any, &[Aspect::Target], C::LogicChanged, Definite),
    rule(OneOf(BINDERS), OneOf(BINDERS), BindingPattern::Any, &[Aspect::Renamed], C::IdentifierRenamed, Definite),
    // Calls
    rule(OneOf(CALLS), OneOf(CALLS), BindingPattern::Any, &[Aspect::Callee], C::CallTargetChanged, Definite),
    rule(OneOf(CALLS), OneOf(CALLS), BindingPattern::Any, &[Aspect::Arguments], C::CallArgChanged, Definite),
    // Control flow
    rule(
        OneOf(CONTROL),
        OneOf(CONTROL),
        BindingPattern::Any,
        &[Aspect::Condition, Aspect::Body, Aspect::Label, Aspect::Content],
        C::ControlFlowRewrite,
        Definite,
    ),
    rule(OneOf(TRY), OneOf(TRY), BindingPattern::Any, &[Aspect::Body], C::LogicChanged, Definite),
    // Declarations
    rule(OneOf(FUNCTIONS), OneOf(FUNCTIONS), BindingPattern::Any, &[Aspect::Signature], C::SignatureChanged, Definite),
    rule(OneOf(FUNCTIONS), OneOf(FUNCTIONS), BindingPattern::Any, &[Aspect::Renamed], C::IdentifierRenamed, Definite),
    rule(OneOf(CLASS), OneOf(CLASS), BindingPattern::Any, &[Aspect::Content], C::SignatureChanged, Definite),
    rule(OneOf(FUNCTIONS), OneOf(FUNCTIONS), BindingPattern::Any, &[Aspect::Body], C::LogicChanged, Definite),
    rule(OneOf(IMPORT), OneOf(IMPORT), BindingPattern::Any, &[Aspect::Content, Aspect::Label], C::DependencyChanged, Definite),
    rule(OneOf(PLAIN), OneOf(PLAIN), BindingPattern::Any, &[Aspect::Content, Aspect::Label], C::LogicChanged, Definite),
];

/// Outcome of a table lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Matched { category: ChangeCategory, certainty: Certainty },
    /// No rule covers this pattern.
    Unknown { note: String },
}

/// Look up the first rule matching `input`. A matched certainty is lowered
/// to heuristic when either binding involved rests on an assumption.
pub fn lookup(input: &RuleInput) -> Verdict {
    lookup_in(RULES, input)
}

pub fn lookup_in(rules: &[Rule], input: &RuleInput) -> Verdict {
    let Some(rule) = rules.iter().find(|r| r.matches(input)) else {
        return Verdict::Unknown { note: unknown_note(input) };
    };
    let assumed = input.transition.is_some_and(|(old, new)| !old.certain || !new.certain);
    let certainty = if assumed { rule.certainty.weaker(Certainty::Heuristic) } else { rule.certainty };
    Verdict::Matched { category: rule.category, certainty }
}

fn unknown_note(input: &RuleInput) -> String {
    let side = |kind: Option<NodeKind>| kind.map_or("none", |k| k.as_str());
    format!("no rule for {} -> {} ({})", side(input.old), side(input.new), input.aspect)
}
