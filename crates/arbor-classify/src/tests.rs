use std::path::Path;

use arbor_core::{ConfigError, DiffOptions, Language, NodeKind, ParseError, SourceUnit, Span};
use insta::assert_json_snapshot;

use crate::{Certainty, ChangeCategory, DependencyKind, DiffEngine, OutputFormat, Report};

fn engine() -> DiffEngine {
    DiffEngine::new(DiffOptions::new()).unwrap()
}

fn diff_js(old: &str, new: &str) -> Report {
    engine().diff_sources(old, new, Language::JavaScript)
}

fn categories(report: &Report) -> Vec<ChangeCategory> {
    report.changes.iter().map(|c| c.category).collect()
}

const GUARD_OLD: &str = r#"
function foo() { return 1; }
function bar() { console.log("Bar says: " + x.greeting); }
function test() { bar(); foo(); }
"#;

const GUARD_NEW: &str = r#"
function foo() { return 1; }
function bar() { if (!x) return; console.log("Bar says: " + x.greeting); }
function test() { bar(); foo(); }
"#;

const TRY_OLD: &str = r#"
function run() {
  try {
    throw foo();
  } catch (e) {
    console.log(e);
  }
}
"#;

const TRY_NEW: &str = r#"
function run() {
  try {
    throw bar();
  } catch (e) {
    console.log(e);
  }
}
"#;

#[test]
fn test_guard_inserted_in_bar_only() {
    let report = diff_js(GUARD_OLD, GUARD_NEW);
    assert_eq!(categories(&report), vec![ChangeCategory::GuardInserted]);
    let record = &report.changes[0];
    assert_eq!(record.enclosing.as_deref(), Some("bar"));
    assert_eq!(record.certainty, Certainty::Definite);
    assert_eq!(record.node_kind, NodeKind::Conditional);
    assert!(record.old_span.is_none());
    assert_eq!(record.new_span.map(|s| s.start_line), Some(3));
}

#[test]
fn test_guard_removed_is_the_mirror() {
    let report = diff_js(GUARD_NEW, GUARD_OLD);
    assert_eq!(categories(&report), vec![ChangeCategory::GuardRemoved]);
    assert!(report.changes[0].new_span.is_none());
}

#[test]
fn test_try_with_same_handler() {
    let report = diff_js(TRY_OLD, TRY_NEW);
    let summary: Vec<(&str, &str, Option<&str>)> = report
        .changes
        .iter()
        .map(|c| (c.category.as_str(), c.certainty.as_str(), c.enclosing.as_deref()))
        .collect();
    assert_json_snapshot!(summary, @r#"
    [
      [
        "ExceptionHandlingUnchanged",
        "definite",
        "run"
      ],
      [
        "CallTargetChanged",
        "definite",
        "run"
      ]
    ]
    "#);
}

#[test]
fn test_rebind_to_unknown_value() {
    let report = diff_js(
        "var port = 8080;\nserver.listen(port);\n",
        "var port = lookupPort();\nserver.listen(port);\n",
    );
    assert_eq!(categories(&report), vec![ChangeCategory::VarRebindToTop]);
    assert_eq!(report.changes[0].certainty, Certainty::Heuristic);
    assert_eq!(report.changes[0].node_kind, NodeKind::Declarator);
    assert_eq!(report.changes[0].enclosing, None);
}

#[test]
fn test_rebind_between_literals_is_definite() {
    let report = diff_js("var b = 10;\nuse(b);\n", "var b = 11;\nuse(b);\n");
    assert_eq!(categories(&report), vec![ChangeCategory::VarRebindChanged]);
    assert_eq!(report.changes[0].certainty, Certainty::Definite);
}

#[test]
fn test_rebind_to_module_reference() {
    let report = diff_js("var f = 1;\nuse(f);\n", "var f = module;\nuse(f);\n");
    assert_eq!(categories(&report), vec![ChangeCategory::VarRebindUnchanged]);
    assert_eq!(report.changes[0].certainty, Certainty::Definite);
    assert_eq!(report.changes[0].node_kind, NodeKind::Declarator);
    // A module reference is stable, so the read of `f` is not affected.
    assert!(report.dependencies.is_empty());
}

#[test]
fn test_condition_rewrite_is_control_flow() {
    let report = diff_js(
        "function f(a) { if (a > 1) { go(); } }\n",
        "function f(a) { if (a < 1) { go(); } }\n",
    );
    assert_eq!(categories(&report), vec![ChangeCategory::ControlFlowRewrite]);
    let record = &report.changes[0];
    assert_eq!(record.node_kind, NodeKind::Conditional);
    assert_eq!(record.enclosing.as_deref(), Some("f"));
    assert_eq!(record.certainty, Certainty::Definite);
}

#[test]
fn test_unknown_statement_is_unclassified() {
    let report = diff_js("go();\n", "debugger;\ngo();\n");
    assert_eq!(categories(&report), vec![ChangeCategory::Unclassified]);
    let record = &report.changes[0];
    assert_eq!(record.certainty, Certainty::Heuristic);
    assert_eq!(record.node_kind, NodeKind::Program);
    assert!(record.note.as_deref().unwrap().starts_with("no rule for Program -> Program"));
    assert_eq!(report.diagnostics.unclassified, 1);
}

#[test]
fn test_read_of_rebound_name_is_a_data_dependency() {
    let report = diff_js(
        "var port = 8080;\nserver.listen(port);\n",
        "var port = lookupPort();\nserver.listen(port);\n",
    );
    assert_eq!(report.dependencies.len(), 1);
    let dependency = &report.dependencies[0];
    assert_eq!(dependency.kind, DependencyKind::Data);
    assert_eq!(dependency.name.as_deref(), Some("port"));
    assert_eq!(dependency.span.start_line, 2);
    assert_eq!(dependency.source.start_line, 1);
    assert_eq!(dependency.certainty, Certainty::Heuristic);

    let report = diff_js("var b = 10;\nuse(b);\n", "var b = 11;\nuse(b);\n");
    let summary: Vec<(DependencyKind, Option<&str>, Certainty)> = report
        .dependencies
        .iter()
        .map(|d| (d.kind, d.name.as_deref(), d.certainty))
        .collect();
    assert_eq!(summary, vec![(DependencyKind::Data, Some("b"), Certainty::Definite)]);
}

#[test]
fn test_statements_under_changed_condition_are_control_dependent() {
    let report = diff_js(
        "function f(a) { if (a > 1) { go(); stop(); } }\n",
        "function f(a) { if (a < 1) { go(); stop(); } }\n",
    );
    assert_eq!(report.dependencies.len(), 2);
    assert!(report.dependencies.iter().all(|d| d.kind == DependencyKind::Control));
    assert!(report.dependencies.iter().all(|d| d.enclosing.as_deref() == Some("f")));
    assert!(report.dependencies[0].span.start_column < report.dependencies[1].span.start_column);
    assert_eq!(report.dependencies[0].source.start_column, 20);

    let guarded = diff_js(GUARD_OLD, GUARD_NEW);
    assert_eq!(guarded.dependencies.len(), 1);
    assert_eq!(guarded.dependencies[0].kind, DependencyKind::Control);
    assert_eq!(guarded.dependencies[0].enclosing.as_deref(), Some("bar"));
}

#[test]
fn test_call_argument_changed() {
    let report = diff_js("console.log(\"hello\");\n", "console.log(\"goodbye\");\n");
    assert_eq!(categories(&report), vec![ChangeCategory::CallArgChanged]);
    assert_eq!(report.changes[0].node_kind, NodeKind::CallExpression);
}

#[test]
fn test_unused_declarations_are_dead_code() {
    let old = r#"
function cookieSession(req, res, next) {
  var secret = req.secret;
  next(secret);
}
"#;
    let new = r#"
function cookieSession(req, res, next) {
  var a = 5;
  var x = a + b;
  var secret = req.secret;
  next(secret);
}
"#;
    let report = diff_js(old, new);
    assert_eq!(
        categories(&report),
        vec![ChangeCategory::DeadCodeInserted, ChangeCategory::DeadCodeInserted]
    );
    assert!(report.changes.iter().all(|c| c.enclosing.as_deref() == Some("cookieSession")));
    assert!(report.changes.iter().all(|c| c.certainty == Certainty::Heuristic));
}

#[test]
fn test_new_unresolved_read_is_potential_bug() {
    let report = diff_js(
        "function dal() { var y = 1; console.log(y); }\n",
        "function dal() { var y = 1; console.log(yy); }\n",
    );
    assert_eq!(categories(&report), vec![ChangeCategory::PotentialBug]);
    let record = &report.changes[0];
    assert_eq!(record.certainty, Certainty::Heuristic);
    assert_eq!(record.note.as_deref(), Some("reads unresolved `yy`"));
}

#[test]
fn test_statement_moved_between_functions() {
    let report = diff_js(
        "function a() { console.log(\"one\", 1); }\nfunction b() { console.log(\"two\", 2); }\n",
        "function a() { }\nfunction b() { console.log(\"two\", 2); console.log(\"one\", 1); }\n",
    );
    assert_eq!(categories(&report), vec![ChangeCategory::StatementMoved]);
    assert_eq!(report.changes[0].enclosing.as_deref(), Some("b"));
}

#[test]
fn test_inserted_function_is_a_declaration() {
    let report = diff_js(
        "function foo() { return 1; }\n",
        "function foo() { return 1; }\nfunction baz() { return 2; }\n",
    );
    assert_eq!(categories(&report), vec![ChangeCategory::DeclarationInserted]);
}

#[test]
fn test_self_diff_is_empty() {
    let report = diff_js(GUARD_NEW, GUARD_NEW);
    assert!(report.is_empty());
    assert!(report.stats.is_empty());
    assert!(report.dependencies.is_empty());
    assert!(!report.unparseable);
    assert_eq!(report.diagnostics.unclassified, 0);
}

#[test]
fn test_classification_is_repeatable() {
    let first = diff_js(TRY_OLD, TRY_NEW);
    let second = diff_js(TRY_OLD, TRY_NEW);
    assert_eq!(first, second);
}

#[test]
fn test_unparseable_unit_is_reported_not_raised() {
    let old = SourceUnit {
        path: None,
        language: Language::JavaScript,
        text: String::new(),
        root: None,
        errors: vec![ParseError::new("parser produced no tree", Span::default())],
    };
    let new = arbor_parser::parse_source("var a = 1;", Language::JavaScript);
    let report = engine().diff_units(&old, &new);
    assert!(report.unparseable);
    assert!(report.changes.is_empty());
    assert_eq!(
        report.error.as_ref().map(|e| e.message.as_str()),
        Some("parser produced no tree")
    );
}

#[test]
fn test_deeply_nested_input_is_diffed_as_partial() {
    let chain = " + 1".repeat(5_000);
    let old = format!("var total = 1{};\nfoo(total);\n", chain);
    let new = format!("var total = 1{};\nbar(total);\n", chain);
    let report = diff_js(&old, &new);
    assert!(!report.unparseable);
    assert_eq!(report.new.status, arbor_core::ParseStatus::Partial);
    assert!(report.new.errors[0].message.starts_with("nesting deeper than"));
    assert_eq!(categories(&report), vec![ChangeCategory::CallTargetChanged]);
}

#[test]
fn test_invalid_utf8_file_is_unparseable() {
    let dir = tempfile::tempdir().unwrap();
    let old = dir.path().join("a.js");
    let new = dir.path().join("b.js");
    std::fs::write(&old, "var a = 1;\n").unwrap();
    std::fs::write(&new, b"var a = \xff;\n").unwrap();
    let report = engine().diff_files(&old, &new, None).unwrap();
    assert!(report.unparseable);
    assert_eq!(report.language, Language::JavaScript);
    assert!(report.error.unwrap().message.starts_with("invalid UTF-8"));
}

#[test]
fn test_missing_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let present = dir.path().join("a.js");
    std::fs::write(&present, "var a = 1;\n").unwrap();
    let result = engine().diff_files(&present, Path::new("/nonexistent/b.js"), None);
    assert!(matches!(result, Err(ConfigError::MissingInput(_))));
}

#[test]
fn test_invalid_options_are_rejected() {
    let options = DiffOptions { similarity_threshold: 1.5, ..DiffOptions::new() };
    assert!(matches!(DiffEngine::new(options), Err(ConfigError::InvalidOption { .. })));
}

#[test]
fn test_groups_restart_and_split_by_declaration() {
    let report = diff_js(
        "function foo() { console.log(\"a\"); }\nfunction bar() { console.log(\"b\"); }\n",
        "function foo() { console.log(\"x\"); }\nfunction bar() { console.log(\"y\"); }\n",
    );
    let groups = report.groups();
    let names: Vec<Option<&str>> = groups.clone().map(|g| g.enclosing).collect();
    assert_eq!(names, vec![Some("foo"), Some("bar")]);
    assert_eq!(groups.count(), 2);
    let again: Vec<usize> = report.groups().map(|g| g.records.len()).collect();
    assert_eq!(again, vec![1, 1]);
}

#[test]
fn test_json_schema_fields() {
    let report = diff_js("console.log(\"hello\");\n", "console.log(\"goodbye\");\n");
    let json: serde_json::Value = serde_json::from_str(&report.render(OutputFormat::Json).unwrap()).unwrap();
    for key in [
        "schema_version", "language", "old", "new", "unparseable", "error", "changes", "dependencies", "stats",
        "diagnostics",
    ] {
        assert!(json.get(key).is_some(), "missing {}", key);
    }
    assert_eq!(json["schema_version"], 1);
    assert_eq!(json["language"], "javascript");
    let change = &json["changes"][0];
    for key in ["edge", "category", "certainty", "node_kind", "old_span", "new_span", "enclosing"] {
        assert!(change.get(key).is_some(), "missing change field {}", key);
    }
    assert_eq!(change["category"], "CallArgChanged");
    assert_eq!(change["certainty"], "definite");
    assert!(change.get("note").is_none());
}

#[test]
fn test_text_and_yaml_formats() {
    let report = diff_js(GUARD_OLD, GUARD_NEW);
    let text = report.render(OutputFormat::Text).unwrap();
    assert!(text.contains("GuardInserted"));
    assert!(text.contains("bar"));
    assert!(text.contains("control dependency"));
    assert!(text.contains("1 changes, 1 dependencies;"));
    let yaml = report.render(OutputFormat::Yaml).unwrap();
    assert!(yaml.contains("schema_version: 1"));
    assert!(yaml.contains("category: GuardInserted"));
    assert_eq!("YAML".parse::<OutputFormat>(), Ok(OutputFormat::Yaml));
    assert!("xml".parse::<OutputFormat>().is_err());
}
