//! Unit tests for arbor-core

use crate::test_utils::*;
use crate::*;

fn tree_of(root: SyntaxNode) -> CanonicalTree {
    normalize(root, &DiffOptions::default())
}

fn find_ident(tree: &CanonicalTree, name: &str, nth: usize) -> TreeNodeId {
    tree.iter()
        .filter(|n| n.kind == NodeKind::Identifier && n.label() == Some(name))
        .nth(nth)
        .map(|n| n.id)
        .unwrap()
}

fn seed_program() -> SyntaxNode {
    program(vec![
        func("bar", &[], vec![ret(Some(num("1")))]),
        var("a", Some(call(ident("require"), vec![string("'foo'")]))),
        var("b", Some(num("10"))),
        var("c", Some(ident("b"))),
        var("d", Some(call(ident("bar"), vec![]))),
        var("f", Some(ident("module"))),
        var("g", Some(member(ident("module"), "exports"))),
    ])
}

#[test]
fn test_seed_binding_classification() {
    let tree = tree_of(seed_program());
    let sites: Vec<String> = binding_sites(&tree)
        .into_iter()
        .map(|s| format!("{}={}", s.name, s.class))
        .collect();
    insta::assert_debug_snapshot!(sites, @r###"
    [
        "a=TOP",
        "b=CHANGED",
        "c=CHANGED",
        "d=TOP",
        "f=UNCHANGED",
        "g=UNCHANGED",
    ]
    "###);
}

#[test]
fn test_host_globals_are_fresh_values() {
    let tree = tree_of(program(vec![
        var("a", Some(ident("arguments"))),
        var("c", Some(ident("console"))),
        var("p", Some(member(ident("process"), "env"))),
        var("w", Some(ident("window"))),
        var("e", Some(ident("exports"))),
    ]));
    let sites = binding_sites(&tree);
    let classes: Vec<(&str, BindingClass)> = sites.iter().map(|s| (s.name.as_str(), s.class)).collect();
    assert_eq!(
        classes,
        vec![
            ("a", BindingClass::Changed),
            ("c", BindingClass::Changed),
            ("p", BindingClass::Changed),
            ("w", BindingClass::Changed),
            ("e", BindingClass::Unchanged),
        ]
    );
    assert!(sites.iter().all(|s| s.certain));
}

#[test]
fn test_require_is_certain_but_opaque_call_is_assumed() {
    let tree = tree_of(seed_program());
    let sites = binding_sites(&tree);
    let a = sites.iter().find(|s| s.name == "a").unwrap();
    let d = sites.iter().find(|s| s.name == "d").unwrap();
    assert!(a.certain);
    assert!(!d.certain);
}

#[test]
fn test_alias_of_top_is_top() {
    let tree = tree_of(program(vec![
        var("conf", Some(call(ident("require"), vec![string("'conf'")]))),
        var("alias", Some(ident("conf"))),
        var("empty", None),
    ]));
    let sites = binding_sites(&tree);
    assert_eq!(sites[1].class, BindingClass::Top);
    assert_eq!(sites[2].class, BindingClass::Changed);
}

#[test]
fn test_inner_binding_shadows_outer() {
    // function cam(x) { function erp(x) { return x; } return x; }
    let tree = tree_of(program(vec![func(
        "cam",
        &["x"],
        vec![func("erp", &["x"], vec![ret(Some(ident("x")))]), ret(Some(ident("x")))],
    )]));
    let outer_param = find_ident(&tree, "x", 0);
    let inner_param = find_ident(&tree, "x", 1);
    let inner_use = find_ident(&tree, "x", 2);
    let outer_use = find_ident(&tree, "x", 3);

    assert_eq!(tree.node(inner_use).resolution.and_then(|r| r.binding()), Some(inner_param));
    assert_eq!(tree.node(outer_use).resolution.and_then(|r| r.binding()), Some(outer_param));
    assert_eq!(tree.node(inner_param).role, Some(IdentRole::Binding));
    assert_eq!(tree.node(inner_use).role, Some(IdentRole::Use));
    assert_eq!(tree.enclosing_declaration(inner_use).as_deref(), Some("cam.erp"));
}

#[test]
fn test_unresolved_and_builtin_references() {
    let tree = tree_of(program(vec![func("dal", &[], vec![log(member(ident("y"), "greeting"))])]));
    let y = find_ident(&tree, "y", 0);
    let console = find_ident(&tree, "console", 0);
    assert_eq!(tree.node(y).resolution, Some(Resolution::Unresolved));
    assert_eq!(tree.node(console).resolution, Some(Resolution::Builtin));
}

#[test]
fn test_comments_and_quoting_do_not_change_hash() {
    let plain = tree_of(program(vec![log(string("\"hello\""))]));
    let noisy = tree_of(program(vec![comment("// greet"), log(string("'hello'"))]));
    assert_eq!(plain.hash(plain.root()), noisy.hash(noisy.root()));
}

#[test]
fn test_string_concatenation_collapses() {
    let split = tree_of(program(vec![log(binary("+", string("'Bar '"), string("'says'")))]));
    let whole = tree_of(program(vec![log(string("'Bar says'"))]));
    assert_eq!(split.hash(split.root()), whole.hash(whole.root()));
}

#[test]
fn test_prototype_assignment_is_extension() {
    let tree = tree_of(program(vec![expr(assign(
        member(member(ident("String"), "prototype"), "trim"),
        node(NodeKind::FunctionDef, vec![node(NodeKind::Parameters, vec![]), block(vec![])]),
    ))]));
    assert!(tree.iter().any(|n| n.kind == NodeKind::PrototypeExtension));
    assert!(!tree.iter().any(|n| n.kind == NodeKind::Assignment));
}

#[test]
fn test_identical_subtrees_hash_equal() {
    let tree = tree_of(program(vec![
        func("foo", &[], vec![log(string("'same'"))]),
        func("bar", &[], vec![log(string("'same'"))]),
        func("gaf", &[], vec![log(string("'other'"))]),
    ]));
    let statements: Vec<&TreeNode> = tree.iter().filter(|n| n.kind == NodeKind::ExpressionStatement).collect();
    assert_eq!(statements[0].hash, statements[1].hash);
    assert_ne!(statements[0].hash, statements[2].hash);
    assert_eq!(statements[0].shape, statements[2].shape);
}

#[test]
fn test_self_diff_is_identity() {
    let old = tree_of(seed_program());
    let new = tree_of(seed_program());
    let alignment = match_trees(&old, &new, &DiffOptions::default());
    assert!(alignment.is_identity());
    assert_eq!(alignment.edges.len(), old.len());
    assert!(alignment.stats().is_empty());
}

#[test]
fn test_greedy_matching_ignores_sibling_order() {
    let statements: Vec<SyntaxNode> = (0..9)
        .map(|i| log(string(&format!("'line {}'", i))))
        .collect();
    let mut shuffled: Vec<SyntaxNode> = statements.iter().rev().cloned().collect();
    shuffled.push(log(binary("+", ident("x"), num("1"))));

    let old = tree_of(program(vec![func("main", &[], statements)]));
    let new = tree_of(program(vec![func("main", &[], shuffled)]));
    let alignment = match_trees(&old, &new, &DiffOptions::default());

    for statement in old.iter().filter(|n| n.kind == NodeKind::ExpressionStatement) {
        let edge = alignment.edge_for_old(statement.id);
        assert_eq!(edge.kind, MatchKind::Unchanged, "statement {} was not kept", statement.id);
    }
    let inserted: Vec<&MatchEdge> = alignment
        .edges
        .iter()
        .filter(|e| e.kind == MatchKind::Inserted)
        .collect();
    assert!(!inserted.is_empty());
    assert!(inserted.iter().all(|e| e.new.is_some_and(|n| new.node(n).depth >= 3)));
}

#[test]
fn test_every_node_has_exactly_one_edge() {
    let old = tree_of(program(vec![
        func("foo", &["x"], vec![log(member(ident("x"), "greeting"))]),
        var("port", Some(num("80"))),
    ]));
    let new = tree_of(program(vec![
        var("port", Some(call(ident("lookup"), vec![]))),
        func("foo", &["y"], vec![log(member(ident("y"), "name"))]),
        expr(call(ident("start"), vec![])),
    ]));
    let alignment = match_trees(&old, &new, &DiffOptions::default());

    let mut old_seen = vec![0; old.len()];
    let mut new_seen = vec![0; new.len()];
    for edge in &alignment.edges {
        if let Some(o) = edge.old {
            old_seen[o.index()] += 1;
        }
        if let Some(n) = edge.new {
            new_seen[n.index()] += 1;
        }
    }
    assert!(old_seen.iter().all(|c| *c == 1));
    assert!(new_seen.iter().all(|c| *c == 1));
}

#[test]
fn test_guard_insertion_only_inserts_the_guard() {
    let body = || log(binary("+", string("'Bar says: '"), member(ident("x"), "greeting")));
    let old = tree_of(program(vec![
        func("foo", &[], vec![log(string("'foo'"))]),
        func("bar", &[], vec![body()]),
    ]));
    let new = tree_of(program(vec![
        func("foo", &[], vec![log(string("'foo'"))]),
        func("bar", &[], vec![if_then(unary("!", ident("x")), ret(None)), body()]),
    ]));
    let alignment = match_trees(&old, &new, &DiffOptions::default());

    let inserted_roots: Vec<TreeNodeId> = alignment
        .edges
        .iter()
        .filter(|e| e.kind == MatchKind::Inserted)
        .filter_map(|e| e.new)
        .filter(|n| new.parent(*n).is_some_and(|p| alignment.counterpart_of_new(p).is_some()))
        .collect();
    assert_eq!(inserted_roots.len(), 1);
    assert_eq!(new.kind(inserted_roots[0]), NodeKind::Conditional);
    assert_eq!(alignment.stats().deleted, 0);
}

#[test]
fn test_statement_moved_between_functions() {
    let moved = || log(binary("+", string("'total: '"), member(ident("order"), "total")));
    let old = tree_of(program(vec![
        func("first", &[], vec![moved(), log(string("'first'"))]),
        func("second", &[], vec![log(string("'second'"))]),
    ]));
    let new = tree_of(program(vec![
        func("first", &[], vec![log(string("'first'"))]),
        func("second", &[], vec![log(string("'second'")), moved()]),
    ]));
    let alignment = match_trees(&old, &new, &DiffOptions::default());
    assert_eq!(alignment.stats().moved, 1);
    let moved_edge = alignment.edges.iter().find(|e| e.kind == MatchKind::Moved).unwrap();
    assert_eq!(old.kind(moved_edge.old.unwrap()), NodeKind::ExpressionStatement);
}

#[test]
fn test_renamed_identifier_edge() {
    let old = tree_of(program(vec![expr(call(ident("fetch"), vec![ident("url")]))]));
    let new = tree_of(program(vec![expr(call(ident("fetch"), vec![ident("uri")]))]));
    let alignment = match_trees(&old, &new, &DiffOptions::default());
    let renamed: Vec<&MatchEdge> = alignment.edges.iter().filter(|e| e.kind == MatchKind::Renamed).collect();
    assert_eq!(renamed.len(), 1);
    assert!(renamed[0].label_changed);
}

#[test]
fn test_sibling_ceiling_falls_back_to_delete_insert() {
    let options = DiffOptions { max_sibling_cells: 1, ..DiffOptions::default() };
    let old = tree_of(program(vec![
        var("a", Some(num("1"))),
        var("b", Some(num("2"))),
    ]));
    let new = tree_of(program(vec![
        var("a", Some(num("3"))),
        var("b", Some(num("4"))),
    ]));
    let alignment = match_trees(&old, &new, &options);
    assert!(alignment.diagnostics.budget_exceeded.is_some());
    assert_eq!(alignment.diagnostics.coarse_fallbacks, 1);
    let stats = alignment.stats();
    assert_eq!(stats.deleted as usize + stats.unchanged as usize + stats.updated as usize
        + stats.renamed as usize + stats.moved as usize, old.len());
    assert!(stats.deleted > 0 && stats.inserted > 0);
}

fn numbered_vars(offset: u32) -> SyntaxNode {
    program(
        (0..50)
            .map(|i| var(&format!("v{}", i), Some(num(&(i + offset).to_string()))))
            .collect(),
    )
}

fn assert_total_coverage(old: &CanonicalTree, new: &CanonicalTree, alignment: &Alignment) {
    let old_edges = alignment.edges.iter().filter(|e| e.old.is_some()).count();
    let new_edges = alignment.edges.iter().filter(|e| e.new.is_some()).count();
    assert_eq!(old_edges, old.len());
    assert_eq!(new_edges, new.len());
}

#[test]
fn test_visit_budget_falls_back_to_delete_insert() {
    let options = DiffOptions { node_visit_budget: 1, ..DiffOptions::default() };
    let old = tree_of(numbered_vars(0));
    let new = tree_of(numbered_vars(1000));
    let alignment = match_trees(&old, &new, &options);
    let exceeded = alignment.diagnostics.budget_exceeded.as_ref().unwrap();
    assert_eq!(exceeded.limit, BudgetLimit::NodeVisits);
    assert_eq!(alignment.diagnostics.coarse_fallbacks, 1);
    // Only the program roots stay paired.
    assert_eq!(alignment.stats().updated, 1);
    assert!(alignment.stats().deleted > 0 && alignment.stats().inserted > 0);
    assert_total_coverage(&old, &new, &alignment);
}

#[test]
fn test_wall_clock_budget_falls_back_to_delete_insert() {
    let options = DiffOptions { time_budget_ms: 0, ..DiffOptions::default() };
    let old = tree_of(numbered_vars(0));
    let new = tree_of(numbered_vars(1000));
    let alignment = match_trees(&old, &new, &options);
    let exceeded = alignment.diagnostics.budget_exceeded.as_ref().unwrap();
    assert_eq!(exceeded.limit, BudgetLimit::WallClock);
    assert!(alignment.stats().deleted > 0 && alignment.stats().inserted > 0);
    assert_total_coverage(&old, &new, &alignment);
}

#[test]
fn test_similar_statements_pair_as_updated() {
    // save(a, b, c);  ->  save(a, b, c, d);
    let old = tree_of(program(vec![expr(call(ident("save"), vec![ident("a"), ident("b"), ident("c")]))]));
    let new = tree_of(program(vec![expr(call(
        ident("save"),
        vec![ident("a"), ident("b"), ident("c"), ident("d")],
    ))]));
    let statement = old.children(old.root())[0];

    let alignment = match_trees(&old, &new, &DiffOptions::default());
    let edge = alignment.edge_for_old(statement);
    assert_eq!(edge.kind, MatchKind::Updated);
    assert!(!edge.label_changed);
    assert_eq!(alignment.stats().inserted, 1);

    // Dice is 8/13 here, so a stricter threshold refuses the pair.
    let strict = DiffOptions { similarity_threshold: 0.9, ..DiffOptions::default() };
    let alignment = match_trees(&old, &new, &strict);
    assert_eq!(alignment.edge_for_old(statement).kind, MatchKind::Deleted);
}

#[test]
fn test_line_mode_aligns_only_top_level() {
    let options = DiffOptions { line_mode: true, ..DiffOptions::default() };
    let old = tree_of(program(vec![var("a", Some(num("1"))), log(string("'x'"))]));
    let new = tree_of(program(vec![var("a", Some(num("2"))), log(string("'x'"))]));
    let alignment = match_trees(&old, &new, &options);
    let stats = alignment.stats();
    assert_eq!(stats.updated, 1);
    assert_eq!(stats.deleted, 4);
    assert_eq!(stats.inserted, 4);
}

#[test]
fn test_injected_statements_are_dead() {
    let tree = tree_of(program(vec![func(
        "cookieSession",
        &["req", "res", "next"],
        vec![
            var("a", Some(num("5"))),
            var("x", Some(binary("+", ident("a"), ident("b")))),
            var("secret", Some(member(ident("req"), "secret"))),
            expr(call(ident("next"), vec![ident("secret")])),
        ],
    )]));
    let liveness: Vec<(String, Option<bool>)> = tree
        .iter()
        .filter(|n| n.kind == NodeKind::Declarator)
        .map(|n| (tree.declared_name(n.id).unwrap().to_string(), n.live))
        .collect();
    assert_eq!(
        liveness,
        vec![
            ("a".to_string(), Some(false)),
            ("x".to_string(), Some(false)),
            ("secret".to_string(), Some(true)),
        ]
    );
}

#[test]
fn test_usedef_graph_roots() {
    let tree = tree_of(program(vec![var("n", Some(num("1"))), log(ident("n"))]));
    let graph = UseDefGraph::build(&tree);
    assert_eq!(graph.unit_count(), 2);
    assert_eq!(graph.roots().len(), 1);
    assert_eq!(graph.live_units().len(), 2);
}

#[test]
fn test_options_from_toml() {
    let options = DiffOptions::from_toml_str(
        "similarity_threshold = 0.7\nstable_globals = [\"module\"]\n",
        std::path::Path::new("arbor.toml"),
    )
    .unwrap();
    assert!((options.similarity_threshold - 0.7).abs() < f64::EPSILON);
    assert_eq!(options.stable_globals, vec!["module".to_string()]);
    assert_eq!(options.min_anchor_size, 2);
}

#[test]
fn test_invalid_options_are_rejected() {
    let err = DiffOptions::from_toml_str("similarity_threshold = 1.5", std::path::Path::new("arbor.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidOption { name: "similarity_threshold", .. }));

    let err = DiffOptions::from_toml_str("min_anchor_size = \"big\"", std::path::Path::new("arbor.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::ConfigParse { .. }));
}

#[test]
fn test_language_detection() {
    assert_eq!(Language::from_path(std::path::Path::new("a/b.js")), Some(Language::JavaScript));
    assert_eq!(Language::from_path(std::path::Path::new("mod.py")), Some(Language::Python));
    assert_eq!(Language::from_path(std::path::Path::new("README")), None);
    assert_eq!(Language::from_tag("C++"), Some(Language::Cpp));
    assert_eq!(Language::from_tag("cobol"), None);
}

#[test]
fn test_wire_names() {
    assert_eq!(serde_json::to_value(BindingClass::Top).unwrap(), "TOP");
    assert_eq!(serde_json::to_value(MatchKind::Inserted).unwrap(), "inserted");
    assert_eq!(serde_json::to_value(Language::Cpp).unwrap(), "cpp");
    assert_eq!(serde_json::to_value(ParseStatus::Partial).unwrap(), "partial");
}
