//! Unit tests for the analysis engine

use mwp::analysis::{analyze_body, analyze_function, analyze_loops, analyze_program, inspect_loop};
use mwp::Scalar::{I, M, P, W};
use mwp::*;

fn program(src: &str) -> Program {
    parse(src).expect("parse should succeed")
}

fn func(src: &str) -> FuncDef {
    program(src).functions[0].node.clone()
}

fn body(src: &str) -> Vec<Stmt> {
    func(&format!("void f() {{ {} }}", src)).body
}

fn entry<'r>(relation: &'r Relation, row: &str, col: &str) -> &'r Polynomial {
    let i = relation.position(row).expect("row variable");
    let j = relation.position(col).expect("column variable");
    relation.matrix().get(i, j)
}

fn options() -> AnalysisOptions {
    AnalysisOptions::default()
}

// ============================================================================
// Assignments
// ============================================================================

#[test]
fn test_doubling_assignment() {
    let out = analyze_body(&body("X1 = X1 + X1;"), 0, &options()).unwrap();
    assert_eq!(out.relation.variables(), &["X1"]);
    assert_eq!(
        entry(&out.relation, "X1", "X1"),
        &Polynomial::from_scalars(0, [W, P, W])
    );
}

#[test]
fn test_sum_of_distinct_operands() {
    let out = analyze_body(&body("x = y + z;"), 0, &options()).unwrap();
    assert_eq!(entry(&out.relation, "x", "x"), &Polynomial::zero());
    assert_eq!(
        entry(&out.relation, "y", "x"),
        &Polynomial::from_scalars(0, [W, M, P])
    );
    assert_eq!(
        entry(&out.relation, "z", "x"),
        &Polynomial::from_scalars(0, [W, P, M])
    );
    assert_eq!(entry(&out.relation, "y", "y"), &Polynomial::unit());
}

#[test]
fn test_product_assignment() {
    let out = analyze_body(&body("x = x * y;"), 0, &options()).unwrap();
    let weak = Polynomial::from_scalars(0, [W; 3]);
    assert_eq!(entry(&out.relation, "x", "x"), &weak);
    assert_eq!(entry(&out.relation, "y", "x"), &weak);
}

#[test]
fn test_constant_operand() {
    let out = analyze_body(&body("x = (int) y - 4;"), 0, &options()).unwrap();
    assert_eq!(out.index, 1);
    assert_eq!(entry(&out.relation, "x", "x"), &Polynomial::zero());
    assert_eq!(
        entry(&out.relation, "y", "x"),
        &Polynomial::from_scalars(0, [M; 3])
    );
}

#[test]
fn test_constant_binary_consumes_nothing() {
    let out = analyze_body(&body("x = 2 * 3; y = y + 1;"), 0, &options()).unwrap();
    assert_eq!(out.index, 1);
    assert_eq!(entry(&out.relation, "x", "x"), &Polynomial::zero());
    assert_eq!(
        entry(&out.relation, "y", "y"),
        &Polynomial::from_scalars(0, [M; 3])
    );
}

#[test]
fn test_copy_overwrites_target() {
    let out = analyze_body(&body("x = y;"), 0, &options()).unwrap();
    assert_eq!(entry(&out.relation, "x", "x"), &Polynomial::zero());
    assert_eq!(entry(&out.relation, "y", "x"), &Polynomial::unit());
}

#[test]
fn test_sequence_composes() {
    let out = analyze_body(&body("y = x; z = y;"), 0, &options()).unwrap();
    assert_eq!(entry(&out.relation, "x", "z"), &Polynomial::unit());
    assert_eq!(entry(&out.relation, "z", "z"), &Polynomial::zero());
}

#[test]
fn test_skipped_statements() {
    let out = analyze_body(
        &body("int a, b; assert(a > 0); return a; ;"),
        0,
        &options(),
    )
    .unwrap();
    assert_eq!(out.index, 0);
    assert_eq!(out.relation, Relation::identity(["a", "b"]));
}

#[test]
fn test_unsupported_statement_is_identity() {
    let out = analyze_body(&body("x = y / z;"), 0, &options()).unwrap();
    assert_eq!(out.index, 0);
    assert_eq!(out.relation, Relation::identity(["x", "y", "z"]));
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_if_sums_branches() {
    let out = analyze_body(&body("if (c) { x = y; } else { x = 0; }"), 0, &options()).unwrap();
    assert_eq!(entry(&out.relation, "y", "x"), &Polynomial::unit());
    assert_eq!(entry(&out.relation, "x", "x"), &Polynomial::zero());
}

#[test]
fn test_if_without_else_keeps_old_value() {
    let out = analyze_body(&body("if (c) { x = y; }"), 0, &options()).unwrap();
    assert_eq!(entry(&out.relation, "y", "x"), &Polynomial::unit());
    assert_eq!(entry(&out.relation, "x", "x"), &Polynomial::unit());
}

#[test]
fn test_while_loop_diagonal_infinite() {
    let stmts = body("while (X0 < 10) { X0 = X0 + X0; }");
    let fin = AnalysisOptions {
        fin: true,
        ..options()
    };
    let out = analyze_body(&stmts, 0, &fin).unwrap();
    assert!(out.is_infinite());
    assert!(out.delta_infinite);
    assert!(entry(&out.relation, "X0", "X0").some_infinity());
}

#[test]
fn test_while_loop_with_constant_step_is_finite() {
    let out = analyze_body(&body("while (i < n) { i = i + 1; }"), 0, &options()).unwrap();
    assert!(!out.is_infinite());
    assert_eq!(entry(&out.relation, "i", "i"), &Polynomial::unit());
}

#[test]
fn test_while_loop_rejects_polynomial_flow() {
    let out = analyze_body(&body("while (i < n) { x = y + z; }"), 0, &options()).unwrap();
    assert!(!out.is_infinite());
    assert_eq!(out.choices.first(), Some(vec![0]));
    assert_eq!(out.choices.allowed_at(0), std::collections::BTreeSet::from([0]));
    let yx = entry(&out.relation, "y", "x");
    assert_eq!(yx.evaluate(&[2]), I);
    assert_eq!(yx.evaluate(&[0]), W);
}

#[test]
fn test_for_loop_rules() {
    let stmts = body("for (i = 0; i < n; i++) { x = x + y; }");
    assert!(analyze_body(&stmts, 0, &options()).unwrap().is_infinite());

    let bounded = AnalysisOptions {
        bounded_for: true,
        ..options()
    };
    let out = analyze_body(&stmts, 0, &bounded).unwrap();
    assert!(!out.is_infinite());
    assert_eq!(out.choices.first(), Some(vec![1]));
}

#[test]
fn test_for_loop_resets_guard() {
    let stmts = body("for (i = 0; i < n; i++) { x = y; }");
    let out = analyze_body(&stmts, 0, &options()).unwrap();
    assert_eq!(out.index, 0);
    assert_eq!(entry(&out.relation, "n", "n"), &Polynomial::unit());
    assert_eq!(entry(&out.relation, "y", "x"), &Polynomial::unit());
}

#[test]
fn test_numbering_starts_at_offset() {
    let out = analyze_body(&body("x = x + y;"), 4, &options()).unwrap();
    assert_eq!(out.index, 5);
    assert_eq!(
        entry(&out.relation, "y", "x"),
        &Polynomial::from_scalars(4, [W, P, M])
    );
}

// ============================================================================
// Functions and programs
// ============================================================================

#[test]
fn test_function_bound() {
    let f = func("int foo(int x, int y) { x = x + y; }");
    let result = analyze_function(&f, &options()).unwrap();
    assert!(!result.infinite);
    assert_eq!(result.index, 1);
    assert_eq!(result.variables, vec!["x", "y"]);
    assert_eq!(result.n_bounds(), 3);
    let bound = result.bound.as_ref().unwrap();
    assert_eq!(bound.get("x").unwrap().triple(), ";x,y;");
    assert_eq!(bound.get("y").unwrap().triple(), "y;;");
    assert!(result.relation.is_some());
}

#[test]
fn test_function_infinite_stops_early() {
    let f = func("int foo(int x) { while (x > 0) { x = x * x; } }");
    let result = analyze_function(&f, &options()).unwrap();
    assert!(result.infinite);
    assert!(result.relation.is_none());
    assert!(result.choices.is_none());
    assert!(result.bound.is_none());
}

#[test]
fn test_function_infinite_with_fin_reports_flows() {
    let f = func("int foo(int x) { while (x > 0) { x = x * x; } }");
    let fin = AnalysisOptions {
        fin: true,
        ..options()
    };
    let result = analyze_function(&f, &fin).unwrap();
    assert!(result.infinite);
    assert!(result.relation.is_some());
    assert_eq!(result.inf_flows.as_deref(), Some("x ➔ x"));
}

#[test]
fn test_program_strict_mode() {
    let p = program("int f(int x) { x = x / 2; x = x + 1; }\nint g(int y) { y = y + 1; }");
    let relaxed = analyze_program(&p, &options()).unwrap();
    assert_eq!(relaxed.relations.keys().collect::<Vec<_>>(), vec!["f", "g"]);
    assert_eq!(relaxed.function("f").unwrap().index, 1);

    let strict = AnalysisOptions {
        strict: true,
        ..options()
    };
    let report = analyze_program(&p, &strict).unwrap();
    assert_eq!(report.relations.keys().collect::<Vec<_>>(), vec!["g"]);
    assert_eq!(report.program.n_func, 2);
}

#[test]
fn test_program_info_counts() {
    let p = program("void f(int n) { while (i < n) { for (j = 0; j < m; j++) { x = x + 1; } } }");
    let report = analyze_program(&p, &options()).unwrap();
    assert_eq!(report.program.n_func, 1);
    assert_eq!(report.program.n_loops, 2);
    assert_eq!(report.program.n_func_vars, 4);
}

// ============================================================================
// Loops
// ============================================================================

#[test]
fn test_loop_classification() {
    let lp = &body("while (i < n) { x = y + z; }")[0];
    let result = inspect_loop(lp, &options()).unwrap();
    assert_eq!(result.linear(), vec!["i", "n", "y", "z"]);
    assert_eq!(result.weak(), vec!["x"]);
    assert!(result.poly().is_empty() && result.unbounded().is_empty());
    let x = &result.variables["x"];
    assert_eq!(x.growth, Some(W));
    assert_eq!(x.bound.as_ref().unwrap().expression(false), "max(x,y+z)");
}

#[test]
fn test_loop_partial_results() {
    let lp = &body("while (i < n) { x = x + y; }")[0];
    let result = inspect_loop(lp, &options()).unwrap();
    assert_eq!(result.unbounded(), vec!["x"]);
    assert_eq!(result.linear(), vec!["i", "n", "y"]);
}

#[test]
fn test_loops_report() {
    let p = program(
        "void f(int n) { while (i < n) { i = i + 1; } }\nvoid g() { x = 1; }",
    );
    let report = analyze_loops(&p, &options()).unwrap();
    assert!(report.relations.is_empty());
    assert_eq!(report.loops["f"].loops.len(), 1);
    assert!(report.loops["g"].loops.is_empty());
    assert_eq!(report.loops["f"].loops[0].code, "while (i < n) {\n    i = i + 1;\n}");
}
