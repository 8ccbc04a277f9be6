//! Unit tests for the C pretty-printer

use mwp::pretty::{pretty_print, pretty_stmt};
use mwp::{parse, Stmt};

fn roundtrip(src: &str) -> String {
    pretty_print(&parse(src).expect("parse should succeed"))
}

fn first_stmt(src: &str) -> Stmt {
    let program = parse(&format!("void f() {{ {} }}", src)).expect("parse should succeed");
    program.functions[0].node.body[0].clone()
}

#[test]
fn test_function_layout() {
    let printed = roundtrip("int foo(int x,unsigned long y){x=y+1;return x;}");
    assert_eq!(
        printed,
        "int foo(int x, unsigned long y) {\n    x = y + 1;\n    return x;\n}\n"
    );
}

#[test]
fn test_functions_separated_by_blank_line() {
    let printed = roundtrip("void a() { } void b() { }");
    assert_eq!(printed, "void a() {\n}\n\nvoid b() {\n}\n");
}

#[test]
fn test_if_else_blocks() {
    let s = first_stmt("if (x > y) { x = x - y; } else { y = y - x; }");
    assert_eq!(
        pretty_stmt(&s),
        "if (x > y) {\n    x = x - y;\n} else {\n    y = y - x;\n}"
    );
}

#[test]
fn test_unbraced_bodies() {
    let s = first_stmt("if (x > y) x = x - y; else y = y - x;");
    assert_eq!(
        pretty_stmt(&s),
        "if (x > y)\n    x = x - y;\nelse\n    y = y - x;"
    );
}

#[test]
fn test_for_header() {
    let s = first_stmt("for (int i = 0; i < n; i++, j--) x = x + 1;");
    assert_eq!(pretty_stmt(&s), "for (int i = 0; i < n; i++, j--)\n    x = x + 1;");

    let s = first_stmt("for (;;) { }");
    assert_eq!(pretty_stmt(&s), "for (;;) {\n}");
}

#[test]
fn test_do_while() {
    let s = first_stmt("do { x = x * 2; } while (x < n);");
    assert_eq!(pretty_stmt(&s), "do {\n    x = x * 2;\n} while (x < n);");
}

#[test]
fn test_compound_assignment_is_lowered() {
    let s = first_stmt("x -= y * z;");
    assert_eq!(pretty_stmt(&s), "x = x - y * z;");

    // the operand keeps its grouping
    let s = first_stmt("x *= y + z;");
    assert_eq!(pretty_stmt(&s), "x = x * (y + z);");
}

#[test]
fn test_casts_and_calls() {
    let s = first_stmt("x = (unsigned int) (y + 1) + f(a, -b);");
    assert_eq!(pretty_stmt(&s), "x = (unsigned int) (y + 1) + f(a, -b);");
}

#[test]
fn test_nested_blocks_indent() {
    let s = first_stmt("while (a) { while (b) { x++; } }");
    assert_eq!(
        pretty_stmt(&s),
        "while (a) {\n    while (b) {\n        x++;\n    }\n}"
    );
}

#[test]
fn test_declarations() {
    let s = first_stmt("long a, b = 2;");
    assert_eq!(pretty_stmt(&s), "long a, b = 2;");
}
