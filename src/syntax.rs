//! Syntax utilities: variable discovery, `for`-loop compatibility, coverage
//! checking and loop discovery.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::ast::*;
use crate::pretty::pretty_stmt;

/// Names that parse as identifiers but are not variables.
const RESERVED: &[&str] = &["true", "false"];

/// Calls that are accepted and skipped by the analysis.
pub const SKIPPED_CALLS: &[&str] = &["assert", "assume"];

// ============================================================================
// Variables
// ============================================================================

/// Sorted, distinct variables of a function.
pub fn variables(func: &FuncDef) -> Vec<String> {
    let mut vars = BTreeSet::new();
    for param in &func.params {
        insert_name(&mut vars, &param.name);
    }
    for stmt in &func.body {
        collect_stmt(stmt, &mut vars);
    }
    vars.into_iter().collect()
}

/// Sorted, distinct variables of a single statement (e.g. a loop).
pub fn stmt_variables(stmt: &Stmt) -> Vec<String> {
    let mut vars = BTreeSet::new();
    collect_stmt(stmt, &mut vars);
    vars.into_iter().collect()
}

fn insert_name(vars: &mut BTreeSet<String>, name: &str) {
    if !RESERVED.contains(&name) {
        vars.insert(name.to_string());
    }
}

fn collect_stmt(stmt: &Stmt, vars: &mut BTreeSet<String>) {
    match stmt {
        Stmt::Assign { target, value } => {
            insert_name(vars, target);
            collect_expr(value, vars);
        }
        Stmt::Expr(e) => collect_expr(e, vars),
        Stmt::Decl { vars: decls, .. } => {
            for decl in decls {
                insert_name(vars, &decl.name);
                if let Some(init) = &decl.init {
                    collect_expr(init, vars);
                }
            }
        }
        // the condition of an if does not take part in any flow
        Stmt::If {
            then, otherwise, ..
        } => {
            collect_stmt(then, vars);
            if let Some(otherwise) = otherwise {
                collect_stmt(otherwise, vars);
            }
        }
        Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
            collect_expr(cond, vars);
            collect_stmt(body, vars);
        }
        Stmt::For { body, .. } => {
            if let Some(guard) = loop_compat(stmt) {
                insert_name(vars, &guard);
            }
            collect_stmt(body, vars);
        }
        Stmt::Block(stmts) => {
            for s in stmts {
                collect_stmt(s, vars);
            }
        }
        Stmt::Return(Some(e)) => collect_expr(e, vars),
        Stmt::Return(None) | Stmt::Break | Stmt::Continue | Stmt::Empty => {}
    }
}

fn collect_expr(expr: &Expr, vars: &mut BTreeSet<String>) {
    match expr {
        Expr::Ident(name) => insert_name(vars, name),
        Expr::Binary { lhs, rhs, .. } => {
            collect_expr(lhs, vars);
            collect_expr(rhs, vars);
        }
        Expr::Unary { expr, .. } | Expr::Cast { expr, .. } => collect_expr(expr, vars),
        Expr::Const(_) | Expr::Call { .. } => {}
    }
}

// ============================================================================
// For loops
// ============================================================================

/// Guard candidates and body variables of a `for` loop.
///
/// The guard is every variable of the condition or read by the initializer
/// that is neither initialized nor stepped. Returns `None` for other statements.
pub fn loop_guard(stmt: &Stmt) -> Option<(Vec<String>, Vec<String>)> {
    let Stmt::For {
        init,
        cond,
        step,
        body,
    } = stmt
    else {
        return None;
    };

    let mut iterators = BTreeSet::new();
    let mut sources = BTreeSet::new();
    for s in init {
        match s {
            Stmt::Decl { vars, .. } => {
                for decl in vars {
                    iterators.insert(decl.name.clone());
                    if let Some(Expr::Ident(src)) = &decl.init {
                        sources.insert(src.clone());
                    }
                }
            }
            Stmt::Assign { target, value } => {
                iterators.insert(target.clone());
                if let Expr::Ident(src) = value {
                    sources.insert(src.clone());
                }
            }
            _ => {}
        }
    }
    for s in step {
        collect_stmt(s, &mut iterators);
    }

    let mut candidates = sources;
    if let Some(cond) = cond {
        collect_expr(cond, &mut candidates);
    }
    let guard: Vec<String> = candidates.difference(&iterators).cloned().collect();
    let body_vars = stmt_variables(body);
    debug!(guard = ?guard, body = ?body_vars, "for-loop variables");
    Some((guard, body_vars))
}

/// The guard variable of an mwp-compatible `for` loop: exactly one guard
/// variable, which the body never mentions.
pub fn loop_compat(stmt: &Stmt) -> Option<String> {
    let (guard, body) = loop_guard(stmt)?;
    let [x] = guard.as_slice() else {
        debug!(guard = ?guard, "no unique loop guard");
        return None;
    };
    if body.contains(x) {
        debug!(guard = %x, "guard variable occurs in loop body");
        return None;
    }
    Some(x.clone())
}

// ============================================================================
// Coverage
// ============================================================================

/// Statements the analysis cannot handle, rendered as C.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Coverage {
    pub unsupported: Vec<String>,
}

impl Coverage {
    pub fn check(func: &FuncDef) -> Coverage {
        let mut coverage = Coverage::default();
        for stmt in &func.body {
            coverage.visit(stmt);
        }
        coverage
    }

    pub fn check_stmt(stmt: &Stmt) -> Coverage {
        let mut coverage = Coverage::default();
        coverage.visit(stmt);
        coverage
    }

    /// Everything is analyzable.
    pub fn is_full(&self) -> bool {
        self.unsupported.is_empty()
    }

    /// Log each unsupported statement.
    pub fn report(&self, name: &str) {
        for (i, stmt) in self.unsupported.iter().enumerate() {
            warn!(
                "{}: unsupported syntax ({} of {}): {}",
                name,
                i + 1,
                self.unsupported.len(),
                stmt.replace('\n', " ")
            );
        }
    }

    fn visit(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::If {
                then, otherwise, ..
            } => {
                self.visit(then);
                if let Some(otherwise) = otherwise {
                    self.visit(otherwise);
                }
            }
            Stmt::While { body, .. } | Stmt::DoWhile { body, .. } => self.visit(body),
            Stmt::For { body, .. } if loop_compat(stmt).is_some() => self.visit(body),
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.visit(s);
                }
            }
            other if !is_supported(other) => self.unsupported.push(pretty_stmt(other)),
            _ => {}
        }
    }
}

/// Remove unsupported statements from a function body.
pub fn strip_unsupported(func: &FuncDef) -> FuncDef {
    FuncDef {
        body: strip_block(&func.body),
        ..func.clone()
    }
}

/// Remove unsupported statements below `stmt`; `None` if `stmt` itself goes.
pub fn strip_stmt(stmt: &Stmt) -> Option<Stmt> {
    fn body(s: &Stmt) -> Box<Stmt> {
        Box::new(strip_stmt(s).unwrap_or(Stmt::Empty))
    }
    match stmt {
        Stmt::If {
            cond,
            then,
            otherwise,
        } => Some(Stmt::If {
            cond: cond.clone(),
            then: body(then),
            otherwise: otherwise.as_deref().and_then(strip_stmt).map(Box::new),
        }),
        Stmt::While { cond, body: b } => Some(Stmt::While {
            cond: cond.clone(),
            body: body(b),
        }),
        Stmt::DoWhile { body: b, cond } => Some(Stmt::DoWhile {
            body: body(b),
            cond: cond.clone(),
        }),
        Stmt::For {
            init,
            cond,
            step,
            body: b,
        } if loop_compat(stmt).is_some() => Some(Stmt::For {
            init: init.clone(),
            cond: cond.clone(),
            step: step.clone(),
            body: body(b),
        }),
        Stmt::Block(stmts) => Some(Stmt::Block(strip_block(stmts))),
        other if is_supported(other) => Some(other.clone()),
        _ => None,
    }
}

fn strip_block(stmts: &[Stmt]) -> Vec<Stmt> {
    stmts.iter().filter_map(strip_stmt).collect()
}

/// Support check for statements without sub-statements (and for
/// incompatible `for` loops, which are unsupported as a whole).
fn is_supported(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Assign { value, .. } => match value.uncast() {
            e @ (Expr::Binary { .. } | Expr::Const(_) | Expr::Ident(_) | Expr::Unary { .. }) => {
                expr_supported(e)
            }
            _ => false,
        },
        Stmt::Expr(e) | Stmt::Return(Some(e)) => expr_supported(e),
        Stmt::Decl { vars, .. } => vars.iter().all(|d| d.init.is_none()),
        Stmt::For { .. } => loop_compat(stmt).is_some(),
        _ => true,
    }
}

fn expr_supported(expr: &Expr) -> bool {
    match expr {
        Expr::Const(_) | Expr::Ident(_) => true,
        Expr::Binary { op, lhs, rhs } => {
            let atomic = |e: &Expr| matches!(e.uncast(), Expr::Const(_) | Expr::Ident(_));
            op.is_arithmetic() && atomic(lhs) && atomic(rhs)
        }
        Expr::Unary { expr, .. } => {
            matches!(
                **expr,
                Expr::Ident(_) | Expr::Const(_) | Expr::Cast { .. } | Expr::Unary { .. }
            ) && expr_supported(expr)
        }
        Expr::Cast { expr, .. } => expr_supported(expr),
        Expr::Call { name, .. } => SKIPPED_CALLS.contains(&name.as_str()),
    }
}

// ============================================================================
// Loops
// ============================================================================

/// All loops of a function, outer loops before the loops they contain.
///
/// Incompatible `for` loops are not listed, but loops inside them are.
pub fn find_loops(func: &FuncDef) -> Vec<&Stmt> {
    let mut loops = Vec::new();
    for stmt in &func.body {
        collect_loops(stmt, &mut loops);
    }
    loops
}

fn collect_loops<'a>(stmt: &'a Stmt, loops: &mut Vec<&'a Stmt>) {
    match stmt {
        Stmt::While { body, .. } | Stmt::DoWhile { body, .. } => {
            loops.push(stmt);
            collect_loops(body, loops);
        }
        Stmt::For { body, .. } => {
            if loop_compat(stmt).is_some() {
                loops.push(stmt);
            }
            collect_loops(body, loops);
        }
        Stmt::If {
            then, otherwise, ..
        } => {
            collect_loops(then, loops);
            if let Some(otherwise) = otherwise {
                collect_loops(otherwise, loops);
            }
        }
        Stmt::Block(stmts) => {
            for s in stmts {
                collect_loops(s, loops);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn func(src: &str) -> FuncDef {
        let program = crate::parse(src).expect("parse");
        program.functions[0].node.clone()
    }

    #[test]
    fn test_variables_skip_if_condition() {
        let f = func("int f(int a) { int b; if (c > 0) { b = a; } }");
        assert_eq!(variables(&f), vec!["a", "b"]);
    }

    #[test]
    fn test_variables_exclude_reserved_and_calls() {
        let f = func("void f() { x = true; assert(y > 0); }");
        assert_eq!(variables(&f), vec!["x"]);
    }

    #[test]
    fn test_loop_compat() {
        let f = func("void f(int n) { for (int i = 0; i < n; i++) { x = x + y; } }");
        assert_eq!(loop_compat(&f.body[0]), Some("n".to_string()));

        let g = func("void f(int n) { for (int i = 0; i < n; i++) { n = n + 1; } }");
        assert_eq!(loop_compat(&g.body[0]), None);
    }

    #[test]
    fn test_coverage_strips() {
        let f = func("void f() { x = y / z; x = y + z; }");
        let coverage = Coverage::check(&f);
        assert_eq!(coverage.unsupported, vec!["x = y / z;"]);
        let stripped = strip_unsupported(&f);
        assert_eq!(stripped.body.len(), 1);
        assert!(Coverage::check(&stripped).is_full());
    }

    #[test]
    fn test_find_loops_order() {
        let f = func("void f() { while (a) { while (b) { x = x + 1; } } do { y = y; } while (c); }");
        let loops = find_loops(&f);
        assert_eq!(loops.len(), 3);
        assert!(matches!(loops[0], Stmt::While { cond: Expr::Ident(c), .. } if c == "a"));
        assert!(matches!(loops[1], Stmt::While { cond: Expr::Ident(c), .. } if c == "b"));
        assert!(matches!(loops[2], Stmt::DoWhile { .. }));
    }
}
