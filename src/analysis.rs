//! The mwp analysis engine.
//!
//! A function body is walked depth first. Every statement yields a
//! [`Relation`]; statements in sequence are composed, the two branches of a
//! conditional are summed and a loop body is closed under its fixpoint and
//! then corrected. Every binary assignment consumes one *choice index*: the
//! three values at that index are the three ways the mwp calculus may type it.
//!
//! Infinite entries created by loop corrections are also fed into a
//! [`DeltaGraph`]. Once the graph proves that every choice is infinite, the
//! walk can stop early.

use std::borrow::Cow;
use std::time::Instant;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::algebra::{Delta, Polynomial, Relation, Scalar};
use crate::ast::*;
use crate::bound::Bound;
use crate::choice::{Choices, DeltaGraph};
use crate::error::{MwpError, Result};
use crate::pretty::pretty_stmt;
use crate::result::{AnalysisReport, FuncLoops, FuncResult, LoopResult, ProgramInfo, VResult};
use crate::syntax::{self, Coverage};

/// Values a choice index can take.
pub const DOMAIN: [u8; 3] = [0, 1, 2];

/// Analysis configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Run to completion even when the result is already known to be infinite
    pub fin: bool,
    /// Skip functions with unsupported syntax instead of removing it
    pub strict: bool,
    /// Iteration cap for loop fixpoints
    pub fixpoint_limit: usize,
    /// Correct compatible `for` loops with the bounded-iteration rule
    /// instead of the `while` rule
    pub bounded_for: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            fin: false,
            strict: false,
            fixpoint_limit: 10_000,
            bounded_for: false,
        }
    }
}

/// Result of analyzing a statement list.
#[derive(Clone, Debug)]
pub struct CoreOutput {
    pub relation: Relation,
    /// Next unused choice index
    pub index: usize,
    pub choices: Choices,
    /// The delta graph proved every choice infinite
    pub delta_infinite: bool,
}

impl CoreOutput {
    pub fn is_infinite(&self) -> bool {
        self.delta_infinite || self.choices.is_infinite()
    }
}

// ============================================================================
// Statement walk
// ============================================================================

/// Operand of a binary assignment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Operand<'a> {
    Var(&'a str),
    Const,
}

impl<'a> Operand<'a> {
    fn of(expr: &'a Expr) -> Option<Operand<'a>> {
        match expr.uncast() {
            Expr::Ident(name) => Some(Operand::Var(name)),
            Expr::Const(_) => Some(Operand::Const),
            _ => None,
        }
    }

    fn var(self) -> Option<&'a str> {
        match self {
            Operand::Var(name) => Some(name),
            Operand::Const => None,
        }
    }
}

/// Walk state for one statement list: the choice counter and the graph of
/// infinite deltas. Never shared between functions.
struct Analyzer<'o> {
    options: &'o AnalysisOptions,
    index: usize,
    graph: DeltaGraph,
    delta_infinite: bool,
}

impl<'o> Analyzer<'o> {
    fn new(options: &'o AnalysisOptions, index: usize) -> Self {
        Self {
            options,
            index,
            graph: DeltaGraph::new(DOMAIN.len()),
            delta_infinite: false,
        }
    }

    /// Stop walking: the result is infinite and nobody asked for more.
    fn exhausted(&self) -> bool {
        self.delta_infinite && !self.options.fin
    }

    fn next_index(&mut self) -> usize {
        let index = self.index;
        self.index += 1;
        index
    }

    fn sequence(&mut self, stmts: &[Stmt]) -> Result<Relation> {
        let mut relation = Relation::empty();
        let total = stmts.len();
        for (i, stmt) in stmts.iter().enumerate() {
            debug!("computing relation {} of {}", i + 1, total);
            let next = self.stmt(stmt)?;
            relation = relation.compose(&next);
            if self.exhausted() {
                debug!("delta graph: infinite, exit now");
                break;
            }
        }
        Ok(relation)
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<Relation> {
        match stmt {
            Stmt::Assign { target, value } => Ok(self.assign(stmt, target, value)),
            Stmt::Expr(expr) => Ok(self.expr_stmt(stmt, expr)),
            Stmt::If {
                then, otherwise, ..
            } => self.branch(then, otherwise.as_deref()),
            Stmt::While { body, .. } | Stmt::DoWhile { body, .. } => self.while_loop(body),
            Stmt::For { body, .. } => match syntax::loop_compat(stmt) {
                Some(guard) => self.for_loop(&guard, body),
                None => Ok(unsupported(stmt)),
            },
            Stmt::Block(stmts) => self.sequence(stmts),
            Stmt::Decl { vars, .. } if vars.iter().any(|d| d.init.is_some()) => {
                Ok(unsupported(stmt))
            }
            Stmt::Decl { .. } | Stmt::Return(_) | Stmt::Break | Stmt::Continue | Stmt::Empty => {
                Ok(Relation::empty())
            }
        }
    }

    fn assign(&mut self, stmt: &Stmt, target: &str, value: &Expr) -> Relation {
        match value.uncast() {
            Expr::Binary { op, lhs, rhs } if op.is_arithmetic() => {
                match (Operand::of(lhs), Operand::of(rhs)) {
                    (Some(y), Some(z)) => self.binary(target, *op, y, z),
                    _ => unsupported(stmt),
                }
            }
            Expr::Const(_) => constant(target),
            Expr::Ident(source) if source == target => Relation::empty(),
            Expr::Ident(source) => copy(target, source),
            // operand dependency not modeled
            Expr::Unary { .. } => Relation::identity([target]),
            _ => unsupported(stmt),
        }
    }

    fn expr_stmt(&mut self, stmt: &Stmt, expr: &Expr) -> Relation {
        match expr {
            Expr::Unary { op, expr } if op.is_inc_dec() => match expr.uncast() {
                Expr::Ident(x) => {
                    let op = match op {
                        UnOp::PreInc | UnOp::PostInc => BinOp::Add,
                        _ => BinOp::Sub,
                    };
                    debug!("{} rewritten to {} = {} {} 1", pretty_stmt(stmt), x, x, op);
                    self.binary(x, op, Operand::Var(x), Operand::Const)
                }
                _ => Relation::empty(),
            },
            Expr::Call { name, .. } if !syntax::SKIPPED_CALLS.contains(&name.as_str()) => {
                unsupported(stmt)
            }
            // no variable changes
            _ => Relation::empty(),
        }
    }

    /// `x = y op z` with atomic operands.
    ///
    /// Consumes one choice index when at least one operand is a variable.
    /// With two constant operands the result is `zero({x})` and no index is
    /// taken, since every choice would give the same column.
    fn binary(&mut self, x: &str, op: BinOp, y: Operand<'_>, z: Operand<'_>) -> Relation {
        let operands: Vec<&str> = match (y.var(), z.var()) {
            (None, None) => return constant(x),
            (Some(a), Some(b)) if a == b => vec![a],
            (a, b) => a.into_iter().chain(b).collect(),
        };
        let index = self.next_index();
        debug!(index, "computing relation {} = {:?} {} {:?}", x, y, op, z);

        let polynomial = |scalars: [Scalar; 3]| Polynomial::from_scalars(index, scalars);
        let has_const = y.var().is_none() || z.var().is_none();
        let rows: Vec<Polynomial> = match (op, operands.as_slice()) {
            (_, [_]) if has_const => vec![polynomial([Scalar::M; 3])],
            (BinOp::Mul, [_]) => vec![polynomial([Scalar::W; 3])],
            (BinOp::Mul, _) => vec![polynomial([Scalar::W; 3]); 2],
            (_, [_]) => vec![polynomial([Scalar::W, Scalar::P, Scalar::W])],
            _ => vec![
                polynomial([Scalar::W, Scalar::M, Scalar::P]),
                polynomial([Scalar::W, Scalar::P, Scalar::M]),
            ],
        };

        // rows follow the relation's variables: x first, then the operands
        let mut variables = vec![x];
        variables.extend(operands.iter().copied().filter(|&v| v != x));
        let vector: Vec<Polynomial> = variables
            .iter()
            .map(|v| match operands.iter().position(|o| o == v) {
                Some(k) => rows[k].clone(),
                None => Polynomial::zero(),
            })
            .collect();

        Relation::identity(variables.iter().copied()).replace_column(&vector, x)
    }

    fn branch(&mut self, then: &Stmt, otherwise: Option<&Stmt>) -> Result<Relation> {
        debug!("computing relation (conditional case)");
        let true_relation = self.sequence(then.items())?;
        if self.exhausted() {
            return Ok(true_relation);
        }
        let false_relation = match otherwise {
            Some(stmt) => self.sequence(stmt.items())?,
            None => Relation::empty(),
        };
        if self.exhausted() {
            return Ok(false_relation);
        }
        Ok(false_relation.sum(&true_relation))
    }

    fn while_loop(&mut self, body: &Stmt) -> Result<Relation> {
        debug!("analysing while");
        let relation = self.sequence(body.items())?;
        if self.exhausted() {
            return Ok(relation);
        }
        let (corrected, promoted) = relation
            .fixpoint_bounded(self.options.fixpoint_limit)?
            .while_correction();
        self.record(promoted);
        Ok(corrected)
    }

    fn for_loop(&mut self, guard: &str, body: &Stmt) -> Result<Relation> {
        debug!(guard, "analysing for");
        let relation = Relation::zero([guard]).compose(&self.sequence(body.items())?);
        if self.exhausted() {
            return Ok(relation);
        }
        let fixed = relation.fixpoint_bounded(self.options.fixpoint_limit)?;
        let (corrected, promoted) = if self.options.bounded_for {
            fixed.loop_correction(guard)
        } else {
            fixed.while_correction()
        };
        self.record(promoted);
        Ok(corrected)
    }

    /// Feed newly infinite delta lists to the graph.
    fn record(&mut self, promoted: Vec<Vec<Delta>>) {
        if promoted.is_empty() {
            return;
        }
        for node in promoted {
            self.graph.insert_node(node);
        }
        self.graph.fusion();
        if self.graph.is_empty() && !self.delta_infinite {
            debug!("delta graph: every choice is infinite");
            self.delta_infinite = true;
        }
    }
}

fn constant(x: &str) -> Relation {
    debug!("constant assignment to {}", x);
    Relation::zero([x])
}

/// `x = y`: x takes y's value, nothing of its own.
fn copy(x: &str, y: &str) -> Relation {
    debug!("computing relation {} = {}", x, y);
    Relation::identity([x, y]).replace_column(&[Polynomial::zero(), Polynomial::unit()], x)
}

fn unsupported(stmt: &Stmt) -> Relation {
    warn!("unsupported syntax: {}", pretty_stmt(stmt).replace('\n', " "));
    Relation::empty()
}

// ============================================================================
// Entry points
// ============================================================================

fn run(variables: &[String], stmts: &[Stmt], start_index: usize, options: &AnalysisOptions) -> Result<CoreOutput> {
    let mut analyzer = Analyzer::new(options, start_index);
    debug!("{} top-level commands to analyze", stmts.len());
    let body = analyzer.sequence(stmts)?;
    let relation = Relation::identity(variables.iter().cloned()).compose(&body);
    let index = analyzer.index;

    let choices = if analyzer.exhausted() {
        Choices::infinite(index)
    } else {
        relation.eval(&DOMAIN, index, &[])?
    };
    Ok(CoreOutput {
        relation,
        index,
        choices,
        delta_infinite: analyzer.delta_infinite,
    })
}

/// Analyze a statement list, numbering choices from `start_index`.
pub fn analyze_body(stmts: &[Stmt], start_index: usize, options: &AnalysisOptions) -> Result<CoreOutput> {
    if stmts.is_empty() {
        return Err(MwpError::EmptyBody {
            function: "<body>".to_string(),
        });
    }
    let variables: Vec<String> = syntax::stmt_variables(&Stmt::Block(stmts.to_vec()));
    run(&variables, stmts, start_index, options)
}

/// Analyze one function definition.
pub fn analyze_function(func: &FuncDef, options: &AnalysisOptions) -> Result<FuncResult> {
    let start = Instant::now();
    let name = func.name.as_str();
    info!("analyzing {}", name);
    if func.body.is_empty() {
        return Err(MwpError::EmptyBody {
            function: name.to_string(),
        });
    }

    let variables = syntax::variables(func);
    if variables.len() <= 5 {
        debug!("{} variables: {}", name, variables.join(", "));
    } else {
        debug!("{} variables: {}", name, variables.len());
    }

    let out = run(&variables, &func.body, 0, options)?;
    let stop = !options.fin;
    let infinite = out.is_infinite();

    let mut result = FuncResult::new(name);
    result.index = out.index;
    result.infinite = infinite;
    result.variables = out.relation.variables().to_vec();

    if infinite && !stop {
        let failing: Vec<String> = out
            .relation
            .var_eval_all(&DOMAIN, out.index)?
            .into_iter()
            .filter(|(_, c)| c.is_infinite())
            .map(|(v, _)| v)
            .collect();
        result.inf_flows = Some(out.relation.infinity_pairs(&failing));
    }
    if !infinite {
        let first = out
            .choices
            .first()
            .ok_or_else(|| MwpError::Internal(format!("{}: finite result without a choice", name)))?;
        result.bound = Some(Bound::calculate(&out.relation.apply_choice(&first)));
        result.choices = Some(out.choices);
    }
    if !(infinite && stop) {
        result.relation = Some(out.relation);
    }
    result.duration_ms = start.elapsed().as_millis() as u64;
    Ok(result)
}

/// Counts of functions, loops and their variables.
pub fn program_info(program: &Program) -> ProgramInfo {
    let functions: Vec<&FuncDef> = program.functions.iter().map(|f| &f.node).collect();
    let loops: Vec<&Stmt> = functions.iter().flat_map(|f| syntax::find_loops(f)).collect();
    ProgramInfo {
        n_func: functions.len(),
        n_loops: loops.len(),
        n_func_vars: functions.iter().map(|f| syntax::variables(f).len()).sum(),
        n_loop_vars: loops.iter().map(|l| syntax::stmt_variables(l).len()).sum(),
        ..ProgramInfo::default()
    }
}

/// Coverage check: the function to analyze, if any.
fn checked<'f>(func: &'f FuncDef, options: &AnalysisOptions) -> Option<Cow<'f, FuncDef>> {
    let coverage = Coverage::check(func);
    if coverage.is_full() {
        return Some(Cow::Borrowed(func));
    }
    coverage.report(&func.name);
    if options.strict {
        warn!("{} syntax is not fully analyzable", func.name);
        return None;
    }
    warn!("{} syntax was modified", func.name);
    Some(Cow::Owned(syntax::strip_unsupported(func)))
}

/// Analyze every function of a program.
pub fn analyze_program(program: &Program, options: &AnalysisOptions) -> Result<AnalysisReport> {
    let start = Instant::now();
    let mut report = AnalysisReport {
        program: program_info(program),
        ..AnalysisReport::default()
    };
    debug!("started analysis");
    for func in program.functions.iter().map(|f| &f.node) {
        let Some(func) = checked(func, options) else {
            continue;
        };
        match analyze_function(&func, options) {
            Ok(result) => report.add_relation(result),
            Err(MwpError::EmptyBody { function }) => {
                warn!("{} has no statements to analyze", function)
            }
            Err(e) => return Err(e),
        }
    }
    report.duration_ms = start.elapsed().as_millis() as u64;
    Ok(report)
}

// ============================================================================
// Loop analysis
// ============================================================================

/// Least scalar class first; the extra scalars are treated as infinite.
const GROWTH_CLASSES: [(Scalar, &[Scalar]); 3] = [
    (Scalar::M, &[Scalar::W, Scalar::P]),
    (Scalar::W, &[Scalar::P]),
    (Scalar::P, &[]),
];

/// Analyze every loop of every function in isolation.
pub fn analyze_loops(program: &Program, options: &AnalysisOptions) -> Result<AnalysisReport> {
    let start = Instant::now();
    let mut report = AnalysisReport {
        program: program_info(program),
        ..AnalysisReport::default()
    };
    debug!("starting loop analysis");
    for func in program.functions.iter().map(|f| &f.node) {
        let func_start = Instant::now();
        info!("analyzing {}", func.name);
        let mut result = FuncLoops {
            name: func.name.clone(),
            ..FuncLoops::default()
        };
        let loops: Vec<Cow<'_, Stmt>> = syntax::find_loops(func)
            .into_iter()
            .filter_map(|lp| {
                let coverage = Coverage::check_stmt(lp);
                if coverage.is_full() {
                    return Some(Cow::Borrowed(lp));
                }
                coverage.report(&func.name);
                if options.strict {
                    return None;
                }
                syntax::strip_stmt(lp).map(Cow::Owned)
            })
            .collect();
        debug!("total analyzable loops: {}", loops.len());
        for lp in &loops {
            result.loops.push(inspect_loop(lp, options)?);
        }
        result.duration_ms = func_start.elapsed().as_millis() as u64;
        report.add_loops(result);
    }
    report.duration_ms = start.elapsed().as_millis() as u64;
    Ok(report)
}

/// Classify every variable of a single loop.
pub fn inspect_loop(lp: &Stmt, options: &AnalysisOptions) -> Result<LoopResult> {
    let start = Instant::now();
    let options = AnalysisOptions {
        fin: true,
        ..options.clone()
    };
    let variables = syntax::stmt_variables(lp);
    let out = run(&variables, std::slice::from_ref(lp), 0, &options)?;

    let variables = if out.is_infinite() {
        partial_results(&out.relation, out.index)?
    } else {
        out.relation
            .variables()
            .iter()
            .map(|v| Ok((v.clone(), classify(&out.relation, out.index, v)?)))
            .collect::<Result<IndexMap<_, _>>>()?
    };
    Ok(LoopResult {
        code: pretty_stmt(lp),
        variables,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// The least growth class of `variable` and its bound.
fn classify(relation: &Relation, index: usize, variable: &str) -> Result<VResult> {
    for (growth, extra) in GROWTH_CLASSES {
        let choices = relation.var_eval(&DOMAIN, index, variable, extra)?;
        if let Some(first) = choices.first() {
            let bound = Bound::calculate(&relation.apply_choice(&first));
            return Ok(VResult {
                name: variable.to_string(),
                growth: Some(growth),
                bound: bound.get(variable).cloned(),
                choices: Some(choices),
            });
        }
    }
    Ok(VResult::unbounded(variable))
}

/// Results when some variables are unbounded: the others are classified
/// only if they do not depend on an unbounded one.
fn partial_results(relation: &Relation, index: usize) -> Result<IndexMap<String, VResult>> {
    let evaluated = relation.var_eval_all(&DOMAIN, index)?;
    let failing: Vec<usize> = evaluated
        .values()
        .enumerate()
        .filter(|(_, c)| c.is_infinite())
        .map(|(i, _)| i)
        .collect();
    let reduced = Choices::reduce_all(evaluated.values().filter(|c| !c.is_infinite()));
    let simple = reduced
        .and_then(|r| r.first())
        .map(|first| relation.apply_choice(&first));

    let mut results = IndexMap::new();
    for (col, (variable, choices)) in evaluated.iter().enumerate() {
        let independent = simple.as_ref().is_some_and(|m| {
            failing.iter().all(|&row| m.get(row, col) == Scalar::O)
        });
        let result = if !choices.is_infinite() && independent {
            classify(relation, index, variable)?
        } else {
            VResult::unbounded(variable.as_str())
        };
        results.insert(variable.clone(), result);
    }
    Ok(results)
}
