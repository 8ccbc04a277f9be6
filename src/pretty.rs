//! Pretty-printer for the C subset
//!
//! Renders AST back to C source for round-trip testing and for showing the
//! statements coverage checking rejected.

use crate::ast::*;

/// Pretty-print configuration
pub struct PrettyConfig {
    pub indent: usize,
}

impl Default for PrettyConfig {
    fn default() -> Self {
        Self { indent: 4 }
    }
}

/// A pretty-printer with indentation tracking
pub struct Pretty {
    output: String,
    indent_level: usize,
    config: PrettyConfig,
}

impl Default for Pretty {
    fn default() -> Self {
        Self::new()
    }
}

impl Pretty {
    pub fn new() -> Self {
        Self {
            output: String::new(),
            indent_level: 0,
            config: PrettyConfig::default(),
        }
    }

    pub fn with_config(config: PrettyConfig) -> Self {
        Self {
            output: String::new(),
            indent_level: 0,
            config,
        }
    }

    pub fn finish(self) -> String {
        self.output
    }

    fn indent(&mut self) {
        for _ in 0..(self.indent_level * self.config.indent) {
            self.output.push(' ');
        }
    }

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn writeln(&mut self, s: &str) {
        self.output.push_str(s);
        self.output.push('\n');
    }

    fn newline(&mut self) {
        self.output.push('\n');
    }

    fn inc_indent(&mut self) {
        self.indent_level += 1;
    }

    fn dec_indent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }
}

// ============ Pretty-printing implementations ============

impl Pretty {
    pub fn program(&mut self, program: &Program) {
        for (i, func) in program.functions.iter().enumerate() {
            if i > 0 {
                self.newline();
            }
            self.function(&func.node);
        }
    }

    pub fn function(&mut self, func: &FuncDef) {
        self.write(&format!("{} {}(", func.ret, func.name));
        for (i, param) in func.params.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write(&format!("{} {}", param.ty, param.name));
        }
        self.writeln(") {");
        self.inc_indent();
        for stmt in &func.body {
            self.stmt(stmt);
        }
        self.dec_indent();
        self.writeln("}");
    }

    /// One statement on its own line(s), at the current indentation
    pub fn stmt(&mut self, stmt: &Stmt) {
        self.indent();
        self.stmt_inline(stmt);
        self.newline();
    }

    /// A statement starting at the cursor, without a trailing newline
    fn stmt_inline(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(stmts) => {
                self.writeln("{");
                self.inc_indent();
                for s in stmts {
                    self.stmt(s);
                }
                self.dec_indent();
                self.indent();
                self.write("}");
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                self.write("if (");
                self.expr(cond);
                self.write(")");
                self.body(then);
                if let Some(otherwise) = otherwise {
                    if matches!(**then, Stmt::Block(_)) {
                        self.write(" ");
                    } else {
                        self.newline();
                        self.indent();
                    }
                    self.write("else");
                    self.body(otherwise);
                }
            }
            Stmt::While { cond, body } => {
                self.write("while (");
                self.expr(cond);
                self.write(")");
                self.body(body);
            }
            Stmt::DoWhile { body, cond } => {
                self.write("do");
                self.body(body);
                if matches!(**body, Stmt::Block(_)) {
                    self.write(" ");
                } else {
                    self.newline();
                    self.indent();
                }
                self.write("while (");
                self.expr(cond);
                self.write(");");
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                self.write("for (");
                self.simple_list(init);
                self.write(";");
                if let Some(cond) = cond {
                    self.write(" ");
                    self.expr(cond);
                }
                self.write(";");
                if !step.is_empty() {
                    self.write(" ");
                    self.simple_list(step);
                }
                self.write(")");
                self.body(body);
            }
            Stmt::Return(value) => {
                self.write("return");
                if let Some(value) = value {
                    self.write(" ");
                    self.expr(value);
                }
                self.write(";");
            }
            Stmt::Break => self.write("break;"),
            Stmt::Continue => self.write("continue;"),
            Stmt::Empty => self.write(";"),
            other => {
                self.simple(other);
                self.write(";");
            }
        }
    }

    /// Loop or branch body: blocks stay on the header line
    fn body(&mut self, body: &Stmt) {
        if matches!(body, Stmt::Block(_)) {
            self.write(" ");
            self.stmt_inline(body);
        } else {
            self.newline();
            self.inc_indent();
            self.indent();
            self.stmt_inline(body);
            self.dec_indent();
        }
    }

    /// Assignment, expression or declaration, without the semicolon
    fn simple(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Assign { target, value } => {
                self.write(target);
                self.write(" = ");
                self.expr(value);
            }
            Stmt::Expr(e) => self.expr(e),
            Stmt::Decl { ty, vars } => {
                self.write(ty);
                self.write(" ");
                for (i, var) in vars.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.write(&var.name);
                    if let Some(init) = &var.init {
                        self.write(" = ");
                        self.expr(init);
                    }
                }
            }
            // Not expressible in a for header; only reached from malformed trees
            other => self.stmt_inline(other),
        }
    }

    fn simple_list(&mut self, stmts: &[Stmt]) {
        for (i, s) in stmts.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.simple(s);
        }
    }

    pub fn expr(&mut self, e: &Expr) {
        self.expr_prec(e, 0);
    }

    /// Print `e`, parenthesized when it binds looser than `min`
    fn expr_prec(&mut self, e: &Expr, min: u8) {
        match e {
            Expr::Binary { op, lhs, rhs } => {
                let prec = op.precedence();
                let paren = prec < min;
                if paren {
                    self.write("(");
                }
                self.expr_prec(lhs, prec);
                self.write(&format!(" {} ", op));
                // left associative: an equal-precedence right operand needs parens
                self.expr_prec(rhs, prec + 1);
                if paren {
                    self.write(")");
                }
            }
            Expr::Unary { op, expr } if op.is_prefix() => {
                self.write(op.symbol());
                // `- -x` must not print as `--x`
                if matches!(**expr, Expr::Unary { op, .. } if op.is_prefix()) {
                    self.write("(");
                    self.expr(expr);
                    self.write(")");
                } else {
                    self.unary_operand(expr);
                }
            }
            Expr::Unary { op, expr } => {
                self.postfix_operand(expr);
                self.write(op.symbol());
            }
            Expr::Cast { ty, expr } => {
                self.write(&format!("({}) ", ty));
                self.unary_operand(expr);
            }
            atom => self.atom(atom),
        }
    }

    fn unary_operand(&mut self, e: &Expr) {
        match e {
            Expr::Binary { .. } => {
                self.write("(");
                self.expr(e);
                self.write(")");
            }
            other => self.expr_prec(other, u8::MAX),
        }
    }

    fn postfix_operand(&mut self, e: &Expr) {
        match e {
            Expr::Const(_) | Expr::Ident(_) | Expr::Call { .. } => self.atom(e),
            Expr::Unary { op, .. } if !op.is_prefix() => self.expr(e),
            other => {
                self.write("(");
                self.expr(other);
                self.write(")");
            }
        }
    }

    fn atom(&mut self, e: &Expr) {
        match e {
            Expr::Const(n) => self.write(&n.to_string()),
            Expr::Ident(name) => self.write(name),
            Expr::Call { name, args } => {
                self.write(name);
                self.write("(");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.expr(arg);
                }
                self.write(")");
            }
            other => {
                self.write("(");
                self.expr(other);
                self.write(")");
            }
        }
    }
}

/// Convenience function to pretty-print a program
pub fn pretty_print(program: &Program) -> String {
    let mut p = Pretty::new();
    p.program(program);
    p.finish()
}

/// Render one statement, e.g. for warnings about unsupported syntax
pub fn pretty_stmt(stmt: &Stmt) -> String {
    let mut p = Pretty::new();
    p.stmt_inline(stmt);
    p.finish()
}
