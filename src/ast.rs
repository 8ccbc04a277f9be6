//! Abstract syntax tree for the analyzed C subset.
//!
//! The tree keeps what the analysis looks at: functions, scalar variables,
//! assignments, conditionals and loops. Everything else that parses (calls,
//! division, comparisons inside assignments…) is kept verbatim so coverage
//! checking can report it.

use std::fmt;

/// A span in the source code, for error reporting
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A node with source location
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// A complete translation unit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    pub functions: Vec<Spanned<FuncDef>>,
}

impl Program {
    pub fn function(&self, name: &str) -> Option<&FuncDef> {
        self.functions
            .iter()
            .map(|f| &f.node)
            .find(|f| f.name == name)
    }
}

/// `int foo(int x, int y) { ... }`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuncDef {
    pub ret: String,
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub ty: String,
    pub name: String,
}

/// One declarator of a declaration: `x` or `x = e`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declarator {
    pub name: String,
    pub init: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stmt {
    /// `x = e;` (compound assignments are lowered: `x += e` is `x = x + e`)
    Assign { target: String, value: Expr },

    /// Expression statement: `x++;`, `f(x);`
    Expr(Expr),

    /// `int x, y = 0;`
    Decl { ty: String, vars: Vec<Declarator> },

    /// `if (c) s` or `if (c) s else s`
    If {
        cond: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
    },

    /// `while (c) s`
    While { cond: Expr, body: Box<Stmt> },

    /// `do s while (c);`
    DoWhile { body: Box<Stmt>, cond: Expr },

    /// `for (init; cond; step) s`
    For {
        init: Vec<Stmt>,
        cond: Option<Expr>,
        step: Vec<Stmt>,
        body: Box<Stmt>,
    },

    /// `{ ... }`
    Block(Vec<Stmt>),

    Return(Option<Expr>),
    Break,
    Continue,

    /// `;`
    Empty,
}

impl Stmt {
    /// Statements of a loop or branch body, looking through one block.
    pub fn items(&self) -> &[Stmt] {
        match self {
            Stmt::Block(stmts) => stmts,
            other => std::slice::from_ref(other),
        }
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, Stmt::While { .. } | Stmt::DoWhile { .. } | Stmt::For { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Const(i64),
    Ident(String),
    Unary { op: UnOp, expr: Box<Expr> },
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Cast { ty: String, expr: Box<Expr> },
    Call { name: String, args: Vec<Expr> },
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn unary(op: UnOp, expr: Expr) -> Self {
        Expr::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    /// The expression with any casts removed.
    pub fn uncast(&self) -> &Expr {
        let mut e = self;
        while let Expr::Cast { expr, .. } = e {
            e = expr;
        }
        e
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinOp {
    /// Operators with an mwp rule.
    pub fn is_arithmetic(self) -> bool {
        matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul)
    }

    /// Binding strength, higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Eq | BinOp::Ne => 3,
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => 4,
            BinOp::Add | BinOp::Sub => 5,
            BinOp::Mul | BinOp::Div | BinOp::Mod => 6,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnOp {
    Neg,
    Plus,
    Not,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnOp {
    pub fn is_inc_dec(self) -> bool {
        matches!(self, UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec)
    }

    pub fn is_prefix(self) -> bool {
        !matches!(self, UnOp::PostInc | UnOp::PostDec)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnOp::Neg => "-",
            UnOp::Plus => "+",
            UnOp::Not => "!",
            UnOp::PreInc | UnOp::PostInc => "++",
            UnOp::PreDec | UnOp::PostDec => "--",
        }
    }
}
