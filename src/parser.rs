//! Parser for the C subset
//!
//! Parses token streams into AST. Global declarations and prototypes are
//! accepted and dropped; only function definitions are kept.

use chumsky::prelude::*;

use crate::ast::*;
use crate::lexer::{Span, Token};

/// Create a parser for a complete translation unit
pub fn parser() -> impl Parser<Token, Program, Error = Simple<Token>> + Clone {
    item()
        .repeated()
        .then_ignore(end())
        .map(|items| Program {
            functions: items.into_iter().flatten().collect(),
        })
}

fn to_span(span: Span) -> crate::ast::Span {
    crate::ast::Span::new(span.start, span.end)
}

// ============================================================================
// Helpers
// ============================================================================

fn ident() -> impl Parser<Token, String, Error = Simple<Token>> + Clone {
    select! { Token::Ident(s) => s }
}

/// One or more type words: `int`, `unsigned long`
fn type_name() -> impl Parser<Token, String, Error = Simple<Token>> + Clone {
    select! { Token::Type(s) => s }
        .repeated()
        .at_least(1)
        .map(|words| words.join(" "))
}

/// `operand (op operand)*`, folded to the left
fn fold_binary<P, O>(operand: P, ops: O) -> impl Parser<Token, Expr, Error = Simple<Token>> + Clone
where
    P: Parser<Token, Expr, Error = Simple<Token>> + Clone,
    O: Parser<Token, BinOp, Error = Simple<Token>> + Clone,
{
    operand
        .clone()
        .then(ops.then(operand).repeated())
        .foldl(|lhs, (op, rhs)| Expr::binary(op, lhs, rhs))
}

// ============================================================================
// Expressions
// ============================================================================

pub fn expr() -> impl Parser<Token, Expr, Error = Simple<Token>> + Clone {
    recursive(|expr| {
        let args = expr
            .clone()
            .separated_by(just(Token::Comma))
            .delimited_by(just(Token::LParen), just(Token::RParen));
        let call_or_ident = ident().then(args.or_not()).map(|(name, args)| match args {
            Some(args) => Expr::Call { name, args },
            None => Expr::Ident(name),
        });
        let number = select! { Token::Number(n) => Expr::Const(n) };
        let paren = expr
            .clone()
            .delimited_by(just(Token::LParen), just(Token::RParen));
        let atom = choice((number, call_or_ident, paren));

        // x++, x--
        let postfix = atom
            .then(
                choice((
                    just(Token::Incr).to(UnOp::PostInc),
                    just(Token::Decr).to(UnOp::PostDec),
                ))
                .repeated(),
            )
            .foldl(|e, op| Expr::unary(op, e));

        let unary = recursive(|unary| {
            let prefix_op = choice((
                just(Token::Incr).to(UnOp::PreInc),
                just(Token::Decr).to(UnOp::PreDec),
                just(Token::Minus).to(UnOp::Neg),
                just(Token::Plus).to(UnOp::Plus),
                just(Token::Bang).to(UnOp::Not),
            ));
            let prefixed = prefix_op
                .then(unary.clone())
                .map(|(op, e)| Expr::unary(op, e));
            // (int) x
            let cast = type_name()
                .delimited_by(just(Token::LParen), just(Token::RParen))
                .then(unary)
                .map(|(ty, e)| Expr::Cast {
                    ty,
                    expr: Box::new(e),
                });
            choice((prefixed, cast, postfix))
        });

        let product = fold_binary(
            unary,
            choice((
                just(Token::Star).to(BinOp::Mul),
                just(Token::Slash).to(BinOp::Div),
                just(Token::Percent).to(BinOp::Mod),
            )),
        );
        let sum = fold_binary(
            product,
            choice((
                just(Token::Plus).to(BinOp::Add),
                just(Token::Minus).to(BinOp::Sub),
            )),
        );
        let relational = fold_binary(
            sum,
            choice((
                just(Token::LtEq).to(BinOp::Le),
                just(Token::GtEq).to(BinOp::Ge),
                just(Token::Lt).to(BinOp::Lt),
                just(Token::Gt).to(BinOp::Gt),
            )),
        );
        let equality = fold_binary(
            relational,
            choice((
                just(Token::EqEq).to(BinOp::Eq),
                just(Token::NotEq).to(BinOp::Ne),
            )),
        );
        let conjunction = fold_binary(equality, just(Token::AndAnd).to(BinOp::And));
        fold_binary(conjunction, just(Token::OrOr).to(BinOp::Or)).boxed()
    })
}

// ============================================================================
// Statements
// ============================================================================

pub fn stmt() -> impl Parser<Token, Stmt, Error = Simple<Token>> + Clone {
    recursive(|stmt| {
        let expr = expr();

        // x = e, x += e, ...; compound forms are lowered to x = x op e
        let assign_op = choice((
            just(Token::Assign).to(None),
            just(Token::AddAssign).to(Some(BinOp::Add)),
            just(Token::SubAssign).to(Some(BinOp::Sub)),
            just(Token::MulAssign).to(Some(BinOp::Mul)),
            just(Token::DivAssign).to(Some(BinOp::Div)),
            just(Token::ModAssign).to(Some(BinOp::Mod)),
        ));
        let assignment = ident()
            .then(assign_op)
            .then(expr.clone())
            .map(|((target, op), value)| {
                let value = match op {
                    None => value,
                    Some(op) => Expr::binary(op, Expr::Ident(target.clone()), value),
                };
                Stmt::Assign { target, value }
            });
        let simple = assignment.or(expr.clone().map(Stmt::Expr));
        let simple_list = simple.clone().separated_by(just(Token::Comma));

        let declarator = ident()
            .then(just(Token::Assign).ignore_then(expr.clone()).or_not())
            .map(|(name, init)| Declarator { name, init });
        let declaration = type_name()
            .then(declarator.separated_by(just(Token::Comma)).at_least(1))
            .map(|(ty, vars)| Stmt::Decl { ty, vars });

        let cond = expr
            .clone()
            .delimited_by(just(Token::LParen), just(Token::RParen));

        let block = stmt
            .clone()
            .repeated()
            .delimited_by(just(Token::LBrace), just(Token::RBrace))
            .map(Stmt::Block);

        // else binds to the nearest if
        let if_stmt = just(Token::If)
            .ignore_then(cond.clone())
            .then(stmt.clone())
            .then(just(Token::Else).ignore_then(stmt.clone()).or_not())
            .map(|((cond, then), otherwise)| Stmt::If {
                cond,
                then: Box::new(then),
                otherwise: otherwise.map(Box::new),
            });

        let while_stmt = just(Token::While)
            .ignore_then(cond.clone())
            .then(stmt.clone())
            .map(|(cond, body)| Stmt::While {
                cond,
                body: Box::new(body),
            });

        let do_while = just(Token::Do)
            .ignore_then(stmt.clone())
            .then_ignore(just(Token::While))
            .then(cond)
            .then_ignore(just(Token::Semicolon))
            .map(|(body, cond)| Stmt::DoWhile {
                body: Box::new(body),
                cond,
            });

        let for_init = declaration.clone().map(|d| vec![d]).or(simple_list.clone());
        let for_header = for_init
            .then_ignore(just(Token::Semicolon))
            .then(expr.clone().or_not())
            .then_ignore(just(Token::Semicolon))
            .then(simple_list)
            .delimited_by(just(Token::LParen), just(Token::RParen));
        let for_stmt = just(Token::For)
            .ignore_then(for_header)
            .then(stmt)
            .map(|(((init, cond), step), body)| Stmt::For {
                init,
                cond,
                step,
                body: Box::new(body),
            });

        let ret = just(Token::Return)
            .ignore_then(expr.or_not())
            .then_ignore(just(Token::Semicolon))
            .map(Stmt::Return);
        let brk = just(Token::Break)
            .then_ignore(just(Token::Semicolon))
            .to(Stmt::Break);
        let cont = just(Token::Continue)
            .then_ignore(just(Token::Semicolon))
            .to(Stmt::Continue);
        let empty = just(Token::Semicolon).to(Stmt::Empty);

        choice((
            block,
            if_stmt,
            while_stmt,
            do_while,
            for_stmt,
            ret,
            brk,
            cont,
            empty,
            declaration.then_ignore(just(Token::Semicolon)),
            simple.then_ignore(just(Token::Semicolon)),
        ))
        .boxed()
    })
}

// ============================================================================
// Top level
// ============================================================================

/// A function definition, or a prototype / global declaration (`None`)
fn item() -> impl Parser<Token, Option<Spanned<FuncDef>>, Error = Simple<Token>> + Clone {
    let params = type_name()
        .then(ident().or_not())
        .separated_by(just(Token::Comma))
        .delimited_by(just(Token::LParen), just(Token::RParen))
        .map(|params| {
            params
                .into_iter()
                .filter_map(|(ty, name)| name.map(|name| Param { ty, name }))
                .collect::<Vec<_>>()
        });
    let body = stmt()
        .repeated()
        .delimited_by(just(Token::LBrace), just(Token::RBrace));

    let function = type_name()
        .then(ident())
        .then(params)
        .then(body.map(Some).or(just(Token::Semicolon).to(None)))
        .map_with_span(|(((ret, name), params), body), span| {
            body.map(|body| {
                Spanned::new(
                    FuncDef {
                        ret,
                        name,
                        params,
                        body,
                    },
                    to_span(span),
                )
            })
        });

    let global = type_name()
        .then(
            ident()
                .then(just(Token::Assign).ignore_then(expr()).or_not())
                .separated_by(just(Token::Comma))
                .at_least(1),
        )
        .then_ignore(just(Token::Semicolon))
        .to(None);

    function.or(global)
}
