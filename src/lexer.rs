//! Lexer for the C subset
//!
//! Tokenizes source into a stream for the parser. Comments and preprocessor
//! lines are dropped.

use chumsky::prelude::*;
use std::ops::Range;

/// Token types for the C subset
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Token {
    // Keywords
    If,
    Else,
    While,
    Do,
    For,
    Return,
    Break,
    Continue,
    /// Built-in type word (`int`, `unsigned`, …)
    Type(String),

    // Atoms
    Ident(String),
    Number(i64),

    // Punctuation
    LBrace,    // {
    RBrace,    // }
    LParen,    // (
    RParen,    // )
    Semicolon, // ;
    Comma,     // ,

    // Operators
    Assign,    // =
    AddAssign, // +=
    SubAssign, // -=
    MulAssign, // *=
    DivAssign, // /=
    ModAssign, // %=
    Incr,      // ++
    Decr,      // --
    Plus,      // +
    Minus,     // -
    Star,      // *
    Slash,     // /
    Percent,   // %
    EqEq,      // ==
    NotEq,     // !=
    LtEq,      // <=
    GtEq,      // >=
    Lt,        // <
    Gt,        // >
    AndAnd,    // &&
    OrOr,      // ||
    Bang,      // !
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::While => write!(f, "while"),
            Token::Do => write!(f, "do"),
            Token::For => write!(f, "for"),
            Token::Return => write!(f, "return"),
            Token::Break => write!(f, "break"),
            Token::Continue => write!(f, "continue"),
            Token::Type(s) => write!(f, "{}", s),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Number(n) => write!(f, "{}", n),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::Assign => write!(f, "="),
            Token::AddAssign => write!(f, "+="),
            Token::SubAssign => write!(f, "-="),
            Token::MulAssign => write!(f, "*="),
            Token::DivAssign => write!(f, "/="),
            Token::ModAssign => write!(f, "%="),
            Token::Incr => write!(f, "++"),
            Token::Decr => write!(f, "--"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::LtEq => write!(f, "<="),
            Token::GtEq => write!(f, ">="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Bang => write!(f, "!"),
        }
    }
}

/// Type alias for spans
pub type Span = Range<usize>;

/// Built-in type words recognized as [`Token::Type`].
pub const TYPE_WORDS: &[&str] = &[
    "int", "long", "short", "char", "void", "unsigned", "signed", "float", "double", "bool",
    "_Bool",
];

/// Create a lexer for the C subset
pub fn lexer() -> impl Parser<char, Vec<(Token, Span)>, Error = Simple<char>> {
    let keyword_or_ident = text::ident().map(|s: String| match s.as_str() {
        "if" => Token::If,
        "else" => Token::Else,
        "while" => Token::While,
        "do" => Token::Do,
        "for" => Token::For,
        "return" => Token::Return,
        "break" => Token::Break,
        "continue" => Token::Continue,
        word if TYPE_WORDS.contains(&word) => Token::Type(word.to_string()),
        _ => Token::Ident(s),
    });

    let number = text::int(10)
        .then_ignore(one_of("uUlL").repeated())
        .try_map(|digits: String, span| {
            digits
                .parse::<i64>()
                .map(Token::Number)
                .map_err(|e| Simple::custom(span, format!("invalid integer literal: {}", e)))
        });

    // Longest operators first so `+=` is not read as `+` `=`
    let operator = choice((
        just("++").to(Token::Incr),
        just("--").to(Token::Decr),
        just("+=").to(Token::AddAssign),
        just("-=").to(Token::SubAssign),
        just("*=").to(Token::MulAssign),
        just("/=").to(Token::DivAssign),
        just("%=").to(Token::ModAssign),
        just("==").to(Token::EqEq),
        just("!=").to(Token::NotEq),
        just("<=").to(Token::LtEq),
        just(">=").to(Token::GtEq),
        just("&&").to(Token::AndAnd),
        just("||").to(Token::OrOr),
    ))
    .or(choice((
        just('=').to(Token::Assign),
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Star),
        just('/').to(Token::Slash),
        just('%').to(Token::Percent),
        just('<').to(Token::Lt),
        just('>').to(Token::Gt),
        just('!').to(Token::Bang),
        just('{').to(Token::LBrace),
        just('}').to(Token::RBrace),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just(';').to(Token::Semicolon),
        just(',').to(Token::Comma),
    )));

    // Comments must be tried before `/` so they are not read as Slash
    let line_comment = just("//")
        .then(none_of('\n').repeated())
        .then(just('\n').or_not())
        .ignored();
    let block_comment = just("/*").then(take_until(just("*/"))).ignored();
    let preprocessor = just('#')
        .then(none_of('\n').repeated())
        .then(just('\n').or_not())
        .ignored();

    let skip = choice((line_comment, block_comment, preprocessor));

    // Token OR skipped text - skips produce None, tokens produce Some
    let token_or_skip = skip
        .to(None)
        .or(choice((number, keyword_or_ident, operator)).map(Some));

    token_or_skip
        .map_with_span(|opt_tok, span| opt_tok.map(|tok| (tok, span)))
        .padded()
        .repeated()
        .then_ignore(end())
        .map(|items| items.into_iter().flatten().collect())
}
