//! mwp: growth-bound certification for a C subset
//!
//! Each function is translated into a relation between its variables, a
//! matrix of polynomials over the mwp semiring `{o, m, w, p, i}`. The choices
//! under which no flow is infinite describe the polynomial bounds the
//! function admits.

pub mod algebra;
pub mod analysis;
pub mod ast;
pub mod bound;
pub mod choice;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod pretty;
pub mod result;
pub mod serialize;
pub mod syntax;

pub use algebra::{Delta, Matrix, Monomial, Polynomial, Relation, Scalar, ScalarMatrix, Semiring};
pub use analysis::{analyze_body, analyze_function, analyze_loops, analyze_program, AnalysisOptions};
pub use ast::*;
pub use bound::{Bound, MwpBound};
pub use choice::{Choices, DeltaGraph};
pub use error::{MwpError, Result};
pub use lexer::lexer;
pub use parser::parser;
pub use pretty::pretty_print;
pub use result::{AnalysisReport, FuncResult};

/// Parse C source into an AST
pub fn parse(input: &str) -> Result<Program> {
    use chumsky::prelude::*;

    let tokens = lexer::lexer()
        .parse(input)
        .map_err(|errs| MwpError::Parse(error::format_lexer_errors(input, errs)))?;

    let len = input.len();

    parser::parser()
        .parse(chumsky::Stream::from_iter(len..len + 1, tokens.into_iter()))
        .map_err(|errs| MwpError::Parse(error::format_parser_errors(input, errs)))
}
