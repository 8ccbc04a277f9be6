//! Errors for mwp analysis.
//!
//! [`MwpError`] covers everything that can fail; parse errors are rendered
//! with ariadne before they are wrapped, so they carry source excerpts.

use ariadne::{Color, Label, Report, ReportKind, Source};
use chumsky::error::SimpleReason;
use chumsky::prelude::Simple;
use std::ops::Range;
use thiserror::Error;

use crate::lexer::Token;

#[derive(Error, Debug)]
pub enum MwpError {
    #[error("{0}")]
    Parse(String),

    #[error("function `{function}` has no statements to analyze")]
    EmptyBody { function: String },

    #[error("unknown scalar '{0}'")]
    UnknownScalar(char),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("fixpoint did not converge within {limit} iterations")]
    FixpointLimit { limit: usize },

    #[error("malformed matrix: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MwpError>;

// ============================================================================
// Parse error reports
// ============================================================================

/// Format lexer errors into a user-friendly string
pub fn format_lexer_errors(source: &str, errors: Vec<Simple<char>>) -> String {
    let mut output = Vec::new();

    for error in errors {
        let span = error.span();
        let found = error
            .found()
            .map(|c| format!("'{}'", c))
            .unwrap_or_else(|| "end of input".to_string());
        let report = Report::build(ReportKind::Error, (), span.start)
            .with_message("Lexical error")
            .with_label(
                Label::new(span)
                    .with_message(format!("Unexpected character {}", found))
                    .with_color(Color::Red),
            )
            .finish();
        if report.write(Source::from(source), &mut output).is_err() {
            return "Error formatting failed".to_string();
        }
    }

    String::from_utf8(output).unwrap_or_else(|_| "Error formatting failed".to_string())
}

/// Format parser errors into a user-friendly string.
///
/// Parser spans are character spans because the token stream carries the
/// lexer's spans; the end-of-input span is clamped to the source.
pub fn format_parser_errors(source: &str, errors: Vec<Simple<Token>>) -> String {
    let mut output = Vec::new();

    for error in errors {
        let span = clamp(error.span(), source.len());
        let report = Report::build(ReportKind::Error, (), span.start)
            .with_message("Parse error")
            .with_label(
                Label::new(span)
                    .with_message(format_parser_error(&error))
                    .with_color(Color::Red),
            )
            .finish();
        if report.write(Source::from(source), &mut output).is_err() {
            return "Error formatting failed".to_string();
        }
    }

    String::from_utf8(output).unwrap_or_else(|_| "Error formatting failed".to_string())
}

fn clamp(span: Range<usize>, len: usize) -> Range<usize> {
    span.start.min(len)..span.end.min(len)
}

fn format_parser_error(error: &Simple<Token>) -> String {
    if let SimpleReason::Custom(msg) = error.reason() {
        return msg.clone();
    }

    let found = error
        .found()
        .map(|t| format!("'{}'", t))
        .unwrap_or_else(|| "end of input".to_string());
    let expected: Vec<String> = error
        .expected()
        .filter_map(|opt| opt.as_ref())
        .map(|t| format!("'{}'", t))
        .collect();

    if !expected.is_empty() {
        format!("Unexpected {}, expected one of: {}", found, expected.join(", "))
    } else if let Some(label) = error.label() {
        label.to_string()
    } else {
        format!("Unexpected token {}", found)
    }
}
