//! Lexer and line classifier.
//!
//! The source is line-oriented: each physical line is either blank, a
//! directive (leading `.`), or an operation. Comments start at `#` and run
//! to the end of the line. Tokens are separated by any run of spaces or
//! tabs.

use crate::dialect::Dialect;
use crate::error::Result;
use crate::parser;
use crate::types::{Line, LineKind};

/// Strip a trailing comment and surrounding whitespace.
pub fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => line[..idx].trim(),
        None => line.trim(),
    }
}

/// Lex a complete source text into classified lines.
///
/// Produces exactly one [`Line`] per physical input line, in order, so
/// later passes can report 1-based line numbers.
pub fn lex(source: &str, dialect: &Dialect) -> Result<Vec<Line>> {
    source
        .lines()
        .enumerate()
        .map(|(idx, raw)| classify(raw, idx + 1, dialect))
        .collect()
}

fn classify(raw: &str, number: usize, dialect: &Dialect) -> Result<Line> {
    let bare = strip_comment(raw);
    let kind = if bare.is_empty() {
        LineKind::Blank
    } else if let Some(rest) = bare.strip_prefix('.') {
        LineKind::Directive(parser::parse_directive(rest, bare, number)?)
    } else {
        LineKind::Operation(parser::parse_operation(bare, number, dialect)?)
    };
    Ok(Line {
        number,
        text: bare.to_string(),
        kind,
    })
}
