//! Parse error types and the rendered diagnostic format.

use std::fmt;
use std::sync::Arc;

use ledgertree_syntax::Span;
use thiserror::Error;

/// The cause of a single parse error, independent of where it occurred.
///
/// Grouped by the four error categories parsing recognizes: lexical,
/// syntactic, semantic-but-local (no cross-file analysis), and the
/// depth-limit guard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// A byte that cannot begin any token.
    #[error("unexpected character {found:?}")]
    UnexpectedChar {
        /// The offending character.
        found: char,
    },
    /// A string literal was never closed with a matching `"`.
    #[error("unterminated string literal")]
    UnterminatedString,
    /// A `\` escape inside a string names a character that isn't `\\ \" \n \t \r`.
    #[error("invalid escape sequence '\\{escape}'")]
    InvalidEscape {
        /// The character following the backslash.
        escape: char,
    },
    /// A `YYYY-MM-DD` token had a month or day out of lexical range.
    #[error("invalid date: {text}")]
    InvalidDate {
        /// The offending date text.
        text: String,
    },
    /// A numeric literal could not be parsed as a decimal.
    #[error("invalid number: {text}")]
    InvalidNumber {
        /// The offending number text.
        text: String,
    },
    /// The parser expected one of a set of productions and found something
    /// else.
    #[error("expected {expected}, found {found}")]
    Expected {
        /// A human-readable description of what was expected.
        expected: String,
        /// A human-readable description of what was actually found.
        found: String,
    },
    /// The same tag appeared twice in one transaction header.
    #[error("duplicate tag #{tag} in transaction")]
    DuplicateTag {
        /// The duplicated tag.
        tag: String,
    },
    /// The same link appeared twice in one transaction header.
    #[error("duplicate link ^{link} in transaction")]
    DuplicateLink {
        /// The duplicated link.
        link: String,
    },
    /// A cost spec named more than one item in the same category (e.g. two
    /// dates).
    #[error("duplicate {category} in cost spec")]
    DuplicateCostField {
        /// The duplicated category's name.
        category: &'static str,
    },
    /// A parenthesized number expression nested deeper than the parser's
    /// depth cap.
    #[error("number expression nested too deeply (limit is {limit})")]
    ExpressionTooDeep {
        /// The configured depth cap.
        limit: usize,
    },
    /// Division inside a number expression does not terminate within the
    /// parser's fixed decimal precision.
    #[error("division does not terminate within {precision} digits of precision")]
    NonTerminatingDivision {
        /// The configured decimal precision.
        precision: u32,
    },
}

/// A single parse failure, carrying enough context to render the diagnostic
/// format callers see.
#[derive(Debug, Clone)]
pub struct ParseError {
    filename: Arc<str>,
    source: Arc<str>,
    /// The byte span the error occurred at.
    pub span: Span,
    /// What went wrong.
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub(crate) fn new(filename: Arc<str>, source: Arc<str>, span: Span, kind: ParseErrorKind) -> Self {
        Self {
            filename,
            source,
            span,
            kind,
        }
    }

    /// The 1-based line and column the error's span starts at.
    #[must_use]
    pub fn line_col(&self) -> (usize, usize) {
        line_col(&self.source, self.span.start)
    }

    /// The full text of the line the error occurred on, without its
    /// trailing newline.
    #[must_use]
    pub fn line_text(&self) -> &str {
        line_text(&self.source, self.span.start)
    }

    /// Render the `"<filename>:<line>:<col>: <message>"` diagnostic header,
    /// without the source snippet.
    #[must_use]
    pub fn header(&self) -> String {
        let (line, col) = self.line_col();
        format!("{}:{}:{}: {}", self.filename, line, col, self.kind)
    }

    /// Render the full diagnostic: the header, the offending source line,
    /// and a caret under the span's start column.
    #[must_use]
    pub fn render(&self) -> String {
        let (_, col) = self.line_col();
        let line = self.line_text();
        let caret_offset = col.saturating_sub(1);
        let mut caret = " ".repeat(caret_offset);
        caret.push('^');
        format!("{}\n{line}\n{caret}", self.header())
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl std::error::Error for ParseError {}

fn line_col(source: &str, byte_offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut last_newline = None;
    for (i, b) in source.as_bytes().iter().enumerate().take(byte_offset) {
        if *b == b'\n' {
            line += 1;
            last_newline = Some(i);
        }
    }
    let col = match last_newline {
        Some(nl) => byte_offset - nl,
        None => byte_offset + 1,
    };
    (line, col)
}

fn line_text(source: &str, byte_offset: usize) -> &str {
    let start = source[..byte_offset].rfind('\n').map_or(0, |i| i + 1);
    let end = source[byte_offset..]
        .find('\n')
        .map_or(source.len(), |i| byte_offset + i);
    &source[start..end]
}

/// Everything that can go wrong calling [`crate::parse_string`] or
/// [`crate::parse_file`].
#[derive(Debug, Error)]
pub enum Error {
    /// A lex, syntax, or semantic-local error encountered while parsing.
    #[error("{0}")]
    Parse(#[from] ParseError),
    /// Reading the source file failed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The path that could not be read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_on_first_line() {
        assert_eq!(line_col("hello world", 6), (1, 7));
    }

    #[test]
    fn line_col_after_newline() {
        let source = "line one\nline two\nline three";
        assert_eq!(line_col(source, 9), (2, 1));
        assert_eq!(line_col(source, 14), (2, 6));
    }

    #[test]
    fn line_text_extracts_offending_line() {
        let source = "line one\nline two\nline three";
        assert_eq!(line_text(source, 14), "line two");
    }

    #[test]
    fn render_includes_caret_line() {
        let source: Arc<str> = Arc::from("this is not a directive\n");
        let err = ParseError::new(
            Arc::from("bad.bean"),
            source,
            Span::new(0, 4),
            ParseErrorKind::Expected {
                expected: "a directive".to_string(),
                found: "'this'".to_string(),
            },
        );
        let rendered = err.render();
        assert!(rendered.starts_with("bad.bean:1:1:"));
        assert!(rendered.contains("this is not a directive"));
        assert!(rendered.ends_with('^'));
    }
}
