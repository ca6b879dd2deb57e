//! Recursive-descent parser for plain-text double-entry ledger files.
//!
//! This crate turns ledger source text into a [`ledgertree_syntax::File`]: a
//! span-carrying, round-trippable syntax tree. Parsing is single-pass,
//! one-token-lookahead, and fails fast — the first lex, syntax, or
//! semantic-local error halts the parse and is returned directly; there is
//! no error-recovery pass and no partial tree on failure.
//!
//! # Example
//!
//! ```
//! use ledgertree_parser::parse_string;
//!
//! let source = "2024-01-15 * \"Coffee Shop\" \"Morning coffee\"\n  \
//!               Expenses:Food:Coffee  5.00 USD\n  Assets:Cash\n";
//! let file = parse_string(source, "ledger.bean").unwrap();
//! assert_eq!(file.len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod lexer;
mod parser;

pub use error::{Error, ParseError, ParseErrorKind};
pub use ledgertree_syntax::{Node, Span};

use std::fs;
use std::path::Path;
use std::sync::Arc;

use ledgertree_syntax::File;

/// Parse already-loaded ledger source text into a [`File`].
///
/// `filename` is carried only for diagnostics — rendered parse errors and
/// any metadata that names a source file use it verbatim.
///
/// # Errors
///
/// Returns the first lex, syntax, or semantic-local error encountered.
pub fn parse_string(content: impl Into<Arc<str>>, filename: impl Into<Arc<str>>) -> Result<File, Error> {
    parser::parse_string(content, filename).map_err(Error::Parse)
}

/// Read `path` as UTF-8 and parse it into a [`File`].
///
/// # Errors
///
/// Returns [`Error::Io`] if `path` cannot be read or is not valid UTF-8, or
/// any error [`parse_string`] would return for the file's contents.
pub fn parse_file(path: impl AsRef<Path>) -> Result<File, Error> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    let filename = path.display().to_string();
    parse_string(content, filename)
}
