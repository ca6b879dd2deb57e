//! `File`: a parsed ledger file, its directives, and its source text.

use std::sync::Arc;

use crate::directive::Directive;
use crate::span::{Node, Origin, Span};

/// A parsed ledger file: its source text, its filename, and every directive
/// found in it, in file order.
#[derive(Debug, Clone)]
pub struct File {
    span: Span,
    origin: Origin,
    content: Arc<str>,
    /// The file's name, as given to [`crate::parse_file`] or
    /// [`crate::parse_string`], for use in diagnostics.
    pub filename: Arc<str>,
    /// Every directive found in the file, in the order it appeared.
    pub directives: Vec<Directive>,
}

impl File {
    pub(crate) fn new(content: Arc<str>, filename: Arc<str>, directives: Vec<Directive>) -> Self {
        let span = Span::new(0, content.len());
        Self {
            span,
            origin: Origin::Source(content.clone()),
            content,
            filename,
            directives,
        }
    }

    /// The file's full source text.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The number of directives parsed from the file.
    #[must_use]
    pub fn len(&self) -> usize {
        self.directives.len()
    }

    /// Whether the file contained no directives at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Iterate over every [`Directive::Transaction`] in the file.
    pub fn transactions(&self) -> impl Iterator<Item = &crate::directive::Transaction> {
        self.directives.iter().filter_map(Directive::as_transaction)
    }
}

impl Node for File {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for (i, directive) in self.directives.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&directive.dump());
            out.push('\n');
        }
        out
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::Close;
    use chrono::NaiveDate;

    #[test]
    fn empty_file_has_no_directives() {
        let file = File::new(Arc::from(""), Arc::from("empty.ledger"), Vec::new());
        assert!(file.is_empty());
        assert_eq!(file.len(), 0);
    }

    #[test]
    fn dump_round_trips_source_text() {
        let source = "2024-01-01 close Assets:Checking\n";
        let content: Arc<str> = Arc::from(source);
        let span = Span::new(0, content.len() - 1);
        let close = Close::from_source(
            span,
            content.clone(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            Arc::from("Assets:Checking"),
            Vec::new(),
        );
        let file = File::new(content, Arc::from("test.ledger"), vec![Directive::Close(close)]);
        assert_eq!(file.dump(), source);
    }
}
