//! Small spanned leaf values shared across directives: strings, booleans,
//! and the `@`/`@@` price operator.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::amount::Amount;
use crate::span::{Node, Origin, Span};

/// A quoted string literal, with escapes already resolved in `value` while
/// `dump()` still reproduces the original quoted, escaped spelling.
#[derive(Debug, Clone)]
pub struct SpannedStr {
    span: Span,
    origin: Origin,
    /// The string's resolved (unescaped) contents.
    pub value: Arc<str>,
}

impl SpannedStr {
    pub(crate) fn from_source(span: Span, source: Arc<str>, value: Arc<str>) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            value,
        }
    }

    /// Build a synthesized string value with no backing source.
    #[must_use]
    pub fn synthesized(value: impl Into<Arc<str>>) -> Self {
        Self {
            span: Span::new(0, 0),
            origin: Origin::synthesized(),
            value: value.into(),
        }
    }
}

impl Node for SpannedStr {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        let mut out = String::with_capacity(self.value.len() + 2);
        out.push('"');
        for ch in self.value.chars() {
            match ch {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                '\r' => out.push_str("\\r"),
                other => out.push(other),
            }
        }
        out.push('"');
        out
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

impl fmt::Display for SpannedStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// A `TRUE` / `FALSE` literal, as used in metadata values.
#[derive(Debug, Clone)]
pub struct SpannedBool {
    span: Span,
    origin: Origin,
    /// The boolean's resolved value.
    pub value: bool,
}

impl SpannedBool {
    pub(crate) fn from_source(span: Span, source: Arc<str>, value: bool) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            value,
        }
    }

    /// Build a synthesized boolean value with no backing source.
    #[must_use]
    pub fn synthesized(value: bool) -> Self {
        Self {
            span: Span::new(0, 0),
            origin: Origin::synthesized(),
            value,
        }
    }
}

impl Node for SpannedBool {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        if self.value { "TRUE" } else { "FALSE" }.to_string()
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// Whether a price annotation names a per-unit price (`@`) or a total price
/// for the whole posting (`@@`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceOperatorKind {
    /// `@` — price is per unit.
    Unit,
    /// `@@` — price is the total for the posting.
    Total,
}

/// The `@` or `@@` token that introduces a price annotation.
#[derive(Debug, Clone)]
pub struct SpannedPriceOperator {
    span: Span,
    origin: Origin,
    /// Whether this is a unit (`@`) or total (`@@`) price operator.
    pub kind: PriceOperatorKind,
}

impl SpannedPriceOperator {
    pub(crate) fn from_source(span: Span, source: Arc<str>, kind: PriceOperatorKind) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            kind,
        }
    }

    /// Build a synthesized price operator with no backing source.
    #[must_use]
    pub fn synthesized(kind: PriceOperatorKind) -> Self {
        Self {
            span: Span::new(0, 0),
            origin: Origin::synthesized(),
            kind,
        }
    }
}

impl Node for SpannedPriceOperator {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        match self.kind {
            PriceOperatorKind::Unit => "@".to_string(),
            PriceOperatorKind::Total => "@@".to_string(),
        }
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// The resolved value half of a metadata key-value pair.
///
/// Unlike [`SpannedKeyValueValue`] this carries no span of its own; it is the
/// payload the spanned wrapper delegates rendering to.
#[derive(Debug, Clone)]
pub enum KeyValueValue {
    /// A quoted string.
    Str(Arc<str>),
    /// A bare account name used as a metadata value.
    Account(Arc<str>),
    /// A bare currency code used as a metadata value.
    Currency(Arc<str>),
    /// A `#tag` used as a metadata value.
    Tag(Arc<str>),
    /// A `^link` used as a metadata value.
    Link(Arc<str>),
    /// A calendar date.
    Date(NaiveDate),
    /// A bare number, with no currency attached.
    Number(Decimal),
    /// A number with a currency attached.
    Amount(Amount),
    /// A `TRUE` / `FALSE` literal.
    Bool(bool),
    /// An explicit absence of a value.
    None,
}

impl fmt::Display for KeyValueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Account(s) | Self::Currency(s) => write!(f, "{s}"),
            Self::Tag(s) => write!(f, "#{s}"),
            Self::Link(s) => write!(f, "^{s}"),
            Self::Date(d) => write!(f, "{d}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Amount(a) => write!(f, "{a}"),
            Self::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Self::None => Ok(()),
        }
    }
}

/// A [`KeyValueValue`] together with the span of source text it was parsed
/// from.
#[derive(Debug, Clone)]
pub struct SpannedKeyValueValue {
    span: Span,
    origin: Origin,
    /// The resolved value.
    pub value: KeyValueValue,
}

impl SpannedKeyValueValue {
    pub(crate) fn from_source(span: Span, source: Arc<str>, value: KeyValueValue) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            value,
        }
    }

    /// Build a synthesized value with no backing source.
    #[must_use]
    pub fn synthesized(value: KeyValueValue) -> Self {
        Self {
            span: Span::new(0, 0),
            origin: Origin::synthesized(),
            value,
        }
    }
}

impl Node for SpannedKeyValueValue {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        self.value.to_string()
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_render_escapes_quotes_and_backslashes() {
        let s = SpannedStr::synthesized("has \"quotes\" and \\backslash");
        assert_eq!(s.dump(), "\"has \\\"quotes\\\" and \\\\backslash\"");
    }

    #[test]
    fn bool_render() {
        assert_eq!(SpannedBool::synthesized(true).dump(), "TRUE");
        assert_eq!(SpannedBool::synthesized(false).dump(), "FALSE");
    }

    #[test]
    fn price_operator_render() {
        assert_eq!(
            SpannedPriceOperator::synthesized(PriceOperatorKind::Unit).dump(),
            "@"
        );
        assert_eq!(
            SpannedPriceOperator::synthesized(PriceOperatorKind::Total).dump(),
            "@@"
        );
    }

    #[test]
    fn key_value_value_display() {
        assert_eq!(KeyValueValue::Tag(Arc::from("vacation")).to_string(), "#vacation");
        assert_eq!(KeyValueValue::Link(Arc::from("trip-42")).to_string(), "^trip-42");
        assert_eq!(KeyValueValue::Bool(true).to_string(), "TRUE");
    }
}
