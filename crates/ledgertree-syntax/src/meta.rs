//! Metadata key-value pairs attached to directives and postings.

use std::sync::Arc;

use crate::span::{Node, Origin, Span};
use crate::value::SpannedKeyValueValue;

/// One `key: value` metadata line.
///
/// Metadata is an ordered, non-deduplicating list rather than a map: a
/// directive can legally carry the same key twice, and the order keys were
/// written in is itself observable (byte-fidelity round-trip depends on it).
#[derive(Debug, Clone)]
pub struct KeyValue {
    span: Span,
    origin: Origin,
    /// The metadata key, without its trailing colon.
    pub key: Arc<str>,
    /// The metadata value, or `None` for `key:` with nothing after it.
    pub value: Option<SpannedKeyValueValue>,
}

impl KeyValue {
    pub(crate) fn from_source(
        span: Span,
        source: Arc<str>,
        key: Arc<str>,
        value: Option<SpannedKeyValueValue>,
    ) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            key,
            value,
        }
    }

    /// Build a synthesized key-value pair with no backing source.
    #[must_use]
    pub fn synthesized(key: impl Into<Arc<str>>, value: Option<SpannedKeyValueValue>) -> Self {
        Self {
            span: Span::new(0, 0),
            origin: Origin::synthesized(),
            key: key.into(),
            value,
        }
    }
}

impl Node for KeyValue {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        match &self.value {
            Some(value) => format!("{}: {}", self.key, value.dump()),
            None => format!("{}:", self.key),
        }
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// An ordered list of metadata key-value pairs attached to a directive or
/// posting.
pub type Meta = Vec<KeyValue>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::KeyValueValue;

    #[test]
    fn key_with_value_renders() {
        let kv = KeyValue::synthesized(
            "statement",
            Some(SpannedKeyValueValue::synthesized(KeyValueValue::Str(
                Arc::from("march.pdf"),
            ))),
        );
        assert_eq!(kv.dump(), "statement: \"march.pdf\"");
    }

    #[test]
    fn key_without_value_renders_bare_colon() {
        let kv = KeyValue::synthesized("flag", None);
        assert_eq!(kv.dump(), "flag:");
    }

    #[test]
    fn meta_preserves_duplicate_keys_in_order() {
        let meta: Meta = vec![
            KeyValue::synthesized("a", None),
            KeyValue::synthesized("a", None),
        ];
        assert_eq!(meta.len(), 2);
    }
}
