//! `CostSpec`: the `{...}` / `{{...}}` cost-basis annotation on a posting.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::amount::CostAmount;
use crate::span::{Node, Origin, Span};

/// Which brace form a [`CostSpec`] was (or should be) written with.
///
/// The grammar selects per-unit vs. total cost by doubling the braces, not
/// by which of `number_per` / `number_total` is populated — an empty `{}`
/// is still syntactically the per-unit form, so this is tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostBrace {
    /// `{...}`
    Unit,
    /// `{{...}}`
    Total,
}

/// A cost-basis annotation attached to a posting, e.g. `{10.00 USD, 2024-01-15, "lot A"}`
/// or the total form `{{500.00 USD}}`.
///
/// Every field is optional at the syntax level: `{}`/`{{}}` with nothing
/// inside is syntactically valid and means "infer everything during
/// booking."
#[derive(Debug, Clone)]
pub struct CostSpec {
    span: Span,
    origin: Origin,
    /// Which brace form was written.
    pub brace: CostBrace,
    /// The per-unit cost amount, if one was given.
    pub number_per: Option<CostAmount>,
    /// The total cost amount, if one was given.
    pub number_total: Option<CostAmount>,
    /// The acquisition date, if given.
    pub date: Option<NaiveDate>,
    /// The lot label, if given.
    pub label: Option<Arc<str>>,
    /// Whether a bare `*` merge marker was present.
    pub merge: bool,
}

impl CostSpec {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_source(
        span: Span,
        source: Arc<str>,
        brace: CostBrace,
        number_per: Option<CostAmount>,
        number_total: Option<CostAmount>,
        date: Option<NaiveDate>,
        label: Option<Arc<str>>,
        merge: bool,
    ) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            brace,
            number_per,
            number_total,
            date,
            label,
            merge,
        }
    }

    /// An empty cost spec (`{}` or `{{}}`), meaning "infer everything."
    #[must_use]
    pub fn empty(brace: CostBrace) -> Self {
        Self {
            span: Span::new(0, 0),
            origin: Origin::synthesized(),
            brace,
            number_per: None,
            number_total: None,
            date: None,
            label: None,
            merge: false,
        }
    }

    /// Whether no fields at all were written inside the braces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.number_per.is_none()
            && self.number_total.is_none()
            && self.date.is_none()
            && self.label.is_none()
            && !self.merge
    }
}

impl Node for CostSpec {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        let mut parts = Vec::new();
        if let Some(number_per) = &self.number_per {
            parts.push(number_per.dump());
        }
        if let Some(number_total) = &self.number_total {
            parts.push(format!("# {}", number_total.dump()));
        }
        if let Some(date) = self.date {
            parts.push(date.to_string());
        }
        if let Some(label) = &self.label {
            parts.push(format!("\"{label}\""));
        }
        if self.merge {
            parts.push("*".to_string());
        }
        let inner = parts.join(", ");
        match self.brace {
            CostBrace::Unit => format!("{{{inner}}}"),
            CostBrace::Total => format!("{{{{{inner}}}}}"),
        }
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

impl fmt::Display for CostSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_unit_cost_renders_single_braces() {
        assert_eq!(CostSpec::empty(CostBrace::Unit).dump(), "{}");
    }

    #[test]
    fn empty_total_cost_renders_double_braces() {
        assert_eq!(CostSpec::empty(CostBrace::Total).dump(), "{{}}");
    }

    #[test]
    fn cost_with_amount_and_date_and_label() {
        let mut spec = CostSpec::empty(CostBrace::Unit);
        spec.number_per = Some(CostAmount::synthesized(Some(dec!(10.00)), Some(Arc::from("USD"))));
        spec.date = Some(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        spec.label = Some(Arc::from("lot A"));
        assert_eq!(spec.dump(), "{10.00 USD, 2024-01-15, \"lot A\"}");
    }

    #[test]
    fn total_cost_with_merge_marker() {
        let mut spec = CostSpec::empty(CostBrace::Total);
        spec.number_total = Some(CostAmount::synthesized(Some(dec!(500.00)), Some(Arc::from("USD"))));
        spec.merge = true;
        assert_eq!(spec.dump(), "{{# 500.00 USD, *}}");
    }

    #[test]
    fn is_empty_detects_bare_braces() {
        assert!(CostSpec::empty(CostBrace::Unit).is_empty());
        let mut spec = CostSpec::empty(CostBrace::Unit);
        spec.merge = true;
        assert!(!spec.is_empty());
    }
}
