//! `Amount` and `CostAmount`: a decimal number paired with a currency code.

use std::fmt;
use std::ops::Neg;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::number::NumberExpr;
use crate::span::{Node, Origin, Span};

/// A number and the currency it is denominated in, e.g. `125.00 USD`.
///
/// The number is kept as a full [`NumberExpr`] rather than a bare [`Decimal`]
/// so that an arithmetic amount (`10 + 2.50 USD`) still dumps back to the
/// expression that was written, not just its evaluated result.
#[derive(Debug, Clone)]
pub struct Amount {
    span: Span,
    origin: Origin,
    /// The amount's numeric expression.
    pub number: NumberExpr,
    /// The currency code.
    pub currency: Arc<str>,
}

impl Amount {
    pub(crate) fn from_source(
        span: Span,
        source: Arc<str>,
        number: NumberExpr,
        currency: Arc<str>,
    ) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            number,
            currency,
        }
    }

    /// Build a synthesized amount with no backing source.
    #[must_use]
    pub fn synthesized(value: Decimal, currency: impl Into<Arc<str>>) -> Self {
        Self {
            span: Span::new(0, 0),
            origin: Origin::synthesized(),
            number: NumberExpr::literal(value),
            currency: currency.into(),
        }
    }

    /// The amount's evaluated decimal value.
    #[must_use]
    pub fn value(&self) -> Decimal {
        self.number.value
    }

    /// Whether the evaluated value is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.number.value.is_zero()
    }
}

impl Node for Amount {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        format!("{} {}", self.number.dump(), self.currency)
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.currency)
    }
}

impl Neg for &Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount::synthesized(-self.number.value, Arc::clone(&self.currency))
    }
}

/// A number and currency appearing inside a [`crate::CostSpec`]'s `{...}` /
/// `{{...}}` annotation.
///
/// Both fields are optional: a cost amount can name only a currency
/// (`{USD}`, inferred number), only a number (`{10.00}`, inferred currency),
/// both, or neither (an empty slot reserved by a comma, e.g. `{, "lot"}`).
#[derive(Debug, Clone)]
pub struct CostAmount {
    span: Span,
    origin: Origin,
    /// The cost amount's numeric expression, if one was written.
    pub number: Option<NumberExpr>,
    /// The currency code, if one was written.
    pub currency: Option<Arc<str>>,
}

impl CostAmount {
    pub(crate) fn from_source(
        span: Span,
        source: Arc<str>,
        number: Option<NumberExpr>,
        currency: Option<Arc<str>>,
    ) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            number,
            currency,
        }
    }

    /// Build a synthesized cost amount with no backing source.
    #[must_use]
    pub fn synthesized(value: Option<Decimal>, currency: Option<Arc<str>>) -> Self {
        Self {
            span: Span::new(0, 0),
            origin: Origin::synthesized(),
            number: value.map(NumberExpr::literal),
            currency,
        }
    }
}

impl Node for CostAmount {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        match (&self.number, &self.currency) {
            (Some(number), Some(currency)) => format!("{} {}", number.dump(), currency),
            (Some(number), None) => number.dump(),
            (None, Some(currency)) => currency.to_string(),
            (None, None) => String::new(),
        }
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn amount_render() {
        let amount = Amount::synthesized(dec!(125.00), "USD");
        assert_eq!(amount.dump(), "125.00 USD");
    }

    #[test]
    fn amount_is_zero() {
        assert!(Amount::synthesized(dec!(0), "USD").is_zero());
        assert!(!Amount::synthesized(dec!(0.01), "USD").is_zero());
    }

    #[test]
    fn amount_neg() {
        let amount = Amount::synthesized(dec!(10), "USD");
        let negated = -&amount;
        assert_eq!(negated.value(), dec!(-10));
    }

    #[test]
    fn cost_amount_render_without_currency() {
        let cost_amount = CostAmount::synthesized(Some(dec!(10.00)), None);
        assert_eq!(cost_amount.dump(), "10.00");
    }

    #[test]
    fn cost_amount_render_with_currency() {
        let cost_amount = CostAmount::synthesized(Some(dec!(10.00)), Some(Arc::from("USD")));
        assert_eq!(cost_amount.dump(), "10.00 USD");
    }

    #[test]
    fn cost_amount_currency_only_renders_bare_currency() {
        let cost_amount = CostAmount::synthesized(None, Some(Arc::from("USD")));
        assert_eq!(cost_amount.dump(), "USD");
    }
}
