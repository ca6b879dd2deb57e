//! `Posting`: one account line inside a transaction, and its price annotation.

use std::sync::Arc;

use crate::amount::Amount;
use crate::cost::CostSpec;
use crate::meta::Meta;
use crate::span::{Node, Origin, Span};
use crate::value::SpannedPriceOperator;

/// A `@ price` or `@@ total-price` annotation on a posting.
#[derive(Debug, Clone)]
pub struct PriceAnnotation {
    span: Span,
    origin: Origin,
    /// The `@` / `@@` operator token.
    pub operator: SpannedPriceOperator,
    /// The price amount.
    pub amount: Amount,
}

impl PriceAnnotation {
    pub(crate) fn from_source(
        span: Span,
        source: Arc<str>,
        operator: SpannedPriceOperator,
        amount: Amount,
    ) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            operator,
            amount,
        }
    }
}

impl Node for PriceAnnotation {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        format!("{} {}", self.operator.dump(), self.amount.dump())
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// One indented account line inside a [`crate::directive::Transaction`] body.
#[derive(Debug, Clone)]
pub struct Posting {
    span: Span,
    origin: Origin,
    /// The optional single-character flag (`*`, `!`, ...) before the account.
    pub flag: Option<char>,
    /// The account name.
    pub account: Arc<str>,
    /// The posting's amount, if one was written (an account-only posting
    /// that relies on booking to infer its amount has `amount: None`).
    pub amount: Option<Amount>,
    /// The cost-basis annotation, if one was written.
    pub cost: Option<CostSpec>,
    /// The price annotation, if one was written.
    pub price: Option<PriceAnnotation>,
    /// Metadata lines indented under this posting.
    pub meta: Meta,
}

impl Posting {
    pub(crate) fn from_source(
        span: Span,
        source: Arc<str>,
        flag: Option<char>,
        account: Arc<str>,
        amount: Option<Amount>,
        cost: Option<CostSpec>,
        price: Option<PriceAnnotation>,
        meta: Meta,
    ) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            flag,
            account,
            amount,
            cost,
            price,
            meta,
        }
    }

    /// Whether this posting has an explicit amount.
    #[must_use]
    pub fn has_amount(&self) -> bool {
        self.amount.is_some()
    }
}

impl Node for Posting {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        let mut line = String::from("    ");
        if let Some(flag) = self.flag {
            line.push(flag);
            line.push(' ');
        }
        line.push_str(&self.account);
        if let Some(amount) = &self.amount {
            line.push_str("  ");
            line.push_str(&amount.dump());
        }
        if let Some(cost) = &self.cost {
            line.push(' ');
            line.push_str(&cost.dump());
        }
        if let Some(price) = &self.price {
            line.push(' ');
            line.push_str(&price.dump());
        }
        for kv in &self.meta {
            line.push('\n');
            line.push_str("      ");
            line.push_str(&kv.dump());
        }
        line
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::KeyValue;
    use crate::value::{KeyValueValue, SpannedKeyValueValue};
    use rust_decimal_macros::dec;

    fn posting(flag: Option<char>, account: &str, amount: Option<Amount>) -> Posting {
        Posting {
            span: Span::new(0, 0),
            origin: Origin::synthesized(),
            flag,
            account: Arc::from(account),
            amount,
            cost: None,
            price: None,
            meta: Vec::new(),
        }
    }

    #[test]
    fn posting_without_amount_renders_bare_account() {
        let p = posting(None, "Assets:Cash", None);
        assert_eq!(p.render(), "    Assets:Cash");
        assert!(!p.has_amount());
    }

    #[test]
    fn posting_with_amount_and_flag() {
        let p = posting(
            Some('!'),
            "Assets:Checking",
            Some(Amount::synthesized(dec!(-50.00), "USD")),
        );
        assert_eq!(p.render(), "    ! Assets:Checking  -50.00 USD");
        assert!(p.has_amount());
    }

    #[test]
    fn posting_meta_indented_two_past_posting() {
        let mut p = posting(
            None,
            "Assets:Cash",
            Some(Amount::synthesized(dec!(10.00), "USD")),
        );
        p.meta.push(KeyValue::synthesized(
            Arc::from("statement"),
            Some(SpannedKeyValueValue::synthesized(KeyValueValue::Str(Arc::from("feb.pdf")))),
        ));
        assert_eq!(
            p.render(),
            "    Assets:Cash  10.00 USD\n      statement: \"feb.pdf\""
        );
    }

    #[test]
    fn price_annotation_render() {
        use crate::value::PriceOperatorKind;
        let price = PriceAnnotation {
            span: Span::new(0, 0),
            origin: Origin::synthesized(),
            operator: SpannedPriceOperator::synthesized(PriceOperatorKind::Unit),
            amount: Amount::synthesized(dec!(1.10), "EUR"),
        };
        assert_eq!(price.render(), "@ 1.10 EUR");
    }
}
