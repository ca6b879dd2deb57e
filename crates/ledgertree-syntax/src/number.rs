//! Arithmetic number expressions (`100 + 0.5`, `(3 * 4) / 2`, unary `-5`).

use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::span::{Node, Origin, Span};

/// One of the four binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOpKind {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

impl fmt::Display for BinaryOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        })
    }
}

/// A `+ - * /` token together with its source span.
#[derive(Debug, Clone)]
pub struct SpannedBinaryOp {
    span: Span,
    origin: Origin,
    /// The operator this token spells.
    pub kind: BinaryOpKind,
}

impl SpannedBinaryOp {
    pub(crate) fn from_source(span: Span, source: Arc<str>, kind: BinaryOpKind) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            kind,
        }
    }

    /// Build a synthesized operator token with no backing source.
    #[must_use]
    pub fn synthesized(kind: BinaryOpKind) -> Self {
        Self {
            span: Span::new(0, 0),
            origin: Origin::synthesized(),
            kind,
        }
    }
}

impl Node for SpannedBinaryOp {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        self.kind.to_string()
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// The shape of a [`NumberExpr`], independent of its evaluated value.
///
/// Kept alongside the evaluated decimal so that `render()` can reproduce the
/// original operator tree for a synthesized expression instead of collapsing
/// it to a single literal.
#[derive(Debug, Clone)]
pub enum NumberExprKind {
    /// A bare decimal literal.
    Literal(Decimal),
    /// A unary minus applied to an operand.
    Neg(Box<NumberExpr>),
    /// A binary operator applied to two operands.
    Binary {
        /// The operator.
        op: SpannedBinaryOp,
        /// Left-hand operand.
        lhs: Box<NumberExpr>,
        /// Right-hand operand.
        rhs: Box<NumberExpr>,
    },
    /// A parenthesized sub-expression, kept distinct from its inner value so
    /// dump can reproduce the parentheses.
    Paren(Box<NumberExpr>),
}

/// An arithmetic expression over decimals: literals, `+ - * /`, unary `-`,
/// and `(...)` grouping.
///
/// Carries both the evaluated, arbitrary-precision result and the shape of
/// the expression that produced it, so a synthesized `NumberExpr` can be
/// rendered back to the operators that were actually written.
#[derive(Debug, Clone)]
pub struct NumberExpr {
    span: Span,
    origin: Origin,
    /// The expression's evaluated result.
    pub value: Decimal,
    /// The shape of the expression.
    pub kind: NumberExprKind,
}

impl NumberExpr {
    pub(crate) fn from_source(
        span: Span,
        source: Arc<str>,
        value: Decimal,
        kind: NumberExprKind,
    ) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            value,
            kind,
        }
    }

    /// Build a synthesized literal expression with no backing source.
    #[must_use]
    pub fn literal(value: Decimal) -> Self {
        Self {
            span: Span::new(0, 0),
            origin: Origin::synthesized(),
            value,
            kind: NumberExprKind::Literal(value),
        }
    }
}

impl Node for NumberExpr {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        match &self.kind {
            NumberExprKind::Literal(n) => n.to_string(),
            NumberExprKind::Neg(operand) => format!("-{}", operand.dump()),
            NumberExprKind::Binary { op, lhs, rhs } => {
                format!("{} {} {}", lhs.dump(), op.dump(), rhs.dump())
            }
            NumberExprKind::Paren(inner) => format!("({})", inner.dump()),
        }
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

impl fmt::Display for NumberExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn literal_renders_to_decimal() {
        let expr = NumberExpr::literal(dec!(100.5));
        assert_eq!(expr.dump(), "100.5");
    }

    #[test]
    fn neg_renders_with_minus() {
        let inner = NumberExpr::literal(dec!(5));
        let expr = NumberExpr {
            span: Span::new(0, 0),
            origin: Origin::synthesized(),
            value: dec!(-5),
            kind: NumberExprKind::Neg(Box::new(inner)),
        };
        assert_eq!(expr.dump(), "-5");
    }

    #[test]
    fn binary_renders_with_spaces() {
        let lhs = NumberExpr::literal(dec!(100));
        let rhs = NumberExpr::literal(dec!(0.5));
        let expr = NumberExpr {
            span: Span::new(0, 0),
            origin: Origin::synthesized(),
            value: dec!(100.5),
            kind: NumberExprKind::Binary {
                op: SpannedBinaryOp::synthesized(BinaryOpKind::Add),
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        };
        assert_eq!(expr.dump(), "100 + 0.5");
    }
}
