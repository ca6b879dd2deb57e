//! Span-carrying syntax tree for plain-text double-entry ledger files.
//!
//! This crate provides the fundamental types a parsed ledger file is built
//! from:
//!
//! - [`Span`] and [`Node`] — the byte-range and dump contract every node in
//!   the tree shares.
//! - [`Amount`], [`CostSpec`], [`Posting`] — the value types a transaction's
//!   postings are made of.
//! - [`Directive`] — the closed sum of every directive kind a file can
//!   contain.
//! - [`File`] — a parsed file's directives, in source order.
//!
//! # Example
//!
//! ```
//! use ledgertree_syntax::{Amount, Node};
//! use rust_decimal_macros::dec;
//!
//! let amount = Amount::synthesized(dec!(125.00), "USD");
//! assert_eq!(amount.dump(), "125.00 USD");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod amount;
pub mod cost;
pub mod directive;
pub mod file;
pub mod intern;
pub mod meta;
pub mod number;
pub mod posting;
pub mod span;
pub mod value;

pub use amount::{Amount, CostAmount};
pub use cost::{CostBrace, CostSpec};
pub use directive::{
    Close, Comment, Commodity, Custom, Directive, Document, Event, Headline, Include, Note, Open,
    OptionDirective, Pad, Plugin, PopMeta, Price, PushMeta, Query, TagPop, TagPush, Transaction,
    TransactionExtra,
};
pub use file::File;
pub use intern::StringInterner;
pub use meta::{KeyValue, Meta};
pub use number::{BinaryOpKind, NumberExpr, NumberExprKind, SpannedBinaryOp};
pub use posting::{Posting, PriceAnnotation};
pub use span::{Node, Span};
pub use value::{
    KeyValueValue, PriceOperatorKind, SpannedBool, SpannedKeyValueValue, SpannedPriceOperator,
    SpannedStr,
};

// Re-export commonly used external types
pub use chrono::NaiveDate;
pub use rust_decimal::Decimal;
