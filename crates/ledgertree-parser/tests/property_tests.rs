//! Property-based tests for round-trip and indentation invariants.
//!
//! Run with: cargo test -p ledgertree-parser --test property_tests

use ledgertree_parser::parse_string;
use ledgertree_syntax::{Directive, Node};
use proptest::prelude::*;
use rust_decimal::Decimal;

// Arbitrary generators

fn arb_indent() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("  "), Just("   "), Just("    "), Just("\t")]
}

fn arb_amount_cents() -> impl Strategy<Value = i64> {
    1i64..100_000i64
}

fn arb_currency() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("USD"), Just("EUR"), Just("GBP"), Just("BTC")]
}

proptest! {
    /// For any of this grammar's fixed posting indents, a two-posting
    /// transaction's `dump()` reproduces the source byte-for-byte and both
    /// postings keep that exact indent.
    #[test]
    fn transaction_dump_preserves_indent_and_bytes(
        indent in arb_indent(),
        cents in arb_amount_cents(),
        currency in arb_currency(),
    ) {
        let amount = Decimal::new(cents, 2);
        let source = format!(
            "2024-03-01 * \"Store\" \"Thing\"\n{indent}Assets:Cash  -{amount} {currency}\n{indent}Expenses:Misc  {amount} {currency}\n"
        );
        let file = parse_string(&source, "prop.bean").unwrap();
        let Directive::Transaction(tx) = &file.directives[0] else {
            unreachable!("only directive in source is a transaction")
        };
        prop_assert_eq!(tx.dump(), source.trim_end_matches('\n'));
        for posting in &tx.postings {
            prop_assert!(posting.dump().starts_with(indent));
        }
    }

    /// A file made of nothing but the one transaction round-trips through
    /// `dump()` unchanged, regardless of amount or currency chosen.
    #[test]
    fn file_dump_is_idempotent(
        cents in arb_amount_cents(),
        currency in arb_currency(),
    ) {
        let amount = Decimal::new(cents, 2);
        let source = format!(
            "2024-03-01 * \"Store\" \"Thing\"\n    Assets:Cash  -{amount} {currency}\n    Expenses:Misc  {amount} {currency}\n"
        );
        let file = parse_string(&source, "prop.bean").unwrap();
        prop_assert_eq!(file.dump(), source);
    }
}
