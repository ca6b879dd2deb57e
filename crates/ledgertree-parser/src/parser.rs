//! The hand-written recursive-descent parser.
//!
//! Single-pass, one token of lookahead, no backtracking past that lookahead,
//! and no error recovery: the grammar is LL(1) once the lexer has
//! disambiguated token kinds, and the first error halts the parse and is
//! returned directly (§7's fail-fast semantics rule out the chumsky-style
//! error-recovering combinator parser this crate's sibling crates use
//! elsewhere in the wider workspace).

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use ledgertree_syntax::cost::CostBrace;
use ledgertree_syntax::directive::TransactionExtra;
use ledgertree_syntax::value::{KeyValueValue, PriceOperatorKind};
use ledgertree_syntax::{
    Amount, Close, Comment, Commodity, CostAmount, CostSpec, Custom, Directive, Document, Event,
    File, Headline, Include, KeyValue, Meta, Node, Note, NumberExpr, NumberExprKind, Open,
    OptionDirective, Pad, Plugin, PopMeta, Posting, Price, PriceAnnotation, PushMeta, Query, Span,
    SpannedBinaryOp, SpannedBool, SpannedKeyValueValue, SpannedPriceOperator, SpannedStr,
    StringInterner, TagPop, TagPush,
};

use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{tokenize, SpannedToken, Token};

/// Number expressions may nest at most this many parentheses deep before the
/// parser rejects the expression rather than risk stack exhaustion.
const MAX_EXPR_DEPTH: usize = 64;

/// The fixed number of fractional digits division is allowed to produce
/// before the parser rejects it as non-terminating.
const DIVISION_PRECISION: u32 = 28;

type PResult<T> = Result<T, ParseError>;

struct Parser<'src> {
    tokens: Vec<SpannedToken<'src>>,
    pos: usize,
    source: Arc<str>,
    filename: Arc<str>,
    interner: StringInterner,
}

/// Parse `source` (already read into memory) into a [`File`].
///
/// # Errors
///
/// Returns the first lex, syntax, or semantic-local error encountered.
/// Parsing halts at that point; no partial tree is returned.
pub fn parse_string(content: impl Into<Arc<str>>, filename: impl Into<Arc<str>>) -> PResult<File> {
    let source: Arc<str> = content.into();
    let filename: Arc<str> = filename.into();

    let tokens = tokenize(&source).map_err(|e| {
        let kind = if source.as_bytes().get(e.span.start) == Some(&b'"') {
            ParseErrorKind::UnterminatedString
        } else {
            ParseErrorKind::UnexpectedChar {
                found: source[e.span.start..].chars().next().unwrap_or('\u{0}'),
            }
        };
        ParseError::new(filename.clone(), source.clone(), e.span, kind)
    })?;

    // SAFETY-free lifetime laundering: `tokens` borrows from `source`, which
    // this function keeps alive (via the `Arc<str>` clones below) for as
    // long as the resulting `File` lives, so the borrow is sound in spirit;
    // we copy out every token's text into owned `Arc<str>` fields as soon as
    // an AST node is built, so no borrowed data survives this function.
    let mut parser = Parser {
        tokens,
        pos: 0,
        source: source.clone(),
        filename,
        interner: StringInterner::new(),
    };

    let filename = parser.filename.clone();
    let directives = parser.parse_file()?;
    Ok(File::new(source.clone(), filename, directives))
}

impl<'src> Parser<'src> {
    fn peek(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token<'src>> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map_or_else(|| Span::new(self.source.len(), self.source.len()), |t| t.span)
    }

    fn advance(&mut self) -> Option<SpannedToken<'src>> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, span: Span, kind: ParseErrorKind) -> ParseError {
        ParseError::new(self.filename.clone(), self.source.clone(), span, kind)
    }

    fn expected(&self, expected: &str) -> ParseError {
        let found = self
            .peek()
            .map_or_else(|| "end of input".to_string(), |t| t.to_string());
        self.error(
            self.peek_span(),
            ParseErrorKind::Expected {
                expected: expected.to_string(),
                found,
            },
        )
    }

    fn skip_blank_lines(&mut self) {
        while matches!(self.peek(), Some(Token::Newline)) {
            self.pos += 1;
        }
    }

    fn expect_newline_or_eof(&mut self) -> PResult<()> {
        match self.peek() {
            Some(Token::Newline) | None => {
                self.advance();
                Ok(())
            }
            _ => Err(self.expected("end of line")),
        }
    }

    fn intern(&mut self, s: &str) -> Arc<str> {
        self.interner.intern(s)
    }

    fn parse_file(&mut self) -> PResult<Vec<Directive>> {
        let mut directives = Vec::new();
        self.skip_blank_lines();
        while self.peek().is_some() {
            directives.push(self.parse_directive()?);
            self.skip_blank_lines();
        }
        Ok(directives)
    }

    fn parse_directive(&mut self) -> PResult<Directive> {
        match self.peek() {
            Some(Token::Date(_)) => self.parse_dated_directive(),
            Some(Token::OptionKw) => self.parse_option().map(Directive::Option),
            Some(Token::Include) => self.parse_include().map(Directive::Include),
            Some(Token::Plugin) => self.parse_plugin().map(Directive::Plugin),
            Some(Token::Pushtag) => self.parse_tag_push().map(Directive::TagPush),
            Some(Token::Poptag) => self.parse_tag_pop().map(Directive::TagPop),
            Some(Token::Pushmeta) => self.parse_pushmeta().map(Directive::PushMeta),
            Some(Token::Popmeta) => self.parse_popmeta().map(Directive::PopMeta),
            Some(Token::Comment(_)) => self.parse_comment().map(Directive::Comment),
            Some(Token::Star) if self.looks_like_headline() => {
                self.parse_headline().map(Directive::Headline)
            }
            _ => Err(self.expected("a directive")),
        }
    }

    /// A bare run of `*` at column 0 followed by anything other than what a
    /// transaction flag would be followed by (a date never precedes it, so
    /// any `*` reaching `parse_directive` at top level is a headline).
    fn looks_like_headline(&self) -> bool {
        matches!(self.peek(), Some(Token::Star))
    }

    fn parse_headline(&mut self) -> PResult<Headline> {
        let start = self.peek_span();
        let mut level = 0usize;
        while matches!(self.peek(), Some(Token::Star)) {
            self.advance();
            level += 1;
        }
        let mut text = String::new();
        let mut end = start;
        loop {
            match self.peek() {
                Some(Token::Newline) | None => break,
                _ => {
                    let tok = self.advance().unwrap();
                    if !text.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(&tok.token.to_string());
                    end = tok.span;
                }
            }
        }
        self.expect_newline_or_eof()?;
        let span = start.merge(&end);
        Ok(Headline::from_source(
            span,
            self.source.clone(),
            level,
            Arc::from(text.trim()),
        ))
    }

    fn parse_comment(&mut self) -> PResult<Comment> {
        let tok = self.advance().unwrap();
        let Token::Comment(text) = tok.token else {
            unreachable!()
        };
        self.expect_newline_or_eof()?;
        Ok(Comment::from_source(tok.span, self.source.clone(), Arc::from(text)))
    }

    fn parse_dated_directive(&mut self) -> PResult<Directive> {
        let date_tok = self.advance().unwrap();
        let Token::Date(date_text) = date_tok.token else {
            unreachable!()
        };
        let date = self.parse_date_value(date_text, date_tok.span)?;

        match self.peek() {
            Some(Token::Open) => {
                self.advance();
                self.parse_open(date_tok.span, date)
            }
            Some(Token::Close) => {
                self.advance();
                self.parse_close(date_tok.span, date)
            }
            Some(Token::Balance) => {
                self.advance();
                self.parse_balance(date_tok.span, date)
            }
            Some(Token::Pad) => {
                self.advance();
                self.parse_pad(date_tok.span, date)
            }
            Some(Token::Commodity) => {
                self.advance();
                self.parse_commodity(date_tok.span, date)
            }
            Some(Token::Price) => {
                self.advance();
                self.parse_price(date_tok.span, date)
            }
            Some(Token::Event) => {
                self.advance();
                self.parse_event(date_tok.span, date)
            }
            Some(Token::Query) => {
                self.advance();
                self.parse_query(date_tok.span, date)
            }
            Some(Token::Note) => {
                self.advance();
                self.parse_note(date_tok.span, date)
            }
            Some(Token::Document) => {
                self.advance();
                self.parse_document(date_tok.span, date)
            }
            Some(Token::Custom) => {
                self.advance();
                self.parse_custom(date_tok.span, date)
            }
            Some(tok) if tok.is_txn_flag() => self.parse_transaction(date_tok.span, date),
            _ => Err(self.expected(
                "one of open|close|balance|pad|commodity|price|event|query|note|document|custom|txn|<flag>",
            )),
        }
    }

    fn parse_date_value(&self, text: &str, span: Span) -> PResult<NaiveDate> {
        NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| {
            self.error(
                span,
                ParseErrorKind::InvalidDate {
                    text: text.to_string(),
                },
            )
        })
    }

    fn parse_account(&mut self) -> PResult<(Arc<str>, Span)> {
        match self.peek() {
            Some(Token::Account(_)) => {
                let tok = self.advance().unwrap();
                let Token::Account(text) = tok.token else {
                    unreachable!()
                };
                Ok((self.intern(text), tok.span))
            }
            _ => Err(self.expected("an account name")),
        }
    }

    fn parse_currency(&mut self) -> PResult<(Arc<str>, Span)> {
        match self.peek() {
            Some(Token::Currency(_)) => {
                let tok = self.advance().unwrap();
                let Token::Currency(text) = tok.token else {
                    unreachable!()
                };
                Ok((self.intern(text), tok.span))
            }
            _ => Err(self.expected("a currency code")),
        }
    }

    fn parse_string_literal(&mut self) -> PResult<SpannedStr> {
        match self.peek() {
            Some(Token::Str(_)) => {
                let tok = self.advance().unwrap();
                let Token::Str(raw) = tok.token else { unreachable!() };
                let value = self.unescape(raw, tok.span)?;
                Ok(SpannedStr::from_source(tok.span, self.source.clone(), value))
            }
            _ => Err(self.expected("a string literal")),
        }
    }

    fn unescape(&self, raw: &str, span: Span) -> PResult<Arc<str>> {
        let inner = &raw[1..raw.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('\\') => out.push('\\'),
                    Some('"') => out.push('"'),
                    Some(other) => {
                        return Err(self.error(span, ParseErrorKind::InvalidEscape { escape: other }))
                    }
                    None => return Err(self.error(span, ParseErrorKind::UnterminatedString)),
                }
            } else {
                out.push(c);
            }
        }
        Ok(Arc::from(out))
    }

    fn parse_number_literal(&mut self, depth: usize) -> PResult<NumberExpr> {
        if depth > MAX_EXPR_DEPTH {
            return Err(self.error(
                self.peek_span(),
                ParseErrorKind::ExpressionTooDeep { limit: MAX_EXPR_DEPTH },
            ));
        }
        match self.peek() {
            Some(Token::Minus) => {
                let start = self.advance().unwrap().span;
                let operand = self.parse_number_factor(depth + 1)?;
                let span = start.merge(&operand.span());
                let value = -operand.value;
                Ok(NumberExpr::from_source(
                    span,
                    self.source.clone(),
                    value,
                    NumberExprKind::Neg(Box::new(operand)),
                ))
            }
            _ => self.parse_number_factor(depth),
        }
    }

    fn parse_number_factor(&mut self, depth: usize) -> PResult<NumberExpr> {
        if depth > MAX_EXPR_DEPTH {
            return Err(self.error(
                self.peek_span(),
                ParseErrorKind::ExpressionTooDeep { limit: MAX_EXPR_DEPTH },
            ));
        }
        match self.peek() {
            Some(Token::LParen) => {
                let start = self.advance().unwrap().span;
                let inner = self.parse_number_expr(depth + 1)?;
                let end = match self.peek() {
                    Some(Token::RParen) => self.advance().unwrap().span,
                    _ => return Err(self.expected("')'")),
                };
                let span = start.merge(&end);
                let value = inner.value;
                Ok(NumberExpr::from_source(
                    span,
                    self.source.clone(),
                    value,
                    NumberExprKind::Paren(Box::new(inner)),
                ))
            }
            Some(Token::Number(_)) => {
                let tok = self.advance().unwrap();
                let Token::Number(text) = tok.token else { unreachable!() };
                let cleaned: String = text.chars().filter(|c| *c != ',').collect();
                let value: Decimal = cleaned.parse().map_err(|_| {
                    self.error(
                        tok.span,
                        ParseErrorKind::InvalidNumber {
                            text: text.to_string(),
                        },
                    )
                })?;
                Ok(NumberExpr::from_source(
                    tok.span,
                    self.source.clone(),
                    value,
                    NumberExprKind::Literal(value),
                ))
            }
            _ => Err(self.expected("a number")),
        }
    }

    fn parse_number_term(&mut self, depth: usize) -> PResult<NumberExpr> {
        let mut lhs = self.parse_number_literal(depth)?;
        loop {
            let (kind, op_span) = match self.peek() {
                Some(Token::Star) => (
                    ledgertree_syntax::BinaryOpKind::Mul,
                    self.peek_span(),
                ),
                Some(Token::Slash) => (
                    ledgertree_syntax::BinaryOpKind::Div,
                    self.peek_span(),
                ),
                _ => break,
            };
            self.advance();
            let rhs = self.parse_number_literal(depth)?;
            let value = match kind {
                ledgertree_syntax::BinaryOpKind::Mul => lhs.value * rhs.value,
                ledgertree_syntax::BinaryOpKind::Div => {
                    if rhs.value.is_zero() {
                        return Err(self.error(op_span, ParseErrorKind::InvalidNumber {
                            text: "division by zero".to_string(),
                        }));
                    }
                    let quotient = lhs.value / rhs.value;
                    if quotient * rhs.value != lhs.value {
                        return Err(self.error(
                            op_span,
                            ParseErrorKind::NonTerminatingDivision {
                                precision: DIVISION_PRECISION,
                            },
                        ));
                    }
                    quotient
                }
                _ => unreachable!(),
            };
            let op = SpannedBinaryOp::from_source(op_span, self.source.clone(), kind);
            let span = lhs.span().merge(&rhs.span());
            lhs = NumberExpr::from_source(
                span,
                self.source.clone(),
                value,
                NumberExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            );
        }
        Ok(lhs)
    }

    fn parse_number_expr(&mut self, depth: usize) -> PResult<NumberExpr> {
        let mut lhs = self.parse_number_term(depth)?;
        loop {
            let (kind, op_span) = match self.peek() {
                Some(Token::Plus) => (ledgertree_syntax::BinaryOpKind::Add, self.peek_span()),
                Some(Token::Minus) => (ledgertree_syntax::BinaryOpKind::Sub, self.peek_span()),
                _ => break,
            };
            self.advance();
            let rhs = self.parse_number_term(depth)?;
            let value = match kind {
                ledgertree_syntax::BinaryOpKind::Add => lhs.value + rhs.value,
                ledgertree_syntax::BinaryOpKind::Sub => lhs.value - rhs.value,
                _ => unreachable!(),
            };
            let op = SpannedBinaryOp::from_source(op_span, self.source.clone(), kind);
            let span = lhs.span().merge(&rhs.span());
            lhs = NumberExpr::from_source(
                span,
                self.source.clone(),
                value,
                NumberExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            );
        }
        Ok(lhs)
    }

    fn parse_amount(&mut self) -> PResult<Amount> {
        let number = self.parse_number_expr(0)?;
        let (currency, currency_span) = self.parse_currency()?;
        let span = number.span().merge(&currency_span);
        Ok(Amount::from_source(span, self.source.clone(), number, currency))
    }

    fn parse_open(&mut self, date_span: Span, date: NaiveDate) -> PResult<Directive> {
        let (account, _) = self.parse_account()?;
        let mut currencies = Vec::new();
        if matches!(self.peek(), Some(Token::Currency(_))) {
            loop {
                let (currency, _) = self.parse_currency()?;
                currencies.push(currency);
                if matches!(self.peek(), Some(Token::Comma)) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        let booking = if matches!(self.peek(), Some(Token::Str(_))) {
            Some(self.parse_string_literal()?.value.clone())
        } else {
            None
        };
        let mut end = self.peek_span();
        let meta = self.parse_trailing_meta()?;
        if let Some(last) = meta.last() {
            end = end.merge(&last.span());
        }
        let span = date_span.merge(&end);
        Ok(Directive::Open(Open::from_source(
            span,
            self.source.clone(),
            date,
            account,
            currencies,
            booking,
            meta,
        )))
    }

    fn parse_close(&mut self, date_span: Span, date: NaiveDate) -> PResult<Directive> {
        let (account, mut end) = self.parse_account()?;
        let meta = self.parse_trailing_meta()?;
        if let Some(last) = meta.last() {
            end = end.merge(&last.span());
        }
        let span = date_span.merge(&end);
        Ok(Directive::Close(Close::from_source(span, self.source.clone(), date, account, meta)))
    }

    fn parse_balance(&mut self, date_span: Span, date: NaiveDate) -> PResult<Directive> {
        let (account, _) = self.parse_account()?;
        let amount = self.parse_amount()?;
        let mut end = amount.span();
        let tolerance = if matches!(self.peek(), Some(Token::Tilde)) {
            self.advance();
            let tol = self.parse_number_expr(0)?;
            end = tol.span();
            Some(tol.value)
        } else {
            None
        };
        let meta = self.parse_trailing_meta()?;
        if let Some(last) = meta.last() {
            end = end.merge(&last.span());
        }
        let span = date_span.merge(&end);
        Ok(Directive::Balance(balance_from(
            span,
            self.source.clone(),
            date,
            account,
            amount,
            tolerance,
            meta,
        )))
    }

    fn parse_pad(&mut self, date_span: Span, date: NaiveDate) -> PResult<Directive> {
        let (account, _) = self.parse_account()?;
        let (source_account, mut end) = self.parse_account()?;
        let meta = self.parse_trailing_meta()?;
        if let Some(last) = meta.last() {
            end = end.merge(&last.span());
        }
        let span = date_span.merge(&end);
        Ok(Directive::Pad(Pad::from_source(
            span,
            self.source.clone(),
            date,
            account,
            source_account,
            meta,
        )))
    }

    fn parse_commodity(&mut self, date_span: Span, date: NaiveDate) -> PResult<Directive> {
        let (currency, mut end) = self.parse_currency()?;
        let meta = self.parse_trailing_meta()?;
        if let Some(last) = meta.last() {
            end = end.merge(&last.span());
        }
        let span = date_span.merge(&end);
        Ok(Directive::Commodity(Commodity::from_source(
            span,
            self.source.clone(),
            date,
            currency,
            meta,
        )))
    }

    fn parse_price(&mut self, date_span: Span, date: NaiveDate) -> PResult<Directive> {
        let (currency, _) = self.parse_currency()?;
        let amount = self.parse_amount()?;
        let mut end = amount.span();
        let meta = self.parse_trailing_meta()?;
        if let Some(last) = meta.last() {
            end = end.merge(&last.span());
        }
        let span = date_span.merge(&end);
        Ok(Directive::Price(Price::from_source(
            span,
            self.source.clone(),
            date,
            currency,
            amount,
            meta,
        )))
    }

    fn parse_event(&mut self, date_span: Span, date: NaiveDate) -> PResult<Directive> {
        let event_type = self.parse_string_literal()?;
        let value = self.parse_string_literal()?;
        let mut end = value.span();
        let meta = self.parse_trailing_meta()?;
        if let Some(last) = meta.last() {
            end = end.merge(&last.span());
        }
        let span = date_span.merge(&end);
        Ok(Directive::Event(Event::from_source(
            span,
            self.source.clone(),
            date,
            event_type,
            value,
            meta,
        )))
    }

    fn parse_query(&mut self, date_span: Span, date: NaiveDate) -> PResult<Directive> {
        let name = self.parse_string_literal()?;
        let query = self.parse_string_literal()?;
        let mut end = query.span();
        let meta = self.parse_trailing_meta()?;
        if let Some(last) = meta.last() {
            end = end.merge(&last.span());
        }
        let span = date_span.merge(&end);
        Ok(Directive::Query(Query::from_source(
            span,
            self.source.clone(),
            date,
            name,
            query,
            meta,
        )))
    }

    fn parse_note(&mut self, date_span: Span, date: NaiveDate) -> PResult<Directive> {
        let (account, _) = self.parse_account()?;
        let comment = self.parse_string_literal()?;
        let mut end = comment.span();
        let meta = self.parse_trailing_meta()?;
        if let Some(last) = meta.last() {
            end = end.merge(&last.span());
        }
        let span = date_span.merge(&end);
        Ok(Directive::Note(Note::from_source(
            span,
            self.source.clone(),
            date,
            account,
            comment,
            meta,
        )))
    }

    fn parse_document(&mut self, date_span: Span, date: NaiveDate) -> PResult<Directive> {
        let (account, _) = self.parse_account()?;
        let path = self.parse_string_literal()?;
        let mut end = path.span();
        let (tags, links) = self.parse_tags_links(&mut end)?;
        let meta = self.parse_trailing_meta()?;
        if let Some(last) = meta.last() {
            end = end.merge(&last.span());
        }
        let span = date_span.merge(&end);
        Ok(Directive::Document(Document::from_source(
            span,
            self.source.clone(),
            date,
            account,
            path,
            tags,
            links,
            meta,
        )))
    }

    fn parse_custom(&mut self, date_span: Span, date: NaiveDate) -> PResult<Directive> {
        let custom_type = self.parse_string_literal()?;
        let mut values = Vec::new();
        let mut end = custom_type.span();
        loop {
            match self.peek() {
                Some(Token::Newline) | None => break,
                Some(Token::Str(_)) => {
                    let s = self.parse_string_literal()?;
                    end = s.span();
                    values.push(SpannedKeyValueValue::from_source(
                        s.span(),
                        self.source.clone(),
                        KeyValueValue::Str(s.value.clone()),
                    ));
                }
                Some(Token::Number(_)) => {
                    let n = self.parse_number_expr(0)?;
                    if matches!(self.peek(), Some(Token::Currency(_))) {
                        let (currency, currency_span) = self.parse_currency()?;
                        let span = n.span().merge(&currency_span);
                        end = span;
                        let amount = Amount::from_source(span, self.source.clone(), n, currency);
                        values.push(SpannedKeyValueValue::from_source(
                            span,
                            self.source.clone(),
                            KeyValueValue::Amount(amount),
                        ));
                    } else {
                        end = n.span();
                        values.push(SpannedKeyValueValue::from_source(
                            n.span(),
                            self.source.clone(),
                            KeyValueValue::Number(n.value),
                        ));
                    }
                }
                Some(Token::Currency(_)) => {
                    let (currency, currency_span) = self.parse_currency()?;
                    end = currency_span;
                    values.push(SpannedKeyValueValue::from_source(
                        currency_span,
                        self.source.clone(),
                        KeyValueValue::Currency(currency),
                    ));
                }
                Some(Token::Date(text)) => {
                    let tok = self.advance().unwrap();
                    let date = self.parse_date_value(text, tok.span)?;
                    end = tok.span;
                    values.push(SpannedKeyValueValue::from_source(
                        tok.span,
                        self.source.clone(),
                        KeyValueValue::Date(date),
                    ));
                }
                Some(Token::True | Token::False) => {
                    let tok = self.advance().unwrap();
                    let value = matches!(tok.token, Token::True);
                    end = tok.span;
                    values.push(SpannedKeyValueValue::from_source(
                        tok.span,
                        self.source.clone(),
                        KeyValueValue::Bool(value),
                    ));
                }
                Some(Token::Account(_)) => {
                    let (account, account_span) = self.parse_account()?;
                    end = account_span;
                    values.push(SpannedKeyValueValue::from_source(
                        account_span,
                        self.source.clone(),
                        KeyValueValue::Account(account),
                    ));
                }
                _ => break,
            }
        }
        let meta = self.parse_trailing_meta()?;
        if let Some(last) = meta.last() {
            end = end.merge(&last.span());
        }
        let span = date_span.merge(&end);
        Ok(Directive::Custom(Custom::from_source(
            span,
            self.source.clone(),
            date,
            custom_type,
            values,
            meta,
        )))
    }

    fn parse_tags_links(&mut self, end: &mut Span) -> PResult<(Vec<Arc<str>>, Vec<Arc<str>>)> {
        let mut tags = Vec::new();
        let mut links = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Tag(_)) => {
                    let tok = self.advance().unwrap();
                    let Token::Tag(text) = tok.token else { unreachable!() };
                    let tag = self.intern(text);
                    if tags.iter().any(|t: &Arc<str>| **t == *tag) {
                        return Err(self.error(
                            tok.span,
                            ParseErrorKind::DuplicateTag {
                                tag: tag.to_string(),
                            },
                        ));
                    }
                    tags.push(tag);
                    *end = tok.span;
                }
                Some(Token::Link(_)) => {
                    let tok = self.advance().unwrap();
                    let Token::Link(text) = tok.token else { unreachable!() };
                    let link = self.intern(text);
                    if links.iter().any(|l: &Arc<str>| **l == *link) {
                        return Err(self.error(
                            tok.span,
                            ParseErrorKind::DuplicateLink {
                                link: link.to_string(),
                            },
                        ));
                    }
                    links.push(link);
                    *end = tok.span;
                }
                _ => break,
            }
        }
        Ok((tags, links))
    }

    /// Metadata that trails a one-line directive, indented on the lines
    /// immediately after it (the same continuation form a transaction's
    /// body uses, minus postings).
    fn parse_trailing_meta(&mut self) -> PResult<Meta> {
        self.expect_newline_or_eof()?;
        let mut meta = Vec::new();
        while matches!(self.peek(), Some(Token::Indent(_))) && matches!(self.peek_at(1), Some(Token::Key(_))) {
            self.advance();
            meta.push(self.parse_meta_entry()?);
        }
        Ok(meta)
    }

    fn parse_meta_entry(&mut self) -> PResult<KeyValue> {
        let key_tok = self.advance().unwrap();
        let Token::Key(key_text) = key_tok.token else {
            return Err(self.expected("a metadata key"));
        };
        let key = self.intern(key_text);
        let (value, end) = if matches!(self.peek(), Some(Token::Newline) | None) {
            (None, key_tok.span)
        } else {
            let v = self.parse_meta_value()?;
            let span = v.span();
            (Some(v), span)
        };
        self.expect_newline_or_eof()?;
        let span = key_tok.span.merge(&end);
        Ok(KeyValue::from_source(span, self.source.clone(), key, value))
    }

    fn parse_meta_value(&mut self) -> PResult<SpannedKeyValueValue> {
        match self.peek() {
            Some(Token::Str(_)) => {
                let s = self.parse_string_literal()?;
                Ok(SpannedKeyValueValue::from_source(
                    s.span(),
                    self.source.clone(),
                    KeyValueValue::Str(s.value.clone()),
                ))
            }
            Some(Token::Account(_)) => {
                let (account, span) = self.parse_account()?;
                Ok(SpannedKeyValueValue::from_source(span, self.source.clone(), KeyValueValue::Account(account)))
            }
            Some(Token::Currency(_)) => {
                let (currency, span) = self.parse_currency()?;
                Ok(SpannedKeyValueValue::from_source(span, self.source.clone(), KeyValueValue::Currency(currency)))
            }
            Some(Token::Tag(_)) => {
                let tok = self.advance().unwrap();
                let Token::Tag(text) = tok.token else { unreachable!() };
                let tag = self.intern(text);
                Ok(SpannedKeyValueValue::from_source(tok.span, self.source.clone(), KeyValueValue::Tag(tag)))
            }
            Some(Token::Link(_)) => {
                let tok = self.advance().unwrap();
                let Token::Link(text) = tok.token else { unreachable!() };
                let link = self.intern(text);
                Ok(SpannedKeyValueValue::from_source(tok.span, self.source.clone(), KeyValueValue::Link(link)))
            }
            Some(Token::Date(text)) => {
                let tok = self.advance().unwrap();
                let date = self.parse_date_value(text, tok.span)?;
                Ok(SpannedKeyValueValue::from_source(tok.span, self.source.clone(), KeyValueValue::Date(date)))
            }
            Some(Token::True) | Some(Token::False) => {
                let tok = self.advance().unwrap();
                let value = matches!(tok.token, Token::True);
                let _ = SpannedBool::from_source(tok.span, self.source.clone(), value);
                Ok(SpannedKeyValueValue::from_source(tok.span, self.source.clone(), KeyValueValue::Bool(value)))
            }
            Some(Token::Number(_)) => {
                let number = self.parse_number_expr(0)?;
                if matches!(self.peek(), Some(Token::Currency(_))) {
                    let (currency, currency_span) = self.parse_currency()?;
                    let span = number.span().merge(&currency_span);
                    let amount = Amount::from_source(span, self.source.clone(), number, currency);
                    Ok(SpannedKeyValueValue::from_source(span, self.source.clone(), KeyValueValue::Amount(amount)))
                } else {
                    let span = number.span();
                    Ok(SpannedKeyValueValue::from_source(span, self.source.clone(), KeyValueValue::Number(number.value)))
                }
            }
            _ => Err(self.expected("a metadata value")),
        }
    }

    fn parse_option(&mut self) -> PResult<OptionDirective> {
        let start = self.advance().unwrap().span;
        let name = self.parse_string_literal()?;
        let value = self.parse_string_literal()?;
        let end = value.span();
        self.expect_newline_or_eof()?;
        let span = start.merge(&end);
        Ok(OptionDirective::from_source(span, self.source.clone(), name, value))
    }

    fn parse_include(&mut self) -> PResult<Include> {
        let start = self.advance().unwrap().span;
        let path = self.parse_string_literal()?;
        let end = path.span();
        self.expect_newline_or_eof()?;
        let span = start.merge(&end);
        Ok(Include::from_source(span, self.source.clone(), path))
    }

    fn parse_plugin(&mut self) -> PResult<Plugin> {
        let start = self.advance().unwrap().span;
        let name = self.parse_string_literal()?;
        let mut end = name.span();
        let config = if matches!(self.peek(), Some(Token::Str(_))) {
            let c = self.parse_string_literal()?;
            end = c.span();
            Some(c)
        } else {
            None
        };
        self.expect_newline_or_eof()?;
        let span = start.merge(&end);
        Ok(Plugin::from_source(span, self.source.clone(), name, config))
    }

    fn parse_tag_push(&mut self) -> PResult<TagPush> {
        let start = self.advance().unwrap().span;
        let tok = self.advance().ok_or_else(|| self.expected("a tag"))?;
        let Token::Tag(text) = tok.token else {
            return Err(self.expected("a tag"));
        };
        let tag = self.intern(text);
        self.expect_newline_or_eof()?;
        let span = start.merge(&tok.span);
        Ok(TagPush::from_source(span, self.source.clone(), tag))
    }

    fn parse_tag_pop(&mut self) -> PResult<TagPop> {
        let start = self.advance().unwrap().span;
        let tok = self.advance().ok_or_else(|| self.expected("a tag"))?;
        let Token::Tag(text) = tok.token else {
            return Err(self.expected("a tag"));
        };
        let tag = self.intern(text);
        self.expect_newline_or_eof()?;
        let span = start.merge(&tok.span);
        Ok(TagPop::from_source(span, self.source.clone(), tag))
    }

    fn parse_pushmeta(&mut self) -> PResult<PushMeta> {
        let start = self.advance().unwrap().span;
        let key_tok = self.advance().ok_or_else(|| self.expected("a metadata key"))?;
        let Token::Key(key_text) = key_tok.token else {
            return Err(self.expected("a metadata key"));
        };
        let key = self.intern(key_text);
        let (value, end) = if matches!(self.peek(), Some(Token::Newline) | None) {
            (None, key_tok.span)
        } else {
            let v = self.parse_meta_value()?;
            let span = v.span();
            (Some(v), span)
        };
        self.expect_newline_or_eof()?;
        let span = start.merge(&end);
        Ok(PushMeta::from_source(span, self.source.clone(), key, value))
    }

    fn parse_popmeta(&mut self) -> PResult<PopMeta> {
        let start = self.advance().unwrap().span;
        let key_tok = self.advance().ok_or_else(|| self.expected("a metadata key"))?;
        let Token::Key(key_text) = key_tok.token else {
            return Err(self.expected("a metadata key"));
        };
        let key = self.intern(key_text);
        self.expect_newline_or_eof()?;
        let span = start.merge(&key_tok.span);
        Ok(PopMeta::from_source(span, self.source.clone(), key))
    }

    fn parse_transaction(&mut self, date_span: Span, date: NaiveDate) -> PResult<Directive> {
        let flag_tok = self.advance().unwrap();
        let flag = match flag_tok.token {
            Token::Star => '*',
            Token::Bang => '!',
            Token::Txn => '*',
            _ => return Err(self.expected("a transaction flag")),
        };

        let payee_or_narration = if matches!(self.peek(), Some(Token::Str(_))) {
            Some(self.parse_string_literal()?)
        } else {
            None
        };
        let second = if matches!(self.peek(), Some(Token::Str(_))) {
            Some(self.parse_string_literal()?)
        } else {
            None
        };
        let (payee, narration) = match (payee_or_narration, second) {
            (Some(p), Some(n)) => (Some(p), Some(n)),
            (Some(n), None) => (None, Some(n)),
            (None, None) => (None, None),
            (None, Some(_)) => unreachable!(),
        };

        let mut end = narration.as_ref().or(payee.as_ref()).map_or(flag_tok.span, |s| s.span());
        let (tags, links) = self.parse_tags_links(&mut end)?;
        self.expect_newline_or_eof()?;

        let (meta, postings, posting_indent) = self.parse_transaction_body()?;
        if let Some(last_meta) = meta.last() {
            end = end.merge(&last_meta.span());
        }
        if let Some(last_posting) = postings.last() {
            end = end.merge(&last_posting.span());
        }
        let span = date_span.merge(&end);
        let extra = TransactionExtra {
            posting_indent: posting_indent.unwrap_or_else(|| Arc::from("    ")),
        };

        Ok(Directive::Transaction(transaction_from(
            span,
            self.source.clone(),
            date,
            flag,
            payee,
            narration,
            tags,
            links,
            meta,
            postings,
            extra,
        )))
    }

    /// Parses postings and metadata lines following a transaction header,
    /// returning the transaction-level meta, the postings, and the
    /// indentation text of the first continuation line (used to fill
    /// `TransactionExtra::posting_indent`).
    #[allow(clippy::type_complexity)]
    fn parse_transaction_body(&mut self) -> PResult<(Meta, Vec<Posting>, Option<Arc<str>>)> {
        let mut meta = Vec::new();
        let mut postings: Vec<Posting> = Vec::new();
        let mut base_indent_len: Option<usize> = None;
        let mut first_indent: Option<Arc<str>> = None;

        loop {
            let Some(Token::Indent(indent_text)) = self.peek() else {
                break;
            };
            let indent_len = indent_text.len();
            if first_indent.is_none() {
                first_indent = Some(Arc::from(*indent_text));
            }
            let base = *base_indent_len.get_or_insert(indent_len);

            match self.peek_at(1) {
                Some(Token::Key(_)) if indent_len == base => {
                    self.advance();
                    let kv = self.parse_meta_entry()?;
                    meta.push(kv);
                }
                Some(_) => {
                    let indent_span = self.advance().unwrap().span;
                    let posting = self.parse_posting(indent_span, indent_len)?;
                    postings.push(posting);
                }
                None => break,
            }
        }

        Ok((meta, postings, first_indent))
    }

    /// Parses one posting line and any metadata lines indented deeper than
    /// `own_indent_len` immediately following it.
    fn parse_posting(&mut self, indent_span: Span, own_indent_len: usize) -> PResult<Posting> {
        let flag = match self.peek() {
            Some(Token::Star) => {
                self.advance();
                Some('*')
            }
            Some(Token::Bang) => {
                self.advance();
                Some('!')
            }
            _ => None,
        };

        let (account, account_span) = self.parse_account()?;
        let mut end = account_span;

        let amount = if matches!(self.peek(), Some(Token::Number(_) | Token::Minus | Token::LParen)) {
            let a = self.parse_amount()?;
            end = a.span();
            Some(a)
        } else {
            None
        };

        let cost = if matches!(self.peek(), Some(Token::LBrace | Token::LDoubleBrace)) {
            let c = self.parse_cost_spec()?;
            end = c.span();
            Some(c)
        } else {
            None
        };

        let price = if matches!(self.peek(), Some(Token::At | Token::AtAt)) {
            let p = self.parse_price_annotation()?;
            end = p.span();
            Some(p)
        } else {
            None
        };

        self.expect_newline_or_eof()?;

        let mut meta = Vec::new();
        loop {
            let Some(Token::Indent(indent_text)) = self.peek() else {
                break;
            };
            if indent_text.len() <= own_indent_len || !matches!(self.peek_at(1), Some(Token::Key(_))) {
                break;
            }
            self.advance();
            let kv = self.parse_meta_entry()?;
            end = end.merge(&kv.span());
            meta.push(kv);
        }

        let span = indent_span.merge(&end);
        Ok(Posting::from_source(
            span,
            self.source.clone(),
            flag,
            account,
            amount,
            cost,
            price,
            meta,
        ))
    }

    fn parse_price_annotation(&mut self) -> PResult<PriceAnnotation> {
        let (kind, op_span) = match self.peek() {
            Some(Token::At) => (PriceOperatorKind::Unit, self.peek_span()),
            Some(Token::AtAt) => (PriceOperatorKind::Total, self.peek_span()),
            _ => return Err(self.expected("'@' or '@@'")),
        };
        self.advance();
        let operator = SpannedPriceOperator::from_source(op_span, self.source.clone(), kind);
        let amount = self.parse_amount()?;
        let span = op_span.merge(&amount.span());
        Ok(PriceAnnotation::from_source(span, self.source.clone(), operator, amount))
    }

    fn parse_cost_spec(&mut self) -> PResult<CostSpec> {
        let (brace, open_span, close_tok) = match self.peek() {
            Some(Token::LDoubleBrace) => (CostBrace::Total, self.advance().unwrap().span, Token::RDoubleBrace),
            Some(Token::LBrace) => (CostBrace::Unit, self.advance().unwrap().span, Token::RBrace),
            _ => return Err(self.expected("'{' or '{{'")),
        };

        let mut number_per = None;
        let mut number_total = None;
        let mut date = None;
        let mut label = None;
        let mut merge = false;

        let mut first = true;
        loop {
            if self.peek() == Some(&close_tok) {
                break;
            }
            if !first {
                match self.peek() {
                    Some(Token::Comma) => {
                        self.advance();
                    }
                    _ => return Err(self.expected("',' or closing brace")),
                }
            }
            first = false;
            if self.peek() == Some(&close_tok) {
                break;
            }
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    if merge {
                        return Err(self.error(
                            self.peek_span(),
                            ParseErrorKind::DuplicateCostField { category: "merge marker" },
                        ));
                    }
                    merge = true;
                }
                Some(Token::Str(_)) => {
                    let s = self.parse_string_literal()?;
                    if label.is_some() {
                        return Err(self.error(
                            s.span(),
                            ParseErrorKind::DuplicateCostField { category: "label" },
                        ));
                    }
                    label = Some(s.value.clone());
                }
                Some(Token::Date(text)) => {
                    let tok = self.advance().unwrap();
                    let d = self.parse_date_value(text, tok.span)?;
                    if date.is_some() {
                        return Err(self.error(tok.span, ParseErrorKind::DuplicateCostField { category: "date" }));
                    }
                    date = Some(d);
                }
                Some(Token::Number(_) | Token::Currency(_)) => {
                    let start = self.peek_span();
                    let number = if matches!(self.peek(), Some(Token::Number(_))) {
                        Some(self.parse_number_expr(0)?)
                    } else {
                        None
                    };
                    let currency = if matches!(self.peek(), Some(Token::Currency(_))) {
                        Some(self.parse_currency()?.0)
                    } else {
                        None
                    };
                    let end = number.as_ref().map_or(start, NumberExpr::span);
                    let span = start.merge(&end);
                    let amount = CostAmount::from_source(span, self.source.clone(), number, currency);
                    let target = if brace == CostBrace::Total { &mut number_total } else { &mut number_per };
                    if target.is_some() {
                        return Err(self.error(span, ParseErrorKind::DuplicateCostField { category: "cost amount" }));
                    }
                    *target = Some(amount);
                }
                _ => return Err(self.expected("a cost spec item")),
            }
        }

        let end_span = self.advance().unwrap().span;
        let span = open_span.merge(&end_span);
        Ok(CostSpec::from_source(
            span,
            self.source.clone(),
            brace,
            number_per,
            number_total,
            date,
            label,
            merge,
        ))
    }
}

// Small free-function shims so the struct construction above reads in
// declaration order (date, flag, ...) without the borrow checker
// complaining about partially moved fields; these just forward to the
// crate-visible constructors.
fn balance_from(
    span: Span,
    source: Arc<str>,
    date: NaiveDate,
    account: Arc<str>,
    amount: Amount,
    tolerance: Option<Decimal>,
    meta: Meta,
) -> ledgertree_syntax::directive::Balance {
    ledgertree_syntax::directive::Balance::from_source(span, source, date, account, amount, tolerance, meta)
}

#[allow(clippy::too_many_arguments)]
fn transaction_from(
    span: Span,
    source: Arc<str>,
    date: NaiveDate,
    flag: char,
    payee: Option<SpannedStr>,
    narration: Option<SpannedStr>,
    tags: Vec<Arc<str>>,
    links: Vec<Arc<str>>,
    meta: Meta,
    postings: Vec<Posting>,
    extra: TransactionExtra,
) -> ledgertree_syntax::directive::Transaction {
    ledgertree_syntax::directive::Transaction::from_source(
        span, source, date, flag, payee, narration, tags, links, meta, postings, extra,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgertree_syntax::Node;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_open_directive() {
        let file = parse_string("2024-01-01 open Assets:Checking USD\n", "test.bean").unwrap();
        assert_eq!(file.len(), 1);
        assert!(matches!(file.directives[0], Directive::Open(_)));
    }

    #[test]
    fn parses_two_space_transaction() {
        let source = "2020-01-03 * \"Payee\" \"Narration\"\n  Assets:Cash  -10 USD\n  Expenses:Food  10 USD\n";
        let file = parse_string(source, "test.bean").unwrap();
        let Directive::Transaction(tx) = &file.directives[0] else {
            panic!("expected transaction")
        };
        assert_eq!(tx.postings.len(), 2);
        assert!(tx.postings[0].dump().starts_with("  Assets:Cash"));
    }

    #[test]
    fn parses_four_space_transaction() {
        let source = "2020-01-03 * \"Payee\" \"Narration\"\n    Assets:Cash  -10 USD\n    Expenses:Food  10 USD\n";
        let file = parse_string(source, "test.bean").unwrap();
        let Directive::Transaction(tx) = &file.directives[0] else {
            panic!("expected transaction")
        };
        assert!(tx.postings[0].dump().starts_with("    Assets:Cash"));
    }

    #[test]
    fn syntax_error_on_non_directive() {
        let err = parse_string("this is not a directive\n", "bad.bean").unwrap_err();
        assert!(err.render().starts_with("bad.bean:1:1:"));
    }

    #[test]
    fn arithmetic_amount_evaluates() {
        let source = "2020-01-02 balance Assets:Cash 100 + 0.5 USD\n";
        let file = parse_string(source, "test.bean").unwrap();
        let Directive::Balance(bal) = &file.directives[0] else {
            panic!("expected balance")
        };
        assert_eq!(bal.amount.value(), dec!(100.5));
        assert_eq!(bal.amount.number.dump(), "100 + 0.5");
    }

    #[test]
    fn terminating_division_evaluates() {
        let source = "2020-01-02 balance Assets:Cash 100 / 4 USD\n";
        let file = parse_string(source, "test.bean").unwrap();
        let Directive::Balance(bal) = &file.directives[0] else {
            panic!("expected balance")
        };
        assert_eq!(bal.amount.value(), dec!(25));
    }

    #[test]
    fn non_terminating_division_is_rejected() {
        let source = "2020-01-02 balance Assets:Cash 100 / 3 USD\n";
        let err = parse_string(source, "test.bean").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::NonTerminatingDivision { .. }));
    }

    #[test]
    fn single_line_directive_span_includes_trailing_meta() {
        let source = "2024-01-01 open Assets:Cash USD\n  description: \"x\"\n";
        let file = parse_string(source, "test.bean").unwrap();
        let Directive::Open(open) = &file.directives[0] else {
            panic!("expected open")
        };
        assert_eq!(open.meta.len(), 1);
        let meta_span = open.meta[0].span();
        assert!(meta_span.start >= open.span().start);
        assert!(meta_span.end <= open.span().end);
        assert_eq!(open.dump(), source.trim_end_matches('\n'));
    }

    #[test]
    fn tag_push_and_pop() {
        let source = "pushtag #foo\npoptag #foo\n";
        let file = parse_string(source, "test.bean").unwrap();
        assert_eq!(file.len(), 2);
        assert!(matches!(file.directives[0], Directive::TagPush(_)));
        assert!(matches!(file.directives[1], Directive::TagPop(_)));
    }

    #[test]
    fn mixed_file_parses_eleven_directives() {
        let source = r#"option "title" "Demo"
2024-01-01 open Assets:Checking USD
2024-01-01 balance Assets:Checking 0 USD
2024-01-02 * "Store" "Coffee"
  Assets:Checking  -5 USD
  Expenses:Food  5 USD
2024-01-03 price USD 1.10 EUR
2024-01-03 event "location" "Paris"
2024-01-03 note Assets:Checking "called the bank"
2024-01-03 custom "budget" "groceries" 100 USD
2024-01-03 plugin "beancount.plugins.auto"
include "other.bean"
2024-12-31 close Assets:Checking
"#;
        let file = parse_string(source, "test.bean").unwrap();
        assert_eq!(file.len(), 11);
        for directive in &file.directives {
            assert_eq!(directive.dump(), directive.span().text(file.content()));
        }
    }

    #[test]
    fn duplicate_tag_is_rejected() {
        let source = "2024-01-01 * \"x\" #foo #foo\n  Assets:Cash 1 USD\n  Assets:Bank -1 USD\n";
        let err = parse_string(source, "test.bean").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::DuplicateTag { .. }));
    }
}
