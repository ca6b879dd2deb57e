//! The directive types a ledger file is made of.
//!
//! Every directive struct carries its own `span`/`origin`, per-field spanned
//! values where byte fidelity matters, and an optional [`Meta`] block. The
//! [`Directive`] enum is a closed tagged sum over all of them, dispatching
//! [`Node`] through a single match in each method.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::amount::Amount;
use crate::meta::Meta;
use crate::posting::Posting;
use crate::span::{Node, Origin, Span};
use crate::value::{SpannedKeyValueValue, SpannedStr};

fn render_meta(meta: &Meta, indent: &str) -> String {
    let mut out = String::new();
    for kv in meta {
        out.push('\n');
        out.push_str(indent);
        out.push_str(&kv.dump());
    }
    out
}

fn render_tags_links(tags: &[Arc<str>], links: &[Arc<str>]) -> String {
    let mut out = String::new();
    for tag in tags {
        out.push_str(" #");
        out.push_str(tag);
    }
    for link in links {
        out.push_str(" ^");
        out.push_str(link);
    }
    out
}

/// Extra presentation details of a [`Transaction`] that don't affect its
/// meaning but do affect byte-for-byte rendering of a synthesized
/// transaction, such as the exact indentation used for its posting lines.
#[derive(Debug, Clone)]
pub struct TransactionExtra {
    /// The whitespace prefix used before each posting line.
    pub posting_indent: Arc<str>,
}

impl Default for TransactionExtra {
    fn default() -> Self {
        Self {
            posting_indent: Arc::from("    "),
        }
    }
}

/// An `open` directive: declares an account and the currencies it accepts.
#[derive(Debug, Clone)]
pub struct Open {
    span: Span,
    origin: Origin,
    /// The directive's date.
    pub date: NaiveDate,
    /// The account being opened.
    pub account: Arc<str>,
    /// Currencies this account is constrained to, if any were listed.
    pub currencies: Vec<Arc<str>>,
    /// The declared booking method, if one was given.
    pub booking: Option<Arc<str>>,
    /// Attached metadata.
    pub meta: Meta,
}

impl Open {
    pub(crate) fn from_source(
        span: Span,
        source: Arc<str>,
        date: NaiveDate,
        account: Arc<str>,
        currencies: Vec<Arc<str>>,
        booking: Option<Arc<str>>,
        meta: Meta,
    ) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            date,
            account,
            currencies,
            booking,
            meta,
        }
    }
}

impl Node for Open {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        let mut line = format!("{} open {}", self.date, self.account);
        if !self.currencies.is_empty() {
            line.push(' ');
            line.push_str(&self.currencies.join(","));
        }
        if let Some(booking) = &self.booking {
            line.push_str(" \"");
            line.push_str(booking);
            line.push('"');
        }
        line.push_str(&render_meta(&self.meta, "  "));
        line
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// A `close` directive: marks an account as no longer accepting postings.
#[derive(Debug, Clone)]
pub struct Close {
    span: Span,
    origin: Origin,
    /// The directive's date.
    pub date: NaiveDate,
    /// The account being closed.
    pub account: Arc<str>,
    /// Attached metadata.
    pub meta: Meta,
}

impl Close {
    pub(crate) fn from_source(
        span: Span,
        source: Arc<str>,
        date: NaiveDate,
        account: Arc<str>,
        meta: Meta,
    ) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            date,
            account,
            meta,
        }
    }
}

impl Node for Close {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        format!("{} close {}{}", self.date, self.account, render_meta(&self.meta, "  "))
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// A `balance` assertion: the account's balance must equal `amount` as of
/// `date`, within `tolerance`.
#[derive(Debug, Clone)]
pub struct Balance {
    span: Span,
    origin: Origin,
    /// The directive's date.
    pub date: NaiveDate,
    /// The account being asserted.
    pub account: Arc<str>,
    /// The asserted amount.
    pub amount: Amount,
    /// An explicit tolerance, if one was written as `~ tolerance`.
    pub tolerance: Option<Decimal>,
    /// Attached metadata.
    pub meta: Meta,
}

impl Balance {
    pub(crate) fn from_source(
        span: Span,
        source: Arc<str>,
        date: NaiveDate,
        account: Arc<str>,
        amount: Amount,
        tolerance: Option<Decimal>,
        meta: Meta,
    ) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            date,
            account,
            amount,
            tolerance,
            meta,
        }
    }
}

impl Node for Balance {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        let mut line = format!("{} balance {} {}", self.date, self.account, self.amount.dump());
        if let Some(tolerance) = self.tolerance {
            line.push_str(&format!(" ~ {tolerance}"));
        }
        line.push_str(&render_meta(&self.meta, "  "));
        line
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// A `pad` directive: insert a synthetic posting from `source_account` to
/// bring `account` to its next balance assertion.
#[derive(Debug, Clone)]
pub struct Pad {
    span: Span,
    origin: Origin,
    /// The directive's date.
    pub date: NaiveDate,
    /// The account being padded.
    pub account: Arc<str>,
    /// The account the padding amount is drawn from.
    pub source_account: Arc<str>,
    /// Attached metadata.
    pub meta: Meta,
}

impl Pad {
    pub(crate) fn from_source(
        span: Span,
        source: Arc<str>,
        date: NaiveDate,
        account: Arc<str>,
        source_account: Arc<str>,
        meta: Meta,
    ) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            date,
            account,
            source_account,
            meta,
        }
    }
}

impl Node for Pad {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        format!(
            "{} pad {} {}{}",
            self.date,
            self.account,
            self.source_account,
            render_meta(&self.meta, "  ")
        )
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// A transaction: a flagged, dated group of postings that must sum to zero
/// per currency.
#[derive(Debug, Clone)]
pub struct Transaction {
    span: Span,
    origin: Origin,
    /// The directive's date.
    pub date: NaiveDate,
    /// The transaction flag (`*`, `!`, or another single character).
    pub flag: char,
    /// The payee, if one was written.
    pub payee: Option<SpannedStr>,
    /// The narration, if one was written.
    pub narration: Option<SpannedStr>,
    /// Tags attached directly to this transaction (not including any pushed
    /// via a surrounding `pushtag`).
    pub tags: Vec<Arc<str>>,
    /// Links attached directly to this transaction.
    pub links: Vec<Arc<str>>,
    /// Attached metadata.
    pub meta: Meta,
    /// The transaction's postings, in file order.
    pub postings: Vec<Posting>,
    /// Presentation details that don't affect meaning.
    pub extra: TransactionExtra,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_source(
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
    ) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            date,
            flag,
            payee,
            narration,
            tags,
            links,
            meta,
            postings,
            extra,
        }
    }
}

impl Node for Transaction {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        let mut line = format!("{} {}", self.date, self.flag);
        if let Some(payee) = &self.payee {
            line.push(' ');
            line.push_str(&payee.dump());
        }
        if let Some(narration) = &self.narration {
            line.push(' ');
            line.push_str(&narration.dump());
        }
        line.push_str(&render_tags_links(&self.tags, &self.links));
        line.push_str(&render_meta(&self.meta, &self.extra.posting_indent));
        for posting in &self.postings {
            line.push('\n');
            line.push_str(&posting.dump());
        }
        line
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// A `commodity` directive: declares metadata for a currency code.
#[derive(Debug, Clone)]
pub struct Commodity {
    span: Span,
    origin: Origin,
    /// The directive's date.
    pub date: NaiveDate,
    /// The currency code being declared.
    pub currency: Arc<str>,
    /// Attached metadata.
    pub meta: Meta,
}

impl Commodity {
    pub(crate) fn from_source(span: Span, source: Arc<str>, date: NaiveDate, currency: Arc<str>, meta: Meta) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            date,
            currency,
            meta,
        }
    }
}

impl Node for Commodity {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        format!("{} commodity {}{}", self.date, self.currency, render_meta(&self.meta, "  "))
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// A `price` directive: records an exchange rate for `currency` as of `date`.
#[derive(Debug, Clone)]
pub struct Price {
    span: Span,
    origin: Origin,
    /// The directive's date.
    pub date: NaiveDate,
    /// The currency being priced.
    pub currency: Arc<str>,
    /// The price, in another currency.
    pub amount: Amount,
    /// Attached metadata.
    pub meta: Meta,
}

impl Price {
    pub(crate) fn from_source(
        span: Span,
        source: Arc<str>,
        date: NaiveDate,
        currency: Arc<str>,
        amount: Amount,
        meta: Meta,
    ) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            date,
            currency,
            amount,
            meta,
        }
    }
}

impl Node for Price {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        format!(
            "{} price {} {}{}",
            self.date,
            self.currency,
            self.amount.dump(),
            render_meta(&self.meta, "  ")
        )
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// An `event` directive: records a change in a named variable's value.
#[derive(Debug, Clone)]
pub struct Event {
    span: Span,
    origin: Origin,
    /// The directive's date.
    pub date: NaiveDate,
    /// The event type name.
    pub event_type: SpannedStr,
    /// The event's new value.
    pub value: SpannedStr,
    /// Attached metadata.
    pub meta: Meta,
}

impl Event {
    pub(crate) fn from_source(
        span: Span,
        source: Arc<str>,
        date: NaiveDate,
        event_type: SpannedStr,
        value: SpannedStr,
        meta: Meta,
    ) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            date,
            event_type,
            value,
            meta,
        }
    }
}

impl Node for Event {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        format!(
            "{} event {} {}{}",
            self.date,
            self.event_type.dump(),
            self.value.dump(),
            render_meta(&self.meta, "  ")
        )
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// A `query` directive: names a stored report query.
#[derive(Debug, Clone)]
pub struct Query {
    span: Span,
    origin: Origin,
    /// The directive's date.
    pub date: NaiveDate,
    /// The query's name.
    pub name: SpannedStr,
    /// The query text.
    pub query: SpannedStr,
    /// Attached metadata.
    pub meta: Meta,
}

impl Query {
    pub(crate) fn from_source(
        span: Span,
        source: Arc<str>,
        date: NaiveDate,
        name: SpannedStr,
        query: SpannedStr,
        meta: Meta,
    ) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            date,
            name,
            query,
            meta,
        }
    }
}

impl Node for Query {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        format!(
            "{} query {} {}{}",
            self.date,
            self.name.dump(),
            self.query.dump(),
            render_meta(&self.meta, "  ")
        )
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// A `note` directive: a free-form dated comment attached to an account.
#[derive(Debug, Clone)]
pub struct Note {
    span: Span,
    origin: Origin,
    /// The directive's date.
    pub date: NaiveDate,
    /// The account the note is attached to.
    pub account: Arc<str>,
    /// The note's text.
    pub comment: SpannedStr,
    /// Attached metadata.
    pub meta: Meta,
}

impl Note {
    pub(crate) fn from_source(
        span: Span,
        source: Arc<str>,
        date: NaiveDate,
        account: Arc<str>,
        comment: SpannedStr,
        meta: Meta,
    ) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            date,
            account,
            comment,
            meta,
        }
    }
}

impl Node for Note {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        format!(
            "{} note {} {}{}",
            self.date,
            self.account,
            self.comment.dump(),
            render_meta(&self.meta, "  ")
        )
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// A `document` directive: links an external file to an account.
#[derive(Debug, Clone)]
pub struct Document {
    span: Span,
    origin: Origin,
    /// The directive's date.
    pub date: NaiveDate,
    /// The account the document is attached to.
    pub account: Arc<str>,
    /// The document's file path.
    pub path: SpannedStr,
    /// Tags attached to this document.
    pub tags: Vec<Arc<str>>,
    /// Links attached to this document.
    pub links: Vec<Arc<str>>,
    /// Attached metadata.
    pub meta: Meta,
}

impl Document {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_source(
        span: Span,
        source: Arc<str>,
        date: NaiveDate,
        account: Arc<str>,
        path: SpannedStr,
        tags: Vec<Arc<str>>,
        links: Vec<Arc<str>>,
        meta: Meta,
    ) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            date,
            account,
            path,
            tags,
            links,
            meta,
        }
    }
}

impl Node for Document {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        let mut line = format!("{} document {} {}", self.date, self.account, self.path.dump());
        line.push_str(&render_tags_links(&self.tags, &self.links));
        line.push_str(&render_meta(&self.meta, "  "));
        line
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// A `custom` directive: an extensible, application-defined directive.
#[derive(Debug, Clone)]
pub struct Custom {
    span: Span,
    origin: Origin,
    /// The directive's date.
    pub date: NaiveDate,
    /// The custom directive's type name.
    pub custom_type: SpannedStr,
    /// The custom directive's positional values.
    pub values: Vec<SpannedKeyValueValue>,
    /// Attached metadata.
    pub meta: Meta,
}

impl Custom {
    pub(crate) fn from_source(
        span: Span,
        source: Arc<str>,
        date: NaiveDate,
        custom_type: SpannedStr,
        values: Vec<SpannedKeyValueValue>,
        meta: Meta,
    ) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            date,
            custom_type,
            values,
            meta,
        }
    }
}

impl Node for Custom {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        let mut line = format!("{} custom {}", self.date, self.custom_type.dump());
        for value in &self.values {
            line.push(' ');
            line.push_str(&value.dump());
        }
        line.push_str(&render_meta(&self.meta, "  "));
        line
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// An `option` directive: sets a named parser/reporting option.
#[derive(Debug, Clone)]
pub struct OptionDirective {
    span: Span,
    origin: Origin,
    /// The option's name.
    pub name: SpannedStr,
    /// The option's value.
    pub value: SpannedStr,
}

impl OptionDirective {
    pub(crate) fn from_source(span: Span, source: Arc<str>, name: SpannedStr, value: SpannedStr) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            name,
            value,
        }
    }
}

impl Node for OptionDirective {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        format!("option {} {}", self.name.dump(), self.value.dump())
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// An `include` directive: names another file to be parsed as part of this
/// ledger.
#[derive(Debug, Clone)]
pub struct Include {
    span: Span,
    origin: Origin,
    /// The included file's path, as written.
    pub path: SpannedStr,
}

impl Include {
    pub(crate) fn from_source(span: Span, source: Arc<str>, path: SpannedStr) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            path,
        }
    }
}

impl Node for Include {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        format!("include {}", self.path.dump())
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// A `plugin` directive: names a processing plugin and optional config
/// string.
#[derive(Debug, Clone)]
pub struct Plugin {
    span: Span,
    origin: Origin,
    /// The plugin's module name.
    pub name: SpannedStr,
    /// The plugin's configuration string, if one was given.
    pub config: Option<SpannedStr>,
}

impl Plugin {
    pub(crate) fn from_source(span: Span, source: Arc<str>, name: SpannedStr, config: Option<SpannedStr>) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            name,
            config,
        }
    }
}

impl Node for Plugin {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        let mut line = format!("plugin {}", self.name.dump());
        if let Some(config) = &self.config {
            line.push(' ');
            line.push_str(&config.dump());
        }
        line
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// A `pushtag` directive: the named tag applies to every transaction that
/// follows, until a matching `poptag`.
#[derive(Debug, Clone)]
pub struct TagPush {
    span: Span,
    origin: Origin,
    /// The tag being pushed, without its `#`.
    pub tag: Arc<str>,
}

impl TagPush {
    pub(crate) fn from_source(span: Span, source: Arc<str>, tag: Arc<str>) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            tag,
        }
    }
}

impl Node for TagPush {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        format!("pushtag #{}", self.tag)
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// A `poptag` directive: undoes the most recent matching `pushtag`.
#[derive(Debug, Clone)]
pub struct TagPop {
    span: Span,
    origin: Origin,
    /// The tag being popped, without its `#`.
    pub tag: Arc<str>,
}

impl TagPop {
    pub(crate) fn from_source(span: Span, source: Arc<str>, tag: Arc<str>) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            tag,
        }
    }
}

impl Node for TagPop {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        format!("poptag #{}", self.tag)
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// A `pushmeta` directive: the named metadata key applies to every directive
/// that follows, until a matching `popmeta`.
#[derive(Debug, Clone)]
pub struct PushMeta {
    span: Span,
    origin: Origin,
    /// The metadata key being pushed.
    pub key: Arc<str>,
    /// The metadata value being pushed, if any.
    pub value: Option<SpannedKeyValueValue>,
}

impl PushMeta {
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
}

impl Node for PushMeta {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        match &self.value {
            Some(value) => format!("pushmeta {}: {}", self.key, value.dump()),
            None => format!("pushmeta {}:", self.key),
        }
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// A `popmeta` directive: undoes the most recent matching `pushmeta`.
#[derive(Debug, Clone)]
pub struct PopMeta {
    span: Span,
    origin: Origin,
    /// The metadata key being popped.
    pub key: Arc<str>,
}

impl PopMeta {
    pub(crate) fn from_source(span: Span, source: Arc<str>, key: Arc<str>) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            key,
        }
    }
}

impl Node for PopMeta {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        format!("popmeta {}:", self.key)
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// A `;`-prefixed line comment, kept as a first-class directive so a file's
/// comments survive a parse/dump round trip in their original position.
#[derive(Debug, Clone)]
pub struct Comment {
    span: Span,
    origin: Origin,
    /// The comment's text, including the leading `;`.
    pub text: Arc<str>,
}

impl Comment {
    pub(crate) fn from_source(span: Span, source: Arc<str>, text: Arc<str>) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            text,
        }
    }
}

impl Node for Comment {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        self.text.to_string()
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// A section headline (e.g. `* Section`, `** Subsection`), kept as a
/// first-class directive at line start.
#[derive(Debug, Clone)]
pub struct Headline {
    span: Span,
    origin: Origin,
    /// The headline's nesting level (number of leading `*`s).
    pub level: usize,
    /// The headline's text, with the leading markers and whitespace
    /// stripped.
    pub text: Arc<str>,
}

impl Headline {
    pub(crate) fn from_source(span: Span, source: Arc<str>, level: usize, text: Arc<str>) -> Self {
        Self {
            span,
            origin: Origin::Source(source),
            level,
            text,
        }
    }
}

impl Node for Headline {
    fn span(&self) -> Span {
        self.span
    }

    fn render(&self) -> String {
        format!("{} {}", "*".repeat(self.level), self.text)
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// The closed sum of every directive a file can contain.
#[derive(Debug, Clone)]
pub enum Directive {
    /// See [`Open`].
    Open(Open),
    /// See [`Close`].
    Close(Close),
    /// See [`Balance`].
    Balance(Balance),
    /// See [`Pad`].
    Pad(Pad),
    /// See [`Transaction`].
    Transaction(Transaction),
    /// See [`Commodity`].
    Commodity(Commodity),
    /// See [`Price`].
    Price(Price),
    /// See [`Event`].
    Event(Event),
    /// See [`Query`].
    Query(Query),
    /// See [`Note`].
    Note(Note),
    /// See [`Document`].
    Document(Document),
    /// See [`Custom`].
    Custom(Custom),
    /// See [`OptionDirective`].
    Option(OptionDirective),
    /// See [`Include`].
    Include(Include),
    /// See [`Plugin`].
    Plugin(Plugin),
    /// See [`TagPush`].
    TagPush(TagPush),
    /// See [`TagPop`].
    TagPop(TagPop),
    /// See [`PushMeta`].
    PushMeta(PushMeta),
    /// See [`PopMeta`].
    PopMeta(PopMeta),
    /// See [`Comment`].
    Comment(Comment),
    /// See [`Headline`].
    Headline(Headline),
}

impl Directive {
    /// This directive's date, for the directives that carry one.
    #[must_use]
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Open(d) => Some(d.date),
            Self::Close(d) => Some(d.date),
            Self::Balance(d) => Some(d.date),
            Self::Pad(d) => Some(d.date),
            Self::Transaction(d) => Some(d.date),
            Self::Commodity(d) => Some(d.date),
            Self::Price(d) => Some(d.date),
            Self::Event(d) => Some(d.date),
            Self::Query(d) => Some(d.date),
            Self::Note(d) => Some(d.date),
            Self::Document(d) => Some(d.date),
            Self::Custom(d) => Some(d.date),
            Self::Option(_)
            | Self::Include(_)
            | Self::Plugin(_)
            | Self::TagPush(_)
            | Self::TagPop(_)
            | Self::PushMeta(_)
            | Self::PopMeta(_)
            | Self::Comment(_)
            | Self::Headline(_) => None,
        }
    }

    /// This directive's metadata block, for the directives that carry one.
    #[must_use]
    pub fn meta(&self) -> Option<&Meta> {
        match self {
            Self::Open(d) => Some(&d.meta),
            Self::Close(d) => Some(&d.meta),
            Self::Balance(d) => Some(&d.meta),
            Self::Pad(d) => Some(&d.meta),
            Self::Transaction(d) => Some(&d.meta),
            Self::Commodity(d) => Some(&d.meta),
            Self::Price(d) => Some(&d.meta),
            Self::Event(d) => Some(&d.meta),
            Self::Query(d) => Some(&d.meta),
            Self::Note(d) => Some(&d.meta),
            Self::Document(d) => Some(&d.meta),
            Self::Custom(d) => Some(&d.meta),
            Self::Option(_)
            | Self::Include(_)
            | Self::Plugin(_)
            | Self::TagPush(_)
            | Self::TagPop(_)
            | Self::PushMeta(_)
            | Self::PopMeta(_)
            | Self::Comment(_)
            | Self::Headline(_) => None,
        }
    }

    /// Whether this is a [`Directive::Transaction`].
    #[must_use]
    pub const fn is_transaction(&self) -> bool {
        matches!(self, Self::Transaction(_))
    }

    /// This directive as a [`Transaction`], if it is one.
    #[must_use]
    pub const fn as_transaction(&self) -> Option<&Transaction> {
        match self {
            Self::Transaction(t) => Some(t),
            _ => None,
        }
    }

    /// This directive variant's name, in lowercase, as it appears in source.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Open(_) => "open",
            Self::Close(_) => "close",
            Self::Balance(_) => "balance",
            Self::Pad(_) => "pad",
            Self::Transaction(_) => "transaction",
            Self::Commodity(_) => "commodity",
            Self::Price(_) => "price",
            Self::Event(_) => "event",
            Self::Query(_) => "query",
            Self::Note(_) => "note",
            Self::Document(_) => "document",
            Self::Custom(_) => "custom",
            Self::Option(_) => "option",
            Self::Include(_) => "include",
            Self::Plugin(_) => "plugin",
            Self::TagPush(_) => "pushtag",
            Self::TagPop(_) => "poptag",
            Self::PushMeta(_) => "pushmeta",
            Self::PopMeta(_) => "popmeta",
            Self::Comment(_) => "comment",
            Self::Headline(_) => "headline",
        }
    }
}

impl Node for Directive {
    fn span(&self) -> Span {
        match self {
            Self::Open(d) => d.span(),
            Self::Close(d) => d.span(),
            Self::Balance(d) => d.span(),
            Self::Pad(d) => d.span(),
            Self::Transaction(d) => d.span(),
            Self::Commodity(d) => d.span(),
            Self::Price(d) => d.span(),
            Self::Event(d) => d.span(),
            Self::Query(d) => d.span(),
            Self::Note(d) => d.span(),
            Self::Document(d) => d.span(),
            Self::Custom(d) => d.span(),
            Self::Option(d) => d.span(),
            Self::Include(d) => d.span(),
            Self::Plugin(d) => d.span(),
            Self::TagPush(d) => d.span(),
            Self::TagPop(d) => d.span(),
            Self::PushMeta(d) => d.span(),
            Self::PopMeta(d) => d.span(),
            Self::Comment(d) => d.span(),
            Self::Headline(d) => d.span(),
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Open(d) => d.render(),
            Self::Close(d) => d.render(),
            Self::Balance(d) => d.render(),
            Self::Pad(d) => d.render(),
            Self::Transaction(d) => d.render(),
            Self::Commodity(d) => d.render(),
            Self::Price(d) => d.render(),
            Self::Event(d) => d.render(),
            Self::Query(d) => d.render(),
            Self::Note(d) => d.render(),
            Self::Document(d) => d.render(),
            Self::Custom(d) => d.render(),
            Self::Option(d) => d.render(),
            Self::Include(d) => d.render(),
            Self::Plugin(d) => d.render(),
            Self::TagPush(d) => d.render(),
            Self::TagPop(d) => d.render(),
            Self::PushMeta(d) => d.render(),
            Self::PopMeta(d) => d.render(),
            Self::Comment(d) => d.render(),
            Self::Headline(d) => d.render(),
        }
    }

    fn origin(&self) -> &Origin {
        match self {
            Self::Open(d) => d.origin(),
            Self::Close(d) => d.origin(),
            Self::Balance(d) => d.origin(),
            Self::Pad(d) => d.origin(),
            Self::Transaction(d) => d.origin(),
            Self::Commodity(d) => d.origin(),
            Self::Price(d) => d.origin(),
            Self::Event(d) => d.origin(),
            Self::Query(d) => d.origin(),
            Self::Note(d) => d.origin(),
            Self::Document(d) => d.origin(),
            Self::Custom(d) => d.origin(),
            Self::Option(d) => d.origin(),
            Self::Include(d) => d.origin(),
            Self::Plugin(d) => d.origin(),
            Self::TagPush(d) => d.origin(),
            Self::TagPop(d) => d.origin(),
            Self::PushMeta(d) => d.origin(),
            Self::PopMeta(d) => d.origin(),
            Self::Comment(d) => d.origin(),
            Self::Headline(d) => d.origin(),
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn open_render_with_currencies() {
        let open = Open {
            span: Span::new(0, 0),
            origin: Origin::synthesized(),
            date: date(2024, 1, 1),
            account: Arc::from("Assets:Checking"),
            currencies: vec![Arc::from("USD")],
            booking: None,
            meta: Vec::new(),
        };
        assert_eq!(open.render(), "2024-01-01 open Assets:Checking USD");
    }

    #[test]
    fn close_render() {
        let close = Close {
            span: Span::new(0, 0),
            origin: Origin::synthesized(),
            date: date(2024, 12, 31),
            account: Arc::from("Assets:Checking"),
            meta: Vec::new(),
        };
        assert_eq!(close.render(), "2024-12-31 close Assets:Checking");
    }

    #[test]
    fn directive_date_and_type_name() {
        let directive = Directive::Close(Close {
            span: Span::new(0, 0),
            origin: Origin::synthesized(),
            date: date(2024, 1, 1),
            account: Arc::from("Assets:Checking"),
            meta: Vec::new(),
        });
        assert_eq!(directive.date(), Some(date(2024, 1, 1)));
        assert_eq!(directive.type_name(), "close");
        assert!(!directive.is_transaction());
    }

    #[test]
    fn balance_render_with_tolerance() {
        let balance = Balance {
            span: Span::new(0, 0),
            origin: Origin::synthesized(),
            date: date(2024, 1, 1),
            account: Arc::from("Assets:Checking"),
            amount: Amount::synthesized(dec!(100.00), "USD"),
            tolerance: Some(dec!(0.01)),
            meta: Vec::new(),
        };
        assert_eq!(balance.render(), "2024-01-01 balance Assets:Checking 100.00 USD ~ 0.01");
    }

    #[test]
    fn pushtag_and_poptag_render() {
        let push = TagPush {
            span: Span::new(0, 0),
            origin: Origin::synthesized(),
            tag: Arc::from("trip"),
        };
        let pop = TagPop {
            span: Span::new(0, 0),
            origin: Origin::synthesized(),
            tag: Arc::from("trip"),
        };
        assert_eq!(push.render(), "pushtag #trip");
        assert_eq!(pop.render(), "poptag #trip");
    }

    #[test]
    fn headline_render() {
        let headline = Headline {
            span: Span::new(0, 0),
            origin: Origin::synthesized(),
            level: 2,
            text: Arc::from("Vacation"),
        };
        assert_eq!(headline.render(), "** Vacation");
    }
}
