//! Tokenizing ledger source text with [`logos`], plus post-lex INDENT
//! synthesis.

use std::fmt;

use logos::Logos;

use ledgertree_syntax::Span;

/// One lexical token, with `'src` borrowing straight from the source buffer
/// wherever a token carries text (avoids allocating until the parser
/// actually needs an owned `Arc<str>`).
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t]+")]
pub enum Token<'src> {
    /// `YYYY-MM-DD`
    #[regex(r"[0-9]{4}-[0-9]{2}-[0-9]{2}")]
    Date(&'src str),

    /// A decimal literal, optionally with `,` thousands separators.
    #[regex(r"[0-9][0-9,]*(\.[0-9]+)?")]
    Number(&'src str),

    /// A quoted string literal, with escapes still raw (the parser resolves
    /// them).
    #[regex(r#""([^"\\]|\\.)*""#)]
    Str(&'src str),

    /// `Assets:Checking:Main`
    #[regex(r"[A-Z][A-Za-z0-9\-]*(:[A-Za-z0-9\-]+)+")]
    Account(&'src str),

    /// A currency/commodity code.
    #[regex(r"[A-Z][A-Z0-9'._\-]{0,22}[A-Z0-9]")]
    #[regex(r"[A-Z]")]
    Currency(&'src str),

    /// `#tag`
    #[regex(r"#[A-Za-z0-9\-_/.]+", |lex| &lex.slice()[1..])]
    Tag(&'src str),

    /// `^link`
    #[regex(r"\^[A-Za-z0-9\-_/.]+", |lex| &lex.slice()[1..])]
    Link(&'src str),

    /// `key:` at column > 0 — a metadata key.
    #[regex(r"[a-z][a-zA-Z0-9_\-]*:", |lex| lex.slice().trim_end_matches(':'))]
    Key(&'src str),

    #[token("open")]
    Open,
    #[token("close")]
    Close,
    #[token("balance")]
    Balance,
    #[token("pad")]
    Pad,
    #[token("commodity")]
    Commodity,
    #[token("price")]
    Price,
    #[token("event")]
    Event,
    #[token("query")]
    Query,
    #[token("note")]
    Note,
    #[token("document")]
    Document,
    #[token("custom")]
    Custom,
    #[token("txn")]
    Txn,
    #[token("option")]
    OptionKw,
    #[token("include")]
    Include,
    #[token("plugin")]
    Plugin,
    #[token("pushtag")]
    Pushtag,
    #[token("poptag")]
    Poptag,
    #[token("pushmeta")]
    Pushmeta,
    #[token("popmeta")]
    Popmeta,
    #[token("TRUE")]
    True,
    #[token("FALSE")]
    False,

    #[token("{{")]
    LDoubleBrace,
    #[token("}}")]
    RDoubleBrace,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("@@")]
    AtAt,
    #[token("@")]
    At,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token("=")]
    Equals,
    #[token("*")]
    Star,
    #[token("!")]
    Bang,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("/")]
    Slash,
    #[token("~")]
    Tilde,

    /// `;` to end of line.
    #[regex(r";[^\n\r]*")]
    Comment(&'src str),

    /// `\n` or `\r\n`.
    #[regex(r"\r?\n")]
    Newline,

    /// Leading whitespace on a line with at least one column of indent,
    /// synthesized by [`tokenize`] rather than matched directly by logos.
    Indent(&'src str),
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(s) | Self::Number(s) | Self::Str(s) | Self::Account(s) | Self::Currency(s) => {
                write!(f, "{s}")
            }
            Self::Tag(s) => write!(f, "#{s}"),
            Self::Link(s) => write!(f, "^{s}"),
            Self::Key(s) => write!(f, "{s}:"),
            Self::Comment(s) | Self::Indent(s) => write!(f, "{s}"),
            Self::Open => write!(f, "open"),
            Self::Close => write!(f, "close"),
            Self::Balance => write!(f, "balance"),
            Self::Pad => write!(f, "pad"),
            Self::Commodity => write!(f, "commodity"),
            Self::Price => write!(f, "price"),
            Self::Event => write!(f, "event"),
            Self::Query => write!(f, "query"),
            Self::Note => write!(f, "note"),
            Self::Document => write!(f, "document"),
            Self::Custom => write!(f, "custom"),
            Self::Txn => write!(f, "txn"),
            Self::OptionKw => write!(f, "option"),
            Self::Include => write!(f, "include"),
            Self::Plugin => write!(f, "plugin"),
            Self::Pushtag => write!(f, "pushtag"),
            Self::Poptag => write!(f, "poptag"),
            Self::Pushmeta => write!(f, "pushmeta"),
            Self::Popmeta => write!(f, "popmeta"),
            Self::True => write!(f, "TRUE"),
            Self::False => write!(f, "FALSE"),
            Self::LDoubleBrace => write!(f, "{{{{"),
            Self::RDoubleBrace => write!(f, "}}}}"),
            Self::LBrace => write!(f, "{{"),
            Self::RBrace => write!(f, "}}"),
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
            Self::AtAt => write!(f, "@@"),
            Self::At => write!(f, "@"),
            Self::Colon => write!(f, ":"),
            Self::Comma => write!(f, ","),
            Self::Equals => write!(f, "="),
            Self::Star => write!(f, "*"),
            Self::Bang => write!(f, "!"),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Slash => write!(f, "/"),
            Self::Tilde => write!(f, "~"),
            Self::Newline => write!(f, "<newline>"),
        }
    }
}

impl Token<'_> {
    /// Whether this token is one of the directive-introducing keywords.
    #[must_use]
    pub const fn is_directive_keyword(&self) -> bool {
        matches!(
            self,
            Self::Open
                | Self::Close
                | Self::Balance
                | Self::Pad
                | Self::Commodity
                | Self::Price
                | Self::Event
                | Self::Query
                | Self::Note
                | Self::Document
                | Self::Custom
        )
    }

    /// Whether this token can start a transaction flag (`*`, `!`, or the
    /// `txn` keyword).
    #[must_use]
    pub const fn is_txn_flag(&self) -> bool {
        matches!(self, Self::Star | Self::Bang | Self::Txn)
    }
}

/// A token together with the source span it was lexed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedToken<'src> {
    /// The token itself.
    pub token: Token<'src>,
    /// Its source span.
    pub span: Span,
}

/// An error produced while lexing, before the parser ever sees a token
/// stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    /// The byte span of the offending text.
    pub span: Span,
}

/// Lex `source` into a token stream, synthesizing [`Token::Indent`] tokens
/// for the leading whitespace of any line that starts with at least one
/// column of indentation.
///
/// # Errors
///
/// Returns the span of the first byte that cannot begin any token.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken<'_>>, LexError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);
    let mut at_line_start = true;
    let mut cursor = 0usize;

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        if at_line_start && span.start > cursor {
            let indent_text = &source[cursor..span.start];
            if !indent_text.is_empty() {
                tokens.push(SpannedToken {
                    token: Token::Indent(indent_text),
                    span: Span::new(cursor, span.start),
                });
            }
        }
        let token = result.map_err(|()| LexError {
            span: Span::new(span.start, span.end),
        })?;
        at_line_start = matches!(token, Token::Newline);
        if at_line_start {
            cursor = span.end;
        }
        tokens.push(SpannedToken {
            token,
            span: Span::new(span.start, span.end),
        });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds<'a>(tokens: &'a [SpannedToken<'a>]) -> Vec<&'a Token<'a>> {
        tokens.iter().map(|t| &t.token).collect()
    }

    #[test]
    fn tokenize_date() {
        let tokens = tokenize("2024-01-15").unwrap();
        assert_eq!(kinds(&tokens), vec![&Token::Date("2024-01-15")]);
    }

    #[test]
    fn tokenize_account_and_currency() {
        let tokens = tokenize("Assets:Checking USD").unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![&Token::Account("Assets:Checking"), &Token::Currency("USD")]
        );
    }

    #[test]
    fn tokenize_string_with_escapes() {
        let tokens = tokenize(r#""hello \"world\"""#).unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(matches!(tokens[0].token, Token::Str(_)));
    }

    #[test]
    fn tokenize_tag_and_link() {
        let tokens = tokenize("#vacation ^trip-42").unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![&Token::Tag("vacation"), &Token::Link("trip-42")]
        );
    }

    #[test]
    fn tokenize_keywords() {
        let tokens = tokenize("open close balance").unwrap();
        assert_eq!(kinds(&tokens), vec![&Token::Open, &Token::Close, &Token::Balance]);
    }

    #[test]
    fn tokenize_indentation() {
        let tokens = tokenize("2024-01-01 *\n  Assets:Cash\n").unwrap();
        let indents: Vec<_> = tokens
            .iter()
            .filter(|t| matches!(t.token, Token::Indent(_)))
            .collect();
        assert_eq!(indents.len(), 1);
        assert!(matches!(indents[0].token, Token::Indent("  ")));
    }

    #[test]
    fn tokenize_metadata_key() {
        let tokens = tokenize("statement:").unwrap();
        assert_eq!(kinds(&tokens), vec![&Token::Key("statement")]);
    }

    #[test]
    fn tokenize_punctuation() {
        let tokens = tokenize("{ } {{ }} @ @@ ( ) : , =").unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![
                &Token::LBrace,
                &Token::RBrace,
                &Token::LDoubleBrace,
                &Token::RDoubleBrace,
                &Token::At,
                &Token::AtAt,
                &Token::LParen,
                &Token::RParen,
                &Token::Colon,
                &Token::Comma,
                &Token::Equals,
            ]
        );
    }

    #[test]
    fn unrecognized_character_is_an_error() {
        let err = tokenize("`").unwrap_err();
        assert_eq!(err.span, Span::new(0, 1));
    }

    #[test]
    fn tokenize_tolerance_tilde() {
        let tokens = tokenize("100 ~ 0.01").unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![&Token::Number("100"), &Token::Tilde, &Token::Number("0.01")]
        );
    }
}
