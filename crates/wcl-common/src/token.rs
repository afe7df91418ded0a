use std::fmt;

use serde::Serialize;

use crate::span::Span;

/// A token produced by the WCL lexer.
///
/// String literals additionally carry their decoded text (escape sequences
/// processed, delimiters stripped); for every other kind the token's text is
/// the source slice addressed by `span`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Decoded content of a string literal. `None` for all other kinds.
    pub decoded: Option<String>,
}

impl Token {
    /// Create a new token from a kind and byte offsets.
    pub fn new(kind: TokenKind, start: u32, end: u32) -> Self {
        Self {
            kind,
            span: Span::new(start, end),
            decoded: None,
        }
    }

    /// Create a string-literal token carrying its decoded text.
    pub fn string(start: u32, end: u32, decoded: String) -> Self {
        Self {
            kind: TokenKind::CStr,
            span: Span::new(start, end),
            decoded: Some(decoded),
        }
    }
}

/// Every kind of token in a WCL expression.
///
/// The expression grammar needs identifiers, string and numeric literals,
/// and a small operator vocabulary. Identifiers may contain dots
/// (`req.http.host` is one token); the symbol table resolves the full
/// dotted name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    /// Identifier, possibly dotted: `foo`, `req.http.host`, `mod.f`.
    Ident,
    /// String literal: `"..."` or `{"..."}`.
    CStr,
    /// Numeric literal: `42`, `1.5`.
    CNum,

    // ── Multi-character operators ──────────────────────────────────────
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `<=`
    LtEq,
    /// `>=`
    GtEq,
    /// `~`
    Tilde,
    /// `!~`
    NotTilde,
    /// `&&`
    AmpAmp,
    /// `||`
    PipePipe,

    // ── Single characters ──────────────────────────────────────────────
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `=`
    Eq,
    /// `!`
    Bang,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `;`
    Semicolon,

    // ── Special ────────────────────────────────────────────────────────
    /// End of input.
    Eof,
    /// Invalid input. Used for error recovery.
    Error,
}

impl TokenKind {
    /// Whether this kind is one of the relational operators handled by the
    /// comparison layer.
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            TokenKind::EqEq
                | TokenKind::NotEq
                | TokenKind::Lt
                | TokenKind::LtEq
                | TokenKind::Gt
                | TokenKind::GtEq
                | TokenKind::Tilde
                | TokenKind::NotTilde
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Ident => "identifier",
            TokenKind::CStr => "string literal",
            TokenKind::CNum => "numeric literal",
            TokenKind::EqEq => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::LtEq => "'<='",
            TokenKind::GtEq => "'>='",
            TokenKind::Tilde => "'~'",
            TokenKind::NotTilde => "'!~'",
            TokenKind::AmpAmp => "'&&'",
            TokenKind::PipePipe => "'||'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Comma => "','",
            TokenKind::Eq => "'='",
            TokenKind::Bang => "'!'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Lt => "'<'",
            TokenKind::Gt => "'>'",
            TokenKind::Semicolon => "';'",
            TokenKind::Eof => "end of input",
            TokenKind::Error => "invalid token",
        };
        f.write_str(s)
    }
}
