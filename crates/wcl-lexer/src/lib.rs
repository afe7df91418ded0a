//! Tokenizer for WCL expression text.
//!
//! The lexer turns source text into the flat token stream the expression
//! compiler consumes. WCL is whitespace-insensitive; identifiers are dotted
//! (`req.http.x-forwarded-for` is a single token, which is also why the `-`
//! operator requires surrounding whitespace). String literals come in two
//! forms, both verbatim: single-line `"..."` (a backslash is an ordinary
//! character, so regex and regsub patterns read naturally) and `{"..."}`
//! long strings, which may span lines and contain quotes.
//!
//! Errors are collected rather than aborting, so a caller can report
//! everything wrong with an input at once.

mod cursor;

use std::fmt;

use cursor::Cursor;
use wcl_common::span::Span;
use wcl_common::token::{Token, TokenKind};

/// A lexer error with location information.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

impl LexError {
    fn new(kind: LexErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The specific kind of lexer error.
#[derive(Debug, Clone, PartialEq)]
pub enum LexErrorKind {
    /// An unexpected character was encountered.
    UnexpectedCharacter(char),
    /// A string literal was not closed before end of line or input.
    UnterminatedString,
    /// A `{"..."}` long string was not closed before end of input.
    UnterminatedLongString,
    /// A `/* ... */` comment was not closed before end of input.
    UnterminatedComment,
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedCharacter(c) => write!(f, "unexpected character: {c:?}"),
            Self::UnterminatedString => write!(f, "unterminated string literal"),
            Self::UnterminatedLongString => write!(f, "unterminated long string"),
            Self::UnterminatedComment => write!(f, "unterminated comment"),
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for LexError {}

/// The WCL lexer. Converts source text into a stream of tokens.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    errors: Vec<LexError>,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source text.
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            errors: Vec::new(),
        }
    }

    /// Tokenize the entire source.
    ///
    /// The returned token vector always ends with an `Eof` token. Lexical
    /// errors are collected alongside; offending input becomes `Error`
    /// tokens so downstream spans stay meaningful.
    pub fn tokenize(source: &str) -> (Vec<Token>, Vec<LexError>) {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token();
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        (tokens, lexer.errors)
    }

    fn next_token(&mut self) -> Token {
        self.skip_trivia();

        let start = self.cursor.pos();
        let Some(c) = self.cursor.peek() else {
            return Token::new(TokenKind::Eof, start, start);
        };

        match c {
            '(' => self.single(TokenKind::LParen, start),
            ')' => self.single(TokenKind::RParen, start),
            ',' => self.single(TokenKind::Comma, start),
            ';' => self.single(TokenKind::Semicolon, start),
            '+' => self.single(TokenKind::Plus, start),
            '-' => self.single(TokenKind::Minus, start),
            '*' => self.single(TokenKind::Star, start),
            '/' => self.single(TokenKind::Slash, start),
            '~' => self.single(TokenKind::Tilde, start),

            '=' => {
                self.cursor.advance();
                if self.cursor.eat('=') {
                    Token::new(TokenKind::EqEq, start, self.cursor.pos())
                } else {
                    Token::new(TokenKind::Eq, start, self.cursor.pos())
                }
            }
            '!' => {
                self.cursor.advance();
                if self.cursor.eat('=') {
                    Token::new(TokenKind::NotEq, start, self.cursor.pos())
                } else if self.cursor.eat('~') {
                    Token::new(TokenKind::NotTilde, start, self.cursor.pos())
                } else {
                    Token::new(TokenKind::Bang, start, self.cursor.pos())
                }
            }
            '<' => {
                self.cursor.advance();
                if self.cursor.eat('=') {
                    Token::new(TokenKind::LtEq, start, self.cursor.pos())
                } else {
                    Token::new(TokenKind::Lt, start, self.cursor.pos())
                }
            }
            '>' => {
                self.cursor.advance();
                if self.cursor.eat('=') {
                    Token::new(TokenKind::GtEq, start, self.cursor.pos())
                } else {
                    Token::new(TokenKind::Gt, start, self.cursor.pos())
                }
            }
            '&' => {
                self.cursor.advance();
                if self.cursor.eat('&') {
                    Token::new(TokenKind::AmpAmp, start, self.cursor.pos())
                } else {
                    self.error_token(LexErrorKind::UnexpectedCharacter('&'), start)
                }
            }
            '|' => {
                self.cursor.advance();
                if self.cursor.eat('|') {
                    Token::new(TokenKind::PipePipe, start, self.cursor.pos())
                } else {
                    self.error_token(LexErrorKind::UnexpectedCharacter('|'), start)
                }
            }

            '"' => self.lex_string(start),
            '{' => {
                if self.cursor.peek_next() == Some('"') {
                    self.lex_long_string(start)
                } else {
                    self.cursor.advance();
                    self.error_token(LexErrorKind::UnexpectedCharacter('{'), start)
                }
            }

            '0'..='9' => self.lex_number(start),
            c if is_ident_start(c) => self.lex_ident(start),

            other => {
                self.cursor.advance();
                self.error_token(LexErrorKind::UnexpectedCharacter(other), start)
            }
        }
    }

    // ── Trivia ─────────────────────────────────────────────────────────

    /// Skip whitespace and all three comment forms: `# ...`, `// ...`,
    /// `/* ... */`.
    fn skip_trivia(&mut self) {
        loop {
            self.cursor.eat_while(|c| c.is_whitespace());
            match (self.cursor.peek(), self.cursor.peek_next()) {
                (Some('#'), _) | (Some('/'), Some('/')) => {
                    self.cursor.eat_while(|c| c != '\n');
                }
                (Some('/'), Some('*')) => {
                    let start = self.cursor.pos();
                    self.cursor.advance();
                    self.cursor.advance();
                    let mut closed = false;
                    while let Some(c) = self.cursor.advance() {
                        if c == '*' && self.cursor.eat('/') {
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        self.errors.push(LexError::new(
                            LexErrorKind::UnterminatedComment,
                            Span::new(start, self.cursor.pos()),
                        ));
                    }
                }
                _ => break,
            }
        }
    }

    // ── Literals and identifiers ───────────────────────────────────────

    /// Lex a `"..."` string literal. Content is verbatim -- a backslash is
    /// an ordinary character -- and literal newlines terminate the string
    /// with an error: quoted strings are single-line.
    fn lex_string(&mut self, start: u32) -> Token {
        self.cursor.advance(); // opening quote
        let mut decoded = String::new();
        loop {
            match self.cursor.peek() {
                None | Some('\n') => {
                    self.errors.push(LexError::new(
                        LexErrorKind::UnterminatedString,
                        Span::new(start, self.cursor.pos()),
                    ));
                    return Token::new(TokenKind::Error, start, self.cursor.pos());
                }
                Some('"') => {
                    self.cursor.advance();
                    return Token::string(start, self.cursor.pos(), decoded);
                }
                Some(c) => {
                    self.cursor.advance();
                    decoded.push(c);
                }
            }
        }
    }

    /// Lex a `{"..."}` long string. Content is taken verbatim, newlines
    /// and quotes included; the only terminator is `"}`.
    fn lex_long_string(&mut self, start: u32) -> Token {
        self.cursor.advance(); // {
        self.cursor.advance(); // "
        let content_start = self.cursor.pos();
        loop {
            match self.cursor.peek() {
                None => {
                    self.errors.push(LexError::new(
                        LexErrorKind::UnterminatedLongString,
                        Span::new(start, self.cursor.pos()),
                    ));
                    return Token::new(TokenKind::Error, start, self.cursor.pos());
                }
                Some('"') if self.cursor.peek_next() == Some('}') => {
                    let content_end = self.cursor.pos();
                    self.cursor.advance();
                    self.cursor.advance();
                    let decoded = self.cursor.slice(content_start, content_end).to_string();
                    return Token::string(start, self.cursor.pos(), decoded);
                }
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }
    }

    /// Lex a numeric literal: digits with an optional fraction. The token
    /// keeps its source text; the expression compiler's numeric lexer
    /// interprets it against the demanded type.
    fn lex_number(&mut self, start: u32) -> Token {
        self.cursor.eat_while(|c| c.is_ascii_digit());
        if self.cursor.peek() == Some('.')
            && self.cursor.peek_next().is_some_and(|c| c.is_ascii_digit())
        {
            self.cursor.advance();
            self.cursor.eat_while(|c| c.is_ascii_digit());
        }
        Token::new(TokenKind::CNum, start, self.cursor.pos())
    }

    fn lex_ident(&mut self, start: u32) -> Token {
        self.cursor.eat_while(is_ident_continue);
        Token::new(TokenKind::Ident, start, self.cursor.pos())
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn single(&mut self, kind: TokenKind, start: u32) -> Token {
        self.cursor.advance();
        Token::new(kind, start, self.cursor.pos())
    }

    fn error_token(&mut self, kind: LexErrorKind, start: u32) -> Token {
        self.errors
            .push(LexError::new(kind, Span::new(start, self.cursor.pos())));
        Token::new(TokenKind::Error, start, self.cursor.pos())
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, errors) = Lexer::tokenize(source);
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn dotted_identifier_is_one_token() {
        use TokenKind::*;
        assert_eq!(kinds("req.http.x-forwarded-for"), vec![Ident, Eof]);
    }

    #[test]
    fn minus_needs_whitespace() {
        use TokenKind::*;
        // `a-b` is a single identifier; `a - b` is a subtraction.
        assert_eq!(kinds("a-b"), vec![Ident, Eof]);
        assert_eq!(kinds("a - b"), vec![Ident, Minus, Ident, Eof]);
    }

    #[test]
    fn multi_char_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("== != <= >= ~ !~ && || ! < >"),
            vec![EqEq, NotEq, LtEq, GtEq, Tilde, NotTilde, AmpAmp, PipePipe, Bang, Lt, Gt, Eof]
        );
    }

    #[test]
    fn strings_are_verbatim() {
        let (tokens, errors) = Lexer::tokenize(r#""^www\.""#);
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::CStr);
        // The backslash survives untouched; patterns need no doubling.
        assert_eq!(tokens[0].decoded.as_deref(), Some("^www\\."));
    }

    #[test]
    fn long_string_is_verbatim() {
        let (tokens, errors) = Lexer::tokenize("{\"line1\nline\\2\"}");
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::CStr);
        assert_eq!(tokens[0].decoded.as_deref(), Some("line1\nline\\2"));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let (tokens, errors) = Lexer::tokenize("\"abc");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, LexErrorKind::UnterminatedString);
    }

    #[test]
    fn numbers_with_fraction() {
        let (tokens, _) = Lexer::tokenize("10 1.5 2.");
        assert_eq!(tokens[0].kind, TokenKind::CNum);
        assert_eq!(tokens[1].kind, TokenKind::CNum);
        // `2.` stops before the dot; the dot is not a valid token start.
        assert_eq!(tokens[2].kind, TokenKind::CNum);
        assert_eq!(tokens[2].span.len(), 1);
    }

    #[test]
    fn comments_are_trivia() {
        use TokenKind::*;
        assert_eq!(kinds("1 # c\n+ // c\n2 /* c */ ;"), vec![CNum, Plus, CNum, Semicolon, Eof]);
    }

    #[test]
    fn division_is_not_a_comment() {
        use TokenKind::*;
        assert_eq!(kinds("a / b"), vec![Ident, Slash, Ident, Eof]);
    }

    #[test]
    fn lone_ampersand_is_an_error() {
        let (tokens, errors) = Lexer::tokenize("a & b");
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(errors[0].kind, LexErrorKind::UnexpectedCharacter('&'));
    }
}
