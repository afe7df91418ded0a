//! The compilation context for one expression-bearing function body.
//!
//! A [`Compiler`] owns everything the expression layers share: the token
//! cursor, the output buffers (function body, function prologue, shared
//! header), the diagnostic list and error flag, the indentation level, and
//! the monotonic counter behind every generated auxiliary name. It also
//! hosts the small external services the layers call into: the numeric and
//! unit lexers, the regex service, and the address resolver.
//!
//! Everything is single-threaded and synchronous; the only cancellation is
//! the error flag, which every layer checks after each sub-call.

use wcl_common::span::Span;
use wcl_common::token::{Token, TokenKind};
use wcl_lexer::Lexer;

use crate::diagnostics::{Diagnostic, ErrorKind};
use crate::symbols::SymbolTable;
use crate::types::Type;

/// The buffers a finished compilation hands back to the host, which
/// composes them into the generated C file.
#[derive(Debug, Default, Clone)]
pub struct Output {
    /// Shared header: module-static declarations (regex slots, address
    /// constants, per-call-site private slots).
    pub header: String,
    /// The current function's prologue: auxiliary variable declarations.
    pub prologue: String,
    /// The current function's code.
    pub body: String,
    /// Finaliser statements to run when the configuration is discarded.
    pub finalizers: Vec<String>,
    /// (slot name, pattern) pairs for the host's regex-compilation wiring.
    pub regexes: Vec<(String, String)>,
}

/// Compilation state threaded through every parsing layer.
pub struct Compiler<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    pos: usize,

    pub symbols: SymbolTable,
    pub diagnostics: Vec<Diagnostic>,
    /// Set once, by the first error; every layer short-circuits on it.
    pub err: bool,

    pub body: String,
    pub prologue: String,
    pub header: String,
    pub finalizers: Vec<String>,
    pub regexes: Vec<(String, String)>,

    /// Monotonic counter behind generated names (`strs_<n>_*`,
    /// `wgc_re_<n>`, `wgc_priv_<n>`, ...).
    unique: u32,
    /// Current emission indentation of the function body, in columns.
    pub indent: usize,

    /// Span of the most recently consumed token.
    last_span: Span,

    /// Bitmask of the method currently being compiled.
    method_mask: u32,
    method_name: Option<String>,
    /// Variable reads recorded for cross-reference output.
    uses: Vec<(String, Span)>,
}

impl<'src> Compiler<'src> {
    /// Lex `source` and set up an empty compilation context over it.
    ///
    /// Lexical errors become diagnostics immediately; the offending tokens
    /// survive as `Error` kinds so spans remain meaningful.
    pub fn new(source: &'src str) -> Self {
        let (tokens, lex_errors) = Lexer::tokenize(source);
        let mut c = Self {
            source,
            tokens,
            pos: 0,
            symbols: SymbolTable::new(),
            diagnostics: Vec::new(),
            err: false,
            body: String::new(),
            prologue: String::new(),
            header: String::new(),
            finalizers: Vec::new(),
            regexes: Vec::new(),
            unique: 0,
            indent: 0,
            last_span: Span::point(0),
            method_mask: u32::MAX,
            method_name: None,
            uses: Vec::new(),
        };
        if let Some(first) = lex_errors.first() {
            c.fail(ErrorKind::Lex, first.to_string(), first.span);
        }
        c
    }

    // ── Token cursor ───────────────────────────────────────────────────

    /// The current token. Past the end this stays on the final `Eof`.
    pub fn tok(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// Kind of the current token.
    pub fn kind(&self) -> TokenKind {
        self.tok().kind
    }

    /// Span of the current token.
    pub fn span(&self) -> Span {
        self.tok().span
    }

    /// Source text of the current token.
    pub fn text(&self) -> &'src str {
        let span = self.tok().span;
        &self.source[span.range()]
    }

    /// Decoded value of the current token when it is a string literal.
    pub fn str_value(&self) -> Option<&str> {
        self.tok().decoded.as_deref()
    }

    /// Kind of the token after the current one.
    pub fn peek_kind(&self) -> TokenKind {
        self.tokens
            .get(self.pos + 1)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    /// Check the current token's kind.
    pub fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    /// Consume the current token.
    pub fn next_token(&mut self) {
        self.last_span = self.span();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    /// Span of the most recently consumed token.
    pub fn prev_span(&self) -> Span {
        self.last_span
    }

    /// Consume the current token, which must be of `kind`; otherwise
    /// report a syntax error.
    pub fn expect(&mut self, kind: TokenKind) -> Option<()> {
        if self.err {
            return None;
        }
        if self.at(kind) {
            self.next_token();
            Some(())
        } else {
            self.fail(
                ErrorKind::Syntax,
                format!("expected {}, found {}", kind, self.kind()),
                self.span(),
            );
            None
        }
    }

    // ── Diagnostics ────────────────────────────────────────────────────

    /// Record an error and trip the error flag. Only the first error per
    /// entry call is recorded; later calls are no-ops because every layer
    /// returns as soon as the flag is set.
    pub fn fail(&mut self, kind: ErrorKind, message: impl Into<String>, span: Span) {
        if self.err {
            return;
        }
        self.err = true;
        self.diagnostics.push(Diagnostic::new(kind, message, span));
    }

    /// As [`Compiler::fail`], with a secondary note.
    pub fn fail_with_note(
        &mut self,
        kind: ErrorKind,
        message: impl Into<String>,
        span: Span,
        note: impl Into<String>,
        note_span: Span,
    ) {
        if self.err {
            return;
        }
        self.err = true;
        self.diagnostics
            .push(Diagnostic::new(kind, message, span).with_note(note, note_span));
    }

    // ── Generated names and output ─────────────────────────────────────

    /// Next value of the monotonic unique-name counter.
    pub fn unique(&mut self) -> u32 {
        let u = self.unique;
        self.unique += 1;
        u
    }

    /// Render a finished fragment into the body buffer at the current
    /// indentation.
    pub fn emit(&mut self, fragment: &crate::fragment::Fragment) {
        let rendered = fragment.render(self.indent);
        self.body.push_str(&rendered);
    }

    /// Hand the accumulated output buffers to the host, resetting them.
    pub fn take_output(&mut self) -> Output {
        Output {
            header: std::mem::take(&mut self.header),
            prologue: std::mem::take(&mut self.prologue),
            body: std::mem::take(&mut self.body),
            finalizers: std::mem::take(&mut self.finalizers),
            regexes: std::mem::take(&mut self.regexes),
        }
    }

    // ── Method context ─────────────────────────────────────────────────

    /// Restrict variable reads to the given method context.
    pub fn set_method(&mut self, name: impl Into<String>, mask: u32) {
        self.method_name = Some(name.into());
        self.method_mask = mask;
    }

    /// Record a variable read; error when the symbol is not readable in
    /// the current method.
    pub fn add_use(&mut self, name: &str, r_methods: u32, span: Span) {
        if r_methods & self.method_mask == 0 {
            let method = self.method_name.as_deref().unwrap_or("this method").to_string();
            self.fail(
                ErrorKind::Constraint,
                format!("'{name}' is not available in {method}"),
                span,
            );
            return;
        }
        self.uses.push((name.to_string(), span));
    }

    /// Variable reads recorded so far.
    pub fn uses(&self) -> &[(String, Span)] {
        &self.uses
    }

    // ── Numeric and unit lexers ────────────────────────────────────────

    /// Parse the current numeric-literal token to a value plus an
    /// is-fractional flag, and consume it.
    pub fn num_val(&mut self) -> Option<(f64, bool)> {
        if self.err {
            return None;
        }
        let text = self.text();
        let Ok(value) = text.parse::<f64>() else {
            self.fail(
                ErrorKind::Syntax,
                format!("bad numeric literal '{text}'"),
                self.span(),
            );
            return None;
        };
        let fractional = text.contains('.');
        self.next_token();
        Some((value, fractional))
    }

    /// The time-unit multiplier of the current identifier token, consuming
    /// it. Seconds are the base unit.
    pub fn time_unit(&mut self) -> Option<f64> {
        if self.err {
            return None;
        }
        let factor = match self.text() {
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            "d" => 86400.0,
            "w" => 604800.0,
            "y" => 31536000.0,
            other => {
                self.fail(
                    ErrorKind::Syntax,
                    format!(
                        "unknown time unit '{other}'; legal units are 'ms', 's', 'm', 'h', 'd', 'w' and 'y'"
                    ),
                    self.span(),
                );
                return None;
            }
        };
        self.next_token();
        Some(factor)
    }

    /// Parse a bytes quantity: a numeric literal followed by a size unit,
    /// both consumed. Units are 1024-based.
    pub fn byte_val(&mut self) -> Option<f64> {
        let (value, _) = self.num_val()?;
        if !self.at(TokenKind::Ident) {
            self.fail(
                ErrorKind::Syntax,
                "expected a BYTES unit ('B', 'KB', 'MB', 'GB' or 'TB')",
                self.span(),
            );
            return None;
        }
        let scale: f64 = match self.text() {
            "B" => 1.0,
            "KB" => 1024.0,
            "MB" => 1024.0 * 1024.0,
            "GB" => 1024.0 * 1024.0 * 1024.0,
            "TB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
            other => {
                self.fail(
                    ErrorKind::Syntax,
                    format!("unknown BYTES unit '{other}'; legal units are 'B', 'KB', 'MB', 'GB' and 'TB'"),
                    self.span(),
                );
                return None;
            }
        };
        self.next_token();
        Some(value * scale)
    }

    // ── External services ──────────────────────────────────────────────

    /// Compile a regex literal through the regex service: validates the
    /// pattern, declares a header slot for the compiled program, records
    /// the wiring pair, and returns the stable slot name.
    pub fn regex_literal(&mut self, pattern: &str, span: Span) -> Option<String> {
        if let Err(e) = regex::Regex::new(pattern) {
            let msg = e.to_string().replace('\n', " ");
            self.fail(
                ErrorKind::Constraint,
                format!("invalid regular expression: {msg}"),
                span,
            );
            return None;
        }
        let u = self.unique();
        let name = format!("wgc_re_{u}");
        self.header
            .push_str(&format!("static struct wrt_regex *{name};\n"));
        self.regexes.push((name.clone(), pattern.to_string()));
        Some(name)
    }

    /// Resolve an address literal to a target-language expression
    /// producing a runtime address value: a reference to a generated
    /// header constant.
    pub fn resolve_address(&mut self, literal: &str, span: Span) -> Option<String> {
        if literal.parse::<std::net::IpAddr>().is_err() {
            self.fail(
                ErrorKind::Constraint,
                format!("cannot resolve '{literal}' to an IP address"),
                span,
            );
            return None;
        }
        let u = self.unique();
        let name = format!("wgc_ip_{u}");
        self.header.push_str(&format!(
            "static const struct wrt_ip {name} = WRT_IP_INIT(\"{literal}\");\n"
        ));
        Some(format!("&{name}"))
    }
}

/// Quote a decoded string value as a C string literal.
pub fn c_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\{:03o}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// User-facing name of a type in diagnostics (string forms fold together).
pub fn utype(ty: Type) -> &'static str {
    ty.user_name()
}
