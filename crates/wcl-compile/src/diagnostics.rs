//! Compiler diagnostics and their ariadne rendering.
//!
//! Every error the expression compiler can produce is surfaced as a
//! [`Diagnostic`]: an error class, a message, the source range it covers,
//! and optional secondary notes (e.g. the definition site of a misused
//! symbol). Rendering is colorless on request so test output and snapshots
//! stay deterministic.

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use wcl_common::span::Span;

/// The class of a compiler error, per the error-handling design: lexical
/// mismatches, unknown symbols, type errors, argument errors, and semantic
/// constraints. `Internal` marks states the compiler should not be able to
/// reach from valid tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lex,
    Syntax,
    UnknownSymbol,
    Type,
    Argument,
    Constraint,
    Internal,
}

impl ErrorKind {
    /// Unique error code per class.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Lex => "E0100",
            ErrorKind::Syntax => "E0101",
            ErrorKind::UnknownSymbol => "E0102",
            ErrorKind::Type => "E0103",
            ErrorKind::Argument => "E0104",
            ErrorKind::Constraint => "E0105",
            ErrorKind::Internal => "E0109",
        }
    }
}

/// One compiler error, localised to a source range.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
    /// Secondary labels: (message, span) pairs pointing at related source.
    pub notes: Vec<(String, Span)>,
}

impl Diagnostic {
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, message: impl Into<String>, span: Span) -> Self {
        self.notes.push((message.into(), span));
        self
    }
}

/// Render a diagnostic against its source text.
///
/// With `color` off the output is plain text, suitable for snapshots.
pub fn render_diagnostic(diag: &Diagnostic, source: &str, color: bool) -> String {
    let config = Config::default().with_color(color);
    let source_len = source.len();

    // Clamp a span into the source and give ariadne a non-empty range.
    let clamp = |span: Span| -> std::ops::Range<usize> {
        let s = (span.start as usize).min(source_len);
        let e = (span.end as usize).min(source_len).max(s);
        if s == e {
            s..(s + 1).min(source_len.max(1))
        } else {
            s..e
        }
    };

    let span = clamp(diag.span);
    let mut builder = Report::build(ReportKind::Error, span.clone())
        .with_code(diag.kind.code())
        .with_message(&diag.message)
        .with_config(config)
        .with_label(
            Label::new(span)
                .with_message(&diag.message)
                .with_color(Color::Red),
        );
    for (note, note_span) in &diag.notes {
        builder.add_label(
            Label::new(clamp(*note_span))
                .with_message(note)
                .with_color(Color::Blue),
        );
    }

    let mut buf = Vec::new();
    builder
        .finish()
        .write(Source::from(source), &mut buf)
        .expect("diagnostic rendering failed");
    String::from_utf8(buf).expect("diagnostic output should be valid UTF-8")
}
