//! The fragment editor.
//!
//! Composes a new fragment out of one or two existing ones. An [`Edit`] is
//! a built sequence of ops: literal text, verbatim splices, the two
//! string-family lowerings (join to a single `STRING`, bundle to a
//! `STRANDS` record), and deferred indentation. Both input fragments are
//! consumed; the result inherits its span from the first input's start to
//! the last input's end.
//!
//! Many operations in the expression compiler have schematic output
//! syntaxes, so their parsers build small edits like
//! `text("(").sub1().text(" + ").sub2().text(")")` instead of formatting
//! strings by hand.

use crate::compiler::Compiler;
use crate::fragment::{Fragment, Piece};
use crate::types::Type;

/// Selects which input fragment an op applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    First,
    Second,
}

#[derive(Debug, Clone)]
enum Op {
    /// Literal template text. Consecutive newlines in template text never
    /// duplicate, including across op boundaries.
    Text(String),
    /// Splice the input's buffer verbatim.
    Sub(Input),
    /// Splice the input (which must be `STRINGS`) as a single joined
    /// string: more than one element gets wrapped in the runtime collect
    /// call.
    OneString(Input),
    /// Splice the input as a strands record: declares the aggregate and
    /// pointer-array auxiliaries in the function prologue and emits the
    /// bundle call referencing them.
    Strands(Input),
    Indent,
    Dedent,
}

/// A fragment-composition recipe. Build with the chained methods, then
/// [`Edit::apply`].
#[derive(Debug, Clone, Default)]
pub struct Edit {
    ops: Vec<Op>,
}

impl Edit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append literal template text.
    pub fn text(mut self, s: impl Into<String>) -> Self {
        self.ops.push(Op::Text(s.into()));
        self
    }

    /// Splice the first input verbatim.
    pub fn sub1(mut self) -> Self {
        self.ops.push(Op::Sub(Input::First));
        self
    }

    /// Splice the second input verbatim.
    pub fn sub2(mut self) -> Self {
        self.ops.push(Op::Sub(Input::Second));
        self
    }

    /// Splice the first input joined to a single string.
    pub fn one_string1(mut self) -> Self {
        self.ops.push(Op::OneString(Input::First));
        self
    }

    /// Splice the second input joined to a single string.
    pub fn one_string2(mut self) -> Self {
        self.ops.push(Op::OneString(Input::Second));
        self
    }

    /// Splice the first input as a strands record.
    pub fn strands1(mut self) -> Self {
        self.ops.push(Op::Strands(Input::First));
        self
    }

    /// Splice the second input as a strands record.
    pub fn strands2(mut self) -> Self {
        self.ops.push(Op::Strands(Input::Second));
        self
    }

    /// Increase emission indentation by two columns.
    pub fn indent(mut self) -> Self {
        self.ops.push(Op::Indent);
        self
    }

    /// Decrease emission indentation by two columns.
    pub fn dedent(mut self) -> Self {
        self.ops.push(Op::Dedent);
        self
    }

    /// Apply the edit, consuming the inputs and producing a fragment of
    /// type `ty`.
    ///
    /// The result's constancy defaults to `Var` and its `nstr` to 1;
    /// callers on constant-folding paths override both.
    pub fn apply(
        self,
        c: &mut Compiler<'_>,
        ty: Type,
        e1: Fragment,
        e2: Option<Fragment>,
    ) -> Fragment {
        let span = match &e2 {
            Some(e2) => e1.span.to(e2.span),
            None => e1.span,
        };
        let mut out = Fragment::new(ty, span);
        for op in self.ops {
            match op {
                Op::Text(text) => {
                    // Template text is copied verbatim except that a
                    // newline never duplicates one the buffer already
                    // ends with.
                    for ch in text.chars() {
                        if ch == '\n' && out.ends_with_newline() {
                            continue;
                        }
                        out.push_char(ch);
                    }
                }
                Op::Sub(input) => {
                    out.splice(select(&e1, e2.as_ref(), input));
                }
                Op::OneString(input) => {
                    let e3 = select(&e1, e2.as_ref(), input);
                    debug_assert_eq!(e3.ty, Type::Strings, "one-string splice of a non-STRINGS input");
                    if e3.nstr > 1 {
                        out.push_text("\nWRT_collect_strings(ctx,");
                        out.push_piece(Piece::Indent);
                        out.push_text("\n");
                        out.splice(e3);
                        out.push_text(",\nwrt_strings_end)");
                        out.push_piece(Piece::Dedent);
                        out.push_text("\n");
                    } else {
                        out.splice(e3);
                    }
                }
                Op::Strands(input) => {
                    let e3 = select(&e1, e2.as_ref(), input);
                    let u = c.unique();
                    c.prologue.push_str(&format!(
                        "  struct wrt_strands strs_{u}_a;\n  const char *strs_{u}_s[{}];\n",
                        e3.nstr
                    ));
                    out.push_piece(Piece::Indent);
                    out.push_text(format!(
                        "\nWRT_bundle_strands({}, &strs_{u}_a, strs_{u}_s,",
                        e3.nstr
                    ));
                    out.push_piece(Piece::Indent);
                    out.push_text("\n");
                    out.splice(e3);
                    out.push_text(",\nwrt_strings_end)");
                    out.push_piece(Piece::Dedent);
                    out.push_piece(Piece::Dedent);
                }
                Op::Indent => out.push_piece(Piece::Indent),
                Op::Dedent => out.push_piece(Piece::Dedent),
            }
        }
        out
    }
}

fn select<'a>(e1: &'a Fragment, e2: Option<&'a Fragment>, input: Input) -> &'a Fragment {
    match input {
        Input::First => e1,
        Input::Second => e2.expect("edit references a second input that was not supplied"),
    }
}

/// Shorthand for the commonest edit: wrap one input in literal parentheses.
pub fn parenthesize(c: &mut Compiler<'_>, ty: Type, e: Fragment) -> Fragment {
    let constancy = e.constancy;
    let nstr = e.nstr;
    let mut out = Edit::new().text("(").sub1().text(")").apply(c, ty, e, None);
    out.constancy = constancy;
    out.nstr = nstr;
    out
}
