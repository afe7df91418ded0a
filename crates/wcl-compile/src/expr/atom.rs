//! The atom parser: the leaves of the expression grammar.
//!
//! An atom is a parenthesised expression, an identifier resolved through
//! the symbol table, a string literal (or address literal when an IP is
//! demanded), or an optionally signed numeric literal interpreted against
//! the demanded type (duration, bytes, real or integer).

use wcl_common::span::Span;
use wcl_common::token::TokenKind;

use super::call;
use super::logic::expr_cor;
use super::tostring;
use crate::compiler::{c_quote, utype, Compiler};
use crate::diagnostics::ErrorKind;
use crate::edit::parenthesize;
use crate::fragment::{Constancy, Fragment};
use crate::symbols::{Eval, SymKind};
use crate::types::Type;

/// Expr4: `'(' ExprCor ')' | symbol | CNUM | CSTR | '-' CNUM`
pub(super) fn expr_atom(c: &mut Compiler<'_>, demand: Type) -> Option<Fragment> {
    if c.err {
        return None;
    }
    match c.kind() {
        TokenKind::LParen => {
            let open_span = c.span();
            c.next_token();
            let e2 = expr_cor(c, demand)?;
            let close_span = c.span();
            c.expect(TokenKind::RParen)?;
            if e2.ty == Type::Strings {
                Some(e2)
            } else {
                let ty = e2.ty;
                let mut e = parenthesize(c, ty, e2);
                e.span = open_span.to(close_span);
                Some(e)
            }
        }

        TokenKind::Ident => ident_atom(c, demand),

        TokenKind::CStr => string_atom(c, demand),

        TokenKind::Minus => {
            if !matches!(demand, Type::Int | Type::Real | Type::Duration) {
                return unknown_token(c, demand);
            }
            let minus_span = c.span();
            c.next_token();
            if !c.at(TokenKind::CNum) {
                let (kind, span) = (c.kind(), c.span());
                c.fail(
                    ErrorKind::Syntax,
                    format!("expected numeric literal, found {kind}"),
                    span,
                );
                return None;
            }
            number_atom(c, demand, "-", minus_span)
        }

        TokenKind::CNum => {
            let start = c.span();
            number_atom(c, demand, "", start)
        }

        _ => unknown_token(c, demand),
    }
}

fn unknown_token(c: &mut Compiler<'_>, demand: Type) -> Option<Fragment> {
    let (kind, span) = (c.kind(), c.span());
    c.fail(
        ErrorKind::Syntax,
        format!("unknown token {} when looking for {}", kind, utype(demand)),
        span,
    );
    None
}

// ── Identifiers ────────────────────────────────────────────────────────

/// Resolve an identifier atom through the symbol table and dispatch on its
/// evaluator.
fn ident_atom(c: &mut Compiler<'_>, demand: Type) -> Option<Fragment> {
    let span = c.span();
    let text = c.text();

    // `default` maps to the type-specific built-in when one is demanded.
    if text == "default" && demand == Type::Probe {
        c.next_token();
        return Some(Fragment::text(Type::Probe, "wgc_default_probe", span));
    }
    if text == "default" && demand == Type::Backend {
        c.next_token();
        return Some(Fragment::text(
            Type::Backend,
            "*(WGC_conf.default_backend)",
            span,
        ));
    }

    let Some(sym) = c.symbols.lookup(text) else {
        c.fail(
            ErrorKind::UnknownSymbol,
            format!("symbol not found: '{text}'"),
            span,
        );
        return None;
    };
    let sym = sym.clone();

    if sym.kind == SymKind::Func && sym.ty == Type::Void {
        c.fail(
            ErrorKind::Constraint,
            format!("function returns VOID: '{}'", sym.name),
            span,
        );
        return None;
    }

    let Some(eval) = sym.eval.clone() else {
        let message = format!(
            "symbol kind ({}) can not be used in an expression",
            sym.kind.name()
        );
        match sym.def_span {
            Some(def) => {
                c.fail_with_note(
                    ErrorKind::Constraint,
                    message,
                    span,
                    "that symbol was defined here",
                    def,
                );
            }
            None => c.fail(ErrorKind::Constraint, message, span),
        }
        return None;
    };

    let e = match eval {
        Eval::Var => {
            c.add_use(&sym.name, sym.r_methods, span);
            if c.err {
                return None;
            }
            c.next_token();
            let mut f = Fragment::text(sym.ty, &sym.rname, span);
            if f.ty == Type::String {
                f.ty = Type::Strings;
            }
            f
        }
        Eval::BoolConst(value) => {
            c.next_token();
            let mut f = Fragment::text(Type::Bool, if value { "(0==0)" } else { "(0==1)" }, span);
            f.constancy = Constancy::Const;
            f
        }
        Eval::Handle => {
            c.next_token();
            if sym.ty != Type::String && demand == Type::Strings {
                // A handle in string context renders as its own name.
                let mut f = Fragment::text(Type::Strings, c_quote(&sym.name), span);
                f.constancy = Constancy::StrConst;
                f
            } else {
                let mut f = Fragment::text(sym.ty, &sym.rname, span);
                if f.ty == Type::String {
                    f.ty = Type::Strings;
                }
                f
            }
        }
        Eval::Regsub { all } => {
            c.next_token();
            call::regsub(c, all, span)?
        }
        Eval::Func => {
            c.next_token();
            let mut f = call::call_expr(c, &sym, span)?;
            if f.ty == Type::String {
                f.ty = Type::Strings;
                f.nstr = 1;
            }
            f
        }
    };

    // Unless a header is demanded, header values fold to strings here.
    if demand != Type::Header && e.ty == Type::Header {
        return tostring(c, e, Type::Strings);
    }
    Some(e)
}

// ── Literals ───────────────────────────────────────────────────────────

fn string_atom(c: &mut Compiler<'_>, demand: Type) -> Option<Fragment> {
    let span = c.span();
    if demand == Type::Ip {
        let literal = c.str_value().unwrap_or_default().to_string();
        if literal.starts_with('/') {
            c.fail(
                ErrorKind::Constraint,
                format!("cannot convert to an IP address: {}", c_quote(&literal)),
                span,
            );
            return None;
        }
        let rendered = c.resolve_address(&literal, span)?;
        c.next_token();
        let mut f = Fragment::text(Type::Ip, rendered, span);
        f.constancy = Constancy::Const;
        Some(f)
    } else {
        let encoded = c_quote(c.str_value().unwrap_or_default());
        c.next_token();
        let mut f = Fragment::text(Type::Strings, encoded, span);
        f.constancy = Constancy::StrConst;
        f.nstr = 1;
        Some(f)
    }
}

/// Interpret a numeric literal against the demanded type: bytes when BYTES
/// is demanded, a duration when a time unit follows, otherwise real or
/// integer.
fn number_atom(
    c: &mut Compiler<'_>,
    demand: Type,
    sign: &str,
    start_span: Span,
) -> Option<Fragment> {
    let mut f = if demand == Type::Bytes {
        let v = c.byte_val()?;
        Fragment::text(
            Type::Bytes,
            format!("{v:.1}"),
            start_span.to(c.prev_span()),
        )
    } else {
        let (value, fractional) = c.num_val()?;
        if c.at(TokenKind::Ident) {
            let unit = c.time_unit()?;
            Fragment::text(
                Type::Duration,
                format!("{sign}{}", fmt_real(value * unit)),
                start_span.to(c.prev_span()),
            )
        } else if fractional || demand == Type::Real {
            Fragment::text(
                Type::Real,
                format!("{sign}{}", fmt_real(value)),
                start_span.to(c.prev_span()),
            )
        } else {
            Fragment::text(
                Type::Int,
                format!("{sign}{}", value as i64),
                start_span.to(c.prev_span()),
            )
        }
    };
    f.constancy = Constancy::Const;
    Some(f)
}

/// Format a real value as a C double literal: integral values keep one
/// decimal so the emitted token stays a double.
fn fmt_real(v: f64) -> String {
    if v == v.trunc() && v.abs() < 1e15 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}
