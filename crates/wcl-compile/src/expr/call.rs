//! The call parser: argument lists against decoded module signatures.
//!
//! Formals are consumed in declared order. Private arguments are
//! synthesised without reading input; enumerations are matched against
//! their declared value lists; everything else parses a sub-expression
//! demanding the formal's type. Positional parsing stops at `)` or at
//! `ident =`, after which named pairs bind in any order. The emitted call
//! is `cfunc(ctx<extra>, <args...>)` with one argument per rendered line.

use wcl_common::span::Span;
use wcl_common::token::TokenKind;

use super::expr0;
use crate::args::{ArgSpec, PrivKind};
use crate::compiler::Compiler;
use crate::diagnostics::ErrorKind;
use crate::edit::Edit;
use crate::fragment::{Fragment, Piece};
use crate::symbols::Symbol;
use crate::types::Type;

/// Parse `'(' args ')'` against `sym`'s signature and produce the call
/// fragment. The identifier token has already been consumed; `name_span`
/// is its span.
pub(super) fn call_expr(
    c: &mut Compiler<'_>,
    sym: &Symbol,
    name_span: Span,
) -> Option<Fragment> {
    let Some(sig) = sym.signature.clone() else {
        c.fail(
            ErrorKind::Internal,
            format!("function '{}' has no signature", sym.name),
            name_span,
        );
        return None;
    };
    let module = sym.module.clone().unwrap_or_default();
    let extra = sym.extra.clone().unwrap_or_default();

    c.expect(TokenKind::LParen)?;

    // Private arguments are bound up front; they consume no input.
    let mut bound: Vec<Option<Fragment>> = sig
        .args
        .iter()
        .map(|spec| {
            spec.priv_kind
                .map(|kind| priv_arg(c, kind, &module, name_span))
        })
        .collect();

    // Positional arguments, in declared order.
    for (i, spec) in sig.args.iter().enumerate() {
        if c.at(TokenKind::RParen) {
            break;
        }
        if bound[i].is_some() {
            continue;
        }
        if c.at(TokenKind::Ident) && c.peek_kind() == TokenKind::Eq {
            break;
        }
        bound[i] = Some(do_arg(c, spec, &module)?);
        if c.at(TokenKind::RParen) {
            break;
        }
        c.expect(TokenKind::Comma)?;
    }

    // Named arguments, in any order.
    while c.at(TokenKind::Ident) {
        let name = c.text().to_string();
        let name_tok_span = c.span();
        let Some(i) = sig
            .args
            .iter()
            .position(|spec| spec.name.as_deref() == Some(name.as_str()))
        else {
            c.fail(
                ErrorKind::Argument,
                format!("unknown argument '{name}'"),
                name_tok_span,
            );
            return None;
        };
        if bound[i].is_some() {
            c.fail(
                ErrorKind::Argument,
                format!("argument '{name}' already used"),
                name_tok_span,
            );
            return None;
        }
        c.next_token();
        c.expect(TokenKind::Eq)?;
        bound[i] = Some(do_arg(c, &sig.args[i], &module)?);
        if c.at(TokenKind::RParen) {
            break;
        }
        c.expect(TokenKind::Comma)?;
    }

    // Assemble: callee, context, extras, then each bound argument.
    let mut e1 = Fragment::text(sig.ret, format!("{}(ctx{extra}", sig.cfunc), name_span);
    e1.push_piece(Piece::Indent);
    for (i, spec) in sig.args.iter().enumerate() {
        let result = bound[i].take().or_else(|| default_arg(spec, &module, name_span));
        let Some(result) = result else {
            let span = c.span();
            let which = match &spec.name {
                Some(name) => format!("'{name}'"),
                None => format!("{}", i + 1),
            };
            c.fail(
                ErrorKind::Argument,
                format!("argument {which} missing"),
                span,
            );
            return None;
        };
        let ty = e1.ty;
        e1 = Edit::new()
            .sub1()
            .text(",\n")
            .sub2()
            .apply(c, ty, e1, Some(result));
    }
    let ty = e1.ty;
    let e = Edit::new()
        .sub1()
        .text("\n)")
        .dedent()
        .apply(c, ty, e1, None);
    c.expect(TokenKind::RParen)?;
    Some(e)
}

/// Synthesise an unbound formal from its default value, when it has one.
fn default_arg(spec: &ArgSpec, module: &str, span: Span) -> Option<Fragment> {
    let val = spec.default.as_deref()?;
    if spec.ty == Type::Enum {
        Some(enum_fragment(module, val, span))
    } else {
        Some(Fragment::text(spec.ty, val, span))
    }
}

/// Parse one caller-supplied argument for `spec`.
fn do_arg(c: &mut Compiler<'_>, spec: &ArgSpec, module: &str) -> Option<Fragment> {
    if spec.ty == Type::Enum {
        if !c.at(TokenKind::Ident) {
            let (kind, span) = (c.kind(), c.span());
            c.fail(
                ErrorKind::Argument,
                format!("expected an enum value, found {kind}"),
                span,
            );
            return None;
        }
        let text = c.text();
        if !spec.enum_values.iter().any(|v| v == text) {
            let expected = spec.enum_values.join(", ");
            let (text, span) = (text.to_string(), c.span());
            c.fail(
                ErrorKind::Argument,
                format!("wrong enum value '{text}'; expected one of: {expected}"),
                span,
            );
            return None;
        }
        let f = enum_fragment(module, text, c.span());
        c.next_token();
        Some(f)
    } else {
        expr0(c, spec.ty)
    }
}

/// The emitted reference to a module's enum constant.
fn enum_fragment(module: &str, value: &str, span: Span) -> Fragment {
    Fragment::text(Type::Void, format!("*enum_{module}_{value}"), span)
}

/// Synthesise a private argument from the compilation context.
fn priv_arg(c: &mut Compiler<'_>, kind: PrivKind, module: &str, span: Span) -> Fragment {
    match kind {
        PrivKind::Cfg => Fragment::text(Type::Void, format!("&mod_priv_{module}"), span),
        PrivKind::Call => {
            let u = c.unique();
            let name = format!("wgc_priv_{u}");
            c.header
                .push_str(&format!("static struct wrt_priv {name};\n"));
            c.finalizers.push(format!("WRT_priv_fini(&{name});"));
            Fragment::text(Type::Void, format!("&{name}"), span)
        }
        PrivKind::Task => Fragment::text(
            Type::Void,
            format!("WRT_priv_task(ctx, &WGC_mod_{module})"),
            span,
        ),
        PrivKind::Top => Fragment::text(
            Type::Void,
            format!("WRT_priv_top(ctx, &WGC_mod_{module})"),
            span,
        ),
    }
}

/// The `regsub` / `regsuball` intrinsics:
/// `regsub(<string>, <regex literal>, <string>)`.
pub(super) fn regsub(c: &mut Compiler<'_>, all: bool, name_span: Span) -> Option<Fragment> {
    c.expect(TokenKind::LParen)?;
    let mut subject = expr0(c, Type::String)?;
    subject.span = name_span.to(subject.span);
    c.expect(TokenKind::Comma)?;
    if !c.at(TokenKind::CStr) {
        let (kind, span) = (c.kind(), c.span());
        c.fail(
            ErrorKind::Syntax,
            format!("expected string literal, found {kind}"),
            span,
        );
        return None;
    }
    let pattern = c.str_value().unwrap_or_default().to_string();
    let re = c.regex_literal(&pattern, c.span())?;
    c.next_token();
    let e = Edit::new()
        .text(format!("WRT_regsub(ctx, {},", i32::from(all)))
        .indent()
        .text("\n")
        .sub1()
        .text(format!(",\n{re}"))
        .apply(c, Type::String, subject, None);
    c.expect(TokenKind::Comma)?;
    let replacement = expr0(c, Type::String)?;
    let mut out = Edit::new()
        .sub1()
        .text(",\n")
        .sub2()
        .text(")")
        .dedent()
        .apply(c, Type::Strings, e, Some(replacement));
    out.nstr = 1;
    c.expect(TokenKind::RParen)?;
    Some(out)
}
