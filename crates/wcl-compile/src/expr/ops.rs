//! The multiplicative and additive operator layers.
//!
//! Multiplication is driven by each type's multiplication partner;
//! addition by a first-match rule table, with a string-concatenation
//! fallback when `+` meets the string family.

use wcl_common::token::TokenKind;

use super::atom::expr_atom;
use super::tostring;
use crate::compiler::{utype, Compiler};
use crate::diagnostics::ErrorKind;
use crate::edit::Edit;
use crate::fragment::{Constancy, Fragment};
use crate::types::Type;

/// ExprMul: `Atom { ('*'|'/') Atom }*`
pub(super) fn expr_mul(c: &mut Compiler<'_>, demand: Type) -> Option<Fragment> {
    let mut e = expr_atom(c, demand)?;

    while matches!(c.kind(), TokenKind::Star | TokenKind::Slash) {
        let Some(partner) = e.ty.multype() else {
            c.fail(
                ErrorKind::Type,
                format!("operator {} not possible on type {}", c.text(), utype(e.ty)),
                c.span(),
            );
            return None;
        };
        let op = if c.at(TokenKind::Star) { "*" } else { "/" };
        let op_span = c.span();
        c.next_token();
        let e2 = expr_atom(c, partner)?;
        if e2.ty != Type::Int && e2.ty != partner {
            c.fail(
                ErrorKind::Type,
                format!("{} {} {} not possible", utype(e.ty), op, utype(e2.ty)),
                op_span,
            );
            return None;
        }
        let ty = e.ty;
        e = Edit::new()
            .text("(")
            .sub1()
            .text(op)
            .sub2()
            .text(")")
            .apply(c, ty, e, Some(e2));
    }
    Some(e)
}

/// The additive rule table: `(op, left, right) -> result`, first match
/// wins. Lookups by `(op, left)` decide the right-hand demand; lookups by
/// all three decide the result type.
const ADDS: &[(TokenKind, Type, Type, Type)] = &[
    (TokenKind::Plus, Type::Bytes, Type::Bytes, Type::Bytes),
    (TokenKind::Minus, Type::Bytes, Type::Bytes, Type::Bytes),
    (TokenKind::Plus, Type::Duration, Type::Duration, Type::Duration),
    (TokenKind::Minus, Type::Duration, Type::Duration, Type::Duration),
    (TokenKind::Plus, Type::Int, Type::Int, Type::Int),
    (TokenKind::Minus, Type::Int, Type::Int, Type::Int),
    (TokenKind::Plus, Type::Int, Type::Real, Type::Real),
    (TokenKind::Minus, Type::Int, Type::Real, Type::Real),
    (TokenKind::Plus, Type::Real, Type::Int, Type::Real),
    (TokenKind::Minus, Type::Real, Type::Int, Type::Real),
    (TokenKind::Plus, Type::Real, Type::Real, Type::Real),
    (TokenKind::Minus, Type::Real, Type::Real, Type::Real),
    (TokenKind::Minus, Type::Time, Type::Time, Type::Duration),
    (TokenKind::Plus, Type::Time, Type::Duration, Type::Time),
    (TokenKind::Minus, Type::Time, Type::Duration, Type::Time),
];

/// ExprAdd: `Mul { ('+'|'-') Mul }*`
pub(super) fn expr_add(c: &mut Compiler<'_>, demand: Type) -> Option<Fragment> {
    let mut e = expr_mul(c, demand)?;

    while matches!(c.kind(), TokenKind::Plus | TokenKind::Minus) {
        let op = c.kind();
        let op_text = if op == TokenKind::Plus { "+" } else { "-" };
        let op_span = c.span();

        let typed = ADDS.iter().any(|r| r.0 == op && r.1 == e.ty);
        c.next_token();
        // No row for the left type: when the context wants a string
        // catenation, parse the right side as one; otherwise mirror the
        // left type and let the second lookup produce the error.
        let e2 = if !typed && demand == Type::Strings {
            expr_mul(c, Type::Strings)?
        } else {
            expr_mul(c, e.ty)?
        };

        // Second lookup keys on the right operand's actual type.
        let row = ADDS
            .iter()
            .find(|r| r.0 == op && r.1 == e.ty && r.2 == e2.ty);

        if let Some(&(_, _, _, result)) = row {
            let infix = if op == TokenKind::Plus { " + " } else { " - " };
            e = Edit::new()
                .text("(")
                .sub1()
                .text(infix)
                .sub2()
                .text(")")
                .apply(c, result, e, Some(e2));
        } else if op == TokenKind::Plus && (e.ty == Type::Strings || demand == Type::Strings) {
            let e1 = if e.ty == Type::Strings {
                e
            } else {
                tostring(c, e, Type::Strings)?
            };
            let e2 = if e2.ty == Type::Strings {
                e2
            } else {
                tostring(c, e2, Type::Strings)?
            };
            let nstr = e1.nstr + e2.nstr;
            if e1.constancy.is_literal() && e2.constancy.is_const() {
                // Two compile-time strings: adjacent literals, newline
                // separated; the result is a literal only when both were.
                let lit = e2.constancy.is_literal();
                let mut out = Edit::new()
                    .sub1()
                    .text("\n")
                    .sub2()
                    .apply(c, Type::Strings, e1, Some(e2));
                out.constancy = if lit {
                    Constancy::StrConst
                } else {
                    Constancy::Const
                };
                out.nstr = nstr;
                e = out;
            } else {
                let mut out = Edit::new()
                    .sub1()
                    .text(",\n")
                    .sub2()
                    .apply(c, Type::Strings, e1, Some(e2));
                out.constancy = Constancy::Var;
                out.nstr = nstr;
                e = out;
            }
        } else {
            c.fail(
                ErrorKind::Type,
                format!("{} {} {} not possible", utype(e.ty), op_text, utype(e2.ty)),
                op_span.to(c.span()),
            );
            return None;
        }
    }
    Some(e)
}
