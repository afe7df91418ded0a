//! The three logical layers: `!`, `&&` and `||`.
//!
//! `&&` and `||` are left-associative accumulators; the combined fragment
//! is emitted one operand per line with the operators outdented, so long
//! conditions render readably in the generated C.

use wcl_common::token::TokenKind;

use super::cmp::expr_cmp;
use crate::compiler::{utype, Compiler};
use crate::diagnostics::ErrorKind;
use crate::edit::Edit;
use crate::fragment::Fragment;
use crate::types::Type;

/// ExprNot: `'!' ExprCmp | ExprCmp`
pub(super) fn expr_not(c: &mut Compiler<'_>, demand: Type) -> Option<Fragment> {
    if demand != Type::Bool || !c.at(TokenKind::Bang) {
        return expr_cmp(c, demand);
    }

    c.next_token();
    let operand_span = c.span();
    let e2 = expr_cmp(c, demand)?;
    if e2.ty != Type::Bool {
        c.fail(
            ErrorKind::Type,
            format!("'!' must be followed by BOOL, found {}", utype(e2.ty)),
            operand_span.to(c.span()),
        );
        return None;
    }
    Some(
        Edit::new()
            .text("!(")
            .sub1()
            .text(")")
            .apply(c, Type::Bool, e2, None),
    )
}

/// ExprCand: `ExprNot { '&&' ExprNot }*`
pub(super) fn expr_cand(c: &mut Compiler<'_>, demand: Type) -> Option<Fragment> {
    let mut e = expr_not(c, demand)?;
    if e.ty != Type::Bool || !c.at(TokenKind::AmpAmp) {
        return Some(e);
    }
    e = Edit::new()
        .text("(")
        .indent()
        .text("\n")
        .sub1()
        .apply(c, Type::Bool, e, None);
    while c.at(TokenKind::AmpAmp) {
        c.next_token();
        let operand_span = c.span();
        let e2 = expr_not(c, demand)?;
        if e2.ty != Type::Bool {
            c.fail(
                ErrorKind::Type,
                format!("'&&' must be followed by BOOL, found {}", utype(e2.ty)),
                operand_span.to(c.span()),
            );
            return None;
        }
        e = Edit::new()
            .sub1()
            .dedent()
            .text("\n&&")
            .indent()
            .text("\n")
            .sub2()
            .apply(c, Type::Bool, e, Some(e2));
    }
    Some(
        Edit::new()
            .sub1()
            .dedent()
            .text("\n)")
            .apply(c, Type::Bool, e, None),
    )
}

/// ExprCor: `ExprCand { '||' ExprCand }*`
pub(super) fn expr_cor(c: &mut Compiler<'_>, demand: Type) -> Option<Fragment> {
    let mut e = expr_cand(c, demand)?;
    if e.ty != Type::Bool || !c.at(TokenKind::PipePipe) {
        return Some(e);
    }
    e = Edit::new()
        .text("(")
        .indent()
        .text("\n")
        .sub1()
        .apply(c, Type::Bool, e, None);
    while c.at(TokenKind::PipePipe) {
        c.next_token();
        let operand_span = c.span();
        let e2 = expr_cand(c, demand)?;
        if e2.ty != Type::Bool {
            c.fail(
                ErrorKind::Type,
                format!("'||' must be followed by BOOL, found {}", utype(e2.ty)),
                operand_span.to(c.span()),
            );
            return None;
        }
        e = Edit::new()
            .sub1()
            .dedent()
            .text("\n||")
            .indent()
            .text("\n")
            .sub2()
            .apply(c, Type::Bool, e, Some(e2));
    }
    Some(
        Edit::new()
            .sub1()
            .dedent()
            .text("\n)")
            .apply(c, Type::Bool, e, None),
    )
}
