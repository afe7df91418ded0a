//! The comparison layer.
//!
//! Dispatch is table-driven: rows key on the left operand's type and the
//! relational token, and each row's handler carries its emission shape.
//! When no relational operator follows and the context wants a BOOL, the
//! layer applies the boolean coercions instead.

use wcl_common::token::TokenKind;

use super::ops::expr_add;
use crate::compiler::{utype, Compiler};
use crate::diagnostics::ErrorKind;
use crate::edit::Edit;
use crate::fragment::Fragment;
use crate::types::Type;

/// How a matched comparison row parses its right side and emits.
#[derive(Debug, Clone, Copy)]
enum Handler {
    /// Parse the RHS demanding the LHS type, emit
    /// `<open><lhs><infix><rhs>)`.
    Simple {
        open: &'static str,
        infix: &'static str,
    },
    /// Coerce the LHS to a single string, compile the RHS string literal
    /// as a regex, emit the match-helper call.
    Regex { negate: bool },
    /// Resolve (or forward-declare) the RHS access-list name, emit the
    /// acl-match helper over the LHS address.
    Acl { negate: bool },
    /// Parse the RHS as a string catenation; emit a pairwise compare for
    /// single strands, a strands compare otherwise. `prefix` is the
    /// comparison against the helper's return value.
    Strings { prefix: &'static str },
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    ty: Type,
    tok: TokenKind,
    handler: Handler,
}

const fn simple(ty: Type, tok: TokenKind, infix: &'static str) -> Rule {
    Rule {
        ty,
        tok,
        handler: Handler::Simple { open: "(", infix },
    }
}

const fn strings(tok: TokenKind, prefix: &'static str) -> Rule {
    Rule {
        ty: Type::Strings,
        tok,
        handler: Handler::Strings { prefix },
    }
}

/// Identity comparisons (`==`, `!=`) for a type.
const fn ident_rels(ty: Type) -> [Rule; 2] {
    [
        simple(ty, TokenKind::EqEq, " == "),
        simple(ty, TokenKind::NotEq, " != "),
    ]
}

/// The full relational set for an ordered numeric type.
const fn num_rels(ty: Type) -> [Rule; 6] {
    [
        simple(ty, TokenKind::EqEq, " == "),
        simple(ty, TokenKind::NotEq, " != "),
        simple(ty, TokenKind::LtEq, " <= "),
        simple(ty, TokenKind::GtEq, " >= "),
        simple(ty, TokenKind::Lt, " < "),
        simple(ty, TokenKind::Gt, " > "),
    ]
}

static NUM_RULES: [[Rule; 6]; 5] = [
    num_rels(Type::Int),
    num_rels(Type::Duration),
    num_rels(Type::Bytes),
    num_rels(Type::Real),
    num_rels(Type::Time),
];

static IDENT_RULES: [[Rule; 2]; 4] = [
    ident_rels(Type::Backend),
    ident_rels(Type::Acl),
    ident_rels(Type::Probe),
    ident_rels(Type::Sub),
];

static RULES: &[Rule] = &[
    // Addresses compare through the runtime helper.
    Rule {
        ty: Type::Ip,
        tok: TokenKind::EqEq,
        handler: Handler::Simple {
            open: "!WRT_ip_cmp(",
            infix: ", ",
        },
    },
    Rule {
        ty: Type::Ip,
        tok: TokenKind::NotEq,
        handler: Handler::Simple {
            open: "WRT_ip_cmp(",
            infix: ", ",
        },
    },
    Rule {
        ty: Type::Ip,
        tok: TokenKind::Tilde,
        handler: Handler::Acl { negate: false },
    },
    Rule {
        ty: Type::Ip,
        tok: TokenKind::NotTilde,
        handler: Handler::Acl { negate: true },
    },
    // String comparisons invert the relation against the helper result.
    strings(TokenKind::EqEq, "0 =="),
    strings(TokenKind::NotEq, "0 !="),
    strings(TokenKind::Lt, "0 > "),
    strings(TokenKind::Gt, "0 < "),
    strings(TokenKind::LtEq, "0 >="),
    strings(TokenKind::GtEq, "0 <="),
    Rule {
        ty: Type::Strings,
        tok: TokenKind::Tilde,
        handler: Handler::Regex { negate: false },
    },
    Rule {
        ty: Type::Strings,
        tok: TokenKind::NotTilde,
        handler: Handler::Regex { negate: true },
    },
];

/// First matching row across the three rule groups.
fn find_rule(ty: Type, tok: TokenKind) -> Option<Rule> {
    NUM_RULES
        .iter()
        .flatten()
        .chain(IDENT_RULES.iter().flatten())
        .chain(RULES.iter())
        .find(|r| r.ty == ty && r.tok == tok)
        .copied()
}

/// ExprCmp: `ExprAdd [ Relation ExprAdd | '~' CString | '~' ACL ]`
pub(super) fn expr_cmp(c: &mut Compiler<'_>, demand: Type) -> Option<Fragment> {
    let e = expr_add(c, demand)?;
    if e.ty == Type::Bool {
        return Some(e);
    }

    let tok = c.kind();
    if let Some(rule) = find_rule(e.ty, tok) {
        return match rule.handler {
            Handler::Simple { open, infix } => cmp_simple(c, e, open, infix),
            Handler::Regex { negate } => cmp_regex(c, e, negate),
            Handler::Acl { negate } => cmp_acl(c, e, negate),
            Handler::Strings { prefix } => cmp_strings(c, e, prefix),
        };
    }

    if tok.is_relational() {
        c.fail(
            ErrorKind::Type,
            format!("operator {} not possible on {}", c.text(), utype(e.ty)),
            c.span(),
        );
        return None;
    }

    if demand != Type::Bool {
        return Some(e);
    }

    // Boolean coercions for relational-free operands.
    match e.ty {
        Type::Backend | Type::Int => Some(
            Edit::new()
                .text("(")
                .sub1()
                .text(" != 0)")
                .apply(c, Type::Bool, e, None),
        ),
        Type::Duration => Some(
            Edit::new()
                .text("(")
                .sub1()
                .text(" > 0)")
                .apply(c, Type::Bool, e, None),
        ),
        Type::Strings => Some(
            Edit::new()
                .text("(")
                .one_string1()
                .text(" != 0)")
                .apply(c, Type::Bool, e, None),
        ),
        other => {
            let span = e.span;
            c.fail(
                ErrorKind::Internal,
                format!("no boolean rendition of {}", utype(other)),
                span,
            );
            None
        }
    }
}

fn cmp_simple(
    c: &mut Compiler<'_>,
    e: Fragment,
    open: &'static str,
    infix: &'static str,
) -> Option<Fragment> {
    let op_text = c.text().to_string();
    let op_span = c.span();
    c.next_token();
    let lhs_ty = e.ty;
    let e2 = expr_add(c, lhs_ty)?;
    if e2.ty != lhs_ty {
        c.fail(
            ErrorKind::Type,
            format!(
                "comparison of different types: {} '{}' {}",
                utype(lhs_ty),
                op_text,
                utype(e2.ty)
            ),
            op_span,
        );
        return None;
    }
    Some(
        Edit::new()
            .text(open)
            .sub1()
            .text(infix)
            .sub2()
            .text(")")
            .apply(c, Type::Bool, e, Some(e2)),
    )
}

fn cmp_regex(c: &mut Compiler<'_>, e: Fragment, negate: bool) -> Option<Fragment> {
    let e = Edit::new().one_string1().apply(c, Type::String, e, None);
    c.next_token();
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
    let bang = if negate { "!" } else { "" };
    Some(
        Edit::new()
            .text(format!("{bang}WRT_re_match(ctx, "))
            .sub1()
            .text(format!(", {re})"))
            .apply(c, Type::Bool, e, None),
    )
}

fn cmp_acl(c: &mut Compiler<'_>, e: Fragment, negate: bool) -> Option<Fragment> {
    c.next_token();
    if !c.at(TokenKind::Ident) {
        let (kind, span) = (c.kind(), c.span());
        c.fail(
            ErrorKind::Syntax,
            format!("expected an ACL name, found {kind}"),
            span,
        );
        return None;
    }
    let name = c.text().to_string();
    let rname = c.symbols.acl_or_forward(&name).rname.clone();
    c.next_token();
    let bang = if negate { "!" } else { "" };
    Some(
        Edit::new()
            .text(format!("{bang}WRT_acl_match(ctx, {rname}, "))
            .sub1()
            .text(")")
            .apply(c, Type::Bool, e, None),
    )
}

fn cmp_strings(c: &mut Compiler<'_>, e: Fragment, prefix: &'static str) -> Option<Fragment> {
    let op_text = c.text().to_string();
    let op_span = c.span();
    c.next_token();
    let e2 = expr_add(c, Type::Strings)?;
    if e2.ty != Type::Strings {
        c.fail(
            ErrorKind::Type,
            format!(
                "comparison of different types: {} '{}' {}",
                utype(e.ty),
                op_text,
                utype(e2.ty)
            ),
            op_span,
        );
        return None;
    }
    if e.nstr == 1 && e2.nstr == 1 {
        Some(
            Edit::new()
                .text(format!("({prefix} WRT_strcmp("))
                .sub1()
                .text(", ")
                .sub2()
                .text("))")
                .apply(c, Type::Bool, e, Some(e2)),
        )
    } else {
        Some(
            Edit::new()
                .text(format!("({prefix} WRT_strands_compare("))
                .strands1()
                .text(", ")
                .strands2()
                .text("))")
                .apply(c, Type::Bool, e, Some(e2)),
        )
    }
}
