//! The layered expression parser and its host-facing entry points.
//!
//! Layer order, outermost first: entry -> `||` -> `&&` -> `!` ->
//! comparison -> additive -> multiplicative -> atom. The entry point
//! normalises string-family demands to the internal catenation type,
//! applies the final lowering edits, and emits the finished fragment into
//! the body buffer.

mod atom;
mod call;
mod cmp;
mod logic;
mod ops;

use wcl_common::token::TokenKind;

use crate::compiler::{utype, Compiler};
use crate::diagnostics::ErrorKind;
use crate::edit::Edit;
use crate::fragment::{Constancy, Fragment};
use crate::symbols::{Eval, SymKind, Symbol};
use crate::types::Type;

/// Convert a fragment to a string-family type via its type's explicit
/// to-string template.
pub(crate) fn tostring(c: &mut Compiler<'_>, e: Fragment, demand: Type) -> Option<Fragment> {
    debug_assert!(matches!(
        demand,
        Type::Strings | Type::StringList | Type::String
    ));
    debug_assert_ne!(e.ty, demand);

    let Some(prefix) = e.ty.tostring() else {
        let span = e.span.to(c.span());
        if e.ty == Type::Blob {
            c.fail(
                ErrorKind::Constraint,
                "wrong use of BLOB value; BLOBs can only be used as arguments to module functions",
                span,
            );
        } else {
            c.fail(
                ErrorKind::Type,
                format!("cannot convert {} to STRING", utype(e.ty)),
                span,
            );
        }
        return None;
    };
    let mut out = Edit::new()
        .text(prefix)
        .sub1()
        .text(")")
        .apply(c, demand, e, None);
    out.constancy = Constancy::Var;
    out.nstr = 1;
    Some(out)
}

/// Parse one expression with a normalised internal demand and perform the
/// entry point's final coercions. Returns the finished fragment, typed
/// exactly as demanded.
pub(crate) fn expr0(c: &mut Compiler<'_>, demand: Type) -> Option<Fragment> {
    debug_assert_ne!(demand, Type::Void);
    debug_assert_ne!(demand, Type::Strings);

    let start_span = c.span();
    let inner = if matches!(demand, Type::String | Type::StringList | Type::Strands) {
        Type::Strings
    } else {
        demand
    };
    let mut e = logic::expr_cor(c, inner)?;
    debug_assert!(e.ty != Type::String && e.ty != Type::StringList);

    if e.ty == Type::Strings && demand == Type::StringList {
        e.ty = Type::StringList;
    } else if e.ty == Type::Strings && demand == Type::String {
        let constancy = e.constancy;
        e = Edit::new().one_string1().apply(c, Type::String, e, None);
        e.constancy = constancy;
    } else if e.ty == Type::Strings && demand == Type::Strands {
        e = Edit::new().strands1().apply(c, Type::Strands, e, None);
    } else if e.ty != Type::Strings
        && (demand == Type::String || demand == Type::StringList)
    {
        e = tostring(c, e, demand)?;
    }

    if e.ty == Type::StringList {
        // Variadic string ABI: terminator literal, one element per line.
        let constancy = e.constancy;
        e = Edit::new()
            .indent()
            .text("\n")
            .sub1()
            .text(",\nwrt_strings_end")
            .dedent()
            .apply(c, Type::StringList, e, None);
        e.constancy = constancy;
    }

    if e.ty != demand {
        let span = start_span.to(c.span());
        c.fail(
            ErrorKind::Type,
            format!(
                "expression has type {}, expected {}",
                utype(e.ty),
                utype(demand)
            ),
            span,
        );
        return None;
    }
    Some(e)
}

impl<'src> Compiler<'src> {
    /// Parse one expression of the demanded type and emit it into the body
    /// buffer at the current indentation, followed by a newline.
    ///
    /// `demand` must be a concrete value type: not `VOID` and not the
    /// internal `STRINGS`.
    pub fn expr(&mut self, demand: Type) {
        assert_ne!(demand, Type::Void);
        assert_ne!(demand, Type::Strings);
        let Some(e) = expr0(self, demand) else {
            return;
        };
        self.emit(&e);
        self.body.push('\n');
    }

    /// Parse one expression of the demanded type without emitting it;
    /// the fragment is handed back instead. Used by hosts (and tests) that
    /// splice expressions into larger constructs themselves.
    pub fn parse_expr(&mut self, demand: Type) -> Option<Fragment> {
        assert_ne!(demand, Type::Void);
        assert_ne!(demand, Type::Strings);
        expr0(self, demand)
    }

    /// Evaluate a bare call statement: `name(args...) ;` emitted with a
    /// trailing `;`.
    pub fn call_stmt(&mut self) {
        if !self.at(TokenKind::Ident) {
            let (kind, span) = (self.kind(), self.span());
            self.fail(
                ErrorKind::Syntax,
                format!("expected a function name, found {kind}"),
                span,
            );
            return;
        }
        let span = self.span();
        let name = self.text().to_string();
        let Some(sym) = self.symbols.lookup(&name) else {
            self.fail(
                ErrorKind::UnknownSymbol,
                format!("symbol not found: '{name}'"),
                span,
            );
            return;
        };
        let sym = sym.clone();
        if sym.kind != SymKind::Func || sym.signature.is_none() {
            self.fail(
                ErrorKind::Constraint,
                format!("'{name}' is not callable as a statement"),
                span,
            );
            return;
        }
        self.next_token();
        let Some(e) = call::call_expr(self, &sym, span) else {
            return;
        };
        self.emit(&e);
        if self.expect(TokenKind::Semicolon).is_some() {
            self.body.push_str(";\n");
        }
    }

    /// Register the built-in expression symbols: the regex-substitution
    /// intrinsics and the boolean constants.
    pub fn install_builtins(&mut self) {
        self.symbols.define(Symbol::intrinsic(
            "regsub",
            Type::String,
            Eval::Regsub { all: false },
        ));
        self.symbols.define(Symbol::intrinsic(
            "regsuball",
            Type::String,
            Eval::Regsub { all: true },
        ));
        self.symbols
            .define(Symbol::intrinsic("true", Type::Bool, Eval::BoolConst(true)));
        self.symbols
            .define(Symbol::intrinsic("false", Type::Bool, Eval::BoolConst(false)));
    }
}
