//! The symbol table the expression compiler resolves identifiers against.
//!
//! Symbols are installed by the surrounding compiler phases (variable
//! declarations, module loading, backend/probe/ACL definitions) and looked
//! up here by their full dotted name. Each symbol carries the evaluator the
//! expression compiler dispatches on; the evaluator set is closed, so it is
//! an enum rather than the original's function pointers.

use rustc_hash::FxHashMap;
use wcl_common::span::Span;

use crate::args::Signature;
use crate::types::Type;

/// Read access from every method context.
pub const METHODS_ALL: u32 = u32::MAX;

/// What sort of thing a symbol names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymKind {
    Var,
    Func,
    Acl,
    Backend,
    Probe,
    Sub,
}

impl SymKind {
    pub fn name(self) -> &'static str {
        match self {
            SymKind::Var => "variable",
            SymKind::Func => "function",
            SymKind::Acl => "acl",
            SymKind::Backend => "backend",
            SymKind::Probe => "probe",
            SymKind::Sub => "subroutine",
        }
    }
}

/// How an identifier atom evaluates. Dispatch happens in the atom parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Eval {
    /// Read a runtime variable: emits the rendered name, records a usage
    /// against the current method context.
    Var,
    /// A boolean constant (`true` / `false`).
    BoolConst(bool),
    /// An opaque handle (backend, probe, ACL name used as a value).
    Handle,
    /// The regex-substitution intrinsics; `all` distinguishes
    /// `regsuball` from `regsub`.
    Regsub { all: bool },
    /// A module function call.
    Func,
}

/// One named entity visible to expressions.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymKind,
    /// Declared value type.
    pub ty: Type,
    /// Rendered target-language name.
    pub rname: String,
    /// Owning module, for module functions and their private arguments.
    pub module: Option<String>,
    /// How an identifier atom referencing this symbol evaluates; absent
    /// for symbol kinds that are not usable in expressions.
    pub eval: Option<Eval>,
    /// Decoded call signature, for `Eval::Func` symbols.
    pub signature: Option<Signature>,
    /// Extra implicit arguments injected after `ctx` in emitted calls.
    pub extra: Option<String>,
    /// Bitmask of methods allowed to read this symbol.
    pub r_methods: u32,
    /// Definition site, for diagnostics.
    pub def_span: Option<Span>,
}

impl Symbol {
    /// A runtime variable readable in the given methods.
    pub fn var(name: impl Into<String>, ty: Type, rname: impl Into<String>, r_methods: u32) -> Self {
        Self {
            name: name.into(),
            kind: SymKind::Var,
            ty,
            rname: rname.into(),
            module: None,
            eval: Some(Eval::Var),
            signature: None,
            extra: None,
            r_methods,
            def_span: None,
        }
    }

    /// A module function with a decoded signature.
    pub fn func(name: impl Into<String>, module: impl Into<String>, signature: Signature) -> Self {
        let name = name.into();
        Self {
            name: name.clone(),
            kind: SymKind::Func,
            ty: signature.ret,
            rname: signature.cfunc.clone(),
            module: Some(module.into()),
            eval: Some(Eval::Func),
            signature: Some(signature),
            extra: None,
            r_methods: METHODS_ALL,
            def_span: None,
        }
    }

    /// An opaque handle symbol (backend, probe, named ACL).
    pub fn handle(name: impl Into<String>, kind: SymKind, ty: Type, rname: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            ty,
            rname: rname.into(),
            module: None,
            eval: Some(Eval::Handle),
            signature: None,
            extra: None,
            r_methods: METHODS_ALL,
            def_span: None,
        }
    }

    /// A built-in intrinsic (`regsub`, `true`, ...) with a dedicated
    /// evaluator and no rendered name of its own.
    pub fn intrinsic(name: impl Into<String>, ty: Type, eval: Eval) -> Self {
        Self {
            name: name.into(),
            kind: SymKind::Func,
            ty,
            rname: String::new(),
            module: None,
            eval: Some(eval),
            signature: None,
            extra: None,
            r_methods: METHODS_ALL,
            def_span: None,
        }
    }

    /// A symbol of a kind that expressions cannot evaluate (e.g. a
    /// subroutine name); kept for the diagnostics it produces.
    pub fn other(name: impl Into<String>, kind: SymKind, def_span: Option<Span>) -> Self {
        Self {
            name: name.into(),
            kind,
            ty: Type::Void,
            rname: String::new(),
            module: None,
            eval: None,
            signature: None,
            extra: None,
            r_methods: METHODS_ALL,
            def_span,
        }
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    pub fn with_def_span(mut self, span: Span) -> Self {
        self.def_span = Some(span);
        self
    }
}

/// Name-to-symbol map plus the forward references created on demand.
#[derive(Debug, Default)]
pub struct SymbolTable {
    map: FxHashMap<String, Symbol>,
    /// Names of symbols created by reference before their definition
    /// (currently only ACLs). The surrounding compiler resolves these
    /// once the whole configuration has been read.
    forward: Vec<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or replace a symbol.
    pub fn define(&mut self, sym: Symbol) {
        self.map.insert(sym.name.clone(), sym);
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.map.get(name)
    }

    /// Look up an ACL symbol, creating a forward reference when the name
    /// is not yet defined. The created symbol's rendered name follows the
    /// generated-code convention for ACLs.
    pub fn acl_or_forward(&mut self, name: &str) -> &Symbol {
        if !self.map.contains_key(name) {
            let rname = format!("wgc_acl_{}", name.replace(['.', '-'], "_"));
            self.map
                .insert(name.to_string(), Symbol::handle(name, SymKind::Acl, Type::Acl, rname));
            self.forward.push(name.to_string());
        }
        &self.map[name]
    }

    /// Names referenced before definition.
    pub fn forward_refs(&self) -> &[String] {
        &self.forward
    }
}
