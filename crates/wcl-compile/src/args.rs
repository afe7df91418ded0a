//! Module-function signatures and the packed blob they are decoded from.
//!
//! Module metadata ships each function's signature as a packed sequence of
//! nul-terminated fields with interleaved sentinel bytes:
//!
//! ```text
//! <return-type> NUL <cfunc> NUL <arg>*
//! arg := PRIV_CFG|PRIV_CALL|PRIV_TASK|PRIV_TOP NUL
//!      | <type> NUL [ 0x01 (<value> NUL)* 0x01 NUL ]
//!                   [ 0x02 <name> NUL ] [ 0x03 <default> NUL ]
//! ```
//!
//! `0x01` brackets an enumeration value list, `0x02` precedes a
//! caller-visible parameter name, `0x03` precedes a default-value literal.
//! The blob is decoded exactly once, at module load; everything downstream
//! of this module sees only the typed [`Signature`].

use std::fmt;

use crate::types::Type;

/// A compiler-supplied ("private") argument kind. The caller never writes
/// these; the call parser synthesises them from the compilation context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivKind {
    /// Per-module state shared by the whole loaded configuration.
    Cfg,
    /// Per-call-site state with a registered finaliser.
    Call,
    /// Per-task state threaded through the runtime context.
    Task,
    /// State of the top request of the current task tree.
    Top,
}

impl PrivKind {
    fn from_marker(marker: &str) -> Option<PrivKind> {
        Some(match marker {
            "PRIV_CFG" => PrivKind::Cfg,
            "PRIV_CALL" => PrivKind::Call,
            "PRIV_TASK" => PrivKind::Task,
            "PRIV_TOP" => PrivKind::Top,
            _ => return None,
        })
    }
}

/// One formal parameter of a module function.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgSpec {
    /// Declared type. `Void` for private arguments.
    pub ty: Type,
    /// Set when the argument is compiler-supplied.
    pub priv_kind: Option<PrivKind>,
    /// Legal enumerated values. Non-empty only when `ty == Enum`.
    pub enum_values: Vec<String>,
    /// Caller-visible parameter name, when the parameter may be named.
    pub name: Option<String>,
    /// Default-value literal, when the parameter may be omitted.
    pub default: Option<String>,
}

impl ArgSpec {
    fn private(kind: PrivKind) -> Self {
        Self {
            ty: Type::Void,
            priv_kind: Some(kind),
            enum_values: Vec::new(),
            name: None,
            default: None,
        }
    }
}

/// A decoded module-function signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    /// Return type.
    pub ret: Type,
    /// The C function to call.
    pub cfunc: String,
    pub args: Vec<ArgSpec>,
}

/// A malformed or inconsistent signature blob.
#[derive(Debug, Clone, PartialEq)]
pub enum SignatureError {
    /// A type field did not name a known type.
    UnknownType(String),
    /// The blob ended inside a field.
    Truncated,
    /// An enumeration value list was attached to a non-ENUM parameter.
    EnumOnNonEnum(String),
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType(name) => write!(f, "unknown type in signature: {name:?}"),
            Self::Truncated => write!(f, "truncated signature blob"),
            Self::EnumOnNonEnum(ty) => {
                write!(f, "enumeration values on non-ENUM parameter of type {ty}")
            }
        }
    }
}

impl std::error::Error for SignatureError {}

/// Byte cursor over the packed blob.
struct Fields<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Fields<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// The byte at the cursor, without consuming it.
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    /// Read one nul-terminated field and step past its terminator.
    fn field(&mut self) -> Result<&'a str, SignatureError> {
        let start = self.pos;
        while let Some(&b) = self.bytes.get(self.pos) {
            if b == 0 {
                let s = std::str::from_utf8(&self.bytes[start..self.pos])
                    .map_err(|_| SignatureError::Truncated)?;
                self.pos += 1;
                return Ok(s);
            }
            self.pos += 1;
        }
        Err(SignatureError::Truncated)
    }
}

/// Decode a packed signature blob into its typed form.
pub fn decode_signature(blob: &[u8]) -> Result<Signature, SignatureError> {
    let mut f = Fields::new(blob);

    let ret_name = f.field()?;
    let ret = Type::from_name(ret_name)
        .ok_or_else(|| SignatureError::UnknownType(ret_name.to_string()))?;
    let cfunc = f.field()?.to_string();

    let mut args = Vec::new();
    while !f.at_end() {
        let head = f.field()?;
        if let Some(kind) = PrivKind::from_marker(head) {
            args.push(ArgSpec::private(kind));
            continue;
        }
        let ty =
            Type::from_name(head).ok_or_else(|| SignatureError::UnknownType(head.to_string()))?;

        let mut enum_values = Vec::new();
        if f.peek() == Some(1) {
            f.bump();
            while f.peek() != Some(1) {
                if f.at_end() {
                    return Err(SignatureError::Truncated);
                }
                enum_values.push(f.field()?.to_string());
            }
            f.bump(); // closing 0x01
            if f.peek() != Some(0) {
                return Err(SignatureError::Truncated);
            }
            f.bump();
            if ty != Type::Enum {
                return Err(SignatureError::EnumOnNonEnum(ty.name().to_string()));
            }
        }

        let mut name = None;
        if f.peek() == Some(2) {
            f.bump();
            name = Some(f.field()?.to_string());
        }

        let mut default = None;
        if f.peek() == Some(3) {
            f.bump();
            default = Some(f.field()?.to_string());
        }

        args.push(ArgSpec {
            ty,
            priv_kind: None,
            enum_values,
            name,
            default,
        });
    }

    Ok(Signature { ret, cfunc, args })
}
