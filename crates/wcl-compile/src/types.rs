//! The WCL value-type registry.
//!
//! Types are a closed sum; the string family keeps its lowering targets as
//! separate constructors (`Strings` for an unjoined catenation, `String`
//! for a joined value, `StringList` and `Strands` for the two runtime ABIs
//! used at the emission boundary). Per-type metadata lives here: display
//! name, multiplication partner, and the explicit to-string call shape.

use std::fmt;

/// A WCL value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// No value. Sentinel for private arguments and void functions.
    Void,
    Bool,
    Int,
    Real,
    /// Absolute wall-clock time.
    Time,
    /// Relative time in seconds.
    Duration,
    Bytes,
    /// A single joined string value.
    String,
    /// An ordered catenation of string pieces not yet joined.
    Strings,
    /// Variadic string-list ABI (terminated by `wrt_strings_end`).
    StringList,
    /// Strands record ABI (aggregate plus pointer array).
    Strands,
    Ip,
    /// An HTTP header reference; folds to `Strings` outside header context.
    Header,
    Acl,
    Backend,
    Probe,
    /// A named subroutine.
    Sub,
    /// Opaque binary value; only usable as a module-function argument.
    Blob,
    /// Enumerated module-function argument.
    Enum,
}

impl Type {
    /// The type's own display name.
    pub fn name(self) -> &'static str {
        match self {
            Type::Void => "VOID",
            Type::Bool => "BOOL",
            Type::Int => "INT",
            Type::Real => "REAL",
            Type::Time => "TIME",
            Type::Duration => "DURATION",
            Type::Bytes => "BYTES",
            Type::String => "STRING",
            Type::Strings => "STRINGS",
            Type::StringList => "STRING_LIST",
            Type::Strands => "STRANDS",
            Type::Ip => "IP",
            Type::Header => "HEADER",
            Type::Acl => "ACL",
            Type::Backend => "BACKEND",
            Type::Probe => "PROBE",
            Type::Sub => "SUB",
            Type::Blob => "BLOB",
            Type::Enum => "ENUM",
        }
    }

    /// The name shown to users in diagnostics. The internal string forms
    /// all present as `STRING`.
    pub fn user_name(self) -> &'static str {
        match self {
            Type::Strings | Type::StringList => "STRING",
            other => other.name(),
        }
    }

    /// Look a type up by its declared name, as used in decoded module
    /// signatures.
    pub fn from_name(name: &str) -> Option<Type> {
        Some(match name {
            "VOID" => Type::Void,
            "BOOL" => Type::Bool,
            "INT" => Type::Int,
            "REAL" => Type::Real,
            "TIME" => Type::Time,
            "DURATION" => Type::Duration,
            "BYTES" => Type::Bytes,
            "STRING" => Type::String,
            "STRINGS" => Type::Strings,
            "STRING_LIST" => Type::StringList,
            "STRANDS" => Type::Strands,
            "IP" => Type::Ip,
            "HEADER" => Type::Header,
            "ACL" => Type::Acl,
            "BACKEND" => Type::Backend,
            "PROBE" => Type::Probe,
            "SUB" => Type::Sub,
            "BLOB" => Type::Blob,
            "ENUM" => Type::Enum,
            _ => return None,
        })
    }

    /// The multiplication partner: `self * partner` and `self / partner`
    /// are admissible and produce `self`. `None` means the type cannot be
    /// scaled.
    pub fn multype(self) -> Option<Type> {
        match self {
            Type::Int => Some(Type::Int),
            Type::Real => Some(Type::Real),
            Type::Duration => Some(Type::Real),
            Type::Bytes => Some(Type::Real),
            _ => None,
        }
    }

    /// The runtime call prefix that converts a value of this type to a
    /// string; the converted value is spliced after it and a closing `)`
    /// finishes the call. `None` means the type has no string rendition.
    pub fn tostring(self) -> Option<&'static str> {
        match self {
            Type::Bool => Some("WRT_bool_string("),
            Type::Int => Some("WRT_int_string(ctx, "),
            Type::Real => Some("WRT_real_string(ctx, "),
            Type::Time => Some("WRT_time_string(ctx, "),
            Type::Duration => Some("WRT_duration_string(ctx, "),
            Type::Bytes => Some("WRT_bytes_string(ctx, "),
            Type::Ip => Some("WRT_ip_string(ctx, "),
            Type::Backend => Some("WRT_backend_string("),
            Type::Header => Some("WRT_header_get(ctx, "),
            _ => None,
        }
    }

    /// Whether this is one of the string-family types an entry-point caller
    /// may demand.
    pub fn is_string_family(self) -> bool {
        matches!(
            self,
            Type::String | Type::Strings | Type::StringList | Type::Strands
        )
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
