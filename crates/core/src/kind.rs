//! Structural kinds and value types

use std::fmt;

/// Which of the three structural variants a wrapper is.
///
/// Raw tag `0` is never a kind: handle headers use it to mean "no value".
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuralKind {
    /// Mutable tree of shared nodes
    Builder = 1,
    /// Finalized, immutable byte encoding
    Buffer = 2,
    /// Copy-on-write value holding either a tree or an encoding
    Hybrid = 3,
}

impl StructuralKind {
    /// All kinds, in tag order
    pub const ALL: [StructuralKind; 3] = [
        StructuralKind::Builder,
        StructuralKind::Buffer,
        StructuralKind::Hybrid,
    ];

    /// Decode a raw header tag
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(StructuralKind::Builder),
            2 => Some(StructuralKind::Buffer),
            3 => Some(StructuralKind::Hybrid),
            _ => None,
        }
    }

    /// Raw header tag
    #[inline(always)]
    pub fn as_raw(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for StructuralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuralKind::Builder => write!(f, "builder"),
            StructuralKind::Buffer => write!(f, "buffer"),
            StructuralKind::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// The JSON-like type of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueType {
    Null,
    Boolean,
    Integer,
    Decimal,
    String,
    Array,
    Object,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Null => "null",
            ValueType::Boolean => "boolean",
            ValueType::Integer => "integer",
            ValueType::Decimal => "decimal",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Object => "object",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_roundtrip() {
        for kind in StructuralKind::ALL {
            assert_eq!(StructuralKind::from_raw(kind.as_raw()), Some(kind));
        }
        assert_eq!(StructuralKind::from_raw(0), None);
        assert_eq!(StructuralKind::from_raw(4), None);
    }
}
