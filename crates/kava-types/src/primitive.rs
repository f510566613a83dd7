//! Primitive type table
//!
//! Primitive types carry a total order index. Casting and operator legality
//! depend only on the pair of indices:
//!
//! ```text
//! boolean(0) < char(1) < byte(2) < short(3) < int(4) < long(5) < float(6) < double(7)
//! string(8), void(9)   -- outside the numeric order, handled specially
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// A primitive type of the Java subset understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    /// `boolean`
    Boolean,
    /// `char` (UTF-16 code unit)
    Char,
    /// `byte` (8-bit signed)
    Byte,
    /// `short` (16-bit signed)
    Short,
    /// `int` (32-bit signed)
    Int,
    /// `long` (64-bit signed)
    Long,
    /// `float` (IEEE 754 single)
    Float,
    /// `double` (IEEE 754 double)
    Double,
    /// `String`, treated as a primitive by the coercion engine
    String,
    /// `void`
    Void,
}

impl PrimitiveType {
    /// Every primitive type, ordered by index
    pub const ALL: [PrimitiveType; 10] = [
        PrimitiveType::Boolean,
        PrimitiveType::Char,
        PrimitiveType::Byte,
        PrimitiveType::Short,
        PrimitiveType::Int,
        PrimitiveType::Long,
        PrimitiveType::Float,
        PrimitiveType::Double,
        PrimitiveType::String,
        PrimitiveType::Void,
    ];

    /// Order index used for widening comparisons
    #[inline]
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Look a primitive type up by its order index
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Source-level name
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Char => "char",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::String => "String",
            PrimitiveType::Void => "void",
        }
    }

    /// Parse a source-level primitive name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "boolean" => Some(PrimitiveType::Boolean),
            "char" => Some(PrimitiveType::Char),
            "byte" => Some(PrimitiveType::Byte),
            "short" => Some(PrimitiveType::Short),
            "int" => Some(PrimitiveType::Int),
            "long" => Some(PrimitiveType::Long),
            "float" => Some(PrimitiveType::Float),
            "double" => Some(PrimitiveType::Double),
            "String" | "string" => Some(PrimitiveType::String),
            "void" => Some(PrimitiveType::Void),
            _ => None,
        }
    }

    /// Numeric in the arithmetic sense: `char` through `double`
    #[inline]
    pub fn is_arithmetic(self) -> bool {
        (1..=7).contains(&self.index())
    }

    /// Numeric in the cast sense: `byte` through `double`
    #[inline]
    pub fn is_numeric(self) -> bool {
        (2..=7).contains(&self.index())
    }

    /// `char`, `byte`, `short`, `int` or `long`
    #[inline]
    pub fn is_integral(self) -> bool {
        (1..=5).contains(&self.index())
    }

    /// `float` or `double`
    #[inline]
    pub fn is_floating(self) -> bool {
        matches!(self, PrimitiveType::Float | PrimitiveType::Double)
    }

    /// Wrapper class for this primitive, if any
    pub fn boxed(self) -> Option<BoxedType> {
        BoxedType::ALL.iter().copied().find(|b| b.unboxed() == self)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Boxed wrapper class of a primitive type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoxedType {
    /// `java.lang.Boolean`
    Boolean,
    /// `java.lang.Character`
    Character,
    /// `java.lang.Byte`
    Byte,
    /// `java.lang.Short`
    Short,
    /// `java.lang.Integer`
    Integer,
    /// `java.lang.Long`
    Long,
    /// `java.lang.Float`
    Float,
    /// `java.lang.Double`
    Double,
}

impl BoxedType {
    /// Every wrapper class
    pub const ALL: [BoxedType; 8] = [
        BoxedType::Boolean,
        BoxedType::Character,
        BoxedType::Byte,
        BoxedType::Short,
        BoxedType::Integer,
        BoxedType::Long,
        BoxedType::Float,
        BoxedType::Double,
    ];

    /// Primitive type this wrapper unboxes to
    pub fn unboxed(self) -> PrimitiveType {
        match self {
            BoxedType::Boolean => PrimitiveType::Boolean,
            BoxedType::Character => PrimitiveType::Char,
            BoxedType::Byte => PrimitiveType::Byte,
            BoxedType::Short => PrimitiveType::Short,
            BoxedType::Integer => PrimitiveType::Int,
            BoxedType::Long => PrimitiveType::Long,
            BoxedType::Float => PrimitiveType::Float,
            BoxedType::Double => PrimitiveType::Double,
        }
    }

    /// Simple class identifier
    pub fn identifier(self) -> &'static str {
        match self {
            BoxedType::Boolean => "Boolean",
            BoxedType::Character => "Character",
            BoxedType::Byte => "Byte",
            BoxedType::Short => "Short",
            BoxedType::Integer => "Integer",
            BoxedType::Long => "Long",
            BoxedType::Float => "Float",
            BoxedType::Double => "Double",
        }
    }

    /// Look a wrapper up by simple or `java.lang.` qualified identifier
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        let simple = identifier.strip_prefix("java.lang.").unwrap_or(identifier);
        Self::ALL.iter().copied().find(|b| b.identifier() == simple)
    }
}

impl fmt::Display for BoxedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}
