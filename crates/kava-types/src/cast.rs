//! Explicit cast and implicit assignment rules between primitive types
//!
//! The table is total: every `(source, destination)` pair yields either a
//! [`CastKind`] or `None` for an illegal cast.

use crate::primitive::{BoxedType, PrimitiveType};
use serde::{Deserialize, Serialize};

/// Destination (or source) of a cast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastTarget {
    /// A primitive type, `String` included
    Primitive(PrimitiveType),
    /// A boxed wrapper class
    Boxed(BoxedType),
}

impl From<PrimitiveType> for CastTarget {
    fn from(ty: PrimitiveType) -> Self {
        CastTarget::Primitive(ty)
    }
}

impl From<BoxedType> for CastTarget {
    fn from(ty: BoxedType) -> Self {
        CastTarget::Boxed(ty)
    }
}

/// How a legal cast transforms its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastKind {
    /// Same type, no-op
    Identity,
    /// Destination has a larger index; value preserving, no-op at runtime
    Widening,
    /// Destination has a smaller index; modular truncation
    Narrowing,
    /// Format the value as a string
    ToString,
    /// Numeric value converted to the corresponding code point
    ToChar,
    /// Wrap into the given wrapper class
    Boxing(BoxedType),
    /// Unwrap (and possibly widen) into a primitive
    Unboxing,
}

/// Classify the cast `from → to`, or `None` if it is illegal
pub fn cast_kind(from: CastTarget, to: CastTarget) -> Option<CastKind> {
    match (from, to) {
        (CastTarget::Primitive(s), CastTarget::Primitive(d)) => primitive_cast(s, d),
        (CastTarget::Primitive(s), CastTarget::Boxed(b)) => {
            match primitive_cast(s, b.unboxed())? {
                CastKind::Identity | CastKind::Widening => Some(CastKind::Boxing(b)),
                _ => None,
            }
        }
        (CastTarget::Boxed(_), CastTarget::Primitive(PrimitiveType::String)) => {
            Some(CastKind::ToString)
        }
        (CastTarget::Boxed(b), CastTarget::Primitive(d)) => {
            match primitive_cast(b.unboxed(), d)? {
                CastKind::Identity | CastKind::Widening => Some(CastKind::Unboxing),
                _ => None,
            }
        }
        (CastTarget::Boxed(a), CastTarget::Boxed(b)) if a == b => Some(CastKind::Identity),
        (CastTarget::Boxed(_), CastTarget::Boxed(_)) => None,
    }
}

fn primitive_cast(s: PrimitiveType, d: PrimitiveType) -> Option<CastKind> {
    let (i, j) = (s.index(), d.index());
    if i == j {
        return Some(CastKind::Identity);
    }
    if s == PrimitiveType::Void || d == PrimitiveType::Void {
        return None;
    }
    if d == PrimitiveType::String {
        return Some(CastKind::ToString);
    }
    if s == PrimitiveType::Boolean || d == PrimitiveType::Boolean || s == PrimitiveType::String {
        return None;
    }
    if d == PrimitiveType::Char {
        return Some(CastKind::ToChar);
    }
    // char behaves like an unsigned 16-bit integer: it widens into int and
    // above and narrows into byte and short
    if s == PrimitiveType::Char {
        return Some(if j >= PrimitiveType::Int.index() {
            CastKind::Widening
        } else {
            CastKind::Narrowing
        });
    }
    if j > i {
        Some(CastKind::Widening)
    } else {
        Some(CastKind::Narrowing)
    }
}

/// Implicit assignment conversion: identity or value-preserving widening only
pub fn is_assignable(from: PrimitiveType, to: PrimitiveType) -> bool {
    if from == PrimitiveType::Char && (to == PrimitiveType::Byte || to == PrimitiveType::Short) {
        return false;
    }
    matches!(
        primitive_cast(from, to),
        Some(CastKind::Identity) | Some(CastKind::Widening)
    )
}
