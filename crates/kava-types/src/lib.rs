//! Kava Type Model
//!
//! Static type information consumed by the Kava execution engine:
//! - Primitive type table with widening, casting and operator rules
//! - Primitive runtime values and their Java-compatible conversions
//! - Class/interface type graph with inheritance, visibility and
//!   method/field lookup
//!
//! Everything here is pure data plus pure functions; no runtime state.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cast;
pub mod error;
pub mod graph;
pub mod operator;
pub mod primitive;
pub mod value;

pub use cast::{cast_kind, is_assignable, CastKind, CastTarget};
pub use error::TypeError;
pub use graph::{
    ClassDeclaration, Field, FieldId, Method, MethodId, NonPrimitiveType, Parameter,
    SubstitutedType, TypeGraph, TypeId, TypeKind, TypeRef, Visibility,
};
pub use operator::{
    resolve_binary, resolve_unary, BinaryOperator, OperandType, OperatorClass,
    OperatorResolution, UnaryOperator,
};
pub use primitive::{BoxedType, PrimitiveType};
pub use value::{evaluate_binary, evaluate_unary, ArithmeticFault, BoxedValue, PrimitiveValue};
