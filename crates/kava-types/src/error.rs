//! Type model errors

use thiserror::Error;

/// Errors raised while building or querying the type model
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TypeError {
    /// Reference to a type that was never declared
    #[error("Undefined type: {name}")]
    UndefinedType {
        /// Identifier that was not found
        name: String,
    },

    /// A type with the same identifier already exists
    #[error("Type {name} is already declared")]
    DuplicateType {
        /// Identifier declared twice
        name: String,
    },

    /// Registering the link would make a type its own ancestor
    #[error("Circular type reference detected: {cycle}")]
    CircularReference {
        /// Description of the cycle
        cycle: String,
    },

    /// A class may only extend a single class, interfaces only interfaces
    #[error("Invalid supertype: {sub} cannot extend {sup}")]
    InvalidSupertype {
        /// Declaring type
        sub: String,
        /// Rejected supertype
        sup: String,
    },

    /// Cast that the primitive table rejects
    #[error("Cannot cast from {from} to {to}")]
    IllegalCast {
        /// Source type
        from: String,
        /// Destination type
        to: String,
    },

    /// Generic instantiation with the wrong number of type arguments
    #[error("Invalid type argument count for {name}: expected {expected}, got {actual}")]
    InvalidTypeArgCount {
        /// Generic type
        name: String,
        /// Declared type parameter count
        expected: usize,
        /// Supplied argument count
        actual: usize,
    },

    /// Malformed textual type name
    #[error("Cannot parse type name: {text}")]
    InvalidTypeName {
        /// Offending text
        text: String,
    },
}
