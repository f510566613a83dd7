//! Binary and unary operator type resolution
//!
//! Resolution is pure and total: every `(operator, left, right)` triple maps to
//! exactly one [`OperatorResolution`], either a result type or `Illegal`.
//! Boxed operands are unboxed first; any other reference operand only takes
//! part in string concatenation.

use crate::primitive::{BoxedType, PrimitiveType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Static type of an operand
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandType {
    /// Primitive value (`String` included)
    Primitive(PrimitiveType),
    /// Boxed wrapper, unboxed before the primitive rules apply
    Boxed(BoxedType),
    /// Any other class or interface instance, by identifier
    Reference(String),
}

impl OperandType {
    /// Primitive type after unboxing, if the operand has one
    pub fn unboxed(&self) -> Option<PrimitiveType> {
        match self {
            OperandType::Primitive(p) => Some(*p),
            OperandType::Boxed(b) => Some(b.unboxed()),
            OperandType::Reference(_) => None,
        }
    }

    fn is_string(&self) -> bool {
        matches!(self, OperandType::Primitive(PrimitiveType::String))
    }
}

impl From<PrimitiveType> for OperandType {
    fn from(ty: PrimitiveType) -> Self {
        OperandType::Primitive(ty)
    }
}

impl From<BoxedType> for OperandType {
    fn from(ty: BoxedType) -> Self {
        OperandType::Boxed(ty)
    }
}

/// Broad operator families sharing one resolution rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorClass {
    /// `+ - * / %`
    Arithmetic,
    /// `< > <= >=`
    Relational,
    /// `== !=`
    Equality,
    /// `<< >> >>>`
    Shift,
    /// `& | ^`
    Bitwise,
    /// `&& ||`
    Logical,
    /// `+= -= *= /= %=`
    CompoundAssignment,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Modulo,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `<=`
    LessEqual,
    /// `>=`
    GreaterEqual,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<<`
    ShiftLeft,
    /// `>>`
    ShiftRight,
    /// `>>>`
    UnsignedShiftRight,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `+=`
    PlusAssign,
    /// `-=`
    MinusAssign,
    /// `*=`
    MultiplyAssign,
    /// `/=`
    DivideAssign,
    /// `%=`
    ModuloAssign,
}

impl BinaryOperator {
    /// Every binary operator
    pub const ALL: [BinaryOperator; 24] = [
        BinaryOperator::Plus,
        BinaryOperator::Minus,
        BinaryOperator::Multiply,
        BinaryOperator::Divide,
        BinaryOperator::Modulo,
        BinaryOperator::Less,
        BinaryOperator::Greater,
        BinaryOperator::LessEqual,
        BinaryOperator::GreaterEqual,
        BinaryOperator::Equal,
        BinaryOperator::NotEqual,
        BinaryOperator::ShiftLeft,
        BinaryOperator::ShiftRight,
        BinaryOperator::UnsignedShiftRight,
        BinaryOperator::BitAnd,
        BinaryOperator::BitOr,
        BinaryOperator::BitXor,
        BinaryOperator::And,
        BinaryOperator::Or,
        BinaryOperator::PlusAssign,
        BinaryOperator::MinusAssign,
        BinaryOperator::MultiplyAssign,
        BinaryOperator::DivideAssign,
        BinaryOperator::ModuloAssign,
    ];

    /// Resolution family of this operator
    pub fn class(self) -> OperatorClass {
        use BinaryOperator::*;
        match self {
            Plus | Minus | Multiply | Divide | Modulo => OperatorClass::Arithmetic,
            Less | Greater | LessEqual | GreaterEqual => OperatorClass::Relational,
            Equal | NotEqual => OperatorClass::Equality,
            ShiftLeft | ShiftRight | UnsignedShiftRight => OperatorClass::Shift,
            BitAnd | BitOr | BitXor => OperatorClass::Bitwise,
            And | Or => OperatorClass::Logical,
            PlusAssign | MinusAssign | MultiplyAssign | DivideAssign | ModuloAssign => {
                OperatorClass::CompoundAssignment
            }
        }
    }

    /// Plain operator a compound assignment delegates to
    pub fn plain(self) -> BinaryOperator {
        match self {
            BinaryOperator::PlusAssign => BinaryOperator::Plus,
            BinaryOperator::MinusAssign => BinaryOperator::Minus,
            BinaryOperator::MultiplyAssign => BinaryOperator::Multiply,
            BinaryOperator::DivideAssign => BinaryOperator::Divide,
            BinaryOperator::ModuloAssign => BinaryOperator::Modulo,
            other => other,
        }
    }

    /// Source-level token
    pub fn symbol(self) -> &'static str {
        use BinaryOperator::*;
        match self {
            Plus => "+",
            Minus => "-",
            Multiply => "*",
            Divide => "/",
            Modulo => "%",
            Less => "<",
            Greater => ">",
            LessEqual => "<=",
            GreaterEqual => ">=",
            Equal => "==",
            NotEqual => "!=",
            ShiftLeft => "<<",
            ShiftRight => ">>",
            UnsignedShiftRight => ">>>",
            BitAnd => "&",
            BitOr => "|",
            BitXor => "^",
            And => "&&",
            Or => "||",
            PlusAssign => "+=",
            MinusAssign => "-=",
            MultiplyAssign => "*=",
            DivideAssign => "/=",
            ModuloAssign => "%=",
        }
    }

    /// Parse a source-level token
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.symbol() == symbol)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// `-x`
    Negate,
    /// `+x`
    Plus,
    /// `!x`
    Not,
    /// `~x`
    BitNot,
    /// `++x` / `x++`
    Increment,
    /// `--x` / `x--`
    Decrement,
}

impl UnaryOperator {
    /// Every unary operator
    pub const ALL: [UnaryOperator; 6] = [
        UnaryOperator::Negate,
        UnaryOperator::Plus,
        UnaryOperator::Not,
        UnaryOperator::BitNot,
        UnaryOperator::Increment,
        UnaryOperator::Decrement,
    ];
}

/// Outcome of operator resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorResolution {
    /// The operator applies; the expression has this type
    Legal(PrimitiveType),
    /// The operand combination is rejected
    Illegal,
}

impl OperatorResolution {
    /// Result type of a legal resolution
    pub fn result(self) -> Option<PrimitiveType> {
        match self {
            OperatorResolution::Legal(ty) => Some(ty),
            OperatorResolution::Illegal => None,
        }
    }

    /// Whether the operator applies
    pub fn is_legal(self) -> bool {
        matches!(self, OperatorResolution::Legal(_))
    }
}

/// Resolve the type of `left op right`
pub fn resolve_binary(
    op: BinaryOperator,
    left: &OperandType,
    right: &OperandType,
) -> OperatorResolution {
    use OperatorResolution::{Illegal, Legal};

    if op == BinaryOperator::Plus && (left.is_string() || right.is_string()) {
        return Legal(PrimitiveType::String);
    }

    let (a, b) = match (left.unboxed(), right.unboxed()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Illegal,
    };

    match op.class() {
        OperatorClass::Arithmetic => {
            if a.is_arithmetic() && b.is_arithmetic() {
                Legal(a.max(b))
            } else {
                Illegal
            }
        }
        OperatorClass::Relational => {
            if a.is_arithmetic() && b.is_arithmetic() {
                Legal(PrimitiveType::Boolean)
            } else {
                Illegal
            }
        }
        OperatorClass::Equality => {
            let both_numeric = a.is_arithmetic() && b.is_arithmetic();
            let both_boolean = a == PrimitiveType::Boolean && b == PrimitiveType::Boolean;
            if both_numeric || both_boolean {
                Legal(PrimitiveType::Boolean)
            } else {
                Illegal
            }
        }
        OperatorClass::Shift => {
            if a.is_integral() && b.is_integral() {
                Legal(a)
            } else {
                Illegal
            }
        }
        OperatorClass::Bitwise => {
            if a.is_integral() && b.is_integral() {
                Legal(a.max(b))
            } else if a == PrimitiveType::Boolean && b == PrimitiveType::Boolean {
                Legal(PrimitiveType::Boolean)
            } else {
                Illegal
            }
        }
        OperatorClass::Logical => {
            if a == PrimitiveType::Boolean && b == PrimitiveType::Boolean {
                Legal(PrimitiveType::Boolean)
            } else {
                Illegal
            }
        }
        OperatorClass::CompoundAssignment => {
            if a.index() < PrimitiveType::Byte.index() || a == PrimitiveType::Void {
                return Illegal;
            }
            match resolve_binary(op.plain(), left, right) {
                Legal(PrimitiveType::String) if a != PrimitiveType::String => Illegal,
                Legal(_) => Legal(a),
                Illegal => Illegal,
            }
        }
    }
}

/// Resolve the type of a unary expression
///
/// `- + ~` apply unary numeric promotion (`byte`, `short`, `char` become
/// `int`); `++ --` keep the operand type.
pub fn resolve_unary(op: UnaryOperator, operand: &OperandType) -> OperatorResolution {
    use OperatorResolution::{Illegal, Legal};

    let ty = match operand.unboxed() {
        Some(ty) => ty,
        None => return Illegal,
    };

    let promoted = if ty.index() < PrimitiveType::Int.index() {
        PrimitiveType::Int
    } else {
        ty
    };

    match op {
        UnaryOperator::Negate | UnaryOperator::Plus if ty.is_arithmetic() => Legal(promoted),
        UnaryOperator::BitNot if ty.is_integral() => Legal(promoted),
        UnaryOperator::Not if ty == PrimitiveType::Boolean => Legal(PrimitiveType::Boolean),
        UnaryOperator::Increment | UnaryOperator::Decrement if ty.is_arithmetic() => Legal(ty),
        _ => Illegal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PrimitiveType::*;

    fn bin(op: BinaryOperator, a: PrimitiveType, b: PrimitiveType) -> OperatorResolution {
        resolve_binary(op, &a.into(), &b.into())
    }

    #[test]
    fn test_arithmetic_promotion() {
        assert_eq!(bin(BinaryOperator::Plus, Int, Double), OperatorResolution::Legal(Double));
        assert_eq!(bin(BinaryOperator::Minus, Byte, Short), OperatorResolution::Legal(Short));
        assert_eq!(bin(BinaryOperator::Multiply, Char, Int), OperatorResolution::Legal(Int));
        assert_eq!(bin(BinaryOperator::Modulo, Boolean, Int), OperatorResolution::Illegal);
        assert_eq!(bin(BinaryOperator::Minus, String, Int), OperatorResolution::Illegal);
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(bin(BinaryOperator::Plus, String, Int), OperatorResolution::Legal(String));
        assert_eq!(bin(BinaryOperator::Plus, Boolean, String), OperatorResolution::Legal(String));
        let object = OperandType::Reference("Point".to_string());
        assert_eq!(
            resolve_binary(BinaryOperator::Plus, &object, &String.into()),
            OperatorResolution::Legal(String)
        );
        assert_eq!(
            resolve_binary(BinaryOperator::Plus, &object, &Int.into()),
            OperatorResolution::Illegal
        );
    }

    #[test]
    fn test_relational_and_equality() {
        assert_eq!(bin(BinaryOperator::Less, Char, Long), OperatorResolution::Legal(Boolean));
        assert_eq!(bin(BinaryOperator::NotEqual, Float, Int), OperatorResolution::Legal(Boolean));
        assert_eq!(bin(BinaryOperator::Less, Boolean, Boolean), OperatorResolution::Illegal);
        assert_eq!(bin(BinaryOperator::Equal, Boolean, Boolean), OperatorResolution::Legal(Boolean));
    }

    #[test]
    fn test_shift_keeps_left_type() {
        assert_eq!(bin(BinaryOperator::ShiftLeft, Byte, Long), OperatorResolution::Legal(Byte));
        assert_eq!(
            bin(BinaryOperator::UnsignedShiftRight, Long, Int),
            OperatorResolution::Legal(Long)
        );
        assert_eq!(bin(BinaryOperator::ShiftRight, Float, Int), OperatorResolution::Illegal);
    }

    #[test]
    fn test_compound_assignment() {
        assert_eq!(bin(BinaryOperator::PlusAssign, Int, Double), OperatorResolution::Legal(Int));
        assert_eq!(bin(BinaryOperator::PlusAssign, Char, Int), OperatorResolution::Illegal);
        assert_eq!(bin(BinaryOperator::PlusAssign, Boolean, Boolean), OperatorResolution::Illegal);
        assert_eq!(bin(BinaryOperator::PlusAssign, String, Int), OperatorResolution::Legal(String));
        assert_eq!(bin(BinaryOperator::PlusAssign, Int, String), OperatorResolution::Illegal);
        assert_eq!(bin(BinaryOperator::MinusAssign, String, Int), OperatorResolution::Illegal);
    }

    #[test]
    fn test_boxed_operands_unbox() {
        let integer = OperandType::Boxed(BoxedType::Integer);
        let long = OperandType::Boxed(BoxedType::Long);
        assert_eq!(
            resolve_binary(BinaryOperator::Plus, &integer, &long),
            OperatorResolution::Legal(Long)
        );
        let boolean = OperandType::Boxed(BoxedType::Boolean);
        assert_eq!(
            resolve_binary(BinaryOperator::Plus, &integer, &boolean),
            OperatorResolution::Illegal
        );
        let list = OperandType::Reference("ArrayList".to_string());
        assert_eq!(
            resolve_binary(BinaryOperator::Minus, &integer, &list),
            OperatorResolution::Illegal
        );
    }

    #[test]
    fn test_unary() {
        assert_eq!(
            resolve_unary(UnaryOperator::Negate, &Byte.into()),
            OperatorResolution::Legal(Int)
        );
        assert_eq!(
            resolve_unary(UnaryOperator::Increment, &Byte.into()),
            OperatorResolution::Legal(Byte)
        );
        assert_eq!(
            resolve_unary(UnaryOperator::Not, &Boolean.into()),
            OperatorResolution::Legal(Boolean)
        );
        assert_eq!(resolve_unary(UnaryOperator::BitNot, &Double.into()), OperatorResolution::Illegal);
        assert_eq!(resolve_unary(UnaryOperator::Negate, &String.into()), OperatorResolution::Illegal);
    }

    #[test]
    fn test_symbols_round_trip() {
        for op in BinaryOperator::ALL {
            assert_eq!(BinaryOperator::from_symbol(op.symbol()), Some(op));
        }
    }
}
