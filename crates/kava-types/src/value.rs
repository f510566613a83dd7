//! Primitive runtime values and Java-compatible conversions
//!
//! Casting applies the rules of [`crate::cast`] to a concrete value;
//! evaluation computes binary and unary operators in the type chosen by
//! [`crate::operator`].

use crate::cast::{cast_kind, CastKind, CastTarget};
use crate::error::TypeError;
use crate::operator::{
    resolve_binary, resolve_unary, BinaryOperator, OperandType, OperatorClass,
    OperatorResolution, UnaryOperator,
};
use crate::primitive::{BoxedType, PrimitiveType};
use std::fmt;
use std::sync::Arc;

/// A value of a primitive type
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    /// `boolean`
    Boolean(bool),
    /// `char` as a UTF-16 code unit
    Char(u16),
    /// `byte`
    Byte(i8),
    /// `short`
    Short(i16),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// `String`
    String(Arc<str>),
}

/// A boxed wrapper instance produced by a cast
#[derive(Debug, Clone, PartialEq)]
pub struct BoxedValue {
    /// Wrapper class
    pub wrapper: BoxedType,
    /// Wrapped value, already converted to the wrapper's primitive type
    pub value: PrimitiveValue,
}

/// Runtime failure while evaluating an operator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArithmeticFault {
    /// Integer division or remainder by zero
    #[error("/ by zero")]
    DivisionByZero,

    /// Operator applied to operands it does not resolve for
    #[error("Operator {op} cannot be applied to {left} and {right}")]
    IllegalOperands {
        /// Operator token
        op: String,
        /// Left operand type
        left: String,
        /// Right operand type
        right: String,
    },
}

impl PrimitiveValue {
    /// Convenience constructor for strings
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        PrimitiveValue::String(s.into())
    }

    /// Static type of this value
    pub fn ty(&self) -> PrimitiveType {
        match self {
            PrimitiveValue::Boolean(_) => PrimitiveType::Boolean,
            PrimitiveValue::Char(_) => PrimitiveType::Char,
            PrimitiveValue::Byte(_) => PrimitiveType::Byte,
            PrimitiveValue::Short(_) => PrimitiveType::Short,
            PrimitiveValue::Int(_) => PrimitiveType::Int,
            PrimitiveValue::Long(_) => PrimitiveType::Long,
            PrimitiveValue::Float(_) => PrimitiveType::Float,
            PrimitiveValue::Double(_) => PrimitiveType::Double,
            PrimitiveValue::String(_) => PrimitiveType::String,
        }
    }

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PrimitiveValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral payload widened to `i64` (`char` as its code unit)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PrimitiveValue::Char(c) => Some(*c as i64),
            PrimitiveValue::Byte(v) => Some(*v as i64),
            PrimitiveValue::Short(v) => Some(*v as i64),
            PrimitiveValue::Int(v) => Some(*v as i64),
            PrimitiveValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric payload widened to `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PrimitiveValue::Float(v) => Some(*v as f64),
            PrimitiveValue::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Numeric payload converted to `float`, rounding integral values once
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            PrimitiveValue::Float(v) => Some(*v),
            PrimitiveValue::Double(v) => Some(*v as f32),
            other => other.as_i64().map(|v| v as f32),
        }
    }

    /// String payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PrimitiveValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Format the value the way `String.valueOf` does
    pub fn to_java_string(&self) -> String {
        match self {
            PrimitiveValue::Boolean(b) => b.to_string(),
            PrimitiveValue::Char(c) => char::from_u32(*c as u32)
                .unwrap_or(char::REPLACEMENT_CHARACTER)
                .to_string(),
            PrimitiveValue::Byte(v) => v.to_string(),
            PrimitiveValue::Short(v) => v.to_string(),
            PrimitiveValue::Int(v) => v.to_string(),
            PrimitiveValue::Long(v) => v.to_string(),
            PrimitiveValue::Float(v) => format_floating(*v as f64, v.to_string()),
            PrimitiveValue::Double(v) => format_floating(*v, v.to_string()),
            PrimitiveValue::String(s) => s.to_string(),
        }
    }

    /// Explicit cast to a primitive type
    pub fn cast(&self, to: PrimitiveType) -> Result<PrimitiveValue, TypeError> {
        let kind = cast_kind(self.ty().into(), to.into()).ok_or_else(|| TypeError::IllegalCast {
            from: self.ty().to_string(),
            to: to.to_string(),
        })?;

        Ok(match kind {
            CastKind::Identity => self.clone(),
            CastKind::ToString => PrimitiveValue::string(self.to_java_string()),
            CastKind::ToChar => PrimitiveValue::Char(self.truncated_integral() as u16),
            // boxing kinds never arise between two primitives
            _ => self.convert_numeric(to),
        })
    }

    /// Cast into a boxed wrapper; legal only along widening
    pub fn box_into(&self, wrapper: BoxedType) -> Result<BoxedValue, TypeError> {
        match cast_kind(self.ty().into(), CastTarget::Boxed(wrapper)) {
            Some(CastKind::Boxing(_)) => Ok(BoxedValue {
                wrapper,
                value: self.convert_numeric_or_same(wrapper.unboxed()),
            }),
            _ => Err(TypeError::IllegalCast {
                from: self.ty().to_string(),
                to: wrapper.to_string(),
            }),
        }
    }

    fn convert_numeric_or_same(&self, to: PrimitiveType) -> PrimitiveValue {
        if self.ty() == to {
            self.clone()
        } else {
            self.convert_numeric(to)
        }
    }

    // Integral value the way Java narrows: floating values go through
    // saturating truncation toward zero first (NaN becomes 0)
    fn truncated_integral(&self) -> i64 {
        match self {
            PrimitiveValue::Float(v) => *v as i32 as i64,
            PrimitiveValue::Double(v) => *v as i32 as i64,
            other => other.as_i64().unwrap_or(0),
        }
    }

    fn convert_numeric(&self, to: PrimitiveType) -> PrimitiveValue {
        match to {
            PrimitiveType::Char => PrimitiveValue::Char(self.truncated_integral() as u16),
            PrimitiveType::Byte => PrimitiveValue::Byte(self.truncated_integral() as i8),
            PrimitiveType::Short => PrimitiveValue::Short(self.truncated_integral() as i16),
            PrimitiveType::Int => PrimitiveValue::Int(match self {
                PrimitiveValue::Float(v) => *v as i32,
                PrimitiveValue::Double(v) => *v as i32,
                other => other.as_i64().unwrap_or(0) as i32,
            }),
            PrimitiveType::Long => PrimitiveValue::Long(match self {
                PrimitiveValue::Float(v) => *v as i64,
                PrimitiveValue::Double(v) => *v as i64,
                other => other.as_i64().unwrap_or(0),
            }),
            PrimitiveType::Float => PrimitiveValue::Float(match self {
                PrimitiveValue::Long(v) => *v as f32,
                other => other.as_f64().unwrap_or(0.0) as f32,
            }),
            PrimitiveType::Double => PrimitiveValue::Double(self.as_f64().unwrap_or(0.0)),
            PrimitiveType::Boolean | PrimitiveType::String | PrimitiveType::Void => self.clone(),
        }
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_java_string())
    }
}

fn format_floating(v: f64, shortest: String) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = v.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        if shortest.contains('.') {
            shortest
        } else {
            format!("{}.0", shortest)
        }
    } else {
        // Java uses computerized scientific notation outside [1e-3, 1e7)
        let sci = format!("{:e}", shortest.parse::<f64>().unwrap_or(v));
        match sci.split_once('e') {
            Some((mantissa, exponent)) if mantissa.contains('.') => {
                format!("{}E{}", mantissa, exponent)
            }
            Some((mantissa, exponent)) => format!("{}.0E{}", mantissa, exponent),
            None => sci,
        }
    }
}

/// Evaluate `left op right` with Java semantics
pub fn evaluate_binary(
    op: BinaryOperator,
    left: &PrimitiveValue,
    right: &PrimitiveValue,
) -> Result<PrimitiveValue, ArithmeticFault> {
    let illegal = || ArithmeticFault::IllegalOperands {
        op: op.symbol().to_string(),
        left: left.ty().to_string(),
        right: right.ty().to_string(),
    };

    let left_ty = OperandType::Primitive(left.ty());
    let right_ty = OperandType::Primitive(right.ty());
    let result_ty = match resolve_binary(op, &left_ty, &right_ty) {
        OperatorResolution::Legal(ty) => ty,
        OperatorResolution::Illegal => return Err(illegal()),
    };

    if op.class() == OperatorClass::CompoundAssignment {
        let value = evaluate_binary(op.plain(), left, right)?;
        return if result_ty == PrimitiveType::String {
            Ok(PrimitiveValue::string(value.to_java_string()))
        } else {
            Ok(value.convert_numeric(result_ty))
        };
    }

    if result_ty == PrimitiveType::String {
        return Ok(PrimitiveValue::string(format!(
            "{}{}",
            left.to_java_string(),
            right.to_java_string()
        )));
    }

    match op.class() {
        OperatorClass::Arithmetic => arithmetic(op, left, right, result_ty),
        OperatorClass::Relational | OperatorClass::Equality => {
            if let (Some(a), Some(b)) = (left.as_bool(), right.as_bool()) {
                let equal = a == b;
                return Ok(PrimitiveValue::Boolean(if op == BinaryOperator::Equal {
                    equal
                } else {
                    !equal
                }));
            }
            let operand_ty = left.ty().max(right.ty());
            let result = if operand_ty == PrimitiveType::Float {
                let (a, b) = (
                    left.as_f32().ok_or_else(illegal)?,
                    right.as_f32().ok_or_else(illegal)?,
                );
                compare(op, a.partial_cmp(&b))
            } else if operand_ty.is_floating() {
                let (a, b) = (
                    left.as_f64().ok_or_else(illegal)?,
                    right.as_f64().ok_or_else(illegal)?,
                );
                compare(op, a.partial_cmp(&b))
            } else {
                let (a, b) = (
                    left.as_i64().ok_or_else(illegal)?,
                    right.as_i64().ok_or_else(illegal)?,
                );
                compare(op, Some(a.cmp(&b)))
            };
            Ok(PrimitiveValue::Boolean(result))
        }
        OperatorClass::Shift => {
            let a = left.as_i64().ok_or_else(illegal)?;
            let distance = right.as_i64().ok_or_else(illegal)?;
            let shifted = if result_ty == PrimitiveType::Long {
                let d = (distance & 0x3f) as u32;
                match op {
                    BinaryOperator::ShiftLeft => a.wrapping_shl(d),
                    BinaryOperator::ShiftRight => a.wrapping_shr(d),
                    _ => ((a as u64) >> d) as i64,
                }
            } else {
                let a = a as i32;
                let d = (distance & 0x1f) as u32;
                (match op {
                    BinaryOperator::ShiftLeft => a.wrapping_shl(d),
                    BinaryOperator::ShiftRight => a.wrapping_shr(d),
                    _ => ((a as u32) >> d) as i32,
                }) as i64
            };
            Ok(PrimitiveValue::Long(shifted).convert_numeric(result_ty))
        }
        OperatorClass::Bitwise | OperatorClass::Logical => {
            if let (Some(a), Some(b)) = (left.as_bool(), right.as_bool()) {
                return Ok(PrimitiveValue::Boolean(match op {
                    BinaryOperator::BitAnd | BinaryOperator::And => a && b,
                    BinaryOperator::BitOr | BinaryOperator::Or => a || b,
                    _ => a ^ b,
                }));
            }
            let (a, b) = (
                left.as_i64().ok_or_else(illegal)?,
                right.as_i64().ok_or_else(illegal)?,
            );
            let bits = match op {
                BinaryOperator::BitAnd => a & b,
                BinaryOperator::BitOr => a | b,
                _ => a ^ b,
            };
            Ok(PrimitiveValue::Long(bits).convert_numeric(result_ty))
        }
        OperatorClass::CompoundAssignment => Err(illegal()),
    }
}

fn compare(op: BinaryOperator, ordering: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering::*;
    match (op, ordering) {
        (BinaryOperator::NotEqual, None) => true,
        (_, None) => false,
        (BinaryOperator::Less, Some(o)) => o == Less,
        (BinaryOperator::Greater, Some(o)) => o == Greater,
        (BinaryOperator::LessEqual, Some(o)) => o != Greater,
        (BinaryOperator::GreaterEqual, Some(o)) => o != Less,
        (BinaryOperator::Equal, Some(o)) => o == Equal,
        (BinaryOperator::NotEqual, Some(o)) => o != Equal,
        _ => false,
    }
}

fn arithmetic(
    op: BinaryOperator,
    left: &PrimitiveValue,
    right: &PrimitiveValue,
    result_ty: PrimitiveType,
) -> Result<PrimitiveValue, ArithmeticFault> {
    if result_ty == PrimitiveType::Float {
        // both operands are promoted to float before the operation
        let (a, b) = (left.as_f32().unwrap_or(0.0), right.as_f32().unwrap_or(0.0));
        let v = match op {
            BinaryOperator::Plus => a + b,
            BinaryOperator::Minus => a - b,
            BinaryOperator::Multiply => a * b,
            BinaryOperator::Divide => a / b,
            _ => a % b,
        };
        return Ok(PrimitiveValue::Float(v));
    }
    if result_ty == PrimitiveType::Double {
        let (a, b) = (left.as_f64().unwrap_or(0.0), right.as_f64().unwrap_or(0.0));
        let v = match op {
            BinaryOperator::Plus => a + b,
            BinaryOperator::Minus => a - b,
            BinaryOperator::Multiply => a * b,
            BinaryOperator::Divide => a / b,
            _ => a % b,
        };
        return Ok(PrimitiveValue::Double(v).convert_numeric(result_ty));
    }

    let (a, b) = (left.as_i64().unwrap_or(0), right.as_i64().unwrap_or(0));
    let v = if result_ty == PrimitiveType::Long {
        match op {
            BinaryOperator::Plus => a.wrapping_add(b),
            BinaryOperator::Minus => a.wrapping_sub(b),
            BinaryOperator::Multiply => a.wrapping_mul(b),
            BinaryOperator::Divide if b == 0 => return Err(ArithmeticFault::DivisionByZero),
            BinaryOperator::Divide => a.wrapping_div(b),
            _ if b == 0 => return Err(ArithmeticFault::DivisionByZero),
            _ => a.wrapping_rem(b),
        }
    } else {
        // narrower integral results are computed in int and wrapped afterwards
        let (a, b) = (a as i32, b as i32);
        (match op {
            BinaryOperator::Plus => a.wrapping_add(b),
            BinaryOperator::Minus => a.wrapping_sub(b),
            BinaryOperator::Multiply => a.wrapping_mul(b),
            BinaryOperator::Divide if b == 0 => return Err(ArithmeticFault::DivisionByZero),
            BinaryOperator::Divide => a.wrapping_div(b),
            _ if b == 0 => return Err(ArithmeticFault::DivisionByZero),
            _ => a.wrapping_rem(b),
        }) as i64
    };
    Ok(PrimitiveValue::Long(v).convert_numeric(result_ty))
}

/// Evaluate a unary operator with Java semantics
pub fn evaluate_unary(
    op: UnaryOperator,
    operand: &PrimitiveValue,
) -> Result<PrimitiveValue, ArithmeticFault> {
    let result_ty = match resolve_unary(op, &OperandType::Primitive(operand.ty())) {
        OperatorResolution::Legal(ty) => ty,
        OperatorResolution::Illegal => {
            return Err(ArithmeticFault::IllegalOperands {
                op: format!("{:?}", op),
                left: operand.ty().to_string(),
                right: String::new(),
            })
        }
    };

    let value = match op {
        UnaryOperator::Not => PrimitiveValue::Boolean(!operand.as_bool().unwrap_or(false)),
        UnaryOperator::Plus => operand.convert_numeric(result_ty),
        UnaryOperator::BitNot => {
            PrimitiveValue::Long(!operand.as_i64().unwrap_or(0)).convert_numeric(result_ty)
        }
        UnaryOperator::Negate if result_ty.is_floating() => {
            PrimitiveValue::Double(-operand.as_f64().unwrap_or(0.0)).convert_numeric(result_ty)
        }
        UnaryOperator::Negate => {
            let v = operand.as_i64().unwrap_or(0);
            if result_ty == PrimitiveType::Long {
                PrimitiveValue::Long(v.wrapping_neg())
            } else {
                PrimitiveValue::Int((v as i32).wrapping_neg())
            }
        }
        UnaryOperator::Increment | UnaryOperator::Decrement => {
            let delta = if op == UnaryOperator::Increment { 1 } else { -1 };
            if result_ty.is_floating() {
                PrimitiveValue::Double(operand.as_f64().unwrap_or(0.0) + delta as f64)
                    .convert_numeric(result_ty)
            } else {
                PrimitiveValue::Long(operand.as_i64().unwrap_or(0).wrapping_add(delta))
                    .convert_numeric(result_ty)
            }
        }
    };
    Ok(value)
}
