//! Binary numeric promotion with operands that are not exact in `float`
//!
//! 2^24 + 1 is the smallest positive integer a `float` cannot hold, so every
//! expected value here differs from what a wider intermediate would produce.

use kava_types::{evaluate_binary, BinaryOperator, PrimitiveValue};

const JUST_ABOVE_2_24: i32 = 16_777_217;

fn eval(op: BinaryOperator, left: PrimitiveValue, right: PrimitiveValue) -> PrimitiveValue {
    evaluate_binary(op, &left, &right).unwrap()
}

// ============================================================================
// Arithmetic
// ============================================================================

#[test]
fn test_long_plus_float_rounds_long_first() {
    assert_eq!(
        eval(
            BinaryOperator::Plus,
            PrimitiveValue::Long(JUST_ABOVE_2_24 as i64),
            PrimitiveValue::Float(1.0)
        ),
        PrimitiveValue::Float(16_777_216.0)
    );
}

#[test]
fn test_long_times_float() {
    assert_eq!(
        eval(
            BinaryOperator::Multiply,
            PrimitiveValue::Long(JUST_ABOVE_2_24 as i64),
            PrimitiveValue::Float(3.0)
        ),
        PrimitiveValue::Float(50_331_648.0)
    );
}

#[test]
fn test_int_divided_and_modulo_by_float() {
    assert_eq!(
        eval(
            BinaryOperator::Divide,
            PrimitiveValue::Int(JUST_ABOVE_2_24),
            PrimitiveValue::Float(1.0)
        ),
        PrimitiveValue::Float(16_777_216.0)
    );
    assert_eq!(
        eval(
            BinaryOperator::Modulo,
            PrimitiveValue::Int(JUST_ABOVE_2_24),
            PrimitiveValue::Float(16_777_216.0)
        ),
        PrimitiveValue::Float(0.0)
    );
}

#[test]
fn test_double_operand_keeps_full_precision() {
    assert_eq!(
        eval(
            BinaryOperator::Plus,
            PrimitiveValue::Long(JUST_ABOVE_2_24 as i64),
            PrimitiveValue::Double(1.0)
        ),
        PrimitiveValue::Double(16_777_218.0)
    );
}

#[test]
fn test_compound_assignment_goes_through_float() {
    assert_eq!(
        eval(
            BinaryOperator::PlusAssign,
            PrimitiveValue::Int(JUST_ABOVE_2_24),
            PrimitiveValue::Float(0.0)
        ),
        PrimitiveValue::Int(16_777_216)
    );
}

// ============================================================================
// Comparison
// ============================================================================

#[test]
fn test_int_equals_float_after_promotion() {
    assert_eq!(
        eval(
            BinaryOperator::Equal,
            PrimitiveValue::Int(JUST_ABOVE_2_24),
            PrimitiveValue::Float(16_777_216.0)
        ),
        PrimitiveValue::Boolean(true)
    );
    assert_eq!(
        eval(
            BinaryOperator::NotEqual,
            PrimitiveValue::Int(JUST_ABOVE_2_24),
            PrimitiveValue::Float(16_777_216.0)
        ),
        PrimitiveValue::Boolean(false)
    );
}

#[test]
fn test_long_ordering_against_float() {
    let big = || PrimitiveValue::Long(JUST_ABOVE_2_24 as i64);
    let f = || PrimitiveValue::Float(16_777_216.0);
    assert_eq!(eval(BinaryOperator::Greater, big(), f()), PrimitiveValue::Boolean(false));
    assert_eq!(eval(BinaryOperator::Less, f(), big()), PrimitiveValue::Boolean(false));
    assert_eq!(eval(BinaryOperator::GreaterEqual, big(), f()), PrimitiveValue::Boolean(true));
}

#[test]
fn test_long_against_double_compares_exactly() {
    assert_eq!(
        eval(
            BinaryOperator::Greater,
            PrimitiveValue::Long(JUST_ABOVE_2_24 as i64),
            PrimitiveValue::Double(16_777_216.0)
        ),
        PrimitiveValue::Boolean(true)
    );
}
