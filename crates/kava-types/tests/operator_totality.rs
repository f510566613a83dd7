//! Exhaustive checks over the whole primitive domain
//!
//! The primitive table is small enough to enumerate, so every property here
//! runs over the complete cross product instead of sampled inputs.

use kava_types::{
    cast_kind, resolve_binary, resolve_unary, BinaryOperator, BoxedType, CastKind, OperandType,
    OperatorClass, OperatorResolution, PrimitiveType, UnaryOperator,
};

fn operands() -> Vec<OperandType> {
    PrimitiveType::ALL
        .iter()
        .map(|p| OperandType::Primitive(*p))
        .chain(BoxedType::ALL.iter().map(|b| OperandType::Boxed(*b)))
        .chain(std::iter::once(OperandType::Reference("Object".to_string())))
        .collect()
}

#[test]
fn test_binary_resolution_is_total_and_deterministic() {
    let operands = operands();
    let mut legal = 0usize;
    for op in BinaryOperator::ALL {
        for left in &operands {
            for right in &operands {
                let first = resolve_binary(op, left, right);
                let second = resolve_binary(op, left, right);
                assert_eq!(first, second, "{} {:?} {:?}", op, left, right);
                if let OperatorResolution::Legal(ty) = first {
                    assert_ne!(ty, PrimitiveType::Void, "{} {:?} {:?}", op, left, right);
                    legal += 1;
                }
            }
        }
    }
    assert!(legal > 0);
}

#[test]
fn test_unary_resolution_is_total() {
    for op in UnaryOperator::ALL {
        for operand in operands() {
            let r = resolve_unary(op, &operand);
            assert_eq!(r, resolve_unary(op, &operand));
        }
    }
}

#[test]
fn test_string_concatenation_always_legal() {
    for other in operands() {
        let s = OperandType::Primitive(PrimitiveType::String);
        assert_eq!(
            resolve_binary(BinaryOperator::Plus, &s, &other),
            OperatorResolution::Legal(PrimitiveType::String)
        );
        assert_eq!(
            resolve_binary(BinaryOperator::Plus, &other, &s),
            OperatorResolution::Legal(PrimitiveType::String)
        );
    }
}

#[test]
fn test_arithmetic_result_is_wider_operand() {
    for a in PrimitiveType::ALL.iter().filter(|p| p.is_arithmetic()) {
        for b in PrimitiveType::ALL.iter().filter(|p| p.is_arithmetic()) {
            let r = resolve_binary(
                BinaryOperator::Multiply,
                &OperandType::Primitive(*a),
                &OperandType::Primitive(*b),
            );
            assert_eq!(r, OperatorResolution::Legal((*a).max(*b)));
        }
    }
}

#[test]
fn test_boxed_operands_resolve_like_unboxed() {
    for op in BinaryOperator::ALL {
        for boxed in BoxedType::ALL {
            for prim in PrimitiveType::ALL {
                let with_box =
                    resolve_binary(op, &OperandType::Boxed(boxed), &OperandType::Primitive(prim));
                let unboxed = resolve_binary(
                    op,
                    &OperandType::Primitive(boxed.unboxed()),
                    &OperandType::Primitive(prim),
                );
                assert_eq!(with_box, unboxed, "{} {} {}", op, boxed, prim);
            }
        }
    }
}

#[test]
fn test_compound_assignment_keeps_target_type() {
    for op in BinaryOperator::ALL
        .iter()
        .filter(|o| o.class() == OperatorClass::CompoundAssignment)
    {
        for left in PrimitiveType::ALL {
            for right in PrimitiveType::ALL {
                let r = resolve_binary(
                    *op,
                    &OperandType::Primitive(left),
                    &OperandType::Primitive(right),
                );
                if let OperatorResolution::Legal(ty) = r {
                    assert_eq!(ty, left, "{} {} {}", op, left, right);
                    assert!(left.index() >= 2);
                }
            }
        }
    }
}

#[test]
fn test_widening_is_reflexive() {
    for ty in PrimitiveType::ALL {
        assert_eq!(cast_kind(ty.into(), ty.into()), Some(CastKind::Identity));
    }
}

#[test]
fn test_widening_is_transitive() {
    let numeric: Vec<PrimitiveType> = PrimitiveType::ALL
        .iter()
        .copied()
        .filter(|p| p.is_numeric())
        .collect();
    let widens = |s: PrimitiveType, d: PrimitiveType| {
        matches!(
            cast_kind(s.into(), d.into()),
            Some(CastKind::Identity) | Some(CastKind::Widening)
        )
    };
    for &s in &numeric {
        for &d in &numeric {
            for &e in &numeric {
                if widens(s, d) && widens(d, e) {
                    assert!(widens(s, e), "{} -> {} -> {}", s, d, e);
                }
            }
        }
    }
}

#[test]
fn test_boolean_and_void_never_widen() {
    for ty in PrimitiveType::ALL.iter().filter(|p| p.is_numeric()) {
        for from in [PrimitiveType::Boolean, PrimitiveType::Void] {
            assert!(!matches!(
                cast_kind(from.into(), (*ty).into()),
                Some(CastKind::Widening) | Some(CastKind::Identity)
            ));
        }
    }
}
