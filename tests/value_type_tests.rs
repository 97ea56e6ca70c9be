//! Integration tests for the value type model.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use z80_isel::core::{RawBitsKey, SimpleValueType, TypeContext, ValueType};

fn sample_types(ctx: &TypeContext) -> Vec<ValueType<'_>> {
    let mut types: Vec<_> = SimpleValueType::ALL
        .iter()
        .copied()
        .filter(|vt| vt.is_sized())
        .map(ValueType::Simple)
        .collect();
    for bits in [3, 12, 40, 48, 200] {
        types.push(ValueType::integer(ctx, bits));
    }
    let i40 = ValueType::integer(ctx, 40);
    types.push(ValueType::vector(ctx, i40, 3));
    types.push(ValueType::vector(ctx, SimpleValueType::I8.into(), 3));
    types
}

#[test]
fn test_equality_is_identity_of_description() {
    let ctx = TypeContext::new();
    assert_eq!(
        ValueType::integer(&ctx, 8),
        ValueType::Simple(SimpleValueType::I8)
    );
    assert_eq!(ValueType::integer(&ctx, 40), ValueType::integer(&ctx, 40));
    assert_ne!(ValueType::integer(&ctx, 40), ValueType::integer(&ctx, 48));

    let i40 = ValueType::integer(&ctx, 40);
    assert_eq!(ValueType::vector(&ctx, i40, 3), ValueType::vector(&ctx, i40, 3));
    assert_ne!(ValueType::vector(&ctx, i40, 3), ValueType::vector(&ctx, i40, 5));

    // Handles never compare equal across registries.
    let other = TypeContext::new();
    assert_ne!(ValueType::integer(&ctx, 40), ValueType::integer(&other, 40));
    let foreign = ValueType::integer(&other, 40);
    assert_eq!(ValueType::vector(&ctx, foreign, 3), ValueType::vector(&ctx, i40, 3));

    // Same width, different kind.
    assert_ne!(
        ValueType::Simple(SimpleValueType::I16),
        ValueType::Simple(SimpleValueType::F16)
    );
}

#[test]
fn test_round_integer_type_is_idempotent() {
    let ctx = TypeContext::new();
    for bits in 1..=300 {
        let ty = ValueType::integer(&ctx, bits);
        let rounded = ty.round_integer_type(&ctx);
        let size = rounded.size_in_bits();
        assert!(size >= bits && size >= 8, "i{bits} rounded to {rounded}");
        assert!(size.is_power_of_two(), "i{bits} rounded to {rounded}");
        assert_eq!(rounded.round_integer_type(&ctx), rounded);
    }
    assert_eq!(
        ValueType::Simple(SimpleValueType::I24).round_integer_type(&ctx),
        ValueType::Simple(SimpleValueType::I32)
    );
}

#[test]
fn test_bit_comparisons_follow_sizes() {
    let ctx = TypeContext::new();
    let types = sample_types(&ctx);
    for &a in &types {
        for &b in &types {
            let (sa, sb) = (a.size_in_bits(), b.size_in_bits());
            if a == b {
                assert!(a.bits_eq(b) && a.bits_ge(b) && a.bits_le(b));
                assert!(!a.bits_gt(b) && !a.bits_lt(b));
                continue;
            }
            assert_eq!(a.bits_eq(b), sa == sb, "{a} vs {b}");
            assert_eq!(a.bits_gt(b), sa > sb, "{a} vs {b}");
            assert_eq!(a.bits_ge(b), sa >= sb, "{a} vs {b}");
            assert_eq!(a.bits_lt(b), sa < sb, "{a} vs {b}");
            assert_eq!(a.bits_le(b), sa <= sb, "{a} vs {b}");
        }
    }
}

#[test]
fn test_widen_integer_vector_element_type() {
    let ctx = TypeContext::new();
    let v4i8 = ValueType::Simple(SimpleValueType::V4I8);
    assert_eq!(
        v4i8.widen_integer_vector_element_type(&ctx),
        ValueType::Simple(SimpleValueType::V4I16)
    );

    for (bits, count) in [(8, 3), (40, 3), (24, 7), (16, 64)] {
        let element = ValueType::integer(&ctx, bits);
        let vector = ValueType::vector(&ctx, element, count);
        let wide = vector.widen_integer_vector_element_type(&ctx);
        assert_eq!(wide.vector_num_elements(), count);
        assert_eq!(wide.vector_element_type().size_in_bits(), 2 * bits);
        assert_eq!(wide.size_in_bits(), 2 * vector.size_in_bits());
    }

    let mut widened = 0;
    for vector in SimpleValueType::ALL.iter().copied().map(ValueType::Simple) {
        if !(vector.is_vector() && vector.is_integer()) {
            continue;
        }
        let element = vector.vector_element_type();
        let wide = vector.widen_integer_vector_element_type(&ctx);
        assert!(wide.is_vector() && wide.is_integer(), "{vector} -> {wide}");
        assert_eq!(wide.vector_num_elements(), vector.vector_num_elements(), "{vector}");
        assert_eq!(
            wide.vector_element_type().size_in_bits(),
            2 * element.size_in_bits(),
            "{vector} -> {wide}"
        );
        assert_eq!(wide.size_in_bits(), 2 * vector.size_in_bits(), "{vector}");
        widened += 1;
    }
    assert!(widened > 0);
}

#[test]
fn test_raw_bits_order_is_total() {
    let ctx = TypeContext::new();
    let types = sample_types(&ctx);
    for &a in &types {
        for &b in &types {
            let ab = a.compare_raw_bits(b);
            assert_eq!(ab, b.compare_raw_bits(a).reverse());
            assert_eq!(ab == Ordering::Equal, a == b, "{a} vs {b}");
        }
    }

    let set: BTreeSet<_> = types.iter().copied().map(RawBitsKey).collect();
    assert_eq!(set.len(), types.len());
    // Extended types sort before every simple type.
    let first = set.iter().next().unwrap();
    assert!(first.0.is_extended());
}

#[test]
fn test_parse_names() {
    let ctx = TypeContext::new();
    assert_eq!(
        ValueType::parse(&ctx, "i24"),
        Some(ValueType::Simple(SimpleValueType::I24))
    );
    assert_eq!(ValueType::parse(&ctx, "ch"), Some(ValueType::CHAIN));
    let i40 = ValueType::parse(&ctx, "i40").unwrap();
    assert!(i40.is_extended());
    assert_eq!(i40.to_string(), "i40");
    let v3i40 = ValueType::parse(&ctx, "v3i40").unwrap();
    assert_eq!(v3i40, ValueType::vector(&ctx, i40, 3));
    assert_eq!(v3i40.to_string(), "v3i40");
    assert!(ValueType::parse(&ctx, "i0").is_none());
    assert!(ValueType::parse(&ctx, "v0i8").is_none());
    assert!(ValueType::parse(&ctx, "q8").is_none());
}
