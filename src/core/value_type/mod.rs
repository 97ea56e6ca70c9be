// This module defines ValueType, the canonical description of a value flowing through the
// selection DAG. A value type is either Simple (an entry of the compact SimpleValueType
// enumeration, answered from static tables) or Extended (a shared reference to a type
// object interned by a TypeContext). Equality is variant aware: simple types compare by
// entry, extended types by handle identity, never structurally. The bits_* comparisons
// short-circuit on that equality before comparing widths, bits_eq additionally accepts any
// two types of the same width, and compare_raw_bits is a total but meaningless order meant
// only for container keys. Derivations (integer, vector, round_integer_type,
// half_sized_integer_vt, widen_integer_vector_element_type, ...) resolve to a simple entry
// when one exists and fall back to interning an extended type otherwise.

//! Machine value types.
//!
//! [`ValueType`] is the shared type vocabulary of the selector: every DAG
//! result and operand edge carries one.
//!
//! ```
//! use z80_isel::core::value_type::{SimpleValueType, TypeContext, ValueType};
//!
//! let ctx = TypeContext::new();
//! let i24 = ValueType::integer(&ctx, 24);
//! assert_eq!(i24, ValueType::Simple(SimpleValueType::I24));
//!
//! let odd = ValueType::integer(&ctx, 12345);
//! assert!(odd.is_extended());
//! assert_eq!(odd.round_integer_type(&ctx).size_in_bits(), 16384);
//! ```

pub mod registry;
pub mod simple;

pub use registry::{ExtendedKind, ExtendedType, TypeContext, MAX_INT_BITS};
pub use simple::SimpleValueType;

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Type of a value in the selection DAG.
#[derive(Debug, Clone, Copy)]
pub enum ValueType<'ctx> {
    /// Entry of the compact enumeration.
    Simple(SimpleValueType),
    /// Type object owned by a [`TypeContext`].
    Extended(&'ctx ExtendedType<'ctx>),
}

impl<'ctx> ValueType<'ctx> {
    /// The chain type threaded through side-effecting nodes.
    pub const CHAIN: ValueType<'static> = ValueType::Simple(SimpleValueType::Other);

    /// The glue type.
    pub const GLUE: ValueType<'static> = ValueType::Simple(SimpleValueType::Glue);

    /// Integer type with `bits` bits, simple if the enumeration has one.
    pub fn integer(ctx: &'ctx TypeContext, bits: u32) -> Self {
        match SimpleValueType::integer(bits) {
            Some(vt) => ValueType::Simple(vt),
            None => ValueType::Extended(ctx.integer_type(bits)),
        }
    }

    /// Vector of `count` elements of `element`, simple if possible.
    pub fn vector(ctx: &'ctx TypeContext, element: ValueType<'_>, count: u32) -> Self {
        if let ValueType::Simple(elt) = element {
            if let Some(vt) = SimpleValueType::vector(elt, count) {
                return ValueType::Simple(vt);
            }
        }
        ValueType::Extended(ctx.vector_type(element, count))
    }

    /// Floating-point type with the given width.
    pub fn floating_point(bits: u32) -> Self {
        ValueType::Simple(SimpleValueType::floating_point(bits))
    }

    /// Parse a type string such as `i8`, `v4i32`, `i12345` or `ch`.
    ///
    /// Shapes the context cannot represent (zero or over-wide integers, vectors whose
    /// total width overflows) yield `None`.
    pub fn parse(ctx: &'ctx TypeContext, text: &str) -> Option<Self> {
        if let Some(vt) = SimpleValueType::from_name(text) {
            return Some(ValueType::Simple(vt));
        }
        if let Some(bits) = text.strip_prefix('i') {
            let bits: u32 = bits.parse().ok()?;
            return (1..=MAX_INT_BITS)
                .contains(&bits)
                .then(|| ValueType::integer(ctx, bits));
        }
        let rest = text.strip_prefix('v')?;
        let split = rest.find(|c: char| !c.is_ascii_digit())?;
        let count: u32 = rest[..split].parse().ok()?;
        let element = ValueType::parse(ctx, &rest[split..])?;
        if count == 0 || element.is_vector() {
            return None;
        }
        registry::vector_bits(element, count)?;
        Some(ValueType::vector(ctx, element, count))
    }

    pub fn is_simple(&self) -> bool {
        matches!(self, ValueType::Simple(_))
    }

    pub fn is_extended(&self) -> bool {
        !self.is_simple()
    }

    /// The simple entry. Panics on extended types.
    pub fn simple_vt(&self) -> SimpleValueType {
        match self {
            ValueType::Simple(vt) => *vt,
            ValueType::Extended(ext) => panic!("expected a simple value type, found {ext}"),
        }
    }

    pub fn is_sized(&self) -> bool {
        match self {
            ValueType::Simple(vt) => vt.is_sized(),
            ValueType::Extended(_) => true,
        }
    }

    /// True for integers and integer vectors.
    pub fn is_integer(&self) -> bool {
        match self {
            ValueType::Simple(vt) => vt.is_integer(),
            ValueType::Extended(ext) => ext.is_integer(),
        }
    }

    /// True for floats and float vectors.
    pub fn is_floating_point(&self) -> bool {
        match self {
            ValueType::Simple(vt) => vt.is_floating_point(),
            ValueType::Extended(ext) => ext.is_floating_point(),
        }
    }

    /// True for integers that are not vectors.
    pub fn is_scalar_integer(&self) -> bool {
        match self {
            ValueType::Simple(vt) => vt.is_scalar_integer(),
            ValueType::Extended(ext) => ext.is_scalar_integer(),
        }
    }

    pub fn is_vector(&self) -> bool {
        match self {
            ValueType::Simple(vt) => vt.is_vector(),
            ValueType::Extended(ext) => ext.is_vector(),
        }
    }

    fn is_vector_of_bits(&self, bits: u32) -> bool {
        self.is_vector() && self.size_in_bits() == bits
    }

    pub fn is_16_bit_vector(&self) -> bool {
        self.is_vector_of_bits(16)
    }

    pub fn is_32_bit_vector(&self) -> bool {
        self.is_vector_of_bits(32)
    }

    pub fn is_64_bit_vector(&self) -> bool {
        self.is_vector_of_bits(64)
    }

    pub fn is_128_bit_vector(&self) -> bool {
        self.is_vector_of_bits(128)
    }

    pub fn is_256_bit_vector(&self) -> bool {
        self.is_vector_of_bits(256)
    }

    pub fn is_512_bit_vector(&self) -> bool {
        self.is_vector_of_bits(512)
    }

    pub fn is_1024_bit_vector(&self) -> bool {
        self.is_vector_of_bits(1024)
    }

    pub fn is_2048_bit_vector(&self) -> bool {
        self.is_vector_of_bits(2048)
    }

    /// True for the pattern-generation placeholders.
    pub fn is_overloaded(&self) -> bool {
        match self {
            ValueType::Simple(vt) => vt.is_overloaded(),
            ValueType::Extended(_) => false,
        }
    }

    /// True if the size is a multiple of 8 bits.
    pub fn is_byte_sized(&self) -> bool {
        self.size_in_bits() % 8 == 0
    }

    /// True if the size is a power-of-two number of bytes.
    pub fn is_round(&self) -> bool {
        let bits = self.size_in_bits();
        bits >= 8 && bits.is_power_of_two()
    }

    pub fn is_pow2_size(&self) -> bool {
        self.size_in_bits().is_power_of_two()
    }

    /// True if the vector's element count is a power of two.
    pub fn is_pow2_vector_type(&self) -> bool {
        self.vector_num_elements().is_power_of_two()
    }

    /// Size of the type in bits. Panics on unsized types.
    pub fn size_in_bits(&self) -> u32 {
        match self {
            ValueType::Simple(vt) => vt.size_in_bits(),
            ValueType::Extended(ext) => ext.size_in_bits(),
        }
    }

    /// Element type for vectors, the type itself otherwise.
    pub fn scalar_type(&self) -> Self {
        if self.is_vector() {
            self.vector_element_type()
        } else {
            *self
        }
    }

    pub fn scalar_size_in_bits(&self) -> u32 {
        self.scalar_type().size_in_bits()
    }

    /// Number of `part_bits`-wide parts needed to hold the value.
    pub fn num_parts(&self, part_bits: u32) -> u32 {
        self.size_in_bits().div_ceil(part_bits)
    }

    /// Number of `part` values needed to hold the value.
    pub fn num_parts_of(&self, part: ValueType<'_>) -> u32 {
        self.num_parts(part.size_in_bits())
    }

    /// Bytes overwritten by a store of this type.
    pub fn store_size(&self) -> u32 {
        self.num_parts(8)
    }

    pub fn store_size_in_bits(&self) -> u32 {
        self.store_size() * 8
    }

    /// Element type of a vector. Panics on non-vectors.
    pub fn vector_element_type(&self) -> Self {
        match self {
            ValueType::Simple(vt) => ValueType::Simple(vt.vector_element_type()),
            ValueType::Extended(ext) => ext
                .vector_element_type()
                .unwrap_or_else(|| panic!("vector_element_type called on non-vector type {ext}")),
        }
    }

    /// Element count of a vector. Panics on non-vectors.
    pub fn vector_num_elements(&self) -> u32 {
        match self {
            ValueType::Simple(vt) => vt.vector_num_elements(),
            ValueType::Extended(ext) => ext
                .vector_num_elements()
                .unwrap_or_else(|| panic!("vector_num_elements called on non-vector type {ext}")),
        }
    }

    /// Same-shaped vector with integer elements of the same widths.
    pub fn change_vector_element_type_to_integer(&self, ctx: &'ctx TypeContext) -> Self {
        let element = ValueType::integer(ctx, self.vector_element_type().size_in_bits());
        ValueType::vector(ctx, element, self.vector_num_elements())
    }

    /// Equally sized integer type, element-wise for vectors.
    pub fn change_type_to_integer(&self, ctx: &'ctx TypeContext) -> Self {
        if self.is_vector() {
            self.change_vector_element_type_to_integer(ctx)
        } else {
            ValueType::integer(ctx, self.size_in_bits())
        }
    }

    /// Equally sized scalar integer; vectors collapse to one integer.
    pub fn change_type_to_scalar_integer(&self, ctx: &'ctx TypeContext) -> Self {
        ValueType::integer(ctx, self.size_in_bits())
    }

    /// Round the width of a scalar integer up to a power of two, at least 8.
    pub fn round_integer_type(&self, ctx: &'ctx TypeContext) -> Self {
        assert!(
            self.is_scalar_integer(),
            "round_integer_type called on non-integer type {self}"
        );
        let bits = self.size_in_bits();
        if bits <= 8 {
            return ValueType::Simple(SimpleValueType::I8);
        }
        ValueType::integer(ctx, bits.next_power_of_two())
    }

    /// Smallest simple integer at least half as wide as this one, or an
    /// extended integer of exactly half the width (rounded up) when none is.
    pub fn half_sized_integer_vt(&self, ctx: &'ctx TypeContext) -> Self {
        assert!(
            self.is_scalar_integer(),
            "half_sized_integer_vt called on non-integer type {self}"
        );
        let bits = self.size_in_bits();
        SimpleValueType::integer_types()
            .find(|half| half.size_in_bits() * 2 >= bits)
            .map(ValueType::Simple)
            .unwrap_or_else(|| ValueType::integer(ctx, bits.div_ceil(2)))
    }

    /// Integer vector with the same element count and doubled element width.
    pub fn widen_integer_vector_element_type(&self, ctx: &'ctx TypeContext) -> Self {
        assert!(
            self.is_vector() && self.is_integer(),
            "widen_integer_vector_element_type called on {self}"
        );
        let element = ValueType::integer(ctx, 2 * self.vector_element_type().size_in_bits());
        ValueType::vector(ctx, element, self.vector_num_elements())
    }

    /// Widen the element count of a vector up to the next power of two.
    pub fn pow2_vector_type(&self, ctx: &'ctx TypeContext) -> Self {
        if self.is_pow2_vector_type() {
            return *self;
        }
        let count = self.vector_num_elements().next_power_of_two();
        ValueType::vector(ctx, self.vector_element_type(), count)
    }

    /// Same type, or same number of bits.
    pub fn bits_eq(&self, other: ValueType<'_>) -> bool {
        *self == other || self.size_in_bits() == other.size_in_bits()
    }

    /// More bits than `other`. False when the types are equal.
    pub fn bits_gt(&self, other: ValueType<'_>) -> bool {
        *self != other && self.size_in_bits() > other.size_in_bits()
    }

    /// No fewer bits than `other`. True when the types are equal.
    pub fn bits_ge(&self, other: ValueType<'_>) -> bool {
        *self == other || self.size_in_bits() >= other.size_in_bits()
    }

    /// Fewer bits than `other`. False when the types are equal.
    pub fn bits_lt(&self, other: ValueType<'_>) -> bool {
        *self != other && self.size_in_bits() < other.size_in_bits()
    }

    /// No more bits than `other`. True when the types are equal.
    pub fn bits_le(&self, other: ValueType<'_>) -> bool {
        *self == other || self.size_in_bits() <= other.size_in_bits()
    }

    fn raw_key(&self) -> (i32, usize) {
        match self {
            ValueType::Simple(vt) => (*vt as u8 as i32, 0),
            ValueType::Extended(ext) => (-1, *ext as *const ExtendedType<'_> as usize),
        }
    }

    /// A meaningless but well-behaved total order.
    ///
    /// Orders by enumeration value, extended types first and among themselves
    /// by handle address. Only suitable for container keys, never for size or
    /// type reasoning.
    pub fn compare_raw_bits(&self, other: ValueType<'_>) -> Ordering {
        self.raw_key().cmp(&other.raw_key())
    }
}

impl PartialEq<ValueType<'_>> for ValueType<'_> {
    fn eq(&self, other: &ValueType<'_>) -> bool {
        match (self, other) {
            (ValueType::Simple(a), ValueType::Simple(b)) => a == b,
            (ValueType::Extended(a), ValueType::Extended(b)) => std::ptr::eq(
                *a as *const ExtendedType<'_> as *const u8,
                *b as *const ExtendedType<'_> as *const u8,
            ),
            _ => false,
        }
    }
}

impl Eq for ValueType<'_> {}

impl Hash for ValueType<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw_key().hash(state);
    }
}

impl From<SimpleValueType> for ValueType<'_> {
    fn from(vt: SimpleValueType) -> Self {
        ValueType::Simple(vt)
    }
}

impl fmt::Display for ValueType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Simple(vt) => write!(f, "{vt}"),
            ValueType::Extended(ext) => write!(f, "{ext}"),
        }
    }
}

/// Wrapper ordering value types by [`ValueType::compare_raw_bits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawBitsKey<'ctx>(pub ValueType<'ctx>);

impl PartialOrd for RawBitsKey<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RawBitsKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.compare_raw_bits(other.0)
    }
}
