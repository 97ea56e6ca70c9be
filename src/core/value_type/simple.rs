// This module defines SimpleValueType, the compact enumeration of machine value types that
// every target shares. Each entry carries a static record (printable name, bit width and
// class) generated by the simple_value_types! table, so classification and sizing are plain
// table lookups. Vector entries name their element type and count; special entries (chain,
// glue, void, untyped) and the overload placeholders used by pattern generation have no
// size, and asking for one is a caller bug that fails fast. The table includes i24, the
// eZ80 pointer width, alongside the usual power-of-two integers.

//! Compact machine value types.

use std::fmt;

/// Classification stored in the static type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Integer,
    Float,
    Vector(SimpleValueType, u32),
    Special,
    Overloaded,
}

#[derive(Debug, Clone, Copy)]
struct TypeInfo {
    name: &'static str,
    bits: u32,
    class: Class,
}

macro_rules! simple_value_types {
    ($($vt:ident = $name:literal, $bits:literal, $class:expr;)*) => {
        /// One entry of the compact value type enumeration.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum SimpleValueType {
            $($vt,)*
        }

        impl SimpleValueType {
            /// Every entry, in enumeration order.
            pub const ALL: &'static [SimpleValueType] = &[$(SimpleValueType::$vt,)*];

            fn info(self) -> TypeInfo {
                use Class::*;
                use SimpleValueType::*;
                match self {
                    $($vt => TypeInfo { name: $name, bits: $bits, class: $class },)*
                }
            }
        }
    };
}

simple_value_types! {
    Other = "ch", 0, Special;

    I1 = "i1", 1, Integer;
    I8 = "i8", 8, Integer;
    I16 = "i16", 16, Integer;
    I24 = "i24", 24, Integer;
    I32 = "i32", 32, Integer;
    I64 = "i64", 64, Integer;
    I128 = "i128", 128, Integer;

    F16 = "f16", 16, Float;
    F32 = "f32", 32, Float;
    F64 = "f64", 64, Float;
    F80 = "f80", 80, Float;
    F128 = "f128", 128, Float;
    Ppcf128 = "ppcf128", 128, Float;

    V2I1 = "v2i1", 2, Vector(I1, 2);
    V4I1 = "v4i1", 4, Vector(I1, 4);
    V8I1 = "v8i1", 8, Vector(I1, 8);
    V16I1 = "v16i1", 16, Vector(I1, 16);
    V32I1 = "v32i1", 32, Vector(I1, 32);
    V64I1 = "v64i1", 64, Vector(I1, 64);
    V512I1 = "v512i1", 512, Vector(I1, 512);
    V1024I1 = "v1024i1", 1024, Vector(I1, 1024);

    V1I8 = "v1i8", 8, Vector(I8, 1);
    V2I8 = "v2i8", 16, Vector(I8, 2);
    V4I8 = "v4i8", 32, Vector(I8, 4);
    V8I8 = "v8i8", 64, Vector(I8, 8);
    V16I8 = "v16i8", 128, Vector(I8, 16);
    V32I8 = "v32i8", 256, Vector(I8, 32);
    V64I8 = "v64i8", 512, Vector(I8, 64);
    V128I8 = "v128i8", 1024, Vector(I8, 128);
    V256I8 = "v256i8", 2048, Vector(I8, 256);

    V1I16 = "v1i16", 16, Vector(I16, 1);
    V2I16 = "v2i16", 32, Vector(I16, 2);
    V4I16 = "v4i16", 64, Vector(I16, 4);
    V8I16 = "v8i16", 128, Vector(I16, 8);
    V16I16 = "v16i16", 256, Vector(I16, 16);
    V32I16 = "v32i16", 512, Vector(I16, 32);
    V64I16 = "v64i16", 1024, Vector(I16, 64);
    V128I16 = "v128i16", 2048, Vector(I16, 128);

    V1I32 = "v1i32", 32, Vector(I32, 1);
    V2I32 = "v2i32", 64, Vector(I32, 2);
    V4I32 = "v4i32", 128, Vector(I32, 4);
    V8I32 = "v8i32", 256, Vector(I32, 8);
    V16I32 = "v16i32", 512, Vector(I32, 16);
    V32I32 = "v32i32", 1024, Vector(I32, 32);
    V64I32 = "v64i32", 2048, Vector(I32, 64);

    V1I64 = "v1i64", 64, Vector(I64, 1);
    V2I64 = "v2i64", 128, Vector(I64, 2);
    V4I64 = "v4i64", 256, Vector(I64, 4);
    V8I64 = "v8i64", 512, Vector(I64, 8);
    V16I64 = "v16i64", 1024, Vector(I64, 16);
    V32I64 = "v32i64", 2048, Vector(I64, 32);

    V1I128 = "v1i128", 128, Vector(I128, 1);

    V2F16 = "v2f16", 32, Vector(F16, 2);
    V4F16 = "v4f16", 64, Vector(F16, 4);
    V8F16 = "v8f16", 128, Vector(F16, 8);

    V1F32 = "v1f32", 32, Vector(F32, 1);
    V2F32 = "v2f32", 64, Vector(F32, 2);
    V4F32 = "v4f32", 128, Vector(F32, 4);
    V8F32 = "v8f32", 256, Vector(F32, 8);
    V16F32 = "v16f32", 512, Vector(F32, 16);

    V1F64 = "v1f64", 64, Vector(F64, 1);
    V2F64 = "v2f64", 128, Vector(F64, 2);
    V4F64 = "v4f64", 256, Vector(F64, 4);
    V8F64 = "v8f64", 512, Vector(F64, 8);

    Glue = "glue", 0, Special;
    IsVoid = "isVoid", 0, Special;
    Untyped = "Untyped", 0, Special;

    IPtrAny = "iPTRAny", 0, Overloaded;
    VAny = "vAny", 0, Overloaded;
    FAny = "fAny", 0, Overloaded;
    IAny = "iAny", 0, Overloaded;
    IPtr = "iPTR", 0, Overloaded;
}

/// Scalar integer entries in increasing width order.
const INTEGER_TYPES: [SimpleValueType; 7] = [
    SimpleValueType::I1,
    SimpleValueType::I8,
    SimpleValueType::I16,
    SimpleValueType::I24,
    SimpleValueType::I32,
    SimpleValueType::I64,
    SimpleValueType::I128,
];

impl SimpleValueType {
    /// Printable name, e.g. `i24` or `v4i32`.
    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Look an entry up by its printable name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|vt| vt.name() == name)
    }

    /// True for entries with a fixed bit width.
    pub fn is_sized(self) -> bool {
        matches!(
            self.info().class,
            Class::Integer | Class::Float | Class::Vector(..)
        )
    }

    /// Size of the type in bits.
    ///
    /// Panics for chain/glue/void types and overload placeholders.
    pub fn size_in_bits(self) -> u32 {
        let info = self.info();
        assert!(
            self.is_sized(),
            "value type {} has no fixed size",
            info.name
        );
        info.bits
    }

    /// True for scalar integers and integer vectors.
    pub fn is_integer(self) -> bool {
        match self.info().class {
            Class::Integer => true,
            Class::Vector(elt, _) => elt.is_scalar_integer(),
            _ => false,
        }
    }

    /// True for scalar floats and float vectors.
    pub fn is_floating_point(self) -> bool {
        match self.info().class {
            Class::Float => true,
            Class::Vector(elt, _) => elt.is_floating_point(),
            _ => false,
        }
    }

    pub fn is_scalar_integer(self) -> bool {
        self.info().class == Class::Integer
    }

    pub fn is_vector(self) -> bool {
        matches!(self.info().class, Class::Vector(..))
    }

    /// True for the placeholders only pattern generation may use.
    pub fn is_overloaded(self) -> bool {
        self.info().class == Class::Overloaded
    }

    fn is_vector_of_bits(self, bits: u32) -> bool {
        self.is_vector() && self.info().bits == bits
    }

    pub fn is_16_bit_vector(self) -> bool {
        self.is_vector_of_bits(16)
    }

    pub fn is_32_bit_vector(self) -> bool {
        self.is_vector_of_bits(32)
    }

    pub fn is_64_bit_vector(self) -> bool {
        self.is_vector_of_bits(64)
    }

    pub fn is_128_bit_vector(self) -> bool {
        self.is_vector_of_bits(128)
    }

    pub fn is_256_bit_vector(self) -> bool {
        self.is_vector_of_bits(256)
    }

    pub fn is_512_bit_vector(self) -> bool {
        self.is_vector_of_bits(512)
    }

    pub fn is_1024_bit_vector(self) -> bool {
        self.is_vector_of_bits(1024)
    }

    pub fn is_2048_bit_vector(self) -> bool {
        self.is_vector_of_bits(2048)
    }

    /// Element type of a vector entry. Panics on anything else.
    pub fn vector_element_type(self) -> SimpleValueType {
        match self.info().class {
            Class::Vector(elt, _) => elt,
            _ => panic!("vector_element_type called on non-vector type {}", self.name()),
        }
    }

    /// Element count of a vector entry. Panics on anything else.
    pub fn vector_num_elements(self) -> u32 {
        match self.info().class {
            Class::Vector(_, count) => count,
            _ => panic!("vector_num_elements called on non-vector type {}", self.name()),
        }
    }

    /// Scalar integer entry with exactly `bits` bits, if the enumeration has one.
    pub fn integer(bits: u32) -> Option<Self> {
        Self::integer_types().find(|vt| vt.info().bits == bits)
    }

    /// Vector entry of `count` elements of `element`, if the enumeration has one.
    pub fn vector(element: SimpleValueType, count: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|vt| {
            matches!(vt.info().class, Class::Vector(elt, n) if elt == element && n == count)
        })
    }

    /// Floating-point entry with the given width. There are two 128-bit
    /// formats; this returns `f128`, not `ppcf128`.
    pub fn floating_point(bits: u32) -> Self {
        match bits {
            16 => SimpleValueType::F16,
            32 => SimpleValueType::F32,
            64 => SimpleValueType::F64,
            80 => SimpleValueType::F80,
            128 => SimpleValueType::F128,
            _ => panic!("bad bit width for floating point type: {bits}"),
        }
    }

    /// Scalar integer entries, narrowest first.
    pub fn integer_types() -> impl Iterator<Item = SimpleValueType> {
        INTEGER_TYPES.iter().copied()
    }
}

impl fmt::Display for SimpleValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_table_is_consistent() {
        for &vt in SimpleValueType::ALL.iter().filter(|vt| vt.is_vector()) {
            let elt = vt.vector_element_type();
            assert!(!elt.is_vector(), "{vt} has a vector element");
            assert_eq!(
                vt.size_in_bits(),
                elt.size_in_bits() * vt.vector_num_elements(),
                "size mismatch for {vt}"
            );
            assert_eq!(SimpleValueType::vector(elt, vt.vector_num_elements()), Some(vt));
        }
    }

    #[test]
    fn test_names_are_unique() {
        for &vt in SimpleValueType::ALL {
            assert_eq!(SimpleValueType::from_name(vt.name()), Some(vt));
        }
    }

    #[test]
    fn test_classification() {
        use SimpleValueType::*;
        assert!(I24.is_scalar_integer());
        assert!(I24.is_integer());
        assert!(!I24.is_vector());
        assert!(V4I32.is_integer());
        assert!(!V4I32.is_scalar_integer());
        assert!(V4F32.is_floating_point());
        assert!(!F32.is_integer());
        assert!(V4I32.is_128_bit_vector());
        assert!(V2I8.is_16_bit_vector());
        assert!(V256I8.is_2048_bit_vector());
        assert!(!I16.is_16_bit_vector());
        assert!(IAny.is_overloaded());
        assert!(!Other.is_sized());
    }

    #[test]
    fn test_integer_lookup() {
        assert_eq!(SimpleValueType::integer(24), Some(SimpleValueType::I24));
        assert_eq!(SimpleValueType::integer(48), None);
        let widths: Vec<u32> = SimpleValueType::integer_types()
            .map(|vt| vt.size_in_bits())
            .collect();
        assert_eq!(widths, vec![1, 8, 16, 24, 32, 64, 128]);
    }

    #[test]
    fn test_floating_point_prefers_f128() {
        assert_eq!(SimpleValueType::floating_point(128), SimpleValueType::F128);
    }

    #[test]
    #[should_panic(expected = "non-vector")]
    fn test_vector_accessor_on_scalar_panics() {
        SimpleValueType::I8.vector_element_type();
    }

    #[test]
    #[should_panic(expected = "no fixed size")]
    fn test_size_of_chain_panics() {
        SimpleValueType::Other.size_in_bits();
    }
}
