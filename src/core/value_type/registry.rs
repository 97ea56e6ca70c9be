// This module implements TypeContext, the registry that owns every extended value type. An
// extended type describes a shape the compact enumeration cannot (i12345, v3i17, v5i24, ...)
// and is interned: the same logical type always yields the same handle, so handle identity
// is type identity. Type objects live in a bumpalo arena guarded by a mutex, which lets
// independent selection passes on different threads intern concurrently while handing out
// plain shared references that stay valid for the lifetime of the context. Vector elements
// are canonicalized into the owning context before interning so a handle never points into
// another registry.

//! Interned extended value types.

use super::simple::SimpleValueType;
use super::ValueType;
use bumpalo::Bump;
use hashbrown::HashMap;
use std::fmt;
use std::ptr::NonNull;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Widest integer type a context will create, in bits.
pub const MAX_INT_BITS: u32 = 1 << 24;

/// Shape of an extended type.
#[derive(Debug, Clone, Copy)]
pub enum ExtendedKind<'ctx> {
    /// Integer of arbitrary width.
    Integer { bits: u32 },
    /// Vector whose shape has no compact entry.
    Vector { element: ValueType<'ctx>, count: u32 },
}

/// A type object owned by a [`TypeContext`].
///
/// Value types refer to these by shared reference only; the context is the
/// single owner.
#[derive(Debug)]
pub struct ExtendedType<'ctx> {
    kind: ExtendedKind<'ctx>,
    id: u32,
}

impl<'ctx> ExtendedType<'ctx> {
    pub fn kind(&self) -> ExtendedKind<'ctx> {
        self.kind
    }

    /// Interning sequence number within the owning context.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn size_in_bits(&self) -> u32 {
        match self.kind {
            ExtendedKind::Integer { bits } => bits,
            ExtendedKind::Vector { element, count } => element.size_in_bits() * count,
        }
    }

    pub fn is_integer(&self) -> bool {
        match self.kind {
            ExtendedKind::Integer { .. } => true,
            ExtendedKind::Vector { element, .. } => element.is_integer(),
        }
    }

    pub fn is_scalar_integer(&self) -> bool {
        matches!(self.kind, ExtendedKind::Integer { .. })
    }

    pub fn is_floating_point(&self) -> bool {
        match self.kind {
            ExtendedKind::Integer { .. } => false,
            ExtendedKind::Vector { element, .. } => element.is_floating_point(),
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(self.kind, ExtendedKind::Vector { .. })
    }

    pub fn vector_element_type(&self) -> Option<ValueType<'ctx>> {
        match self.kind {
            ExtendedKind::Vector { element, .. } => Some(element),
            ExtendedKind::Integer { .. } => None,
        }
    }

    pub fn vector_num_elements(&self) -> Option<u32> {
        match self.kind {
            ExtendedKind::Vector { count, .. } => Some(count),
            ExtendedKind::Integer { .. } => None,
        }
    }
}

impl fmt::Display for ExtendedType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ExtendedKind::Integer { bits } => write!(f, "i{bits}"),
            ExtendedKind::Vector { element, count } => write!(f, "v{count}{element}"),
        }
    }
}

/// Intern key for a vector element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ElementKey {
    Simple(SimpleValueType),
    Integer(u32),
}

type TypePtr = NonNull<ExtendedType<'static>>;

struct Interner {
    arena: Bump,
    integers: HashMap<u32, TypePtr>,
    vectors: HashMap<(ElementKey, u32), TypePtr>,
    next_id: u32,
}

// SAFETY: every pointer refers to an allocation owned by `arena`, which moves
// together with the maps, and the pointees are never mutated after creation.
unsafe impl Send for Interner {}

impl Interner {
    fn alloc(&mut self, kind: ExtendedKind<'static>) -> TypePtr {
        let id = self.next_id;
        self.next_id += 1;
        NonNull::from(self.arena.alloc(ExtendedType { kind, id }))
    }

    fn intern_integer(&mut self, bits: u32) -> TypePtr {
        if let Some(&ptr) = self.integers.get(&bits) {
            return ptr;
        }
        let ptr = self.alloc(ExtendedKind::Integer { bits });
        self.integers.insert(bits, ptr);
        ptr
    }

    fn intern_vector(&mut self, element: ElementKey, count: u32) -> TypePtr {
        if let Some(&ptr) = self.vectors.get(&(element, count)) {
            return ptr;
        }
        let element_vt = match element {
            ElementKey::Simple(vt) => ValueType::Simple(vt),
            ElementKey::Integer(bits) => {
                let ptr = self.intern_integer(bits);
                // SAFETY: the element lives in this arena, which outlives the
                // vector type that refers to it.
                ValueType::Extended(unsafe { &*ptr.as_ptr() })
            }
        };
        let ptr = self.alloc(ExtendedKind::Vector {
            element: element_vt,
            count,
        });
        self.vectors.insert((element, count), ptr);
        ptr
    }
}

/// Total width of `count` elements of `element`, if it fits in a `u32`.
pub(super) fn vector_bits(element: ValueType<'_>, count: u32) -> Option<u32> {
    if !element.is_sized() {
        return None;
    }
    element.size_in_bits().checked_mul(count)
}

/// Owner and interner of extended value types.
///
/// A context is usually created once per compilation and shared by reference
/// with every pass that needs to build value types.
pub struct TypeContext {
    interner: Mutex<Interner>,
}

impl TypeContext {
    pub fn new() -> Self {
        Self {
            interner: Mutex::new(Interner {
                arena: Bump::new(),
                integers: HashMap::new(),
                vectors: HashMap::new(),
                next_id: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Interner> {
        // Interning never leaves the maps half-updated, so a poisoned lock is still usable.
        self.interner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Extended integer type of exactly `bits` bits.
    ///
    /// Panics unless `bits` is in `1..=MAX_INT_BITS`.
    pub fn integer_type(&self, bits: u32) -> &ExtendedType<'_> {
        assert!(bits > 0, "integer type must have a non-zero width");
        assert!(
            bits <= MAX_INT_BITS,
            "integer type i{bits} is wider than {MAX_INT_BITS} bits"
        );
        let ptr = self.lock().intern_integer(bits);
        // SAFETY: arena allocations are stable and live as long as `self`.
        unsafe { &*ptr.as_ptr() }
    }

    /// Extended vector type of `count` elements of `element`.
    ///
    /// The element must be a scalar: a simple type or an extended integer, and
    /// the total width must fit in a `u32`.
    pub fn vector_type(&self, element: ValueType<'_>, count: u32) -> &ExtendedType<'_> {
        assert!(count > 0, "vector type must have at least one element");
        let key = match element {
            ValueType::Simple(vt) => {
                assert!(
                    vt.is_sized() && !vt.is_vector(),
                    "invalid vector element type {vt}"
                );
                ElementKey::Simple(vt)
            }
            ValueType::Extended(ext) => match ext.kind() {
                ExtendedKind::Integer { bits } => ElementKey::Integer(bits),
                ExtendedKind::Vector { .. } => {
                    panic!("invalid vector element type {ext}")
                }
            },
        };
        assert!(
            vector_bits(element, count).is_some(),
            "vector type v{count}{element} is too wide"
        );
        let ptr = self.lock().intern_vector(key, count);
        // SAFETY: arena allocations are stable and live as long as `self`.
        unsafe { &*ptr.as_ptr() }
    }

    /// Number of extended types interned so far.
    pub fn len(&self) -> usize {
        self.lock().next_id as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TypeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeContext")
            .field("interned", &self.len())
            .finish()
    }
}
