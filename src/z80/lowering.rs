// This module provides TargetLowering, the value-lowering facts selection relies on. It is
// built from an already constructed RegisterInfo: every legal scalar type is the one that a
// register class of the same width can hold, so the legal-type table comes straight from the
// register layout. It also fixes the types of the addressing forms: pointers (and folded
// constant addresses) are i16 or i24 depending on the pointer mode, while the offset paired
// with a stack slot is an i8 index displacement.

//! Z80 value lowering.

use super::register_info::{RegisterClass, RegisterInfo};
use super::subtarget::PointerMode;
use crate::core::value_type::{SimpleValueType, ValueType};
use crate::isel::AddressTypes;

#[derive(Debug, Clone)]
pub struct TargetLowering {
    mode: PointerMode,
    legal: Vec<(SimpleValueType, RegisterClass)>,
}

impl TargetLowering {
    pub fn new(register_info: &RegisterInfo, mode: PointerMode) -> Self {
        let mut legal = Vec::new();
        for class in register_info.classes() {
            let Some(ty) = SimpleValueType::integer(class.size_in_bits()) else {
                continue;
            };
            // The first class of a width is the one values get allocated to.
            if !legal.iter().any(|(t, _)| *t == ty) {
                legal.push((ty, class));
            }
        }
        log::trace!("legal types for {:?}: {:?}", mode, legal);
        Self { mode, legal }
    }

    pub fn pointer_ty(&self) -> SimpleValueType {
        match self.mode {
            PointerMode::Bits16 => SimpleValueType::I16,
            PointerMode::Bits24 => SimpleValueType::I24,
        }
    }

    /// Width of constant addresses folded into memory operands.
    pub fn address_immediate_ty(&self) -> SimpleValueType {
        self.pointer_ty()
    }

    /// Type of the displacement attached to a stack slot.
    pub fn frame_offset_ty(&self) -> SimpleValueType {
        SimpleValueType::I8
    }

    pub fn register_class_for(&self, ty: ValueType<'_>) -> Option<RegisterClass> {
        let ValueType::Simple(ty) = ty else {
            return None;
        };
        self.legal
            .iter()
            .find(|(t, _)| *t == ty)
            .map(|(_, class)| *class)
    }

    pub fn is_type_legal(&self, ty: ValueType<'_>) -> bool {
        self.register_class_for(ty).is_some()
    }

    pub fn address_types(&self) -> AddressTypes {
        AddressTypes {
            pointer: self.pointer_ty(),
            immediate: self.address_immediate_ty(),
            frame_offset: self.frame_offset_ty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value_type::TypeContext;
    use SimpleValueType::*;

    #[test]
    fn test_legal_types_follow_register_layout() {
        let ctx = TypeContext::new();
        let regs = RegisterInfo::new(PointerMode::Bits16, true);
        let lowering = TargetLowering::new(&regs, PointerMode::Bits16);

        assert_eq!(lowering.register_class_for(I8.into()), Some(RegisterClass::R8));
        assert_eq!(lowering.register_class_for(I16.into()), Some(RegisterClass::R16));
        assert!(!lowering.is_type_legal(I24.into()));
        assert!(!lowering.is_type_legal(F32.into()));
        assert!(!lowering.is_type_legal(ValueType::integer(&ctx, 12)));
        assert_eq!(lowering.pointer_ty(), I16);
    }

    #[test]
    fn test_24_bit_mode_types() {
        let regs = RegisterInfo::new(PointerMode::Bits24, true);
        let lowering = TargetLowering::new(&regs, PointerMode::Bits24);
        assert_eq!(lowering.register_class_for(I24.into()), Some(RegisterClass::R24));
        assert_eq!(
            lowering.address_types(),
            AddressTypes {
                pointer: I24,
                immediate: I24,
                frame_offset: I8,
            }
        );
    }
}
