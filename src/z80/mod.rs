// This module is the Z80 target strategy handed to the generic selection driver. Z80Target
// bundles a Subtarget with the pattern table built from z80_patterns and implements
// SelectionTarget on top of them: the subtarget guards the patterns, its lowering supplies
// the addressing types, and inline-assembly memory operands are reported as unimplemented
// for this target instead of being selected. A Z80Target is immutable, so one instance
// serves any number of threads selecting their own functions.

//! Z80 / Z180 / eZ80 target.

pub mod lowering;
pub mod opcodes;
pub mod patterns;
pub mod register_info;
pub mod subtarget;

pub use lowering::TargetLowering;
pub use opcodes::{machine_opcode, InstrInfo, Z80Opcode};
pub use patterns::z80_patterns;
pub use register_info::{Register, RegisterClass, RegisterInfo};
pub use subtarget::{Arch, FeatureSet, PointerMode, Subtarget, SubtargetError, TargetTriple};

use crate::core::dag::{SdValue, SelectionDag};
use crate::core::error::{IselError, IselResult};
use crate::core::value_type::ValueType;
use crate::isel::{AddressTypes, PatternTable, SelectionTarget};

/// Selection strategy for one Z80 configuration.
#[derive(Debug)]
pub struct Z80Target {
    subtarget: Subtarget,
    patterns: PatternTable<Subtarget>,
}

impl Z80Target {
    pub fn new(subtarget: Subtarget) -> Self {
        let patterns = PatternTable::new(z80_patterns());
        log::debug!("Z80 pattern table: {} patterns", patterns.len());
        Self {
            subtarget,
            patterns,
        }
    }
}

impl SelectionTarget for Z80Target {
    type Subtarget = Subtarget;

    fn subtarget(&self) -> &Subtarget {
        &self.subtarget
    }

    fn patterns(&self) -> &PatternTable<Subtarget> {
        &self.patterns
    }

    fn address_types(&self) -> AddressTypes {
        self.subtarget.target_lowering().address_types()
    }

    fn is_type_legal(&self, ty: ValueType<'_>) -> bool {
        self.subtarget.target_lowering().is_type_legal(ty)
    }

    fn select_inline_asm_memory_operand(
        &self,
        _dag: &SelectionDag<'_>,
        op: SdValue,
        constraint: char,
    ) -> IselResult<Vec<SdValue>> {
        log::debug!("inline asm memory operand {} ('{}') requested", op, constraint);
        Err(IselError::Unimplemented {
            operation: "inline asm memory operand selection",
        })
    }
}
