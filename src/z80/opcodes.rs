// This module defines the Z80 machine opcodes produced by selection and InstrInfo, the
// instruction description the subtarget owns. Opcode names follow the usual Z80 backend
// convention: the width, then operand letters (r register, i immediate, a accumulator,
// m/g absolute memory and general register, o/p indexed offset and pointer through HL).
// Each opcode carries an assembly template for diagnostics. InstrInfo also owns the
// RegisterInfo, so it is constructed first and lowering reads the register layout from it.

//! Z80 machine opcodes.

use super::register_info::RegisterInfo;
use crate::core::dag::MachineOpcode;

macro_rules! z80_opcodes {
    ($($op:ident => $asm:literal,)*) => {
        #[allow(non_camel_case_types)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum Z80Opcode {
            $($op,)*
        }

        impl Z80Opcode {
            pub const ALL: &'static [Z80Opcode] = &[$(Z80Opcode::$op,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(Z80Opcode::$op => stringify!($op),)*
                }
            }

            /// Assembly template, `$n` standing for operand `n`.
            pub fn asm(self) -> &'static str {
                match self {
                    $(Z80Opcode::$op => $asm,)*
                }
            }
        }
    };
}

z80_opcodes! {
    LD8ri => "ld $r, $0",
    LD16ri => "ld $r, $0",
    LD24ri => "ld $r, $0",
    LD8am => "ld a, ($1)",
    LD16am => "ld $r, ($1)",
    LD24am => "ld $r, ($1)",
    LD8go => "ld $r, ($1 + $2)",
    LD16go => "ld $r, ($1 + $2)",
    LD24go => "ld $r, ($1 + $2)",
    LD8gp => "ld $r, ($1)",
    LD16gp => "ld $r, ($1)",
    LD24gp => "ld $r, ($1)",
    LD8ma => "ld ($2), a",
    LD16ma => "ld ($2), $1",
    LD24ma => "ld ($2), $1",
    LD8og => "ld ($2 + $3), $1",
    LD16og => "ld ($2 + $3), $1",
    LD24og => "ld ($2 + $3), $1",
    LD8pg => "ld ($2), $1",
    LD16pg => "ld ($2), $1",
    LD24pg => "ld ($2), $1",
    LEA16ro => "lea $r, $0 + $1",
    LEA24ro => "lea $r, $0 + $1",
    ADD16fi => "ld $r, $0 + $1 \\ add $r, sp",
    ADD8ar => "add a, $1",
    ADD8ai => "add a, $1",
    ADD16aa => "add hl, $1",
    ADD24aa => "add hl, $1",
    SUB8ar => "sub a, $1",
    SUB8ai => "sub a, $1",
    SBC16aa => "or a, a \\ sbc hl, $1",
    SBC24aa => "or a, a \\ sbc hl, $1",
    INC8r => "inc $0",
    DEC8r => "dec $0",
    INC16r => "inc $0",
    DEC16r => "dec $0",
    INC24r => "inc $0",
    DEC24r => "dec $0",
    AND8ar => "and a, $1",
    AND8ai => "and a, $1",
    OR8ar => "or a, $1",
    OR8ai => "or a, $1",
    XOR8ar => "xor a, $1",
    XOR8ai => "xor a, $1",
    CPL => "cpl",
    SLA8r => "sla $0",
    SRL8r => "srl $0",
    SRA8r => "sra $0",
    SLL8r => "sll $0",
    MLT8rr => "mlt $0",
    RET => "ret",
}

impl Z80Opcode {
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.name() == name)
    }

    pub fn from_id(id: u16) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn id(self) -> u16 {
        self as u16
    }
}

impl From<Z80Opcode> for MachineOpcode {
    fn from(op: Z80Opcode) -> Self {
        MachineOpcode {
            id: op.id(),
            name: op.name(),
        }
    }
}

/// Machine name lookup for the textual DAG reader.
pub fn machine_opcode(name: &str) -> Option<MachineOpcode> {
    Z80Opcode::from_name(name).map(MachineOpcode::from)
}

/// Instruction description of a subtarget.
#[derive(Debug, Clone)]
pub struct InstrInfo {
    register_info: RegisterInfo,
}

impl InstrInfo {
    pub fn new(register_info: RegisterInfo) -> Self {
        Self { register_info }
    }

    pub fn register_info(&self) -> &RegisterInfo {
        &self.register_info
    }

    pub fn opcode(&self, opcode: MachineOpcode) -> Option<Z80Opcode> {
        Z80Opcode::from_id(opcode.id).filter(|op| op.name() == opcode.name)
    }

    pub fn asm_template(&self, opcode: MachineOpcode) -> Option<&'static str> {
        self.opcode(opcode).map(Z80Opcode::asm)
    }

    pub fn num_opcodes(&self) -> usize {
        Z80Opcode::ALL.len()
    }
}
