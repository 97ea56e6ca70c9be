// This module is the Z80 pattern table, written in the form a pattern-database generator
// would emit: one entry per (generic opcode, guard, operand shape) with the machine opcode
// it selects. Leaves (constants, symbols, frame indices) are selected through root
// matchers; loads and stores come in absolute, indexed and register-indirect flavours for
// every legal integer width; arithmetic and logic have register, immediate and special
// constant forms (INC, DEC, CPL); shifts by one map onto the single-bit shift instructions.
// Capability guards keep MLT to Z180/eZ80 parts, SLL to parts with undocumented opcodes,
// LEA to eZ80 parts, and 24-bit forms to 24-bit mode. Precedence is left to the table's
// complexity ordering, with added complexity where two guarded forms otherwise tie.

//! Z80 selection patterns.

use super::opcodes::Z80Opcode::{self, *};
use super::subtarget::Subtarget;
use crate::core::dag::IsdOpcode;
use crate::core::value_type::SimpleValueType::{self, I16, I24, I8};
use crate::isel::OperandMatcher::*;
use crate::isel::{Pattern, Predicate};

type Z80Pattern = Pattern<Subtarget>;

fn always() -> Predicate<Subtarget> {
    Predicate::always()
}

fn is_16bit() -> Predicate<Subtarget> {
    Predicate::new("Is16Bit", Subtarget::is_16bit)
}

fn is_24bit() -> Predicate<Subtarget> {
    Predicate::new("Is24Bit", Subtarget::is_24bit)
}

fn has_undoc_ops() -> Predicate<Subtarget> {
    Predicate::new("HasUndocOps", Subtarget::has_undoc_ops)
}

fn has_mlt() -> Predicate<Subtarget> {
    Predicate::new("HasZ180Ops|HasEZ80Ops", |st: &Subtarget| {
        st.has_z180_ops() || st.has_ez80_ops()
    })
}

fn has_16bit_ez80_ops() -> Predicate<Subtarget> {
    Predicate::new("Has16BitEZ80Ops", Subtarget::has_16bit_ez80_ops)
}

fn has_24bit_ez80_ops() -> Predicate<Subtarget> {
    Predicate::new("Has24BitEZ80Ops", Subtarget::has_24bit_ez80_ops)
}

struct Width {
    ty: SimpleValueType,
    guard: fn() -> Predicate<Subtarget>,
    imm: Z80Opcode,
    load: [Z80Opcode; 3],
    store: [Z80Opcode; 3],
}

const WIDTHS: [Width; 3] = [
    Width {
        ty: I8,
        guard: always,
        imm: LD8ri,
        load: [LD8am, LD8go, LD8gp],
        store: [LD8ma, LD8og, LD8pg],
    },
    Width {
        ty: I16,
        guard: always,
        imm: LD16ri,
        load: [LD16am, LD16go, LD16gp],
        store: [LD16ma, LD16og, LD16pg],
    },
    Width {
        ty: I24,
        guard: is_24bit,
        imm: LD24ri,
        load: [LD24am, LD24go, LD24gp],
        store: [LD24ma, LD24og, LD24pg],
    },
];

fn leaves(patterns: &mut Vec<Z80Pattern>) {
    for width in &WIDTHS {
        patterns.push(
            Pattern::new(IsdOpcode::Constant, width.imm)
                .result(width.ty)
                .requires((width.guard)())
                .root(Imm),
        );
    }

    // Symbols are pointer sized.
    for (leaf, op, name, ty, guard) in [
        (IsdOpcode::GlobalAddress, LD16ri, "LD16ri_global", I16, is_16bit as fn() -> _),
        (IsdOpcode::GlobalAddress, LD24ri, "LD24ri_global", I24, is_24bit),
        (IsdOpcode::ExternalSymbol, LD16ri, "LD16ri_external", I16, is_16bit),
        (IsdOpcode::ExternalSymbol, LD24ri, "LD24ri_external", I24, is_24bit),
    ] {
        patterns.push(
            Pattern::new(leaf, op)
                .named(name)
                .result(ty)
                .requires(guard())
                .root(Mem),
        );
    }

    patterns.push(
        Pattern::new(IsdOpcode::FrameIndex, LEA16ro)
            .result(I16)
            .requires(has_16bit_ez80_ops())
            .root(Off)
            .added_complexity(1),
    );
    patterns.push(
        Pattern::new(IsdOpcode::FrameIndex, ADD16fi)
            .result(I16)
            .requires(is_16bit())
            .root(Off),
    );
    patterns.push(
        Pattern::new(IsdOpcode::FrameIndex, LEA24ro)
            .result(I24)
            .requires(has_24bit_ez80_ops())
            .root(Off),
    );
}

fn memory(patterns: &mut Vec<Z80Pattern>) {
    for width in &WIDTHS {
        let [absolute, indexed, indirect] = width.load;
        patterns.push(
            Pattern::new(IsdOpcode::Load, absolute)
                .result(width.ty)
                .requires((width.guard)())
                .operands(&[Chain, Mem]),
        );
        patterns.push(
            Pattern::new(IsdOpcode::Load, indexed)
                .result(width.ty)
                .requires((width.guard)())
                .operands(&[Chain, Off]),
        );
        patterns.push(
            Pattern::new(IsdOpcode::Load, indirect)
                .result(width.ty)
                .requires((width.guard)())
                .operands(&[Chain, Reg]),
        );

        let [absolute, indexed, indirect] = width.store;
        patterns.push(
            Pattern::new(IsdOpcode::Store, absolute)
                .operand_type(1, width.ty)
                .requires((width.guard)())
                .operands(&[Chain, Reg, Mem]),
        );
        patterns.push(
            Pattern::new(IsdOpcode::Store, indexed)
                .operand_type(1, width.ty)
                .requires((width.guard)())
                .operands(&[Chain, Reg, Off]),
        );
        patterns.push(
            Pattern::new(IsdOpcode::Store, indirect)
                .operand_type(1, width.ty)
                .requires((width.guard)())
                .operands(&[Chain, Reg, Reg]),
        );
    }
}

fn arithmetic(patterns: &mut Vec<Z80Pattern>) {
    use IsdOpcode::{Add, And, Mul, Or, Shl, Sra, Srl, Sub, Xor};

    // 8-bit accumulator forms.
    for (opcode, reg, imm) in [
        (Add, ADD8ar, ADD8ai),
        (Sub, SUB8ar, SUB8ai),
        (And, AND8ar, AND8ai),
        (Or, OR8ar, OR8ai),
        (Xor, XOR8ar, XOR8ai),
    ] {
        patterns.push(Pattern::new(opcode, reg).result(I8).operands(&[Reg, Reg]));
        patterns.push(Pattern::new(opcode, imm).result(I8).operands(&[Reg, Imm]));
    }

    patterns.push(
        Pattern::new(Add, INC8r)
            .named("INC8r_add")
            .result(I8)
            .operands(&[Reg, ConstValue(1)]),
    );
    patterns.push(
        Pattern::new(Add, DEC8r)
            .named("DEC8r_add")
            .result(I8)
            .operands(&[Reg, ConstValue(-1)]),
    );
    patterns.push(
        Pattern::new(Sub, DEC8r)
            .named("DEC8r_sub")
            .result(I8)
            .operands(&[Reg, ConstValue(1)]),
    );
    patterns.push(Pattern::new(Xor, CPL).result(I8).operands(&[Reg, ConstValue(-1)]));

    // Wide forms work on HL, or UHL in 24-bit mode.
    for (ty, guard, add, sbc, inc, dec) in [
        (I16, always as fn() -> _, ADD16aa, SBC16aa, INC16r, DEC16r),
        (I24, is_24bit, ADD24aa, SBC24aa, INC24r, DEC24r),
    ] {
        patterns.push(
            Pattern::new(Add, add)
                .result(ty)
                .requires(guard())
                .operands(&[Reg, Reg]),
        );
        patterns.push(
            Pattern::new(Sub, sbc)
                .result(ty)
                .requires(guard())
                .operands(&[Reg, Reg]),
        );
        patterns.push(
            Pattern::new(Add, inc)
                .named(if ty == I16 { "INC16r_add" } else { "INC24r_add" })
                .result(ty)
                .requires(guard())
                .operands(&[Reg, ConstValue(1)]),
        );
        patterns.push(
            Pattern::new(Add, dec)
                .named(if ty == I16 { "DEC16r_add" } else { "DEC24r_add" })
                .result(ty)
                .requires(guard())
                .operands(&[Reg, ConstValue(-1)]),
        );
        patterns.push(
            Pattern::new(Sub, dec)
                .named(if ty == I16 { "DEC16r_sub" } else { "DEC24r_sub" })
                .result(ty)
                .requires(guard())
                .operands(&[Reg, ConstValue(1)]),
        );
    }

    for (opcode, op) in [(Shl, SLA8r), (Srl, SRL8r), (Sra, SRA8r)] {
        patterns.push(Pattern::new(opcode, op).result(I8).operands(&[Reg, ConstValue(1)]));
    }

    // sll shifts a one into bit 0.
    patterns.push(
        Pattern::new(Or, SLL8r)
            .result(I8)
            .requires(has_undoc_ops())
            .operands(&[Node(Shl, &[Reg, ConstValue(1)]), ConstValue(1)]),
    );

    patterns.push(
        Pattern::new(Mul, MLT8rr)
            .result(I8)
            .requires(has_mlt())
            .operands(&[Reg, Reg]),
    );
}

fn control(patterns: &mut Vec<Z80Pattern>) {
    patterns.push(Pattern::new(IsdOpcode::Ret, RET).operands(&[Chain]));
    patterns.push(
        Pattern::new(IsdOpcode::Ret, RET)
            .named("RET_value")
            .operands(&[Chain, Reg]),
    );
}

/// The full Z80 pattern list, in table order.
pub fn z80_patterns() -> Vec<Z80Pattern> {
    let mut patterns = Vec::new();
    leaves(&mut patterns);
    memory(&mut patterns);
    arithmetic(&mut patterns);
    control(&mut patterns);
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isel::PatternTable;

    #[test]
    fn test_every_pattern_is_named_uniquely() {
        let patterns = z80_patterns();
        let mut names: Vec<_> = patterns.iter().map(|p| p.name).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(names.len(), before);
    }

    #[test]
    fn test_special_forms_come_first() {
        let table = PatternTable::new(z80_patterns());
        let or: Vec<_> = table.candidates(IsdOpcode::Or).map(|p| p.name).collect();
        assert_eq!(or[0], "SLL8r");
        let add: Vec<_> = table.candidates(IsdOpcode::Add).map(|p| p.name).collect();
        let inc = add.iter().position(|n| *n == "INC8r_add").unwrap();
        let imm = add.iter().position(|n| *n == "ADD8ai").unwrap();
        let reg = add.iter().position(|n| *n == "ADD8ar").unwrap();
        assert!(inc < imm && imm < reg);
        let fi: Vec<_> = table.candidates(IsdOpcode::FrameIndex).map(|p| p.name).collect();
        assert_eq!(fi[0], "LEA16ro");
    }
}
