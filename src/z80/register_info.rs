// This module describes the Z80 register file as seen by instruction selection. It lists the
// physical registers (8-bit halves, the index-register halves, the 16-bit pairs and their
// 24-bit eZ80 extensions) and groups them into the register classes value lowering maps
// legal types onto: R8 and R16 always exist, I8 (the IXH/IXL/IYH/IYL halves) only when the
// target can address index halves, and R24/I24 only in 24-bit mode.

//! Z80 registers and register classes.

use super::subtarget::PointerMode;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    A,
    B,
    C,
    D,
    E,
    H,
    L,
    IXH,
    IXL,
    IYH,
    IYL,
    BC,
    DE,
    HL,
    IX,
    IY,
    UBC,
    UDE,
    UHL,
    UIX,
    UIY,
}

impl Register {
    pub fn name(self) -> &'static str {
        use Register::*;
        match self {
            A => "a",
            B => "b",
            C => "c",
            D => "d",
            E => "e",
            H => "h",
            L => "l",
            IXH => "ixh",
            IXL => "ixl",
            IYH => "iyh",
            IYL => "iyl",
            BC => "bc",
            DE => "de",
            HL => "hl",
            IX => "ix",
            IY => "iy",
            UBC => "ubc",
            UDE => "ude",
            UHL => "uhl",
            UIX => "uix",
            UIY => "uiy",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterClass {
    R8,
    I8,
    R16,
    I16,
    R24,
    I24,
}

impl RegisterClass {
    pub fn size_in_bits(self) -> u32 {
        match self {
            RegisterClass::R8 | RegisterClass::I8 => 8,
            RegisterClass::R16 | RegisterClass::I16 => 16,
            RegisterClass::R24 | RegisterClass::I24 => 24,
        }
    }
}

const R8: &[Register] = &[
    Register::A,
    Register::B,
    Register::C,
    Register::D,
    Register::E,
    Register::H,
    Register::L,
];
const I8: &[Register] = &[Register::IXH, Register::IXL, Register::IYH, Register::IYL];
const R16: &[Register] = &[Register::BC, Register::DE, Register::HL];
const I16: &[Register] = &[Register::IX, Register::IY];
const R24: &[Register] = &[Register::UBC, Register::UDE, Register::UHL];
const I24: &[Register] = &[Register::UIX, Register::UIY];

/// Register layout of one subtarget.
#[derive(Debug, Clone)]
pub struct RegisterInfo {
    classes: Vec<(RegisterClass, &'static [Register])>,
}

impl RegisterInfo {
    pub fn new(mode: PointerMode, has_index_half_regs: bool) -> Self {
        let mut classes = vec![(RegisterClass::R8, R8)];
        if has_index_half_regs {
            classes.push((RegisterClass::I8, I8));
        }
        classes.push((RegisterClass::R16, R16));
        classes.push((RegisterClass::I16, I16));
        if mode == PointerMode::Bits24 {
            classes.push((RegisterClass::R24, R24));
            classes.push((RegisterClass::I24, I24));
        }
        Self { classes }
    }

    pub fn has_class(&self, class: RegisterClass) -> bool {
        self.class_members(class).is_some()
    }

    pub fn class_members(&self, class: RegisterClass) -> Option<&'static [Register]> {
        self.classes
            .iter()
            .find(|(c, _)| *c == class)
            .map(|(_, members)| *members)
    }

    /// Available classes, narrowest first.
    pub fn classes(&self) -> impl Iterator<Item = RegisterClass> + '_ {
        self.classes.iter().map(|(class, _)| *class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classes_follow_mode_and_features() {
        let plain = RegisterInfo::new(PointerMode::Bits16, false);
        assert!(plain.has_class(RegisterClass::R8));
        assert!(!plain.has_class(RegisterClass::I8));
        assert!(!plain.has_class(RegisterClass::R24));

        let adl = RegisterInfo::new(PointerMode::Bits24, true);
        assert_eq!(adl.class_members(RegisterClass::I8).map(<[_]>::len), Some(4));
        assert!(adl.has_class(RegisterClass::I24));
        let names: Vec<_> = adl
            .class_members(RegisterClass::I24)
            .unwrap()
            .iter()
            .map(Register::to_string)
            .collect();
        assert_eq!(names, ["uix", "uiy"]);
    }
}
