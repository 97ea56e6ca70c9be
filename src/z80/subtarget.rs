// This module implements Subtarget, the read-only capability descriptor for one Z80 target
// configuration. It is built once from a target triple and an already parsed FeatureSet:
// the ez80 architecture implies the eZ80 instruction set and defaults to 24-bit pointers,
// plain z80 defaults to 16-bit pointers, and asking for 24-bit mode without eZ80 support is
// rejected. The pointer mode is an enum, so exactly one mode is always in effect. The
// index-half-register capability is derived as undocumented ops or eZ80 ops. Construction
// builds InstrInfo (and with it the RegisterInfo) before TargetLowering because lowering
// derives its legal types from the register layout. Nothing is mutable after construction,
// so one Subtarget can be shared by every thread selecting functions for that target.

//! Z80 capability descriptor.

use super::lowering::TargetLowering;
use super::opcodes::InstrInfo;
use super::register_info::{RegisterClass, RegisterInfo};
use log::debug;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubtargetError {
    #[error("unknown architecture '{0}' in target triple")]
    UnknownArch(String),

    #[error("24-bit mode requires the eZ80 instruction set")]
    Mode24RequiresEz80,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Z80,
    EZ80,
}

impl Arch {
    pub fn name(self) -> &'static str {
        match self {
            Arch::Z80 => "z80",
            Arch::EZ80 => "ez80",
        }
    }
}

/// `arch[-vendor[-os[-environment]]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTriple {
    arch: Arch,
    vendor: String,
    os: String,
    environment: String,
}

impl TargetTriple {
    pub fn new(arch: Arch) -> Self {
        Self {
            arch,
            vendor: "unknown".to_string(),
            os: "unknown".to_string(),
            environment: String::new(),
        }
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }
}

impl FromStr for TargetTriple {
    type Err = SubtargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('-');
        let arch = match parts.next().unwrap_or_default() {
            "z80" => Arch::Z80,
            "ez80" => Arch::EZ80,
            other => return Err(SubtargetError::UnknownArch(other.to_string())),
        };
        let mut triple = TargetTriple::new(arch);
        if let Some(vendor) = parts.next() {
            triple.vendor = vendor.to_string();
        }
        if let Some(os) = parts.next() {
            triple.os = os.to_string();
        }
        let rest: Vec<_> = parts.collect();
        triple.environment = rest.join("-");
        Ok(triple)
    }
}

impl fmt::Display for TargetTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.arch.name(), self.vendor, self.os)?;
        if !self.environment.is_empty() {
            write!(f, "-{}", self.environment)?;
        }
        Ok(())
    }
}

/// Pointer width mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerMode {
    Bits16,
    Bits24,
}

/// Feature selection, already parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureSet {
    pub undoc_ops: bool,
    pub z180_ops: bool,
    pub ez80_ops: bool,
    /// Pointer mode; the architecture default when unset.
    pub mode: Option<PointerMode>,
}

#[derive(Debug)]
pub struct Subtarget {
    triple: TargetTriple,
    mode: PointerMode,
    has_undoc_ops: bool,
    has_z180_ops: bool,
    has_ez80_ops: bool,
    instr_info: InstrInfo,
    lowering: TargetLowering,
}

impl Subtarget {
    pub fn new(triple: TargetTriple, features: FeatureSet) -> Result<Self, SubtargetError> {
        let has_ez80_ops = features.ez80_ops || triple.arch() == Arch::EZ80;
        let mode = features.mode.unwrap_or(match triple.arch() {
            Arch::EZ80 => PointerMode::Bits24,
            Arch::Z80 => PointerMode::Bits16,
        });
        if mode == PointerMode::Bits24 && !has_ez80_ops {
            return Err(SubtargetError::Mode24RequiresEz80);
        }
        let has_index_half_regs = features.undoc_ops || has_ez80_ops;

        let instr_info = InstrInfo::new(RegisterInfo::new(mode, has_index_half_regs));
        let lowering = TargetLowering::new(instr_info.register_info(), mode);

        debug!(
            "Subtarget {}: mode {:?}, undoc {}, z180 {}, ez80 {}",
            triple, mode, features.undoc_ops, features.z180_ops, has_ez80_ops
        );
        Ok(Self {
            triple,
            mode,
            has_undoc_ops: features.undoc_ops,
            has_z180_ops: features.z180_ops,
            has_ez80_ops,
            instr_info,
            lowering,
        })
    }

    pub fn triple(&self) -> &TargetTriple {
        &self.triple
    }

    pub fn mode(&self) -> PointerMode {
        self.mode
    }

    pub fn is_16bit(&self) -> bool {
        self.mode == PointerMode::Bits16
    }

    pub fn is_24bit(&self) -> bool {
        self.mode == PointerMode::Bits24
    }

    pub fn has_undoc_ops(&self) -> bool {
        self.has_undoc_ops
    }

    pub fn has_z180_ops(&self) -> bool {
        self.has_z180_ops
    }

    pub fn has_ez80_ops(&self) -> bool {
        self.has_ez80_ops
    }

    /// IXH, IXL, IYH and IYL are addressable.
    pub fn has_index_half_regs(&self) -> bool {
        self.register_info().has_class(RegisterClass::I8)
    }

    pub fn has_24bit_ez80_ops(&self) -> bool {
        self.is_24bit() && self.has_ez80_ops
    }

    pub fn has_16bit_ez80_ops(&self) -> bool {
        self.is_16bit() && self.has_ez80_ops
    }

    pub fn instr_info(&self) -> &InstrInfo {
        &self.instr_info
    }

    pub fn register_info(&self) -> &RegisterInfo {
        self.instr_info.register_info()
    }

    pub fn target_lowering(&self) -> &TargetLowering {
        &self.lowering
    }
}
