// This module resolves the memory-addressing forms used by load and store patterns. Given the
// value that computes an address, select_mem folds an absolute address: an integer constant
// becomes an immediate of the target's address-immediate width, a global address becomes a
// symbol reference with its offset, and an external symbol becomes a symbol reference.
// select_off folds a based address: a frame index becomes a stack slot with a zero offset,
// and an add tries to fold each operand as an absolute displacement while the other one
// serves as the base, first the right-hand operand and then the left. A base that is itself
// a frame index becomes a stack slot. Resolution only reads the DAG; the target leaves that
// carry the folded pieces are created by the pattern that commits. A failed resolution makes
// the pattern fail so a more general pattern can be tried.

//! Addressing-mode resolution.

use crate::core::dag::{sign_extend, IsdOpcode, NodeData, Opcode, SdValue, SelectionDag};
use crate::core::value_type::SimpleValueType;
use log::trace;
use std::fmt;

/// Types the addressing forms are built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressTypes {
    /// Type of pointers and of symbol references.
    pub pointer: SimpleValueType,
    /// Width of folded constant addresses.
    pub immediate: SimpleValueType,
    /// Type of the zero offset attached to a stack slot.
    pub frame_offset: SimpleValueType,
}

/// Absolute part of an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Displacement {
    Immediate {
        value: i64,
        ty: SimpleValueType,
    },
    Global {
        symbol: String,
        offset: i64,
        ty: SimpleValueType,
    },
    External {
        symbol: String,
        ty: SimpleValueType,
    },
}

impl Displacement {
    pub fn ty(&self) -> SimpleValueType {
        match self {
            Displacement::Immediate { ty, .. }
            | Displacement::Global { ty, .. }
            | Displacement::External { ty, .. } => *ty,
        }
    }
}

impl fmt::Display for Displacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Displacement::Immediate { value, ty } => write!(f, "{value}:{ty}"),
            Displacement::Global { symbol, offset, .. } if *offset != 0 => {
                write!(f, "@{symbol}{offset:+}")
            }
            Displacement::Global { symbol, .. } => write!(f, "@{symbol}"),
            Displacement::External { symbol, .. } => write!(f, "'{symbol}'"),
        }
    }
}

/// Base of an indexed address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressBase {
    /// A value held in a register.
    Register(SdValue),
    /// A stack slot.
    Frame(i32),
}

/// A resolved memory operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressMode {
    Absolute(Displacement),
    Indexed {
        base: AddressBase,
        offset: Displacement,
    },
}

/// Fold an absolute address.
pub fn select_mem(
    dag: &SelectionDag<'_>,
    types: &AddressTypes,
    addr: SdValue,
) -> Option<Displacement> {
    let node = dag.node(addr.node);
    let disp = match (node.opcode(), node.data()) {
        (Opcode::Isd(IsdOpcode::Constant), NodeData::Constant(value)) => {
            if !dag.value_type(addr).is_scalar_integer() {
                return None;
            }
            let ty = types.immediate;
            Displacement::Immediate {
                value: sign_extend(*value, ty.size_in_bits()),
                ty,
            }
        }
        (Opcode::Isd(IsdOpcode::GlobalAddress), NodeData::Global { symbol, offset }) => {
            Displacement::Global {
                symbol: symbol.clone(),
                offset: *offset,
                ty: types.pointer,
            }
        }
        (Opcode::Isd(IsdOpcode::ExternalSymbol), NodeData::External(symbol)) => {
            Displacement::External {
                symbol: symbol.clone(),
                ty: types.pointer,
            }
        }
        _ => return None,
    };
    trace!("  mem {} -> {}", addr, disp);
    Some(disp)
}

fn frame_index(dag: &SelectionDag<'_>, value: SdValue) -> Option<i32> {
    let node = dag.node(value.node);
    match (node.opcode(), node.data()) {
        (Opcode::Isd(IsdOpcode::FrameIndex), NodeData::FrameIndex(index)) => Some(*index),
        _ => None,
    }
}

/// Fold a based address.
pub fn select_off(
    dag: &SelectionDag<'_>,
    types: &AddressTypes,
    addr: SdValue,
) -> Option<(AddressBase, Displacement)> {
    if let Some(index) = frame_index(dag, addr) {
        trace!("  off {} -> frame {}", addr, index);
        let zero = Displacement::Immediate {
            value: 0,
            ty: types.frame_offset,
        };
        return Some((AddressBase::Frame(index), zero));
    }

    let node = dag.node(addr.node);
    if node.opcode() != Opcode::Isd(IsdOpcode::Add) || node.operands().len() != 2 {
        return None;
    }
    for i in 0..2 {
        let base = node.operand(i);
        let Some(disp) = select_mem(dag, types, node.operand(i ^ 1)) else {
            continue;
        };
        let base = match frame_index(dag, base) {
            Some(index) => AddressBase::Frame(index),
            None => AddressBase::Register(base),
        };
        trace!("  off {} -> {:?} + {}", addr, base, disp);
        return Some((base, disp));
    }
    None
}

/// Fold any supported address, absolute forms first.
pub fn select_address(
    dag: &SelectionDag<'_>,
    types: &AddressTypes,
    addr: SdValue,
) -> Option<AddressMode> {
    if let Some(disp) = select_mem(dag, types, addr) {
        return Some(AddressMode::Absolute(disp));
    }
    select_off(dag, types, addr).map(|(base, offset)| AddressMode::Indexed { base, offset })
}
