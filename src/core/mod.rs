// This module is the hub for the target-independent pieces of the selector: the machine
// value type model shared by every target, the selection DAG that selection rewrites in
// place, the error taxonomy for fatal selection failures, and the per-thread session that
// collects selection statistics. Target code (z80) and the generic driver (isel) build on
// these and never reach around them.

//! Core selection infrastructure
//!
//! # Key Components
//!
//! ## Value Types (`value_type`)
//! - Compact `SimpleValueType` enumeration answered from static tables
//! - Interned extended types owned by a thread-safe `TypeContext`
//!
//! ## Selection DAG (`dag`)
//! - Dense node storage with use counts
//! - In-place morphing into machine nodes
//!
//! ## Session (`session`)
//! - Per-thread statistics with interior mutability

pub mod dag;
pub mod error;
pub mod session;
pub mod value_type;

pub use dag::{
    IsdOpcode, MachineOpcode, NodeData, NodeId, NodeState, Opcode, SdNode, SdValue,
    SelectionDag,
};
pub use error::{IselError, IselResult};
pub use session::{IselSession, SelectionStats};
pub use value_type::{
    ExtendedType, RawBitsKey, SimpleValueType, TypeContext, ValueType, MAX_INT_BITS,
};
