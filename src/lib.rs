//! Z80 instruction selection.
//!
//! The instruction-selection core of a Z80 / Z180 / eZ80 code generator: machine value
//! types, the Z80 capability descriptor and a pattern-table driven DAG-to-DAG selector
//! with addressing-mode folding.
//!
//! # Primary Usage
//!
//! ```
//! use z80_isel::core::{IselSession, TypeContext};
//! use z80_isel::dag_text::parse_dag;
//! use z80_isel::isel::InstructionSelector;
//! use z80_isel::z80::{Arch, FeatureSet, Subtarget, TargetTriple, Z80Target};
//!
//! let subtarget = Subtarget::new(TargetTriple::new(Arch::EZ80), FeatureSet::default())?;
//! let target = Z80Target::new(subtarget);
//!
//! let ctx = TypeContext::new();
//! let mut parsed = parse_dag(
//!     "t0: ch = EntryToken\n\
//!      t1: i24 = FrameIndex<1>\n\
//!      t2: i24,ch = load t0, t1\n\
//!      t3: ch = ret t2:1, t2\n\
//!      root t3\n",
//!     &ctx,
//! )?;
//!
//! let session = IselSession::new();
//! InstructionSelector::new(&target, &session).select_function(&mut parsed.dag, &parsed.order)?;
//! assert!(parsed.dag.to_string().contains("LD24go"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! - [`core`] - Value types, the selection DAG, errors and session statistics
//! - [`isel`] - Target-independent selection driver, patterns and addressing modes
//! - [`z80`] - Z80 subtarget, opcodes and pattern table
//! - [`dag_text`] - Textual DAG reader

pub mod core;
pub mod dag_text;
pub mod isel;
pub mod z80;

pub use crate::core::{
    IselError, IselResult, IselSession, SelectionDag, SelectionStats, SimpleValueType,
    TypeContext, ValueType,
};
pub use crate::isel::{InstructionSelector, SelectionTarget};
pub use crate::z80::{FeatureSet, Subtarget, Z80Target};
