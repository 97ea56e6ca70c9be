// This module provides InstructionSelector, the generic driver that rewrites one function's
// selection DAG into machine nodes. The target is injected as a SelectionTarget, which hands
// out its capability descriptor, its pattern table, the types used for addressing forms and
// the inline-asm operand hook. The driver walks the caller's topological order from the end,
// so users are seen before their operands and a pattern can absorb operand sub-expressions
// (constants, symbols, frame indices, address arithmetic) before they would be selected on
// their own. Nodes that already carry a machine opcode are marked selected untouched, nodes
// whose last user absorbed them are tombstoned, and register/chain plumbing is left as is.
// Every other node must be matched by the first applicable pattern in precedence order;
// when none applies selection stops with a no-match error, which names the offending result
// type when the target cannot hold it. All per-function state lives in
// an IselContext created for one call and dropped at its end.

//! Instruction selection driver.
//!
//! ```
//! use z80_isel::core::{IselSession, TypeContext};
//! use z80_isel::dag_text::parse_dag;
//! use z80_isel::isel::InstructionSelector;
//! use z80_isel::z80::{FeatureSet, Subtarget, TargetTriple, Z80Target};
//!
//! let ctx = TypeContext::new();
//! let mut parsed = parse_dag(
//!     "t0: ch = EntryToken\n\
//!      t1: i8 = Constant<42>\n\
//!      t2: ch = ret t0, t1\n\
//!      root t2\n",
//!     &ctx,
//! )
//! .unwrap();
//!
//! let triple: TargetTriple = "z80".parse().unwrap();
//! let target = Z80Target::new(Subtarget::new(triple, FeatureSet::default()).unwrap());
//! let session = IselSession::new();
//! InstructionSelector::new(&target, &session)
//!     .select_function(&mut parsed.dag, &parsed.order)
//!     .unwrap();
//! assert!(parsed.dag.to_string().contains("LD8ri"));
//! ```

pub mod address;
pub mod pattern;

pub use address::{
    select_address, select_mem, select_off, AddressBase, AddressMode, AddressTypes, Displacement,
};
pub use pattern::{Emit, OperandMatcher, Pattern, PatternTable, Predicate, TypeCheck};

use crate::core::dag::{IsdOpcode, NodeData, NodeId, NodeState, Opcode, SdValue, SelectionDag};
use crate::core::error::{IselError, IselResult};
use crate::core::session::IselSession;
use crate::core::value_type::ValueType;
use log::{debug, trace};

/// Target strategy injected into the selection driver.
pub trait SelectionTarget: Sync {
    /// Capability descriptor the patterns are guarded by.
    type Subtarget;

    fn subtarget(&self) -> &Self::Subtarget;

    fn patterns(&self) -> &PatternTable<Self::Subtarget>;

    fn address_types(&self) -> AddressTypes;

    /// Whether values of type `ty` have a register class on this target.
    fn is_type_legal(&self, ty: ValueType<'_>) -> bool;

    /// Select the operands of an inline-asm memory reference.
    fn select_inline_asm_memory_operand(
        &self,
        dag: &SelectionDag<'_>,
        op: SdValue,
        constraint: char,
    ) -> IselResult<Vec<SdValue>>;
}

/// State of one `select_function` call.
pub struct IselContext<'a, 'ctx, S> {
    pub dag: &'a mut SelectionDag<'ctx>,
    pub subtarget: &'a S,
    pub types: AddressTypes,
}

impl<'ctx, S> IselContext<'_, 'ctx, S> {
    /// Materialize match results as operands of the rewritten node.
    fn emit_operands(&mut self, emits: Vec<Emit<'ctx>>) -> Vec<SdValue> {
        emits
            .into_iter()
            .map(|emit| {
                let id = match emit {
                    Emit::Value(value) => return value,
                    Emit::Constant { value, ty } => self.dag.target_constant(value, ty),
                    Emit::Displacement(disp) => self.displacement_leaf(disp),
                    Emit::Frame { index, ty } => self.dag.add_node(
                        Opcode::Isd(IsdOpcode::TargetFrameIndex),
                        vec![ValueType::Simple(ty)],
                        Vec::new(),
                        NodeData::FrameIndex(index),
                    ),
                };
                self.dag.mark_selected(id);
                SdValue::from(id)
            })
            .collect()
    }

    fn displacement_leaf(&mut self, disp: Displacement) -> NodeId {
        match disp {
            Displacement::Immediate { value, ty } => {
                self.dag.target_constant(value, ValueType::Simple(ty))
            }
            Displacement::Global { symbol, offset, ty } => self.dag.add_node(
                Opcode::Isd(IsdOpcode::TargetGlobalAddress),
                vec![ValueType::Simple(ty)],
                Vec::new(),
                NodeData::Global { symbol, offset },
            ),
            Displacement::External { symbol, ty } => self.dag.add_node(
                Opcode::Isd(IsdOpcode::TargetExternalSymbol),
                vec![ValueType::Simple(ty)],
                Vec::new(),
                NodeData::External(symbol),
            ),
        }
    }
}

/// Generic DAG-to-DAG instruction selector.
pub struct InstructionSelector<'t, T: SelectionTarget> {
    target: &'t T,
    session: &'t IselSession,
}

impl<'t, T: SelectionTarget> InstructionSelector<'t, T> {
    pub fn new(target: &'t T, session: &'t IselSession) -> Self {
        Self { target, session }
    }

    pub fn target(&self) -> &'t T {
        self.target
    }

    /// Select every node of `dag`, visiting `order` (operands first) backwards.
    pub fn select_function(&self, dag: &mut SelectionDag<'_>, order: &[NodeId]) -> IselResult<()> {
        self.select_named_function("<anonymous>", dag, order)
    }

    pub fn select_named_function(
        &self,
        name: &str,
        dag: &mut SelectionDag<'_>,
        order: &[NodeId],
    ) -> IselResult<()> {
        self.session.begin_function(name);
        let result = self.run(name, dag, order);
        match &result {
            Ok(()) => self.session.end_function(),
            Err(_) => self.session.abort_function(),
        }
        result
    }

    fn run(&self, name: &str, dag: &mut SelectionDag<'_>, order: &[NodeId]) -> IselResult<()> {
        debug!("===== Instruction selection begins: {} ({} nodes)", name, dag.len());
        if let Some(&node) = order.iter().find(|id| !dag.contains(**id)) {
            return Err(IselError::InvalidOrder { node });
        }

        let mut cx = IselContext {
            dag,
            subtarget: self.target.subtarget(),
            types: self.target.address_types(),
        };
        let mut seen = vec![false; cx.dag.len()];
        for &id in order.iter().rev() {
            if std::mem::replace(&mut seen[id.index()], true) {
                continue;
            }
            self.select_node(&mut cx, id)?;
        }

        if let Some(node) = cx
            .dag
            .node_ids()
            .find(|&id| cx.dag.node(id).state() == NodeState::Unvisited)
        {
            return Err(IselError::Unvisited { node });
        }
        debug!("===== Instruction selection ends: {}", name);
        Ok(())
    }

    fn select_node(&self, cx: &mut IselContext<'_, '_, T::Subtarget>, id: NodeId) -> IselResult<()> {
        let node = cx.dag.node(id);
        if node.state() != NodeState::Unvisited {
            return Ok(());
        }
        trace!("Selecting: {}", cx.dag.describe_node(id));

        let opcode = match node.opcode() {
            Opcode::Machine(_) => {
                trace!("== {}", cx.dag.describe_node(id));
                cx.dag.mark_selected(id);
                self.session.record_preselected();
                return Ok(());
            }
            Opcode::Isd(op) => op,
        };

        if node.uses() == 0 && !cx.dag.is_root(id) {
            trace!("  dead");
            cx.dag.mark_dead(id);
            self.session.record_dead();
            return Ok(());
        }

        if opcode.needs_no_selection() {
            cx.dag.mark_selected(id);
            self.session.record_passthrough();
            return Ok(());
        }

        for pattern in self.target.patterns().candidates(opcode) {
            if !pattern.predicate.holds(cx.subtarget) {
                continue;
            }
            let Some(emits) = pattern.match_node(cx.dag, &cx.types, id) else {
                continue;
            };
            let operands = cx.emit_operands(emits);
            cx.dag.morph_node(id, pattern.emit, operands);
            self.session.record_pattern(pattern.name);
            trace!("=> {}", cx.dag.describe_node(id));
            return Ok(());
        }

        let description = cx.dag.describe_node(id);
        let illegal = cx
            .dag
            .node(id)
            .results()
            .iter()
            .find(|ty| ty.is_sized() && !self.target.is_type_legal(**ty));
        match illegal {
            Some(ty) => Err(IselError::IllegalType {
                node: id,
                ty: ty.to_string(),
                description,
            }),
            None => Err(IselError::NoMatch {
                node: id,
                description,
            }),
        }
    }

    /// Inline-asm memory operand hook of the target.
    pub fn select_inline_asm_memory_operand(
        &self,
        dag: &SelectionDag<'_>,
        op: SdValue,
        constraint: char,
    ) -> IselResult<Vec<SdValue>> {
        self.target
            .select_inline_asm_memory_operand(dag, op, constraint)
    }
}
