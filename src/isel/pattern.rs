// This module holds the data-driven pattern table the selector dispatches into. A Pattern
// rewrites one generic opcode into one machine opcode. It is guarded by a capability
// predicate on the target descriptor and by a type check on the root's first result or on
// one of its operands. Its operand matchers walk the root's operands positionally; a matcher
// can pass an edge through, fold a constant, symbol or frame index into a target leaf,
// require a particular constant, resolve an address through the addressing-mode resolver,
// or descend into a single-use generic sub-node that the pattern absorbs. An optional root
// matcher applies to the root's own value, which is how leaf nodes such as constants and
// frame indices get selected. Matching only reads the DAG and produces a list of Emit
// entries; the driver turns them into operands when it commits. PatternTable orders the
// candidates of each opcode by complexity, the sum of the matcher weights plus any added
// complexity, highest first. Patterns of equal complexity keep their insertion order.

//! Pattern table and matcher.

use super::address::{select_mem, select_off, AddressBase, AddressTypes, Displacement};
use crate::core::dag::{
    IsdOpcode, MachineOpcode, NodeData, NodeId, NodeState, Opcode, SdValue, SelectionDag,
};
use crate::core::value_type::{SimpleValueType, ValueType};
use hashbrown::HashMap;
use std::fmt;

/// Capability guard evaluated against the target descriptor.
pub struct Predicate<S> {
    pub name: &'static str,
    pub check: fn(&S) -> bool,
}

fn always<S>(_: &S) -> bool {
    true
}

impl<S> Predicate<S> {
    pub fn new(name: &'static str, check: fn(&S) -> bool) -> Self {
        Self { name, check }
    }

    pub fn always() -> Self {
        Self::new("true", always::<S>)
    }

    pub fn holds(&self, subtarget: &S) -> bool {
        (self.check)(subtarget)
    }
}

impl<S> Clone for Predicate<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Predicate<S> {}

impl<S> fmt::Debug for Predicate<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Type constraint of a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCheck {
    Any,
    /// First result of the root.
    Result(SimpleValueType),
    /// Type of the given root operand.
    Operand(usize, SimpleValueType),
}

/// Matcher for one operand edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandMatcher {
    /// A chain edge, passed through.
    Chain,
    /// Any non-chain value, passed through.
    Reg,
    /// A constant, folded into a target constant of its own type.
    Imm,
    /// A constant with exactly this value. Emits nothing.
    ConstValue(i64),
    /// An absolute address.
    Mem,
    /// A based address. Emits the base and the displacement.
    Off,
    /// A single-use generic node with this opcode, absorbed into the pattern.
    Node(IsdOpcode, &'static [OperandMatcher]),
}

impl OperandMatcher {
    pub fn complexity(&self) -> i32 {
        match self {
            OperandMatcher::Chain => 0,
            OperandMatcher::Reg => 1,
            OperandMatcher::Imm | OperandMatcher::Mem | OperandMatcher::Off => 3,
            OperandMatcher::ConstValue(_) => 4,
            OperandMatcher::Node(_, operands) => {
                3 + operands.iter().map(OperandMatcher::complexity).sum::<i32>()
            }
        }
    }
}

/// Operand produced by a successful match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emit<'ctx> {
    /// An existing edge.
    Value(SdValue),
    /// A fresh target constant.
    Constant { value: i64, ty: ValueType<'ctx> },
    /// A fresh leaf for an address displacement.
    Displacement(Displacement),
    /// A fresh target frame index of the given pointer type.
    Frame { index: i32, ty: SimpleValueType },
}

/// One rewrite rule.
#[derive(Debug)]
pub struct Pattern<S> {
    pub name: &'static str,
    pub opcode: IsdOpcode,
    pub emit: MachineOpcode,
    pub types: TypeCheck,
    pub predicate: Predicate<S>,
    pub root: Option<OperandMatcher>,
    pub operands: &'static [OperandMatcher],
    pub added_complexity: i32,
}

impl<S> Pattern<S> {
    pub fn new(opcode: IsdOpcode, emit: impl Into<MachineOpcode>) -> Self {
        let emit = emit.into();
        Self {
            name: emit.name,
            opcode,
            emit,
            types: TypeCheck::Any,
            predicate: Predicate::always(),
            root: None,
            operands: &[],
            added_complexity: 0,
        }
    }

    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn result(mut self, ty: SimpleValueType) -> Self {
        self.types = TypeCheck::Result(ty);
        self
    }

    pub fn operand_type(mut self, index: usize, ty: SimpleValueType) -> Self {
        self.types = TypeCheck::Operand(index, ty);
        self
    }

    pub fn requires(mut self, predicate: Predicate<S>) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn root(mut self, matcher: OperandMatcher) -> Self {
        self.root = Some(matcher);
        self
    }

    pub fn operands(mut self, operands: &'static [OperandMatcher]) -> Self {
        self.operands = operands;
        self
    }

    pub fn added_complexity(mut self, complexity: i32) -> Self {
        self.added_complexity = complexity;
        self
    }

    pub fn complexity(&self) -> i32 {
        self.root.as_ref().map_or(0, OperandMatcher::complexity)
            + self.operands.iter().map(OperandMatcher::complexity).sum::<i32>()
            + self.added_complexity
    }

    fn types_match(&self, dag: &SelectionDag<'_>, id: NodeId) -> bool {
        let node = dag.node(id);
        match self.types {
            TypeCheck::Any => true,
            TypeCheck::Result(ty) => node.results()[0] == ValueType::Simple(ty),
            TypeCheck::Operand(index, ty) => node
                .operands()
                .get(index)
                .is_some_and(|&op| dag.value_type(op) == ValueType::Simple(ty)),
        }
    }

    /// Try the pattern on `id`. Returns the operands of the rewritten node.
    ///
    /// The capability predicate is the caller's business.
    pub fn match_node<'ctx>(
        &self,
        dag: &SelectionDag<'ctx>,
        types: &AddressTypes,
        id: NodeId,
    ) -> Option<Vec<Emit<'ctx>>> {
        let node = dag.node(id);
        if node.opcode() != Opcode::Isd(self.opcode)
            || node.operands().len() != self.operands.len()
            || !self.types_match(dag, id)
        {
            return None;
        }
        let mut out = Vec::new();
        let matcher = Matcher { dag, types };
        if let Some(root) = &self.root {
            if !matcher.operand(root, SdValue::from(id), &mut out) {
                return None;
            }
        }
        for (m, &operand) in self.operands.iter().zip(node.operands()) {
            if !matcher.operand(m, operand, &mut out) {
                return None;
            }
        }
        Some(out)
    }
}

struct Matcher<'a, 'ctx> {
    dag: &'a SelectionDag<'ctx>,
    types: &'a AddressTypes,
}

impl<'ctx> Matcher<'_, 'ctx> {
    fn operand(&self, m: &OperandMatcher, value: SdValue, out: &mut Vec<Emit<'ctx>>) -> bool {
        let dag = self.dag;
        match *m {
            OperandMatcher::Chain => {
                if dag.value_type(value) != ValueType::CHAIN {
                    return false;
                }
                out.push(Emit::Value(value));
            }
            OperandMatcher::Reg => {
                if dag.value_type(value) == ValueType::CHAIN {
                    return false;
                }
                out.push(Emit::Value(value));
            }
            OperandMatcher::Imm => {
                let node = dag.node(value.node);
                match (node.opcode(), node.data()) {
                    (Opcode::Isd(IsdOpcode::Constant), NodeData::Constant(v)) => {
                        out.push(Emit::Constant {
                            value: *v,
                            ty: dag.value_type(value),
                        });
                    }
                    _ => return false,
                }
            }
            OperandMatcher::ConstValue(expected) => {
                let node = dag.node(value.node);
                if node.opcode() != Opcode::Isd(IsdOpcode::Constant)
                    || dag.constant_value(value) != Some(expected)
                {
                    return false;
                }
            }
            OperandMatcher::Mem => match select_mem(dag, self.types, value) {
                Some(disp) => out.push(Emit::Displacement(disp)),
                None => return false,
            },
            OperandMatcher::Off => match select_off(dag, self.types, value) {
                Some((base, disp)) => {
                    out.push(match base {
                        AddressBase::Register(v) => Emit::Value(v),
                        AddressBase::Frame(index) => Emit::Frame {
                            index,
                            ty: self.types.pointer,
                        },
                    });
                    out.push(Emit::Displacement(disp));
                }
                None => return false,
            },
            OperandMatcher::Node(opcode, operands) => {
                let node = dag.node(value.node);
                if value.result != 0
                    || node.opcode() != Opcode::Isd(opcode)
                    || node.state() != NodeState::Unvisited
                    || node.uses() != 1
                    || node.operands().len() != operands.len()
                {
                    return false;
                }
                for (m, &operand) in operands.iter().zip(node.operands()) {
                    if !self.operand(m, operand, out) {
                        return false;
                    }
                }
            }
        }
        true
    }
}

/// Patterns grouped by root opcode, in precedence order.
#[derive(Debug)]
pub struct PatternTable<S> {
    patterns: Vec<Pattern<S>>,
    by_opcode: HashMap<IsdOpcode, Vec<usize>>,
}

impl<S> PatternTable<S> {
    pub fn new(patterns: Vec<Pattern<S>>) -> Self {
        let mut by_opcode: HashMap<IsdOpcode, Vec<usize>> = HashMap::new();
        for (index, pattern) in patterns.iter().enumerate() {
            by_opcode.entry(pattern.opcode).or_default().push(index);
        }
        for indices in by_opcode.values_mut() {
            // Stable, so equal complexity keeps insertion order.
            indices.sort_by_key(|&i| std::cmp::Reverse(patterns[i].complexity()));
        }
        Self {
            patterns,
            by_opcode,
        }
    }

    /// Candidates for `opcode`, most complex first.
    pub fn candidates(&self, opcode: IsdOpcode) -> impl Iterator<Item = &Pattern<S>> + '_ {
        self.by_opcode
            .get(&opcode)
            .into_iter()
            .flatten()
            .map(move |&i| &self.patterns[i])
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern<S>> {
        self.patterns.iter()
    }
}
