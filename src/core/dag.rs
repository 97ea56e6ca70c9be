// This module implements SelectionDag, the computation graph the instruction selector
// rewrites in place. Nodes live in a dense vector indexed by NodeId; every edge is an
// SdValue naming a node and one of its results. A node carries an opcode (generic ISD or
// target machine), its result types, its operands, an optional payload (constant, symbol,
// frame index or register number), a selection state and a use count that the graph keeps
// in sync with the edges pointing at it (the root holds one extra use). Selection never
// removes nodes: a node is morphed into a machine node by swapping its opcode and operands
// while keeping its result types, and a node nobody uses any more is tombstoned as Dead,
// releasing its own operand uses. The Display impl prints live nodes in the textual DAG
// format, numbering them in dependency order so the output parses back.

//! Selection DAG container.

use super::value_type::ValueType;
use std::fmt;

/// Dense node index, printed as `tN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Typed edge: result `result` of `node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SdValue {
    pub node: NodeId,
    pub result: u32,
}

impl SdValue {
    pub fn new(node: NodeId, result: u32) -> Self {
        Self { node, result }
    }
}

impl From<NodeId> for SdValue {
    fn from(node: NodeId) -> Self {
        Self { node, result: 0 }
    }
}

impl fmt::Display for SdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.result == 0 {
            write!(f, "{}", self.node)
        } else {
            write!(f, "{}:{}", self.node, self.result)
        }
    }
}

/// Payload a generic opcode requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    None,
    Constant,
    Global,
    External,
    FrameIndex,
    Register,
}

#[derive(Debug, Clone, Copy)]
pub struct IsdInfo {
    pub name: &'static str,
    pub payload: PayloadKind,
}

macro_rules! isd_opcodes {
    ($($op:ident = $name:literal, $payload:ident;)*) => {
        /// Target-independent node opcodes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum IsdOpcode {
            $($op,)*
        }

        impl IsdOpcode {
            pub const ALL: &'static [IsdOpcode] = &[$(IsdOpcode::$op,)*];

            pub const fn info(self) -> IsdInfo {
                match self {
                    $(IsdOpcode::$op => IsdInfo { name: $name, payload: PayloadKind::$payload },)*
                }
            }
        }
    };
}

isd_opcodes! {
    EntryToken = "EntryToken", None;
    TokenFactor = "TokenFactor", None;
    Constant = "Constant", Constant;
    GlobalAddress = "GlobalAddress", Global;
    ExternalSymbol = "ExternalSymbol", External;
    FrameIndex = "FrameIndex", FrameIndex;
    Register = "Register", Register;
    CopyFromReg = "CopyFromReg", None;
    CopyToReg = "CopyToReg", None;
    TargetConstant = "TargetConstant", Constant;
    TargetGlobalAddress = "TargetGlobalAddress", Global;
    TargetExternalSymbol = "TargetExternalSymbol", External;
    TargetFrameIndex = "TargetFrameIndex", FrameIndex;
    Load = "load", None;
    Store = "store", None;
    Add = "add", None;
    Sub = "sub", None;
    Mul = "mul", None;
    SDiv = "sdiv", None;
    UDiv = "udiv", None;
    And = "and", None;
    Or = "or", None;
    Xor = "xor", None;
    Shl = "shl", None;
    Srl = "srl", None;
    Sra = "sra", None;
    Ret = "ret", None;
}

impl IsdOpcode {
    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.name() == name)
    }

    /// Leaves already in target form.
    pub fn is_target_leaf(self) -> bool {
        matches!(
            self,
            IsdOpcode::TargetConstant
                | IsdOpcode::TargetGlobalAddress
                | IsdOpcode::TargetExternalSymbol
                | IsdOpcode::TargetFrameIndex
        )
    }

    /// Nodes the selector leaves untouched.
    pub fn needs_no_selection(self) -> bool {
        self.is_target_leaf()
            || matches!(
                self,
                IsdOpcode::EntryToken
                    | IsdOpcode::TokenFactor
                    | IsdOpcode::Register
                    | IsdOpcode::CopyFromReg
                    | IsdOpcode::CopyToReg
            )
    }

    /// Target form of a foldable leaf.
    pub fn target_leaf(self) -> Option<IsdOpcode> {
        match self {
            IsdOpcode::Constant => Some(IsdOpcode::TargetConstant),
            IsdOpcode::GlobalAddress => Some(IsdOpcode::TargetGlobalAddress),
            IsdOpcode::ExternalSymbol => Some(IsdOpcode::TargetExternalSymbol),
            IsdOpcode::FrameIndex => Some(IsdOpcode::TargetFrameIndex),
            _ => None,
        }
    }
}

impl fmt::Display for IsdOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Target machine opcode as seen by the DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MachineOpcode {
    pub id: u16,
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Isd(IsdOpcode),
    Machine(MachineOpcode),
}

impl Opcode {
    pub fn isd(self) -> Option<IsdOpcode> {
        match self {
            Opcode::Isd(op) => Some(op),
            Opcode::Machine(_) => None,
        }
    }

    pub fn is_machine(self) -> bool {
        matches!(self, Opcode::Machine(_))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Isd(op) => f.write_str(op.name()),
            Opcode::Machine(mc) => f.write_str(mc.name),
        }
    }
}

/// Node payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    None,
    Constant(i64),
    Global { symbol: String, offset: i64 },
    External(String),
    FrameIndex(i32),
    Register(u32),
}

impl NodeData {
    pub fn kind(&self) -> PayloadKind {
        match self {
            NodeData::None => PayloadKind::None,
            NodeData::Constant(_) => PayloadKind::Constant,
            NodeData::Global { .. } => PayloadKind::Global,
            NodeData::External(_) => PayloadKind::External,
            NodeData::FrameIndex(_) => PayloadKind::FrameIndex,
            NodeData::Register(_) => PayloadKind::Register,
        }
    }
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeData::None => Ok(()),
            NodeData::Constant(value) => write!(f, "<{value}>"),
            NodeData::Global { symbol, offset: 0 } => write!(f, "<@{symbol}>"),
            NodeData::Global { symbol, offset } if *offset < 0 => {
                write!(f, "<@{symbol}{offset}>")
            }
            NodeData::Global { symbol, offset } => write!(f, "<@{symbol}+{offset}>"),
            NodeData::External(symbol) => write!(f, "<'{symbol}'>"),
            NodeData::FrameIndex(index) => write!(f, "<{index}>"),
            NodeData::Register(reg) => write!(f, "<{reg}>"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Unvisited,
    Selected,
    Dead,
}

#[derive(Debug, Clone)]
pub struct SdNode<'ctx> {
    opcode: Opcode,
    results: Vec<ValueType<'ctx>>,
    operands: Vec<SdValue>,
    data: NodeData,
    state: NodeState,
    uses: u32,
}

impl<'ctx> SdNode<'ctx> {
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn results(&self) -> &[ValueType<'ctx>] {
        &self.results
    }

    pub fn operands(&self) -> &[SdValue] {
        &self.operands
    }

    pub fn operand(&self, i: usize) -> SdValue {
        self.operands[i]
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Number of edges pointing at this node, the root counting as one.
    pub fn uses(&self) -> u32 {
        self.uses
    }

    pub fn is_selected(&self) -> bool {
        self.state == NodeState::Selected
    }

    pub fn is_dead(&self) -> bool {
        self.state == NodeState::Dead
    }
}

/// Sign-extend the low `bits` bits of `value`.
pub fn sign_extend(value: i64, bits: u32) -> i64 {
    if bits == 0 || bits >= 64 {
        return value;
    }
    let shift = 64 - bits;
    (value << shift) >> shift
}

/// Graph of one function, rewritten in place by selection.
#[derive(Debug, Clone, Default)]
pub struct SelectionDag<'ctx> {
    nodes: Vec<SdNode<'ctx>>,
    root: Option<SdValue>,
}

impl<'ctx> SelectionDag<'ctx> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &SdNode<'ctx> {
        &self.nodes[id.index()]
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn root(&self) -> Option<SdValue> {
        self.root
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.root.is_some_and(|root| root.node == id)
    }

    pub fn value_type(&self, value: SdValue) -> ValueType<'ctx> {
        self.node(value.node).results[value.result as usize]
    }

    fn check_value(&self, value: SdValue) {
        assert!(self.contains(value.node), "operand {value} refers to no node");
        let results = self.nodes[value.node.index()].results.len();
        assert!(
            (value.result as usize) < results,
            "operand {value} refers past the {results} results of its node"
        );
    }

    fn add_use(&mut self, value: SdValue) {
        self.nodes[value.node.index()].uses += 1;
    }

    fn drop_use(&mut self, value: SdValue) {
        let node = &mut self.nodes[value.node.index()];
        assert!(node.uses > 0, "use count underflow on {}", value.node);
        node.uses -= 1;
    }

    /// Append a node. Operands must already exist.
    pub fn add_node(
        &mut self,
        opcode: Opcode,
        results: Vec<ValueType<'ctx>>,
        operands: Vec<SdValue>,
        data: NodeData,
    ) -> NodeId {
        assert!(!results.is_empty(), "node must produce at least one value");
        if let Opcode::Isd(op) = opcode {
            assert_eq!(
                op.info().payload,
                data.kind(),
                "payload does not fit opcode {op}"
            );
        }
        for &operand in &operands {
            self.check_value(operand);
        }
        for &operand in &operands {
            self.add_use(operand);
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SdNode {
            opcode,
            results,
            operands,
            data,
            state: NodeState::Unvisited,
            uses: 0,
        });
        id
    }

    /// Append a generic node without payload.
    pub fn add_isd(
        &mut self,
        opcode: IsdOpcode,
        results: Vec<ValueType<'ctx>>,
        operands: Vec<SdValue>,
    ) -> NodeId {
        self.add_node(Opcode::Isd(opcode), results, operands, NodeData::None)
    }

    pub fn entry_token(&mut self) -> NodeId {
        self.add_isd(IsdOpcode::EntryToken, vec![ValueType::CHAIN], Vec::new())
    }

    /// Integer constant, stored sign-extended from the width of `ty`.
    pub fn constant(&mut self, value: i64, ty: ValueType<'ctx>) -> NodeId {
        self.leaf(IsdOpcode::Constant, value, ty)
    }

    pub fn target_constant(&mut self, value: i64, ty: ValueType<'ctx>) -> NodeId {
        self.leaf(IsdOpcode::TargetConstant, value, ty)
    }

    fn leaf(&mut self, opcode: IsdOpcode, value: i64, ty: ValueType<'ctx>) -> NodeId {
        assert!(ty.is_scalar_integer(), "constant of non-integer type {ty}");
        let value = sign_extend(value, ty.size_in_bits());
        self.add_node(
            Opcode::Isd(opcode),
            vec![ty],
            Vec::new(),
            NodeData::Constant(value),
        )
    }

    pub fn global_address(&mut self, symbol: &str, offset: i64, ty: ValueType<'ctx>) -> NodeId {
        self.add_node(
            Opcode::Isd(IsdOpcode::GlobalAddress),
            vec![ty],
            Vec::new(),
            NodeData::Global {
                symbol: symbol.to_string(),
                offset,
            },
        )
    }

    pub fn external_symbol(&mut self, symbol: &str, ty: ValueType<'ctx>) -> NodeId {
        self.add_node(
            Opcode::Isd(IsdOpcode::ExternalSymbol),
            vec![ty],
            Vec::new(),
            NodeData::External(symbol.to_string()),
        )
    }

    pub fn frame_index(&mut self, index: i32, ty: ValueType<'ctx>) -> NodeId {
        self.add_node(
            Opcode::Isd(IsdOpcode::FrameIndex),
            vec![ty],
            Vec::new(),
            NodeData::FrameIndex(index),
        )
    }

    pub fn register(&mut self, reg: u32, ty: ValueType<'ctx>) -> NodeId {
        self.add_node(
            Opcode::Isd(IsdOpcode::Register),
            vec![ty],
            Vec::new(),
            NodeData::Register(reg),
        )
    }

    pub fn set_root(&mut self, root: SdValue) {
        self.check_value(root);
        self.add_use(root);
        if let Some(old) = self.root.replace(root) {
            self.drop_use(old);
        }
    }

    /// Sign-extended value of a generic or target constant.
    pub fn constant_value(&self, value: SdValue) -> Option<i64> {
        let node = self.node(value.node);
        match (node.opcode, &node.data) {
            (
                Opcode::Isd(IsdOpcode::Constant | IsdOpcode::TargetConstant),
                NodeData::Constant(v),
            ) => Some(*v),
            _ => None,
        }
    }

    /// Rewrite a node into a machine node, keeping its result types.
    pub fn morph_node(&mut self, id: NodeId, opcode: MachineOpcode, operands: Vec<SdValue>) {
        for &operand in &operands {
            self.check_value(operand);
            self.add_use(operand);
        }
        let old = std::mem::replace(&mut self.nodes[id.index()].operands, operands);
        for operand in old {
            self.drop_use(operand);
        }
        let node = &mut self.nodes[id.index()];
        node.opcode = Opcode::Machine(opcode);
        node.data = NodeData::None;
        node.state = NodeState::Selected;
    }

    pub fn mark_selected(&mut self, id: NodeId) {
        self.nodes[id.index()].state = NodeState::Selected;
    }

    /// Tombstone an unused node and release its operands.
    pub fn mark_dead(&mut self, id: NodeId) {
        let node = &self.nodes[id.index()];
        assert!(
            node.uses == 0 && !self.is_root(id),
            "cannot kill {id}, it is still in use"
        );
        let operands = std::mem::take(&mut self.nodes[id.index()].operands);
        for operand in operands {
            self.drop_use(operand);
        }
        self.nodes[id.index()].state = NodeState::Dead;
    }

    /// Live nodes, every operand before its users.
    pub fn topological_order(&self) -> Vec<NodeId> {
        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = Vec::new();
        for start in self.node_ids() {
            if visited[start.index()] || self.node(start).is_dead() {
                continue;
            }
            visited[start.index()] = true;
            stack.push((start, 0usize));
            while let Some((id, next)) = stack.last_mut() {
                let id = *id;
                let operands = &self.nodes[id.index()].operands;
                if let Some(operand) = operands.get(*next) {
                    *next += 1;
                    let child = operand.node;
                    if !visited[child.index()] {
                        visited[child.index()] = true;
                        stack.push((child, 0));
                    }
                } else {
                    stack.pop();
                    order.push(id);
                }
            }
        }
        order
    }

    fn fmt_node(
        &self,
        f: &mut dyn fmt::Write,
        id: NodeId,
        label: &dyn Fn(NodeId) -> String,
    ) -> fmt::Result {
        let node = self.node(id);
        write!(f, "{}: ", label(id))?;
        for (i, ty) in node.results.iter().enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            write!(f, "{ty}")?;
        }
        write!(f, " = {}{}", node.opcode, node.data)?;
        for (i, operand) in node.operands.iter().enumerate() {
            f.write_str(if i == 0 { " " } else { ", " })?;
            f.write_str(&label(operand.node))?;
            if operand.result != 0 {
                write!(f, ":{}", operand.result)?;
            }
        }
        Ok(())
    }

    /// One node in dump form, with its own ids.
    pub fn describe_node(&self, id: NodeId) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.fmt_node(&mut out, id, &|n| n.to_string());
        out
    }
}

impl fmt::Display for SelectionDag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = self.topological_order();
        let mut labels = vec![u32::MAX; self.nodes.len()];
        for (i, id) in order.iter().enumerate() {
            labels[id.index()] = i as u32;
        }
        let label = |id: NodeId| format!("t{}", labels[id.index()]);
        for &id in &order {
            self.fmt_node(f, id, &label)?;
            writeln!(f)?;
        }
        if let Some(root) = self.root {
            write!(f, "root {}", label(root.node))?;
            if root.result != 0 {
                write!(f, ":{}", root.result)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
