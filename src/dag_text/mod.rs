// This module reads selection DAGs from the same text form SelectionDag prints, so a DAG can
// be written by hand for tests, dumped after selection and read back. Each non-empty line
// defines one node as `label: types = opcode<payload> operands`; operands name an earlier
// label, optionally with a result number after a colon. The last line names the root.
// Machine opcodes are resolved through a caller-supplied lookup so that the reader itself
// stays target independent; parse_dag uses the Z80 opcode names. Nodes are created in line
// order, which is a valid topological order because every operand must already be defined.
// Malformed input is reported with its line number instead of panicking.

//! Textual selection DAGs.
//!
//! ```text
//! ; comments run to the end of the line
//! t0: ch = EntryToken
//! t1: i16 = GlobalAddress<@counter+2>
//! t2: i8,ch = load t0, t1
//! t3: ch = ret t2:1, t2
//! root t3
//! ```

mod parser;

use crate::core::dag::{MachineOpcode, NodeId, SelectionDag};
use crate::core::value_type::TypeContext;
use hashbrown::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

/// A DAG read from text.
#[derive(Debug)]
pub struct ParsedDag<'ctx> {
    pub dag: SelectionDag<'ctx>,
    /// Nodes in definition order.
    pub order: Vec<NodeId>,
    pub labels: HashMap<String, NodeId>,
}

impl ParsedDag<'_> {
    /// The node defined under `label`.
    pub fn node(&self, label: &str) -> Option<NodeId> {
        self.labels.get(label).copied()
    }
}

/// Parse a DAG whose machine nodes use Z80 opcode names.
pub fn parse_dag<'ctx>(text: &str, ctx: &'ctx TypeContext) -> Result<ParsedDag<'ctx>, ParseError> {
    parse_dag_with(text, ctx, &crate::z80::machine_opcode)
}

/// Parse a DAG, resolving machine opcode names with `machine`.
pub fn parse_dag_with<'ctx>(
    text: &str,
    ctx: &'ctx TypeContext,
    machine: &dyn Fn(&str) -> Option<MachineOpcode>,
) -> Result<ParsedDag<'ctx>, ParseError> {
    let parsed = parser::Parser::new(ctx, machine).parse(text)?;
    log::trace!("parsed DAG with {} nodes", parsed.dag.len());
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dag::{IsdOpcode, NodeData, Opcode};
    use crate::core::value_type::{SimpleValueType, ValueType};

    fn parse_err(text: &str) -> ParseError {
        let ctx = TypeContext::new();
        parse_dag(text, &ctx).unwrap_err()
    }

    #[test]
    fn test_parse_basic_function() {
        let ctx = TypeContext::new();
        let parsed = parse_dag(
            "; load a global and return it\n\
             t0: ch = EntryToken\n\
             t1: i16 = GlobalAddress<@counter+2>\n\
             t2: i8,ch = load t0, t1\n\
             t3: ch = ret t2:1, t2\n\
             root t3\n",
            &ctx,
        )
        .unwrap();

        let dag = &parsed.dag;
        assert_eq!(dag.len(), 4);
        assert_eq!(parsed.order.len(), 4);
        let load = parsed.node("t2").unwrap();
        assert_eq!(dag.node(load).opcode(), Opcode::Isd(IsdOpcode::Load));
        assert_eq!(
            dag.node(load).results(),
            &[ValueType::Simple(SimpleValueType::I8), ValueType::CHAIN]
        );
        let global = parsed.node("t1").unwrap();
        assert_eq!(
            dag.node(global).data(),
            &NodeData::Global {
                symbol: "counter".into(),
                offset: 2
            }
        );
        let ret = parsed.node("t3").unwrap();
        assert_eq!(dag.node(ret).operand(0).result, 1);
        assert!(dag.is_root(ret));
    }

    #[test]
    fn test_payload_forms() {
        let ctx = TypeContext::new();
        let parsed = parse_dag(
            "a: i8 = Constant<255>\n\
             b: i16 = GlobalAddress<@arr-4>\n\
             c: i16 = ExternalSymbol<'memcpy'>\n\
             d: i16 = FrameIndex<-2>\n\
             e: i16 = Register<3>\n\
             f: ch = EntryToken\n\
             root f\n",
            &ctx,
        )
        .unwrap();
        let data = |label| parsed.dag.node(parsed.node(label).unwrap()).data().clone();
        assert_eq!(data("a"), NodeData::Constant(-1));
        assert_eq!(
            data("b"),
            NodeData::Global {
                symbol: "arr".into(),
                offset: -4
            }
        );
        assert_eq!(data("c"), NodeData::External("memcpy".into()));
        assert_eq!(data("d"), NodeData::FrameIndex(-2));
        assert_eq!(data("e"), NodeData::Register(3));
    }

    #[test]
    fn test_machine_nodes_resolve() {
        let ctx = TypeContext::new();
        let parsed = parse_dag("t0: i8 = LD8ri\nroot t0\n", &ctx).unwrap();
        assert!(parsed.dag.node(NodeId(0)).opcode().is_machine());

        let none = |_: &str| -> Option<MachineOpcode> { None };
        let err = parse_dag_with("t0: i8 = LD8ri\nroot t0\n", &ctx, &none).unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("unknown opcode"));
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let err = parse_err("t0: ch = EntryToken\nt1: i8 = add t0, t9\nroot t1\n");
        assert_eq!(err.line, 2);
        assert_eq!(err.to_string(), "line 2: undefined value 't9'");

        assert!(parse_err("t0: q7 = EntryToken\nroot t0")
            .message
            .contains("unknown value type"));
        assert!(parse_err("t0: ch = EntryToken\nt0: ch = EntryToken\nroot t0")
            .message
            .contains("defined twice"));
        assert!(parse_err("t0: ch = EntryToken\nroot t0:1")
            .message
            .contains("only 1 results"));
        assert!(parse_err("t0: i8 = Constant\nroot t0")
            .message
            .contains("needs a <payload>"));
        assert!(parse_err("t0: ch = EntryToken<1>\nroot t0")
            .message
            .contains("takes no payload"));
        assert!(parse_err("t0: f32 = Constant<1>\nroot t0")
            .message
            .contains("non-integer"));
        assert!(parse_err("t0: = EntryToken\nroot t0")
            .message
            .contains("unknown value type"));
    }

    #[test]
    fn test_oversized_types_are_parse_errors() {
        for ty in ["v100000000i64", "i2147483649", "i16777217", "v256i16777216"] {
            let err = parse_err(&format!("t0: ch = EntryToken\nt1: {ty} = Register<1>\nroot t0\n"));
            assert_eq!(err.line, 2, "{ty}");
            assert_eq!(err.message, format!("unknown value type '{ty}'"));
        }
    }

    #[test]
    fn test_root_is_required_and_last() {
        let err = parse_err("t0: ch = EntryToken\n");
        assert_eq!(err.line, 2);
        assert!(err.message.contains("missing root"));

        let err = parse_err("t0: ch = EntryToken\nroot t0\nt1: ch = EntryToken\n");
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_print_parse_round_trip() {
        let ctx = TypeContext::new();
        let text = "t0: ch = EntryToken\n\
                    t1: i16 = FrameIndex<0>\n\
                    t2: i8 = Constant<-7>\n\
                    t3: ch = store t0, t2, t1\n\
                    t4: i16 = ExternalSymbol<'abort'>\n\
                    t5: ch = ret t3, t4\n\
                    root t5\n";
        let parsed = parse_dag(text, &ctx).unwrap();
        let printed = parsed.dag.to_string();
        assert_eq!(printed, text);

        let reparsed = parse_dag(&printed, &ctx).unwrap();
        assert_eq!(reparsed.dag.to_string(), printed);
    }
}
