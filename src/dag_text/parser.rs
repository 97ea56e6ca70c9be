//! Textual DAG reader.

use super::{ParseError, ParsedDag};
use crate::core::dag::{
    sign_extend, IsdOpcode, MachineOpcode, NodeData, NodeId, Opcode, PayloadKind, SdValue,
    SelectionDag,
};
use crate::core::value_type::{TypeContext, ValueType};
use hashbrown::HashMap;

pub(super) struct Parser<'a, 'ctx> {
    ctx: &'ctx TypeContext,
    machine: &'a dyn Fn(&str) -> Option<MachineOpcode>,
    line: usize,
    dag: SelectionDag<'ctx>,
    order: Vec<NodeId>,
    labels: HashMap<String, NodeId>,
    root: Option<SdValue>,
}

impl<'a, 'ctx> Parser<'a, 'ctx> {
    pub(super) fn new(
        ctx: &'ctx TypeContext,
        machine: &'a dyn Fn(&str) -> Option<MachineOpcode>,
    ) -> Self {
        Self {
            ctx,
            machine,
            line: 0,
            dag: SelectionDag::new(),
            order: Vec::new(),
            labels: HashMap::new(),
            root: None,
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            line: self.line,
            message: message.into(),
        }
    }

    pub(super) fn parse(mut self, text: &str) -> Result<ParsedDag<'ctx>, ParseError> {
        for (index, raw) in text.lines().enumerate() {
            self.line = index + 1;
            let line = match raw.find(';') {
                Some(pos) => &raw[..pos],
                None => raw,
            }
            .trim();
            if line.is_empty() {
                continue;
            }
            if self.root.is_some() {
                return Err(self.error("unexpected text after root"));
            }
            if let Some(root) = line.strip_prefix("root ") {
                let root = self.parse_value(root.trim())?;
                self.root = Some(root);
            } else {
                self.parse_node(line)?;
            }
        }

        let Some(root) = self.root else {
            self.line += 1;
            return Err(self.error("missing root line"));
        };
        self.dag.set_root(root);
        Ok(ParsedDag {
            dag: self.dag,
            order: self.order,
            labels: self.labels,
        })
    }

    fn parse_node(&mut self, line: &str) -> Result<(), ParseError> {
        let (label, rest) = line
            .split_once(':')
            .ok_or_else(|| self.error("expected 'label: types = opcode operands'"))?;
        let label = label.trim();
        if label.is_empty() || label.contains(char::is_whitespace) {
            return Err(self.error(format!("invalid label '{label}'")));
        }
        if self.labels.contains_key(label) {
            return Err(self.error(format!("label '{label}' defined twice")));
        }

        let (types, expr) = rest
            .split_once('=')
            .ok_or_else(|| self.error("expected '=' after the result types"))?;
        let results = types
            .split(',')
            .map(|ty| {
                let ty = ty.trim();
                ValueType::parse(self.ctx, ty)
                    .ok_or_else(|| self.error(format!("unknown value type '{ty}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let expr = expr.trim();
        let name_end = expr
            .find(|c: char| c == '<' || c.is_whitespace())
            .unwrap_or(expr.len());
        let name = &expr[..name_end];
        let mut rest = &expr[name_end..];

        let opcode = match IsdOpcode::from_name(name) {
            Some(op) => Opcode::Isd(op),
            None => match (self.machine)(name) {
                Some(mc) => Opcode::Machine(mc),
                None => return Err(self.error(format!("unknown opcode '{name}'"))),
            },
        };

        let mut payload = None;
        if let Some(inner) = rest.strip_prefix('<') {
            let close = inner
                .find('>')
                .ok_or_else(|| self.error("unterminated '<' payload"))?;
            payload = Some(&inner[..close]);
            rest = &inner[close + 1..];
        }
        let data = self.parse_payload(opcode, payload, &results)?;

        let operands = rest
            .split(',')
            .map(str::trim)
            .filter(|op| !op.is_empty())
            .map(|op| self.parse_value(op))
            .collect::<Result<Vec<_>, _>>()?;

        let id = self.dag.add_node(opcode, results, operands, data);
        self.labels.insert(label.to_string(), id);
        self.order.push(id);
        Ok(())
    }

    fn parse_value(&self, text: &str) -> Result<SdValue, ParseError> {
        let (label, result) = match text.split_once(':') {
            Some((label, result)) => {
                let result = result
                    .parse::<u32>()
                    .map_err(|_| self.error(format!("invalid result number in '{text}'")))?;
                (label, result)
            }
            None => (text, 0),
        };
        let node = *self
            .labels
            .get(label)
            .ok_or_else(|| self.error(format!("undefined value '{label}'")))?;
        let count = self.dag.node(node).results().len();
        if result as usize >= count {
            return Err(self.error(format!("'{label}' has only {count} results")));
        }
        Ok(SdValue::new(node, result))
    }

    fn parse_payload(
        &self,
        opcode: Opcode,
        payload: Option<&str>,
        results: &[ValueType<'ctx>],
    ) -> Result<NodeData, ParseError> {
        let kind = match opcode {
            Opcode::Isd(op) => op.info().payload,
            Opcode::Machine(_) => PayloadKind::None,
        };
        let Some(text) = payload else {
            if kind != PayloadKind::None {
                return Err(self.error(format!("'{opcode}' needs a <payload>")));
            }
            return Ok(NodeData::None);
        };

        match kind {
            PayloadKind::None => Err(self.error(format!("'{opcode}' takes no payload"))),
            PayloadKind::Constant => {
                let value = self.parse_int::<i64>(text)?;
                let ty = results[0];
                if !ty.is_scalar_integer() {
                    return Err(self.error(format!("constant of non-integer type {ty}")));
                }
                Ok(NodeData::Constant(sign_extend(value, ty.size_in_bits())))
            }
            PayloadKind::Global => {
                let text = text
                    .strip_prefix('@')
                    .ok_or_else(|| self.error("global payload must start with '@'"))?;
                let split = text.rfind(['+', '-']).filter(|&pos| {
                    pos > 0 && text[pos + 1..].bytes().all(|b| b.is_ascii_digit())
                });
                let (symbol, offset) = match split {
                    Some(pos) => (&text[..pos], self.parse_int::<i64>(&text[pos..])?),
                    None => (text, 0),
                };
                Ok(NodeData::Global {
                    symbol: symbol.to_string(),
                    offset,
                })
            }
            PayloadKind::External => {
                let symbol = text
                    .strip_prefix('\'')
                    .and_then(|t| t.strip_suffix('\''))
                    .ok_or_else(|| self.error("external symbol must be quoted"))?;
                Ok(NodeData::External(symbol.to_string()))
            }
            PayloadKind::FrameIndex => Ok(NodeData::FrameIndex(self.parse_int(text)?)),
            PayloadKind::Register => Ok(NodeData::Register(self.parse_int(text)?)),
        }
    }

    fn parse_int<T: std::str::FromStr>(&self, text: &str) -> Result<T, ParseError> {
        let text = text.strip_prefix('+').unwrap_or(text);
        text.parse()
            .map_err(|_| self.error(format!("invalid number '{text}'")))
    }
}
