use std::fmt;

use serde::Serialize;

use super::{tree::ParseTreeNode, with_end_marker};
use crate::grammar::{Action, Grammar};
use crate::scanner::Token;

/// One iteration of the parser loop, recorded before its action is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseStep {
    pub index: usize,
    pub stack: String,
    pub input: String,
    pub action: Action,
    pub production: Option<String>,
}

impl fmt::Display for ParseStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [{}] {} => {}", self.index, self.stack, self.input, self.action)?;
        if let Some(p) = &self.production {
            write!(f, " ({})", p)?;
        }
        Ok(())
    }
}

pub(super) fn stack_snapshot(states: &[usize]) -> String {
    states
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

pub(super) fn input_snapshot(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.terminal())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rebuilds a parse tree from a recorded trace alone, without the table.
///
/// Returns `None` unless the trace ends in an accept that leaves exactly one
/// node, or when it does not fit `tokens`.
pub fn replay(g: &Grammar, tokens: &[Token], steps: &[ParseStep]) -> Option<ParseTreeNode> {
    let tokens = with_end_marker(tokens);
    let mut cursor = 0;
    let mut nodes: Vec<ParseTreeNode> = Vec::new();

    for step in steps {
        match step.action {
            Action::Shift(_) => {
                let token = tokens.get(cursor)?;
                nodes.push(ParseTreeNode::Terminal {
                    token: token.clone(),
                });
                cursor += 1;
            }
            Action::Reduce(id) => {
                let production = g.get_production(id)?;
                let at = nodes.len().checked_sub(production.len())?;
                let children = nodes.split_off(at);
                nodes.push(ParseTreeNode::NonTerminal {
                    symbol: production.left.clone(),
                    children,
                });
            }
            Action::Accept => {
                return if nodes.len() == 1 { nodes.pop() } else { None };
            }
            Action::Error => return None,
        }
    }
    None
}
