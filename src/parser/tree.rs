use crowbook_text_processing::escape;
use serde::Serialize;

use crate::scanner::Token;

/// A node of the concrete parse tree. Children of a nonterminal follow the
/// right-hand side of the production it was reduced by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParseTreeNode {
    Terminal {
        token: Token,
    },
    NonTerminal {
        symbol: String,
        children: Vec<ParseTreeNode>,
    },
}

impl ParseTreeNode {
    pub fn symbol(&self) -> &str {
        match self {
            ParseTreeNode::Terminal { token } => token.terminal(),
            ParseTreeNode::NonTerminal { symbol, .. } => symbol,
        }
    }

    pub fn children(&self) -> &[ParseTreeNode] {
        match self {
            ParseTreeNode::Terminal { .. } => &[],
            ParseTreeNode::NonTerminal { children, .. } => children,
        }
    }

    pub fn token(&self) -> Option<&Token> {
        match self {
            ParseTreeNode::Terminal { token } => Some(token),
            ParseTreeNode::NonTerminal { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ParseTreeNode::Terminal { .. })
    }

    pub fn child(&self, i: usize) -> Option<&ParseTreeNode> {
        self.children().get(i)
    }

    /// First node labelled `symbol` in pre-order, this node included.
    pub fn find(&self, symbol: &str) -> Option<&ParseTreeNode> {
        if self.symbol() == symbol {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find(symbol))
    }

    /// Every node below this one, in pre-order.
    pub fn descendants(&self) -> Vec<&ParseTreeNode> {
        let mut out = Vec::new();
        let mut stack: Vec<&ParseTreeNode> = self.children().iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children().iter().rev());
        }
        out
    }

    pub fn leaves(&self) -> Vec<&Token> {
        std::iter::once(self)
            .chain(self.descendants())
            .filter_map(|n| n.token())
            .collect()
    }

    /// One node per line, two spaces of indentation per level; terminals
    /// print as `KIND(lexeme)`.
    pub fn to_tree_string(&self) -> String {
        let mut lines = Vec::new();
        self.write_lines(0, &mut lines);
        lines.join("\n")
    }

    fn write_lines(&self, depth: usize, lines: &mut Vec<String>) {
        let label = match self {
            ParseTreeNode::Terminal { token } => token.to_string(),
            ParseTreeNode::NonTerminal { symbol, .. } => symbol.clone(),
        };
        lines.push(format!("{}{}", "  ".repeat(depth), label));
        for child in self.children() {
            child.write_lines(depth + 1, lines);
        }
    }

    pub fn to_latex(&self) -> String {
        format!("\\Tree {}", self.latex_node())
    }

    fn latex_node(&self) -> String {
        match self {
            ParseTreeNode::Terminal { token } if token.lexeme.is_empty() => {
                format!("{{{}}}", escape::tex(token.terminal()))
            }
            ParseTreeNode::Terminal { token } => {
                format!("{{{}\\\\\\texttt{{{}}}}}", escape::tex(token.terminal()), escape::tex(&token.lexeme))
            }
            ParseTreeNode::NonTerminal { symbol, children } if children.is_empty() => {
                format!("[.{{{}}} {{$\\epsilon$}} ]", escape::tex(symbol))
            }
            ParseTreeNode::NonTerminal { symbol, children } => format!(
                "[.{{{}}} {} ]",
                escape::tex(symbol),
                children.iter().map(|c| c.latex_node()).collect::<Vec<_>>().join(" ")
            ),
        }
    }
}
