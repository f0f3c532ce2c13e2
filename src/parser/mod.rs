//! The table-driven shift/reduce engine.
//!
//! [`SlrParser`] owns the grammar and everything derived from it. All of it
//! is read-only after construction, so one parser can serve any number of
//! concurrent [`SlrParser::run`] calls; each call keeps its stacks and trace
//! to itself.

mod error;
mod step;
mod tree;

use once_cell::sync::Lazy;

use crate::grammar::{Action, Conflict, FirstFollow, Grammar, GrammarError, Lr0Automaton, SlrTable};
use crate::scanner::{Token, TokenKind};

pub use error::SyntaxError;
pub use step::{replay, ParseStep};
pub use tree::ParseTreeNode;

use step::{input_snapshot, stack_snapshot};

#[derive(Debug, Clone)]
pub struct ParseRun {
    pub result: Result<ParseTreeNode, SyntaxError>,
    pub steps: Vec<ParseStep>,
}

#[derive(Debug)]
pub struct SlrParser {
    grammar: Grammar,
    first_follow: FirstFollow,
    automaton: Lr0Automaton,
    table: SlrTable,
    conflicts: Vec<Conflict>,
}

static LANGUAGE: Lazy<SlrParser> = Lazy::new(|| SlrParser::new(Grammar::language()));

impl SlrParser {
    /// Builds FIRST/FOLLOW, the LR(0) automaton and the SLR(1) table.
    ///
    /// # Panics
    /// If the FIRST/FOLLOW fixpoints do not converge, which means the grammar
    /// itself is broken.
    pub fn new(grammar: Grammar) -> Self {
        Self::try_new(grammar).unwrap_or_else(|e| panic!("cannot build parser tables: {}", e))
    }

    pub fn try_new(grammar: Grammar) -> Result<Self, GrammarError> {
        let first_follow = FirstFollow::compute(&grammar)?;
        let automaton = Lr0Automaton::build(&grammar);
        let (table, conflicts) = SlrTable::build(&grammar, &automaton, &first_follow);
        log::debug!(
            "slr table: {} states, {} conflicts ({} expected)",
            table.state_count(),
            conflicts.len(),
            conflicts.iter().filter(|c| c.expected).count()
        );
        Ok(Self {
            grammar,
            first_follow,
            automaton,
            table,
            conflicts,
        })
    }

    /// The shared parser for the language grammar, built on first use.
    pub fn language() -> &'static SlrParser {
        &LANGUAGE
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn first_follow(&self) -> &FirstFollow {
        &self.first_follow
    }

    pub fn automaton(&self) -> &Lr0Automaton {
        &self.automaton
    }

    pub fn table(&self) -> &SlrTable {
        &self.table
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    /// Warnings for tokens the grammar has no terminal for. Such a token can
    /// only ever produce a syntax error.
    pub fn validate_tokens(&self, tokens: &[Token]) -> Vec<String> {
        tokens
            .iter()
            .filter(|t| t.kind != TokenKind::Eof && !self.grammar.is_terminal(t.terminal()))
            .map(|t| {
                format!(
                    "line {}, column {}: token {} is not used by the grammar",
                    t.line, t.column, t
                )
            })
            .collect()
    }

    pub fn parse(&self, tokens: &[Token]) -> Result<ParseTreeNode, SyntaxError> {
        self.run(tokens).result
    }

    /// Parses `tokens`, appending an end marker when the stream lacks one.
    ///
    /// # Panics
    /// On a reduction with no GOTO entry, or an accept with other than one
    /// node on the stack. Both mean the table is unsound.
    pub fn run(&self, tokens: &[Token]) -> ParseRun {
        let tokens = with_end_marker(tokens);
        let mut states: Vec<usize> = vec![0];
        let mut nodes: Vec<ParseTreeNode> = Vec::new();
        let mut steps: Vec<ParseStep> = Vec::new();
        let mut cursor = 0;

        loop {
            let state = states[states.len() - 1];
            let token = &tokens[cursor];
            let action = self.table.action(state, token.terminal());
            let mut step = ParseStep {
                index: steps.len(),
                stack: stack_snapshot(&states),
                input: input_snapshot(&tokens[cursor..]),
                action,
                production: None,
            };

            match action {
                Action::Shift(next) => {
                    nodes.push(ParseTreeNode::Terminal {
                        token: token.clone(),
                    });
                    states.push(next);
                    cursor += 1;
                }
                Action::Reduce(id) => {
                    let production = self.grammar.production(id);
                    let n = production.len();
                    let children = nodes.split_off(nodes.len() - n);
                    states.truncate(states.len() - n);

                    let top = states[states.len() - 1];
                    let next = self.table.goto(top, &production.left).unwrap_or_else(|| {
                        panic!("no GOTO entry for state {} on `{}`", top, production.left)
                    });
                    nodes.push(ParseTreeNode::NonTerminal {
                        symbol: production.left.clone(),
                        children,
                    });
                    states.push(next);
                    step.production = Some(production.to_string());
                }
                Action::Accept => {
                    log::trace!("{}", step);
                    steps.push(step);
                    if nodes.len() != 1 {
                        panic!("accept with {} nodes on the stack", nodes.len());
                    }
                    let root = nodes.remove(0);
                    return ParseRun {
                        result: Ok(root),
                        steps,
                    };
                }
                Action::Error => {
                    log::trace!("{}", step);
                    steps.push(step);
                    let error =
                        SyntaxError::new(token.clone(), state, self.table.expected_terminals(state));
                    log::debug!("{}", error);
                    return ParseRun {
                        result: Err(error),
                        steps,
                    };
                }
            }

            log::trace!("{}", step);
            steps.push(step);
        }
    }
}

fn with_end_marker(tokens: &[Token]) -> Vec<Token> {
    let mut tokens = tokens.to_vec();
    match tokens.last() {
        Some(last) if last.kind == TokenKind::Eof => {}
        Some(last) => {
            let eof = Token::eof(last.line, last.column + last.lexeme.chars().count());
            tokens.push(eof);
        }
        None => tokens.push(Token::eof(1, 1)),
    }
    tokens
}
