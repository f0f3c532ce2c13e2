use serde::Serialize;
use thiserror::Error;

use crate::scanner::Token;

/// The first token the table has no action for.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error(
    "syntax error at line {}, column {}: unexpected {}",
    .token.line,
    .token.column,
    describe(.token)
)]
pub struct SyntaxError {
    pub token: Token,
    pub state: usize,
    /// Every terminal the parser could have accepted in `state`, sorted.
    pub expected: Vec<String>,
}

fn describe(token: &Token) -> String {
    if token.lexeme.is_empty() {
        format!("end of input ({})", token.kind)
    } else {
        format!("`{}` ({})", token.lexeme, token.kind)
    }
}

impl SyntaxError {
    pub fn new(token: Token, state: usize, expected: Vec<String>) -> Self {
        Self {
            token,
            state,
            expected,
        }
    }

    pub fn line(&self) -> usize {
        self.token.line
    }

    pub fn column(&self) -> usize {
        self.token.column
    }

    pub fn lexeme(&self) -> &str {
        &self.token.lexeme
    }

    /// The one-line message followed by the parser state and the expected set.
    pub fn detailed_message(&self) -> String {
        let expected = if self.expected.is_empty() {
            "nothing".to_string()
        } else {
            self.expected.join(", ")
        };
        format!("{}\n  state: {}\n  expected one of: {}", self, self.state, expected)
    }
}
