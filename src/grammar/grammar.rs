use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::{END_MARK, EPSILON};

/// Authoring defects in a grammar definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("production {production}: symbol `{symbol}` is neither a terminal nor a nonterminal")]
    UnknownSymbol { production: usize, symbol: String },

    #[error("production {production}: `{symbol}` is reserved and cannot appear on a right side")]
    ReservedSymbol { production: usize, symbol: String },

    #[error("production {production}: left side `{left}` is not a nonterminal")]
    LeftSideNotNonTerminal { production: usize, left: String },

    #[error("production id {0} is defined more than once")]
    DuplicateProductionId(usize),

    #[error("production 0 must be the augmented production `S' -> start`")]
    MissingAugmentedProduction,

    #[error("symbol `{0}` is declared both terminal and nonterminal")]
    SymbolClash(String),

    #[error("{set} sets did not reach a fixpoint within {cap} iterations")]
    IterationCapExceeded { set: &'static str, cap: usize },

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Production {
    pub id: usize,
    pub left: String,
    pub right: Vec<String>,
}

impl Production {
    /// Builds a production, dropping `ε` from the right side so that an
    /// empty production has length 0.
    pub fn new(id: usize, left: &str, right: &[&str]) -> Self {
        Self {
            id,
            left: left.to_string(),
            right: right
                .iter()
                .filter(|s| **s != EPSILON)
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.right.len()
    }

    pub fn is_empty(&self) -> bool {
        self.right.is_empty()
    }

    pub fn right_to_string(&self) -> String {
        if self.right.is_empty() {
            EPSILON.to_string()
        } else {
            self.right.join(" ")
        }
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {} -> {}", self.id, self.left, self.right_to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Grammar {
    productions: Vec<Production>,
    by_id: HashMap<usize, usize>,
    by_left: BTreeMap<String, Vec<usize>>,
    terminals: BTreeSet<String>,
    non_terminals: BTreeSet<String>,
    start: String,
    dangling_terminal: Option<String>,
}

impl Grammar {
    pub fn try_new<T, N>(
        productions: Vec<Production>,
        terminals: T,
        non_terminals: N,
    ) -> Result<Self, GrammarError>
    where
        T: IntoIterator,
        T::Item: Into<String>,
        N: IntoIterator,
        N::Item: Into<String>,
    {
        let mut terminals: BTreeSet<String> = terminals.into_iter().map(Into::into).collect();
        terminals.insert(EPSILON.to_string());
        terminals.insert(END_MARK.to_string());
        let non_terminals: BTreeSet<String> = non_terminals.into_iter().map(Into::into).collect();

        if let Some(clash) = terminals.intersection(&non_terminals).next() {
            return Err(GrammarError::SymbolClash(clash.clone()));
        }

        let start = match productions.iter().find(|p| p.id == 0) {
            Some(p) if p.right.len() == 1 => p.left.clone(),
            _ => return Err(GrammarError::MissingAugmentedProduction),
        };

        let mut by_id = HashMap::new();
        let mut by_left: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, p) in productions.iter().enumerate() {
            if by_id.insert(p.id, idx).is_some() {
                return Err(GrammarError::DuplicateProductionId(p.id));
            }
            if !non_terminals.contains(&p.left) {
                return Err(GrammarError::LeftSideNotNonTerminal {
                    production: p.id,
                    left: p.left.clone(),
                });
            }
            if let Some(symbol) = p
                .right
                .iter()
                .find(|s| !terminals.contains(*s) && !non_terminals.contains(*s))
            {
                return Err(GrammarError::UnknownSymbol {
                    production: p.id,
                    symbol: symbol.clone(),
                });
            }
            // the end marker is appended by the parser, never shifted
            if let Some(symbol) = p.right.iter().find(|s| *s == END_MARK || **s == start) {
                return Err(GrammarError::ReservedSymbol {
                    production: p.id,
                    symbol: symbol.clone(),
                });
            }
            by_left.entry(p.left.clone()).or_default().push(idx);
        }

        Ok(Self {
            productions,
            by_id,
            by_left,
            terminals,
            non_terminals,
            start,
            dangling_terminal: None,
        })
    }

    /// Marks the terminal whose shift/reduce conflicts are expected
    /// (the `else` of an `if`).
    pub fn with_dangling_terminal(mut self, terminal: &str) -> Self {
        self.dangling_terminal = Some(terminal.to_string());
        self
    }

    pub fn dangling_terminal(&self) -> Option<&str> {
        self.dangling_terminal.as_deref()
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn get_production(&self, id: usize) -> Option<&Production> {
        self.by_id.get(&id).map(|&idx| &self.productions[idx])
    }

    /// # Panics
    /// When `id` is not part of the grammar.
    pub fn production(&self, id: usize) -> &Production {
        self.get_production(id)
            .unwrap_or_else(|| panic!("production id {} does not exist", id))
    }

    pub fn augmented_production(&self) -> &Production {
        self.production(0)
    }

    pub fn productions_of<'a>(&'a self, left: &str) -> impl Iterator<Item = &'a Production> + 'a {
        self.by_left
            .get(left)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.productions[idx])
    }

    pub fn terminals(&self) -> &BTreeSet<String> {
        &self.terminals
    }

    pub fn non_terminals(&self) -> &BTreeSet<String> {
        &self.non_terminals
    }

    pub fn start_symbol(&self) -> &str {
        &self.start
    }

    pub fn user_start_symbol(&self) -> &str {
        &self.augmented_production().right[0]
    }

    pub fn is_terminal(&self, symbol: &str) -> bool {
        symbol == EPSILON || self.terminals.contains(symbol)
    }

    pub fn is_non_terminal(&self, symbol: &str) -> bool {
        self.non_terminals.contains(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> Vec<Production> {
        vec![
            Production::new(0, "S'", &["S"]),
            Production::new(1, "S", &["a", "S"]),
            Production::new(2, "S", &["ε"]),
        ]
    }

    #[test]
    fn epsilon_right_side_is_empty() {
        let g = Grammar::try_new(tiny(), ["a"], ["S'", "S"]).unwrap();
        let p = g.production(2);
        assert!(p.is_empty());
        assert_eq!(p.to_string(), "2. S -> ε");
    }

    #[test]
    fn epsilon_and_end_mark_are_terminals() {
        let g = Grammar::try_new(tiny(), ["a"], ["S'", "S"]).unwrap();
        assert!(g.is_terminal(EPSILON));
        assert!(g.is_terminal(END_MARK));
        assert!(g.is_non_terminal("S"));
        assert!(!g.is_terminal("S"));
        assert_eq!(g.start_symbol(), "S'");
        assert_eq!(g.user_start_symbol(), "S");
    }

    #[test]
    fn unknown_symbol_is_rejected() {
        let mut prods = tiny();
        prods.push(Production::new(3, "S", &["b"]));
        let err = Grammar::try_new(prods, ["a"], ["S'", "S"]).unwrap_err();
        assert_eq!(
            err,
            GrammarError::UnknownSymbol {
                production: 3,
                symbol: "b".to_string()
            }
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut prods = tiny();
        prods.push(Production::new(1, "S", &["a"]));
        let err = Grammar::try_new(prods, ["a"], ["S'", "S"]).unwrap_err();
        assert_eq!(err, GrammarError::DuplicateProductionId(1));
    }

    #[test]
    fn end_mark_and_augmented_start_stay_off_right_sides() {
        let mut prods = tiny();
        prods.push(Production::new(3, "S", &["a", "$"]));
        let err = Grammar::try_new(prods, ["a"], ["S'", "S"]).unwrap_err();
        assert_eq!(
            err,
            GrammarError::ReservedSymbol {
                production: 3,
                symbol: "$".to_string()
            }
        );

        let mut prods = tiny();
        prods.push(Production::new(3, "S", &["S'", "a"]));
        let err = Grammar::try_new(prods, ["a"], ["S'", "S"]).unwrap_err();
        assert!(matches!(err, GrammarError::ReservedSymbol { production: 3, symbol } if symbol == "S'"));
    }

    #[test]
    fn augmented_production_is_required() {
        let prods = vec![Production::new(1, "S", &["a"])];
        let err = Grammar::try_new(prods, ["a"], ["S"]).unwrap_err();
        assert_eq!(err, GrammarError::MissingAugmentedProduction);
    }

    #[test]
    fn productions_of_keeps_declaration_order() {
        let g = Grammar::try_new(tiny(), ["a"], ["S'", "S"]).unwrap();
        let ids: Vec<usize> = g.productions_of("S").map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(g.productions_of("missing").count(), 0);
    }

    #[test]
    #[should_panic(expected = "production id 42 does not exist")]
    fn missing_production_id_is_fatal() {
        let g = Grammar::try_new(tiny(), ["a"], ["S'", "S"]).unwrap();
        g.production(42);
    }
}
