use std::collections::{BTreeMap, BTreeSet};

use super::{Grammar, GrammarError, END_MARK, EPSILON};

/// Upper bound on full passes over the productions for either fixpoint.
pub const MAX_ITERATIONS: usize = 100;

/// FIRST sets for every symbol and FOLLOW sets for every nonterminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstFollow {
    first: BTreeMap<String, BTreeSet<String>>,
    follow: BTreeMap<String, BTreeSet<String>>,
}

impl FirstFollow {
    pub fn compute(g: &Grammar) -> Result<Self, GrammarError> {
        Self::compute_with_cap(g, MAX_ITERATIONS)
    }

    pub fn compute_with_cap(g: &Grammar, cap: usize) -> Result<Self, GrammarError> {
        let mut ff = Self {
            first: BTreeMap::new(),
            follow: BTreeMap::new(),
        };
        ff.calculate_first(g, cap)?;
        ff.calculate_follow(g, cap)?;
        log::debug!(
            "first/follow: {} first sets, {} follow sets",
            ff.first.len(),
            ff.follow.len()
        );
        Ok(ff)
    }

    fn calculate_first(&mut self, g: &Grammar, cap: usize) -> Result<(), GrammarError> {
        for t in g.terminals() {
            self.first.insert(t.clone(), BTreeSet::from([t.clone()]));
        }
        for nt in g.non_terminals() {
            self.first.insert(nt.clone(), BTreeSet::new());
        }

        let mut iterations = 0;
        let mut changed = true;
        while changed {
            iterations += 1;
            if iterations > cap {
                return Err(GrammarError::IterationCapExceeded { set: "FIRST", cap });
            }

            changed = false;
            for production in g.productions() {
                let first = self.first_of_sequence(production.right.as_slice());
                let left = self
                    .first
                    .get_mut(&production.left)
                    .expect("left side is a declared nonterminal");
                let before = left.len();
                left.extend(first);
                if left.len() > before {
                    changed = true;
                }
            }
        }
        Ok(())
    }

    fn calculate_follow(&mut self, g: &Grammar, cap: usize) -> Result<(), GrammarError> {
        for nt in g.non_terminals() {
            self.follow.insert(nt.clone(), BTreeSet::new());
        }
        self.follow
            .entry(g.start_symbol().to_string())
            .or_default()
            .insert(END_MARK.to_string());

        let mut iterations = 0;
        let mut changed = true;
        while changed {
            iterations += 1;
            if iterations > cap {
                return Err(GrammarError::IterationCapExceeded { set: "FOLLOW", cap });
            }

            changed = false;
            for production in g.productions() {
                let right = &production.right;
                for (i, current) in right.iter().enumerate() {
                    if !g.is_non_terminal(current) {
                        continue;
                    }

                    let mut addition: BTreeSet<String> = BTreeSet::new();
                    match right.get(i + 1) {
                        Some(next) => {
                            addition.extend(
                                self.first(next).iter().filter(|s| *s != EPSILON).cloned(),
                            );
                            if self.is_nullable(next) {
                                addition.extend(self.follow(&production.left).iter().cloned());
                            }
                        }
                        None => addition.extend(self.follow(&production.left).iter().cloned()),
                    }

                    let follow = self
                        .follow
                        .get_mut(current)
                        .expect("every nonterminal has a follow set");
                    let before = follow.len();
                    follow.extend(addition);
                    if follow.len() > before {
                        changed = true;
                    }
                }
            }
        }
        Ok(())
    }

    /// FIRST of a symbol sequence: `{ε}` for the empty sequence, otherwise
    /// the union of FIRST(Yi) \ {ε} up to the first non-nullable Yi, plus
    /// `ε` when every symbol is nullable.
    pub fn first_of_sequence<S: AsRef<str>>(&self, symbols: &[S]) -> BTreeSet<String> {
        let mut first = BTreeSet::new();
        for symbol in symbols {
            let symbol_first = self.first(symbol.as_ref());
            first.extend(symbol_first.iter().filter(|s| *s != EPSILON).cloned());
            if !symbol_first.contains(EPSILON) {
                return first;
            }
        }
        first.insert(EPSILON.to_string());
        first
    }

    /// FIRST(symbol); empty for a symbol unknown to the grammar.
    pub fn first(&self, symbol: &str) -> &BTreeSet<String> {
        static EMPTY: BTreeSet<String> = BTreeSet::new();
        self.first.get(symbol).unwrap_or(&EMPTY)
    }

    pub fn follow(&self, non_terminal: &str) -> &BTreeSet<String> {
        static EMPTY: BTreeSet<String> = BTreeSet::new();
        self.follow.get(non_terminal).unwrap_or(&EMPTY)
    }

    pub fn is_nullable(&self, symbol: &str) -> bool {
        self.first(symbol).contains(EPSILON)
    }

    pub fn first_sets(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.first
    }

    pub fn follow_sets(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.follow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn expression_grammar() {
        let g = Grammar::parse(
            "E -> T E2\n\
             E2 -> + T E2 | ε\n\
             T -> F T2\n\
             T2 -> * F T2 | ε\n\
             F -> ( E ) | id",
        )
        .unwrap();
        let ff = FirstFollow::compute(&g).unwrap();

        assert_eq!(ff.first("E"), &set(&["(", "id"]));
        assert_eq!(ff.first("E2"), &set(&["+", "ε"]));
        assert_eq!(ff.first("T2"), &set(&["*", "ε"]));
        assert_eq!(ff.follow("E"), &set(&["$", ")"]));
        assert_eq!(ff.follow("E2"), &set(&["$", ")"]));
        assert_eq!(ff.follow("T"), &set(&["$", ")", "+"]));
        assert_eq!(ff.follow("F"), &set(&["$", ")", "*", "+"]));
        assert!(ff.is_nullable("E2"));
        assert!(!ff.is_nullable("E"));
    }

    #[test]
    fn first_of_terminal_is_itself() {
        let g = Grammar::language();
        let ff = FirstFollow::compute(&g).unwrap();
        for t in g.terminals() {
            assert_eq!(ff.first(t), &set(&[t.as_str()]));
        }
        assert!(ff.is_nullable(EPSILON));
        assert!(!ff.is_nullable("IF"));
    }

    #[test]
    fn follow_sets_hold_only_terminals() {
        let g = Grammar::language();
        let ff = FirstFollow::compute(&g).unwrap();
        assert!(ff.follow(g.start_symbol()).contains(END_MARK));
        for nt in g.non_terminals() {
            for s in ff.follow(nt) {
                assert!(g.is_terminal(s) && s != EPSILON, "FOLLOW({}) has {}", nt, s);
            }
        }
    }

    #[test]
    fn language_nullable_symbols() {
        let g = Grammar::language();
        let ff = FirstFollow::compute(&g).unwrap();
        for nt in ["params", "args", "for_init", "for_cond", "for_update", "modifiers", "class_members"] {
            assert!(ff.is_nullable(nt), "{} should be nullable", nt);
        }
        assert!(!ff.is_nullable("stmt_list"));
        assert!(ff.follow("block").contains("ELSE"));
        assert!(ff.follow("type").contains("IDENTIFIER"));
        assert!(ff.first("class_decl").contains("CLASS"));
    }

    #[test]
    fn sequence_first() {
        let g = Grammar::language();
        let ff = FirstFollow::compute(&g).unwrap();
        let empty: [&str; 0] = [];
        assert_eq!(ff.first_of_sequence(&empty[..]), set(&["ε"]));
        assert_eq!(ff.first_of_sequence(&["modifiers", "CLASS"][..]), set(&["CLASS", "PRIVATE", "PUBLIC"]));
    }

    #[test]
    fn iteration_cap_is_enforced() {
        let g = Grammar::parse("A -> B\nB -> C\nC -> D\nD -> x").unwrap();
        let err = FirstFollow::compute_with_cap(&g, 1).unwrap_err();
        assert_eq!(err, GrammarError::IterationCapExceeded { set: "FIRST", cap: 1 });
        assert!(FirstFollow::compute_with_cap(&g, 10).is_ok());
    }
}
