use std::collections::BTreeSet;

use super::{Grammar, GrammarError, Production, AUGMENTED_START, END_MARK, EPSILON};

impl Grammar {
    /// Reads a grammar written as `A -> a b | c`, one left side per line.
    ///
    /// A line starting with `|` continues the previous left side. The first
    /// left side is the start symbol; production 0 is the generated
    /// `S' -> start` and the remaining productions are numbered from 1 in
    /// reading order. Symbols that never appear on a left side are terminals.
    pub fn parse(grammar: &str) -> Result<Self, GrammarError> {
        let syntax = |line: usize, message: &str| GrammarError::Syntax {
            line: line + 1,
            message: message.to_string(),
        };

        let mut raw_productions: Vec<(String, &str)> = Vec::new();
        let mut previous_left: Option<String> = None;
        for (i, line) in grammar.lines().enumerate() {
            if line.chars().all(|c| c.is_whitespace()) {
                continue;
            }
            let parts: Vec<&str> = line.split("->").collect();
            if parts.len() > 2 {
                return Err(syntax(i, "too many \"->\""));
            }
            let (left, rights) = if parts.len() == 2 {
                let left_str = parts[0].trim();
                if left_str.is_empty() {
                    return Err(syntax(i, "empty left side"));
                } else if left_str.split_whitespace().count() != 1 {
                    return Err(syntax(i, "left side contains whitespace"));
                }
                (left_str.to_string(), parts[1].trim())
            } else {
                let trimmed = parts[0].trim();
                match (&previous_left, trimmed.strip_prefix('|')) {
                    (Some(left), Some(rest)) => (left.clone(), rest.trim()),
                    _ => return Err(syntax(i, "cannot find left side")),
                }
            };

            previous_left = Some(left.clone());
            raw_productions.push((left, rights));
        }

        let start = match raw_productions.first() {
            Some((left, _)) => left.clone(),
            None => return Err(syntax(0, "grammar has no productions")),
        };

        let mut non_terminals: BTreeSet<String> =
            raw_productions.iter().map(|(left, _)| left.clone()).collect();
        let mut augmented = AUGMENTED_START.to_string();
        while non_terminals.contains(&augmented) {
            augmented.push('\'');
        }
        non_terminals.insert(augmented.clone());

        let mut productions = vec![Production::new(0, &augmented, &[start.as_str()])];
        let mut terminals: BTreeSet<String> = BTreeSet::new();
        for (left, rights) in &raw_productions {
            for right in rights.split('|') {
                let symbols: Vec<&str> = right.split_whitespace().collect();
                for s in &symbols {
                    if !non_terminals.contains(*s) && *s != EPSILON && *s != END_MARK {
                        terminals.insert(s.to_string());
                    }
                }
                productions.push(Production::new(productions.len(), left, &symbols));
            }
        }

        Grammar::try_new(productions, terminals, non_terminals)
    }
}

#[cfg(test)]
mod parse_tests {
    use super::*;

    #[test]
    fn simple_parse() {
        let g = Grammar::parse("S -> a").unwrap();

        assert!(g.is_non_terminal("S"));
        assert!(g.is_terminal("a"));
        assert_eq!(g.production(0).to_string(), "0. S' -> S");
        assert_eq!(g.production(1).right, vec!["a"]);
    }

    #[test]
    fn simple_parse_with_space_and_newline() {
        let g = Grammar::parse("  S -> a \n | b c").unwrap();

        assert_eq!(g.production(1).right, vec!["a"]);
        assert_eq!(g.production(2).right, vec!["b", "c"]);
        assert_eq!(g.production(2).left, "S");
    }

    #[test]
    fn epsilon_alternative() {
        let g = Grammar::parse("S -> a S | ε").unwrap();
        assert!(g.production(2).is_empty());
    }

    #[test]
    fn prime_name_avoids_clash() {
        let g = Grammar::parse("S' -> S\nS -> a").unwrap();
        assert_eq!(g.start_symbol(), "S''");
        assert_eq!(g.user_start_symbol(), "S'");
    }

    #[test]
    fn end_mark_on_right_side() {
        let err = Grammar::parse("S -> IDENTIFIER $").unwrap_err();
        assert_eq!(
            err,
            GrammarError::ReservedSymbol {
                production: 1,
                symbol: "$".to_string()
            }
        );
    }

    #[test]
    fn empty_parse() {
        assert!(Grammar::parse("  \n  ").is_err());
    }

    #[test]
    fn two_rightarrows_parse() {
        let err = Grammar::parse("S -> a -> b").unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { line: 1, .. }));
    }

    #[test]
    fn no_left_parse() {
        assert!(Grammar::parse("-> a").is_err());
    }

    #[test]
    fn no_previous_left_parse() {
        let err = Grammar::parse("| a b\n S -> a").unwrap_err();
        assert_eq!(
            err,
            GrammarError::Syntax {
                line: 1,
                message: "cannot find left side".to_string()
            }
        );
    }

    #[test]
    fn left_contain_space() {
        assert!(Grammar::parse("S a S -> x").is_err());
    }
}
