use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::{FirstFollow, Grammar, Lr0Automaton, END_MARK, EPSILON};

/// An entry of the ACTION table. Missing entries read as [`Action::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Action {
    Shift(usize),
    Reduce(usize),
    Accept,
    Error,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Shift(s) => write!(f, "s{}", s),
            Action::Reduce(p) => write!(f, "r{}", p),
            Action::Accept => write!(f, "acc"),
            Action::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
    AcceptReduce,
    AcceptShift,
}

/// A table cell that more than one action wanted, and how it was settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub state: usize,
    pub terminal: String,
    pub kind: ConflictKind,
    pub kept: Action,
    pub discarded: Action,
    /// Set for conflicts on the grammar's dangling-construct terminal.
    pub expected: bool,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ConflictKind::ShiftReduce => "shift/reduce",
            ConflictKind::ReduceReduce => "reduce/reduce",
            ConflictKind::AcceptReduce => "accept/reduce",
            ConflictKind::AcceptShift => "accept/shift",
        };
        write!(
            f,
            "{} conflict in state {} on {}: kept {}, discarded {}",
            kind, self.state, self.terminal, self.kept, self.discarded
        )
    }
}

#[derive(Debug, Clone)]
pub struct SlrTable {
    action: Vec<BTreeMap<String, Action>>,
    goto: Vec<BTreeMap<String, usize>>,
    terminals: Vec<String>,
    non_terminals: Vec<String>,
}

impl SlrTable {
    /// Fills ACTION/GOTO from the automaton and the FOLLOW sets.
    ///
    /// Shift always beats reduce on the same terminal; between two reduces
    /// the one installed last (items and FOLLOW sets are visited in sorted
    /// order) wins. Every overwritten or refused entry is returned as a
    /// [`Conflict`].
    pub fn build(g: &Grammar, automaton: &Lr0Automaton, ff: &FirstFollow) -> (Self, Vec<Conflict>) {
        let n = automaton.states().len();
        let mut table = Self {
            action: vec![BTreeMap::new(); n],
            goto: vec![BTreeMap::new(); n],
            terminals: g
                .terminals()
                .iter()
                .filter(|t| *t != EPSILON)
                .cloned()
                .collect(),
            non_terminals: g
                .non_terminals()
                .iter()
                .filter(|nt| *nt != g.start_symbol())
                .cloned()
                .collect(),
        };
        let mut conflicts = Vec::new();

        for state in automaton.states() {
            let s = state.id;
            for item in &state.items {
                let production = g.production(item.production);
                match item.next_symbol(g) {
                    None if production.id == 0 => {
                        table.install(g, s, END_MARK, Action::Accept, &mut conflicts);
                    }
                    None => {
                        for t in ff.follow(&production.left) {
                            table.install(g, s, t, Action::Reduce(production.id), &mut conflicts);
                        }
                    }
                    Some(symbol) => {
                        let target = automaton.transition(s, symbol).unwrap_or_else(|| {
                            panic!("state {} has an item on `{}` but no transition", s, symbol)
                        });
                        if g.is_terminal(symbol) {
                            table.install(g, s, symbol, Action::Shift(target), &mut conflicts);
                        } else {
                            table.goto[s].insert(symbol.to_string(), target);
                        }
                    }
                }
            }
        }

        (table, conflicts)
    }

    fn install(
        &mut self,
        g: &Grammar,
        state: usize,
        terminal: &str,
        action: Action,
        conflicts: &mut Vec<Conflict>,
    ) {
        let previous = match self.action[state].get(terminal) {
            Some(&previous) => previous,
            None => {
                self.action[state].insert(terminal.to_string(), action);
                return;
            }
        };
        if previous == action {
            return;
        }

        let (kind, kept) = match (previous, action) {
            (Action::Reduce(_), Action::Shift(_)) => (ConflictKind::ShiftReduce, action),
            (Action::Shift(_), Action::Reduce(_)) => (ConflictKind::ShiftReduce, previous),
            (Action::Reduce(_), Action::Reduce(_)) => (ConflictKind::ReduceReduce, action),
            (Action::Accept, Action::Shift(_)) => (ConflictKind::AcceptShift, previous),
            (Action::Shift(_), Action::Accept) => (ConflictKind::AcceptShift, action),
            (Action::Accept, _) => (ConflictKind::AcceptReduce, previous),
            (_, Action::Accept) => (ConflictKind::AcceptReduce, action),
            // two shifts on one terminal share the automaton's single edge
            _ => unreachable!("conflicting {} and {} in state {}", previous, action, state),
        };
        let discarded = if kept == action { previous } else { action };
        self.action[state].insert(terminal.to_string(), kept);

        let conflict = Conflict {
            state,
            terminal: terminal.to_string(),
            kind,
            kept,
            discarded,
            expected: g.dangling_terminal() == Some(terminal),
        };
        if conflict.expected {
            log::debug!("{}", conflict);
        } else {
            log::warn!("{}", conflict);
        }
        conflicts.push(conflict);
    }

    pub fn action(&self, state: usize, terminal: &str) -> Action {
        self.action
            .get(state)
            .and_then(|row| row.get(terminal))
            .copied()
            .unwrap_or(Action::Error)
    }

    pub fn goto(&self, state: usize, non_terminal: &str) -> Option<usize> {
        self.goto.get(state).and_then(|row| row.get(non_terminal)).copied()
    }

    /// Every terminal with a non-error action in `state`, in sorted order.
    pub fn expected_terminals(&self, state: usize) -> Vec<String> {
        self.terminals
            .iter()
            .filter(|t| self.action(state, t) != Action::Error)
            .cloned()
            .collect()
    }

    pub fn state_count(&self) -> usize {
        self.action.len()
    }

    /// Terminal columns of the ACTION table (`ε` excluded, `$` included).
    pub fn terminals(&self) -> &[String] {
        &self.terminals
    }

    pub fn non_terminals(&self) -> &[String] {
        &self.non_terminals
    }

    pub fn action_row(&self, state: usize) -> &BTreeMap<String, Action> {
        &self.action[state]
    }

    pub fn goto_row(&self, state: usize) -> &BTreeMap<String, usize> {
        &self.goto[state]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(g: &Grammar) -> (Lr0Automaton, SlrTable, Vec<Conflict>) {
        let ff = FirstFollow::compute(g).unwrap();
        let a = Lr0Automaton::build(g);
        let (t, c) = SlrTable::build(g, &a, &ff);
        (a, t, c)
    }

    #[test]
    fn expression_grammar_is_slr() {
        let g = Grammar::parse("E -> E + T | T\nT -> T * F | F\nF -> ( E ) | id").unwrap();
        let (a, t, conflicts) = build(&g);
        assert!(conflicts.is_empty());

        let after_e = a.transition(0, "E").unwrap();
        assert_eq!(t.action(after_e, END_MARK), Action::Accept);
        assert_eq!(t.goto(0, "E"), Some(after_e));
        assert!(matches!(t.action(0, "id"), Action::Shift(_)));
        assert_eq!(t.action(0, "+"), Action::Error);
        assert_eq!(t.goto(0, "+"), None);
        assert_eq!(t.expected_terminals(0), vec!["(", "id"]);
    }

    #[test]
    fn shift_wins_over_reduce() {
        let g = Grammar::parse("S -> IF S | IF S ELSE S | IDENTIFIER").unwrap();
        let (a, t, conflicts) = build(&g);

        let s = a.transition(0, "IF").unwrap();
        let s = a.transition(s, "S").unwrap();
        assert!(matches!(t.action(s, "ELSE"), Action::Shift(target) if Some(target) == a.transition(s, "ELSE")));

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::ShiftReduce);
        assert_eq!(conflicts[0].kept, t.action(s, "ELSE"));
        assert_eq!(conflicts[0].discarded, Action::Reduce(1));
        assert!(!conflicts[0].expected);
    }

    #[test]
    fn dangling_terminal_conflicts_are_expected() {
        let g = Grammar::parse("S -> IF S | IF S ELSE S | IDENTIFIER")
            .unwrap()
            .with_dangling_terminal("ELSE");
        let (_, _, conflicts) = build(&g);
        assert!(conflicts.iter().all(|c| c.expected));
    }

    #[test]
    fn reduce_reduce_keeps_the_last_installed() {
        let g = Grammar::parse("S -> A | B\nA -> x\nB -> x").unwrap();
        let (a, t, conflicts) = build(&g);
        let s = a.transition(0, "x").unwrap();
        assert_eq!(t.action(s, END_MARK), Action::Reduce(4));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::ReduceReduce);
        assert_eq!(conflicts[0].discarded, Action::Reduce(3));
    }

    #[test]
    fn accept_is_never_overwritten() {
        let g = Grammar::parse("S -> a").unwrap();
        let mut table = SlrTable {
            action: vec![BTreeMap::new()],
            goto: vec![BTreeMap::new()],
            terminals: vec![END_MARK.to_string()],
            non_terminals: Vec::new(),
        };
        let mut conflicts = Vec::new();
        table.install(&g, 0, END_MARK, Action::Accept, &mut conflicts);
        table.install(&g, 0, END_MARK, Action::Shift(3), &mut conflicts);
        table.install(&g, 0, END_MARK, Action::Reduce(1), &mut conflicts);

        assert_eq!(table.action(0, END_MARK), Action::Accept);
        let kinds: Vec<ConflictKind> = conflicts.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ConflictKind::AcceptShift, ConflictKind::AcceptReduce]);
        assert_eq!(conflicts[0].discarded, Action::Shift(3));
        assert_eq!(conflicts[0].to_string(), "accept/shift conflict in state 0 on $: kept acc, discarded s3");
    }

    #[test]
    fn language_else_conflicts_resolve_to_shift() {
        let g = Grammar::language();
        let (a, t, conflicts) = build(&g);
        let else_conflicts: Vec<&Conflict> =
            conflicts.iter().filter(|c| c.terminal == "ELSE").collect();
        assert!(!else_conflicts.is_empty());
        assert!(else_conflicts.iter().any(|c| c.kind == ConflictKind::ShiftReduce));
        for c in else_conflicts {
            assert!(c.expected);
            if let Some(target) = a.transition(c.state, "ELSE") {
                assert_eq!(t.action(c.state, "ELSE"), Action::Shift(target));
            }
        }
    }

    #[test]
    fn action_only_on_terminals_goto_only_on_non_terminals() {
        let g = Grammar::language();
        let (a, t, _) = build(&g);
        for s in 0..a.states().len() {
            for terminal in t.action_row(s).keys() {
                assert!(g.is_terminal(terminal) && terminal != EPSILON);
            }
            for nt in t.goto_row(s).keys() {
                assert!(g.is_non_terminal(nt));
            }
        }
    }
}
