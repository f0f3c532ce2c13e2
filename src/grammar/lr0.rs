use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;

use serde::Serialize;

use super::Grammar;

/// An LR(0) item. Items order by `(production, dot)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Item {
    pub production: usize,
    pub dot: usize,
}

impl Item {
    pub fn new(production: usize, dot: usize) -> Self {
        Self { production, dot }
    }

    pub fn advance(self) -> Self {
        Self {
            production: self.production,
            dot: self.dot + 1,
        }
    }

    /// The symbol right after the dot, `None` for a complete item.
    pub fn next_symbol<'g>(&self, g: &'g Grammar) -> Option<&'g str> {
        g.production(self.production)
            .right
            .get(self.dot)
            .map(String::as_str)
    }

    pub fn is_complete(&self, g: &Grammar) -> bool {
        self.dot >= g.production(self.production).len()
    }

    pub fn display<'g>(&self, g: &'g Grammar) -> ItemDisplay<'g> {
        ItemDisplay { item: *self, g }
    }
}

pub struct ItemDisplay<'g> {
    item: Item,
    g: &'g Grammar,
}

impl fmt::Display for ItemDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.g.production(self.item.production);
        write!(f, "{}. {} ->", p.id, p.left)?;
        for (i, s) in p.right.iter().enumerate() {
            if i == self.item.dot {
                write!(f, " .")?;
            }
            write!(f, " {}", s)?;
        }
        if self.item.dot >= p.right.len() {
            write!(f, " .")?;
        }
        Ok(())
    }
}

pub type ItemSet = BTreeSet<Item>;

/// Saturates `items`: for every item with a nonterminal `N` after the dot,
/// adds `N -> . α` for each production of `N`, until nothing changes.
pub fn closure<I>(g: &Grammar, items: I) -> ItemSet
where
    I: IntoIterator<Item = Item>,
{
    let mut closure: ItemSet = ItemSet::new();
    let mut q: VecDeque<Item> = VecDeque::new();
    for item in items {
        if closure.insert(item) {
            q.push_back(item);
        }
    }

    while let Some(item) = q.pop_front() {
        if let Some(symbol) = item.next_symbol(g) {
            if g.is_non_terminal(symbol) {
                for production in g.productions_of(symbol) {
                    let new_item = Item::new(production.id, 0);
                    if closure.insert(new_item) {
                        q.push_back(new_item);
                    }
                }
            }
        }
    }

    closure
}

/// The closure of every item of `items` whose dot precedes `symbol`,
/// advanced past it. Empty when no item can move on `symbol`.
pub fn goto(g: &Grammar, items: &ItemSet, symbol: &str) -> ItemSet {
    closure(
        g,
        items
            .iter()
            .filter(|item| item.next_symbol(g) == Some(symbol))
            .map(|item| item.advance()),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub id: usize,
    pub kernel: ItemSet,
    /// The closed item set; this is the state's identity.
    pub items: ItemSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: usize,
    pub symbol: String,
    pub to: usize,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I{} --{}--> I{}", self.from, self.symbol, self.to)
    }
}

#[derive(Debug, Clone)]
pub struct Lr0Automaton {
    states: Vec<State>,
    transitions: Vec<Transition>,
    edges: Vec<BTreeMap<String, usize>>,
    index: HashMap<ItemSet, usize>,
}

impl Lr0Automaton {
    pub fn build(g: &Grammar) -> Self {
        let start_items = closure(g, [Item::new(0, 0)]);
        let mut states = vec![State {
            id: 0,
            kernel: ItemSet::from([Item::new(0, 0)]),
            items: start_items.clone(),
        }];
        let mut index: HashMap<ItemSet, usize> = HashMap::from([(start_items, 0)]);
        let mut edges: Vec<BTreeMap<String, usize>> = vec![BTreeMap::new()];
        let mut transitions: Vec<Transition> = Vec::new();

        let mut q: VecDeque<usize> = VecDeque::new();
        q.push_back(0);

        while let Some(u) = q.pop_front() {
            let mut kernels: BTreeMap<&str, ItemSet> = BTreeMap::new();
            for item in &states[u].items {
                if let Some(symbol) = item.next_symbol(g) {
                    kernels.entry(symbol).or_default().insert(item.advance());
                }
            }

            for (symbol, kernel) in kernels {
                let items = closure(g, kernel.iter().copied());
                let v = match index.get(&items) {
                    Some(&v) => v,
                    None => {
                        let v = states.len();
                        index.insert(items.clone(), v);
                        states.push(State {
                            id: v,
                            kernel,
                            items,
                        });
                        edges.push(BTreeMap::new());
                        q.push_back(v);
                        v
                    }
                };
                edges[u].insert(symbol.to_string(), v);
                transitions.push(Transition {
                    from: u,
                    symbol: symbol.to_string(),
                    to: v,
                });
            }
        }

        log::debug!(
            "lr0: {} states, {} transitions",
            states.len(),
            transitions.len()
        );

        Self {
            states,
            transitions,
            edges,
            index,
        }
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, id: usize) -> &State {
        &self.states[id]
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn transition(&self, state: usize, symbol: &str) -> Option<usize> {
        self.edges.get(state).and_then(|e| e.get(symbol)).copied()
    }

    pub fn edges(&self, state: usize) -> &BTreeMap<String, usize> {
        &self.edges[state]
    }

    /// Finds the state whose closed item set equals `items`.
    pub fn find_state(&self, items: &ItemSet) -> Option<usize> {
        self.index.get(items).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr_grammar() -> Grammar {
        Grammar::parse("E -> E + T | T\nT -> T * F | F\nF -> ( E ) | id").unwrap()
    }

    #[test]
    fn start_state_is_closure_of_augmented_item() {
        let g = expr_grammar();
        let a = Lr0Automaton::build(&g);
        assert_eq!(a.state(0).items, closure(&g, [Item::new(0, 0)]));
        // S' -> .E, E -> .E+T, E -> .T, T -> .T*F, T -> .F, F -> .(E), F -> .id
        assert_eq!(a.state(0).items.len(), 7);
    }

    #[test]
    fn dragon_book_state_count() {
        let g = expr_grammar();
        let a = Lr0Automaton::build(&g);
        assert_eq!(a.states().len(), 12);
    }

    #[test]
    fn closure_is_idempotent() {
        let g = expr_grammar();
        let once = closure(&g, [Item::new(0, 0)]);
        let twice = closure(&g, once.iter().copied());
        assert_eq!(once, twice);
    }

    #[test]
    fn goto_advances_over_symbol() {
        let g = expr_grammar();
        let a = Lr0Automaton::build(&g);
        let next = goto(&g, &a.state(0).items, "id");
        assert_eq!(next, ItemSet::from([Item::new(6, 1)]));
        assert_eq!(a.transition(0, "id"), a.find_state(&next));
        assert!(goto(&g, &a.state(0).items, ")").is_empty());
    }

    #[test]
    fn item_advance_and_display() {
        let g = expr_grammar();
        let item = Item::new(1, 0);
        assert_eq!(item.next_symbol(&g), Some("E"));
        let done = item.advance().advance().advance();
        assert!(done.is_complete(&g));
        assert_eq!(done.next_symbol(&g), None);
        assert_eq!(item.advance().display(&g).to_string(), "1. E -> E . + T");
        assert_eq!(done.display(&g).to_string(), "1. E -> E + T .");
    }

    #[test]
    fn rebuild_is_canonical() {
        let g = Grammar::language();
        let a = Lr0Automaton::build(&g);
        let b = Lr0Automaton::build(&g);
        assert_eq!(a.states(), b.states());
        assert_eq!(a.transitions(), b.transitions());
    }

    #[test]
    fn states_are_unique_and_closed() {
        let g = Grammar::language();
        let a = Lr0Automaton::build(&g);
        let unique: BTreeSet<&ItemSet> = a.states().iter().map(|s| &s.items).collect();
        assert_eq!(unique.len(), a.states().len());
        for s in a.states() {
            assert_eq!(closure(&g, s.items.iter().copied()), s.items);
        }
    }

    #[test]
    fn every_state_is_found_by_its_items() {
        let g = Grammar::language();
        let a = Lr0Automaton::build(&g);
        for s in a.states() {
            assert_eq!(a.find_state(&s.items), Some(s.id));
        }
        assert_eq!(a.find_state(&ItemSet::new()), None);
    }

    #[test]
    fn empty_production_item_is_complete() {
        let g = Grammar::parse("S -> a S | ε").unwrap();
        let a = Lr0Automaton::build(&g);
        assert!(a.state(0).items.contains(&Item::new(2, 0)));
        assert!(Item::new(2, 0).is_complete(&g));
    }
}
