pub mod first_follow;
pub mod grammar;
pub mod language;
pub mod lr0;
pub mod parse;
pub mod pretty_print;
pub mod slr_table;

pub use first_follow::FirstFollow;
pub use grammar::{Grammar, GrammarError, Production};
pub use lr0::{Item, ItemSet, Lr0Automaton, State, Transition};
pub use slr_table::{Action, Conflict, ConflictKind, SlrTable};

pub const EPSILON: &str = "ε";
pub const END_MARK: &str = "$";
pub const AUGMENTED_START: &str = "S'";
