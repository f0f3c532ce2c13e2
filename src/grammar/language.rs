//! The grammar of the small Java-like teaching language.
//!
//! Production ids are part of the contract with everything that reads the
//! parse tables (REDUCE actions carry them, diagnostics and tests key on
//! them). They are intentionally non-contiguous; never renumber them.

use super::{Grammar, Production, AUGMENTED_START};

/// The terminal that closes a dangling `if`; its shift/reduce conflicts
/// are resolved in favour of shifting without a warning.
pub const DANGLING_ELSE: &str = "ELSE";

pub const TERMINALS: &[&str] = &[
    "AND", "ASSIGN", "BOOLEAN", "BYTE", "CHAR", "CHAR_LITERAL", "COMMA",
    "DIVIDE", "DOUBLE", "ELSE", "EQUAL_EQUAL", "FALSE", "FLOAT", "GREATER",
    "GREATER_EQUAL", "IDENTIFIER", "IF", "INT", "INTEGER", "LESS",
    "LESS_EQUAL", "LONG", "MINUS", "MULTIPLY", "NOT", "NOT_EQUAL",
    "OR", "PLUS", "RETURN", "RIGHT_BRACE", "RIGHT_PAREN", "SEMICOLON",
    "SWITCH", "CASE", "DEFAULT", "COLON", "BREAK", "SHORT", "STRING",
    "STRING_LITERAL", "TRUE", "VOID", "WHILE", "FOR", "FLOAT_NUMBER",
    "MODULO", "PLUS_ASSIGN", "MINUS_ASSIGN", "MULTIPLY_ASSIGN", "DIVIDE_ASSIGN",
    "MODULO_ASSIGN", "LEFT_BRACE", "LEFT_PAREN", "INCREMENT", "DECREMENT",
    "CLASS", "PUBLIC", "PRIVATE", "NEW", "THIS", "DOT", "DO",
];

pub const NON_TERMINALS: &[&str] = &[
    AUGMENTED_START, "program", "stmt_list", "stmt", "expr_stmt",
    "decl_stmt", "type", "expr", "and_expr", "eq_expr",
    "rel_expr", "add_expr", "term", "factor",
    "if_stmt", "while_stmt", "block", "function_decl",
    "params", "param_list", "param", "return_stmt",
    "args", "arg_list", "for_stmt", "for_init", "for_cond",
    "for_update", "decl_stmt_inline", "expr_stmt_inline", "postfix_expr",
    "unary_expr", "do_while_stmt", "switch_stmt", "case_list", "case",
    "default_case", "literal", "case_body", "break_stmt", "compound_assign",
    "modifier", "modifiers", "class_decl", "class_members", "class_member",
    "field_decl", "constructor_decl", "method_decl",
];

#[rustfmt::skip]
fn productions() -> Vec<Production> {
    let p = Production::new;
    vec![
        p(0, AUGMENTED_START, &["program"]),
        p(1, "program", &["stmt_list"]),
        p(2, "stmt_list", &["stmt"]),
        p(3, "stmt_list", &["stmt_list", "stmt"]),
        p(4, "stmt", &["expr_stmt"]),
        p(5, "stmt", &["decl_stmt"]),
        p(6, "expr_stmt", &["expr", "SEMICOLON"]),
        p(7, "decl_stmt", &["type", "IDENTIFIER", "SEMICOLON"]),
        p(8, "decl_stmt", &["type", "IDENTIFIER", "ASSIGN", "expr", "SEMICOLON"]),
        // types
        p(9, "type", &["BYTE"]),
        p(10, "type", &["SHORT"]),
        p(11, "type", &["INT"]),
        p(12, "type", &["LONG"]),
        p(13, "type", &["FLOAT"]),
        p(14, "type", &["DOUBLE"]),
        p(15, "type", &["BOOLEAN"]),
        p(16, "type", &["CHAR"]),
        p(17, "type", &["STRING"]),
        p(18, "type", &["VOID"]),
        // functions
        p(19, "stmt", &["function_decl"]),
        p(20, "function_decl", &["type", "IDENTIFIER", "LEFT_PAREN", "params", "RIGHT_PAREN", "block"]),
        p(21, "params", &["param_list"]),
        p(22, "params", &["ε"]),
        p(23, "param_list", &["param"]),
        p(24, "param_list", &["param_list", "COMMA", "param"]),
        p(25, "param", &["type", "IDENTIFIER"]),
        // if
        p(26, "stmt", &["if_stmt"]),
        p(27, "if_stmt", &["IF", "LEFT_PAREN", "expr", "RIGHT_PAREN", "block"]),
        p(28, "if_stmt", &["IF", "LEFT_PAREN", "expr", "RIGHT_PAREN", "block", "ELSE", "block"]),
        // switch
        p(29, "stmt", &["switch_stmt"]),
        p(30, "switch_stmt", &["SWITCH", "LEFT_PAREN", "expr", "RIGHT_PAREN", "LEFT_BRACE", "case_list", "RIGHT_BRACE"]),
        p(31, "case_list", &["case"]),
        p(32, "case_list", &["case_list", "case"]),
        p(33, "case_list", &["case_list", "default_case"]),
        p(34, "case", &["CASE", "literal", "COLON", "case_body"]),
        p(35, "default_case", &["DEFAULT", "COLON", "case_body"]),
        p(36, "case_body", &["stmt_list"]),
        p(37, "case_body", &["stmt_list", "break_stmt"]),
        p(38, "stmt", &["break_stmt"]),
        p(39, "break_stmt", &["BREAK", "SEMICOLON"]),
        p(40, "stmt", &["return_stmt"]),
        p(41, "return_stmt", &["RETURN", "expr", "SEMICOLON"]),
        // loops
        p(42, "stmt", &["while_stmt"]),
        p(43, "while_stmt", &["WHILE", "LEFT_PAREN", "expr", "RIGHT_PAREN", "block"]),
        p(44, "stmt", &["do_while_stmt"]),
        p(45, "do_while_stmt", &["DO", "block", "WHILE", "LEFT_PAREN", "expr", "RIGHT_PAREN", "SEMICOLON"]),
        p(46, "stmt", &["for_stmt"]),
        p(47, "for_stmt", &["FOR", "LEFT_PAREN", "for_init", "SEMICOLON", "for_cond", "SEMICOLON", "for_update", "RIGHT_PAREN", "block"]),
        p(48, "for_init", &["decl_stmt_inline"]),
        p(49, "for_init", &["expr_stmt_inline"]),
        p(50, "for_init", &["ε"]),
        p(51, "for_cond", &["expr"]),
        p(52, "for_cond", &["ε"]),
        p(53, "for_update", &["expr"]),
        p(54, "for_update", &["ε"]),
        // blocks
        p(55, "block", &["LEFT_BRACE", "stmt_list", "RIGHT_BRACE"]),
        p(56, "block", &["stmt"]),
        // expressions, loosest binding first
        p(57, "expr", &["expr", "OR", "and_expr"]),
        p(58, "expr", &["and_expr"]),
        p(59, "and_expr", &["and_expr", "AND", "eq_expr"]),
        p(60, "and_expr", &["eq_expr"]),
        p(61, "eq_expr", &["eq_expr", "EQUAL_EQUAL", "rel_expr"]),
        p(62, "eq_expr", &["eq_expr", "NOT_EQUAL", "rel_expr"]),
        p(63, "eq_expr", &["rel_expr"]),
        p(64, "rel_expr", &["rel_expr", "GREATER", "add_expr"]),
        p(65, "rel_expr", &["rel_expr", "LESS", "add_expr"]),
        p(66, "rel_expr", &["rel_expr", "GREATER_EQUAL", "add_expr"]),
        p(67, "rel_expr", &["rel_expr", "LESS_EQUAL", "add_expr"]),
        p(68, "rel_expr", &["add_expr"]),
        p(69, "add_expr", &["add_expr", "PLUS", "term"]),
        p(70, "add_expr", &["add_expr", "MINUS", "term"]),
        p(71, "add_expr", &["term"]),
        p(72, "term", &["term", "MULTIPLY", "factor"]),
        p(73, "term", &["term", "DIVIDE", "factor"]),
        p(104, "term", &["term", "MODULO", "factor"]),
        p(74, "term", &["postfix_expr"]),
        p(75, "unary_expr", &["INCREMENT", "unary_expr"]),
        p(76, "unary_expr", &["DECREMENT", "unary_expr"]),
        p(77, "unary_expr", &["factor"]),
        p(78, "postfix_expr", &["unary_expr"]),
        p(79, "postfix_expr", &["postfix_expr", "INCREMENT"]),
        p(80, "postfix_expr", &["postfix_expr", "DECREMENT"]),
        p(81, "factor", &["NOT", "factor"]),
        p(82, "factor", &["INTEGER"]),
        p(83, "factor", &["FLOAT_NUMBER"]),
        p(84, "factor", &["IDENTIFIER"]),
        p(85, "factor", &["LEFT_PAREN", "expr", "RIGHT_PAREN"]),
        p(86, "factor", &["TRUE"]),
        p(87, "factor", &["FALSE"]),
        p(88, "factor", &["STRING_LITERAL"]),
        p(89, "factor", &["CHAR_LITERAL"]),
        p(90, "factor", &["IDENTIFIER", "LEFT_PAREN", "args", "RIGHT_PAREN"]),
        // call arguments
        p(91, "args", &["arg_list"]),
        p(92, "args", &["ε"]),
        p(93, "arg_list", &["expr"]),
        p(94, "arg_list", &["arg_list", "COMMA", "expr"]),
        // `for` header pieces
        p(95, "decl_stmt_inline", &["type", "IDENTIFIER", "ASSIGN", "expr"]),
        p(96, "decl_stmt_inline", &["type", "IDENTIFIER"]),
        p(97, "expr_stmt_inline", &["expr"]),
        // case labels
        p(98, "literal", &["INTEGER"]),
        p(99, "literal", &["FLOAT_NUMBER"]),
        p(100, "literal", &["CHAR_LITERAL"]),
        p(101, "literal", &["STRING_LITERAL"]),
        p(102, "literal", &["TRUE"]),
        p(103, "literal", &["FALSE"]),
        // assignments
        p(110, "expr_stmt", &["IDENTIFIER", "compound_assign", "expr", "SEMICOLON"]),
        p(111, "compound_assign", &["ASSIGN"]),
        p(112, "compound_assign", &["PLUS_ASSIGN"]),
        p(113, "compound_assign", &["MINUS_ASSIGN"]),
        p(114, "compound_assign", &["MULTIPLY_ASSIGN"]),
        p(115, "compound_assign", &["DIVIDE_ASSIGN"]),
        p(116, "compound_assign", &["MODULO_ASSIGN"]),
        // access modifiers
        p(117, "modifier", &["PUBLIC"]),
        p(118, "modifier", &["PRIVATE"]),
        p(119, "modifiers", &["modifier"]),
        p(120, "modifiers", &["modifiers", "modifier"]),
        p(121, "modifiers", &["ε"]),
        // classes
        p(122, "stmt", &["class_decl"]),
        p(123, "class_decl", &["modifiers", "CLASS", "IDENTIFIER", "LEFT_BRACE", "class_members", "RIGHT_BRACE"]),
        p(124, "class_members", &["class_member"]),
        p(125, "class_members", &["class_members", "class_member"]),
        p(126, "class_members", &["ε"]),
        p(127, "class_member", &["field_decl"]),
        p(128, "class_member", &["method_decl"]),
        p(129, "class_member", &["constructor_decl"]),
        p(130, "field_decl", &["modifiers", "type", "IDENTIFIER", "SEMICOLON"]),
        p(131, "field_decl", &["modifiers", "type", "IDENTIFIER", "ASSIGN", "expr", "SEMICOLON"]),
        p(132, "method_decl", &["modifiers", "function_decl"]),
        p(133, "constructor_decl", &["modifiers", "IDENTIFIER", "LEFT_PAREN", "params", "RIGHT_PAREN", "block"]),
        p(134, "factor", &["NEW", "IDENTIFIER", "LEFT_PAREN", "args", "RIGHT_PAREN"]),
        p(135, "factor", &["THIS", "DOT", "IDENTIFIER"]),
    ]
}

impl Grammar {
    /// The grammar of the teaching language.
    ///
    /// # Panics
    /// If the hard-coded grammar is inconsistent.
    pub fn language() -> Self {
        Grammar::try_new(productions(), TERMINALS.iter().copied(), NON_TERMINALS.iter().copied())
            .map(|g| g.with_dangling_terminal(DANGLING_ELSE))
            .unwrap_or_else(|e| panic!("language grammar is malformed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_grammar_is_well_formed() {
        let g = Grammar::language();
        assert_eq!(g.productions().len(), 131);
        assert_eq!(g.start_symbol(), AUGMENTED_START);
        assert_eq!(g.user_start_symbol(), "program");
        assert_eq!(g.dangling_terminal(), Some(DANGLING_ELSE));
    }

    #[test]
    fn production_ids_are_preserved() {
        let g = Grammar::language();
        assert_eq!(g.production(104).to_string(), "104. term -> term MODULO factor");
        assert_eq!(g.production(22).to_string(), "22. params -> ε");
        assert!(g.get_production(105).is_none());
        assert_eq!(g.production(8).len(), 5);
    }

    #[test]
    fn every_non_terminal_has_a_production() {
        let g = Grammar::language();
        for nt in g.non_terminals() {
            assert!(g.productions_of(nt).next().is_some(), "{} has no production", nt);
        }
    }
}
