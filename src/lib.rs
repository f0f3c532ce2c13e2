extern crate wasm_bindgen;

use serde_json::json;
use thiserror::Error;
use wasm_bindgen::prelude::*;

pub mod grammar;
pub mod parser;
pub mod scanner;
pub mod semantic;

pub use grammar::{Action, Conflict, FirstFollow, Grammar, GrammarError, Lr0Automaton, Production, SlrTable};
pub use parser::{replay, ParseRun, ParseStep, ParseTreeNode, SlrParser, SyntaxError};
pub use scanner::{scan, ScanError, Token, TokenKind};
pub use semantic::{analyze, SemanticAnalysis, SemanticError, SymbolTable, ValueType};

/// Anything that stops a source file before it has a parse tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

/// Scans and parses `source` with the shared language parser.
pub fn parse_source(source: &str) -> Result<ParseTreeNode, Error> {
    let tokens = scan(source)?;
    Ok(SlrParser::language().parse(&tokens)?)
}

/// Scans, parses and checks `source`; the JSON carries the tokens, the
/// parse trace, and either the tree with its semantic findings or the error
/// that stopped the run.
#[wasm_bindgen]
pub fn parse_to_json(source: &str) -> String {
    let tokens = match scan(source) {
        Ok(tokens) => tokens,
        Err(e) => return json!({ "error": e.to_string(), "scan_error": e }).to_string(),
    };
    let parser = SlrParser::language();
    let run = parser.run(&tokens);
    let value = match &run.result {
        Ok(tree) => json!({
            "tokens": tokens,
            "warnings": parser.validate_tokens(&tokens),
            "steps": run.steps,
            "tree": tree,
            "semantic": analyze(tree),
        }),
        Err(e) => json!({
            "tokens": tokens,
            "warnings": parser.validate_tokens(&tokens),
            "steps": run.steps,
            "error": e.detailed_message(),
            "syntax_error": e,
        }),
    };
    value.to_string()
}

/// Productions, FIRST/FOLLOW, automaton, table and conflicts of the
/// language grammar.
#[wasm_bindgen]
pub fn tables_to_json() -> String {
    let parser = SlrParser::language();
    let g = parser.grammar();
    json!({
        "productions": g.to_production_output_vec(),
        "first_follow": parser.first_follow().to_non_terminal_output_vec(g),
        "automaton": parser.automaton().to_output(g),
        "table": parser.table().to_output(parser.conflicts()),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_source_reports_both_error_kinds() {
        assert!(parse_source("int x = 5;").is_ok());
        assert!(matches!(parse_source("int x = #;"), Err(Error::Scan(_))));
        assert!(matches!(parse_source("int x"), Err(Error::Syntax(_))));
    }

    #[test]
    fn parse_json_success() {
        let v: serde_json::Value = serde_json::from_str(&parse_to_json("int x = 5;")).unwrap();
        assert_eq!(v["tree"]["symbol"], "program");
        assert_eq!(v["tokens"].as_array().map(|t| t.len()), Some(5));
        assert!(v["steps"].as_array().map(|s| !s.is_empty()).unwrap_or(false));
        assert_eq!(v["semantic"]["errors"].as_array().map(|e| e.len()), Some(0));
    }

    #[test]
    fn parse_json_errors() {
        let v: serde_json::Value = serde_json::from_str(&parse_to_json("int x")).unwrap();
        assert!(v["error"].as_str().unwrap().starts_with("syntax error at line 1"));
        assert!(v["tree"].is_null());

        let v: serde_json::Value = serde_json::from_str(&parse_to_json("\"open")).unwrap();
        assert_eq!(v["scan_error"]["UnterminatedString"]["line"], 1);
    }

    #[test]
    fn tables_json() {
        let v: serde_json::Value = serde_json::from_str(&tables_to_json()).unwrap();
        let states = v["automaton"]["states"].as_array().map(|s| s.len()).unwrap_or(0);
        assert!(states > 0);
        assert_eq!(v["table"]["rows"].as_array().map(|r| r.len()), Some(states));
        assert!(v["table"]["conflicts"]
            .as_array()
            .map(|c| c.iter().any(|c| c["terminal"] == "ELSE" && c["expected"] == true))
            .unwrap_or(false));
    }
}
