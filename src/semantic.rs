//! A shallow pass over the finished parse tree: scopes, declarations and
//! assignment compatibility.
//!
//! The walk keys on nonterminal labels and child positions of the language
//! grammar's productions, so it only makes sense for trees produced from
//! [`Grammar::language`](crate::grammar::Grammar::language).

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::parser::ParseTreeNode;
use crate::scanner::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Char,
    #[serde(rename = "String")]
    String,
    Void,
}

impl ValueType {
    pub fn from_keyword(kind: TokenKind) -> Option<Self> {
        Some(match kind {
            TokenKind::Byte => ValueType::Byte,
            TokenKind::Short => ValueType::Short,
            TokenKind::Int => ValueType::Int,
            TokenKind::Long => ValueType::Long,
            TokenKind::Float => ValueType::Float,
            TokenKind::Double => ValueType::Double,
            TokenKind::Boolean => ValueType::Boolean,
            TokenKind::Char => ValueType::Char,
            TokenKind::String => ValueType::String,
            TokenKind::Void => ValueType::Void,
            _ => return None,
        })
    }

    pub fn of_literal(kind: TokenKind) -> Option<Self> {
        Some(match kind {
            TokenKind::Integer => ValueType::Int,
            TokenKind::FloatNumber => ValueType::Double,
            TokenKind::StringLiteral => ValueType::String,
            TokenKind::CharLiteral => ValueType::Char,
            TokenKind::True | TokenKind::False => ValueType::Boolean,
            _ => return None,
        })
    }

    pub fn is_numeric(self) -> bool {
        use ValueType::*;
        matches!(self, Byte | Short | Int | Long | Float | Double | Char)
    }

    /// Whether a value of type `value` may be stored in a `self`.
    pub fn accepts(self, value: ValueType) -> bool {
        use ValueType::*;
        self == value
            || matches!(
                (value, self),
                (Byte, Short | Int | Long | Float | Double)
                    | (Short, Int | Long | Float | Double)
                    | (Char, Int | Long | Float | Double)
                    | (Int, Long | Float | Double)
                    | (Long, Float | Double)
                    | (Float, Double)
            )
    }

    /// Binary numeric promotion; `None` unless both operands are numeric.
    fn promote(a: ValueType, b: ValueType) -> Option<ValueType> {
        use ValueType::*;
        if !a.is_numeric() || !b.is_numeric() {
            return None;
        }
        Some(match (a, b) {
            (Double, _) | (_, Double) => Double,
            (Float, _) | (_, Float) => Float,
            (Long, _) | (_, Long) => Long,
            _ => Int,
        })
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Byte => "byte",
            ValueType::Short => "short",
            ValueType::Int => "int",
            ValueType::Long => "long",
            ValueType::Float => "float",
            ValueType::Double => "double",
            ValueType::Boolean => "boolean",
            ValueType::Char => "char",
            ValueType::String => "String",
            ValueType::Void => "void",
        };
        f.pad(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub value_type: ValueType,
    pub parameters: Vec<ValueType>,
    pub scope: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    #[serde(skip)]
    open: Vec<(usize, HashMap<String, usize>)>,
    #[serde(skip)]
    next_scope: usize,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            symbols: Vec::new(),
            open: vec![(0, HashMap::new())],
            next_scope: 1,
        }
    }

    pub fn enter_scope(&mut self) -> usize {
        let id = self.next_scope;
        self.next_scope += 1;
        self.open.push((id, HashMap::new()));
        id
    }

    /// Closes the innermost scope. The global scope stays open.
    pub fn exit_scope(&mut self) {
        if self.open.len() > 1 {
            self.open.pop();
        }
    }

    pub fn current_scope(&self) -> usize {
        self.open.last().map(|(id, _)| *id).unwrap_or(0)
    }

    pub fn declare(&mut self, mut symbol: Symbol) -> Result<(), &Symbol> {
        let index = self.symbols.len();
        let (scope, names) = self.open.last_mut().expect("global scope is never closed");
        if let Some(&existing) = names.get(&symbol.name) {
            return Err(&self.symbols[existing]);
        }
        symbol.scope = *scope;
        names.insert(symbol.name.clone(), index);
        self.symbols.push(symbol);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.open
            .iter()
            .rev()
            .find_map(|(_, names)| names.get(name))
            .map(|&i| &self.symbols[i])
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum SemanticError {
    #[error("line {line}, column {column}: `{name}` is already declared in this scope")]
    Redeclared { name: String, line: usize, column: usize },

    #[error("line {line}, column {column}: `{name}` is not declared")]
    Undeclared { name: String, line: usize, column: usize },

    #[error("line {line}, column {column}: `{name}` is not a function")]
    NotAFunction { name: String, line: usize, column: usize },

    #[error("line {line}, column {column}: cannot assign {found} to `{name}` of type {expected}")]
    IncompatibleAssignment {
        name: String,
        expected: ValueType,
        found: ValueType,
        line: usize,
        column: usize,
    },

    #[error("line {line}, column {column}: cannot return {found} from a function returning {expected}")]
    IncompatibleReturn {
        expected: ValueType,
        found: ValueType,
        line: usize,
        column: usize,
    },

    #[error("line {line}, column {column}: `{name}` takes {expected} argument(s), {found} given")]
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
        line: usize,
        column: usize,
    },
}

impl SemanticError {
    pub fn line(&self) -> usize {
        match self {
            SemanticError::Redeclared { line, .. }
            | SemanticError::Undeclared { line, .. }
            | SemanticError::NotAFunction { line, .. }
            | SemanticError::IncompatibleAssignment { line, .. }
            | SemanticError::IncompatibleReturn { line, .. }
            | SemanticError::ArgumentCount { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            SemanticError::Redeclared { column, .. }
            | SemanticError::Undeclared { column, .. }
            | SemanticError::NotAFunction { column, .. }
            | SemanticError::IncompatibleAssignment { column, .. }
            | SemanticError::IncompatibleReturn { column, .. }
            | SemanticError::ArgumentCount { column, .. } => *column,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SemanticAnalysis {
    pub errors: Vec<SemanticError>,
    pub symbols: SymbolTable,
}

impl SemanticAnalysis {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn analyze(root: &ParseTreeNode) -> SemanticAnalysis {
    SemanticAnalyzer::new().analyze(root)
}

#[derive(Debug, Default)]
pub struct SemanticAnalyzer {
    symbols: SymbolTable,
    errors: Vec<SemanticError>,
    return_types: Vec<ValueType>,
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyze(mut self, root: &ParseTreeNode) -> SemanticAnalysis {
        self.visit(root);
        log::debug!(
            "semantic: {} symbols, {} errors",
            self.symbols.symbols().len(),
            self.errors.len()
        );
        SemanticAnalysis {
            errors: self.errors,
            symbols: self.symbols,
        }
    }

    fn visit(&mut self, node: &ParseTreeNode) {
        let children = node.children();
        match node.symbol() {
            "block" | "for_stmt" | "class_decl" => {
                self.symbols.enter_scope();
                self.visit_all(children);
                self.symbols.exit_scope();
            }
            "decl_stmt" | "decl_stmt_inline" => self.declaration(children),
            "field_decl" => self.declaration(&children[1..]),
            "function_decl" => self.function(children),
            "constructor_decl" => {
                self.symbols.enter_scope();
                if let Some(params) = children.get(3) {
                    self.parameters(params);
                }
                if let Some(body) = children.last() {
                    self.visit(body);
                }
                self.symbols.exit_scope();
            }
            "expr_stmt" if children.len() == 4 => self.assignment(children),
            "return_stmt" => self.return_stmt(children),
            "expr" | "for_cond" | "for_update" | "expr_stmt_inline" => {
                self.expression(node);
            }
            _ => self.visit_all(children),
        }
    }

    fn visit_all(&mut self, nodes: &[ParseTreeNode]) {
        for child in nodes {
            self.visit(child);
        }
    }

    fn error(&mut self, error: SemanticError) {
        log::debug!("{}", error);
        self.errors.push(error);
    }

    /// `type IDENTIFIER [ASSIGN expr] ...`
    fn declaration(&mut self, children: &[ParseTreeNode]) {
        let (Some(ty), Some(name)) = (
            children.first().and_then(type_of_type_node),
            children.get(1).and_then(|n| n.token()),
        ) else {
            self.visit_all(children);
            return;
        };

        let init = children
            .get(2)
            .filter(|n| n.symbol() == "ASSIGN")
            .and_then(|_| children.get(3));
        let value = init.and_then(|expr| self.expression(expr));

        self.declare(name, SymbolKind::Variable, ty, Vec::new());
        if let Some(value) = value {
            if !ty.accepts(value) {
                self.error(SemanticError::IncompatibleAssignment {
                    name: name.lexeme.clone(),
                    expected: ty,
                    found: value,
                    line: name.line,
                    column: name.column,
                });
            }
        }
    }

    fn declare(&mut self, name: &Token, kind: SymbolKind, ty: ValueType, parameters: Vec<ValueType>) {
        let symbol = Symbol {
            name: name.lexeme.clone(),
            kind,
            value_type: ty,
            parameters,
            scope: 0,
            line: name.line,
            column: name.column,
        };
        if self.symbols.declare(symbol).is_err() {
            self.error(SemanticError::Redeclared {
                name: name.lexeme.clone(),
                line: name.line,
                column: name.column,
            });
        }
    }

    fn function(&mut self, children: &[ParseTreeNode]) {
        let (Some(ty), Some(name), Some(params), Some(body)) = (
            children.first().and_then(type_of_type_node),
            children.get(1).and_then(|n| n.token()),
            children.get(3),
            children.get(5),
        ) else {
            self.visit_all(children);
            return;
        };

        let parameter_types = params
            .descendants()
            .into_iter()
            .filter(|n| n.symbol() == "param")
            .filter_map(|p| p.child(0).and_then(type_of_type_node))
            .collect();
        self.declare(name, SymbolKind::Function, ty, parameter_types);

        self.symbols.enter_scope();
        self.return_types.push(ty);
        self.parameters(params);
        self.visit(body);
        self.return_types.pop();
        self.symbols.exit_scope();
    }

    fn parameters(&mut self, params: &ParseTreeNode) {
        for param in params.descendants() {
            if param.symbol() != "param" {
                continue;
            }
            if let (Some(ty), Some(name)) = (
                param.child(0).and_then(type_of_type_node),
                param.child(1).and_then(|n| n.token()),
            ) {
                self.declare(name, SymbolKind::Parameter, ty, Vec::new());
            }
        }
    }

    /// `IDENTIFIER compound_assign expr SEMICOLON`
    fn assignment(&mut self, children: &[ParseTreeNode]) {
        let value = self.expression(&children[2]);
        let Some(target) = children[0].token() else {
            return;
        };
        let Some(declared) = self.use_name(target) else {
            return;
        };
        let plain = children[1].find("ASSIGN").is_some();
        let compatible = match (declared, value) {
            (_, None) => true,
            (ValueType::String, Some(_)) if !plain => true,
            (declared, Some(value)) => declared.accepts(value),
        };
        if !compatible {
            if let Some(value) = value {
                self.error(SemanticError::IncompatibleAssignment {
                    name: target.lexeme.clone(),
                    expected: declared,
                    found: value,
                    line: target.line,
                    column: target.column,
                });
            }
        }
    }

    fn return_stmt(&mut self, children: &[ParseTreeNode]) {
        let Some(expr) = children.get(1) else {
            return;
        };
        let found = self.expression(expr);
        if let (Some(&expected), Some(found)) = (self.return_types.last(), found) {
            if !expected.accepts(found) {
                let at = children[0].token();
                self.error(SemanticError::IncompatibleReturn {
                    expected,
                    found,
                    line: at.map(|t| t.line).unwrap_or(0),
                    column: at.map(|t| t.column).unwrap_or(0),
                });
            }
        }
    }

    fn use_name(&mut self, name: &Token) -> Option<ValueType> {
        match self.symbols.lookup(&name.lexeme) {
            Some(symbol) => Some(symbol.value_type),
            None => {
                self.error(SemanticError::Undeclared {
                    name: name.lexeme.clone(),
                    line: name.line,
                    column: name.column,
                });
                None
            }
        }
    }

    /// Checks every name used inside `node` and infers its type where the
    /// operand types are known.
    fn expression(&mut self, node: &ParseTreeNode) -> Option<ValueType> {
        if let Some(token) = node.token() {
            return ValueType::of_literal(token.kind);
        }

        let children = node.children();
        let symbols: Vec<&str> = children.iter().map(|c| c.symbol()).collect();
        match (node.symbol(), symbols.as_slice()) {
            ("factor", ["IDENTIFIER"]) => children[0].token().and_then(|t| self.use_name(t)),
            ("factor", ["IDENTIFIER", "LEFT_PAREN", "args", "RIGHT_PAREN"]) => {
                let found = self.arguments(&children[2]);
                children[0].token().and_then(|t| self.call(t, found))
            }
            ("factor", ["NEW", ..]) => {
                if let Some(args) = children.get(3) {
                    self.arguments(args);
                }
                None
            }
            ("factor", ["THIS", ..]) => None,
            ("factor", ["NOT", _]) => {
                self.expression(&children[1]);
                Some(ValueType::Boolean)
            }
            ("factor", ["LEFT_PAREN", _, "RIGHT_PAREN"]) => self.expression(&children[1]),
            (_, [_, op, _]) => {
                let l = self.expression(&children[0]);
                let r = self.expression(&children[2]);
                binary(op, l, r)
            }
            (_, [op, _]) if *op == "INCREMENT" || *op == "DECREMENT" => self.expression(&children[1]),
            (_, [_, op]) if *op == "INCREMENT" || *op == "DECREMENT" => self.expression(&children[0]),
            (_, [_]) => self.expression(&children[0]),
            _ => {
                for child in children {
                    self.expression(child);
                }
                None
            }
        }
    }

    fn arguments(&mut self, args: &ParseTreeNode) -> usize {
        let mut count = 0;
        for node in args.descendants() {
            if node.symbol() == "expr" && is_argument(args, node) {
                self.expression(node);
                count += 1;
            }
        }
        count
    }

    fn call(&mut self, name: &Token, found: usize) -> Option<ValueType> {
        let symbol = match self.symbols.lookup(&name.lexeme) {
            Some(symbol) => symbol.clone(),
            None => {
                self.error(SemanticError::Undeclared {
                    name: name.lexeme.clone(),
                    line: name.line,
                    column: name.column,
                });
                return None;
            }
        };
        if symbol.kind != SymbolKind::Function {
            self.error(SemanticError::NotAFunction {
                name: name.lexeme.clone(),
                line: name.line,
                column: name.column,
            });
            return None;
        }
        if symbol.parameters.len() != found {
            self.error(SemanticError::ArgumentCount {
                name: name.lexeme.clone(),
                expected: symbol.parameters.len(),
                found,
                line: name.line,
                column: name.column,
            });
        }
        Some(symbol.value_type)
    }
}

/// Whether `expr` is a direct element of the `args` list, not nested inside
/// another argument.
fn is_argument(args: &ParseTreeNode, expr: &ParseTreeNode) -> bool {
    fn walk(list: &ParseTreeNode, expr: &ParseTreeNode) -> bool {
        list.children().iter().any(|c| {
            std::ptr::eq(c, expr) || (c.symbol() == "arg_list" && walk(c, expr))
        })
    }
    args.children().iter().any(|c| c.symbol() == "arg_list" && walk(c, expr))
}

fn type_of_type_node(node: &ParseTreeNode) -> Option<ValueType> {
    if node.symbol() != "type" {
        return None;
    }
    node.child(0)
        .and_then(|c| c.token())
        .and_then(|t| ValueType::from_keyword(t.kind))
}

fn binary(op: &str, l: Option<ValueType>, r: Option<ValueType>) -> Option<ValueType> {
    match op {
        "OR" | "AND" | "EQUAL_EQUAL" | "NOT_EQUAL" | "GREATER" | "LESS" | "GREATER_EQUAL"
        | "LESS_EQUAL" => Some(ValueType::Boolean),
        "PLUS" if l == Some(ValueType::String) || r == Some(ValueType::String) => {
            Some(ValueType::String)
        }
        "PLUS" | "MINUS" | "MULTIPLY" | "DIVIDE" | "MODULO" => ValueType::promote(l?, r?),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SlrParser;
    use crate::scanner::scan;

    fn check(source: &str) -> SemanticAnalysis {
        let tokens = scan(source).unwrap();
        let tree = SlrParser::language().parse(&tokens).unwrap();
        analyze(&tree)
    }

    #[test]
    fn widening() {
        assert!(ValueType::Double.accepts(ValueType::Int));
        assert!(ValueType::Int.accepts(ValueType::Char));
        assert!(ValueType::Long.accepts(ValueType::Byte));
        assert!(!ValueType::Int.accepts(ValueType::Double));
        assert!(!ValueType::Char.accepts(ValueType::Short));
        assert!(!ValueType::Boolean.accepts(ValueType::Int));
        assert!(ValueType::String.accepts(ValueType::String));
    }

    #[test]
    fn scopes() {
        let mut table = SymbolTable::new();
        let sym = |name: &str| Symbol {
            name: name.to_string(),
            kind: SymbolKind::Variable,
            value_type: ValueType::Int,
            parameters: Vec::new(),
            scope: 0,
            line: 1,
            column: 1,
        };
        assert!(table.declare(sym("x")).is_ok());
        assert!(table.declare(sym("x")).is_err());
        let inner = table.enter_scope();
        assert!(table.declare(sym("x")).is_ok());
        assert_eq!(table.lookup("x").map(|s| s.scope), Some(inner));
        table.exit_scope();
        assert_eq!(table.lookup("x").map(|s| s.scope), Some(0));
        table.exit_scope();
        assert_eq!(table.current_scope(), 0);
        assert_eq!(table.symbols().len(), 2);
    }

    #[test]
    fn clean_program() {
        let analysis = check(
            "int x = 5;\n\
             double d = x;\n\
             int f(int a, int b) { return a + b; }\n\
             x = f(1, 2);",
        );
        assert!(analysis.is_ok(), "{:?}", analysis.errors);
        let names: Vec<&str> = analysis.symbols.symbols().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["x", "d", "f", "a", "b"]);
        let f = &analysis.symbols.symbols()[2];
        assert_eq!(f.kind, SymbolKind::Function);
        assert_eq!(f.parameters, vec![ValueType::Int, ValueType::Int]);
    }

    #[test]
    fn redeclaration_and_undeclared_use() {
        let analysis = check("int x;\nint x;\ny = 1;\nint z = w;");
        assert_eq!(
            analysis.errors,
            vec![
                SemanticError::Redeclared { name: "x".to_string(), line: 2, column: 5 },
                SemanticError::Undeclared { name: "y".to_string(), line: 3, column: 1 },
                SemanticError::Undeclared { name: "w".to_string(), line: 4, column: 9 },
            ]
        );
    }

    #[test]
    fn incompatible_initialiser() {
        let analysis = check("int x = 2.5;\nboolean b = 1 < 2;\nString s = \"a\" + 1;");
        assert_eq!(analysis.errors.len(), 1);
        assert!(matches!(
            analysis.errors[0],
            SemanticError::IncompatibleAssignment {
                expected: ValueType::Int,
                found: ValueType::Double,
                line: 1,
                ..
            }
        ));
    }

    #[test]
    fn block_scopes_end() {
        let analysis = check("if (true) { int t = 1; }\nt = 2;");
        assert_eq!(analysis.errors.len(), 1);
        assert_eq!(analysis.errors[0].line(), 2);
    }

    #[test]
    fn calls_are_checked() {
        let analysis = check("int v;\nint g() { return 1; }\nv = g(1);\nv = v(2);");
        let kinds: Vec<String> = analysis.errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(analysis.errors.len(), 2, "{:?}", kinds);
        assert!(matches!(analysis.errors[0], SemanticError::ArgumentCount { expected: 0, found: 1, .. }));
        assert!(matches!(analysis.errors[1], SemanticError::NotAFunction { .. }));
    }

    #[test]
    fn return_type_is_checked() {
        let analysis = check("int h() { return \"no\"; }");
        assert!(matches!(
            analysis.errors.as_slice(),
            [SemanticError::IncompatibleReturn { expected: ValueType::Int, found: ValueType::String, .. }]
        ));
    }
}
