//! Source text to token stream.
//!
//! The token kinds are named after the grammar terminals they feed, so
//! [`TokenKind::terminal`] is an identity mapping. The scanner reports the
//! first character it cannot place and stops there; the parser never sees a
//! partial stream.

use std::fmt;

use logos::Logos;
use serde::Serialize;
use thiserror::Error;

use crate::grammar::END_MARK;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    // keywords
    #[token("public")]
    Public,
    #[token("private")]
    Private,
    #[token("protected")]
    Protected,
    #[token("class")]
    Class,
    #[token("void")]
    Void,
    #[token("static")]
    Static,
    #[token("final")]
    Final,
    #[token("new")]
    New,
    #[token("this")]
    This,
    #[token("super")]
    Super,
    #[token("package")]
    Package,
    #[token("import")]
    Import,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("do")]
    Do,
    #[token("for")]
    For,
    #[token("switch")]
    Switch,
    #[token("case")]
    Case,
    #[token("default")]
    Default,
    #[token("break")]
    Break,
    #[token("return")]
    Return,
    #[token("byte")]
    Byte,
    #[token("short")]
    Short,
    #[token("int")]
    Int,
    #[token("long")]
    Long,
    #[token("float")]
    Float,
    #[token("double")]
    Double,
    #[token("boolean")]
    Boolean,
    #[token("char")]
    Char,
    #[token("String")]
    String,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // literals and names
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,
    #[regex(r"[0-9]+")]
    Integer,
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+")]
    FloatNumber,
    #[regex(r#""([^"\\]|\\.)*""#)]
    StringLiteral,
    #[regex(r"'([^'\\]|\\.)'")]
    CharLiteral,

    // operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Multiply,
    #[token("/")]
    Divide,
    #[token("%")]
    Modulo,
    #[token("++")]
    Increment,
    #[token("--")]
    Decrement,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    MultiplyAssign,
    #[token("/=")]
    DivideAssign,
    #[token("%=")]
    ModuloAssign,
    #[token("=")]
    #[token(":=")]
    Assign,
    #[token("==")]
    EqualEqual,
    #[token("!=")]
    #[token("≠")]
    NotEqual,
    #[token(">")]
    Greater,
    #[token("<")]
    Less,
    #[token(">=")]
    GreaterEqual,
    #[token("<=")]
    LessEqual,
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("!")]
    Not,

    // delimiters
    #[token(";")]
    Semicolon,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token("@")]
    At,

    /// End of input. Never produced by the lexer itself.
    #[serde(rename = "$")]
    Eof,
}

impl TokenKind {
    /// The grammar terminal this kind stands for.
    pub fn terminal(self) -> &'static str {
        use TokenKind::*;
        match self {
            Public => "PUBLIC",
            Private => "PRIVATE",
            Protected => "PROTECTED",
            Class => "CLASS",
            Void => "VOID",
            Static => "STATIC",
            Final => "FINAL",
            New => "NEW",
            This => "THIS",
            Super => "SUPER",
            Package => "PACKAGE",
            Import => "IMPORT",
            If => "IF",
            Else => "ELSE",
            While => "WHILE",
            Do => "DO",
            For => "FOR",
            Switch => "SWITCH",
            Case => "CASE",
            Default => "DEFAULT",
            Break => "BREAK",
            Return => "RETURN",
            Byte => "BYTE",
            Short => "SHORT",
            Int => "INT",
            Long => "LONG",
            Float => "FLOAT",
            Double => "DOUBLE",
            Boolean => "BOOLEAN",
            Char => "CHAR",
            String => "STRING",
            True => "TRUE",
            False => "FALSE",
            Identifier => "IDENTIFIER",
            Integer => "INTEGER",
            FloatNumber => "FLOAT_NUMBER",
            StringLiteral => "STRING_LITERAL",
            CharLiteral => "CHAR_LITERAL",
            Plus => "PLUS",
            Minus => "MINUS",
            Multiply => "MULTIPLY",
            Divide => "DIVIDE",
            Modulo => "MODULO",
            Increment => "INCREMENT",
            Decrement => "DECREMENT",
            PlusAssign => "PLUS_ASSIGN",
            MinusAssign => "MINUS_ASSIGN",
            MultiplyAssign => "MULTIPLY_ASSIGN",
            DivideAssign => "DIVIDE_ASSIGN",
            ModuloAssign => "MODULO_ASSIGN",
            Assign => "ASSIGN",
            EqualEqual => "EQUAL_EQUAL",
            NotEqual => "NOT_EQUAL",
            Greater => "GREATER",
            Less => "LESS",
            GreaterEqual => "GREATER_EQUAL",
            LessEqual => "LESS_EQUAL",
            And => "AND",
            Or => "OR",
            Not => "NOT",
            Semicolon => "SEMICOLON",
            LeftParen => "LEFT_PAREN",
            RightParen => "RIGHT_PAREN",
            LeftBrace => "LEFT_BRACE",
            RightBrace => "RIGHT_BRACE",
            LeftBracket => "LEFT_BRACKET",
            RightBracket => "RIGHT_BRACKET",
            Comma => "COMMA",
            Dot => "DOT",
            Colon => "COLON",
            At => "AT",
            Eof => END_MARK,
        }
    }

    pub fn is_keyword(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Public | Private | Protected | Class | Void | Static | Final | New | This | Super
                | Package | Import | If | Else | While | Do | For | Switch | Case | Default
                | Break | Return | Byte | Short | Int | Long | Float | Double | Boolean | Char
                | String | True | False
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.terminal())
    }
}

/// A scanned token. `line` and `column` are 1-based; columns count
/// characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: &str, line: usize, column: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.to_string(),
            line,
            column,
        }
    }

    pub fn eof(line: usize, column: usize) -> Self {
        Self::new(TokenKind::Eof, "", line, column)
    }

    pub fn terminal(&self) -> &'static str {
        self.kind.terminal()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.lexeme)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ScanError {
    #[error("unexpected character `{ch}` at line {line}, column {column}")]
    UnexpectedCharacter { ch: char, line: usize, column: usize },

    #[error("unterminated string literal starting at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },

    #[error("unterminated character literal starting at line {line}, column {column}")]
    UnterminatedChar { line: usize, column: usize },
}

impl ScanError {
    pub fn line(&self) -> usize {
        match self {
            ScanError::UnexpectedCharacter { line, .. }
            | ScanError::UnterminatedString { line, .. }
            | ScanError::UnterminatedChar { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            ScanError::UnexpectedCharacter { column, .. }
            | ScanError::UnterminatedString { column, .. }
            | ScanError::UnterminatedChar { column, .. } => *column,
        }
    }
}

/// Byte offset to (line, column) lookup.
struct LineIndex<'s> {
    source: &'s str,
    starts: Vec<usize>,
}

impl<'s> LineIndex<'s> {
    fn new(source: &'s str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { source, starts }
    }

    fn position(&self, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&start| start <= offset);
        let start = self.starts[line - 1];
        let column = self.source[start..offset].chars().count() + 1;
        (line, column)
    }
}

/// Scans the whole of `source`. The result has no end marker; the parser
/// appends one.
pub fn scan(source: &str) -> Result<Vec<Token>, ScanError> {
    let index = LineIndex::new(source);
    let mut lexer = TokenKind::lexer(source);
    let mut tokens = Vec::new();

    while let Some(kind) = lexer.next() {
        let (line, column) = index.position(lexer.span().start);
        let slice = lexer.slice();
        let kind = match kind {
            Ok(kind) => kind,
            Err(()) => {
                return Err(match slice.chars().next() {
                    Some('"') => ScanError::UnterminatedString { line, column },
                    Some('\'') => ScanError::UnterminatedChar { line, column },
                    ch => ScanError::UnexpectedCharacter {
                        ch: ch.unwrap_or('\0'),
                        line,
                        column,
                    },
                });
            }
        };

        let lexeme = match kind {
            TokenKind::StringLiteral | TokenKind::CharLiteral => unescape(&slice[1..slice.len() - 1]),
            _ => slice.to_string(),
        };
        tokens.push(Token {
            kind,
            lexeme,
            line,
            column,
        });
    }

    log::debug!("scanned {} tokens", tokens.len());
    Ok(tokens)
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        scan(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn declaration() {
        let tokens = scan("int x = 5;").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::Int, "int", 1, 1),
                Token::new(TokenKind::Identifier, "x", 1, 5),
                Token::new(TokenKind::Assign, "=", 1, 7),
                Token::new(TokenKind::Integer, "5", 1, 9),
                Token::new(TokenKind::Semicolon, ";", 1, 10),
            ]
        );
    }

    #[test]
    fn keywords_versus_identifiers() {
        assert_eq!(
            kinds("if iffy String string"),
            vec![TokenKind::If, TokenKind::Identifier, TokenKind::String, TokenKind::Identifier]
        );
    }

    #[test]
    fn operators_take_the_longest_match() {
        assert_eq!(
            kinds("+ ++ += - -- -= * *= / /= % %= = == := != ≠ < <= > >= && || !"),
            vec![
                TokenKind::Plus,
                TokenKind::Increment,
                TokenKind::PlusAssign,
                TokenKind::Minus,
                TokenKind::Decrement,
                TokenKind::MinusAssign,
                TokenKind::Multiply,
                TokenKind::MultiplyAssign,
                TokenKind::Divide,
                TokenKind::DivideAssign,
                TokenKind::Modulo,
                TokenKind::ModuloAssign,
                TokenKind::Assign,
                TokenKind::EqualEqual,
                TokenKind::Assign,
                TokenKind::NotEqual,
                TokenKind::NotEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Not,
            ]
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(
            kinds("42 3.14 1e10 2.5E-3 7."),
            vec![
                TokenKind::Integer,
                TokenKind::FloatNumber,
                TokenKind::FloatNumber,
                TokenKind::FloatNumber,
                TokenKind::FloatNumber,
            ]
        );
    }

    #[test]
    fn literals_are_unquoted_and_unescaped() {
        let tokens = scan(r#""a\tb\n" 'c' '\n'"#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].lexeme, "a\tb\n");
        assert_eq!(tokens[1].kind, TokenKind::CharLiteral);
        assert_eq!(tokens[1].lexeme, "c");
        assert_eq!(tokens[2].lexeme, "\n");
    }

    #[test]
    fn positions_count_lines_and_characters() {
        let tokens = scan("int a;\n  // note\n  ≠ b").unwrap();
        let positions: Vec<(usize, usize)> = tokens.iter().map(|t| (t.line, t.column)).collect();
        assert_eq!(positions, vec![(1, 1), (1, 5), (1, 6), (3, 3), (3, 5)]);
    }

    #[test]
    fn errors() {
        assert_eq!(
            scan("int x = 5 # 3;").unwrap_err(),
            ScanError::UnexpectedCharacter { ch: '#', line: 1, column: 11 }
        );
        assert_eq!(
            scan("x = \"open").unwrap_err(),
            ScanError::UnterminatedString { line: 1, column: 5 }
        );
        assert_eq!(
            scan("\nc = 'ab';").unwrap_err(),
            ScanError::UnterminatedChar { line: 2, column: 5 }
        );
        assert!(matches!(scan("a & b"), Err(ScanError::UnexpectedCharacter { ch: '&', .. })));
    }

    #[test]
    fn terminal_names() {
        assert_eq!(TokenKind::Eof.terminal(), "$");
        assert_eq!(TokenKind::FloatNumber.terminal(), "FLOAT_NUMBER");
        assert_eq!(Token::new(TokenKind::Identifier, "x", 1, 1).to_string(), "IDENTIFIER(x)");
        assert_eq!(serde_json::to_string(&TokenKind::NotEqual).unwrap(), "\"NOT_EQUAL\"");
        assert_eq!(serde_json::to_string(&TokenKind::Eof).unwrap(), "\"$\"");
    }
}
