use log::debug;
use serde::Serialize;
use std::fmt;

/// The different kinds of tokens recognized by the Lox scanner.
///
/// Kinds carry no data; the payload of `STRING` and `NUMBER` tokens lives in
/// [`Token::literal`]. `IDENTIFIER` is used for user‑defined names and `EOF`
/// marks the end of input.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenType {
    /// '('
    LEFT_PAREN,

    /// ')'
    RIGHT_PAREN,

    /// '{'
    LEFT_BRACE,

    /// '}'
    RIGHT_BRACE,

    /// ','
    COMMA,

    /// '.'
    DOT,

    /// '-'
    MINUS,

    /// '+'
    PLUS,

    /// ';'
    SEMICOLON,

    /// '/'
    SLASH,

    /// '*'
    STAR,

    /// '!'
    BANG,

    /// '!='
    BANG_EQUAL,

    /// '='
    EQUAL,

    /// '=='
    EQUAL_EQUAL,

    /// '>'
    GREATER,

    /// '>='
    GREATER_EQUAL,

    /// '<'
    LESS,

    /// '<='
    LESS_EQUAL,

    /// A user‑defined identifier
    IDENTIFIER,

    /// A string literal
    STRING,

    /// A numeric literal
    NUMBER,

    AND,
    CLASS,
    ELSE,
    FALSE,
    FUN,
    FOR,
    IF,
    NIL,
    OR,
    PRINT,
    RETURN,
    SUPER,
    THIS,
    TRUE,
    VAR,
    WHILE,

    /// End‑of‑file marker
    EOF,
}

/// Literal payload attached to `STRING` and `NUMBER` tokens.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    /// String contents without the surrounding quotes.
    Str(String),

    /// Numeric value; integral lexemes such as `3` are stored as `3.0`.
    Number(f64),
}

/// A scanned token, including its kind, the original lexeme, the line number
/// where it was found and, for strings and numbers, the literal value.
///
/// Tokens own their lexeme so that AST nodes (and the closures built from
/// them) can outlive the source buffer they were scanned from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    /// The category of this token.
    #[serde(rename = "type")]
    pub token_type: TokenType,

    /// The exact substring from the source that produced this token.
    pub lexeme: String,

    /// 1‑based line number in the source.
    pub line: usize,

    /// Present only for `STRING` and `NUMBER` tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub literal: Option<Literal>,
}

impl Token {
    /// Create a new token without a literal payload.
    pub fn new(token_type: TokenType, lexeme: impl Into<String>, line: usize) -> Self {
        let lexeme = lexeme.into();

        debug!(
            "Creating new token: type={:?}, lexeme={}, line={}",
            token_type, lexeme, line
        );

        Self {
            token_type,
            lexeme,
            line,
            literal: None,
        }
    }

    /// Create a `STRING` or `NUMBER` token carrying its literal value.
    pub fn with_literal(
        token_type: TokenType,
        lexeme: impl Into<String>,
        line: usize,
        literal: Literal,
    ) -> Self {
        Self {
            literal: Some(literal),
            ..Self::new(token_type, lexeme, line)
        }
    }

    /// A token that never appeared in source, used for names the runtime
    /// injects itself (`this`, `super`).
    pub fn synthetic(lexeme: &str, line: usize) -> Self {
        Self::new(TokenType::IDENTIFIER, lexeme, line)
    }
}

impl fmt::Display for Token {
    /// `KIND lexeme literal`, with `null` for tokens without a literal and
    /// integral numbers rendered with a trailing `.0`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {} ", self.token_type, self.lexeme)?;

        match &self.literal {
            Some(Literal::Str(s)) => write!(f, "{}", s),
            // `{:?}` keeps the fractional part: 3 → "3.0", 3.14 → "3.14"
            Some(Literal::Number(n)) => write!(f, "{:?}", n),
            None => write!(f, "null"),
        }
    }
}
