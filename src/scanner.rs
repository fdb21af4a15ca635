//! Module `scanner` implements a one‑pass, streaming lexer for the Lox language.
//!
//! It transforms source text into a sequence of [`Token`]s, skipping whitespace
//! and comments, and emitting exactly one `EOF` token at the end. Designed as a
//! `FusedIterator`, it can be chained safely with other iterator adapters.
//!
//! # Public API
//!
//! - `Scanner::new(src: &'a str) -> Scanner<'a>`
//!   Create a new lexer over the input text.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token, Diagnostic>` on each `.next()`. An `Err` reports a
//!   lexing problem with line information; scanning carries on after it.
//!
//! - `scan(src) -> (Vec<Token>, Vec<Diagnostic>)`
//!   Drain a scanner, splitting tokens from diagnostics.
//!
//! # Token Recognition (`scan_token`)
//!
//! - Single‑character tokens: `(`, `)`, `{`, `}`, `,`, `.`, `-`, `+`, `;`, `*`.
//! - Two‑character operators: `!=`, `==`, `<=`, `>=`.
//! - String literals: `"` … `"`, allowing multi‑line, no escape sequences.
//! - Numeric literals: integer and optional fractional part (no exponent, no
//!   leading dot).
//! - Identifiers/keywords: alphanumeric/_ sequences, resolved via a
//!   perfect‑hash `KEYWORDS` map.
//! - Any other character is reported as `Unexpected character.` and skipped.
//!
//! # Example
//!
//! ```rust
//! use rox::scanner::Scanner;
//!
//! for result in Scanner::new("print 123; // example") {
//!     match result {
//!         Ok(token) => println!("{}", token),
//!         Err(err) => eprintln!("{}", err),
//!     }
//! }
//! ```

use crate::error::Diagnostic;
use crate::token::{Literal, Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "and"    => TokenType::AND,
    "class"  => TokenType::CLASS,
    "else"   => TokenType::ELSE,
    "false"  => TokenType::FALSE,
    "fun"    => TokenType::FUN,
    "for"    => TokenType::FOR,
    "if"     => TokenType::IF,
    "nil"    => TokenType::NIL,
    "or"     => TokenType::OR,
    "print"  => TokenType::PRINT,
    "return" => TokenType::RETURN,
    "super"  => TokenType::SUPER,
    "this"   => TokenType::THIS,
    "true"   => TokenType::TRUE,
    "var"    => TokenType::VAR,
    "while"  => TokenType::WHILE,
};

/// A single pass **scanner / lexer** that converts source text into a
/// sequence of [`Token`]s.
pub struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    start: usize,             // index of the *first* byte of the current lexeme
    curr: usize,              // index *one past* the last byte examined
    line: usize,              // 1‑based line counter (\n increments)
    pending: Option<Pending>, // recognised token waiting to be emitted
}

/// A recognised token kind plus the literal value, if it has one.
struct Pending {
    token_type: TokenType,
    literal: Option<Literal>,
}

impl From<TokenType> for Pending {
    fn from(token_type: TokenType) -> Self {
        Pending {
            token_type,
            literal: None,
        }
    }
}

/// Scan all of `src`, returning every token (always terminated by `EOF`) and
/// every lexical diagnostic, in source order.
pub fn scan(src: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut tokens: Vec<Token> = Vec::new();
    let mut diagnostics: Vec<Diagnostic> = Vec::new();

    for result in Scanner::new(src) {
        match result {
            Ok(token) => tokens.push(token),
            Err(diagnostic) => diagnostics.push(diagnostic),
        }
    }

    info!(
        "Scanned {} token(s) with {} diagnostic(s)",
        tokens.len(),
        diagnostics.len()
    );

    (tokens, diagnostics)
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`.
    #[inline]
    pub fn new(src: &'a str) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            bytes: src.as_bytes(),
            start: 0,
            curr: 0,
            line: 1,
            pending: None,
        }
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it.  *Panics* if called at EOF – higher‑level
    /// code always guards with [`Self::is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.bytes[self.curr];
        self.curr += 1;
        b
    }

    /// Peek at the current byte without consuming it.  Returns `0` past EOF.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.bytes[self.curr]
        }
    }

    /// Peek one byte beyond [`Self::peek`].  Safe at EOF.
    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.len() {
            0
        } else {
            self.bytes[self.curr + 1]
        }
    }

    /// Conditionally consume a byte **iff** it matches `expected`.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// The current lexeme. Lexeme boundaries always fall on ASCII bytes or on
    /// whole characters, so slicing the `str` cannot split a code point.
    #[inline(always)]
    fn lexeme(&self) -> &'a str {
        &self.src[self.start..self.curr]
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* token starting at `self.curr`.  If the lexeme produces
    /// an actual token it is stored in `self.pending`.  Whitespace and
    /// comments are skipped by returning `Ok(())` with `pending = None`.
    fn scan_token(&mut self) -> Result<(), Diagnostic> {
        let b = self.advance();

        let token_type = match b {
            // ── single‑character punctuators ──────────────────────────────
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,

            // ── two‑character operators (!=, ==, <=, >=) ─────────────────
            b'!' if self.match_byte(b'=') => TokenType::BANG_EQUAL,
            b'!' => TokenType::BANG,
            b'=' if self.match_byte(b'=') => TokenType::EQUAL_EQUAL,
            b'=' => TokenType::EQUAL,
            b'<' if self.match_byte(b'=') => TokenType::LESS_EQUAL,
            b'<' => TokenType::LESS,
            b'>' if self.match_byte(b'=') => TokenType::GREATER_EQUAL,
            b'>' => TokenType::GREATER,

            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => return Ok(()),

            b'\n' => {
                self.line += 1;

                return Ok(());
            }

            // ── comments (// … until newline) ────────────────────────────
            b'/' if self.match_byte(b'/') => {
                // Leave the newline itself for the next call so the line
                // counter stays in one place.
                match memchr(b'\n', &self.bytes[self.curr..]) {
                    Some(pos) => self.curr += pos,
                    None => self.curr = self.len(),
                }

                return Ok(());
            }

            b'/' => TokenType::SLASH,

            b'"' => return self.parse_string(),

            b'0'..=b'9' => {
                self.parse_number();

                return Ok(());
            }

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => TokenType::IDENTIFIER,

            // ── unexpected character ─────────────────────────────────────
            _ => {
                // Skip the whole character, not just its first byte.
                if let Some(c) = self.src[self.start..].chars().next() {
                    self.curr = self.start + c.len_utf8();
                }

                return Err(Diagnostic::lex(self.line, "Unexpected character."));
            }
        };

        if token_type == TokenType::IDENTIFIER {
            self.parse_identifier();
        } else {
            self.pending = Some(token_type.into());
        }

        Ok(())
    }

    /// Parse a double‑quoted string literal.
    ///
    /// * `self.start` still points to the opening `"`.
    /// * When we return, `self.curr` points **past** the closing `"`.
    fn parse_string(&mut self) -> Result<(), Diagnostic> {
        match memchr(b'"', &self.bytes[self.curr..]) {
            Some(pos) => {
                let body = &self.bytes[self.curr..self.curr + pos];
                self.line += body.iter().filter(|&&b| b == b'\n').count();
                self.curr += pos + 1; // include closing quote
            }

            None => {
                let rest = &self.bytes[self.curr..];
                self.line += rest.iter().filter(|&&b| b == b'\n').count();
                self.curr = self.len();

                return Err(Diagnostic::lex(self.line, "Unterminated string."));
            }
        }

        let contents: &str = &self.src[self.start + 1..self.curr - 1];

        self.pending = Some(Pending {
            token_type: TokenType::STRING,
            literal: Some(Literal::Str(contents.to_owned())),
        });

        Ok(())
    }

    /// Parse a numeric literal (`123`, `3.14`).  Fractions are optional.
    fn parse_number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // Optional fractional part; a trailing `.` is left for the next token.
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let n: f64 = self.lexeme().parse::<f64>().unwrap_or(0.0); // digits only, cannot fail

        self.pending = Some(Pending {
            token_type: TokenType::NUMBER,
            literal: Some(Literal::Number(n)),
        });
    }

    /// Parse an identifier and decide if it is a **keyword** or a generic
    /// `IDENTIFIER` token.
    fn parse_identifier(&mut self) {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        let tt: TokenType = KEYWORDS
            .get(self.lexeme())
            .copied()
            .unwrap_or(TokenType::IDENTIFIER);

        self.pending = Some(tt.into());
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token, Diagnostic>;

    fn next(&mut self) -> Option<Self::Item> {
        // Loop until we either emit a token, hit EOF, or see an error.
        while self.curr <= self.len() {
            // 1. EOF guard – emit exactly one EOF then terminate.
            if self.curr == self.len() {
                self.curr += 1; // ensure fused semantics
                return Some(Ok(Token::new(TokenType::EOF, "", self.line)));
            }

            // 2. Reset per‑token state.
            self.start = self.curr;
            self.pending = None;

            // 3. Attempt to scan a token.
            if let Err(e) = self.scan_token() {
                debug!("Lexical error: {}", e);
                return Some(Err(e));
            }

            // 4. If a real token was recognised, build and return it.
            if let Some(Pending {
                token_type,
                literal,
            }) = self.pending.take()
            {
                debug!("Scanned token ({:?}) on line {}", token_type, self.line);

                let lexeme = self.lexeme();
                let token = match literal {
                    Some(literal) => Token::with_literal(token_type, lexeme, self.line, literal),
                    None => Token::new(token_type, lexeme, self.line),
                };

                return Some(Ok(token));
            }
            // Otherwise it was whitespace / comment → continue loop.
        }

        None // already yielded EOF
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
