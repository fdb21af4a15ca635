//! Centralised error hierarchy for the **Lox interpreter**.
//!
//! The scanner, parser and resolver never stop at the first problem: they
//! collect [`Diagnostic`]s and hand them back alongside their output. The
//! interpreter aborts on the first [`RuntimeError`]. [`LoxError`] wraps the
//! outcome of a failed pipeline run so callers can tell the phases apart.
//!
//! The module **does not** print diagnostics itself; that is the job of a
//! [`Reporter`] supplied by the driver.

use std::io;
use thiserror::Error;

use log::info;

use crate::token::{Token, TokenType};

/// A single line‑tagged problem reported by one of the pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[line {line}] Error{location}: {message}")]
pub struct Diagnostic {
    /// 1‑based line where the problem was detected.
    pub line: usize,

    /// `""` for line‑only errors, `" at end"` at EOF, otherwise `" at '<lexeme>'"`.
    pub location: String,

    /// Human‑readable description.
    pub message: String,
}

impl Diagnostic {
    /// Helper constructor for the **scanner**, which only knows the line.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex diagnostic: line={}, msg={}", line, message);

        Diagnostic {
            line,
            location: String::new(),
            message,
        }
    }

    /// Diagnostic positioned at `token`, used by the parser, the resolver and
    /// for runtime errors.
    pub fn at<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating diagnostic: line={}, lexeme={}, msg={}",
            token.line, token.lexeme, message
        );

        Diagnostic {
            line: token.line,
            location: location_of(token),
            message,
        }
    }
}

/// The `where` part of a diagnostic for an error positioned at `token`.
pub fn location_of(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

/// Fatal error raised while executing a program.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}\n[line {}]", token.line)]
pub struct RuntimeError {
    /// Token whose evaluation failed; supplies the line and location.
    pub token: Token,

    pub message: String,
}

impl RuntimeError {
    pub fn new<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Runtime error: line={}, msg={}",
            token.line, message
        );

        RuntimeError {
            token: token.clone(),
            message,
        }
    }
}

impl From<&RuntimeError> for Diagnostic {
    fn from(err: &RuntimeError) -> Self {
        Diagnostic::at(&err.token, err.message.clone())
    }
}

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical or syntactic errors; execution was not attempted.
    #[error("{} syntax error(s)", .0.len())]
    Syntax(Vec<Diagnostic>),

    /// Static‑analysis failures found by the resolver.
    #[error("{} resolution error(s)", .0.len())]
    Resolve(Vec<Diagnostic>),

    /// Runtime evaluation error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Wrapper around `std::io::Error` (transparent).  Raised when `print`
    /// output cannot be written.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LoxError {
    /// Shorthand for a runtime error at `token`.
    pub fn runtime<S: Into<String>>(token: &Token, msg: S) -> Self {
        LoxError::Runtime(RuntimeError::new(token, msg))
    }

    /// Flatten any failure into the diagnostics a [`Reporter`] receives.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            LoxError::Syntax(diagnostics) | LoxError::Resolve(diagnostics) => diagnostics.clone(),
            LoxError::Runtime(err) => vec![Diagnostic::from(err)],
            LoxError::Io(err) => vec![Diagnostic {
                line: 0,
                location: String::new(),
                message: err.to_string(),
            }],
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;

/// Diagnostic sink owned by the driver. The core decides *that* and *when*
/// something is reported; the sink decides how it is displayed.
pub trait Reporter {
    fn report(&mut self, line: usize, location: &str, message: &str);
}

impl Reporter for Vec<Diagnostic> {
    fn report(&mut self, line: usize, location: &str, message: &str) {
        self.push(Diagnostic {
            line,
            location: location.to_string(),
            message: message.to_string(),
        });
    }
}
