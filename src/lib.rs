//! A tree‑walking interpreter for Lox.
//!
//! The pipeline is scan → parse → resolve → interpret. Each front‑end stage
//! returns its diagnostics instead of setting a global flag; [`run`] stops
//! before the resolver if scanning or parsing reported anything, and before
//! the interpreter if resolution did.
//!
//! ```rust
//! use rox::{init_global_environment, run, Interpreter};
//! use rox::error::Diagnostic;
//!
//! let mut interpreter = Interpreter::new(init_global_environment(), Vec::new());
//! let mut diagnostics: Vec<Diagnostic> = Vec::new();
//!
//! let had_error = run("print 1 + 2 * 3;", &mut interpreter, &mut diagnostics);
//!
//! assert!(!had_error);
//! assert_eq!(interpreter.output(), b"7\n");
//! ```

pub mod ast_printer;
pub mod environment;
pub mod error;
pub mod expr;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stmt;
pub mod token;
pub mod value;

use std::io::Write;

use log::{debug, info};

pub use environment::{EnvRef, Environment};
pub use error::{Diagnostic, LoxError, Reporter, Result};
pub use interpreter::{init_global_environment, Interpreter};
pub use value::Value;

use stmt::Stmt;

/// Scan, parse and resolve `source` into a program ready to execute.
pub fn compile(source: &str) -> Result<Vec<Stmt>> {
    let (tokens, mut diagnostics) = scanner::scan(source);
    let (statements, parse_diagnostics) = parser::parse(&tokens);
    diagnostics.extend(parse_diagnostics);

    if !diagnostics.is_empty() {
        info!("Front end reported {} diagnostic(s)", diagnostics.len());
        return Err(LoxError::Syntax(diagnostics));
    }

    let diagnostics = resolver::resolve(&statements);
    if !diagnostics.is_empty() {
        info!("Resolver reported {} diagnostic(s)", diagnostics.len());
        return Err(LoxError::Resolve(diagnostics));
    }

    Ok(statements)
}

/// Compile `source` and run it against `interpreter`'s global scope.
pub fn execute<W: Write>(source: &str, interpreter: &mut Interpreter<W>) -> Result<()> {
    let statements = compile(source)?;

    interpreter.interpret(&statements)
}

/// Run `source`, sending every diagnostic to `reporter`. Returns `true` if
/// anything was reported.
pub fn run<W: Write>(
    source: &str,
    interpreter: &mut Interpreter<W>,
    reporter: &mut dyn Reporter,
) -> bool {
    match execute(source, interpreter) {
        Ok(()) => false,
        Err(err) => {
            debug!("Run failed: {}", err);

            for diagnostic in err.diagnostics() {
                reporter.report(diagnostic.line, &diagnostic.location, &diagnostic.message);
            }

            true
        }
    }
}
