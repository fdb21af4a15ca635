use std::fs::{self, File};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::Ast;
use rox::error::{LoxError, Reporter};
use rox::parser::{self, Parser};
use rox::resolver::Resolver;
use rox::scanner::{self, Scanner};
use rox::{init_global_environment, Interpreter};

const EXIT_DATA_ERR: u8 = 65;
const EXIT_SOFTWARE: u8 = 70;
const EXIT_IO_ERR: u8 = 74;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print tokens as JSON objects, one per line
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file and prints its AST
    Parse { filename: PathBuf },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },

    /// Reads and runs Lox code line by line from stdin
    Repl,
}

/// Prints diagnostics to stderr in the classic `[line N] Error at 'x': msg` form.
struct StderrReporter;

impl Reporter for StderrReporter {
    fn report(&mut self, line: usize, location: &str, message: &str) {
        eprintln!("[line {}] Error{}: {}", line, location, message);
    }
}

fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let source = fs::read_to_string(filename)
        .with_context(|| format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", source.len(), filename);

    Ok(source)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::from_default_env()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);

            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // RUST_LOG still narrows this
        .init();

    info!("Logger initialized, writing to app.log");

    Ok(())
}

/// Exit status for a failed pipeline run.
fn exit_code(err: &LoxError) -> ExitCode {
    match err {
        LoxError::Runtime(_) => ExitCode::from(EXIT_SOFTWARE),
        LoxError::Io(_) => ExitCode::from(EXIT_IO_ERR),
        _ => ExitCode::from(EXIT_DATA_ERR),
    }
}

fn report_all(err: &LoxError) {
    let mut reporter = StderrReporter;

    for diagnostic in err.diagnostics() {
        reporter.report(diagnostic.line, &diagnostic.location, &diagnostic.message);
    }
}

fn tokenize(source: &str, json: bool) -> Result<ExitCode> {
    let mut tokenized = true;

    for result in Scanner::new(source) {
        match result {
            Ok(token) if json => println!("{}", serde_json::to_string(&token)?),
            Ok(token) => println!("{}", token),
            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed");
        return Ok(ExitCode::from(EXIT_DATA_ERR));
    }

    Ok(ExitCode::SUCCESS)
}

fn parse(source: &str) -> ExitCode {
    let (tokens, mut diagnostics) = scanner::scan(source);
    let (statements, parse_diagnostics) = parser::parse(&tokens);
    diagnostics.extend(parse_diagnostics);

    if !diagnostics.is_empty() {
        report_all(&LoxError::Syntax(diagnostics));
        return ExitCode::from(EXIT_DATA_ERR);
    }

    let printer = Ast;
    for stmt in &statements {
        println!("{}", printer.print_stmt(stmt));
    }

    ExitCode::SUCCESS
}

fn evaluate(source: &str) -> ExitCode {
    let (tokens, mut diagnostics) = scanner::scan(source);
    let mut parser = Parser::new(&tokens);
    let expr = parser.parse_expression();
    diagnostics.extend(parser.into_diagnostics());

    let expr = match expr {
        Some(expr) if diagnostics.is_empty() => expr,
        _ => {
            report_all(&LoxError::Syntax(diagnostics));
            return ExitCode::from(EXIT_DATA_ERR);
        }
    };

    let mut resolver = Resolver::new();
    resolver.resolve_expression(&expr);
    let diagnostics = resolver.into_diagnostics();
    if !diagnostics.is_empty() {
        report_all(&LoxError::Resolve(diagnostics));
        return ExitCode::from(EXIT_DATA_ERR);
    }

    let mut interpreter = Interpreter::new(init_global_environment(), io::stdout());
    let globals = interpreter.globals().clone();

    match interpreter.evaluate(&expr, &globals) {
        Ok(value) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        Err(err) => {
            report_all(&err);
            exit_code(&err)
        }
    }
}

fn run_file(source: &str) -> ExitCode {
    let mut interpreter = Interpreter::new(init_global_environment(), io::stdout());

    match rox::execute(source, &mut interpreter) {
        Ok(()) => {
            info!("Program executed successfully");
            ExitCode::SUCCESS
        }
        Err(err) => {
            debug!("Run failed: {}", err);
            report_all(&err);
            exit_code(&err)
        }
    }
}

fn repl() -> Result<ExitCode> {
    let mut interpreter = Interpreter::new(init_global_environment(), io::stdout());
    let mut reporter = StderrReporter;
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        // Errors are per line; the session keeps its globals.
        rox::run(&line, &mut interpreter, &mut reporter);
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    }

    info!("CLI arguments: {:?}", args);

    let code = match args.commands {
        Commands::Tokenize { filename, json } => tokenize(&read_file(&filename)?, json)?,
        Commands::Parse { filename } => parse(&read_file(&filename)?),
        Commands::Evaluate { filename } => evaluate(&read_file(&filename)?),
        Commands::Run { filename } => run_file(&read_file(&filename)?),
        Commands::Repl => repl()?,
    };

    Ok(code)
}
