/*!
Recursive‑descent parser for Lox.

--------------------------------------------------------------------------------
Grammar (EBNF, condensed)
--------------------------------------------------------------------------------

```text
program        → declaration* EOF ;
declaration    → classDecl | funDecl | varDecl | statement ;
classDecl      → "class" IDENT ( "<" IDENT )? "{" function* "}" ;
funDecl        → "fun" function ;
function       → IDENT "(" parameters? ")" block ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
statement      → exprStmt | forStmt | ifStmt | printStmt
               | returnStmt | whileStmt | block ;
forStmt        → "for" "(" ( varDecl | exprStmt | ";" )
                 expression? ";" expression? ")" statement ;
block          → "{" declaration* "}" ;
expression     → assignment ;
assignment     → ( call "." )? IDENT "=" assignment | logic_or ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → equality  ( "and" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" arguments? ")" | "." IDENT )* ;
primary        → NUMBER | STRING | "true" | "false" | "nil" | "this"
               | IDENT | "(" expression ")" | "super" "." IDENT ;
```

Expression levels are not hard‑wired to each other. [`LAYERS`] lists them
loosest first; a level only ever calls "the next entry" (tighter) or "this
entry" (for right‑associative repetition), so levels can be added, removed
or reordered by editing the table alone.

### Error recovery

A syntax error records a [`Diagnostic`] and unwinds with [`ParseError`] to the
nearest `declaration`, which then **synchronizes**: tokens are discarded up
to a `;` or the keyword that starts the next statement. Some problems
(invalid assignment target, too many arguments/parameters) are reported
without unwinding at all.
*/

use std::rc::Rc;

use crate::error::Diagnostic;
use crate::expr::{Expr, LiteralValue};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Literal, Token, TokenType};

use log::{debug, info};

/// Upper bound on call arguments and function parameters.
const MAX_ARITY: usize = 255;

/// Unwinding signal for a syntax error. The diagnostic itself has already
/// been recorded by the time this is returned.
#[derive(Debug)]
struct ParseError;

type PResult<T> = std::result::Result<T, ParseError>;

/// One precedence level of the expression grammar.
#[derive(Debug, Clone, Copy)]
enum Layer {
    /// Right‑associative `=`; only `Variable` and `Get` are valid targets.
    Assignment,

    /// Left‑associative infix operators.
    Binary(&'static [TokenType]),

    /// Right‑associative prefix operators.
    Unary(&'static [TokenType]),

    /// Postfix `(args)` and `.name`, chainable.
    Call,
}

/// Expression precedence table, loosest binding first. Everything tighter
/// than the last entry is `primary`.
const LAYERS: [Layer; 9] = [
    Layer::Assignment,
    Layer::Binary(&[TokenType::OR]),
    Layer::Binary(&[TokenType::AND]),
    Layer::Binary(&[TokenType::BANG_EQUAL, TokenType::EQUAL_EQUAL]),
    Layer::Binary(&[
        TokenType::GREATER,
        TokenType::GREATER_EQUAL,
        TokenType::LESS,
        TokenType::LESS_EQUAL,
    ]),
    Layer::Binary(&[TokenType::MINUS, TokenType::PLUS]),
    Layer::Binary(&[TokenType::SLASH, TokenType::STAR]),
    Layer::Unary(&[TokenType::BANG, TokenType::MINUS]),
    Layer::Call,
];

/// Stands in for the `EOF` token when the slice has none.
static MISSING_EOF: Token = Token {
    token_type: TokenType::EOF,
    lexeme: String::new(),
    line: 1,
    literal: None,
};

/// Parse a whole program. `tokens` must end with an `EOF` token, as produced
/// by [`crate::scanner::scan`].
pub fn parse(tokens: &[Token]) -> (Vec<Stmt>, Vec<Diagnostic>) {
    let mut parser = Parser::new(tokens);
    let statements = parser.parse();

    (statements, parser.into_diagnostics())
}

/// Top‑level parser over an immutable slice of tokens.
pub struct Parser<'t> {
    tokens: &'t [Token],
    current: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'t> Parser<'t> {
    /// Construct a new parser. An empty slice is treated as an empty program.
    pub fn new(tokens: &'t [Token]) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        Self {
            tokens,
            current: 0,
            diagnostics: Vec::new(),
        }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program. Statements that failed to parse are dropped;
    /// their diagnostics are available from [`Parser::diagnostics`].
    pub fn parse(&mut self) -> Vec<Stmt> {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        info!(
            "Parsed {} statement(s), {} diagnostic(s)",
            statements.len(),
            self.diagnostics.len()
        );

        statements
    }

    /// Parse the input as one expression followed by `EOF`.
    pub fn parse_expression(&mut self) -> Option<Expr> {
        info!("Parsing a single expression");

        let expr = self.expression().ok()?;

        if !self.is_at_end() {
            let _ = self.error(self.peek(), "Expect end of expression.");
        }

        Some(expr)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    // ──────────────────────── declaration rules ───────────────────

    fn declaration(&mut self) -> Option<Stmt> {
        debug!("Entering declaration");

        let result = if self.matches(TokenType::CLASS) {
            self.class_declaration()
        } else if self.matches(TokenType::FUN) {
            self.function("function").map(Stmt::Function)
        } else if self.matches(TokenType::VAR) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(ParseError) => {
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&mut self) -> PResult<Stmt> {
        let name: Token = self.consume(TokenType::IDENTIFIER, "Expect class name.")?.clone();

        let superclass = if self.matches(TokenType::LESS) {
            let superclass_name =
                self.consume(TokenType::IDENTIFIER, "Expect superclass name.")?;

            Some(Expr::variable(superclass_name.clone()))
        } else {
            None
        };

        self.consume(TokenType::LEFT_BRACE, "Expect '{' before class body.")?;

        let mut methods: Vec<Rc<FunctionDecl>> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' after class body.")?;

        debug!("Parsed class '{}' with {} method(s)", name.lexeme, methods.len());

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    /// `kind` is "function" or "method" and only shows up in messages.
    fn function(&mut self, kind: &str) -> PResult<Rc<FunctionDecl>> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, &format!("Expect {} name.", kind))?
            .clone();

        self.consume(
            TokenType::LEFT_PAREN,
            &format!("Expect '(' after {} name.", kind),
        )?;

        let mut params: Vec<Token> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= MAX_ARITY {
                    let _ = self.error(self.peek(), "Can't have more than 255 parameters.");
                }

                params.push(
                    self.consume(TokenType::IDENTIFIER, "Expect parameter name.")?
                        .clone(),
                );

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after parameters.")?;
        self.consume(
            TokenType::LEFT_BRACE,
            &format!("Expect '{{' before {} body.", kind),
        )?;

        let body: Vec<Stmt> = self.block()?;

        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn var_declaration(&mut self) -> PResult<Stmt> {
        let name: Token = self.consume(TokenType::IDENTIFIER, "Expect variable name.")?.clone();

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expect ';' after variable declaration.",
        )?;

        Ok(Stmt::Var { name, initializer })
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> PResult<Stmt> {
        if self.matches(TokenType::FOR) {
            self.for_statement()
        } else if self.matches(TokenType::IF) {
            self.if_statement()
        } else if self.matches(TokenType::PRINT) {
            self.print_statement()
        } else if self.matches(TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(TokenType::WHILE) {
            self.while_statement()
        } else if self.matches(TokenType::LEFT_BRACE) {
            Ok(Stmt::Block(self.block()?))
        } else {
            self.expression_statement()
        }
    }

    /// `for` has no node of its own:
    ///
    /// ```text
    /// { initializer; while (condition) { body; increment; } }
    /// ```
    ///
    /// The outer block only appears when there is an initializer, and a
    /// missing condition becomes `true`.
    fn for_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'for'.")?;

        let initializer: Option<Stmt> = if self.matches(TokenType::SEMICOLON) {
            None
        } else if self.matches(TokenType::VAR) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition: Expr = if self.check(TokenType::SEMICOLON) {
            Expr::Literal(LiteralValue::True)
        } else {
            self.expression()?
        };
        self.consume(TokenType::SEMICOLON, "Expect ';' after loop condition.")?;

        let increment: Option<Expr> = if self.check(TokenType::RIGHT_PAREN) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after for clauses.")?;

        let mut body: Stmt = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    fn if_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'if'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after if condition.")?;

        let then_branch: Box<Stmt> = Box::new(self.statement()?);
        let else_branch: Option<Box<Stmt>> = if self.matches(TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn print_statement(&mut self) -> PResult<Stmt> {
        let value: Expr = self.expression()?;

        self.consume(TokenType::SEMICOLON, "Expect ';' after value.")?;

        Ok(Stmt::Print(value))
    }

    fn return_statement(&mut self) -> PResult<Stmt> {
        let keyword: Token = self.previous().clone();
        let value: Option<Expr> = if self.check(TokenType::SEMICOLON) {
            None
        } else {
            Some(self.expression()?)
        };

        self.consume(TokenType::SEMICOLON, "Expect ';' after return value.")?;

        Ok(Stmt::Return { keyword, value })
    }

    fn while_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'while'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after condition.")?;
        let body: Box<Stmt> = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn expression_statement(&mut self) -> PResult<Stmt> {
        let expr: Expr = self.expression()?;
        self.consume(TokenType::SEMICOLON, "Expect ';' after expression.")?;

        Ok(Stmt::Expression(expr))
    }

    /// Statements up to the closing `}`; the opening brace is already consumed.
    fn block(&mut self) -> PResult<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' after block.")?;

        Ok(statements)
    }

    // ─────────────────────── expression rules (layered) ───────────

    fn expression(&mut self) -> PResult<Expr> {
        self.layer(0)
    }

    /// Parse at precedence `level` of [`LAYERS`].
    fn layer(&mut self, level: usize) -> PResult<Expr> {
        match LAYERS.get(level).copied() {
            Some(Layer::Assignment) => self.assignment(level),
            Some(Layer::Binary(operators)) => self.binary(level, operators),
            Some(Layer::Unary(operators)) => self.unary(level, operators),
            Some(Layer::Call) => self.call(level),
            None => self.primary(),
        }
    }

    fn assignment(&mut self, level: usize) -> PResult<Expr> {
        let expr: Expr = self.layer(level + 1)?;

        if self.matches(TokenType::EQUAL) {
            let equals: &'t Token = self.previous();
            let value: Expr = self.layer(level)?;

            return Ok(match expr {
                Expr::Variable { name, .. } => Expr::assign(name, value),

                Expr::Get { object, name } => Expr::Set {
                    object,
                    name,
                    value: Box::new(value),
                },

                // Reported, not thrown: the parser is not confused.
                other => {
                    let _ = self.error(equals, "Invalid assignment target.");
                    other
                }
            });
        }

        Ok(expr)
    }

    fn binary(&mut self, level: usize, operators: &[TokenType]) -> PResult<Expr> {
        let mut expr: Expr = self.layer(level + 1)?;

        while let Some(operator) = self.match_any(operators) {
            let right: Expr = self.layer(level + 1)?;

            expr = Expr::binary(expr, operator.clone(), right);
        }

        Ok(expr)
    }

    fn unary(&mut self, level: usize, operators: &[TokenType]) -> PResult<Expr> {
        if let Some(operator) = self.match_any(operators) {
            let right: Expr = self.layer(level)?;

            return Ok(Expr::Unary {
                operator: operator.clone(),
                right: Box::new(right),
            });
        }

        self.layer(level + 1)
    }

    fn call(&mut self, level: usize) -> PResult<Expr> {
        let mut expr: Expr = self.layer(level + 1)?;

        loop {
            if self.matches(TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenType::DOT) {
                let name: Token = self
                    .consume(TokenType::IDENTIFIER, "Expect property name after '.'.")?
                    .clone();

                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> PResult<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= MAX_ARITY {
                    let _ = self.error(self.peek(), "Can't have more than 255 arguments.");
                }

                arguments.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren: Token = self
            .consume(TokenType::RIGHT_PAREN, "Expect ')' after arguments.")?
            .clone();

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> PResult<Expr> {
        if self.matches(TokenType::FALSE) {
            return Ok(Expr::Literal(LiteralValue::False));
        }
        if self.matches(TokenType::TRUE) {
            return Ok(Expr::Literal(LiteralValue::True));
        }
        if self.matches(TokenType::NIL) {
            return Ok(Expr::Literal(LiteralValue::Nil));
        }

        if let Some(token) = self.match_any(&[TokenType::NUMBER, TokenType::STRING]) {
            let value = match &token.literal {
                Some(Literal::Number(n)) => LiteralValue::Number(*n),
                Some(Literal::Str(s)) => LiteralValue::Str(s.clone()),
                None => return Err(self.error(token, "Expect literal value.")),
            };

            return Ok(Expr::Literal(value));
        }

        if self.matches(TokenType::THIS) {
            return Ok(Expr::This {
                keyword: self.previous().clone(),
                distance: Default::default(),
            });
        }

        if self.matches(TokenType::SUPER) {
            let keyword: Token = self.previous().clone();
            self.consume(TokenType::DOT, "Expect '.' after 'super'.")?;
            let method: Token = self
                .consume(TokenType::IDENTIFIER, "Expect superclass method name.")?
                .clone();

            return Ok(Expr::Super {
                keyword,
                method,
                distance: Default::default(),
            });
        }

        if self.matches(TokenType::IDENTIFIER) {
            return Ok(Expr::variable(self.previous().clone()));
        }

        if self.matches(TokenType::LEFT_PAREN) {
            let expr: Expr = self.expression()?;

            self.consume(TokenType::RIGHT_PAREN, "Expect ')' after expression.")?;

            return Ok(Expr::Grouping(Box::new(expr)));
        }

        Err(self.error(self.peek(), "Expect expression."))
    }

    // ────────────────────── utility helpers ───────────────────────

    /// Record a diagnostic at `token` and hand back the unwinding signal. Callers
    /// that only want to report discard the signal.
    fn error(&mut self, token: &Token, message: &str) -> ParseError {
        debug!("Syntax error at line {}: {}", token.line, message);

        self.diagnostics.push(Diagnostic::at(token, message));

        ParseError
    }

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    /// Consume the current token if its kind is one of `types`.
    #[inline(always)]
    fn match_any(&mut self, types: &[TokenType]) -> Option<&'t Token> {
        if types.iter().any(|&ttype| self.check(ttype)) {
            return Some(self.advance());
        }

        None
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> PResult<&'t Token> {
        if self.check(ttype) {
            return Ok(self.advance());
        }

        Err(self.error(self.peek(), message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    #[inline(always)]
    fn advance(&mut self) -> &'t Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.tokens
            .get(self.current)
            .map_or(true, |token| token.token_type == TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &'t Token {
        let tokens: &'t [Token] = self.tokens;

        tokens.get(self.current).unwrap_or(&MISSING_EOF)
    }

    #[inline(always)]
    fn previous(&self) -> &'t Token {
        let tokens: &'t [Token] = self.tokens;

        tokens
            .get(self.current.saturating_sub(1))
            .unwrap_or(&MISSING_EOF)
    }

    /// Discards tokens until it thinks it is at a statement boundary.
    fn synchronize(&mut self) {
        self.advance(); // skip the token that caused the error

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::SEMICOLON {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN => return,
                _ => {}
            }

            self.advance();
        }
    }
}
