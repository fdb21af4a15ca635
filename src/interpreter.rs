//! Tree‑walking evaluator.
//!
//! `execute` and `evaluate` are mutually recursive and take the environment
//! explicitly. A `return` statement does not travel on the error channel:
//! `execute` yields [`Flow::Return`], every statement that contains other
//! statements passes it through untouched, and only a function call turns it
//! back into a value. Runtime errors abort the whole program.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::expr::{Expr, LiteralValue};
use crate::stmt::Stmt;
use crate::token::{Token, TokenType};
use crate::value::{Callable, Class, Function, Instance, Value};

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Fell off the end; carry on with the next statement.
    Normal,

    /// A `return` is unwinding to the nearest function call.
    Return(Value),
}

/// Build the root scope with the built‑in natives (`clock`). Further natives
/// are registered with `define(name, Value::native(...))`.
pub fn init_global_environment() -> EnvRef {
    let globals = Environment::global();

    debug!("Defining native function 'clock'");

    globals.borrow_mut().define(
        "clock",
        Value::native("clock", 0, |_args: &[Value]| {
            let timestamp: f64 = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|e| format!("Clock error: {}", e))?
                .as_secs_f64();

            Ok(Value::Number(timestamp))
        }),
    );

    globals
}

pub struct Interpreter<W: Write> {
    globals: EnvRef,
    out: W,
}

impl<W: Write> Interpreter<W> {
    /// `print` output goes to `out`.
    pub fn new(globals: EnvRef, out: W) -> Self {
        info!("Initializing Interpreter");

        Self { globals, out }
    }

    pub fn globals(&self) -> &EnvRef {
        &self.globals
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run a resolved program in the global scope, stopping at the first
    /// runtime error.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        let globals = Rc::clone(&self.globals);

        for stmt in statements {
            // The resolver rejects top-level `return`, so the flow is always Normal.
            self.execute(stmt, &globals)?;
        }

        self.out.flush()?;

        info!("Interpretation completed successfully");

        Ok(())
    }

    /// Executes a single statement in `env`.
    pub fn execute(&mut self, stmt: &Stmt, env: &EnvRef) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr, env)?;
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr, env)?;
                writeln!(self.out, "{}", value)?;
                debug!("Printed value: {}", value);
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {:?}", name.lexeme, value);
                env.borrow_mut().define(name.lexeme.as_str(), value);
            }

            Stmt::Block(statements) => {
                let scope = Environment::with_enclosing(env);
                return self.execute_block(statements, &scope);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition, env)?.is_truthy() {
                    return self.execute(then_branch, env);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch, env);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition, env)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body, env)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);

                let function = Function::new(Rc::clone(decl), Rc::clone(env), false);
                env.borrow_mut().define(
                    decl.name.lexeme.as_str(),
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {:?}", value);
                return Ok(Flow::Return(value));
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let superclass = match superclass {
                    Some(expr) => Some(self.evaluate_superclass(expr, env)?),
                    None => None,
                };

                // Bound first so method bodies can refer to the class by name.
                env.borrow_mut().define(name.lexeme.as_str(), Value::Nil);

                let method_scope = match &superclass {
                    Some(superclass) => {
                        let scope = Environment::with_enclosing(env);
                        scope.borrow_mut().define(
                            "super",
                            Value::Callable(Callable::Class(Rc::clone(superclass))),
                        );
                        scope
                    }
                    None => Rc::clone(env),
                };

                let methods: HashMap<String, Rc<Function>> = methods
                    .iter()
                    .map(|decl| {
                        let is_initializer = decl.name.lexeme == "init";
                        let method =
                            Function::new(Rc::clone(decl), Rc::clone(&method_scope), is_initializer);

                        (decl.name.lexeme.clone(), Rc::new(method))
                    })
                    .collect();

                info!(
                    "Class '{}' defined with {} method(s)",
                    name.lexeme,
                    methods.len()
                );

                let class = Class::new(&name.lexeme, superclass, methods);
                env.borrow_mut().define(
                    name.lexeme.as_str(),
                    Value::Callable(Callable::Class(Rc::new(class))),
                );
            }
        }

        Ok(Flow::Normal)
    }

    /// Execute `statements` directly in `scope`, stopping early on `return`.
    pub fn execute_block(&mut self, statements: &[Stmt], scope: &EnvRef) -> Result<Flow> {
        debug!("Entering block with {} statements", statements.len());

        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt, scope)? {
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    fn evaluate_superclass(&mut self, expr: &Expr, env: &EnvRef) -> Result<Rc<Class>> {
        match self.evaluate(expr, env)? {
            Value::Callable(Callable::Class(class)) => Ok(class),
            _ => {
                let Expr::Variable { name, .. } = expr else {
                    unreachable!("parser only produces variables as superclasses");
                };

                Err(LoxError::runtime(name, "Superclass must be a class."))
            }
        }
    }

    /// Evaluates an expression in `env`.
    pub fn evaluate(&mut self, expr: &Expr, env: &EnvRef) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner, env),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right, env),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right, env),

            Expr::Variable { name, distance } => self.look_up(name, distance.get(), env),

            Expr::Assign {
                name,
                value,
                distance,
            } => {
                let value = self.evaluate(value, env)?;

                match distance.get() {
                    Some(distance) => {
                        Environment::assign_at(env, distance, &name.lexeme, value.clone())
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee, env)?;

                let mut args = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg, env)?);
                }

                self.call_value(callee, paren, args)
            }

            Expr::Get { object, name } => match self.evaluate(object, env)? {
                Value::Instance(instance) => Instance::get(&instance, name),
                _ => Err(LoxError::runtime(name, "Only instances have properties.")),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object, env)? else {
                    return Err(LoxError::runtime(name, "Only instances have fields."));
                };

                let value = self.evaluate(value, env)?;
                instance.borrow_mut().set(name, value.clone());

                Ok(value)
            }

            Expr::This { keyword, distance } => self.look_up(keyword, distance.get(), env),

            Expr::Super {
                method, distance, ..
            } => {
                let Some(distance) = distance.get() else {
                    unreachable!("resolver binds every valid 'super'");
                };

                let superclass = match Environment::get_at(env, distance, "super") {
                    Value::Callable(Callable::Class(class)) => class,
                    other => unreachable!("'super' bound to non-class {:?}", other),
                };

                // `this` always lives one scope inside `super`.
                let instance = match Environment::get_at(env, distance - 1, "this") {
                    Value::Instance(instance) => instance,
                    other => unreachable!("'this' bound to non-instance {:?}", other),
                };

                match superclass.find_method(&method.lexeme) {
                    Some(found) => Ok(Value::Callable(Callable::Function(found.bind(instance)))),
                    None => Err(LoxError::runtime(
                        method,
                        format!("Undefined property '{}'.", method.lexeme),
                    )),
                }
            }
        }
    }

    /// Read a name at its resolved distance, or from the globals when the
    /// resolver left it unbound.
    fn look_up(&self, name: &Token, distance: Option<usize>, env: &EnvRef) -> Result<Value> {
        match distance {
            Some(distance) => Ok(Environment::get_at(env, distance, &name.lexeme)),
            None => self.globals.borrow().get(name),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr, env: &EnvRef) -> Result<Value> {
        let right = self.evaluate(right, env)?;

        match operator.token_type {
            TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),

            TokenType::MINUS => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(LoxError::runtime(operator, "Operand must be a number.")),
            },

            _ => unreachable!("parser never builds unary {:?}", operator.token_type),
        }
    }

    fn evaluate_binary(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
        env: &EnvRef,
    ) -> Result<Value> {
        let left = self.evaluate(left, env)?;

        // Short-circuit: the right operand is only evaluated when needed.
        match operator.token_type {
            TokenType::OR if left.is_truthy() => return Ok(left),
            TokenType::AND if !left.is_truthy() => return Ok(left),
            TokenType::OR | TokenType::AND => return self.evaluate(right, env),
            _ => {}
        }

        let right = self.evaluate(right, env)?;

        match operator.token_type {
            TokenType::EQUAL_EQUAL => return Ok(Value::Bool(left == right)),
            TokenType::BANG_EQUAL => return Ok(Value::Bool(left != right)),
            TokenType::PLUS => {
                return match (left, right) {
                    (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                    (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                    _ => Err(LoxError::runtime(
                        operator,
                        "Operands must be two numbers or two strings.",
                    )),
                };
            }
            _ => {}
        }

        let (Value::Number(a), Value::Number(b)) = (&left, &right) else {
            return Err(LoxError::runtime(operator, "Operands must be numbers."));
        };

        Ok(match operator.token_type {
            TokenType::MINUS => Value::Number(a - b),
            TokenType::STAR => Value::Number(a * b),
            // Division by zero follows IEEE-754 (inf / NaN).
            TokenType::SLASH => Value::Number(a / b),
            TokenType::GREATER => Value::Bool(a > b),
            TokenType::GREATER_EQUAL => Value::Bool(a >= b),
            TokenType::LESS => Value::Bool(a < b),
            TokenType::LESS_EQUAL => Value::Bool(a <= b),
            _ => unreachable!("parser never builds binary {:?}", operator.token_type),
        })
    }

    /// Check callability and arity, then invoke.
    fn call_value(&mut self, callee: Value, paren: &Token, args: Vec<Value>) -> Result<Value> {
        let Value::Callable(callable) = callee else {
            return Err(LoxError::runtime(
                paren,
                "Can only call functions and classes.",
            ));
        };

        if args.len() != callable.arity() {
            return Err(LoxError::runtime(
                paren,
                format!(
                    "Expected {} arguments but got {}.",
                    callable.arity(),
                    args.len()
                ),
            ));
        }

        match callable {
            Callable::Native(native) => {
                debug!("Calling native function '{}'", native.name);

                (native.func)(&args).map_err(|message| LoxError::runtime(paren, message))
            }

            Callable::Function(function) => self.call_function(&function, args),

            Callable::Class(class) => {
                debug!("Instantiating class '{}'", class.name);

                let instance = Rc::new(RefCell::new(Instance::new(Rc::clone(&class))));

                if let Some(init) = class.find_method("init") {
                    self.call_function(&init.bind(Rc::clone(&instance)), args)?;
                }

                Ok(Value::Instance(instance))
            }
        }
    }

    /// Run a user function body in a fresh scope under its closure.
    fn call_function(&mut self, function: &Function, args: Vec<Value>) -> Result<Value> {
        let decl = &function.declaration;

        debug!("Calling user-defined function '{}'", decl.name.lexeme);

        let scope = Environment::with_enclosing(&function.closure);
        {
            let mut scope = scope.borrow_mut();
            for (param, arg) in decl.params.iter().zip(args) {
                scope.define(param.lexeme.as_str(), arg);
            }
        }

        let flow = self.execute_block(&decl.body, &scope)?;

        if function.is_initializer {
            return Ok(Environment::get_at(&function.closure, 0, "this"));
        }

        Ok(match flow {
            Flow::Return(value) => value,
            Flow::Normal => Value::Nil,
        })
    }
}
