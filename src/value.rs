//! Runtime value model: the dynamic `Value` type and the callables and
//! instances it can hold.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::stmt::FunctionDecl;
use crate::token::Token;

/// Signature of a host function exposed to Lox code. An `Err` becomes a
/// runtime error at the call site.
pub type NativeFn = dyn Fn(&[Value]) -> std::result::Result<Value, String>;

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Callable(Callable),
    Instance(Rc<RefCell<Instance>>),
}

/// Everything that can appear in callee position.
#[derive(Clone)]
pub enum Callable {
    Native(Rc<NativeFunction>),
    Function(Rc<Function>),
    Class(Rc<Class>),
}

pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub func: Box<NativeFn>,
}

/// A user function or method together with the scope it closes over.
pub struct Function {
    pub declaration: Rc<FunctionDecl>,
    pub closure: EnvRef,
    /// `init` methods always yield their instance.
    pub is_initializer: bool,
}

pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    methods: HashMap<String, Rc<Function>>,
}

pub struct Instance {
    pub class: Rc<Class>,
    fields: HashMap<String, Value>,
}

impl Value {
    /// Wrap a host closure as a native function value.
    pub fn native<F>(name: &str, arity: usize, func: F) -> Self
    where
        F: Fn(&[Value]) -> std::result::Result<Value, String> + 'static,
    {
        Value::Callable(Callable::Native(Rc::new(NativeFunction {
            name: name.to_string(),
            arity,
            func: Box::new(func),
        })))
    }

    /// `nil` and `false` are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a == b,
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::String(s) => write!(f, "{}", s),

            Value::Callable(callable) => write!(f, "{}", callable),

            Value::Instance(instance) => write!(f, "{} instance", instance.borrow().class.name),
        }
    }
}

impl fmt::Debug for Value {
    /// Like `Display`, with strings quoted. Never descends into closures or
    /// fields, which may refer back to the value being printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

impl Callable {
    pub fn arity(&self) -> usize {
        match self {
            Callable::Native(native) => native.arity,
            Callable::Function(function) => function.arity(),
            Callable::Class(class) => class.arity(),
        }
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Callable::Native(a), Callable::Native(b)) => Rc::ptr_eq(a, b),
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(a, b),
            (Callable::Class(a), Callable::Class(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native(_) => write!(f, "<native fn>"),
            Callable::Function(function) => write!(f, "<fn {}>", function.declaration.name.lexeme),
            Callable::Class(class) => write!(f, "{}", class.name),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Function {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Function {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// A copy of this method whose closure has `this` bound to `instance`.
    pub fn bind(&self, instance: Rc<RefCell<Instance>>) -> Rc<Function> {
        let scope = Environment::with_enclosing(&self.closure);
        scope
            .borrow_mut()
            .define("this", Value::Instance(instance));

        Rc::new(Function::new(
            Rc::clone(&self.declaration),
            scope,
            self.is_initializer,
        ))
    }
}

impl Class {
    pub fn new(
        name: &str,
        superclass: Option<Rc<Class>>,
        methods: HashMap<String, Rc<Function>>,
    ) -> Self {
        Class {
            name: name.to_string(),
            superclass,
            methods,
        }
    }

    /// Look `name` up on this class, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        match self.methods.get(name) {
            Some(method) => Some(Rc::clone(method)),
            None => self
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name)),
        }
    }

    /// Calling a class takes as many arguments as its `init`, or none.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Instance {
            class,
            fields: HashMap::new(),
        }
    }

    /// Property access: fields shadow methods; methods come back bound to
    /// `instance`.
    pub fn get(instance: &Rc<RefCell<Instance>>, name: &Token) -> Result<Value> {
        let this = instance.borrow();

        if let Some(value) = this.fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        match this.class.find_method(&name.lexeme) {
            Some(method) => Ok(Value::Callable(Callable::Function(
                method.bind(Rc::clone(instance)),
            ))),
            None => Err(LoxError::runtime(
                name,
                format!("Undefined property '{}'.", name.lexeme),
            )),
        }
    }

    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}
