use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a scope. Closures hold these, so a scope lives as long as
/// its longest holder and every alias observes the same bindings.
pub type EnvRef = Rc<RefCell<Environment>>;

/// One lexical scope: a name → value table plus its enclosing scope. The
/// global scope is the root of every chain.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    /// A fresh root scope behind a shared handle.
    pub fn global() -> EnvRef {
        Rc::new(RefCell::new(Environment::new()))
    }

    /// A fresh scope nested inside `enclosing`.
    pub fn with_enclosing(enclosing: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            values: HashMap::new(),
            enclosing: Some(Rc::clone(enclosing)),
        }))
    }

    pub fn enclosing(&self) -> Option<&EnvRef> {
        self.enclosing.as_ref()
    }

    /// Bind `name` in this scope, replacing any existing binding.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Dynamic lookup through this scope and its ancestors. Used for globals,
    /// which the resolver leaves unbound.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(LoxError::runtime(
                name,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        }
    }

    /// Dynamic assignment; fails if no scope in the chain declares `name`.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(LoxError::runtime(
                name,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        }
    }

    /// Read `name` from the scope exactly `distance` hops out of `env`.
    ///
    /// # Panics
    ///
    /// If the resolver recorded a binding that does not exist at runtime.
    pub fn get_at(env: &EnvRef, distance: usize, name: &str) -> Value {
        let scope = Self::ancestor(env, distance);
        let value = scope.borrow().values.get(name).cloned();

        debug!("get_at({}, '{}') -> {:?}", distance, name, value.is_some());

        match value {
            Some(value) => value,
            None => panic!("resolved variable '{name}' missing at distance {distance}"),
        }
    }

    /// Overwrite `name` in the scope exactly `distance` hops out of `env`.
    pub fn assign_at(env: &EnvRef, distance: usize, name: &str, value: Value) {
        Self::ancestor(env, distance)
            .borrow_mut()
            .values
            .insert(name.to_string(), value);
    }

    fn ancestor(env: &EnvRef, distance: usize) -> EnvRef {
        let mut scope = Rc::clone(env);

        for _ in 0..distance {
            let parent = match scope.borrow().enclosing() {
                Some(parent) => Rc::clone(parent),
                None => panic!("scope chain shorter than resolved distance {distance}"),
            };

            scope = parent;
        }

        scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn ident(name: &str) -> Token {
        Token::new(TokenType::IDENTIFIER, name, 1)
    }

    #[test]
    fn define_then_get() {
        let env = Environment::global();
        env.borrow_mut().define("a", Value::Number(1.0));

        assert_eq!(env.borrow().get(&ident("a")).ok(), Some(Value::Number(1.0)));
    }

    #[test]
    fn get_walks_enclosing_scopes() {
        let globals = Environment::global();
        globals.borrow_mut().define("a", Value::Bool(true));
        let inner = Environment::with_enclosing(&globals);

        assert_eq!(inner.borrow().get(&ident("a")).ok(), Some(Value::Bool(true)));
    }

    #[test]
    fn undefined_variable_is_runtime_error() {
        let env = Environment::global();

        match env.borrow().get(&ident("missing")) {
            Err(LoxError::Runtime(err)) => {
                assert_eq!(err.message, "Undefined variable 'missing'.")
            }
            other => panic!("expected runtime error, got {:?}", other),
        };
    }

    #[test]
    fn assign_requires_existing_binding() {
        let env = Environment::global();

        assert!(env.borrow_mut().assign(&ident("x"), Value::Nil).is_err());

        env.borrow_mut().define("x", Value::Nil);
        env.borrow_mut()
            .assign(&ident("x"), Value::Number(2.0))
            .expect("x is defined");

        assert_eq!(Environment::get_at(&env, 0, "x"), Value::Number(2.0));
    }

    #[test]
    fn get_at_and_assign_at_skip_shadowing_scopes() {
        let outer = Environment::global();
        outer.borrow_mut().define("a", Value::Number(1.0));
        let middle = Environment::with_enclosing(&outer);
        middle.borrow_mut().define("a", Value::Number(2.0));
        let inner = Environment::with_enclosing(&middle);

        assert_eq!(Environment::get_at(&inner, 1, "a"), Value::Number(2.0));
        assert_eq!(Environment::get_at(&inner, 2, "a"), Value::Number(1.0));

        Environment::assign_at(&inner, 2, "a", Value::Number(3.0));

        assert_eq!(Environment::get_at(&outer, 0, "a"), Value::Number(3.0));
        assert_eq!(Environment::get_at(&middle, 0, "a"), Value::Number(2.0));
    }

    #[test]
    fn aliases_observe_mutation() {
        let shared = Environment::global();
        shared.borrow_mut().define("n", Value::Number(0.0));
        let alias = Rc::clone(&shared);

        Environment::assign_at(&alias, 0, "n", Value::Number(5.0));

        assert_eq!(Environment::get_at(&shared, 0, "n"), Value::Number(5.0));
    }
}
