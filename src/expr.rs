use std::cell::Cell;

use crate::token::Token;

/// A **literal constant** that appears directly in the source code.
///
/// The parser copies the value out of the token so the AST does not depend
/// on the token buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal, stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    True,

    False,

    Nil,
}

/// Number of scopes between a use site and its binding, filled in by the
/// resolver. `None` after resolution means the name lives in the global scope.
pub type Distance = Cell<Option<usize>>;

/// **Abstract‑Syntax‑Tree node** representing every kind of *expression*.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Parenthesised sub‑expression: `"(" expression ")"`.
    Grouping(Box<Expr>),

    /// Prefix operator expression: `!ready`, `-42`.
    Unary { operator: Token, right: Box<Expr> },

    /// Infix operator expression. Covers arithmetic, comparison, equality and
    /// the short‑circuiting `and` / `or`.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Variable access.
    Variable { name: Token, distance: Distance },

    /// `identifier "=" expression`
    Assign {
        name: Token,
        value: Box<Expr>,
        distance: Distance,
    },

    /// Function, method or constructor call.
    Call {
        callee: Box<Expr>,
        /// The closing `)`, retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// `object.name`
    Get { object: Box<Expr>, name: Token },

    /// `object.name = value`
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// `this` inside a method.
    This { keyword: Token, distance: Distance },

    /// `super.method` inside a subclass method.
    Super {
        keyword: Token,
        method: Token,
        distance: Distance,
    },
}

impl Expr {
    pub fn variable(name: Token) -> Self {
        Expr::Variable {
            name,
            distance: Cell::new(None),
        }
    }

    pub fn assign(name: Token, value: Expr) -> Self {
        Expr::Assign {
            name,
            value: Box::new(value),
            distance: Cell::new(None),
        }
    }

    pub fn binary(left: Expr, operator: Token, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }
}
