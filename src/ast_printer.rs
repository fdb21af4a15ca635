use crate::expr::{Expr, LiteralValue};
use crate::stmt::{FunctionDecl, Stmt};

/// Renders the AST as Lisp‑style parenthesised text, for debugging.
pub struct Ast;

impl Ast {
    pub fn print(&self, expr: &Expr) -> String {
        match expr {
            Expr::Literal(literal) => match literal {
                LiteralValue::Number(n) => format!("{:?}", n),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::True => "true".to_string(),

                LiteralValue::False => "false".to_string(),

                LiteralValue::Nil => "nil".to_string(),
            },

            Expr::Grouping(inner) => format!("(group {})", self.print(inner)),

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, self.print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                self.print(left),
                self.print(right)
            ),

            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, self.print(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut out = format!("(call {}", self.print(callee));
                for arg in arguments {
                    out.push(' ');
                    out.push_str(&self.print(arg));
                }
                out.push(')');
                out
            }

            Expr::Get { object, name } => format!("(. {} {})", self.print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                self.print(object),
                name.lexeme,
                self.print(value)
            ),

            Expr::This { .. } => "this".to_string(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),
        }
    }

    pub fn print_stmt(&self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", self.print(expr)),

            Stmt::Print(expr) => format!("(print {})", self.print(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(init) => format!("(var {} {})", name.lexeme, self.print(init)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::Block(statements) => self.print_block("block", statements),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    self.print(condition),
                    self.print_stmt(then_branch),
                    self.print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    self.print(condition),
                    self.print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => format!(
                "(while {} {})",
                self.print(condition),
                self.print_stmt(body)
            ),

            Stmt::Function(decl) => self.print_function("fun", decl),

            Stmt::Return { value, .. } => match value {
                Some(value) => format!("(return {})", self.print(value)),
                None => "(return)".to_string(),
            },

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let mut out = format!("(class {}", name.lexeme);
                if let Some(superclass) = superclass {
                    out.push_str(&format!(" < {}", self.print(superclass)));
                }
                for method in methods {
                    out.push(' ');
                    out.push_str(&self.print_function("method", method));
                }
                out.push(')');
                out
            }
        }
    }

    fn print_function(&self, keyword: &str, decl: &FunctionDecl) -> String {
        let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();

        format!(
            "({} {}({}) {})",
            keyword,
            decl.name.lexeme,
            params.join(" "),
            self.print_block("body", &decl.body)
        )
    }

    fn print_block(&self, label: &str, statements: &[Stmt]) -> String {
        let mut out = format!("({}", label);
        for stmt in statements {
            out.push(' ');
            out.push_str(&self.print_stmt(stmt));
        }
        out.push(')');
        out
    }
}
