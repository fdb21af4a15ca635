#[cfg(test)]
mod parser_tests {
    use pretty_assertions::assert_eq;

    use rox::ast_printer::Ast;
    use rox::error::Diagnostic;
    use rox::parser::{parse, Parser};
    use rox::scanner::scan;
    use rox::stmt::Stmt;

    fn parse_source(source: &str) -> (Vec<Stmt>, Vec<Diagnostic>) {
        let (tokens, scan_diagnostics) = scan(source);
        assert!(
            scan_diagnostics.is_empty(),
            "unexpected scan errors: {:?}",
            scan_diagnostics
        );

        parse(&tokens)
    }

    /// Parse `source` and render every statement with the AST printer.
    fn assert_ast(source: &str, expected: &[&str]) {
        let (statements, diagnostics) = parse_source(source);
        assert!(diagnostics.is_empty(), "unexpected errors: {:?}", diagnostics);

        let printer = Ast;
        let rendered: Vec<String> = statements.iter().map(|s| printer.print_stmt(s)).collect();

        assert_eq!(rendered, expected);
    }

    fn messages(diagnostics: &[Diagnostic]) -> Vec<String> {
        diagnostics.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn test_precedence() {
        assert_ast("print 1 + 2 * 3;", &["(print (+ 1.0 (* 2.0 3.0)))"]);
        assert_ast(
            "print (1 + 2) * 3 - 4 / 2;",
            &["(print (- (* (group (+ 1.0 2.0)) 3.0) (/ 4.0 2.0)))"],
        );
        assert_ast(
            "print 1 < 2 == true or false and !nil;",
            &["(print (or (== (< 1.0 2.0) true) (and false (! nil))))"],
        );
    }

    #[test]
    fn test_unary_is_right_associative() {
        assert_ast("print -!-x;", &["(print (- (! (- x))))"]);
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_ast("a = b = c;", &["(; (= a (= b c)))"]);
    }

    #[test]
    fn test_calls_and_property_chains() {
        assert_ast(
            "a.b(1, \"two\").c = 2;",
            &["(; (= (. (call (. a b) 1.0 two) c) 2.0))"],
        );
        assert_ast("f()();", &["(; (call (call f)))"]);
    }

    #[test]
    fn test_invalid_assignment_target_is_not_fatal() {
        let (statements, diagnostics) = parse_source("a + b = c;\nprint 1;");

        assert_eq!(
            messages(&diagnostics),
            vec!["[line 1] Error at '=': Invalid assignment target."]
        );
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_error_at_end() {
        let (statements, diagnostics) = parse_source("print 1");

        assert!(statements.is_empty());
        assert_eq!(
            messages(&diagnostics),
            vec!["[line 1] Error at end: Expect ';' after value."]
        );
    }

    #[test]
    fn test_synchronize_reports_each_broken_statement() {
        let source = "var = 1;\nprint 2;\nvar x\nprint 3;\nprint 4;";
        let (statements, diagnostics) = parse_source(source);

        assert_eq!(
            messages(&diagnostics),
            vec![
                "[line 1] Error at '=': Expect variable name.",
                "[line 3] Error at 'print': Expect ';' after variable declaration.",
            ]
        );

        let printer = Ast;
        let rendered: Vec<String> = statements.iter().map(|s| printer.print_stmt(s)).collect();
        assert_eq!(rendered, vec!["(print 2.0)", "(print 4.0)"]);
    }

    #[test]
    fn test_for_desugars_into_while() {
        assert_ast(
            "for (var i = 0; i < 3; i = i + 1) print i;",
            &["(block (var i 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0))))))"],
        );
    }

    #[test]
    fn test_for_without_clauses_loops_on_true() {
        assert_ast("for (;;) print 1;", &["(while true (print 1.0))"]);
    }

    #[test]
    fn test_too_many_arguments() {
        let arguments = vec!["1"; 256].join(", ");
        let source = format!("f({});", arguments);
        let (statements, diagnostics) = parse_source(&source);

        assert_eq!(statements.len(), 1);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Can't have more than 255 arguments.");
        assert_eq!(diagnostics[0].location, " at '1'");
    }

    #[test]
    fn test_too_many_parameters() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let source = format!("fun f({}) {{}}", params.join(", "));
        let (statements, diagnostics) = parse_source(&source);

        assert_eq!(statements.len(), 1);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Can't have more than 255 parameters.");
        assert_eq!(diagnostics[0].location, " at 'p255'");
    }

    #[test]
    fn test_class_with_superclass() {
        assert_ast(
            "class B < A { init(x) { this.x = x; } get() { return super.get(); } }",
            &["(class B < A (method init(x) (body (; (= (. this x) x)))) (method get() (body (return (call (super get))))))"],
        );
    }

    #[test]
    fn test_super_requires_dot() {
        let (_, diagnostics) = parse_source("class B < A { m() { super; } }");

        assert_eq!(diagnostics[0].message, "Expect '.' after 'super'.");
    }

    #[test]
    fn test_function_and_control_flow() {
        assert_ast(
            "fun add(a, b) { return a + b; }\nif (x) print 1; else { print 2; }\nwhile (y) y = nil;",
            &[
                "(fun add(a b) (body (return (+ a b))))",
                "(if x (print 1.0) (block (print 2.0)))",
                "(while y (; (= y nil)))",
            ],
        );
    }

    #[test]
    fn test_parse_single_expression() {
        let (tokens, _) = scan("1 + 2");
        let mut parser = Parser::new(&tokens);
        let expr = parser.parse_expression();

        assert!(parser.diagnostics().is_empty());
        assert_eq!(expr.map(|e| Ast.print(&e)), Some("(+ 1.0 2.0)".to_string()));

        let (tokens, _) = scan("1 2");
        let mut parser = Parser::new(&tokens);
        parser.parse_expression();

        assert_eq!(
            messages(parser.diagnostics()),
            vec!["[line 1] Error at '2': Expect end of expression."]
        );
    }

    #[test]
    fn test_empty_input() {
        let (statements, diagnostics) = parse(&[]);

        assert!(statements.is_empty());
        assert!(diagnostics.is_empty());
    }
}
