#[cfg(test)]
mod interpreter_tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use rox::error::Diagnostic;
    use rox::{init_global_environment, run, Interpreter, Value};

    struct Outcome {
        output: String,
        errors: Vec<String>,
        had_error: bool,
    }

    fn run_on(interpreter: &mut Interpreter<Vec<u8>>, source: &str) -> Outcome {
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let before = interpreter.output().len();

        let had_error = run(source, interpreter, &mut diagnostics);

        Outcome {
            output: String::from_utf8_lossy(&interpreter.output()[before..]).into_owned(),
            errors: diagnostics.iter().map(|d| d.to_string()).collect(),
            had_error,
        }
    }

    fn run_program(source: &str) -> Outcome {
        let mut interpreter = Interpreter::new(init_global_environment(), Vec::new());

        run_on(&mut interpreter, source)
    }

    /// Run a program that must succeed and return what it printed.
    fn output_of(source: &str) -> String {
        let outcome = run_program(source);
        assert!(!outcome.had_error, "unexpected errors: {:?}", outcome.errors);

        outcome.output
    }

    #[test]
    fn test_arithmetic_round_trip() {
        assert_eq!(output_of("print 1 + 2 * 3;"), "7\n");
    }

    #[test]
    fn test_value_rendering() {
        let source = r#"
            print 2.5;
            print 10 / 4;
            print -0.5 + 3;
            print "a" + "b";
            print nil;
            print true;
            var unset;
            print unset;
        "#;

        assert_eq!(output_of(source), "2.5\n2.5\n2.5\nab\nnil\ntrue\nnil\n");
    }

    #[test]
    fn test_equality() {
        let source = r#"
            print 1 == 1;
            print nil == nil;
            print nil == false;
            print "1" == 1;
            print "x" != "x";
            print 0 / 0 == 0 / 0;
        "#;

        assert_eq!(output_of(source), "true\ntrue\nfalse\nfalse\nfalse\nfalse\n");
    }

    #[test]
    fn test_division_by_zero_is_not_trapped() {
        assert_eq!(output_of("print 1 / 0; print -1 / 0;"), "inf\n-inf\n");
    }

    #[test]
    fn test_block_shadowing() {
        assert_eq!(
            output_of("var a = 1; { var a = 2; print a; } print a;"),
            "2\n1\n"
        );
    }

    #[test]
    fn test_closure_counter() {
        let source = r#"
            fun makeCounter() {
                var i = 0;
                fun count() {
                    i = i + 1;
                    return i;
                }
                return count;
            }

            var counter = makeCounter();
            print counter();
            print counter();

            var other = makeCounter();
            print other();
        "#;

        assert_eq!(output_of(source), "1\n2\n1\n");
    }

    #[test]
    fn test_closure_keeps_resolved_binding() {
        let source = r#"
            var a = "global";
            {
                fun show() { print a; }
                show();
                var a = "block";
                show();
            }
        "#;

        assert_eq!(output_of(source), "global\nglobal\n");
    }

    #[test]
    fn test_short_circuit_skips_right_operand() {
        let calls = Rc::new(Cell::new(0usize));
        let counter = Rc::clone(&calls);

        let mut interpreter = Interpreter::new(init_global_environment(), Vec::new());
        interpreter.globals().borrow_mut().define(
            "tick",
            Value::native("tick", 0, move |_| {
                counter.set(counter.get() + 1);
                Ok(Value::Bool(true))
            }),
        );

        let outcome = run_on(
            &mut interpreter,
            "print false and tick(); print true or tick(); print nil or tick();",
        );

        assert!(!outcome.had_error);
        assert_eq!(outcome.output, "false\ntrue\ntrue\n");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(
            output_of(r#"print "hi" or 2; print nil and 1; print 1 and "yes";"#),
            "hi\nnil\nyes\n"
        );
    }

    #[test]
    fn test_superclass_method_via_super() {
        let source = r#"
            class A { greet() { print "A"; } }
            class B < A { greet() { super.greet(); print "B"; } }
            B().greet();
        "#;

        assert_eq!(output_of(source), "A\nB\n");
    }

    #[test]
    fn test_inherited_method_binds_this() {
        let source = r#"
            class A { name() { return this.n; } }
            class B < A { init() { this.n = "b"; } }
            print B().name();
        "#;

        assert_eq!(output_of(source), "b\n");
    }

    #[test]
    fn test_initializer_returns_instance() {
        let source = r#"
            class Point {
                init(x) {
                    this.x = x;
                    return;
                }
            }

            var p = Point(3);
            print p.x;
            print p.init(4) == p;
            print p.x;
        "#;

        assert_eq!(output_of(source), "3\ntrue\n4\n");
    }

    #[test]
    fn test_fields_and_display() {
        let source = r#"
            class Box {}
            var b = Box();
            b.width = 2;
            print b.width;
            print b;
            print Box;
            fun f() {}
            print f;
            print f();
            print clock;
        "#;

        assert_eq!(
            output_of(source),
            "2\nBox instance\nBox\n<fn f>\nnil\n<native fn>\n"
        );
    }

    #[test]
    fn test_return_unwinds_nested_loops() {
        let source = r#"
            fun find() {
                while (true) {
                    for (var i = 0; ; i = i + 1) {
                        if (i == 3) return i;
                    }
                }
            }
            print find();
        "#;

        assert_eq!(output_of(source), "3\n");
    }

    #[test]
    fn test_recursion() {
        let source = r#"
            fun fib(n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            print fib(10);
        "#;

        assert_eq!(output_of(source), "55\n");
    }

    #[test]
    fn test_for_loop_variable_is_scoped() {
        let outcome = run_program("for (var i = 0; i < 3; i = i + 1) print i;\nprint i;");

        assert!(outcome.had_error);
        assert_eq!(outcome.output, "0\n1\n2\n");
        assert_eq!(
            outcome.errors,
            vec!["[line 2] Error at 'i': Undefined variable 'i'."]
        );
    }

    #[test]
    fn test_arity_mismatch_does_not_run_body() {
        let outcome = run_program("fun f(a, b) { print \"body\"; }\nf(1);");

        assert!(outcome.had_error);
        assert_eq!(outcome.output, "");
        assert_eq!(
            outcome.errors,
            vec!["[line 2] Error at ')': Expected 2 arguments but got 1."]
        );
    }

    #[test]
    fn test_runtime_error_aborts_remaining_statements() {
        let outcome = run_program("print 1;\nprint -\"x\";\nprint 2;");

        assert_eq!(outcome.output, "1\n");
        assert_eq!(
            outcome.errors,
            vec!["[line 2] Error at '-': Operand must be a number."]
        );
    }

    #[test]
    fn test_runtime_error_messages() {
        let cases = [
            (
                "print \"a\" + 1;",
                "[line 1] Error at '+': Operands must be two numbers or two strings.",
            ),
            ("print 1 < \"2\";", "[line 1] Error at '<': Operands must be numbers."),
            ("\"s\"();", "[line 1] Error at ')': Can only call functions and classes."),
            ("var a = 1; print a.b;", "[line 1] Error at 'b': Only instances have properties."),
            ("var a = 1; a.b = 2;", "[line 1] Error at 'b': Only instances have fields."),
            ("class A {} print A().nope;", "[line 1] Error at 'nope': Undefined property 'nope'."),
            ("x = 1;", "[line 1] Error at 'x': Undefined variable 'x'."),
            ("var A = 1; class B < A {}", "[line 1] Error at 'A': Superclass must be a class."),
        ];

        for (source, expected) in cases {
            let outcome = run_program(source);

            assert!(outcome.had_error, "expected failure for {}", source);
            assert_eq!(outcome.errors, vec![expected.to_string()]);
        }
    }

    #[test]
    fn test_native_error_becomes_runtime_error() {
        let mut interpreter = Interpreter::new(init_global_environment(), Vec::new());
        interpreter.globals().borrow_mut().define(
            "fail",
            Value::native("fail", 1, |args| Err(format!("cannot handle {}", args[0]))),
        );

        let outcome = run_on(&mut interpreter, "fail(42);");

        assert_eq!(
            outcome.errors,
            vec!["[line 1] Error at ')': cannot handle 42"]
        );
    }

    #[test]
    fn test_clock_is_defined() {
        assert_eq!(output_of("print clock() > 0;"), "true\n");
    }

    #[test]
    fn test_syntax_error_prevents_execution() {
        let outcome = run_program("print 1;\nprint ;");

        assert!(outcome.had_error);
        assert_eq!(outcome.output, "");
        assert_eq!(
            outcome.errors,
            vec!["[line 2] Error at ';': Expect expression."]
        );
    }

    #[test]
    fn test_resolve_error_prevents_execution() {
        let outcome = run_program("print 1;\n{ var a = a; }");

        assert!(outcome.had_error);
        assert_eq!(outcome.output, "");
        assert_eq!(
            outcome.errors,
            vec!["[line 2] Error at 'a': Can't read local variable in its own initializer."]
        );
    }

    #[test]
    fn test_globals_persist_between_runs() {
        let mut interpreter = Interpreter::new(init_global_environment(), Vec::new());

        assert!(!run_on(&mut interpreter, "var x = 1;").had_error);
        assert!(run_on(&mut interpreter, "print y;").had_error);

        let outcome = run_on(&mut interpreter, "x = x + 1; print x;");
        assert!(!outcome.had_error);
        assert_eq!(outcome.output, "2\n");
    }
}
