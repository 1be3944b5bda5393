mod common;

#[cfg(test)]
mod interpreter_tests {
    use pretty_assertions::assert_eq;

    use crate::common::{messages, run, run_ok, session};

    #[test]
    fn test_interpreter_01_arithmetic_and_printing() {
        assert_eq!(
            run_ok("print 1 + 2 * 3; print 7 / 2; print -(4 - 6); print \"a\" + \"b\";"),
            vec!["7", "3.5", "2", "ab"]
        );
    }

    #[test]
    fn test_interpreter_02_value_rendering() {
        assert_eq!(
            run_ok(
                "print nil; print true; print 0.1 + 0.2 == 0.3; print clock;
                 fun f() {} print f;
                 class C {} print C; print C();"
            ),
            vec![
                "nil",
                "true",
                "false",
                "<native fn>",
                "<fn f>",
                "<class C>",
                "<instance C>",
            ]
        );
    }

    #[test]
    fn test_interpreter_03_division_by_zero_is_not_an_error() {
        assert_eq!(run_ok("print 1 / 0; print -1 / 0;"), vec!["inf", "-inf"]);
    }

    #[test]
    fn test_interpreter_04_truthiness() {
        assert_eq!(
            run_ok(
                "if (0) print \"zero\"; if (\"\") print \"empty\";
                 if (nil) print \"nil\"; else print \"no nil\";
                 if (false) print \"false\"; else print \"no false\";
                 print !nil; print !0;"
            ),
            vec!["zero", "empty", "no nil", "no false", "true", "false"]
        );
    }

    #[test]
    fn test_interpreter_05_logical_operators_return_deciding_operand() {
        assert_eq!(
            run_ok(
                "print nil or \"yes\"; print 1 or 2; print nil and 1; print 1 and 2;
                 var touched = false;
                 fun touch() { touched = true; return true; }
                 print false and touch(); print touched;
                 print true or touch(); print touched;"
            ),
            vec!["yes", "1", "nil", "2", "false", "false", "true", "false"]
        );
    }

    #[test]
    fn test_interpreter_06_equality_never_errors() {
        assert_eq!(
            run_ok(
                "print 1 == \"1\"; print nil == false; print nil == nil;
                 print \"a\" != \"a\"; fun f() {} print f == f; print clock == clock;
                 class A {} print A() == A();"
            ),
            vec!["false", "false", "true", "false", "true", "true", "false"]
        );
    }

    #[test]
    fn test_interpreter_07_closures_share_state() {
        assert_eq!(
            run_ok(
                "fun counter() { var i = 0; fun inc() { i = i + 1; return i; } return inc; }
                 var c = counter(); print c(); print c();
                 var d = counter(); print d();"
            ),
            vec!["1", "2", "1"]
        );
    }

    #[test]
    fn test_interpreter_08_block_shadowing_does_not_leak() {
        assert_eq!(
            run_ok("var a = 1; { var a = 2; print a; } print a;"),
            vec!["2", "1"]
        );
    }

    #[test]
    fn test_interpreter_09_closure_binds_lexically() {
        // The closure keeps seeing the global `a`, not the later local.
        assert_eq!(
            run_ok(
                "var a = \"global\";
                 { fun show() { print a; } show(); var a = \"block\"; show(); }"
            ),
            vec!["global", "global"]
        );
    }

    #[test]
    fn test_interpreter_10_control_flow() {
        assert_eq!(
            run_ok(
                "var i = 0; while (i < 3) { print i; i = i + 1; }
                 for (var j = 10; j < 12; j = j + 1) print j;"
            ),
            vec!["0", "1", "2", "10", "11"]
        );
    }

    #[test]
    fn test_interpreter_11_return_unwinds_only_to_call_boundary() {
        assert_eq!(
            run_ok(
                "fun find() { for (var i = 0; ; i = i + 1) { if (i == 3) return i; } }
                 print find(); print \"after\";
                 fun none() { return; } print none();
                 fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
                 print fib(15);"
            ),
            vec!["3", "after", "nil", "610"]
        );
    }

    #[test]
    fn test_interpreter_12_classes_fields_and_methods() {
        assert_eq!(
            run_ok(
                "class Point {
                   init(x, y) { this.x = x; this.y = y; }
                   sum() { return this.x + this.y; }
                 }
                 var p = Point(1, 2);
                 print p.sum();
                 p.x = 10;
                 print p.sum();
                 var m = p.sum;
                 print m();"
            ),
            vec!["3", "12", "12"]
        );
    }

    #[test]
    fn test_interpreter_13_fields_shadow_methods() {
        assert_eq!(
            run_ok(
                "class A { m() { return \"method\"; } }
                 var a = A();
                 print a.m();
                 a.m = \"field\";
                 print a.m;"
            ),
            vec!["method", "field"]
        );
    }

    #[test]
    fn test_interpreter_14_super_dispatch() {
        assert_eq!(
            run_ok(
                "class A { greet() { return \"A\"; } }
                 class B < A { greet() { return super.greet() + \"B\"; } }
                 print B().greet();"
            ),
            vec!["AB"]
        );
    }

    #[test]
    fn test_interpreter_15_super_is_static_but_this_is_dynamic() {
        assert_eq!(
            run_ok(
                "class A { method() { print \"A \" + this.name; } }
                 class B < A { method() { print \"B\"; super.method(); } }
                 class C < B { init() { this.name = \"c\"; } }
                 C().method();"
            ),
            vec!["B", "A c"]
        );
    }

    #[test]
    fn test_interpreter_16_inherited_methods_and_init() {
        assert_eq!(
            run_ok(
                "class Base { init(v) { this.v = v; } get() { return this.v; } }
                 class Derived < Base {}
                 print Derived(7).get();"
            ),
            vec!["7"]
        );
    }

    #[test]
    fn test_interpreter_17_init_always_yields_instance() {
        assert_eq!(
            run_ok(
                "class A { init() { this.ok = true; return; } }
                 var a = A();
                 print a; print a.ok;
                 print a.init();"
            ),
            vec!["<instance A>", "true", "<instance A>"]
        );
    }

    #[test]
    fn test_interpreter_18_bound_methods_keep_their_instance() {
        assert_eq!(
            run_ok(
                "class Box { init(v) { this.v = v; } get() { return this.v; } }
                 var one = Box(1).get;
                 var two = Box(2).get;
                 print one() + two();"
            ),
            vec!["3"]
        );
    }

    #[test]
    fn test_interpreter_19_arity_error_does_not_abort_program() {
        let (lines, report) = run("fun f(a) { return a; }\nprint f();\nprint \"after\";");

        assert_eq!(lines, vec!["after"]);
        assert!(!report.had_static_error());
        assert_eq!(
            messages(&report),
            vec!["[line 2] Runtime error: Expected 1 arguments but got 0."]
        );
    }

    #[test]
    fn test_interpreter_20_runtime_type_errors() {
        let (lines, report) = run(
            "print -\"x\";\nprint 1 + \"x\";\nprint 1 < nil;\nprint \"x\" * 2;\nprint \"ok\";",
        );

        assert_eq!(lines, vec!["ok"]);
        assert_eq!(
            messages(&report),
            vec![
                "[line 1] Runtime error: Operand must be a number.",
                "[line 2] Runtime error: Operands must be two numbers or two strings.",
                "[line 3] Runtime error: Operands must be numbers.",
                "[line 4] Runtime error: Operands must be numbers.",
            ]
        );
    }

    #[test]
    fn test_interpreter_21_undefined_names_and_properties() {
        let (_, report) = run(
            "print missing;\nmissing = 1;\nclass A {}\nprint A().nope;\nprint 3.field;\n\"s\".f = 1;",
        );

        assert_eq!(
            messages(&report),
            vec![
                "[line 1] Runtime error: Undefined variable 'missing'.",
                "[line 2] Runtime error: Undefined variable 'missing'.",
                "[line 4] Runtime error: Undefined property 'nope'.",
                "[line 5] Runtime error: Only instances have properties, not number.",
                "[line 6] Runtime error: Only instances have fields.",
            ]
        );
    }

    #[test]
    fn test_interpreter_22_calling_non_callables() {
        let (_, report) = run("\"text\"();\nnil();");

        assert_eq!(
            messages(&report),
            vec![
                "[line 1] Runtime error: Can only call functions and classes.",
                "[line 2] Runtime error: Can only call functions and classes.",
            ]
        );
    }

    #[test]
    fn test_interpreter_23_superclass_must_be_a_class() {
        let (_, report) = run("var NotAClass = 1;\nclass A < NotAClass {}");

        assert_eq!(
            messages(&report),
            vec!["[line 2] Runtime error: Superclass must be a class."]
        );
    }

    #[test]
    fn test_interpreter_24_runtime_error_inside_call_restores_globals() {
        let (lines, report) = run(
            "var x = \"global\";
             fun bad() { var x = \"local\"; return nil + 1; }
             bad();
             print x;",
        );

        assert_eq!(lines, vec!["global"]);
        assert_eq!(report.runtime_errors.len(), 1);
    }

    #[test]
    fn test_interpreter_25_static_errors_prevent_execution() {
        let (lines, report) = run("print \"before\";\n{ var a = a; }");

        assert!(lines.is_empty());
        assert!(report.runtime_errors.is_empty());
        assert_eq!(
            messages(&report),
            vec!["[line 2] Error: Can't read local variable in its own initializer."]
        );

        // Shadowing that reads the outer binding is still self-reference.
        let (lines, report) = run("var a = 1; { var a = a + 1; print a; }");
        assert!(lines.is_empty());
        assert!(report.had_static_error());
    }

    #[test]
    fn test_interpreter_26_lex_and_parse_errors_are_both_reported() {
        let (lines, report) = run("print 1;\n@\nprint ;");

        assert!(lines.is_empty());
        assert_eq!(
            messages(&report),
            vec![
                "[line 2] Error: Unexpected character: @",
                "[line 3] Error: Expect expression.",
            ]
        );
    }

    #[test]
    fn test_interpreter_27_session_keeps_globals_between_runs() {
        let (mut lox, buffer) = session();

        assert!(lox.run("var greeting = \"hi\"; fun shout(s) { return s + \"!\"; }").is_ok());
        assert!(lox.run("{ var local = shout(greeting); print local; }").is_ok());

        let report = lox.run("print undefinedThing;");
        assert!(report.had_runtime_error());

        assert!(lox.run("print greeting;").is_ok());

        assert_eq!(buffer.lines(), vec!["hi!", "hi"]);
    }

    #[test]
    fn test_interpreter_28_clock_is_a_number() {
        assert_eq!(
            run_ok("var t = clock(); print t > 0; print clock() - t >= 0;"),
            vec!["true", "true"]
        );
    }

    #[test]
    fn test_interpreter_29_unbounded_recursion_is_a_runtime_error() {
        // Nested evaluation is deep; give the interpreter room.
        let handle = std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(|| {
                let (lines, report) = run("fun f() { f(); }\nf();\nprint \"survived\";");
                (lines, messages(&report))
            })
            .expect("spawn interpreter thread");

        let (lines, messages) = handle.join().expect("interpreter thread");

        assert_eq!(lines, vec!["survived"]);
        assert_eq!(messages, vec!["[line 1] Runtime error: Stack overflow."]);
    }

    #[test]
    fn test_interpreter_30_finished_top_level_code_releases_its_locals() {
        let (mut lox, buffer) = session();

        let counter = "fun make() { var n = 0; fun inc() { n = n + 1; return n; } return inc; }
                       var c = make();";
        assert!(lox.run(counter).is_ok());

        let kept = lox.interpreter().local_count();
        assert!(kept > 0);

        for _ in 0..3 {
            assert!(lox.run("{ var a = 1; { var b = a + 1; print b; } }").is_ok());
            assert_eq!(lox.interpreter().local_count(), kept);
        }

        assert!(lox.run("print c(); print c();").is_ok());
        assert_eq!(lox.interpreter().local_count(), kept);

        assert_eq!(buffer.lines(), vec!["2", "2", "2", "1", "2"]);
    }

    #[test]
    fn test_interpreter_31_deep_nesting_is_a_static_error() {
        let handle = std::thread::Builder::new()
            .stack_size(8 * 1024 * 1024)
            .spawn(|| {
                let deep = format!(
                    "print {}1{};\nprint \"survived\";",
                    "(".repeat(10_000),
                    ")".repeat(10_000)
                );
                let shallow = format!("print {}1{};", "(".repeat(50), ")".repeat(50));

                let (lines, report) = run(&deep);
                (lines, messages(&report), run_ok(&shallow))
            })
            .expect("spawn interpreter thread");

        let (lines, messages, shallow) = handle.join().expect("interpreter thread");

        assert!(lines.is_empty());
        assert_eq!(messages, vec!["[line 1] Error: Too much nesting."]);
        assert_eq!(shallow, vec!["1"]);
    }

    #[test]
    fn test_interpreter_32_extreme_magnitudes_print_in_exponent_form() {
        assert_eq!(
            run_ok(
                "var big = 1; for (var i = 0; i < 21; i = i + 1) big = big * 10;
                 print big; print big / 10; print 1 / 10000000;"
            ),
            vec!["1e21", "100000000000000000000", "1e-7"]
        );
    }
}
